//! Lesson catalog.
//!
//! The catalog is an external collaborator from the execution core's point of
//! view: the pipeline only ever asks it for a lesson's expected output. A
//! small embedded set ships with the crate so the service runs out of the
//! box; deployments can point at their own JSON file instead.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

const BUILTIN_LESSONS: &str = include_str!("../lessons/builtin.json");

/// One exercise: the text shown to the learner and the output their
/// submission must produce.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lesson {
    pub id: String,
    pub name: String,
    pub category: String,
    pub instruction: String,
    pub boilerplate: String,
    pub expected_output: String,
    pub difficulty: String,
}

/// Immutable lesson collection, indexed by id.
#[derive(Debug, Clone)]
pub struct Catalog {
    lessons: Vec<Lesson>,
    index: HashMap<String, usize>,
}

impl Catalog {
    /// The embedded lesson set.
    pub fn builtin() -> Result<Self> {
        Self::from_json(BUILTIN_LESSONS).context("embedded lesson catalog is invalid")
    }

    /// Loads a catalog from a JSON file (an array of lessons).
    pub fn from_path(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read lesson file {}", path.display()))?;
        Self::from_json(&raw).with_context(|| format!("invalid lesson file {}", path.display()))
    }

    fn from_json(raw: &str) -> Result<Self> {
        let lessons: Vec<Lesson> = serde_json::from_str(raw)?;
        let index = lessons
            .iter()
            .enumerate()
            .map(|(position, lesson)| (lesson.id.clone(), position))
            .collect();
        Ok(Self { lessons, index })
    }

    pub fn get(&self, id: &str) -> Option<&Lesson> {
        self.index.get(id).map(|&position| &self.lessons[position])
    }

    pub fn lessons(&self) -> &[Lesson] {
        &self.lessons
    }

    pub fn len(&self) -> usize {
        self.lessons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lessons.is_empty()
    }
}
