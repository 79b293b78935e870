//! The execution pipeline: gate, sandbox, comparator.

use std::sync::Arc;

use serde::Deserialize;

use crate::catalog::Catalog;
use crate::error::ExecError;
use crate::gate::ImportGate;
use crate::sandbox::Sandbox;
use crate::verdict;

/// One caller-supplied exercise attempt. Immutable once received; lives for
/// the duration of a single execution request.
#[derive(Debug, Clone, Deserialize)]
pub struct Submission {
    pub code: String,
    pub lesson_id: String,
}

/// Drives a submission through lesson lookup, the import gate, the selected
/// sandbox backend, and output comparison.
pub struct Trainer {
    gate: ImportGate,
    backend: Arc<dyn Sandbox>,
    catalog: Arc<Catalog>,
}

impl Trainer {
    pub fn new(gate: ImportGate, backend: Arc<dyn Sandbox>, catalog: Arc<Catalog>) -> Self {
        Self {
            gate,
            backend,
            catalog,
        }
    }

    /// Executes one submission and returns its trimmed output on a pass.
    ///
    /// The gate runs before the backend, so a forbidden import is rejected
    /// without any process or interpreter being started.
    pub async fn execute(&self, submission: &Submission) -> Result<String, ExecError> {
        let lesson = self
            .catalog
            .get(&submission.lesson_id)
            .ok_or_else(|| ExecError::UnknownLesson(submission.lesson_id.clone()))?;

        self.gate.check(&submission.code)?;

        let output = self.backend.run(&submission.code).await?;
        verdict::compare(&output, &lesson.expected_output)?;
        Ok(output.trim().to_owned())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;

    /// Records invocations; the gate tests assert it is never reached.
    struct SpyBackend {
        calls: AtomicUsize,
        output: String,
    }

    impl SpyBackend {
        fn returning(output: &str) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                output: output.to_owned(),
            }
        }
    }

    #[async_trait]
    impl Sandbox for SpyBackend {
        async fn run(&self, _source: &str) -> Result<String, ExecError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.output.clone())
        }
    }

    fn trainer_with(backend: Arc<SpyBackend>) -> Trainer {
        Trainer::new(
            ImportGate::denylist(),
            backend,
            Arc::new(Catalog::builtin().unwrap()),
        )
    }

    #[tokio::test]
    async fn forbidden_import_never_reaches_the_backend() {
        let spy = Arc::new(SpyBackend::returning("3"));
        let trainer = trainer_with(spy.clone());
        let submission = Submission {
            code: "import subprocess\nprint(3)\n".to_owned(),
            lesson_id: "arithmetic".to_owned(),
        };

        let err = trainer.execute(&submission).await.unwrap_err();
        assert!(matches!(err, ExecError::SecurityViolation { .. }));
        assert_eq!(spy.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unknown_lesson_never_reaches_the_backend() {
        let spy = Arc::new(SpyBackend::returning("3"));
        let trainer = trainer_with(spy.clone());
        let submission = Submission {
            code: "print(3)\n".to_owned(),
            lesson_id: "missing".to_owned(),
        };

        let err = trainer.execute(&submission).await.unwrap_err();
        assert!(matches!(err, ExecError::UnknownLesson(_)));
        assert_eq!(spy.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn matching_output_passes() {
        let spy = Arc::new(SpyBackend::returning("3\n"));
        let trainer = trainer_with(spy.clone());
        let submission = Submission {
            code: "print(2 + 1)\n".to_owned(),
            lesson_id: "arithmetic".to_owned(),
        };

        let output = trainer.execute(&submission).await.unwrap();
        assert_eq!(output, "3");
        assert_eq!(spy.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn mismatched_output_is_reported_with_both_values() {
        let spy = Arc::new(SpyBackend::returning("4"));
        let trainer = trainer_with(spy);
        let submission = Submission {
            code: "print(2 + 2)\n".to_owned(),
            lesson_id: "arithmetic".to_owned(),
        };

        let err = trainer.execute(&submission).await.unwrap_err();
        match err {
            ExecError::OutputMismatch { expected, actual } => {
                assert_eq!(expected, "3");
                assert_eq!(actual, "4");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
