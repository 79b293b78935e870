//! Execution sandboxes.
//!
//! Two isolation strategies share one contract. Which one a deployment uses
//! is decided at build time (the process sandbox for native servers, the
//! embedded interpreter for the browser build); they are never mixed within
//! one deployment.

use async_trait::async_trait;

use crate::error::ExecError;

mod process;

#[cfg(feature = "embedded-interpreter")]
mod interp;

pub use process::ProcessSandbox;

#[cfg(feature = "embedded-interpreter")]
pub use interp::InterpreterSandbox;

/// One isolated execution of a submission.
///
/// On success the combined (stdout-then-stderr) output is returned untrimmed;
/// grading against a lesson's expectation is the comparator's job. Every
/// invocation is independent: implementations carry no mutable state across
/// submissions.
#[async_trait]
pub trait Sandbox: Send + Sync {
    async fn run(&self, source: &str) -> Result<String, ExecError>;
}
