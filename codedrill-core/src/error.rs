//! Error taxonomy for the execution pipeline.
//!
//! Every variant is terminal: it is reported to the caller exactly once and
//! never retried. Rate-limit and body-size rejections are HTTP-level concerns
//! handled upstream of execution and deliberately absent here.

use thiserror::Error;

/// Failure modes of one submission's trip through the execution pipeline.
#[derive(Debug, Error)]
pub enum ExecError {
    /// The submission failed the syntax-only parse and was never executed.
    #[error("compilation error: {0}")]
    Compilation(String),

    /// The submission declared an import the policy forbids; execution was
    /// never attempted.
    #[error("security violation: package '{package}' is not allowed")]
    SecurityViolation { package: String },

    /// Workspace creation or write failure. An internal fault of the host,
    /// not attributable to the submission.
    #[error("workspace error: {0}")]
    Resource(#[from] std::io::Error),

    /// The child process or interpreter evaluation ended in error, including
    /// the killed-for-timeout case. `output` carries whatever the submission
    /// managed to produce before failing.
    #[error("execution failed: {reason}")]
    ExecutionFailure { reason: String, output: String },

    /// Execution succeeded but the output did not match the expectation.
    #[error("expected {expected:?}, got {actual:?}")]
    OutputMismatch { expected: String, actual: String },

    /// The referenced lesson does not exist in the catalog.
    #[error("unknown lesson '{0}'")]
    UnknownLesson(String),
}

impl ExecError {
    /// Output the submission produced before the failure, when any exists.
    ///
    /// Partial output is diagnostically useful to the caller, so run
    /// responses surface it even for failed executions.
    pub fn partial_output(&self) -> &str {
        match self {
            Self::ExecutionFailure { output, .. } => output,
            Self::OutputMismatch { actual, .. } => actual,
            _ => "",
        }
    }
}
