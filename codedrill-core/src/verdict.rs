//! Output comparison and the per-submission verdict.

use serde::Serialize;

use crate::error::ExecError;

/// The graded result of one execution attempt, returned to the caller and
/// then discarded.
#[derive(Debug, Clone, Serialize)]
pub struct Verdict {
    pub success: bool,
    pub output: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Verdict {
    pub fn pass(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: output.into(),
            error: None,
        }
    }

    pub fn fail(output: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            output: output.into(),
            error: Some(error.into()),
        }
    }
}

/// Compares actual output against the expectation.
///
/// Both sides are trimmed of surrounding whitespace, then compared for exact
/// equality. No other normalization happens here; a lesson that needs one is
/// a lesson-authoring error.
pub fn compare(actual: &str, expected: &str) -> Result<(), ExecError> {
    let actual = actual.trim();
    let expected = expected.trim();
    if actual == expected {
        Ok(())
    } else {
        Err(ExecError::OutputMismatch {
            expected: expected.to_owned(),
            actual: actual.to_owned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_newline_is_ignored() {
        assert!(compare("3\n", "3").is_ok());
    }

    #[test]
    fn surrounding_whitespace_is_ignored_on_both_sides() {
        assert!(compare("  hello  ", "\nhello").is_ok());
    }

    #[test]
    fn mismatch_reports_both_values() {
        let err = compare("3 ", "30").unwrap_err();
        match err {
            ExecError::OutputMismatch { expected, actual } => {
                assert_eq!(expected, "30");
                assert_eq!(actual, "3");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn interior_whitespace_still_matters() {
        assert!(compare("a b", "a  b").is_err());
    }
}
