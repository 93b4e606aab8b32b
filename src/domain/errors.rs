//! Domain errors for the stakeholder aggregation core.

use thiserror::Error;

/// Format a list of failed keys as `a, b, c`.
fn format_key_list(keys: &[String]) -> String {
    keys.join(", ")
}

/// Errors raised by a record source while fetching raw records.
///
/// Always fatal for the request. Retry policy belongs to the source itself.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("Record source unavailable: {0}")]
    Unavailable(String),

    #[error("Record source returned malformed data: {0}")]
    Malformed(String),
}

/// Per-key classification failure.
///
/// Captured by the fan-out executor as a marker for that key only; sibling
/// work is never aborted because of it.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ClassificationError {
    #[error("Classifier rejected '{key}': {reason}")]
    Rejected { key: String, reason: String },

    #[error("Classification of '{key}' timed out after {timeout_ms}ms")]
    TimedOut { key: String, timeout_ms: u64 },

    #[error("Classification of '{key}' aborted: {reason}")]
    Aborted { key: String, reason: String },

    #[error("Fan-out executor is closed")]
    ExecutorClosed,
}

impl ClassificationError {
    /// Build a rejection for the given key.
    pub fn rejected(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Rejected {
            key: key.into(),
            reason: reason.into(),
        }
    }
}

/// Errors surfaced by `aggregate`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AggregationError {
    #[error("Invalid aggregation request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("Unresolved classification keys under strict policy: {}", format_key_list(failed_keys))]
    PartialResultPolicyViolation { failed_keys: Vec<String> },
}

pub type AggregationResult<T> = Result<T, AggregationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_result_message_lists_keys() {
        let err = AggregationError::PartialResultPolicyViolation {
            failed_keys: vec!["cto".to_string(), "head of sales".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "Unresolved classification keys under strict policy: cto, head of sales"
        );
    }

    #[test]
    fn test_fetch_error_is_transparent() {
        let err: AggregationError = FetchError::Unavailable("connection refused".into()).into();
        assert_eq!(err.to_string(), "Record source unavailable: connection refused");
    }
}
