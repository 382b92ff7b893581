// ABOUTME: Typed error taxonomy for the session engine
// ABOUTME: Connect/select/submit errors invalidate the session; detection timeouts do not

use std::time::Duration;
use thiserror::Error;

/// Failure establishing a session against the surface.
///
/// Invalidates the session: the adapter handle is torn down before the error
/// is returned and no partially-open handle survives.
#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("surface endpoint unreachable: {0:#}")]
    Unreachable(#[source] anyhow::Error),

    #[error("surface input control never appeared within {0:?}")]
    LivenessTimeout(Duration),

    #[error("initial identity selection failed: {0}")]
    Select(#[from] SelectError),
}

/// Failure selecting an identity in the surface's selector
#[derive(Debug, Error)]
pub enum SelectError {
    /// No entry matched with exact, whitespace-trimmed comparison. There is
    /// deliberately no partial-match fallback: a silent mismatch is worse
    /// than an explicit failure.
    #[error("identity '{0}' not found in the selector")]
    NotFound(String),

    #[error("identity selector unusable: {0:#}")]
    Selector(#[source] anyhow::Error),
}

/// Adapter-level fault while clearing the input or submitting text.
///
/// Treated as connection-breaking: the session is marked disconnected and
/// the next relay attempts a fresh connect.
#[derive(Debug, Error)]
#[error("failed to submit to the surface: {0:#}")]
pub struct SubmitError(#[source] pub anyhow::Error);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_names_the_identity() {
        let err = SelectError::NotFound("Nova".to_string());
        assert!(err.to_string().contains("Nova"));
    }

    #[test]
    fn test_liveness_timeout_display() {
        let err = ConnectError::LivenessTimeout(Duration::from_secs(30));
        assert!(err.to_string().contains("30"));
    }

    #[test]
    fn test_select_error_converts_into_connect_error() {
        let err: ConnectError = SelectError::NotFound("Echo".to_string()).into();
        assert!(matches!(err, ConnectError::Select(SelectError::NotFound(n)) if n == "Echo"));
    }
}
