use serde::Serialize;

/// Failure taxonomy for an analysis attempt.
///
/// `Network` and `Server` are transient and eligible for retry; the rest
/// terminate a run on their first occurrence. `Cancelled` is internal: the
/// engine swallows it instead of publishing it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize)]
pub enum AnalysisError {
    /// The service judged the content unacceptable, or it was rejected
    /// client-side before sending (for example an oversized payload).
    #[error("validation failed: {0}")]
    Validation(String),
    /// Connectivity failure or timeout before a response arrived.
    #[error("network error: {0}")]
    Network(String),
    /// The service answered with a 5xx status.
    #[error("server error ({status}): {message}")]
    Server { status: u16, message: String },
    /// Transport succeeded but the payload does not match the contract.
    #[error("protocol violation: {0}")]
    Protocol(String),
    /// The request was abandoned before completion.
    #[error("cancelled")]
    Cancelled,
}

impl AnalysisError {
    /// True for failures worth retrying (transient transport conditions).
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Server { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::AnalysisError;

    #[test]
    fn only_network_and_server_failures_are_retryable() {
        assert!(AnalysisError::Network("connection reset".into()).is_retryable());
        assert!(AnalysisError::Server {
            status: 503,
            message: "unavailable".into()
        }
        .is_retryable());

        assert!(!AnalysisError::Validation("too large".into()).is_retryable());
        assert!(!AnalysisError::Protocol("missing metrics".into()).is_retryable());
        assert!(!AnalysisError::Cancelled.is_retryable());
    }

    #[test]
    fn display_includes_kind_and_detail() {
        let err = AnalysisError::Server {
            status: 502,
            message: "bad gateway".into(),
        };
        assert_eq!(err.to_string(), "server error (502): bad gateway");
        assert_eq!(
            AnalysisError::Protocol("missing field".into()).to_string(),
            "protocol violation: missing field"
        );
    }
}
