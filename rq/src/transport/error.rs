//! Transport error classification

use std::time::Duration;
use thiserror::Error;

/// Errors a transport can report for a single dispatch
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransportError {
    #[error("Rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    #[error("API error {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid request: {0}")]
    Invalid(String),
}

impl TransportError {
    /// Check if this is a rate limit rejection
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, TransportError::RateLimited { .. })
    }

    /// Server-suggested delay, if this is a rate limit rejection that carried one
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            TransportError::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        TransportError::Network(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_rate_limit() {
        let err = TransportError::RateLimited {
            retry_after: Some(Duration::from_secs(2)),
        };
        assert!(err.is_rate_limit());

        let err = TransportError::Status {
            status: 500,
            message: "Server error".to_string(),
        };
        assert!(!err.is_rate_limit());
        assert!(!TransportError::Network("connection reset".to_string()).is_rate_limit());
    }

    #[test]
    fn test_retry_after() {
        let err = TransportError::RateLimited {
            retry_after: Some(Duration::from_secs(42)),
        };
        assert_eq!(err.retry_after(), Some(Duration::from_secs(42)));

        let err = TransportError::RateLimited { retry_after: None };
        assert_eq!(err.retry_after(), None);

        let err = TransportError::Status {
            status: 503,
            message: "Unavailable".to_string(),
        };
        assert_eq!(err.retry_after(), None);
    }

    #[test]
    fn test_display() {
        let err = TransportError::Status {
            status: 404,
            message: "Not found".to_string(),
        };
        assert_eq!(err.to_string(), "API error 404: Not found");
    }
}
