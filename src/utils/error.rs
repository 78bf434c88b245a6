//! Transport-level error types
//!
//! Everything that can go wrong between us and a remote booking host before a
//! response body is available for classification.

use thiserror::Error;

/// Errors that can occur while talking HTTP to a booking platform
#[derive(Error, Debug)]
pub enum TransportError {
    /// HTTP request error
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Remote answered with a non-success status
    #[error("Unexpected HTTP status: {0}")]
    Status(u16),

    /// Request timeout
    #[error("Request timeout")]
    Timeout,

    /// Content decoding error
    #[error("Decoding error: {0}")]
    Decode(String),

    /// Invalid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Response body did not have the expected envelope
    #[error("Malformed response: {0}")]
    Malformed(String),
}

impl TransportError {
    /// Map a reqwest error, keeping timeouts distinguishable
    pub fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::Http(err)
        }
    }

    /// Whether repeating the same request might succeed
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Http(_) | Self::Timeout => true,
            Self::Status(code) => matches!(code, 429 | 500 | 502 | 503 | 504),
            Self::Decode(_) | Self::InvalidUrl(_) | Self::Malformed(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_recoverability() {
        assert!(TransportError::Status(503).is_recoverable());
        assert!(TransportError::Status(429).is_recoverable());
        assert!(!TransportError::Status(404).is_recoverable());
        assert!(TransportError::Timeout.is_recoverable());
    }

    #[test]
    fn test_display() {
        let err = TransportError::Status(500);
        assert_eq!(err.to_string(), "Unexpected HTTP status: 500");
    }
}
