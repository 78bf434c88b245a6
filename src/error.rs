//! Unified error handling for the court-booker crate
//!
//! This module provides a unified error type covering the whole booking flow,
//! from captcha fetching through login to the reservation attempts.
//!
//! # Architecture
//!
//! - [`BookerErrorTrait`] - Common interface for recoverability and classification
//! - [`ErrorCategory`] - Classification of errors for handling strategies
//! - [`Error`] - Unified error enum
//!
//! The login loop in [`crate::session::SessionManager`] swallows every
//! recoverable variant and only lets [`Error::RetriesExhausted`] escape.

use std::io;
use thiserror::Error;

pub use crate::notifications::channels::ChannelError;
pub use crate::utils::error::TransportError;

/// Common trait for court-booker error types
pub trait BookerErrorTrait: std::error::Error {
    /// Check if this error is recoverable (can be retried)
    fn is_recoverable(&self) -> bool;

    /// Get the error category for handling strategies
    fn category(&self) -> ErrorCategory;
}

/// Classification of errors for handling strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Network-related errors (HTTP, timeout, bad status)
    Network,
    /// Captcha recognition errors
    Captcha,
    /// Login and session errors
    Authentication,
    /// Reservation attempt errors
    Reservation,
    /// Storage and I/O errors
    Storage,
    /// Configuration and validation errors
    Config,
    /// Notification delivery errors
    Notification,
    /// Other/unknown errors
    Other,
}

impl ErrorCategory {
    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Captcha => "captcha",
            Self::Authentication => "authentication",
            Self::Reservation => "reservation",
            Self::Storage => "storage",
            Self::Config => "config",
            Self::Notification => "notification",
            Self::Other => "other",
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Unified error type for the court-booker crate
#[derive(Error, Debug)]
pub enum Error {
    /// Network/HTTP-layer failure
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// OCR produced no digits, or fewer than the required count
    #[error("Captcha unreadable (recognized: {})", recognized.as_deref().unwrap_or("nothing"))]
    CaptchaUnreadable { recognized: Option<String> },

    /// The OCR engine itself could not be run
    #[error("OCR engine failed: {0}")]
    Ocr(String),

    /// Login response carried the failure marker
    #[error("Credentials rejected: response contained '{marker}'")]
    CredentialRejected { marker: String },

    /// No session cookie was issued with the captcha response
    #[error("No session token in captcha response")]
    SessionUnavailable,

    /// Login loop gave up
    #[error("Login for {attempts} times but still failed")]
    RetriesExhausted { attempts: u32 },

    /// A single reservation attempt did not succeed
    #[error("Reservation of court {court} on {date} {start_hour}:00 failed: {reason}")]
    ReservationFailed {
        court: String,
        date: String,
        start_hour: u32,
        reason: String,
    },

    /// Reading or writing persisted session state failed
    #[error("Failed to persist '{key}': {reason}")]
    Persist { key: String, reason: String },

    /// Notification channel errors
    #[error("Notification error: {0}")]
    Notify(#[from] ChannelError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration errors
    #[error("Config error: {0}")]
    Config(String),

    /// Generic error with context
    #[error("{context}")]
    Other {
        context: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl BookerErrorTrait for Error {
    fn is_recoverable(&self) -> bool {
        match self {
            // Any transport failure during login costs one iteration and moves on
            Self::Transport(_) => true,
            Self::CaptchaUnreadable { .. } => true,
            Self::Ocr(_) => true,
            Self::CredentialRejected { .. } => true,
            Self::SessionUnavailable => true,
            Self::RetriesExhausted { .. } => false,
            Self::ReservationFailed { .. } => false,
            Self::Persist { .. } => false,
            Self::Notify(_) => false,
            Self::Io(_) => false,
            Self::Json(_) => false,
            Self::Config(_) => false,
            Self::Other { .. } => false,
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Transport(_) => ErrorCategory::Network,
            Self::CaptchaUnreadable { .. } | Self::Ocr(_) => ErrorCategory::Captcha,
            Self::CredentialRejected { .. }
            | Self::SessionUnavailable
            | Self::RetriesExhausted { .. } => ErrorCategory::Authentication,
            Self::ReservationFailed { .. } => ErrorCategory::Reservation,
            Self::Persist { .. } | Self::Io(_) => ErrorCategory::Storage,
            Self::Json(_) => ErrorCategory::Other,
            Self::Notify(_) => ErrorCategory::Notification,
            Self::Config(_) => ErrorCategory::Config,
            Self::Other { .. } => ErrorCategory::Other,
        }
    }
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a persistence error
    pub fn persist(key: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::Persist {
            key: key.into(),
            reason: reason.to_string(),
        }
    }

    /// Create a generic error with context
    pub fn other(context: impl Into<String>) -> Self {
        Self::Other {
            context: context.into(),
            source: None,
        }
    }

    /// Create a generic error with context and source
    pub fn with_source(
        context: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Other {
            context: context.into(),
            source: Some(Box::new(source)),
        }
    }
}

/// Result type alias using the unified Error type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_category() {
        let err = Error::Transport(TransportError::Timeout);
        assert_eq!(err.category(), ErrorCategory::Network);

        let err = Error::CaptchaUnreadable { recognized: None };
        assert_eq!(err.category(), ErrorCategory::Captcha);

        let err = Error::SessionUnavailable;
        assert_eq!(err.category(), ErrorCategory::Authentication);
    }

    #[test]
    fn test_login_loop_kinds_are_recoverable() {
        assert!(Error::Transport(TransportError::Status(404)).is_recoverable());
        assert!(Error::CaptchaUnreadable {
            recognized: Some("123".to_string())
        }
        .is_recoverable());
        assert!(Error::CredentialRejected {
            marker: "驗證碼錯誤".to_string()
        }
        .is_recoverable());
        assert!(Error::SessionUnavailable.is_recoverable());
    }

    #[test]
    fn test_terminal_kinds_are_not_recoverable() {
        assert!(!Error::RetriesExhausted { attempts: 3 }.is_recoverable());
        assert!(!Error::ReservationFailed {
            court: "1112".to_string(),
            date: "2022/08/20".to_string(),
            start_hour: 16,
            reason: "no marker".to_string(),
        }
        .is_recoverable());
        assert!(!Error::config("missing ACCOUNT_ID").is_recoverable());
    }

    #[test]
    fn test_retries_exhausted_message() {
        let err = Error::RetriesExhausted { attempts: 5 };
        assert_eq!(err.to_string(), "Login for 5 times but still failed");
    }

    #[test]
    fn test_captcha_unreadable_message() {
        let err = Error::CaptchaUnreadable { recognized: None };
        assert!(err.to_string().contains("nothing"));

        let err = Error::CaptchaUnreadable {
            recognized: Some("12".to_string()),
        };
        assert!(err.to_string().contains("12"));
    }

    #[test]
    fn test_error_conversion() {
        let unified: Error = TransportError::Timeout.into();
        assert!(matches!(unified, Error::Transport(_)));
    }
}
