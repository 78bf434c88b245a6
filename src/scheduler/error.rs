//! Error types for appointment plans

use std::fmt;

/// Result type for plan operations
pub type PlanResult<T> = Result<T, PlanError>;

/// Problems with an appointment plan or start gate
#[derive(Debug)]
pub enum PlanError {
    /// Start hour outside 0-23
    InvalidHour { hour: u32 },

    /// Court identifier that cannot be placed in a query string
    InvalidCourt { court: String },

    /// `--target` value not in `HH:COURT` form
    InvalidTarget { input: String },

    /// Date not in `YYYY-MM-DD` or `YYYY/MM/DD` form
    InvalidDate { input: String },

    /// Start gate not in `HH:MM` or `HH:MM:SS` form
    InvalidTime { input: String },

    /// Plan with no slots
    EmptyPlan,

    /// Plan file could not be read or parsed
    PlanFile { path: String, reason: String },
}

impl fmt::Display for PlanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidHour { hour } => {
                write!(f, "Invalid start hour '{}'. Must be 0-23", hour)
            }
            Self::InvalidCourt { court } => {
                write!(
                    f,
                    "Invalid court '{}'. Expected letters and digits only",
                    court
                )
            }
            Self::InvalidTarget { input } => {
                write!(f, "Invalid target '{}'. Expected HH:COURT, e.g. 16:1112", input)
            }
            Self::InvalidDate { input } => {
                write!(f, "Invalid date '{}'. Expected YYYY-MM-DD", input)
            }
            Self::InvalidTime { input } => {
                write!(f, "Invalid time '{}'. Expected HH:MM or HH:MM:SS", input)
            }
            Self::EmptyPlan => {
                write!(f, "Appointment plan has no slots")
            }
            Self::PlanFile { path, reason } => {
                write!(f, "Failed to load plan file '{}': {}", path, reason)
            }
        }
    }
}

impl std::error::Error for PlanError {}

impl From<PlanError> for crate::error::Error {
    fn from(err: PlanError) -> Self {
        crate::error::Error::Config(err.to_string())
    }
}

impl PlanError {
    /// Create an invalid hour error
    pub fn invalid_hour(hour: u32) -> Self {
        Self::InvalidHour { hour }
    }

    /// Create a plan file error
    pub fn plan_file(path: impl Into<String>, reason: impl fmt::Display) -> Self {
        Self::PlanFile {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}
