//! Configuration management for court-booker
//!
//! Settings come from the process environment, optionally seeded from a
//! `.env` file that overrides already-set variables. Required settings have
//! no defaults: a missing or malformed value fails startup.

pub mod venues;

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::error::{Error, Result};

pub use venues::{PlatformProfile, VenueId};

/// Account identity used to log in
#[derive(Clone)]
pub struct AccountConfig {
    /// Login ID (`loginid` form field)
    pub login_id: String,

    /// Password (`loginpw` form field)
    pub password: String,
}

impl fmt::Debug for AccountConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccountConfig")
            .field("login_id", &self.login_id)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Login loop settings
#[derive(Debug, Clone)]
pub struct LoginConfig {
    /// Maximum number of captcha/login iterations
    pub retry_times: u32,
}

/// Longest accepted spacing between attempts of one target, in seconds
pub const MAX_RETRY_INTERVAL_SECS: f64 = 3600.0;

/// Reservation fan-out settings
#[derive(Debug, Clone)]
pub struct AppointmentConfig {
    /// Number of staggered attempts per target
    pub retry_times: u32,

    /// Spacing between consecutive attempts of one target, in seconds
    pub retry_interval_secs: f64,
}

impl AppointmentConfig {
    /// Get the retry interval as Duration
    ///
    /// Out-of-range values are clamped; [`Config::validate`] rejects them first.
    pub fn retry_interval(&self) -> Duration {
        let secs = if self.retry_interval_secs.is_nan() {
            0.0
        } else {
            self.retry_interval_secs.clamp(0.0, MAX_RETRY_INTERVAL_SECS)
        };
        Duration::from_secs_f64(secs)
    }
}

/// Notification channel credential
#[derive(Clone)]
pub struct NotifyConfig {
    /// LINE Notify personal access token
    pub line_token: String,
}

impl fmt::Debug for NotifyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotifyConfig")
            .field("line_token", &"<redacted>")
            .finish()
    }
}

/// HTTP client settings
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Request timeout in seconds
    pub request_timeout_secs: u64,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: String,
}

impl LoggingConfig {
    /// Read `COURT_BOOKER_LOG_LEVEL` / `COURT_BOOKER_LOG_FORMAT`
    pub fn from_env() -> Self {
        Self::from_lookup(&|key: &str| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: &F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            level: lookup("COURT_BOOKER_LOG_LEVEL").unwrap_or_else(|| String::from("info")),
            format: lookup("COURT_BOOKER_LOG_FORMAT").unwrap_or_else(|| String::from("text")),
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone)]
pub struct Config {
    pub account: AccountConfig,
    pub login: LoginConfig,
    pub appointment: AppointmentConfig,
    pub notify: NotifyConfig,
    pub http: HttpConfig,
    pub logging: LoggingConfig,

    /// Venue used when the CLI does not name one (`APPOINT_PLACE`)
    pub default_venue: Option<VenueId>,
}

impl Config {
    /// Load `.env` (if any) with override semantics, then read the environment
    pub fn load(env_file: Option<&Path>) -> Result<Self> {
        load_env_file(env_file)?;
        Self::from_env()
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let account = AccountConfig {
            login_id: required(&lookup, "ACCOUNT_ID")?,
            password: required(&lookup, "ACCOUNT_PASSWORD")?,
        };

        let login = LoginConfig {
            retry_times: required_parse(&lookup, "LOGIN_RETRY_TIMES")?,
        };

        let appointment = AppointmentConfig {
            retry_times: required_parse(&lookup, "APPOINT_RETRY_TIMES")?,
            retry_interval_secs: required_parse(&lookup, "APPOINT_RETRY_INTERVAL_SECONDS")?,
        };

        let notify = NotifyConfig {
            line_token: required(&lookup, "LINE_NOTIFY_TOKEN")?,
        };

        let request_timeout_secs = optional_parse(&lookup, "COURT_BOOKER_REQUEST_TIMEOUT")?
            .unwrap_or(30);

        let logging = LoggingConfig::from_lookup(&lookup);

        let default_venue = match lookup("APPOINT_PLACE").filter(|v| !v.trim().is_empty()) {
            Some(place) => Some(place.parse::<VenueId>()?),
            None => None,
        };

        let config = Self {
            account,
            login,
            appointment,
            notify,
            http: HttpConfig {
                request_timeout_secs,
            },
            logging,
            default_venue,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.login.retry_times == 0 {
            return Err(Error::config("LOGIN_RETRY_TIMES must be greater than 0"));
        }

        if self.appointment.retry_times == 0 {
            return Err(Error::config("APPOINT_RETRY_TIMES must be greater than 0"));
        }

        let interval_secs = self.appointment.retry_interval_secs;
        let interval = Duration::try_from_secs_f64(interval_secs)
            .ok()
            .filter(|_| interval_secs <= MAX_RETRY_INTERVAL_SECS)
            .ok_or_else(|| {
                Error::config(format!(
                    "APPOINT_RETRY_INTERVAL_SECONDS must be between 0 and {MAX_RETRY_INTERVAL_SECS}"
                ))
            })?;

        if interval.checked_mul(self.appointment.retry_times).is_none() {
            return Err(Error::config(
                "APPOINT_RETRY_INTERVAL_SECONDS x APPOINT_RETRY_TIMES is out of range",
            ));
        }

        if self.http.request_timeout_secs == 0 {
            return Err(Error::config(
                "COURT_BOOKER_REQUEST_TIMEOUT must be greater than 0",
            ));
        }

        venues::validate_all()
    }

    /// Get request timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.http.request_timeout_secs)
    }

    /// Resolve the venue to operate on: explicit choice first, then `APPOINT_PLACE`
    pub fn resolve_venue(&self, explicit: Option<&str>) -> Result<VenueId> {
        match explicit {
            Some(name) => name.parse(),
            None => self.default_venue.ok_or_else(|| {
                Error::config("No venue selected: pass --place or set APPOINT_PLACE")
            }),
        }
    }
}

/// Load an env file into the process environment, overriding existing values
///
/// An explicit `env_file` must exist; without one, the nearest `.env` in the
/// working directory or its ancestors is used when present. Returns the path
/// that was loaded, so the same file can be written back to.
pub fn load_env_file(env_file: Option<&Path>) -> Result<Option<PathBuf>> {
    match env_file {
        Some(path) => {
            dotenvy::from_path_override(path).map_err(|e| {
                Error::config(format!("Failed to load env file {}: {e}", path.display()))
            })?;
            Ok(Some(path.to_path_buf()))
        }
        None => match dotenvy::dotenv_override() {
            Ok(path) => Ok(Some(path)),
            Err(e) if e.not_found() => Ok(None),
            Err(e) => Err(Error::config(format!("Failed to load .env: {e}"))),
        },
    }
}

fn required<F>(lookup: &F, key: &str) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| Error::config(format!("{key} is not set")))
}

fn required_parse<F, T>(lookup: &F, key: &str) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: fmt::Display,
{
    let raw = required(lookup, key)?;
    raw.trim()
        .parse::<T>()
        .map_err(|e| Error::config(format!("{key}='{raw}' is invalid: {e}")))
}

fn optional_parse<F, T>(lookup: &F, key: &str) -> Result<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: fmt::Display,
{
    match lookup(key).filter(|v| !v.trim().is_empty()) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| Error::config(format!("{key}='{raw}' is invalid: {e}"))),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn base_env() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            ("ACCOUNT_ID", "A123456789"),
            ("ACCOUNT_PASSWORD", "secret"),
            ("LOGIN_RETRY_TIMES", "10"),
            ("APPOINT_RETRY_TIMES", "4"),
            ("APPOINT_RETRY_INTERVAL_SECONDS", "0.5"),
            ("LINE_NOTIFY_TOKEN", "line-token"),
        ])
    }

    fn load(env: &HashMap<&'static str, &'static str>) -> Result<Config> {
        Config::from_lookup(|key| env.get(key).map(|v| v.to_string()))
    }

    #[test]
    fn test_complete_env_loads() {
        let config = load(&base_env()).unwrap();
        assert_eq!(config.account.login_id, "A123456789");
        assert_eq!(config.login.retry_times, 10);
        assert_eq!(config.appointment.retry_times, 4);
        assert_eq!(
            config.appointment.retry_interval(),
            Duration::from_millis(500)
        );
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert!(config.default_venue.is_none());
    }

    #[test]
    fn test_missing_required_key_fails() {
        let mut env = base_env();
        env.remove("LOGIN_RETRY_TIMES");
        let err = load(&env).unwrap_err();
        assert!(err.to_string().contains("LOGIN_RETRY_TIMES"));
    }

    #[test]
    fn test_malformed_number_fails() {
        let mut env = base_env();
        env.insert("APPOINT_RETRY_TIMES", "four");
        assert!(load(&env).is_err());
    }

    #[test]
    fn test_zero_login_retries_rejected() {
        let mut env = base_env();
        env.insert("LOGIN_RETRY_TIMES", "0");
        assert!(load(&env).is_err());
    }

    #[test]
    fn test_out_of_range_interval_rejected() {
        for value in ["1e20", "-0.5", "NaN", "inf", "3600.5"] {
            let mut env = base_env();
            env.insert("APPOINT_RETRY_INTERVAL_SECONDS", value);
            let err = load(&env).unwrap_err();
            assert!(
                err.to_string().contains("APPOINT_RETRY_INTERVAL_SECONDS"),
                "{value} accepted"
            );
        }
    }

    #[test]
    fn test_interval_upper_bound_accepted() {
        let mut env = base_env();
        env.insert("APPOINT_RETRY_INTERVAL_SECONDS", "3600");
        env.insert("APPOINT_RETRY_TIMES", "4294967295");
        let config = load(&env).unwrap();
        assert_eq!(
            config.appointment.retry_interval(),
            Duration::from_secs(3600)
        );
    }

    #[test]
    fn test_retry_interval_clamps_unvalidated_values() {
        let appointment = AppointmentConfig {
            retry_times: 1,
            retry_interval_secs: 1e20,
        };
        assert_eq!(appointment.retry_interval(), Duration::from_secs(3600));

        let appointment = AppointmentConfig {
            retry_times: 1,
            retry_interval_secs: f64::NAN,
        };
        assert_eq!(appointment.retry_interval(), Duration::ZERO);
    }

    #[test]
    fn test_default_venue_from_env() {
        let mut env = base_env();
        env.insert("APPOINT_PLACE", "大同");
        let config = load(&env).unwrap();
        assert_eq!(config.resolve_venue(None).unwrap(), VenueId::DaTong);
        assert_eq!(
            config.resolve_venue(Some("Banqiao")).unwrap(),
            VenueId::Banqiao
        );
    }

    #[test]
    fn test_no_venue_anywhere_is_an_error() {
        let config = load(&base_env()).unwrap();
        assert!(config.resolve_venue(None).is_err());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = load(&base_env()).unwrap();
        let debug = format!("{config:?}");
        assert!(!debug.contains("secret"));
        assert!(!debug.contains("line-token"));
    }
}
