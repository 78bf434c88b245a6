//! court-booker - session setup and scheduled reservations for sports-center booking sites
//!
//! Taipei-area sports centers share one ASP.NET booking site. Booking needs a
//! logged-in session, and logging in needs a numeric captcha read off an image.
//! This crate solves the captcha, keeps the session, and fires a burst of
//! staggered reservation requests when a slot opens.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - [`config`] - Environment configuration and the venue table
//! - [`platform`] - Raw HTTP calls against a venue and response classification
//! - [`captcha`] - OCR of captcha images
//! - [`session`] - Login state machine and session persistence
//! - [`scheduler`] - Appointment plans and the reservation fan-out
//! - [`notifications`] - Operator notifications (LINE Notify)
//! - [`availability`] - Availability lookup through the Sporetrofit app service
//! - [`utils`] - Common utilities and helpers
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use court_booker::captcha::{CaptchaSolver, TesseractEngine};
//! use court_booker::config::{Config, VenueId};
//! use court_booker::notifications::LineNotifyChannel;
//! use court_booker::platform::HttpPlatformClient;
//! use court_booker::session::{EnvFileSessionStore, SessionManager};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load(None)?;
//!     let venue = VenueId::DaTong;
//!
//!     let client = Arc::new(HttpPlatformClient::new(venue.profile(), config.request_timeout())?);
//!     let notifier = Arc::new(LineNotifyChannel::from_token(&config.notify.line_token)?);
//!     let manager = SessionManager::new(
//!         venue,
//!         client,
//!         CaptchaSolver::new(Arc::new(TesseractEngine::new())),
//!         notifier,
//!         Arc::new(EnvFileSessionStore::new(".env")),
//!         config.account.clone(),
//!         config.login.retry_times,
//!     );
//!
//!     let session = manager.restore().await?;
//!     println!("session for {}", session.venue);
//!     Ok(())
//! }
//! ```

pub mod availability;
pub mod captcha;
pub mod config;
pub mod error;
pub mod notifications;
pub mod platform;
pub mod scheduler;
pub mod session;
pub mod utils;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::{Config, PlatformProfile, VenueId};
    pub use crate::error::{BookerErrorTrait, Error, ErrorCategory, Result};
    pub use crate::notifications::Notifier;
    pub use crate::platform::PlatformClient;
    pub use crate::scheduler::{AppointmentPlan, AppointmentScheduler, ReservationTarget, RunReport};
    pub use crate::session::{Session, SessionManager, SessionStore};
}

// Direct re-exports for convenience
pub use scheduler::{AttemptOutcome, RunReport};
pub use session::Session;
