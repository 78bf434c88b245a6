//! Booking platform access
//!
//! Every venue runs the same ASP.NET booking site on its own host. This module
//! holds the raw network calls against one venue ([`PlatformClient`]), the
//! browser-like request headers, and the marker-based response classifiers.

pub mod classifier;
pub mod client;
pub mod headers;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::NaiveDate;

use crate::config::AccountConfig;
use crate::utils::error::TransportError;

pub use classifier::{MarkerClassifier, MarkerPolarity, ResponseClassifier};
pub use client::HttpPlatformClient;

/// A captcha image together with the session cookie issued alongside it
#[derive(Debug, Clone)]
pub struct CaptchaResponse {
    /// Raw image bytes
    pub image: Bytes,
    /// `name=value` pairs from `Set-Cookie`, if the server issued any
    pub session_token: Option<String>,
}

/// Raw network calls for one venue
///
/// Implementations are stateless apart from their base URL; the session token
/// is passed in explicitly on every call.
#[async_trait]
pub trait PlatformClient: Send + Sync {
    /// Fetch a fresh captcha image
    async fn fetch_captcha_image(&self) -> Result<CaptchaResponse, TransportError>;

    /// Submit the login form and return the response body
    async fn submit_login(
        &self,
        token: &str,
        credentials: &AccountConfig,
        captcha_text: &str,
    ) -> Result<String, TransportError>;

    /// Request one reservation and return the response body
    async fn submit_reservation(
        &self,
        token: &str,
        date: NaiveDate,
        start_hour: u32,
        court: &str,
    ) -> Result<String, TransportError>;
}
