//! reqwest-backed [`PlatformClient`]
//!
//! Booking pages are served as UTF-8 by most venues, but some older hosts
//! still answer in Big5 without declaring it; bodies are decoded with a Big5
//! fallback so the marker checks see real text.

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use encoding_rs::{BIG5, UTF_8};
use reqwest::{header::CONTENT_TYPE, Client, Response};

use super::headers::{build_browser_headers, random_user_agent, session_token_from_headers};
use super::{CaptchaResponse, PlatformClient};
use crate::config::venues::{PlatformProfile, CAPTCHA_URI};
use crate::config::AccountConfig;
use crate::utils::error::TransportError;

/// HTTP client for one venue's booking site
pub struct HttpPlatformClient {
    /// HTTP client with configured timeout and compression
    client: Client,

    /// Venue this client talks to
    profile: &'static PlatformProfile,

    /// Scheme and host requests go to; the profile's host unless overridden
    base_url: String,
}

impl HttpPlatformClient {
    /// Create a client for `profile`
    ///
    /// # Errors
    ///
    /// Returns `TransportError::Http` if the HTTP client cannot be created
    pub fn new(profile: &'static PlatformProfile, timeout: Duration) -> Result<Self, TransportError> {
        Self::with_base_url(profile, profile.host_url, timeout)
    }

    /// Create a client that sends requests to `base_url` instead of the venue host
    ///
    /// Used to point the client at a mock server.
    pub fn with_base_url(
        profile: &'static PlatformProfile,
        base_url: &str,
        timeout: Duration,
    ) -> Result<Self, TransportError> {
        url::Url::parse(base_url)
            .map_err(|e| TransportError::InvalidUrl(format!("{base_url}: {e}")))?;

        // No cookie jar: the session cookie travels explicitly
        let client = Client::builder().timeout(timeout).gzip(true).build()?;

        Ok(Self {
            client,
            profile,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn profile(&self) -> &'static PlatformProfile {
        self.profile
    }

    /// `{base}/NewCaptcha.aspx`
    pub fn captcha_url(&self) -> String {
        format!("{}/{CAPTCHA_URI}", self.base_url)
    }

    /// `{base}/{place_uri}`
    pub fn place_url(&self) -> String {
        format!("{}/{}", self.base_url, self.profile.place_uri)
    }

    /// Login endpoint
    pub fn login_url(&self) -> String {
        format!("{}?Module=login_page&files=login", self.place_url())
    }

    /// Reservation endpoint for one slot
    pub fn reservation_url(&self, date: NaiveDate, start_hour: u32, court: &str) -> String {
        format!(
            "{}?module=net_booking&files=booking_place&StepFlag=25&QPid={court}&QTime={start_hour}&PT=1&D={}",
            self.place_url(),
            date.format("%Y/%m/%d")
        )
    }

    fn check_status(response: &Response) -> Result<(), TransportError> {
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(TransportError::Status(status.as_u16()))
        }
    }

    async fn read_body(response: Response) -> Result<String, TransportError> {
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string())
            .unwrap_or_default();

        let bytes = response.bytes().await.map_err(TransportError::from_reqwest)?;

        decode_bytes(&bytes, &content_type)
    }
}

/// Decode a response body, honoring a declared charset and falling back to Big5
pub fn decode_bytes(bytes: &[u8], content_type: &str) -> Result<String, TransportError> {
    let content_type = content_type.to_lowercase();

    if content_type.contains("charset=big5") {
        return decode_with(bytes, BIG5);
    }

    if let Ok(text) = decode_with(bytes, UTF_8) {
        return Ok(text);
    }

    decode_with(bytes, BIG5)
        .map_err(|_| TransportError::Decode("Failed to decode body as UTF-8 or Big5".to_string()))
}

fn decode_with(
    bytes: &[u8],
    encoding: &'static encoding_rs::Encoding,
) -> Result<String, TransportError> {
    let (cow, _encoding, had_errors) = encoding.decode(bytes);

    if had_errors {
        return Err(TransportError::Decode(format!(
            "{} decoding errors",
            encoding.name()
        )));
    }

    Ok(cow.into_owned())
}

#[async_trait]
impl PlatformClient for HttpPlatformClient {
    async fn fetch_captcha_image(&self) -> Result<CaptchaResponse, TransportError> {
        let url = self.captcha_url();
        let headers = build_browser_headers(random_user_agent(), &self.place_url(), None);

        tracing::debug!(url = %url, "Fetching captcha");

        let response = self
            .client
            .get(&url)
            .headers(headers)
            .send()
            .await
            .map_err(TransportError::from_reqwest)?;

        Self::check_status(&response)?;

        let session_token = session_token_from_headers(response.headers());
        let image = response.bytes().await.map_err(TransportError::from_reqwest)?;

        Ok(CaptchaResponse {
            image,
            session_token,
        })
    }

    async fn submit_login(
        &self,
        token: &str,
        credentials: &AccountConfig,
        captcha_text: &str,
    ) -> Result<String, TransportError> {
        let url = self.login_url();
        let headers = build_browser_headers(random_user_agent(), &self.place_url(), Some(token));

        let form = [
            ("loginid", credentials.login_id.as_str()),
            ("loginpw", credentials.password.as_str()),
            ("Captcha_text", captcha_text),
        ];

        tracing::debug!(url = %url, login_id = %credentials.login_id, "Submitting login");

        let response = self
            .client
            .post(&url)
            .headers(headers)
            .form(&form)
            .send()
            .await
            .map_err(TransportError::from_reqwest)?;

        Self::check_status(&response)?;
        Self::read_body(response).await
    }

    async fn submit_reservation(
        &self,
        token: &str,
        date: NaiveDate,
        start_hour: u32,
        court: &str,
    ) -> Result<String, TransportError> {
        let url = self.reservation_url(date, start_hour, court);
        let headers = build_browser_headers(random_user_agent(), &self.place_url(), Some(token));

        tracing::debug!(url = %url, "Submitting reservation");

        let response = self
            .client
            .get(&url)
            .headers(headers)
            .send()
            .await
            .map_err(TransportError::from_reqwest)?;

        Self::check_status(&response)?;
        Self::read_body(response).await
    }
}
