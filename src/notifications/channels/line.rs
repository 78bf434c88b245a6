//! LINE Notify channel
//!
//! Posts `message=<text>` to the LINE Notify API with a personal access token.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use super::{ChannelError, ChannelResult, DeliveryStatus, Notifier};

/// Default LINE Notify API endpoint
pub const LINE_NOTIFY_URL: &str = "https://notify-api.line.me/api/notify";

/// LINE Notify channel configuration
#[derive(Debug, Clone)]
pub struct LineNotifyConfig {
    /// API endpoint (overridable for tests)
    pub url: String,
    /// Personal access token, sent as Bearer token
    pub token: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Maximum retry attempts on server-side failure
    pub max_retries: u32,
}

impl LineNotifyConfig {
    /// Create a new configuration for the public endpoint
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            url: LINE_NOTIFY_URL.to_string(),
            token: token.into(),
            timeout_secs: 10,
            max_retries: 2,
        }
    }

    /// Point at a different endpoint
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Set request timeout
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Set max retries
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.token.trim().is_empty() {
            return Err("LINE Notify token cannot be empty".to_string());
        }

        if !self.url.starts_with("http://") && !self.url.starts_with("https://") {
            return Err("LINE Notify URL must start with http:// or https://".to_string());
        }

        if self.timeout_secs == 0 {
            return Err("Timeout must be greater than 0".to_string());
        }

        Ok(())
    }
}

/// LINE Notify channel
pub struct LineNotifyChannel {
    config: LineNotifyConfig,
    client: Client,
}

impl LineNotifyChannel {
    /// Create a new LINE Notify channel
    pub fn new(config: LineNotifyConfig) -> ChannelResult<Self> {
        config.validate().map_err(ChannelError::InvalidConfig)?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ChannelError::Other(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { config, client })
    }

    /// Create a channel for the public endpoint from just a token
    pub fn from_token(token: impl Into<String>) -> ChannelResult<Self> {
        Self::new(LineNotifyConfig::new(token))
    }

    /// Post the message, retrying server errors with exponential backoff
    ///
    /// Returns the final HTTP status code.
    async fn send_with_retry(&self, message: &str) -> ChannelResult<u16> {
        let mut last_error = None;

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                let delay = Duration::from_secs(2_u64.pow(attempt - 1));
                tokio::time::sleep(delay).await;
                tracing::debug!(
                    "Retrying LINE Notify request (attempt {}/{})",
                    attempt + 1,
                    self.config.max_retries + 1
                );
            }

            let request = self
                .client
                .post(&self.config.url)
                .bearer_auth(&self.config.token)
                .form(&[("message", message)]);

            match request.send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return Ok(status.as_u16());
                    }

                    let body = response
                        .text()
                        .await
                        .unwrap_or_else(|_| "Unable to read response body".to_string());

                    if status.as_u16() == 429 {
                        return Err(ChannelError::RateLimited(body));
                    }

                    last_error = Some(ChannelError::Other(format!("HTTP {status}: {body}")));

                    // Don't retry on client errors (4xx)
                    if status.is_client_error() {
                        break;
                    }
                }
                Err(e) => {
                    last_error = Some(ChannelError::HttpError(e));
                }
            }
        }

        Err(last_error.unwrap_or_else(|| ChannelError::Other("Unknown error".to_string())))
    }
}

#[async_trait]
impl Notifier for LineNotifyChannel {
    fn name(&self) -> &str {
        "line"
    }

    async fn send(&self, message: &str) -> ChannelResult<DeliveryStatus> {
        match self.send_with_retry(message).await {
            Ok(code) => {
                tracing::debug!(status = code, "LINE notification delivered");
                Ok(DeliveryStatus::success(self.name(), code))
            }
            Err(e) => {
                tracing::error!("Failed to deliver LINE notification: {}", e);
                let code = match &e {
                    ChannelError::RateLimited(_) => Some(429),
                    ChannelError::HttpError(err) => err.status().map(|s| s.as_u16()),
                    _ => None,
                };
                Ok(DeliveryStatus::failure(self.name(), code, e.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_config_validation() {
        assert!(LineNotifyConfig::new("token").validate().is_ok());
        assert!(LineNotifyConfig::new("  ").validate().is_err());
        assert!(LineNotifyConfig::new("token")
            .with_url("notify-api.line.me")
            .validate()
            .is_err());
        assert!(LineNotifyConfig::new("token")
            .with_timeout(0)
            .validate()
            .is_err());
    }

    #[test]
    fn test_line_config_builder() {
        let config = LineNotifyConfig::new("token")
            .with_url("http://localhost:9000/api/notify")
            .with_timeout(3)
            .with_max_retries(0);

        assert_eq!(config.url, "http://localhost:9000/api/notify");
        assert_eq!(config.timeout_secs, 3);
        assert_eq!(config.max_retries, 0);
    }

    #[test]
    fn test_from_token() {
        let channel = LineNotifyChannel::from_token("token").unwrap();
        assert_eq!(channel.name(), "line");
        assert!(LineNotifyChannel::from_token("").is_err());
    }
}
