pub mod appoint;
pub mod query;
pub mod setup;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};

use court_booker::captcha::{CaptchaSolver, TesseractEngine};
use court_booker::config::{Config, VenueId};
use court_booker::error::Error;
use court_booker::notifications::{notify_best_effort, LineNotifyChannel, Notifier};
use court_booker::platform::HttpPlatformClient;
use court_booker::session::{EnvFileSessionStore, SessionManager};

// Re-export command functions for convenience
pub use appoint::{start_appoint, AppointParams};
pub use query::{query_availability, QueryTarget};
pub use setup::appoint_setup;

/// Everything a booking command needs for one venue
pub struct BookingContext {
    pub config: Config,
    pub venue: VenueId,
    pub client: Arc<HttpPlatformClient>,
    pub notifier: Arc<dyn Notifier>,
    pub store: Arc<EnvFileSessionStore>,
}

impl BookingContext {
    pub fn build(place: Option<&str>, env_file: &Path) -> Result<Self> {
        let config = Config::from_env().context("Invalid configuration")?;
        let venue = config.resolve_venue(place)?;

        tracing::info!(
            venue = %venue,
            host = venue.profile().host_url,
            "Starting with the {} platform",
            venue
        );

        let client = HttpPlatformClient::new(venue.profile(), config.request_timeout())
            .context("Failed to create booking site client")?;
        let notifier = LineNotifyChannel::from_token(config.notify.line_token.clone())
            .context("Failed to create LINE Notify channel")?;

        Ok(Self {
            venue,
            client: Arc::new(client),
            notifier: Arc::new(notifier),
            store: Arc::new(EnvFileSessionStore::new(env_file)),
            config,
        })
    }

    pub fn session_manager(&self) -> SessionManager {
        SessionManager::new(
            self.venue,
            self.client.clone(),
            CaptchaSolver::new(Arc::new(TesseractEngine::new())),
            self.notifier.clone(),
            self.store.clone(),
            self.config.account.clone(),
            self.config.login.retry_times,
        )
    }

    /// Tell the operator about a fatal error unless it was already reported
    pub async fn report_fatal(&self, err: &anyhow::Error) {
        let already_notified = matches!(
            err.downcast_ref::<Error>(),
            Some(Error::RetriesExhausted { .. })
        );
        if !already_notified {
            let message = format!("court-booker ({}) stopped: {err:#}", self.venue);
            notify_best_effort(self.notifier.as_ref(), &message).await;
        }
    }
}
