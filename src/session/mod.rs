//! Session acquisition
//!
//! A session is the cookie the booking site issues together with a captcha
//! image. It only becomes usable once a login carrying the correctly read
//! captcha has been accepted. [`SessionManager`] drives that loop:
//!
//! ```text
//!   NoSession ──► AwaitingCaptcha ──► CaptchaSolved ──► AwaitingLoginResult
//!       ▲                │                  │                    │
//!       └────────────────┴──── failure ─────┴────────────────────┤
//!                                                                ▼
//!                       Exhausted ◄── retries used up     SessionEstablished
//! ```
//!
//! Every failed iteration costs one retry. Only exhaustion is reported to the
//! operator.

pub mod store;

use std::fmt;
use std::sync::Arc;

use crate::captcha::CaptchaSolver;
use crate::config::{AccountConfig, VenueId};
use crate::error::{BookerErrorTrait, Error, Result};
use crate::notifications::{notify_best_effort, Notifier};
use crate::platform::headers::is_valid_cookie;
use crate::platform::{MarkerClassifier, PlatformClient, ResponseClassifier};

pub use store::{EnvFileSessionStore, InMemorySessionStore, SessionStore};

/// Where a session came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOrigin {
    /// Obtained by a login in this process
    LoggedIn,
    /// Read back from the session store
    Restored,
}

/// Credential bundle shared read-only by every reservation attempt
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    /// Cookie header value to present
    pub token: String,
    /// Login identity the token was obtained with
    pub login_id: String,
    pub venue: VenueId,
    pub origin: SessionOrigin,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("token", &"<redacted>")
            .field("login_id", &self.login_id)
            .field("venue", &self.venue)
            .field("origin", &self.origin)
            .finish()
    }
}

/// States of one login iteration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginState {
    NoSession,
    AwaitingCaptcha,
    CaptchaSolved,
    AwaitingLoginResult,
    SessionEstablished,
    Exhausted,
}

impl LoginState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoSession => "no_session",
            Self::AwaitingCaptcha => "awaiting_captcha",
            Self::CaptchaSolved => "captcha_solved",
            Self::AwaitingLoginResult => "awaiting_login_result",
            Self::SessionEstablished => "session_established",
            Self::Exhausted => "exhausted",
        }
    }
}

impl fmt::Display for LoginState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Drives the captcha/login loop for one venue and persists the result
pub struct SessionManager {
    venue: VenueId,
    client: Arc<dyn PlatformClient>,
    solver: CaptchaSolver,
    notifier: Arc<dyn Notifier>,
    store: Arc<dyn SessionStore>,
    account: AccountConfig,
    max_retries: u32,
    classifier: MarkerClassifier,
}

impl SessionManager {
    pub fn new(
        venue: VenueId,
        client: Arc<dyn PlatformClient>,
        solver: CaptchaSolver,
        notifier: Arc<dyn Notifier>,
        store: Arc<dyn SessionStore>,
        account: AccountConfig,
        max_retries: u32,
    ) -> Self {
        Self {
            venue,
            client,
            solver,
            notifier,
            store,
            account,
            max_retries,
            classifier: MarkerClassifier::login(),
        }
    }

    /// Key the session token is persisted under
    pub fn session_key(&self) -> String {
        self.venue.profile().session_key()
    }

    /// Log in and persist the resulting token
    ///
    /// # Errors
    ///
    /// `RetriesExhausted` once every iteration failed (the operator has been
    /// notified), or `Persist` if the token could not be stored.
    pub async fn establish(&self) -> Result<Session> {
        let session = self.login().await?;
        self.persist(&session).await?;
        Ok(session)
    }

    /// Use the persisted token if there is one, otherwise log in
    ///
    /// A persisted token that cannot be sent as a cookie counts as absent.
    ///
    /// A failure to persist a freshly obtained token is logged and does not
    /// prevent the session from being used.
    pub async fn restore(&self) -> Result<Session> {
        let key = self.session_key();

        let persisted = self.store.load(&key).await?.filter(|token| {
            let usable = is_valid_cookie(token);
            if !usable {
                tracing::warn!(
                    venue = %self.venue,
                    key = %key,
                    "Persisted session token cannot be sent as a cookie, ignoring it"
                );
            }
            usable
        });

        if let Some(token) = persisted {
            tracing::info!(venue = %self.venue, key = %key, "Restored persisted session");
            return Ok(Session {
                token,
                login_id: self.account.login_id.clone(),
                venue: self.venue,
                origin: SessionOrigin::Restored,
            });
        }

        tracing::info!(
            venue = %self.venue,
            key = %key,
            "No persisted session, logging in"
        );

        let session = self.login().await?;
        if let Err(e) = self.persist(&session).await {
            tracing::warn!(error = %e, "Continuing with an unpersisted session");
        }
        Ok(session)
    }

    /// Run the login loop without persisting
    pub async fn login(&self) -> Result<Session> {
        tracing::info!(
            venue = %self.venue,
            max_retries = self.max_retries,
            "Starting login"
        );

        for iteration in 1..=self.max_retries {
            match self.attempt_login().await {
                Ok(session) => {
                    tracing::info!(venue = %self.venue, iteration, "Login succeeded");
                    return Ok(session);
                }
                Err(e) if e.is_recoverable() => {
                    tracing::warn!(
                        venue = %self.venue,
                        iteration,
                        category = %e.category(),
                        error = %e,
                        "Login attempt failed"
                    );
                }
                Err(e) => return Err(e),
            }
        }

        let mut state = LoginState::NoSession;
        advance(&mut state, LoginState::Exhausted);

        let err = Error::RetriesExhausted {
            attempts: self.max_retries,
        };
        tracing::error!(venue = %self.venue, error = %err, "Giving up on login");
        notify_best_effort(self.notifier.as_ref(), &err.to_string()).await;

        Err(err)
    }

    /// One pass through the state machine; every state is local to the call
    async fn attempt_login(&self) -> Result<Session> {
        let mut state = LoginState::NoSession;

        advance(&mut state, LoginState::AwaitingCaptcha);
        let captcha = self.client.fetch_captcha_image().await?;

        let attempt = self.solver.solve(captcha.image).await?;
        let captcha_text = attempt.into_text()?;
        advance(&mut state, LoginState::CaptchaSolved);
        tracing::info!(captcha = %captcha_text, "Captcha recognized");

        let token = captcha.session_token.ok_or(Error::SessionUnavailable)?;

        advance(&mut state, LoginState::AwaitingLoginResult);
        let body = self
            .client
            .submit_login(&token, &self.account, &captcha_text)
            .await?;

        if !self.classifier.is_success(&body) {
            tracing::warn!(
                captcha = %captcha_text,
                marker = self.classifier.marker(),
                "Login rejected"
            );
            return Err(Error::CredentialRejected {
                marker: self.classifier.marker().to_string(),
            });
        }

        advance(&mut state, LoginState::SessionEstablished);
        Ok(Session {
            token,
            login_id: self.account.login_id.clone(),
            venue: self.venue,
            origin: SessionOrigin::LoggedIn,
        })
    }

    async fn persist(&self, session: &Session) -> Result<()> {
        self.store.save(&self.session_key(), &session.token).await
    }
}

fn advance(state: &mut LoginState, next: LoginState) {
    tracing::debug!(from = %state, to = %next, "Login state transition");
    *state = next;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_debug_redacts_token() {
        let session = Session {
            token: "ASP.NET_SessionId=secret".to_string(),
            login_id: "A123".to_string(),
            venue: VenueId::DaTong,
            origin: SessionOrigin::LoggedIn,
        };
        let debug = format!("{session:?}");
        assert!(!debug.contains("secret"));
        assert!(debug.contains("A123"));
    }

    #[test]
    fn test_advance_updates_state() {
        let mut state = LoginState::NoSession;
        advance(&mut state, LoginState::AwaitingCaptcha);
        assert_eq!(state, LoginState::AwaitingCaptcha);
        assert_eq!(state.to_string(), "awaiting_captcha");
    }
}
