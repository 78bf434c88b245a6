//! Operator notifications
//!
//! The booking flow reports every terminal outcome (exhausted login, each
//! reservation attempt) through a single [`Notifier`]. Delivery is
//! fire-and-forget from the flow's point of view: a failed delivery is logged
//! and never changes what happens next.
//!
//! ```text
//!   SessionManager ──┐
//!                    ├──► Notifier ──► LINE Notify
//!   AppointmentScheduler ──┘
//! ```

pub mod channels;

pub use channels::line::{LineNotifyChannel, LineNotifyConfig};
pub use channels::{ChannelError, ChannelResult, DeliveryStatus, Notifier};

/// Send a message and swallow any failure
///
/// Returns the HTTP status code of the delivery when one was received.
pub async fn notify_best_effort(notifier: &dyn Notifier, message: &str) -> Option<u16> {
    match notifier.send(message).await {
        Ok(status) => {
            if status.success {
                tracing::info!(channel = notifier.name(), message, "Notification sent");
            } else {
                tracing::warn!(
                    channel = notifier.name(),
                    message,
                    delivery = %status,
                    "Notification was not delivered"
                );
            }
            status.status_code
        }
        Err(e) => {
            tracing::warn!(
                channel = notifier.name(),
                message,
                error = %e,
                "Notification failed"
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct FailingNotifier;

    #[async_trait]
    impl Notifier for FailingNotifier {
        fn name(&self) -> &str {
            "failing"
        }

        async fn send(&self, _message: &str) -> ChannelResult<DeliveryStatus> {
            Err(ChannelError::Other("boom".to_string()))
        }
    }

    struct OkNotifier;

    #[async_trait]
    impl Notifier for OkNotifier {
        fn name(&self) -> &str {
            "ok"
        }

        async fn send(&self, _message: &str) -> ChannelResult<DeliveryStatus> {
            Ok(DeliveryStatus::success("ok", 200))
        }
    }

    #[tokio::test]
    async fn test_best_effort_swallows_errors() {
        assert_eq!(notify_best_effort(&FailingNotifier, "hello").await, None);
    }

    #[tokio::test]
    async fn test_best_effort_returns_status_code() {
        assert_eq!(notify_best_effort(&OkNotifier, "hello").await, Some(200));
    }
}
