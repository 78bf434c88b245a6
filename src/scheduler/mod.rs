//! Reservation fan-out
//!
//! Booking slots open at a known moment and go within seconds. The scheduler
//! therefore fires several identical reservation requests per slot, spaced by
//! a fixed interval, and runs every slot's attempts concurrently:
//!
//! ```text
//!   t = 0          1×interval     2×interval    ...
//!   slot A  ──►    slot A   ──►   slot A
//!   slot B  ──►    slot B   ──►   slot B
//! ```
//!
//! Each attempt is independent: it is sent once, classified once and reported
//! to the operator once. A failing attempt (including a transport error) never
//! affects its siblings.
//!
//! # Modules
//!
//! - [`plan`] - What to book, and its expansion into targets
//! - [`trigger`] - Optional wall-clock start gate
//! - [`error`] - Plan validation errors

pub mod error;
pub mod plan;
pub mod trigger;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::time::Instant;

use crate::error::{BookerErrorTrait, Error};
use crate::notifications::{notify_best_effort, Notifier};
use crate::platform::{MarkerClassifier, PlatformClient, ResponseClassifier};
use crate::session::Session;
use crate::utils::body_preview;

pub use error::{PlanError, PlanResult};
pub use plan::{AppointmentPlan, ReservationTarget, Slot};
pub use trigger::{delay_until, parse_start_time, wait_until};

/// Result of one reservation attempt
#[derive(Debug, Clone)]
pub struct AttemptOutcome {
    pub target: ReservationTarget,
    pub success: bool,
    /// Operator-facing message; exactly what was sent as notification
    pub message: String,
}

/// Every outcome of one run
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub outcomes: Vec<AttemptOutcome>,
}

impl RunReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.success).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    pub fn any_success(&self) -> bool {
        self.outcomes.iter().any(|o| o.success)
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} attempts: {} succeeded, {} failed",
            self.outcomes.len(),
            self.succeeded(),
            self.failed()
        )
    }
}

/// Fires staggered reservation attempts with a shared session
pub struct AppointmentScheduler {
    client: Arc<dyn PlatformClient>,
    notifier: Arc<dyn Notifier>,
    interval: Duration,
    classifier: MarkerClassifier,
}

impl AppointmentScheduler {
    pub fn new(
        client: Arc<dyn PlatformClient>,
        notifier: Arc<dyn Notifier>,
        interval: Duration,
    ) -> Self {
        Self {
            client,
            notifier,
            interval,
            classifier: MarkerClassifier::reservation(),
        }
    }

    /// Offset of an attempt from the start of the run; `None` on overflow
    pub fn offset_of(&self, target: &ReservationTarget) -> Option<Duration> {
        self.interval.checked_mul(target.delay_index)
    }

    /// Run every target once and wait for all of them
    ///
    /// Offsets are measured from the moment this is called.
    pub async fn run(&self, session: Arc<Session>, targets: Vec<ReservationTarget>) -> RunReport {
        let start = Instant::now();

        tracing::info!(
            venue = %session.venue,
            attempts = targets.len(),
            interval_ms = self.interval.as_millis() as u64,
            "Scheduling reservation attempts"
        );

        let handles: Vec<_> = targets
            .iter()
            .cloned()
            .map(|target| {
                let fire_at = self
                    .offset_of(&target)
                    .and_then(|offset| start.checked_add(offset));
                let client = Arc::clone(&self.client);
                let notifier = Arc::clone(&self.notifier);
                let session = Arc::clone(&session);
                let classifier = self.classifier.clone();

                tokio::spawn(async move {
                    let outcome = match fire_at {
                        Some(fire_at) => {
                            tokio::time::sleep_until(fire_at).await;
                            attempt(client.as_ref(), &classifier, &session, target).await
                        }
                        None => {
                            tracing::error!(
                                court = %target.court,
                                attempt = target.delay_index,
                                "Attempt offset out of range, not sent"
                            );
                            failed_outcome(&session, target)
                        }
                    };
                    notify_best_effort(notifier.as_ref(), &outcome.message).await;
                    outcome
                })
            })
            .collect();

        let results = join_all(handles).await;

        let mut outcomes = Vec::with_capacity(results.len());
        for (result, target) in results.into_iter().zip(targets) {
            let outcome = match result {
                Ok(outcome) => outcome,
                Err(e) => {
                    // The task died before it could report, so report here
                    tracing::error!(court = %target.court, error = %e, "Reservation task aborted");
                    let outcome = failed_outcome(&session, target);
                    notify_best_effort(self.notifier.as_ref(), &outcome.message).await;
                    outcome
                }
            };
            outcomes.push(outcome);
        }

        let report = RunReport { outcomes };
        tracing::info!(venue = %session.venue, summary = %report, "Reservation run finished");
        report
    }
}

async fn attempt(
    client: &dyn PlatformClient,
    classifier: &MarkerClassifier,
    session: &Session,
    target: ReservationTarget,
) -> AttemptOutcome {
    tracing::info!(
        venue = %session.venue,
        court = %target.court,
        date = %target.date_str(),
        start_hour = target.start_hour,
        attempt = target.delay_index,
        "Start to appoint"
    );

    let result = match client
        .submit_reservation(&session.token, target.date, target.start_hour, &target.court)
        .await
    {
        Ok(body) if classifier.is_success(&body) => Ok(()),
        Ok(body) => Err(format!("no success marker in {}", body_preview(&body))),
        Err(e) => Err(e.to_string()),
    };

    let (success, message) = match result {
        Ok(()) => {
            tracing::info!(court = %target.court, attempt = target.delay_index, "Appointment successful");
            (true, success_message(session, &target))
        }
        Err(reason) => {
            let err = Error::ReservationFailed {
                court: target.court.clone(),
                date: target.date_str(),
                start_hour: target.start_hour,
                reason,
            };
            tracing::warn!(
                attempt = target.delay_index,
                category = %err.category(),
                error = %err,
                "Reservation attempt failed"
            );
            (false, failure_message(session, &target))
        }
    };

    AttemptOutcome {
        target,
        success,
        message,
    }
}

fn failed_outcome(session: &Session, target: ReservationTarget) -> AttemptOutcome {
    AttemptOutcome {
        message: failure_message(session, &target),
        target,
        success: false,
    }
}

fn success_message(session: &Session, target: &ReservationTarget) -> String {
    format!(
        "Appoint {} {} in {} {}:00 Success!",
        session.venue,
        target.court,
        target.date_str(),
        target.start_hour
    )
}

fn failure_message(session: &Session, target: &ReservationTarget) -> String {
    format!(
        "Appoint {} {} in {} {}:00 but failed",
        session.venue,
        target.court,
        target.date_str(),
        target.start_hour
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VenueId;
    use crate::session::SessionOrigin;
    use chrono::NaiveDate;

    fn session() -> Session {
        Session {
            token: "ASP.NET_SessionId=abc".to_string(),
            login_id: "A123".to_string(),
            venue: VenueId::DaTong,
            origin: SessionOrigin::Restored,
        }
    }

    fn target() -> ReservationTarget {
        ReservationTarget {
            date: NaiveDate::from_ymd_opt(2022, 8, 20).unwrap(),
            start_hour: 16,
            court: "1112".to_string(),
            delay_index: 0,
        }
    }

    #[test]
    fn test_messages() {
        assert_eq!(
            success_message(&session(), &target()),
            "Appoint 大同 1112 in 2022/08/20 16:00 Success!"
        );
        assert_eq!(
            failure_message(&session(), &target()),
            "Appoint 大同 1112 in 2022/08/20 16:00 but failed"
        );
    }

    #[test]
    fn test_report_counts() {
        let ok = AttemptOutcome {
            target: target(),
            success: true,
            message: String::new(),
        };
        let failed = AttemptOutcome {
            success: false,
            ..ok.clone()
        };
        let report = RunReport {
            outcomes: vec![ok, failed.clone(), failed],
        };

        assert_eq!(report.succeeded(), 1);
        assert_eq!(report.failed(), 2);
        assert!(report.any_success());
        assert_eq!(report.to_string(), "3 attempts: 1 succeeded, 2 failed");
    }
}
