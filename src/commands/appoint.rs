use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::Local;

use court_booker::scheduler::plan::{date_days_ahead, parse_date};
use court_booker::scheduler::{
    parse_start_time, wait_until, AppointmentPlan, AppointmentScheduler, Slot,
};

use super::BookingContext;

/// Days ahead booked when neither a date nor a plan file is given
const DEFAULT_DAYS_AHEAD: u64 = 7;

/// `start-appoint` arguments
#[derive(Debug, Default)]
pub struct AppointParams {
    pub date: Option<String>,
    pub days_ahead: Option<u64>,
    pub targets: Vec<String>,
    pub plan: Option<PathBuf>,
    pub at: Option<String>,
    pub fan_out: Option<u32>,
}

impl AppointParams {
    /// Build the plan from a plan file or from the date/target flags
    pub fn to_plan(&self) -> Result<AppointmentPlan> {
        if let Some(path) = &self.plan {
            return Ok(AppointmentPlan::from_file(path)?);
        }

        if self.targets.is_empty() {
            bail!("No slots to book: pass --target HH:COURT or --plan <file>");
        }

        let date = match (&self.date, self.days_ahead) {
            (Some(date), _) => parse_date(date)?,
            (None, days) => date_days_ahead(
                Local::now().date_naive(),
                days.unwrap_or(DEFAULT_DAYS_AHEAD),
            )?,
        };

        let slots = self
            .targets
            .iter()
            .map(|t| t.parse::<Slot>())
            .collect::<Result<Vec<_>, _>>()?;

        Ok(AppointmentPlan::new(date, slots)?)
    }
}

/// Restore (or create) the session, then fire every reservation attempt
pub async fn start_appoint(place: Option<&str>, env_file: &Path, params: AppointParams) -> Result<()> {
    let plan = params.to_plan()?;
    let start_time = params.at.as_deref().map(parse_start_time).transpose()?;

    let ctx = BookingContext::build(place, env_file)?;
    let fan_out = params.fan_out.unwrap_or(ctx.config.appointment.retry_times);
    if fan_out == 0 {
        bail!("--fan-out must be greater than 0");
    }

    let session = match ctx
        .session_manager()
        .restore()
        .await
        .with_context(|| format!("No usable session for {}", ctx.venue))
    {
        Ok(session) => Arc::new(session),
        Err(e) => {
            ctx.report_fatal(&e).await;
            return Err(e);
        }
    };

    tracing::info!(
        venue = %ctx.venue,
        origin = ?session.origin,
        date = %plan.date,
        slots = plan.slots.len(),
        fan_out,
        "Session ready"
    );

    if let Some(start_time) = start_time {
        wait_until(start_time).await;
    }

    let scheduler = AppointmentScheduler::new(
        ctx.client.clone(),
        ctx.notifier.clone(),
        ctx.config.appointment.retry_interval(),
    );
    let report = scheduler.run(session, plan.expand(fan_out)).await;

    println!("Appointment run for {} on {}", ctx.venue, plan.date);
    for outcome in &report.outcomes {
        println!("  [{}] {}", outcome.target.delay_index, outcome.message);
    }
    println!("{report}");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_from_flags() {
        let params = AppointParams {
            date: Some("2022/08/20".to_string()),
            targets: vec!["16:1112".to_string(), "16:1115".to_string()],
            ..Default::default()
        };
        let plan = params.to_plan().unwrap();
        assert_eq!(plan.date.to_string(), "2022-08-20");
        assert_eq!(plan.slots.len(), 2);
    }

    #[test]
    fn test_plan_requires_targets() {
        let params = AppointParams {
            date: Some("2022-08-20".to_string()),
            ..Default::default()
        };
        assert!(params.to_plan().is_err());
    }

    #[test]
    fn test_plan_defaults_to_a_week_ahead() {
        let params = AppointParams {
            targets: vec!["9:87".to_string()],
            ..Default::default()
        };
        let plan = params.to_plan().unwrap();
        assert_eq!(
            plan.date,
            date_days_ahead(Local::now().date_naive(), DEFAULT_DAYS_AHEAD).unwrap()
        );
    }
}
