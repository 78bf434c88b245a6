//! Wall-clock start gate
//!
//! Booking windows open at a fixed local time. A run can be started early and
//! told to hold until then; the fan-out offsets are measured from the moment
//! the gate opens.

use chrono::{Local, NaiveDateTime, NaiveTime, TimeDelta};

use super::error::{PlanError, PlanResult};

/// Parse `HH:MM` or `HH:MM:SS`
pub fn parse_start_time(input: &str) -> PlanResult<NaiveTime> {
    let input = input.trim();
    NaiveTime::parse_from_str(input, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(input, "%H:%M"))
        .map_err(|_| PlanError::InvalidTime {
            input: input.to_string(),
        })
}

/// Time from `now` until the next occurrence of `fire_at`
///
/// A `fire_at` equal to the current time of day fires immediately; one that
/// has already passed today fires tomorrow.
pub fn delay_until(fire_at: NaiveTime, now: NaiveDateTime) -> TimeDelta {
    let today = now.date();
    let target_date = if fire_at >= now.time() {
        today
    } else {
        today.succ_opt().unwrap_or(today)
    };

    target_date.and_time(fire_at) - now
}

/// Sleep until the next local occurrence of `fire_at`
pub async fn wait_until(fire_at: NaiveTime) {
    let delay = delay_until(fire_at, Local::now().naive_local());

    tracing::info!(
        fire_at = %fire_at,
        wait_secs = delay.num_seconds(),
        "Holding until start time"
    );

    if let Ok(delay) = delay.to_std() {
        tokio::time::sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2022, 8, 13)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    #[test]
    fn test_parse_start_time() {
        assert_eq!(
            parse_start_time("00:00").unwrap(),
            NaiveTime::from_hms_opt(0, 0, 0).unwrap()
        );
        assert_eq!(
            parse_start_time("23:59:58").unwrap(),
            NaiveTime::from_hms_opt(23, 59, 58).unwrap()
        );
        assert!(parse_start_time("midnight").is_err());
        assert!(parse_start_time("25:00").is_err());
    }

    #[test]
    fn test_later_today() {
        let fire_at = NaiveTime::from_hms_opt(12, 0, 0).unwrap();
        assert_eq!(delay_until(fire_at, at(11, 59, 30)), TimeDelta::seconds(30));
    }

    #[test]
    fn test_already_passed_rolls_to_tomorrow() {
        let fire_at = NaiveTime::from_hms_opt(0, 0, 0).unwrap();
        assert_eq!(delay_until(fire_at, at(23, 59, 50)), TimeDelta::seconds(10));
    }

    #[test]
    fn test_now_fires_immediately() {
        let fire_at = NaiveTime::from_hms_opt(8, 0, 0).unwrap();
        assert_eq!(delay_until(fire_at, at(8, 0, 0)), TimeDelta::zero());
    }
}
