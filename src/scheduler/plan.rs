//! What to book
//!
//! An [`AppointmentPlan`] is one date and a list of (start hour, court) slots.
//! It comes either from CLI flags or from a TOML file:
//!
//! ```toml
//! date = "2022-08-20"
//!
//! [[slots]]
//! start_hour = 16
//! court = "1112"
//!
//! [[slots]]
//! start_hour = 16
//! court = "1115"
//! ```

use std::path::Path;
use std::str::FromStr;

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use super::error::{PlanError, PlanResult};

/// One (start hour, court) pair to book
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub start_hour: u32,
    pub court: String,
}

impl Slot {
    pub fn new(start_hour: u32, court: impl Into<String>) -> PlanResult<Self> {
        let slot = Self {
            start_hour,
            court: court.into(),
        };
        slot.validate()?;
        Ok(slot)
    }

    pub fn validate(&self) -> PlanResult<()> {
        if self.start_hour > 23 {
            return Err(PlanError::invalid_hour(self.start_hour));
        }
        if self.court.is_empty() || !self.court.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(PlanError::InvalidCourt {
                court: self.court.clone(),
            });
        }
        Ok(())
    }
}

impl FromStr for Slot {
    type Err = PlanError;

    /// Parses `HH:COURT`, e.g. `16:1112`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || PlanError::InvalidTarget {
            input: s.to_string(),
        };

        let (hour, court) = s.trim().split_once(':').ok_or_else(invalid)?;
        let hour: u32 = hour.trim().parse().map_err(|_| invalid())?;

        Slot::new(hour, court.trim())
    }
}

/// A date and the slots to book on it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppointmentPlan {
    pub date: NaiveDate,
    pub slots: Vec<Slot>,
}

impl AppointmentPlan {
    pub fn new(date: NaiveDate, slots: Vec<Slot>) -> PlanResult<Self> {
        let plan = Self { date, slots };
        plan.validate()?;
        Ok(plan)
    }

    /// Load a plan from a TOML file
    pub fn from_file(path: &Path) -> PlanResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| PlanError::plan_file(path.display().to_string(), e))?;
        Self::from_toml_str(&content)
            .map_err(|e| PlanError::plan_file(path.display().to_string(), e))
    }

    pub fn from_toml_str(content: &str) -> PlanResult<Self> {
        let plan: Self =
            toml::from_str(content).map_err(|e| PlanError::plan_file("<inline>", e))?;
        plan.validate()?;
        Ok(plan)
    }

    pub fn validate(&self) -> PlanResult<()> {
        if self.slots.is_empty() {
            return Err(PlanError::EmptyPlan);
        }
        self.slots.iter().try_for_each(Slot::validate)
    }

    /// One target per slot per attempt index, in slot order
    pub fn expand(&self, fan_out: u32) -> Vec<ReservationTarget> {
        self.slots
            .iter()
            .flat_map(|slot| {
                (0..fan_out).map(move |delay_index| ReservationTarget {
                    date: self.date,
                    start_hour: slot.start_hour,
                    court: slot.court.clone(),
                    delay_index,
                })
            })
            .collect()
    }
}

/// Parse a date given as `YYYY-MM-DD` or `YYYY/MM/DD`
pub fn parse_date(input: &str) -> PlanResult<NaiveDate> {
    let input = input.trim();
    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(input, "%Y/%m/%d"))
        .map_err(|_| PlanError::InvalidDate {
            input: input.to_string(),
        })
}

/// `today + days`, the usual "book a week ahead" shape
pub fn date_days_ahead(today: NaiveDate, days: u64) -> PlanResult<NaiveDate> {
    today
        .checked_add_days(Days::new(days))
        .ok_or_else(|| PlanError::InvalidDate {
            input: format!("{today} + {days} days"),
        })
}

/// One reservation attempt, consumed exactly once
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservationTarget {
    pub date: NaiveDate,
    pub start_hour: u32,
    pub court: String,
    /// Attempt index within its slot; the attempt fires after `delay_index × interval`
    pub delay_index: u32,
}

impl ReservationTarget {
    /// Date as the booking site writes it
    pub fn date_str(&self) -> String {
        self.date.format("%Y/%m/%d").to_string()
    }
}
