use std::time::Duration;

use anyhow::{Context, Result};
use clap::Subcommand;

use court_booker::availability::AvailabilityClient;

/// What to ask the availability service
#[derive(Debug, Subcommand)]
pub enum QueryTarget {
    /// Locations with free slots in a date/time window
    Locations {
        /// First day, as the service expects it (e.g. 2022/08/20)
        #[arg(long)]
        start_date: String,

        /// Last day
        #[arg(long)]
        end_date: String,

        /// Earliest start time (e.g. 18:00)
        #[arg(long)]
        start_time: String,

        /// Latest end time (e.g. 22:00)
        #[arg(long)]
        end_time: String,
    },

    /// Bookable slots of one location on one day
    Slots {
        /// Location key as printed by `locations` (LID┼LSID)
        #[arg(long)]
        lid_key: String,

        /// Day to look at (e.g. 2022/08/20)
        #[arg(long)]
        date: String,
    },
}

/// Query the Sporetrofit service and print the result as JSON
pub async fn query_availability(query: QueryTarget, timeout_secs: u64) -> Result<()> {
    let client = AvailabilityClient::new(Duration::from_secs(timeout_secs))
        .context("Failed to create availability client")?;

    let output = match query {
        QueryTarget::Locations {
            start_date,
            end_date,
            start_time,
            end_time,
        } => {
            let locations = client
                .location_query(&start_date, &end_date, &start_time, &end_time)
                .await
                .context("Location query failed")?;
            tracing::info!(count = locations.len(), "Locations found");
            serde_json::to_string_pretty(&locations)?
        }
        QueryTarget::Slots { lid_key, date } => {
            let slots = client
                .location_available_data(&lid_key, &date)
                .await
                .context("Availability query failed")?;
            tracing::info!(count = slots.len(), lid_key = %lid_key, "Bookable slots found");
            serde_json::to_string_pretty(&slots)?
        }
    };

    println!("{output}");
    Ok(())
}
