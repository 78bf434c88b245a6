mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use court_booker::config::{load_env_file, LoggingConfig};

use commands::{AppointParams, QueryTarget};

#[derive(Parser)]
#[command(
    name = "court-booker",
    version,
    about = "Captcha login and scheduled court reservations for sports-center booking sites",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Venue, by Chinese or English name (defaults to APPOINT_PLACE)
    #[arg(short, long, global = true)]
    place: Option<String>,

    /// Env file to load settings from and persist sessions to
    #[arg(long, global = true)]
    env_file: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (text, json); defaults to COURT_BOOKER_LOG_FORMAT
    #[arg(long, global = true)]
    log_format: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and persist the session token
    #[command(alias = "appoint_setup")]
    AppointSetup,

    /// Restore the session and fire the reservation attempts
    #[command(alias = "start_appoint")]
    StartAppoint {
        /// Date to book (YYYY-MM-DD or YYYY/MM/DD)
        #[arg(short, long, conflicts_with_all = ["days_ahead", "plan"])]
        date: Option<String>,

        /// Book this many days after today
        #[arg(long, conflicts_with = "plan")]
        days_ahead: Option<u64>,

        /// Slot to book as HH:COURT, repeatable (e.g. -t 16:1112 -t 16:1115)
        #[arg(short, long = "target", conflicts_with = "plan")]
        targets: Vec<String>,

        /// TOML plan file with a date and slots
        #[arg(long)]
        plan: Option<PathBuf>,

        /// Wait until this local time (HH:MM[:SS]) before the first attempt
        #[arg(long)]
        at: Option<String>,

        /// Attempts per slot (defaults to APPOINT_RETRY_TIMES)
        #[arg(long)]
        fan_out: Option<u32>,
    },

    /// Look up availability through the Sporetrofit app service
    #[command(alias = "query_availability")]
    QueryAvailability {
        #[command(subcommand)]
        query: QueryTarget,

        /// Request timeout in seconds
        #[arg(long, default_value = "30")]
        timeout: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Settings and logging levels may both come from the env file
    let loaded_env_file = load_env_file(cli.env_file.as_deref())?;

    let logging = LoggingConfig::from_env();
    let format = cli.log_format.as_deref().unwrap_or(&logging.format);
    setup_tracing(format, &logging.level, cli.verbose)?;

    tracing::info!("court-booker starting");

    // Sessions go back into the file the settings came from
    let env_file = loaded_env_file.unwrap_or_else(|| PathBuf::from(".env"));
    tracing::debug!(path = %env_file.display(), "Session store file");

    match cli.command {
        Commands::AppointSetup => {
            tracing::info!(place = ?cli.place, "Starting appoint setup command");
            commands::appoint_setup(cli.place.as_deref(), &env_file).await?;
        }

        Commands::StartAppoint {
            date,
            days_ahead,
            targets,
            plan,
            at,
            fan_out,
        } => {
            tracing::info!(
                place = ?cli.place,
                date = ?date,
                targets = ?targets,
                plan = ?plan,
                at = ?at,
                "Starting appoint command"
            );
            let params = AppointParams {
                date,
                days_ahead,
                targets,
                plan,
                at,
                fan_out,
            };
            commands::start_appoint(cli.place.as_deref(), &env_file, params).await?;
        }

        Commands::QueryAvailability { query, timeout } => {
            tracing::info!(query = ?query, "Starting availability query");
            commands::query_availability(query, timeout).await?;
        }
    }

    tracing::info!("court-booker completed successfully");
    Ok(())
}

fn setup_tracing(format: &str, level: &str, verbose: bool) -> Result<()> {
    let env_filter = if verbose {
        tracing_subscriber::EnvFilter::new("court_booker=debug,info")
    } else {
        tracing_subscriber::EnvFilter::try_new(format!("court_booker={level},warn"))?
    };

    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
    }

    Ok(())
}
