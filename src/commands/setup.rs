use std::path::Path;

use anyhow::{Context, Result};

use super::BookingContext;

/// Log in and persist the session token for later `start-appoint` runs
pub async fn appoint_setup(place: Option<&str>, env_file: &Path) -> Result<()> {
    let ctx = BookingContext::build(place, env_file)?;

    let result = ctx
        .session_manager()
        .establish()
        .await
        .with_context(|| format!("Failed to set up a session for {}", ctx.venue));

    match result {
        Ok(session) => {
            println!("Session for {} saved to {}", session.venue, env_file.display());
            println!("  Key: {}", ctx.venue.profile().session_key());
            Ok(())
        }
        Err(e) => {
            ctx.report_fatal(&e).await;
            Err(e)
        }
    }
}
