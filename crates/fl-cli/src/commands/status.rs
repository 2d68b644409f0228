//! Status command for showing stored activity per aircraft.

use std::io::Write;

use anyhow::{Context, Result};
use chrono::SecondsFormat;

use fl_db::Database;

use crate::Config;

pub fn run<W: Write>(writer: &mut W, config: &Config) -> Result<()> {
    let db = Database::open(&config.database_path)
        .with_context(|| format!("failed to open {}", config.database_path.display()))?;
    let activity = db.tail_activity()?;

    writeln!(writer, "Fleet ledger status")?;
    writeln!(writer, "Database: {}", config.database_path.display())?;
    if config.source_url.is_some() {
        writeln!(writer, "Queries read from the configured source_url.")?;
    }

    if activity.is_empty() {
        writeln!(writer, "No events recorded.")?;
        return Ok(());
    }

    writeln!(writer, "Aircraft:")?;
    for tail in activity {
        let last = tail.last_event.map_or_else(
            || "-".to_string(),
            |ts| ts.to_rfc3339_opts(SecondsFormat::Secs, true),
        );
        writeln!(
            writer,
            "- {}: {} events, last {last}",
            tail.tail_number, tail.events
        )?;
    }

    Ok(())
}
