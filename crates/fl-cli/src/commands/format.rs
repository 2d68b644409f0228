//! Shared pieces of the human-readable tables.

use std::io::Write;

use anyhow::Result;
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use fl_core::{Diagnostics, FlightSession, format_duration};

/// Clock time of `timestamp`, suffixed with the day offset from `date` when
/// the flight crossed midnight.
pub fn clock(timestamp: Option<DateTime<Utc>>, date: NaiveDate) -> String {
    let Some(timestamp) = timestamp else {
        return "-".to_string();
    };
    let days = (timestamp.date_naive() - date).num_days();
    if days == 0 {
        timestamp.format("%H:%M").to_string()
    } else {
        format!("{}{days:+}d", timestamp.format("%H:%M"))
    }
}

pub fn duration(session: &FlightSession) -> String {
    session
        .duration_minutes
        .map_or_else(|| "-".to_string(), format_duration)
}

/// Width of the tail number column.
pub fn tail_width<'a>(tails: impl Iterator<Item = &'a str>) -> usize {
    tails.map(str::len).max().unwrap_or(0).max("TAIL".len())
}

fn rfc3339(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Lists skipped records and refused pairings. Writes nothing when clean.
pub fn write_diagnostics<W: Write>(writer: &mut W, diagnostics: &Diagnostics) -> Result<()> {
    if diagnostics.is_clean() {
        return Ok(());
    }
    writeln!(writer)?;
    if !diagnostics.rejected.is_empty() {
        writeln!(
            writer,
            "Skipped {} of {} records:",
            diagnostics.rejected.len(),
            diagnostics.events_received
        )?;
        for rejected in &diagnostics.rejected {
            match &rejected.id {
                Some(id) => writeln!(
                    writer,
                    "- record {} ({id}): {}",
                    rejected.index, rejected.reason
                )?,
                None => writeln!(writer, "- record {}: {}", rejected.index, rejected.reason)?,
            }
        }
    }
    if !diagnostics.anomalies.is_empty() {
        writeln!(writer, "Refused pairings:")?;
        for anomaly in &diagnostics.anomalies {
            writeln!(
                writer,
                "- {}: arrival {} precedes departure {}",
                anomaly.tail_number,
                rfc3339(anomaly.arrived_at),
                rfc3339(anomaly.departed_at)
            )?;
        }
    }
    Ok(())
}
