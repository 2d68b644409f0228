//! Summary command: fleet totals per aircraft and per month.

use std::io::Write;

use anyhow::{Context, Result};
use fl_core::{CostPolicy, Diagnostics, FleetSummary, format_duration, summarize};
use serde::Serialize;

use crate::cli::PolicyArgs;
use crate::commands::format::{tail_width, write_diagnostics};
use crate::{Config, source};

#[derive(Debug, Serialize)]
struct SummaryJson<'a> {
    policy: &'a CostPolicy,
    #[serde(flatten)]
    summary: &'a FleetSummary,
    diagnostics: &'a Diagnostics,
}

pub fn run<W: Write>(
    writer: &mut W,
    config: &Config,
    overrides: &PolicyArgs,
    json: bool,
) -> Result<()> {
    let policy = overrides.apply(config.policy);
    let ledger = source::ledger(config)?;
    let report = source::block_on(ledger.priced_sessions(&policy))?
        .context("failed to price flight sessions")?;
    let summary = summarize(&report.sessions);

    if json {
        let payload = SummaryJson {
            policy: &policy,
            summary: &summary,
            diagnostics: &report.diagnostics,
        };
        writeln!(writer, "{}", serde_json::to_string_pretty(&payload)?)?;
    } else {
        format_summary(writer, &summary)?;
        write_diagnostics(writer, &report.diagnostics)?;
    }
    Ok(())
}

pub fn format_summary<W: Write>(writer: &mut W, summary: &FleetSummary) -> Result<()> {
    let totals = &summary.totals;
    writeln!(writer, "Fleet summary")?;
    writeln!(
        writer,
        "Sessions: {} ({} completed, {} in progress, {} arrived only)",
        totals.sessions, totals.completed, totals.in_progress, totals.arrived_only
    )?;
    writeln!(writer, "Flight time: {}", format_duration(totals.flight_minutes))?;
    writeln!(writer, "Total cost: {}", totals.total_cost)?;

    if summary.aircraft.is_empty() {
        return Ok(());
    }

    let tw = tail_width(summary.aircraft.iter().map(|a| a.tail_number.as_str()));
    writeln!(writer)?;
    writeln!(writer, "By aircraft:")?;
    writeln!(
        writer,
        "{:<tw$}  {:>8}  {:>11}  {:>8}  {:<5}  {:>8}",
        "TAIL", "SESSIONS", "FLIGHT TIME", "CUM HRS", "TIER", "COST"
    )?;
    for aircraft in &summary.aircraft {
        writeln!(
            writer,
            "{:<tw$}  {:>8}  {:>11}  {:>8.2}  {:<5}  {:>8}",
            aircraft.tail_number.as_str(),
            aircraft.totals.sessions,
            format_duration(aircraft.totals.flight_minutes),
            aircraft.cumulative_hours,
            aircraft.tier.as_str(),
            aircraft.totals.total_cost
        )?;
    }

    writeln!(writer)?;
    writeln!(writer, "By month:")?;
    writeln!(
        writer,
        "{:<7}  {:>8}  {:>11}  {:>8}",
        "MONTH", "SESSIONS", "FLIGHT TIME", "COST"
    )?;
    for month in &summary.months {
        writeln!(
            writer,
            "{:<7}  {:>8}  {:>11}  {:>8}",
            month.month,
            month.totals.sessions,
            format_duration(month.totals.flight_minutes),
            month.totals.total_cost
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use fl_core::{RawStatusEvent, price, reconstruct_raw};
    use insta::assert_snapshot;

    fn raw(tail: &str, status: &str, timestamp: &str) -> RawStatusEvent {
        RawStatusEvent {
            tail_number: Some(tail.to_string()),
            status: Some(status.to_string()),
            timestamp: Some(timestamp.to_string()),
            ..RawStatusEvent::default()
        }
    }

    fn sample_summary() -> FleetSummary {
        let reconstruction = reconstruct_raw(&[
            raw("VT-ABC", "departing", "2024-06-18T09:00:00Z"),
            raw("VT-ABC", "arriving", "2024-06-18T10:30:00Z"),
            raw("VT-ABC", "departing", "2024-07-02T06:00:00Z"),
            raw("VT-ABC", "arriving", "2024-07-02T08:00:00Z"),
            raw("VT-SBR", "arriving", "2024-06-20T08:00:00Z"),
            raw("VT-SBR", "departing", "2024-07-03T14:00:00Z"),
        ]);
        summarize(&price(&reconstruction.sessions, &CostPolicy::default()).unwrap())
    }

    #[test]
    fn test_format_summary() {
        let mut output = Vec::new();
        format_summary(&mut output, &sample_summary()).unwrap();

        assert_snapshot!(String::from_utf8(output).unwrap(), @r"
        Fleet summary
        Sessions: 4 (2 completed, 1 in progress, 1 arrived only)
        Flight time: 3h 30m
        Total cost: 2826

        By aircraft:
        TAIL    SESSIONS  FLIGHT TIME   CUM HRS  TIER       COST
        VT-ABC         2       3h 30m      3.50  base       2826
        VT-SBR         2        0h 0m      0.00  base          0

        By month:
        MONTH    SESSIONS  FLIGHT TIME      COST
        2024-06         2       1h 30m      1211
        2024-07         2        2h 0m      1615
        ");
    }

    #[test]
    fn test_format_empty_summary() {
        let mut output = Vec::new();
        format_summary(&mut output, &FleetSummary::default()).unwrap();

        assert_snapshot!(String::from_utf8(output).unwrap(), @r"
        Fleet summary
        Sessions: 0 (0 completed, 0 in progress, 0 arrived only)
        Flight time: 0h 0m
        Total cost: 0
        ");
    }

    #[test]
    fn test_summary_json_flattens_totals() {
        let summary = sample_summary();
        let policy = CostPolicy::default();
        let payload = SummaryJson {
            policy: &policy,
            summary: &summary,
            diagnostics: &Diagnostics::default(),
        };
        let value = serde_json::to_value(&payload).unwrap();

        assert_eq!(value["totals"]["total_cost"], 2826);
        assert_eq!(value["aircraft"][0]["tail_number"], "VT-ABC");
        assert_eq!(value["months"][1]["month"], "2024-07");
        assert_eq!(value["policy"]["base_rate_per_hour"], 702.0);
    }
}
