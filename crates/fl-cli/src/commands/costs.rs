//! Costs command: prices sessions under the effective policy.

use std::io::Write;

use anyhow::{Context, Result};
use fl_core::{CostPolicy, Diagnostics, PricedReport, PricedSession, Totals, summarize};
use serde::Serialize;

use crate::cli::{PolicyArgs, SessionFilter};
use crate::commands::format::{duration, tail_width, write_diagnostics};
use crate::{Config, source};

#[derive(Debug, Serialize)]
struct CostsJson<'a> {
    policy: &'a CostPolicy,
    sessions: &'a [PricedSession],
    totals: Totals,
    diagnostics: &'a Diagnostics,
}

pub fn run<W: Write>(
    writer: &mut W,
    config: &Config,
    filter: &SessionFilter,
    overrides: &PolicyArgs,
    json: bool,
) -> Result<()> {
    let policy = overrides.apply(config.policy);
    let ledger = source::ledger(config)?;
    let report = source::block_on(ledger.priced_sessions(&policy))?
        .context("failed to price flight sessions")?;
    // Cumulative hours were computed over the full snapshot above.
    let report = apply_filter(report, filter);

    if json {
        let payload = CostsJson {
            policy: &policy,
            sessions: &report.sessions,
            totals: summarize(&report.sessions).totals,
            diagnostics: &report.diagnostics,
        };
        writeln!(writer, "{}", serde_json::to_string_pretty(&payload)?)?;
    } else {
        format_costs(writer, &report)?;
    }
    Ok(())
}

fn apply_filter(mut report: PricedReport, filter: &SessionFilter) -> PricedReport {
    report.sessions.retain(|priced| {
        filter.matches(priced.session.tail_number.as_str(), priced.session.state)
    });
    report
}

pub fn format_costs<W: Write>(writer: &mut W, report: &PricedReport) -> Result<()> {
    let sessions = &report.sessions;
    writeln!(writer, "Concession costs")?;

    if sessions.is_empty() {
        writeln!(writer, "No sessions found.")?;
    } else {
        let tw = tail_width(sessions.iter().map(|p| p.session.tail_number.as_str()));
        writeln!(
            writer,
            "{:<tw$}  {:<10}  {:<8}  {:<11}  {:>8}  {:<5}  {:>8}",
            "TAIL", "DATE", "DURATION", "STATE", "CUM HRS", "TIER", "COST"
        )?;
        for priced in sessions {
            let session = &priced.session;
            writeln!(
                writer,
                "{:<tw$}  {}  {:<8}  {:<11}  {:>8.2}  {:<5}  {:>8}",
                session.tail_number.as_str(),
                session.date,
                duration(session),
                session.state.label(),
                priced.cumulative_hours,
                priced.tier.as_str(),
                priced.total_cost
            )?;
        }

        let totals = summarize(sessions).totals;
        writeln!(writer)?;
        writeln!(
            writer,
            "Total: {} for {} sessions ({:.2} flight hours)",
            totals.total_cost,
            totals.sessions,
            totals.flight_hours()
        )?;
    }

    write_diagnostics(writer, &report.diagnostics)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fl_core::{InMemorySource, Ledger, RawStatusEvent, SessionState};
    use fl_db::{Database, EventRecord};
    use insta::assert_snapshot;

    fn raw(id: &str, tail: &str, status: &str, timestamp: &str) -> RawStatusEvent {
        RawStatusEvent {
            id: Some(id.to_string()),
            tail_number: Some(tail.to_string()),
            status: Some(status.to_string()),
            direction: None,
            timestamp: Some(timestamp.to_string()),
        }
    }

    fn sample_report(policy: &CostPolicy) -> PricedReport {
        let ledger = Ledger::new(InMemorySource::new(vec![
            raw("1", "VT-ABC", "departing", "2024-06-18T09:00:00Z"),
            raw("2", "VT-ABC", "arriving", "2024-06-18T10:30:00Z"),
            raw("3", "VT-ABC", "departing", "2024-06-18T14:00:00Z"),
            raw("4", "VT-XYZ", "arriving", "2024-06-18T08:00:00Z"),
        ]));
        source::block_on(ledger.priced_sessions(policy))
            .unwrap()
            .unwrap()
    }

    fn record(id: &str, tail: &str, status: &str, timestamp: &str) -> EventRecord {
        EventRecord {
            id: id.to_string(),
            tail_number: Some(tail.to_string()),
            status: Some(status.to_string()),
            direction: None,
            timestamp: Some(timestamp.to_string()),
        }
    }

    #[test]
    fn test_format_costs_table() {
        let mut output = Vec::new();
        format_costs(&mut output, &sample_report(&CostPolicy::default())).unwrap();

        assert_snapshot!(String::from_utf8(output).unwrap(), @r"
        Concession costs
        TAIL    DATE        DURATION  STATE         CUM HRS  TIER       COST
        VT-ABC  2024-06-18  1h 30m    Completed        1.50  base       1211
        VT-ABC  2024-06-18  -         In Progress      1.50  base          0
        VT-XYZ  2024-06-18  -         Arrived          0.00  base          0

        Total: 1211 for 3 sessions (1.50 flight hours)
        ");
    }

    #[test]
    fn test_filter_applies_after_pricing() {
        let report = sample_report(&CostPolicy::default());
        let filter = SessionFilter {
            tail: None,
            state: Some(SessionState::InProgress),
        };
        let filtered = apply_filter(report, &filter);

        assert_eq!(filtered.sessions.len(), 1);
        // The aggregate still reflects the completed flight that was filtered out.
        assert!((filtered.sessions[0].cumulative_hours - 1.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_run_with_policy_override() {
        let temp = tempfile::tempdir().unwrap();
        let db_path = temp.path().join("fl.db");
        let mut db = Database::open(&db_path).unwrap();
        db.insert_events(&[
            record("a", "VT-ABC", "departing", "2024-06-18T09:00:00Z"),
            record("b", "VT-ABC", "arriving", "2024-06-18T10:30:00Z"),
        ])
        .unwrap();

        let config = Config {
            database_path: db_path,
            ..Config::default()
        };
        let overrides = PolicyArgs {
            escalation: Some(0.0),
            ..PolicyArgs::default()
        };
        let mut output = Vec::new();
        run(&mut output, &config, &SessionFilter::default(), &overrides, true).unwrap();

        let value: serde_json::Value = serde_json::from_slice(&output).unwrap();
        // 702 × 1.5 = 1053
        assert_eq!(value["sessions"][0]["total_cost"], 1053);
        assert_eq!(value["sessions"][0]["tier"], "base");
        assert_eq!(value["totals"]["total_cost"], 1053);
        assert_eq!(value["policy"]["escalation"], 0.0);
    }

    #[test]
    fn test_run_rejects_invalid_override() {
        let temp = tempfile::tempdir().unwrap();
        let config = Config {
            database_path: temp.path().join("fl.db"),
            ..Config::default()
        };
        let overrides = PolicyArgs {
            tier1_discount: Some(1.5),
            ..PolicyArgs::default()
        };
        let mut output = Vec::new();
        let err = run(&mut output, &config, &SessionFilter::default(), &overrides, false)
            .unwrap_err();

        assert!(format!("{err:#}").contains("out of range"));
        assert!(output.is_empty());
    }
}
