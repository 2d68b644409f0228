//! Sessions command: lists reconstructed flight sessions.

use std::io::Write;

use anyhow::{Context, Result};
use fl_core::{Reconstruction, SessionState};

use crate::cli::SessionFilter;
use crate::commands::format::{clock, duration, tail_width, write_diagnostics};
use crate::{Config, source};

pub fn run<W: Write>(
    writer: &mut W,
    config: &Config,
    filter: &SessionFilter,
    json: bool,
) -> Result<()> {
    let ledger = source::ledger(config)?;
    let reconstruction = source::block_on(ledger.sessions())?
        .context("failed to reconstruct flight sessions")?;
    let reconstruction = apply_filter(reconstruction, filter);

    if json {
        writeln!(writer, "{}", serde_json::to_string_pretty(&reconstruction)?)?;
    } else {
        format_sessions(writer, &reconstruction)?;
    }
    Ok(())
}

fn apply_filter(mut reconstruction: Reconstruction, filter: &SessionFilter) -> Reconstruction {
    reconstruction
        .sessions
        .retain(|session| filter.matches(session.tail_number.as_str(), session.state));
    reconstruction
}

pub fn format_sessions<W: Write>(writer: &mut W, reconstruction: &Reconstruction) -> Result<()> {
    let sessions = &reconstruction.sessions;
    writeln!(writer, "Flight sessions")?;

    if sessions.is_empty() {
        writeln!(writer, "No sessions found.")?;
    } else {
        let tw = tail_width(sessions.iter().map(|s| s.tail_number.as_str()));
        writeln!(
            writer,
            "{:<tw$}  {:<10}  {:<5}  {:<8}  {:<8}  STATE",
            "TAIL", "DATE", "OUT", "IN", "DURATION"
        )?;
        for session in sessions {
            writeln!(
                writer,
                "{:<tw$}  {}  {:<5}  {:<8}  {:<8}  {}",
                session.tail_number.as_str(),
                session.date,
                clock(session.outbound, session.date),
                clock(session.inbound, session.date),
                duration(session),
                session.state.label()
            )?;
        }

        let count = |state: SessionState| sessions.iter().filter(|s| s.state == state).count();
        writeln!(writer)?;
        writeln!(
            writer,
            "{} sessions: {} completed, {} in progress, {} arrived only",
            sessions.len(),
            count(SessionState::Completed),
            count(SessionState::InProgress),
            count(SessionState::ArrivedOnly)
        )?;
    }

    write_diagnostics(writer, &reconstruction.diagnostics)
}
