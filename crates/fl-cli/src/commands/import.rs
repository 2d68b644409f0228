//! Import command for loading status records into the local `SQLite` store.

use std::io::{self, BufRead};

use anyhow::{Context, Result, bail};
use serde_json::Value;
use uuid::Uuid;

use fl_db::{Database, EventRecord};

use crate::Config;

pub fn run(config: &Config) -> Result<usize> {
    let stdin = io::stdin();
    let events = parse_events(stdin.lock())?;

    let mut db = Database::open(&config.database_path)
        .with_context(|| format!("failed to open {}", config.database_path.display()))?;
    let inserted = db.insert_events(&events)?;
    Ok(inserted)
}

/// Parses one JSON object per line.
///
/// Only the line shape is checked here. Field contents are stored as given and
/// judged at query time, so a bad tail number or timestamp does not abort the
/// import.
fn parse_events<R: BufRead>(reader: R) -> Result<Vec<EventRecord>> {
    let mut events = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("failed to read line {}", idx + 1))?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let parsed: Value = serde_json::from_str(trimmed)
            .with_context(|| format!("invalid JSON on line {}", idx + 1))?;
        if !parsed.is_object() {
            bail!("expected a JSON object on line {}", idx + 1);
        }
        events.push(into_record(&parsed));
    }
    Ok(events)
}

fn into_record(value: &Value) -> EventRecord {
    let raw = fl_http::decode_record(value);
    let id = raw
        .id
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    EventRecord {
        id,
        tail_number: raw.tail_number,
        status: raw.status,
        direction: raw.direction,
        timestamp: raw.timestamp,
    }
}
