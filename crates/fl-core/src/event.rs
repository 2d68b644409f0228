//! Aircraft status events, raw and validated.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::diagnostics::RejectedEvent;
use crate::types::{TailNumber, ValidationError};

/// Naive timestamp layouts accepted in addition to RFC 3339. Interpreted as UTC.
const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Whether the aircraft is leaving or reaching the field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Departing,
    Arriving,
}

impl EventKind {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Departing => "departing",
            Self::Arriving => "arriving",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "departing" => Ok(Self::Departing),
            "arriving" => Ok(Self::Arriving),
            _ => Err(ValidationError::InvalidStatus {
                value: s.to_string(),
            }),
        }
    }
}

/// A status record exactly as an event source delivers it.
///
/// Every field is optional so that malformed records survive deserialization
/// and can be reported instead of failing the whole snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawStatusEvent {
    #[serde(default, alias = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub tail_number: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    /// Runway direction reported by the upstream log. Not used for pairing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// Why a raw record was excluded from reconstruction.
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", content = "value", rename_all = "snake_case")]
pub enum InvalidEvent {
    #[error("missing tail number")]
    MissingTailNumber,
    #[error("missing status")]
    MissingStatus,
    #[error("unknown status: {0}")]
    UnknownStatus(String),
    #[error("missing timestamp")]
    MissingTimestamp,
    #[error("unparsable timestamp: {0}")]
    InvalidTimestamp(String),
}

/// A validated status event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEvent {
    /// Identifier of the source record, if the source has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub tail_number: TailNumber,
    pub kind: EventKind,
    pub timestamp: DateTime<Utc>,
}

impl StatusEvent {
    pub const fn new(tail_number: TailNumber, kind: EventKind, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: None,
            tail_number,
            kind,
            timestamp,
        }
    }

    /// Validates a raw record.
    ///
    /// Missing or unparsable timestamps are rejected; they never fall back to
    /// the current time.
    pub fn try_from_raw(raw: &RawStatusEvent) -> Result<Self, InvalidEvent> {
        let tail_number = raw
            .tail_number
            .as_deref()
            .and_then(|tail| TailNumber::new(tail).ok())
            .ok_or(InvalidEvent::MissingTailNumber)?;

        let status = raw
            .status
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .ok_or(InvalidEvent::MissingStatus)?;
        let kind = status
            .parse::<EventKind>()
            .map_err(|_| InvalidEvent::UnknownStatus(status.to_string()))?;

        let raw_ts = raw
            .timestamp
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .ok_or(InvalidEvent::MissingTimestamp)?;
        let timestamp = parse_timestamp(raw_ts)
            .ok_or_else(|| InvalidEvent::InvalidTimestamp(raw_ts.to_string()))?;

        Ok(Self {
            id: raw.id.clone(),
            tail_number,
            kind,
            timestamp,
        })
    }
}

/// Parses an event timestamp.
///
/// Accepts RFC 3339, or a naive date-time (`T` or space separated, optional
/// fractional seconds) which is taken to be UTC.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|naive| naive.and_utc())
}

/// Splits a snapshot into valid events and rejected records.
///
/// Accepted events keep their snapshot order.
pub fn validate_events(raw: &[RawStatusEvent]) -> (Vec<StatusEvent>, Vec<RejectedEvent>) {
    let mut accepted = Vec::with_capacity(raw.len());
    let mut rejected = Vec::new();

    for (index, record) in raw.iter().enumerate() {
        match StatusEvent::try_from_raw(record) {
            Ok(event) => accepted.push(event),
            Err(reason) => {
                tracing::warn!(index, id = ?record.id, %reason, "rejecting status event");
                rejected.push(RejectedEvent {
                    index,
                    id: record.id.clone(),
                    reason,
                });
            }
        }
    }

    (accepted, rejected)
}
