//! Locally recovered problems, reported next to results.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::event::InvalidEvent;
use crate::types::TailNumber;

/// A raw record excluded from reconstruction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectedEvent {
    /// Position of the record in the fetched snapshot.
    pub index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(flatten)]
    pub reason: InvalidEvent,
}

/// An arrival that precedes the departure it would have closed.
///
/// The pairing is refused: the departure is emitted as in progress and the
/// arrival is processed on its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NegativeDurationAnomaly {
    pub tail_number: TailNumber,
    pub departed_at: DateTime<Utc>,
    pub arrived_at: DateTime<Utc>,
}

/// Summary of everything recovered during one reconstruction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Diagnostics {
    pub events_received: usize,
    pub events_accepted: usize,
    pub rejected: Vec<RejectedEvent>,
    pub anomalies: Vec<NegativeDurationAnomaly>,
}

impl Diagnostics {
    /// True when no record was dropped and no pairing was refused.
    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty() && self.anomalies.is_empty()
    }
}
