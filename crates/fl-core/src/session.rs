//! Flight session reconstruction.
//!
//! Turns an unordered snapshot of status events into flight sessions.
//!
//! # Algorithm Summary
//!
//! 1. Partition events by tail number
//! 2. Stable-sort each partition by timestamp (ties keep snapshot order)
//! 3. Scan each partition with a single forward cursor, pairing a departure
//!    with the arrival immediately after it
//!
//! Pairing never looks past the next event of the same aircraft and never
//! re-pairs a consumed event. Partitions are independent, so they are scanned
//! in parallel; output order is tail number ascending, then chronological.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::diagnostics::{Diagnostics, NegativeDurationAnomaly};
use crate::event::{EventKind, RawStatusEvent, StatusEvent, validate_events};
use crate::types::{TailNumber, ValidationError};

/// Lifecycle state of a reconstructed session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Departure and arrival both observed.
    Completed,
    /// Departure observed, no arrival closed it.
    InProgress,
    /// Arrival observed with no open departure before it.
    ArrivedOnly,
}

impl SessionState {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::InProgress => "in_progress",
            Self::ArrivedOnly => "arrived_only",
        }
    }

    /// Label used in human-readable tables.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Completed => "Completed",
            Self::InProgress => "In Progress",
            Self::ArrivedOnly => "Arrived",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SessionState {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace(['-', ' '], "_").as_str() {
            "completed" => Ok(Self::Completed),
            "in_progress" => Ok(Self::InProgress),
            "arrived_only" | "arrived" => Ok(Self::ArrivedOnly),
            _ => Err(ValidationError::InvalidState {
                value: s.to_string(),
            }),
        }
    }
}

/// One reconstructed flight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlightSession {
    pub tail_number: TailNumber,
    /// UTC calendar date of the first known timestamp.
    pub date: NaiveDate,
    pub outbound: Option<DateTime<Utc>>,
    pub inbound: Option<DateTime<Utc>>,
    /// Whole minutes between outbound and inbound. Only set when completed.
    pub duration_minutes: Option<u64>,
    pub state: SessionState,
}

impl FlightSession {
    fn completed(
        tail_number: TailNumber,
        outbound: DateTime<Utc>,
        inbound: DateTime<Utc>,
        duration_minutes: u64,
    ) -> Self {
        Self {
            tail_number,
            date: outbound.date_naive(),
            outbound: Some(outbound),
            inbound: Some(inbound),
            duration_minutes: Some(duration_minutes),
            state: SessionState::Completed,
        }
    }

    fn in_progress(tail_number: TailNumber, outbound: DateTime<Utc>) -> Self {
        Self {
            tail_number,
            date: outbound.date_naive(),
            outbound: Some(outbound),
            inbound: None,
            duration_minutes: None,
            state: SessionState::InProgress,
        }
    }

    fn arrived_only(tail_number: TailNumber, inbound: DateTime<Utc>) -> Self {
        Self {
            tail_number,
            date: inbound.date_naive(),
            outbound: None,
            inbound: Some(inbound),
            duration_minutes: None,
            state: SessionState::ArrivedOnly,
        }
    }

    /// Flown hours; zero unless the session is completed.
    #[allow(clippy::cast_precision_loss)]
    pub fn flight_hours(&self) -> f64 {
        match (self.state, self.duration_minutes) {
            (SessionState::Completed, Some(minutes)) => minutes as f64 / 60.0,
            _ => 0.0,
        }
    }

    /// Minutes that count towards the aircraft's cumulative total.
    pub fn billable_minutes(&self) -> u64 {
        match self.state {
            SessionState::Completed => self.duration_minutes.unwrap_or(0),
            SessionState::InProgress | SessionState::ArrivedOnly => 0,
        }
    }

    /// The earliest timestamp the session knows about.
    pub fn first_timestamp(&self) -> Option<DateTime<Utc>> {
        self.outbound.or(self.inbound)
    }
}

/// Result of one reconstruction pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Reconstruction {
    pub sessions: Vec<FlightSession>,
    pub diagnostics: Diagnostics,
}

/// Reconstructs flight sessions from validated events.
///
/// Pure: the result depends only on each aircraft's events in chronological
/// order, not on how the snapshot interleaves different aircraft.
pub fn reconstruct(events: &[StatusEvent]) -> Reconstruction {
    let mut partitions: BTreeMap<&TailNumber, Vec<&StatusEvent>> = BTreeMap::new();
    for event in events {
        partitions.entry(&event.tail_number).or_default().push(event);
    }

    let scans: Vec<PartitionScan> = partitions
        .into_par_iter()
        .map(|(_, mut partition)| {
            // Stable: equal timestamps keep snapshot order.
            partition.sort_by_key(|event| event.timestamp);
            scan_partition(&partition)
        })
        .collect();

    let mut sessions = Vec::new();
    let mut anomalies = Vec::new();
    for scan in scans {
        sessions.extend(scan.sessions);
        anomalies.extend(scan.anomalies);
    }

    tracing::debug!(
        events = events.len(),
        sessions = sessions.len(),
        anomalies = anomalies.len(),
        "reconstructed flight sessions"
    );

    Reconstruction {
        sessions,
        diagnostics: Diagnostics {
            events_received: events.len(),
            events_accepted: events.len(),
            rejected: Vec::new(),
            anomalies,
        },
    }
}

/// Validates a raw snapshot, then reconstructs sessions from what survived.
pub fn reconstruct_raw(raw: &[RawStatusEvent]) -> Reconstruction {
    let (accepted, rejected) = validate_events(raw);
    let mut reconstruction = reconstruct(&accepted);
    reconstruction.diagnostics.events_received = raw.len();
    reconstruction.diagnostics.rejected = rejected;
    reconstruction
}

#[derive(Debug, Default)]
struct PartitionScan {
    sessions: Vec<FlightSession>,
    anomalies: Vec<NegativeDurationAnomaly>,
}

/// Greedy single-cursor pairing over one aircraft's events.
///
/// Events must already be in chronological order; a pair whose arrival comes
/// first is refused rather than given a negative duration.
fn scan_partition(events: &[&StatusEvent]) -> PartitionScan {
    let mut scan = PartitionScan::default();
    let mut cursor = 0;

    while cursor < events.len() {
        let current = events[cursor];
        match current.kind {
            EventKind::Departing => {
                let next = events
                    .get(cursor + 1)
                    .filter(|next| next.kind == EventKind::Arriving);
                if let Some(next) = next {
                    if let Some(minutes) = elapsed_minutes(current.timestamp, next.timestamp) {
                        scan.sessions.push(FlightSession::completed(
                            current.tail_number.clone(),
                            current.timestamp,
                            next.timestamp,
                            minutes,
                        ));
                        cursor += 2;
                        continue;
                    }
                    tracing::warn!(
                        tail_number = %current.tail_number,
                        departed_at = %current.timestamp,
                        arrived_at = %next.timestamp,
                        "arrival precedes departure, refusing pairing"
                    );
                    scan.anomalies.push(NegativeDurationAnomaly {
                        tail_number: current.tail_number.clone(),
                        departed_at: current.timestamp,
                        arrived_at: next.timestamp,
                    });
                }
                scan.sessions.push(FlightSession::in_progress(
                    current.tail_number.clone(),
                    current.timestamp,
                ));
            }
            EventKind::Arriving => {
                scan.sessions.push(FlightSession::arrived_only(
                    current.tail_number.clone(),
                    current.timestamp,
                ));
            }
        }
        cursor += 1;
    }

    scan
}

/// Whole minutes from `outbound` to `inbound`, or `None` if negative.
fn elapsed_minutes(outbound: DateTime<Utc>, inbound: DateTime<Utc>) -> Option<u64> {
    let elapsed = inbound - outbound;
    if elapsed < TimeDelta::zero() {
        return None;
    }
    u64::try_from(elapsed.num_minutes()).ok()
}
