//! Totals over priced sessions, per aircraft and per month.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::pricing::{DiscountTier, PricedSession};
use crate::session::SessionState;
use crate::types::TailNumber;

/// Fleet-wide totals.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Totals {
    pub sessions: usize,
    pub completed: usize,
    pub in_progress: usize,
    pub arrived_only: usize,
    pub flight_minutes: u64,
    pub total_cost: u64,
}

impl Totals {
    fn add(&mut self, priced: &PricedSession) {
        self.sessions += 1;
        match priced.session.state {
            SessionState::Completed => self.completed += 1,
            SessionState::InProgress => self.in_progress += 1,
            SessionState::ArrivedOnly => self.arrived_only += 1,
        }
        self.flight_minutes += priced.session.billable_minutes();
        self.total_cost += priced.total_cost;
    }

    #[allow(clippy::cast_precision_loss)]
    pub fn flight_hours(&self) -> f64 {
        self.flight_minutes as f64 / 60.0
    }
}

/// Totals for one aircraft.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AircraftSummary {
    pub tail_number: TailNumber,
    /// The aggregate the aircraft's sessions were priced against.
    pub cumulative_hours: f64,
    pub tier: DiscountTier,
    pub totals: Totals,
}

/// Totals for one calendar month (UTC, by session date).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthSummary {
    /// `YYYY-MM`.
    pub month: String,
    pub totals: Totals,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FleetSummary {
    pub totals: Totals,
    pub aircraft: Vec<AircraftSummary>,
    pub months: Vec<MonthSummary>,
}

/// Aggregates priced sessions. Aircraft and months come out in ascending order.
pub fn summarize(priced: &[PricedSession]) -> FleetSummary {
    let mut totals = Totals::default();
    let mut aircraft: BTreeMap<&TailNumber, AircraftSummary> = BTreeMap::new();
    let mut months: BTreeMap<String, Totals> = BTreeMap::new();

    for session in priced {
        totals.add(session);
        aircraft
            .entry(&session.session.tail_number)
            .or_insert_with(|| AircraftSummary {
                tail_number: session.session.tail_number.clone(),
                cumulative_hours: session.cumulative_hours,
                tier: session.tier,
                totals: Totals::default(),
            })
            .totals
            .add(session);
        months
            .entry(session.session.date.format("%Y-%m").to_string())
            .or_default()
            .add(session);
    }

    FleetSummary {
        totals,
        aircraft: aircraft.into_values().collect(),
        months: months
            .into_iter()
            .map(|(month, totals)| MonthSummary { month, totals })
            .collect(),
    }
}

/// Formats minutes as "Xh Ym", keeping the hours even when they are zero.
pub fn format_duration(minutes: u64) -> String {
    let hours = minutes / 60;
    let minutes = minutes % 60;
    format!("{hours}h {minutes}m")
}
