//! Core domain logic for the fleet ledger.
//!
//! This crate contains the fundamental types and logic for:
//! - Events: validating raw aircraft status records
//! - Sessions: pairing departures and arrivals into flight sessions
//! - Pricing: tiered concession fees driven by each aircraft's cumulative hours
//! - Ledger: fetching a snapshot from an [`EventSource`] and running the above

pub mod diagnostics;
pub mod event;
mod ledger;
pub mod pricing;
pub mod session;
pub mod source;
mod summary;
pub mod types;

pub use diagnostics::{Diagnostics, NegativeDurationAnomaly, RejectedEvent};
pub use event::{EventKind, InvalidEvent, RawStatusEvent, StatusEvent};
pub use ledger::{Ledger, LedgerError, PricedReport};
pub use pricing::{CostPolicy, DiscountTier, PolicyError, PricedSession, price};
pub use session::{FlightSession, Reconstruction, SessionState, reconstruct, reconstruct_raw};
pub use source::{EventSource, InMemorySource, SourceUnavailable};
pub use summary::{AircraftSummary, FleetSummary, MonthSummary, Totals, format_duration, summarize};
pub use types::{TailNumber, ValidationError};
