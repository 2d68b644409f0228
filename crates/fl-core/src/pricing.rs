//! Concession fee pricing.
//!
//! ```text
//! fee = base_rate × flight_hours × (1 - discount) × (1 + escalation)
//! ```
//!
//! The discount is chosen from the aircraft's cumulative completed hours over
//! the whole session set being priced, not from the single session. Pricing a
//! subset of an aircraft's history can therefore move its sessions into a
//! different tier; every priced session carries the `cumulative_hours` and
//! `tier` it was priced with so the result can be re-derived.

use std::collections::HashMap;
use std::fmt::Write;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::session::FlightSession;
use crate::types::TailNumber;

/// Policy errors.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PolicyError {
    /// A policy field is outside its sane bounds.
    #[error("policy {field} out of range: {value} (expected {expected})")]
    OutOfRange {
        field: &'static str,
        value: f64,
        expected: &'static str,
    },
}

/// Discount band between two cumulative-hour bounds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundedTier {
    /// Exclusive lower bound.
    pub lower_hours: f64,
    /// Inclusive upper bound.
    pub upper_hours: f64,
    /// Fraction taken off the fee, 0.0 to 1.0.
    pub discount: f64,
}

/// Discount band above a cumulative-hour bound.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OpenTier {
    /// Exclusive lower bound.
    pub lower_hours: f64,
    /// Fraction taken off the fee, 0.0 to 1.0.
    pub discount: f64,
}

/// Pricing configuration.
///
/// An explicit value: nothing in the crate reads pricing state from anywhere
/// else. Missing fields deserialize to the defaults.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CostPolicy {
    /// Currency units per flown hour.
    pub base_rate_per_hour: f64,
    pub tier1: BoundedTier,
    pub tier2: OpenTier,
    /// Markup applied after discounting, as a fraction.
    pub escalation: f64,
}

impl Default for CostPolicy {
    fn default() -> Self {
        Self {
            base_rate_per_hour: 702.0,
            tier1: BoundedTier {
                lower_hours: 3000.0,
                upper_hours: 8000.0,
                discount: 0.80,
            },
            tier2: OpenTier {
                lower_hours: 8000.0,
                discount: 0.90,
            },
            escalation: 0.15,
        }
    }
}

/// Which discount band an aircraft falls in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscountTier {
    /// No discount.
    Base,
    Tier1,
    Tier2,
}

impl DiscountTier {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Base => "base",
            Self::Tier1 => "tier1",
            Self::Tier2 => "tier2",
        }
    }
}

impl std::fmt::Display for DiscountTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl CostPolicy {
    /// Rejects policies that would produce meaningless fees.
    pub fn validate(&self) -> Result<(), PolicyError> {
        check(
            "base_rate_per_hour",
            self.base_rate_per_hour,
            self.base_rate_per_hour > 0.0,
            "a finite value above 0",
        )?;
        check(
            "tier1.discount",
            self.tier1.discount,
            (0.0..=1.0).contains(&self.tier1.discount),
            "between 0 and 1",
        )?;
        check(
            "tier2.discount",
            self.tier2.discount,
            (0.0..=1.0).contains(&self.tier2.discount),
            "between 0 and 1",
        )?;
        check(
            "tier2.discount",
            self.tier2.discount,
            self.tier2.discount >= self.tier1.discount,
            "at least tier1.discount",
        )?;
        check(
            "escalation",
            self.escalation,
            self.escalation >= 0.0,
            "a finite value of at least 0",
        )?;
        check(
            "tier1.lower_hours",
            self.tier1.lower_hours,
            self.tier1.lower_hours >= 0.0,
            "a finite value of at least 0",
        )?;
        check(
            "tier1.upper_hours",
            self.tier1.upper_hours,
            self.tier1.upper_hours > self.tier1.lower_hours,
            "above tier1.lower_hours",
        )?;
        check(
            "tier2.lower_hours",
            self.tier2.lower_hours,
            (self.tier2.lower_hours - self.tier1.upper_hours).abs() <= f64::EPSILON,
            "equal to tier1.upper_hours",
        )?;
        Ok(())
    }

    /// Discount band for an aircraft with the given cumulative hours.
    pub fn tier_for(&self, cumulative_hours: f64) -> DiscountTier {
        if cumulative_hours > self.tier2.lower_hours {
            DiscountTier::Tier2
        } else if cumulative_hours > self.tier1.lower_hours {
            DiscountTier::Tier1
        } else {
            DiscountTier::Base
        }
    }

    /// Discount fraction applied in a band.
    pub const fn discount(&self, tier: DiscountTier) -> f64 {
        match tier {
            DiscountTier::Base => 0.0,
            DiscountTier::Tier1 => self.tier1.discount,
            DiscountTier::Tier2 => self.tier2.discount,
        }
    }

    /// Fee for one session, rounded to whole currency units and never negative.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn session_cost(&self, flight_hours: f64, tier: DiscountTier) -> u64 {
        let base_cost = self.base_rate_per_hour * flight_hours;
        let cost = base_cost * (1.0 - self.discount(tier)) * (1.0 + self.escalation);
        if cost.is_finite() && cost > 0.0 {
            cost.round() as u64
        } else {
            0
        }
    }

    /// Human-readable rendering of the formula with this policy's values.
    pub fn formula(&self) -> String {
        let mut output = String::new();
        writeln!(
            output,
            "Concession fee = (base rate × flight hours) × (1 - discount) × (1 + escalation)"
        )
        .unwrap();
        writeln!(output, "  Base rate:  {} per hour", self.base_rate_per_hour).unwrap();
        writeln!(
            output,
            "  {}-{} hrs: discount {}%",
            self.tier1.lower_hours,
            self.tier1.upper_hours,
            percent(self.tier1.discount)
        )
        .unwrap();
        writeln!(
            output,
            "  Above {} hrs: discount {}%",
            self.tier2.lower_hours,
            percent(self.tier2.discount)
        )
        .unwrap();
        writeln!(output, "  Escalation: {}%", percent(self.escalation)).unwrap();
        writeln!(output, "  Discounts follow each tail number's cumulative hours").unwrap();
        output
    }
}

fn check(
    field: &'static str,
    value: f64,
    in_range: bool,
    expected: &'static str,
) -> Result<(), PolicyError> {
    if value.is_finite() && in_range {
        Ok(())
    } else {
        Err(PolicyError::OutOfRange {
            field,
            value,
            expected,
        })
    }
}

/// Fraction as a percentage, rounded to two decimals.
fn percent(fraction: f64) -> f64 {
    (fraction * 10_000.0).round() / 100.0
}

/// A session with its fee.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PricedSession {
    #[serde(flatten)]
    pub session: FlightSession,
    /// Hours flown in this session; zero unless completed.
    pub flight_hours: f64,
    /// The aircraft's completed hours across the priced set.
    pub cumulative_hours: f64,
    pub tier: DiscountTier,
    pub total_cost: u64,
}

/// Completed hours per aircraft across `sessions`.
///
/// Summed in whole minutes and converted once, so the total does not depend
/// on session order.
#[allow(clippy::cast_precision_loss)]
pub fn cumulative_hours(sessions: &[FlightSession]) -> HashMap<&TailNumber, f64> {
    let mut minutes: HashMap<&TailNumber, u64> = HashMap::new();
    for session in sessions {
        *minutes.entry(&session.tail_number).or_insert(0) += session.billable_minutes();
    }
    minutes
        .into_iter()
        .map(|(tail, total)| (tail, total as f64 / 60.0))
        .collect()
}

/// Prices every session against its aircraft's cumulative hours.
///
/// The policy is validated first; nothing is priced with an out-of-range policy.
pub fn price(
    sessions: &[FlightSession],
    policy: &CostPolicy,
) -> Result<Vec<PricedSession>, PolicyError> {
    policy.validate()?;

    let totals = cumulative_hours(sessions);
    let priced: Vec<PricedSession> = sessions
        .iter()
        .map(|session| {
            let cumulative = totals.get(&session.tail_number).copied().unwrap_or(0.0);
            let tier = policy.tier_for(cumulative);
            let flight_hours = session.flight_hours();
            PricedSession {
                session: session.clone(),
                flight_hours,
                cumulative_hours: cumulative,
                tier,
                total_cost: policy.session_cost(flight_hours, tier),
            }
        })
        .collect();

    tracing::debug!(
        sessions = priced.len(),
        aircraft = totals.len(),
        "priced flight sessions"
    );
    Ok(priced)
}
