//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use fl_core::{CostPolicy, SessionState};

/// Fleet ledger.
///
/// Rebuilds flight sessions from an aircraft status log and prices them
/// with tiered concession fees.
#[derive(Debug, Parser)]
#[command(name = "fl", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Import status records (JSONL on stdin) into the local database.
    Import,

    /// Show the database and per-aircraft activity.
    Status,

    /// List reconstructed flight sessions.
    Sessions {
        #[command(flatten)]
        filter: SessionFilter,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Price flight sessions under the concession policy.
    Costs {
        #[command(flatten)]
        filter: SessionFilter,

        #[command(flatten)]
        policy: PolicyArgs,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Fleet totals per aircraft and per month.
    Summary {
        #[command(flatten)]
        policy: PolicyArgs,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show the effective pricing policy.
    Policy {
        #[command(flatten)]
        policy: PolicyArgs,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },
}

/// Narrows which sessions are shown.
#[derive(Debug, Clone, Default, Args)]
pub struct SessionFilter {
    /// Only show this tail number (case-insensitive).
    #[arg(long)]
    pub tail: Option<String>,

    /// Only show sessions in this state (completed, in-progress, arrived).
    #[arg(long)]
    pub state: Option<SessionState>,
}

impl SessionFilter {
    pub fn matches(&self, tail_number: &str, state: SessionState) -> bool {
        let tail_ok = self
            .tail
            .as_deref()
            .is_none_or(|tail| tail.trim().eq_ignore_ascii_case(tail_number));
        let state_ok = self.state.is_none_or(|wanted| wanted == state);
        tail_ok && state_ok
    }
}

/// Per-invocation overrides of the configured policy.
#[derive(Debug, Clone, Default, Args)]
pub struct PolicyArgs {
    /// Base rate per flight hour.
    #[arg(long)]
    pub base_rate: Option<f64>,

    /// Discount for the first tier, as a fraction (0.8 = 80%).
    #[arg(long)]
    pub tier1_discount: Option<f64>,

    /// Discount for the second tier, as a fraction.
    #[arg(long)]
    pub tier2_discount: Option<f64>,

    /// Escalation applied after discounting, as a fraction.
    #[arg(long)]
    pub escalation: Option<f64>,
}

impl PolicyArgs {
    /// Applies the overrides on top of `base`. Validation is left to pricing.
    pub fn apply(&self, mut base: CostPolicy) -> CostPolicy {
        if let Some(rate) = self.base_rate {
            base.base_rate_per_hour = rate;
        }
        if let Some(discount) = self.tier1_discount {
            base.tier1.discount = discount;
        }
        if let Some(discount) = self.tier2_discount {
            base.tier2.discount = discount;
        }
        if let Some(escalation) = self.escalation {
            base.escalation = escalation;
        }
        base
    }
}
