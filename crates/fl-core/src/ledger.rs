//! The query-facing entry point: fetch, reconstruct, price.

use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use crate::diagnostics::Diagnostics;
use crate::pricing::{CostPolicy, PolicyError, PricedSession, price};
use crate::session::{Reconstruction, reconstruct_raw};
use crate::source::{DEFAULT_FETCH_TIMEOUT, EventSource, SourceUnavailable, fetch_snapshot};

/// Errors that abort a ledger invocation.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// The event snapshot could not be obtained.
    #[error("event source unavailable: {0}")]
    SourceUnavailable(#[from] SourceUnavailable),
    /// The supplied policy was rejected before pricing.
    #[error(transparent)]
    PolicyOutOfRange(#[from] PolicyError),
}

/// Priced sessions for one snapshot, plus what was recovered along the way.
#[derive(Debug, Clone, Serialize)]
pub struct PricedReport {
    pub sessions: Vec<PricedSession>,
    pub diagnostics: Diagnostics,
}

/// Reconstructs and prices sessions from an [`EventSource`].
///
/// Each call fetches a fresh snapshot; nothing is cached between calls.
#[derive(Debug)]
pub struct Ledger<S> {
    source: S,
    policy: CostPolicy,
    fetch_timeout: Duration,
}

impl<S: EventSource> Ledger<S> {
    /// Creates a ledger with the default policy and fetch timeout.
    pub fn new(source: S) -> Self {
        Self {
            source,
            policy: CostPolicy::default(),
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }

    /// Sets how long a snapshot fetch may take.
    #[must_use]
    pub const fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    /// The stored policy.
    pub const fn policy(&self) -> &CostPolicy {
        &self.policy
    }

    /// Replaces the stored policy after validating it.
    pub fn set_policy(&mut self, policy: CostPolicy) -> Result<(), PolicyError> {
        policy.validate()?;
        self.policy = policy;
        Ok(())
    }

    /// Fetches a snapshot and reconstructs sessions without pricing them.
    pub async fn sessions(&self) -> Result<Reconstruction, LedgerError> {
        let snapshot = fetch_snapshot(&self.source, self.fetch_timeout).await?;
        let reconstruction = reconstruct_raw(&snapshot);
        log_diagnostics(&reconstruction.diagnostics);
        Ok(reconstruction)
    }

    /// Fetches a snapshot and prices it under `policy`.
    ///
    /// The policy is checked before the source is contacted.
    pub async fn priced_sessions(&self, policy: &CostPolicy) -> Result<PricedReport, LedgerError> {
        policy.validate()?;
        let Reconstruction {
            sessions,
            diagnostics,
        } = self.sessions().await?;
        let sessions = price(&sessions, policy)?;
        Ok(PricedReport {
            sessions,
            diagnostics,
        })
    }

    /// Prices a fresh snapshot under the stored policy.
    pub async fn priced_with_stored_policy(&self) -> Result<PricedReport, LedgerError> {
        self.priced_sessions(&self.policy).await
    }
}

fn log_diagnostics(diagnostics: &Diagnostics) {
    tracing::info!(
        received = diagnostics.events_received,
        accepted = diagnostics.events_accepted,
        rejected = diagnostics.rejected.len(),
        anomalies = diagnostics.anomalies.len(),
        "ledger snapshot reconstructed"
    );
}
