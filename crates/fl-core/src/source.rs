//! Event source port.
//!
//! The core never talks to storage or the network directly. A source hands
//! over one snapshot of raw status records per call; the caller bounds how
//! long that may take.

use std::convert::Infallible;
use std::future::Future;
use std::time::Duration;

use thiserror::Error;

use crate::event::RawStatusEvent;

/// Default time allowed for fetching one snapshot.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// A provider of status event snapshots.
///
/// Implementations live outside the core (SQLite, HTTP, test fixtures).
pub trait EventSource: Send + Sync {
    /// Transport-level failure.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Returns every status record currently in the log, in any order.
    fn fetch_events(
        &self,
    ) -> impl Future<Output = Result<Vec<RawStatusEvent>, Self::Error>> + Send;
}

/// The snapshot could not be obtained.
#[derive(Debug, Error)]
pub enum SourceUnavailable {
    /// The source did not answer within the caller's timeout.
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    /// The source answered with an error.
    #[error("{0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Fetches one snapshot, bounded by `timeout`.
///
/// No partial data is returned on failure.
pub async fn fetch_snapshot<S: EventSource>(
    source: &S,
    timeout: Duration,
) -> Result<Vec<RawStatusEvent>, SourceUnavailable> {
    match tokio::time::timeout(timeout, source.fetch_events()).await {
        Ok(Ok(events)) => {
            tracing::debug!(count = events.len(), "fetched event snapshot");
            Ok(events)
        }
        Ok(Err(err)) => {
            tracing::warn!(error = %err, "event source failed");
            Err(SourceUnavailable::Transport(Box::new(err)))
        }
        Err(_) => {
            tracing::warn!(?timeout, "event source timed out");
            Err(SourceUnavailable::Timeout(timeout))
        }
    }
}

/// A fixed snapshot held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    events: Vec<RawStatusEvent>,
}

impl InMemorySource {
    pub const fn new(events: Vec<RawStatusEvent>) -> Self {
        Self { events }
    }
}

impl EventSource for InMemorySource {
    type Error = Infallible;

    async fn fetch_events(&self) -> Result<Vec<RawStatusEvent>, Self::Error> {
        Ok(self.events.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct SlowSource;

    impl EventSource for SlowSource {
        type Error = Infallible;

        async fn fetch_events(&self) -> Result<Vec<RawStatusEvent>, Self::Error> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(Vec::new())
        }
    }

    #[derive(Debug, Error)]
    #[error("connection refused")]
    struct Refused;

    struct BrokenSource;

    impl EventSource for BrokenSource {
        type Error = Refused;

        async fn fetch_events(&self) -> Result<Vec<RawStatusEvent>, Self::Error> {
            Err(Refused)
        }
    }

    #[tokio::test]
    async fn test_fetch_snapshot_returns_events() {
        let source = InMemorySource::new(vec![RawStatusEvent::default()]);
        let events = fetch_snapshot(&source, DEFAULT_FETCH_TIMEOUT).await.unwrap();
        assert_eq!(events.len(), 1);
    }

    #[tokio::test]
    async fn test_fetch_snapshot_times_out() {
        let err = fetch_snapshot(&SlowSource, Duration::from_millis(100))
            .await
            .unwrap_err();
        assert!(matches!(err, SourceUnavailable::Timeout(d) if d == Duration::from_millis(100)));
    }

    #[tokio::test]
    async fn test_fetch_snapshot_wraps_transport_errors() {
        let err = fetch_snapshot(&BrokenSource, DEFAULT_FETCH_TIMEOUT)
            .await
            .unwrap_err();
        assert!(matches!(err, SourceUnavailable::Transport(_)));
        assert_eq!(err.to_string(), "connection refused");
    }
}
