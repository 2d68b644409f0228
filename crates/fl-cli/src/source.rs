//! Picks the event source from configuration and drives the ledger.

use std::future::Future;

use anyhow::{Context, Result};
use fl_core::{EventSource, Ledger, RawStatusEvent};
use fl_db::{DbError, SqliteEventSource};
use fl_http::{HttpEventSource, HttpSourceError};
use thiserror::Error;

use crate::Config;

/// Either source the CLI can read from.
#[derive(Debug)]
pub enum ConfiguredSource {
    Sqlite(SqliteEventSource),
    Http(HttpEventSource),
}

#[derive(Debug, Error)]
pub enum ConfiguredSourceError {
    #[error(transparent)]
    Sqlite(#[from] DbError),
    #[error(transparent)]
    Http(#[from] HttpSourceError),
}

impl ConfiguredSource {
    /// The remote log if `source_url` is set, otherwise the local database.
    pub fn from_config(config: &Config) -> Result<Self> {
        match config.source_url.as_deref() {
            Some(url) => {
                let source = HttpEventSource::with_timeout(url, config.fetch_timeout())
                    .context("failed to configure HTTP event source")?;
                Ok(Self::Http(source))
            }
            None => Ok(Self::Sqlite(SqliteEventSource::new(&config.database_path))),
        }
    }
}

impl EventSource for ConfiguredSource {
    type Error = ConfiguredSourceError;

    async fn fetch_events(&self) -> Result<Vec<RawStatusEvent>, Self::Error> {
        match self {
            Self::Sqlite(source) => Ok(source.fetch_events().await?),
            Self::Http(source) => Ok(source.fetch_events().await?),
        }
    }
}

/// Builds a ledger over the configured source.
///
/// The stored policy is left at its default; pricing commands pass their
/// effective policy per query.
pub fn ledger(config: &Config) -> Result<Ledger<ConfiguredSource>> {
    let source = ConfiguredSource::from_config(config)?;
    Ok(Ledger::new(source).with_fetch_timeout(config.fetch_timeout()))
}

/// Runs a ledger query to completion on a fresh runtime.
pub fn block_on<F: Future>(future: F) -> Result<F::Output> {
    let runtime = tokio::runtime::Runtime::new().context("failed to initialize tokio runtime")?;
    Ok(runtime.block_on(future))
}
