//! HTTP event source for the fleet ledger.
//!
//! Fetches the status log as a JSON array from a remote endpoint. Records are
//! decoded one at a time so that a single malformed entry is reported by the
//! core instead of failing the whole snapshot.

use std::fmt;
use std::time::Duration;

use fl_core::{EventSource, RawStatusEvent};
use reqwest::Url;
use serde_json::{Map, Value};
use thiserror::Error;

/// Default request timeout for snapshot fetches.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP source errors.
#[derive(Debug, Error)]
pub enum HttpSourceError {
    /// The configured URL was rejected.
    #[error("invalid source URL: {reason}")]
    InvalidUrl { reason: String },
    /// Failed to build HTTP client.
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),
    /// HTTP request failed.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// The endpoint answered with a non-success status.
    #[error("source returned status {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
    /// Failed to parse response.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Reads status event snapshots from an HTTP endpoint.
///
/// # Thread Safety
///
/// The source is safe to clone and share across threads. Each clone shares
/// the underlying HTTP connection pool.
#[derive(Clone)]
pub struct HttpEventSource {
    http: reqwest::Client,
    url: Url,
}

impl fmt::Debug for HttpEventSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The path and query may carry access tokens.
        f.debug_struct("HttpEventSource")
            .field("host", &self.url.host_str())
            .finish_non_exhaustive()
    }
}

impl HttpEventSource {
    /// Creates a source for the given URL with the default request timeout.
    pub fn new(url: &str) -> Result<Self, HttpSourceError> {
        Self::with_timeout(url, DEFAULT_TIMEOUT)
    }

    /// Creates a source whose requests give up after `timeout`.
    pub fn with_timeout(url: &str, timeout: Duration) -> Result<Self, HttpSourceError> {
        let url = url.trim();
        if url.is_empty() {
            return Err(HttpSourceError::InvalidUrl {
                reason: "URL cannot be empty".to_string(),
            });
        }
        let url = Url::parse(url).map_err(|err| HttpSourceError::InvalidUrl {
            reason: err.to_string(),
        })?;

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(HttpSourceError::ClientBuild)?;

        Ok(Self { http, url })
    }
}

impl EventSource for HttpEventSource {
    type Error = HttpSourceError;

    async fn fetch_events(&self) -> Result<Vec<RawStatusEvent>, Self::Error> {
        let response = self.http.get(self.url.clone()).send().await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(HttpSourceError::Status { status, body });
        }

        let events = parse_snapshot(&body)?;
        tracing::debug!(
            count = events.len(),
            host = ?self.url.host_str(),
            "fetched remote snapshot"
        );
        Ok(events)
    }
}

/// Decodes a JSON array of status records.
///
/// Only the outer shape is enforced. Scalars are stringified and Mongo-style
/// `{"$oid": ..}` / `{"$date": ..}` wrappers are unwrapped; anything else is
/// left for the core to reject.
fn parse_snapshot(body: &str) -> Result<Vec<RawStatusEvent>, HttpSourceError> {
    let value: Value = serde_json::from_str(body)
        .map_err(|err| HttpSourceError::InvalidResponse(err.to_string()))?;
    let Value::Array(items) = value else {
        return Err(HttpSourceError::InvalidResponse(
            "expected a JSON array of status records".to_string(),
        ));
    };
    Ok(items.iter().map(decode_record).collect())
}

/// Decodes one upstream status record.
///
/// Non-object values decode to an empty record, which the core rejects.
pub fn decode_record(item: &Value) -> RawStatusEvent {
    let Value::Object(fields) = item else {
        return RawStatusEvent::default();
    };
    RawStatusEvent {
        id: field(fields, "_id").or_else(|| field(fields, "id")),
        tail_number: field(fields, "tail_number"),
        status: field(fields, "status"),
        direction: field(fields, "direction"),
        timestamp: field(fields, "timestamp"),
    }
}

fn field(fields: &Map<String, Value>, key: &str) -> Option<String> {
    scalar(fields.get(key)?)
}

fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Object(inner) => inner
            .get("$oid")
            .or_else(|| inner.get("$date"))
            .and_then(scalar)
            .or_else(|| Some(value.to_string())),
        Value::Array(_) => Some(value.to_string()),
    }
}
