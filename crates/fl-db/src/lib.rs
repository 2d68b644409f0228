//! Storage layer for aircraft status events.
//!
//! Persists the raw status log using `rusqlite` and exposes it to the core as
//! an [`EventSource`].
//!
//! # Thread Safety
//!
//! The [`Database`] type wraps a `rusqlite::Connection`, which is `Send` but not `Sync`.
//! [`SqliteEventSource`] therefore holds only a path and opens its own connection
//! on a blocking task for every snapshot.
//!
//! # Schema
//!
//! Columns are stored exactly as received. A record with a missing tail number or
//! an unparseable timestamp is still kept; validation happens in the core, which
//! reports such records instead of silently dropping them.
//!
//! Timestamps are TEXT in whatever form the log delivered them (normally
//! ISO 8601). Anything that orders by time parses them first.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use fl_core::event::parse_timestamp;
use fl_core::{EventSource, RawStatusEvent};
use rusqlite::{Connection, OpenFlags, params};
use thiserror::Error;

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// An error from the underlying database.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// The blocking task reading the database did not complete.
    #[error("database task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Database connection wrapper.
///
/// See the [module documentation](self) for thread safety considerations.
pub struct Database {
    conn: Connection,
}

/// A status record as stored in the database.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventRecord {
    pub id: String,
    pub tail_number: Option<String>,
    pub status: Option<String>,
    pub direction: Option<String>,
    pub timestamp: Option<String>,
}

impl From<EventRecord> for RawStatusEvent {
    fn from(record: EventRecord) -> Self {
        Self {
            id: Some(record.id),
            tail_number: record.tail_number,
            status: record.status,
            direction: record.direction,
            timestamp: record.timestamp,
        }
    }
}

/// Event count and latest timestamp for one tail number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TailActivity {
    pub tail_number: String,
    pub events: usize,
    pub last_event: Option<DateTime<Utc>>,
}

impl Database {
    /// Opens a database at the given path, creating it if necessary.
    ///
    /// The database schema is automatically initialized on first open.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Opens an existing database for reading.
    ///
    /// Fails instead of creating the file, so a mistyped path is reported
    /// rather than read as an empty log.
    pub fn open_read_only(path: &Path) -> Result<Self, DbError> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        Ok(Self { conn })
    }

    /// Opens an in-memory database.
    ///
    /// Useful for testing. The database is destroyed when the connection closes.
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Initializes the database schema.
    ///
    /// This is idempotent - safe to call on an already-initialized database.
    fn init(&self) -> Result<(), DbError> {
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS status_events (
                id TEXT PRIMARY KEY,
                tail_number TEXT,
                status TEXT,
                direction TEXT,
                timestamp TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_status_events_tail_timestamp
                ON status_events(tail_number, timestamp);
            CREATE INDEX IF NOT EXISTS idx_status_events_timestamp
                ON status_events(timestamp);
            ",
        )?;
        Ok(())
    }

    /// Inserts status records, ignoring ids that are already stored.
    ///
    /// Returns the number of newly inserted rows.
    pub fn insert_events(&mut self, events: &[EventRecord]) -> Result<usize, DbError> {
        if events.is_empty() {
            return Ok(0);
        }
        let tx = self.conn.transaction()?;
        let mut inserted = 0;
        {
            let mut stmt = tx.prepare(
                "
                INSERT OR IGNORE INTO status_events
                (id, tail_number, status, direction, timestamp)
                VALUES (?, ?, ?, ?, ?)
                ",
            )?;
            for event in events {
                inserted += stmt.execute(params![
                    event.id,
                    event.tail_number,
                    event.status,
                    event.direction,
                    event.timestamp,
                ])?;
            }
        }
        tx.commit()?;
        tracing::debug!(received = events.len(), inserted, "stored status events");
        Ok(inserted)
    }

    /// Lists all records in insertion order.
    pub fn list_events(&self) -> Result<Vec<EventRecord>, DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT id, tail_number, status, direction, timestamp
            FROM status_events
            ORDER BY rowid ASC
            ",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(EventRecord {
                id: row.get(0)?,
                tail_number: row.get(1)?,
                status: row.get(2)?,
                direction: row.get(3)?,
                timestamp: row.get(4)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Per-tail event counts and the latest valid timestamp, ordered by tail.
    ///
    /// Records without a tail number are not counted. Unparseable timestamps
    /// count as events but never as the latest one.
    pub fn tail_activity(&self) -> Result<Vec<TailActivity>, DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT TRIM(tail_number), timestamp
            FROM status_events
            WHERE tail_number IS NOT NULL AND TRIM(tail_number) != ''
            ",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, Option<String>>(1)?))
        })?;

        let mut activity: BTreeMap<String, TailActivity> = BTreeMap::new();
        for row in rows {
            let (tail_number, timestamp) = row?;
            let entry = activity
                .entry(tail_number.clone())
                .or_insert_with(|| TailActivity {
                    tail_number,
                    events: 0,
                    last_event: None,
                });
            entry.events += 1;
            if let Some(parsed) = timestamp.as_deref().and_then(parse_timestamp) {
                entry.last_event = entry.last_event.max(Some(parsed));
            }
        }
        Ok(activity.into_values().collect())
    }
}

/// Serves snapshots from a SQLite database file.
#[derive(Debug, Clone)]
pub struct SqliteEventSource {
    path: PathBuf,
}

impl SqliteEventSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl EventSource for SqliteEventSource {
    type Error = DbError;

    async fn fetch_events(&self) -> Result<Vec<RawStatusEvent>, Self::Error> {
        let path = self.path.clone();
        let records = tokio::task::spawn_blocking(move || {
            let db = Database::open_read_only(&path)?;
            db.list_events()
        })
        .await??;
        Ok(records.into_iter().map(RawStatusEvent::from).collect())
    }
}
