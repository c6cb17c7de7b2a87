//! Persistent trace log backed by `SQLite`.
//!
//! Mirrors the capped, newest-first semantics of the in-memory ring but
//! survives restarts, so `flyby trace show` can inspect what a running
//! watcher decided.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use tracing::{debug, info, warn};

use super::{migrations, TraceEntry, TraceLog, TraceSink};
use crate::classifier::LandingStatus;
use crate::error::{Error, Result};

/// Capped trace log in a local `SQLite` database.
#[derive(Debug)]
pub struct SqliteTraceSink {
    path: PathBuf,
    capacity: usize,
    conn: Mutex<Connection>,
}

impl SqliteTraceSink {
    /// Open or create a trace database at the given path.
    ///
    /// Creates the parent directories if they don't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open(path: impl AsRef<Path>, capacity: usize) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        debug!("Opening trace store at {}", path.display());
        let conn = Connection::open(&path).map_err(|source| Error::TraceStoreOpen {
            path: path.clone(),
            source,
        })?;
        conn.execute_batch(
            "PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL; PRAGMA foreign_keys=ON;",
        )?;
        migrations::initialize_schema(&conn)?;

        info!("Trace store opened at {}", path.display());
        Ok(Self::with_connection(path, capacity, conn))
    }

    /// Create an in-memory trace store.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory(capacity: usize) -> Result<Self> {
        let path = PathBuf::from(":memory:");
        let conn = Connection::open_in_memory().map_err(|source| Error::TraceStoreOpen {
            path: path.clone(),
            source,
        })?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        migrations::initialize_schema(&conn)?;
        Ok(Self::with_connection(path, capacity, conn))
    }

    fn with_connection(path: PathBuf, capacity: usize, conn: Connection) -> Self {
        Self {
            path,
            capacity: capacity.max(1),
            conn: Mutex::new(conn),
        }
    }

    /// Path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of retained batches.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn count(&self) -> Result<i64> {
        let conn = self.conn()?;
        let count = conn.query_row("SELECT COUNT(*) FROM trace_batches", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Delete all but the most recent `keep` batches.
    ///
    /// Returns the number of batches deleted.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    pub fn prune_keep_recent(&self, keep: usize) -> Result<usize> {
        let conn = self.conn()?;
        Self::prune(&conn, keep)
    }

    fn prune(conn: &Connection, keep: usize) -> Result<usize> {
        let keep = i64::try_from(keep).unwrap_or(i64::MAX);
        conn.execute(
            r"
            DELETE FROM trace_entries WHERE batch_id NOT IN (
                SELECT id FROM trace_batches ORDER BY id DESC LIMIT ?1
            )
            ",
            [keep],
        )?;
        let affected = conn.execute(
            r"
            DELETE FROM trace_batches WHERE id NOT IN (
                SELECT id FROM trace_batches ORDER BY id DESC LIMIT ?1
            )
            ",
            [keep],
        )?;
        if affected > 0 {
            debug!(pruned = affected, "Pruned old trace batches");
        }
        Ok(affected)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::internal("trace store lock poisoned"))
    }

    fn row_to_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<TraceEntry> {
        let status_str: String = row.get(5)?;
        let timestamp_str: String = row.get(7)?;

        let status = status_str.parse().unwrap_or_else(|e| {
            warn!("{e}, defaulting to altitude_only");
            LandingStatus::AltitudeOnly
        });

        Ok(TraceEntry {
            hex: row.get(0)?,
            flight: row.get(1)?,
            altitude: row.get(2)?,
            speed: row.get(3)?,
            vertical_rate: row.get(4)?,
            status,
            reason: row.get(6)?,
            timestamp: parse_timestamp(7, &timestamp_str)?,
        })
    }
}

fn parse_timestamp(column: usize, value: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                column,
                rusqlite::types::Type::Text,
                Box::new(e),
            )
        })
}

impl TraceSink for SqliteTraceSink {
    fn record(&self, entries: Vec<TraceEntry>) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }

        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO trace_batches (last_updated) VALUES (?1)",
            [Utc::now().to_rfc3339()],
        )?;
        let batch_id = tx.last_insert_rowid();

        {
            let mut stmt = tx.prepare(
                r"
                INSERT INTO trace_entries
                    (batch_id, position, hex, flight, altitude, speed, vertical_rate,
                     status, reason, timestamp)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                ",
            )?;
            for (position, entry) in entries.iter().enumerate() {
                stmt.execute(params![
                    batch_id,
                    i64::try_from(position).unwrap_or(i64::MAX),
                    entry.hex,
                    entry.flight,
                    entry.altitude,
                    entry.speed,
                    entry.vertical_rate,
                    entry.status.to_string(),
                    entry.reason,
                    entry.timestamp.to_rfc3339(),
                ])?;
            }
        }

        Self::prune(&tx, self.capacity)?;
        tx.commit()?;
        Ok(())
    }

    fn read_all(&self) -> Result<Vec<TraceLog>> {
        let conn = self.conn()?;
        let mut batches = conn.prepare(
            "SELECT id, last_updated FROM trace_batches ORDER BY id DESC LIMIT ?1",
        )?;
        let mut entries = conn.prepare(
            r"
            SELECT hex, flight, altitude, speed, vertical_rate, status, reason, timestamp
            FROM trace_entries WHERE batch_id = ?1 ORDER BY position
            ",
        )?;

        let limit = i64::try_from(self.capacity).unwrap_or(i64::MAX);
        let rows = batches
            .query_map([limit], |row| {
                let id: i64 = row.get(0)?;
                let updated: String = row.get(1)?;
                Ok((id, parse_timestamp(1, &updated)?))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut logs = Vec::with_capacity(rows.len());
        for (id, last_updated) in rows {
            let batch = entries
                .query_map([id], Self::row_to_entry)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            logs.push(TraceLog {
                entries: batch,
                last_updated,
            });
        }
        Ok(logs)
    }

    fn clear(&self) -> Result<()> {
        let conn = self.conn()?;
        conn.execute_batch("DELETE FROM trace_entries; DELETE FROM trace_batches;")?;
        info!("Cleared trace store");
        Ok(())
    }
}
