//! Debug tracing of landing classification decisions.
//!
//! Every poll that sees aircraft inside the debug altitude band records one
//! batch of [`TraceEntry`] values. Batches are kept newest-first, capped,
//! and never merged. Nothing read back from a sink influences detection.

mod memory;
pub mod migrations;
pub mod schema;
mod store;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::aircraft::AircraftSnapshot;
use crate::classifier::LandingStatus;
use crate::config::{Config, TraceStoreKind};
use crate::error::Result;

pub use memory::MemoryTraceSink;
pub use store::SqliteTraceSink;

/// One aircraft's classification at one poll.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceEntry {
    /// Transponder id.
    pub hex: String,
    /// Trimmed flight identifier, if any.
    pub flight: Option<String>,
    /// Altitude in feet.
    pub altitude: f64,
    /// Ground speed in knots.
    pub speed: Option<f64>,
    /// Vertical rate in feet per minute.
    pub vertical_rate: Option<f64>,
    /// Diagnostic status.
    pub status: LandingStatus,
    /// Why the status was assigned.
    pub reason: String,
    /// When the decision was made.
    pub timestamp: DateTime<Utc>,
}

impl TraceEntry {
    /// Build an entry for an aircraft.
    #[must_use]
    pub fn new(
        aircraft: &AircraftSnapshot,
        altitude: f64,
        status: LandingStatus,
        reason: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            hex: aircraft.hex.clone(),
            flight: aircraft.flight_ident().map(str::to_string),
            altitude,
            speed: aircraft.ground_speed_kts,
            vertical_rate: aircraft.vertical_rate_fpm,
            status,
            reason: reason.into(),
            timestamp,
        }
    }
}

/// One recorded batch of entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceLog {
    /// The entries, in the order they were recorded.
    pub entries: Vec<TraceEntry>,
    /// When the batch was recorded.
    pub last_updated: DateTime<Utc>,
}

/// A bounded, newest-first log of trace batches.
pub trait TraceSink: Send + Sync {
    /// Record one batch. Empty batches are ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store fails.
    fn record(&self, entries: Vec<TraceEntry>) -> Result<()>;

    /// Read all retained batches, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store fails.
    fn read_all(&self) -> Result<Vec<TraceLog>>;

    /// Drop all retained batches.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store fails.
    fn clear(&self) -> Result<()>;
}

/// Record a batch, logging instead of propagating any failure.
pub fn record_or_warn(sink: &dyn TraceSink, entries: Vec<TraceEntry>) {
    if entries.is_empty() {
        return;
    }
    let count = entries.len();
    match sink.record(entries) {
        Ok(()) => debug!(entries = count, "Recorded trace batch"),
        Err(e) => warn!(error = %e, "Failed to record trace batch"),
    }
}

/// Open the trace sink selected by the configuration.
///
/// Returns `None` when debug tracing is disabled.
///
/// # Errors
///
/// Returns an error if the sqlite store cannot be opened.
pub fn open_sink(config: &Config) -> Result<Option<Arc<dyn TraceSink>>> {
    if !config.debug.enabled {
        return Ok(None);
    }
    let sink: Arc<dyn TraceSink> = match config.debug.trace_store {
        TraceStoreKind::Memory => Arc::new(MemoryTraceSink::new(config.debug.capacity)),
        TraceStoreKind::Sqlite => Arc::new(SqliteTraceSink::open(
            config.trace_path(),
            config.debug.capacity,
        )?),
    };
    Ok(Some(sink))
}
