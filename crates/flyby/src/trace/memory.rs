//! In-process trace ring.

use std::collections::VecDeque;
use std::sync::Mutex;

use chrono::Utc;

use super::{TraceEntry, TraceLog, TraceSink};
use crate::error::{Error, Result};

/// A capped in-memory trace log. Oldest batches are evicted first.
#[derive(Debug)]
pub struct MemoryTraceSink {
    capacity: usize,
    logs: Mutex<VecDeque<TraceLog>>,
}

impl MemoryTraceSink {
    /// Create a sink retaining at most `capacity` batches.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            logs: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    /// Maximum number of retained batches.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn logs(&self) -> Result<std::sync::MutexGuard<'_, VecDeque<TraceLog>>> {
        self.logs
            .lock()
            .map_err(|_| Error::internal("trace log lock poisoned"))
    }
}

impl TraceSink for MemoryTraceSink {
    fn record(&self, entries: Vec<TraceEntry>) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }
        let mut logs = self.logs()?;
        logs.push_front(TraceLog {
            entries,
            last_updated: Utc::now(),
        });
        logs.truncate(self.capacity);
        Ok(())
    }

    fn read_all(&self) -> Result<Vec<TraceLog>> {
        Ok(self.logs()?.iter().cloned().collect())
    }

    fn clear(&self) -> Result<()> {
        self.logs()?.clear();
        Ok(())
    }
}
