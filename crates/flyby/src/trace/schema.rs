//! `SQLite` schema for the trace store.

/// One row per recorded batch.
pub const CREATE_BATCHES_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS trace_batches (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    last_updated TEXT NOT NULL
)
";

/// One row per traced aircraft, owned by a batch.
pub const CREATE_ENTRIES_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS trace_entries (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    batch_id INTEGER NOT NULL REFERENCES trace_batches(id) ON DELETE CASCADE,
    position INTEGER NOT NULL,
    hex TEXT NOT NULL,
    flight TEXT,
    altitude REAL NOT NULL,
    speed REAL,
    vertical_rate REAL,
    status TEXT NOT NULL,
    reason TEXT NOT NULL,
    timestamp TEXT NOT NULL
)
";

/// Entries are always read per batch.
pub const CREATE_BATCH_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_trace_entries_batch ON trace_entries(batch_id, position)
";

/// Key-value metadata, holds the schema version.
pub const CREATE_METADATA_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
";

/// All schema creation statements in order.
pub const SCHEMA_STATEMENTS: &[&str] = &[
    CREATE_BATCHES_TABLE,
    CREATE_ENTRIES_TABLE,
    CREATE_BATCH_INDEX,
    CREATE_METADATA_TABLE,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entries_table_columns() {
        for column in [
            "hex TEXT NOT NULL",
            "altitude REAL NOT NULL",
            "status TEXT NOT NULL",
            "reason TEXT NOT NULL",
            "timestamp TEXT NOT NULL",
        ] {
            assert!(CREATE_ENTRIES_TABLE.contains(column), "missing {column}");
        }
    }

    #[test]
    fn test_entries_cascade_with_batch() {
        assert!(CREATE_ENTRIES_TABLE.contains("ON DELETE CASCADE"));
    }
}
