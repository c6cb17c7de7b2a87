//! Trace store schema versioning.
//!
//! The version lives in the `metadata` table. Each migration moves the
//! schema forward by exactly one version.

use rusqlite::Connection;

use crate::error::{Error, Result};

use super::schema::SCHEMA_STATEMENTS;

/// The current schema version.
pub const CURRENT_VERSION: i32 = 2;

const VERSION_KEY: &str = "schema_version";

/// Create the base schema and bring it up to [`CURRENT_VERSION`].
///
/// # Errors
///
/// Returns an error if schema creation or a migration fails, or if the
/// database was written by a newer version.
pub fn initialize_schema(conn: &Connection) -> Result<()> {
    for statement in SCHEMA_STATEMENTS {
        conn.execute(statement, [])?;
    }

    let version = schema_version(conn)?;
    if version > CURRENT_VERSION {
        return Err(Error::TraceStoreMigration {
            message: format!("database schema {version} is newer than supported {CURRENT_VERSION}"),
        });
    }
    for next in (version + 1)..=CURRENT_VERSION {
        migrate(conn, next)?;
        set_schema_version(conn, next)?;
    }
    Ok(())
}

/// Read the schema version; 0 for a fresh database.
///
/// # Errors
///
/// Returns an error if the stored version is unreadable.
pub fn schema_version(conn: &Connection) -> Result<i32> {
    let result = conn.query_row(
        "SELECT value FROM metadata WHERE key = ?1",
        [VERSION_KEY],
        |row| row.get::<_, String>(0),
    );

    match result {
        Ok(value) => value.parse().map_err(|_| Error::TraceStoreMigration {
            message: format!("invalid schema version: {value}"),
        }),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(0),
        Err(e) => Err(e.into()),
    }
}

fn set_schema_version(conn: &Connection, version: i32) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO metadata (key, value) VALUES (?1, ?2)",
        (VERSION_KEY, version.to_string()),
    )?;
    Ok(())
}

fn migrate(conn: &Connection, version: i32) -> Result<()> {
    match version {
        // Base schema
        1 => Ok(()),
        2 => {
            conn.execute(
                "CREATE INDEX IF NOT EXISTS idx_trace_entries_hex ON trace_entries(hex)",
                [],
            )?;
            Ok(())
        }
        _ => Err(Error::TraceStoreMigration {
            message: format!("unknown migration version: {version}"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> Connection {
        Connection::open_in_memory().expect("failed to create in-memory database")
    }

    fn table_exists(conn: &Connection, name: &str) -> bool {
        let count: i32 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
                [name],
                |row| row.get(0),
            )
            .unwrap();
        count == 1
    }

    #[test]
    fn test_initialize_creates_tables() {
        let conn = test_db();
        initialize_schema(&conn).unwrap();

        assert!(table_exists(&conn, "trace_batches"));
        assert!(table_exists(&conn, "trace_entries"));
        assert!(table_exists(&conn, "metadata"));
        assert_eq!(schema_version(&conn).unwrap(), CURRENT_VERSION);
    }

    #[test]
    fn test_initialize_is_idempotent() {
        let conn = test_db();
        initialize_schema(&conn).unwrap();
        initialize_schema(&conn).unwrap();
        assert_eq!(schema_version(&conn).unwrap(), CURRENT_VERSION);
    }

    #[test]
    fn test_upgrade_from_v1_adds_hex_index() {
        let conn = test_db();
        for statement in SCHEMA_STATEMENTS {
            conn.execute(statement, []).unwrap();
        }
        set_schema_version(&conn, 1).unwrap();

        initialize_schema(&conn).unwrap();

        let indexes: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='index' AND tbl_name='trace_entries'")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .filter_map(std::result::Result::ok)
            .collect();
        assert!(indexes.iter().any(|n| n == "idx_trace_entries_hex"));
        assert!(indexes.iter().any(|n| n == "idx_trace_entries_batch"));
    }

    #[test]
    fn test_newer_schema_is_rejected() {
        let conn = test_db();
        initialize_schema(&conn).unwrap();
        set_schema_version(&conn, CURRENT_VERSION + 1).unwrap();

        let err = initialize_schema(&conn).unwrap_err();
        assert!(err.to_string().contains("newer"));
    }

    #[test]
    fn test_invalid_version_value() {
        let conn = test_db();
        initialize_schema(&conn).unwrap();
        conn.execute(
            "UPDATE metadata SET value = 'two' WHERE key = ?1",
            [VERSION_KEY],
        )
        .unwrap();

        assert!(schema_version(&conn).is_err());
    }

    #[test]
    fn test_unknown_migration() {
        let conn = test_db();
        let err = migrate(&conn, 999).unwrap_err();
        assert!(err.to_string().contains("unknown migration version"));
    }
}
