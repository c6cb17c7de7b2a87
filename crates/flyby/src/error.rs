//! Error types for flyby.
//!
//! This module defines all error types used throughout the flyby crate.
//! Nothing here is fatal to a running engine: fetch and listener failures
//! are logged and the next tick starts clean.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for flyby operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Feed Errors ===
    /// A telemetry or schedule fetch failed. The poll loop skips the tick.
    #[error("failed to fetch from {source_name}: {message}")]
    Fetch {
        /// Name of the source that failed.
        source_name: &'static str,
        /// Description of what went wrong.
        message: String,
    },

    /// An HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// A feed returned a non-success status code.
    #[error("{url} returned status {status}")]
    HttpStatus {
        /// The requested URL.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    // === Trace Store Errors ===
    /// Failed to open or create the trace database.
    #[error("failed to open trace store at {path}: {source}")]
    TraceStoreOpen {
        /// Path to the database file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: rusqlite::Error,
    },

    /// A trace store query failed.
    #[error("trace store query failed: {0}")]
    TraceStoreQuery(#[from] rusqlite::Error),

    /// Failed to run trace store migrations.
    #[error("trace store migration failed: {message}")]
    TraceStoreMigration {
        /// Description of what went wrong.
        message: String,
    },

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === Engine Errors ===
    /// A registered listener failed while handling an event.
    #[error("listener {listener_id} failed: {message}")]
    Listener {
        /// Registry id of the failing listener.
        listener_id: u64,
        /// Description of the failure.
        message: String,
    },

    /// The engine is already running.
    #[error("engine already running")]
    EngineAlreadyRunning,

    /// The engine is not running.
    #[error("engine not running")]
    EngineNotRunning,

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to read a feed file.
    #[error("failed to read {path}: {source}")]
    FileRead {
        /// Path that couldn't be read.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Generic Errors ===
    /// An internal error occurred (bug).
    #[error("internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for flyby operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a new fetch error.
    #[must_use]
    pub fn fetch(source_name: &'static str, message: impl Into<String>) -> Self {
        Self::Fetch {
            source_name,
            message: message.into(),
        }
    }

    /// Create a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Create a new listener error.
    #[must_use]
    pub fn listener(listener_id: u64, message: impl Into<String>) -> Self {
        Self::Listener {
            listener_id,
            message: message.into(),
        }
    }

    /// Check if this error is a transient feed failure.
    ///
    /// Transient errors skip one tick; the next tick retries independently.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Fetch { .. }
                | Self::Http(_)
                | Self::HttpStatus { .. }
                | Self::FileRead { .. }
                | Self::Json(_)
        )
    }

    /// Check if this error came from a listener callback.
    #[must_use]
    pub fn is_listener_failure(&self) -> bool {
        matches!(self, Self::Listener { .. })
    }
}
