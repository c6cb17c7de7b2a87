//! Logging setup for flyby.
//!
//! Engine, feed and trace-store modules log under their own targets
//! (`flyby::engine`, `flyby::source`, `flyby::trace`, ...), so the default
//! filter can keep the per-frame engine chatter and the per-batch store
//! chatter at different levels. `RUST_LOG` replaces the whole filter.

use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Verbosity level for logging output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// Suppress all output except errors.
    Quiet,
    /// Alerts, schedule refreshes and feed failures.
    #[default]
    Normal,
    /// Adds per-frame engine summaries.
    Verbose,
    /// Everything, including per-aircraft decisions and store writes.
    Trace,
}

impl Verbosity {
    /// Base level for the `flyby` target.
    #[must_use]
    pub fn to_level_filter(&self) -> Level {
        match self {
            Self::Quiet => Level::ERROR,
            Self::Normal => Level::INFO,
            Self::Verbose => Level::DEBUG,
            Self::Trace => Level::TRACE,
        }
    }

    /// Level for the trace store, which writes on every processed frame.
    fn trace_store_level(self) -> Level {
        match self {
            Self::Quiet => Level::ERROR,
            Self::Normal | Self::Verbose => Level::WARN,
            Self::Trace => Level::TRACE,
        }
    }

    /// Level for the HTTP client stack underneath the feeds.
    fn http_level(self) -> Level {
        match self {
            Self::Trace => Level::DEBUG,
            _ => Level::WARN,
        }
    }

    /// The default filter directives for this verbosity.
    #[must_use]
    pub fn directives(&self) -> String {
        let base = self.to_level_filter();
        let http = self.http_level();
        format!(
            "warn,flyby={base},flyby::engine={base},flyby::source={base},\
             flyby::trace={store},reqwest={http},hyper={http}",
            store = self.trace_store_level(),
        )
    }
}

/// Initialize the logging system.
///
/// Call once at startup. `RUST_LOG`, when set and valid, takes precedence
/// over [`Verbosity::directives`].
///
/// # Examples
///
/// ```no_run
/// use flyby::{init_logging, logging::Verbosity};
///
/// init_logging(Verbosity::Verbose);
/// ```
pub fn init_logging(verbosity: Verbosity) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity.directives()));

    let subscriber = tracing_subscriber::registry().with(env_filter).with(
        fmt::layer()
            .with_target(verbosity != Verbosity::Normal)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false),
    );

    // A subscriber may already be installed
    let _ = subscriber.try_init();
}

/// Initialize logging for tests. Only warnings and errors are shown.
#[cfg(test)]
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("warn")
        .with_test_writer()
        .try_init();
}
