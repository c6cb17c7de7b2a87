//! Configuration management for flyby.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults. Every
//! detection threshold and timer interval is tunable here.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "flyby";

/// Default trace database file name.
const TRACE_DB_FILE_NAME: &str = "landing-debug.db";

/// Default number of trace batches retained.
pub const DEFAULT_TRACE_CAPACITY: usize = 10;

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `FLYBY_`, sections split on `__`)
/// 2. TOML config file at `~/.config/flyby/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Landing detection thresholds.
    pub detection: DetectionConfig,
    /// Poll and reset intervals.
    pub polling: PollingConfig,
    /// Debug tracing.
    pub debug: DebugConfig,
    /// Aircraft telemetry feed.
    pub telemetry: TelemetryConfig,
    /// Flight schedule feed.
    pub schedule: ScheduleConfig,
    /// Alert presentation.
    pub alert: AlertConfig,
}

/// Landing detection thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Maximum barometric altitude for landing detection (feet).
    pub altitude_threshold_ft: f64,
    /// Maximum ground speed for landing detection (knots).
    pub speed_threshold_kts: f64,
    /// Vertical rate an aircraft must be below to count as descending (ft/min).
    pub vertical_rate_threshold_fpm: f64,
    /// Relaxed altitude below which aircraft are traced even if they miss
    /// the other criteria (feet).
    pub debug_altitude_threshold_ft: f64,
}

/// Poll and reset intervals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    /// Interval between telemetry snapshots, in seconds.
    pub landing_interval_secs: u64,
    /// Interval between flight schedule refreshes, in seconds. Also the
    /// freshness window of the schedule cache.
    pub flight_data_interval_secs: u64,
    /// Cooldown after an alert before the same aircraft may alert again,
    /// in seconds.
    pub landing_reset_secs: u64,
}

/// Where landing trace batches are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TraceStoreKind {
    /// In-process ring buffer, lost on exit.
    #[default]
    Memory,
    /// Capped local `SQLite` log that survives restarts.
    Sqlite,
}

/// Debug tracing configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DebugConfig {
    /// Record per-aircraft classification decisions.
    pub enabled: bool,
    /// Trace store backend.
    pub trace_store: TraceStoreKind,
    /// Path to the trace database (sqlite store only).
    /// Defaults to `~/.local/share/flyby/landing-debug.db`
    pub trace_path: Option<PathBuf>,
    /// Number of trace batches retained.
    pub capacity: usize,
}

/// Telemetry feed mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TelemetryMode {
    /// Poll the HTTP aircraft feed.
    #[default]
    Http,
    /// Replay a saved feed file on every tick.
    File,
}

/// Aircraft telemetry feed configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Feed mode.
    pub mode: TelemetryMode,
    /// URL of the aircraft feed.
    pub url: String,
    /// Airport whose traffic the feed describes.
    pub monitored_airport: String,
    /// Airport currently shown by the display. Landing detection only runs
    /// while this matches `monitored_airport`.
    pub current_airport: Option<String>,
    /// Bearer token forwarded to the feed, if any.
    pub bearer_token: Option<String>,
    /// Feed file for file mode.
    pub file_path: Option<PathBuf>,
    /// HTTP request timeout, in seconds.
    pub timeout_secs: u64,
}

/// Flight schedule feed mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleMode {
    /// No schedule; alerts use placeholders.
    #[default]
    None,
    /// Load a local schedule file.
    File,
    /// Fetch the schedule from the flight-data API.
    Http,
}

/// Flight schedule feed configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Feed mode.
    pub mode: ScheduleMode,
    /// Schedule file for file mode.
    pub file_path: Option<PathBuf>,
    /// Base URL of the flight-data API; the airport code is appended.
    pub base_url: String,
    /// Airport code requested from the flight-data API.
    pub airport_code: String,
}

/// Alert presentation configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    /// How long a displayed alert stays visible, in seconds.
    pub auto_hide_secs: u64,
    /// How long the same flight is suppressed after being shown, in seconds.
    pub suppression_secs: u64,
    /// Ring the terminal bell when an alert is shown.
    pub sound: bool,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            altitude_threshold_ft: 1000.0,
            speed_threshold_kts: 200.0,
            vertical_rate_threshold_fpm: -50.0,
            debug_altitude_threshold_ft: 1200.0,
        }
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            landing_interval_secs: 15,
            flight_data_interval_secs: 5 * 60,
            landing_reset_secs: 60,
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            trace_store: TraceStoreKind::Memory,
            trace_path: None, // Will be resolved to default at runtime
            capacity: DEFAULT_TRACE_CAPACITY,
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            mode: TelemetryMode::Http,
            url: "https://flyby.colonmelvin.com/rdu/?all".to_string(),
            monitored_airport: "RDU".to_string(),
            current_airport: Some("RDU".to_string()),
            bearer_token: None,
            file_path: None,
            timeout_secs: 10,
        }
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            mode: ScheduleMode::None,
            file_path: None,
            base_url: "https://flyby.colonmelvin.com/api/flight-data".to_string(),
            airport_code: "RDU".to_string(),
        }
    }
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            auto_hide_secs: 30,
            suppression_secs: 5 * 60,
            sound: true,
        }
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed("FLYBY_").split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        let intervals = [
            ("polling.landing_interval_secs", self.polling.landing_interval_secs),
            (
                "polling.flight_data_interval_secs",
                self.polling.flight_data_interval_secs,
            ),
            ("polling.landing_reset_secs", self.polling.landing_reset_secs),
            ("alert.auto_hide_secs", self.alert.auto_hide_secs),
        ];
        for (name, value) in intervals {
            if value == 0 {
                return Err(Error::ConfigValidation {
                    message: format!("{name} must be greater than 0"),
                });
            }
        }

        let detection = &self.detection;
        if detection.vertical_rate_threshold_fpm > 0.0 {
            return Err(Error::ConfigValidation {
                message: format!(
                    "vertical_rate_threshold_fpm ({}) must not be positive",
                    detection.vertical_rate_threshold_fpm
                ),
            });
        }

        if detection.debug_altitude_threshold_ft < detection.altitude_threshold_ft {
            return Err(Error::ConfigValidation {
                message: format!(
                    "debug_altitude_threshold_ft ({}) cannot be below altitude_threshold_ft ({})",
                    detection.debug_altitude_threshold_ft, detection.altitude_threshold_ft
                ),
            });
        }

        if self.debug.capacity == 0 {
            return Err(Error::ConfigValidation {
                message: "debug.capacity must be greater than 0".to_string(),
            });
        }

        if self.telemetry.mode == TelemetryMode::File && self.telemetry.file_path.is_none() {
            return Err(Error::ConfigValidation {
                message: "telemetry.file_path is required in file mode".to_string(),
            });
        }

        if self.schedule.mode == ScheduleMode::File && self.schedule.file_path.is_none() {
            return Err(Error::ConfigValidation {
                message: "schedule.file_path is required in file mode".to_string(),
            });
        }

        Ok(())
    }

    /// Get the trace database path, resolving defaults if not set.
    #[must_use]
    pub fn trace_path(&self) -> PathBuf {
        self.debug
            .trace_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(TRACE_DB_FILE_NAME))
    }

    /// Get the telemetry poll interval.
    #[must_use]
    pub fn landing_poll_interval(&self) -> Duration {
        Duration::from_secs(self.polling.landing_interval_secs)
    }

    /// Get the schedule refresh interval (and cache freshness window).
    #[must_use]
    pub fn flight_data_interval(&self) -> Duration {
        Duration::from_secs(self.polling.flight_data_interval_secs)
    }

    /// Get the per-aircraft alert cooldown.
    #[must_use]
    pub fn landing_reset_interval(&self) -> Duration {
        Duration::from_secs(self.polling.landing_reset_secs)
    }

    /// Get the alert auto-hide delay.
    #[must_use]
    pub fn auto_hide(&self) -> Duration {
        Duration::from_secs(self.alert.auto_hide_secs)
    }

    /// Get the per-flight alert suppression window.
    #[must_use]
    pub fn suppression_window(&self) -> Duration {
        Duration::from_secs(self.alert.suppression_secs)
    }

    /// Get the HTTP timeout for the telemetry feed.
    #[must_use]
    pub fn telemetry_timeout(&self) -> Duration {
        Duration::from_secs(self.telemetry.timeout_secs)
    }
}
