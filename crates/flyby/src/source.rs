//! Telemetry and schedule feeds.
//!
//! The engine only sees the two traits here. Live feeds use `reqwest`;
//! file feeds replay a saved JSON document on every fetch.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::{debug, trace};

use crate::aircraft::TelemetryFrame;
use crate::config::{Config, ScheduleMode, TelemetryMode};
use crate::error::{Error, Result};
use crate::schedule::ScheduleFrame;

const USER_AGENT: &str = concat!("flyby/", env!("CARGO_PKG_VERSION"));

/// A feed of aircraft snapshots.
#[async_trait]
pub trait TelemetrySource: Send + Sync {
    /// Fetch the aircraft currently tracked.
    ///
    /// Returns `Ok(None)` when the feed does not apply right now, for
    /// example because the display shows a different airport.
    ///
    /// # Errors
    ///
    /// Returns a transient error if the feed could not be read.
    async fn fetch(&self) -> Result<Option<TelemetryFrame>>;

    /// Short name used in logs.
    fn name(&self) -> &'static str;
}

/// A feed of scheduled flights.
#[async_trait]
pub trait ScheduleSource: Send + Sync {
    /// Load the full schedule.
    ///
    /// # Errors
    ///
    /// Returns a transient error if the feed could not be read.
    async fn load(&self) -> Result<ScheduleFrame>;

    /// Short name used in logs.
    fn name(&self) -> &'static str;
}

/// The airport the display is currently showing, shared with the feed.
#[derive(Clone, Default)]
pub struct CurrentAirport(Arc<RwLock<Option<String>>>);

impl fmt::Debug for CurrentAirport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CurrentAirport").field(&self.get()).finish()
    }
}

impl CurrentAirport {
    /// Create a selection, optionally preset.
    #[must_use]
    pub fn new(code: Option<String>) -> Self {
        Self(Arc::new(RwLock::new(code)))
    }

    /// Change the selected airport.
    pub fn set(&self, code: Option<String>) {
        *self.0.write().unwrap_or_else(PoisonError::into_inner) = code;
    }

    /// The selected airport, if any.
    #[must_use]
    pub fn get(&self) -> Option<String> {
        self.0.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Check if the selection is the given airport (case-insensitive).
    #[must_use]
    pub fn is(&self, code: &str) -> bool {
        self.0
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_deref()
            .is_some_and(|current| current.eq_ignore_ascii_case(code))
    }
}

fn build_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
        .map_err(Error::from)
}

async fn get_json<T: DeserializeOwned>(
    client: &Client,
    url: &str,
    bearer_token: Option<&str>,
) -> Result<T> {
    let mut request = client.get(url);
    if let Some(token) = bearer_token {
        request = request.bearer_auth(token);
    }

    let response = request.send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(Error::HttpStatus {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }
    Ok(response.json().await?)
}

async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|source| Error::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Live aircraft feed over HTTP.
#[derive(Debug, Clone)]
pub struct HttpTelemetrySource {
    client: Client,
    url: String,
    bearer_token: Option<String>,
    monitored_airport: String,
    current_airport: CurrentAirport,
}

impl HttpTelemetrySource {
    /// Create a feed for `url`, active while `current_airport` is
    /// `monitored_airport`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(
        url: impl Into<String>,
        monitored_airport: impl Into<String>,
        current_airport: CurrentAirport,
        timeout: Duration,
    ) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout)?,
            url: url.into(),
            bearer_token: None,
            monitored_airport: monitored_airport.into(),
            current_airport,
        })
    }

    /// Forward a bearer token with every request.
    #[must_use]
    pub fn with_bearer_token(mut self, token: Option<String>) -> Self {
        self.bearer_token = token.filter(|t| !t.is_empty());
        self
    }
}

#[async_trait]
impl TelemetrySource for HttpTelemetrySource {
    async fn fetch(&self) -> Result<Option<TelemetryFrame>> {
        if !self.current_airport.is(&self.monitored_airport) {
            trace!(
                monitored = %self.monitored_airport,
                current = ?self.current_airport.get(),
                "Not the monitored airport, skipping telemetry"
            );
            return Ok(None);
        }

        let frame: TelemetryFrame =
            get_json(&self.client, &self.url, self.bearer_token.as_deref()).await?;
        debug!(aircraft = frame.len(), "Fetched telemetry");
        Ok(Some(frame))
    }

    fn name(&self) -> &'static str {
        "http-telemetry"
    }
}

/// Replays a saved aircraft feed file.
#[derive(Debug, Clone)]
pub struct FileTelemetrySource {
    path: PathBuf,
}

impl FileTelemetrySource {
    /// Create a replay feed.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl TelemetrySource for FileTelemetrySource {
    async fn fetch(&self) -> Result<Option<TelemetryFrame>> {
        read_json(&self.path).await.map(Some)
    }

    fn name(&self) -> &'static str {
        "file-telemetry"
    }
}

/// Flight-data API for one airport.
#[derive(Debug, Clone)]
pub struct HttpScheduleSource {
    client: Client,
    url: String,
}

impl HttpScheduleSource {
    /// Create a feed for `{base_url}/{airport_code}`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(base_url: &str, airport_code: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout)?,
            url: format!("{}/{}", base_url.trim_end_matches('/'), airport_code),
        })
    }

    /// The request URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl ScheduleSource for HttpScheduleSource {
    async fn load(&self) -> Result<ScheduleFrame> {
        get_json(&self.client, &self.url, None).await
    }

    fn name(&self) -> &'static str {
        "http-schedule"
    }
}

/// Loads a local schedule file, e.g. `flightData.json`.
#[derive(Debug, Clone)]
pub struct FileScheduleSource {
    path: PathBuf,
}

impl FileScheduleSource {
    /// Create a file-backed schedule.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl ScheduleSource for FileScheduleSource {
    async fn load(&self) -> Result<ScheduleFrame> {
        read_json(&self.path).await
    }

    fn name(&self) -> &'static str {
        "file-schedule"
    }
}

/// No schedule; every landing uses placeholders.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyScheduleSource;

#[async_trait]
impl ScheduleSource for EmptyScheduleSource {
    async fn load(&self) -> Result<ScheduleFrame> {
        Ok(ScheduleFrame::default())
    }

    fn name(&self) -> &'static str {
        "empty-schedule"
    }
}

/// Build the telemetry feed selected by the configuration.
///
/// # Errors
///
/// Returns an error if file mode has no path or the HTTP client fails.
pub fn telemetry_from_config(
    config: &Config,
    current_airport: CurrentAirport,
) -> Result<Arc<dyn TelemetrySource>> {
    let telemetry = &config.telemetry;
    Ok(match telemetry.mode {
        TelemetryMode::Http => Arc::new(
            HttpTelemetrySource::new(
                telemetry.url.clone(),
                telemetry.monitored_airport.clone(),
                current_airport,
                config.telemetry_timeout(),
            )?
            .with_bearer_token(telemetry.bearer_token.clone()),
        ),
        TelemetryMode::File => {
            let path = telemetry.file_path.clone().ok_or_else(|| Error::ConfigValidation {
                message: "telemetry.file_path is required in file mode".to_string(),
            })?;
            Arc::new(FileTelemetrySource::new(path))
        }
    })
}

/// Build the schedule feed selected by the configuration.
///
/// # Errors
///
/// Returns an error if file mode has no path or the HTTP client fails.
pub fn schedule_from_config(config: &Config) -> Result<Arc<dyn ScheduleSource>> {
    let schedule = &config.schedule;
    Ok(match schedule.mode {
        ScheduleMode::None => Arc::new(EmptyScheduleSource),
        ScheduleMode::File => {
            let path = schedule.file_path.clone().ok_or_else(|| Error::ConfigValidation {
                message: "schedule.file_path is required in file mode".to_string(),
            })?;
            Arc::new(FileScheduleSource::new(path))
        }
        ScheduleMode::Http => Arc::new(HttpScheduleSource::new(
            &schedule.base_url,
            &schedule.airport_code,
            config.telemetry_timeout(),
        )?),
    })
}
