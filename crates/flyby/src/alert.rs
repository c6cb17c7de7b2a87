//! Alert presentation.
//!
//! The presenter is the display side of a landing event: it shows the
//! alert, hides it again after a fixed time and suppresses repeats of the
//! same flight for a while. Suppression is keyed by flight, separate from
//! the engine's per-aircraft cooldown.

use std::collections::HashMap;
use std::fmt;
use std::io::{self, Write};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use chrono::Utc;
use tracing::{debug, info};

use crate::bus::LandingListener;
use crate::classifier::LandingStatus;
use crate::config::Config;
use crate::event::LandingEvent;
use crate::trace::{record_or_warn, TraceEntry, TraceSink};

const REASON_DISPLAYED: &str = "alert component is being displayed";

/// Something that can put an alert in front of a person.
pub trait AlertRenderer: Send {
    /// Display an alert, replacing any visible one.
    ///
    /// # Errors
    ///
    /// Returns an error if the alert could not be displayed.
    fn show(&mut self, event: &LandingEvent) -> anyhow::Result<()>;

    /// Remove the visible alert.
    ///
    /// # Errors
    ///
    /// Returns an error if the alert could not be removed.
    fn hide(&mut self) -> anyhow::Result<()>;
}

struct Shown {
    event: LandingEvent,
    at: Instant,
}

struct PresenterState {
    renderer: Box<dyn AlertRenderer>,
    visible: Option<Shown>,
    recent: HashMap<String, Instant>,
}

/// Landing listener that renders alerts with auto-hide and suppression.
pub struct AlertPresenter {
    auto_hide: Duration,
    suppression: Duration,
    trace: Option<Arc<dyn TraceSink>>,
    state: Mutex<PresenterState>,
}

impl fmt::Debug for AlertPresenter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        f.debug_struct("AlertPresenter")
            .field("auto_hide", &self.auto_hide)
            .field("suppression", &self.suppression)
            .field("visible", &state.visible.as_ref().map(|s| &s.event.hex))
            .field("suppressed", &state.recent.len())
            .finish_non_exhaustive()
    }
}

impl AlertPresenter {
    /// Create a presenter.
    #[must_use]
    pub fn new(
        renderer: Box<dyn AlertRenderer>,
        auto_hide: Duration,
        suppression: Duration,
    ) -> Self {
        Self {
            auto_hide,
            suppression,
            trace: None,
            state: Mutex::new(PresenterState {
                renderer,
                visible: None,
                recent: HashMap::new(),
            }),
        }
    }

    /// Create a presenter with the configured timings.
    #[must_use]
    pub fn from_config(config: &Config, renderer: Box<dyn AlertRenderer>) -> Self {
        Self::new(renderer, config.auto_hide(), config.suppression_window())
    }

    /// Record an `alert_triggered` trace entry for every displayed alert.
    #[must_use]
    pub fn with_trace(mut self, trace: Option<Arc<dyn TraceSink>>) -> Self {
        self.trace = trace;
        self
    }

    /// Handle a landing event at `now`.
    ///
    /// Returns `true` if the alert was displayed, `false` if it was
    /// suppressed as a repeat.
    ///
    /// # Errors
    ///
    /// Returns the renderer's error.
    pub fn present(&self, event: &LandingEvent, now: Instant) -> anyhow::Result<bool> {
        let key = event.flight_key();
        let mut state = self.lock();

        let suppression = self.suppression;
        state
            .recent
            .retain(|_, shown| now.saturating_duration_since(*shown) < suppression);
        if state.recent.contains_key(&key) {
            debug!(flight = %key, "Suppressing repeat alert");
            return Ok(false);
        }

        state.renderer.show(event)?;
        state.recent.insert(key, now);
        state.visible = Some(Shown {
            event: event.clone(),
            at: now,
        });
        drop(state);

        info!(
            hex = %event.hex,
            flight = %event.flight_number_display,
            origin = %event.origin_city,
            "Alert displayed"
        );
        if let Some(sink) = &self.trace {
            record_or_warn(sink.as_ref(), vec![displayed_entry(event)]);
        }
        Ok(true)
    }

    /// Hide the visible alert once it has been up for the auto-hide time.
    ///
    /// Returns `true` if an alert was hidden.
    ///
    /// # Errors
    ///
    /// Returns the renderer's error.
    pub fn tick(&self, now: Instant) -> anyhow::Result<bool> {
        let mut state = self.lock();
        let expired = state
            .visible
            .as_ref()
            .is_some_and(|shown| now.saturating_duration_since(shown.at) >= self.auto_hide);
        if !expired {
            return Ok(false);
        }

        state.visible = None;
        state.renderer.hide()?;
        debug!("Alert auto-hidden");
        Ok(true)
    }

    /// The alert currently on display.
    #[must_use]
    pub fn visible(&self) -> Option<LandingEvent> {
        self.lock().visible.as_ref().map(|shown| shown.event.clone())
    }

    fn lock(&self) -> MutexGuard<'_, PresenterState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl LandingListener for AlertPresenter {
    fn on_landing_event(&self, event: &LandingEvent) -> anyhow::Result<()> {
        self.present(event, Instant::now()).map(|_| ())
    }
}

fn displayed_entry(event: &LandingEvent) -> TraceEntry {
    TraceEntry {
        hex: event.hex.clone(),
        flight: Some(event.flight_key()),
        altitude: event.altitude_feet,
        speed: Some(event.ground_speed_kts),
        vertical_rate: Some(event.vertical_rate_fpm),
        status: LandingStatus::AlertTriggered,
        reason: REASON_DISPLAYED.to_string(),
        timestamp: Utc::now(),
    }
}

/// Prints alerts to a terminal, ringing the bell for sound.
#[derive(Debug)]
pub struct TerminalRenderer<W = io::Stdout> {
    out: W,
    sound: bool,
}

impl TerminalRenderer {
    /// Render to standard output.
    #[must_use]
    pub fn stdout(sound: bool) -> Self {
        Self::new(io::stdout(), sound)
    }
}

impl<W: Write + Send> TerminalRenderer<W> {
    /// Render to any writer.
    pub fn new(out: W, sound: bool) -> Self {
        Self { out, sound }
    }

    /// Consume the renderer, returning the writer.
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send> AlertRenderer for TerminalRenderer<W> {
    fn show(&mut self, event: &LandingEvent) -> anyhow::Result<()> {
        if self.sound {
            write!(self.out, "\x07")?;
        }
        writeln!(self.out, "=== {} ===", event.title)?;
        writeln!(
            self.out,
            "{} {}  ({})",
            event.airline_code, event.flight_number_display, event.airline_name
        )?;
        writeln!(
            self.out,
            "From:         {} ({})",
            event.origin_city, event.origin_code
        )?;
        writeln!(self.out, "Registration: {}", event.registration)?;
        writeln!(
            self.out,
            "Altitude:     {:.0} ft  Speed: {:.0} kt  Vertical: {:.0} ft/min",
            event.altitude_feet, event.ground_speed_kts, event.vertical_rate_fpm
        )?;
        writeln!(self.out, "Flight time:  {}", event.flight_time_label)?;
        self.out.flush()?;
        Ok(())
    }

    fn hide(&mut self) -> anyhow::Result<()> {
        writeln!(self.out, "(alert cleared)")?;
        self.out.flush()?;
        Ok(())
    }
}
