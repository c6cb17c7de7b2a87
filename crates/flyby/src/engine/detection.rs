//! Synchronous detection state.
//!
//! [`DetectionCore`] owns everything the engine mutates: the schedule
//! cache, the per-aircraft cooldowns and the currently alerted aircraft.
//! It never blocks and does no I/O: trace entries are handed back to the
//! caller to record once the lock is released. Tests drive it with
//! synthetic instants.

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};

use crate::aircraft::{AircraftSnapshot, TelemetryFrame};
use crate::classifier::{LandingClassifier, LandingStatus};
use crate::config::DetectionConfig;
use crate::event::LandingEvent;
use crate::schedule::{FlightScheduleCache, ScheduledFlight};
use crate::trace::TraceEntry;

use super::timer::TimerQueue;

const REASON_WILL_ALERT: &str = "will trigger alert (awaiting display confirmation)";
const REASON_SAME_AS_CURRENT: &str = "same as current alert";
const REASON_COOLING_DOWN: &str = "alerted recently, cooling down";
const REASON_DEFERRED: &str = "another aircraft alerted this poll";

/// Running counters kept by the engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EngineStats {
    /// Telemetry frames processed.
    pub ticks: u64,
    /// Landing events produced.
    pub alerts: u64,
    /// Failed telemetry fetches.
    pub fetch_errors: u64,
    /// Successful schedule loads.
    pub schedule_refreshes: u64,
    /// Failed schedule loads.
    pub schedule_errors: u64,
}

/// What one processed frame produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameOutcome {
    /// The landing event, if an aircraft alerted.
    pub event: Option<LandingEvent>,
    /// Debug-band entries, recorded as one trace batch.
    pub trace: Vec<TraceEntry>,
}

/// A pending per-aircraft cooldown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Cooldown {
    /// Transponder id.
    pub hex: String,
    /// Time until the aircraft may alert again.
    pub remaining: Duration,
}

/// Read-only snapshot of engine state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EngineState {
    /// Whether the polling loop is running.
    pub running: bool,
    /// The most recently alerted aircraft, until its cooldown expires.
    pub current_alerted_hex: Option<String>,
    /// Pending cooldowns, soonest first.
    pub cooldowns: Vec<Cooldown>,
    /// When the schedule was last loaded successfully.
    pub last_schedule_refresh: Option<DateTime<Utc>>,
    /// Number of cached scheduled flights.
    pub scheduled_flights: usize,
    /// Counters.
    pub stats: EngineStats,
}

/// Engine state machine, driven by the polling loop.
pub struct DetectionCore {
    classifier: LandingClassifier,
    reset_interval: Duration,
    schedule_window: Duration,
    schedule: FlightScheduleCache,
    cooldowns: TimerQueue<String>,
    current: Option<String>,
    stats: EngineStats,
    last_schedule_refresh: Option<DateTime<Utc>>,
}

impl std::fmt::Debug for DetectionCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DetectionCore")
            .field("classifier", &self.classifier)
            .field("reset_interval", &self.reset_interval)
            .field("current", &self.current)
            .field("cooldowns", &self.cooldowns.len())
            .field("scheduled_flights", &self.schedule.len())
            .finish_non_exhaustive()
    }
}

impl DetectionCore {
    /// Create a fresh core.
    ///
    /// `schedule_window` is the freshness window of the schedule cache.
    #[must_use]
    pub fn new(
        thresholds: DetectionConfig,
        reset_interval: Duration,
        schedule_window: Duration,
    ) -> Self {
        Self {
            classifier: LandingClassifier::new(thresholds),
            reset_interval,
            schedule_window,
            schedule: FlightScheduleCache::new(),
            cooldowns: TimerQueue::new(),
            current: None,
            stats: EngineStats::default(),
            last_schedule_refresh: None,
        }
    }

    /// Classify every aircraft in a frame and decide whether to alert.
    ///
    /// At most one event is produced per frame: the first aircraft in feed
    /// order that meets all criteria and is not cooling down. Aircraft in
    /// the debug altitude band come back as one trace batch.
    pub fn process_snapshot(&mut self, frame: &TelemetryFrame, now: Instant) -> FrameOutcome {
        self.expire_cooldowns(now);
        self.stats.ticks += 1;

        let timestamp = Utc::now();
        let mut entries = Vec::new();
        let mut event = None;

        for aircraft in &frame.aircraft {
            let Some(classification) = self.classifier.classify(aircraft) else {
                continue;
            };

            let mut reason = classification.reason;
            if classification.criteria.all() {
                let decision = if self.cooldowns.contains(&aircraft.hex) {
                    if self.current.as_deref() == Some(aircraft.hex.as_str()) {
                        REASON_SAME_AS_CURRENT
                    } else {
                        REASON_COOLING_DOWN
                    }
                } else if event.is_some() {
                    REASON_DEFERRED
                } else {
                    event = Some(self.alert(aircraft, now));
                    REASON_WILL_ALERT
                };
                reason = decision.to_string();
            }

            if classification.within_debug_band {
                if let Some(status) = classification.status {
                    entries.push(TraceEntry::new(
                        aircraft,
                        classification.altitude_ft,
                        status,
                        reason,
                        timestamp,
                    ));
                }
            }
        }

        debug!(
            aircraft = frame.len(),
            traced = entries.len(),
            alerted = event.is_some(),
            "Processed telemetry frame"
        );

        FrameOutcome {
            event,
            trace: entries,
        }
    }

    fn alert(&mut self, aircraft: &AircraftSnapshot, now: Instant) -> LandingEvent {
        let flight = aircraft
            .match_ident()
            .and_then(|ident| self.schedule.find_match(ident));
        let event = LandingEvent::enrich(aircraft, flight);

        self.current = Some(aircraft.hex.clone());
        self.cooldowns
            .schedule(aircraft.hex.clone(), now + self.reset_interval);
        self.stats.alerts += 1;

        info!(
            hex = %aircraft.hex,
            flight = %event.flight_number_display,
            airline = %event.airline_code,
            matched = event.matched,
            "Landing detected"
        );
        event
    }

    /// Drop cooldowns that have run out. Clears the current aircraft when
    /// its own cooldown expires.
    pub fn expire_cooldowns(&mut self, now: Instant) -> Vec<String> {
        let expired = self.cooldowns.pop_expired(now);
        for hex in &expired {
            if self.current.as_deref() == Some(hex.as_str()) {
                debug!(hex = %hex, "Alert reset");
                self.current = None;
            }
        }
        expired
    }

    /// Check if the schedule cache needs reloading.
    #[must_use]
    pub fn refresh_due(&self, now: Instant) -> bool {
        !self.schedule.is_fresh(now, self.schedule_window)
    }

    /// Replace the cached schedule.
    ///
    /// `requested_at` is when the load started, so load latency does not
    /// push the next refresh back by a whole interval.
    pub fn apply_schedule(&mut self, flights: Vec<ScheduledFlight>, requested_at: Instant) {
        let count = flights.len();
        self.schedule.replace(flights, requested_at);
        self.last_schedule_refresh = Some(Utc::now());
        self.stats.schedule_refreshes += 1;
        info!(flights = count, "Flight schedule refreshed");
    }

    /// Count a failed telemetry fetch.
    pub fn record_fetch_error(&mut self) {
        self.stats.fetch_errors += 1;
    }

    /// Count a failed schedule load.
    pub fn record_schedule_error(&mut self) {
        self.stats.schedule_errors += 1;
    }

    /// The earliest pending cooldown.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.cooldowns.next_deadline()
    }

    /// The currently alerted aircraft.
    #[must_use]
    pub fn current(&self) -> Option<&str> {
        self.current.as_deref()
    }

    /// Check if an aircraft is cooling down.
    #[must_use]
    pub fn is_cooling_down(&self, hex: &str) -> bool {
        self.cooldowns.contains(&hex.to_string())
    }

    /// The cached schedule.
    #[must_use]
    pub fn schedule(&self) -> &FlightScheduleCache {
        &self.schedule
    }

    /// Drop every pending cooldown and the current aircraft.
    pub fn clear_timers(&mut self) {
        self.cooldowns.clear();
        self.current = None;
    }

    /// Snapshot the state. `running` is left false for the caller to set.
    #[must_use]
    pub fn state(&self, now: Instant) -> EngineState {
        EngineState {
            running: false,
            current_alerted_hex: self.current.clone(),
            cooldowns: self
                .cooldowns
                .pending(now)
                .into_iter()
                .map(|(hex, remaining)| Cooldown { hex, remaining })
                .collect(),
            last_schedule_refresh: self.last_schedule_refresh,
            scheduled_flights: self.schedule.len(),
            stats: self.stats,
        }
    }
}
