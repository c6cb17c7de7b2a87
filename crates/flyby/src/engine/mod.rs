//! Landing detection engine.
//!
//! [`LandingDetectionEngine`] runs one polling loop on the tokio runtime.
//! The loop multiplexes the telemetry timer, the schedule refresh timer and
//! the cooldown deadlines in a single `select!`. Fetches run as separate
//! tasks; their results come back tagged with the run generation so that
//! nothing from a stopped run can touch the state of a new one.
//!
//! # Example
//!
//! ```no_run
//! use flyby::{Config, LandingDetectionEngine, LandingEvent};
//! use flyby::source::CurrentAirport;
//!
//! # async fn run() -> flyby::Result<()> {
//! let config = Config::load()?;
//! let airport = CurrentAirport::new(Some("RDU".into()));
//! let engine = LandingDetectionEngine::from_config(&config, airport)?;
//! let _subscription = engine.subscribe(|event: &LandingEvent| -> anyhow::Result<()> {
//!     println!("{} from {}", event.flight_number_display, event.origin_city);
//!     Ok(())
//! });
//! engine.start()?;
//! # Ok(())
//! # }
//! ```

mod detection;
mod timer;

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tokio::sync::Notify;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info, trace, warn};

use crate::aircraft::TelemetryFrame;
use crate::bus::{EventBus, LandingListener, Subscription};
use crate::config::{Config, DetectionConfig};
use crate::error::{Error, Result};
use crate::event::LandingEvent;
use crate::schedule::ScheduleFrame;
use crate::source::{self, CurrentAirport, ScheduleSource, TelemetrySource};
use crate::trace::{self as debug_trace, record_or_warn, TraceSink};

pub use detection::{Cooldown, DetectionCore, EngineState, EngineStats, FrameOutcome};
pub use timer::TimerQueue;

/// Timing and thresholds for one engine.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineSettings {
    /// Landing thresholds.
    pub thresholds: DetectionConfig,
    /// Interval between telemetry polls.
    pub poll_interval: Duration,
    /// Interval between schedule refreshes; also the cache freshness window.
    pub schedule_interval: Duration,
    /// Cooldown after an alert.
    pub reset_interval: Duration,
}

impl EngineSettings {
    /// Take the engine settings from a configuration.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            thresholds: config.detection.clone(),
            poll_interval: config.landing_poll_interval(),
            schedule_interval: config.flight_data_interval(),
            reset_interval: config.landing_reset_interval(),
        }
    }

    /// Check that the loop intervals can drive a timer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigValidation`] for a zero poll or refresh
    /// interval.
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval.is_zero() {
            return Err(Error::ConfigValidation {
                message: "poll interval must be greater than zero".to_string(),
            });
        }
        if self.schedule_interval.is_zero() {
            return Err(Error::ConfigValidation {
                message: "schedule refresh interval must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Cloneable stop flag for a running loop.
#[derive(Debug, Clone, Default)]
struct StopSignal {
    stopped: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl StopSignal {
    fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        // Stores a permit if the loop is not waiting yet
        self.notify.notify_one();
    }

    fn should_stop(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    async fn wait(&self) {
        self.notify.notified().await;
    }
}

#[derive(Debug)]
struct Run {
    generation: u64,
    stop: StopSignal,
    task: JoinHandle<()>,
}

/// Polls telemetry, detects landings and notifies listeners.
pub struct LandingDetectionEngine {
    settings: EngineSettings,
    telemetry: Arc<dyn TelemetrySource>,
    schedule: Arc<dyn ScheduleSource>,
    trace: Option<Arc<dyn TraceSink>>,
    bus: EventBus,
    core: Arc<Mutex<DetectionCore>>,
    generation: Arc<AtomicU64>,
    run: Mutex<Option<Run>>,
}

impl std::fmt::Debug for LandingDetectionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LandingDetectionEngine")
            .field("settings", &self.settings)
            .field("telemetry", &self.telemetry.name())
            .field("schedule", &self.schedule.name())
            .field("tracing", &self.trace.is_some())
            .field("bus", &self.bus)
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

impl LandingDetectionEngine {
    /// Create a stopped engine.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigValidation`] if the settings have a zero poll
    /// or refresh interval.
    pub fn new(
        settings: EngineSettings,
        telemetry: Arc<dyn TelemetrySource>,
        schedule: Arc<dyn ScheduleSource>,
        trace: Option<Arc<dyn TraceSink>>,
    ) -> Result<Self> {
        settings.validate()?;
        let core = new_core(&settings);
        Ok(Self {
            settings,
            telemetry,
            schedule,
            trace,
            bus: EventBus::new(),
            core: Arc::new(Mutex::new(core)),
            generation: Arc::new(AtomicU64::new(0)),
            run: Mutex::new(None),
        })
    }

    /// Build an engine with the feeds and trace sink the configuration selects.
    ///
    /// # Errors
    ///
    /// Returns an error if a feed or the trace store cannot be set up, or
    /// if the configured intervals are zero.
    pub fn from_config(config: &Config, current_airport: CurrentAirport) -> Result<Self> {
        let telemetry = source::telemetry_from_config(config, current_airport)?;
        let schedule = source::schedule_from_config(config)?;
        let trace = debug_trace::open_sink(config)?;
        let settings = EngineSettings::from_config(config);
        Self::new(settings, telemetry, schedule, trace)
    }

    /// The engine settings.
    #[must_use]
    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// The trace sink, when debug tracing is enabled.
    #[must_use]
    pub fn trace_sink(&self) -> Option<Arc<dyn TraceSink>> {
        self.trace.clone()
    }

    /// The event bus landing events are emitted on.
    #[must_use]
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Register a landing listener.
    #[must_use = "dropping the subscription unregisters the listener"]
    pub fn subscribe(&self, listener: impl LandingListener + 'static) -> Subscription {
        self.bus.subscribe(listener)
    }

    /// Start polling on the current tokio runtime.
    ///
    /// Each start begins from fresh state. Both the telemetry poll and the
    /// schedule refresh fire immediately.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EngineAlreadyRunning`] if the loop is running, or an
    /// error if called outside a tokio runtime.
    pub fn start(&self) -> Result<()> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| Error::internal(format!("engine needs a tokio runtime: {e}")))?;

        let mut run = lock(&self.run);
        if run.as_ref().is_some_and(|r| !r.task.is_finished()) {
            return Err(Error::EngineAlreadyRunning);
        }

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        *lock(&self.core) = new_core(&self.settings);

        let stop = StopSignal::default();
        let driver = Driver {
            generation,
            current_generation: Arc::clone(&self.generation),
            stop: stop.clone(),
            core: Arc::clone(&self.core),
            bus: self.bus.clone(),
            trace: self.trace.clone(),
            telemetry: Arc::clone(&self.telemetry),
            schedule: Arc::clone(&self.schedule),
            poll_interval: self.settings.poll_interval,
            schedule_interval: self.settings.schedule_interval,
        };
        let task = runtime.spawn(driver.run());
        *run = Some(Run {
            generation,
            stop,
            task,
        });

        info!(
            generation,
            telemetry = self.telemetry.name(),
            schedule = self.schedule.name(),
            poll_secs = self.settings.poll_interval.as_secs(),
            "Landing detection started"
        );
        Ok(())
    }

    /// Stop polling.
    ///
    /// Clears every pending timer and unregisters every listener. Fetches
    /// still in flight are abandoned.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EngineNotRunning`] if the engine was never started.
    pub fn stop(&self) -> Result<()> {
        let run = lock(&self.run).take().ok_or(Error::EngineNotRunning)?;

        run.stop.stop();
        self.generation.fetch_add(1, Ordering::SeqCst);
        run.task.abort();

        lock(&self.core).clear_timers();
        self.bus.clear();

        info!(generation = run.generation, "Landing detection stopped");
        Ok(())
    }

    /// Check if the polling loop is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        lock(&self.run)
            .as_ref()
            .is_some_and(|r| !r.task.is_finished())
    }

    /// A read-only snapshot of the engine state.
    #[must_use]
    pub fn state(&self) -> EngineState {
        let mut state = lock(&self.core).state(clock_now());
        state.running = self.is_running();
        state
    }

    /// Run a single poll without the loop: refresh the schedule if it is
    /// stale, fetch one frame and process it.
    ///
    /// Returns the landing event, if one was emitted.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EngineAlreadyRunning`] while the loop is running, or
    /// the telemetry fetch error.
    pub async fn poll_once(&self) -> Result<Option<LandingEvent>> {
        if self.is_running() {
            return Err(Error::EngineAlreadyRunning);
        }

        let requested_at = clock_now();
        if lock(&self.core).refresh_due(requested_at) {
            match self.schedule.load().await {
                Ok(frame) => lock(&self.core).apply_schedule(frame.flights, requested_at),
                Err(e) => {
                    warn!(source = self.schedule.name(), error = %e, "Schedule load failed");
                    lock(&self.core).record_schedule_error();
                }
            }
        }

        let Some(frame) = self.telemetry.fetch().await? else {
            debug!(source = self.telemetry.name(), "Telemetry not applicable");
            return Ok(None);
        };

        let event = process_frame(&self.core, self.trace.as_ref(), &frame);
        if let Some(event) = &event {
            self.bus.emit(event);
        }
        Ok(event)
    }
}

impl Drop for LandingDetectionEngine {
    fn drop(&mut self) {
        if let Some(run) = lock(&self.run).take() {
            run.stop.stop();
            run.task.abort();
        }
    }
}

fn new_core(settings: &EngineSettings) -> DetectionCore {
    DetectionCore::new(
        settings.thresholds.clone(),
        settings.reset_interval,
        settings.schedule_interval,
    )
}

/// Run a frame through the core, then record its trace batch with the lock
/// released.
fn process_frame(
    core: &Mutex<DetectionCore>,
    trace: Option<&Arc<dyn TraceSink>>,
    frame: &TelemetryFrame,
) -> Option<LandingEvent> {
    let outcome = lock(core).process_snapshot(frame, clock_now());
    if let Some(sink) = trace {
        record_or_warn(sink.as_ref(), outcome.trace);
    }
    outcome.event
}

/// Current instant on the tokio clock, so a paused test clock applies.
fn clock_now() -> Instant {
    time::Instant::now().into_std()
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

enum Completion {
    Telemetry {
        generation: u64,
        result: Result<Option<TelemetryFrame>>,
    },
    Schedule {
        generation: u64,
        requested_at: Instant,
        result: Result<ScheduleFrame>,
    },
}

/// State owned by one run of the polling loop.
struct Driver {
    generation: u64,
    current_generation: Arc<AtomicU64>,
    stop: StopSignal,
    core: Arc<Mutex<DetectionCore>>,
    bus: EventBus,
    trace: Option<Arc<dyn TraceSink>>,
    telemetry: Arc<dyn TelemetrySource>,
    schedule: Arc<dyn ScheduleSource>,
    poll_interval: Duration,
    schedule_interval: Duration,
}

impl Driver {
    async fn run(self) {
        let mut poll = time::interval(self.poll_interval);
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut refresh = time::interval(self.schedule_interval);
        refresh.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut telemetry_tasks: JoinSet<Completion> = JoinSet::new();
        let mut schedule_tasks: JoinSet<Completion> = JoinSet::new();

        loop {
            if self.stop.should_stop() {
                break;
            }
            let next_reset = lock(&self.core).next_deadline();

            tokio::select! {
                biased;

                () = self.stop.wait() => break,

                Some(joined) = schedule_tasks.join_next() => match joined {
                    Ok(completion) => self.complete(completion),
                    Err(e) => {
                        warn!(error = %e, "Schedule task failed");
                        lock(&self.core).record_schedule_error();
                    }
                },

                Some(joined) = telemetry_tasks.join_next() => match joined {
                    Ok(completion) => self.complete(completion),
                    Err(e) => {
                        warn!(error = %e, "Telemetry task failed");
                        lock(&self.core).record_fetch_error();
                    }
                },

                () = sleep_until(next_reset) => {
                    lock(&self.core).expire_cooldowns(clock_now());
                }

                _ = poll.tick() => {
                    if telemetry_tasks.is_empty() {
                        let source = Arc::clone(&self.telemetry);
                        let generation = self.generation;
                        telemetry_tasks.spawn(async move {
                            Completion::Telemetry { generation, result: source.fetch().await }
                        });
                    } else {
                        debug!("Previous telemetry fetch still running, skipping poll");
                    }
                }

                _ = refresh.tick() => {
                    let requested_at = clock_now();
                    let due = lock(&self.core).refresh_due(requested_at);
                    if due && schedule_tasks.is_empty() {
                        let source = Arc::clone(&self.schedule);
                        let generation = self.generation;
                        schedule_tasks.spawn(async move {
                            let result = source.load().await;
                            Completion::Schedule { generation, requested_at, result }
                        });
                    } else {
                        trace!(due, "Skipping schedule refresh");
                    }
                }
            }
        }

        debug!(generation = self.generation, "Polling loop exited");
    }

    fn is_current(&self, generation: u64) -> bool {
        generation == self.generation
            && !self.stop.should_stop()
            && self.current_generation.load(Ordering::SeqCst) == generation
    }

    fn complete(&self, completion: Completion) {
        match completion {
            Completion::Telemetry { generation, result } => {
                if !self.is_current(generation) {
                    trace!(generation, "Discarding telemetry from a stopped run");
                    return;
                }
                match result {
                    Ok(Some(frame)) => {
                        let event = process_frame(&self.core, self.trace.as_ref(), &frame);
                        if let Some(event) = event {
                            let report = self.bus.emit(&event);
                            debug!(
                                delivered = report.delivered,
                                failed = report.failed,
                                "Landing event delivered"
                            );
                        }
                    }
                    Ok(None) => trace!(source = self.telemetry.name(), "Telemetry not applicable"),
                    Err(e) => {
                        warn!(
                            source = self.telemetry.name(),
                            transient = e.is_transient(),
                            error = %e,
                            "Telemetry fetch failed, skipping poll"
                        );
                        lock(&self.core).record_fetch_error();
                    }
                }
            }
            Completion::Schedule {
                generation,
                requested_at,
                result,
            } => {
                if !self.is_current(generation) {
                    trace!(generation, "Discarding schedule from a stopped run");
                    return;
                }
                match result {
                    Ok(frame) => lock(&self.core).apply_schedule(frame.flights, requested_at),
                    Err(e) => {
                        warn!(source = self.schedule.name(), error = %e, "Schedule load failed");
                        lock(&self.core).record_schedule_error();
                    }
                }
            }
        }
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => time::sleep_until(time::Instant::from_std(deadline)).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aircraft::{AircraftSnapshot, Altitude};
    use crate::schedule::ScheduledFlight;
    use crate::trace::MemoryTraceSink;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;

    #[derive(Default)]
    struct StaticTelemetry {
        frame: Mutex<Option<TelemetryFrame>>,
        failing: AtomicBool,
        calls: AtomicUsize,
        latency: Duration,
    }

    impl StaticTelemetry {
        fn showing(aircraft: Vec<AircraftSnapshot>) -> Arc<Self> {
            let source = Arc::new(Self::default());
            source.show(aircraft);
            source
        }

        fn show(&self, aircraft: Vec<AircraftSnapshot>) {
            *self.frame.lock().unwrap() = Some(TelemetryFrame::new(aircraft));
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TelemetrySource for StaticTelemetry {
        async fn fetch(&self) -> Result<Option<TelemetryFrame>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.latency.is_zero() {
                time::sleep(self.latency).await;
            }
            if self.failing.load(Ordering::SeqCst) {
                return Err(Error::fetch("static", "feed unreachable"));
            }
            Ok(self.frame.lock().unwrap().clone())
        }

        fn name(&self) -> &'static str {
            "static"
        }
    }

    #[derive(Default)]
    struct CountingSchedule {
        flights: Vec<ScheduledFlight>,
        loads: AtomicUsize,
        latency: Duration,
    }

    impl CountingSchedule {
        fn loads(&self) -> usize {
            self.loads.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ScheduleSource for CountingSchedule {
        async fn load(&self) -> Result<ScheduleFrame> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            if !self.latency.is_zero() {
                time::sleep(self.latency).await;
            }
            Ok(ScheduleFrame::new(self.flights.clone()))
        }

        fn name(&self) -> &'static str {
            "counting"
        }
    }

    fn landing(hex: &str, flight: &str) -> AircraftSnapshot {
        AircraftSnapshot::new(hex, Altitude::Feet(600.0))
            .with_flight(flight)
            .with_ground_speed(150.0)
            .with_vertical_rate(-800.0)
    }

    fn engine_with(
        telemetry: Arc<StaticTelemetry>,
        schedule: Arc<CountingSchedule>,
    ) -> LandingDetectionEngine {
        LandingDetectionEngine::new(EngineSettings::default(), telemetry, schedule, None)
            .unwrap()
    }

    fn recorder(engine: &LandingDetectionEngine) -> (Arc<Mutex<Vec<String>>>, Subscription) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let inner = Arc::clone(&seen);
        let subscription = engine.subscribe(move |event: &LandingEvent| -> anyhow::Result<()> {
            inner.lock().unwrap().push(event.hex.clone());
            Ok(())
        });
        (seen, subscription)
    }

    async fn advance(secs: u64) {
        time::sleep(Duration::from_secs(secs)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_alerts_once_per_reset_window() {
        let telemetry = StaticTelemetry::showing(vec![landing("a1", "DAL1234")]);
        let engine = engine_with(Arc::clone(&telemetry), Arc::default());
        let (seen, _sub) = recorder(&engine);

        engine.start().unwrap();
        advance(1).await;
        assert_eq!(*seen.lock().unwrap(), vec!["a1"]);

        // Polls at 15, 30 and 45 seconds see the same aircraft
        advance(50).await;
        assert_eq!(seen.lock().unwrap().len(), 1);
        assert!(telemetry.calls() >= 4);

        advance(10).await;
        assert_eq!(seen.lock().unwrap().len(), 2);

        engine.stop().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_different_aircraft_alerts_during_cooldown() {
        let telemetry = StaticTelemetry::showing(vec![landing("a1", "DAL1234")]);
        let engine = engine_with(Arc::clone(&telemetry), Arc::default());
        let (seen, _sub) = recorder(&engine);

        engine.start().unwrap();
        advance(1).await;
        telemetry.show(vec![landing("a1", "DAL1234"), landing("b2", "UAL55")]);
        advance(15).await;

        assert_eq!(*seen.lock().unwrap(), vec!["a1", "b2"]);
        let state = engine.state();
        assert_eq!(state.current_alerted_hex.as_deref(), Some("b2"));
        assert_eq!(state.cooldowns.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cooldown_expiry_resets_current() {
        let telemetry = StaticTelemetry::showing(vec![landing("a1", "DAL1234")]);
        let engine = engine_with(Arc::clone(&telemetry), Arc::default());

        engine.start().unwrap();
        advance(1).await;
        telemetry.show(Vec::new());
        assert_eq!(engine.state().current_alerted_hex.as_deref(), Some("a1"));

        advance(60).await;
        let state = engine.state();
        assert_eq!(state.current_alerted_hex, None);
        assert!(state.cooldowns.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_errors_do_not_stop_polling() {
        let telemetry = Arc::new(StaticTelemetry::default());
        telemetry.failing.store(true, Ordering::SeqCst);
        let engine = engine_with(Arc::clone(&telemetry), Arc::default());
        let (seen, _sub) = recorder(&engine);

        engine.start().unwrap();
        advance(31).await;
        let state = engine.state();
        assert!(state.running);
        assert_eq!(state.stats.fetch_errors, 3);
        assert_eq!(state.stats.ticks, 0);

        telemetry.failing.store(false, Ordering::SeqCst);
        telemetry.show(vec![landing("a1", "DAL1234")]);
        advance(15).await;
        assert_eq!(*seen.lock().unwrap(), vec!["a1"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_not_applicable_is_silent() {
        let telemetry = Arc::new(StaticTelemetry::default());
        let engine = engine_with(Arc::clone(&telemetry), Arc::default());

        engine.start().unwrap();
        advance(31).await;

        let state = engine.state();
        assert_eq!(telemetry.calls(), 3);
        assert_eq!(state.stats.ticks, 0);
        assert_eq!(state.stats.fetch_errors, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_schedule_refreshes_on_interval() {
        let schedule = Arc::new(CountingSchedule {
            flights: vec![ScheduledFlight::new("DAL1234").with_origin("Atlanta", "ATL")],
            ..CountingSchedule::default()
        });
        let engine = engine_with(Arc::new(StaticTelemetry::default()), Arc::clone(&schedule));

        engine.start().unwrap();
        advance(1).await;
        assert_eq!(schedule.loads(), 1);
        let state = engine.state();
        assert_eq!(state.scheduled_flights, 1);
        assert!(state.last_schedule_refresh.is_some());

        advance(300).await;
        assert_eq!(schedule.loads(), 2);
        assert_eq!(engine.state().stats.schedule_refreshes, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_schedule_load_keeps_refresh_cadence() {
        let schedule = Arc::new(CountingSchedule {
            flights: vec![ScheduledFlight::new("DAL1234")],
            latency: Duration::from_secs(2),
            ..CountingSchedule::default()
        });
        let engine = engine_with(Arc::new(StaticTelemetry::default()), Arc::clone(&schedule));

        engine.start().unwrap();
        advance(5).await;
        assert_eq!(schedule.loads(), 1);

        // Refreshes are requested at 300 and 600, not pushed back by the load time
        advance(300).await;
        assert_eq!(schedule.loads(), 2);
        advance(300).await;
        assert_eq!(schedule.loads(), 3);
        assert_eq!(engine.state().stats.schedule_refreshes, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_lifecycle_errors() {
        let engine = engine_with(Arc::default(), Arc::default());

        assert!(matches!(engine.stop(), Err(Error::EngineNotRunning)));
        engine.start().unwrap();
        assert!(engine.is_running());
        assert!(matches!(engine.start(), Err(Error::EngineAlreadyRunning)));
        assert!(matches!(engine.poll_once().await, Err(Error::EngineAlreadyRunning)));

        engine.stop().unwrap();
        assert!(!engine.is_running());
        assert!(matches!(engine.stop(), Err(Error::EngineNotRunning)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_clears_listeners_and_timers() {
        let telemetry = StaticTelemetry::showing(vec![landing("a1", "DAL1234")]);
        let engine = engine_with(Arc::clone(&telemetry), Arc::default());
        let (seen, _sub) = recorder(&engine);

        engine.start().unwrap();
        advance(1).await;
        engine.stop().unwrap();

        assert!(engine.bus().is_empty());
        let state = engine.state();
        assert!(!state.running);
        assert_eq!(state.current_alerted_hex, None);
        assert!(state.cooldowns.is_empty());

        let calls = telemetry.calls();
        advance(60).await;
        assert_eq!(telemetry.calls(), calls);
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_starts_fresh() {
        let telemetry = StaticTelemetry::showing(vec![landing("a1", "DAL1234")]);
        let engine = engine_with(Arc::clone(&telemetry), Arc::default());

        let (_, first) = recorder(&engine);
        engine.start().unwrap();
        advance(1).await;
        engine.stop().unwrap();
        drop(first);

        // Same aircraft alerts again straight away after a restart
        let (seen, _second) = recorder(&engine);
        engine.start().unwrap();
        advance(1).await;
        assert_eq!(*seen.lock().unwrap(), vec!["a1"]);
        assert_eq!(engine.state().stats.alerts, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_before_first_poll_discards_everything() {
        let telemetry = StaticTelemetry::showing(vec![landing("a1", "DAL1234")]);
        let engine = engine_with(Arc::clone(&telemetry), Arc::default());
        let (seen, _sub) = recorder(&engine);

        engine.start().unwrap();
        engine.stop().unwrap();
        advance(30).await;

        assert!(seen.lock().unwrap().is_empty());
        assert_eq!(engine.state().stats.ticks, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_in_flight_at_stop_is_discarded() {
        let telemetry = Arc::new(StaticTelemetry {
            latency: Duration::from_secs(5),
            ..StaticTelemetry::default()
        });
        telemetry.show(vec![landing("a1", "DAL1234")]);
        let sink = Arc::new(MemoryTraceSink::new(10));
        let trace: Arc<dyn TraceSink> = sink.clone();
        let engine = LandingDetectionEngine::new(
            EngineSettings::default(),
            Arc::clone(&telemetry) as Arc<dyn TelemetrySource>,
            Arc::new(CountingSchedule::default()),
            Some(trace),
        )
        .unwrap();
        let (seen, _sub) = recorder(&engine);

        engine.start().unwrap();
        advance(1).await;
        assert_eq!(telemetry.calls(), 1);
        engine.stop().unwrap();
        let stopped = engine.state().stats;
        assert_eq!(stopped.ticks, 0);

        advance(10).await;
        assert!(seen.lock().unwrap().is_empty());
        assert_eq!(engine.state().stats, stopped);
        assert!(sink.read_all().unwrap().is_empty());

        // A new run only sees its own fetch
        let (seen, _second) = recorder(&engine);
        engine.start().unwrap();
        advance(1).await;
        assert!(seen.lock().unwrap().is_empty());
        assert_eq!(engine.state().stats.ticks, 0);

        advance(5).await;
        assert_eq!(*seen.lock().unwrap(), vec!["a1"]);
        let state = engine.state();
        assert_eq!(state.stats.ticks, 1);
        assert_eq!(state.stats.alerts, 1);
        assert_eq!(sink.read_all().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_poll_once() {
        let telemetry = StaticTelemetry::showing(vec![landing("a1", "DAL1234")]);
        let schedule = Arc::new(CountingSchedule {
            flights: vec![ScheduledFlight::new("DAL1234")
                .with_origin("Atlanta", "ATL")
                .with_airline("DAL")],
            ..CountingSchedule::default()
        });
        let sink = Arc::new(MemoryTraceSink::new(10));
        let trace: Arc<dyn TraceSink> = sink.clone();
        let engine = LandingDetectionEngine::new(
            EngineSettings::default(),
            telemetry,
            Arc::clone(&schedule) as Arc<dyn ScheduleSource>,
            Some(trace),
        )
        .unwrap();
        let (seen, _sub) = recorder(&engine);

        let event = engine.poll_once().await.unwrap().expect("landing event");
        assert!(event.matched);
        assert_eq!(event.origin_city, "Atlanta");
        assert_eq!(*seen.lock().unwrap(), vec!["a1"]);

        // Schedule is fresh and the aircraft is cooling down
        assert!(engine.poll_once().await.unwrap().is_none());
        assert_eq!(schedule.loads(), 1);
        assert_eq!(sink.read_all().unwrap().len(), 2);
    }

    #[test]
    fn test_start_outside_runtime() {
        let engine = engine_with(Arc::default(), Arc::default());
        assert!(matches!(engine.start(), Err(Error::Internal(_))));
    }

    #[test]
    fn test_zero_intervals_rejected() {
        let zero_poll = EngineSettings {
            poll_interval: Duration::ZERO,
            ..EngineSettings::default()
        };
        let result = LandingDetectionEngine::new(
            zero_poll,
            Arc::new(StaticTelemetry::default()),
            Arc::new(CountingSchedule::default()),
            None,
        );
        assert!(matches!(result, Err(Error::ConfigValidation { .. })));

        let zero_refresh = EngineSettings {
            schedule_interval: Duration::ZERO,
            ..EngineSettings::default()
        };
        assert!(zero_refresh.validate().is_err());
        assert!(EngineSettings::default().validate().is_ok());
    }

    #[test]
    fn test_settings_from_config() {
        let settings = EngineSettings::default();
        assert_eq!(settings.poll_interval, Duration::from_secs(15));
        assert_eq!(settings.schedule_interval, Duration::from_secs(300));
        assert_eq!(settings.reset_interval, Duration::from_secs(60));
    }
}
