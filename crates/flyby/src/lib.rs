//! `flyby` - Landing aircraft detection for an airport display
//!
//! This library polls a live aircraft telemetry feed, decides which aircraft
//! are about to land, enriches them with scheduled flight data and notifies
//! listeners so a display can show an alert.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod aircraft;
pub mod airline;
pub mod alert;
pub mod bus;
pub mod classifier;
pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod logging;
pub mod schedule;
pub mod source;
pub mod trace;

pub use aircraft::{AircraftSnapshot, Altitude, TelemetryFrame};
pub use alert::{AlertPresenter, AlertRenderer, TerminalRenderer};
pub use bus::{EventBus, LandingListener, Subscription};
pub use classifier::{LandingClassifier, LandingStatus};
pub use config::Config;
pub use engine::{EngineSettings, EngineState, LandingDetectionEngine};
pub use error::{Error, Result};
pub use event::LandingEvent;
pub use logging::init_logging;
pub use schedule::{FlightScheduleCache, ScheduledFlight};
pub use trace::{TraceEntry, TraceLog, TraceSink};
