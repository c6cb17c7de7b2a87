//! Locally known flight schedule.
//!
//! This module holds the schedule feed model and the cache the engine
//! consults when enriching a landing aircraft:
//!
//! - **Schedule model**: [`ScheduledFlight`] records as they arrive from the
//!   flight-data feed, wrapped in a [`ScheduleFrame`].
//!
//! - **Cache**: [`FlightScheduleCache`] keeps the last successful load and
//!   knows whether it is still inside its freshness window.
//!
//! - **Fuzzy matching**: [`FlightScheduleCache::find_match`] looks up a
//!   flight by callsign or tail number using ordered fallback rules.
//!
//! # Example
//!
//! ```
//! use flyby::schedule::{FlightScheduleCache, ScheduledFlight};
//! use std::time::Instant;
//!
//! let mut cache = FlightScheduleCache::new();
//! cache.replace(
//!     vec![ScheduledFlight::new("DL1234").with_origin("Atlanta", "ATL")],
//!     Instant::now(),
//! );
//!
//! let flight = cache.find_match("DAL1234").unwrap();
//! assert_eq!(flight.origin_code.as_deref(), Some("ATL"));
//! ```

mod matcher;
pub mod patterns;

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

pub use matcher::{find_match, MatchRule, ScheduleMatch};

/// One scheduled arrival from the flight-data feed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledFlight {
    /// Flight number as published, e.g. `DL1234`.
    #[serde(default)]
    pub flight_number: String,

    /// Origin city name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin_city: Option<String>,

    /// Origin airport code.
    #[serde(rename = "origin", default, skip_serializing_if = "Option::is_none")]
    pub origin_code: Option<String>,

    /// Registration of the operating aircraft.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registration: Option<String>,

    /// Block time label, e.g. `1h 32m`.
    #[serde(rename = "flight_time", default, skip_serializing_if = "Option::is_none")]
    pub flight_time_label: Option<String>,

    /// ICAO airline code of the operator.
    #[serde(rename = "airline", default, skip_serializing_if = "Option::is_none")]
    pub airline_code: Option<String>,

    /// ICAO aircraft type designator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aircraft_type: Option<String>,
}

impl ScheduledFlight {
    /// Create a flight with only a flight number.
    #[must_use]
    pub fn new(flight_number: impl Into<String>) -> Self {
        Self {
            flight_number: flight_number.into(),
            ..Self::default()
        }
    }

    /// Set the origin city and airport code.
    #[must_use]
    pub fn with_origin(mut self, city: impl Into<String>, code: impl Into<String>) -> Self {
        self.origin_city = Some(city.into());
        self.origin_code = Some(code.into());
        self
    }

    /// Set the registration.
    #[must_use]
    pub fn with_registration(mut self, registration: impl Into<String>) -> Self {
        self.registration = Some(registration.into());
        self
    }

    /// Set the airline code.
    #[must_use]
    pub fn with_airline(mut self, airline: impl Into<String>) -> Self {
        self.airline_code = Some(airline.into());
        self
    }

    /// Set the flight time label.
    #[must_use]
    pub fn with_flight_time(mut self, label: impl Into<String>) -> Self {
        self.flight_time_label = Some(label.into());
        self
    }
}

/// The schedule feed envelope.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleFrame {
    /// Scheduled arrivals, in feed order.
    #[serde(default)]
    pub flights: Vec<ScheduledFlight>,
}

impl ScheduleFrame {
    /// Create a frame from a list of flights.
    #[must_use]
    pub fn new(flights: Vec<ScheduledFlight>) -> Self {
        Self { flights }
    }
}

/// The last successfully loaded flight schedule.
///
/// Refreshes replace the whole list; a failed refresh leaves the previous
/// list in place.
#[derive(Debug, Clone, Default)]
pub struct FlightScheduleCache {
    flights: Vec<ScheduledFlight>,
    loaded_at: Option<Instant>,
}

impl FlightScheduleCache {
    /// Create an empty, never-loaded cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the cached flights. `loaded_at` is when the load was
    /// requested, not when it finished.
    pub fn replace(&mut self, flights: Vec<ScheduledFlight>, loaded_at: Instant) {
        self.flights = flights;
        self.loaded_at = Some(loaded_at);
    }

    /// The cached flights in feed order.
    #[must_use]
    pub fn flights(&self) -> &[ScheduledFlight] {
        &self.flights
    }

    /// Number of cached flights.
    #[must_use]
    pub fn len(&self) -> usize {
        self.flights.len()
    }

    /// Check if no flights are cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.flights.is_empty()
    }

    /// When the cache was last loaded.
    #[must_use]
    pub fn loaded_at(&self) -> Option<Instant> {
        self.loaded_at
    }

    /// Check if the cache was loaded less than `window` before `now`.
    ///
    /// A cache that was never loaded is never fresh.
    #[must_use]
    pub fn is_fresh(&self, now: Instant, window: Duration) -> bool {
        self.loaded_at
            .is_some_and(|loaded| now.saturating_duration_since(loaded) < window)
    }

    /// Find the scheduled flight for an aircraft identifier.
    #[must_use]
    pub fn find_match(&self, ident: &str) -> Option<&ScheduledFlight> {
        find_match(&self.flights, ident).map(|m| m.flight)
    }

    /// Find a flight and report which rule matched.
    #[must_use]
    pub fn find_match_detailed(&self, ident: &str) -> Option<ScheduleMatch<'_>> {
        find_match(&self.flights, ident)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_schedule_feed() {
        let json = r#"{
            "weather": {"temp": 71},
            "flights": [
                {
                    "flight_number": "DL1234",
                    "origin_city": "Atlanta",
                    "origin": "ATL",
                    "flight_time": "1h 20m",
                    "airline": "DAL",
                    "registration": "N301DV",
                    "gate": "C12"
                }
            ]
        }"#;
        let frame: ScheduleFrame = serde_json::from_str(json).unwrap();

        assert_eq!(frame.flights.len(), 1);
        let flight = &frame.flights[0];
        assert_eq!(flight.flight_number, "DL1234");
        assert_eq!(flight.origin_city.as_deref(), Some("Atlanta"));
        assert_eq!(flight.origin_code.as_deref(), Some("ATL"));
        assert_eq!(flight.flight_time_label.as_deref(), Some("1h 20m"));
        assert_eq!(flight.airline_code.as_deref(), Some("DAL"));
        assert_eq!(flight.registration.as_deref(), Some("N301DV"));
    }

    #[test]
    fn test_deserialize_missing_flights() {
        let frame: ScheduleFrame = serde_json::from_str("{}").unwrap();
        assert!(frame.flights.is_empty());
    }

    #[test]
    fn test_never_loaded_cache_is_stale() {
        let cache = FlightScheduleCache::new();
        assert!(!cache.is_fresh(Instant::now(), Duration::from_secs(300)));
        assert!(cache.loaded_at().is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_cache_freshness_window() {
        let start = Instant::now();
        let window = Duration::from_secs(300);
        let mut cache = FlightScheduleCache::new();
        cache.replace(vec![ScheduledFlight::new("DL1")], start);

        assert!(cache.is_fresh(start, window));
        assert!(cache.is_fresh(start + Duration::from_secs(299), window));
        assert!(!cache.is_fresh(start + window, window));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_replace_with_empty_list_is_still_a_load() {
        let now = Instant::now();
        let mut cache = FlightScheduleCache::new();
        cache.replace(Vec::new(), now);

        assert!(cache.is_fresh(now, Duration::from_secs(1)));
        assert!(cache.find_match("DAL1234").is_none());
    }

    #[test]
    fn test_find_match_detailed_reports_rule() {
        let mut cache = FlightScheduleCache::new();
        cache.replace(vec![ScheduledFlight::new("DL1234")], Instant::now());

        let found = cache.find_match_detailed("DAL1234").unwrap();
        assert_eq!(found.rule, MatchRule::FlightDigits);
        assert_eq!(found.flight.flight_number, "DL1234");
    }
}
