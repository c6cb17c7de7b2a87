//! The enriched landing event delivered to listeners.

use serde::{Deserialize, Serialize};

use crate::aircraft::AircraftSnapshot;
use crate::airline::{self, PRIVATE};
use crate::schedule::patterns::callsign_digits;
use crate::schedule::ScheduledFlight;

/// Title shown on every landing alert.
pub const LANDING_TITLE: &str = "Upcoming Landing";

const UNKNOWN_ORIGIN: &str = "Unknown";
const UNKNOWN_ORIGIN_CODE: &str = "???";
const UNKNOWN_FLIGHT_TIME: &str = "N/A";
const UNKNOWN_REGISTRATION: &str = "Unknown";
const UNKNOWN_FLIGHT_NUMBER: &str = "Unknown";
const PRIVATE_ORIGIN: &str = "Private Flight";
const PRIVATE_ORIGIN_CODE: &str = "PVT";

/// A landing aircraft enriched with schedule data, ready for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LandingEvent {
    /// Alert title.
    pub title: String,
    /// Transponder id of the aircraft.
    pub hex: String,
    /// Flight number without the airline prefix.
    pub flight_number_display: String,
    /// Airline code from the known set.
    pub airline_code: String,
    /// Airline display name.
    pub airline_name: String,
    /// Origin city.
    pub origin_city: String,
    /// Origin airport code.
    pub origin_code: String,
    /// Registration (tail number).
    pub registration: String,
    /// Barometric altitude in feet.
    pub altitude_feet: f64,
    /// Ground speed in knots.
    pub ground_speed_kts: f64,
    /// Vertical rate in feet per minute.
    pub vertical_rate_fpm: f64,
    /// Block time label.
    pub flight_time_label: String,
    /// Whether a scheduled flight was matched.
    pub matched: bool,
}

impl LandingEvent {
    /// Build an event from a landing aircraft and its schedule match.
    ///
    /// Missing schedule data is replaced with placeholders; a landing is
    /// always alertable.
    #[must_use]
    pub fn enrich(aircraft: &AircraftSnapshot, flight: Option<&ScheduledFlight>) -> Self {
        let ident = aircraft.match_ident();
        let airline_code =
            airline::resolve_code(ident, flight.and_then(|f| f.airline_code.as_deref()));
        let airline_name = airline::display_name(&airline_code).to_string();

        let scheduled_city = flight.and_then(|f| non_empty(f.origin_city.as_deref()));
        let scheduled_code = flight.and_then(|f| non_empty(f.origin_code.as_deref()));

        let (origin_city, origin_code) = if airline_code == PRIVATE && scheduled_city.is_none() {
            let city = aircraft
                .aircraft_type
                .as_deref()
                .and_then(airline::aircraft_model)
                .map_or_else(
                    || PRIVATE_ORIGIN.to_string(),
                    |model| format!("{model} (Private)"),
                );
            (city, scheduled_code.unwrap_or(PRIVATE_ORIGIN_CODE).to_string())
        } else {
            (
                scheduled_city.unwrap_or(UNKNOWN_ORIGIN).to_string(),
                scheduled_code.unwrap_or(UNKNOWN_ORIGIN_CODE).to_string(),
            )
        };

        let registration = aircraft
            .registration_ident()
            .or_else(|| flight.and_then(|f| non_empty(f.registration.as_deref())))
            .unwrap_or(UNKNOWN_REGISTRATION)
            .to_string();

        Self {
            title: LANDING_TITLE.to_string(),
            hex: aircraft.hex.clone(),
            flight_number_display: flight_number_display(aircraft, flight),
            airline_code,
            airline_name,
            origin_city,
            origin_code,
            registration,
            altitude_feet: aircraft.altitude.feet().unwrap_or_default(),
            ground_speed_kts: aircraft.ground_speed_kts.unwrap_or_default(),
            vertical_rate_fpm: aircraft.vertical_rate_fpm.unwrap_or_default(),
            flight_time_label: flight
                .and_then(|f| non_empty(f.flight_time_label.as_deref()))
                .unwrap_or(UNKNOWN_FLIGHT_TIME)
                .to_string(),
            matched: flight.is_some(),
        }
    }

    /// Key used to suppress repeated alerts for the same flight.
    #[must_use]
    pub fn flight_key(&self) -> String {
        format!("{}{}", self.airline_code, self.flight_number_display)
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn flight_number_display(aircraft: &AircraftSnapshot, flight: Option<&ScheduledFlight>) -> String {
    let source = aircraft
        .flight_ident()
        .or_else(|| aircraft.registration_ident())
        .or_else(|| flight.and_then(|f| non_empty(Some(f.flight_number.as_str()))));

    source.map_or_else(
        || UNKNOWN_FLIGHT_NUMBER.to_string(),
        |ident| callsign_digits().capture(ident).unwrap_or(ident).to_string(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aircraft::Altitude;

    fn landing(ident: &str) -> AircraftSnapshot {
        AircraftSnapshot::new("a1b2c3", Altitude::Feet(500.0))
            .with_flight(ident)
            .with_ground_speed(140.0)
            .with_vertical_rate(-600.0)
    }

    #[test]
    fn test_enrich_with_schedule_match() {
        let flight = ScheduledFlight::new("DL1234")
            .with_origin("Atlanta", "ATL")
            .with_flight_time("1h 20m");
        let event = LandingEvent::enrich(&landing("DAL1234 "), Some(&flight));

        assert_eq!(event.title, "Upcoming Landing");
        assert_eq!(event.airline_code, "DAL");
        assert_eq!(event.airline_name, "Delta AirLines");
        assert_eq!(event.flight_number_display, "1234");
        assert_eq!(event.origin_city, "Atlanta");
        assert_eq!(event.origin_code, "ATL");
        assert_eq!(event.flight_time_label, "1h 20m");
        assert_eq!(event.registration, "Unknown");
        assert!(event.matched);
        assert!((event.altitude_feet - 500.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_enrich_private_without_schedule() {
        let aircraft = AircraftSnapshot::new("abc", Altitude::Feet(800.0))
            .with_registration("N12345")
            .with_ground_speed(90.0);
        let event = LandingEvent::enrich(&aircraft, None);

        assert_eq!(event.airline_code, "PRIVATE");
        assert_eq!(event.origin_city, "Private Flight");
        assert_eq!(event.origin_code, "PVT");
        assert_eq!(event.registration, "N12345");
        assert_eq!(event.flight_number_display, "N12345");
        assert_eq!(event.flight_time_label, "N/A");
        assert!(!event.matched);
    }

    #[test]
    fn test_enrich_private_with_known_type() {
        let aircraft = AircraftSnapshot::new("abc", Altitude::Feet(800.0))
            .with_flight("N172SP")
            .with_aircraft_type("C172");
        let event = LandingEvent::enrich(&aircraft, None);

        assert_eq!(event.origin_city, "Cessna 172 Skyhawk (Private)");
        assert_eq!(event.origin_code, "PVT");
    }

    #[test]
    fn test_enrich_unmatched_airline_uses_placeholders() {
        let event = LandingEvent::enrich(&landing("SWA999"), None);

        assert_eq!(event.airline_code, "SWA");
        assert_eq!(event.origin_city, "Unknown");
        assert_eq!(event.origin_code, "???");
        assert_eq!(event.flight_number_display, "999");
    }

    #[test]
    fn test_enrich_unknown_airline() {
        let event = LandingEvent::enrich(&landing("XYZ42"), None);
        assert_eq!(event.airline_code, "UNKNOWN");
        assert_eq!(event.airline_name, "UNKNOWN");
    }

    #[test]
    fn test_registration_falls_back_to_schedule() {
        let flight = ScheduledFlight::new("UA77").with_registration("N77UA");
        let event = LandingEvent::enrich(&landing("UAL77"), Some(&flight));
        assert_eq!(event.registration, "N77UA");
    }

    #[test]
    fn test_flight_number_from_schedule_when_aircraft_has_no_ident() {
        let aircraft = AircraftSnapshot::new("abc", Altitude::Feet(800.0));
        let flight = ScheduledFlight::new("DAL55");
        assert_eq!(
            LandingEvent::enrich(&aircraft, Some(&flight)).flight_number_display,
            "55"
        );
        assert_eq!(
            LandingEvent::enrich(&aircraft, None).flight_number_display,
            "Unknown"
        );
    }

    #[test]
    fn test_flight_key() {
        let event = LandingEvent::enrich(&landing("DAL1234"), None);
        assert_eq!(event.flight_key(), "DAL1234");
    }
}
