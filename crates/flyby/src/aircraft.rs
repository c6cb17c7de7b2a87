//! Core aircraft telemetry types for flyby.
//!
//! This module defines the snapshot record for one tracked aircraft as it
//! arrives from the pre-decoded ADS-B feed, and the feed envelope.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Barometric altitude as reported by the feed.
///
/// The feed reports a number of feet for airborne aircraft and the string
/// `"ground"` for aircraft on the surface.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Altitude {
    /// Airborne at the given altitude in feet.
    Feet(f64),
    /// Reported on the ground.
    OnGround,
    /// Missing, null or not a number.
    #[default]
    Invalid,
}

impl Altitude {
    /// Get the altitude in feet if the aircraft is airborne.
    #[must_use]
    pub fn feet(self) -> Option<f64> {
        match self {
            Self::Feet(ft) => Some(ft),
            Self::OnGround | Self::Invalid => None,
        }
    }

    /// Check if the aircraft reports being on the ground.
    #[must_use]
    pub fn is_on_ground(self) -> bool {
        matches!(self, Self::OnGround)
    }
}

impl std::fmt::Display for Altitude {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Feet(ft) => write!(f, "{ft}ft"),
            Self::OnGround => write!(f, "ground"),
            Self::Invalid => write!(f, "n/a"),
        }
    }
}

impl Serialize for Altitude {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Feet(ft) => serializer.serialize_f64(*ft),
            Self::OnGround => serializer.serialize_str("ground"),
            Self::Invalid => serializer.serialize_none(),
        }
    }
}

impl<'de> Deserialize<'de> for Altitude {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Option::<serde_json::Value>::deserialize(deserializer)?;
        Ok(match value {
            Some(serde_json::Value::Number(n)) => n
                .as_f64()
                .filter(|ft| ft.is_finite())
                .map_or(Self::Invalid, Self::Feet),
            Some(serde_json::Value::String(s))
                if s.eq_ignore_ascii_case("ground") || s.eq_ignore_ascii_case("on_ground") =>
            {
                Self::OnGround
            }
            _ => Self::Invalid,
        })
    }
}

/// A snapshot of one tracked aircraft.
///
/// Produced fresh on every poll and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AircraftSnapshot {
    /// Unique transponder id (ICAO 24-bit address, hex).
    pub hex: String,

    /// Callsign / flight identifier, often padded with trailing spaces.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flight: Option<String>,

    /// Registration (tail number).
    #[serde(rename = "r", default, skip_serializing_if = "Option::is_none")]
    pub registration: Option<String>,

    /// ICAO aircraft type designator, e.g. `C172`.
    #[serde(rename = "t", default, skip_serializing_if = "Option::is_none")]
    pub aircraft_type: Option<String>,

    /// Barometric altitude.
    #[serde(rename = "alt_baro", default)]
    pub altitude: Altitude,

    /// Ground speed in knots.
    #[serde(rename = "gs", default, skip_serializing_if = "Option::is_none")]
    pub ground_speed_kts: Option<f64>,

    /// Barometric vertical rate in feet per minute.
    #[serde(rename = "baro_rate", default, skip_serializing_if = "Option::is_none")]
    pub vertical_rate_fpm: Option<f64>,

    /// Latitude in degrees.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,

    /// Longitude in degrees.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lon: Option<f64>,

    /// True track over ground in degrees.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub track: Option<f64>,
}

impl AircraftSnapshot {
    /// Create a minimal airborne snapshot.
    #[must_use]
    pub fn new(hex: impl Into<String>, altitude: Altitude) -> Self {
        Self {
            hex: hex.into(),
            flight: None,
            registration: None,
            aircraft_type: None,
            altitude,
            ground_speed_kts: None,
            vertical_rate_fpm: None,
            lat: None,
            lon: None,
            track: None,
        }
    }

    /// Set the flight identifier.
    #[must_use]
    pub fn with_flight(mut self, flight: impl Into<String>) -> Self {
        self.flight = Some(flight.into());
        self
    }

    /// Set the registration.
    #[must_use]
    pub fn with_registration(mut self, registration: impl Into<String>) -> Self {
        self.registration = Some(registration.into());
        self
    }

    /// Set the aircraft type designator.
    #[must_use]
    pub fn with_aircraft_type(mut self, aircraft_type: impl Into<String>) -> Self {
        self.aircraft_type = Some(aircraft_type.into());
        self
    }

    /// Set the ground speed.
    #[must_use]
    pub fn with_ground_speed(mut self, kts: f64) -> Self {
        self.ground_speed_kts = Some(kts);
        self
    }

    /// Set the vertical rate.
    #[must_use]
    pub fn with_vertical_rate(mut self, fpm: f64) -> Self {
        self.vertical_rate_fpm = Some(fpm);
        self
    }

    /// The trimmed flight identifier, if present and non-empty.
    #[must_use]
    pub fn flight_ident(&self) -> Option<&str> {
        self.flight
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// The trimmed registration, if present and non-empty.
    #[must_use]
    pub fn registration_ident(&self) -> Option<&str> {
        self.registration
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// The identifier used for schedule matching: flight first, then registration.
    #[must_use]
    pub fn match_ident(&self) -> Option<&str> {
        self.flight_ident().or_else(|| self.registration_ident())
    }

    /// A label for logs: flight identifier if known, else the hex.
    #[must_use]
    pub fn label(&self) -> &str {
        self.flight_ident().unwrap_or(&self.hex)
    }
}

/// One poll's worth of aircraft from the telemetry feed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TelemetryFrame {
    /// All aircraft currently tracked, in feed order.
    #[serde(default)]
    pub aircraft: Vec<AircraftSnapshot>,
}

impl TelemetryFrame {
    /// Create a frame from a list of snapshots.
    #[must_use]
    pub fn new(aircraft: Vec<AircraftSnapshot>) -> Self {
        Self { aircraft }
    }

    /// Number of aircraft in the frame.
    #[must_use]
    pub fn len(&self) -> usize {
        self.aircraft.len()
    }

    /// Check if the frame has no aircraft.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.aircraft.is_empty()
    }
}
