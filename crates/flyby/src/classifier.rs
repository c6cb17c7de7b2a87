//! Landing classification.
//!
//! Decides, for a single aircraft snapshot, whether it looks like it is
//! about to land. Classification is a pure function of the snapshot and
//! the thresholds: no state is kept between calls.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::aircraft::AircraftSnapshot;
use crate::config::DetectionConfig;

/// Diagnostic status recorded for a classified aircraft.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LandingStatus {
    /// Met all criteria and the alert was actually displayed.
    AlertTriggered,
    /// Met all landing criteria.
    CriteriaMet,
    /// Met one or two of the three criteria.
    PartialCriteria,
    /// Only inside the relaxed debug altitude band.
    AltitudeOnly,
}

impl fmt::Display for LandingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlertTriggered => write!(f, "alert_triggered"),
            Self::CriteriaMet => write!(f, "criteria_met"),
            Self::PartialCriteria => write!(f, "partial_criteria"),
            Self::AltitudeOnly => write!(f, "altitude_only"),
        }
    }
}

impl FromStr for LandingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "alert_triggered" => Ok(Self::AlertTriggered),
            "criteria_met" => Ok(Self::CriteriaMet),
            "partial_criteria" => Ok(Self::PartialCriteria),
            "altitude_only" => Ok(Self::AltitudeOnly),
            other => Err(format!("unknown landing status: {other}")),
        }
    }
}

/// Which of the three landing criteria an aircraft satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Criteria {
    /// At or below the altitude threshold.
    pub low_altitude: bool,
    /// Ground speed known and at or below the speed threshold.
    pub landing_speed: bool,
    /// Vertical rate unknown, or below the (negative) rate threshold.
    pub descending: bool,
}

impl Criteria {
    /// All three criteria hold.
    #[must_use]
    pub fn all(self) -> bool {
        self.low_altitude && self.landing_speed && self.descending
    }

    /// At least one criterion holds.
    #[must_use]
    pub fn any(self) -> bool {
        self.low_altitude || self.landing_speed || self.descending
    }

    /// Space separated names of the satisfied criteria.
    #[must_use]
    pub fn describe(self) -> String {
        let mut parts = Vec::with_capacity(3);
        if self.low_altitude {
            parts.push("altitude");
        }
        if self.landing_speed {
            parts.push("speed");
        }
        if self.descending {
            parts.push("vertical_rate");
        }
        parts.join(" ")
    }
}

/// The result of classifying one airborne aircraft.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    /// Altitude the decision was made at, in feet.
    pub altitude_ft: f64,
    /// The individual criteria.
    pub criteria: Criteria,
    /// Whether the aircraft is inside the relaxed debug altitude band.
    pub within_debug_band: bool,
    /// Diagnostic status, `None` when nothing is worth reporting.
    pub status: Option<LandingStatus>,
    /// Human readable reason for the status.
    pub reason: String,
}

impl Classification {
    /// All landing criteria are met.
    #[must_use]
    pub fn meets_all_criteria(&self) -> bool {
        self.criteria.all()
    }
}

/// Multi-criteria landing heuristic.
#[derive(Debug, Clone, PartialEq)]
pub struct LandingClassifier {
    thresholds: DetectionConfig,
}

impl LandingClassifier {
    /// Create a classifier with the given thresholds.
    #[must_use]
    pub fn new(thresholds: DetectionConfig) -> Self {
        Self { thresholds }
    }

    /// The thresholds in use.
    #[must_use]
    pub fn thresholds(&self) -> &DetectionConfig {
        &self.thresholds
    }

    /// Classify one aircraft.
    ///
    /// Returns `None` for aircraft on the ground or without a numeric
    /// altitude: those never take part in landing detection.
    #[must_use]
    pub fn classify(&self, aircraft: &AircraftSnapshot) -> Option<Classification> {
        let altitude_ft = aircraft.altitude.feet()?;
        let t = &self.thresholds;

        // A missing vertical rate counts as descending
        let criteria = Criteria {
            low_altitude: altitude_ft <= t.altitude_threshold_ft,
            landing_speed: aircraft
                .ground_speed_kts
                .is_some_and(|gs| gs <= t.speed_threshold_kts),
            descending: aircraft
                .vertical_rate_fpm
                .map_or(true, |rate| rate < t.vertical_rate_threshold_fpm),
        };
        let within_debug_band = altitude_ft <= t.debug_altitude_threshold_ft;

        let (status, reason) = if criteria.all() {
            (
                Some(LandingStatus::CriteriaMet),
                "met all landing criteria".to_string(),
            )
        } else if criteria.any() {
            (
                Some(LandingStatus::PartialCriteria),
                format!("met some landing criteria: {}", criteria.describe()),
            )
        } else if within_debug_band {
            (
                Some(LandingStatus::AltitudeOnly),
                "only met debug altitude threshold".to_string(),
            )
        } else {
            (None, String::new())
        };

        Some(Classification {
            altitude_ft,
            criteria,
            within_debug_band,
            status,
            reason,
        })
    }
}

impl Default for LandingClassifier {
    fn default() -> Self {
        Self::new(DetectionConfig::default())
    }
}
