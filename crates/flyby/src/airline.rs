//! Airline and aircraft type resolution.

use crate::schedule::patterns::{airline_prefix, is_tail_number};

/// Airline code used for private (tail number) aircraft.
pub const PRIVATE: &str = "PRIVATE";

/// Airline code used when nothing better is known.
pub const UNKNOWN: &str = "UNKNOWN";

/// Airline codes the display has a logo for.
pub const KNOWN_AIRLINES: &[&str] = &[
    "DHL", "UAL", "AAL", "DAL", "SWA", "ASA", "AVE", "BAH", "CES", "CPA", "BRZ", "ENY", "ENV",
    "ICE", "JBU", "DLH", "GEC", PRIVATE, UNKNOWN,
];

const AIRLINE_NAMES: &[(&str, &str)] = &[
    ("DAL", "Delta AirLines"),
    ("UAL", "United Airlines"),
    ("AAL", "American Airlines"),
    ("SWA", "Southwest Airlines"),
    ("DHL", "DHL Aviation"),
];

const AIRCRAFT_TYPES: &[(&str, &str)] = &[
    ("C150", "Cessna 150"),
    ("C152", "Cessna 152"),
    ("C172", "Cessna 172 Skyhawk"),
    ("C182", "Cessna 182 Skylane"),
    ("C208", "Cessna 208 Caravan"),
    ("P28A", "Piper PA-28 Cherokee"),
    ("PA32", "Piper PA-32 Saratoga"),
    ("SR20", "Cirrus SR20"),
    ("SR22", "Cirrus SR22"),
    ("BE36", "Beechcraft Bonanza"),
    ("BE58", "Beechcraft Baron"),
    ("PC12", "Pilatus PC-12"),
    ("C56X", "Cessna Citation Excel"),
    ("C68A", "Cessna Citation Latitude"),
    ("E55P", "Embraer Phenom 300"),
    ("GLF4", "Gulfstream IV"),
];

/// Check if the display knows this airline code.
#[must_use]
pub fn is_known(code: &str) -> bool {
    KNOWN_AIRLINES.iter().any(|known| known.eq_ignore_ascii_case(code))
}

/// Restrict a code to the known set, falling back to [`UNKNOWN`].
#[must_use]
pub fn valid_code(code: &str) -> String {
    let upper = code.trim().to_ascii_uppercase();
    if is_known(&upper) {
        upper
    } else {
        UNKNOWN.to_string()
    }
}

/// Resolve the airline code for an aircraft identifier.
///
/// A code published by the schedule takes precedence. Otherwise the
/// three-letter callsign prefix is used, tail numbers resolve to
/// [`PRIVATE`] and everything else to [`UNKNOWN`].
#[must_use]
pub fn resolve_code(ident: Option<&str>, scheduled_airline: Option<&str>) -> String {
    if let Some(code) = scheduled_airline.map(str::trim).filter(|c| !c.is_empty()) {
        return valid_code(code);
    }
    let Some(ident) = ident.map(str::trim).filter(|i| !i.is_empty()) else {
        return UNKNOWN.to_string();
    };
    if is_tail_number(ident) {
        return PRIVATE.to_string();
    }
    airline_prefix(ident).map_or_else(|| UNKNOWN.to_string(), |prefix| valid_code(&prefix))
}

/// Display name for an airline code; unknown codes are shown as-is.
#[must_use]
pub fn display_name(code: &str) -> &str {
    AIRLINE_NAMES
        .iter()
        .find(|(c, _)| c.eq_ignore_ascii_case(code))
        .map_or(code, |(_, name)| *name)
}

/// Model name for an ICAO aircraft type designator.
#[must_use]
pub fn aircraft_model(type_code: &str) -> Option<&'static str> {
    let type_code = type_code.trim();
    AIRCRAFT_TYPES
        .iter()
        .find(|(code, _)| code.eq_ignore_ascii_case(type_code))
        .map(|(_, model)| *model)
}
