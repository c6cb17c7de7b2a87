//! Identifier patterns used by schedule matching and airline resolution.
//!
//! Aircraft identifiers come in two shapes: airline callsigns such as
//! `DAL1234`, and US civil tail numbers such as `N12345`.

use std::sync::OnceLock;

use regex::Regex;

/// A compiled identifier pattern.
#[derive(Debug)]
pub struct IdentPattern {
    /// Name of the pattern for identification.
    pub name: &'static str,

    /// Description of what this pattern matches.
    pub description: &'static str,

    regex: Regex,
}

impl IdentPattern {
    /// Create a new identifier pattern.
    ///
    /// # Panics
    ///
    /// Panics if the regex pattern is invalid. Only called with the
    /// literals below.
    #[must_use]
    pub fn new(name: &'static str, description: &'static str, pattern: &str) -> Self {
        Self {
            name,
            description,
            regex: Regex::new(pattern).expect("Invalid regex pattern"),
        }
    }

    /// Check if the identifier matches this pattern.
    #[must_use]
    pub fn matches(&self, ident: &str) -> bool {
        self.regex.is_match(ident)
    }

    /// Get the first capture group, if the identifier matches.
    #[must_use]
    pub fn capture<'a>(&self, ident: &'a str) -> Option<&'a str> {
        self.regex
            .captures(ident)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
    }
}

/// Regional carriers that fly under a mainline brand: (regional, mainline).
pub const REGIONAL_AFFILIATES: &[(&str, &str)] = &[("EDV", "DAL")];

/// Look up the mainline carrier for a regional airline code.
#[must_use]
pub fn mainline_for(regional: &str) -> Option<&'static str> {
    REGIONAL_AFFILIATES
        .iter()
        .find(|(code, _)| code.eq_ignore_ascii_case(regional))
        .map(|(_, mainline)| *mainline)
}

/// US civil registration: `N` followed by digits and optional letters.
pub fn tail_number() -> &'static IdentPattern {
    static PATTERN: OnceLock<IdentPattern> = OnceLock::new();
    PATTERN.get_or_init(|| {
        IdentPattern::new(
            "tail_number",
            "US civil registration (N-number)",
            r"(?i)^N\d+[A-Z]*$",
        )
    })
}

/// Airline callsign: three-letter ICAO airline code followed by digits.
pub fn airline_callsign() -> &'static IdentPattern {
    static PATTERN: OnceLock<IdentPattern> = OnceLock::new();
    PATTERN.get_or_init(|| {
        IdentPattern::new(
            "airline_callsign",
            "ICAO airline designator followed by a flight number",
            r"(?i)^([A-Z]{3})\d+",
        )
    })
}

/// Digits following a three-letter airline prefix.
pub fn callsign_digits() -> &'static IdentPattern {
    static PATTERN: OnceLock<IdentPattern> = OnceLock::new();
    PATTERN.get_or_init(|| {
        IdentPattern::new(
            "callsign_digits",
            "Flight number digits after the airline designator",
            r"(?i)^[A-Z]{3}(\d+)",
        )
    })
}

/// Check whether an identifier looks like a tail number.
#[must_use]
pub fn is_tail_number(ident: &str) -> bool {
    tail_number().matches(ident.trim())
}

/// Extract the upper-cased airline prefix of a callsign.
#[must_use]
pub fn airline_prefix(ident: &str) -> Option<String> {
    airline_callsign()
        .capture(ident.trim())
        .map(str::to_ascii_uppercase)
}

/// Lowercase with all whitespace removed.
#[must_use]
pub fn normalize(value: &str) -> String {
    value
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Only the ASCII digits of a value.
#[must_use]
pub fn digits(value: &str) -> String {
    value.chars().filter(char::is_ascii_digit).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tail_number_pattern() {
        assert!(is_tail_number("N12345"));
        assert!(is_tail_number("n512ab"));
        assert!(is_tail_number(" N1 "));
        assert!(!is_tail_number("DAL1234"));
        assert!(!is_tail_number("N"));
        assert!(!is_tail_number("NA123"));
    }

    #[test]
    fn test_airline_prefix() {
        assert_eq!(airline_prefix("DAL1234").as_deref(), Some("DAL"));
        assert_eq!(airline_prefix("edv5123 ").as_deref(), Some("EDV"));
        assert_eq!(airline_prefix("N12345"), None);
        assert_eq!(airline_prefix("DL12"), None);
    }

    #[test]
    fn test_callsign_digits() {
        assert_eq!(callsign_digits().capture("DAL1234"), Some("1234"));
        assert_eq!(callsign_digits().capture("N12345"), None);
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(" DL 1234 "), "dl1234");
        assert_eq!(normalize("\tAa\nB"), "aab");
    }

    #[test]
    fn test_digits() {
        assert_eq!(digits("DAL1234"), "1234");
        assert_eq!(digits("DL 12 34"), "1234");
        assert_eq!(digits("EDV"), "");
    }

    #[test]
    fn test_mainline_for() {
        assert_eq!(mainline_for("EDV"), Some("DAL"));
        assert_eq!(mainline_for("edv"), Some("DAL"));
        assert_eq!(mainline_for("SWA"), None);
    }

    #[test]
    fn test_patterns_have_names() {
        for pattern in [tail_number(), airline_callsign(), callsign_digits()] {
            assert!(!pattern.name.is_empty());
            assert!(!pattern.description.is_empty());
        }
    }
}
