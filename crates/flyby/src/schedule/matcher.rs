//! Fuzzy lookup of scheduled flights.
//!
//! Rules are tried in order and the first rule with a hit wins. Within a
//! rule the first flight in feed order wins.

use std::fmt;

use tracing::{debug, info, trace};

use super::patterns::{airline_prefix, digits, is_tail_number, mainline_for, normalize};
use super::ScheduledFlight;

/// The rule that produced a schedule match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchRule {
    /// Flight numbers equal after normalization.
    ExactFlightNumber,
    /// Numeric parts of the flight numbers are equal.
    FlightDigits,
    /// Tail number equal to the flight's registration.
    Registration,
    /// One flight number contains the other.
    Partial,
    /// Regional carrier matched to a mainline flight.
    RegionalFallback,
}

impl fmt::Display for MatchRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ExactFlightNumber => write!(f, "exact"),
            Self::FlightDigits => write!(f, "digits"),
            Self::Registration => write!(f, "registration"),
            Self::Partial => write!(f, "partial"),
            Self::RegionalFallback => write!(f, "regional"),
        }
    }
}

/// A matched flight together with the rule that found it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleMatch<'a> {
    /// The matched flight.
    pub flight: &'a ScheduledFlight,
    /// The rule that matched.
    pub rule: MatchRule,
}

/// Find the scheduled flight for an identifier.
///
/// Returns `None` for an empty identifier or when no rule matches.
#[must_use]
pub fn find_match<'a>(flights: &'a [ScheduledFlight], ident: &str) -> Option<ScheduleMatch<'a>> {
    let ident = ident.trim();
    if ident.is_empty() || flights.is_empty() {
        return None;
    }

    trace!(ident, flights = flights.len(), "Looking up schedule");

    let hit = exact(flights, ident)
        .or_else(|| by_digits(flights, ident))
        .or_else(|| by_registration(flights, ident))
        .or_else(|| partial(flights, ident))
        .or_else(|| regional(flights, ident));

    match &hit {
        Some(m) => debug!(
            ident,
            rule = %m.rule,
            flight = %m.flight.flight_number,
            "Schedule match"
        ),
        None => debug!(ident, "No schedule match"),
    }
    hit
}

fn exact<'a>(flights: &'a [ScheduledFlight], ident: &str) -> Option<ScheduleMatch<'a>> {
    let wanted = normalize(ident);
    flights
        .iter()
        .find(|f| !f.flight_number.is_empty() && normalize(&f.flight_number) == wanted)
        .map(|flight| ScheduleMatch {
            flight,
            rule: MatchRule::ExactFlightNumber,
        })
}

fn by_digits<'a>(flights: &'a [ScheduledFlight], ident: &str) -> Option<ScheduleMatch<'a>> {
    let wanted = digits(ident);
    if wanted.is_empty() {
        return None;
    }
    flights
        .iter()
        .find(|f| digits(&f.flight_number) == wanted)
        .map(|flight| ScheduleMatch {
            flight,
            rule: MatchRule::FlightDigits,
        })
}

fn by_registration<'a>(flights: &'a [ScheduledFlight], ident: &str) -> Option<ScheduleMatch<'a>> {
    if !is_tail_number(ident) {
        return None;
    }
    let wanted = normalize(ident);
    flights
        .iter()
        .find(|f| f.registration.as_deref().is_some_and(|r| normalize(r) == wanted))
        .map(|flight| ScheduleMatch {
            flight,
            rule: MatchRule::Registration,
        })
}

fn partial<'a>(flights: &'a [ScheduledFlight], ident: &str) -> Option<ScheduleMatch<'a>> {
    let wanted = ident.to_lowercase();
    let mut hits = flights.iter().filter(|f| {
        let number = f.flight_number.trim().to_lowercase();
        !number.is_empty() && (number.contains(&wanted) || wanted.contains(&number))
    });

    let first = hits.next()?;
    let others = hits.count();
    if others > 0 {
        info!(
            ident,
            candidates = others + 1,
            chosen = %first.flight_number,
            "MatchAmbiguous: several partial matches, using the first"
        );
    }
    Some(ScheduleMatch {
        flight: first,
        rule: MatchRule::Partial,
    })
}

fn regional<'a>(flights: &'a [ScheduledFlight], ident: &str) -> Option<ScheduleMatch<'a>> {
    let mainline = airline_prefix(ident).and_then(|prefix| mainline_for(&prefix))?;
    flights
        .iter()
        .find(|f| {
            f.airline_code
                .as_deref()
                .is_some_and(|code| code.eq_ignore_ascii_case(mainline))
                || f.flight_number.starts_with(mainline)
        })
        .map(|flight| ScheduleMatch {
            flight,
            rule: MatchRule::RegionalFallback,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flights() -> Vec<ScheduledFlight> {
        vec![
            ScheduledFlight::new("AA 2290").with_origin("Charlotte", "CLT"),
            ScheduledFlight::new("DL1234")
                .with_origin("Atlanta", "ATL")
                .with_airline("DAL"),
            ScheduledFlight::new("UA77")
                .with_origin("Newark", "EWR")
                .with_registration("N77UA"),
            ScheduledFlight::new("").with_registration("N12345"),
        ]
    }

    #[test]
    fn test_exact_match_ignores_case_and_whitespace() {
        let flights = flights();
        let m = find_match(&flights, " aa2290 ").unwrap();
        assert_eq!(m.rule, MatchRule::ExactFlightNumber);
        assert_eq!(m.flight.origin_code.as_deref(), Some("CLT"));
    }

    #[test]
    fn test_digits_match_across_airline_codes() {
        let flights = flights();
        let m = find_match(&flights, "DAL1234").unwrap();
        assert_eq!(m.rule, MatchRule::FlightDigits);
        assert_eq!(m.flight.origin_city.as_deref(), Some("Atlanta"));
    }

    #[test]
    fn test_registration_match_for_tail_numbers() {
        let flights = flights();
        let m = find_match(&flights, "n12345").unwrap();
        assert_eq!(m.rule, MatchRule::Registration);
        assert_eq!(m.flight.registration.as_deref(), Some("N12345"));
    }

    #[test]
    fn test_digits_rule_precedes_registration() {
        // N77 shares digits with UA77
        let flights = flights();
        let m = find_match(&flights, "N77").unwrap();
        assert_eq!(m.rule, MatchRule::FlightDigits);
        assert_eq!(m.flight.flight_number, "UA77");
    }

    #[test]
    fn test_partial_match_first_wins() {
        let flights = vec![
            ScheduledFlight::new("SWA1001"),
            ScheduledFlight::new("SWA1002"),
        ];
        let m = find_match(&flights, "SWA100").unwrap();
        assert_eq!(m.rule, MatchRule::Partial);
        assert_eq!(m.flight.flight_number, "SWA1001");
    }

    #[test]
    fn test_partial_match_skips_empty_flight_numbers() {
        let flights = vec![ScheduledFlight::new(""), ScheduledFlight::new("JBU")];
        let m = find_match(&flights, "JBU").unwrap();
        assert_eq!(m.rule, MatchRule::ExactFlightNumber);

        let m = find_match(&flights, "JBUX").unwrap();
        assert_eq!(m.rule, MatchRule::Partial);
        assert_eq!(m.flight.flight_number, "JBU");
    }

    #[test]
    fn test_regional_fallback_by_airline_code() {
        let flights = vec![
            ScheduledFlight::new("UA77"),
            ScheduledFlight::new("DL1234").with_airline("DAL"),
        ];
        let m = find_match(&flights, "EDV5123").unwrap();
        assert_eq!(m.rule, MatchRule::RegionalFallback);
        assert_eq!(m.flight.flight_number, "DL1234");
    }

    #[test]
    fn test_regional_fallback_by_flight_prefix() {
        let flights = vec![ScheduledFlight::new("DAL88")];
        let m = find_match(&flights, "EDV5123").unwrap();
        assert_eq!(m.rule, MatchRule::RegionalFallback);
    }

    #[test]
    fn test_no_match() {
        let flights = flights();
        assert!(find_match(&flights, "SWA999").is_none());
        assert!(find_match(&flights, "").is_none());
        assert!(find_match(&flights, "   ").is_none());
        assert!(find_match(&[], "DAL1234").is_none());
    }

    #[test]
    fn test_rule_display() {
        assert_eq!(MatchRule::ExactFlightNumber.to_string(), "exact");
        assert_eq!(MatchRule::RegionalFallback.to_string(), "regional");
    }
}
