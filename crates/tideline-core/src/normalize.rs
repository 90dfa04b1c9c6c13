//! Canonical key normalization for ship names, dates, and itineraries.
//!
//! Everything in this module is pure and total: malformed input normalizes
//! to an empty string, `false`, `0`, or `None`. Nothing here panics or
//! returns an error, so callers can run it over untrusted upstream payloads
//! without guarding each call.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Glyphs stripped from ship names before comparison.
const TRADEMARK_GLYPHS: [char; 2] = ['®', '™'];

/// Small words kept lower-case inside port names.
const PORT_SMALL_WORDS: [&str; 10] = ["and", "of", "the", "at", "by", "for", "in", "on", "to", "with"];

// ---------------------------------------------------------------------------
// Ship names
// ---------------------------------------------------------------------------

/// Normalize a ship name for identity comparison.
///
/// Strips `®`/`™`, trims, and lower-cases, so `"Wonder Of The Seas®"` and
/// `" wonder of the seas "` collapse to the same value.
#[must_use]
pub fn normalize_ship(name: &str) -> String {
    name.chars()
        .filter(|c| !TRADEMARK_GLYPHS.contains(c))
        .collect::<String>()
        .trim()
        .to_lowercase()
}

/// Ship name as shown to people: brand prefix and generic suffix removed,
/// then title-cased (`"ROYAL CARIBBEAN Wonder of the Seas"` → `"Wonder"`).
#[must_use]
pub fn display_ship_name(name: &str) -> String {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return String::new();
    }

    let mut rest = trimmed;
    for prefix in ["royal caribbean", "celebrity"] {
        if starts_with_ignore_case(rest, prefix) {
            rest = rest[prefix.len()..].trim_start();
            break;
        }
    }
    for suffix in ["of the seas", "cruise", "ship"] {
        if ends_with_ignore_case(rest, suffix) {
            rest = rest[..rest.len() - suffix.len()].trim_end();
            break;
        }
    }

    title_case(rest.trim())
}

/// Upper-case the first letter of every space-separated word, lower-case the rest.
#[must_use]
pub fn title_case(text: &str) -> String {
    text.to_lowercase()
        .split(' ')
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Title-case a port name, keeping small joining words lower-case unless
/// they lead the name (`"PORT OF SPAIN"` → `"Port of Spain"`).
#[must_use]
pub fn port_title_case(port: &str) -> String {
    port.to_lowercase()
        .split(' ')
        .enumerate()
        .map(|(index, word)| {
            if index == 0 || !PORT_SMALL_WORDS.contains(&word) {
                capitalize(word)
            } else {
                word.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

fn starts_with_ignore_case(text: &str, prefix: &str) -> bool {
    text.get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
}

fn ends_with_ignore_case(text: &str, suffix: &str) -> bool {
    text.len() >= suffix.len()
        && text
            .get(text.len() - suffix.len()..)
            .is_some_and(|tail| tail.eq_ignore_ascii_case(suffix))
}

// ---------------------------------------------------------------------------
// Dates
// ---------------------------------------------------------------------------

/// Parse a date the way upstream payloads spell them.
///
/// Accepted forms: RFC 3339 (`2025-03-09T00:00:00Z`), ISO date
/// (`2025-03-09`), naive ISO date-time (`2025-03-09T10:30:00`), and US
/// slash dates (`03/09/2025`). Date-only forms are taken as midnight UTC.
#[must_use]
pub fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }

    for format in ["%Y-%m-%d", "%m/%d/%Y", "%m-%d-%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(raw, format) {
            return date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
        }
    }

    None
}

/// Fail-closed date range check.
///
/// With no bounds every date is in range; blank bounds count as absent.
/// With at least one bound, a date
/// that does not parse is out of range. A bound that does not parse cannot
/// exclude anything and is ignored.
#[must_use]
pub fn within_range(date: &str, from: Option<&str>, to: Option<&str>) -> bool {
    let from = from.filter(|bound| !bound.trim().is_empty());
    let to = to.filter(|bound| !bound.trim().is_empty());
    if from.is_none() && to.is_none() {
        return true;
    }

    let Some(when) = parse_date(date) else {
        return false;
    };

    let after_upper = to.and_then(parse_date).is_some_and(|upper| when > upper);
    let before_lower = from.and_then(parse_date).is_some_and(|lower| when < lower);
    !(before_lower || after_upper)
}

// ---------------------------------------------------------------------------
// Money
// ---------------------------------------------------------------------------

/// Parse an amount that may arrive as a number or a `"$1,234.50"` string.
#[must_use]
pub fn parse_money(raw: &str) -> Option<f64> {
    let cleaned: String = raw.chars().filter(|c| *c != '$' && *c != ',').collect();
    cleaned.trim().parse::<f64>().ok().filter(|value| value.is_finite())
}

// ---------------------------------------------------------------------------
// Itineraries
// ---------------------------------------------------------------------------

/// Night count and port list parsed from an itinerary description.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Itinerary {
    pub nights: u32,
    pub ports: Vec<String>,
}

/// Parse `"7 Night Western Caribbean: Miami, Cozumel, Roatan"`.
///
/// Nights come from the first `<digits> night` occurrence (case-insensitive,
/// whitespace allowed between); `0` when there is none. Ports are the
/// comma-separated names after the `N night ...:` prefix.
#[must_use]
pub fn parse_itinerary(description: &str) -> Itinerary {
    let nights_match = find_nights(description);
    let nights = nights_match.map_or(0, |(value, _, _)| value);

    let ports_source = match nights_match {
        Some((_, start, after_night)) => {
            let tail = &description[after_night..];
            tail.find(':').map_or_else(
                || description.to_string(),
                |colon| {
                    let after_colon = tail[colon + 1..].trim_start();
                    format!("{}{}", &description[..start], after_colon)
                },
            )
        }
        None => description.to_string(),
    };

    let ports = ports_source
        .split(',')
        .map(str::trim)
        .filter(|port| !port.is_empty())
        .map(str::to_string)
        .collect();

    Itinerary { nights, ports }
}

/// Night count only; see [`parse_itinerary`].
#[must_use]
pub fn parse_nights(description: &str) -> u32 {
    find_nights(description).map_or(0, |(value, _, _)| value)
}

/// Locate `<digits>\s*night`, returning the value, the byte offset where
/// the digits start, and the offset just past the word `night`.
fn find_nights(description: &str) -> Option<(u32, usize, usize)> {
    let lower = description.to_ascii_lowercase();
    let bytes = lower.as_bytes();
    let mut search_from = 0;

    while let Some(found) = lower[search_from..].find("night") {
        let night_at = search_from + found;
        let mut cursor = night_at;
        while cursor > 0 && bytes[cursor - 1].is_ascii_whitespace() {
            cursor -= 1;
        }
        let digits_end = cursor;
        while cursor > 0 && bytes[cursor - 1].is_ascii_digit() {
            cursor -= 1;
        }
        if cursor < digits_end {
            // counts too large for u32 saturate so they still exceed any cap
            let value = bytes[cursor..digits_end]
                .iter()
                .fold(0_u32, |acc, digit| acc.saturating_mul(10).saturating_add(u32::from(digit - b'0')));
            return Some((value, cursor, night_at + "night".len()));
        }
        search_from = night_at + "night".len();
    }

    None
}

// ---------------------------------------------------------------------------
// Ship/date canonical key
// ---------------------------------------------------------------------------

/// Canonical identity for a cruise across financial sources:
/// normalized ship name plus the departure date as supplied.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShipDateKey {
    ship: String,
    departure_date: String,
}

impl ShipDateKey {
    #[must_use]
    pub fn new(ship: &str, departure_date: &str) -> Self {
        Self {
            ship: normalize_ship(ship),
            departure_date: departure_date.trim().to_string(),
        }
    }
}

impl fmt::Display for ShipDateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}", self.ship, self.departure_date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // -----------------------------------------------------------------------
    // Ship names
    // -----------------------------------------------------------------------

    #[test]
    fn trademark_and_case_collapse() {
        assert_eq!(normalize_ship("Wonder Of The Seas®"), "wonder of the seas");
        assert_eq!(normalize_ship("  wonder of the seas "), "wonder of the seas");
        assert_eq!(normalize_ship("Icon™ of the Seas"), "icon of the seas");
        assert_eq!(normalize_ship(""), "");
    }

    #[test]
    fn display_ship_name_strips_brand_and_suffix() {
        assert_eq!(display_ship_name("Royal Caribbean WONDER of the Seas"), "Wonder");
        assert_eq!(display_ship_name("Celebrity Beyond"), "Beyond");
        assert_eq!(display_ship_name("Utopia of the seas"), "Utopia");
        assert_eq!(display_ship_name("   "), "");
    }

    #[test]
    fn port_names_keep_small_words_lowercase() {
        assert_eq!(port_title_case("PORT OF SPAIN"), "Port of Spain");
        assert_eq!(port_title_case("the bahamas"), "The Bahamas");
        assert_eq!(title_case("FREE PLAY bonus"), "Free Play Bonus");
    }

    // -----------------------------------------------------------------------
    // Dates
    // -----------------------------------------------------------------------

    #[test]
    fn parse_date_accepts_common_forms() {
        assert!(parse_date("2025-03-09").is_some());
        assert!(parse_date("2025-03-09T10:30:00").is_some());
        assert!(parse_date("2025-03-09T10:30:00Z").is_some());
        assert!(parse_date("2025-03-09T10:30:00-05:00").is_some());
        assert!(parse_date("03/09/2025").is_some());
        assert_eq!(parse_date("03/09/2025"), parse_date("2025-03-09"));
        assert!(parse_date("next tuesday").is_none());
        assert!(parse_date("").is_none());
    }

    #[test]
    fn within_range_without_bounds_accepts_anything() {
        assert!(within_range("garbage", None, None));
        assert!(within_range("2025-01-01", None, None));
    }

    #[test]
    fn within_range_fails_closed_on_bad_date() {
        assert!(!within_range("garbage", Some("2025-01-01"), None));
        assert!(!within_range("", None, Some("2025-12-31")));
    }

    #[test]
    fn blank_bounds_count_as_absent() {
        assert!(within_range("garbage", Some(""), Some("  ")));
        assert!(within_range("2025-03-01", Some(""), None));
        assert!(!within_range("2025-07-01", Some(" "), Some("2025-06-30")));
    }

    #[test]
    fn within_range_bounds_are_inclusive() {
        let from = Some("2025-01-01");
        let to = Some("2025-06-30");
        assert!(within_range("2025-01-01", from, to));
        assert!(within_range("2025-06-30", from, to));
        assert!(!within_range("2024-12-31", from, to));
        assert!(!within_range("2025-07-01", from, to));
    }

    #[test]
    fn unparseable_bound_is_ignored() {
        assert!(within_range("2025-03-01", Some("soon"), Some("2025-06-30")));
        assert!(!within_range("2025-07-01", Some("soon"), Some("2025-06-30")));
    }

    // -----------------------------------------------------------------------
    // Itineraries and money
    // -----------------------------------------------------------------------

    #[test]
    fn nights_parse_from_description() {
        assert_eq!(parse_nights("7 Night Western Caribbean"), 7);
        assert_eq!(parse_nights("4 NIGHT Bahamas"), 4);
        assert_eq!(parse_nights("12night transatlantic"), 12);
        assert_eq!(parse_nights("Overnight in Nassau, 3 Night getaway"), 3);
        assert_eq!(parse_nights("Bahamas getaway"), 0);
        assert_eq!(parse_nights(""), 0);
    }

    #[test]
    fn oversized_night_count_saturates() {
        assert_eq!(parse_nights("99999999999 Night odyssey"), u32::MAX);
        assert_eq!(parse_nights("4294967295 nights"), u32::MAX);
    }

    #[test]
    fn itinerary_ports_follow_prefix() {
        let itinerary = parse_itinerary("7 Night Western Caribbean: Miami, Cozumel, Roatan");
        assert_eq!(itinerary.nights, 7);
        assert_eq!(itinerary.ports, vec!["Miami", "Cozumel", "Roatan"]);

        let bare = parse_itinerary("Miami, Nassau");
        assert_eq!(bare.nights, 0);
        assert_eq!(bare.ports, vec!["Miami", "Nassau"]);
    }

    #[test]
    fn money_strings_are_cleaned() {
        assert_eq!(parse_money("$1,234.50"), Some(1234.5));
        assert_eq!(parse_money(" 300 "), Some(300.0));
        assert_eq!(parse_money("n/a"), None);
        assert_eq!(parse_money("NaN"), None);
    }

    // -----------------------------------------------------------------------
    // Keys
    // -----------------------------------------------------------------------

    #[test]
    fn ship_date_key_uses_normalized_ship() {
        let a = ShipDateKey::new("Wonder Of The Seas®", "2025-03-09");
        let b = ShipDateKey::new("wonder of the seas", "2025-03-09");
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "wonder of the seas|2025-03-09");
        assert_ne!(a, ShipDateKey::new("wonder of the seas", "2025-03-10"));
    }
}
