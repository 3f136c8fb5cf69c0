//! Validation helpers for event input.
//
// The writer itself performs no validation; callers run these checks before
// handing an `EventConfig` to it.

use super::types::EventConfig;
use super::CalendarError;
use chrono::Datelike;
use chrono_tz::Tz;
use once_cell::sync::Lazy;
use regex::Regex;
use std::str::FromStr;

static DATE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap());
static TIME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{1,2}:\d{2}$").unwrap());

/// Validate date string has format YYYY-MM-DD
pub fn validate_date_format(date: &str) -> bool {
    if !DATE_RE.is_match(date) {
        return false;
    }
    if let Ok(naive_date) = chrono::NaiveDate::parse_from_str(date, "%Y-%m-%d") {
        let year = naive_date.year();
        return (2000..=2100).contains(&year);
    }
    false
}

/// Validate time string has format HH:MM
pub fn validate_time_format(time: &str) -> bool {
    if !TIME_RE.is_match(time) {
        return false;
    }
    let parts: Vec<&str> = time.split(':').collect();
    if parts.len() != 2 {
        return false;
    }
    if let (Ok(hours), Ok(minutes)) = (parts[0].parse::<u32>(), parts[1].parse::<u32>()) {
        return hours < 24 && minutes < 60;
    }
    false
}

/// Parse an IANA timezone identifier.
pub fn parse_timezone(id: &str) -> Result<Tz, CalendarError> {
    Tz::from_str(id)
        .map_err(|_| CalendarError::InvalidEvent(format!("unknown timezone '{}'", id)))
}

/// Caller-side checks an event must pass before it is handed to the writer.
pub fn validate_event_config(config: &EventConfig) -> Result<(), CalendarError> {
    if config.title.trim().is_empty() {
        return Err(CalendarError::InvalidEvent("title must not be empty".to_string()));
    }
    if config.calendar_id <= 0 {
        return Err(CalendarError::InvalidEvent(format!(
            "calendar id {} is not a valid reference",
            config.calendar_id
        )));
    }
    if config.start >= config.end {
        return Err(CalendarError::InvalidEvent(format!(
            "event must end after it starts ({} >= {})",
            config.start, config.end
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use test_case::test_case;

    #[test_case("2026-08-29", true; "plain date")]
    #[test_case("2026-8-29", false; "missing zero padding")]
    #[test_case("1999-01-01", false; "year below range")]
    #[test_case("2026-13-40", false; "impossible month and day")]
    #[test_case("today", false; "not a date")]
    fn date_format(input: &str, expected: bool) {
        assert_eq!(validate_date_format(input), expected);
    }

    #[test_case("10:00", true; "morning")]
    #[test_case("9:30", true; "single digit hour")]
    #[test_case("24:00", false; "hour out of range")]
    #[test_case("10:60", false; "minute out of range")]
    #[test_case("10am", false; "not a time")]
    fn time_format(input: &str, expected: bool) {
        assert_eq!(validate_time_format(input), expected);
    }

    #[test]
    fn timezone_parsing() {
        assert!(parse_timezone("Europe/Helsinki").is_ok());
        assert!(matches!(
            parse_timezone("Mars/Olympus"),
            Err(CalendarError::InvalidEvent(_))
        ));
    }

    #[test]
    fn rejects_event_ending_before_it_starts() {
        let start = Utc::now();
        let config = EventConfig::new(1, "Backwards", start, start - Duration::hours(1));
        assert!(matches!(
            validate_event_config(&config),
            Err(CalendarError::InvalidEvent(_))
        ));
    }

    #[test]
    fn rejects_blank_title() {
        let start = Utc::now();
        let config = EventConfig::new(1, "   ", start, start + Duration::hours(1));
        assert!(matches!(
            validate_event_config(&config),
            Err(CalendarError::InvalidEvent(_))
        ));
    }

    #[test]
    fn accepts_a_well_formed_event() {
        let start = Utc::now();
        let config = EventConfig::new(1, "Standup", start, start + Duration::minutes(30));
        assert!(validate_event_config(&config).is_ok());
    }
}
