//! Parses the loose timestamp formats accepted by the `restore`/`versions`
//! CLI commands and converts them from local time to UTC.
//!
//! A user rarely wants to type a full timestamp: `15:30` should mean
//! "today at 15:30:59", and `2024-03-01` should mean "that whole day, up
//! to its last second". Missing fields are filled in with the most
//! permissive value so that `--at` always resolves to the latest moment
//! consistent with what was typed.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};

#[derive(Debug, thiserror::Error)]
pub enum DateTimeError {
    #[error("could not parse {0:?} as a date/time")]
    Unrecognized(String),

    #[error("{0:?} is an ambiguous or nonexistent local time")]
    AmbiguousLocalTime(String),
}

fn end_of_day() -> NaiveTime {
    NaiveTime::from_hms_opt(23, 59, 59).expect("23:59:59 is always a valid time")
}

/// Parses `input` as a point in local time and returns the equivalent
/// UTC instant.
pub fn parse_timestamp(input: &str) -> Result<DateTime<Utc>, DateTimeError> {
    parse_timestamp_relative_to(input, Local::now().date_naive())
}

fn parse_timestamp_relative_to(
    input: &str,
    today: NaiveDate,
) -> Result<DateTime<Utc>, DateTimeError> {
    let trimmed = input.trim();

    let naive = if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S") {
        dt
    } else if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S") {
        dt
    } else if let Ok(partial) = NaiveDateTime::parse_from_str(
        &format!("{trimmed}:59"),
        "%Y-%m-%d %H:%M:%S",
    ) {
        // "YYYY-MM-DD HH:MM" with seconds defaulted to :59.
        partial
    } else if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        date.and_time(end_of_day())
    } else if let Ok(time) = NaiveTime::parse_from_str(trimmed, "%H:%M:%S") {
        today.and_time(time)
    } else if let Ok(partial) = NaiveTime::parse_from_str(&format!("{trimmed}:59"), "%H:%M:%S") {
        today.and_time(partial)
    } else {
        return Err(DateTimeError::Unrecognized(trimmed.to_string()));
    };

    match Local.from_local_datetime(&naive).single() {
        Some(local) => Ok(local.with_timezone(&Utc)),
        None => Err(DateTimeError::AmbiguousLocalTime(trimmed.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 7, 28).unwrap()
    }

    #[test]
    fn parses_full_datetime() {
        let result = parse_timestamp_relative_to("2026-07-28 09:15:30", today()).unwrap();
        let local = result.with_timezone(&Local);
        assert_eq!(local.year(), 2026);
        assert_eq!(local.hour_minute_second(), (9, 15, 30));
    }

    #[test]
    fn parses_datetime_without_seconds_defaulting_to_59() {
        let result = parse_timestamp_relative_to("2026-07-28 09:15", today()).unwrap();
        let local = result.with_timezone(&Local);
        assert_eq!(local.hour_minute_second(), (9, 15, 59));
    }

    #[test]
    fn parses_date_only_defaulting_to_end_of_day() {
        let result = parse_timestamp_relative_to("2026-07-28", today()).unwrap();
        let local = result.with_timezone(&Local);
        assert_eq!(local.hour_minute_second(), (23, 59, 59));
    }

    #[test]
    fn parses_time_only_using_today() {
        let result = parse_timestamp_relative_to("14:30", today()).unwrap();
        let local = result.with_timezone(&Local);
        assert_eq!(local.date_naive(), today());
        assert_eq!(local.hour_minute_second(), (14, 30, 59));
    }

    #[test]
    fn rejects_garbage_input() {
        let err = parse_timestamp_relative_to("not-a-timestamp", today()).unwrap_err();
        assert!(matches!(err, DateTimeError::Unrecognized(_)));
    }

    trait HourMinuteSecond {
        fn hour_minute_second(&self) -> (u32, u32, u32);
    }

    impl HourMinuteSecond for DateTime<Local> {
        fn hour_minute_second(&self) -> (u32, u32, u32) {
            use chrono::Timelike;
            (self.hour(), self.minute(), self.second())
        }
    }
}
