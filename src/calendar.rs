//! Date and time helpers shared by the generator, the exporter and the CLI.
//!
//! All arithmetic happens in naive local time. The IANA timezone name that
//! travels with a schedule is metadata only; no daylight-saving adjustment is
//! applied anywhere.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use tracing::warn;

/// Calendar-week order used for every week record, Monday first.
pub const ALL_WEEKDAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

/// Accepted start-date spellings, tried in order.
pub const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%Y/%m/%d", "%d.%m.%Y", "%d/%m/%Y"];

/// Accepted time-of-day spellings, tried in order.
pub const TIME_FORMATS: [&str; 3] = ["%H:%M", "%H:%M:%S", "%H%M"];

/// Reference time used when none is given or the given one cannot be parsed.
pub fn default_start_time() -> NaiveTime {
    NaiveTime::from_hms_opt(8, 0, 0).unwrap_or(NaiveTime::MIN)
}

/// Lowercase English key used for day maps in schedule documents.
pub fn weekday_key(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "monday",
        Weekday::Tue => "tuesday",
        Weekday::Wed => "wednesday",
        Weekday::Thu => "thursday",
        Weekday::Fri => "friday",
        Weekday::Sat => "saturday",
        Weekday::Sun => "sunday",
    }
}

pub fn weekday_from_key(key: &str) -> Option<Weekday> {
    ALL_WEEKDAYS
        .into_iter()
        .find(|day| weekday_key(*day).eq_ignore_ascii_case(key.trim()))
}

/// Days between the start of a week record and the given weekday.
pub fn weekday_offset(day: Weekday) -> i64 {
    i64::from(day.num_days_from_monday())
}

/// First Monday strictly after `today`.
pub fn next_monday(today: NaiveDate) -> NaiveDate {
    let days_ahead = 7 - i64::from(today.weekday().num_days_from_monday());
    today + Duration::days(days_ahead)
}

/// Applies a signed minute offset to a time of day, wrapping around midnight.
pub fn shift_time(reference: NaiveTime, offset_minutes: i64) -> NaiveTime {
    let (shifted, _) = reference.overflowing_add_signed(Duration::minutes(offset_minutes));
    shifted
}

pub fn parse_date(input: &str) -> Option<NaiveDate> {
    let input = input.trim();
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(input, format).ok())
}

pub fn parse_time(input: &str) -> Option<NaiveTime> {
    let input = input.trim();
    TIME_FORMATS
        .iter()
        .find_map(|format| NaiveTime::parse_from_str(input, format).ok())
}

/// A value picked from user input, flagged when a default had to replace
/// input that could not be parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolved<T> {
    pub value: T,
    pub fallback: bool,
}

impl<T> Resolved<T> {
    fn parsed(value: T) -> Self {
        Self {
            value,
            fallback: false,
        }
    }

    fn substituted(value: T) -> Self {
        Self {
            value,
            fallback: true,
        }
    }
}

/// Resolves the first day of a plan.
///
/// Without input the plan starts next Monday. Input matching none of
/// [`DATE_FORMATS`] also yields next Monday, but the result is flagged and a
/// warning is logged so the substitution is never silent.
pub fn resolve_start_date(input: Option<&str>, today: NaiveDate) -> Resolved<NaiveDate> {
    let input = input.map(str::trim).filter(|s| !s.is_empty());
    match input {
        None => Resolved::parsed(next_monday(today)),
        Some(raw) => match parse_date(raw) {
            Some(date) => Resolved::parsed(date),
            None => {
                let substitute = next_monday(today);
                warn!(
                    input = raw,
                    substitute = %substitute,
                    "unrecognised start date, falling back to next Monday"
                );
                Resolved::substituted(substitute)
            }
        },
    }
}

/// Resolves the reference time that session offsets are applied to.
pub fn resolve_start_time(input: Option<&str>) -> Resolved<NaiveTime> {
    let input = input.map(str::trim).filter(|s| !s.is_empty());
    match input {
        None => Resolved::parsed(default_start_time()),
        Some(raw) => match parse_time(raw) {
            Some(time) => Resolved::parsed(time),
            None => {
                let substitute = default_start_time();
                warn!(
                    input = raw,
                    substitute = %substitute.format("%H:%M"),
                    "unrecognised start time, falling back to default"
                );
                Resolved::substituted(substitute)
            }
        },
    }
}

/// Serde codec for `HH:MM` times in schedule documents.
pub mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer, de};

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format("%H:%M").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_time(&raw)
            .ok_or_else(|| de::Error::custom(format!("invalid time '{raw}', expected HH:MM")))
    }
}

const STAMP_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
];

/// Parses a generation timestamp written with either `T` or a space between
/// date and time.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    STAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
}

/// Serde codec for the optional generation timestamp. Writes the `T` form.
pub mod timestamp {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer, de};

    pub fn serialize<S: Serializer>(
        stamp: &Option<NaiveDateTime>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match stamp {
            Some(stamp) => {
                serializer.serialize_some(&stamp.format("%Y-%m-%dT%H:%M:%S").to_string())
            }
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<NaiveDateTime>, D::Error> {
        Option::<String>::deserialize(deserializer)?
            .map(|raw| {
                super::parse_timestamp(&raw).ok_or_else(|| {
                    de::Error::custom(format!(
                        "invalid timestamp '{raw}', expected YYYY-MM-DD HH:MM:SS"
                    ))
                })
            })
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn next_monday_is_strictly_in_the_future() {
        // 2026-02-16 is a Monday
        assert_eq!(next_monday(d(2026, 2, 16)), d(2026, 2, 23));
        assert_eq!(next_monday(d(2026, 2, 18)), d(2026, 2, 23));
        assert_eq!(next_monday(d(2026, 2, 22)), d(2026, 2, 23));
    }

    #[test]
    fn negative_offsets_move_before_the_reference() {
        let eight = NaiveTime::from_hms_opt(8, 0, 0).unwrap();
        assert_eq!(shift_time(eight, -30), NaiveTime::from_hms_opt(7, 30, 0).unwrap());
        assert_eq!(shift_time(eight, -540), NaiveTime::from_hms_opt(23, 0, 0).unwrap());
    }

    #[test]
    fn timestamps_accept_both_separators() {
        let expected = d(2026, 2, 10).and_hms_opt(9, 15, 30).unwrap();
        assert_eq!(parse_timestamp("2026-02-10T09:15:30"), Some(expected));
        assert_eq!(parse_timestamp("2026-02-10 09:15:30"), Some(expected));
        assert_eq!(
            parse_timestamp("2026-02-10 09:15:30.250").map(|stamp| stamp.date()),
            Some(d(2026, 2, 10))
        );
        assert_eq!(parse_timestamp("10.02.2026 09:15"), None);
    }

    #[test]
    fn date_formats_are_tried_in_order() {
        assert_eq!(parse_date("2026-02-16"), Some(d(2026, 2, 16)));
        assert_eq!(parse_date("2026/02/16"), Some(d(2026, 2, 16)));
        assert_eq!(parse_date("16.02.2026"), Some(d(2026, 2, 16)));
        assert_eq!(parse_date("16/02/2026"), Some(d(2026, 2, 16)));
        assert_eq!(parse_date("next tuesday"), None);
    }

    #[test]
    fn unparseable_date_is_flagged() {
        let today = d(2026, 2, 18);
        let resolved = resolve_start_date(Some("someday"), today);
        assert!(resolved.fallback);
        assert_eq!(resolved.value, d(2026, 2, 23));

        let missing = resolve_start_date(None, today);
        assert!(!missing.fallback);
        assert_eq!(missing.value, d(2026, 2, 23));
    }

    #[test]
    fn weekday_keys_round_trip() {
        for day in ALL_WEEKDAYS {
            assert_eq!(weekday_from_key(weekday_key(day)), Some(day));
        }
        assert_eq!(weekday_from_key("Funday"), None);
    }
}
