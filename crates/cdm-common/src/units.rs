//! Unit string helpers: reference-time units and the unit families used by
//! axis-type heuristics.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Base period of a `"<unit> since <reference>"` time unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimePeriod {
    Milliseconds,
    Seconds,
    Minutes,
    Hours,
    Days,
    Weeks,
}

impl TimePeriod {
    fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "ms" | "msec" | "msecs" | "millisecond" | "milliseconds" => Some(Self::Milliseconds),
            "s" | "sec" | "secs" | "second" | "seconds" => Some(Self::Seconds),
            "min" | "mins" | "minute" | "minutes" => Some(Self::Minutes),
            "h" | "hr" | "hrs" | "hour" | "hours" => Some(Self::Hours),
            "d" | "day" | "days" => Some(Self::Days),
            "week" | "weeks" => Some(Self::Weeks),
            _ => None,
        }
    }

    /// Length of one period in seconds.
    pub fn seconds(self) -> f64 {
        match self {
            Self::Milliseconds => 0.001,
            Self::Seconds => 1.0,
            Self::Minutes => 60.0,
            Self::Hours => 3600.0,
            Self::Days => 86_400.0,
            Self::Weeks => 604_800.0,
        }
    }
}

/// Parsed `"<unit> since <reference>"` time units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeUnits {
    pub period: TimePeriod,
    pub reference: DateTime<Utc>,
}

impl TimeUnits {
    /// Parse a units string such as `"days since 2000-01-01"` or
    /// `"seconds since 1970-01-01T00:00:00Z"`.
    pub fn parse(units: &str) -> Option<Self> {
        let lower = units.trim().to_lowercase();
        let (period, reference) = lower.split_once(" since ")?;
        let period = TimePeriod::parse(period)?;
        let reference = parse_reference_time(reference)?;
        Some(Self { period, reference })
    }

    /// Convert a coordinate value into an absolute time.
    pub fn to_datetime(&self, value: f64) -> Option<DateTime<Utc>> {
        if !value.is_finite() {
            return None;
        }
        let millis = (value * self.period.seconds() * 1000.0).round();
        if millis.abs() > i64::MAX as f64 {
            return None;
        }
        self.reference
            .checked_add_signed(Duration::milliseconds(millis as i64))
    }
}

/// Parse the reference part of a time unit.
///
/// Accepts RFC 3339, `YYYY-MM-DD hh:mm:ss[.f]` with an optional trailing
/// `Z`/`UTC`, `YYYY-MM-DDThh:mm:ss`, and bare dates. Offsets are ignored
/// apart from RFC 3339 input.
fn parse_reference_time(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(&s.to_uppercase()) {
        return Some(dt.with_timezone(&Utc));
    }

    let cleaned = s
        .trim_end_matches("utc")
        .trim_end_matches('z')
        .trim_end()
        .replace('t', " ");

    for fmt in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(&cleaned, fmt) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }

    // date, possibly followed by a time we could not parse above
    let date_part = cleaned.split_whitespace().next()?;
    let date = NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()?;
    Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?))
}

/// Check if the units describe a reference time (`"<unit> since <date>"`).
pub fn is_date_unit(units: &str) -> bool {
    TimeUnits::parse(units).is_some()
}

/// Check if the units are a pure time period (`"hours"`, `"s"`, ...).
pub fn is_time_period_unit(units: &str) -> bool {
    TimePeriod::parse(units).is_some()
}

/// Degrees-north family (latitude).
pub fn is_latitude_unit(units: &str) -> bool {
    matches!(
        units.trim().to_lowercase().as_str(),
        "degrees_north"
            | "degree_north"
            | "degree_n"
            | "degrees_n"
            | "degreen"
            | "degreesn"
    )
}

/// Degrees-east family (longitude).
pub fn is_longitude_unit(units: &str) -> bool {
    matches!(
        units.trim().to_lowercase().as_str(),
        "degrees_east"
            | "degree_east"
            | "degree_e"
            | "degrees_e"
            | "degreee"
            | "degreese"
    )
}

/// Pressure units.
pub fn is_pressure_unit(units: &str) -> bool {
    matches!(
        units.trim().to_lowercase().as_str(),
        "pa" | "hpa" | "kpa" | "mbar" | "millibar" | "millibars" | "mb" | "bar" | "atm"
            | "pascal" | "pascals" | "hectopascal" | "hectopascals"
    )
}

/// Length units, used for height and depth coordinates.
pub fn is_length_unit(units: &str) -> bool {
    matches!(
        units.trim().to_lowercase().as_str(),
        "m" | "meter" | "meters" | "metre" | "metres" | "km" | "kilometer" | "kilometers"
            | "kilometre" | "kilometres" | "cm" | "mm" | "ft" | "feet" | "gpm"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    #[test]
    fn test_parse_days_since() {
        let tu = TimeUnits::parse("days since 2000-01-01").unwrap();
        assert_eq!(tu.period, TimePeriod::Days);
        assert_eq!(tu.reference.year(), 2000);

        let dt = tu.to_datetime(31.0).unwrap();
        assert_eq!((dt.month(), dt.day()), (2, 1));
    }

    #[test]
    fn test_parse_variants() {
        assert!(TimeUnits::parse("seconds since 1970-01-01T00:00:00Z").is_some());
        assert!(TimeUnits::parse("Hours Since 2024-06-01 12:00:00").is_some());
        assert!(TimeUnits::parse("minutes since 2024-06-01 12:00 UTC").is_some());
        assert!(TimeUnits::parse("furlongs since 2000-01-01").is_none());
        assert!(TimeUnits::parse("days").is_none());
    }

    #[test]
    fn test_to_datetime_rejects_nan() {
        let tu = TimeUnits::parse("days since 2000-01-01").unwrap();
        assert!(tu.to_datetime(f64::NAN).is_none());
    }

    #[test]
    fn test_unit_families() {
        assert!(is_latitude_unit("degrees_north"));
        assert!(is_latitude_unit(" Degree_N "));
        assert!(!is_latitude_unit("degrees_east"));
        assert!(is_longitude_unit("degreesE"));
        assert!(is_pressure_unit("hPa"));
        assert!(is_length_unit("km"));
        assert!(is_date_unit("days since 2000-01-01"));
        assert!(is_time_period_unit("hours"));
        assert!(!is_time_period_unit("days since 2000-01-01"));
    }
}
