//! ISO-8601 parsing and formatting
//!
//! Supported profile:
//! - dates: `YYYY-MM-DD` or `YYYYMMDD`
//! - times: `HH:MM[:SS[.fff]]` or `HHMM[SS[.fff]]`, optional `Z` / `±HH[:MM]`
//! - date-times: a date, an optional `T` or space separator, a time
//! - durations: `[-]P[nW][nD][T[nH][nM][n[.f]S]]`; years and months are
//!   not supported
//!
//! A leap second (`23:59:60`) is accepted and kept.

use std::sync::LazyLock;

use chrono::{Duration, FixedOffset, NaiveDate, NaiveTime, Timelike};
use regex::{Captures, Regex};

use crate::schema::ValidationError;
use crate::value::{IsoDateTime, IsoTime};

static DATE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:(\d{4})-(\d{2})-(\d{2})|(\d{4})(\d{2})(\d{2}))$").expect("Invalid regex")
});

static TIME_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(\d{2}):?(\d{2})(?::?(\d{2})(?:[.,](\d+))?)?(Z|z|[+-]\d{2}(?::?\d{2})?)?$",
    )
    .expect("Invalid regex")
});

static DATETIME_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{4}-\d{2}-\d{2}|\d{8})[Tt ]?(.+)$").expect("Invalid regex")
});

static DURATION_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(-)?P(?:(\d+)W)?(?:(\d+)D)?(?:T(?:(\d+)H)?(?:(\d+)M)?(?:(\d+)(?:[.,](\d+))?S)?)?$",
    )
    .expect("Invalid regex")
});

/// Parses an ISO-8601 calendar date; impossible dates such as `2020-02-30`
/// are rejected
pub fn parse_iso_date(value: &str) -> Result<NaiveDate, ValidationError> {
    let invalid = || ValidationError::type_error("date");
    let captures = DATE_REGEX.captures(value).ok_or_else(invalid)?;

    let (year, month, day) = if captures.get(1).is_some() {
        (
            number::<i32>(&captures, 1),
            number::<u32>(&captures, 2),
            number::<u32>(&captures, 3),
        )
    } else {
        (
            number::<i32>(&captures, 4),
            number::<u32>(&captures, 5),
            number::<u32>(&captures, 6),
        )
    };

    match (year, month, day) {
        (Some(year), Some(month), Some(day)) => {
            NaiveDate::from_ymd_opt(year, month, day).ok_or_else(invalid)
        }
        _ => Err(invalid()),
    }
}

/// Parses an ISO-8601 time of day with optional fraction and offset
pub fn parse_iso_time(value: &str) -> Result<IsoTime, ValidationError> {
    let invalid = || ValidationError::type_error("time");
    let captures = TIME_REGEX.captures(value).ok_or_else(invalid)?;

    let hour = number::<u32>(&captures, 1).ok_or_else(invalid)?;
    let minute = number::<u32>(&captures, 2).ok_or_else(invalid)?;
    let second = match captures.get(3) {
        Some(_) => number::<u32>(&captures, 3).ok_or_else(invalid)?,
        None => 0,
    };
    let nano = captures.get(4).map_or(0, |m| fraction_to_nanos(m.as_str()));

    let local = if second == 60 {
        NaiveTime::from_hms_nano_opt(hour, minute, 59, 1_000_000_000 + nano)
    } else {
        NaiveTime::from_hms_nano_opt(hour, minute, second, nano)
    }
    .ok_or_else(invalid)?;

    match captures.get(5) {
        Some(offset) => {
            let offset = parse_offset(offset.as_str()).ok_or_else(invalid)?;
            Ok(IsoTime::with_offset(local, offset))
        }
        None => Ok(IsoTime::naive(local)),
    }
}

/// Parses an ISO-8601 date-time
pub fn parse_iso_datetime(value: &str) -> Result<IsoDateTime, ValidationError> {
    let invalid = || ValidationError::type_error("datetime");
    let captures = DATETIME_REGEX.captures(value).ok_or_else(invalid)?;

    let date = captures
        .get(1)
        .and_then(|m| parse_iso_date(m.as_str()).ok())
        .ok_or_else(invalid)?;
    let time = captures
        .get(2)
        .and_then(|m| parse_iso_time(m.as_str()).ok())
        .ok_or_else(invalid)?;

    let local = date.and_time(time.local());
    Ok(match time.offset() {
        Some(offset) => IsoDateTime::with_offset(local, offset),
        None => IsoDateTime::naive(local),
    })
}

/// Parses the day-time subset of ISO-8601 durations
pub fn parse_iso_duration(value: &str) -> Result<Duration, ValidationError> {
    let invalid = || ValidationError::type_error("duration");
    let captures = DURATION_REGEX.captures(value).ok_or_else(invalid)?;

    let has_date_part = captures.get(2).is_some() || captures.get(3).is_some();
    let has_time_part = (4..=6).any(|i| captures.get(i).is_some());
    if !has_date_part && !has_time_part {
        return Err(invalid());
    }
    // `PT` alone carries no component
    if value.ends_with('T') {
        return Err(invalid());
    }

    let component = |index: usize, unit: i64| -> Option<i64> {
        match captures.get(index) {
            Some(m) => m.as_str().parse::<i64>().ok()?.checked_mul(unit),
            None => Some(0),
        }
    };

    let seconds = [
        component(2, 7 * 86_400),
        component(3, 86_400),
        component(4, 3_600),
        component(5, 60),
        component(6, 1),
    ]
    .into_iter()
    .try_fold(0i64, |total, part| total.checked_add(part?))
    .ok_or_else(invalid)?;
    let nanos = captures.get(7).map_or(0, |m| fraction_to_nanos(m.as_str()));

    let duration = Duration::try_seconds(seconds)
        .and_then(|d| d.checked_add(&Duration::nanoseconds(i64::from(nanos))))
        .ok_or_else(invalid)?;

    Ok(if captures.get(1).is_some() {
        -duration
    } else {
        duration
    })
}

/// Formats a date as `YYYY-MM-DD`
pub fn format_iso_date(date: &NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Formats a time as `HH:MM:SS[.fff][offset]`
pub fn format_iso_time(time: &IsoTime) -> String {
    let mut out = time.local().format("%H:%M:%S%.f").to_string();
    if let Some(offset) = time.offset() {
        out.push_str(&format_offset(offset));
    }
    out
}

/// Formats a date-time as `YYYY-MM-DDTHH:MM:SS[.fff][offset]`
pub fn format_iso_datetime(datetime: &IsoDateTime) -> String {
    let mut out = datetime.local().format("%Y-%m-%dT%H:%M:%S%.f").to_string();
    if let Some(offset) = datetime.offset() {
        out.push_str(&format_offset(offset));
    }
    out
}

/// Formats a duration as `[-]P[nD][T[nH][nM][n[.f]S]]`, or `PT0S` when zero
pub fn format_iso_duration(duration: &Duration) -> String {
    let negative = *duration < Duration::zero();
    let magnitude = duration.abs();

    let total = magnitude.num_seconds();
    let nanos = magnitude.subsec_nanos().unsigned_abs();
    let days = total / 86_400;
    let hours = (total % 86_400) / 3_600;
    let minutes = (total % 3_600) / 60;
    let seconds = total % 60;

    let mut out = String::new();
    if negative {
        out.push('-');
    }
    out.push('P');
    if days > 0 {
        out.push_str(&format!("{}D", days));
    }

    if hours > 0 || minutes > 0 || seconds > 0 || nanos > 0 {
        out.push('T');
        if hours > 0 {
            out.push_str(&format!("{}H", hours));
        }
        if minutes > 0 {
            out.push_str(&format!("{}M", minutes));
        }
        if seconds > 0 || nanos > 0 {
            if nanos > 0 {
                let fraction = format!("{:09}", nanos);
                out.push_str(&format!("{}.{}S", seconds, fraction.trim_end_matches('0')));
            } else {
                out.push_str(&format!("{}S", seconds));
            }
        }
    } else if days == 0 {
        out.push_str("T0S");
    }

    out
}

fn number<T: std::str::FromStr>(captures: &Captures<'_>, index: usize) -> Option<T> {
    captures.get(index)?.as_str().parse().ok()
}

fn fraction_to_nanos(digits: &str) -> u32 {
    let mut padded: String = digits.chars().take(9).collect();
    while padded.len() < 9 {
        padded.push('0');
    }
    padded.parse().unwrap_or(0)
}

fn parse_offset(text: &str) -> Option<FixedOffset> {
    if text.eq_ignore_ascii_case("z") {
        return FixedOffset::east_opt(0);
    }

    let sign = if text.starts_with('-') { -1 } else { 1 };
    let digits: String = text[1..].chars().filter(|c| *c != ':').collect();
    let hours: i32 = digits.get(0..2)?.parse().ok()?;
    let minutes: i32 = match digits.get(2..4) {
        Some(m) => m.parse().ok()?,
        None => 0,
    };
    if hours > 23 || minutes > 59 {
        return None;
    }

    FixedOffset::east_opt(sign * (hours * 3_600 + minutes * 60))
}

fn format_offset(offset: FixedOffset) -> String {
    let seconds = offset.local_minus_utc();
    if seconds == 0 {
        return "Z".to_string();
    }
    let sign = if seconds < 0 { '-' } else { '+' };
    let seconds = seconds.abs();
    format!("{}{:02}:{:02}", sign, seconds / 3_600, (seconds % 3_600) / 60)
}

/// Seconds component of a time, reporting a leap second as 60
pub fn leap_aware_second(time: &NaiveTime) -> u32 {
    if time.nanosecond() >= 1_000_000_000 {
        60
    } else {
        time.second()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dates() {
        assert_eq!(
            parse_iso_date("2016-09-18").unwrap(),
            NaiveDate::from_ymd_opt(2016, 9, 18).unwrap()
        );
        assert_eq!(
            parse_iso_date("20160918").unwrap(),
            NaiveDate::from_ymd_opt(2016, 9, 18).unwrap()
        );
        assert!(parse_iso_date("2016-13-18").is_err());
        assert!(parse_iso_date("2020-02-30").is_err());
        assert!(parse_iso_date("2016-0918").is_err());
        assert!(parse_iso_date("not a date").is_err());
    }

    #[test]
    fn test_valid_datetimes() {
        for input in [
            "2016-09-18T17:34:02.124Z",
            "2016-09-18 17:34:02.124Z",
            "2016-09-1817:34:02Z",
            "2016-09-18T17:34:02+02:00",
            "20160918173402Z",
        ] {
            assert!(parse_iso_datetime(input).is_ok(), "{} should parse", input);
        }
    }

    #[test]
    fn test_invalid_datetimes() {
        for input in ["2016-09-18", "2016-09-18T25:00:00", "2016-02-30T10:00:00", "yesterday"] {
            assert!(parse_iso_datetime(input).is_err(), "{} should fail", input);
        }
    }

    #[test]
    fn test_datetime_offset_kept() {
        let value = parse_iso_datetime("2016-09-18T17:34:02+02:00").unwrap();
        assert_eq!(value.offset().unwrap().local_minus_utc(), 7_200);
        assert_eq!(format_iso_datetime(&value), "2016-09-18T17:34:02+02:00");

        let value = parse_iso_datetime("2016-09-18 17:34:02.124Z").unwrap();
        assert_eq!(format_iso_datetime(&value), "2016-09-18T17:34:02.124Z");
    }

    #[test]
    fn test_times() {
        assert!(parse_iso_time("17:34:02.124Z").is_ok());
        assert!(parse_iso_time("17:34:02").is_ok());
        for input in ["25:34:02.124Z", "000", "17:3", "18:99:00"] {
            assert!(parse_iso_time(input).is_err(), "{} should fail", input);
        }
    }

    #[test]
    fn test_leap_second() {
        let value = parse_iso_time("23:59:60").unwrap();
        assert_eq!(leap_aware_second(&value.local()), 60);
        assert_eq!(format_iso_time(&value), "23:59:60");
    }

    #[test]
    fn test_durations() {
        assert_eq!(parse_iso_duration("P1W").unwrap(), Duration::days(7));
        assert_eq!(parse_iso_duration("PT1H").unwrap(), Duration::hours(1));
        assert_eq!(
            parse_iso_duration("P1W4DT1H1M20.5S").unwrap(),
            Duration::days(11)
                + Duration::hours(1)
                + Duration::minutes(1)
                + Duration::milliseconds(20_500)
        );
        assert_eq!(parse_iso_duration("-PT30M").unwrap(), Duration::minutes(-30));
        for input in ["%%%", "@93004", "P", "PT", "P1Y", "P1M"] {
            assert!(parse_iso_duration(input).is_err(), "{} should fail", input);
        }
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_iso_duration(&Duration::zero()), "PT0S");
        assert_eq!(format_iso_duration(&Duration::days(7)), "P7D");
        assert_eq!(
            format_iso_duration(&(Duration::hours(1) + Duration::milliseconds(20_500))),
            "PT1H20.5S"
        );
        assert_eq!(format_iso_duration(&Duration::minutes(-30)), "-PT30M");
    }

    #[test]
    fn test_duration_round_trip() {
        let duration = parse_iso_duration("P1W4DT1H1M20.5S").unwrap();
        assert_eq!(
            parse_iso_duration(&format_iso_duration(&duration)).unwrap(),
            duration
        );
    }
}
