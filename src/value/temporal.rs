//! Date-time and time values that remember their UTC offset

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, Duration, FixedOffset, NaiveDateTime, NaiveTime, Offset, TimeZone, Timelike};

use crate::validators::temporal::{format_iso_datetime, format_iso_time};

/// An ISO-8601 date-time, naive or carrying a fixed UTC offset.
///
/// The offset is kept as parsed so a serialised value reads back identical.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IsoDateTime {
    local: NaiveDateTime,
    offset: Option<FixedOffset>,
}

impl IsoDateTime {
    /// A date-time without offset information
    pub fn naive(local: NaiveDateTime) -> Self {
        Self {
            local,
            offset: None,
        }
    }

    /// A date-time at the given offset from UTC
    pub fn with_offset(local: NaiveDateTime, offset: FixedOffset) -> Self {
        Self {
            local,
            offset: Some(offset),
        }
    }

    pub fn local(&self) -> NaiveDateTime {
        self.local
    }

    pub fn offset(&self) -> Option<FixedOffset> {
        self.offset
    }

    /// Converts to an offset-aware chrono value; `None` for naive values
    pub fn to_datetime(&self) -> Option<DateTime<FixedOffset>> {
        self.offset
            .and_then(|offset| offset.from_local_datetime(&self.local).single())
    }

    /// Orders two values by instant when both carry offsets, by wall clock
    /// otherwise
    pub fn compare(&self, other: &Self) -> Ordering {
        match (self.offset, other.offset) {
            (Some(_), Some(_)) => self.instant().cmp(&other.instant()),
            _ => self.local.cmp(&other.local),
        }
    }

    fn instant(&self) -> NaiveDateTime {
        match self.offset {
            Some(offset) => self.local - Duration::seconds(i64::from(offset.local_minus_utc())),
            None => self.local,
        }
    }
}

impl From<NaiveDateTime> for IsoDateTime {
    fn from(local: NaiveDateTime) -> Self {
        Self::naive(local)
    }
}

impl<Tz: TimeZone> From<DateTime<Tz>> for IsoDateTime {
    fn from(value: DateTime<Tz>) -> Self {
        Self::with_offset(value.naive_local(), value.offset().fix())
    }
}

impl fmt::Display for IsoDateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_iso_datetime(self))
    }
}

/// An ISO-8601 time of day with an optional UTC offset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IsoTime {
    local: NaiveTime,
    offset: Option<FixedOffset>,
}

impl IsoTime {
    pub fn naive(local: NaiveTime) -> Self {
        Self {
            local,
            offset: None,
        }
    }

    pub fn with_offset(local: NaiveTime, offset: FixedOffset) -> Self {
        Self {
            local,
            offset: Some(offset),
        }
    }

    pub fn local(&self) -> NaiveTime {
        self.local
    }

    pub fn offset(&self) -> Option<FixedOffset> {
        self.offset
    }

    /// Orders by UTC time of day when both carry offsets, by wall clock
    /// otherwise
    pub fn compare(&self, other: &Self) -> Ordering {
        match (self.offset, other.offset) {
            (Some(_), Some(_)) => self.utc_nanos().cmp(&other.utc_nanos()),
            _ => self.local.cmp(&other.local),
        }
    }

    fn utc_nanos(&self) -> i64 {
        let shift = self.offset.map_or(0, |o| i64::from(o.local_minus_utc()));
        let seconds = i64::from(self.local.num_seconds_from_midnight()) - shift;
        seconds * 1_000_000_000 + i64::from(self.local.nanosecond())
    }
}

impl From<NaiveTime> for IsoTime {
    fn from(local: NaiveTime) -> Self {
        Self::naive(local)
    }
}

impl fmt::Display for IsoTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_iso_time(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2016, 9, 18)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[test]
    fn test_compare_by_instant_when_offsets_present() {
        let berlin = IsoDateTime::with_offset(at(17, 0), FixedOffset::east_opt(2 * 3600).unwrap());
        let utc = IsoDateTime::with_offset(at(15, 30), FixedOffset::east_opt(0).unwrap());

        assert_eq!(berlin.compare(&utc), Ordering::Less);
        assert_ne!(berlin, utc);
    }

    #[test]
    fn test_compare_by_wall_clock_for_naive() {
        let naive = IsoDateTime::naive(at(17, 0));
        let aware = IsoDateTime::with_offset(at(15, 30), FixedOffset::east_opt(0).unwrap());
        assert_eq!(naive.compare(&aware), Ordering::Greater);
    }

    #[test]
    fn test_from_chrono_utc() {
        let now = Utc::now();
        let value = IsoDateTime::from(now);
        assert_eq!(value.offset().map(|o| o.local_minus_utc()), Some(0));
        assert_eq!(value.to_datetime().unwrap(), now);
    }

    #[test]
    fn test_time_compare_with_offsets() {
        let a = IsoTime::with_offset(
            NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            FixedOffset::east_opt(3600).unwrap(),
        );
        let b = IsoTime::with_offset(
            NaiveTime::from_hms_opt(9, 30, 0).unwrap(),
            FixedOffset::east_opt(0).unwrap(),
        );
        assert_eq!(a.compare(&b), Ordering::Less);
    }
}
