//! Time handling for Engram
//!
//! Timestamps are millisecond-precision UTC instants. Ranges are half-open
//! (`[start, end)`). Calendar helpers take an explicit "now" in any time zone
//! so callers that need reproducible results can pin the clock.

use crate::error::{Error, Result};
use chrono::{DateTime, Datelike, Duration, Local, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

const MILLIS_PER_DAY: f64 = 24.0 * 60.0 * 60.0 * 1000.0;

/// A point in time at which something happened or was recorded
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// The current moment
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Create from a DateTime in any zone
    pub fn from_datetime<Tz: TimeZone>(dt: DateTime<Tz>) -> Self {
        Self(dt.with_timezone(&Utc))
    }

    /// Create from milliseconds since Unix epoch, saturating at the
    /// representable bounds
    pub fn from_millis(millis: i64) -> Self {
        match DateTime::from_timestamp_millis(millis) {
            Some(dt) => Self(dt),
            None if millis < 0 => Self::min(),
            None => Self::max(),
        }
    }

    /// Get as DateTime
    pub fn as_datetime(&self) -> DateTime<Utc> {
        self.0
    }

    /// Get as milliseconds since Unix epoch
    pub fn as_millis(&self) -> i64 {
        self.0.timestamp_millis()
    }

    /// Earliest representable instant
    pub fn min() -> Self {
        Self(DateTime::<Utc>::MIN_UTC)
    }

    /// Latest representable instant
    pub fn max() -> Self {
        Self(DateTime::<Utc>::MAX_UTC)
    }

    /// Fractional days elapsed between `self` and `now` (zero if `self` is later)
    pub fn days_until(&self, now: Timestamp) -> f64 {
        let elapsed = now.as_millis().saturating_sub(self.as_millis());
        (elapsed.max(0) as f64) / MILLIS_PER_DAY
    }

    /// Whole days elapsed between `self` and `now`
    pub fn whole_days_until(&self, now: Timestamp) -> i64 {
        (now - *self).num_days().max(0)
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Self::now()
    }
}

impl std::ops::Sub for Timestamp {
    type Output = Duration;

    fn sub(self, rhs: Timestamp) -> Duration {
        self.0 - rhs.0
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d %H:%M:%S UTC"))
    }
}

/// Calendar-day bucket used by the date index
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DayKey(NaiveDate);

impl DayKey {
    /// The calendar day of `ts` in time zone `tz`
    pub fn of<Tz: TimeZone>(ts: Timestamp, tz: &Tz) -> Self {
        Self(ts.as_datetime().with_timezone(tz).date_naive())
    }

    /// The calendar day of `ts` in the local time zone
    pub fn local(ts: Timestamp) -> Self {
        Self::of(ts, &Local)
    }

    /// Get the underlying date
    pub fn date(&self) -> NaiveDate {
        self.0
    }
}

impl fmt::Display for DayKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

/// Half-open time interval `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: Timestamp,
    pub end: Timestamp,
}

impl TimeRange {
    /// Create a validated range; `start > end` is rejected
    pub fn new(start: Timestamp, end: Timestamp) -> Result<Self> {
        if start > end {
            return Err(Error::InvalidTemporalRange(format!(
                "start {} is after end {}",
                start, end
            )));
        }
        Ok(Self { start, end })
    }

    /// Create from optional bounds, treating a missing bound as open
    pub fn from_bounds(start: Option<Timestamp>, end: Option<Timestamp>) -> Result<Self> {
        Self::new(
            start.unwrap_or_else(Timestamp::min),
            end.unwrap_or_else(Timestamp::max),
        )
    }

    /// Everything from `start` on
    pub fn since(start: Timestamp) -> Self {
        Self {
            start,
            end: Timestamp::max(),
        }
    }

    /// Everything strictly before `end`
    pub fn before(end: Timestamp) -> Self {
        Self {
            start: Timestamp::min(),
            end,
        }
    }

    /// Unbounded range
    pub fn all() -> Self {
        Self {
            start: Timestamp::min(),
            end: Timestamp::max(),
        }
    }

    /// Check if a time is within this range
    pub fn contains(&self, time: Timestamp) -> bool {
        time >= self.start && time < self.end
    }

    /// True when no instant can fall inside the range
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// The calendar day containing `now`: midnight to the next midnight
    pub fn day_of<Tz: TimeZone>(now: &DateTime<Tz>) -> Self {
        let tz = now.timezone();
        let today = now.date_naive();
        let tomorrow = today.succ_opt().unwrap_or(today);
        Self {
            start: start_of_day(&tz, today),
            end: start_of_day(&tz, tomorrow),
        }
    }

    /// From Monday midnight of the week containing `now` up to `now`
    pub fn week_of<Tz: TimeZone>(now: &DateTime<Tz>) -> Self {
        let tz = now.timezone();
        let today = now.date_naive();
        let monday = today - Duration::days(today.weekday().num_days_from_monday() as i64);
        Self {
            start: start_of_day(&tz, monday),
            end: Timestamp::from_datetime(now.clone()),
        }
    }

    /// From midnight of the first day of the month containing `now` up to `now`
    pub fn month_of<Tz: TimeZone>(now: &DateTime<Tz>) -> Self {
        let tz = now.timezone();
        let today = now.date_naive();
        let first = NaiveDate::from_ymd_opt(today.year(), today.month(), 1).unwrap_or(today);
        Self {
            start: start_of_day(&tz, first),
            end: Timestamp::from_datetime(now.clone()),
        }
    }

    /// Today in the local calendar (wall-clock dependent)
    pub fn today() -> Self {
        Self::day_of(&Local::now())
    }

    /// This week so far in the local calendar (wall-clock dependent)
    pub fn this_week() -> Self {
        Self::week_of(&Local::now())
    }

    /// This month so far in the local calendar (wall-clock dependent)
    pub fn this_month() -> Self {
        Self::month_of(&Local::now())
    }
}

/// Midnight of `date` in `tz`; a midnight skipped by a DST jump falls back
/// to interpreting the wall time as UTC.
fn start_of_day<Tz: TimeZone>(tz: &Tz, date: NaiveDate) -> Timestamp {
    let midnight = date.and_time(chrono::NaiveTime::MIN);
    match tz.from_local_datetime(&midnight).earliest() {
        Some(dt) => Timestamp::from_datetime(dt),
        None => Timestamp::from(midnight.and_utc()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;

    #[test]
    fn test_timestamp_from_millis() {
        let millis = 1700000000000i64;
        let time = Timestamp::from_millis(millis);
        assert_eq!(time.as_millis(), millis);
        assert!(Timestamp::from_millis(3) < Timestamp::from_millis(5));
    }

    #[test]
    fn test_timestamp_saturates() {
        assert_eq!(Timestamp::from_millis(i64::MAX), Timestamp::max());
        assert_eq!(Timestamp::from_millis(i64::MIN), Timestamp::min());
    }

    #[test]
    fn test_days_until() {
        let start = Timestamp::from_millis(0);
        let later = Timestamp::from_millis(36 * 60 * 60 * 1000);
        assert!((start.days_until(later) - 1.5).abs() < 1e-9);
        assert_eq!(start.whole_days_until(later), 1);
        assert_eq!(later.whole_days_until(start), 0);
        assert_eq!(later.days_until(start), 0.0);
    }

    #[test]
    fn test_range_is_half_open() {
        let range = TimeRange::new(Timestamp::from_millis(10), Timestamp::from_millis(20)).unwrap();
        assert!(range.contains(Timestamp::from_millis(10)));
        assert!(range.contains(Timestamp::from_millis(19)));
        assert!(!range.contains(Timestamp::from_millis(20)));
        assert!(!range.contains(Timestamp::from_millis(9)));
    }

    #[test]
    fn test_range_rejects_inverted_bounds() {
        let err = TimeRange::new(Timestamp::from_millis(20), Timestamp::from_millis(10)).unwrap_err();
        assert!(err.is_invalid_argument());

        let empty = TimeRange::new(Timestamp::from_millis(10), Timestamp::from_millis(10)).unwrap();
        assert!(empty.is_empty());
    }

    #[test]
    fn test_calendar_ranges_with_pinned_clock() {
        let tz = FixedOffset::east_opt(8 * 3600).unwrap();
        // Wednesday 2025-03-12 15:30 at UTC+8
        let now = tz.with_ymd_and_hms(2025, 3, 12, 15, 30, 0).unwrap();

        let day = TimeRange::day_of(&now);
        let expected_day_start = tz.with_ymd_and_hms(2025, 3, 12, 0, 0, 0).unwrap();
        let expected_day_end = tz.with_ymd_and_hms(2025, 3, 13, 0, 0, 0).unwrap();
        assert_eq!(day.start, Timestamp::from_datetime(expected_day_start));
        assert_eq!(day.end, Timestamp::from_datetime(expected_day_end));

        let week = TimeRange::week_of(&now);
        let monday = tz.with_ymd_and_hms(2025, 3, 10, 0, 0, 0).unwrap();
        assert_eq!(week.start, Timestamp::from_datetime(monday));
        assert_eq!(week.end, Timestamp::from_datetime(now));

        let month = TimeRange::month_of(&now);
        let first = tz.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap();
        assert_eq!(month.start, Timestamp::from_datetime(first));
    }

    #[test]
    fn test_day_key_depends_on_zone() {
        // 2025-03-12 20:00 UTC is already 2025-03-13 at UTC+8
        let ts = Timestamp::from_datetime(Utc.with_ymd_and_hms(2025, 3, 12, 20, 0, 0).unwrap());
        let utc_day = DayKey::of(ts, &Utc);
        let east_day = DayKey::of(ts, &FixedOffset::east_opt(8 * 3600).unwrap());

        assert_eq!(utc_day.to_string(), "2025-03-12");
        assert_eq!(east_day.to_string(), "2025-03-13");
        assert!(utc_day < east_day);
    }
}
