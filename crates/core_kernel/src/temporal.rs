//! Time handling for loan schedules and ledgers
//!
//! This module provides:
//! - `DurationUnit` calendar arithmetic for loan terms
//! - whole-day differences used for lateness and interest accrual
//! - a business `Timezone` used to bucket ledger entries by month
//! - a `Clock` abstraction so services can be driven by a controllable time source

use chrono::{DateTime, Datelike, Days, Months, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::str::FromStr;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use thiserror::Error;

/// Errors related to temporal operations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemporalError {
    #[error("Invalid period: start {start} must not be after end {end}")]
    InvalidPeriod {
        start: String,
        end: String,
    },

    #[error("Invalid duration: {0}")]
    InvalidDuration(String),

    #[error("Date out of supported range")]
    OutOfRange,

    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),
}

/// Unit in which a loan duration is expressed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DurationUnit {
    #[default]
    Days,
    Weeks,
    Months,
}

impl DurationUnit {
    /// Adds `count` units to `start`
    ///
    /// Months are calendar months; the day is clamped to the end of shorter
    /// months (Jan 31 + 1 month = Feb 28/29).
    pub fn add_to(&self, start: DateTime<Utc>, count: u32) -> Result<DateTime<Utc>, TemporalError> {
        let result = match self {
            DurationUnit::Days => start.checked_add_days(Days::new(u64::from(count))),
            DurationUnit::Weeks => start.checked_add_days(Days::new(u64::from(count) * 7)),
            DurationUnit::Months => start.checked_add_months(Months::new(count)),
        };
        result.ok_or(TemporalError::OutOfRange)
    }
}

impl std::fmt::Display for DurationUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DurationUnit::Days => write!(f, "days"),
            DurationUnit::Weeks => write!(f, "weeks"),
            DurationUnit::Months => write!(f, "months"),
        }
    }
}

/// Number of complete 24h periods from `from` to `to`, floored
///
/// Negative when `to` precedes `from`.
pub fn whole_days_between(from: DateTime<Utc>, to: DateTime<Utc>) -> i64 {
    let millis = (to - from).num_milliseconds();
    millis.div_euclid(86_400_000)
}

/// Timezone wrapper for the business calendar
///
/// Wraps chrono_tz::Tz with custom serialization support.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timezone(pub Tz);

impl Serialize for Timezone {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.0.name())
    }
}

impl<'de> Deserialize<'de> for Timezone {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

impl FromStr for Timezone {
    type Err = TemporalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Tz::from_str(s)
            .map(Timezone)
            .map_err(|_| TemporalError::InvalidTimezone(s.to_string()))
    }
}

impl Timezone {
    pub fn new(tz: Tz) -> Self {
        Self(tz)
    }

    /// Converts a UTC datetime to the local timezone
    pub fn to_local(&self, utc: DateTime<Utc>) -> DateTime<Tz> {
        utc.with_timezone(&self.0)
    }

    /// Calendar date of `utc` in this timezone
    pub fn local_date(&self, utc: DateTime<Utc>) -> NaiveDate {
        self.to_local(utc).date_naive()
    }

    /// Month bucket key in the form `YYYY-MM`
    pub fn month_key(&self, utc: DateTime<Utc>) -> String {
        let local = self.to_local(utc);
        format!("{:04}-{:02}", local.year(), local.month())
    }

    /// Gets the start of day (00:00:00) in this timezone as UTC
    pub fn start_of_day(&self, date: NaiveDate) -> Result<DateTime<Utc>, TemporalError> {
        date.and_hms_opt(0, 0, 0)
            .and_then(|naive| naive.and_local_timezone(self.0).earliest())
            .map(|local| local.with_timezone(&Utc))
            .ok_or(TemporalError::OutOfRange)
    }
}

impl Default for Timezone {
    fn default() -> Self {
        Self(chrono_tz::Africa::Nairobi)
    }
}

/// Inclusive timestamp range used for ledger and statistics filters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TimeRange {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl TimeRange {
    pub fn new(from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>) -> Result<Self, TemporalError> {
        if let (Some(start), Some(end)) = (from, to) {
            if start > end {
                return Err(TemporalError::InvalidPeriod {
                    start: start.to_string(),
                    end: end.to_string(),
                });
            }
        }
        Ok(Self { from, to })
    }

    /// Unbounded on both sides
    pub fn all() -> Self {
        Self::default()
    }

    pub fn contains(&self, timestamp: DateTime<Utc>) -> bool {
        self.from.map_or(true, |f| timestamp >= f) && self.to.map_or(true, |t| timestamp <= t)
    }
}

/// Source of the current time
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub type SharedClock = Arc<dyn Clock>;

/// Wall-clock time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually controlled clock for tests and replays
#[derive(Debug)]
pub struct FixedClock {
    millis: AtomicI64,
}

impl FixedClock {
    pub fn new(at: DateTime<Utc>) -> Self {
        Self {
            millis: AtomicI64::new(at.timestamp_millis()),
        }
    }

    pub fn set(&self, at: DateTime<Utc>) {
        self.millis.store(at.timestamp_millis(), Ordering::SeqCst);
    }

    /// Moves the clock forward by whole days
    pub fn advance_days(&self, days: i64) {
        self.millis.fetch_add(days * 86_400_000, Ordering::SeqCst);
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp_millis(self.millis.load(Ordering::SeqCst))
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_duration_units() {
        let start = Utc.with_ymd_and_hms(2024, 1, 31, 9, 0, 0).unwrap();

        assert_eq!(
            DurationUnit::Days.add_to(start, 30).unwrap(),
            Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
        );
        assert_eq!(
            DurationUnit::Weeks.add_to(start, 2).unwrap(),
            Utc.with_ymd_and_hms(2024, 2, 14, 9, 0, 0).unwrap()
        );
        assert_eq!(
            DurationUnit::Months.add_to(start, 1).unwrap(),
            Utc.with_ymd_and_hms(2024, 2, 29, 9, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_whole_days_between_floors() {
        let due = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();

        assert_eq!(whole_days_between(due, due + chrono::Duration::hours(23)), 0);
        assert_eq!(whole_days_between(due, due + chrono::Duration::hours(240)), 10);
        assert_eq!(whole_days_between(due, due - chrono::Duration::hours(1)), -1);
    }

    #[test]
    fn test_month_key_uses_business_timezone() {
        let tz = Timezone::default();
        // 22:30 UTC on Jan 31 is already Feb 1 in Nairobi (UTC+3)
        let ts = Utc.with_ymd_and_hms(2024, 1, 31, 22, 30, 0).unwrap();
        assert_eq!(tz.month_key(ts), "2024-02");
        assert_eq!(Timezone::new(chrono_tz::UTC).month_key(ts), "2024-01");
    }

    #[test]
    fn test_time_range() {
        let a = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let b = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();

        assert!(TimeRange::new(Some(b), Some(a)).is_err());
        let range = TimeRange::new(Some(a), Some(b)).unwrap();
        assert!(range.contains(a));
        assert!(range.contains(b));
        assert!(!range.contains(b + chrono::Duration::seconds(1)));
        assert!(TimeRange::all().contains(b));
    }

    #[test]
    fn test_fixed_clock_advances() {
        let start = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
        let clock = FixedClock::new(start);
        clock.advance_days(3);
        assert_eq!(clock.now(), start + chrono::Duration::days(3));
    }
}
