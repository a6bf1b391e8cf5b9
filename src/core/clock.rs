//! Wall-clock capability injected into every service.
//!
//! Rate-lock expiry and LC expiry are evaluated by comparing stored
//! timestamps against [`Clock::now`] at read time. Tests drive time with
//! [`ManualClock`].

use crate::core::error::{Result, SettlementError};
use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use std::fmt::Debug;

pub trait Clock: Send + Sync + Debug {
    fn now(&self) -> DateTime<Utc>;
}

/// Reads the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
///
/// # Examples
///
/// ```
/// use chrono::{Duration, Utc};
/// use trade_settlement::core::clock::{Clock, ManualClock};
///
/// let start = Utc::now();
/// let clock = ManualClock::new(start);
/// clock.advance(Duration::minutes(31));
/// assert_eq!(clock.now(), start + Duration::minutes(31));
/// ```
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock();
        *now += by;
    }

    pub fn set(&self, to: DateTime<Utc>) {
        *self.now.lock() = to;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

/// `at` plus `minutes`, or `Validation` when either the span or the
/// resulting instant is outside chrono's range.
pub fn after_minutes(at: DateTime<Utc>, minutes: i64) -> Result<DateTime<Utc>> {
    shift(at, Duration::try_minutes(minutes), minutes, "minutes")
}

pub fn after_hours(at: DateTime<Utc>, hours: i64) -> Result<DateTime<Utc>> {
    shift(at, Duration::try_hours(hours), hours, "hours")
}

pub fn after_days(at: DateTime<Utc>, days: i64) -> Result<DateTime<Utc>> {
    shift(at, Duration::try_days(days), days, "days")
}

fn shift(
    at: DateTime<Utc>,
    span: Option<Duration>,
    count: i64,
    unit: &str,
) -> Result<DateTime<Utc>> {
    span.and_then(|span| at.checked_add_signed(span))
        .ok_or_else(|| SettlementError::validation(format!("{} {} is out of range", count, unit)))
}
