use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Wall-clock milliseconds since the UNIX epoch.
///
/// Serialized as a bare number so rows stay readable by any client.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(u64);

impl Timestamp {
    pub const fn from_millis(ms: u64) -> Self {
        Self(ms)
    }

    pub fn now() -> Self {
        let ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;
        Self(ms)
    }

    /// The zero timestamp. Rows that predate timestamps parse to this.
    pub const fn zero() -> Self {
        Self(0)
    }

    pub fn as_millis(&self) -> u64 {
        self.0
    }

    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.0 as i64)
    }

    /// Calendar day (UTC) this timestamp falls on.
    pub fn utc_day(&self) -> Option<NaiveDate> {
        self.to_datetime().map(|dt| dt.date_naive())
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timestamp({}ms)", self.0)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_datetime() {
            Some(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S UTC")),
            None => write!(f, "{}ms", self.0),
        }
    }
}

/// Issues strictly increasing timestamps for one session.
///
/// Fold-by-latest compares timestamps, so two writes made by the same
/// session in the same millisecond must still order correctly. Each call to
/// [`Clock::now`] returns `max(wall clock, last + 1)`.
#[derive(Debug, Default)]
pub struct Clock {
    last: AtomicU64,
}

impl Clock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> Timestamp {
        let wall = Timestamp::now().as_millis();
        let mut prev = self.last.load(Ordering::Relaxed);
        loop {
            let next = wall.max(prev + 1);
            match self
                .last
                .compare_exchange_weak(prev, next, Ordering::AcqRel, Ordering::Relaxed)
            {
                Ok(_) => return Timestamp(next),
                Err(actual) => prev = actual,
            }
        }
    }

    /// Ensure later calls return something after `seen`.
    pub fn observe(&self, seen: Timestamp) {
        self.last.fetch_max(seen.as_millis(), Ordering::AcqRel);
    }
}
