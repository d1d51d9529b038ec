use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, Offset, Utc};
use serde::Serialize;
use std::sync::{Arc, Mutex};

use crate::error::{CareError, Result};

/// Source of "now". Services never read the wall clock directly.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Settable clock for tests and reproducible runs.
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = now;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Half-open `[start, end)` span of one local calendar day, as UTC instants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DayWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DayWindow {
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        at >= self.start && at < self.end
    }
}

/// Clock plus the server's UTC offset: answers "what is today".
#[derive(Clone)]
pub struct Calendar {
    clock: Arc<dyn Clock>,
    offset: FixedOffset,
}

impl Calendar {
    pub fn new(clock: Arc<dyn Clock>, offset: FixedOffset) -> Self {
        Self { clock, offset }
    }

    pub fn utc(clock: Arc<dyn Clock>) -> Self {
        Self::new(clock, Utc.fix())
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// Local date of the current instant. Reads the clock on every call.
    pub fn today_date(&self) -> NaiveDate {
        self.clock.now().with_timezone(&self.offset).date_naive()
    }

    /// Window for the current local day. Reads the clock on every call.
    pub fn today(&self) -> Result<DayWindow> {
        self.day(self.today_date())
    }

    /// Fails with Validation when the window falls outside the representable range.
    pub fn day(&self, date: NaiveDate) -> Result<DayWindow> {
        let start = self.midnight(date)?;
        let end = start
            .checked_add_signed(Duration::days(1))
            .ok_or_else(|| out_of_range(date))?;
        Ok(DayWindow { start, end })
    }

    /// UTC instant of local midnight starting `date`.
    pub fn midnight(&self, date: NaiveDate) -> Result<DateTime<Utc>> {
        let local = date.and_time(NaiveTime::MIN);
        local
            .checked_sub_signed(Duration::seconds(i64::from(self.offset.local_minus_utc())))
            .map(|t| t.and_utc())
            .ok_or_else(|| out_of_range(date))
    }
}

fn out_of_range(date: NaiveDate) -> CareError {
    CareError::validation(format!("date out of range: {date}"))
}

impl std::fmt::Debug for Calendar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Calendar")
            .field("offset", &self.offset)
            .finish_non_exhaustive()
    }
}
