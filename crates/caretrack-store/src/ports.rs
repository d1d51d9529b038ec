//! Storage capabilities the visit services depend on.
//!
//! Every port has a SQLite implementation ([`crate::SqliteStore`]) and an
//! in-memory one ([`crate::MemoryStore`]) with the same ordering, filtering
//! and uniqueness behaviour.

use async_trait::async_trait;
use caretrack_core::clock::DayWindow;
use caretrack_core::types::{
    AuthClient, Caregiver, CaregiverLog, CaregiverLogSummary, ClockMark, LogType, RequestLog,
    Schedule, ScheduleMetrics, ScheduleStatus, Task, TaskDraft, TaskStatus,
};
use caretrack_core::Result;
use chrono::{DateTime, NaiveDate, Utc};

/// Filter for listing one caregiver's schedules.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScheduleQuery {
    /// OR-matched. Empty means every status.
    pub statuses: Vec<ScheduleStatus>,
    /// Only visits whose planned start falls inside this window.
    pub day: Option<DayWindow>,
    /// 0 disables pagination (offset is then ignored too).
    pub limit: u32,
    pub offset: u32,
}

/// Filter for attendance history. Bounds are `[start, end)`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogQuery {
    pub log_type: Option<LogType>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub limit: u32,
    pub offset: u32,
}

#[async_trait]
pub trait ScheduleStore: Send + Sync {
    /// Ordered by status display priority, then planned start descending.
    /// Returned schedules carry no tasks.
    async fn list(&self, caregiver_id: &str, query: &ScheduleQuery) -> Result<Vec<Schedule>>;

    async fn get(&self, id: &str) -> Result<Schedule>;

    /// `NotFound` when the schedule is missing or owned by someone else.
    async fn get_for_caregiver(&self, id: &str, caregiver_id: &str) -> Result<Schedule>;

    async fn update_clock_in(&self, id: &str, mark: ClockMark) -> Result<()>;

    /// `notes = None` keeps whatever notes are already stored.
    async fn update_clock_out(&self, id: &str, mark: ClockMark, notes: Option<&str>)
        -> Result<()>;

    async fn update_status(
        &self,
        id: &str,
        status: ScheduleStatus,
        at: DateTime<Utc>,
    ) -> Result<()>;

    async fn metrics(&self, caregiver_id: &str, day: DayWindow) -> Result<ScheduleMetrics>;
}

#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Ordered by sort order, then creation order.
    async fn list_by_schedule(&self, schedule_id: &str) -> Result<Vec<Task>>;

    async fn update_status(
        &self,
        task_id: &str,
        status: TaskStatus,
        reason: Option<&str>,
        at: DateTime<Utc>,
    ) -> Result<()>;

    /// Inserts the draft as-is and returns the new task id.
    async fn create(&self, draft: &TaskDraft, at: DateTime<Utc>) -> Result<String>;
}

#[async_trait]
pub trait AttendanceStore: Send + Sync {
    /// Append a log. `day` is the caregiver's local calendar day; a second
    /// log of the same type on the same day is a `Validation` failure.
    async fn create(&self, log: &CaregiverLog, day: NaiveDate) -> Result<()>;

    /// Logs inside `window`, oldest first.
    async fn list_in(&self, caregiver_id: &str, window: DayWindow) -> Result<Vec<CaregiverLog>>;

    /// Newest first.
    async fn list(&self, caregiver_id: &str, query: &LogQuery)
        -> Result<Vec<CaregiverLogSummary>>;

    async fn exists(&self, caregiver_id: &str, log_type: LogType, window: DayWindow)
        -> Result<bool>;

    async fn has_clocked_in(&self, caregiver_id: &str, window: DayWindow) -> Result<bool> {
        self.exists(caregiver_id, LogType::ClockIn, window).await
    }

    async fn has_clocked_out(&self, caregiver_id: &str, window: DayWindow) -> Result<bool> {
        self.exists(caregiver_id, LogType::ClockOut, window).await
    }
}

#[async_trait]
pub trait CaregiverStore: Send + Sync {
    async fn get(&self, id: &str) -> Result<Caregiver>;
}

#[async_trait]
pub trait AuthClientStore: Send + Sync {
    async fn find(&self, client_id: &str) -> Result<Option<AuthClient>>;
}

#[async_trait]
pub trait RequestLogStore: Send + Sync {
    async fn record(&self, log: &RequestLog, at: DateTime<Utc>) -> Result<()>;
}
