use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::CareError;

/// Fresh primary key (UUIDv7, time-sortable for easier log correlation).
pub fn new_id() -> String {
    Uuid::now_v7().to_string()
}

/// Lifecycle of a caregiver visit.
///
/// Variant order is the display priority used when listing schedules, so the
/// derived `Ord` sorts in-progress visits first and cancelled ones last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleStatus {
    InProgress,
    Scheduled,
    Missed,
    Completed,
    Cancelled,
}

impl ScheduleStatus {
    pub const ALL: [ScheduleStatus; 5] = [
        ScheduleStatus::InProgress,
        ScheduleStatus::Scheduled,
        ScheduleStatus::Missed,
        ScheduleStatus::Completed,
        ScheduleStatus::Cancelled,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ScheduleStatus::InProgress => "in_progress",
            ScheduleStatus::Scheduled => "scheduled",
            ScheduleStatus::Missed => "missed",
            ScheduleStatus::Completed => "completed",
            ScheduleStatus::Cancelled => "cancelled",
        }
    }

    /// Position in the listing order (0 = shown first).
    pub fn display_rank(self) -> u8 {
        self as u8
    }

    /// A visit can be clocked into when it is still planned, or was missed
    /// and the caregiver shows up late.
    pub fn can_start(self) -> bool {
        matches!(self, ScheduleStatus::Scheduled | ScheduleStatus::Missed)
    }

    pub fn can_end(self) -> bool {
        self == ScheduleStatus::InProgress
    }
}

impl fmt::Display for ScheduleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScheduleStatus {
    type Err = CareError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "in_progress" => Ok(ScheduleStatus::InProgress),
            "scheduled" => Ok(ScheduleStatus::Scheduled),
            "missed" => Ok(ScheduleStatus::Missed),
            "completed" => Ok(ScheduleStatus::Completed),
            "cancelled" => Ok(ScheduleStatus::Cancelled),
            other => Err(CareError::validation(format!(
                "unknown schedule status: {other}"
            ))),
        }
    }
}

/// Completion state of a single care activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Completed,
    NotCompleted,
}

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Completed => "completed",
            TaskStatus::NotCompleted => "not_completed",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = CareError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TaskStatus::Pending),
            "completed" => Ok(TaskStatus::Completed),
            "not_completed" => Ok(TaskStatus::NotCompleted),
            other => Err(CareError::validation(format!("unknown task status: {other}"))),
        }
    }
}

/// Kind of shift attendance event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogType {
    ClockIn,
    ClockOut,
}

impl LogType {
    pub fn as_str(self) -> &'static str {
        match self {
            LogType::ClockIn => "clock_in",
            LogType::ClockOut => "clock_out",
        }
    }
}

impl fmt::Display for LogType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogType {
    type Err = CareError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "clock_in" => Ok(LogType::ClockIn),
            "clock_out" => Ok(LogType::ClockOut),
            other => Err(CareError::validation(format!("unknown log type: {other}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// A recorded clock-in or clock-out on a visit: when and where.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClockMark {
    pub at: DateTime<Utc>,
    pub point: GeoPoint,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caregiver {
    pub id: String,
    pub name: String,
    pub email: String,
}

/// Care recipient snapshot attached to a schedule.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Client {
    pub id: String,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub postal: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// A care activity belonging to exactly one schedule.
///
/// `not_completed_reason` is `Some` exactly when `status` is `NotCompleted`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub schedule_id: String,
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    pub not_completed_reason: Option<String>,
    pub sort_order: i32,
    pub updated_at: DateTime<Utc>,
}

/// Caller-supplied task payload. `schedule_id` and `status` are overwritten
/// by the task engine before anything is stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskDraft {
    #[serde(default)]
    pub schedule_id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_task_status")]
    pub status: TaskStatus,
    #[serde(default)]
    pub sort_order: i32,
}

fn default_task_status() -> TaskStatus {
    TaskStatus::Pending
}

impl TaskDraft {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            schedule_id: String::new(),
            title: title.into(),
            description: String::new(),
            status: TaskStatus::Pending,
            sort_order: 0,
        }
    }
}

/// One planned caregiver visit with its client snapshot and task list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    pub id: String,
    pub caregiver_id: String,
    pub client: Client,
    pub service_name: String,
    pub location_label: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: ScheduleStatus,
    pub clock_in: Option<ClockMark>,
    pub clock_out: Option<ClockMark>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Ordered by sort order, then creation order.
    pub tasks: Vec<Task>,
}

impl Schedule {
    /// Planned visit length in whole minutes.
    pub fn duration_mins(&self) -> i64 {
        (self.end_time - self.start_time).num_minutes()
    }

    pub fn summary(&self) -> ScheduleSummary {
        ScheduleSummary {
            id: self.id.clone(),
            caregiver_id: self.caregiver_id.clone(),
            client_name: self.client.full_name.clone(),
            service_name: self.service_name.clone(),
            start_time: self.start_time,
            end_time: self.end_time,
            status: self.status,
            location_name: self.location_label.clone(),
        }
    }
}

/// Lightweight projection used by list endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleSummary {
    pub id: String,
    pub caregiver_id: String,
    pub client_name: String,
    pub service_name: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: ScheduleStatus,
    pub location_name: String,
}

/// Per-status counts of a caregiver's visits on one day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleMetrics {
    pub total: u32,
    pub missed: u32,
    /// Visits still in `scheduled`.
    pub upcoming: u32,
    pub completed: u32,
    pub in_progress: u32,
    pub cancelled: u32,
}

impl ScheduleMetrics {
    pub fn record(&mut self, status: ScheduleStatus) {
        self.add(status, 1);
    }

    pub fn add(&mut self, status: ScheduleStatus, count: u32) {
        self.total += count;
        let slot = match status {
            ScheduleStatus::Scheduled => &mut self.upcoming,
            ScheduleStatus::InProgress => &mut self.in_progress,
            ScheduleStatus::Completed => &mut self.completed,
            ScheduleStatus::Cancelled => &mut self.cancelled,
            ScheduleStatus::Missed => &mut self.missed,
        };
        *slot += count;
    }
}

/// Input for a visit clock action. Never stored as-is: it is mapped onto the
/// schedule's clock-in/out fields. A caller-supplied `at` is ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisitEvent {
    pub point: GeoPoint,
    #[serde(default)]
    pub at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl VisitEvent {
    pub fn at(latitude: f64, longitude: f64) -> Self {
        Self {
            point: GeoPoint::new(latitude, longitude),
            at: None,
            notes: None,
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

/// One shift attendance event. Append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaregiverLog {
    pub id: String,
    pub caregiver_id: String,
    pub log_type: LogType,
    pub point: GeoPoint,
    pub timestamp: DateTime<Utc>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaregiverLogSummary {
    pub id: String,
    pub caregiver_id: String,
    pub log_type: LogType,
    pub timestamp: DateTime<Utc>,
}

impl From<&CaregiverLog> for CaregiverLogSummary {
    fn from(log: &CaregiverLog) -> Self {
        Self {
            id: log.id.clone(),
            caregiver_id: log.caregiver_id.clone(),
            log_type: log.log_type,
            timestamp: log.timestamp,
        }
    }
}

/// OAuth2-style client credential bound to one caregiver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthClient {
    pub id: String,
    /// Either an argon2 PHC string or a hex SHA-256 digest.
    pub secret_hash: String,
    pub description: String,
    pub caregiver_id: String,
    pub scopes: Vec<String>,
}

/// HTTP request audit record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestLog {
    pub method: String,
    pub path: String,
    pub query: String,
    pub status: u16,
    pub latency_ms: u64,
    pub ip: String,
    pub user_agent: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_order_matches_display_priority() {
        let mut statuses = vec![
            ScheduleStatus::Cancelled,
            ScheduleStatus::Completed,
            ScheduleStatus::Scheduled,
            ScheduleStatus::Missed,
            ScheduleStatus::InProgress,
        ];
        statuses.sort();
        assert_eq!(statuses, ScheduleStatus::ALL.to_vec());
        assert_eq!(ScheduleStatus::InProgress.display_rank(), 0);
        assert_eq!(ScheduleStatus::Cancelled.display_rank(), 4);
    }

    #[test]
    fn unknown_status_is_a_validation_failure() {
        let err = "done".parse::<ScheduleStatus>().unwrap_err();
        assert!(matches!(err, CareError::Validation(_)));
        assert!("paused".parse::<TaskStatus>().is_err());
        assert!("lunch".parse::<LogType>().is_err());
    }

    #[test]
    fn status_strings_survive_parse() {
        for status in ScheduleStatus::ALL {
            assert_eq!(status.as_str().parse::<ScheduleStatus>().unwrap(), status);
        }
        assert_eq!(
            serde_json::to_string(&TaskStatus::NotCompleted).unwrap(),
            "\"not_completed\""
        );
    }

    #[test]
    fn only_planned_or_missed_visits_can_start() {
        assert!(ScheduleStatus::Scheduled.can_start());
        assert!(ScheduleStatus::Missed.can_start());
        assert!(!ScheduleStatus::InProgress.can_start());
        assert!(!ScheduleStatus::Completed.can_start());
        assert!(!ScheduleStatus::Cancelled.can_start());
        assert!(ScheduleStatus::InProgress.can_end());
        assert!(!ScheduleStatus::Scheduled.can_end());
    }

    #[test]
    fn metrics_record_counts_upcoming_as_scheduled() {
        let mut m = ScheduleMetrics::default();
        m.record(ScheduleStatus::Scheduled);
        m.record(ScheduleStatus::Scheduled);
        m.record(ScheduleStatus::Missed);
        assert_eq!(m.total, 3);
        assert_eq!(m.upcoming, 2);
        assert_eq!(m.missed, 1);
        assert_eq!(m.completed, 0);
    }
}
