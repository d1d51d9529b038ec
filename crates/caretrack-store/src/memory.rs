//! In-memory implementation of every storage port.
//!
//! Same ordering, filtering and uniqueness rules as [`crate::SqliteStore`];
//! used by service and HTTP tests.

use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use caretrack_core::clock::DayWindow;
use caretrack_core::types::{
    new_id, AuthClient, Caregiver, CaregiverLog, CaregiverLogSummary, ClockMark, LogType,
    RequestLog, Schedule, ScheduleMetrics, ScheduleStatus, Task, TaskDraft, TaskStatus,
};
use caretrack_core::{CareError, Result};
use chrono::{DateTime, NaiveDate, Utc};

use crate::error::StoreError;
use crate::ports::{
    AttendanceStore, AuthClientStore, CaregiverStore, LogQuery, RequestLogStore, ScheduleQuery,
    ScheduleStore, TaskStore,
};

#[derive(Default)]
struct MemoryState {
    caregivers: Vec<Caregiver>,
    auth_clients: Vec<AuthClient>,
    schedules: Vec<Schedule>,
    /// Insertion order is creation order.
    tasks: Vec<Task>,
    logs: Vec<(CaregiverLog, NaiveDate)>,
    requests: Vec<(RequestLog, DateTime<Utc>)>,
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::result::Result<MutexGuard<'_, MemoryState>, StoreError> {
        self.state.lock().map_err(|_| StoreError::LockPoisoned)
    }

    pub fn insert_caregiver(&self, caregiver: Caregiver) -> Result<()> {
        self.lock()?.caregivers.push(caregiver);
        Ok(())
    }

    pub fn insert_auth_client(&self, client: AuthClient) -> Result<()> {
        self.lock()?.auth_clients.push(client);
        Ok(())
    }

    /// Store the schedule row; any tasks on it are stored as task rows.
    pub fn insert_schedule(&self, mut schedule: Schedule) -> Result<()> {
        let mut state = self.lock()?;
        let tasks = std::mem::take(&mut schedule.tasks);
        state.schedules.push(schedule);
        state.tasks.extend(tasks);
        Ok(())
    }

    pub fn insert_task(&self, task: Task) -> Result<()> {
        self.lock()?.tasks.push(task);
        Ok(())
    }

    /// Every persisted request log, oldest first.
    pub fn request_logs(&self) -> Result<Vec<RequestLog>> {
        Ok(self.lock()?.requests.iter().map(|(log, _)| log.clone()).collect())
    }
}

fn page<T>(items: Vec<T>, limit: u32, offset: u32) -> Vec<T> {
    if limit == 0 {
        return items;
    }
    items
        .into_iter()
        .skip(offset as usize)
        .take(limit as usize)
        .collect()
}

fn in_window(window: Option<DayWindow>, at: DateTime<Utc>) -> bool {
    window.map_or(true, |w| w.contains(at))
}

#[async_trait]
impl ScheduleStore for MemoryStore {
    async fn list(&self, caregiver_id: &str, query: &ScheduleQuery) -> Result<Vec<Schedule>> {
        let state = self.lock()?;
        let mut found: Vec<Schedule> = state
            .schedules
            .iter()
            .filter(|s| s.caregiver_id == caregiver_id)
            .filter(|s| query.statuses.is_empty() || query.statuses.contains(&s.status))
            .filter(|s| in_window(query.day, s.start_time))
            .cloned()
            .collect();
        found.sort_by(|a, b| {
            a.status
                .cmp(&b.status)
                .then_with(|| b.start_time.cmp(&a.start_time))
        });
        Ok(page(found, query.limit, query.offset))
    }

    async fn get(&self, id: &str) -> Result<Schedule> {
        let state = self.lock()?;
        state
            .schedules
            .iter()
            .find(|s| s.id == id)
            .cloned()
            .ok_or(CareError::NotFound)
    }

    async fn get_for_caregiver(&self, id: &str, caregiver_id: &str) -> Result<Schedule> {
        let state = self.lock()?;
        state
            .schedules
            .iter()
            .find(|s| s.id == id && s.caregiver_id == caregiver_id)
            .cloned()
            .ok_or(CareError::NotFound)
    }

    async fn update_clock_in(&self, id: &str, mark: ClockMark) -> Result<()> {
        let mut state = self.lock()?;
        let schedule = state
            .schedules
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or(CareError::NotFound)?;
        schedule.clock_in = Some(mark);
        schedule.updated_at = mark.at;
        Ok(())
    }

    async fn update_clock_out(
        &self,
        id: &str,
        mark: ClockMark,
        notes: Option<&str>,
    ) -> Result<()> {
        let mut state = self.lock()?;
        let schedule = state
            .schedules
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or(CareError::NotFound)?;
        schedule.clock_out = Some(mark);
        if let Some(notes) = notes {
            schedule.notes = Some(notes.to_string());
        }
        schedule.updated_at = mark.at;
        Ok(())
    }

    async fn update_status(
        &self,
        id: &str,
        status: ScheduleStatus,
        at: DateTime<Utc>,
    ) -> Result<()> {
        let mut state = self.lock()?;
        let schedule = state
            .schedules
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or(CareError::NotFound)?;
        schedule.status = status;
        schedule.updated_at = at;
        Ok(())
    }

    async fn metrics(&self, caregiver_id: &str, day: DayWindow) -> Result<ScheduleMetrics> {
        let state = self.lock()?;
        let mut metrics = ScheduleMetrics::default();
        state
            .schedules
            .iter()
            .filter(|s| s.caregiver_id == caregiver_id && day.contains(s.start_time))
            .for_each(|s| metrics.record(s.status));
        Ok(metrics)
    }
}

#[async_trait]
impl TaskStore for MemoryStore {
    async fn list_by_schedule(&self, schedule_id: &str) -> Result<Vec<Task>> {
        let state = self.lock()?;
        let mut tasks: Vec<Task> = state
            .tasks
            .iter()
            .filter(|t| t.schedule_id == schedule_id)
            .cloned()
            .collect();
        // Stable sort keeps creation order within equal sort orders.
        tasks.sort_by_key(|t| t.sort_order);
        Ok(tasks)
    }

    async fn update_status(
        &self,
        task_id: &str,
        status: TaskStatus,
        reason: Option<&str>,
        at: DateTime<Utc>,
    ) -> Result<()> {
        let mut state = self.lock()?;
        let task = state
            .tasks
            .iter_mut()
            .find(|t| t.id == task_id)
            .ok_or(CareError::NotFound)?;
        task.status = status;
        task.not_completed_reason = reason.map(String::from);
        task.updated_at = at;
        Ok(())
    }

    async fn create(&self, draft: &TaskDraft, at: DateTime<Utc>) -> Result<String> {
        let id = new_id();
        self.lock()?.tasks.push(Task {
            id: id.clone(),
            schedule_id: draft.schedule_id.clone(),
            title: draft.title.clone(),
            description: draft.description.clone(),
            status: draft.status,
            not_completed_reason: None,
            sort_order: draft.sort_order,
            updated_at: at,
        });
        Ok(id)
    }
}

#[async_trait]
impl AttendanceStore for MemoryStore {
    async fn create(&self, log: &CaregiverLog, day: NaiveDate) -> Result<()> {
        let mut state = self.lock()?;
        let taken = state.logs.iter().any(|(existing, existing_day)| {
            existing.caregiver_id == log.caregiver_id
                && existing.log_type == log.log_type
                && *existing_day == day
        });
        if taken {
            return Err(CareError::validation(format!(
                "{} already recorded for {day}",
                log.log_type
            )));
        }
        state.logs.push((log.clone(), day));
        Ok(())
    }

    async fn list_in(&self, caregiver_id: &str, window: DayWindow) -> Result<Vec<CaregiverLog>> {
        let state = self.lock()?;
        let mut logs: Vec<CaregiverLog> = state
            .logs
            .iter()
            .map(|(log, _)| log)
            .filter(|log| log.caregiver_id == caregiver_id && window.contains(log.timestamp))
            .cloned()
            .collect();
        logs.sort_by_key(|log| log.timestamp);
        Ok(logs)
    }

    async fn list(
        &self,
        caregiver_id: &str,
        query: &LogQuery,
    ) -> Result<Vec<CaregiverLogSummary>> {
        let state = self.lock()?;
        let mut logs: Vec<&CaregiverLog> = state
            .logs
            .iter()
            .map(|(log, _)| log)
            .filter(|log| log.caregiver_id == caregiver_id)
            .filter(|log| query.log_type.map_or(true, |t| t == log.log_type))
            .filter(|log| query.start.map_or(true, |start| log.timestamp >= start))
            .filter(|log| query.end.map_or(true, |end| log.timestamp < end))
            .collect();
        // Reverse first so ties keep newest-inserted first.
        logs.reverse();
        logs.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        let summaries: Vec<CaregiverLogSummary> =
            logs.into_iter().map(CaregiverLogSummary::from).collect();
        Ok(page(summaries, query.limit, query.offset))
    }

    async fn exists(
        &self,
        caregiver_id: &str,
        log_type: LogType,
        window: DayWindow,
    ) -> Result<bool> {
        let state = self.lock()?;
        Ok(state.logs.iter().any(|(log, _)| {
            log.caregiver_id == caregiver_id
                && log.log_type == log_type
                && window.contains(log.timestamp)
        }))
    }
}

#[async_trait]
impl CaregiverStore for MemoryStore {
    async fn get(&self, id: &str) -> Result<Caregiver> {
        let state = self.lock()?;
        state
            .caregivers
            .iter()
            .find(|c| c.id == id)
            .cloned()
            .ok_or(CareError::NotFound)
    }
}

#[async_trait]
impl AuthClientStore for MemoryStore {
    async fn find(&self, client_id: &str) -> Result<Option<AuthClient>> {
        let state = self.lock()?;
        Ok(state.auth_clients.iter().find(|c| c.id == client_id).cloned())
    }
}

#[async_trait]
impl RequestLogStore for MemoryStore {
    async fn record(&self, log: &RequestLog, at: DateTime<Utc>) -> Result<()> {
        self.lock()?.requests.push((log.clone(), at));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use caretrack_core::types::{Client, GeoPoint};
    use chrono::{Duration, TimeZone};

    fn t(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 15, h, 0, 0).unwrap()
    }

    fn schedule(id: &str, start: DateTime<Utc>, status: ScheduleStatus) -> Schedule {
        Schedule {
            id: id.into(),
            caregiver_id: "cg-1".into(),
            client: Client::default(),
            service_name: "Visit".into(),
            location_label: String::new(),
            start_time: start,
            end_time: start + Duration::hours(1),
            status,
            clock_in: None,
            clock_out: None,
            notes: None,
            created_at: t(0),
            updated_at: t(0),
            tasks: Vec::new(),
        }
    }

    #[tokio::test]
    async fn list_matches_sqlite_ordering_and_paging() {
        let store = MemoryStore::new();
        store.insert_schedule(schedule("done", t(8), ScheduleStatus::Completed)).unwrap();
        store.insert_schedule(schedule("early", t(9), ScheduleStatus::Scheduled)).unwrap();
        store.insert_schedule(schedule("late", t(14), ScheduleStatus::Scheduled)).unwrap();
        store.insert_schedule(schedule("now", t(7), ScheduleStatus::InProgress)).unwrap();

        let all = ScheduleStore::list(&store, "cg-1", &ScheduleQuery::default())
            .await
            .unwrap();
        let ids: Vec<&str> = all.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["now", "late", "early", "done"]);

        let second = ScheduleStore::list(
            &store,
            "cg-1",
            &ScheduleQuery {
                limit: 1,
                offset: 1,
                ..ScheduleQuery::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(second[0].id, "late");
    }

    #[tokio::test]
    async fn duplicate_log_type_on_same_day_is_rejected() {
        let store = MemoryStore::new();
        let log = CaregiverLog {
            id: new_id(),
            caregiver_id: "cg-1".into(),
            log_type: LogType::ClockIn,
            point: GeoPoint::new(0.0, 0.0),
            timestamp: t(8),
            notes: None,
            created_at: t(8),
        };
        let day = t(8).date_naive();
        AttendanceStore::create(&store, &log, day).await.unwrap();
        let again = CaregiverLog {
            id: new_id(),
            timestamp: t(9),
            ..log.clone()
        };
        let err = AttendanceStore::create(&store, &again, day).await.unwrap_err();
        assert!(matches!(err, CareError::Validation(_)));
    }

    #[tokio::test]
    async fn tasks_keep_creation_order_within_sort_order() {
        let store = MemoryStore::new();
        for title in ["b", "a", "c"] {
            let draft = TaskDraft {
                schedule_id: "s".into(),
                ..TaskDraft::titled(title)
            };
            TaskStore::create(&store, &draft, t(8)).await.unwrap();
        }
        let titles: Vec<String> = store
            .list_by_schedule("s")
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.title)
            .collect();
        assert_eq!(titles, vec!["b", "a", "c"]);
    }
}
