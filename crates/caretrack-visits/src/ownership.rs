use std::sync::Arc;

use caretrack_core::types::{Schedule, Task};
use caretrack_core::{CareError, Result};
use caretrack_store::{ScheduleStore, TaskStore};
use tracing::{debug, warn};

/// Confirms a caregiver owns a schedule (and optionally one of its tasks)
/// before anything is mutated. Read-only.
///
/// A schedule that belongs to another caregiver is reported exactly like
/// one that does not exist (`NotFound`). Only a task missing from an owned
/// schedule is `Forbidden`.
#[derive(Clone)]
pub struct OwnershipValidator {
    schedules: Arc<dyn ScheduleStore>,
    tasks: Arc<dyn TaskStore>,
}

impl OwnershipValidator {
    pub fn new(schedules: Arc<dyn ScheduleStore>, tasks: Arc<dyn TaskStore>) -> Self {
        Self { schedules, tasks }
    }

    /// The caregiver's schedule, without tasks.
    pub async fn schedule(&self, caregiver_id: &str, schedule_id: &str) -> Result<Schedule> {
        self.schedules
            .get_for_caregiver(schedule_id, caregiver_id)
            .await
    }

    /// The caregiver's schedule with its ordered task list.
    pub async fn schedule_with_tasks(
        &self,
        caregiver_id: &str,
        schedule_id: &str,
    ) -> Result<Schedule> {
        let schedule = self.schedule(caregiver_id, schedule_id).await?;
        self.attach_tasks(schedule).await
    }

    /// Resolve a task through its owning schedule.
    pub async fn task(
        &self,
        caregiver_id: &str,
        schedule_id: &str,
        task_id: &str,
    ) -> Result<(Schedule, Task)> {
        let schedule = self.schedule_with_tasks(caregiver_id, schedule_id).await?;
        let Some(task) = schedule.tasks.iter().find(|t| t.id == task_id).cloned() else {
            warn!(caregiver_id, schedule_id, task_id, "task not on caregiver's schedule");
            return Err(CareError::Forbidden);
        };
        debug!(caregiver_id, schedule_id, task_id, "task ownership confirmed");
        Ok((schedule, task))
    }

    pub(crate) async fn attach_tasks(&self, mut schedule: Schedule) -> Result<Schedule> {
        schedule.tasks = self.tasks.list_by_schedule(&schedule.id).await?;
        Ok(schedule)
    }
}
