use std::sync::Arc;

use caretrack_core::clock::Calendar;
use caretrack_core::types::{Schedule, TaskDraft, TaskStatus};
use caretrack_core::{CareError, Result};
use caretrack_store::TaskStore;
use tracing::{info, instrument};

use crate::ownership::OwnershipValidator;

/// Per-task completion. A task leaves `pending` for `completed` or
/// `not_completed`; the latter always carries a reason.
pub struct TaskService {
    tasks: Arc<dyn TaskStore>,
    ownership: OwnershipValidator,
    calendar: Calendar,
}

impl TaskService {
    pub fn new(tasks: Arc<dyn TaskStore>, ownership: OwnershipValidator, calendar: Calendar) -> Self {
        Self {
            tasks,
            ownership,
            calendar,
        }
    }

    /// Mark a task done or not done and return the refreshed schedule.
    ///
    /// The target status is validated before ownership, so a bad status is
    /// a `Validation` failure even for a schedule the caller cannot see.
    #[instrument(skip(self, reason))]
    pub async fn update_status(
        &self,
        caregiver_id: &str,
        schedule_id: &str,
        task_id: &str,
        status: &str,
        reason: Option<&str>,
    ) -> Result<Schedule> {
        let status: TaskStatus = status.parse()?;
        if status == TaskStatus::Pending {
            return Err(CareError::validation(
                "status must be completed or not_completed",
            ));
        }

        self.ownership.task(caregiver_id, schedule_id, task_id).await?;

        let reason = match status {
            TaskStatus::NotCompleted => {
                let reason = reason.filter(|r| !r.is_empty()).ok_or_else(|| {
                    CareError::validation("reason is required when status is not_completed")
                })?;
                Some(reason)
            }
            _ => None,
        };

        self.tasks
            .update_status(task_id, status, reason, self.calendar.now())
            .await?;
        info!(%status, "task status updated");

        self.ownership
            .schedule_with_tasks(caregiver_id, schedule_id)
            .await
    }

    /// Append a pending task to the caregiver's schedule. Returns the new id.
    #[instrument(skip(self, draft))]
    pub async fn add_task(
        &self,
        caregiver_id: &str,
        schedule_id: &str,
        mut draft: TaskDraft,
    ) -> Result<String> {
        self.ownership.schedule(caregiver_id, schedule_id).await?;

        if draft.title.is_empty() {
            return Err(CareError::validation("title is required"));
        }
        draft.schedule_id = schedule_id.to_string();
        draft.status = TaskStatus::Pending;

        let task_id = self.tasks.create(&draft, self.calendar.now()).await?;
        info!(%task_id, "task added");
        Ok(task_id)
    }
}
