//! Visit tracking core: ownership checks, the schedule state machine, the
//! task status engine and the shift attendance tracker.

pub mod attendance;
pub mod ownership;
pub mod schedule;
pub mod task;

#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;

use caretrack_core::clock::Calendar;
use caretrack_store::{AttendanceStore, ScheduleStore, TaskStore};

pub use attendance::{AttendanceService, HistoryFilter, TodayAttendance};
pub use ownership::OwnershipValidator;
pub use schedule::{ScheduleFilter, ScheduleService};
pub use task::TaskService;

/// Every visit service wired to one store and one calendar.
#[derive(Clone)]
pub struct VisitServices {
    pub schedules: Arc<ScheduleService>,
    pub tasks: Arc<TaskService>,
    pub attendance: Arc<AttendanceService>,
}

impl VisitServices {
    pub fn new<S>(store: Arc<S>, calendar: Calendar) -> Self
    where
        S: ScheduleStore + TaskStore + AttendanceStore + 'static,
    {
        let schedules: Arc<dyn ScheduleStore> = store.clone();
        let tasks: Arc<dyn TaskStore> = store.clone();
        let logs: Arc<dyn AttendanceStore> = store;
        let ownership = OwnershipValidator::new(schedules.clone(), tasks.clone());

        Self {
            schedules: Arc::new(ScheduleService::new(
                schedules,
                ownership.clone(),
                calendar.clone(),
            )),
            tasks: Arc::new(TaskService::new(tasks, ownership, calendar.clone())),
            attendance: Arc::new(AttendanceService::new(logs, calendar)),
        }
    }
}
