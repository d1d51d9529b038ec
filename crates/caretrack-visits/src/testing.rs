use std::sync::Arc;

use caretrack_core::clock::{Calendar, FixedClock};
use caretrack_core::types::{Client, Schedule, ScheduleStatus, Task, TaskStatus};
use caretrack_store::MemoryStore;
use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::{OwnershipValidator, VisitServices};

pub fn at(h: u32, m: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 15, h, m, 0).unwrap()
}

pub fn task(id: &str, schedule_id: &str, sort_order: i32) -> Task {
    Task {
        id: id.into(),
        schedule_id: schedule_id.into(),
        title: format!("Task {id}"),
        description: String::new(),
        status: TaskStatus::Pending,
        not_completed_reason: None,
        sort_order,
        updated_at: at(0, 0),
    }
}

pub struct Fixture {
    pub store: Arc<MemoryStore>,
    pub clock: Arc<FixedClock>,
    pub calendar: Calendar,
}

/// Empty store with the clock at 2025-01-15T09:00:00Z (UTC calendar).
pub fn fixture() -> Fixture {
    let clock = Arc::new(FixedClock::new(at(9, 0)));
    Fixture {
        store: Arc::new(MemoryStore::new()),
        calendar: Calendar::utc(clock.clone()),
        clock,
    }
}

impl Fixture {
    pub fn add_schedule(&self, id: &str, caregiver_id: &str, status: ScheduleStatus) {
        self.add_schedule_at(id, caregiver_id, status, at(9, 0));
    }

    pub fn add_schedule_at(
        &self,
        id: &str,
        caregiver_id: &str,
        status: ScheduleStatus,
        start: DateTime<Utc>,
    ) {
        self.store
            .insert_schedule(Schedule {
                id: id.into(),
                caregiver_id: caregiver_id.into(),
                client: Client {
                    id: "client-1".into(),
                    full_name: "Ada Client".into(),
                    ..Client::default()
                },
                service_name: "Personal care".into(),
                location_label: "Home".into(),
                start_time: start,
                end_time: start + Duration::minutes(90),
                status,
                clock_in: None,
                clock_out: None,
                notes: None,
                created_at: at(0, 0),
                updated_at: at(0, 0),
                tasks: Vec::new(),
            })
            .unwrap();
    }

    pub fn ownership(&self) -> OwnershipValidator {
        OwnershipValidator::new(self.store.clone(), self.store.clone())
    }

    pub fn services(&self) -> VisitServices {
        VisitServices::new(self.store.clone(), self.calendar.clone())
    }
}
