use std::sync::Arc;

use caretrack_core::clock::Calendar;
use caretrack_core::types::{
    ClockMark, Schedule, ScheduleMetrics, ScheduleStatus, ScheduleSummary, VisitEvent,
};
use caretrack_core::{CareError, Result};
use caretrack_store::{ScheduleQuery, ScheduleStore};
use chrono::NaiveDate;
use tracing::{debug, info, instrument, warn};

use crate::ownership::OwnershipValidator;

/// Caller-facing list filter. `date` is a local calendar day.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScheduleFilter {
    pub statuses: Vec<ScheduleStatus>,
    pub date: Option<NaiveDate>,
    /// 0 returns everything.
    pub limit: u32,
    pub offset: u32,
}

/// Visit lifecycle: `scheduled | missed -> in_progress -> completed`.
pub struct ScheduleService {
    schedules: Arc<dyn ScheduleStore>,
    ownership: OwnershipValidator,
    calendar: Calendar,
}

impl ScheduleService {
    pub fn new(
        schedules: Arc<dyn ScheduleStore>,
        ownership: OwnershipValidator,
        calendar: Calendar,
    ) -> Self {
        Self {
            schedules,
            ownership,
            calendar,
        }
    }

    #[instrument(skip(self, filter))]
    pub async fn list(
        &self,
        caregiver_id: &str,
        filter: &ScheduleFilter,
    ) -> Result<Vec<ScheduleSummary>> {
        let query = ScheduleQuery {
            statuses: filter.statuses.clone(),
            day: filter.date.map(|d| self.calendar.day(d)).transpose()?,
            limit: filter.limit,
            offset: filter.offset,
        };
        let schedules = self.schedules.list(caregiver_id, &query).await?;
        Ok(schedules.iter().map(Schedule::summary).collect())
    }

    /// Every visit planned for the caregiver's current local day.
    pub async fn today(&self, caregiver_id: &str) -> Result<Vec<ScheduleSummary>> {
        let filter = ScheduleFilter {
            date: Some(self.calendar.today_date()),
            ..ScheduleFilter::default()
        };
        self.list(caregiver_id, &filter).await
    }

    /// Per-status counts for `date` (today when `None`).
    #[instrument(skip(self))]
    pub async fn metrics(
        &self,
        caregiver_id: &str,
        date: Option<NaiveDate>,
    ) -> Result<ScheduleMetrics> {
        let date = date.unwrap_or_else(|| self.calendar.today_date());
        let day = self.calendar.day(date)?;
        self.schedules.metrics(caregiver_id, day).await
    }

    pub async fn get(&self, schedule_id: &str, caregiver_id: &str) -> Result<Schedule> {
        debug!(schedule_id, caregiver_id, "loading schedule");
        self.ownership
            .schedule_with_tasks(caregiver_id, schedule_id)
            .await
    }

    /// Clock into a visit. Allowed from `scheduled` or `missed`.
    ///
    /// The clock-in time is always the service clock; `event.at` is ignored.
    #[instrument(skip(self, event))]
    pub async fn start(
        &self,
        schedule_id: &str,
        caregiver_id: &str,
        event: VisitEvent,
    ) -> Result<Schedule> {
        let schedule = self.ownership.schedule(caregiver_id, schedule_id).await?;
        if !schedule.status.can_start() {
            return Err(rejected(schedule.status, ScheduleStatus::InProgress));
        }

        let mark = ClockMark {
            at: self.calendar.now(),
            point: event.point,
        };
        self.schedules.update_clock_in(schedule_id, mark).await?;
        self.schedules
            .update_status(schedule_id, ScheduleStatus::InProgress, mark.at)
            .await?;
        info!(
            from = %schedule.status,
            at = %mark.at,
            "visit started"
        );

        self.get(schedule_id, caregiver_id).await
    }

    /// Clock out of a visit. Allowed only from `in_progress`.
    ///
    /// Empty notes are treated as absent and leave stored notes untouched.
    #[instrument(skip(self, event))]
    pub async fn end(
        &self,
        schedule_id: &str,
        caregiver_id: &str,
        event: VisitEvent,
    ) -> Result<Schedule> {
        let schedule = self.ownership.schedule(caregiver_id, schedule_id).await?;
        if !schedule.status.can_end() {
            return Err(rejected(schedule.status, ScheduleStatus::Completed));
        }

        let mark = ClockMark {
            at: self.calendar.now(),
            point: event.point,
        };
        let notes = event.notes.as_deref().filter(|n| !n.is_empty());
        self.schedules
            .update_clock_out(schedule_id, mark, notes)
            .await?;
        self.schedules
            .update_status(schedule_id, ScheduleStatus::Completed, mark.at)
            .await?;
        info!(at = %mark.at, has_notes = notes.is_some(), "visit ended");

        self.get(schedule_id, caregiver_id).await
    }

    /// Administrative override: any status, no from-state rule, no owner check.
    #[instrument(skip(self))]
    pub async fn set_status(&self, schedule_id: &str, status: &str) -> Result<Schedule> {
        let status: ScheduleStatus = status.parse()?;
        self.schedules
            .update_status(schedule_id, status, self.calendar.now())
            .await?;
        info!(%status, "schedule status overridden");

        let schedule = self.schedules.get(schedule_id).await?;
        self.ownership.attach_tasks(schedule).await
    }
}

fn rejected(from: ScheduleStatus, to: ScheduleStatus) -> CareError {
    warn!(%from, %to, "schedule transition rejected");
    CareError::InvalidStatusTransition { from, to }
}
