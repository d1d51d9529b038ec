use std::sync::Arc;

use caretrack_core::clock::Calendar;
use caretrack_core::types::{new_id, CaregiverLog, CaregiverLogSummary, GeoPoint, LogType};
use caretrack_core::{CareError, Result};
use caretrack_store::{AttendanceStore, LogQuery};
use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

pub const DEFAULT_HISTORY_LIMIT: u32 = 100;

/// Caller-facing history filter. Dates are local calendar days, inclusive.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoryFilter {
    pub log_type: Option<LogType>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    /// 0 means the default page size.
    pub limit: u32,
    pub offset: u32,
}

/// Reduction of the caregiver's logs for the current local day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TodayAttendance {
    pub caregiver_id: String,
    /// Local midnight that starts the day, as a UTC instant.
    pub date: DateTime<Utc>,
    pub has_clocked_in: bool,
    pub has_clocked_out: bool,
    pub clock_in_at: Option<DateTime<Utc>>,
    pub clock_in_latitude: Option<f64>,
    pub clock_in_longitude: Option<f64>,
    pub clock_out_at: Option<DateTime<Utc>>,
    pub clock_out_latitude: Option<f64>,
    pub clock_out_longitude: Option<f64>,
}

impl TodayAttendance {
    fn empty(caregiver_id: &str, date: DateTime<Utc>) -> Self {
        Self {
            caregiver_id: caregiver_id.to_string(),
            date,
            has_clocked_in: false,
            has_clocked_out: false,
            clock_in_at: None,
            clock_in_latitude: None,
            clock_in_longitude: None,
            clock_out_at: None,
            clock_out_latitude: None,
            clock_out_longitude: None,
        }
    }

    /// Fold one log in. Later logs overwrite earlier ones of the same type.
    fn apply(&mut self, log: &CaregiverLog) {
        match log.log_type {
            LogType::ClockIn => {
                self.has_clocked_in = true;
                self.clock_in_at = Some(log.timestamp);
                self.clock_in_latitude = Some(log.point.latitude);
                self.clock_in_longitude = Some(log.point.longitude);
            }
            LogType::ClockOut => {
                self.has_clocked_out = true;
                self.clock_out_at = Some(log.timestamp);
                self.clock_out_latitude = Some(log.point.latitude);
                self.clock_out_longitude = Some(log.point.longitude);
            }
        }
    }
}

/// Shift clock-in/out, independent of visits, bounded by the local day.
///
/// "Today" is recomputed from the clock on every call.
pub struct AttendanceService {
    logs: Arc<dyn AttendanceStore>,
    calendar: Calendar,
}

impl AttendanceService {
    pub fn new(logs: Arc<dyn AttendanceStore>, calendar: Calendar) -> Self {
        Self { logs, calendar }
    }

    #[instrument(skip(self, notes))]
    pub async fn clock_in(
        &self,
        caregiver_id: &str,
        latitude: f64,
        longitude: f64,
        notes: Option<String>,
    ) -> Result<CaregiverLog> {
        let today = self.calendar.today()?;
        if self.logs.has_clocked_in(caregiver_id, today).await? {
            warn!("clock-in rejected: already clocked in today");
            return Err(CareError::validation("already clocked in today"));
        }
        self.append(caregiver_id, LogType::ClockIn, latitude, longitude, notes)
            .await
    }

    #[instrument(skip(self, notes))]
    pub async fn clock_out(
        &self,
        caregiver_id: &str,
        latitude: f64,
        longitude: f64,
        notes: Option<String>,
    ) -> Result<CaregiverLog> {
        let today = self.calendar.today()?;
        if !self.logs.has_clocked_in(caregiver_id, today).await? {
            warn!("clock-out rejected: not clocked in today");
            return Err(CareError::validation("not clocked in today"));
        }
        if self.logs.has_clocked_out(caregiver_id, today).await? {
            warn!("clock-out rejected: already clocked out today");
            return Err(CareError::validation("already clocked out today"));
        }
        self.append(caregiver_id, LogType::ClockOut, latitude, longitude, notes)
            .await
    }

    pub async fn today_status(&self, caregiver_id: &str) -> Result<TodayAttendance> {
        let today = self.calendar.today()?;
        let logs = self.logs.list_in(caregiver_id, today).await?;
        debug!(caregiver_id, count = logs.len(), "today's attendance logs");

        let mut status = TodayAttendance::empty(caregiver_id, today.start);
        for log in &logs {
            status.apply(log);
        }
        Ok(status)
    }

    #[instrument(skip(self, filter))]
    pub async fn history(
        &self,
        caregiver_id: &str,
        filter: &HistoryFilter,
    ) -> Result<Vec<CaregiverLogSummary>> {
        if let (Some(start), Some(end)) = (filter.start_date, filter.end_date) {
            if end < start {
                return Err(CareError::validation("end_date is before start_date"));
            }
        }
        let query = LogQuery {
            log_type: filter.log_type,
            start: filter
                .start_date
                .map(|d| self.calendar.midnight(d))
                .transpose()?,
            end: filter
                .end_date
                .and_then(|d| d.checked_add_days(Days::new(1)))
                .map(|d| self.calendar.midnight(d))
                .transpose()?,
            limit: if filter.limit == 0 {
                DEFAULT_HISTORY_LIMIT
            } else {
                filter.limit
            },
            offset: filter.offset,
        };
        self.logs.list(caregiver_id, &query).await
    }

    async fn append(
        &self,
        caregiver_id: &str,
        log_type: LogType,
        latitude: f64,
        longitude: f64,
        notes: Option<String>,
    ) -> Result<CaregiverLog> {
        let now = self.calendar.now();
        let log = CaregiverLog {
            id: new_id(),
            caregiver_id: caregiver_id.to_string(),
            log_type,
            point: GeoPoint::new(latitude, longitude),
            timestamp: now,
            notes: notes.filter(|n| !n.is_empty()),
            created_at: now,
        };
        // Uniqueness key: the local day of the log's own timestamp.
        let day = now.with_timezone(&self.calendar.offset()).date_naive();
        self.logs.create(&log, day).await?;
        info!(log_id = %log.id, %log_type, at = %now, "attendance recorded");
        Ok(log)
    }
}
