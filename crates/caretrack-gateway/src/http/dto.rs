//! Wire shapes for request bodies and responses.

use caretrack_core::types::{CaregiverLog, Client, GeoPoint, LogType, Schedule, ScheduleStatus, Task};
use caretrack_core::CareError;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_LIMIT: u32 = 20;
pub const MAX_PAGE_LIMIT: u32 = 100;

/// Coordinates plus optional notes for a visit or shift clock action.
#[derive(Debug, Default, Deserialize)]
pub struct ClockRequest {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub notes: Option<String>,
}

impl ClockRequest {
    pub fn point(&self) -> Result<GeoPoint, CareError> {
        let (Some(latitude), Some(longitude)) = (self.latitude, self.longitude) else {
            return Err(CareError::validation("latitude and longitude are required"));
        };
        if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
            return Err(CareError::validation("coordinates out of range"));
        }
        Ok(GeoPoint::new(latitude, longitude))
    }
}

#[derive(Debug, Serialize)]
pub struct Pagination {
    pub limit: u32,
    pub offset: u32,
    #[serde(rename = "hasMore")]
    pub has_more: bool,
}

/// Schedule detail with clock marks flattened into columns.
#[derive(Debug, Serialize)]
pub struct ScheduleResponse<'a> {
    pub id: &'a str,
    pub caregiver_id: &'a str,
    pub service_name: &'a str,
    pub client: &'a Client,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: ScheduleStatus,
    pub clock_in_at: Option<DateTime<Utc>>,
    pub clock_in_lat: Option<f64>,
    pub clock_in_long: Option<f64>,
    pub clock_out_at: Option<DateTime<Utc>>,
    pub clock_out_lat: Option<f64>,
    pub clock_out_long: Option<f64>,
    pub notes: Option<&'a str>,
    pub tasks: &'a [Task],
    pub location_label: &'a str,
    pub duration_mins: i64,
}

impl<'a> From<&'a Schedule> for ScheduleResponse<'a> {
    fn from(s: &'a Schedule) -> Self {
        Self {
            id: &s.id,
            caregiver_id: &s.caregiver_id,
            service_name: &s.service_name,
            client: &s.client,
            start_time: s.start_time,
            end_time: s.end_time,
            status: s.status,
            clock_in_at: s.clock_in.map(|m| m.at),
            clock_in_lat: s.clock_in.map(|m| m.point.latitude),
            clock_in_long: s.clock_in.map(|m| m.point.longitude),
            clock_out_at: s.clock_out.map(|m| m.at),
            clock_out_lat: s.clock_out.map(|m| m.point.latitude),
            clock_out_long: s.clock_out.map(|m| m.point.longitude),
            notes: s.notes.as_deref(),
            tasks: &s.tasks,
            location_label: &s.location_label,
            duration_mins: s.duration_mins(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CaregiverLogResponse<'a> {
    pub id: &'a str,
    pub caregiver_id: &'a str,
    pub log_type: LogType,
    pub latitude: f64,
    pub longitude: f64,
    pub timestamp: DateTime<Utc>,
    pub notes: Option<&'a str>,
    pub created_at: DateTime<Utc>,
}

impl<'a> From<&'a CaregiverLog> for CaregiverLogResponse<'a> {
    fn from(log: &'a CaregiverLog) -> Self {
        Self {
            id: &log.id,
            caregiver_id: &log.caregiver_id,
            log_type: log.log_type,
            latitude: log.point.latitude,
            longitude: log.point.longitude,
            timestamp: log.timestamp,
            notes: log.notes.as_deref(),
            created_at: log.created_at,
        }
    }
}

/// `YYYY-MM-DD`.
pub fn parse_date(field: &str, value: &str) -> Result<NaiveDate, CareError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| CareError::validation(format!("{field} must be YYYY-MM-DD")))
}

pub fn parse_optional_date(field: &str, value: Option<&str>) -> Result<Option<NaiveDate>, CareError> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => parse_date(field, v).map(Some),
        _ => Ok(None),
    }
}

/// Comma-separated status list, case-insensitive.
pub fn parse_statuses(csv: &str) -> Result<Vec<ScheduleStatus>, CareError> {
    csv.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.to_ascii_lowercase().parse())
        .collect()
}

pub fn page_limit(requested: Option<u32>) -> u32 {
    requested
        .filter(|l| *l > 0)
        .unwrap_or(DEFAULT_PAGE_LIMIT)
        .min(MAX_PAGE_LIMIT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_request_requires_both_coordinates() {
        let req = ClockRequest {
            latitude: Some(1.0),
            ..ClockRequest::default()
        };
        assert!(matches!(req.point(), Err(CareError::Validation(_))));

        let req = ClockRequest {
            latitude: Some(0.0),
            longitude: Some(0.0),
            notes: None,
        };
        assert_eq!(req.point().unwrap(), GeoPoint::new(0.0, 0.0));
    }

    #[test]
    fn clock_request_rejects_impossible_coordinates() {
        let req = ClockRequest {
            latitude: Some(91.0),
            longitude: Some(0.0),
            notes: None,
        };
        assert!(matches!(req.point(), Err(CareError::Validation(_))));
    }

    #[test]
    fn status_csv_is_trimmed_and_lowercased() {
        let statuses = parse_statuses(" Scheduled,missed ,,").unwrap();
        assert_eq!(statuses, vec![ScheduleStatus::Scheduled, ScheduleStatus::Missed]);
        assert!(parse_statuses("scheduled,later").is_err());
    }

    #[test]
    fn page_limit_defaults_and_caps() {
        assert_eq!(page_limit(None), 20);
        assert_eq!(page_limit(Some(0)), 20);
        assert_eq!(page_limit(Some(5)), 5);
        assert_eq!(page_limit(Some(10_000)), 100);
    }

    #[test]
    fn dates_are_iso_days() {
        assert_eq!(
            parse_date("date", "2025-01-15").unwrap(),
            NaiveDate::from_ymd_opt(2025, 1, 15).unwrap()
        );
        assert!(parse_date("date", "15/01/2025").is_err());
        assert_eq!(parse_optional_date("date", Some("  ")).unwrap(), None);
    }
}
