use async_trait::async_trait;
use caretrack_core::clock::DayWindow;
use caretrack_core::types::{
    Client, ClockMark, GeoPoint, Schedule, ScheduleMetrics, ScheduleStatus,
};
use caretrack_core::{CareError, Result};
use chrono::{DateTime, Utc};
use rusqlite::types::ToSql;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use tracing::{debug, instrument};

use super::{parse_column, SqliteStore};
use crate::error::StoreError;
use crate::ports::{ScheduleQuery, ScheduleStore};

const SCHEDULE_SELECT_SQL: &str = "SELECT s.id, s.caregiver_id, s.service_name, s.location_label,
        s.start_time, s.end_time, s.status,
        s.clock_in_at, s.clock_in_lat, s.clock_in_long,
        s.clock_out_at, s.clock_out_lat, s.clock_out_long,
        s.notes, s.created_at, s.updated_at,
        c.id, c.full_name, c.email, c.phone, c.address, c.city, c.state, c.postal,
        c.latitude, c.longitude
     FROM schedules s
     JOIN clients c ON c.id = s.client_id";

/// `CASE` expression ranking `s.status` by `ScheduleStatus::display_rank`.
fn status_rank_sql() -> String {
    let mut sql = String::from("CASE s.status");
    for status in ScheduleStatus::ALL {
        sql.push_str(&format!(" WHEN '{}' THEN {}", status, status.display_rank()));
    }
    sql.push_str(&format!(" ELSE {} END", ScheduleStatus::ALL.len()));
    sql
}

/// Map a SELECT row (column order from SCHEDULE_SELECT_SQL) to a Schedule.
fn row_to_schedule(row: &Row<'_>) -> rusqlite::Result<Schedule> {
    Ok(Schedule {
        id: row.get(0)?,
        caregiver_id: row.get(1)?,
        service_name: row.get(2)?,
        location_label: row.get(3)?,
        start_time: row.get(4)?,
        end_time: row.get(5)?,
        status: parse_column(row, 6)?,
        clock_in: clock_mark(row, 7)?,
        clock_out: clock_mark(row, 10)?,
        notes: row.get(13)?,
        created_at: row.get(14)?,
        updated_at: row.get(15)?,
        client: Client {
            id: row.get(16)?,
            full_name: row.get(17)?,
            email: row.get(18)?,
            phone: row.get(19)?,
            address: row.get(20)?,
            city: row.get(21)?,
            state: row.get(22)?,
            postal: row.get(23)?,
            latitude: row.get(24)?,
            longitude: row.get(25)?,
        },
        tasks: Vec::new(),
    })
}

/// Three consecutive columns: timestamp, latitude, longitude.
fn clock_mark(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<ClockMark>> {
    let at: Option<DateTime<Utc>> = row.get(idx)?;
    let lat: Option<f64> = row.get(idx + 1)?;
    let long: Option<f64> = row.get(idx + 2)?;
    Ok(at.map(|at| ClockMark {
        at,
        point: GeoPoint::new(lat.unwrap_or_default(), long.unwrap_or_default()),
    }))
}

pub(crate) fn find_schedule(
    conn: &Connection,
    id: &str,
    caregiver_id: Option<&str>,
) -> rusqlite::Result<Option<Schedule>> {
    match caregiver_id {
        Some(owner) => conn
            .query_row(
                &format!("{SCHEDULE_SELECT_SQL} WHERE s.id = ?1 AND s.caregiver_id = ?2"),
                params![id, owner],
                row_to_schedule,
            )
            .optional(),
        None => conn
            .query_row(
                &format!("{SCHEDULE_SELECT_SQL} WHERE s.id = ?1"),
                params![id],
                row_to_schedule,
            )
            .optional(),
    }
}

pub(crate) fn list_schedules(
    conn: &Connection,
    caregiver_id: &str,
    query: &ScheduleQuery,
) -> rusqlite::Result<Vec<Schedule>> {
    let mut sql = format!("{SCHEDULE_SELECT_SQL} WHERE s.caregiver_id = ?");
    let mut args: Vec<Box<dyn ToSql>> = vec![Box::new(caregiver_id.to_string())];

    if !query.statuses.is_empty() {
        let marks = vec!["?"; query.statuses.len()].join(", ");
        sql.push_str(&format!(" AND s.status IN ({marks})"));
        for status in &query.statuses {
            args.push(Box::new(status.as_str()));
        }
    }
    if let Some(day) = query.day {
        sql.push_str(" AND s.start_time >= ? AND s.start_time < ?");
        args.push(Box::new(day.start));
        args.push(Box::new(day.end));
    }
    sql.push_str(&format!(" ORDER BY {}, s.start_time DESC", status_rank_sql()));
    if query.limit > 0 {
        sql.push_str(" LIMIT ? OFFSET ?");
        args.push(Box::new(query.limit));
        args.push(Box::new(query.offset));
    }

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(args.iter().map(|a| a.as_ref())), row_to_schedule)?;
    rows.collect()
}

pub(crate) fn count_by_status(
    conn: &Connection,
    caregiver_id: &str,
    day: DayWindow,
) -> rusqlite::Result<ScheduleMetrics> {
    let mut stmt = conn.prepare(
        "SELECT status, COUNT(*) FROM schedules
         WHERE caregiver_id = ?1 AND start_time >= ?2 AND start_time < ?3
         GROUP BY status",
    )?;
    let rows = stmt.query_map(params![caregiver_id, day.start, day.end], |row| {
        Ok((parse_column::<ScheduleStatus>(row, 0)?, row.get::<_, u32>(1)?))
    })?;
    let mut metrics = ScheduleMetrics::default();
    for row in rows {
        let (status, count) = row?;
        metrics.add(status, count);
    }
    Ok(metrics)
}

fn changed_or_not_found(rows_changed: usize) -> Result<()> {
    if rows_changed == 0 {
        return Err(CareError::NotFound);
    }
    Ok(())
}

#[async_trait]
impl ScheduleStore for SqliteStore {
    #[instrument(skip(self, query))]
    async fn list(&self, caregiver_id: &str, query: &ScheduleQuery) -> Result<Vec<Schedule>> {
        let conn = self.lock()?;
        let schedules = list_schedules(&conn, caregiver_id, query).map_err(StoreError::from)?;
        debug!(count = schedules.len(), "listed schedules");
        Ok(schedules)
    }

    async fn get(&self, id: &str) -> Result<Schedule> {
        let conn = self.lock()?;
        find_schedule(&conn, id, None)
            .map_err(StoreError::from)?
            .ok_or(CareError::NotFound)
    }

    async fn get_for_caregiver(&self, id: &str, caregiver_id: &str) -> Result<Schedule> {
        let conn = self.lock()?;
        find_schedule(&conn, id, Some(caregiver_id))
            .map_err(StoreError::from)?
            .ok_or(CareError::NotFound)
    }

    #[instrument(skip(self, mark), fields(schedule_id = %id))]
    async fn update_clock_in(&self, id: &str, mark: ClockMark) -> Result<()> {
        let conn = self.lock()?;
        let rows_changed = conn
            .execute(
                "UPDATE schedules
                 SET clock_in_at = ?1, clock_in_lat = ?2, clock_in_long = ?3, updated_at = ?1
                 WHERE id = ?4",
                params![mark.at, mark.point.latitude, mark.point.longitude, id],
            )
            .map_err(StoreError::from)?;
        changed_or_not_found(rows_changed)
    }

    #[instrument(skip(self, mark, notes), fields(schedule_id = %id))]
    async fn update_clock_out(
        &self,
        id: &str,
        mark: ClockMark,
        notes: Option<&str>,
    ) -> Result<()> {
        let conn = self.lock()?;
        let rows_changed = conn
            .execute(
                "UPDATE schedules
                 SET clock_out_at = ?1, clock_out_lat = ?2, clock_out_long = ?3,
                     notes = COALESCE(?4, notes), updated_at = ?1
                 WHERE id = ?5",
                params![mark.at, mark.point.latitude, mark.point.longitude, notes, id],
            )
            .map_err(StoreError::from)?;
        changed_or_not_found(rows_changed)
    }

    #[instrument(skip(self), fields(schedule_id = %id, status = %status))]
    async fn update_status(
        &self,
        id: &str,
        status: ScheduleStatus,
        at: DateTime<Utc>,
    ) -> Result<()> {
        let conn = self.lock()?;
        let rows_changed = conn
            .execute(
                "UPDATE schedules SET status = ?1, updated_at = ?2 WHERE id = ?3",
                params![status.as_str(), at, id],
            )
            .map_err(StoreError::from)?;
        changed_or_not_found(rows_changed)
    }

    async fn metrics(&self, caregiver_id: &str, day: DayWindow) -> Result<ScheduleMetrics> {
        let conn = self.lock()?;
        Ok(count_by_status(&conn, caregiver_id, day).map_err(StoreError::from)?)
    }
}
