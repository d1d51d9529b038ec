use async_trait::async_trait;
use caretrack_core::clock::DayWindow;
use caretrack_core::types::{CaregiverLog, CaregiverLogSummary, GeoPoint, LogType};
use caretrack_core::{CareError, Result};
use chrono::NaiveDate;
use rusqlite::types::ToSql;
use rusqlite::{params, params_from_iter, Connection, Row};
use tracing::{info, instrument};

use super::{is_unique_violation, parse_column, SqliteStore};
use crate::error::StoreError;
use crate::ports::{AttendanceStore, LogQuery};

fn row_to_log(row: &Row<'_>) -> rusqlite::Result<CaregiverLog> {
    Ok(CaregiverLog {
        id: row.get(0)?,
        caregiver_id: row.get(1)?,
        log_type: parse_column(row, 2)?,
        point: GeoPoint::new(row.get(3)?, row.get(4)?),
        timestamp: row.get(5)?,
        notes: row.get(6)?,
        created_at: row.get(7)?,
    })
}

fn row_to_summary(row: &Row<'_>) -> rusqlite::Result<CaregiverLogSummary> {
    Ok(CaregiverLogSummary {
        id: row.get(0)?,
        caregiver_id: row.get(1)?,
        log_type: parse_column(row, 2)?,
        timestamp: row.get(3)?,
    })
}

pub(crate) fn insert_log(
    conn: &Connection,
    log: &CaregiverLog,
    day: NaiveDate,
) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO logs_caregivers
         (id, caregiver_id, log_type, latitude, longitude, timestamp, log_day, notes, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            log.id,
            log.caregiver_id,
            log.log_type.as_str(),
            log.point.latitude,
            log.point.longitude,
            log.timestamp,
            day,
            log.notes,
            log.created_at
        ],
    )?;
    Ok(())
}

fn logs_in_window(
    conn: &Connection,
    caregiver_id: &str,
    window: DayWindow,
) -> rusqlite::Result<Vec<CaregiverLog>> {
    let mut stmt = conn.prepare(
        "SELECT id, caregiver_id, log_type, latitude, longitude, timestamp, notes, created_at
         FROM logs_caregivers
         WHERE caregiver_id = ?1 AND timestamp >= ?2 AND timestamp < ?3
         ORDER BY timestamp ASC, rowid ASC",
    )?;
    let rows = stmt.query_map(params![caregiver_id, window.start, window.end], row_to_log)?;
    rows.collect()
}

fn log_history(
    conn: &Connection,
    caregiver_id: &str,
    query: &LogQuery,
) -> rusqlite::Result<Vec<CaregiverLogSummary>> {
    let mut sql = String::from(
        "SELECT id, caregiver_id, log_type, timestamp FROM logs_caregivers WHERE caregiver_id = ?",
    );
    let mut args: Vec<Box<dyn ToSql>> = vec![Box::new(caregiver_id.to_string())];

    if let Some(log_type) = query.log_type {
        sql.push_str(" AND log_type = ?");
        args.push(Box::new(log_type.as_str()));
    }
    if let Some(start) = query.start {
        sql.push_str(" AND timestamp >= ?");
        args.push(Box::new(start));
    }
    if let Some(end) = query.end {
        sql.push_str(" AND timestamp < ?");
        args.push(Box::new(end));
    }
    sql.push_str(" ORDER BY timestamp DESC, rowid DESC");
    if query.limit > 0 {
        sql.push_str(" LIMIT ? OFFSET ?");
        args.push(Box::new(query.limit));
        args.push(Box::new(query.offset));
    }

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(args.iter().map(|a| a.as_ref())), row_to_summary)?;
    rows.collect()
}

#[async_trait]
impl AttendanceStore for SqliteStore {
    #[instrument(skip(self, log), fields(caregiver_id = %log.caregiver_id, log_type = %log.log_type))]
    async fn create(&self, log: &CaregiverLog, day: NaiveDate) -> Result<()> {
        let conn = self.lock()?;
        match insert_log(&conn, log, day) {
            Ok(()) => {
                info!(log_id = %log.id, %day, "attendance log stored");
                Ok(())
            }
            Err(e) if is_unique_violation(&e) => Err(CareError::validation(format!(
                "{} already recorded for {day}",
                log.log_type
            ))),
            Err(e) => Err(StoreError::from(e).into()),
        }
    }

    async fn list_in(&self, caregiver_id: &str, window: DayWindow) -> Result<Vec<CaregiverLog>> {
        let conn = self.lock()?;
        Ok(logs_in_window(&conn, caregiver_id, window).map_err(StoreError::from)?)
    }

    async fn list(
        &self,
        caregiver_id: &str,
        query: &LogQuery,
    ) -> Result<Vec<CaregiverLogSummary>> {
        let conn = self.lock()?;
        Ok(log_history(&conn, caregiver_id, query).map_err(StoreError::from)?)
    }

    async fn exists(
        &self,
        caregiver_id: &str,
        log_type: LogType,
        window: DayWindow,
    ) -> Result<bool> {
        let conn = self.lock()?;
        let found: bool = conn
            .query_row(
                "SELECT EXISTS(
                    SELECT 1 FROM logs_caregivers
                    WHERE caregiver_id = ?1 AND log_type = ?2
                      AND timestamp >= ?3 AND timestamp < ?4
                 )",
                params![caregiver_id, log_type.as_str(), window.start, window.end],
                |row| row.get(0),
            )
            .map_err(StoreError::from)?;
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sqlite::testing::{store, t};
    use caretrack_core::types::new_id;
    use chrono::{DateTime, Duration, Utc};

    fn log(log_type: LogType, at: DateTime<Utc>) -> CaregiverLog {
        CaregiverLog {
            id: new_id(),
            caregiver_id: "cg-1".into(),
            log_type,
            point: GeoPoint::new(1.5, 2.5),
            timestamp: at,
            notes: None,
            created_at: at,
        }
    }

    fn jan(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, d).unwrap()
    }

    fn today() -> DayWindow {
        DayWindow {
            start: t(0, 0),
            end: t(0, 0) + Duration::days(1),
        }
    }

    #[tokio::test]
    async fn second_clock_in_same_day_violates_uniqueness() {
        let store = store();
        store.create(&log(LogType::ClockIn, t(8, 0)), jan(15)).await.unwrap();
        let err = store
            .create(&log(LogType::ClockIn, t(9, 0)), jan(15))
            .await
            .unwrap_err();
        assert!(matches!(err, CareError::Validation(_)));

        // A new day is a new slot.
        store
            .create(&log(LogType::ClockIn, t(8, 0) + Duration::days(1)), jan(16))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn unknown_caregiver_is_a_database_error_not_a_duplicate() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA foreign_keys = ON;").unwrap();
        crate::db::init_db(&conn).unwrap();
        let store = SqliteStore::new(conn);

        let mut orphan = log(LogType::ClockIn, t(8, 0));
        orphan.caregiver_id = "cg-ghost".into();
        let err = store.create(&orphan, jan(15)).await.unwrap_err();
        assert!(matches!(err, CareError::Database(_)), "{err:?}");
    }

    #[tokio::test]
    async fn exists_checks_type_and_window() {
        let store = store();
        assert!(!store.has_clocked_in("cg-1", today()).await.unwrap());
        store.create(&log(LogType::ClockIn, t(8, 0)), jan(15)).await.unwrap();
        assert!(store.has_clocked_in("cg-1", today()).await.unwrap());
        assert!(!store.has_clocked_out("cg-1", today()).await.unwrap());
        assert!(!store.has_clocked_in("cg-2", today()).await.unwrap());
    }

    #[tokio::test]
    async fn today_is_chronological_and_history_is_newest_first() {
        let store = store();
        store.create(&log(LogType::ClockIn, t(8, 0) - Duration::days(1)), jan(14)).await.unwrap();
        store.create(&log(LogType::ClockOut, t(17, 0)), jan(15)).await.unwrap();
        store.create(&log(LogType::ClockIn, t(8, 0)), jan(15)).await.unwrap();

        let today_logs = store.list_in("cg-1", today()).await.unwrap();
        let types: Vec<LogType> = today_logs.iter().map(|l| l.log_type).collect();
        assert_eq!(types, vec![LogType::ClockIn, LogType::ClockOut]);
        assert_eq!(today_logs[0].point, GeoPoint::new(1.5, 2.5));

        let history = store.list("cg-1", &LogQuery::default()).await.unwrap();
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].timestamp, t(17, 0));

        let clock_ins_today = store
            .list(
                "cg-1",
                &LogQuery {
                    log_type: Some(LogType::ClockIn),
                    start: Some(t(0, 0)),
                    end: None,
                    limit: 10,
                    offset: 0,
                },
            )
            .await
            .unwrap();
        assert_eq!(clock_ins_today.len(), 1);
        assert_eq!(clock_ins_today[0].timestamp, t(8, 0));
    }
}
