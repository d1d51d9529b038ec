use async_trait::async_trait;
use caretrack_core::types::{new_id, Task, TaskDraft, TaskStatus};
use caretrack_core::{CareError, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};
use tracing::{debug, instrument};

use super::{parse_column, SqliteStore};
use crate::error::StoreError;
use crate::ports::TaskStore;

fn row_to_task(row: &Row<'_>) -> rusqlite::Result<Task> {
    Ok(Task {
        id: row.get(0)?,
        schedule_id: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        status: parse_column(row, 4)?,
        not_completed_reason: row.get(5)?,
        sort_order: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

pub(crate) fn tasks_for_schedule(conn: &Connection, schedule_id: &str) -> rusqlite::Result<Vec<Task>> {
    let mut stmt = conn.prepare(
        "SELECT id, schedule_id, title, description, status, not_completed_reason,
                sort_order, updated_at
         FROM schedule_tasks
         WHERE schedule_id = ?1
         ORDER BY sort_order ASC, created_at ASC, rowid ASC",
    )?;
    let rows = stmt.query_map(params![schedule_id], row_to_task)?;
    rows.collect()
}

pub(crate) fn insert_task(
    conn: &Connection,
    id: &str,
    draft: &TaskDraft,
    at: DateTime<Utc>,
) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO schedule_tasks
         (id, schedule_id, title, description, status, not_completed_reason,
          sort_order, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, NULL, ?6, ?7, ?7)",
        params![
            id,
            draft.schedule_id,
            draft.title,
            draft.description,
            draft.status.as_str(),
            draft.sort_order,
            at
        ],
    )?;
    Ok(())
}

#[async_trait]
impl TaskStore for SqliteStore {
    async fn list_by_schedule(&self, schedule_id: &str) -> Result<Vec<Task>> {
        let conn = self.lock()?;
        Ok(tasks_for_schedule(&conn, schedule_id).map_err(StoreError::from)?)
    }

    #[instrument(skip(self, reason), fields(task_id = %task_id, status = %status))]
    async fn update_status(
        &self,
        task_id: &str,
        status: TaskStatus,
        reason: Option<&str>,
        at: DateTime<Utc>,
    ) -> Result<()> {
        let conn = self.lock()?;
        let rows_changed = conn
            .execute(
                "UPDATE schedule_tasks
                 SET status = ?1, not_completed_reason = ?2, updated_at = ?3
                 WHERE id = ?4",
                params![status.as_str(), reason, at, task_id],
            )
            .map_err(StoreError::from)?;
        if rows_changed == 0 {
            return Err(CareError::NotFound);
        }
        Ok(())
    }

    #[instrument(skip(self, draft), fields(schedule_id = %draft.schedule_id))]
    async fn create(&self, draft: &TaskDraft, at: DateTime<Utc>) -> Result<String> {
        let id = new_id();
        let conn = self.lock()?;
        insert_task(&conn, &id, draft, at).map_err(StoreError::from)?;
        debug!(task_id = %id, "task inserted");
        Ok(id)
    }
}
