use async_trait::async_trait;
use caretrack_core::types::RequestLog;
use caretrack_core::Result;
use chrono::{DateTime, Utc};
use rusqlite::params;

use super::SqliteStore;
use crate::error::StoreError;
use crate::ports::RequestLogStore;

#[async_trait]
impl RequestLogStore for SqliteStore {
    async fn record(&self, log: &RequestLog, at: DateTime<Utc>) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO request_logs
             (method, path, query, status, latency_ms, ip, user_agent, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                log.method,
                log.path,
                log.query,
                log.status,
                log.latency_ms as i64,
                log.ip,
                log.user_agent,
                at
            ],
        )
        .map_err(StoreError::from)?;
        Ok(())
    }
}
