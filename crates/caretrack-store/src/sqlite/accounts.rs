use async_trait::async_trait;
use caretrack_core::types::{AuthClient, Caregiver};
use caretrack_core::{CareError, Result};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::SqliteStore;
use crate::error::StoreError;
use crate::ports::{AuthClientStore, CaregiverStore};

fn row_to_caregiver(row: &Row<'_>) -> rusqlite::Result<Caregiver> {
    Ok(Caregiver {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
    })
}

fn row_to_auth_client(row: &Row<'_>) -> rusqlite::Result<AuthClient> {
    let raw_scopes: String = row.get(4)?;
    let scopes: Vec<String> = serde_json::from_str(&raw_scopes)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(e)))?;
    Ok(AuthClient {
        id: row.get(0)?,
        secret_hash: row.get(1)?,
        description: row.get(2)?,
        caregiver_id: row.get(3)?,
        scopes,
    })
}

pub(crate) fn find_caregiver(conn: &Connection, id: &str) -> rusqlite::Result<Option<Caregiver>> {
    conn.query_row(
        "SELECT id, name, email FROM caregivers WHERE id = ?1",
        params![id],
        row_to_caregiver,
    )
    .optional()
}

pub(crate) fn find_auth_client(
    conn: &Connection,
    client_id: &str,
) -> rusqlite::Result<Option<AuthClient>> {
    conn.query_row(
        "SELECT client_id, secret_hash, description, caregiver_id, scopes
         FROM auth_clients WHERE client_id = ?1",
        params![client_id],
        row_to_auth_client,
    )
    .optional()
}

#[async_trait]
impl CaregiverStore for SqliteStore {
    async fn get(&self, id: &str) -> Result<Caregiver> {
        let conn = self.lock()?;
        find_caregiver(&conn, id)
            .map_err(StoreError::from)?
            .ok_or(CareError::NotFound)
    }
}

#[async_trait]
impl AuthClientStore for SqliteStore {
    async fn find(&self, client_id: &str) -> Result<Option<AuthClient>> {
        let conn = self.lock()?;
        Ok(find_auth_client(&conn, client_id).map_err(StoreError::from)?)
    }
}
