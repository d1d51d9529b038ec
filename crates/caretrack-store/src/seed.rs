//! Row writers for records the service itself never creates (caregivers,
//! clients, schedules, auth clients) plus a small demo data set.

use caretrack_core::types::{
    new_id, AuthClient, Caregiver, Client, Schedule, ScheduleStatus, TaskDraft,
};
use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, Connection};
use sha2::{Digest, Sha256};
use tracing::info;

use crate::error::Result;
use crate::sqlite::tasks::insert_task;

pub const DEMO_CAREGIVER_ID: &str = "cg-demo";
pub const DEMO_CLIENT_ID: &str = "caretrack-mobile";
pub const DEMO_CLIENT_SECRET: &str = "demo-secret";

pub fn insert_caregiver(conn: &Connection, caregiver: &Caregiver, at: DateTime<Utc>) -> Result<()> {
    conn.execute(
        "INSERT INTO caregivers (id, name, email, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![caregiver.id, caregiver.name, caregiver.email, at],
    )?;
    Ok(())
}

pub fn insert_client(conn: &Connection, client: &Client) -> Result<()> {
    conn.execute(
        "INSERT INTO clients
         (id, full_name, email, phone, address, city, state, postal, latitude, longitude)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            client.id,
            client.full_name,
            client.email,
            client.phone,
            client.address,
            client.city,
            client.state,
            client.postal,
            client.latitude,
            client.longitude
        ],
    )?;
    Ok(())
}

/// Insert the schedule row. The client must already exist; tasks are
/// written separately.
pub fn insert_schedule(conn: &Connection, schedule: &Schedule) -> Result<()> {
    let (clock_in_at, clock_in_lat, clock_in_long) = match schedule.clock_in {
        Some(m) => (Some(m.at), Some(m.point.latitude), Some(m.point.longitude)),
        None => (None, None, None),
    };
    let (clock_out_at, clock_out_lat, clock_out_long) = match schedule.clock_out {
        Some(m) => (Some(m.at), Some(m.point.latitude), Some(m.point.longitude)),
        None => (None, None, None),
    };
    conn.execute(
        "INSERT INTO schedules
         (id, caregiver_id, client_id, service_name, location_label, start_time, end_time,
          status, clock_in_at, clock_in_lat, clock_in_long,
          clock_out_at, clock_out_lat, clock_out_long, notes, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)",
        params![
            schedule.id,
            schedule.caregiver_id,
            schedule.client.id,
            schedule.service_name,
            schedule.location_label,
            schedule.start_time,
            schedule.end_time,
            schedule.status.as_str(),
            clock_in_at,
            clock_in_lat,
            clock_in_long,
            clock_out_at,
            clock_out_lat,
            clock_out_long,
            schedule.notes,
            schedule.created_at,
            schedule.updated_at
        ],
    )?;
    Ok(())
}

pub fn insert_auth_client(conn: &Connection, client: &AuthClient, at: DateTime<Utc>) -> Result<()> {
    let scopes = serde_json::to_string(&client.scopes).unwrap_or_else(|_| "[]".to_string());
    conn.execute(
        "INSERT INTO auth_clients
         (client_id, secret_hash, description, caregiver_id, scopes, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            client.id,
            client.secret_hash,
            client.description,
            client.caregiver_id,
            scopes,
            at
        ],
    )?;
    Ok(())
}

/// Lowercase hex SHA-256, the non-argon2 stored secret format.
pub fn sha256_hex(secret: &str) -> String {
    hex::encode(Sha256::digest(secret.as_bytes()))
}

/// Load one caregiver, one auth client and a day of visits around `now`.
///
/// Skipped when the demo caregiver already exists, so repeated
/// `--seed-demo` runs are harmless.
pub fn insert_demo(conn: &Connection, now: DateTime<Utc>) -> Result<bool> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM caregivers WHERE id = ?1)",
        params![DEMO_CAREGIVER_ID],
        |row| row.get(0),
    )?;
    if exists {
        return Ok(false);
    }

    insert_caregiver(
        conn,
        &Caregiver {
            id: DEMO_CAREGIVER_ID.to_string(),
            name: "Dana Demo".to_string(),
            email: "dana@caretrack.local".to_string(),
        },
        now,
    )?;
    insert_auth_client(
        conn,
        &AuthClient {
            id: DEMO_CLIENT_ID.to_string(),
            secret_hash: sha256_hex(DEMO_CLIENT_SECRET),
            description: "Demo mobile client".to_string(),
            caregiver_id: DEMO_CAREGIVER_ID.to_string(),
            scopes: vec![
                "schedules:read".to_string(),
                "schedules:write".to_string(),
                "attendance:write".to_string(),
            ],
        },
        now,
    )?;

    let clients = [
        ("Margaret Hale", "12 Elm Street", "Portland", 45.5231, -122.6765),
        ("Tom Becker", "88 Harbor Road", "Portland", 45.5122, -122.6587),
        ("Rosa Diaz", "4 Orchard Lane", "Beaverton", 45.4871, -122.8037),
    ];
    let plan = [
        (-3, ScheduleStatus::Completed, "Morning routine"),
        (-1, ScheduleStatus::Missed, "Medication check"),
        (2, ScheduleStatus::Scheduled, "Afternoon companionship"),
    ];

    for ((name, address, city, lat, long), (hours, status, service)) in clients.iter().zip(plan) {
        let client = Client {
            id: new_id(),
            full_name: name.to_string(),
            email: String::new(),
            phone: String::new(),
            address: address.to_string(),
            city: city.to_string(),
            state: "OR".to_string(),
            postal: String::new(),
            latitude: *lat,
            longitude: *long,
        };
        insert_client(conn, &client)?;

        let start = now + Duration::hours(hours);
        let schedule = Schedule {
            id: new_id(),
            caregiver_id: DEMO_CAREGIVER_ID.to_string(),
            location_label: format!("{address}, {city}"),
            client,
            service_name: service.to_string(),
            start_time: start,
            end_time: start + Duration::hours(1),
            status,
            clock_in: None,
            clock_out: None,
            notes: None,
            created_at: now,
            updated_at: now,
            tasks: Vec::new(),
        };
        insert_schedule(conn, &schedule)?;

        for (order, title) in ["Check vitals", "Prepare meal", "Light housekeeping"]
            .into_iter()
            .enumerate()
        {
            let draft = TaskDraft {
                schedule_id: schedule.id.clone(),
                sort_order: order as i32,
                ..TaskDraft::titled(title)
            };
            insert_task(conn, &new_id(), &draft, now)?;
        }
    }

    info!(caregiver_id = DEMO_CAREGIVER_ID, client_id = DEMO_CLIENT_ID, "demo data seeded");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_db;
    use chrono::TimeZone;

    #[test]
    fn demo_seed_runs_once() {
        let conn = Connection::open_in_memory().unwrap();
        init_db(&conn).unwrap();
        let now = Utc.with_ymd_and_hms(2025, 1, 15, 9, 0, 0).unwrap();

        assert!(insert_demo(&conn, now).unwrap());
        assert!(!insert_demo(&conn, now).unwrap());

        let schedules: i64 = conn
            .query_row("SELECT COUNT(*) FROM schedules", [], |r| r.get(0))
            .unwrap();
        let tasks: i64 = conn
            .query_row("SELECT COUNT(*) FROM schedule_tasks", [], |r| r.get(0))
            .unwrap();
        assert_eq!(schedules, 3);
        assert_eq!(tasks, 9);
    }

    #[test]
    fn sha256_hex_is_lowercase() {
        assert_eq!(
            sha256_hex("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
