use rusqlite::{Connection, Result};

/// Create every table the service needs. Idempotent: safe on every startup.
pub fn init_db(conn: &Connection) -> Result<()> {
    create_people_tables(conn)?;
    create_schedule_tables(conn)?;
    create_attendance_table(conn)?;
    create_auth_clients_table(conn)?;
    create_request_logs_table(conn)?;
    Ok(())
}

fn create_people_tables(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS caregivers (
            id          TEXT PRIMARY KEY NOT NULL,
            name        TEXT NOT NULL,
            email       TEXT NOT NULL UNIQUE,
            created_at  TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS clients (
            id          TEXT PRIMARY KEY NOT NULL,
            full_name   TEXT NOT NULL,
            email       TEXT NOT NULL DEFAULT '',
            phone       TEXT NOT NULL DEFAULT '',
            address     TEXT NOT NULL DEFAULT '',
            city        TEXT NOT NULL DEFAULT '',
            state       TEXT NOT NULL DEFAULT '',
            postal      TEXT NOT NULL DEFAULT '',
            latitude    REAL NOT NULL DEFAULT 0,
            longitude   REAL NOT NULL DEFAULT 0
        );",
    )
}

fn create_schedule_tables(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schedules (
            id              TEXT PRIMARY KEY NOT NULL,
            caregiver_id    TEXT NOT NULL REFERENCES caregivers(id),
            client_id       TEXT NOT NULL REFERENCES clients(id),
            service_name    TEXT NOT NULL,
            location_label  TEXT NOT NULL DEFAULT '',
            start_time      TEXT NOT NULL,
            end_time        TEXT NOT NULL,
            status          TEXT NOT NULL DEFAULT 'scheduled',
            clock_in_at     TEXT,
            clock_in_lat    REAL,
            clock_in_long   REAL,
            clock_out_at    TEXT,
            clock_out_lat   REAL,
            clock_out_long  REAL,
            notes           TEXT,
            created_at      TEXT NOT NULL,
            updated_at      TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_schedules_caregiver_start
            ON schedules(caregiver_id, start_time);

        CREATE TABLE IF NOT EXISTS schedule_tasks (
            id                    TEXT PRIMARY KEY NOT NULL,
            schedule_id           TEXT NOT NULL REFERENCES schedules(id),
            title                 TEXT NOT NULL,
            description           TEXT NOT NULL DEFAULT '',
            status                TEXT NOT NULL DEFAULT 'pending',
            not_completed_reason  TEXT,
            sort_order            INTEGER NOT NULL DEFAULT 0,
            created_at            TEXT NOT NULL,
            updated_at            TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_schedule_tasks_schedule
            ON schedule_tasks(schedule_id, sort_order);",
    )
}

fn create_attendance_table(conn: &Connection) -> Result<()> {
    // One clock_in and one clock_out per caregiver per local day. The guard
    // in the attendance tracker is a read-then-write; this closes the race.
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS logs_caregivers (
            id            TEXT PRIMARY KEY NOT NULL,
            caregiver_id  TEXT NOT NULL REFERENCES caregivers(id),
            log_type      TEXT NOT NULL,
            latitude      REAL NOT NULL,
            longitude     REAL NOT NULL,
            timestamp     TEXT NOT NULL,
            log_day       TEXT NOT NULL,
            notes         TEXT,
            created_at    TEXT NOT NULL,
            UNIQUE(caregiver_id, log_type, log_day)
        );

        CREATE INDEX IF NOT EXISTS idx_logs_caregivers_time
            ON logs_caregivers(caregiver_id, timestamp);",
    )
}

fn create_auth_clients_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS auth_clients (
            client_id     TEXT PRIMARY KEY NOT NULL,
            secret_hash   TEXT NOT NULL,
            description   TEXT NOT NULL DEFAULT '',
            caregiver_id  TEXT NOT NULL REFERENCES caregivers(id),
            scopes        TEXT NOT NULL DEFAULT '[]',  -- JSON array
            created_at    TEXT NOT NULL
        );",
    )
}

fn create_request_logs_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS request_logs (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            method      TEXT NOT NULL,
            path        TEXT NOT NULL,
            query       TEXT NOT NULL DEFAULT '',
            status      INTEGER NOT NULL,
            latency_ms  INTEGER NOT NULL,
            ip          TEXT NOT NULL DEFAULT '',
            user_agent  TEXT NOT NULL DEFAULT '',
            created_at  TEXT NOT NULL
        );",
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        init_db(&conn).unwrap();
        init_db(&conn).unwrap();
        let tables: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table'
                 AND name IN ('caregivers', 'clients', 'schedules', 'schedule_tasks',
                              'logs_caregivers', 'auth_clients', 'request_logs')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tables, 7);
    }
}
