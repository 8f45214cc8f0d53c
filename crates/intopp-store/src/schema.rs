use rusqlite::Connection;

use crate::error::Result;

pub const SCHEMA_VERSION: i64 = 1;

/// Create the base tables and set connection pragmas. Idempotent — safe to
/// run on every open. Derived tables (ring, ring_total, motion_exchange) are
/// dropped and rebuilt by the operations that own them; they are created here
/// only so a fresh database can be inspected before any run.
pub fn initialize(conn: &Connection) -> Result<()> {
    conn.execute_batch("PRAGMA journal_mode = WAL;")?;
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.pragma_update(None, "busy_timeout", 5000)?;

    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS metadata (
            key   TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS od_point (
            id          INTEGER PRIMARY KEY,
            description TEXT
        );

        CREATE TABLE IF NOT EXISTS od_value (
            od_id INTEGER NOT NULL REFERENCES od_point(id),
            name  TEXT NOT NULL,
            value REAL NOT NULL,
            PRIMARY KEY (od_id, name)
        );

        CREATE TABLE IF NOT EXISTS distance (
            od_start_id INTEGER NOT NULL REFERENCES od_point(id),
            od_end_id   INTEGER NOT NULL REFERENCES od_point(id),
            distance    REAL NOT NULL,
            PRIMARY KEY (od_start_id, od_end_id)
        );

        CREATE INDEX IF NOT EXISTS idx_distance_start ON distance(od_start_id, distance);
        ",
    )?;

    create_model_parameters(conn)?;
    create_ring(conn, false)?;
    create_ring_layout(conn, false)?;
    create_ring_total(conn, false)?;
    create_motion_exchange(conn, false)?;

    conn.execute(
        "INSERT OR REPLACE INTO metadata (key, value) VALUES ('schema_version', ?1)",
        [SCHEMA_VERSION.to_string()],
    )?;

    Ok(())
}

pub fn create_model_parameters(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS model_parameters (
            od_id                 INTEGER PRIMARY KEY REFERENCES od_point(id),
            origins               REAL NOT NULL DEFAULT 0,
            destinations          REAL NOT NULL DEFAULT 0,
            selectivity           REAL NOT NULL DEFAULT 0,
            convolution_start     REAL NOT NULL DEFAULT 0,
            convolution_size      REAL NOT NULL DEFAULT 0,
            convolution_intensity REAL NOT NULL DEFAULT 0
        );
        ",
    )?;
    Ok(())
}

/// Ring membership: which destination falls in which distance-ordered bucket
/// of an origin. Derived — `fresh` drops any previous build.
pub fn create_ring(conn: &Connection, fresh: bool) -> Result<()> {
    if fresh {
        conn.execute_batch("DROP TABLE IF EXISTS ring;")?;
    }
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS ring (
            od_start_id INTEGER NOT NULL,
            od_end_id   INTEGER NOT NULL,
            ring        INTEGER NOT NULL,
            PRIMARY KEY (od_start_id, od_end_id)
        );
        CREATE INDEX IF NOT EXISTS idx_ring_bucket ON ring(od_start_id, ring);
        ",
    )?;
    Ok(())
}

pub fn create_ring_layout(conn: &Connection, fresh: bool) -> Result<()> {
    if fresh {
        conn.execute_batch("DROP TABLE IF EXISTS ring_layout;")?;
    }
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS ring_layout (
            od_id            INTEGER NOT NULL,
            ring             INTEGER NOT NULL,
            ring_size        REAL NOT NULL,
            prior_rings_size REAL NOT NULL,
            PRIMARY KEY (od_id, ring)
        );
        ",
    )?;
    Ok(())
}

pub fn create_ring_total(conn: &Connection, fresh: bool) -> Result<()> {
    if fresh {
        conn.execute_batch("DROP TABLE IF EXISTS ring_total;")?;
    }
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS ring_total (
            od_id              INTEGER NOT NULL,
            ring               INTEGER NOT NULL,
            destinations_in    REAL NOT NULL,
            destinations_prior REAL NOT NULL,
            PRIMARY KEY (od_id, ring)
        );
        ",
    )?;
    Ok(())
}

pub fn create_motion_exchange(conn: &Connection, fresh: bool) -> Result<()> {
    if fresh {
        conn.execute_batch(
            "DROP TABLE IF EXISTS motion_exchange;
             DROP TABLE IF EXISTS motion_exchange_fraction;",
        )?;
    }
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS motion_exchange (
            od_start_id     INTEGER NOT NULL,
            od_end_id       INTEGER NOT NULL,
            motion_exchange REAL NOT NULL,
            PRIMARY KEY (od_start_id, od_end_id)
        );
        CREATE TABLE IF NOT EXISTS motion_exchange_fraction (
            od_start_id INTEGER NOT NULL,
            od_end_id   INTEGER NOT NULL,
            fraction    REAL NOT NULL,
            PRIMARY KEY (od_start_id, od_end_id)
        );
        ",
    )?;
    Ok(())
}

pub fn get_schema_version(conn: &Connection) -> Result<Option<i64>> {
    let mut stmt = conn.prepare("SELECT value FROM metadata WHERE key = 'schema_version'")?;
    let version = stmt
        .query_row([], |row| {
            let v: String = row.get(0)?;
            Ok(v.parse::<i64>().unwrap_or(0))
        })
        .ok();
    Ok(version)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initialize_creates_tables() {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();

        for table in &[
            "od_point",
            "od_value",
            "distance",
            "model_parameters",
            "ring",
            "ring_layout",
            "ring_total",
            "motion_exchange",
            "motion_exchange_fraction",
        ] {
            let count: i64 = conn
                .query_row(&format!("SELECT count(*) FROM {table}"), [], |row| {
                    row.get(0)
                })
                .unwrap();
            assert!(count >= 0, "table {table} should exist");
        }
    }

    #[test]
    fn test_idempotent_initialize() {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        initialize(&conn).unwrap();
    }

    #[test]
    fn test_schema_version_set() {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        assert_eq!(get_schema_version(&conn).unwrap(), Some(SCHEMA_VERSION));
    }

    #[test]
    fn test_fresh_create_drops_rows() {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();

        conn.execute("INSERT INTO ring VALUES (1, 2, 0)", []).unwrap();
        create_ring(&conn, true).unwrap();

        let count: i64 = conn
            .query_row("SELECT count(*) FROM ring", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }
}
