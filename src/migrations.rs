use log::info;
use rusqlite::Connection;
use rusqlite_migration::{M, Migrations};

/// Initial schema.
///
/// `cars`, `addresses`, `geofences` and `drives` are written by the upstream
/// vehicle-tracking ingestion and only read here. The remaining tables are owned
/// by the journal.
const SCHEMA_V1: &str = r#"
    CREATE TABLE IF NOT EXISTS cars (
        id INTEGER PRIMARY KEY,
        model TEXT,
        name TEXT
    );

    CREATE TABLE IF NOT EXISTS addresses (
        id INTEGER PRIMARY KEY,
        name TEXT,
        road TEXT,
        house_number TEXT,
        city TEXT
    );

    CREATE TABLE IF NOT EXISTS geofences (
        id INTEGER PRIMARY KEY,
        name TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS drives (
        id INTEGER PRIMARY KEY,
        car_id INTEGER NOT NULL REFERENCES cars(id),
        start_date INTEGER NOT NULL,
        end_date INTEGER NOT NULL,
        duration_min INTEGER NOT NULL,
        distance REAL NOT NULL,
        start_km REAL NOT NULL,
        end_km REAL NOT NULL,
        start_address_id INTEGER REFERENCES addresses(id),
        end_address_id INTEGER REFERENCES addresses(id),
        start_geofence_id INTEGER REFERENCES geofences(id),
        end_geofence_id INTEGER REFERENCES geofences(id),
        CHECK (end_date >= start_date)
    );

    CREATE INDEX IF NOT EXISTS idx_drives_car_start ON drives(car_id, start_date);

    -- One row per classified drive; absence means unclassified
    CREATE TABLE IF NOT EXISTS classifications (
        drive_id INTEGER PRIMARY KEY,
        classification INTEGER NOT NULL CHECK (classification IN (1, 2))
    );

    CREATE TABLE IF NOT EXISTS grouped_drives (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        car_id INTEGER NOT NULL,
        start_date INTEGER NOT NULL,
        end_date INTEGER NOT NULL,
        start_address TEXT NOT NULL,
        end_address TEXT NOT NULL,
        distance REAL NOT NULL,
        duration_min INTEGER NOT NULL,
        classification INTEGER CHECK (classification IN (1, 2)),
        comment TEXT
    );

    CREATE INDEX IF NOT EXISTS idx_grouped_drives_car_start
    ON grouped_drives(car_id, start_date);

    CREATE TABLE IF NOT EXISTS grouped_drive_members (
        group_id INTEGER NOT NULL,
        drive_id INTEGER NOT NULL,
        position INTEGER NOT NULL,
        PRIMARY KEY (group_id, drive_id),
        FOREIGN KEY (group_id) REFERENCES grouped_drives(id) ON DELETE CASCADE
    );

    CREATE INDEX IF NOT EXISTS idx_grouped_drive_members_drive
    ON grouped_drive_members(drive_id);
"#;

/// Free-text comments on individual drives.
const SCHEMA_V2: &str = r#"
    CREATE TABLE IF NOT EXISTS drive_comments (
        drive_id INTEGER PRIMARY KEY,
        comment TEXT NOT NULL
    );
"#;

/// GPS samples recorded upstream while a car is moving. A drive's trace is the
/// car's positions between its start and end.
const SCHEMA_V3: &str = r#"
    CREATE TABLE IF NOT EXISTS positions (
        id INTEGER PRIMARY KEY,
        car_id INTEGER NOT NULL REFERENCES cars(id),
        date INTEGER NOT NULL,
        latitude REAL NOT NULL,
        longitude REAL NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_positions_car_date ON positions(car_id, date);
"#;

fn migrations() -> Migrations<'static> {
    Migrations::new(vec![
        M::up(SCHEMA_V1),
        M::up(SCHEMA_V2),
        M::up(SCHEMA_V3),
    ])
}

/// Bring the schema up to date and enable foreign keys for this connection.
pub fn migrate(conn: &mut Connection) -> Result<(), rusqlite_migration::Error> {
    conn.pragma_update(None, "foreign_keys", "ON")?;

    let before: usize = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
    migrations().to_latest(conn)?;
    let after: usize = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;

    if after != before {
        info!("[Migrations] Schema migrated from version {} to {}", before, after);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_validate() {
        assert!(migrations().validate().is_ok());
    }

    #[test]
    fn test_migrate_is_idempotent() {
        let mut conn = Connection::open_in_memory().unwrap();
        migrate(&mut conn).unwrap();
        migrate(&mut conn).unwrap();

        let tables: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table'
                 AND name IN ('classifications', 'grouped_drives', 'grouped_drive_members', 'drive_comments', 'positions')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tables, 5);
    }

    #[test]
    fn test_foreign_keys_enabled() {
        let mut conn = Connection::open_in_memory().unwrap();
        migrate(&mut conn).unwrap();
        let enabled: i64 = conn
            .pragma_query_value(None, "foreign_keys", |row| row.get(0))
            .unwrap();
        assert_eq!(enabled, 1);
    }
}
