//! Shared fixtures: upstream rows that the ingestion side would normally write.

#![allow(dead_code)]

use chrono::{DateTime, Utc};
use drive_journal::DriveJournal;
use rusqlite::params;

pub fn journal() -> DriveJournal {
    let _ = env_logger::builder().is_test(true).try_init();
    let journal = DriveJournal::in_memory().expect("failed to open journal");
    seed_cars(&journal);
    journal
}

pub fn seed_cars(journal: &DriveJournal) {
    journal
        .connection()
        .execute_batch(
            "INSERT INTO cars (id, model, name) VALUES (1, 'Model 3', 'Daily'), (2, 'Model S', 'Weekend');
             INSERT INTO geofences (id, name) VALUES (1, 'Home'), (2, 'Office');
             INSERT INTO addresses (id, name, road, house_number, city)
             VALUES (1, NULL, 'Storgatan', '12', 'Lund'), (2, 'Central Station', NULL, NULL, 'Malmö');",
        )
        .expect("failed to seed cars");
}

/// Where a drive starts or ends.
#[derive(Clone, Copy)]
pub enum Place {
    Geofence(i64),
    Address(i64),
    Unknown,
}

impl Place {
    fn columns(self) -> (Option<i64>, Option<i64>) {
        match self {
            Place::Geofence(id) => (None, Some(id)),
            Place::Address(id) => (Some(id), None),
            Place::Unknown => (None, None),
        }
    }
}

#[allow(clippy::too_many_arguments)]
pub fn seed_drive_at(
    journal: &DriveJournal,
    id: i64,
    car_id: i64,
    start: &str,
    end: &str,
    distance: f64,
    from: Place,
    to: Place,
) {
    let start: DateTime<Utc> = start.parse().expect("bad start timestamp");
    let end: DateTime<Utc> = end.parse().expect("bad end timestamp");
    let start_km = 20_000.0 + id as f64 * 50.0;
    let (start_address, start_geofence) = from.columns();
    let (end_address, end_geofence) = to.columns();

    journal
        .connection()
        .execute(
            "INSERT INTO drives (id, car_id, start_date, end_date, duration_min, distance,
                                 start_km, end_km, start_address_id, end_address_id,
                                 start_geofence_id, end_geofence_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                id,
                car_id,
                start.timestamp(),
                end.timestamp(),
                (end - start).num_minutes(),
                distance,
                start_km,
                start_km + distance,
                start_address,
                end_address,
                start_geofence,
                end_geofence,
            ],
        )
        .expect("failed to seed drive");
}

pub fn seed_drive(journal: &DriveJournal, id: i64, start: &str, end: &str, distance: f64) {
    seed_drive_at(
        journal,
        id,
        1,
        start,
        end,
        distance,
        Place::Geofence(1),
        Place::Geofence(2),
    );
}

pub fn seed_position(journal: &DriveJournal, car_id: i64, date: &str, latitude: f64, longitude: f64) {
    let date: DateTime<Utc> = date.parse().expect("bad position timestamp");
    journal
        .connection()
        .execute(
            "INSERT INTO positions (car_id, date, latitude, longitude) VALUES (?1, ?2, ?3, ?4)",
            params![car_id, date.timestamp(), latitude, longitude],
        )
        .expect("failed to seed position");
}
