//! Drive store adapter.
//!
//! Read-only queries over upstream drive rows, enriched with resolved address
//! text, the engine-owned classification, group membership and comment. The write
//! surface is the per-drive classification upsert and drive comments.

use rusqlite::{Connection, OptionalExtension, Row, params, params_from_iter};

use super::placeholders;
use crate::error::Result;
use crate::range::DateRange;
use crate::types::{Car, CarId, Classification, Drive, DriveId, utc_from_unix};

const DRIVE_SELECT: &str = "
    SELECT
        d.id, d.car_id, d.start_date, d.end_date, d.duration_min, d.distance,
        CAST(ROUND(d.start_km) AS INTEGER), CAST(ROUND(d.end_km) AS INTEGER),
        sg.name, sa.name, sa.road, sa.house_number, sa.city,
        eg.name, ea.name, ea.road, ea.house_number, ea.city,
        c.classification,
        (SELECT MIN(m.group_id) FROM grouped_drive_members m WHERE m.drive_id = d.id),
        dc.comment
    FROM drives d
    LEFT JOIN addresses sa ON sa.id = d.start_address_id
    LEFT JOIN addresses ea ON ea.id = d.end_address_id
    LEFT JOIN geofences sg ON sg.id = d.start_geofence_id
    LEFT JOIN geofences eg ON eg.id = d.end_geofence_id
    LEFT JOIN classifications c ON c.drive_id = d.id
    LEFT JOIN drive_comments dc ON dc.drive_id = d.id";

/// Display text for one end of a drive.
///
/// A named geofence wins. Otherwise the address name (or "road house_number")
/// and the city are joined with ", ", skipping empty parts.
pub fn resolve_address(
    geofence: Option<&str>,
    name: Option<&str>,
    road: Option<&str>,
    house_number: Option<&str>,
    city: Option<&str>,
) -> String {
    if let Some(geofence) = geofence.filter(|g| !g.is_empty()) {
        return geofence.to_string();
    }

    fn non_empty(s: Option<&str>) -> Option<&str> {
        s.filter(|s| !s.is_empty())
    }

    let street = [non_empty(road), non_empty(house_number)]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" ");
    let place = non_empty(name).map(str::to_string).or_else(|| {
        if street.is_empty() {
            None
        } else {
            Some(street)
        }
    });

    [place, non_empty(city).map(str::to_string)]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(", ")
}

fn address_at(row: &Row, first: usize) -> rusqlite::Result<String> {
    let geofence: Option<String> = row.get(first)?;
    let name: Option<String> = row.get(first + 1)?;
    let road: Option<String> = row.get(first + 2)?;
    let house_number: Option<String> = row.get(first + 3)?;
    let city: Option<String> = row.get(first + 4)?;
    Ok(resolve_address(
        geofence.as_deref(),
        name.as_deref(),
        road.as_deref(),
        house_number.as_deref(),
        city.as_deref(),
    ))
}

fn map_drive_row(row: &Row) -> rusqlite::Result<Drive> {
    Ok(Drive {
        id: row.get(0)?,
        car_id: row.get(1)?,
        start_date: utc_from_unix(row.get(2)?)?,
        end_date: utc_from_unix(row.get(3)?)?,
        duration_min: row.get(4)?,
        distance: row.get(5)?,
        start_odometer: row.get(6)?,
        end_odometer: row.get(7)?,
        start_address: address_at(row, 8)?,
        end_address: address_at(row, 13)?,
        classification: row.get(18)?,
        group_id: row.get(19)?,
        comment: row.get(20)?,
    })
}

/// Drives of `car_id` starting inside `range`, newest first.
pub fn drives_in_range(conn: &Connection, car_id: CarId, range: &DateRange) -> Result<Vec<Drive>> {
    let sql = format!(
        "{} WHERE d.car_id = ?1 AND d.start_date >= ?2 AND d.start_date < ?3
         ORDER BY d.start_date DESC",
        DRIVE_SELECT
    );
    let mut stmt = conn.prepare_cached(&sql)?;
    let drives = stmt
        .query_map(
            params![car_id, range.start_timestamp(), range.end_timestamp()],
            map_drive_row,
        )?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(drives)
}

pub fn drive_by_id(conn: &Connection, id: DriveId) -> Result<Option<Drive>> {
    let sql = format!("{} WHERE d.id = ?1", DRIVE_SELECT);
    let drive = conn
        .prepare_cached(&sql)?
        .query_row(params![id], map_drive_row)
        .optional()?;
    Ok(drive)
}

/// The named drives that exist, ordered by start time.
///
/// Drives sharing a start time keep the order in which the store returned them.
pub fn drives_by_ids(conn: &Connection, ids: &[DriveId]) -> Result<Vec<Drive>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let sql = format!(
        "{} WHERE d.id IN ({}) ORDER BY d.start_date ASC",
        DRIVE_SELECT,
        placeholders(ids.len())
    );
    let mut stmt = conn.prepare(&sql)?;
    let drives = stmt
        .query_map(params_from_iter(ids.iter()), map_drive_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(drives)
}

/// Insert-or-overwrite `classification` for every named drive that exists.
/// Returns the number of drives written.
pub fn upsert_classification(
    conn: &Connection,
    ids: &[DriveId],
    classification: Classification,
) -> Result<usize> {
    let mut stmt = conn.prepare_cached(
        "INSERT INTO classifications (drive_id, classification)
         SELECT id, ?2 FROM drives WHERE id = ?1
         ON CONFLICT(drive_id) DO UPDATE SET classification = excluded.classification",
    )?;
    let mut written = 0;
    for id in ids {
        written += stmt.execute(params![id, classification])?;
    }
    Ok(written)
}

/// Current per-drive classifications, in the order of `ids`.
pub fn classifications_of(
    conn: &Connection,
    ids: &[DriveId],
) -> Result<Vec<Option<Classification>>> {
    let mut stmt =
        conn.prepare_cached("SELECT classification FROM classifications WHERE drive_id = ?1")?;
    ids.iter()
        .map(|id| {
            stmt.query_row(params![id], |row| row.get(0))
                .optional()
                .map_err(Into::into)
        })
        .collect()
}

pub fn cars(conn: &Connection) -> Result<Vec<Car>> {
    let mut stmt = conn.prepare_cached("SELECT id, model, name FROM cars ORDER BY id ASC")?;
    let cars = stmt
        .query_map([], |row| {
            Ok(Car {
                id: row.get(0)?,
                model: row.get(1)?,
                name: row.get(2)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(cars)
}

/// First and last calendar year with any drive start, across all cars.
pub fn year_span(conn: &Connection) -> Result<Option<(i32, i32)>> {
    use chrono::Datelike;

    let bounds: (Option<i64>, Option<i64>) = conn.query_row(
        "SELECT MIN(start_date), MAX(start_date) FROM drives",
        [],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;
    match bounds {
        (Some(first), Some(last)) => Ok(Some((
            utc_from_unix(first)?.year(),
            utc_from_unix(last)?.year(),
        ))),
        _ => Ok(None),
    }
}

/// Set or clear (empty text) the comment on a drive.
pub fn set_drive_comment(conn: &Connection, id: DriveId, comment: &str) -> Result<()> {
    let comment = comment.trim();
    if comment.is_empty() {
        conn.execute("DELETE FROM drive_comments WHERE drive_id = ?1", params![id])?;
    } else {
        conn.execute(
            "INSERT INTO drive_comments (drive_id, comment) VALUES (?1, ?2)
             ON CONFLICT(drive_id) DO UPDATE SET comment = excluded.comment",
            params![id, comment],
        )?;
    }
    Ok(())
}

pub fn drive_comment(conn: &Connection, id: DriveId) -> Result<Option<String>> {
    let comment = conn
        .query_row(
            "SELECT comment FROM drive_comments WHERE drive_id = ?1",
            params![id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(comment)
}
