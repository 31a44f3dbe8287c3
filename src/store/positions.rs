//! Position store adapter: read-only access to upstream GPS samples.

use rusqlite::{Connection, params_from_iter};

use super::placeholders;
use crate::error::Result;
use crate::route::GpsPoint;
use crate::types::DriveId;

/// Positions of the named drives' cars recorded between each drive's start and
/// end, oldest first. Unknown drive ids contribute nothing.
pub fn positions_for_drives(conn: &Connection, drive_ids: &[DriveId]) -> Result<Vec<GpsPoint>> {
    if drive_ids.is_empty() {
        return Ok(Vec::new());
    }
    let sql = format!(
        "SELECT p.latitude, p.longitude
         FROM positions p
         JOIN drives d ON d.car_id = p.car_id
                      AND p.date BETWEEN d.start_date AND d.end_date
         WHERE d.id IN ({})
         ORDER BY p.date ASC, p.id ASC",
        placeholders(drive_ids.len())
    );
    let mut stmt = conn.prepare(&sql)?;
    let points = stmt
        .query_map(params_from_iter(drive_ids.iter()), |row| {
            Ok(GpsPoint::new(row.get(0)?, row.get(1)?))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(points)
}
