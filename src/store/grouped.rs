//! Grouped-drive store adapter.
//!
//! CRUD over aggregate rows in `grouped_drives` and their member list in
//! `grouped_drive_members`. The store does not enforce that a drive belongs to
//! at most one group; `grouping::group` checks that before inserting.

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params, params_from_iter};

use super::placeholders;
use crate::error::Result;
use crate::range::DateRange;
use crate::types::{CarId, Classification, DriveId, GroupId, GroupedDrive, utc_from_unix};

const GROUP_SELECT: &str = "
    SELECT
        g.id, g.car_id, g.start_date, g.end_date, g.start_address, g.end_address,
        g.distance, g.duration_min, g.classification, g.comment,
        (SELECT CAST(ROUND(MIN(d.start_km)) AS INTEGER)
         FROM grouped_drive_members m JOIN drives d ON d.id = m.drive_id
         WHERE m.group_id = g.id),
        (SELECT CAST(ROUND(MAX(d.end_km)) AS INTEGER)
         FROM grouped_drive_members m JOIN drives d ON d.id = m.drive_id
         WHERE m.group_id = g.id)
    FROM grouped_drives g";

/// Folded values for a group that is about to be inserted.
#[derive(Debug, Clone, PartialEq)]
pub struct NewGroupedDrive {
    pub car_id: CarId,
    /// Member ids, ordered by member start time
    pub drive_ids: Vec<DriveId>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub start_address: String,
    pub end_address: String,
    pub distance: f64,
    pub duration_min: i64,
    pub start_odometer: i64,
    pub end_odometer: i64,
    pub classification: Option<Classification>,
}

fn map_group_row(row: &Row) -> rusqlite::Result<GroupedDrive> {
    Ok(GroupedDrive {
        id: row.get(0)?,
        car_id: row.get(1)?,
        drive_ids: Vec::new(), // filled from grouped_drive_members
        start_date: utc_from_unix(row.get(2)?)?,
        end_date: utc_from_unix(row.get(3)?)?,
        start_address: row.get(4)?,
        end_address: row.get(5)?,
        distance: row.get(6)?,
        duration_min: row.get(7)?,
        classification: row.get(8)?,
        comment: row.get(9)?,
        start_odometer: row.get::<_, Option<i64>>(10)?.unwrap_or(0),
        end_odometer: row.get::<_, Option<i64>>(11)?.unwrap_or(0),
    })
}

fn attach_members(conn: &Connection, groups: &mut [GroupedDrive]) -> Result<()> {
    let mut stmt = conn.prepare_cached(
        "SELECT drive_id FROM grouped_drive_members WHERE group_id = ?1 ORDER BY position ASC",
    )?;
    for group in groups.iter_mut() {
        group.drive_ids = stmt
            .query_map(params![group.id], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
    }
    Ok(())
}

/// Persist a new aggregate and its member list. Returns the new group id.
pub fn insert(conn: &Connection, group: &NewGroupedDrive) -> Result<GroupId> {
    conn.execute(
        "INSERT INTO grouped_drives
            (car_id, start_date, end_date, start_address, end_address, distance, duration_min, classification)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            group.car_id,
            group.start_date.timestamp(),
            group.end_date.timestamp(),
            group.start_address,
            group.end_address,
            group.distance,
            group.duration_min,
            group.classification,
        ],
    )?;
    let id = conn.last_insert_rowid();

    let mut stmt = conn.prepare_cached(
        "INSERT INTO grouped_drive_members (group_id, drive_id, position) VALUES (?1, ?2, ?3)",
    )?;
    for (position, drive_id) in group.drive_ids.iter().enumerate() {
        stmt.execute(params![id, drive_id, position as i64])?;
    }

    Ok(id)
}

/// Delete the named groups and their member rows. Unknown ids are ignored.
/// Returns the number of groups deleted.
pub fn delete(conn: &Connection, ids: &[GroupId]) -> Result<usize> {
    if ids.is_empty() {
        return Ok(0);
    }
    let list = placeholders(ids.len());
    conn.execute(
        &format!("DELETE FROM grouped_drive_members WHERE group_id IN ({})", list),
        params_from_iter(ids.iter()),
    )?;
    let deleted = conn.execute(
        &format!("DELETE FROM grouped_drives WHERE id IN ({})", list),
        params_from_iter(ids.iter()),
    )?;
    Ok(deleted)
}

/// Overwrite the denormalized classification of the named groups.
pub fn update_classification(
    conn: &Connection,
    ids: &[GroupId],
    classification: Option<Classification>,
) -> Result<usize> {
    let mut stmt =
        conn.prepare_cached("UPDATE grouped_drives SET classification = ?2 WHERE id = ?1")?;
    let mut updated = 0;
    for id in ids {
        updated += stmt.execute(params![id, classification])?;
    }
    Ok(updated)
}

/// Member drive ids of the named groups. Unknown group ids contribute nothing.
pub fn member_drive_ids(conn: &Connection, group_ids: &[GroupId]) -> Result<Vec<DriveId>> {
    if group_ids.is_empty() {
        return Ok(Vec::new());
    }
    let sql = format!(
        "SELECT drive_id FROM grouped_drive_members WHERE group_id IN ({})
         ORDER BY group_id ASC, position ASC",
        placeholders(group_ids.len())
    );
    let mut stmt = conn.prepare(&sql)?;
    let ids = stmt
        .query_map(params_from_iter(group_ids.iter()), |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(ids)
}

/// `(drive_id, group_id)` for every named drive that is already a group member.
pub fn memberships(conn: &Connection, drive_ids: &[DriveId]) -> Result<Vec<(DriveId, GroupId)>> {
    if drive_ids.is_empty() {
        return Ok(Vec::new());
    }
    let sql = format!(
        "SELECT drive_id, group_id FROM grouped_drive_members WHERE drive_id IN ({})
         ORDER BY drive_id ASC",
        placeholders(drive_ids.len())
    );
    let mut stmt = conn.prepare(&sql)?;
    let pairs = stmt
        .query_map(params_from_iter(drive_ids.iter()), |row| {
            Ok((row.get(0)?, row.get(1)?))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(pairs)
}

pub fn grouped_drive_by_id(conn: &Connection, id: GroupId) -> Result<Option<GroupedDrive>> {
    let sql = format!("{} WHERE g.id = ?1", GROUP_SELECT);
    let group = conn
        .prepare_cached(&sql)?
        .query_row(params![id], map_group_row)
        .optional()?;
    match group {
        Some(mut group) => {
            attach_members(conn, std::slice::from_mut(&mut group))?;
            Ok(Some(group))
        }
        None => Ok(None),
    }
}

/// Groups of `car_id` starting inside `range`, oldest first.
pub fn grouped_drives_in_range(
    conn: &Connection,
    car_id: CarId,
    range: &DateRange,
) -> Result<Vec<GroupedDrive>> {
    let sql = format!(
        "{} WHERE g.car_id = ?1 AND g.start_date >= ?2 AND g.start_date < ?3
         ORDER BY g.start_date ASC",
        GROUP_SELECT
    );
    let mut groups = conn
        .prepare_cached(&sql)?
        .query_map(
            params![car_id, range.start_timestamp(), range.end_timestamp()],
            map_group_row,
        )?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    attach_members(conn, &mut groups)?;
    Ok(groups)
}

/// Set or clear (empty text) the comment on a group. Returns rows touched.
pub fn set_comment(conn: &Connection, id: GroupId, comment: &str) -> Result<usize> {
    let comment = comment.trim();
    let comment = if comment.is_empty() {
        None
    } else {
        Some(comment)
    };
    let updated = conn.execute(
        "UPDATE grouped_drives SET comment = ?2 WHERE id = ?1",
        params![id, comment],
    )?;
    Ok(updated)
}
