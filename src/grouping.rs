//! Grouping engine.
//!
//! Merges drives of one car into a single aggregate row and detaches them
//! again. Both directions run inside one transaction: the fold and the insert
//! (or the range lookup and the delete) either fully apply or not at all.
//! Member drives themselves are never modified.

use log::{debug, info};
use rusqlite::Connection;

use crate::error::{JournalError, Result};
use crate::range::{DateRange, affected_range};
use crate::store::dedup_ids;
use crate::store::drives::drives_by_ids;
use crate::store::grouped::{self, NewGroupedDrive};
use crate::types::{CarId, Classification, Drive, DriveId, GroupId, GroupedDrive};

/// Classification a group inherits from its members.
///
/// Only when every member carries the same value is that value returned; any
/// unclassified member, any disagreement, or no members at all give `None`.
pub fn consensus_classification<I>(values: I) -> Option<Classification>
where
    I: IntoIterator<Item = Option<Classification>>,
{
    let mut values = values.into_iter();
    let first = values.next()??;
    values.all(|v| v == Some(first)).then_some(first)
}

/// Fold member drives (of `car_id`) into the values of a new aggregate.
///
/// Members are ordered by start time; the start address comes from the first
/// member and the end address from the member that ends last. Members with
/// identical timestamps keep their incoming order, so which one wins is
/// implementation-defined. Returns `None` for an empty slice.
pub fn fold_members(car_id: CarId, members: &[Drive]) -> Option<NewGroupedDrive> {
    let mut ordered: Vec<&Drive> = members.iter().collect();
    ordered.sort_by_key(|d| d.start_date);

    let first = *ordered.first()?;
    let last = *ordered.iter().max_by_key(|d| d.end_date)?;

    Some(NewGroupedDrive {
        car_id,
        drive_ids: ordered.iter().map(|d| d.id).collect(),
        start_date: first.start_date,
        end_date: last.end_date,
        start_address: first.start_address.clone(),
        end_address: last.end_address.clone(),
        distance: ordered.iter().map(|d| d.distance).sum(),
        duration_min: ordered.iter().map(|d| d.duration_min).sum(),
        start_odometer: ordered.iter().map(|d| d.start_odometer).min()?,
        end_odometer: ordered.iter().map(|d| d.end_odometer).max()?,
        classification: consensus_classification(ordered.iter().map(|d| d.classification)),
    })
}

/// Merge `drive_ids` of `car_id` into a new grouped drive.
///
/// Fails with `InvalidRequest` when no ids are given or any id is unknown or
/// belongs to another car, and with `AlreadyGrouped` when a drive is already a
/// member of some group.
pub fn group(
    conn: &mut Connection,
    car_id: CarId,
    drive_ids: &[DriveId],
) -> Result<(GroupedDrive, DateRange)> {
    let ids = dedup_ids(drive_ids);
    if ids.is_empty() {
        return Err(JournalError::InvalidRequest(
            "cannot group drives: no drive ids specified".to_string(),
        ));
    }

    let tx = conn.transaction()?;

    let members = drives_by_ids(&tx, &ids)?;
    if members.len() != ids.len() {
        let missing: Vec<DriveId> = ids
            .iter()
            .copied()
            .filter(|id| !members.iter().any(|d| d.id == *id))
            .collect();
        return Err(JournalError::InvalidRequest(format!(
            "cannot group drives: unknown drive ids {:?}",
            missing
        )));
    }
    if let Some(foreign) = members.iter().find(|d| d.car_id != car_id) {
        return Err(JournalError::InvalidRequest(format!(
            "cannot group drives: drive {} belongs to car {}, not car {}",
            foreign.id, foreign.car_id, car_id
        )));
    }
    if let Some(&(drive_id, group_id)) = grouped::memberships(&tx, &ids)?.first() {
        return Err(JournalError::AlreadyGrouped { drive_id, group_id });
    }

    let new_group = fold_members(car_id, &members).ok_or_else(|| {
        JournalError::InvalidRequest("cannot group drives: no members".to_string())
    })?;
    let group_id = grouped::insert(&tx, &new_group)?;
    let range = affected_range(&tx, &ids, &[])?;

    tx.commit()?;

    info!(
        "[Grouping] Created grouped drive {} for car {} from {} drives ({} min, {:.1} km)",
        group_id,
        car_id,
        new_group.drive_ids.len(),
        new_group.duration_min,
        new_group.distance
    );

    let group = GroupedDrive {
        id: group_id,
        car_id,
        drive_ids: new_group.drive_ids,
        start_date: new_group.start_date,
        end_date: new_group.end_date,
        duration_min: new_group.duration_min,
        distance: new_group.distance,
        start_address: new_group.start_address,
        end_address: new_group.end_address,
        start_odometer: new_group.start_odometer,
        end_odometer: new_group.end_odometer,
        classification: new_group.classification,
        comment: None,
    };
    Ok((group, range))
}

/// Delete the named grouped drives. Member drives and their classifications stay.
///
/// The affected range is taken from the groups before they are deleted. Unknown
/// ids are a silent no-op for the delete; if none of the ids resolved, the
/// delete still commits and the result is `NoAffectedRange`.
pub fn ungroup(conn: &mut Connection, group_ids: &[GroupId]) -> Result<DateRange> {
    let ids = dedup_ids(group_ids);
    if ids.is_empty() {
        return Err(JournalError::InvalidRequest(
            "cannot ungroup drives: no grouped drive ids specified".to_string(),
        ));
    }

    let tx = conn.transaction()?;
    let range = affected_range(&tx, &[], &ids);
    let deleted = grouped::delete(&tx, &ids)?;
    tx.commit()?;

    if deleted > 0 {
        info!("[Grouping] Removed {} grouped drive(s) {:?}", deleted, ids);
    } else {
        debug!("[Grouping] Ungroup of {:?} matched no grouped drives", ids);
    }

    range
}
