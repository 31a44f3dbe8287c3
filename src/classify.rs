//! Classification engine.
//!
//! Classifications are always stored per drive. Classifying a group cascades
//! the value onto every member drive and also overwrites the group's
//! denormalized copy. That copy can drift from a strict per-member consensus;
//! `set_group_classification` and `recompute_group_classification` are the two
//! explicit ways of writing it.

use log::info;
use rusqlite::Connection;

use crate::error::{JournalError, Result};
use crate::grouping::consensus_classification;
use crate::range::{DateRange, affected_range};
use crate::store::dedup_ids;
use crate::store::drives::{classifications_of, upsert_classification};
use crate::store::grouped;
use crate::types::{Classification, DriveId, GroupId};

/// Apply `classification` to the named drives and to every member of the named
/// groups, then overwrite the named groups' own value.
///
/// Idempotent: repeating the call with the same value leaves the same state.
/// Returns the date range spanned by the named drives and groups.
pub fn classify(
    conn: &mut Connection,
    classification: Classification,
    drive_ids: &[DriveId],
    group_ids: &[GroupId],
) -> Result<DateRange> {
    let drive_ids = dedup_ids(drive_ids);
    let group_ids = dedup_ids(group_ids);

    let tx = conn.transaction()?;

    let mut targets = grouped::member_drive_ids(&tx, &group_ids)?;
    targets.extend_from_slice(&drive_ids);
    let targets = dedup_ids(&targets);
    if targets.is_empty() {
        return Err(JournalError::InvalidRequest(
            "cannot classify drives: no drive ids or grouped drive ids resolved".to_string(),
        ));
    }

    let written = upsert_classification(&tx, &targets, classification)?;
    if !group_ids.is_empty() {
        grouped::update_classification(&tx, &group_ids, Some(classification))?;
    }
    let range = affected_range(&tx, &drive_ids, &group_ids);

    tx.commit()?;

    info!(
        "[Classification] Marked {} drive(s) as {} ({} group(s))",
        written,
        classification.as_str(),
        group_ids.len()
    );

    range
}

/// Overwrite the stored classification of the named groups only. Member drives
/// are not touched. Returns the number of groups updated.
pub fn set_group_classification(
    conn: &mut Connection,
    group_ids: &[GroupId],
    classification: Option<Classification>,
) -> Result<usize> {
    let group_ids = dedup_ids(group_ids);
    if group_ids.is_empty() {
        return Err(JournalError::InvalidRequest(
            "cannot set group classification: no grouped drive ids specified".to_string(),
        ));
    }

    let tx = conn.transaction()?;
    let updated = grouped::update_classification(&tx, &group_ids, classification)?;
    tx.commit()?;
    Ok(updated)
}

/// Re-derive a group's classification from its members' current values and
/// store it.
pub fn recompute_group_classification(
    conn: &mut Connection,
    group_id: GroupId,
) -> Result<Option<Classification>> {
    let tx = conn.transaction()?;

    if grouped::grouped_drive_by_id(&tx, group_id)?.is_none() {
        return Err(JournalError::NotFound(format!("grouped drive {}", group_id)));
    }
    let members = grouped::member_drive_ids(&tx, &[group_id])?;
    let consensus = consensus_classification(classifications_of(&tx, &members)?);
    grouped::update_classification(&tx, &[group_id], consensus)?;

    tx.commit()?;
    Ok(consensus)
}
