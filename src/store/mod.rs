//! Store adapters.
//!
//! Thin query layers over the SQLite tables. Every function takes the connection
//! (or an open transaction, which derefs to one) explicitly; nothing here holds
//! state of its own. Id lists are always bound as parameters.

pub mod drives;
pub mod grouped;
pub mod positions;

/// `?, ?, ?` for an `IN (...)` list of `n` bound values.
pub(crate) fn placeholders(n: usize) -> String {
    let mut sql = String::with_capacity(n * 3);
    for i in 0..n {
        if i > 0 {
            sql.push_str(", ");
        }
        sql.push('?');
    }
    sql
}

/// Sorted, de-duplicated copy of an id list.
pub(crate) fn dedup_ids(ids: &[i64]) -> Vec<i64> {
    let mut ids = ids.to_vec();
    ids.sort_unstable();
    ids.dedup();
    ids
}
