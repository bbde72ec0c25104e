//! Top-rated selection
//!
//! Picks the records sharing the highest rating. Ratings come from a fixed-precision source,
//! so ties are detected with exact equality.

use std::cmp::Ordering;

use crate::error::{Error, Result};
use crate::types::Record;

/// Names of up to `limit` records tied at the maximum rating
///
/// The tied group is ordered by descending votes, then by name, so the result is the same
/// for the same input regardless of how the records were gathered. Records equal on both
/// keep their input order.
///
/// # Errors
/// [`Error::EmptyInput`] if `records` is empty.
pub fn top_tied(records: &[Record], limit: usize) -> Result<Vec<String>> {
    let max_rating = records
        .iter()
        .map(|r| r.rating)
        .max_by(f64::total_cmp)
        .ok_or(Error::EmptyInput)?;

    let mut tied: Vec<&Record> = records.iter().filter(|r| r.rating == max_rating).collect();
    tied.sort_by(|a, b| tie_break(a, b));

    Ok(tied
        .into_iter()
        .take(limit)
        .map(|r| r.name.clone())
        .collect())
}

fn tie_break(a: &Record, b: &Record) -> Ordering {
    b.votes.cmp(&a.votes).then_with(|| a.name.cmp(&b.name))
}
