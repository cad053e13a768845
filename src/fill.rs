//! Forward-fill of sparse observations onto a trading-day axis.
//!
//! Sparse, irregularly released indicator values (monthly statistics,
//! event-driven rate changes) become a dense per-day column: each day
//! carries the latest observation released on or before it. The carry is a
//! step function — no interpolation, no decay — and it never lapses, even
//! past the last observation.

use crate::domain::IndicatorObservation;
use chrono::NaiveDate;

/// Merge `observations` onto `days`, returning one value slot per day.
///
/// `days` must be ascending; `observations` must be sorted by release date
/// (use [`sort_observations`]). The merge is a two-pointer walk,
/// O(|days| + |observations|): for each day the cursor advances over every
/// observation released on or before that day, keeping the last one seen.
/// Duplicate release dates therefore resolve to the later observation in
/// input order. Days before the first release get `None`.
pub fn forward_fill(days: &[NaiveDate], observations: &[IndicatorObservation]) -> Vec<Option<f64>> {
    let mut filled = Vec::with_capacity(days.len());
    let mut current: Option<f64> = None;
    let mut cursor = 0;

    for day in days {
        while cursor < observations.len() && observations[cursor].release_date <= *day {
            current = Some(observations[cursor].value);
            cursor += 1;
        }
        filled.push(current);
    }
    filled
}

/// Stable sort by release date. Input order is preserved for identical
/// release dates, so an in-place correction appended after the original
/// observation wins the tie-break in [`forward_fill`].
pub fn sort_observations(observations: &mut [IndicatorObservation]) {
    observations.sort_by_key(|obs| obs.release_date);
}

/// Number of non-null slots in a filled column.
pub fn coverage(filled: &[Option<f64>]) -> usize {
    filled.iter().filter(|slot| slot.is_some()).count()
}
