//! AlignedStore — persistence of the aligned table.
//!
//! The only mutation contract is full-range replacement: delete every row
//! for an (instrument, range) slice and insert the supplied rows as one
//! atomic unit. There is no merge-by-row path, so a stored slice can never
//! mix rows produced under different fill policies.

pub mod parquet;

use crate::domain::AlignedRecord;
use chrono::NaiveDate;
use thiserror::Error;

pub use parquet::{ParquetAlignedStore, StoreMeta};

/// Structured error types for store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O error: {0}")]
    Io(String),

    #[error("parquet error: {0}")]
    Parquet(String),

    #[error("metadata error: {0}")]
    Meta(String),

    #[error("row date {date} outside replacement range [{start}, {end}]")]
    RowOutsideRange {
        date: NaiveDate,
        start: NaiveDate,
        end: NaiveDate,
    },

    #[error("row instrument '{actual}' does not match replaced instrument '{expected}'")]
    InstrumentMismatch { expected: String, actual: String },

    #[error("duplicate composite key ({date}, {instrument})")]
    DuplicateKey {
        date: NaiveDate,
        instrument: String,
    },
}

/// Persistence contract for aligned rows, keyed by (date, instrument).
pub trait AlignedStore: Send + Sync {
    /// Atomically delete every stored row for `instrument` within
    /// [start, end] and insert `rows` in their place. Returns the number
    /// of rows written. A failure anywhere before the commit leaves the
    /// prior rows untouched.
    fn replace_range(
        &self,
        instrument: &str,
        start: NaiveDate,
        end: NaiveDate,
        rows: &[AlignedRecord],
    ) -> Result<usize, StoreError>;

    /// Stored rows for `instrument` within [start, end], ordered by date
    /// ascending. Read-only; an instrument with no stored rows yields an
    /// empty sequence.
    fn query_range(
        &self,
        instrument: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<AlignedRecord>, StoreError>;
}
