//! AlignedRecord — one row of the analysis-ready table.

use super::indicator::IndicatorId;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One aligned row, keyed by (date, instrument).
///
/// Price columns are null on trading days without a trade — never
/// fabricated. Each indicator column holds the value of the latest
/// observation released on or before `date`, or null if none exists yet.
/// Records are never mutated in place; a rebuild replaces the full
/// (instrument, range) slice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignedRecord {
    pub date: NaiveDate,
    pub instrument: String,
    /// Exchange code of the trading calendar the row was aligned to.
    pub calendar: String,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub adj_close: Option<f64>,
    pub volume: Option<u64>,
    /// One column per configured indicator, in deterministic (sorted) order.
    pub indicators: BTreeMap<IndicatorId, Option<f64>>,
}

impl AlignedRecord {
    /// True if the instrument traded on this day.
    pub fn has_price(&self) -> bool {
        self.close.is_some()
    }

    /// Value of one indicator column, flattened across "column absent" and
    /// "column present but null".
    pub fn indicator(&self, id: &IndicatorId) -> Option<f64> {
        self.indicators.get(id).copied().flatten()
    }
}
