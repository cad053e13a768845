//! PriceObservation — one daily OHLCV row from a price collaborator.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Daily OHLCV observation for a single instrument.
///
/// Owned and persisted by the price-fetching collaborator; the alignment
/// core only reads it. A row exists only for days the instrument actually
/// traded — non-trading days have no observation, never a fabricated one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceObservation {
    pub instrument: String,
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub adj_close: f64,
    pub volume: u64,
}

impl PriceObservation {
    /// Basic OHLC sanity check: high >= low, high bounds open/close, positive prices.
    pub fn is_sane(&self) -> bool {
        self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
            && self.open > 0.0
            && self.close > 0.0
    }
}
