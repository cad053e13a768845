//! AlignmentOrchestrator — drives one rebuild or query end to end.
//!
//! A rebuild resolves the trading-day backbone for the requested range,
//! pulls raw price rows and indicator observations from the source
//! collaborators, forward-fills each indicator column against the
//! backbone, assembles one aligned row per trading day, and atomically
//! replaces the (instrument, range) slice in the store.
//!
//! The end of the range comes from an explicit [`EndPolicy`], never from
//! how far price data happens to extend: under `ExtendToToday` the
//! backbone (and therefore every indicator fill) reaches the current
//! date, with price columns simply null past the last priced day.
//!
//! Rebuilds are single-threaded and idempotent. Callers must serialize
//! concurrent rebuilds that target the same instrument with overlapping
//! ranges; the core does not lock.

use crate::calendar::{self, CalendarError, Exchange};
use crate::domain::{AlignedRecord, IndicatorId, PriceObservation};
use crate::fill;
use crate::source::{IndicatorSource, PriceSource};
use crate::store::AlignedStore;
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, info, warn};

/// How far before `start` indicator observations are pulled, so the first
/// trading days of a slice carry the latest release from before the slice.
const INDICATOR_LOOKBACK_DAYS: i64 = 370;

/// Interior price gaps of at least this many trading days are reported.
const PRICE_GAP_MIN_DAYS: usize = 8;

/// Where a rebuilt slice ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EndPolicy {
    /// Align through this date.
    Explicit(NaiveDate),
    /// Align through the current date, however far price data extends.
    ExtendToToday,
}

impl EndPolicy {
    /// Resolve to a concrete end date. Done once, at the top of a rebuild.
    pub fn resolve(&self, today: NaiveDate) -> NaiveDate {
        match self {
            EndPolicy::Explicit(date) => *date,
            EndPolicy::ExtendToToday => today,
        }
    }
}

/// Lifecycle of one rebuild call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebuildState {
    Pending,
    BackboneResolved,
    DataFetched,
    Merged,
    Persisted,
    Failed,
}

/// Coverage of one indicator column over the rebuilt range.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndicatorCoverage {
    pub days_with_value: usize,
    /// True when the source failed and the column was written all-null.
    pub degraded: bool,
    pub error: Option<String>,
}

/// A run of consecutive trading days without a price row, bounded on both
/// sides by priced days.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceGap {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub length: usize,
}

/// Result of one rebuild.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RebuildSummary {
    pub instrument: String,
    pub exchange: Exchange,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub trading_days: usize,
    pub rows_written: usize,
    /// Price rows that landed on a backbone trading day.
    pub price_rows: usize,
    /// Fetched price rows whose date is not a backbone trading day.
    pub price_rows_dropped: usize,
    pub price_degraded: bool,
    pub price_error: Option<String>,
    pub coverage: BTreeMap<String, IndicatorCoverage>,
    pub price_gaps: Vec<PriceGap>,
}

/// Rebuild failures. Degraded single sources are reported in the summary,
/// not raised; these are the fatal cases.
#[derive(Debug, Error)]
pub enum RebuildError {
    #[error(transparent)]
    Calendar(#[from] CalendarError),

    #[error("every data source failed for '{instrument}': nothing to align")]
    AllSourcesFailed { instrument: String },

    #[error(transparent)]
    Store(#[from] crate::store::StoreError),
}

/// The orchestrator. Borrows its collaborators; owns nothing but `today`.
pub struct AlignmentEngine<'a> {
    prices: &'a dyn PriceSource,
    indicators: &'a dyn IndicatorSource,
    store: &'a dyn AlignedStore,
    today: NaiveDate,
}

impl<'a> AlignmentEngine<'a> {
    pub fn new(
        prices: &'a dyn PriceSource,
        indicators: &'a dyn IndicatorSource,
        store: &'a dyn AlignedStore,
    ) -> Self {
        Self {
            prices,
            indicators,
            store,
            today: chrono::Local::now().date_naive(),
        }
    }

    /// Override the date `ExtendToToday` resolves to. Used by tests and by
    /// callers replaying historical rebuilds.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    /// Rebuild the aligned slice for one instrument over [start, end].
    pub fn rebuild(
        &self,
        instrument: &str,
        indicator_ids: &[IndicatorId],
        start: NaiveDate,
        end_policy: EndPolicy,
    ) -> Result<RebuildSummary, RebuildError> {
        let mut state = RebuildState::Pending;
        debug!(?state, instrument, "rebuild requested");

        // 1. Backbone. An unknown exchange is fatal; no default calendar.
        let exchange = calendar::resolve_exchange(instrument)?;
        let end = end_policy.resolve(self.today);
        let days: Vec<NaiveDate> = calendar::trading_days(exchange, start, end).collect();

        state = RebuildState::BackboneResolved;
        debug!(?state, %exchange, trading_days = days.len(), "backbone resolved");

        if days.is_empty() {
            info!(instrument, %start, %end, "no trading days in range; nothing to align");
            return Ok(RebuildSummary {
                instrument: instrument.to_string(),
                exchange,
                start,
                end,
                trading_days: 0,
                rows_written: 0,
                price_rows: 0,
                price_rows_dropped: 0,
                price_degraded: false,
                price_error: None,
                coverage: BTreeMap::new(),
                price_gaps: Vec::new(),
            });
        }

        // 2. Prices. A failure degrades the price columns to null.
        let (price_by_date, price_rows_dropped, price_error) =
            match self.prices.price_series(instrument, start, end) {
                Ok(fetched) => {
                    let mut by_date: BTreeMap<NaiveDate, PriceObservation> = BTreeMap::new();
                    let mut dropped = 0usize;
                    let mut insane = 0usize;
                    for row in fetched {
                        if !row.is_sane() {
                            insane += 1;
                        }
                        if days.binary_search(&row.date).is_ok() {
                            by_date.insert(row.date, row);
                        } else {
                            dropped += 1;
                        }
                    }
                    if dropped > 0 {
                        warn!(instrument, dropped, "price rows off the backbone dropped");
                    }
                    if insane > 0 {
                        warn!(instrument, insane, "price rows failed the OHLC sanity check");
                    }
                    (by_date, dropped, None)
                }
                Err(e) => {
                    warn!(
                        instrument,
                        source = self.prices.name(),
                        error = %e,
                        "price source degraded; price columns will be null"
                    );
                    (BTreeMap::new(), 0, Some(e.to_string()))
                }
            };

        // 3. Indicators. Each column degrades independently.
        let fetch_start = start - Duration::days(INDICATOR_LOOKBACK_DAYS);
        let mut columns: BTreeMap<IndicatorId, Vec<Option<f64>>> = BTreeMap::new();
        let mut coverage: BTreeMap<String, IndicatorCoverage> = BTreeMap::new();

        for id in indicator_ids {
            match self.indicators.indicator_series(id, fetch_start, end) {
                Ok(mut observations) => {
                    fill::sort_observations(&mut observations);
                    let filled = fill::forward_fill(&days, &observations);
                    let days_with_value = fill::coverage(&filled);
                    debug!(indicator = %id, days_with_value, total = days.len(), "indicator filled");
                    coverage.insert(
                        id.as_str().to_string(),
                        IndicatorCoverage {
                            days_with_value,
                            degraded: false,
                            error: None,
                        },
                    );
                    columns.insert(id.clone(), filled);
                }
                Err(e) => {
                    warn!(
                        indicator = %id,
                        source = self.indicators.name(),
                        error = %e,
                        "indicator source degraded; column will be null"
                    );
                    coverage.insert(
                        id.as_str().to_string(),
                        IndicatorCoverage {
                            days_with_value: 0,
                            degraded: true,
                            error: Some(e.to_string()),
                        },
                    );
                    columns.insert(id.clone(), vec![None; days.len()]);
                }
            }
        }

        state = RebuildState::DataFetched;
        debug!(?state, "data fetched");

        let price_degraded = price_error.is_some();
        if price_degraded && coverage.values().all(|c| c.degraded) {
            state = RebuildState::Failed;
            warn!(?state, instrument, "every source failed; aborting before persistence");
            return Err(RebuildError::AllSourcesFailed {
                instrument: instrument.to_string(),
            });
        }

        // 4. Assemble one row per backbone day; prices left-joined.
        let rows: Vec<AlignedRecord> = days
            .iter()
            .enumerate()
            .map(|(i, day)| {
                let price = price_by_date.get(day);
                AlignedRecord {
                    date: *day,
                    instrument: instrument.to_string(),
                    calendar: exchange.code().to_string(),
                    open: price.map(|p| p.open),
                    high: price.map(|p| p.high),
                    low: price.map(|p| p.low),
                    close: price.map(|p| p.close),
                    adj_close: price.map(|p| p.adj_close),
                    volume: price.map(|p| p.volume),
                    indicators: columns
                        .iter()
                        .map(|(id, filled)| (id.clone(), filled[i]))
                        .collect(),
                }
            })
            .collect();

        state = RebuildState::Merged;
        debug!(?state, rows = rows.len(), "rows assembled");

        let gaps = price_gaps(&rows, PRICE_GAP_MIN_DAYS);
        if !gaps.is_empty() {
            warn!(instrument, gaps = gaps.len(), "interior price gaps detected");
        }

        // 5. Persist. The store's rename is the transaction commit.
        let rows_written = self.store.replace_range(instrument, start, end, &rows)?;
        state = RebuildState::Persisted;
        info!(?state, instrument, rows_written, "rebuild persisted");

        Ok(RebuildSummary {
            instrument: instrument.to_string(),
            exchange,
            start,
            end,
            trading_days: days.len(),
            rows_written,
            price_rows: price_by_date.len(),
            price_rows_dropped,
            price_degraded,
            price_error,
            coverage,
            price_gaps: gaps,
        })
    }

    /// Stored aligned rows for [start, end], ordered by date.
    pub fn query(
        &self,
        instrument: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<AlignedRecord>, RebuildError> {
        Ok(self.store.query_range(instrument, start, end)?)
    }
}

/// Interior runs of at least `min_days` consecutive trading days without a
/// price row. The tail past the last priced day is not a gap — under
/// `ExtendToToday` it is the expected shape.
pub fn price_gaps(rows: &[AlignedRecord], min_days: usize) -> Vec<PriceGap> {
    let mut gaps = Vec::new();
    let mut run_start: Option<usize> = None;

    for (i, row) in rows.iter().enumerate() {
        if !row.has_price() {
            if run_start.is_none() {
                run_start = Some(i);
            }
        } else if let Some(s) = run_start.take() {
            let length = i - s;
            if length >= min_days {
                gaps.push(PriceGap {
                    start: rows[s].date,
                    end: rows[i - 1].date,
                    length,
                });
            }
        }
    }
    gaps
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn end_policy_resolves_once() {
        let today = date(2025, 8, 18);
        assert_eq!(EndPolicy::ExtendToToday.resolve(today), today);
        assert_eq!(
            EndPolicy::Explicit(date(2024, 12, 31)).resolve(today),
            date(2024, 12, 31)
        );
    }

    fn bare_row(day: NaiveDate, close: Option<f64>) -> AlignedRecord {
        AlignedRecord {
            date: day,
            instrument: "X".into(),
            calendar: "XNYS".into(),
            open: close,
            high: close,
            low: close,
            close,
            adj_close: close,
            volume: None,
            indicators: BTreeMap::new(),
        }
    }

    #[test]
    fn interior_gap_is_reported_with_exact_bounds() {
        let mut rows = Vec::new();
        rows.push(bare_row(date(2024, 1, 1), Some(1.0)));
        for d in 2..=9 {
            rows.push(bare_row(date(2024, 1, d), None));
        }
        rows.push(bare_row(date(2024, 1, 10), Some(2.0)));

        let gaps = price_gaps(&rows, 8);
        assert_eq!(
            gaps,
            vec![PriceGap {
                start: date(2024, 1, 2),
                end: date(2024, 1, 9),
                length: 8,
            }]
        );
    }

    #[test]
    fn short_gaps_and_trailing_gaps_are_not_reported() {
        let mut rows = vec![bare_row(date(2024, 1, 1), Some(1.0))];
        for d in 2..=5 {
            rows.push(bare_row(date(2024, 1, d), None)); // short, interior
        }
        rows.push(bare_row(date(2024, 1, 8), Some(2.0)));
        for d in 9..=31 {
            rows.push(bare_row(date(2024, 1, d), None)); // long, trailing
        }

        assert!(price_gaps(&rows, 8).is_empty());
    }
}
