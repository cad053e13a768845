//! Collaborator traits for raw price and indicator series.
//!
//! The alignment core consumes these; it never implements a fetcher.
//! Retry, backoff, and rate-limit policy belong to the implementations.

use crate::domain::{IndicatorId, IndicatorObservation, PriceObservation};
use chrono::NaiveDate;
use thiserror::Error;

/// Structured error types for source operations.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("source unavailable: {0}")]
    Unavailable(String),

    #[error("series not found: {series}")]
    SeriesNotFound { series: String },

    #[error("malformed series data: {0}")]
    Malformed(String),
}

/// Provider of daily price observations for an instrument.
pub trait PriceSource: Send + Sync {
    /// Human-readable name of this source.
    fn name(&self) -> &str;

    /// Price rows for `instrument` in [start, end], ordered by date ascending.
    fn price_series(
        &self,
        instrument: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PriceObservation>, SourceError>;
}

/// Provider of sparse indicator observations.
pub trait IndicatorSource: Send + Sync {
    /// Human-readable name of this source.
    fn name(&self) -> &str;

    /// Observations of `indicator` released in [start, end], ordered by
    /// release date ascending. Duplicate release dates must already be
    /// resolved (later entry wins downstream).
    fn indicator_series(
        &self,
        indicator: &IndicatorId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<IndicatorObservation>, SourceError>;
}
