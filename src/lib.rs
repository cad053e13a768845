//! marketframe — trading-calendar alignment and forward-fill engine.
//!
//! Reconciles three temporal shapes into one composite-keyed table per
//! (date, instrument):
//! - Daily trading-day price series (no weekends or holidays)
//! - Sparse, irregularly released economic indicators
//! - The requirement that every trading day carry the most recently known
//!   indicator value, even past the end of available price data
//!
//! The pieces, leaves first:
//! - `calendar` — exchange resolution and trading-day enumeration
//! - `fill` — the two-pointer forward-fill merge
//! - `store` — atomic full-range slice replacement (Parquet-backed)
//! - `rebuild` — the orchestrator driving one rebuild or query end to end
//!
//! Source fetchers are collaborators behind the `source` traits; this
//! crate never fetches. Logging goes through `tracing`; no subscriber is
//! installed here.

pub mod calendar;
pub mod config;
pub mod domain;
pub mod fill;
pub mod rebuild;
pub mod source;
pub mod store;

pub use calendar::{resolve_exchange, trading_days, CalendarError, Exchange};
pub use config::IndicatorSet;
pub use domain::{AlignedRecord, IndicatorId, IndicatorObservation, PriceObservation};
pub use rebuild::{AlignmentEngine, EndPolicy, RebuildError, RebuildSummary};
pub use source::{IndicatorSource, PriceSource, SourceError};
pub use store::{AlignedStore, ParquetAlignedStore, StoreError};

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: the types a caller may move across threads are
    /// Send + Sync. The rebuild itself is single-threaded, but the pure
    /// pieces must stay safe to run anywhere.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<domain::PriceObservation>();
        require_sync::<domain::PriceObservation>();
        require_send::<domain::IndicatorObservation>();
        require_sync::<domain::IndicatorObservation>();
        require_send::<domain::IndicatorId>();
        require_sync::<domain::IndicatorId>();
        require_send::<domain::AlignedRecord>();
        require_sync::<domain::AlignedRecord>();

        require_send::<calendar::Exchange>();
        require_sync::<calendar::Exchange>();
        require_send::<calendar::TradingDays>();
        require_sync::<calendar::TradingDays>();

        require_send::<config::IndicatorSet>();
        require_sync::<config::IndicatorSet>();

        require_send::<rebuild::EndPolicy>();
        require_sync::<rebuild::EndPolicy>();
        require_send::<rebuild::RebuildSummary>();
        require_sync::<rebuild::RebuildSummary>();

        require_send::<store::ParquetAlignedStore>();
        require_sync::<store::ParquetAlignedStore>();
    }

    /// Architecture contract: the orchestrator accepts its collaborators
    /// as trait objects, so tests and callers can swap sources freely.
    #[test]
    fn engine_builds_from_trait_objects() {
        fn _check<'a>(
            prices: &'a dyn PriceSource,
            indicators: &'a dyn IndicatorSource,
            store: &'a dyn AlignedStore,
        ) -> AlignmentEngine<'a> {
            AlignmentEngine::new(prices, indicators, store)
        }
    }
}
