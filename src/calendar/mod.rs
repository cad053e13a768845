//! CalendarProvider — exchange resolution and trading-day enumeration.
//!
//! Maps instrument identifiers to exchanges through one enumerated lookup
//! table and enumerates trading days (weekends and exchange holidays
//! excluded) as a lazy, restartable iterator.

pub mod days;
pub mod exchange;
pub mod holidays;

pub use days::{
    is_trading_day, next_trading_day, previous_trading_day, trading_days, unified_trading_days,
    TradingDays,
};
pub use exchange::{index_rules, resolve_exchange, suffix_rules, CalendarError, Exchange};
