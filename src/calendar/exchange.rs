//! Exchange identity and the instrument → exchange resolution table.
//!
//! Resolution is a fixed enumerated table over identifier patterns, and it
//! is consulted only here. An identifier no rule matches is an error —
//! there is no default calendar.

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// A supported market with its own trading calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Exchange {
    Nyse,
    Stockholm,
    London,
    Frankfurt,
    Paris,
    Tokyo,
    HongKong,
}

impl Exchange {
    /// MIC-style calendar code, stored on every aligned row.
    pub fn code(&self) -> &'static str {
        match self {
            Exchange::Nyse => "XNYS",
            Exchange::Stockholm => "XSTO",
            Exchange::London => "XLON",
            Exchange::Frankfurt => "XFRA",
            Exchange::Paris => "XPAR",
            Exchange::Tokyo => "XJPX",
            Exchange::HongKong => "XHKG",
        }
    }

    /// Weekend rule. All supported markets close Saturday and Sunday.
    pub fn is_weekend(&self, date: NaiveDate) -> bool {
        matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
    }
}

impl fmt::Display for Exchange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Calendar errors.
#[derive(Debug, Error)]
pub enum CalendarError {
    #[error("no exchange mapping rule matches instrument '{instrument}'")]
    UnknownExchange { instrument: String },
}

/// Ticker-suffix rules. The suffix is everything after the last `.`.
const SUFFIX_RULES: &[(&str, Exchange)] = &[
    ("ST", Exchange::Stockholm),
    ("L", Exchange::London),
    ("LON", Exchange::London),
    ("F", Exchange::Frankfurt),
    ("DE", Exchange::Frankfurt),
    ("PA", Exchange::Paris),
    ("T", Exchange::Tokyo),
    ("TYO", Exchange::Tokyo),
    ("HK", Exchange::HongKong),
];

/// Index-symbol rules, matched against the body of `^`-prefixed identifiers.
/// Indices matching no rule are US composites (`^GSPC`, `^DJI`, `^IXIC`).
const INDEX_RULES: &[(&str, Exchange)] = &[
    ("OMXS", Exchange::Stockholm),
    ("FTSE", Exchange::London),
    ("UKX", Exchange::London),
    ("DAX", Exchange::Frankfurt),
    ("N225", Exchange::Tokyo),
    ("TOPIX", Exchange::Tokyo),
    ("HSI", Exchange::HongKong),
];

/// The suffix half of the resolution table, as static reference data.
pub fn suffix_rules() -> &'static [(&'static str, Exchange)] {
    SUFFIX_RULES
}

/// The index-symbol half of the resolution table.
pub fn index_rules() -> &'static [(&'static str, Exchange)] {
    INDEX_RULES
}

/// Resolve an instrument identifier to its exchange.
///
/// Rules, in order: `^`-prefixed identifiers go through [`index_rules`]
/// (unmatched indices are US composites); identifiers with a `.` suffix go
/// through [`suffix_rules`] and fail on an unknown suffix; bare tickers
/// are US-listed.
pub fn resolve_exchange(instrument: &str) -> Result<Exchange, CalendarError> {
    let unknown = || CalendarError::UnknownExchange {
        instrument: instrument.to_string(),
    };

    let symbol = instrument.trim().to_ascii_uppercase();
    if symbol.is_empty() {
        return Err(unknown());
    }

    if let Some(body) = symbol.strip_prefix('^') {
        for (pattern, exchange) in INDEX_RULES {
            if body.contains(pattern) {
                return Ok(*exchange);
            }
        }
        return Ok(Exchange::Nyse);
    }

    match symbol.rsplit_once('.') {
        Some((_, suffix)) => SUFFIX_RULES
            .iter()
            .find(|(pattern, _)| *pattern == suffix)
            .map(|(_, exchange)| *exchange)
            .ok_or_else(unknown),
        None => Ok(Exchange::Nyse),
    }
}
