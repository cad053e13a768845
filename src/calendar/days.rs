//! Trading-day enumeration.

use super::exchange::Exchange;
use super::holidays::holidays;
use chrono::{Datelike, Duration, NaiveDate};
use std::collections::BTreeSet;

/// Lazy iterator over the trading days of one exchange in [start, end].
///
/// Deterministic for the same (exchange, range); `start` and `end` are
/// included when they are themselves trading days. Holiday sets are
/// computed per calendar year as the cursor crosses year boundaries.
#[derive(Debug, Clone)]
pub struct TradingDays {
    exchange: Exchange,
    cursor: NaiveDate,
    end: NaiveDate,
    year: i32,
    closures: Vec<NaiveDate>,
}

/// Enumerate trading days of `exchange` in [start, end]. An inverted range
/// yields an empty sequence.
pub fn trading_days(exchange: Exchange, start: NaiveDate, end: NaiveDate) -> TradingDays {
    TradingDays {
        exchange,
        cursor: start,
        end,
        year: start.year(),
        closures: holidays(exchange, start.year()),
    }
}

impl Iterator for TradingDays {
    type Item = NaiveDate;

    fn next(&mut self) -> Option<NaiveDate> {
        while self.cursor <= self.end {
            let day = self.cursor;
            self.cursor += Duration::days(1);

            if day.year() != self.year {
                self.year = day.year();
                self.closures = holidays(self.exchange, self.year);
            }
            if !self.exchange.is_weekend(day) && !self.closures.contains(&day) {
                return Some(day);
            }
        }
        None
    }
}

/// True if `day` is a trading day for `exchange`.
pub fn is_trading_day(exchange: Exchange, day: NaiveDate) -> bool {
    !exchange.is_weekend(day) && !holidays(exchange, day.year()).contains(&day)
}

/// First trading day strictly after `day`.
pub fn next_trading_day(exchange: Exchange, day: NaiveDate) -> NaiveDate {
    let mut candidate = day + Duration::days(1);
    while !is_trading_day(exchange, candidate) {
        candidate += Duration::days(1);
    }
    candidate
}

/// Last trading day strictly before `day`.
pub fn previous_trading_day(exchange: Exchange, day: NaiveDate) -> NaiveDate {
    let mut candidate = day - Duration::days(1);
    while !is_trading_day(exchange, candidate) {
        candidate -= Duration::days(1);
    }
    candidate
}

/// Sorted intersection of several exchanges' trading days — dates on which
/// every listed exchange is open. Empty input yields an empty sequence.
pub fn unified_trading_days(
    exchanges: &[Exchange],
    start: NaiveDate,
    end: NaiveDate,
) -> Vec<NaiveDate> {
    let Some((first, rest)) = exchanges.split_first() else {
        return Vec::new();
    };

    let mut unified: BTreeSet<NaiveDate> = trading_days(*first, start, end).collect();
    for exchange in rest {
        let other: BTreeSet<NaiveDate> = trading_days(*exchange, start, end).collect();
        unified = unified.intersection(&other).copied().collect();
    }
    unified.into_iter().collect()
}
