//! Indicator identity and sparse observations.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a configured economic indicator (e.g. `unemployment_monthly_rate_us`).
///
/// Doubles as the column name of the indicator in the persisted aligned table.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IndicatorId(pub String);

impl IndicatorId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IndicatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for IndicatorId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// One sparse observation of an indicator: the value that became known on
/// `release_date`.
///
/// Observations for one indicator, sorted by release date, are only ever
/// appended or corrected in place for an existing release date — never
/// retroactively reordered.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndicatorObservation {
    pub release_date: NaiveDate,
    pub value: f64,
}

impl IndicatorObservation {
    pub fn new(release_date: NaiveDate, value: f64) -> Self {
        Self { release_date, value }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indicator_id_displays_raw_name() {
        let id = IndicatorId::new("interest_rate_monthly_us");
        assert_eq!(id.to_string(), "interest_rate_monthly_us");
        assert_eq!(id.as_str(), "interest_rate_monthly_us");
    }

    #[test]
    fn indicator_id_orders_lexicographically() {
        let a = IndicatorId::new("a");
        let b = IndicatorId::new("b");
        assert!(a < b);
    }

    #[test]
    fn observation_serialization_roundtrip() {
        let obs = IndicatorObservation::new(NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(), 5.7);
        let json = serde_json::to_string(&obs).unwrap();
        let back: IndicatorObservation = serde_json::from_str(&json).unwrap();
        assert_eq!(obs, back);
    }
}
