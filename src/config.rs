//! Indicator set configuration.
//!
//! The set of indicator columns is external configuration, not code: the
//! persisted table grows a column per configured indicator, so adding one
//! is an additive schema change. Stored as a TOML file mapping indicator
//! ids to their upstream (source, series) coordinates.

use crate::domain::IndicatorId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

/// Upstream coordinates of one indicator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndicatorSpec {
    /// Source system ("fred", "eurostat", "ecb", ...).
    pub source: String,
    /// Series identifier within the source.
    pub series: String,
}

/// The configured indicator set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndicatorSet {
    pub indicators: BTreeMap<String, IndicatorSpec>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read indicator config: {0}")]
    Read(String),

    #[error("parse indicator config: {0}")]
    Parse(String),

    #[error("serialize indicator config: {0}")]
    Serialize(String),
}

impl IndicatorSet {
    /// Load an indicator set from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::Read(e.to_string()))?;
        Self::from_toml(&content)
    }

    /// Parse an indicator set from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Serialize to TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))
    }

    /// Indicator ids in deterministic (sorted) order.
    pub fn ids(&self) -> Vec<IndicatorId> {
        self.indicators.keys().map(IndicatorId::new).collect()
    }

    pub fn len(&self) -> usize {
        self.indicators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indicators.is_empty()
    }

    /// The default US + euro-area macro set.
    pub fn default_set() -> Self {
        let mut indicators = BTreeMap::new();

        let mut add = |id: &str, source: &str, series: &str| {
            indicators.insert(
                id.to_string(),
                IndicatorSpec {
                    source: source.to_string(),
                    series: series.to_string(),
                },
            );
        };

        add("inflation_monthly_us", "fred", "CPIAUCSL");
        add("inflation_index_monthly_us", "fred", "CPIAUCSL");
        add("unemployment_monthly_rate_us", "fred", "UNRATE");
        add("interest_rate_monthly_us", "fred", "DFF");
        add("inflation_monthly_euro", "eurostat", "prc_hicp_mmor");
        add("unemployment_rate_monthly_euro", "eurostat", "une_rt_m");
        add(
            "interest_rate_change_day_euro",
            "ecb",
            "FM.D.U2.EUR.4F.KR.MRR_FR.LEV",
        );
        add(
            "interest_rate_monthly_euro",
            "ecb",
            "FM.B.U2.EUR.4F.KR.MRR_FR.LEV",
        );

        Self { indicators }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_set_carries_the_macro_columns() {
        let set = IndicatorSet::default_set();
        assert_eq!(set.len(), 8);
        assert!(set.indicators.contains_key("unemployment_monthly_rate_us"));
        assert_eq!(set.indicators["interest_rate_monthly_us"].series, "DFF");
        assert_eq!(
            set.indicators["inflation_monthly_euro"].source,
            "eurostat"
        );
    }

    #[test]
    fn ids_are_sorted() {
        let set = IndicatorSet::default_set();
        let ids = set.ids();
        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(ids, sorted);
    }

    #[test]
    fn toml_roundtrip() {
        let set = IndicatorSet::default_set();
        let toml_str = set.to_toml().unwrap();
        let parsed = IndicatorSet::from_toml(&toml_str).unwrap();
        assert_eq!(set.len(), parsed.len());
        assert_eq!(
            set.indicators["interest_rate_change_day_euro"],
            parsed.indicators["interest_rate_change_day_euro"]
        );
    }

    #[test]
    fn parse_rejects_malformed_toml() {
        assert!(matches!(
            IndicatorSet::from_toml("indicators = 3"),
            Err(ConfigError::Parse(_))
        ));
    }
}
