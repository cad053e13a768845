//! Parquet-backed aligned store with Hive-style partitioning.
//!
//! Layout: `{root}/instrument={ID}/aligned.parquet` plus a `meta.json`
//! sidecar per instrument. Writes go to a `.tmp` file and are renamed into
//! place; the rename is the commit point of `replace_range`, so a failure
//! during staging leaves the previous partition intact.

use super::{AlignedStore, StoreError};
use crate::domain::{AlignedRecord, IndicatorId};
use chrono::NaiveDate;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

/// Columns every partition carries; everything else is an indicator column.
const FIXED_COLUMNS: [&str; 9] = [
    "date",
    "instrument",
    "calendar",
    "open",
    "high",
    "low",
    "close",
    "adj_close",
    "volume",
];

/// Metadata sidecar for one instrument partition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreMeta {
    pub instrument: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub row_count: usize,
    pub indicator_columns: Vec<String>,
    pub data_hash: String,
    pub written_at: chrono::NaiveDateTime,
}

/// The Parquet-backed store.
pub struct ParquetAlignedStore {
    root: PathBuf,
}

impl ParquetAlignedStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory of the store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn instrument_dir(&self, instrument: &str) -> PathBuf {
        self.root.join(format!("instrument={instrument}"))
    }

    fn data_path(&self, instrument: &str) -> PathBuf {
        self.instrument_dir(instrument).join("aligned.parquet")
    }

    fn meta_path(&self, instrument: &str) -> PathBuf {
        self.instrument_dir(instrument).join("meta.json")
    }

    /// Metadata sidecar for an instrument, if one is stored.
    pub fn meta(&self, instrument: &str) -> Option<StoreMeta> {
        let content = fs::read_to_string(self.meta_path(instrument)).ok()?;
        serde_json::from_str(&content).ok()
    }

    /// Every stored row for an instrument, sorted by date ascending.
    fn load_all(&self, instrument: &str) -> Result<Vec<AlignedRecord>, StoreError> {
        let path = self.data_path(instrument);
        if !path.exists() {
            return Ok(Vec::new());
        }

        let file = fs::File::open(&path).map_err(|e| StoreError::Io(format!("open: {e}")))?;
        let df = ParquetReader::new(file)
            .finish()
            .map_err(|e| StoreError::Parquet(format!("read: {e}")))?;

        let mut rows = dataframe_to_rows(&df)?;
        rows.sort_by_key(|r| r.date);
        Ok(rows)
    }

    /// Stage the merged partition and commit it with an atomic rename.
    fn commit(&self, instrument: &str, merged: &[AlignedRecord]) -> Result<(), StoreError> {
        let dir = self.instrument_dir(instrument);
        fs::create_dir_all(&dir).map_err(|e| StoreError::Io(format!("create dir: {e}")))?;

        let path = self.data_path(instrument);
        let tmp_path = path.with_extension("parquet.tmp");

        let df = rows_to_dataframe(merged)?;
        let file = fs::File::create(&tmp_path)
            .map_err(|e| StoreError::Io(format!("create staging file: {e}")))?;
        ParquetWriter::new(file)
            .finish(&mut df.clone())
            .map_err(|e| {
                let _ = fs::remove_file(&tmp_path);
                StoreError::Parquet(format!("write: {e}"))
            })?;

        fs::rename(&tmp_path, &path).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            StoreError::Io(format!("atomic rename failed: {e}"))
        })?;

        // The sidecar is bookkeeping; the partition above is already committed.
        let indicator_columns: BTreeSet<String> = merged
            .iter()
            .flat_map(|r| r.indicators.keys().map(|id| id.as_str().to_string()))
            .collect();
        let meta = StoreMeta {
            instrument: instrument.to_string(),
            start_date: merged.first().map(|r| r.date).unwrap_or_default(),
            end_date: merged.last().map(|r| r.date).unwrap_or_default(),
            row_count: merged.len(),
            indicator_columns: indicator_columns.into_iter().collect(),
            data_hash: content_hash(merged)?,
            written_at: chrono::Local::now().naive_local(),
        };
        let meta_json = serde_json::to_string_pretty(&meta)
            .map_err(|e| StoreError::Meta(format!("serialize: {e}")))?;
        fs::write(self.meta_path(instrument), meta_json)
            .map_err(|e| StoreError::Meta(format!("write: {e}")))?;

        Ok(())
    }
}

impl AlignedStore for ParquetAlignedStore {
    fn replace_range(
        &self,
        instrument: &str,
        start: NaiveDate,
        end: NaiveDate,
        rows: &[AlignedRecord],
    ) -> Result<usize, StoreError> {
        // Validate the supplied rows before anything touches the filesystem.
        for row in rows {
            if row.instrument != instrument {
                return Err(StoreError::InstrumentMismatch {
                    expected: instrument.to_string(),
                    actual: row.instrument.clone(),
                });
            }
            if row.date < start || row.date > end {
                return Err(StoreError::RowOutsideRange {
                    date: row.date,
                    start,
                    end,
                });
            }
        }

        let existing = self.load_all(instrument)?;
        let mut merged: Vec<AlignedRecord> = existing
            .into_iter()
            .filter(|r| r.date < start || r.date > end)
            .collect();
        merged.extend_from_slice(rows);
        merged.sort_by_key(|r| r.date);

        for pair in merged.windows(2) {
            if pair[0].date == pair[1].date {
                return Err(StoreError::DuplicateKey {
                    date: pair[0].date,
                    instrument: instrument.to_string(),
                });
            }
        }

        if merged.is_empty() {
            // Nothing left for this instrument; drop the partition.
            let _ = fs::remove_file(self.data_path(instrument));
            let _ = fs::remove_file(self.meta_path(instrument));
            return Ok(0);
        }

        self.commit(instrument, &merged)?;
        Ok(rows.len())
    }

    fn query_range(
        &self,
        instrument: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<AlignedRecord>, StoreError> {
        let rows = self.load_all(instrument)?;
        Ok(rows
            .into_iter()
            .filter(|r| r.date >= start && r.date <= end)
            .collect())
    }
}

/// Deterministic blake3 hash of a row slice; the idempotence witness.
fn content_hash(rows: &[AlignedRecord]) -> Result<String, StoreError> {
    let bytes =
        serde_json::to_vec(rows).map_err(|e| StoreError::Meta(format!("hash serialization: {e}")))?;
    Ok(blake3::hash(&bytes).to_hex().to_string())
}

// ── DataFrame conversion ────────────────────────────────────────────

fn epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1970, 1, 1).unwrap()
}

/// Convert aligned rows to a DataFrame: fixed columns first, then one
/// nullable f64 column per indicator in sorted order.
fn rows_to_dataframe(rows: &[AlignedRecord]) -> Result<DataFrame, StoreError> {
    let dates: Vec<i32> = rows
        .iter()
        .map(|r| (r.date - epoch()).num_days() as i32)
        .collect();
    let instruments: Vec<String> = rows.iter().map(|r| r.instrument.clone()).collect();
    let calendars: Vec<String> = rows.iter().map(|r| r.calendar.clone()).collect();
    let opens: Vec<Option<f64>> = rows.iter().map(|r| r.open).collect();
    let highs: Vec<Option<f64>> = rows.iter().map(|r| r.high).collect();
    let lows: Vec<Option<f64>> = rows.iter().map(|r| r.low).collect();
    let closes: Vec<Option<f64>> = rows.iter().map(|r| r.close).collect();
    let adj_closes: Vec<Option<f64>> = rows.iter().map(|r| r.adj_close).collect();
    let volumes: Vec<Option<u64>> = rows.iter().map(|r| r.volume).collect();

    let mut columns = vec![
        Column::new("date".into(), dates)
            .cast(&DataType::Date)
            .map_err(|e| StoreError::Parquet(format!("date cast: {e}")))?,
        Column::new("instrument".into(), instruments),
        Column::new("calendar".into(), calendars),
        Column::new("open".into(), opens),
        Column::new("high".into(), highs),
        Column::new("low".into(), lows),
        Column::new("close".into(), closes),
        Column::new("adj_close".into(), adj_closes),
        Column::new("volume".into(), volumes),
    ];

    let indicator_ids: BTreeSet<IndicatorId> = rows
        .iter()
        .flat_map(|r| r.indicators.keys().cloned())
        .collect();
    for id in &indicator_ids {
        let values: Vec<Option<f64>> = rows.iter().map(|r| r.indicator(id)).collect();
        columns.push(Column::new(id.as_str().into(), values));
    }

    DataFrame::new(columns).map_err(|e| StoreError::Parquet(format!("dataframe creation: {e}")))
}

/// Convert a partition DataFrame back to aligned rows.
fn dataframe_to_rows(df: &DataFrame) -> Result<Vec<AlignedRecord>, StoreError> {
    let col = |name: &str| {
        df.column(name)
            .map_err(|e| StoreError::Parquet(format!("missing column '{name}': {e}")))
    };
    let typed = |name: &str, e: PolarsError| {
        StoreError::Parquet(format!("column '{name}' type: {e}"))
    };

    let date_ca = col("date")?.date().map_err(|e| typed("date", e))?;
    let instrument_ca = col("instrument")?.str().map_err(|e| typed("instrument", e))?;
    let calendar_ca = col("calendar")?.str().map_err(|e| typed("calendar", e))?;
    let open_ca = col("open")?.f64().map_err(|e| typed("open", e))?;
    let high_ca = col("high")?.f64().map_err(|e| typed("high", e))?;
    let low_ca = col("low")?.f64().map_err(|e| typed("low", e))?;
    let close_ca = col("close")?.f64().map_err(|e| typed("close", e))?;
    let adj_close_ca = col("adj_close")?.f64().map_err(|e| typed("adj_close", e))?;
    let volume_ca = col("volume")?.u64().map_err(|e| typed("volume", e))?;

    let indicator_names: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|name| name.as_str().to_string())
        .filter(|name| !FIXED_COLUMNS.contains(&name.as_str()))
        .collect();
    let mut indicator_cas = Vec::with_capacity(indicator_names.len());
    for name in &indicator_names {
        indicator_cas.push(col(name)?.f64().map_err(|e| typed(name, e))?);
    }

    let n = df.height();
    let mut rows = Vec::with_capacity(n);

    for i in 0..n {
        let date_days = date_ca
            .get(i)
            .ok_or_else(|| StoreError::Parquet(format!("null date at row {i}")))?;
        let date = epoch() + chrono::Duration::days(date_days as i64);
        let instrument = instrument_ca
            .get(i)
            .ok_or_else(|| StoreError::Parquet(format!("null instrument at row {i}")))?;
        let calendar = calendar_ca
            .get(i)
            .ok_or_else(|| StoreError::Parquet(format!("null calendar at row {i}")))?;

        let mut indicators = BTreeMap::new();
        for (name, ca) in indicator_names.iter().zip(&indicator_cas) {
            indicators.insert(IndicatorId::new(name.clone()), ca.get(i));
        }

        rows.push(AlignedRecord {
            date,
            instrument: instrument.to_string(),
            calendar: calendar.to_string(),
            open: open_ca.get(i),
            high: high_ca.get(i),
            low: low_ca.get(i),
            close: close_ca.get(i),
            adj_close: adj_close_ca.get(i),
            volume: volume_ca.get(i),
            indicators,
        });
    }

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::atomic::{AtomicU64, Ordering};

    static TEST_COUNTER: AtomicU64 = AtomicU64::new(0);

    fn temp_store() -> (PathBuf, ParquetAlignedStore) {
        let id = TEST_COUNTER.fetch_add(1, Ordering::Relaxed);
        let dir = env::temp_dir().join(format!("marketframe_store_{}_{id}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        let store = ParquetAlignedStore::new(&dir);
        (dir, store)
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn row(day: NaiveDate, close: Option<f64>, rate: Option<f64>) -> AlignedRecord {
        let mut indicators = BTreeMap::new();
        indicators.insert(IndicatorId::new("interest_rate_monthly_us"), rate);
        AlignedRecord {
            date: day,
            instrument: "AAPL".into(),
            calendar: "XNYS".into(),
            open: close.map(|c| c - 1.0),
            high: close.map(|c| c + 1.0),
            low: close.map(|c| c - 2.0),
            close,
            adj_close: close,
            volume: close.map(|_| 1_000),
            indicators,
        }
    }

    #[test]
    fn write_and_query_roundtrip() {
        let (dir, store) = temp_store();
        let rows = vec![
            row(date(2024, 1, 2), Some(100.0), None),
            row(date(2024, 1, 3), None, Some(5.25)),
        ];

        let written = store
            .replace_range("AAPL", date(2024, 1, 1), date(2024, 1, 31), &rows)
            .unwrap();
        assert_eq!(written, 2);

        let loaded = store
            .query_range("AAPL", date(2024, 1, 1), date(2024, 1, 31))
            .unwrap();
        assert_eq!(loaded, rows);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn replacement_preserves_rows_outside_the_range() {
        let (dir, store) = temp_store();
        let january = vec![
            row(date(2024, 1, 2), Some(100.0), Some(5.25)),
            row(date(2024, 1, 3), Some(101.0), Some(5.25)),
        ];
        store
            .replace_range("AAPL", date(2024, 1, 1), date(2024, 1, 31), &january)
            .unwrap();

        let february = vec![row(date(2024, 2, 1), Some(110.0), Some(5.00))];
        store
            .replace_range("AAPL", date(2024, 2, 1), date(2024, 2, 29), &february)
            .unwrap();

        let all = store
            .query_range("AAPL", date(2024, 1, 1), date(2024, 12, 31))
            .unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].close, Some(100.0));
        assert_eq!(all[2].close, Some(110.0));

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn replacement_deletes_the_old_slice() {
        let (dir, store) = temp_store();
        store
            .replace_range(
                "AAPL",
                date(2024, 1, 1),
                date(2024, 1, 31),
                &[
                    row(date(2024, 1, 2), Some(1.0), None),
                    row(date(2024, 1, 3), Some(2.0), None),
                ],
            )
            .unwrap();

        // Rebuild the same window with one row: the other must be gone.
        store
            .replace_range(
                "AAPL",
                date(2024, 1, 1),
                date(2024, 1, 31),
                &[row(date(2024, 1, 2), Some(9.0), None)],
            )
            .unwrap();

        let all = store
            .query_range("AAPL", date(2024, 1, 1), date(2024, 1, 31))
            .unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].close, Some(9.0));

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn out_of_range_row_is_rejected_before_commit() {
        let (dir, store) = temp_store();
        let prior = vec![row(date(2024, 1, 2), Some(1.0), None)];
        store
            .replace_range("AAPL", date(2024, 1, 1), date(2024, 1, 31), &prior)
            .unwrap();

        let bad = vec![row(date(2024, 3, 1), Some(2.0), None)];
        let err = store
            .replace_range("AAPL", date(2024, 2, 1), date(2024, 2, 29), &bad)
            .unwrap_err();
        assert!(matches!(err, StoreError::RowOutsideRange { .. }));

        // Prior rows untouched.
        let all = store
            .query_range("AAPL", date(2024, 1, 1), date(2024, 12, 31))
            .unwrap();
        assert_eq!(all, prior);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn duplicate_key_is_rejected() {
        let (dir, store) = temp_store();
        let dup = vec![
            row(date(2024, 1, 2), Some(1.0), None),
            row(date(2024, 1, 2), Some(2.0), None),
        ];
        let err = store
            .replace_range("AAPL", date(2024, 1, 1), date(2024, 1, 31), &dup)
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateKey { .. }));

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn mismatched_instrument_is_rejected() {
        let (dir, store) = temp_store();
        let rows = vec![row(date(2024, 1, 2), Some(1.0), None)];
        let err = store
            .replace_range("MSFT", date(2024, 1, 1), date(2024, 1, 31), &rows)
            .unwrap_err();
        assert!(matches!(err, StoreError::InstrumentMismatch { .. }));

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn query_of_unknown_instrument_is_empty() {
        let (dir, store) = temp_store();
        let rows = store
            .query_range("NOPE", date(2024, 1, 1), date(2024, 12, 31))
            .unwrap();
        assert!(rows.is_empty());

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn replacing_with_nothing_clears_the_slice() {
        let (dir, store) = temp_store();
        store
            .replace_range(
                "AAPL",
                date(2024, 1, 1),
                date(2024, 1, 31),
                &[row(date(2024, 1, 2), Some(1.0), None)],
            )
            .unwrap();

        let written = store
            .replace_range("AAPL", date(2024, 1, 1), date(2024, 1, 31), &[])
            .unwrap();
        assert_eq!(written, 0);
        assert!(store
            .query_range("AAPL", date(2024, 1, 1), date(2024, 12, 31))
            .unwrap()
            .is_empty());
        assert!(store.meta("AAPL").is_none());

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn content_hash_is_deterministic_across_rebuilds() {
        let (dir, store) = temp_store();
        let rows = vec![
            row(date(2024, 1, 2), Some(100.0), Some(5.25)),
            row(date(2024, 1, 3), None, Some(5.25)),
        ];

        store
            .replace_range("AAPL", date(2024, 1, 1), date(2024, 1, 31), &rows)
            .unwrap();
        let first = store.meta("AAPL").unwrap();

        store
            .replace_range("AAPL", date(2024, 1, 1), date(2024, 1, 31), &rows)
            .unwrap();
        let second = store.meta("AAPL").unwrap();

        assert_eq!(first.data_hash, second.data_hash);
        assert_eq!(first.row_count, 2);
        assert_eq!(
            first.indicator_columns,
            vec!["interest_rate_monthly_us".to_string()]
        );

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn indicator_columns_union_across_slices() {
        let (dir, store) = temp_store();

        let mut jan = row(date(2024, 1, 2), Some(1.0), Some(5.25));
        jan.indicators
            .insert(IndicatorId::new("inflation_monthly_us"), Some(3.1));
        store
            .replace_range("AAPL", date(2024, 1, 1), date(2024, 1, 31), &[jan])
            .unwrap();

        // February rows only carry the rate column.
        let feb = row(date(2024, 2, 1), Some(2.0), Some(5.00));
        store
            .replace_range("AAPL", date(2024, 2, 1), date(2024, 2, 29), &[feb])
            .unwrap();

        let all = store
            .query_range("AAPL", date(2024, 1, 1), date(2024, 12, 31))
            .unwrap();
        let inflation = IndicatorId::new("inflation_monthly_us");
        assert_eq!(all[0].indicator(&inflation), Some(3.1));
        // The February row gained the column as null, not a fabricated value.
        assert!(all[1].indicators.contains_key(&inflation));
        assert_eq!(all[1].indicator(&inflation), None);

        let _ = fs::remove_dir_all(&dir);
    }
}
