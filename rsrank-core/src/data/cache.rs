//! Parquet cache of close-price history, Hive-style partitioned.
//!
//! Layout: `{cache_dir}/symbol={SYMBOL}/{year}.parquet` with columns
//! `date` (Date) and `close` (Float64), plus a `meta.json` sidecar.
//!
//! - Atomic writes (write to .tmp, rename into place)
//! - Integrity validation on load; corrupt files are renamed `.quarantined`
//! - `CachedProvider` serves covered ranges locally and writes through on miss

use super::provider::{DataError, DataProvider, DataSource, FetchResult};
use crate::domain::{PricePoint, PriceSeries};
use chrono::{Datelike, NaiveDate};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Metadata sidecar for a cached symbol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheMeta {
    pub symbol: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub point_count: usize,
    pub data_hash: String,
    pub source: DataSource,
    pub cached_at: chrono::NaiveDateTime,
}

/// How well the cache covers a requested range.
#[derive(Debug, Clone, PartialEq)]
pub enum CoverageResult {
    NotCached,
    FullyCovered,
    PartiallyCovered {
        cached_start: NaiveDate,
        cached_end: NaiveDate,
    },
}

pub struct ParquetCache {
    cache_dir: PathBuf,
}

impl ParquetCache {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
        }
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Symbols are file-system names here; `^KS11` and `KRW=X` are fine on
    /// every platform we run on, `/` is not.
    fn symbol_dir(&self, symbol: &str) -> PathBuf {
        self.cache_dir
            .join(format!("symbol={}", symbol.replace(['/', '\\'], "_")))
    }

    fn year_path(&self, symbol: &str, year: i32) -> PathBuf {
        self.symbol_dir(symbol).join(format!("{year}.parquet"))
    }

    fn meta_path(&self, symbol: &str) -> PathBuf {
        self.symbol_dir(symbol).join("meta.json")
    }

    /// Write a symbol's series, one Parquet file per calendar year.
    pub fn write(&self, series: &PriceSeries, source: DataSource) -> Result<(), DataError> {
        let (Some(first), Some(last)) = (series.first_date(), series.last_date()) else {
            return Err(DataError::CacheError("no closes to cache".into()));
        };
        self.write_covering(series, source, first, last)
    }

    /// Like `write`, but records `[start, end]` as covered even where the
    /// provider had no sessions (weekends, holidays).
    ///
    /// New closes are merged into what is already cached: years the series
    /// touches are rewritten with the union of old and new points (new wins
    /// on the same date), and the covered range grows to the union of the old
    /// and new ranges when the two overlap or touch. A disjoint write keeps
    /// only the new range.
    pub fn write_covering(
        &self,
        series: &PriceSeries,
        source: DataSource,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<(), DataError> {
        let (Some(first), Some(last)) = (series.first_date(), series.last_date()) else {
            return Err(DataError::CacheError("no closes to cache".into()));
        };
        let mut start_date = start.min(first);
        let mut end_date = end.max(last);
        let symbol = series.symbol();

        let merged = match self.load(symbol) {
            Ok(existing) => {
                if let Some(meta) = self.get_meta(symbol) {
                    let touches = meta.start_date <= end_date + chrono::Duration::days(1)
                        && start_date <= meta.end_date + chrono::Duration::days(1);
                    if touches {
                        start_date = start_date.min(meta.start_date);
                        end_date = end_date.max(meta.end_date);
                    }
                }
                let points = existing
                    .points()
                    .iter()
                    .chain(series.points())
                    .copied()
                    .collect();
                PriceSeries::new(symbol, points)
            }
            Err(_) => series.clone(),
        };

        let sym_dir = self.symbol_dir(symbol);
        fs::create_dir_all(&sym_dir)
            .map_err(|e| DataError::CacheError(format!("failed to create dir: {e}")))?;

        let touched: BTreeSet<i32> = series.points().iter().map(|p| p.date.year()).collect();
        let mut by_year: BTreeMap<i32, Vec<&PricePoint>> = BTreeMap::new();
        for point in merged.points() {
            if touched.contains(&point.date.year()) {
                by_year.entry(point.date.year()).or_default().push(point);
            }
        }

        for (year, points) in &by_year {
            let mut df = points_to_dataframe(points)?;
            let path = self.year_path(symbol, *year);
            let tmp_path = path.with_extension("parquet.tmp");

            write_parquet(&mut df, &tmp_path)?;
            fs::rename(&tmp_path, &path).map_err(|e| {
                let _ = fs::remove_file(&tmp_path);
                DataError::CacheError(format!("atomic rename failed: {e}"))
            })?;
        }

        let meta = CacheMeta {
            symbol: symbol.to_string(),
            start_date,
            end_date,
            point_count: merged.len(),
            data_hash: blake3::hash(
                &serde_json::to_vec(merged.points())
                    .map_err(|e| DataError::CacheError(format!("hash serialization: {e}")))?,
            )
            .to_hex()
            .to_string(),
            source,
            cached_at: chrono::Local::now().naive_local(),
        };
        let meta_json = serde_json::to_string_pretty(&meta)
            .map_err(|e| DataError::CacheError(format!("meta serialization: {e}")))?;
        fs::write(self.meta_path(symbol), meta_json)
            .map_err(|e| DataError::CacheError(format!("meta write: {e}")))?;

        debug!(symbol, points = merged.len(), %start_date, %end_date, "cached close series");
        Ok(())
    }

    /// Load everything cached for a symbol, sorted ascending.
    pub fn load(&self, symbol: &str) -> Result<PriceSeries, DataError> {
        let sym_dir = self.symbol_dir(symbol);
        if !sym_dir.exists() {
            return Err(DataError::NoCachedData {
                symbol: symbol.to_string(),
            });
        }

        let entries =
            fs::read_dir(&sym_dir).map_err(|e| DataError::CacheError(format!("read dir: {e}")))?;

        let mut points = Vec::new();
        for entry in entries {
            let path = entry
                .map_err(|e| DataError::CacheError(format!("dir entry: {e}")))?
                .path();
            if path.extension().and_then(|e| e.to_str()) != Some("parquet") {
                continue;
            }

            match load_and_validate_parquet(&path) {
                Ok(year_points) => points.extend(year_points),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "quarantining corrupt cache file");
                    let _ = fs::rename(&path, path.with_extension("parquet.quarantined"));
                }
            }
        }

        let series = PriceSeries::new(symbol, points);
        if series.is_empty() {
            return Err(DataError::NoCachedData {
                symbol: symbol.to_string(),
            });
        }
        Ok(series)
    }

    pub fn get_meta(&self, symbol: &str) -> Option<CacheMeta> {
        let content = fs::read_to_string(self.meta_path(symbol)).ok()?;
        serde_json::from_str(&content).ok()
    }

    /// Metadata for every cached symbol, sorted by symbol.
    pub fn entries(&self) -> Vec<CacheMeta> {
        let Ok(dir) = fs::read_dir(&self.cache_dir) else {
            return Vec::new();
        };
        let mut metas: Vec<CacheMeta> = dir
            .flatten()
            .filter_map(|entry| {
                let name = entry.file_name().to_string_lossy().to_string();
                let symbol = name.strip_prefix("symbol=")?;
                self.get_meta(symbol)
            })
            .collect();
        metas.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        metas
    }

    pub fn covers_range(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> CoverageResult {
        match self.get_meta(symbol) {
            None => CoverageResult::NotCached,
            Some(meta) if meta.start_date <= start && meta.end_date >= end => {
                CoverageResult::FullyCovered
            }
            Some(meta) => CoverageResult::PartiallyCovered {
                cached_start: meta.start_date,
                cached_end: meta.end_date,
            },
        }
    }
}

/// Read-through cache in front of another provider.
///
/// Offline mode serves whatever the cache holds for the range and never calls
/// the inner provider. `force` skips the cache lookup but still writes through.
///
/// A range reaching `today` is only recorded as covered up to the last close
/// actually received, so a session that has not closed yet is refetched on
/// the next run.
pub struct CachedProvider<'a> {
    inner: Option<&'a dyn DataProvider>,
    cache: &'a ParquetCache,
    force: bool,
    today: NaiveDate,
}

impl<'a> CachedProvider<'a> {
    pub fn new(inner: &'a dyn DataProvider, cache: &'a ParquetCache) -> Self {
        Self {
            inner: Some(inner),
            cache,
            force: false,
            today: chrono::Local::now().date_naive(),
        }
    }

    pub fn offline(cache: &'a ParquetCache) -> Self {
        Self {
            inner: None,
            cache,
            force: false,
            today: chrono::Local::now().date_naive(),
        }
    }

    pub fn force_refresh(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    /// Override the local date used to decide whether a range is still open.
    pub fn as_of(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    fn from_cache(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<FetchResult, DataError> {
        let series = self.cache.load(symbol)?.between(start, end);
        if series.is_empty() {
            return Err(DataError::EmptySeries {
                symbol: symbol.to_string(),
            });
        }
        Ok(FetchResult {
            symbol: symbol.to_string(),
            series,
            source: DataSource::Cache,
        })
    }
}

impl DataProvider for CachedProvider<'_> {
    fn name(&self) -> &str {
        "parquet_cache"
    }

    fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<FetchResult, DataError> {
        let Some(inner) = self.inner else {
            return self.from_cache(symbol, start, end);
        };

        if !self.force
            && self.cache.covers_range(symbol, start, end) == CoverageResult::FullyCovered
        {
            match self.from_cache(symbol, start, end) {
                Ok(hit) => return Ok(hit),
                Err(e) => debug!(symbol, error = %e, "cache hit unreadable, refetching"),
            }
        }

        let fetched = inner.fetch(symbol, start, end)?;
        let covered_end = if end >= self.today {
            fetched.series.last_date().map_or(end, |last| last.min(end))
        } else {
            end
        };
        if let Err(e) = self
            .cache
            .write_covering(&fetched.series, fetched.source, start, covered_end)
        {
            warn!(symbol, error = %e, "failed to cache fetched series");
        }
        Ok(fetched)
    }

    fn is_available(&self) -> bool {
        self.inner.map_or(true, |p| p.is_available())
    }
}

// ── Parquet I/O helpers ─────────────────────────────────────────────

fn epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or_default()
}

fn points_to_dataframe(points: &[&PricePoint]) -> Result<DataFrame, DataError> {
    let epoch = epoch();
    let dates: Vec<i32> = points
        .iter()
        .map(|p| (p.date - epoch).num_days() as i32)
        .collect();
    let closes: Vec<f64> = points.iter().map(|p| p.close).collect();

    DataFrame::new(vec![
        Column::new("date".into(), dates)
            .cast(&DataType::Date)
            .map_err(|e| DataError::ParquetError(format!("date cast: {e}")))?,
        Column::new("close".into(), closes),
    ])
    .map_err(|e| DataError::ParquetError(format!("dataframe creation: {e}")))
}

fn write_parquet(df: &mut DataFrame, path: &Path) -> Result<(), DataError> {
    let file =
        fs::File::create(path).map_err(|e| DataError::ParquetError(format!("create file: {e}")))?;
    ParquetWriter::new(file)
        .finish(df)
        .map_err(|e| DataError::ParquetError(format!("write parquet: {e}")))?;
    Ok(())
}

fn load_and_validate_parquet(path: &Path) -> Result<Vec<PricePoint>, DataError> {
    let file = fs::File::open(path).map_err(|e| DataError::ParquetError(format!("open: {e}")))?;
    let df = ParquetReader::new(file)
        .finish()
        .map_err(|e| DataError::ParquetError(format!("read: {e}")))?;

    if df.height() == 0 {
        return Err(DataError::CacheError("empty parquet file".into()));
    }

    let map_err = |e: PolarsError| DataError::ParquetError(format!("column read: {e}"));
    let date_ca = df
        .column("date")
        .map_err(map_err)?
        .date()
        .map_err(|e| DataError::ParquetError(format!("date column type: {e}")))?;
    let close_ca = df
        .column("close")
        .map_err(map_err)?
        .f64()
        .map_err(|e| DataError::ParquetError(format!("close column type: {e}")))?;

    let epoch = epoch();
    let mut points = Vec::with_capacity(df.height());
    for i in 0..df.height() {
        let days = date_ca
            .get(i)
            .ok_or_else(|| DataError::ParquetError(format!("null date at row {i}")))?;
        if let Some(close) = close_ca.get(i) {
            points.push(PricePoint {
                date: epoch + chrono::Duration::days(days as i64),
                close,
            });
        }
    }
    Ok(points)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::memory::MemoryProvider;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn sample() -> PriceSeries {
        PriceSeries::new(
            "SPY",
            vec![
                PricePoint { date: d("2023-12-29"), close: 475.31 },
                PricePoint { date: d("2024-01-02"), close: 472.65 },
                PricePoint { date: d("2024-01-03"), close: 468.79 },
            ],
        )
    }

    #[test]
    fn epoch_is_unix_epoch() {
        assert_eq!(epoch(), d("1970-01-01"));
    }

    #[test]
    fn write_and_load_across_years() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ParquetCache::new(dir.path());

        cache.write(&sample(), DataSource::YahooFinance).unwrap();
        assert!(dir.path().join("symbol=SPY/2023.parquet").exists());
        assert!(dir.path().join("symbol=SPY/2024.parquet").exists());

        let loaded = cache.load("SPY").unwrap();
        assert_eq!(loaded, sample());
    }

    #[test]
    fn meta_records_range() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ParquetCache::new(dir.path());
        cache.write(&sample(), DataSource::YahooFinance).unwrap();

        let meta = cache.get_meta("SPY").unwrap();
        assert_eq!(meta.point_count, 3);
        assert_eq!(meta.start_date, d("2023-12-29"));
        assert_eq!(meta.end_date, d("2024-01-03"));
        assert_eq!(cache.entries().len(), 1);
    }

    #[test]
    fn missing_symbol_is_no_cached_data() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ParquetCache::new(dir.path());
        assert!(matches!(
            cache.load("QQQ"),
            Err(DataError::NoCachedData { .. })
        ));
    }

    #[test]
    fn corrupt_file_is_quarantined() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ParquetCache::new(dir.path());
        cache.write(&sample(), DataSource::YahooFinance).unwrap();

        let bad = dir.path().join("symbol=SPY/2023.parquet");
        fs::write(&bad, b"not parquet").unwrap();

        let loaded = cache.load("SPY").unwrap();
        assert_eq!(loaded.len(), 2);
        assert!(dir.path().join("symbol=SPY/2023.parquet.quarantined").exists());
    }

    #[test]
    fn coverage_check() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ParquetCache::new(dir.path());
        cache.write(&sample(), DataSource::YahooFinance).unwrap();

        assert_eq!(
            cache.covers_range("SPY", d("2024-01-02"), d("2024-01-03")),
            CoverageResult::FullyCovered
        );
        assert!(matches!(
            cache.covers_range("SPY", d("2023-01-01"), d("2024-01-03")),
            CoverageResult::PartiallyCovered { .. }
        ));
        assert_eq!(
            cache.covers_range("QQQ", d("2024-01-02"), d("2024-01-03")),
            CoverageResult::NotCached
        );
    }

    #[test]
    fn cached_provider_writes_through_then_serves_offline() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ParquetCache::new(dir.path());
        let upstream = MemoryProvider::new().with_series(sample());

        let online = CachedProvider::new(&upstream, &cache);
        let first = online.fetch("SPY", d("2023-12-01"), d("2024-01-31")).unwrap();
        assert_eq!(first.source, DataSource::Memory);
        assert_eq!(
            cache.covers_range("SPY", d("2023-12-01"), d("2024-01-31")),
            CoverageResult::FullyCovered
        );

        // Covered now, so the online provider answers from disk too.
        let again = online.fetch("SPY", d("2023-12-01"), d("2024-01-31")).unwrap();
        assert_eq!(again.source, DataSource::Cache);

        let offline = CachedProvider::offline(&cache);
        let second = offline.fetch("SPY", d("2023-12-01"), d("2024-01-31")).unwrap();
        assert_eq!(second.source, DataSource::Cache);
        assert_eq!(second.series, first.series);
    }

    #[test]
    fn offline_miss_is_cache_error() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ParquetCache::new(dir.path());
        let offline = CachedProvider::offline(&cache);
        let err = offline.fetch("SPY", d("2024-01-01"), d("2024-02-01")).unwrap_err();
        assert_eq!(err.kind(), crate::data::FetchFailureKind::Cache);
    }

    fn daily(symbol: &str, from: &str, n: i64, base: f64) -> PriceSeries {
        let closes: Vec<f64> = (0..n).map(|i| base + i as f64).collect();
        PriceSeries::from_closes(symbol, d(from), &closes)
    }

    #[test]
    fn partial_refetch_keeps_earlier_sessions_of_the_year() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ParquetCache::new(dir.path());
        let full_year = daily("SPY", "2024-01-01", 366, 400.0);
        cache.write(&full_year, DataSource::YahooFinance).unwrap();

        // Second half of 2024 plus a few days of 2025, with revised closes.
        let upstream = MemoryProvider::new().with_series(daily("SPY", "2024-07-01", 189, 900.0));
        let online = CachedProvider::new(&upstream, &cache).as_of(d("2025-06-01"));
        let fetched = online.fetch("SPY", d("2024-07-01"), d("2025-01-05")).unwrap();
        assert_eq!(fetched.source, DataSource::Memory);

        let loaded = cache.load("SPY").unwrap();
        assert_eq!(loaded.first_date(), Some(d("2024-01-01")));
        assert_eq!(loaded.last_date(), Some(d("2025-01-05")));
        assert_eq!(loaded.len(), 366 + 5);
        assert_eq!(loaded.between(d("2024-06-30"), d("2024-06-30")).points()[0].close, 400.0 + 181.0);
        assert_eq!(loaded.between(d("2024-07-01"), d("2024-07-01")).points()[0].close, 900.0);

        let meta = cache.get_meta("SPY").unwrap();
        assert_eq!(meta.start_date, d("2024-01-01"));
        assert_eq!(meta.end_date, d("2025-01-05"));
        assert_eq!(meta.point_count, 371);

        let offline = CachedProvider::offline(&cache);
        let year = offline.fetch("SPY", d("2024-01-01"), d("2024-12-31")).unwrap();
        assert_eq!(year.series.len(), 366);
    }

    #[test]
    fn disjoint_write_keeps_only_the_new_range() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ParquetCache::new(dir.path());
        cache.write(&daily("SPY", "2020-03-02", 5, 300.0), DataSource::YahooFinance).unwrap();
        cache.write(&daily("SPY", "2024-03-04", 5, 500.0), DataSource::YahooFinance).unwrap();

        let meta = cache.get_meta("SPY").unwrap();
        assert_eq!(meta.start_date, d("2024-03-04"));
        assert_eq!(meta.point_count, 10);
        assert_eq!(
            cache.covers_range("SPY", d("2021-01-01"), d("2024-03-08")),
            CoverageResult::PartiallyCovered {
                cached_start: d("2024-03-04"),
                cached_end: d("2024-03-08"),
            }
        );
    }

    #[test]
    fn range_ending_today_is_refetched_until_the_close_arrives() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ParquetCache::new(dir.path());
        let today = d("2024-03-10");

        let morning = MemoryProvider::new().with_series(daily("SPY", "2024-03-01", 9, 500.0));
        let early = CachedProvider::new(&morning, &cache).as_of(today);
        early.fetch("SPY", d("2024-03-01"), today).unwrap();
        assert_eq!(cache.get_meta("SPY").unwrap().end_date, d("2024-03-09"));

        let evening = MemoryProvider::new().with_series(daily("SPY", "2024-03-01", 10, 500.0));
        let late = CachedProvider::new(&evening, &cache).as_of(today);
        let fetched = late.fetch("SPY", d("2024-03-01"), today).unwrap();
        assert_eq!(fetched.source, DataSource::Memory);
        assert_eq!(fetched.series.last_date(), Some(today));

        // Once the close is in, the same range is served from disk.
        let again = late.fetch("SPY", d("2024-03-01"), today).unwrap();
        assert_eq!(again.source, DataSource::Cache);
        assert_eq!(again.series.last_date(), Some(today));
    }

    #[test]
    fn past_range_records_full_window_despite_missing_sessions() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ParquetCache::new(dir.path());
        let upstream = MemoryProvider::new().with_series(daily("SPY", "2024-03-04", 5, 500.0));
        let online = CachedProvider::new(&upstream, &cache).as_of(d("2024-06-01"));
        online.fetch("SPY", d("2024-03-04"), d("2024-03-10")).unwrap();
        assert_eq!(cache.get_meta("SPY").unwrap().end_date, d("2024-03-10"));
    }
}
