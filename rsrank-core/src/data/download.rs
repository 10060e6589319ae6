//! Batch download: warm the cache for a list of symbols.

use super::cache::{CachedProvider, ParquetCache};
use super::provider::{DataError, DataProvider};
use chrono::NaiveDate;
use tracing::{info, warn};

/// Outcome of a batch download.
#[derive(Debug)]
pub struct DownloadSummary {
    pub total: usize,
    pub succeeded: usize,
    pub errors: Vec<(String, DataError)>,
}

impl DownloadSummary {
    pub fn failed(&self) -> usize {
        self.errors.len()
    }

    pub fn all_succeeded(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Fetch each symbol through the cache, isolating failures per symbol.
///
/// Stops early (marking the rest as blocked) once the provider reports it is
/// unavailable, e.g. after the circuit breaker trips.
pub fn download_symbols(
    provider: &dyn DataProvider,
    cache: &ParquetCache,
    symbols: &[&str],
    start: NaiveDate,
    end: NaiveDate,
    force: bool,
) -> DownloadSummary {
    let cached = CachedProvider::new(provider, cache).force_refresh(force);
    let total = symbols.len();
    let mut succeeded = 0;
    let mut errors = Vec::new();

    for (i, symbol) in symbols.iter().enumerate() {
        match cached.fetch(symbol, start, end) {
            Ok(result) => {
                info!(
                    symbol = *symbol,
                    closes = result.series.len(),
                    source = ?result.source,
                    "[{}/{total}] ok",
                    i + 1
                );
                succeeded += 1;
            }
            Err(e) => {
                warn!(symbol = *symbol, kind = %e.kind(), error = %e, "[{}/{total}] failed", i + 1);
                errors.push((symbol.to_string(), e));
            }
        }

        if !provider.is_available() {
            for rest in &symbols[i + 1..] {
                errors.push((rest.to_string(), DataError::CircuitBreakerTripped));
            }
            break;
        }
    }

    info!(succeeded, failed = errors.len(), total, "download complete");
    DownloadSummary {
        total,
        succeeded,
        errors,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::memory::MemoryProvider;
    use crate::domain::PriceSeries;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn one_failure_does_not_stop_the_batch() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ParquetCache::new(dir.path());
        let provider = MemoryProvider::new()
            .with_series(PriceSeries::from_closes("AAA", d("2024-01-01"), &[1.0, 2.0]))
            .with_series(PriceSeries::from_closes("CCC", d("2024-01-01"), &[3.0, 4.0]));

        let summary = download_symbols(
            &provider,
            &cache,
            &["AAA", "BBB", "CCC"],
            d("2024-01-01"),
            d("2024-01-02"),
            false,
        );

        assert_eq!(summary.total, 3);
        assert_eq!(summary.succeeded, 2);
        assert_eq!(summary.failed(), 1);
        assert_eq!(summary.errors[0].0, "BBB");
        assert!(cache.get_meta("CCC").is_some());
    }
}
