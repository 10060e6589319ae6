//! In-memory provider backed by prepared series.
//!
//! Used by tests, benchmarks and dry runs; a symbol can also be primed to fail
//! with a specific `DataError`.

use super::provider::{DataError, DataProvider, DataSource, FetchResult};
use crate::domain::PriceSeries;
use chrono::NaiveDate;
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct MemoryProvider {
    series: HashMap<String, PriceSeries>,
    failures: HashMap<String, DataError>,
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a series under its own symbol.
    pub fn with_series(mut self, series: PriceSeries) -> Self {
        self.insert(series);
        self
    }

    /// Make every fetch of `symbol` fail with `error`.
    pub fn with_failure(mut self, symbol: &str, error: DataError) -> Self {
        self.failures.insert(symbol.to_string(), error);
        self
    }

    pub fn insert(&mut self, series: PriceSeries) {
        self.series.insert(series.symbol().to_string(), series);
    }
}

impl DataProvider for MemoryProvider {
    fn name(&self) -> &str {
        "memory"
    }

    fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<FetchResult, DataError> {
        if let Some(err) = self.failures.get(symbol) {
            return Err(err.clone());
        }
        let series = self
            .series
            .get(symbol)
            .ok_or_else(|| DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            })?
            .between(start, end);
        if series.is_empty() {
            return Err(DataError::EmptySeries {
                symbol: symbol.to_string(),
            });
        }
        Ok(FetchResult {
            symbol: symbol.to_string(),
            series,
            source: DataSource::Memory,
        })
    }

    fn is_available(&self) -> bool {
        true
    }
}
