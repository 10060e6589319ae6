//! Data provider trait and structured error types.
//!
//! The DataProvider trait abstracts over close-price sources (Yahoo Finance,
//! the Parquet cache, synthetic walks, in-memory fixtures) so the runner can
//! swap them and tests can mock them.

use crate::domain::PriceSeries;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Structured error types for data operations.
///
/// Displayable in CLI logs; `kind()` gives the coarse class used when a
/// per-symbol failure is logged and dropped.
#[derive(Debug, Clone, Error)]
pub enum DataError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("authentication required: {0}")]
    AuthenticationRequired(String),

    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("provider returned no closes for '{symbol}'")]
    EmptySeries { symbol: String },

    #[error("hard stop: data provider has blocked requests (circuit breaker tripped)")]
    CircuitBreakerTripped,

    #[error("cache error: {0}")]
    CacheError(String),

    #[error("parquet I/O error: {0}")]
    ParquetError(String),

    #[error("no cached data for symbol '{symbol}'; run `download {symbol}` first")]
    NoCachedData { symbol: String },

    #[error("data error: {0}")]
    Other(String),
}

/// Coarse classification of a fetch failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchFailureKind {
    /// Connection refused, DNS, timeout.
    Network,
    /// Rate limit, ban, missing credentials.
    Blocked,
    /// Unknown symbol or an empty result.
    NotFound,
    /// Response could not be parsed.
    Format,
    /// Local cache unreadable or missing in offline mode.
    Cache,
    Other,
}

impl fmt::Display for FetchFailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FetchFailureKind::Network => "network",
            FetchFailureKind::Blocked => "blocked",
            FetchFailureKind::NotFound => "not-found",
            FetchFailureKind::Format => "format",
            FetchFailureKind::Cache => "cache",
            FetchFailureKind::Other => "other",
        };
        f.write_str(label)
    }
}

impl DataError {
    pub fn kind(&self) -> FetchFailureKind {
        match self {
            DataError::NetworkUnreachable(_) => FetchFailureKind::Network,
            DataError::RateLimited { .. }
            | DataError::AuthenticationRequired(_)
            | DataError::CircuitBreakerTripped => FetchFailureKind::Blocked,
            DataError::SymbolNotFound { .. } | DataError::EmptySeries { .. } => {
                FetchFailureKind::NotFound
            }
            DataError::ResponseFormatChanged(_) => FetchFailureKind::Format,
            DataError::CacheError(_)
            | DataError::ParquetError(_)
            | DataError::NoCachedData { .. } => FetchFailureKind::Cache,
            DataError::Other(_) => FetchFailureKind::Other,
        }
    }
}

/// Result of a successful fetch for a single symbol.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub symbol: String,
    pub series: PriceSeries,
    pub source: DataSource,
}

/// Where the data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    YahooFinance,
    Cache,
    Synthetic,
    Memory,
}

/// Trait for close-price providers.
///
/// Implementations handle the specifics of one source. Caching is layered on
/// top by `CachedProvider`; providers themselves know nothing about it.
pub trait DataProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Fetch daily closes for a symbol over `[start, end]`.
    ///
    /// An empty result is reported as `DataError::EmptySeries`, never as an
    /// empty `Ok`.
    fn fetch(&self, symbol: &str, start: NaiveDate, end: NaiveDate)
        -> Result<FetchResult, DataError>;

    /// Whether the provider will currently accept requests.
    fn is_available(&self) -> bool;
}
