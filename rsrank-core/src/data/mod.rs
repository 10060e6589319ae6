//! Data ingestion: providers, caching, and multi-symbol alignment.

pub mod align;
pub mod cache;
pub mod circuit_breaker;
pub mod download;
pub mod memory;
pub mod provider;
pub mod synthetic;
pub mod universe;
pub mod yahoo;

pub use align::{align_to_index, AlignedMatrix, AlignedSeries};
pub use cache::{CacheMeta, CachedProvider, CoverageResult, ParquetCache};
pub use circuit_breaker::CircuitBreaker;
pub use download::{download_symbols, DownloadSummary};
pub use memory::MemoryProvider;
pub use provider::{DataError, DataProvider, DataSource, FetchFailureKind, FetchResult};
pub use synthetic::SyntheticProvider;
pub use universe::{Universe, UniverseMember};
pub use yahoo::YahooProvider;
