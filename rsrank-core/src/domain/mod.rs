//! Domain types for the ranking engine.

pub mod series;
pub mod snapshot;

pub use series::{PricePoint, PriceSeries};
pub use snapshot::{format_update_time, PeriodScores, RankedEntry, RankingSnapshot, SortStandard};
