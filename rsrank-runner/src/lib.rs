//! RS Rank Runner — market configuration, fetch isolation, publication.
//!
//! This crate builds on `rsrank-core` to provide:
//! - Per-market TOML config with Korea and US presets
//! - Index and candidate fetching with per-symbol failure isolation
//! - Exchange listing name registry
//! - Publication sinks (local file, HTTP document store, mirrored)
//! - Console ranking report and the market quote board

pub mod config;
pub mod loader;
pub mod names;
pub mod quotes;
pub mod report;
pub mod runner;
pub mod sink;

pub use config::{
    ConfigError, MarketConfig, PublishConfig, RankingConfig, StoreConfig, KRX_LISTING_PATH,
};
pub use loader::{load_market, DroppedSymbol, LoadedMarket};
pub use names::NameRegistry;
pub use quotes::{
    build_board, default_instruments, BondQuote, Bonds, Instrument, InstrumentKind, MarketBoard,
    QuoteItem,
};
pub use report::render_ranking;
pub use runner::{build_sink, load_names, publish, run_ranking, RankingRun};
pub use sink::{DocumentStore, FileSink, MirroredSink, PublicationSink, PublishError};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn config_types_are_send_sync() {
        assert_send::<RankingConfig>();
        assert_sync::<RankingConfig>();
    }

    #[test]
    fn run_outputs_are_send_sync() {
        assert_send::<RankingRun>();
        assert_sync::<RankingRun>();
        assert_send::<MarketBoard>();
        assert_sync::<MarketBoard>();
    }

    #[test]
    fn registry_is_send_sync() {
        assert_send::<NameRegistry>();
        assert_sync::<NameRegistry>();
    }
}
