//! Ranking run: wires config, fetching, scoring and publication together.
//!
//! Two entry points:
//! - `run_ranking()`: fetch, align and rank. No side effects beyond logging.
//! - `publish()`: hand a document to a sink; failures are logged, not raised.

use chrono::{NaiveDate, NaiveDateTime};
use rsrank_core::data::DataProvider;
use rsrank_core::ranking::{rank, NameLookup, RankingOutcome};
use rsrank_core::RankError;
use serde::Serialize;
use std::path::Path;
use tracing::{error, info};

use crate::config::{PublishConfig, RankingConfig};
use crate::loader::{load_market, DroppedSymbol};
use crate::names::NameRegistry;
use crate::sink::{DocumentStore, FileSink, MirroredSink, PublicationSink, PublishError};

/// Everything one ranking run produced.
#[derive(Debug, Clone)]
pub struct RankingRun {
    pub outcome: RankingOutcome,
    pub dropped: Vec<DroppedSymbol>,
    pub has_synthetic: bool,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// Fetch, align and rank one market ending at `end`.
pub fn run_ranking(
    config: &RankingConfig,
    provider: &dyn DataProvider,
    names: &dyn NameLookup,
    end: NaiveDate,
    generated_at: NaiveDateTime,
) -> Result<RankingRun, RankError> {
    config.ranking.validate()?;
    let start = config.ranking.lookback_start(end);
    info!(
        market = %config.market.name,
        members = config.universe.len(),
        provider = provider.name(),
        "ranking run started"
    );

    let loaded = load_market(provider, &config.market, &config.universe, start, end)?;
    let mut outcome = rank(
        &loaded.matrix,
        &config.ranking,
        &config.universe,
        names,
        generated_at,
    );
    if !config.market.emit_sort_standard {
        outcome.snapshot.sort_standard = None;
    }

    Ok(RankingRun {
        outcome,
        dropped: loaded.dropped,
        has_synthetic: loaded.has_synthetic,
        start,
        end,
    })
}

/// Registry named by the market config, or an empty one.
pub fn load_names(config: &RankingConfig) -> NameRegistry {
    match &config.market.name_registry {
        Some(path) => NameRegistry::load_or_empty(path),
        None => NameRegistry::empty(),
    }
}

/// Assemble the configured sink: store, mirror, both, or nothing.
///
/// `mirror_override` replaces `publish.mirror_dir` when given.
pub fn build_sink(
    publish: &PublishConfig,
    mirror_override: Option<&Path>,
) -> Result<Option<Box<dyn PublicationSink>>, PublishError> {
    let mirror = mirror_override
        .map(Path::to_path_buf)
        .or_else(|| publish.mirror_dir.clone())
        .map(FileSink::new);
    let store = publish.store.as_ref().map(DocumentStore::connect).transpose()?;

    let sink: Box<dyn PublicationSink> = match (store, mirror) {
        (Some(store), Some(mirror)) => Box::new(MirroredSink::new(store, mirror)),
        (Some(store), None) => Box::new(store),
        (None, Some(mirror)) => Box::new(mirror),
        (None, None) => return Ok(None),
    };
    Ok(Some(sink))
}

/// Serialize and publish. Returns whether the document was accepted.
pub fn publish<T: Serialize>(sink: &dyn PublicationSink, key: &str, document: &T) -> bool {
    let result = serde_json::to_value(document)
        .map_err(PublishError::from)
        .and_then(|value| sink.publish(key, &value));
    match result {
        Ok(()) => {
            info!(sink = sink.name(), key, "published");
            true
        }
        Err(e) => {
            error!(sink = sink.name(), key, error = %e, "publication failed");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreConfig;

    #[test]
    fn no_destinations_means_no_sink() {
        assert!(build_sink(&PublishConfig::default(), None).unwrap().is_none());
    }

    #[test]
    fn mirror_override_wins() {
        let dir = tempfile::tempdir().unwrap();
        let publish = PublishConfig {
            mirror_dir: Some("/nonexistent/never".into()),
            store: None,
        };
        let sink = build_sink(&publish, Some(dir.path())).unwrap().unwrap();
        assert!(publish_ok(sink.as_ref()));
        assert!(dir.path().join("k.json").exists());
    }

    #[test]
    fn store_config_error_surfaces() {
        let publish = PublishConfig {
            mirror_dir: None,
            store: Some(StoreConfig {
                base_url: "".into(),
                collection: "rs_data".into(),
                token_env: None,
            }),
        };
        assert!(matches!(build_sink(&publish, None), Err(PublishError::Config(_))));
    }

    #[test]
    fn korea_names_come_from_configured_listing() {
        let dir = tempfile::tempdir().unwrap();
        let listing = dir.path().join("krx.csv");
        std::fs::write(&listing, "Code,Name\n005930,삼성전자\n").unwrap();

        let mut config = RankingConfig::korea();
        config.market.name_registry = Some(listing);
        let names = load_names(&config);
        assert_eq!(names.display_name("005930"), Some("삼성전자"));

        config.market.name_registry = Some(dir.path().join("missing.csv"));
        assert!(load_names(&config).is_empty());
    }

    fn publish_ok(sink: &dyn PublicationSink) -> bool {
        publish(sink, "k", &serde_json::json!({"ok": true}))
    }
}
