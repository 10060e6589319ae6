//! Fetch the index and every candidate, then align them.
//!
//! The index is mandatory: if it cannot be fetched the run is over. Each
//! candidate is fetched on its own; a failure drops that symbol only and is
//! logged with its failure class. Candidates keep universe order.

use crate::config::MarketConfig;
use chrono::NaiveDate;
use rsrank_core::data::{
    align_to_index, AlignedMatrix, DataError, DataProvider, DataSource, FetchFailureKind, Universe,
};
use rsrank_core::RankError;
use std::collections::BTreeMap;
use tracing::{info, warn};

/// A candidate that could not be fetched.
#[derive(Debug, Clone)]
pub struct DroppedSymbol {
    pub code: String,
    pub kind: FetchFailureKind,
    pub error: DataError,
}

#[derive(Debug)]
pub struct LoadedMarket {
    pub matrix: AlignedMatrix,
    pub dropped: Vec<DroppedSymbol>,
    pub has_synthetic: bool,
}

impl LoadedMarket {
    /// Dropped symbol count per failure class.
    pub fn drop_summary(&self) -> BTreeMap<String, usize> {
        let mut summary = BTreeMap::new();
        for d in &self.dropped {
            *summary.entry(d.kind.to_string()).or_insert(0) += 1;
        }
        summary
    }
}

pub fn load_market(
    provider: &dyn DataProvider,
    market: &MarketConfig,
    universe: &Universe,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<LoadedMarket, RankError> {
    info!(index = %market.index_symbol, %start, %end, "fetching index");
    let index = provider
        .fetch(&market.index_symbol, start, end)
        .and_then(|r| {
            if r.series.is_empty() {
                Err(DataError::EmptySeries {
                    symbol: market.index_symbol.clone(),
                })
            } else {
                Ok(r)
            }
        })
        .map_err(|source| RankError::FatalFetch {
            symbol: market.index_symbol.clone(),
            source,
        })?;
    let mut has_synthetic = index.source == DataSource::Synthetic;

    let total = universe.len();
    let mut candidates = Vec::with_capacity(total);
    let mut dropped = Vec::new();

    for (i, member) in universe.members.iter().enumerate() {
        let symbol = market.provider_symbol(&member.code);
        let result = provider.fetch(&symbol, start, end).and_then(|r| {
            if r.series.is_empty() {
                Err(DataError::EmptySeries {
                    symbol: symbol.clone(),
                })
            } else {
                Ok(r)
            }
        });
        match result {
            Ok(fetched) => {
                has_synthetic |= fetched.source == DataSource::Synthetic;
                candidates.push(fetched.series.renamed(member.code.clone()));
            }
            Err(error) => {
                let kind = error.kind();
                warn!(
                    code = %member.code,
                    %symbol,
                    %kind,
                    error = %error,
                    "[{}/{total}] dropped from ranking",
                    i + 1
                );
                dropped.push(DroppedSymbol {
                    code: member.code.clone(),
                    kind,
                    error,
                });
            }
        }
    }

    if candidates.is_empty() {
        return Err(RankError::NoCandidates);
    }

    let matrix = align_to_index(&index.series, &candidates);
    info!(
        fetched = candidates.len(),
        dropped = dropped.len(),
        rows = matrix.rows(),
        "market data aligned"
    );
    if has_synthetic {
        warn!("ranking uses synthetic prices");
    }

    Ok(LoadedMarket {
        matrix,
        dropped,
        has_synthetic,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RankingConfig;
    use rsrank_core::data::{MemoryProvider, UniverseMember};
    use rsrank_core::PriceSeries;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn market() -> MarketConfig {
        let mut m = RankingConfig::korea().market;
        m.index_symbol = "^IDX".into();
        m
    }

    fn universe(codes: &[&str]) -> Universe {
        Universe {
            members: codes
                .iter()
                .map(|c| UniverseMember {
                    code: c.to_string(),
                    name: c.to_string(),
                    sector: None,
                })
                .collect(),
        }
    }

    #[test]
    fn suffix_is_stripped_and_failures_isolated() {
        let start = d(2024, 1, 1);
        let provider = MemoryProvider::new()
            .with_series(PriceSeries::from_closes("^IDX", start, &[1.0, 2.0, 3.0]))
            .with_series(PriceSeries::from_closes("000001.KS", start, &[10.0, 11.0, 12.0]))
            .with_failure(
                "000002.KS",
                DataError::NetworkUnreachable("connection reset".into()),
            );

        let loaded = load_market(
            &provider,
            &market(),
            &universe(&["000001", "000002", "000003"]),
            start,
            d(2024, 1, 31),
        )
        .unwrap();

        assert_eq!(loaded.matrix.symbols().collect::<Vec<_>>(), vec!["000001"]);
        assert_eq!(loaded.dropped.len(), 2);
        assert_eq!(loaded.dropped[0].kind, FetchFailureKind::Network);
        assert_eq!(loaded.dropped[1].kind, FetchFailureKind::NotFound);
        assert_eq!(loaded.drop_summary().get("network"), Some(&1));
        assert!(!loaded.has_synthetic);
    }

    #[test]
    fn index_failure_is_fatal() {
        let start = d(2024, 1, 1);
        let provider = MemoryProvider::new()
            .with_series(PriceSeries::from_closes("000001.KS", start, &[10.0, 11.0]));
        let err = load_market(&provider, &market(), &universe(&["000001"]), start, d(2024, 1, 31))
            .unwrap_err();
        assert!(matches!(err, RankError::FatalFetch { ref symbol, .. } if symbol == "^IDX"));
    }

    #[test]
    fn no_surviving_candidate_aborts() {
        let start = d(2024, 1, 1);
        let provider =
            MemoryProvider::new().with_series(PriceSeries::from_closes("^IDX", start, &[1.0, 2.0]));
        let err = load_market(&provider, &market(), &universe(&["000001"]), start, d(2024, 1, 31))
            .unwrap_err();
        assert!(matches!(err, RankError::NoCandidates));
    }
}
