//! Ranking pipeline: period returns, percentile scores, composite, disparity,
//! assembly.
//!
//! Everything here is pure: it reads an [`AlignedMatrix`] and produces a
//! [`ScoreTable`] and a [`RankingSnapshot`]. Fetching, caching and
//! publication happen elsewhere.

pub mod assemble;
pub mod composite;
pub mod disparity;
pub mod percentile;
pub mod returns;

pub use assemble::{assemble, NameLookup, NoRegistry, ScoreRow, ScoreTable};
pub use composite::composite_score;
pub use disparity::disparity;
pub use percentile::{percentile_ranks, percentile_scores, score_from_percentile};
pub use returns::{compute_period, period_return, round_to, PeriodResult, RsFormula};

use crate::data::{AlignedMatrix, DataError, Universe};
use crate::domain::{PeriodScores, RankingSnapshot, SortStandard};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;
use tracing::info;

/// Errors that end a ranking run without publishing.
#[derive(Debug, Error)]
pub enum RankError {
    #[error("index '{symbol}' could not be fetched: {source}")]
    FatalFetch {
        symbol: String,
        #[source]
        source: DataError,
    },

    #[error("no candidate symbol could be fetched")]
    NoCandidates,

    #[error("invalid ranking config: {0}")]
    InvalidConfig(String),
}

/// A lookback period and its composite weight.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PeriodWeight {
    pub days: u32,
    pub weight: f64,
}

const WEIGHT_TOLERANCE: f64 = 1e-6;

fn default_ma_window() -> usize {
    50
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingParams {
    #[serde(default = "reference_periods")]
    pub periods: Vec<PeriodWeight>,
    #[serde(default = "default_ma_window")]
    pub ma_window: usize,
    #[serde(default)]
    pub rs_formula: RsFormula,
    #[serde(default)]
    pub sort_by: SortStandard,
}

fn reference_periods() -> Vec<PeriodWeight> {
    [180, 90, 60, 30, 10]
        .into_iter()
        .map(|days| PeriodWeight { days, weight: 0.2 })
        .collect()
}

impl Default for RankingParams {
    fn default() -> Self {
        Self::reference()
    }
}

impl RankingParams {
    /// 180/90/60/30/10 days equally weighted, 50-day moving average.
    pub fn reference() -> Self {
        Self {
            periods: reference_periods(),
            ma_window: default_ma_window(),
            rs_formula: RsFormula::default(),
            sort_by: SortStandard::Composite,
        }
    }

    pub fn validate(&self) -> Result<(), RankError> {
        let invalid = |msg: String| Err(RankError::InvalidConfig(msg));

        if self.periods.is_empty() {
            return invalid("at least one period is required".into());
        }
        let mut seen = HashSet::new();
        for p in &self.periods {
            if p.days == 0 {
                return invalid("period length must be at least 1 day".into());
            }
            if !seen.insert(p.days) {
                return invalid(format!("period {} is listed twice", p.days));
            }
            if !(p.weight.is_finite() && p.weight > 0.0) {
                return invalid(format!("weight of period {} must be positive", p.days));
            }
        }
        let total: f64 = self.periods.iter().map(|p| p.weight).sum();
        if (total - 1.0).abs() > WEIGHT_TOLERANCE {
            return invalid(format!("period weights sum to {total}, expected 1.0"));
        }
        if self.ma_window == 0 {
            return invalid("ma_window must be at least 1".into());
        }
        if let SortStandard::Period(days) = self.sort_by {
            if !seen.contains(&days) {
                return invalid(format!("sort_by period {days} is not a configured period"));
            }
        }
        Ok(())
    }

    pub fn max_period(&self) -> u32 {
        self.periods.iter().map(|p| p.days).max().unwrap_or(0)
    }

    /// Calendar days of history to request: twice the trading days needed,
    /// to cover weekends and holidays.
    pub fn lookback_days(&self) -> i64 {
        (i64::from(self.max_period()) + self.ma_window as i64) * 2
    }

    pub fn lookback_start(&self, end: NaiveDate) -> NaiveDate {
        end - Duration::days(self.lookback_days())
    }
}

/// Index return per period, in configured order.
pub type IndexReturns = Vec<(u32, f64)>;

#[derive(Debug, Clone)]
pub struct RankingOutcome {
    pub table: ScoreTable,
    pub index_returns: IndexReturns,
    pub snapshot: RankingSnapshot,
}

/// Score every column of the matrix.
pub fn score_matrix(matrix: &AlignedMatrix, params: &RankingParams) -> (ScoreTable, IndexReturns) {
    let mut index_returns = Vec::with_capacity(params.periods.len());
    let mut per_period: Vec<Vec<Option<u8>>> = Vec::with_capacity(params.periods.len());

    for p in &params.periods {
        let result = compute_period(matrix, p.days, params.rs_formula);
        let raw: Vec<Option<f64>> = result.values.iter().map(|(_, v)| *v).collect();
        per_period.push(percentile_scores(&raw));
        index_returns.push((p.days, result.index_return_pct));
    }

    let rows = matrix
        .columns()
        .iter()
        .enumerate()
        .map(|(col, series)| {
            let period_scores: PeriodScores = params
                .periods
                .iter()
                .zip(&per_period)
                .map(|(p, scores)| (p.days, scores[col]))
                .collect();
            let composite = composite_score(
                params
                    .periods
                    .iter()
                    .zip(&per_period)
                    .map(|(p, scores)| (scores[col], p.weight)),
            );
            ScoreRow {
                symbol: series.symbol.clone(),
                period_scores,
                composite,
                disparity: disparity(series, params.ma_window),
            }
        })
        .collect();

    (ScoreTable::new(rows), index_returns)
}

/// Full pipeline from aligned closes to a snapshot.
pub fn rank(
    matrix: &AlignedMatrix,
    params: &RankingParams,
    universe: &Universe,
    names: &dyn NameLookup,
    at: NaiveDateTime,
) -> RankingOutcome {
    let (table, index_returns) = score_matrix(matrix, params);
    let snapshot = assemble(&table, universe, names, params.sort_by, at);

    info!(
        candidates = table.len(),
        ranked = snapshot.len(),
        rows = matrix.rows(),
        sort = %params.sort_by,
        "ranking assembled"
    );

    RankingOutcome {
        table,
        index_returns,
        snapshot,
    }
}
