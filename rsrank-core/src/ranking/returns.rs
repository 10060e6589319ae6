//! Period returns and raw relative strength against the index.

use crate::data::{AlignedMatrix, AlignedSeries};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Floor on the index move used as the ratio denominator.
const MIN_INDEX_MOVE: f64 = 1e-4;

/// How a stock's period return is compared with the index's.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RsFormula {
    /// `|stock| / max(|index|, 1e-4)`, signed by whether the stock beat the index.
    #[default]
    SignedRatio,
    /// `stock - index`.
    Difference,
}

impl RsFormula {
    pub fn relative_strength(self, stock_return: f64, index_return: f64) -> f64 {
        match self {
            RsFormula::SignedRatio => {
                let magnitude = stock_return.abs() / index_return.abs().max(MIN_INDEX_MOVE);
                if stock_return - index_return > 0.0 {
                    magnitude
                } else {
                    -magnitude
                }
            }
            RsFormula::Difference => stock_return - index_return,
        }
    }
}

impl fmt::Display for RsFormula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RsFormula::SignedRatio => write!(f, "signed_ratio"),
            RsFormula::Difference => write!(f, "difference"),
        }
    }
}

/// Raw RS values for one period, in matrix column order.
#[derive(Debug, Clone, PartialEq)]
pub struct PeriodResult {
    pub period: u32,
    pub values: Vec<(String, Option<f64>)>,
    /// Index return in percent, 1 decimal. `0.0` when the period is degenerate.
    pub index_return_pct: f64,
}

impl PeriodResult {
    pub fn value(&self, symbol: &str) -> Option<f64> {
        self.values
            .iter()
            .find(|(s, _)| s == symbol)
            .and_then(|(_, v)| *v)
    }

    pub fn defined(&self) -> usize {
        self.values.iter().filter(|(_, v)| v.is_some()).count()
    }

    fn undefined(matrix: &AlignedMatrix, period: u32) -> Self {
        Self {
            period,
            values: matrix.symbols().map(|s| (s.to_string(), None)).collect(),
            index_return_pct: 0.0,
        }
    }
}

/// `close[-1] / close[-(period+1)] - 1`, if both closes exist and are positive.
pub fn period_return(series: &AlignedSeries, period: usize) -> Option<f64> {
    let latest = series.latest()?;
    let past = series.lagged(period)?;
    if past <= 0.0 || latest <= 0.0 {
        return None;
    }
    Some(latest / past - 1.0)
}

pub fn compute_period(matrix: &AlignedMatrix, period: u32, formula: RsFormula) -> PeriodResult {
    let lag = period as usize;
    if matrix.rows() < lag + 1 {
        debug!(period, rows = matrix.rows(), "not enough aligned rows, period unscored");
        return PeriodResult::undefined(matrix, period);
    }

    let Some(index_return) = period_return(matrix.index(), lag) else {
        debug!(period, "index return undefined, period unscored");
        return PeriodResult::undefined(matrix, period);
    };

    let values = matrix
        .columns()
        .iter()
        .map(|col| {
            let rs = period_return(col, lag).map(|r| formula.relative_strength(r, index_return));
            (col.symbol.clone(), rs)
        })
        .collect();

    let result = PeriodResult {
        period,
        values,
        index_return_pct: round_to(index_return * 100.0, 1),
    };
    debug!(
        period,
        index_return_pct = result.index_return_pct,
        defined = result.defined(),
        "period scored"
    );
    result
}

/// Round to `decimals` places, ties to even.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round_ties_even() / factor
}
