//! Multi-symbol time alignment.
//!
//! Candidates are laid on the union of their observed dates and forward
//! filled along that axis. A gap before a symbol's first observation stays
//! absent. The index series is reindexed onto the same axis with the same
//! rule: an exact-date value, else the previous axis value.

use crate::domain::PriceSeries;
use chrono::NaiveDate;
use std::collections::BTreeSet;

/// One symbol's closes on the matrix date axis.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedSeries {
    pub symbol: String,
    pub closes: Vec<Option<f64>>,
}

impl AlignedSeries {
    /// Close `lag` rows before the last row (`lag = 0` is the latest).
    pub fn lagged(&self, lag: usize) -> Option<f64> {
        let idx = self.closes.len().checked_sub(lag + 1)?;
        self.closes[idx]
    }

    pub fn latest(&self) -> Option<f64> {
        self.lagged(0)
    }

    /// Number of rows holding a value (observed or forward-filled).
    pub fn observations(&self) -> usize {
        self.closes.iter().filter(|c| c.is_some()).count()
    }
}

/// Candidates plus the benchmark index, all on one date axis.
///
/// Read-only once built: every series has exactly `dates().len()` rows.
#[derive(Debug, Clone)]
pub struct AlignedMatrix {
    dates: Vec<NaiveDate>,
    index: AlignedSeries,
    columns: Vec<AlignedSeries>,
}

impl AlignedMatrix {
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// Number of aligned trading days.
    pub fn rows(&self) -> usize {
        self.dates.len()
    }

    pub fn index(&self) -> &AlignedSeries {
        &self.index
    }

    /// Candidate columns, in the order they were supplied.
    pub fn columns(&self) -> &[AlignedSeries] {
        &self.columns
    }

    pub fn column(&self, symbol: &str) -> Option<&AlignedSeries> {
        self.columns.iter().find(|c| c.symbol == symbol)
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.symbol.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.dates.last().copied()
    }
}

/// Align candidates and the index onto the candidates' union calendar.
///
/// Candidate order is preserved; it is the tie-break order of the final
/// ranking.
pub fn align_to_index(index: &PriceSeries, candidates: &[PriceSeries]) -> AlignedMatrix {
    let axis: BTreeSet<NaiveDate> = candidates
        .iter()
        .flat_map(|s| s.points().iter().map(|p| p.date))
        .collect();
    let dates: Vec<NaiveDate> = axis.into_iter().collect();

    let columns = candidates
        .iter()
        .map(|s| AlignedSeries {
            symbol: s.symbol().to_string(),
            closes: forward_fill(s, &dates),
        })
        .collect();

    let index = AlignedSeries {
        symbol: index.symbol().to_string(),
        closes: forward_fill(index, &dates),
    };

    AlignedMatrix {
        dates,
        index,
        columns,
    }
}

/// Exact-date match on the axis, else carry the previous axis value forward.
fn forward_fill(series: &PriceSeries, axis: &[NaiveDate]) -> Vec<Option<f64>> {
    let points = series.points();
    let mut filled = Vec::with_capacity(axis.len());
    let mut last = None;
    let mut j = 0;

    for date in axis {
        while j < points.len() && points[j].date < *date {
            j += 1;
        }
        if j < points.len() && points[j].date == *date {
            last = Some(points[j].close);
        }
        filled.push(last);
    }

    filled
}
