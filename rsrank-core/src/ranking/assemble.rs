//! Score table and final ranking assembly.

use crate::data::Universe;
use crate::domain::{PeriodScores, RankedEntry, RankingSnapshot, SortStandard};
use chrono::NaiveDateTime;
use std::collections::HashMap;

/// Authoritative display names, consulted before the universe's own names.
pub trait NameLookup {
    fn display_name(&self, code: &str) -> Option<&str>;
}

impl NameLookup for HashMap<String, String> {
    fn display_name(&self, code: &str) -> Option<&str> {
        self.get(code).map(String::as_str)
    }
}

/// No registry: names come from the universe.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRegistry;

impl NameLookup for NoRegistry {
    fn display_name(&self, _code: &str) -> Option<&str> {
        None
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoreRow {
    pub symbol: String,
    pub period_scores: PeriodScores,
    pub composite: Option<u8>,
    pub disparity: Option<f64>,
}

impl ScoreRow {
    fn sort_key(&self, sort: SortStandard) -> Option<u8> {
        match sort {
            SortStandard::Composite => self.composite,
            SortStandard::Period(days) => self.period_scores.get(days),
        }
    }
}

/// Per-symbol scores in matrix column order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScoreTable {
    rows: Vec<ScoreRow>,
}

impl ScoreTable {
    pub fn new(rows: Vec<ScoreRow>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[ScoreRow] {
        &self.rows
    }

    pub fn row(&self, symbol: &str) -> Option<&ScoreRow> {
        self.rows.iter().find(|r| r.symbol == symbol)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows with a defined composite.
    pub fn ranked(&self) -> usize {
        self.rows.iter().filter(|r| r.composite.is_some()).count()
    }
}

/// Order the table into a snapshot.
///
/// Rows without a composite are dropped. Sorting is descending and stable,
/// so ties keep table order; rows missing the sort score go last.
pub fn assemble(
    table: &ScoreTable,
    universe: &Universe,
    names: &dyn NameLookup,
    sort: SortStandard,
    generated_at: NaiveDateTime,
) -> RankingSnapshot {
    let mut rows: Vec<&ScoreRow> = table.rows.iter().filter(|r| r.composite.is_some()).collect();
    // None < Some, so descending order sends missing keys to the end.
    rows.sort_by(|a, b| b.sort_key(sort).cmp(&a.sort_key(sort)));

    let rankings = rows
        .into_iter()
        .enumerate()
        .filter_map(|(i, row)| {
            let rs_avg = row.composite?;
            let member = universe.member(&row.symbol);
            let name = names
                .display_name(&row.symbol)
                .or_else(|| member.map(|m| m.name.as_str()))
                .unwrap_or(&row.symbol)
                .to_string();
            Some(RankedEntry {
                rank: i + 1,
                code: row.symbol.clone(),
                name,
                period_scores: row.period_scores.clone(),
                rs_avg,
                disparity: row.disparity,
                sector: member.and_then(|m| m.sector.clone()),
            })
        })
        .collect();

    RankingSnapshot::new(generated_at, sort, rankings)
}
