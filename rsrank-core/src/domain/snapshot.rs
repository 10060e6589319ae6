//! Ranking snapshot: the payload handed to the publication sink.
//!
//! Wire shape:
//!
//! ```json
//! {
//!   "update_time": "2024-06-03 16:05",
//!   "sort_standard": "a",
//!   "rankings": [
//!     { "rank": 1, "code": "NVDA", "name": "NVIDIA Corporation",
//!       "rs_180": 97, "rs_90": 95, "rs_60": 99, "rs_30": 88, "rs_10": 71,
//!       "rs_avg": 90, "disparity": 12.4 }
//!   ]
//! }
//! ```
//!
//! One `rs_<period>` field is emitted per configured period, in configured
//! order. A period the symbol could not be scored on serializes as `null`,
//! as does an absent disparity.

use chrono::NaiveDateTime;
use serde::de::{self, IgnoredAny, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Format of `update_time`.
pub const UPDATE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

pub fn format_update_time(at: NaiveDateTime) -> String {
    at.format(UPDATE_TIME_FORMAT).to_string()
}

/// Which score orders the snapshot.
///
/// Serialized as `"a"` for the weighted composite, or the period length
/// (`"180"`, `"90"`, ...) when ordering by one period's score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortStandard {
    #[default]
    Composite,
    Period(u32),
}

impl fmt::Display for SortStandard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortStandard::Composite => write!(f, "a"),
            SortStandard::Period(days) => write!(f, "{days}"),
        }
    }
}

impl FromStr for SortStandard {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("a") {
            return Ok(SortStandard::Composite);
        }
        s.trim_end_matches(['d', 'D'])
            .parse::<u32>()
            .map(SortStandard::Period)
            .map_err(|_| format!("invalid sort standard '{s}' (expected 'a' or a period like '90')"))
    }
}

impl Serialize for SortStandard {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SortStandard {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

/// Per-period scores of one entry, in configured period order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PeriodScores(Vec<(u32, Option<u8>)>);

impl PeriodScores {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, period: u32, score: Option<u8>) {
        self.0.push((period, score));
    }

    /// Score for `period`, `None` if the period is unknown or was unscored.
    pub fn get(&self, period: u32) -> Option<u8> {
        self.0
            .iter()
            .find(|(p, _)| *p == period)
            .and_then(|(_, score)| *score)
    }

    pub fn periods(&self) -> impl Iterator<Item = u32> + '_ {
        self.0.iter().map(|(p, _)| *p)
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, Option<u8>)> + '_ {
        self.0.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(u32, Option<u8>)> for PeriodScores {
    fn from_iter<I: IntoIterator<Item = (u32, Option<u8>)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Serialize for PeriodScores {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (period, score) in &self.0 {
            map.serialize_entry(&format!("rs_{period}"), score)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for PeriodScores {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct PeriodScoresVisitor;

        impl<'de> Visitor<'de> for PeriodScoresVisitor {
            type Value = PeriodScores;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of rs_<period> fields")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut scores = PeriodScores::new();
                while let Some(key) = map.next_key::<String>()? {
                    match key.strip_prefix("rs_").and_then(|p| p.parse::<u32>().ok()) {
                        Some(period) => {
                            let score: Option<u8> = map.next_value()?;
                            scores.push(period, score);
                        }
                        None => {
                            map.next_value::<IgnoredAny>()?;
                        }
                    }
                }
                Ok(scores)
            }
        }

        deserializer.deserialize_map(PeriodScoresVisitor)
    }
}

/// One row of the published ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedEntry {
    /// Dense 1-based position in the sorted ranking.
    pub rank: usize,
    pub code: String,
    pub name: String,
    #[serde(flatten)]
    pub period_scores: PeriodScores,
    /// Weighted composite score.
    pub rs_avg: u8,
    /// Percent above (+) or below (-) the trailing moving average.
    pub disparity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sector: Option<String>,
}

/// A complete ranking, replacing whatever was previously published at its key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingSnapshot {
    pub update_time: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_standard: Option<SortStandard>,
    pub rankings: Vec<RankedEntry>,
}

impl RankingSnapshot {
    pub fn new(
        generated_at: NaiveDateTime,
        sort_standard: SortStandard,
        rankings: Vec<RankedEntry>,
    ) -> Self {
        Self {
            update_time: format_update_time(generated_at),
            sort_standard: Some(sort_standard),
            rankings,
        }
    }

    pub fn len(&self) -> usize {
        self.rankings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rankings.is_empty()
    }

    pub fn entry(&self, code: &str) -> Option<&RankedEntry> {
        self.rankings.iter().find(|e| e.code == code)
    }
}
