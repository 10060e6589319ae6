//! RS Rank Core — price alignment, relative-strength scoring, ranking snapshots.
//!
//! This crate contains the ranking engine and the data plumbing it sits on:
//! - Domain types (close-price series, ranked entries, snapshots)
//! - Data providers (Yahoo Finance, Parquet cache, synthetic, in-memory)
//! - Multi-symbol alignment onto a forward-filled trading calendar
//! - The ranking pipeline: period returns, percentile scores, weighted
//!   composite, moving-average disparity, ranking assembly
//!
//! The ranking modules are pure and synchronous. Everything that touches the
//! network or the filesystem lives under `data`.

pub mod data;
pub mod domain;
pub mod ranking;

pub use domain::{PeriodScores, PricePoint, PriceSeries, RankedEntry, RankingSnapshot, SortStandard};
pub use ranking::{rank, RankError, RankingOutcome, RankingParams, RsFormula};
