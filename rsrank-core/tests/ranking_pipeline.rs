//! End-to-end ranking over aligned synthetic closes.

use chrono::{NaiveDate, NaiveDateTime};
use rsrank_core::data::{align_to_index, Universe, UniverseMember};
use rsrank_core::ranking::{
    assemble, rank, NoRegistry, PeriodWeight, RankingParams, ScoreRow, ScoreTable,
};
use rsrank_core::{PriceSeries, RankingSnapshot, RsFormula, SortStandard};

fn start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2023, 1, 2).unwrap()
}

fn at() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 6, 3)
        .unwrap()
        .and_hms_opt(16, 5, 0)
        .unwrap()
}

fn growth(symbol: &str, from: NaiveDate, base: f64, daily: f64, n: usize) -> PriceSeries {
    let closes: Vec<f64> = (0..n).map(|i| base * (1.0 + daily).powi(i as i32)).collect();
    PriceSeries::from_closes(symbol, from, &closes)
}

fn universe(codes: &[&str]) -> Universe {
    Universe {
        members: codes
            .iter()
            .map(|c| UniverseMember {
                code: c.to_string(),
                name: format!("{c} Corp"),
                sector: None,
            })
            .collect(),
    }
}

fn single_period(days: u32) -> RankingParams {
    RankingParams {
        periods: vec![PeriodWeight { days, weight: 1.0 }],
        ..RankingParams::reference()
    }
}

#[test]
fn strongest_trend_ranks_first() {
    let n = 400;
    let index = growth("^IDX", start(), 1000.0, 0.0005, n);
    let leader = growth("LEADER", start(), 50.0, 0.003, n);
    let middle = growth("MIDDLE", start(), 80.0, 0.001, n);
    let laggard = growth("LAGGARD", start(), 120.0, -0.001, n);
    // Listed 20 days before the end, flat since.
    let newco = PriceSeries::from_closes(
        "NEWCO",
        start() + chrono::Duration::days((n - 20) as i64),
        &[50.0; 20],
    );

    let matrix = align_to_index(&index, &[leader, middle, laggard, newco]);
    let params = RankingParams::reference();
    let u = universe(&["LEADER", "MIDDLE", "LAGGARD", "NEWCO"]);
    let outcome = rank(&matrix, &params, &u, &NoRegistry, at());

    let snap = &outcome.snapshot;
    let order: Vec<_> = snap.rankings.iter().map(|e| e.code.as_str()).collect();
    assert_eq!(order, vec!["LEADER", "MIDDLE", "NEWCO", "LAGGARD"]);

    let leader = snap.entry("LEADER").unwrap();
    assert_eq!(leader.rs_avg, 99);
    assert_eq!(leader.period_scores.get(180), Some(99));
    assert!(leader.disparity.unwrap() > 0.0);
    assert_eq!(snap.entry("LAGGARD").unwrap().rs_avg, 1);
    assert!(snap.entry("LAGGARD").unwrap().disparity.unwrap() < 0.0);

    let newco = snap.entry("NEWCO").unwrap();
    assert_eq!(newco.period_scores.get(180), None);
    assert_eq!(newco.period_scores.get(30), None);
    assert_eq!(newco.period_scores.get(10), Some(34));
    assert_eq!(newco.rs_avg, 7);
    assert_eq!(newco.disparity, None);

    for (i, e) in snap.rankings.iter().enumerate() {
        assert_eq!(e.rank, i + 1);
        assert!((1..=99).contains(&e.rs_avg));
    }

    assert_eq!(outcome.index_returns.len(), 5);
    assert_eq!(outcome.index_returns[0].0, 180);
    assert!(outcome.index_returns.iter().all(|(_, r)| *r > 0.0));
}

#[test]
fn ties_at_90_90_70_keep_input_order() {
    let row = |symbol: &str, composite: u8| ScoreRow {
        symbol: symbol.into(),
        period_scores: [(90, Some(composite))].into_iter().collect(),
        composite: Some(composite),
        disparity: None,
    };
    let table = ScoreTable::new(vec![row("X", 90), row("Y", 90), row("Z", 70)]);
    let snap = assemble(
        &table,
        &universe(&["X", "Y", "Z"]),
        &NoRegistry,
        SortStandard::Composite,
        at(),
    );
    let got: Vec<_> = snap
        .rankings
        .iter()
        .map(|e| (e.code.as_str(), e.rank, e.rs_avg))
        .collect();
    assert_eq!(got, vec![("X", 1, 90), ("Y", 2, 90), ("Z", 3, 70)]);
}

#[test]
fn falling_stock_against_rising_index_is_sole_entrant_minimum() {
    let index_closes: Vec<f64> = (100..=110).map(f64::from).collect();
    let stock_closes: Vec<f64> = (91..=100).rev().map(f64::from).collect();
    let index = PriceSeries::from_closes("^IDX", start(), &index_closes);
    let stock = PriceSeries::from_closes("DOWN", start(), &stock_closes);

    let matrix = align_to_index(&index, &[stock]);
    assert_eq!(matrix.rows(), 10);

    let period = rsrank_core::ranking::compute_period(&matrix, 9, RsFormula::SignedRatio);
    assert!(period.value("DOWN").unwrap() < 0.0);
    assert_eq!(period.index_return_pct, 9.0);

    let outcome = rank(&matrix, &single_period(9), &universe(&["DOWN"]), &NoRegistry, at());
    let entry = outcome.snapshot.entry("DOWN").unwrap();
    assert_eq!(entry.period_scores.get(9), Some(1));
    assert_eq!(entry.rs_avg, 1);
}

#[test]
fn symbol_without_any_scored_period_is_excluded() {
    let index = growth("^IDX", start(), 100.0, 0.001, 60);
    let full = growth("FULL", start(), 10.0, 0.002, 60);
    let fresh = PriceSeries::from_closes(
        "FRESH",
        start() + chrono::Duration::days(55),
        &[5.0, 5.1, 5.2, 5.3, 5.4],
    );

    let matrix = align_to_index(&index, &[full, fresh]);
    let outcome = rank(&matrix, &single_period(30), &universe(&["FULL", "FRESH"]), &NoRegistry, at());

    assert_eq!(outcome.table.len(), 2);
    assert_eq!(outcome.table.row("FRESH").unwrap().composite, None);
    assert!(outcome.snapshot.entry("FRESH").is_none());
    assert_eq!(outcome.snapshot.entry("FULL").unwrap().rank, 1);
}

#[test]
fn forty_observations_under_fifty_day_window_has_no_disparity() {
    let index = growth("^IDX", start(), 100.0, 0.001, 40);
    let stock = growth("SHORT", start(), 10.0, 0.002, 40);
    let matrix = align_to_index(&index, &[stock]);

    let outcome = rank(&matrix, &single_period(10), &universe(&["SHORT"]), &NoRegistry, at());
    let entry = outcome.snapshot.entry("SHORT").unwrap();
    assert_eq!(entry.disparity, None);
}

#[test]
fn difference_formula_ranks_like_signed_ratio_on_rising_market() {
    let n = 200;
    let index = growth("^IDX", start(), 100.0, 0.001, n);
    let fast = growth("FAST", start(), 10.0, 0.004, n);
    let slow = growth("SLOW", start(), 10.0, 0.0005, n);
    let matrix = align_to_index(&index, &[slow, fast]);
    let u = universe(&["SLOW", "FAST"]);

    let mut params = RankingParams::reference();
    params.rs_formula = RsFormula::Difference;
    let outcome = rank(&matrix, &params, &u, &NoRegistry, at());
    assert_eq!(outcome.snapshot.rankings[0].code, "FAST");
}

#[test]
fn snapshot_json_roundtrip_preserves_rankings() {
    let n = 250;
    let index = growth("^IDX", start(), 100.0, 0.0002, n);
    let series: Vec<PriceSeries> = (0..6)
        .map(|i| growth(&format!("S{i}"), start(), 20.0, 0.0005 * i as f64 - 0.001, n))
        .collect();
    let codes: Vec<String> = series.iter().map(|s| s.symbol().to_string()).collect();
    let code_refs: Vec<&str> = codes.iter().map(String::as_str).collect();

    let matrix = align_to_index(&index, &series);
    let outcome = rank(&matrix, &RankingParams::reference(), &universe(&code_refs), &NoRegistry, at());

    let json = serde_json::to_string(&outcome.snapshot).unwrap();
    let parsed: RankingSnapshot = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, outcome.snapshot);

    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["update_time"], "2024-06-03 16:05");
    assert_eq!(value["sort_standard"], "a");
    let first = &value["rankings"][0];
    for key in ["rank", "code", "name", "rs_180", "rs_90", "rs_60", "rs_30", "rs_10", "rs_avg", "disparity"] {
        assert!(first.get(key).is_some(), "missing {key}");
    }
}
