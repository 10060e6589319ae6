//! Criterion benchmarks for the ranking hot paths.
//!
//! 1. Alignment of a 100-symbol universe onto the union calendar
//! 2. Full scoring pipeline (5 periods, composite, disparity, assembly)
//! 3. Percentile scoring of a single cross-section

use chrono::NaiveDate;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use rsrank_core::data::{align_to_index, SyntheticProvider, Universe, UniverseMember};
use rsrank_core::ranking::{percentile_scores, rank, NoRegistry, RankingParams};
use rsrank_core::PriceSeries;

// ── Helpers ──────────────────────────────────────────────────────────

fn universe(n: usize) -> Universe {
    Universe {
        members: (0..n)
            .map(|i| UniverseMember {
                code: format!("S{i:03}"),
                name: format!("Stock {i}"),
                sector: None,
            })
            .collect(),
    }
}

fn make_series(u: &Universe) -> (PriceSeries, Vec<PriceSeries>) {
    let provider = SyntheticProvider::default();
    let start = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
    let end = NaiveDate::from_ymd_opt(2024, 6, 28).unwrap();
    let index = provider.generate("^IDX", start, end);
    let candidates = u.codes().map(|c| provider.generate(c, start, end)).collect();
    (index, candidates)
}

// ── 1. Alignment ─────────────────────────────────────────────────────

fn bench_align(c: &mut Criterion) {
    let mut group = c.benchmark_group("align");
    for n in [10usize, 100] {
        let (index, candidates) = make_series(&universe(n));
        group.bench_with_input(BenchmarkId::new("symbols", n), &n, |b, _| {
            b.iter(|| align_to_index(black_box(&index), black_box(&candidates)))
        });
    }
    group.finish();
}

// ── 2. Pipeline ──────────────────────────────────────────────────────

fn bench_rank(c: &mut Criterion) {
    let u = universe(100);
    let (index, candidates) = make_series(&u);
    let matrix = align_to_index(&index, &candidates);
    let params = RankingParams::reference();
    let at = NaiveDate::from_ymd_opt(2024, 6, 28)
        .unwrap()
        .and_hms_opt(16, 0, 0)
        .unwrap();

    c.bench_function("rank_100_symbols", |b| {
        b.iter(|| rank(black_box(&matrix), &params, &u, &NoRegistry, at))
    });
}

// ── 3. Percentile ────────────────────────────────────────────────────

fn bench_percentile(c: &mut Criterion) {
    let raw: Vec<Option<f64>> = (0..500)
        .map(|i| if i % 17 == 0 { None } else { Some(((i * 7919) % 1000) as f64 / 10.0) })
        .collect();
    c.bench_function("percentile_500", |b| b.iter(|| percentile_scores(black_box(&raw))));
}

criterion_group!(benches, bench_align, bench_rank, bench_percentile);
criterion_main!(benches);
