//! Cross-sectional percentile scoring onto the 1..=99 scale.
//!
//! Only defined values take part in the cross-section. Ties share their
//! average rank, so equal raw values always receive equal scores.

pub const MIN_SCORE: u8 = 1;
pub const MAX_SCORE: u8 = 99;

/// Percentile in `[0, 1]` of each defined value, `None` passes through.
///
/// `(avg_rank - 1) / (n - 1)`, with a sole defined value at 0.
pub fn percentile_ranks(values: &[Option<f64>]) -> Vec<Option<f64>> {
    let mut defined: Vec<(usize, f64)> = values
        .iter()
        .enumerate()
        .filter_map(|(i, v)| v.filter(|x| !x.is_nan()).map(|x| (i, x)))
        .collect();
    defined.sort_by(|a, b| a.1.total_cmp(&b.1));

    let n = defined.len();
    let mut out = vec![None; values.len()];
    if n == 0 {
        return out;
    }

    let mut start = 0;
    while start < n {
        let mut end = start + 1;
        while end < n && defined[end].1 == defined[start].1 {
            end += 1;
        }
        // 1-based ranks start+1..=end share their mean.
        let avg_rank = (start + 1 + end) as f64 / 2.0;
        let pct = if n == 1 {
            0.0
        } else {
            (avg_rank - 1.0) / (n - 1) as f64
        };
        for &(idx, _) in &defined[start..end] {
            out[idx] = Some(pct);
        }
        start = end;
    }

    out
}

/// `round(pct * 98 + 1)`, ties to even.
///
/// Half-way cases go to the even neighbour, so a percentile of 0.75
/// (`74.5`) scores 74, the same as a pandas `.round()` over the column.
pub fn score_from_percentile(pct: f64) -> u8 {
    let span = f64::from(MAX_SCORE - MIN_SCORE);
    (pct.clamp(0.0, 1.0) * span + f64::from(MIN_SCORE)).round_ties_even() as u8
}

pub fn percentile_scores(values: &[Option<f64>]) -> Vec<Option<u8>> {
    percentile_ranks(values)
        .into_iter()
        .map(|p| p.map(score_from_percentile))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extremes_map_to_1_and_99() {
        let scores = percentile_scores(&[Some(-1.0), Some(0.0), Some(5.0)]);
        assert_eq!(scores, vec![Some(1), Some(50), Some(99)]);
    }

    #[test]
    fn undefined_stays_undefined() {
        let scores = percentile_scores(&[None, Some(2.0), None, Some(1.0)]);
        assert_eq!(scores, vec![None, Some(99), None, Some(1)]);
    }

    #[test]
    fn ties_share_average_rank() {
        let pct = percentile_ranks(&[Some(3.0), Some(1.0), Some(3.0), Some(2.0)]);
        // ranks: 1.0 -> 1, 2.0 -> 2, the two 3.0s -> 3.5
        assert_eq!(pct[1], Some(0.0));
        assert_eq!(pct[3], Some(1.0 / 3.0));
        assert_eq!(pct[0], Some(2.5 / 3.0));
        assert_eq!(pct[0], pct[2]);
    }

    #[test]
    fn sole_entrant_scores_minimum() {
        assert_eq!(percentile_scores(&[None, Some(-0.9)]), vec![None, Some(1)]);
    }

    #[test]
    fn empty_and_all_undefined() {
        assert!(percentile_scores(&[]).is_empty());
        assert_eq!(percentile_scores(&[None, None]), vec![None, None]);
    }

    #[test]
    fn score_rounds_half_to_even() {
        // 0.75 * 98 + 1 = 74.5, 0.25 * 98 + 1 = 25.5
        assert_eq!(score_from_percentile(0.5), 50);
        assert_eq!(score_from_percentile(0.75), 74);
        assert_eq!(score_from_percentile(0.25), 26);
    }

    #[test]
    fn distinct_values_score_strictly_increasing() {
        for n in 2..=99 {
            let raw: Vec<Option<f64>> = (0..n).map(|i| Some(i as f64 * 0.37 - 5.0)).collect();
            let scores: Vec<u8> = percentile_scores(&raw).into_iter().flatten().collect();
            assert!(scores.windows(2).all(|w| w[0] < w[1]), "n = {n}: {scores:?}");
        }
    }
}
