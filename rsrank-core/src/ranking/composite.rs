//! Weighted composite of per-period scores.

use super::percentile::{MAX_SCORE, MIN_SCORE};

/// `round(Σ score·weight)` over the defined periods, ties to even, clamped
/// into 1..=99.
///
/// Missing periods contribute nothing and the remaining weights are not
/// renormalized, so a partially scored symbol is pulled toward the bottom.
/// `None` only when every period is missing.
pub fn composite_score<I>(scored: I) -> Option<u8>
where
    I: IntoIterator<Item = (Option<u8>, f64)>,
{
    let mut total = 0.0;
    let mut any = false;
    for (score, weight) in scored {
        if let Some(score) = score {
            total += f64::from(score) * weight;
            any = true;
        }
    }
    if !any {
        return None;
    }
    let clamped = total.round_ties_even().clamp(f64::from(MIN_SCORE), f64::from(MAX_SCORE));
    Some(clamped as u8)
}
