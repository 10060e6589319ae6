//! Distance of the latest close from its trailing moving average.

use super::returns::round_to;
use crate::data::AlignedSeries;

/// `(latest / mean(last window closes) - 1) * 100`, 1 decimal.
///
/// `None` when any of the trailing `window` rows is absent or the series is
/// shorter than the window.
pub fn disparity(series: &AlignedSeries, window: usize) -> Option<f64> {
    if window == 0 || series.closes.len() < window {
        return None;
    }
    let tail = &series.closes[series.closes.len() - window..];
    let mut sum = 0.0;
    for close in tail {
        sum += (*close)?;
    }
    let mean = sum / window as f64;
    let latest = series.latest()?;
    if mean <= 0.0 {
        return None;
    }
    Some(round_to((latest / mean - 1.0) * 100.0, 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(closes: Vec<Option<f64>>) -> AlignedSeries {
        AlignedSeries {
            symbol: "A".into(),
            closes,
        }
    }

    #[test]
    fn above_average_is_positive() {
        let s = series(vec![Some(10.0), Some(10.0), Some(10.0), Some(14.0)]);
        // mean of last 4 = 11, 14 / 11 - 1 = 27.27%
        assert_eq!(disparity(&s, 4), Some(27.3));
    }

    #[test]
    fn only_trailing_window_counts() {
        let s = series(vec![None, Some(100.0), Some(8.0), Some(12.0)]);
        assert_eq!(disparity(&s, 2), Some(20.0));
    }

    #[test]
    fn short_or_gappy_window_is_absent() {
        let s = series((0..40).map(|i| Some(100.0 + i as f64)).collect());
        assert_eq!(disparity(&s, 50), None);

        let mut closes: Vec<Option<f64>> = vec![None; 10];
        closes.extend((0..40).map(|i| Some(100.0 + i as f64)));
        assert_eq!(disparity(&series(closes), 50), None);
    }

    #[test]
    fn zero_window_is_absent() {
        assert_eq!(disparity(&series(vec![Some(1.0)]), 0), None);
    }
}
