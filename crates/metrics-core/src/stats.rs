//! Cross-sectional statistics used when rescaling one metric's values across
//! a set of compared items.
//!
//! All helpers accept the raw value slice and return a neutral value instead
//! of NaN when the input is empty or degenerate.

use statrs::statistics::Statistics;

/// Neutral midpoint of the 0-100 score scale.
pub const NEUTRAL_SCORE: f64 = 50.0;

/// Compute the mean of a data slice.
pub fn mean(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    data.mean()
}

/// Compute the population standard deviation (divides by n).
pub fn population_std_dev(data: &[f64]) -> f64 {
    if data.len() < 2 {
        return 0.0;
    }
    let sd = data.population_std_dev();
    if sd.is_finite() {
        sd
    } else {
        0.0
    }
}

/// Return (min, max) of the slice, or `None` when it is empty.
pub fn min_max(data: &[f64]) -> Option<(f64, f64)> {
    let mut iter = data.iter().copied();
    let first = iter.next()?;
    Some(iter.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v))))
}

/// Percentile position of `value` among `data` on a 0-100 scale.
///
/// Position is the first index of `value` in the ascending sort of `data`
/// (duplicates kept), so equal values share a percentile. Data without any
/// spread is neutral.
pub fn first_rank_percentile(value: f64, data: &[f64]) -> f64 {
    if data.len() < 2 {
        return NEUTRAL_SCORE;
    }
    let mut sorted = data.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    if sorted.first() == sorted.last() {
        return NEUTRAL_SCORE;
    }
    let position = sorted.iter().position(|&x| x == value).unwrap_or(0);
    position as f64 / (sorted.len() - 1) as f64 * 100.0
}

/// Compute the z-score of `value` relative to `data`.
/// Returns 0.0 if data has no variance.
pub fn z_score_of(value: f64, data: &[f64]) -> f64 {
    let sd = population_std_dev(data);
    if sd < f64::EPSILON {
        return 0.0;
    }
    (value - mean(data)) / sd
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_population_std_dev() {
        let data = vec![2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert!((population_std_dev(&data) - 2.0).abs() < 1e-9);
        assert_eq!(population_std_dev(&[3.0]), 0.0);
    }

    #[test]
    fn test_first_rank_percentile_ties() {
        let data = vec![10.0, 20.0, 20.0, 30.0];
        assert_eq!(first_rank_percentile(10.0, &data), 0.0);
        let tied = first_rank_percentile(20.0, &data);
        assert!((tied - 100.0 / 3.0).abs() < 1e-9);
        assert_eq!(first_rank_percentile(30.0, &data), 100.0);
    }

    #[test]
    fn test_degenerate_inputs_are_neutral() {
        assert_eq!(first_rank_percentile(1.0, &[1.0]), NEUTRAL_SCORE);
        assert_eq!(first_rank_percentile(4.0, &[4.0, 4.0, 4.0]), NEUTRAL_SCORE);
        assert_eq!(z_score_of(5.0, &[5.0, 5.0, 5.0]), 0.0);
        assert_eq!(mean(&[]), 0.0);
        assert!(min_max(&[]).is_none());
    }

    #[test]
    fn test_z_score() {
        let data = vec![10.0, 20.0, 30.0, 40.0, 50.0];
        assert!(z_score_of(30.0, &data).abs() < 1e-9);
        assert!(z_score_of(50.0, &data) > 1.0);
    }
}
