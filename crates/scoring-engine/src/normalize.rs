//! Per-metric rescaling of raw values onto 0-100.
//!
//! Each metric is normalized on its own, over every item's valid value for
//! it. A single value, or a set with no spread, maps to the neutral 50.

use metrics_core::stats::{first_rank_percentile, mean, min_max, population_std_dev, NEUTRAL_SCORE};

use crate::config::NormalizationMethod;

/// Z-scores beyond this many standard deviations clamp to 0 or 100.
const Z_SCORE_RANGE: f64 = 3.0;

/// Magnitude above which values are scaled down before differencing, so that
/// `max - min` and the z-score sums stay finite.
const RESCALE_ABOVE: f64 = 1e150;

/// Normalize `values`, keeping their order. Non-finite inputs are not expected;
/// callers filter them out first.
pub fn normalize(values: &[f64], method: NormalizationMethod) -> Vec<f64> {
    let Some((lo, hi)) = min_max(values) else {
        return Vec::new();
    };
    if values.len() < 2 || lo == hi {
        return vec![NEUTRAL_SCORE; values.len()];
    }
    let scaled = rescaled(values, lo, hi);
    let scores = match method {
        NormalizationMethod::MinMax => min_max_scores(&scaled),
        NormalizationMethod::Percentile => scaled
            .iter()
            .map(|&v| first_rank_percentile(v, &scaled))
            .collect(),
        NormalizationMethod::ZScore => z_scores(&scaled),
    };
    scores
        .into_iter()
        .map(|s| if s.is_finite() { s } else { NEUTRAL_SCORE })
        .collect()
}

/// Every method is scale invariant, so huge magnitudes are divided down.
fn rescaled(values: &[f64], lo: f64, hi: f64) -> Vec<f64> {
    let magnitude = lo.abs().max(hi.abs());
    if magnitude > RESCALE_ABOVE {
        values.iter().map(|v| v / magnitude).collect()
    } else {
        values.to_vec()
    }
}

fn min_max_scores(values: &[f64]) -> Vec<f64> {
    let Some((lo, hi)) = min_max(values) else {
        return Vec::new();
    };
    let range = hi - lo;
    if range <= 0.0 {
        return vec![NEUTRAL_SCORE; values.len()];
    }
    values.iter().map(|v| (v - lo) / range * 100.0).collect()
}

fn z_scores(values: &[f64]) -> Vec<f64> {
    let sd = population_std_dev(values);
    if sd.is_nan() || sd < f64::EPSILON {
        return vec![NEUTRAL_SCORE; values.len()];
    }
    let avg = mean(values);
    values
        .iter()
        .map(|v| {
            let z = (v - avg) / sd;
            (NEUTRAL_SCORE + z / Z_SCORE_RANGE * 50.0).clamp(0.0, 100.0)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const METHODS: [NormalizationMethod; 3] = [
        NormalizationMethod::MinMax,
        NormalizationMethod::Percentile,
        NormalizationMethod::ZScore,
    ];

    #[test]
    fn test_single_and_equal_values_are_neutral() {
        for method in METHODS {
            assert_eq!(normalize(&[42.0], method), vec![50.0]);
            assert_eq!(normalize(&[7.0, 7.0, 7.0], method), vec![50.0; 3]);
            assert!(normalize(&[], method).is_empty());
        }
    }

    #[test]
    fn test_min_max() {
        assert_eq!(
            normalize(&[10.0, 20.0, 30.0], NormalizationMethod::MinMax),
            vec![0.0, 50.0, 100.0]
        );
    }

    #[test]
    fn test_percentile_ties_share_rank() {
        let scores = normalize(&[5.0, 1.0, 5.0, 9.0], NormalizationMethod::Percentile);
        assert!((scores[0] - 100.0 / 3.0).abs() < 1e-9);
        assert_eq!(scores[1], 0.0);
        assert_eq!(scores[0], scores[2]);
        assert_eq!(scores[3], 100.0);
    }

    #[test]
    fn test_z_score_is_clamped_and_centered() {
        let scores = normalize(&[1.0, 2.0, 3.0], NormalizationMethod::ZScore);
        assert!((scores[1] - 50.0).abs() < 1e-9);
        assert!(scores[0] < 50.0 && scores[2] > 50.0);

        let mut outlier = vec![0.0; 99];
        outlier.push(1000.0);
        let scores = normalize(&outlier, NormalizationMethod::ZScore);
        assert_eq!(scores[99], 100.0);
    }

    #[test]
    fn test_order_preserved_for_every_method() {
        let values = [3.0, -1.0, 8.0, 2.5];
        for method in METHODS {
            let scores = normalize(&values, method);
            assert!(scores[2] >= scores[0] && scores[0] >= scores[3] && scores[3] >= scores[1]);
        }
    }

    #[test]
    fn test_extreme_magnitudes_stay_finite() {
        let values = [1e308, -1e308, 0.0];
        for method in METHODS {
            let scores = normalize(&values, method);
            assert!(scores.iter().all(|s| s.is_finite()), "{:?} {:?}", method, scores);
            assert!(scores[0] > scores[2] && scores[2] > scores[1], "{:?}", method);
        }
        assert_eq!(normalize(&[1e308, -1e308], NormalizationMethod::MinMax), vec![100.0, 0.0]);
    }

    #[test]
    fn test_equal_values_neutral_under_percentile() {
        assert_eq!(normalize(&[3.0, 3.0], NormalizationMethod::Percentile), vec![50.0, 50.0]);
    }
}
