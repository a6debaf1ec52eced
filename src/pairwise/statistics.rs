// Statistical primitives for pairwise comparison
//
// Everything here works on f64 slices and is deterministic:
// - Mean, sample standard deviation and the normal CDF come from statrs
// - Linear-interpolation quantiles (position = (n - 1) * q)
// - Wilcoxon signed-rank test, normal approximation, two-tailed
// - IQR fences (Q1 - 1.5 IQR, Q3 + 1.5 IQR)

use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal};
use statrs::statistics::Statistics;

/// Two-sided 95% normal critical value
pub const Z_95: f64 = 1.96;

/// Arithmetic mean, `None` for an empty slice
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.mean())
}

/// Sample standard deviation
///
/// A single observation yields 0 (the `n - 1` denominator floors at 1);
/// statrs itself reports NaN there.
pub fn sample_std_dev(values: &[f64]) -> Option<f64> {
    match values.len() {
        0 => None,
        1 => Some(0.0),
        _ => Some(values.std_dev()),
    }
}

/// Quantile of an ascending-sorted slice using linear interpolation
///
/// # Example
/// ```
/// use qorcompare::pairwise::quantile;
///
/// assert_eq!(quantile(&[1.0, 2.0, 3.0, 4.0, 5.0], 0.5), Some(3.0));
/// assert_eq!(quantile(&[1.0, 2.0, 3.0, 4.0], 0.5), Some(2.5));
/// ```
pub fn quantile(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let q = q.clamp(0.0, 1.0);
    let pos = (sorted.len() - 1) as f64 * q;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    if lower == upper {
        return Some(sorted[lower]);
    }
    let weight = pos - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * weight)
}

/// Median of an unsorted slice
pub fn median(values: &[f64]) -> Option<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    quantile(&sorted, 0.5)
}

/// Standard normal cumulative distribution function
pub fn normal_cdf(x: f64) -> f64 {
    Normal::standard().cdf(x)
}

/// 1-based ranks with ties sharing the average of their positions
///
/// # Example
/// ```
/// use qorcompare::pairwise::average_ranks;
///
/// assert_eq!(average_ranks(&[10.0, 20.0, 20.0, 5.0]), vec![2.0, 3.5, 3.5, 1.0]);
/// ```
pub fn average_ranks(values: &[f64]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    let mut ranks = vec![0.0; values.len()];
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && values[order[j + 1]] == values[order[i]] {
            j += 1;
        }
        // Positions i..=j (0-based) share ranks i+1..=j+1
        let avg = (i + j) as f64 / 2.0 + 1.0;
        for &idx in &order[i..=j] {
            ranks[idx] = avg;
        }
        i = j + 1;
    }
    ranks
}

/// Two-tailed Wilcoxon signed-rank p-value for paired differences
///
/// Zero differences are dropped, absolute values ranked with average ties,
/// and `W = min(W+, W-)` normal-approximated. Returns 1.0 when no non-zero
/// difference remains.
pub fn wilcoxon_p_value(diffs: &[f64]) -> f64 {
    let nonzero: Vec<f64> = diffs
        .iter()
        .copied()
        .filter(|d| *d != 0.0 && d.is_finite())
        .collect();
    let n = nonzero.len();
    if n == 0 {
        return 1.0;
    }

    let abs: Vec<f64> = nonzero.iter().map(|d| d.abs()).collect();
    let ranks = average_ranks(&abs);

    let (mut w_plus, mut w_minus) = (0.0, 0.0);
    for (d, r) in nonzero.iter().zip(&ranks) {
        if *d > 0.0 {
            w_plus += r;
        } else {
            w_minus += r;
        }
    }

    let w = f64::min(w_plus, w_minus);
    let n = n as f64;
    let expected = n * (n + 1.0) / 4.0;
    let variance = n * (n + 1.0) * (2.0 * n + 1.0) / 24.0;
    let z = (w - expected) / variance.sqrt();

    (2.0 * (1.0 - normal_cdf(z.abs()))).clamp(0.0, 1.0)
}

/// `(1 - geomean(ratios)) * 100` over strictly positive ratios
///
/// Non-positive ratios have no logarithm and are skipped; `None` when none
/// remain.
pub fn geometric_mean_improvement(ratios: &[f64]) -> Option<f64> {
    let logs: Vec<f64> = ratios
        .iter()
        .filter(|r| **r > 0.0 && r.is_finite())
        .map(|r| r.ln())
        .collect();
    let mean_log = mean(&logs)?;
    Some((1.0 - mean_log.exp()) * 100.0)
}

/// Distribution-outlier class of a single value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutlierClass {
    #[default]
    Normal,
    /// Strictly above the upper fence
    PositiveOutlier,
    /// Strictly below the lower fence
    NegativeOutlier,
}

/// Tukey IQR fences over a value distribution
///
/// The fences know nothing about metric direction: a "positive" outlier is
/// simply far above the bulk of the distribution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OutlierBounds {
    pub q1: f64,
    pub q3: f64,
    pub iqr: f64,
    pub lower: f64,
    pub upper: f64,
}

impl OutlierBounds {
    pub const FENCE_MULTIPLIER: f64 = 1.5;

    /// Fences from an ascending-sorted slice
    pub fn from_sorted(sorted: &[f64]) -> Option<Self> {
        let q1 = quantile(sorted, 0.25)?;
        let q3 = quantile(sorted, 0.75)?;
        let iqr = q3 - q1;
        Some(Self {
            q1,
            q3,
            iqr,
            lower: q1 - Self::FENCE_MULTIPLIER * iqr,
            upper: q3 + Self::FENCE_MULTIPLIER * iqr,
        })
    }

    /// Fences from an unsorted slice
    pub fn from_values(values: &[f64]) -> Option<Self> {
        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);
        Self::from_sorted(&sorted)
    }

    pub fn classify(&self, value: f64) -> OutlierClass {
        if value > self.upper {
            OutlierClass::PositiveOutlier
        } else if value < self.lower {
            OutlierClass::NegativeOutlier
        } else {
            OutlierClass::Normal
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quantile_extremes() {
        let sorted = [1.0, 4.0, 9.0, 16.0];
        assert_eq!(quantile(&sorted, 0.0), Some(1.0));
        assert_eq!(quantile(&sorted, 1.0), Some(16.0));
        assert_eq!(quantile(&[], 0.5), None);
        assert_eq!(quantile(&[7.0], 0.9), Some(7.0));
    }

    #[test]
    fn test_quantile_median_odd_even() {
        assert_eq!(quantile(&[1.0, 2.0, 3.0, 4.0, 5.0], 0.5), Some(3.0));
        assert_eq!(quantile(&[1.0, 2.0, 3.0, 4.0], 0.5), Some(2.5));
    }

    #[test]
    fn test_quantile_interpolates() {
        // pos = 3 * 0.25 = 0.75 → 10 + 0.75 * (20 - 10)
        assert_eq!(quantile(&[10.0, 20.0, 30.0, 40.0], 0.25), Some(17.5));
    }

    #[test]
    fn test_median_unsorted() {
        assert_eq!(median(&[5.0, 1.0, 3.0]), Some(3.0));
    }

    #[test]
    fn test_sample_std_dev() {
        // mean 5, squared deviations sum 20, n-1 = 3
        let sd = sample_std_dev(&[2.0, 4.0, 6.0, 8.0]).unwrap();
        assert!((sd - (20.0f64 / 3.0).sqrt()).abs() < 1e-12);
        assert_eq!(sample_std_dev(&[42.0]), Some(0.0));
        assert_eq!(sample_std_dev(&[]), None);
    }

    #[test]
    fn test_normal_cdf_reference_points() {
        assert!((normal_cdf(0.0) - 0.5).abs() < 1e-6);
        assert!((normal_cdf(1.96) - 0.975).abs() < 1e-4);
        assert!((normal_cdf(-1.0) - 0.158_655).abs() < 1e-4);
        assert!(normal_cdf(8.0) > 0.999_999);
    }

    #[test]
    fn test_normal_cdf_matches_reference_table() {
        // Standard normal table values to 9 places
        for (x, expected) in [
            (0.5, 0.691_462_461),
            (1.0, 0.841_344_746),
            (2.0, 0.977_249_868),
            (-2.5, 0.006_209_665),
        ] {
            assert!((normal_cdf(x) - expected).abs() < 1e-9, "x = {x}");
        }
    }

    #[test]
    fn test_mean_and_std_dev_guards() {
        assert_eq!(mean(&[]), None);
        assert_eq!(mean(&[3.0]), Some(3.0));
        // n = 1 never yields NaN
        assert!(!sample_std_dev(&[7.5]).unwrap().is_nan());
        let sd = sample_std_dev(&[1.0, 1.0, 1.0]).unwrap();
        assert_eq!(sd, 0.0);
    }

    #[test]
    fn test_normal_cdf_symmetry() {
        for x in [0.1, 0.5, 1.0, 2.3, 4.0] {
            assert!((normal_cdf(x) + normal_cdf(-x) - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_average_ranks_no_ties() {
        assert_eq!(average_ranks(&[3.0, 1.0, 2.0]), vec![3.0, 1.0, 2.0]);
    }

    #[test]
    fn test_average_ranks_all_tied() {
        assert_eq!(average_ranks(&[5.0, 5.0, 5.0]), vec![2.0, 2.0, 2.0]);
    }

    #[test]
    fn test_wilcoxon_degenerate() {
        assert_eq!(wilcoxon_p_value(&[]), 1.0);
        assert_eq!(wilcoxon_p_value(&[0.0, 0.0, 0.0]), 1.0);
    }

    #[test]
    fn test_wilcoxon_consistent_shift_is_significant() {
        let diffs: Vec<f64> = (1..=20).map(|i| i as f64).collect();
        assert!(wilcoxon_p_value(&diffs) < 0.001);
    }

    #[test]
    fn test_wilcoxon_balanced_is_not_significant() {
        let diffs = [1.0, -1.0, 2.0, -2.0, 3.0, -3.0];
        assert!(wilcoxon_p_value(&diffs) > 0.9);
    }

    #[test]
    fn test_wilcoxon_sign_symmetric() {
        let diffs = [1.0, 2.5, -0.5, 4.0, 3.0];
        let flipped: Vec<f64> = diffs.iter().map(|d| -d).collect();
        assert_eq!(wilcoxon_p_value(&diffs), wilcoxon_p_value(&flipped));
    }

    #[test]
    fn test_geometric_mean_improvement() {
        // geomean(0.5, 2.0) = 1 → 0% improvement
        assert!(geometric_mean_improvement(&[0.5, 2.0]).unwrap().abs() < 1e-12);
        let imp = geometric_mean_improvement(&[0.9, 0.9]).unwrap();
        assert!((imp - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_geometric_mean_skips_non_positive() {
        let imp = geometric_mean_improvement(&[0.8, -1.0, 0.0]).unwrap();
        assert!((imp - 20.0).abs() < 1e-9);
        assert_eq!(geometric_mean_improvement(&[-1.0, 0.0]), None);
    }

    #[test]
    fn test_outlier_bounds() {
        let bounds = OutlierBounds::from_values(&[1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
        assert_eq!(bounds.q1, 2.0);
        assert_eq!(bounds.q3, 4.0);
        assert_eq!(bounds.iqr, 2.0);
        assert_eq!(bounds.lower, -1.0);
        assert_eq!(bounds.upper, 7.0);
        assert_eq!(bounds.classify(7.0), OutlierClass::Normal);
        assert_eq!(bounds.classify(7.5), OutlierClass::PositiveOutlier);
        assert_eq!(bounds.classify(-1.5), OutlierClass::NegativeOutlier);
    }
}
