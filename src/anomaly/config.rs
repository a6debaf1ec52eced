// Thresholds for the QoR quality classifier
//
// Every rule of the classifier reads its cutoff from here, so projects with
// noisier benchmarks can relax them without touching the rule set.

use serde::{Deserialize, Serialize};

/// Cutoffs used by [`classify`](crate::anomaly::classify)
///
/// # Example
/// ```
/// use qorcompare::anomaly::ClassifierThresholds;
///
/// let thresholds = ClassifierThresholds::default();
/// assert_eq!(thresholds.severe_regression_pct, -10.0);
/// assert!(thresholds.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierThresholds {
    /// Geomean improvement (%) below which the run is a severe regression
    ///
    /// Default: -10.0
    pub severe_regression_pct: f64,

    /// Geomean improvement (%) above which the gain is suspicious
    ///
    /// Large uniform gains usually mean the two runs did not measure the same
    /// thing (different constraints, a missing stage). Default: 20.0
    pub suspicious_improvement_pct: f64,

    /// Wilcoxon p-value above which the difference is reported as noise
    ///
    /// Default: 0.5
    pub insignificant_p_value: f64,

    /// Minimum number of valid cases for a trustworthy comparison
    ///
    /// Default: 10
    pub min_sample_size: usize,

    /// Sample standard deviation of improvements (percentage points) above
    /// which results are unstable
    ///
    /// Default: 50.0
    pub max_std_dev: f64,

    /// Maximum tolerated share of degraded cases (0.0–1.0)
    ///
    /// Default: 0.3
    pub max_degradation_rate: f64,

    /// Share of valid cases that must be outliers before it is reported
    ///
    /// Default: 0.1
    pub outlier_share: f64,

    /// Number of example cases listed in outlier findings
    ///
    /// Default: 5
    pub max_outlier_examples: usize,

    /// Length of a contiguous run of degraded cases (sorted by improvement)
    /// that is reported as a systemic cluster
    ///
    /// Default: 3
    pub degradation_run_length: usize,
}

impl Default for ClassifierThresholds {
    fn default() -> Self {
        Self {
            severe_regression_pct: -10.0,
            suspicious_improvement_pct: 20.0,
            insignificant_p_value: 0.5,
            min_sample_size: 10,
            max_std_dev: 50.0,
            max_degradation_rate: 0.3,
            outlier_share: 0.1,
            max_outlier_examples: 5,
            degradation_run_length: 3,
        }
    }
}

impl ClassifierThresholds {
    /// Tighter cutoffs for sign-off comparisons
    pub fn strict() -> Self {
        Self {
            severe_regression_pct: -5.0,
            suspicious_improvement_pct: 15.0,
            insignificant_p_value: 0.2,
            min_sample_size: 20,
            max_std_dev: 30.0,
            max_degradation_rate: 0.2,
            outlier_share: 0.05,
            max_outlier_examples: 5,
            degradation_run_length: 2,
        }
    }

    /// Looser cutoffs for exploratory runs on small suites
    pub fn permissive() -> Self {
        Self {
            severe_regression_pct: -20.0,
            suspicious_improvement_pct: 40.0,
            insignificant_p_value: 0.8,
            min_sample_size: 5,
            max_std_dev: 80.0,
            max_degradation_rate: 0.5,
            outlier_share: 0.2,
            max_outlier_examples: 5,
            degradation_run_length: 5,
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.severe_regression_pct >= self.suspicious_improvement_pct {
            return Err(format!(
                "severe_regression_pct ({}) must be below suspicious_improvement_pct ({})",
                self.severe_regression_pct, self.suspicious_improvement_pct
            ));
        }

        if !(0.0..=1.0).contains(&self.insignificant_p_value) {
            return Err(format!(
                "insignificant_p_value must be in [0, 1], got {}",
                self.insignificant_p_value
            ));
        }

        if self.min_sample_size == 0 {
            return Err("min_sample_size must be >= 1".to_string());
        }

        if self.max_std_dev < 0.0 {
            return Err(format!(
                "max_std_dev must be non-negative, got {}",
                self.max_std_dev
            ));
        }

        for (name, value) in [
            ("max_degradation_rate", self.max_degradation_rate),
            ("outlier_share", self.outlier_share),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(format!("{} must be in [0, 1], got {}", name, value));
            }
        }

        if self.degradation_run_length == 0 {
            return Err("degradation_run_length must be >= 1".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_are_valid() {
        assert!(ClassifierThresholds::default().validate().is_ok());
        assert!(ClassifierThresholds::strict().validate().is_ok());
        assert!(ClassifierThresholds::permissive().validate().is_ok());
    }

    #[test]
    fn test_strict_is_tighter_than_default() {
        let strict = ClassifierThresholds::strict();
        let default = ClassifierThresholds::default();
        assert!(strict.severe_regression_pct > default.severe_regression_pct);
        assert!(strict.max_degradation_rate < default.max_degradation_rate);
        assert!(strict.min_sample_size > default.min_sample_size);
    }

    #[test]
    #[allow(clippy::field_reassign_with_default)]
    fn test_inverted_improvement_bounds() {
        let mut thresholds = ClassifierThresholds::default();
        thresholds.severe_regression_pct = 30.0;
        assert!(thresholds.validate().is_err());
    }

    #[test]
    #[allow(clippy::field_reassign_with_default)]
    fn test_invalid_p_value() {
        let mut thresholds = ClassifierThresholds::default();
        thresholds.insignificant_p_value = 1.5;
        assert!(thresholds.validate().is_err());
    }

    #[test]
    #[allow(clippy::field_reassign_with_default)]
    fn test_invalid_rates() {
        let mut thresholds = ClassifierThresholds::default();
        thresholds.outlier_share = -0.1;
        let err = thresholds.validate().unwrap_err();
        assert!(err.contains("outlier_share"));
    }

    #[test]
    #[allow(clippy::field_reassign_with_default)]
    fn test_zero_run_length() {
        let mut thresholds = ClassifierThresholds::default();
        thresholds.degradation_run_length = 0;
        assert!(thresholds.validate().is_err());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let thresholds: ClassifierThresholds = toml::from_str("min_sample_size = 4").unwrap();
        assert_eq!(thresholds.min_sample_size, 4);
        assert_eq!(thresholds.max_std_dev, 50.0);
    }
}
