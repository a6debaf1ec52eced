//! Cross-variable correlation analysis
//!
//! Relates two numeric series drawn from the metric table (metric vs metric,
//! case attribute vs metric, or attribute vs improvement rate):
//! - Pearson r on the raw values
//! - Spearman r on average-tie ranks
//! - Ordinary least squares regression (slope, intercept, R²)
//! - IQR outlier detection on either series alone
//!
//! Each statistic is independently optional. Degenerate inputs (fewer than two
//! points, a constant series) leave that statistic absent while the others
//! still compute. Mismatched series lengths are a caller bug and are rejected
//! with an error.

use crate::pairwise::{average_ranks, improvement_rate, mean, OutlierBounds, OutlierClass};
use crate::table::{CaseSelection, MetricTable};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors for correlation inputs
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CorrelationError {
    #[error("Series length mismatch: x has {x} values, y has {y}")]
    LengthMismatch { x: usize, y: usize },

    #[error("Invalid variable spec '{0}' (expected metric:<m>:<algo>, attr:<name> or imp:<m>:<base>:<compare>)")]
    InvalidVariable(String),
}

/// Ordinary least squares fit `y = slope * x + intercept`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearRegression {
    pub slope: f64,
    pub intercept: f64,
    /// Coefficient of determination, absent when y is constant
    pub r_squared: Option<f64>,
}

impl LinearRegression {
    pub fn predict(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

/// Correlation statistics over one list of paired observations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationResult {
    /// Number of paired observations
    pub n: usize,
    pub pearson: Option<f64>,
    pub spearman: Option<f64>,
    pub regression: Option<LinearRegression>,
}

impl CorrelationResult {
    /// Generate human-readable report
    pub fn to_report_string(&self) -> String {
        let mut report = format!("🔗 CORRELATION ({} paired cases)\n\n", self.n);

        match self.pearson {
            Some(r) => report.push_str(&format!(
                "Pearson r:  {:+.4} ({})\n",
                r,
                interpret_correlation(r)
            )),
            None => report.push_str("Pearson r:  n/a\n"),
        }
        match self.spearman {
            Some(rho) => report.push_str(&format!(
                "Spearman ρ: {:+.4} ({})\n",
                rho,
                interpret_correlation(rho)
            )),
            None => report.push_str("Spearman ρ: n/a\n"),
        }
        match &self.regression {
            Some(fit) => {
                report.push_str(&format!(
                    "Regression: y = {:.4}·x {:+.4}\n",
                    fit.slope, fit.intercept
                ));
                if let Some(r2) = fit.r_squared {
                    report.push_str(&format!("R²:         {:.4}\n", r2));
                }
            }
            None => report.push_str("Regression: n/a\n"),
        }

        report
    }
}

/// Qualitative strength of |r|
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strength {
    VeryWeak,
    Weak,
    Moderate,
    Strong,
    VeryStrong,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Positive,
    Negative,
}

/// Human-readable interpretation of a correlation coefficient
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrelationStrength {
    pub strength: Strength,
    pub direction: Direction,
}

impl fmt::Display for Strength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Strength::VeryWeak => "very weak/none",
            Strength::Weak => "weak",
            Strength::Moderate => "moderate",
            Strength::Strong => "strong",
            Strength::VeryStrong => "very strong",
        };
        f.write_str(label)
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Positive => f.write_str("positive"),
            Direction::Negative => f.write_str("negative"),
        }
    }
}

impl fmt::Display for CorrelationStrength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.strength, self.direction)
    }
}

/// Bucket |r| into [0,0.2) [0.2,0.4) [0.4,0.7) [0.7,0.9) [0.9,1]
///
/// # Example
/// ```
/// use qorcompare::correlation::interpret_correlation;
///
/// assert_eq!(interpret_correlation(-0.75).to_string(), "strong negative");
/// ```
pub fn interpret_correlation(r: f64) -> CorrelationStrength {
    let abs = r.abs();
    let strength = if abs < 0.2 {
        Strength::VeryWeak
    } else if abs < 0.4 {
        Strength::Weak
    } else if abs < 0.7 {
        Strength::Moderate
    } else if abs < 0.9 {
        Strength::Strong
    } else {
        Strength::VeryStrong
    };
    let direction = if r < 0.0 {
        Direction::Negative
    } else {
        Direction::Positive
    };
    CorrelationStrength {
        strength,
        direction,
    }
}

fn check_lengths(x: &[f64], y: &[f64]) -> Result<(), CorrelationError> {
    if x.len() != y.len() {
        return Err(CorrelationError::LengthMismatch {
            x: x.len(),
            y: y.len(),
        });
    }
    Ok(())
}

/// Centered sums: (Σdx·dy, Σdx², Σdy²)
fn co_moments(x: &[f64], y: &[f64]) -> Option<(f64, f64, f64)> {
    let mx = mean(x)?;
    let my = mean(y)?;
    Some(x.iter().zip(y).fold((0.0, 0.0, 0.0), |(sxy, sxx, syy), (a, b)| {
        let (dx, dy) = (a - mx, b - my);
        (sxy + dx * dy, sxx + dx * dx, syy + dy * dy)
    }))
}

fn pearson_checked(x: &[f64], y: &[f64]) -> Option<f64> {
    if x.len() < 2 {
        return None;
    }
    let (sxy, sxx, syy) = co_moments(x, y)?;
    let denom = (sxx * syy).sqrt();
    if denom == 0.0 {
        return None;
    }
    Some((sxy / denom).clamp(-1.0, 1.0))
}

/// Pearson r, 0.0 when undefined (fewer than 2 points or a constant series)
pub fn pearson_correlation(x: &[f64], y: &[f64]) -> Result<f64, CorrelationError> {
    check_lengths(x, y)?;
    Ok(pearson_checked(x, y).unwrap_or(0.0))
}

/// Spearman r: Pearson r of the average-tie ranks
pub fn spearman_correlation(x: &[f64], y: &[f64]) -> Result<Option<f64>, CorrelationError> {
    check_lengths(x, y)?;
    Ok(pearson_checked(&average_ranks(x), &average_ranks(y)))
}

/// OLS fit of y on x; absent when fewer than 2 points or x is constant
pub fn linear_regression(x: &[f64], y: &[f64]) -> Result<Option<LinearRegression>, CorrelationError> {
    check_lengths(x, y)?;
    Ok(fit_line(x, y))
}

fn fit_line(x: &[f64], y: &[f64]) -> Option<LinearRegression> {
    if x.len() < 2 {
        return None;
    }
    let (sxy, sxx, syy) = co_moments(x, y)?;
    let (mx, my) = (mean(x)?, mean(y)?);
    if sxx == 0.0 {
        return None;
    }

    let slope = sxy / sxx;
    let intercept = my - slope * mx;
    let r_squared = if syy == 0.0 {
        None
    } else {
        let ss_res: f64 = x
            .iter()
            .zip(y)
            .map(|(a, b)| (b - (slope * a + intercept)).powi(2))
            .sum();
        Some((1.0 - ss_res / syy).clamp(0.0, 1.0))
    };

    Some(LinearRegression {
        slope,
        intercept,
        r_squared,
    })
}

/// All three statistics over series already known to be the same length
fn correlate(x: &[f64], y: &[f64]) -> CorrelationResult {
    CorrelationResult {
        n: x.len(),
        pearson: pearson_checked(x, y),
        spearman: pearson_checked(&average_ranks(x), &average_ranks(y)),
        regression: fit_line(x, y),
    }
}

/// Pearson, Spearman and OLS over the same paired observations
///
/// # Example
/// ```
/// use qorcompare::correlation::analyze_correlation;
///
/// let result = analyze_correlation(&[1.0, 2.0, 3.0], &[2.0, 4.0, 6.0]).unwrap();
/// assert!((result.pearson.unwrap() - 1.0).abs() < 1e-12);
/// assert!((result.regression.unwrap().slope - 2.0).abs() < 1e-12);
/// ```
pub fn analyze_correlation(x: &[f64], y: &[f64]) -> Result<CorrelationResult, CorrelationError> {
    check_lengths(x, y)?;
    Ok(correlate(x, y))
}

/// Indices of values beyond the IQR fences of a single series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesOutliers {
    pub bounds: OutlierBounds,
    pub above: Vec<usize>,
    pub below: Vec<usize>,
}

/// Same IQR rule as pairwise outliers, applied to one series on its own
pub fn detect_series_outliers(values: &[f64]) -> Option<SeriesOutliers> {
    let bounds = OutlierBounds::from_values(values)?;
    let mut above = Vec::new();
    let mut below = Vec::new();
    for (idx, v) in values.iter().enumerate() {
        match bounds.classify(*v) {
            OutlierClass::PositiveOutlier => above.push(idx),
            OutlierClass::NegativeOutlier => below.push(idx),
            OutlierClass::Normal => {}
        }
    }
    Some(SeriesOutliers {
        bounds,
        above,
        below,
    })
}

/// A numeric quantity that can be read per case from the table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Variable {
    /// Raw value of one metric for one algorithm
    Metric { metric: String, algorithm: String },
    /// Numeric case attribute
    Attribute { name: String },
    /// Improvement rate of `compare` over `base` on one metric
    Improvement {
        metric: String,
        base: String,
        compare: String,
    },
}

impl Variable {
    /// Value for one case, `None` when absent or non-numeric
    pub fn value(&self, table: &MetricTable, case: &str) -> Option<f64> {
        let case = table.case(case)?;
        match self {
            Variable::Metric { metric, algorithm } => case.value(metric, algorithm),
            Variable::Attribute { name } => case.attribute(name)?.as_f64(),
            Variable::Improvement {
                metric,
                base,
                compare,
            } => {
                let b = case.value(metric, base)?;
                let c = case.value(metric, compare)?;
                Some(improvement_rate(b, c))
            }
        }
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Variable::Metric { metric, algorithm } => write!(f, "metric:{}:{}", metric, algorithm),
            Variable::Attribute { name } => write!(f, "attr:{}", name),
            Variable::Improvement {
                metric,
                base,
                compare,
            } => write!(f, "imp:{}:{}:{}", metric, base, compare),
        }
    }
}

impl FromStr for Variable {
    type Err = CorrelationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').collect();
        let invalid = || CorrelationError::InvalidVariable(s.to_string());
        if parts.iter().any(|p| p.is_empty()) {
            return Err(invalid());
        }
        match parts.as_slice() {
            ["metric", metric, algorithm] => Ok(Variable::Metric {
                metric: metric.to_string(),
                algorithm: algorithm.to_string(),
            }),
            ["attr", name] => Ok(Variable::Attribute {
                name: name.to_string(),
            }),
            ["imp", metric, base, compare] => Ok(Variable::Improvement {
                metric: metric.to_string(),
                base: base.to_string(),
                compare: compare.to_string(),
            }),
            _ => Err(invalid()),
        }
    }
}

/// Row-wise paired observations with absent values filtered out
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PairedSeries {
    pub cases: Vec<String>,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

impl PairedSeries {
    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }

    pub fn analyze(&self) -> CorrelationResult {
        // x and y are built in lockstep, so lengths always agree
        correlate(&self.x, &self.y)
    }
}

/// Pair `x` and `y` per selected case (table order), dropping cases where
/// either side is absent
pub fn paired_series(
    table: &MetricTable,
    x: &Variable,
    y: &Variable,
    selection: &CaseSelection,
) -> PairedSeries {
    let mut series = PairedSeries::default();
    for name in table.case_names().filter(|n| selection.contains(*n)) {
        if let (Some(xv), Some(yv)) = (x.value(table, name), y.value(table, name)) {
            series.cases.push(name.to_string());
            series.x.push(xv);
            series.y.push(yv);
        }
    }
    series
}
