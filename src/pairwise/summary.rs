// Aggregation of per-case comparison points into a pairwise summary

use crate::pairwise::improvement::{improvement_rate, value_ratio};
use crate::pairwise::statistics::{
    geometric_mean_improvement, mean, quantile, sample_std_dev, wilcoxon_p_value, OutlierBounds,
    OutlierClass, Z_95,
};
use crate::table::{CaseSelection, MetricTable};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, trace};

/// One case where both algorithms have a value for the focused metric
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonPoint {
    pub case: String,
    pub base: f64,
    pub compare: f64,
    /// Improvement rate in percent (positive = compare is better)
    pub improvement: f64,
    /// compare / base (piecewise at base == 0)
    pub ratio: f64,
    pub outlier: OutlierClass,
}

/// Robust aggregate over the comparison points of one metric and one
/// algorithm pair
///
/// Only ever constructed with at least one valid point, so every field is
/// meaningful; "no data" is represented by the absence of a summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairwiseSummary {
    pub metric: String,
    pub base_algorithm: String,
    pub compare_algorithm: String,

    /// Cases with both values present
    pub n_valid: usize,
    /// Selected cases that exist in the table
    pub n_total_checked: usize,

    /// `(1 - geomean(ratio)) * 100`, absent when no ratio is strictly positive
    pub geomean_improvement: Option<f64>,
    pub mean_improvement: f64,
    pub median_improvement: f64,
    /// Sample standard deviation of the improvements
    pub std_dev: f64,

    /// Two-tailed Wilcoxon signed-rank p-value on `base - compare`
    pub p_value: f64,

    /// 95% confidence interval on the mean improvement
    pub ci_lower: f64,
    pub ci_upper: f64,

    pub min_improvement: f64,
    pub max_improvement: f64,

    /// Cases with improvement < 0
    pub degraded_count: usize,
    /// Cases with improvement > 0
    pub improved_count: usize,

    pub outlier_bounds: OutlierBounds,
    pub points: Vec<ComparisonPoint>,
}

impl PairwiseSummary {
    /// Share of valid cases that degraded (0.0–1.0)
    pub fn degradation_rate(&self) -> f64 {
        self.degraded_count as f64 / self.n_valid as f64
    }

    pub fn outlier_count(&self, class: OutlierClass) -> usize {
        self.points.iter().filter(|p| p.outlier == class).count()
    }

    pub fn outliers(&self, class: OutlierClass) -> impl Iterator<Item = &ComparisonPoint> {
        self.points.iter().filter(move |p| p.outlier == class)
    }

    /// Points sorted by improvement, best first (ties keep table order)
    pub fn points_by_improvement_desc(&self) -> Vec<&ComparisonPoint> {
        let mut sorted: Vec<&ComparisonPoint> = self.points.iter().collect();
        sorted.sort_by(|a, b| b.improvement.total_cmp(&a.improvement));
        sorted
    }

    pub fn point(&self, case: &str) -> Option<&ComparisonPoint> {
        self.points.iter().find(|p| p.case == case)
    }

    /// Generate human-readable report
    pub fn to_report_string(&self) -> String {
        let mut report = String::new();

        report.push_str(&format!(
            "📊 {}: {} vs {}\n\n",
            self.metric, self.compare_algorithm, self.base_algorithm
        ));
        report.push_str(&format!(
            "Valid cases:         {} of {} checked\n",
            self.n_valid, self.n_total_checked
        ));
        match self.geomean_improvement {
            Some(geomean) => {
                report.push_str(&format!("Geomean improvement: {:+.2}%\n", geomean));
            }
            None => report.push_str("Geomean improvement: n/a\n"),
        }
        report.push_str(&format!(
            "Mean / median:       {:+.2}% / {:+.2}%\n",
            self.mean_improvement, self.median_improvement
        ));
        report.push_str(&format!(
            "95% CI:              [{:+.2}%, {:+.2}%]\n",
            self.ci_lower, self.ci_upper
        ));
        report.push_str(&format!("Std deviation:       {:.2}\n", self.std_dev));
        report.push_str(&format!("Wilcoxon p-value:    {:.4}\n", self.p_value));
        report.push_str(&format!(
            "Improved / degraded: {} / {}\n",
            self.improved_count, self.degraded_count
        ));
        report.push_str(&format!(
            "Range:               [{:+.2}%, {:+.2}%]\n",
            self.min_improvement, self.max_improvement
        ));
        report.push_str(&format!(
            "Outliers:            {} positive, {} negative\n",
            self.outlier_count(OutlierClass::PositiveOutlier),
            self.outlier_count(OutlierClass::NegativeOutlier)
        ));

        report
    }
}

/// Compare `compare` against `base` on `metric` over the selected cases
///
/// Cases are visited in table order. Returns `None` when no selected case
/// has both values (including an empty selection).
///
/// # Example
/// ```
/// use qorcompare::pairwise::compute_pairwise_summary;
/// use qorcompare::table::{Case, MetricTable};
///
/// let table = MetricTable::from_cases(vec![
///     Case::new("c1").with_metric("area", "base", Some(100.0)).with_metric("area", "new", Some(90.0)),
///     Case::new("c2").with_metric("area", "base", Some(50.0)).with_metric("area", "new", None),
/// ]);
/// let summary = compute_pairwise_summary(&table, "area", "base", "new", &table.all_case_names()).unwrap();
/// assert_eq!(summary.n_valid, 1);
/// assert_eq!(summary.n_total_checked, 2);
/// ```
pub fn compute_pairwise_summary(
    table: &MetricTable,
    metric: &str,
    base: &str,
    compare: &str,
    selection: &CaseSelection,
) -> Option<PairwiseSummary> {
    let mut n_total_checked = 0;
    let mut points = Vec::new();

    for case in table.cases().iter().filter(|c| selection.contains(&c.name)) {
        n_total_checked += 1;
        let (Some(base_val), Some(compare_val)) = (case.value(metric, base), case.value(metric, compare))
        else {
            trace!(case = %case.name, metric, "skipping case without both values");
            continue;
        };
        points.push(ComparisonPoint {
            case: case.name.clone(),
            base: base_val,
            compare: compare_val,
            improvement: improvement_rate(base_val, compare_val),
            ratio: value_ratio(base_val, compare_val),
            outlier: OutlierClass::Normal,
        });
    }

    if points.is_empty() {
        debug!(metric, base, compare, n_total_checked, "no valid comparison points");
        return None;
    }

    let n_valid = points.len();
    let improvements: Vec<f64> = points.iter().map(|p| p.improvement).collect();
    let ratios: Vec<f64> = points.iter().map(|p| p.ratio).collect();
    let diffs: Vec<f64> = points.iter().map(|p| p.base - p.compare).collect();

    let mean_improvement = mean(&improvements)?;
    let std_dev = sample_std_dev(&improvements)?;
    let margin = Z_95 * std_dev / (n_valid as f64).sqrt();

    let mut sorted = improvements.clone();
    sorted.sort_by(f64::total_cmp);
    let outlier_bounds = OutlierBounds::from_sorted(&sorted)?;
    let median_improvement = quantile(&sorted, 0.5)?;

    for point in &mut points {
        point.outlier = outlier_bounds.classify(point.improvement);
    }

    let summary = PairwiseSummary {
        metric: metric.to_string(),
        base_algorithm: base.to_string(),
        compare_algorithm: compare.to_string(),
        n_valid,
        n_total_checked,
        geomean_improvement: geometric_mean_improvement(&ratios),
        mean_improvement,
        median_improvement,
        std_dev,
        p_value: wilcoxon_p_value(&diffs),
        ci_lower: mean_improvement - margin,
        ci_upper: mean_improvement + margin,
        min_improvement: sorted[0],
        max_improvement: sorted[n_valid - 1],
        degraded_count: improvements.iter().filter(|i| **i < 0.0).count(),
        improved_count: improvements.iter().filter(|i| **i > 0.0).count(),
        outlier_bounds,
        points,
    };

    debug!(
        metric,
        n_valid,
        n_total_checked,
        geomean = ?summary.geomean_improvement,
        p_value = summary.p_value,
        "pairwise summary computed"
    );

    Some(summary)
}

/// Summaries for every metric in the table that has at least one valid case
///
/// Metrics are independent and read-only, so each is computed on its own;
/// metrics without data are simply missing from the result.
pub fn compare_all_metrics(
    table: &MetricTable,
    base: &str,
    compare: &str,
    selection: &CaseSelection,
) -> BTreeMap<String, PairwiseSummary> {
    table
        .metric_names()
        .into_iter()
        .filter_map(|metric| {
            compute_pairwise_summary(table, &metric, base, compare, selection)
                .map(|summary| (metric, summary))
        })
        .collect()
}
