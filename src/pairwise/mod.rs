// Pairwise QoR comparison between two algorithm runs
//
// For one metric and one (base, compare) algorithm pair, every selected case
// with both values present becomes a comparison point carrying its
// improvement rate and value ratio. The points are then aggregated into a
// robust summary:
//
// - Geometric-mean improvement over value ratios (robust to ratio outliers)
// - Wilcoxon signed-rank test on paired differences (skewed distributions,
//   so no t-test)
// - 95% confidence interval on the arithmetic mean improvement
// - IQR fences classifying each point as normal / positive / negative outlier
//
// Missing data never aborts a summary: a case lacking either value is counted
// as checked but excluded from the valid set, and a selection with no valid
// case yields no summary at all.

mod improvement;
mod statistics;
mod summary;

pub use improvement::{improvement_rate, value_ratio};
pub use statistics::{
    average_ranks, geometric_mean_improvement, mean, median, normal_cdf, quantile,
    sample_std_dev, wilcoxon_p_value, OutlierBounds, OutlierClass, Z_95,
};
pub use summary::{compare_all_metrics, compute_pairwise_summary, ComparisonPoint, PairwiseSummary};
