// Typed advisory parameters
//
// Everything a prompt may mention is captured here once, from the pairwise
// summary and the quality assessment. The cache key is derived from the
// serialized struct, so two requests that would render the same prompt share
// a cache entry.

use crate::anomaly::{OverallStatus, QualityAssessment, Severity};
use crate::pairwise::PairwiseSummary;
use serde::{Deserialize, Serialize};

/// One classifier finding, reduced to what a prompt needs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FindingDigest {
    pub severity: Severity,
    pub message: String,
}

/// Headline numbers of a metric other than the focused one
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricDigest {
    pub metric: String,
    pub geomean_improvement: Option<f64>,
    pub p_value: f64,
    pub valid_cases: usize,
}

impl From<&PairwiseSummary> for MetricDigest {
    fn from(summary: &PairwiseSummary) -> Self {
        Self {
            metric: summary.metric.clone(),
            geomean_improvement: summary.geomean_improvement,
            p_value: summary.p_value,
            valid_cases: summary.n_valid,
        }
    }
}

/// Parameters of one advisory request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdvisoryParams {
    pub metric: String,
    pub base_algorithm: String,
    pub compare_algorithm: String,
    pub valid_cases: usize,
    pub total_cases: usize,
    pub geomean_improvement: Option<f64>,
    pub mean_improvement: f64,
    pub median_improvement: f64,
    pub p_value: f64,
    pub ci_lower: f64,
    pub ci_upper: f64,
    pub degraded_count: usize,
    pub status: OverallStatus,
    pub findings: Vec<FindingDigest>,
    pub other_metrics: Vec<MetricDigest>,
    /// Free-form question from the user, if any
    pub question: Option<String>,
}

impl AdvisoryParams {
    /// Collect parameters from a finished analysis
    ///
    /// Summaries in `others` that share the focused metric are skipped.
    pub fn from_analysis(
        summary: &PairwiseSummary,
        assessment: &QualityAssessment,
        others: &[PairwiseSummary],
    ) -> Self {
        Self {
            metric: summary.metric.clone(),
            base_algorithm: summary.base_algorithm.clone(),
            compare_algorithm: summary.compare_algorithm.clone(),
            valid_cases: summary.n_valid,
            total_cases: summary.n_total_checked,
            geomean_improvement: summary.geomean_improvement,
            mean_improvement: summary.mean_improvement,
            median_improvement: summary.median_improvement,
            p_value: summary.p_value,
            ci_lower: summary.ci_lower,
            ci_upper: summary.ci_upper,
            degraded_count: summary.degraded_count,
            status: assessment.status,
            findings: assessment
                .findings
                .iter()
                .map(|f| FindingDigest {
                    severity: f.severity,
                    message: f.message.clone(),
                })
                .collect(),
            other_metrics: others
                .iter()
                .filter(|other| other.metric != summary.metric)
                .map(MetricDigest::from)
                .collect(),
            question: None,
        }
    }

    pub fn with_question(mut self, question: impl Into<String>) -> Self {
        self.question = Some(question.into());
        self
    }
}
