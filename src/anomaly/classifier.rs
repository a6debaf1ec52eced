// Rule-based quality classifier over pairwise summaries
//
// Turns raw statistics into severity-tagged findings. Rules run in a fixed
// order and read only their inputs, so the same summaries always produce the
// same assessment.

use crate::anomaly::config::ClassifierThresholds;
use crate::pairwise::{ComparisonPoint, OutlierClass, PairwiseSummary};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Severity of a single finding, most severe first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => f.write_str("error"),
            Severity::Warning => f.write_str("warning"),
            Severity::Info => f.write_str("info"),
        }
    }
}

/// Which rule produced a finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingKind {
    SevereRegression,
    SuspiciousImprovement,
    NotSignificant,
    SmallSample,
    HighVariance,
    DegradationRate,
    MixedResults,
    PositiveOutliers,
    NegativeOutliers,
    DegradationCluster,
}

/// One classifier observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub kind: FindingKind,
    pub severity: Severity,
    pub message: String,
    pub suggestion: String,
}

impl Finding {
    fn new(
        kind: FindingKind,
        severity: Severity,
        message: impl Into<String>,
        suggestion: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            severity,
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }
}

/// Overall verdict derived from the most severe finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverallStatus {
    Good,
    Notice,
    Warning,
    Critical,
}

impl OverallStatus {
    pub fn from_findings(findings: &[Finding]) -> Self {
        match findings.iter().map(|f| f.severity).min() {
            Some(Severity::Error) => OverallStatus::Critical,
            Some(Severity::Warning) => OverallStatus::Warning,
            Some(Severity::Info) => OverallStatus::Notice,
            None => OverallStatus::Good,
        }
    }
}

impl fmt::Display for OverallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            OverallStatus::Good => "good",
            OverallStatus::Notice => "notice",
            OverallStatus::Warning => "warning",
            OverallStatus::Critical => "critical",
        };
        f.write_str(label)
    }
}

/// Classifier output: status, ordered findings, deduplicated suggestions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityAssessment {
    pub status: OverallStatus,
    pub findings: Vec<Finding>,
    pub recommendations: Vec<String>,
}

impl QualityAssessment {
    pub fn count(&self, severity: Severity) -> usize {
        self.findings.iter().filter(|f| f.severity == severity).count()
    }

    pub fn has(&self, kind: FindingKind) -> bool {
        self.findings.iter().any(|f| f.kind == kind)
    }

    /// Generate human-readable report
    pub fn to_report_string(&self) -> String {
        let mut report = String::new();

        let header = match self.status {
            OverallStatus::Good => "✅ QUALITY: GOOD",
            OverallStatus::Notice => "ℹ️  QUALITY: NOTICE",
            OverallStatus::Warning => "⚠️  QUALITY: WARNING",
            OverallStatus::Critical => "❌ QUALITY: CRITICAL",
        };
        report.push_str(header);
        report.push_str("\n\n");

        if self.findings.is_empty() {
            report.push_str("No anomalies detected.\n");
        } else {
            report.push_str(&format!(
                "Findings: {} error, {} warning, {} info\n",
                self.count(Severity::Error),
                self.count(Severity::Warning),
                self.count(Severity::Info)
            ));
            for finding in &self.findings {
                report.push_str(&format!("  [{}] {}\n", finding.severity, finding.message));
            }
        }

        if !self.recommendations.is_empty() {
            report.push_str("\n💡 Recommendations:\n");
            for rec in &self.recommendations {
                report.push_str(&format!("  - {}\n", rec));
            }
        }

        report
    }
}

/// Classify the focused summary, optionally against other metrics
///
/// `others` feeds the cross-metric trade-off rule; a summary for the same
/// metric as `focused` is ignored there.
///
/// # Example
/// ```
/// use qorcompare::anomaly::{classify, ClassifierThresholds, OverallStatus};
/// use qorcompare::pairwise::compute_pairwise_summary;
/// use qorcompare::table::{Case, MetricTable};
///
/// let table = MetricTable::from_cases((0..20).map(|i| {
///     Case::new(format!("c{i}"))
///         .with_metric("area", "a", Some(100.0))
///         .with_metric("area", "b", Some(95.0 + (i % 3) as f64))
/// }));
/// let summary = compute_pairwise_summary(&table, "area", "a", "b", &table.all_case_names()).unwrap();
/// let assessment = classify(&summary, &[], &ClassifierThresholds::default());
/// assert_eq!(assessment.status, OverallStatus::Good);
/// ```
pub fn classify(
    focused: &PairwiseSummary,
    others: &[PairwiseSummary],
    thresholds: &ClassifierThresholds,
) -> QualityAssessment {
    let mut findings = Vec::new();

    check_overall_trend(focused, thresholds, &mut findings);
    check_reliability(focused, thresholds, &mut findings);
    check_degradation_rate(focused, thresholds, &mut findings);
    check_tradeoffs(focused, others, &mut findings);
    check_outlier_patterns(focused, thresholds, &mut findings);

    let status = OverallStatus::from_findings(&findings);
    let recommendations = dedup_suggestions(&findings);

    tracing::debug!(
        metric = %focused.metric,
        %status,
        findings = findings.len(),
        "quality assessment complete"
    );

    QualityAssessment {
        status,
        findings,
        recommendations,
    }
}

fn check_overall_trend(
    summary: &PairwiseSummary,
    thresholds: &ClassifierThresholds,
    findings: &mut Vec<Finding>,
) {
    let Some(geomean) = summary.geomean_improvement else {
        return;
    };

    if geomean < thresholds.severe_regression_pct {
        findings.push(Finding::new(
            FindingKind::SevereRegression,
            Severity::Error,
            format!(
                "Severe overall regression on {}: geomean improvement {:.2}% is below {:.1}%",
                summary.metric, geomean, thresholds.severe_regression_pct
            ),
            format!(
                "Investigate what changed in {} before adopting it; compare per-case logs of the worst designs",
                summary.compare_algorithm
            ),
        ));
    } else if geomean > thresholds.suspicious_improvement_pct {
        findings.push(Finding::new(
            FindingKind::SuspiciousImprovement,
            Severity::Warning,
            format!(
                "Suspiciously high improvement on {}: geomean {:.2}% exceeds {:.1}%, verify data",
                summary.metric, geomean, thresholds.suspicious_improvement_pct
            ),
            "Verify both runs used the same constraints, inputs and flow stages",
        ));
    }
}

fn check_reliability(
    summary: &PairwiseSummary,
    thresholds: &ClassifierThresholds,
    findings: &mut Vec<Finding>,
) {
    if summary.p_value > thresholds.insignificant_p_value {
        findings.push(Finding::new(
            FindingKind::NotSignificant,
            Severity::Info,
            format!(
                "Difference on {} is not statistically significant (p = {:.3})",
                summary.metric, summary.p_value
            ),
            "Treat the two runs as equivalent on this metric or add more test cases",
        ));
    }

    if summary.n_valid < thresholds.min_sample_size {
        findings.push(Finding::new(
            FindingKind::SmallSample,
            Severity::Warning,
            format!(
                "Small sample size: only {} valid cases (minimum {})",
                summary.n_valid, thresholds.min_sample_size
            ),
            "Add more designs to the comparison suite before drawing conclusions",
        ));
    }

    if summary.std_dev > thresholds.max_std_dev {
        findings.push(Finding::new(
            FindingKind::HighVariance,
            Severity::Warning,
            format!(
                "High variance on {}: improvement std dev {:.2} exceeds {:.1}",
                summary.metric, summary.std_dev, thresholds.max_std_dev
            ),
            "Results are unstable across designs; rerun with fixed seeds or split the suite by design family",
        ));
    }
}

fn check_degradation_rate(
    summary: &PairwiseSummary,
    thresholds: &ClassifierThresholds,
    findings: &mut Vec<Finding>,
) {
    if summary.degraded_count as f64 > thresholds.max_degradation_rate * summary.n_valid as f64 {
        findings.push(Finding::new(
            FindingKind::DegradationRate,
            Severity::Warning,
            format!(
                "Degradation rate exceeds {:.0}%: {} of {} cases got worse on {}",
                thresholds.max_degradation_rate * 100.0,
                summary.degraded_count,
                summary.n_valid,
                summary.metric
            ),
            "Review the degraded cases individually; a targeted fix may recover most of them",
        ));
    }
}

fn check_tradeoffs(
    focused: &PairwiseSummary,
    others: &[PairwiseSummary],
    findings: &mut Vec<Finding>,
) {
    let mut improved = Vec::new();
    let mut regressed = Vec::new();
    let mut seen = HashSet::new();

    for summary in std::iter::once(focused).chain(
        others
            .iter()
            .filter(|s| s.metric != focused.metric),
    ) {
        if !seen.insert(summary.metric.as_str()) {
            continue;
        }
        match summary.geomean_improvement {
            Some(g) if g > 0.0 => improved.push(summary.metric.as_str()),
            Some(g) if g < 0.0 => regressed.push(summary.metric.as_str()),
            _ => {}
        }
    }

    if !improved.is_empty() && !regressed.is_empty() {
        findings.push(Finding::new(
            FindingKind::MixedResults,
            Severity::Info,
            format!(
                "Mixed results across metrics: improved {}, regressed {}; trade-off required",
                improved.join(", "),
                regressed.join(", ")
            ),
            "Decide which metric has priority for this flow before choosing a winner",
        ));
    }
}

fn example_list<'a>(points: impl Iterator<Item = &'a ComparisonPoint>, limit: usize) -> String {
    points
        .take(limit)
        .map(|p| format!("{} ({:+.1}%)", p.case, p.improvement))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Longest run of consecutive degraded points in best-first order
fn longest_degraded_run<'a>(sorted_desc: &[&'a ComparisonPoint]) -> Vec<&'a ComparisonPoint> {
    let mut best: &[&ComparisonPoint] = &[];
    let mut start = None;
    for (idx, point) in sorted_desc.iter().enumerate() {
        if point.improvement < 0.0 {
            let s = *start.get_or_insert(idx);
            if idx + 1 - s > best.len() {
                best = &sorted_desc[s..=idx];
            }
        } else {
            start = None;
        }
    }
    best.to_vec()
}

fn check_outlier_patterns(
    summary: &PairwiseSummary,
    thresholds: &ClassifierThresholds,
    findings: &mut Vec<Finding>,
) {
    let min_count = thresholds.outlier_share * summary.n_valid as f64;
    let limit = thresholds.max_outlier_examples;

    let positive = summary.outlier_count(OutlierClass::PositiveOutlier);
    if positive > 0 && positive as f64 > min_count {
        findings.push(Finding::new(
            FindingKind::PositiveOutliers,
            Severity::Info,
            format!(
                "{} cases improved far beyond the rest on {}: {}",
                positive,
                summary.metric,
                example_list(summary.outliers(OutlierClass::PositiveOutlier), limit)
            ),
            "Check whether the standout cases share a design trait worth exploiting",
        ));
    }

    let negative = summary.outlier_count(OutlierClass::NegativeOutlier);
    if negative > 0 && negative as f64 > min_count {
        findings.push(Finding::new(
            FindingKind::NegativeOutliers,
            Severity::Warning,
            format!(
                "{} cases degraded far beyond the rest on {}: {}",
                negative,
                summary.metric,
                example_list(summary.outliers(OutlierClass::NegativeOutlier), limit)
            ),
            "Inspect the extreme negative cases for flow failures or corner-case bugs",
        ));
    }

    let sorted = summary.points_by_improvement_desc();
    let run = longest_degraded_run(&sorted);
    if run.len() >= thresholds.degradation_run_length {
        findings.push(Finding::new(
            FindingKind::DegradationCluster,
            Severity::Warning,
            format!(
                "Possible systemic degradation cluster: {} consecutive degraded cases on {}, e.g. {}",
                run.len(),
                summary.metric,
                example_list(run.iter().copied(), limit)
            ),
            "Look for a common attribute among the clustered cases (size, technology, design family)",
        ));
    }
}

/// First suggestion per finding kind, in finding order
fn dedup_suggestions(findings: &[Finding]) -> Vec<String> {
    let mut seen = HashSet::new();
    findings
        .iter()
        .filter(|f| seen.insert(f.kind))
        .map(|f| f.suggestion.clone())
        .collect()
}
