// Deterministic fallback narrative
//
// When no provider is configured or the advisory call fails, callers render
// the pairwise summary and quality assessment as Markdown instead. Section
// headers are stable so any Markdown renderer (or a test) can rely on them.

use crate::advisory::error::{AdvisoryError, AdvisoryErrorKind};
use crate::advisory::orchestrator::AdvisoryOrchestrator;
use crate::advisory::params::AdvisoryParams;
use crate::advisory::template::RequestKind;
use crate::anomaly::QualityAssessment;
use crate::pairwise::PairwiseSummary;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Origin of advisory text handed to the presentation layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum AdvisorySource {
    Provider,
    Cache,
    Fallback {
        /// Error class that forced the fallback; None when no provider is configured
        error_kind: Option<AdvisoryErrorKind>,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdvisoryText {
    pub text: String,
    pub source: AdvisorySource,
}

impl AdvisoryText {
    pub fn is_fallback(&self) -> bool {
        matches!(self.source, AdvisorySource::Fallback { .. })
    }
}

fn pct(value: f64) -> String {
    format!("{:+.2}%", value)
}

/// Markdown report built only from the statistics and findings
pub fn render_fallback_report(summary: &PairwiseSummary, assessment: &QualityAssessment) -> String {
    let mut report = format!("# Comparison Report: {}\n\n", summary.metric);

    report.push_str("## Overview\n\n");
    report.push_str(&format!("- Base algorithm: `{}`\n", summary.base_algorithm));
    report.push_str(&format!("- Compare algorithm: `{}`\n", summary.compare_algorithm));
    report.push_str(&format!(
        "- Valid cases: {} of {} checked\n",
        summary.n_valid, summary.n_total_checked
    ));
    report.push_str(&format!("- Overall status: **{}**\n\n", assessment.status));

    report.push_str("## Statistics\n\n");
    report.push_str("| Statistic | Value |\n|---|---|\n");
    let geomean = summary
        .geomean_improvement
        .map_or_else(|| "n/a".to_string(), pct);
    report.push_str(&format!("| Geomean improvement | {} |\n", geomean));
    report.push_str(&format!("| Mean improvement | {} |\n", pct(summary.mean_improvement)));
    report.push_str(&format!("| Median improvement | {} |\n", pct(summary.median_improvement)));
    report.push_str(&format!(
        "| 95% confidence interval | [{}, {}] |\n",
        pct(summary.ci_lower),
        pct(summary.ci_upper)
    ));
    report.push_str(&format!("| Std deviation | {:.2} |\n", summary.std_dev));
    report.push_str(&format!("| Wilcoxon p-value | {:.4} |\n", summary.p_value));
    report.push_str(&format!(
        "| Improved / degraded | {} / {} |\n",
        summary.improved_count, summary.degraded_count
    ));
    report.push_str(&format!(
        "| Range | [{}, {}] |\n\n",
        pct(summary.min_improvement),
        pct(summary.max_improvement)
    ));

    report.push_str("## Findings\n\n");
    if assessment.findings.is_empty() {
        report.push_str("- No anomalies detected.\n");
    }
    for finding in &assessment.findings {
        report.push_str(&format!(
            "- **{}**: {}\n",
            finding.severity.to_string().to_uppercase(),
            finding.message
        ));
    }
    report.push('\n');

    report.push_str("## Recommendations\n\n");
    if assessment.recommendations.is_empty() {
        report.push_str("- No action required.\n");
    }
    for (i, rec) in assessment.recommendations.iter().enumerate() {
        report.push_str(&format!("{}. {}\n", i + 1, rec));
    }

    report
}

/// Provider text when available, the fallback report otherwise
///
/// Never fails: every advisory error is folded into the returned source.
pub async fn advise_or_fallback(
    orchestrator: Option<&AdvisoryOrchestrator>,
    kind: RequestKind,
    summary: &PairwiseSummary,
    assessment: &QualityAssessment,
    others: &[PairwiseSummary],
    question: Option<&str>,
) -> AdvisoryText {
    let Some(orchestrator) = orchestrator else {
        return fallback(summary, assessment, None, "no advisory provider configured");
    };

    let mut params = AdvisoryParams::from_analysis(summary, assessment, others);
    if let Some(question) = question {
        params = params.with_question(question);
    }
    match orchestrator.get_advisory(kind, &params).await {
        Ok(advisory) => AdvisoryText {
            text: advisory.text,
            source: if advisory.from_cache {
                AdvisorySource::Cache
            } else {
                AdvisorySource::Provider
            },
        },
        Err(err) => fallback_for_error(summary, assessment, &err),
    }
}

/// Fallback report for an advisory error raised outside `advise_or_fallback`
///
/// Used when the provider cannot even be constructed (missing credentials),
/// so the error kind still reaches the caller.
pub fn fallback_for_error(
    summary: &PairwiseSummary,
    assessment: &QualityAssessment,
    err: &AdvisoryError,
) -> AdvisoryText {
    fallback(summary, assessment, Some(err.kind()), &err.to_string())
}

fn fallback(
    summary: &PairwiseSummary,
    assessment: &QualityAssessment,
    error_kind: Option<AdvisoryErrorKind>,
    reason: &str,
) -> AdvisoryText {
    info!(reason, "using fallback advisory report");
    AdvisoryText {
        text: render_fallback_report(summary, assessment),
        source: AdvisorySource::Fallback {
            error_kind,
            reason: reason.to_string(),
        },
    }
}
