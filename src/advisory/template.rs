// Prompt templates
//
// Templates reference parameters as `{{ name }}`. The set of names is the
// closed Placeholder enum; rendering fails on anything else instead of
// leaving the marker in the prompt.

use crate::advisory::params::AdvisoryParams;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;
use thiserror::Error;

static PLACEHOLDER_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([^{}]*?)\s*\}\}").expect("placeholder regex is valid")
});

/// Template rendering errors
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TemplateError {
    #[error("unknown placeholder '{{{{{0}}}}}'")]
    UnknownPlaceholder(String),

    #[error("unterminated placeholder at byte {0}")]
    Unterminated(usize),
}

/// Names a template may reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Placeholder {
    Metric,
    BaseAlgorithm,
    CompareAlgorithm,
    ValidCases,
    TotalCases,
    GeomeanImprovement,
    MeanImprovement,
    MedianImprovement,
    PValue,
    ConfidenceInterval,
    DegradedCount,
    Status,
    Findings,
    OtherMetrics,
    Question,
}

impl Placeholder {
    pub const ALL: [Placeholder; 15] = [
        Placeholder::Metric,
        Placeholder::BaseAlgorithm,
        Placeholder::CompareAlgorithm,
        Placeholder::ValidCases,
        Placeholder::TotalCases,
        Placeholder::GeomeanImprovement,
        Placeholder::MeanImprovement,
        Placeholder::MedianImprovement,
        Placeholder::PValue,
        Placeholder::ConfidenceInterval,
        Placeholder::DegradedCount,
        Placeholder::Status,
        Placeholder::Findings,
        Placeholder::OtherMetrics,
        Placeholder::Question,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Placeholder::Metric => "metric",
            Placeholder::BaseAlgorithm => "base_algorithm",
            Placeholder::CompareAlgorithm => "compare_algorithm",
            Placeholder::ValidCases => "valid_cases",
            Placeholder::TotalCases => "total_cases",
            Placeholder::GeomeanImprovement => "geomean_improvement",
            Placeholder::MeanImprovement => "mean_improvement",
            Placeholder::MedianImprovement => "median_improvement",
            Placeholder::PValue => "p_value",
            Placeholder::ConfidenceInterval => "confidence_interval",
            Placeholder::DegradedCount => "degraded_count",
            Placeholder::Status => "status",
            Placeholder::Findings => "findings",
            Placeholder::OtherMetrics => "other_metrics",
            Placeholder::Question => "question",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.name() == name)
    }

    /// Text substituted for this placeholder
    pub fn resolve(&self, params: &AdvisoryParams) -> String {
        match self {
            Placeholder::Metric => params.metric.clone(),
            Placeholder::BaseAlgorithm => params.base_algorithm.clone(),
            Placeholder::CompareAlgorithm => params.compare_algorithm.clone(),
            Placeholder::ValidCases => params.valid_cases.to_string(),
            Placeholder::TotalCases => params.total_cases.to_string(),
            Placeholder::GeomeanImprovement => format_optional_pct(params.geomean_improvement),
            Placeholder::MeanImprovement => format!("{:.2}%", params.mean_improvement),
            Placeholder::MedianImprovement => format!("{:.2}%", params.median_improvement),
            Placeholder::PValue => format!("{:.4}", params.p_value),
            Placeholder::ConfidenceInterval => {
                format!("[{:.2}%, {:.2}%]", params.ci_lower, params.ci_upper)
            }
            Placeholder::DegradedCount => params.degraded_count.to_string(),
            Placeholder::Status => params.status.to_string(),
            Placeholder::Findings => {
                if params.findings.is_empty() {
                    "- none".to_string()
                } else {
                    params
                        .findings
                        .iter()
                        .map(|f| format!("- [{}] {}", f.severity, f.message))
                        .collect::<Vec<_>>()
                        .join("\n")
                }
            }
            Placeholder::OtherMetrics => {
                if params.other_metrics.is_empty() {
                    "- none".to_string()
                } else {
                    params
                        .other_metrics
                        .iter()
                        .map(|m| {
                            format!(
                                "- {}: geomean {}, p = {:.4}, {} cases",
                                m.metric,
                                format_optional_pct(m.geomean_improvement),
                                m.p_value,
                                m.valid_cases
                            )
                        })
                        .collect::<Vec<_>>()
                        .join("\n")
                }
            }
            Placeholder::Question => params
                .question
                .clone()
                .unwrap_or_else(|| "(no specific question)".to_string()),
        }
    }
}

fn format_optional_pct(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.2}%", v),
        None => "n/a".to_string(),
    }
}

/// Placeholders referenced by a template, in order of appearance
///
/// Fails on the first unknown or unterminated placeholder.
pub fn validate_template(template: &str) -> Result<Vec<Placeholder>, TemplateError> {
    let mut found = Vec::new();
    scan(template, |_, placeholder| {
        if let Some(p) = placeholder {
            found.push(p);
        }
    })?;
    Ok(found)
}

/// Substitute every placeholder of `template` from `params`
///
/// # Example
/// ```
/// use qorcompare::advisory::{render_template, TemplateError};
/// # use qorcompare::advisory::AdvisoryParams;
/// # use qorcompare::anomaly::OverallStatus;
/// # let params = AdvisoryParams {
/// #     metric: "area".into(), base_algorithm: "v1".into(), compare_algorithm: "v2".into(),
/// #     valid_cases: 12, total_cases: 12, geomean_improvement: Some(3.5),
/// #     mean_improvement: 3.0, median_improvement: 3.0, p_value: 0.01,
/// #     ci_lower: 2.0, ci_upper: 4.0, degraded_count: 1, status: OverallStatus::Good,
/// #     findings: vec![], other_metrics: vec![], question: None,
/// # };
/// let text = render_template("{{metric}}: {{ geomean_improvement }}", &params).unwrap();
/// assert_eq!(text, "area: 3.50%");
///
/// let err = render_template("{{metrc}}", &params).unwrap_err();
/// assert_eq!(err, TemplateError::UnknownPlaceholder("metrc".into()));
/// ```
pub fn render_template(template: &str, params: &AdvisoryParams) -> Result<String, TemplateError> {
    let mut out = String::with_capacity(template.len());
    scan(template, |literal, placeholder| {
        out.push_str(literal);
        if let Some(p) = placeholder {
            out.push_str(&p.resolve(params));
        }
    })?;
    Ok(out)
}

/// Walk literal segments and placeholders alternately
fn scan<F>(template: &str, mut visit: F) -> Result<(), TemplateError>
where
    F: FnMut(&str, Option<Placeholder>),
{
    let mut last = 0;
    for caps in PLACEHOLDER_PATTERN.captures_iter(template) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        let literal = &template[last..whole.start()];
        check_literal(literal, last)?;

        let name = caps.get(1).map_or("", |m| m.as_str());
        let placeholder = Placeholder::from_name(name)
            .ok_or_else(|| TemplateError::UnknownPlaceholder(name.to_string()))?;
        visit(literal, Some(placeholder));
        last = whole.end();
    }

    let tail = &template[last..];
    check_literal(tail, last)?;
    visit(tail, None);
    Ok(())
}

fn check_literal(literal: &str, offset: usize) -> Result<(), TemplateError> {
    match literal.find("{{") {
        Some(pos) => Err(TemplateError::Unterminated(offset + pos)),
        None => Ok(()),
    }
}

/// Kinds of advisory request, each with its own default prompt
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    /// Narrative summary of the comparison
    Summary,
    /// Likely causes of regressions and outliers
    RootCause,
    /// Trade-offs between the focused metric and the others
    Tradeoff,
}

impl RequestKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestKind::Summary => "summary",
            RequestKind::RootCause => "root_cause",
            RequestKind::Tradeoff => "tradeoff",
        }
    }

    pub fn default_template(&self) -> &'static str {
        match self {
            RequestKind::Summary => SUMMARY_TEMPLATE,
            RequestKind::RootCause => ROOT_CAUSE_TEMPLATE,
            RequestKind::Tradeoff => TRADEOFF_TEMPLATE,
        }
    }
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "summary" => Ok(RequestKind::Summary),
            "root_cause" => Ok(RequestKind::RootCause),
            "tradeoff" => Ok(RequestKind::Tradeoff),
            other => Err(format!("unknown request kind '{}'", other)),
        }
    }
}

/// System instruction sent with every request
pub const SYSTEM_PROMPT: &str = "You are an expert in EDA tool quality-of-results analysis. \
Answer concisely in Markdown. Base every claim on the statistics provided; \
say so when the data is insufficient.";

const SUMMARY_TEMPLATE: &str = "\
Compare algorithm '{{compare_algorithm}}' against baseline '{{base_algorithm}}' on metric '{{metric}}' (lower is better).

Valid cases: {{valid_cases}} of {{total_cases}}
Geometric-mean improvement: {{geomean_improvement}}
Mean improvement: {{mean_improvement}}
Median improvement: {{median_improvement}}
95% confidence interval: {{confidence_interval}}
Wilcoxon p-value: {{p_value}}
Degraded cases: {{degraded_count}}
Quality status: {{status}}

Findings:
{{findings}}

Other metrics:
{{other_metrics}}

Write a short executive summary: is the new algorithm better, how confident are we, and what should be checked next?
Question: {{question}}";

const ROOT_CAUSE_TEMPLATE: &str = "\
Metric '{{metric}}' comparing '{{compare_algorithm}}' against '{{base_algorithm}}' shows:
geomean improvement {{geomean_improvement}}, median {{median_improvement}}, p-value {{p_value}}, {{degraded_count}} of {{valid_cases}} cases degraded.

Findings:
{{findings}}

List the most likely root causes of the regressions and outliers, ordered by likelihood, and the experiment that would confirm each.
Question: {{question}}";

const TRADEOFF_TEMPLATE: &str = "\
Focused metric '{{metric}}' ('{{compare_algorithm}}' vs '{{base_algorithm}}'): geomean {{geomean_improvement}}, p-value {{p_value}}, status {{status}}.

Other metrics:
{{other_metrics}}

Explain the trade-offs between the focused metric and the other metrics, and whether the overall change is worth adopting.
Question: {{question}}";

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advisory::params::{FindingDigest, MetricDigest};
    use crate::anomaly::{OverallStatus, Severity};

    fn params() -> AdvisoryParams {
        AdvisoryParams {
            metric: "hpwl".into(),
            base_algorithm: "v1".into(),
            compare_algorithm: "v2".into(),
            valid_cases: 40,
            total_cases: 42,
            geomean_improvement: Some(-12.345),
            mean_improvement: -10.0,
            median_improvement: -9.5,
            p_value: 0.01234,
            ci_lower: -14.0,
            ci_upper: -6.0,
            degraded_count: 30,
            status: OverallStatus::Critical,
            findings: vec![FindingDigest {
                severity: Severity::Error,
                message: "Severe overall regression on hpwl".into(),
            }],
            other_metrics: vec![MetricDigest {
                metric: "wns".into(),
                geomean_improvement: None,
                p_value: 1.0,
                valid_cases: 3,
            }],
            question: None,
        }
    }

    #[test]
    fn test_render_scalars() {
        let text = render_template(
            "{{metric}} {{ base_algorithm }}->{{compare_algorithm}} {{valid_cases}}/{{total_cases}} {{p_value}} {{confidence_interval}}",
            &params(),
        )
        .unwrap();
        assert_eq!(text, "hpwl v1->v2 40/42 0.0123 [-14.00%, -6.00%]");
    }

    #[test]
    fn test_render_lists() {
        let text = render_template("{{findings}}\n{{other_metrics}}", &params()).unwrap();
        assert_eq!(
            text,
            "- [error] Severe overall regression on hpwl\n- wns: geomean n/a, p = 1.0000, 3 cases"
        );
    }

    #[test]
    fn test_render_question() {
        assert_eq!(
            render_template("{{question}}", &params()).unwrap(),
            "(no specific question)"
        );
        let asked = params().with_question("Why is it worse?");
        assert_eq!(
            render_template("{{question}}", &asked).unwrap(),
            "Why is it worse?"
        );
    }

    #[test]
    fn test_text_without_placeholders_is_unchanged() {
        let text = "plain text with { single } braces";
        assert_eq!(render_template(text, &params()).unwrap(), text);
    }

    #[test]
    fn test_unknown_placeholder() {
        assert_eq!(
            render_template("{{ p_val }}", &params()),
            Err(TemplateError::UnknownPlaceholder("p_val".into()))
        );
        assert_eq!(
            render_template("{{}}", &params()),
            Err(TemplateError::UnknownPlaceholder(String::new()))
        );
    }

    #[test]
    fn test_unterminated_placeholder() {
        assert_eq!(
            render_template("ok {{metric}} then {{status", &params()),
            Err(TemplateError::Unterminated(19))
        );
        assert_eq!(
            validate_template("{{ {{metric}}"),
            Err(TemplateError::Unterminated(0))
        );
    }

    #[test]
    fn test_validate_lists_placeholders() {
        assert_eq!(
            validate_template("{{metric}} and {{status}}").unwrap(),
            vec![Placeholder::Metric, Placeholder::Status]
        );
    }

    #[test]
    fn test_placeholder_names_round_trip() {
        for placeholder in Placeholder::ALL {
            assert_eq!(Placeholder::from_name(placeholder.name()), Some(placeholder));
        }
        assert_eq!(Placeholder::from_name("Metric"), None);
    }

    #[test]
    fn test_default_templates_render() {
        for kind in [RequestKind::Summary, RequestKind::RootCause, RequestKind::Tradeoff] {
            let text = render_template(kind.default_template(), &params()).unwrap();
            assert!(text.contains("hpwl"), "{kind} template lost the metric");
            assert!(!text.contains("{{"));
        }
    }

    #[test]
    fn test_request_kind_parse() {
        assert_eq!("root_cause".parse::<RequestKind>(), Ok(RequestKind::RootCause));
        assert!("rootcause".parse::<RequestKind>().is_err());
        assert_eq!(RequestKind::Tradeoff.to_string(), "tradeoff");
    }
}
