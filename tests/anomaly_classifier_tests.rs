//! Integration tests for the quality classifier

use qorcompare::anomaly::{classify, ClassifierThresholds, FindingKind, OverallStatus, Severity};
use qorcompare::pairwise::{compute_pairwise_summary, PairwiseSummary};
use qorcompare::table::{Case, MetricTable};

/// 50 cases, 20 degraded, pinned to geomean -15% and p = 0.3
fn regressed_summary() -> PairwiseSummary {
    let table = MetricTable::from_cases((0..50).map(|i| {
        let compare = if i < 20 { 110.0 } else { 98.0 };
        Case::new(format!("block_{i:02}"))
            .with_metric("hpwl", "ref", Some(100.0))
            .with_metric("hpwl", "new", Some(compare))
    }));
    let mut summary =
        compute_pairwise_summary(&table, "hpwl", "ref", "new", &table.all_case_names()).unwrap();
    summary.geomean_improvement = Some(-15.0);
    summary.p_value = 0.3;
    summary
}

#[test]
fn test_severe_regression_scenario() {
    let summary = regressed_summary();
    assert_eq!(summary.n_valid, 50);
    assert_eq!(summary.degraded_count, 20);

    let assessment = classify(&summary, &[], &ClassifierThresholds::default());

    let errors: Vec<_> = assessment
        .findings
        .iter()
        .filter(|f| f.severity == Severity::Error)
        .collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].kind, FindingKind::SevereRegression);
    assert!(errors[0].message.contains("Severe overall regression"));

    let softer = assessment.count(Severity::Warning) + assessment.count(Severity::Info);
    assert!(softer >= 1);
    assert!(
        assessment.has(FindingKind::DegradationRate) || assessment.has(FindingKind::NotSignificant)
    );
    assert_eq!(assessment.status, OverallStatus::Critical);
}

#[test]
fn test_degradation_rate_is_a_warning() {
    let assessment = classify(&regressed_summary(), &[], &ClassifierThresholds::default());
    let rate = assessment
        .findings
        .iter()
        .find(|f| f.kind == FindingKind::DegradationRate)
        .expect("40% degraded exceeds the default 30% threshold");
    assert_eq!(rate.severity, Severity::Warning);
    assert!(rate.message.contains("20"));
}

#[test]
fn test_presets_change_verdict() {
    let table = MetricTable::from_cases((0..12).map(|i| {
        Case::new(format!("block_{i:02}"))
            .with_metric("area", "ref", Some(100.0))
            .with_metric("area", "new", Some(if i % 4 == 0 { 107.0 } else { 100.0 - 0.5 * i as f64 }))
    }));
    let summary =
        compute_pairwise_summary(&table, "area", "ref", "new", &table.all_case_names()).unwrap();

    let default = classify(&summary, &[], &ClassifierThresholds::default());
    let strict = classify(&summary, &[], &ClassifierThresholds::strict());

    assert!(strict.findings.len() >= default.findings.len());
    assert!(strict.has(FindingKind::SmallSample));
    assert!(!default.has(FindingKind::SmallSample));
}

#[test]
fn test_assessment_serializes() {
    let assessment = classify(&regressed_summary(), &[], &ClassifierThresholds::default());
    let value = serde_json::to_value(&assessment).unwrap();

    assert_eq!(value["status"], "critical");
    assert_eq!(value["findings"][0]["kind"], "severe_regression");
    assert_eq!(value["findings"][0]["severity"], "error");
    assert!(value["recommendations"].as_array().unwrap().len() >= 2);
}
