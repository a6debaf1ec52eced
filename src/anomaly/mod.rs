// QoR quality classification
//
// Consumes pairwise summaries (one focused metric, optionally several others)
// and produces severity-tagged findings, deduplicated recommendations and an
// overall status:
//
// - critical if any error finding exists
// - warning if any warning finding exists
// - notice if any info finding exists
// - good otherwise
//
// Thresholds live in ClassifierThresholds; the rule set itself is fixed.

mod classifier;
mod config;

pub use classifier::{
    classify, Finding, FindingKind, OverallStatus, QualityAssessment, Severity,
};
pub use config::ClassifierThresholds;
