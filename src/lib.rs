//! qorcompare - Statistical QoR comparison and anomaly detection for EDA tool runs
//!
//! This library compares two runs ("algorithms") of an EDA tool across many
//! test cases and metrics: per-case improvement rates, robust aggregate
//! statistics (geometric-mean improvement, Wilcoxon signed-rank significance,
//! confidence interval, IQR outliers), cross-variable correlation, a
//! rule-based quality classifier, and an advisory layer that wraps an external
//! narrative provider with caching, retries and a deterministic fallback.

pub mod advisory;
pub mod anomaly;
pub mod cli;
pub mod config;
pub mod correlation;
pub mod pairwise;
pub mod table;
