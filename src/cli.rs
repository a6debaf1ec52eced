//! CLI argument parsing for qorcompare

use crate::advisory::RequestKind;
use crate::table::{CaseSelection, MetricTable};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Output format for comparison results
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text format (default)
    Text,
    /// JSON format for machine parsing
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "qorcompare")]
#[command(version)]
#[command(about = "Statistical QoR comparison and anomaly detection for EDA tool runs", long_about = None)]
pub struct Cli {
    /// Metric table (JSON document with a "cases" array)
    #[arg(short, long, value_name = "FILE")]
    pub table: PathBuf,

    /// Metric to compare (focused metric when combined with --all-metrics)
    #[arg(short, long, value_name = "METRIC")]
    pub metric: Option<String>,

    /// Baseline algorithm
    #[arg(short, long, value_name = "ALGO")]
    pub base: Option<String>,

    /// Algorithm compared against the baseline
    #[arg(short, long, value_name = "ALGO")]
    pub compare: Option<String>,

    /// Restrict to these cases (comma-separated); all cases by default
    #[arg(long, value_name = "CASES", value_delimiter = ',')]
    pub cases: Vec<String>,

    /// Engine configuration file (TOML)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Output format (text or json)
    #[arg(long = "format", value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Compare every metric and feed the others into cross-metric rules
    #[arg(long = "all-metrics")]
    pub all_metrics: bool,

    /// Correlate two variables instead of comparing (metric:M:ALGO, attr:NAME, imp:M:BASE:CMP)
    #[arg(long, num_args = 2, value_names = ["X", "Y"])]
    pub correlate: Option<Vec<String>>,

    /// Request an advisory narrative (falls back to a built-in report)
    #[arg(long, value_enum, value_name = "KIND", num_args = 0..=1, default_missing_value = "summary")]
    pub advise: Option<RequestKind>,

    /// Question passed to the advisory provider
    #[arg(long, value_name = "TEXT", requires = "advise")]
    pub question: Option<String>,

    /// Enable debug tracing output (to stderr)
    #[arg(long = "debug")]
    pub debug: bool,
}

impl Cli {
    /// Cases to analyze: the --cases list, or every case in the table
    pub fn selection(&self, table: &MetricTable) -> CaseSelection {
        if self.cases.is_empty() {
            table.all_case_names()
        } else {
            self.cases
                .iter()
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty())
                .collect()
        }
    }
}
