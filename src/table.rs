//! In-memory metric table: cases × algorithms × metrics
//!
//! Holds the QoR values of every test design for every algorithm run. A
//! missing measurement is stored as `None` and stays `None`: nothing in the
//! table ever substitutes a number for it, so downstream statistics see
//! "no comparison possible" instead of a fabricated zero.

use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::path::Path;

/// Working subset of case names chosen by the caller
pub type CaseSelection = BTreeSet<String>;

/// Free-form case attribute (e.g. instance count, design family)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Number(f64),
    Text(String),
}

impl AttributeValue {
    /// Numeric view of the attribute, parsing numeric-looking text
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttributeValue::Number(v) if v.is_finite() => Some(*v),
            AttributeValue::Number(_) => None,
            AttributeValue::Text(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Number(v) => write!(f, "{}", v),
            AttributeValue::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<f64> for AttributeValue {
    fn from(v: f64) -> Self {
        AttributeValue::Number(v)
    }
}

impl From<&str> for AttributeValue {
    fn from(s: &str) -> Self {
        AttributeValue::Text(s.to_string())
    }
}

/// One test design with its attributes and per-algorithm metric values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Case {
    /// Unique case name
    pub name: String,

    /// Free-form metadata (attribute name → value)
    #[serde(default)]
    pub attributes: BTreeMap<String, AttributeValue>,

    /// metric name → algorithm name → value (`None` = absent)
    #[serde(default, deserialize_with = "deserialize_metrics")]
    pub metrics: BTreeMap<String, BTreeMap<String, Option<f64>>>,
}

impl Case {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Builder-style attribute setter
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Builder-style metric setter; non-finite values are stored as absent
    pub fn with_metric(
        mut self,
        metric: impl Into<String>,
        algorithm: impl Into<String>,
        value: Option<f64>,
    ) -> Self {
        self.set_metric(metric, algorithm, value);
        self
    }

    pub fn set_metric(
        &mut self,
        metric: impl Into<String>,
        algorithm: impl Into<String>,
        value: Option<f64>,
    ) {
        self.metrics
            .entry(metric.into())
            .or_default()
            .insert(algorithm.into(), value.filter(|v| v.is_finite()));
    }

    /// Value for a metric/algorithm pair, `None` if absent or unknown
    pub fn value(&self, metric: &str, algorithm: &str) -> Option<f64> {
        self.metrics
            .get(metric)
            .and_then(|by_algo| by_algo.get(algorithm))
            .copied()
            .flatten()
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes.get(name)
    }
}

/// Metric cell as found in a table document
#[derive(Deserialize)]
#[serde(untagged)]
enum RawMetric {
    Number(f64),
    Text(String),
}

impl RawMetric {
    /// Numbers and numeric text are kept; "NA", "NaN" and anything else become absent
    fn into_value(self) -> Option<f64> {
        match self {
            RawMetric::Number(v) => Some(v),
            RawMetric::Text(s) => s.trim().parse::<f64>().ok(),
        }
        .filter(|v| v.is_finite())
    }
}

fn deserialize_metrics<'de, D>(
    deserializer: D,
) -> std::result::Result<BTreeMap<String, BTreeMap<String, Option<f64>>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = BTreeMap::<String, BTreeMap<String, Option<RawMetric>>>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .map(|(metric, by_algo)| {
            let cleaned = by_algo
                .into_iter()
                .map(|(algo, v)| (algo, v.and_then(RawMetric::into_value)))
                .collect();
            (metric, cleaned)
        })
        .collect())
}

/// Table of cases, indexed by name, preserving insertion order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricTable {
    cases: Vec<Case>,
    index: HashMap<String, usize>,
}

#[derive(Serialize, Deserialize)]
struct TableDocument {
    cases: Vec<Case>,
}

impl MetricTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from cases; later duplicates replace earlier ones
    pub fn from_cases(cases: impl IntoIterator<Item = Case>) -> Self {
        let mut table = Self::new();
        for case in cases {
            table.insert_case(case);
        }
        table
    }

    /// Parse a `{ "cases": [...] }` JSON document
    pub fn from_json_str(json: &str) -> Result<Self> {
        let doc: TableDocument =
            serde_json::from_str(json).context("Failed to parse metric table JSON")?;
        Ok(Self::from_cases(doc.cases))
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read metric table {}", path.display()))?;
        Self::from_json_str(&text)
    }

    /// Insert a case, replacing any existing case with the same name in place
    pub fn insert_case(&mut self, case: Case) {
        if let Some(&idx) = self.index.get(&case.name) {
            self.cases[idx] = case;
        } else {
            self.index.insert(case.name.clone(), self.cases.len());
            self.cases.push(case);
        }
    }

    pub fn case(&self, name: &str) -> Option<&Case> {
        self.index.get(name).map(|&idx| &self.cases[idx])
    }

    pub fn cases(&self) -> &[Case] {
        &self.cases
    }

    pub fn case_names(&self) -> impl Iterator<Item = &str> {
        self.cases.iter().map(|c| c.name.as_str())
    }

    /// Selection covering every case in the table
    pub fn all_case_names(&self) -> CaseSelection {
        self.case_names().map(str::to_string).collect()
    }

    pub fn value(&self, case: &str, metric: &str, algorithm: &str) -> Option<f64> {
        self.case(case).and_then(|c| c.value(metric, algorithm))
    }

    /// Sorted, deduplicated metric names across all cases
    pub fn metric_names(&self) -> Vec<String> {
        let names: BTreeSet<&String> = self.cases.iter().flat_map(|c| c.metrics.keys()).collect();
        names.into_iter().cloned().collect()
    }

    /// Sorted, deduplicated algorithm names across all cases and metrics
    pub fn algorithm_names(&self) -> Vec<String> {
        let names: BTreeSet<&String> = self
            .cases
            .iter()
            .flat_map(|c| c.metrics.values())
            .flat_map(|by_algo| by_algo.keys())
            .collect();
        names.into_iter().cloned().collect()
    }

    pub fn attribute_names(&self) -> Vec<String> {
        let names: BTreeSet<&String> = self
            .cases
            .iter()
            .flat_map(|c| c.attributes.keys())
            .collect();
        names.into_iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }
}

impl Serialize for MetricTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        TableDocument {
            cases: self.cases.clone(),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for MetricTable {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let doc = TableDocument::deserialize(deserializer)?;
        Ok(Self::from_cases(doc.cases))
    }
}
