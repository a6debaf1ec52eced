use anyhow::{Context, Result};
use clap::Parser;
use qorcompare::advisory::{
    advise_or_fallback, fallback_for_error, AdvisoryError, AdvisoryOrchestrator, AdvisoryText,
    HttpProvider, RequestKind,
};
use qorcompare::anomaly::{classify, QualityAssessment};
use qorcompare::cli::{Cli, OutputFormat};
use qorcompare::config::EngineConfig;
use qorcompare::correlation::{paired_series, CorrelationResult, PairedSeries, Variable};
use qorcompare::pairwise::{compare_all_metrics, compute_pairwise_summary, PairwiseSummary};
use qorcompare::table::{CaseSelection, MetricTable};
use serde::Serialize;
use std::sync::Arc;
use tracing::warn;
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber for debug output
fn init_tracing(debug: bool) {
    if debug {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env().add_directive(tracing::Level::TRACE.into()),
            )
            .with_writer(std::io::stderr)
            .init();
    }
}

#[derive(Serialize)]
struct ComparisonOutput<'a> {
    summary: &'a PairwiseSummary,
    other_metrics: &'a [PairwiseSummary],
    assessment: &'a QualityAssessment,
    #[serde(skip_serializing_if = "Option::is_none")]
    advisory: Option<&'a AdvisoryText>,
}

#[derive(Serialize)]
struct CorrelationOutput<'a> {
    x: String,
    y: String,
    series: &'a PairedSeries,
    result: &'a CorrelationResult,
}

fn run_correlation(
    table: &MetricTable,
    specs: &[String],
    selection: &CaseSelection,
    format: OutputFormat,
) -> Result<()> {
    let [x_spec, y_spec] = specs else {
        anyhow::bail!("--correlate takes exactly two variables");
    };
    let x: Variable = x_spec.parse()?;
    let y: Variable = y_spec.parse()?;

    let series = paired_series(table, &x, &y, selection);
    let result = series.analyze();

    match format {
        OutputFormat::Json => {
            let output = CorrelationOutput {
                x: x.to_string(),
                y: y.to_string(),
                series: &series,
                result: &result,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Text => {
            println!("{} vs {}", x, y);
            print!("{}", result.to_report_string());
        }
    }
    Ok(())
}

/// Build the orchestrator; None when no provider is configured
fn build_orchestrator(config: &EngineConfig) -> Result<Option<AdvisoryOrchestrator>, AdvisoryError> {
    let Some(provider_config) = config.provider.clone() else {
        return Ok(None);
    };
    let provider = HttpProvider::new(provider_config)?;
    Ok(Some(AdvisoryOrchestrator::new(
        Arc::new(provider),
        config.advisory.clone(),
    )))
}

fn request_advisory(
    config: &EngineConfig,
    kind: RequestKind,
    summary: &PairwiseSummary,
    assessment: &QualityAssessment,
    others: &[PairwiseSummary],
    question: Option<&str>,
) -> Result<AdvisoryText> {
    let orchestrator = match build_orchestrator(config) {
        Ok(orchestrator) => orchestrator,
        Err(e) => {
            warn!("advisory provider unavailable: {}", e);
            eprintln!("Warning: advisory provider unavailable ({}), using built-in report", e);
            return Ok(fallback_for_error(summary, assessment, &e));
        }
    };

    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
    Ok(runtime.block_on(advise_or_fallback(
        orchestrator.as_ref(),
        kind,
        summary,
        assessment,
        others,
        question,
    )))
}

fn run_comparison(
    args: &Cli,
    config: &EngineConfig,
    table: &MetricTable,
    selection: &CaseSelection,
) -> Result<()> {
    let (Some(base), Some(compare)) = (args.base.as_deref(), args.compare.as_deref()) else {
        anyhow::bail!("--base and --compare are required for a comparison");
    };

    let (focused, others) = if args.all_metrics {
        let mut all = compare_all_metrics(table, base, compare, selection);
        let metric = match &args.metric {
            Some(metric) => metric.clone(),
            None => all
                .keys()
                .next()
                .cloned()
                .with_context(|| format!("No metric has valid cases for {} vs {}", base, compare))?,
        };
        let focused = all.remove(&metric);
        (focused, all.into_values().collect::<Vec<_>>())
    } else {
        let metric = args
            .metric
            .as_deref()
            .context("--metric is required unless --all-metrics is given")?;
        (
            compute_pairwise_summary(table, metric, base, compare, selection),
            Vec::new(),
        )
    };

    let Some(summary) = focused else {
        println!(
            "No valid cases for metric '{}' ({} vs {})",
            args.metric.as_deref().unwrap_or_default(),
            base,
            compare
        );
        return Ok(());
    };

    let assessment = classify(&summary, &others, &config.thresholds);
    let advisory = match args.advise {
        Some(kind) => Some(request_advisory(
            config,
            kind,
            &summary,
            &assessment,
            &others,
            args.question.as_deref(),
        )?),
        None => None,
    };

    match args.format {
        OutputFormat::Json => {
            let output = ComparisonOutput {
                summary: &summary,
                other_metrics: &others,
                assessment: &assessment,
                advisory: advisory.as_ref(),
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Text => {
            print!("{}", summary.to_report_string());
            for other in &others {
                println!();
                print!("{}", other.to_report_string());
            }
            println!();
            print!("{}", assessment.to_report_string());
            if let Some(advisory) = &advisory {
                println!();
                println!("{}", advisory.text);
            }
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Cli::parse();

    // Initialize tracing if --debug flag is set
    init_tracing(args.debug);

    let config = match &args.config {
        Some(path) => EngineConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => EngineConfig::default(),
    };

    let table = MetricTable::from_json_file(&args.table)?;
    let selection = args.selection(&table);

    match &args.correlate {
        Some(specs) => run_correlation(&table, specs, &selection, args.format),
        None => run_comparison(&args, &config, &table, &selection),
    }
}
