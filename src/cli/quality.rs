//! Report, diff and baseline commands.

use anyhow::Context;
use colored::Colorize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use criba::corpus::load_corpus;
use criba::gate::{load_report, ReportDelta};
use criba::quality::{format_report_json, format_report_markdown, format_report_text};
use criba::{
    BaselineStore, CategoryPassPolicy, CribaConfig, GateDecision, Grade, PassSnapshot,
    QualityReportAggregator, RegressionGate,
};

use super::{load_labeled, write_artifact, ExitStatus, OutputFormat};

pub fn cmd_report(
    config: &CribaConfig,
    corpus: &Path,
    output: Option<&Path>,
    format: OutputFormat,
    min_grade: Option<Grade>,
) -> anyhow::Result<ExitStatus> {
    let corpus = load_labeled(config, corpus)?;
    let aggregator = QualityReportAggregator {
        top_n: config.report.top_suspicious,
        formula: config.report.formula,
    };
    let report = aggregator.aggregate(&corpus)?;

    if let Some(path) = output {
        write_artifact(path, &report)?;
        info!("Report written to {}", path.display());
    }

    let rendered = match format {
        OutputFormat::Text => format_report_text(&report),
        OutputFormat::Json => format_report_json(&report)?,
        OutputFormat::Markdown => format_report_markdown(&report),
    };
    println!("{}", rendered);

    let Some(min) = min_grade.or(config.report.min_grade) else {
        return Ok(ExitStatus::Success);
    };
    if report.meets(min) {
        Ok(ExitStatus::Success)
    } else {
        eprintln!(
            "{} grade {} is below the required {}",
            "QUALITY GATE FAILED:".bright_red().bold(),
            report.grade,
            min
        );
        Ok(ExitStatus::GateFailed)
    }
}

pub fn cmd_diff(
    config: &CribaConfig,
    baseline: &Path,
    current: &Path,
    by_record: bool,
    policy: Option<CategoryPassPolicy>,
) -> anyhow::Result<ExitStatus> {
    let (before, after) = if by_record {
        let options = config.loader.options();
        let before = load_corpus(baseline, options)
            .with_context(|| format!("Failed to load corpus {}", baseline.display()))?;
        let after = load_corpus(current, options)
            .with_context(|| format!("Failed to load corpus {}", current.display()))?;
        (
            PassSnapshot::from_records(&before.records),
            PassSnapshot::from_records(&after.records),
        )
    } else {
        let policy = policy.unwrap_or(config.gate.policy);
        let before = load_report(baseline)?;
        let after = load_report(current)?;
        let delta = ReportDelta::between(&before, &after);
        println!(
            "Pass rate: {:+.1} pp ({} → {}), records {:+}",
            delta.pass_rate_delta, before.grade, after.grade, delta.total_delta
        );
        (
            PassSnapshot::from_report(&before, policy),
            PassSnapshot::from_report(&after, policy),
        )
    };

    let result = RegressionGate.gate(&before, &after)?;
    println!("{}", result.format_text());

    match result.decision() {
        GateDecision::Pass => {
            println!("{}", "✅ No regressions".bright_green());
            Ok(ExitStatus::Success)
        }
        GateDecision::RegressionDetected => {
            eprintln!(
                "{} {} regressed",
                "❌ REGRESSION DETECTED:".bright_red().bold(),
                result.regressed.len()
            );
            Ok(ExitStatus::GateFailed)
        }
    }
}

pub fn cmd_baseline(
    config: &CribaConfig,
    report: &Path,
    baseline: Option<PathBuf>,
) -> anyhow::Result<ExitStatus> {
    let report = load_report(report)?;
    let store = BaselineStore::new(baseline.unwrap_or_else(|| config.gate.baseline.clone()));

    match store.load_optional() {
        Ok(Some(previous)) => {
            let delta = ReportDelta::between(previous.report(), &report);
            println!(
                "Previous baseline {} ({}), pass rate {:+.1} pp",
                &previous.digest()[..12],
                previous.report().grade,
                delta.pass_rate_delta
            );
        }
        Ok(None) => {}
        Err(e) => warn!("Replacing unreadable baseline: {}", e),
    }

    let promoted = store.promote(&report)?;
    println!(
        "{} {} (grade {}, digest {})",
        "Baseline updated:".bright_green().bold(),
        store.path().display(),
        promoted.report().grade,
        &promoted.digest()[..12]
    );
    Ok(ExitStatus::Success)
}
