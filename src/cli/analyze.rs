//! Labeling, fault localization and insight commands.

use anyhow::Context;
use colored::Colorize;
use std::path::Path;
use tracing::info;

use criba::{CribaConfig, InsightAnalyzer, RiskTier, SbflFormula, TarantulaEngine};

use super::{load_labeled, write_artifact, ExitStatus, OutputFormat};

pub fn cmd_label(config: &CribaConfig, corpus: &Path, output: &Path) -> anyhow::Result<ExitStatus> {
    let corpus = load_labeled(config, corpus)?;
    corpus
        .write_jsonl(output)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    let stats = &corpus.stats;
    println!(
        "{} {} records (coverage {:.1}%, {} conflicts)",
        "Labeled".bright_green().bold(),
        stats.total,
        stats.coverage * 100.0,
        stats.conflicts
    );
    for tier in RiskTier::ALL {
        let success = stats
            .risk_vs_success
            .get(&tier)
            .map(|s| format!("{:.1}% transpiled", s.success_rate * 100.0))
            .unwrap_or_default();
        println!(
            "  {} {:6} {:6}  {}",
            tier.symbol(),
            tier.to_string(),
            stats.count(tier),
            success
        );
    }
    println!("Written to {}", output.display());
    Ok(ExitStatus::Success)
}

pub fn cmd_localize(
    config: &CribaConfig,
    corpus: &Path,
    formula: Option<SbflFormula>,
    format: OutputFormat,
) -> anyhow::Result<ExitStatus> {
    let corpus = load_labeled(config, corpus)?;
    let engine = TarantulaEngine::new(formula.unwrap_or(config.report.formula));
    let scores = engine.scores(corpus.records())?;
    info!("Scored {} features", scores.len());

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&scores)?),
        OutputFormat::Markdown => {
            println!("# Feature Suspiciousness ({})\n", engine.formula());
            println!("| Rank | Feature | Score | Failed | Passed |");
            println!("|------|---------|-------|--------|--------|");
            for (i, s) in scores.iter().enumerate() {
                println!(
                    "| {} | `{}` | {:.3} | {}/{} | {}/{} |",
                    i + 1,
                    s.feature,
                    s.score,
                    s.failed_with,
                    s.total_failed,
                    s.passed_with,
                    s.total_passed
                );
            }
        }
        OutputFormat::Text => {
            println!(
                "{}",
                format!("Feature suspiciousness ({})", engine.formula())
                    .bright_cyan()
                    .bold()
            );
            println!("{}", "─".repeat(60).dimmed());
            for (i, s) in scores.iter().enumerate() {
                let score = format!("{:.3}", s.score);
                let score = if s.score > 0.7 {
                    score.bright_red()
                } else if s.score > 0.5 {
                    score.bright_yellow()
                } else {
                    score.normal()
                };
                println!(
                    "  {:2}. {:20} {}  failed {}/{}  passed {}/{}",
                    i + 1,
                    s.feature.to_string(),
                    score,
                    s.failed_with,
                    s.total_failed,
                    s.passed_with,
                    s.total_passed
                );
            }
        }
    }
    Ok(ExitStatus::Success)
}

pub fn cmd_insights(
    config: &CribaConfig,
    corpus: &Path,
    output: Option<&Path>,
) -> anyhow::Result<ExitStatus> {
    let corpus = load_labeled(config, corpus)?;
    let insights = InsightAnalyzer::new(config.report.formula).analyze(corpus.records());

    if let Some(path) = output {
        write_artifact(path, &insights)?;
        info!("Insights written to {}", path.display());
    }
    print!("{}", insights.format_text());
    Ok(ExitStatus::Success)
}
