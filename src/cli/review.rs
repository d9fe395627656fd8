//! Human review commands: sampling, review summaries, golden traces.

use chrono::Utc;
use colored::Colorize;
use std::path::{Path, PathBuf};
use tracing::info;

use criba::golden::{summarize_error_codes, DEFAULT_QUOTA};
use criba::sampling::{default_sample_path, review_guide, ReviewSummary};
use criba::{CribaConfig, GoldenRanking, GoldenTarget, GoldenTraceCurator, StratifiedSampler};

use super::{load_labeled, write_artifact, ExitStatus};

pub fn cmd_sample(
    config: &CribaConfig,
    corpus: &Path,
    fraction: Option<f64>,
    seed: Option<u64>,
    output: Option<PathBuf>,
) -> anyhow::Result<ExitStatus> {
    let sampler = StratifiedSampler::new(
        fraction.unwrap_or(config.sampling.fraction),
        seed.unwrap_or(config.sampling.seed),
        config.sampling.policy,
    )?;
    let corpus = load_labeled(config, corpus)?;

    let now = Utc::now();
    let sample = sampler.sample(&corpus, now);
    let path = output.unwrap_or_else(|| default_sample_path(&config.sampling.reviews_dir, now));
    write_artifact(&path, &sample)?;

    println!(
        "{} {} records from {} categories ({})",
        "Sampled".bright_green().bold(),
        sample.record_ids.len(),
        sample.stratum_counts.len(),
        sample.period
    );
    for (category, count) in &sample.stratum_counts {
        println!("  {:24} {}", category, count);
    }
    println!("Written to {}", path.display());
    Ok(ExitStatus::Success)
}

pub fn cmd_hitl_summary(config: &CribaConfig, dir: Option<PathBuf>) -> anyhow::Result<ExitStatus> {
    let dir = dir.unwrap_or_else(|| config.sampling.reviews_dir.clone());
    let summary = ReviewSummary::from_dir(&dir)?;
    print!("{}", summary.format_text());
    Ok(ExitStatus::Success)
}

pub fn cmd_hitl_guide() -> anyhow::Result<ExitStatus> {
    print!("{}", review_guide());
    Ok(ExitStatus::Success)
}

pub fn cmd_golden(
    config: &CribaConfig,
    corpus: &Path,
    codes: Option<&str>,
    per_code: Option<usize>,
    ranking: Option<GoldenRanking>,
    output: &Path,
) -> anyhow::Result<ExitStatus> {
    let targets = match (codes, per_code) {
        (Some(spec), quota) => GoldenTarget::parse_list(spec, quota.unwrap_or(DEFAULT_QUOTA))?,
        (None, Some(quota)) => config
            .golden
            .targets
            .iter()
            .map(|t| GoldenTarget::new(t.code.clone(), quota))
            .collect(),
        (None, None) => config.golden.targets.clone(),
    };
    let curator = GoldenTraceCurator::new(targets, ranking.unwrap_or(config.golden.ranking))?;
    let corpus = load_labeled(config, corpus)?;

    for summary in summarize_error_codes(corpus.records()).iter().take(10) {
        info!(
            code = %summary.code,
            count = summary.count,
            records = summary.records,
            "{}",
            summary.description
        );
    }

    let traces = curator.curate(corpus.records());
    write_artifact(output, &traces)?;

    println!(
        "{} {} golden traces",
        "Curated".bright_green().bold(),
        traces.len()
    );
    for target in curator.targets() {
        let selected = traces.iter().filter(|t| t.error_code == target.code).count();
        println!("  {:8} {}/{}", target.code, selected, target.quota);
    }
    println!("Written to {}", output.display());
    Ok(ExitStatus::Success)
}
