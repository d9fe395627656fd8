//! CLI command logic
//!
//! Command functions return an [`ExitStatus`] so gate failures can be told
//! apart from errors; anything that bubbles up as `Err` exits with code 2.

pub mod analyze;
pub mod quality;
pub mod review;

use anyhow::Context;
use std::path::Path;
use tracing::debug;

use criba::{CribaConfig, LabeledCorpus, WeakSupervisionLabeler};

/// Process exit status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    Success,
    /// Regression detected or quality threshold violated
    GateFailed,
    /// Malformed or missing input, invalid configuration
    Error,
}

impl ExitStatus {
    pub fn code(self) -> i32 {
        match self {
            Self::Success => 0,
            Self::GateFailed => 1,
            Self::Error => 2,
        }
    }
}

/// Stdout format
#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output
    #[default]
    Text,
    /// JSON output
    Json,
    /// Markdown output
    Markdown,
}

/// Load the configuration file, falling back to defaults when it is absent.
pub fn load_config(path: &Path) -> anyhow::Result<CribaConfig> {
    let config = CribaConfig::load_optional(path)
        .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
    debug!(path = %path.display(), "configuration loaded");
    Ok(config)
}

/// Load and label a corpus with the configured rules.
pub fn load_labeled(config: &CribaConfig, path: &Path) -> anyhow::Result<LabeledCorpus> {
    let labeler = WeakSupervisionLabeler::new(config.labeling.rules.clone());
    let corpus = LabeledCorpus::load(path, config.loader.options(), &labeler)
        .with_context(|| format!("Failed to load corpus {}", path.display()))?;
    if corpus.load_stats.skipped > 0 {
        eprintln!(
            "Skipped {} of {} rows ({:.1}%)",
            corpus.load_stats.skipped,
            corpus.load_stats.total_rows,
            corpus.load_stats.skip_ratio() * 100.0
        );
    }
    Ok(corpus)
}

/// Write `value` as a pretty-printed JSON artifact.
pub fn write_artifact<T: serde::Serialize + ?Sized>(path: &Path, value: &T) -> anyhow::Result<()> {
    criba::persist::write_json(path, value)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}
