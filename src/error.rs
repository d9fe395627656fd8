//! Pipeline errors
//!
//! Error taxonomy shared by every pipeline stage. Row-level problems never
//! surface here directly: the loader counts and skips them, and only turns
//! them into a [`SchemaError`] once the skip ratio crosses its threshold.

use std::path::PathBuf;
use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, CribaError>;

/// Errors that abort a pipeline run
#[derive(Error, Debug)]
pub enum CribaError {
    /// Missing file or unreadable format
    #[error("Input error at {}: {source}", path.display())]
    Input {
        path: PathBuf,
        #[source]
        source: InputSource,
    },

    /// Structural schema mismatch or too many malformed rows
    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    /// No statistically meaningful answer exists for the given input
    #[error("Computation error: {0}")]
    Computation(String),

    /// Invalid configuration (rule set, sampling fraction, quotas)
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Underlying cause of an [`CribaError::Input`]
#[derive(Error, Debug)]
pub enum InputSource {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("{0}")]
    Invalid(String),
}

/// Structural problems with a corpus table
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchemaError {
    #[error("required column '{0}' is absent from every row")]
    MissingColumn(String),

    #[error("skipped {skipped} of {total} rows ({ratio:.1}% > {threshold:.1}% allowed)")]
    SkipRatioExceeded {
        skipped: usize,
        total: usize,
        ratio: f64,
        threshold: f64,
    },

    #[error("expected a table of objects: {0}")]
    NotTabular(String),
}

impl CribaError {
    /// Build an input error for `path`.
    pub fn input(path: impl Into<PathBuf>, source: impl Into<InputSource>) -> Self {
        Self::Input {
            path: path.into(),
            source: source.into(),
        }
    }

    /// Build a computation error.
    pub fn computation(msg: impl Into<String>) -> Self {
        Self::Computation(msg.into())
    }

    /// Build a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
