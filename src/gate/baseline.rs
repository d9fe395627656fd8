//! Baseline storage for gate comparisons.
//!
//! The baseline file is read-only during normal runs. It changes only via
//! [`BaselineStore::promote`], which validates the candidate report and
//! replaces the file atomically.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::{CribaError, InputSource, Result};
use crate::persist;
use crate::quality::QualityReport;

/// Load a report artifact and check its count invariants.
pub fn load_report(path: &Path) -> Result<QualityReport> {
    let report: QualityReport = persist::read_json(path)?;
    report
        .check_invariants()
        .map_err(|msg| CribaError::input(path, InputSource::Invalid(msg)))?;
    Ok(report)
}

/// Immutable baseline snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct Baseline {
    report: QualityReport,
    digest: String,
}

impl Baseline {
    fn from_bytes(path: &Path, bytes: &[u8]) -> Result<Self> {
        let report: QualityReport =
            serde_json::from_slice(bytes).map_err(|e| CribaError::input(path, e))?;
        report
            .check_invariants()
            .map_err(|msg| CribaError::input(path, InputSource::Invalid(msg)))?;
        Ok(Self {
            report,
            digest: blake3::hash(bytes).to_hex().to_string(),
        })
    }

    pub fn report(&self) -> &QualityReport {
        &self.report
    }

    /// BLAKE3 hex digest of the file contents.
    pub fn digest(&self) -> &str {
        &self.digest
    }
}

/// Owns the on-disk baseline file.
#[derive(Debug, Clone)]
pub struct BaselineStore {
    path: PathBuf,
}

impl BaselineStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the current baseline.
    pub fn load(&self) -> Result<Baseline> {
        let bytes = fs::read(&self.path).map_err(|e| CribaError::input(&self.path, e))?;
        Baseline::from_bytes(&self.path, &bytes)
    }

    /// Load the baseline, or `None` if no file exists yet.
    pub fn load_optional(&self) -> Result<Option<Baseline>> {
        if self.path.exists() {
            self.load().map(Some)
        } else {
            Ok(None)
        }
    }

    /// Replace the baseline with `report`.
    ///
    /// The report is validated and serialized before anything touches the
    /// disk; the new file is fsynced under a temp name and renamed into place.
    pub fn promote(&self, report: &QualityReport) -> Result<Baseline> {
        report.check_invariants().map_err(|msg| {
            CribaError::computation(format!("refusing to promote report: {}", msg))
        })?;
        let mut bytes =
            serde_json::to_vec_pretty(report).map_err(|e| CribaError::input(&self.path, e))?;
        bytes.push(b'\n');

        let previous = self.load_optional().ok().flatten().map(|b| b.digest);
        persist::write_atomic(&self.path, |w| w.write_all(&bytes))?;

        let baseline = Baseline::from_bytes(&self.path, &bytes)?;
        info!(
            path = %self.path.display(),
            digest = %baseline.digest,
            previous = previous.as_deref().unwrap_or("none"),
            "promoted baseline"
        );
        Ok(baseline)
    }
}
