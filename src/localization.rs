//! Spectrum-based fault localization over feature flags
//!
//! Treats each Python feature as a "program element" and each corpus record
//! as a test: features that show up disproportionately in failing records
//! are suspicious. Scores are a pure function of four integer counts, so a
//! re-run over the same corpus is bit-identical.
//!
//! References:
//! - Jones & Harrold (2005) "Empirical Evaluation of the Tarantula Automatic
//!   Fault-Localization Technique" - ASE
//! - Abreu et al. (2007) "On the Accuracy of Spectrum-based Fault Localization"

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use crate::corpus::{CorpusRecord, Outcome};
use crate::error::{CribaError, Result};
use crate::features::Feature;

/// SBFL formula.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum SbflFormula {
    /// Tarantula formula (classic)
    #[default]
    Tarantula,
    /// Ochiai formula (cosine similarity)
    Ochiai,
}

impl fmt::Display for SbflFormula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tarantula => write!(f, "Tarantula"),
            Self::Ochiai => write!(f, "Ochiai"),
        }
    }
}

/// Pass/fail counts for one feature.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeatureSpectrum {
    pub failed_with: usize,
    pub passed_with: usize,
    pub total_failed: usize,
    pub total_passed: usize,
}

impl FeatureSpectrum {
    /// Score in [0, 1]. Zero denominators contribute 0.
    pub fn compute_score(&self, formula: SbflFormula) -> f64 {
        let ef = self.failed_with as f64;
        let ep = self.passed_with as f64;

        match formula {
            SbflFormula::Tarantula => {
                let fail_ratio = if self.total_failed > 0 {
                    ef / self.total_failed as f64
                } else {
                    0.0
                };
                let pass_ratio = if self.total_passed > 0 {
                    ep / self.total_passed as f64
                } else {
                    0.0
                };
                if fail_ratio + pass_ratio > 0.0 {
                    fail_ratio / (fail_ratio + pass_ratio)
                } else {
                    0.0
                }
            }
            SbflFormula::Ochiai => {
                let denom = (self.total_failed as f64 * (ef + ep)).sqrt();
                if denom > 0.0 {
                    ef / denom
                } else {
                    0.0
                }
            }
        }
    }
}

/// Suspiciousness of one feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuspiciousnessScore {
    #[serde(rename = "feature_name")]
    pub feature: Feature,
    pub score: f64,
    pub failed_with: usize,
    pub passed_with: usize,
    pub total_failed: usize,
    pub total_passed: usize,
}

/// Per-feature integer counts gathered in one pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Spectrum {
    pub total_failed: usize,
    pub total_passed: usize,
    failed_with: [usize; Feature::COUNT],
    passed_with: [usize; Feature::COUNT],
}

impl Spectrum {
    /// Count outcomes over `records`. Undetermined records are skipped.
    pub fn collect(records: &[CorpusRecord]) -> Self {
        records
            .par_iter()
            .fold(Spectrum::default, |mut acc, record| {
                acc.observe(record);
                acc
            })
            .reduce(Spectrum::default, Spectrum::merge)
    }

    fn observe(&mut self, record: &CorpusRecord) {
        let (total, per_feature) = match record.outcome() {
            Some(Outcome::Fail) => (&mut self.total_failed, &mut self.failed_with),
            Some(Outcome::Pass) => (&mut self.total_passed, &mut self.passed_with),
            None => return,
        };
        *total += 1;
        for (slot, feature) in per_feature.iter_mut().zip(Feature::ALL) {
            if record.features.has(feature) {
                *slot += 1;
            }
        }
    }

    fn merge(mut self, other: Spectrum) -> Spectrum {
        self.total_failed += other.total_failed;
        self.total_passed += other.total_passed;
        for (a, b) in self.failed_with.iter_mut().zip(other.failed_with) {
            *a += b;
        }
        for (a, b) in self.passed_with.iter_mut().zip(other.passed_with) {
            *a += b;
        }
        self
    }

    pub fn outcomes(&self) -> usize {
        self.total_failed + self.total_passed
    }

    pub fn feature(&self, feature: Feature) -> FeatureSpectrum {
        let idx = feature.index();
        FeatureSpectrum {
            failed_with: self.failed_with[idx],
            passed_with: self.passed_with[idx],
            total_failed: self.total_failed,
            total_passed: self.total_passed,
        }
    }
}

/// Ranks features by suspiciousness.
#[derive(Debug, Clone, Copy, Default)]
pub struct TarantulaEngine {
    formula: SbflFormula,
}

impl TarantulaEngine {
    pub fn new(formula: SbflFormula) -> Self {
        Self { formula }
    }

    pub fn formula(&self) -> SbflFormula {
        self.formula
    }

    /// One score per schema feature, highest first (ties by feature name).
    ///
    /// Fails when no record has a determinable outcome.
    pub fn scores(&self, records: &[CorpusRecord]) -> Result<Vec<SuspiciousnessScore>> {
        let spectrum = Spectrum::collect(records);
        if spectrum.outcomes() == 0 {
            return Err(CribaError::computation(format!(
                "no determinable outcomes among {} records",
                records.len()
            )));
        }
        debug!(
            failed = spectrum.total_failed,
            passed = spectrum.total_passed,
            formula = %self.formula,
            "computing suspiciousness"
        );
        Ok(self.rank(&spectrum))
    }

    /// Score an already collected spectrum.
    pub fn rank(&self, spectrum: &Spectrum) -> Vec<SuspiciousnessScore> {
        let mut scores: Vec<_> = Feature::ALL
            .into_iter()
            .map(|feature| {
                let counts = spectrum.feature(feature);
                SuspiciousnessScore {
                    feature,
                    score: counts.compute_score(self.formula),
                    failed_with: counts.failed_with,
                    passed_with: counts.passed_with,
                    total_failed: counts.total_failed,
                    total_passed: counts.total_passed,
                }
            })
            .collect();
        scores.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.feature.name().cmp(b.feature.name()))
        });
        scores
    }
}
