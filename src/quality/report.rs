//! Corpus quality report
//!
//! Contains `QualityReport` and the aggregator that builds it from a labeled
//! corpus.

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

use super::types::{pass_rate, CategoryStats, Grade, Priority, Recommendation};
use crate::corpus::CorpusRecord;
use crate::error::Result;
use crate::labeling::RiskTier;
use crate::localization::{SbflFormula, SuspiciousnessScore, TarantulaEngine};
use crate::pipeline::LabeledCorpus;

/// Report format version written into every artifact
pub const SCHEMA_VERSION: u32 = 1;

/// Transpile success rate below which improving it is recommended (percent)
const SUCCESS_RATE_TARGET: f64 = 80.0;

/// HIGH-risk share below which more HIGH-risk examples are recommended (percent)
const HIGH_RISK_TARGET: f64 = 20.0;

// ============================================================================
// Quality Report
// ============================================================================

/// Aggregate quality of one corpus snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    pub schema_version: u32,
    pub generated_at: DateTime<Utc>,
    pub total: usize,
    pub passed: usize,
    /// Every record that did not pass, including undetermined ones
    pub failed: usize,
    /// Records without a compile result (already counted in `failed`)
    pub undetermined: usize,
    /// Records for which the transpiler produced Rust
    #[serde(default)]
    pub transpiled: usize,
    pub pass_rate: Option<f64>,
    pub grade: Grade,
    pub by_category: BTreeMap<String, CategoryStats>,
    #[serde(default)]
    pub risk_distribution: BTreeMap<RiskTier, usize>,
    #[serde(default)]
    pub top_suspicious: Vec<SuspiciousnessScore>,
    #[serde(default)]
    pub recommendations: Vec<Recommendation>,
}

impl QualityReport {
    /// Check the count invariants of a (possibly deserialized) report.
    pub fn check_invariants(&self) -> std::result::Result<(), String> {
        if self.schema_version > SCHEMA_VERSION {
            return Err(format!(
                "schema version {} is newer than supported version {}",
                self.schema_version, SCHEMA_VERSION
            ));
        }
        if self.passed + self.failed != self.total {
            return Err(format!(
                "passed ({}) + failed ({}) != total ({})",
                self.passed, self.failed, self.total
            ));
        }
        let category_total: usize = self.by_category.values().map(CategoryStats::total).sum();
        if category_total != self.total {
            return Err(format!(
                "category counts sum to {} but total is {}",
                category_total, self.total
            ));
        }
        Ok(())
    }

    /// Whether the global grade is at least `min`.
    pub fn meets(&self, min: Grade) -> bool {
        self.grade.meets(min)
    }

    /// Transpile success rate in percent.
    pub fn success_rate(&self) -> f64 {
        pass_rate(self.transpiled, self.total).unwrap_or(0.0) * 100.0
    }

    pub fn tier_count(&self, tier: RiskTier) -> usize {
        self.risk_distribution.get(&tier).copied().unwrap_or(0)
    }
}

// ============================================================================
// Aggregation
// ============================================================================

#[derive(Default)]
struct Tally<'a> {
    passed: usize,
    failed: usize,
    undetermined: usize,
    transpiled: usize,
    by_category: BTreeMap<&'a str, (usize, usize)>,
}

impl<'a> Tally<'a> {
    fn observe(mut self, record: &'a CorpusRecord) -> Self {
        let slot = self.by_category.entry(record.category.as_str()).or_default();
        if record.is_passing() {
            self.passed += 1;
            slot.0 += 1;
        } else {
            self.failed += 1;
            slot.1 += 1;
        }
        if record.outcome().is_none() {
            self.undetermined += 1;
        }
        if record.has_rust {
            self.transpiled += 1;
        }
        self
    }

    fn merge(mut self, other: Tally<'a>) -> Self {
        self.passed += other.passed;
        self.failed += other.failed;
        self.undetermined += other.undetermined;
        self.transpiled += other.transpiled;
        for (category, (p, f)) in other.by_category {
            let slot = self.by_category.entry(category).or_default();
            slot.0 += p;
            slot.1 += f;
        }
        self
    }
}

/// Builds [`QualityReport`]s
#[derive(Debug, Clone, Copy)]
pub struct QualityReportAggregator {
    /// Number of suspicious features kept in the report
    pub top_n: usize,
    pub formula: SbflFormula,
}

impl Default for QualityReportAggregator {
    fn default() -> Self {
        Self {
            top_n: 5,
            formula: SbflFormula::Tarantula,
        }
    }
}

impl QualityReportAggregator {
    /// Aggregate a labeled corpus. An empty corpus yields an N/A report with
    /// no categories.
    pub fn aggregate(&self, corpus: &LabeledCorpus) -> Result<QualityReport> {
        let tally = corpus
            .records()
            .par_iter()
            .fold(Tally::default, Tally::observe)
            .reduce(Tally::default, Tally::merge);

        let total = tally.passed + tally.failed;
        let by_category: BTreeMap<String, CategoryStats> = tally
            .by_category
            .into_iter()
            .map(|(category, (p, f))| (category.to_string(), CategoryStats::new(p, f)))
            .collect();

        let top_suspicious = match TarantulaEngine::new(self.formula).scores(corpus.records()) {
            Ok(mut scores) => {
                scores.truncate(self.top_n);
                scores
            }
            Err(e) => {
                warn!("no suspiciousness ranking: {}", e);
                Vec::new()
            }
        };

        let mut report = QualityReport {
            schema_version: SCHEMA_VERSION,
            generated_at: Utc::now(),
            total,
            passed: tally.passed,
            failed: tally.failed,
            undetermined: tally.undetermined,
            transpiled: tally.transpiled,
            pass_rate: pass_rate(tally.passed, total),
            grade: Grade::from_counts(tally.passed, total),
            by_category,
            risk_distribution: corpus.stats.distribution.clone(),
            top_suspicious,
            recommendations: Vec::new(),
        };
        if report.total > 0 {
            report.recommendations = generate_recommendations(&report);
        }

        debug!(
            total = report.total,
            passed = report.passed,
            grade = %report.grade,
            categories = report.by_category.len(),
            "aggregated quality report"
        );
        Ok(report)
    }
}

/// Generate recommendations based on analysis
fn generate_recommendations(report: &QualityReport) -> Vec<Recommendation> {
    let mut recs = Vec::new();

    let success_rate = report.success_rate();
    if success_rate < SUCCESS_RATE_TARGET {
        recs.push(Recommendation {
            priority: Priority::High,
            action: format!(
                "Improve success rate from {:.1}% to {:.0}%+",
                success_rate, SUCCESS_RATE_TARGET
            ),
            impact: "Major corpus quality improvement".to_string(),
        });
    }

    let high_share = pass_rate(report.tier_count(RiskTier::High), report.total).unwrap_or(0.0) * 100.0;
    if high_share < HIGH_RISK_TARGET {
        recs.push(Recommendation {
            priority: Priority::Medium,
            action: format!(
                "Increase HIGH-risk examples from {:.1}% to {:.0}%+",
                high_share, HIGH_RISK_TARGET
            ),
            impact: "Better training data balance".to_string(),
        });
    }

    for score in report.top_suspicious.iter().filter(|s| s.score > 0.0).take(3) {
        recs.push(Recommendation {
            priority: if score.score > 0.8 {
                Priority::High
            } else {
                Priority::Medium
            },
            action: format!(
                "Add transpiler support for '{}' (suspiciousness: {:.3})",
                score.feature, score.score
            ),
            impact: format!("Reduces failure correlation by {:.0}%", score.score * 100.0),
        });
    }

    recs
}
