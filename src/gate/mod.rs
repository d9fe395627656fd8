//! CI Regression Gate
//!
//! Compares two pass-snapshots (baseline vs current) and decides whether the
//! current corpus regressed. Snapshots are built either per category from
//! quality reports, or per record from corpora.
//!
//! The gate is a pure function: `gate(X, X)` never reports a change, and keys
//! present in only one snapshot are reported as `no_prior_data`, never as
//! regressions.

mod baseline;

pub use baseline::{load_report, Baseline, BaselineStore};

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use tracing::debug;

use crate::corpus::CorpusRecord;
use crate::error::{CribaError, Result};
use crate::quality::{pass_rate, QualityReport};

/// When a category counts as passing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum CategoryPassPolicy {
    /// At least one record passes
    #[default]
    Any,
    /// Every record passes
    All,
}

impl CategoryPassPolicy {
    /// Passing status for `passed` of `total`; `None` when there is no data.
    pub fn status(&self, passed: usize, total: usize) -> Option<bool> {
        if total == 0 {
            return None;
        }
        Some(match self {
            Self::Any => passed > 0,
            Self::All => passed == total,
        })
    }
}

impl fmt::Display for CategoryPassPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => write!(f, "any"),
            Self::All => write!(f, "all"),
        }
    }
}

/// Granularity of a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotLevel {
    Category,
    Record,
}

impl fmt::Display for SnapshotLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Category => write!(f, "category"),
            Self::Record => write!(f, "record"),
        }
    }
}

/// Passing status per key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassSnapshot {
    pub level: SnapshotLevel,
    pub entries: BTreeMap<String, bool>,
}

impl PassSnapshot {
    pub fn new(level: SnapshotLevel, entries: BTreeMap<String, bool>) -> Self {
        Self { level, entries }
    }

    /// Category-level snapshot of a report. Empty categories are left out.
    pub fn from_report(report: &QualityReport, policy: CategoryPassPolicy) -> Self {
        let entries = report
            .by_category
            .iter()
            .filter_map(|(category, stats)| {
                policy
                    .status(stats.passed, stats.total())
                    .map(|passing| (category.clone(), passing))
            })
            .collect();
        Self::new(SnapshotLevel::Category, entries)
    }

    /// Record-level snapshot keyed by record id.
    pub fn from_records(records: &[CorpusRecord]) -> Self {
        let entries = records
            .iter()
            .map(|r| (r.id.clone(), r.is_passing()))
            .collect();
        Self::new(SnapshotLevel::Record, entries)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// CI decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateDecision {
    Pass,
    RegressionDetected,
}

impl GateDecision {
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Pass => 0,
            Self::RegressionDetected => 1,
        }
    }
}

/// Differences between two snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegressionResult {
    pub level: SnapshotLevel,
    pub now_passing: BTreeSet<String>,
    pub regressed: BTreeSet<String>,
    pub unchanged: BTreeSet<String>,
    /// Keys present in only one of the two snapshots
    pub no_prior_data: BTreeSet<String>,
    pub net_change: i64,
}

impl RegressionResult {
    pub fn decision(&self) -> GateDecision {
        if self.regressed.is_empty() {
            GateDecision::Pass
        } else {
            GateDecision::RegressionDetected
        }
    }

    /// Human-readable diff, one key per line.
    pub fn format_text(&self) -> String {
        let mut output = format!("{} diff\n", self.level);
        output.push_str(&"─".repeat(40));
        output.push('\n');
        for key in &self.now_passing {
            output.push_str(&format!("  + {} (now passing)\n", key));
        }
        for key in &self.regressed {
            output.push_str(&format!("  - {} (regressed)\n", key));
        }
        for key in &self.no_prior_data {
            output.push_str(&format!("  ? {} (no prior data)\n", key));
        }
        output.push_str(&format!(
            "\nNow passing: {}  Regressed: {}  Unchanged: {}  Net change: {:+}\n",
            self.now_passing.len(),
            self.regressed.len(),
            self.unchanged.len(),
            self.net_change
        ));
        output
    }
}

/// Global metric movement between two reports.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReportDelta {
    /// Pass-rate change in percentage points
    pub pass_rate_delta: f64,
    pub total_delta: i64,
    pub improved: bool,
}

impl ReportDelta {
    pub fn between(baseline: &QualityReport, current: &QualityReport) -> Self {
        let rate = |r: &QualityReport| pass_rate(r.passed, r.total).unwrap_or(0.0) * 100.0;
        let pass_rate_delta = rate(current) - rate(baseline);
        Self {
            pass_rate_delta,
            total_delta: current.total as i64 - baseline.total as i64,
            improved: pass_rate_delta > 0.0,
        }
    }
}

/// Compares pass-snapshots.
#[derive(Debug, Clone, Copy, Default)]
pub struct RegressionGate;

impl RegressionGate {
    /// Diff `current` against `baseline`. Both must be at the same level.
    pub fn gate(&self, baseline: &PassSnapshot, current: &PassSnapshot) -> Result<RegressionResult> {
        if baseline.level != current.level {
            return Err(CribaError::config(format!(
                "cannot compare a {}-level baseline with a {}-level snapshot",
                baseline.level, current.level
            )));
        }

        let mut result = RegressionResult {
            level: current.level,
            now_passing: BTreeSet::new(),
            regressed: BTreeSet::new(),
            unchanged: BTreeSet::new(),
            no_prior_data: BTreeSet::new(),
            net_change: 0,
        };

        for (key, was_passing) in &baseline.entries {
            match current.entries.get(key) {
                Some(is_passing) if !was_passing && *is_passing => {
                    result.now_passing.insert(key.clone());
                }
                Some(is_passing) if *was_passing && !is_passing => {
                    result.regressed.insert(key.clone());
                }
                Some(_) => {
                    result.unchanged.insert(key.clone());
                }
                None => {
                    result.no_prior_data.insert(key.clone());
                }
            }
        }
        result.no_prior_data.extend(
            current
                .entries
                .keys()
                .filter(|k| !baseline.entries.contains_key(*k))
                .cloned(),
        );
        result.net_change = result.now_passing.len() as i64 - result.regressed.len() as i64;

        debug!(
            level = %result.level,
            now_passing = result.now_passing.len(),
            regressed = result.regressed.len(),
            no_prior_data = result.no_prior_data.len(),
            "gate evaluated"
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn snapshot(level: SnapshotLevel, pairs: &[(&str, bool)]) -> PassSnapshot {
        PassSnapshot::new(
            level,
            pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
        )
    }

    fn set(keys: &[&str]) -> BTreeSet<String> {
        keys.iter().map(|k| k.to_string()).collect()
    }

    #[test]
    fn test_gate_swap_scenario() {
        let baseline = snapshot(SnapshotLevel::Category, &[("A", false), ("B", true)]);
        let current = snapshot(SnapshotLevel::Category, &[("A", true), ("B", false)]);
        let result = RegressionGate.gate(&baseline, &current).unwrap();

        assert_eq!(result.now_passing, set(&["A"]));
        assert_eq!(result.regressed, set(&["B"]));
        assert_eq!(result.net_change, 0);
        assert_eq!(result.decision(), GateDecision::RegressionDetected);
        assert_eq!(result.decision().exit_code(), 1);
    }

    #[test]
    fn test_gate_new_and_removed_keys_are_no_prior_data() {
        let baseline = snapshot(SnapshotLevel::Record, &[("gone", true), ("kept", true)]);
        let current = snapshot(SnapshotLevel::Record, &[("kept", true), ("new", false)]);
        let result = RegressionGate.gate(&baseline, &current).unwrap();

        assert!(result.regressed.is_empty());
        assert_eq!(result.no_prior_data, set(&["gone", "new"]));
        assert_eq!(result.unchanged, set(&["kept"]));
        assert_eq!(result.decision(), GateDecision::Pass);
    }

    #[test]
    fn test_gate_level_mismatch_rejected() {
        let a = snapshot(SnapshotLevel::Category, &[]);
        let b = snapshot(SnapshotLevel::Record, &[]);
        assert!(matches!(RegressionGate.gate(&a, &b), Err(CribaError::Config(_))));
    }

    #[test]
    fn test_policy_status() {
        assert_eq!(CategoryPassPolicy::Any.status(1, 10), Some(true));
        assert_eq!(CategoryPassPolicy::All.status(9, 10), Some(false));
        assert_eq!(CategoryPassPolicy::All.status(10, 10), Some(true));
        assert_eq!(CategoryPassPolicy::Any.status(0, 0), None);
    }

    #[test]
    fn test_snapshot_from_records() {
        let records = vec![
            CorpusRecord::new("a", "x").passing(),
            CorpusRecord::new("b", "x").failing(),
            CorpusRecord::new("c", "y"),
        ];
        let snap = PassSnapshot::from_records(&records);
        assert_eq!(snap.level, SnapshotLevel::Record);
        assert_eq!(snap.entries["a"], true);
        assert_eq!(snap.entries["b"], false);
        assert_eq!(snap.entries["c"], false);
    }

    #[test]
    fn test_format_text_lists_changes() {
        let baseline = snapshot(SnapshotLevel::Category, &[("A", false), ("B", true)]);
        let current = snapshot(SnapshotLevel::Category, &[("A", true), ("B", false)]);
        let text = RegressionGate.gate(&baseline, &current).unwrap().format_text();
        assert!(text.contains("+ A (now passing)"));
        assert!(text.contains("- B (regressed)"));
        assert!(text.contains("Net change: +0"));
    }

    fn arb_snapshot() -> impl Strategy<Value = PassSnapshot> {
        proptest::collection::btree_map("[a-e]{1,2}", any::<bool>(), 0..20)
            .prop_map(|entries| PassSnapshot::new(SnapshotLevel::Category, entries))
    }

    proptest! {
        /// PROPERTY: a snapshot never regresses against itself
        #[test]
        fn prop_gate_idempotent(snap in arb_snapshot()) {
            let result = RegressionGate.gate(&snap, &snap).unwrap();
            prop_assert!(result.now_passing.is_empty());
            prop_assert!(result.regressed.is_empty());
            prop_assert!(result.no_prior_data.is_empty());
            prop_assert_eq!(result.unchanged.len(), snap.len());
        }

        /// PROPERTY: every key lands in exactly one bucket
        #[test]
        fn prop_gate_partitions_keys(a in arb_snapshot(), b in arb_snapshot()) {
            let r = RegressionGate.gate(&a, &b).unwrap();
            prop_assert!(r.now_passing.is_disjoint(&r.regressed));
            let all: BTreeSet<_> = a.entries.keys().chain(b.entries.keys()).cloned().collect();
            let bucketed = r.now_passing.len() + r.regressed.len() + r.unchanged.len() + r.no_prior_data.len();
            prop_assert_eq!(bucketed, all.len());
        }
    }
}
