//! Labeling statistics

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::rules::{RiskTier, RuleSet};
use crate::corpus::CorpusRecord;

/// Per-tier transpilation success.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TierSuccess {
    pub count: usize,
    pub transpiled: usize,
    pub success_rate: f64,
}

/// Aggregate view of a labeling run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelingStats {
    pub total: usize,
    pub distribution: BTreeMap<RiskTier, usize>,
    /// Fraction of records matched by a rule other than the catch-all
    pub coverage: f64,
    /// Records matched by rules of more than one tier
    pub conflicts: usize,
    pub risk_vs_success: BTreeMap<RiskTier, TierSuccess>,
}

#[derive(Default)]
struct Counts {
    total: usize,
    covered: usize,
    conflicts: usize,
    // [count, transpiled] per tier, indexed by RiskTier::ALL order
    tiers: [[usize; 2]; 3],
}

impl Counts {
    fn merge(mut self, other: Counts) -> Counts {
        self.total += other.total;
        self.covered += other.covered;
        self.conflicts += other.conflicts;
        for (mine, theirs) in self.tiers.iter_mut().zip(other.tiers) {
            mine[0] += theirs[0];
            mine[1] += theirs[1];
        }
        self
    }
}

fn tier_index(tier: RiskTier) -> usize {
    match tier {
        RiskTier::High => 0,
        RiskTier::Medium => 1,
        RiskTier::Low => 2,
    }
}

impl LabelingStats {
    /// Evaluate `rules` over `records` and summarize.
    pub fn collect(rules: &RuleSet, records: &[CorpusRecord]) -> Self {
        let counts = records
            .par_iter()
            .fold(Counts::default, |mut acc, record| {
                let first = rules.first_match(&record.features);
                let slot = &mut acc.tiers[tier_index(first.tier)];
                slot[0] += 1;
                if record.has_rust {
                    slot[1] += 1;
                }
                acc.total += 1;
                if !first.when.is_catch_all() {
                    acc.covered += 1;
                }
                let mut tiers = rules
                    .matching(&record.features)
                    .filter(|r| !r.when.is_catch_all())
                    .map(|r| r.tier);
                if let Some(t) = tiers.next() {
                    if tiers.any(|other| other != t) {
                        acc.conflicts += 1;
                    }
                }
                acc
            })
            .reduce(Counts::default, Counts::merge);

        let mut distribution = BTreeMap::new();
        let mut risk_vs_success = BTreeMap::new();
        for tier in RiskTier::ALL {
            let [count, transpiled] = counts.tiers[tier_index(tier)];
            distribution.insert(tier, count);
            let success_rate = if count == 0 {
                0.0
            } else {
                transpiled as f64 / count as f64
            };
            risk_vs_success.insert(
                tier,
                TierSuccess {
                    count,
                    transpiled,
                    success_rate,
                },
            );
        }

        let coverage = if counts.total == 0 {
            0.0
        } else {
            counts.covered as f64 / counts.total as f64
        };

        Self {
            total: counts.total,
            distribution,
            coverage,
            conflicts: counts.conflicts,
            risk_vs_success,
        }
    }

    pub fn count(&self, tier: RiskTier) -> usize {
        self.distribution.get(&tier).copied().unwrap_or(0)
    }
}
