//! Weak-supervision risk labeling
//!
//! Assigns every record exactly one [`RiskTier`] by evaluating an ordered
//! [`RuleSet`] against its feature vector. First match wins; the trailing
//! catch-all makes the function total.

mod rules;
mod stats;

pub use rules::{LabelingRule, RiskTier, RulePredicate, RuleSet};
pub use stats::{LabelingStats, TierSuccess};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::corpus::CorpusRecord;
use crate::features::FeatureVector;

/// Risk label for one record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelAssignment {
    pub record_id: String,
    pub risk_tier: RiskTier,
    pub matched_rule: String,
}

/// Applies a validated rule set to records.
#[derive(Debug, Clone, Default)]
pub struct WeakSupervisionLabeler {
    rules: RuleSet,
}

impl WeakSupervisionLabeler {
    pub fn new(rules: RuleSet) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Label a single feature vector.
    pub fn label_features(&self, record_id: &str, features: &FeatureVector) -> LabelAssignment {
        let rule = self.rules.first_match(features);
        LabelAssignment {
            record_id: record_id.to_string(),
            risk_tier: rule.tier,
            matched_rule: rule.name.clone(),
        }
    }

    pub fn label(&self, record: &CorpusRecord) -> LabelAssignment {
        self.label_features(&record.id, &record.features)
    }

    /// Label every record, preserving input order.
    pub fn label_all(&self, records: &[CorpusRecord]) -> Vec<LabelAssignment> {
        let labels: Vec<_> = records.par_iter().map(|r| self.label(r)).collect();
        debug!(records = labels.len(), "labeled corpus");
        labels
    }

    /// Label every record and compute aggregate statistics.
    pub fn label_corpus(&self, records: &[CorpusRecord]) -> (Vec<LabelAssignment>, LabelingStats) {
        let labels = self.label_all(records);
        let stats = LabelingStats::collect(&self.rules, records);
        (labels, stats)
    }
}
