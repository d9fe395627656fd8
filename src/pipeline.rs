//! Labeled corpus
//!
//! The hand-off point between loading and every downstream stage: records in
//! input order, each paired with its risk label.

use serde::Serialize;
use std::io::Write;
use std::path::Path;
use tracing::info;

use crate::corpus::{load_corpus, Corpus, CorpusRecord, LoadOptions, LoadStats};
use crate::error::{CribaError, Result};
use crate::labeling::{LabelAssignment, LabelingStats, WeakSupervisionLabeler};
use crate::persist;

/// Records with one label each, index-aligned.
#[derive(Debug, Clone)]
pub struct LabeledCorpus {
    records: Vec<CorpusRecord>,
    labels: Vec<LabelAssignment>,
    pub stats: LabelingStats,
    pub load_stats: LoadStats,
}

/// One output row of `label`: the record plus its label.
#[derive(Serialize)]
struct LabeledRow<'a> {
    #[serde(flatten)]
    record: &'a CorpusRecord,
    risk_tier: crate::labeling::RiskTier,
    matched_rule: &'a str,
}

impl LabeledCorpus {
    pub fn new(corpus: Corpus, labeler: &WeakSupervisionLabeler) -> Self {
        let (labels, stats) = labeler.label_corpus(&corpus.records);
        Self {
            records: corpus.records,
            labels,
            stats,
            load_stats: corpus.stats,
        }
    }

    /// Load and label in one step.
    pub fn load(
        path: &Path,
        options: LoadOptions,
        labeler: &WeakSupervisionLabeler,
    ) -> Result<Self> {
        let corpus = load_corpus(path, options)?;
        let labeled = Self::new(corpus, labeler);
        info!(
            records = labeled.len(),
            coverage = labeled.stats.coverage,
            conflicts = labeled.stats.conflicts,
            "labeled corpus"
        );
        Ok(labeled)
    }

    pub fn records(&self) -> &[CorpusRecord] {
        &self.records
    }

    pub fn labels(&self) -> &[LabelAssignment] {
        &self.labels
    }

    pub fn iter(&self) -> impl Iterator<Item = (&CorpusRecord, &LabelAssignment)> {
        self.records.iter().zip(&self.labels)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Write the labeled corpus as JSON Lines.
    pub fn write_jsonl(&self, path: &Path) -> Result<()> {
        let mut rows = Vec::with_capacity(self.len());
        for (record, label) in self.iter() {
            let row = LabeledRow {
                record,
                risk_tier: label.risk_tier,
                matched_rule: &label.matched_rule,
            };
            rows.push(serde_json::to_string(&row).map_err(|e| CribaError::input(path, e))?);
        }
        persist::write_atomic(path, |w| {
            for row in &rows {
                writeln!(w, "{}", row)?;
            }
            Ok(())
        })
    }
}
