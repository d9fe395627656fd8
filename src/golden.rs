//! Golden trace curation
//!
//! Picks exemplar failing records per target compiler error code, for use as
//! reviewed "golden" fix examples. Records with a single, isolated error are
//! preferred, and a record is never selected twice across codes.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;
use tracing::debug;

use crate::corpus::CorpusRecord;
use crate::error::{CribaError, Result};

/// Error codes curated when no targets are given, in priority order.
pub const DEFAULT_ERROR_CODES: [&str; 5] = ["E0308", "E0433", "E0599", "E0425", "E0277"];

/// Default quota per error code
pub const DEFAULT_QUOTA: usize = 10;

const ERROR_DESCRIPTIONS: [(&str, &str); 10] = [
    ("E0308", "Type mismatch"),
    ("E0433", "Failed to resolve (unresolved import)"),
    ("E0599", "Method not found"),
    ("E0425", "Cannot find value"),
    ("E0277", "Trait bound not satisfied"),
    ("E0412", "Cannot find type"),
    ("E0382", "Use of moved value"),
    ("E0507", "Cannot move out of borrowed content"),
    ("E0432", "Unresolved import"),
    ("E0015", "Calls in constants are limited"),
];

/// Human description of a rustc error code.
pub fn describe_error_code(code: &str) -> &'static str {
    ERROR_DESCRIPTIONS
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, d)| *d)
        .unwrap_or("Unknown error")
}

/// One error code to curate, with its quota.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoldenTarget {
    pub code: String,
    pub quota: usize,
}

impl GoldenTarget {
    pub fn new(code: impl Into<String>, quota: usize) -> Self {
        Self {
            code: code.into(),
            quota,
        }
    }

    /// The default target list.
    pub fn defaults(quota: usize) -> Vec<Self> {
        DEFAULT_ERROR_CODES
            .iter()
            .map(|code| Self::new(*code, quota))
            .collect()
    }

    /// Parse `E0308=10,E0433,E0599=3`; codes without `=n` get `default_quota`.
    pub fn parse_list(spec: &str, default_quota: usize) -> Result<Vec<Self>> {
        let mut targets = Vec::new();
        for part in spec.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (code, quota) = match part.split_once('=') {
                Some((code, quota)) => {
                    let quota = quota.trim().parse::<usize>().map_err(|_| {
                        CribaError::config(format!("invalid quota in '{}'", part))
                    })?;
                    (code.trim(), quota)
                }
                None => (part, default_quota),
            };
            if !is_error_code(code) {
                return Err(CribaError::config(format!(
                    "'{}' is not a compiler error code (expected e.g. E0308)",
                    code
                )));
            }
            targets.push(Self::new(code, quota));
        }
        validate_targets(&targets)?;
        Ok(targets)
    }
}

/// A target list must be non-empty and name each code once, so a code's
/// quota is its only cap.
pub fn validate_targets(targets: &[GoldenTarget]) -> Result<()> {
    if targets.is_empty() {
        return Err(CribaError::config("no error codes given"));
    }
    let mut seen = HashSet::new();
    for target in targets {
        if !seen.insert(target.code.as_str()) {
            return Err(CribaError::config(format!(
                "error code {} listed twice",
                target.code
            )));
        }
    }
    Ok(())
}

fn is_error_code(code: &str) -> bool {
    code.len() == 5 && code.starts_with('E') && code[1..].chars().all(|c| c.is_ascii_digit())
}

/// Candidate ordering within one error code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum GoldenRanking {
    /// Fewer error codes first, then id ascending
    #[default]
    #[value(name = "isolated_first")]
    IsolatedFirst,
    /// Id ascending
    #[value(name = "id_order")]
    IdOrder,
}

/// Review state of a golden trace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GoldenStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl fmt::Display for GoldenStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "PENDING"),
            Self::Approved => write!(f, "APPROVED"),
            Self::Rejected => write!(f, "REJECTED"),
        }
    }
}

/// A curated exemplar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoldenTrace {
    pub error_code: String,
    pub record_id: String,
    /// 1-based rank within `error_code`
    pub rank: usize,
    pub review_status: GoldenStatus,
    pub description: String,
    pub category: String,
    /// Other distinct error codes on the same record
    pub co_occurring_codes: usize,
}

/// Selects golden traces.
#[derive(Debug, Clone)]
pub struct GoldenTraceCurator {
    targets: Vec<GoldenTarget>,
    ranking: GoldenRanking,
}

impl Default for GoldenTraceCurator {
    fn default() -> Self {
        Self {
            targets: GoldenTarget::defaults(DEFAULT_QUOTA),
            ranking: GoldenRanking::default(),
        }
    }
}

impl GoldenTraceCurator {
    /// Fails on an empty target list or a code listed twice.
    pub fn new(targets: Vec<GoldenTarget>, ranking: GoldenRanking) -> Result<Self> {
        validate_targets(&targets)?;
        Ok(Self { targets, ranking })
    }

    pub fn targets(&self) -> &[GoldenTarget] {
        &self.targets
    }

    /// Curate traces, target by target in order.
    pub fn curate(&self, records: &[CorpusRecord]) -> Vec<GoldenTrace> {
        let mut selected: HashSet<&str> = HashSet::new();
        let mut traces = Vec::new();

        for target in &self.targets {
            let mut candidates: Vec<&CorpusRecord> = records
                .iter()
                .filter(|r| r.error_codes.iter().any(|c| *c == target.code))
                .collect();
            self.rank(&mut candidates);

            let picked: Vec<_> = candidates
                .into_iter()
                .filter(|r| !selected.contains(r.id.as_str()))
                .take(target.quota)
                .collect();
            debug!(code = %target.code, picked = picked.len(), quota = target.quota, "curated");

            for (i, record) in picked.into_iter().enumerate() {
                selected.insert(record.id.as_str());
                traces.push(GoldenTrace {
                    error_code: target.code.clone(),
                    record_id: record.id.clone(),
                    rank: i + 1,
                    review_status: GoldenStatus::Pending,
                    description: describe_error_code(&target.code).to_string(),
                    category: record.category.clone(),
                    co_occurring_codes: distinct_codes(record).len().saturating_sub(1),
                });
            }
        }

        traces
    }

    fn rank(&self, candidates: &mut [&CorpusRecord]) {
        match self.ranking {
            GoldenRanking::IsolatedFirst => candidates.sort_by(|a, b| {
                a.error_codes
                    .len()
                    .cmp(&b.error_codes.len())
                    .then_with(|| a.id.cmp(&b.id))
            }),
            GoldenRanking::IdOrder => candidates.sort_by(|a, b| a.id.cmp(&b.id)),
        }
    }
}

fn distinct_codes(record: &CorpusRecord) -> BTreeSet<&str> {
    record.error_codes.iter().map(String::as_str).collect()
}

/// Occurrences of one error code across the corpus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorCodeSummary {
    pub code: String,
    pub description: String,
    /// Total occurrences, counting repeats within a record
    pub count: usize,
    /// Distinct records with the code
    pub records: usize,
}

/// Error code frequencies, most frequent first (ties by code).
pub fn summarize_error_codes(records: &[CorpusRecord]) -> Vec<ErrorCodeSummary> {
    let mut counts: BTreeMap<&str, (usize, usize)> = BTreeMap::new();
    for record in records {
        for code in &record.error_codes {
            counts.entry(code.as_str()).or_default().0 += 1;
        }
        for code in distinct_codes(record) {
            counts.entry(code).or_default().1 += 1;
        }
    }
    let mut summary: Vec<_> = counts
        .into_iter()
        .map(|(code, (count, records))| ErrorCodeSummary {
            code: code.to_string(),
            description: describe_error_code(code).to_string(),
            count,
            records,
        })
        .collect();
    summary.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.code.cmp(&b.code)));
    summary
}
