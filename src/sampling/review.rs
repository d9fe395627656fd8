//! Human review checklist and review summaries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::{CribaError, InputSource, Result};
use crate::labeling::RiskTier;
use crate::persist;

/// Checklist item severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

impl Severity {
    pub fn icon(&self) -> &'static str {
        match self {
            Self::Critical => "🔴",
            Self::High => "🟠",
            Self::Medium => "🟡",
            Self::Low => "🟢",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Critical => write!(f, "CRITICAL"),
            Self::High => write!(f, "HIGH"),
            Self::Medium => write!(f, "MEDIUM"),
            Self::Low => write!(f, "LOW"),
        }
    }
}

/// One thing a reviewer checks in the generated Rust.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistItem {
    pub id: String,
    pub description: String,
    pub severity: Severity,
}

const CHECKLIST: [(&str, &str, Severity); 8] = [
    ("no_unsafe", "No unnecessary `unsafe` blocks", Severity::Critical),
    ("minimal_cloning", "Minimal cloning (prefer borrowing)", Severity::High),
    (
        "idiomatic_error_handling",
        "Idiomatic error handling (Result/Option, no unwrap in lib code)",
        Severity::High,
    ),
    (
        "iterator_usage",
        "Appropriate use of iterators (no explicit loops where iter works)",
        Severity::Medium,
    ),
    (
        "no_pythonisms",
        "No Python-isms (Arc<Mutex<>> overuse, String everywhere)",
        Severity::Medium,
    ),
    ("proper_lifetimes", "Proper lifetime annotations where needed", Severity::Medium),
    ("no_magic_numbers", "No magic numbers (use constants)", Severity::Low),
    ("documentation", "Public APIs have doc comments", Severity::Low),
];

/// The review checklist, most severe first.
pub fn review_checklist() -> Vec<ChecklistItem> {
    CHECKLIST
        .iter()
        .map(|(id, description, severity)| ChecklistItem {
            id: id.to_string(),
            description: description.to_string(),
            severity: *severity,
        })
        .collect()
}

/// Review state of a sampled record
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    #[default]
    Pending,
    Approved,
    NeedsWork,
    Rejected,
}

impl ReviewStatus {
    pub const ALL: [ReviewStatus; 4] = [
        ReviewStatus::Pending,
        ReviewStatus::Approved,
        ReviewStatus::NeedsWork,
        ReviewStatus::Rejected,
    ];
}

impl fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Approved => write!(f, "approved"),
            Self::NeedsWork => write!(f, "needs_work"),
            Self::Rejected => write!(f, "rejected"),
        }
    }
}

/// One sampled record awaiting (or after) human review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewItem {
    pub record_id: String,
    pub category: String,
    #[serde(default)]
    pub risk_tier: Option<RiskTier>,
    #[serde(default)]
    pub review_status: ReviewStatus,
    /// Check id → result; `None` until reviewed
    #[serde(default)]
    pub checklist: BTreeMap<String, Option<bool>>,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub reviewer: Option<String>,
    #[serde(default)]
    pub reviewed_at: Option<DateTime<Utc>>,
}

impl ReviewItem {
    pub fn pending(record_id: &str, category: &str, risk_tier: Option<RiskTier>) -> Self {
        Self {
            record_id: record_id.to_string(),
            category: category.to_string(),
            risk_tier,
            review_status: ReviewStatus::Pending,
            checklist: CHECKLIST.iter().map(|(id, _, _)| (id.to_string(), None)).collect(),
            notes: String::new(),
            reviewer: None,
            reviewed_at: None,
        }
    }
}

/// Only the part of a sample file the summary needs.
#[derive(Deserialize)]
struct ReviewFile {
    #[serde(default)]
    items: Vec<ReviewItem>,
}

/// Aggregate of all review files in a directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewSummary {
    pub total_reviewed: usize,
    pub status_breakdown: BTreeMap<ReviewStatus, usize>,
    /// Percentage of items approved
    pub approval_rate: f64,
    /// Most frequently failed checks, most failures first
    pub top_failures: Vec<(String, usize)>,
    pub files: Vec<PathBuf>,
    pub generated_at: DateTime<Utc>,
}

impl ReviewSummary {
    pub fn from_items<'a>(items: impl IntoIterator<Item = &'a ReviewItem>) -> Self {
        let mut status_breakdown: BTreeMap<ReviewStatus, usize> =
            ReviewStatus::ALL.iter().map(|s| (*s, 0)).collect();
        let mut failures: BTreeMap<&str, usize> = BTreeMap::new();
        let mut total = 0;

        for item in items {
            total += 1;
            *status_breakdown.entry(item.review_status).or_default() += 1;
            for (check, result) in &item.checklist {
                if *result == Some(false) {
                    *failures.entry(check.as_str()).or_default() += 1;
                }
            }
        }

        let approved = status_breakdown[&ReviewStatus::Approved];
        let approval_rate = if total == 0 {
            0.0
        } else {
            (approved as f64 * 1000.0 / total as f64).round() / 10.0
        };

        let mut top_failures: Vec<(String, usize)> = failures
            .into_iter()
            .map(|(check, n)| (check.to_string(), n))
            .collect();
        top_failures.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        top_failures.truncate(5);

        Self {
            total_reviewed: total,
            status_breakdown,
            approval_rate,
            top_failures,
            files: Vec::new(),
            generated_at: Utc::now(),
        }
    }

    /// Summarize every `*.json` file in `dir`.
    pub fn from_dir(dir: &Path) -> Result<Self> {
        if !dir.is_dir() {
            return Err(CribaError::input(
                dir,
                InputSource::Invalid("review directory does not exist".into()),
            ));
        }
        let pattern = format!("{}/*.json", glob::Pattern::escape(&dir.display().to_string()));
        let entries = glob::glob(&pattern)
            .map_err(|e| CribaError::input(dir, InputSource::Invalid(e.to_string())))?;
        let mut candidates: Vec<PathBuf> = entries.filter_map(|e| e.ok()).collect();
        candidates.sort();

        let mut items = Vec::new();
        let mut files = Vec::new();
        for file in candidates {
            match persist::read_json::<ReviewFile>(&file) {
                Ok(review) => {
                    debug!(file = %file.display(), items = review.items.len(), "read review file");
                    items.extend(review.items);
                    files.push(file);
                }
                Err(e) => warn!("Skipping {}: {}", file.display(), e),
            }
        }

        let mut summary = Self::from_items(&items);
        summary.files = files;
        Ok(summary)
    }

    /// Format summary as text
    pub fn format_text(&self) -> String {
        let mut output = String::new();
        output.push_str(&"━".repeat(50));
        output.push_str("\nHITL REVIEW SUMMARY\n");
        output.push_str(&"━".repeat(50));
        output.push('\n');
        output.push_str(&format!("Files: {}\n", self.files.len()));
        output.push_str(&format!("Total reviewed: {}\n", self.total_reviewed));
        output.push_str(&format!("Approval rate: {:.1}%\n\n", self.approval_rate));
        output.push_str("Status breakdown:\n");
        for (status, count) in &self.status_breakdown {
            output.push_str(&format!("  {}: {}\n", status, count));
        }
        if !self.top_failures.is_empty() {
            output.push_str("\nTop failing checks:\n");
            for (check, count) in &self.top_failures {
                output.push_str(&format!("  {}: {}\n", check, count));
            }
        }
        output.push_str(&"━".repeat(50));
        output.push('\n');
        output
    }
}

/// Reviewer guide as markdown.
pub fn review_guide() -> String {
    let mut guide = String::from(
        "# HITL Review Guide\n\n\
         ## Overview\n\n\
         Reviewers inspect a stratified sample of transpiled examples to find\n\
         anti-patterns that automated tests cannot catch.\n\n\
         ## Review Checklist\n\n",
    );
    for item in review_checklist() {
        guide.push_str(&format!("### {} {}\n", item.severity.icon(), item.id));
        guide.push_str(&format!("**Severity:** {}\n\n", item.severity));
        guide.push_str(&format!("{}\n\n", item.description));
    }
    guide.push_str(
        "## Status Values\n\n\
         - `pending`: Not yet reviewed\n\
         - `approved`: Passes all critical/high checks\n\
         - `needs_work`: Has issues that need fixing\n\
         - `rejected`: Has critical anti-patterns\n",
    );
    guide
}
