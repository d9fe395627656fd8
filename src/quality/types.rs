//! Quality types
//!
//! - `Grade` - Letter grade bands over a pass rate
//! - `CategoryStats` - Pass/fail counts for one category
//! - `Recommendation` - Prioritized follow-up action

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Grade
// ============================================================================

/// Letter grade for a pass rate, best first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Grade {
    /// A (95-100%)
    A,
    /// B (85-94%)
    B,
    /// C (70-84%)
    C,
    /// D (50-69%)
    D,
    /// F (0-49%)
    F,
    /// No records to grade
    #[serde(rename = "N/A")]
    NotApplicable,
}

impl Grade {
    /// Grade `passed` out of `total`, in integer arithmetic.
    pub fn from_counts(passed: usize, total: usize) -> Self {
        if total == 0 {
            return Self::NotApplicable;
        }
        let pct = passed as u128 * 100;
        let total = total as u128;
        if pct >= 95 * total {
            Self::A
        } else if pct >= 85 * total {
            Self::B
        } else if pct >= 70 * total {
            Self::C
        } else if pct >= 50 * total {
            Self::D
        } else {
            Self::F
        }
    }

    /// Whether this grade is at least as good as `min`. `N/A` never is.
    pub fn meets(&self, min: Grade) -> bool {
        *self != Self::NotApplicable && *self <= min
    }

    /// Get display symbol for grade
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
            Self::D => "D",
            Self::F => "F",
            Self::NotApplicable => "N/A",
        }
    }

    /// Get status icon for grade
    pub fn icon(&self) -> &'static str {
        match self {
            Self::A => "✅",
            Self::B | Self::C => "⚠️",
            Self::NotApplicable => "➖",
            _ => "❌",
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

impl FromStr for Grade {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "A" => Ok(Self::A),
            "B" => Ok(Self::B),
            "C" => Ok(Self::C),
            "D" => Ok(Self::D),
            "F" => Ok(Self::F),
            other => Err(format!("unknown grade '{}' (expected A, B, C, D or F)", other)),
        }
    }
}

/// Pass rate in [0, 1], `None` for an empty set.
pub fn pass_rate(passed: usize, total: usize) -> Option<f64> {
    (total > 0).then(|| passed as f64 / total as f64)
}

// ============================================================================
// Category Stats
// ============================================================================

/// Pass/fail counts for one category
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CategoryStats {
    pub passed: usize,
    pub failed: usize,
    pub pass_rate: Option<f64>,
    pub grade: Grade,
}

impl CategoryStats {
    pub fn new(passed: usize, failed: usize) -> Self {
        let total = passed + failed;
        Self {
            passed,
            failed,
            pass_rate: pass_rate(passed, total),
            grade: Grade::from_counts(passed, total),
        }
    }

    pub fn total(&self) -> usize {
        self.passed + self.failed
    }
}

// ============================================================================
// Recommendations
// ============================================================================

/// Recommendation priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::High => write!(f, "HIGH"),
            Self::Medium => write!(f, "MEDIUM"),
            Self::Low => write!(f, "LOW"),
        }
    }
}

/// Actionable follow-up derived from a report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub priority: Priority,
    pub action: String,
    pub impact: String,
}
