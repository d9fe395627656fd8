//! Corpus record types

use serde::{Deserialize, Serialize};

use crate::features::FeatureVector;

/// Pass/fail outcome of a transpilation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Pass,
    Fail,
}

/// One transpilation attempt, immutable once loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorpusRecord {
    /// Stable unique identifier
    pub id: String,
    /// Example category, e.g. `async_gather`
    pub category: String,
    /// Whether the transpiler produced Rust output
    pub has_rust: bool,
    /// `None` when untranspiled or not yet checked
    pub compiles: Option<bool>,
    pub tests_pass: Option<bool>,
    /// Compiler error codes in emission order
    pub error_codes: Vec<String>,
    #[serde(rename = "feature_flags")]
    pub features: FeatureVector,
}

impl CorpusRecord {
    /// Create a record with no outcome, errors or features.
    pub fn new(id: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            category: category.into(),
            has_rust: false,
            compiles: None,
            tests_pass: None,
            error_codes: Vec::new(),
            features: FeatureVector::default(),
        }
    }

    /// Mark as transpiled with the given compile/test results.
    pub fn with_outcome(mut self, compiles: Option<bool>, tests_pass: Option<bool>) -> Self {
        self.has_rust = true;
        self.compiles = compiles;
        self.tests_pass = tests_pass;
        self
    }

    /// Shorthand for a transpiled record that compiles and passes its tests.
    pub fn passing(self) -> Self {
        self.with_outcome(Some(true), Some(true))
    }

    /// Shorthand for a transpiled record that fails to compile.
    pub fn failing(self) -> Self {
        self.with_outcome(Some(false), None)
    }

    pub fn with_error_codes<I, S>(mut self, codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.error_codes = codes.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_features(mut self, features: FeatureVector) -> Self {
        self.features = features;
        self
    }

    /// Determinable outcome, or `None` when the record was never compiled.
    ///
    /// A compile failure is a failure regardless of tests; a compiling
    /// record fails only when its tests are known to fail.
    pub fn outcome(&self) -> Option<Outcome> {
        match (self.compiles, self.tests_pass) {
            (None, _) => None,
            (Some(false), _) => Some(Outcome::Fail),
            (Some(true), Some(false)) => Some(Outcome::Fail),
            (Some(true), _) => Some(Outcome::Pass),
        }
    }

    /// Whether the record counts as passing in quality reports.
    pub fn is_passing(&self) -> bool {
        self.outcome() == Some(Outcome::Pass)
    }
}
