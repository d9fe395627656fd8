//! Feature vectors
//!
//! Every corpus record carries a fixed-schema set of boolean Python feature
//! flags. The schema is closed: an unknown feature name in the input is a row
//! validation error, while an absent name simply means the feature was not
//! observed.
//!
//! Flags normally arrive pre-extracted in the corpus `feature_flags` column.
//! When only the Python source is present, [`FeatureVector::from_source`]
//! derives them by substring detection.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A Python language feature tracked by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    AsyncAwait,
    Generator,
    WalrusOperator,
    Lambda,
    ContextManager,
    ClassDefinition,
    ExceptionHandling,
    Decorator,
    Comprehension,
    StdinUsage,
    Multiprocessing,
    Functools,
    EvalExec,
}

impl Feature {
    pub const COUNT: usize = 13;

    /// All features in schema order.
    pub const ALL: [Feature; Self::COUNT] = [
        Feature::AsyncAwait,
        Feature::Generator,
        Feature::WalrusOperator,
        Feature::Lambda,
        Feature::ContextManager,
        Feature::ClassDefinition,
        Feature::ExceptionHandling,
        Feature::Decorator,
        Feature::Comprehension,
        Feature::StdinUsage,
        Feature::Multiprocessing,
        Feature::Functools,
        Feature::EvalExec,
    ];

    /// Position in [`Feature::ALL`].
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// Column name used in corpus tables and reports.
    pub fn name(&self) -> &'static str {
        match self {
            Self::AsyncAwait => "async_await",
            Self::Generator => "generator",
            Self::WalrusOperator => "walrus_operator",
            Self::Lambda => "lambda",
            Self::ContextManager => "context_manager",
            Self::ClassDefinition => "class_definition",
            Self::ExceptionHandling => "exception_handling",
            Self::Decorator => "decorator",
            Self::Comprehension => "comprehension",
            Self::StdinUsage => "stdin_usage",
            Self::Multiprocessing => "multiprocessing",
            Self::Functools => "functools",
            Self::EvalExec => "eval_exec",
        }
    }

    /// Source substrings that indicate the feature.
    fn markers(&self) -> &'static [&'static str] {
        match self {
            Self::AsyncAwait => &["async def", "await ", "asyncio"],
            Self::Generator => &["yield ", "yield("],
            Self::WalrusOperator => &[":="],
            Self::Lambda => &["lambda "],
            Self::ContextManager => &["with ", "__enter__", "__exit__"],
            Self::ClassDefinition => &["class "],
            Self::ExceptionHandling => &["try:", "except ", "except:", "raise "],
            Self::Decorator => &["\n@", "\r\n@"],
            // Bracket-aware, see `has_comprehension`
            Self::Comprehension => &[],
            Self::StdinUsage => &["stdin", "input("],
            Self::Multiprocessing => &["multiprocessing", "Pool(", "Process("],
            Self::Functools => &["functools", "partial(", "reduce("],
            Self::EvalExec => &["eval(", "exec("],
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Feature {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|f| f.name() == s)
            .ok_or_else(|| format!("unknown feature '{}'", s))
    }
}

/// Fixed-schema boolean feature flags for one record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FeatureVector {
    pub async_await: bool,
    pub generator: bool,
    pub walrus_operator: bool,
    pub lambda: bool,
    pub context_manager: bool,
    pub class_definition: bool,
    pub exception_handling: bool,
    pub decorator: bool,
    pub comprehension: bool,
    pub stdin_usage: bool,
    pub multiprocessing: bool,
    pub functools: bool,
    pub eval_exec: bool,
}

impl FeatureVector {
    /// Whether `feature` is set.
    pub fn has(&self, feature: Feature) -> bool {
        match feature {
            Feature::AsyncAwait => self.async_await,
            Feature::Generator => self.generator,
            Feature::WalrusOperator => self.walrus_operator,
            Feature::Lambda => self.lambda,
            Feature::ContextManager => self.context_manager,
            Feature::ClassDefinition => self.class_definition,
            Feature::ExceptionHandling => self.exception_handling,
            Feature::Decorator => self.decorator,
            Feature::Comprehension => self.comprehension,
            Feature::StdinUsage => self.stdin_usage,
            Feature::Multiprocessing => self.multiprocessing,
            Feature::Functools => self.functools,
            Feature::EvalExec => self.eval_exec,
        }
    }

    /// Builder-style setter.
    pub fn with(mut self, feature: Feature, value: bool) -> Self {
        self.set(feature, value);
        self
    }

    /// Set a single flag.
    pub fn set(&mut self, feature: Feature, value: bool) {
        let slot = match feature {
            Feature::AsyncAwait => &mut self.async_await,
            Feature::Generator => &mut self.generator,
            Feature::WalrusOperator => &mut self.walrus_operator,
            Feature::Lambda => &mut self.lambda,
            Feature::ContextManager => &mut self.context_manager,
            Feature::ClassDefinition => &mut self.class_definition,
            Feature::ExceptionHandling => &mut self.exception_handling,
            Feature::Decorator => &mut self.decorator,
            Feature::Comprehension => &mut self.comprehension,
            Feature::StdinUsage => &mut self.stdin_usage,
            Feature::Multiprocessing => &mut self.multiprocessing,
            Feature::Functools => &mut self.functools,
            Feature::EvalExec => &mut self.eval_exec,
        };
        *slot = value;
    }

    /// Features that are set, in schema order.
    pub fn present(&self) -> impl Iterator<Item = Feature> + '_ {
        Feature::ALL.into_iter().filter(move |f| self.has(*f))
    }

    /// Number of features set.
    pub fn count(&self) -> usize {
        self.present().count()
    }

    /// Detect features from raw Python source.
    pub fn from_source(code: &str) -> Self {
        let mut vector = Self::default();
        if code.is_empty() {
            return vector;
        }
        // Decorators at the very start of the file have no preceding newline
        let padded = format!("\n{}", code);
        for feature in Feature::ALL {
            let hit = feature.markers().iter().any(|m| padded.contains(m));
            vector.set(feature, hit);
        }
        vector.comprehension = has_comprehension(code);
        vector
    }
}

/// `[... for ... in ...]` or `{... for ... in ...}` on a single line.
fn has_comprehension(code: &str) -> bool {
    code.lines().any(|line| {
        ['[', '{'].iter().any(|open| {
            line.find(*open).is_some_and(|start| {
                let rest = &line[start + 1..];
                rest.find(" for ")
                    .is_some_and(|at| rest[at + 5..].contains(" in "))
            })
        })
    })
}
