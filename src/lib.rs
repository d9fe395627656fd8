//! Corpus quality and fault-localization pipeline for transpilation corpora.
//!
//! Loads a corpus of transpiled examples, assigns each a risk tier by weak
//! supervision, ranks the Python features most associated with failure,
//! grades the corpus, gates regressions against a baseline, and draws review
//! samples and golden traces for humans.

pub mod config;
pub mod corpus;
pub mod error;
pub mod features;
pub mod gate;
pub mod golden;
pub mod insights;
pub mod labeling;
pub mod localization;
pub mod persist;
pub mod pipeline;
pub mod quality;
pub mod sampling;

// Re-export key types for convenience
pub use config::CribaConfig;
pub use corpus::{load_corpus, Corpus, CorpusRecord, LoadOptions, Outcome};
pub use error::{CribaError, InputSource, Result, SchemaError};
pub use features::{Feature, FeatureVector};
pub use gate::{
    Baseline, BaselineStore, CategoryPassPolicy, GateDecision, PassSnapshot, RegressionGate,
    RegressionResult,
};
pub use golden::{GoldenRanking, GoldenTarget, GoldenTrace, GoldenTraceCurator};
pub use insights::{InsightAnalyzer, InsightReport};
pub use labeling::{LabelAssignment, RiskTier, RuleSet, WeakSupervisionLabeler};
pub use localization::{SbflFormula, SuspiciousnessScore, TarantulaEngine};
pub use pipeline::LabeledCorpus;
pub use quality::{Grade, QualityReport, QualityReportAggregator};
pub use sampling::{AllocationPolicy, Sample, StratifiedSampler};
