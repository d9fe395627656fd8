//! Tests for quality module
//!
//! Contains unit tests and property tests.

use super::*;
use crate::corpus::{Corpus, CorpusRecord};
use crate::features::{Feature, FeatureVector};
use crate::labeling::{RiskTier, WeakSupervisionLabeler};
use crate::pipeline::LabeledCorpus;
use proptest::prelude::*;

fn labeled(records: Vec<CorpusRecord>) -> LabeledCorpus {
    LabeledCorpus::new(
        Corpus::from_records(records),
        &WeakSupervisionLabeler::default(),
    )
}

fn category(name: &str, passed: usize, failed: usize) -> Vec<CorpusRecord> {
    let pass = (0..passed).map(|i| CorpusRecord::new(format!("{}-p{}", name, i), name).passing());
    let fail = (0..failed).map(|i| CorpusRecord::new(format!("{}-f{}", name, i), name).failing());
    pass.chain(fail).collect()
}

// ============================================================================
// Grade
// ============================================================================

#[test]
fn test_grade_bands() {
    assert_eq!(Grade::from_counts(100, 100), Grade::A);
    assert_eq!(Grade::from_counts(95, 100), Grade::A);
    assert_eq!(Grade::from_counts(94, 100), Grade::B);
    assert_eq!(Grade::from_counts(85, 100), Grade::B);
    assert_eq!(Grade::from_counts(84, 100), Grade::C);
    assert_eq!(Grade::from_counts(70, 100), Grade::C);
    assert_eq!(Grade::from_counts(69, 100), Grade::D);
    assert_eq!(Grade::from_counts(50, 100), Grade::D);
    assert_eq!(Grade::from_counts(49, 100), Grade::F);
    assert_eq!(Grade::from_counts(0, 100), Grade::F);
}

#[test]
fn test_grade_boundaries_are_exact() {
    // 19/20 = 95% exactly, 17/20 = 85% exactly
    assert_eq!(Grade::from_counts(19, 20), Grade::A);
    assert_eq!(Grade::from_counts(17, 20), Grade::B);
    // 2/3 = 66.6%
    assert_eq!(Grade::from_counts(2, 3), Grade::D);
}

#[test]
fn test_grade_empty_is_not_applicable() {
    assert_eq!(Grade::from_counts(0, 0), Grade::NotApplicable);
    assert_eq!(Grade::NotApplicable.symbol(), "N/A");
}

#[test]
fn test_grade_meets() {
    assert!(Grade::A.meets(Grade::B));
    assert!(Grade::B.meets(Grade::B));
    assert!(!Grade::C.meets(Grade::B));
    assert!(!Grade::NotApplicable.meets(Grade::F));
}

#[test]
fn test_grade_from_str() {
    assert_eq!("b".parse::<Grade>().unwrap(), Grade::B);
    assert!("E".parse::<Grade>().is_err());
    assert!("N/A".parse::<Grade>().is_err());
}

#[test]
fn test_grade_serializes_not_applicable() {
    let json = serde_json::to_string(&Grade::NotApplicable).unwrap();
    assert_eq!(json, "\"N/A\"");
    let back: Grade = serde_json::from_str(&json).unwrap();
    assert_eq!(back, Grade::NotApplicable);
}

// ============================================================================
// Aggregation
// ============================================================================

#[test]
fn test_aggregate_counts_and_grades() {
    let mut records = category("cli", 19, 1);
    records.extend(category("async", 1, 3));
    let report = QualityReportAggregator::default()
        .aggregate(&labeled(records))
        .unwrap();

    assert_eq!(report.total, 24);
    assert_eq!(report.passed, 20);
    assert_eq!(report.failed, 4);
    assert_eq!(report.by_category["cli"].grade, Grade::A);
    assert_eq!(report.by_category["async"].grade, Grade::F);
    assert_eq!(report.by_category["async"].pass_rate, Some(0.25));
    assert_eq!(report.grade, Grade::C);
    assert!(report.check_invariants().is_ok());
}

#[test]
fn test_aggregate_counts_undetermined_as_failed() {
    let records = vec![
        CorpusRecord::new("a", "x").passing(),
        CorpusRecord::new("b", "x"),
        CorpusRecord::new("c", "x").with_outcome(None, Some(true)),
    ];
    let report = QualityReportAggregator::default()
        .aggregate(&labeled(records))
        .unwrap();
    assert_eq!(report.passed, 1);
    assert_eq!(report.failed, 2);
    assert_eq!(report.undetermined, 2);
    assert_eq!(report.by_category["x"].total(), 3);
}

#[test]
fn test_aggregate_empty_corpus_is_not_applicable() {
    let report = QualityReportAggregator::default()
        .aggregate(&labeled(vec![]))
        .unwrap();
    assert_eq!(report.total, 0);
    assert_eq!(report.grade, Grade::NotApplicable);
    assert_eq!(report.pass_rate, None);
    assert!(report.by_category.is_empty());
    assert!(report.top_suspicious.is_empty());
    assert!(report.recommendations.is_empty());
    assert!(report.check_invariants().is_ok());
    assert!(!report.meets(Grade::F));
}

#[test]
fn test_aggregate_without_outcomes_has_no_suspicious_features() {
    let records = vec![CorpusRecord::new("a", "x"), CorpusRecord::new("b", "y")];
    let report = QualityReportAggregator::default()
        .aggregate(&labeled(records))
        .unwrap();
    assert!(report.top_suspicious.is_empty());
    assert_eq!(report.grade, Grade::F);
}

#[test]
fn test_aggregate_risk_distribution_and_top_suspicious() {
    let async_on = FeatureVector::default().with(Feature::AsyncAwait, true);
    let mut records: Vec<_> = (0..6)
        .map(|i| CorpusRecord::new(format!("f{}", i), "async").failing().with_features(async_on))
        .collect();
    records.extend(category("cli", 4, 0));
    let report = QualityReportAggregator::default()
        .aggregate(&labeled(records))
        .unwrap();

    assert_eq!(report.tier_count(RiskTier::High), 6);
    assert_eq!(report.tier_count(RiskTier::Low), 4);
    assert_eq!(report.top_suspicious.len(), 5);
    assert_eq!(report.top_suspicious[0].feature, Feature::AsyncAwait);
    assert_eq!(report.top_suspicious[0].score, 1.0);
}

#[test]
fn test_recommendations() {
    let async_on = FeatureVector::default().with(Feature::AsyncAwait, true);
    let mut records: Vec<_> = (0..2)
        .map(|i| CorpusRecord::new(format!("f{}", i), "async").failing().with_features(async_on))
        .collect();
    // Untranspiled records pull the success rate below 80%
    records.extend((0..8).map(|i| CorpusRecord::new(format!("u{}", i), "cli")));
    records.push(CorpusRecord::new("p", "cli").passing());

    let report = QualityReportAggregator::default()
        .aggregate(&labeled(records))
        .unwrap();
    let actions: Vec<_> = report.recommendations.iter().map(|r| r.action.as_str()).collect();

    assert!(actions.iter().any(|a| a.starts_with("Improve success rate")));
    assert!(actions.iter().any(|a| a.starts_with("Increase HIGH-risk")));
    let async_rec = report
        .recommendations
        .iter()
        .find(|r| r.action.contains("'async_await'"))
        .unwrap();
    assert_eq!(async_rec.priority, Priority::High);
}

#[test]
fn test_check_invariants_detects_tampering() {
    let report = QualityReportAggregator::default()
        .aggregate(&labeled(category("cli", 3, 1)))
        .unwrap();

    let mut bad = report.clone();
    bad.total += 1;
    assert!(bad.check_invariants().is_err());

    let mut bad = report.clone();
    bad.by_category.insert("ghost".into(), CategoryStats::new(1, 0));
    assert!(bad.check_invariants().unwrap_err().contains("category counts"));

    let mut bad = report;
    bad.schema_version = SCHEMA_VERSION + 1;
    assert!(bad.check_invariants().is_err());
}

#[test]
fn test_report_json_roundtrip_preserves_invariants() {
    let report = QualityReportAggregator::default()
        .aggregate(&labeled(category("cli", 3, 1)))
        .unwrap();
    let json = format_report_json(&report).unwrap();
    let back: QualityReport = serde_json::from_str(&json).unwrap();
    assert_eq!(back, report);
}

// ============================================================================
// Formatting
// ============================================================================

#[test]
fn test_format_report_text() {
    let report = QualityReportAggregator::default()
        .aggregate(&labeled(category("cli", 3, 1)))
        .unwrap();
    let text = format_report_text(&report);
    assert!(text.contains("Corpus Quality Report"));
    assert!(text.contains("cli"));
    assert!(text.contains("75.0%"));
    assert!(text.contains("Grade: C"));
}

#[test]
fn test_format_report_markdown() {
    let report = QualityReportAggregator::default()
        .aggregate(&labeled(category("cli", 3, 1)))
        .unwrap();
    let md = format_report_markdown(&report);
    assert!(md.starts_with("# Corpus Quality Report"));
    assert!(md.contains("| cli | 3 | 1 | 75.0% | C |"));
    assert!(md.contains("- **HIGH**: 0"));
    assert!(md.contains("## Recommendations"));
}

// ============================================================================
// Property Tests
// ============================================================================

fn arb_records() -> impl Strategy<Value = Vec<CorpusRecord>> {
    proptest::collection::vec(
        (0usize..6, proptest::option::of(any::<bool>()), proptest::option::of(any::<bool>())),
        1..80,
    )
    .prop_map(|rows| {
        rows.into_iter()
            .enumerate()
            .map(|(i, (cat, compiles, tests))| {
                CorpusRecord::new(format!("r{}", i), format!("cat{}", cat))
                    .with_outcome(compiles, tests)
            })
            .collect()
    })
}

proptest! {
    /// PROPERTY: category counts always sum to the global total
    #[test]
    fn prop_category_sum_invariant(records in arb_records()) {
        let n = records.len();
        let report = QualityReportAggregator::default().aggregate(&labeled(records)).unwrap();
        prop_assert_eq!(report.total, n);
        let sum: usize = report.by_category.values().map(CategoryStats::total).sum();
        prop_assert_eq!(sum, report.total);
        prop_assert!(report.check_invariants().is_ok());
    }

    /// PROPERTY: grade is monotone in the number of passes
    #[test]
    fn prop_grade_monotone(total in 1usize..500, a in 0usize..500, b in 0usize..500) {
        let (lo, hi) = (a.min(b).min(total), a.max(b).min(total));
        prop_assert!(Grade::from_counts(hi, total) <= Grade::from_counts(lo, total));
    }
}
