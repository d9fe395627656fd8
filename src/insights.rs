//! Zero-success category insights
//!
//! Finds categories in which no record passes and ranks the features that
//! block them, weighting each feature by its corpus-wide suspiciousness.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

use crate::corpus::CorpusRecord;
use crate::features::Feature;
use crate::localization::{SbflFormula, TarantulaEngine};
use crate::quality::Priority;

/// Category name prefixes that form a group (`async_gather` → `async`)
const GROUP_PREFIXES: [&str; 7] = ["async", "func", "state", "mem", "serial", "typed", "thread"];

/// Suspiciousness above which a blocking feature is HIGH priority
const HIGH_PRIORITY_SCORE: f64 = 0.7;

/// Group a category belongs to, by prefix.
pub fn category_group(category: &str) -> &'static str {
    GROUP_PREFIXES
        .iter()
        .find(|prefix| {
            category
                .strip_prefix(**prefix)
                .is_some_and(|rest| rest.starts_with('_'))
        })
        .copied()
        .unwrap_or("other")
}

/// A category with no passing record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryInsight {
    pub category: String,
    pub group: String,
    pub records: usize,
    /// Features present in any of the category's records
    pub blocking_features: Vec<Feature>,
    /// Sum of the blocking features' suspiciousness
    pub impact_score: f64,
    pub recommendation: String,
}

/// How urgently a feature needs transpiler support.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeaturePriority {
    pub feature: Feature,
    pub priority: Priority,
    /// Zero-success records that have the feature
    pub affected_records: usize,
    pub suspiciousness: f64,
    /// `affected_records × suspiciousness`
    pub impact: f64,
    pub action: String,
}

/// Full insight artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsightReport {
    pub generated_at: DateTime<Utc>,
    pub formula: SbflFormula,
    pub zero_success: Vec<CategoryInsight>,
    pub groups: BTreeMap<String, Vec<String>>,
    pub feature_priorities: Vec<FeaturePriority>,
}

/// Builds [`InsightReport`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct InsightAnalyzer {
    engine: TarantulaEngine,
}

impl InsightAnalyzer {
    pub fn new(formula: SbflFormula) -> Self {
        Self {
            engine: TarantulaEngine::new(formula),
        }
    }

    pub fn analyze(&self, records: &[CorpusRecord]) -> InsightReport {
        let scores: BTreeMap<Feature, f64> = match self.engine.scores(records) {
            Ok(scores) => scores.into_iter().map(|s| (s.feature, s.score)).collect(),
            Err(e) => {
                warn!("insights without suspiciousness: {}", e);
                BTreeMap::new()
            }
        };
        let score = |f: Feature| scores.get(&f).copied().unwrap_or(0.0);

        let mut by_category: BTreeMap<&str, Vec<&CorpusRecord>> = BTreeMap::new();
        for record in records {
            by_category.entry(record.category.as_str()).or_default().push(record);
        }

        let mut zero_success = Vec::new();
        let mut groups: BTreeMap<String, Vec<String>> = BTreeMap::new();
        let mut affected: BTreeMap<Feature, usize> = BTreeMap::new();

        for (category, members) in by_category {
            if members.iter().any(|r| r.is_passing()) {
                continue;
            }
            let features: BTreeSet<Feature> =
                members.iter().flat_map(|r| r.features.present()).collect();
            for record in &members {
                for feature in record.features.present() {
                    *affected.entry(feature).or_default() += 1;
                }
            }

            let impact_score = features.iter().map(|f| score(*f)).sum();
            let top_blocker = features
                .iter()
                .copied()
                .max_by(|a, b| score(*a).total_cmp(&score(*b)).then_with(|| b.cmp(a)));
            let recommendation = match top_blocker {
                Some(f) => format!("Implement '{}' support to unblock this category", f),
                None => "Investigate specific failure patterns".to_string(),
            };

            let group = category_group(category);
            groups
                .entry(group.to_string())
                .or_default()
                .push(category.to_string());
            zero_success.push(CategoryInsight {
                category: category.to_string(),
                group: group.to_string(),
                records: members.len(),
                blocking_features: features.into_iter().collect(),
                impact_score,
                recommendation,
            });
        }
        zero_success.sort_by(|a, b| {
            b.impact_score
                .total_cmp(&a.impact_score)
                .then_with(|| a.category.cmp(&b.category))
        });

        let mut feature_priorities: Vec<_> = affected
            .into_iter()
            .map(|(feature, count)| {
                let suspiciousness = score(feature);
                FeaturePriority {
                    feature,
                    priority: if suspiciousness > HIGH_PRIORITY_SCORE {
                        Priority::High
                    } else {
                        Priority::Medium
                    },
                    affected_records: count,
                    suspiciousness,
                    impact: count as f64 * suspiciousness,
                    action: format!("Add support for '{}' pattern", feature),
                }
            })
            .collect();
        feature_priorities.sort_by(|a, b| {
            b.impact
                .total_cmp(&a.impact)
                .then_with(|| a.feature.name().cmp(b.feature.name()))
        });

        debug!(
            zero_success = zero_success.len(),
            features = feature_priorities.len(),
            "computed insights"
        );

        InsightReport {
            generated_at: Utc::now(),
            formula: self.engine.formula(),
            zero_success,
            groups,
            feature_priorities,
        }
    }
}

impl InsightReport {
    /// Format insights as text
    pub fn format_text(&self) -> String {
        let mut output = format!(
            "Zero-success categories: {}\n",
            self.zero_success.len()
        );
        output.push_str(&"─".repeat(64));
        output.push('\n');
        for insight in &self.zero_success {
            let features: Vec<_> = insight.blocking_features.iter().map(Feature::name).collect();
            output.push_str(&format!(
                "  {:24} [{}] impact {:.2}  {}\n",
                insight.category,
                insight.group,
                insight.impact_score,
                features.join(", ")
            ));
            output.push_str(&format!("    └── {}\n", insight.recommendation));
        }
        if !self.feature_priorities.is_empty() {
            output.push_str("\nFeature priorities:\n");
            for p in &self.feature_priorities {
                output.push_str(&format!(
                    "  [{}] {:20} {} records × {:.3} = {:.2}\n",
                    p.priority,
                    p.feature.name(),
                    p.affected_records,
                    p.suspiciousness,
                    p.impact
                ));
            }
        }
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::FeatureVector;

    fn with(id: &str, category: &str, pass: bool, features: &[Feature]) -> CorpusRecord {
        let vector = features
            .iter()
            .fold(FeatureVector::default(), |v, f| v.with(*f, true));
        let r = CorpusRecord::new(id, category).with_features(vector);
        if pass {
            r.passing()
        } else {
            r.failing()
        }
    }

    #[test]
    fn test_category_group() {
        assert_eq!(category_group("async_gather"), "async");
        assert_eq!(category_group("typed_dict"), "typed");
        assert_eq!(category_group("asyncio"), "other");
        assert_eq!(category_group("cli"), "other");
    }

    #[test]
    fn test_zero_success_categories() {
        let records = vec![
            with("a1", "async_gather", false, &[Feature::AsyncAwait]),
            with("a2", "async_gather", false, &[Feature::AsyncAwait, Feature::Lambda]),
            with("c1", "cli", true, &[]),
            with("c2", "cli", false, &[Feature::Lambda]),
            with("m1", "mem_view", false, &[]),
        ];
        let report = InsightAnalyzer::default().analyze(&records);

        let cats: Vec<_> = report.zero_success.iter().map(|i| i.category.as_str()).collect();
        assert_eq!(cats, vec!["async_gather", "mem_view"]);

        let async_insight = &report.zero_success[0];
        assert_eq!(async_insight.group, "async");
        assert_eq!(async_insight.records, 2);
        assert_eq!(
            async_insight.blocking_features,
            vec![Feature::AsyncAwait, Feature::Lambda]
        );
        assert!(async_insight.recommendation.contains("'async_await'"));

        let mem = &report.zero_success[1];
        assert!(mem.blocking_features.is_empty());
        assert_eq!(mem.recommendation, "Investigate specific failure patterns");
        assert_eq!(report.groups["mem"], vec!["mem_view".to_string()]);
    }

    #[test]
    fn test_feature_priorities() {
        let records = vec![
            with("a1", "async_x", false, &[Feature::AsyncAwait]),
            with("a2", "async_x", false, &[Feature::AsyncAwait]),
            with("p1", "cli", true, &[]),
        ];
        let report = InsightAnalyzer::default().analyze(&records);
        let top = &report.feature_priorities[0];
        assert_eq!(top.feature, Feature::AsyncAwait);
        assert_eq!(top.affected_records, 2);
        assert_eq!(top.suspiciousness, 1.0);
        assert_eq!(top.impact, 2.0);
        assert_eq!(top.priority, Priority::High);
    }

    #[test]
    fn test_no_outcomes_still_lists_categories() {
        let records = vec![CorpusRecord::new("u", "state_machine")];
        let report = InsightAnalyzer::default().analyze(&records);
        assert_eq!(report.zero_success.len(), 1);
        assert_eq!(report.zero_success[0].impact_score, 0.0);
        assert!(report.format_text().contains("state_machine"));
    }
}
