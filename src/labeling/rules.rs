//! Labeling rules
//!
//! A rule set is an ordered list of `(predicate, tier)` pairs. Order is the
//! precedence: every HIGH rule comes before every MEDIUM rule, which comes
//! before every LOW rule, and the list ends with a catch-all. Both properties
//! are checked when the set is built, so a [`RuleSet`] value is always total.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use crate::error::{CribaError, Result};
use crate::features::{Feature, FeatureVector};

/// Transpilation risk tier, most severe first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskTier {
    High,
    Medium,
    Low,
}

impl RiskTier {
    pub const ALL: [RiskTier; 3] = [RiskTier::High, RiskTier::Medium, RiskTier::Low];

    pub fn symbol(&self) -> &'static str {
        match self {
            Self::High => "HIGH",
            Self::Medium => "MEDIUM",
            Self::Low => "LOW",
        }
    }
}

impl fmt::Display for RiskTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// Condition over a feature vector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RulePredicate {
    /// Feature is set
    Has(Feature),
    /// Every listed feature is set
    All(Vec<Feature>),
    /// At least one listed feature is set
    Any(Vec<Feature>),
    /// Matches everything
    Always,
}

impl RulePredicate {
    pub fn matches(&self, features: &FeatureVector) -> bool {
        match self {
            Self::Has(f) => features.has(*f),
            Self::All(fs) => fs.iter().all(|f| features.has(*f)),
            Self::Any(fs) => fs.iter().any(|f| features.has(*f)),
            Self::Always => true,
        }
    }

    pub fn is_catch_all(&self) -> bool {
        matches!(self, Self::Always)
    }
}

/// A named rule; the name is recorded on every assignment it produces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelingRule {
    pub name: String,
    pub tier: RiskTier,
    pub when: RulePredicate,
}

impl LabelingRule {
    pub fn new(name: impl Into<String>, tier: RiskTier, when: RulePredicate) -> Self {
        Self {
            name: name.into(),
            tier,
            when,
        }
    }
}

/// Validated, ordered rule list. Serialized as a plain sequence of rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleSet {
    rules: Vec<LabelingRule>,
}

impl RuleSet {
    /// Validate and build a rule set.
    ///
    /// Fails when the list is empty, names repeat, tiers get more severe
    /// further down, a catch-all appears before the end, or the last rule
    /// is not a LOW catch-all.
    pub fn new(rules: Vec<LabelingRule>) -> Result<Self> {
        let Some(last) = rules.last() else {
            return Err(CribaError::config("rule set is empty"));
        };
        if !last.when.is_catch_all() {
            return Err(CribaError::config(format!(
                "last rule '{}' must be a catch-all ('always')",
                last.name
            )));
        }
        if last.tier != RiskTier::Low {
            return Err(CribaError::config(format!(
                "catch-all rule '{}' must be LOW, got {}",
                last.name, last.tier
            )));
        }

        let mut names = HashSet::new();
        for (i, rule) in rules.iter().enumerate() {
            if !names.insert(rule.name.as_str()) {
                return Err(CribaError::config(format!(
                    "duplicate rule name '{}'",
                    rule.name
                )));
            }
            if rule.when.is_catch_all() && i + 1 != rules.len() {
                return Err(CribaError::config(format!(
                    "catch-all rule '{}' makes later rules unreachable",
                    rule.name
                )));
            }
            if let Some(prev) = i.checked_sub(1).map(|p| &rules[p]) {
                if rule.tier < prev.tier {
                    return Err(CribaError::config(format!(
                        "rule '{}' ({}) follows '{}' ({}): tiers must run HIGH → MEDIUM → LOW",
                        rule.name, rule.tier, prev.name, prev.tier
                    )));
                }
            }
        }

        Ok(Self { rules })
    }

    pub fn rules(&self) -> &[LabelingRule] {
        &self.rules
    }

    /// First rule whose predicate matches. Always `Some` by construction.
    pub fn first_match(&self, features: &FeatureVector) -> &LabelingRule {
        self.rules
            .iter()
            .find(|r| r.when.matches(features))
            .unwrap_or_else(|| &self.rules[self.rules.len() - 1])
    }

    /// All matching rules, in precedence order.
    pub fn matching<'a>(
        &'a self,
        features: &'a FeatureVector,
    ) -> impl Iterator<Item = &'a LabelingRule> + 'a {
        self.rules.iter().filter(move |r| r.when.matches(features))
    }
}

impl Default for RuleSet {
    /// Rules derived from the corpus-wide Tarantula analysis: features with
    /// suspiciousness above 0.8 are HIGH, 0.6–0.8 MEDIUM.
    fn default() -> Self {
        use Feature::*;
        use RiskTier::*;
        Self {
            rules: vec![
                LabelingRule::new("async_pattern", High, RulePredicate::Has(AsyncAwait)),
                LabelingRule::new("generator_pattern", High, RulePredicate::Has(Generator)),
                LabelingRule::new("walrus_pattern", High, RulePredicate::Has(WalrusOperator)),
                LabelingRule::new("dynamic_eval_pattern", High, RulePredicate::Has(EvalExec)),
                LabelingRule::new("lambda_pattern", Medium, RulePredicate::Has(Lambda)),
                LabelingRule::new(
                    "context_manager_pattern",
                    Medium,
                    RulePredicate::Has(ContextManager),
                ),
                LabelingRule::new(
                    "multiprocessing_pattern",
                    Medium,
                    RulePredicate::Has(Multiprocessing),
                ),
                LabelingRule::new(
                    "class_exception_pattern",
                    Medium,
                    RulePredicate::All(vec![ClassDefinition, ExceptionHandling]),
                ),
                LabelingRule::new("default_low", Low, RulePredicate::Always),
            ],
        }
    }
}

impl Serialize for RuleSet {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.rules.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for RuleSet {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let rules = Vec::<LabelingRule>::deserialize(deserializer)?;
        RuleSet::new(rules).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(name: &str, tier: RiskTier, when: RulePredicate) -> LabelingRule {
        LabelingRule::new(name, tier, when)
    }

    #[test]
    fn test_default_rule_set_is_valid() {
        let default = RuleSet::default();
        let rebuilt = RuleSet::new(default.rules().to_vec()).unwrap();
        assert_eq!(rebuilt, default);
    }

    #[test]
    fn test_empty_rule_set_rejected() {
        assert!(matches!(RuleSet::new(vec![]), Err(CribaError::Config(_))));
    }

    #[test]
    fn test_missing_catch_all_rejected() {
        let err = RuleSet::new(vec![rule(
            "async",
            RiskTier::High,
            RulePredicate::Has(Feature::AsyncAwait),
        )])
        .unwrap_err();
        assert!(err.to_string().contains("catch-all"));
    }

    #[test]
    fn test_catch_all_must_be_low() {
        let err = RuleSet::new(vec![
            rule("async", RiskTier::High, RulePredicate::Has(Feature::AsyncAwait)),
            rule("rest", RiskTier::Medium, RulePredicate::Always),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("must be LOW"));
    }

    #[test]
    fn test_precedence_violation_rejected() {
        let err = RuleSet::new(vec![
            rule("lambda", RiskTier::Medium, RulePredicate::Has(Feature::Lambda)),
            rule("async", RiskTier::High, RulePredicate::Has(Feature::AsyncAwait)),
            rule("rest", RiskTier::Low, RulePredicate::Always),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("HIGH → MEDIUM → LOW"));
    }

    #[test]
    fn test_early_catch_all_rejected() {
        let err = RuleSet::new(vec![
            rule("all_high", RiskTier::High, RulePredicate::Always),
            rule("rest", RiskTier::Low, RulePredicate::Always),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("unreachable"));
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let err = RuleSet::new(vec![
            rule("x", RiskTier::High, RulePredicate::Has(Feature::Generator)),
            rule("x", RiskTier::Low, RulePredicate::Always),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn test_predicates() {
        let v = FeatureVector::default()
            .with(Feature::ClassDefinition, true)
            .with(Feature::Lambda, true);
        assert!(RulePredicate::Has(Feature::Lambda).matches(&v));
        assert!(!RulePredicate::Has(Feature::Generator).matches(&v));
        assert!(RulePredicate::All(vec![Feature::ClassDefinition, Feature::Lambda]).matches(&v));
        assert!(!RulePredicate::All(vec![Feature::ClassDefinition, Feature::EvalExec]).matches(&v));
        assert!(RulePredicate::Any(vec![Feature::EvalExec, Feature::Lambda]).matches(&v));
        assert!(!RulePredicate::Any(vec![]).matches(&v));
        assert!(RulePredicate::Always.matches(&v));
    }

    #[test]
    fn test_first_match_follows_order() {
        let rules = RuleSet::default();
        let v = FeatureVector::default()
            .with(Feature::Lambda, true)
            .with(Feature::Generator, true);
        assert_eq!(rules.first_match(&v).name, "generator_pattern");
        assert_eq!(rules.matching(&v).count(), 3);
    }

    #[derive(Debug, Deserialize)]
    struct Doc {
        rules: RuleSet,
    }

    #[test]
    fn test_rule_set_from_toml() {
        let text = r#"
            [[rules]]
            name = "async"
            tier = "HIGH"
            when = { has = "async_await" }

            [[rules]]
            name = "mixed"
            tier = "MEDIUM"
            when = { any = ["lambda", "decorator"] }

            [[rules]]
            name = "rest"
            tier = "LOW"
            when = "always"
        "#;
        let rules = toml::from_str::<Doc>(text).unwrap().rules;
        assert_eq!(rules.rules().len(), 3);
        assert_eq!(
            rules.rules()[1].when,
            RulePredicate::Any(vec![Feature::Lambda, Feature::Decorator])
        );
    }

    #[test]
    fn test_invalid_rule_set_from_toml_fails() {
        let text = r#"
            [[rules]]
            name = "async"
            tier = "HIGH"
            when = { has = "async_await" }
        "#;
        assert!(toml::from_str::<Doc>(text).is_err());
    }

    #[test]
    fn test_rule_set_serializes_as_sequence() {
        let json = serde_json::to_value(RuleSet::default()).unwrap();
        assert_eq!(json.as_array().map(Vec::len), Some(9));
        let back: RuleSet = serde_json::from_value(json).unwrap();
        assert_eq!(back, RuleSet::default());
    }
}
