//! `criba.toml` configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::corpus::LoadOptions;
use crate::error::{CribaError, Result};
use crate::gate::CategoryPassPolicy;
use crate::golden::{validate_targets, GoldenRanking, GoldenTarget, DEFAULT_QUOTA};
use crate::labeling::RuleSet;
use crate::localization::SbflFormula;
use crate::quality::Grade;
use crate::sampling::AllocationPolicy;

/// Default configuration file name, looked up in the working directory
pub const CONFIG_FILENAME: &str = "criba.toml";

/// Pipeline configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CribaConfig {
    /// Corpus loading
    pub loader: LoaderConfig,

    /// Risk labeling rules
    pub labeling: LabelingConfig,

    /// Quality report settings
    pub report: ReportConfig,

    /// Regression gate settings
    pub gate: GateConfig,

    /// HITL sampling settings
    pub sampling: SamplingConfig,

    /// Golden trace curation settings
    pub golden: GoldenConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Largest tolerated fraction of malformed rows
    pub max_skip_ratio: f64,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            max_skip_ratio: LoadOptions::default().max_skip_ratio,
        }
    }
}

impl LoaderConfig {
    pub fn options(&self) -> LoadOptions {
        LoadOptions {
            max_skip_ratio: self.max_skip_ratio,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelingConfig {
    /// Ordered rules, validated on load
    pub rules: RuleSet,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Fail `report` when the global grade is worse than this
    pub min_grade: Option<Grade>,

    /// Suspicious features listed in the report
    pub top_suspicious: usize,

    /// Formula for feature suspiciousness
    pub formula: SbflFormula,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            min_grade: None,
            top_suspicious: 5,
            formula: SbflFormula::Tarantula,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    /// When a category counts as passing
    pub policy: CategoryPassPolicy,

    /// Baseline report location
    pub baseline: PathBuf,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            policy: CategoryPassPolicy::Any,
            baseline: PathBuf::from("baseline.json"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    pub fraction: f64,
    pub seed: u64,
    #[serde(flatten)]
    pub policy: AllocationPolicy,

    /// Where samples are written and summarized from
    pub reviews_dir: PathBuf,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            fraction: 0.05,
            seed: 42,
            policy: AllocationPolicy::default(),
            reviews_dir: PathBuf::from("hitl_reviews"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GoldenConfig {
    /// Target codes with quotas, in priority order
    pub targets: Vec<GoldenTarget>,

    pub ranking: GoldenRanking,
}

impl Default for GoldenConfig {
    fn default() -> Self {
        Self {
            targets: GoldenTarget::defaults(DEFAULT_QUOTA),
            ranking: GoldenRanking::IsolatedFirst,
        }
    }
}

impl CribaConfig {
    /// Load from `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| CribaError::input(path, e))?;
        let config: Self = toml::from_str(&content).map_err(|e| CribaError::input(path, e))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` if it exists; defaults otherwise.
    /// Malformed files are an error.
    pub fn load_optional(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Range checks serde cannot express.
    pub fn validate(&self) -> Result<()> {
        let ratio = self.loader.max_skip_ratio;
        if !(0.0..=1.0).contains(&ratio) {
            return Err(CribaError::config(format!(
                "loader.max_skip_ratio must be in [0, 1], got {}",
                ratio
            )));
        }
        let fraction = self.sampling.fraction;
        if !(fraction > 0.0 && fraction <= 1.0) {
            return Err(CribaError::config(format!(
                "sampling.fraction must be in (0, 1], got {}",
                fraction
            )));
        }
        validate_targets(&self.golden.targets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::labeling::RiskTier;
    use crate::sampling::Rounding;
    use tempfile::TempDir;

    // ============================================================================
    // DEFAULT VALUE TESTS
    // ============================================================================

    #[test]
    fn test_criba_config_default() {
        let config = CribaConfig::default();

        assert_eq!(config.loader.max_skip_ratio, 0.2);
        assert_eq!(config.labeling.rules, RuleSet::default());
        assert_eq!(config.report.min_grade, None);
        assert_eq!(config.gate.policy, CategoryPassPolicy::Any);
        assert_eq!(config.sampling.fraction, 0.05);
        assert_eq!(config.sampling.seed, 42);
        assert_eq!(config.sampling.reviews_dir, PathBuf::from("hitl_reviews"));
        assert_eq!(config.golden.targets.len(), 5);
        assert!(config.validate().is_ok());
    }

    // ============================================================================
    // LOADING TESTS
    // ============================================================================

    #[test]
    fn test_load_optional_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = CribaConfig::load_optional(&dir.path().join(CONFIG_FILENAME)).unwrap();
        assert_eq!(config, CribaConfig::default());
    }

    #[test]
    fn test_load_partial_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILENAME);
        std::fs::write(
            &path,
            r#"
[loader]
max_skip_ratio = 0.05

[report]
min_grade = "B"

[gate]
policy = "all"

[sampling]
fraction = 0.1
rounding = "floor"
at_least_one = false

[golden]
ranking = "id_order"
targets = [{ code = "E0382", quota = 3 }]
"#,
        )
        .unwrap();

        let config = CribaConfig::load(&path).unwrap();
        assert_eq!(config.loader.max_skip_ratio, 0.05);
        assert_eq!(config.report.min_grade, Some(Grade::B));
        assert_eq!(config.report.top_suspicious, 5);
        assert_eq!(config.gate.policy, CategoryPassPolicy::All);
        assert_eq!(config.sampling.policy.rounding, Rounding::Floor);
        assert!(!config.sampling.policy.at_least_one);
        assert_eq!(config.sampling.seed, 42);
        assert_eq!(config.golden.ranking, GoldenRanking::IdOrder);
        assert_eq!(config.golden.targets, vec![GoldenTarget::new("E0382", 3)]);
        assert_eq!(config.labeling.rules, RuleSet::default());
    }

    #[test]
    fn test_load_custom_rules() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILENAME);
        std::fs::write(
            &path,
            r#"
[[labeling.rules]]
name = "eval"
tier = "HIGH"
when = { has = "eval_exec" }

[[labeling.rules]]
name = "rest"
tier = "LOW"
when = "always"
"#,
        )
        .unwrap();

        let config = CribaConfig::load(&path).unwrap();
        let rules = config.labeling.rules.rules();
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].tier, RiskTier::High);
    }

    #[test]
    fn test_load_rejects_invalid_rules() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILENAME);
        std::fs::write(
            &path,
            r#"
[[labeling.rules]]
name = "rest"
tier = "LOW"
when = "always"

[[labeling.rules]]
name = "eval"
tier = "HIGH"
when = { has = "eval_exec" }
"#,
        )
        .unwrap();
        assert!(matches!(
            CribaConfig::load(&path),
            Err(CribaError::Input { .. })
        ));
    }

    #[test]
    fn test_load_malformed_toml_is_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILENAME);
        std::fs::write(&path, "[loader\nmax_skip_ratio = ").unwrap();
        assert!(CribaConfig::load_optional(&path).is_err());
    }

    #[test]
    fn test_validate_ranges() {
        let mut config = CribaConfig::default();
        config.sampling.fraction = 0.0;
        assert!(matches!(config.validate(), Err(CribaError::Config(_))));

        let mut config = CribaConfig::default();
        config.loader.max_skip_ratio = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_rejects_repeated_golden_code() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILENAME);
        std::fs::write(
            &path,
            r#"
[golden]
targets = [{ code = "E0308", quota = 2 }, { code = "E0308", quota = 2 }]
"#,
        )
        .unwrap();
        assert!(matches!(
            CribaConfig::load(&path),
            Err(CribaError::Config(_))
        ));
    }

    #[test]
    fn test_validate_rejects_empty_golden_targets() {
        let mut config = CribaConfig::default();
        config.golden.targets.clear();
        assert!(matches!(config.validate(), Err(CribaError::Config(_))));
    }
}
