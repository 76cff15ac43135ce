//! Match configuration: signal weights, level adjacency, vocabulary, semantic toggle.
//!
//! Loaded once at startup (optionally from a JSON file) and validated before
//! the server accepts requests. Invalid values are rejected, never clamped.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::match_result::EffectiveWeights;
use crate::models::profile::EducationLevel;
use crate::rules::vocabulary::{FieldVocabulary, VocabularyError};

const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("weight '{name}' must be a finite, non-negative number (got {value})")]
    InvalidWeight { name: &'static str, value: f64 },

    #[error("weights must sum to 1.0 (got {0:.6})")]
    WeightSum(f64),

    #[error("at least one of the level, field or lexical weights must be positive")]
    NoNonSemanticWeight,

    #[error("unknown education level '{0}' in level adjacency table (expected bachelor, master or phd)")]
    UnknownLevel(String),

    #[error("level adjacency entry pairs '{0}' with itself")]
    SelfAdjacency(String),

    #[error("conflicting adjacency credits for {a} and {b}: {first} vs {second}")]
    AsymmetricAdjacency {
        a: EducationLevel,
        b: EducationLevel,
        first: f64,
        second: f64,
    },

    #[error("{name} must lie in [0, 1] (got {value})")]
    OutOfRange { name: String, value: f64 },

    #[error("top_k must be at least 1")]
    ZeroTopK,

    #[error(transparent)]
    Vocabulary(#[from] VocabularyError),
}

/// Relative importance of each sub-score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Weights {
    pub level: f64,
    pub field: f64,
    pub lexical: f64,
    pub semantic: f64,
}

impl Default for Weights {
    fn default() -> Self {
        Self {
            level: 0.2,
            field: 0.2,
            lexical: 0.35,
            semantic: 0.25,
        }
    }
}

impl Weights {
    pub fn sum(&self) -> f64 {
        self.level + self.field + self.lexical + self.semantic
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("level", self.level),
            ("field", self.field),
            ("lexical", self.lexical),
            ("semantic", self.semantic),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidWeight { name, value });
            }
        }
        let sum = self.sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(ConfigError::WeightSum(sum));
        }
        if self.level + self.field + self.lexical <= 0.0 {
            return Err(ConfigError::NoNonSemanticWeight);
        }
        Ok(())
    }

    /// Weights applied in a run. Without the semantic signal its share is
    /// redistributed proportionally so the rest still sum to 1.0.
    pub fn effective(&self, semantic_active: bool) -> EffectiveWeights {
        if semantic_active {
            return EffectiveWeights {
                level: self.level,
                field: self.field,
                lexical: self.lexical,
                semantic: self.semantic,
            };
        }
        let rest = self.level + self.field + self.lexical;
        EffectiveWeights {
            level: self.level / rest,
            field: self.field / rest,
            lexical: self.lexical / rest,
            semantic: 0.0,
        }
    }
}

/// One adjacency entry as written in the configuration file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdjacencyEntry {
    pub between: [String; 2],
    pub credit: f64,
}

/// Partial credit between two different known levels. Symmetric; pairs not
/// listed are a hard mismatch (0.0).
#[derive(Debug, Clone, PartialEq)]
pub struct LevelAdjacency {
    credits: BTreeMap<(EducationLevel, EducationLevel), f64>,
}

impl Default for LevelAdjacency {
    fn default() -> Self {
        let mut credits = BTreeMap::new();
        credits.insert(key(EducationLevel::Bachelor, EducationLevel::Master), 0.5);
        credits.insert(key(EducationLevel::Master, EducationLevel::PhD), 0.5);
        credits.insert(key(EducationLevel::Bachelor, EducationLevel::PhD), 0.0);
        Self { credits }
    }
}

fn key(a: EducationLevel, b: EducationLevel) -> (EducationLevel, EducationLevel) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

fn parse_level(name: &str) -> Result<EducationLevel, ConfigError> {
    match name.trim().to_lowercase().as_str() {
        "bachelor" => Ok(EducationLevel::Bachelor),
        "master" => Ok(EducationLevel::Master),
        "phd" => Ok(EducationLevel::PhD),
        _ => Err(ConfigError::UnknownLevel(name.to_string())),
    }
}

impl LevelAdjacency {
    pub fn from_entries(entries: &[AdjacencyEntry]) -> Result<Self, ConfigError> {
        let mut credits = BTreeMap::new();
        for entry in entries {
            let a = parse_level(&entry.between[0])?;
            let b = parse_level(&entry.between[1])?;
            if a == b {
                return Err(ConfigError::SelfAdjacency(entry.between[0].clone()));
            }
            check_unit_range(&format!("adjacency credit for {a} and {b}"), entry.credit)?;
            if let Some(&first) = credits.get(&key(a, b)) {
                if first != entry.credit {
                    return Err(ConfigError::AsymmetricAdjacency {
                        a,
                        b,
                        first,
                        second: entry.credit,
                    });
                }
            }
            credits.insert(key(a, b), entry.credit);
        }
        Ok(Self { credits })
    }

    /// Credit for two distinct known levels.
    pub fn credit(&self, a: EducationLevel, b: EducationLevel) -> f64 {
        self.credits.get(&key(a, b)).copied().unwrap_or(0.0)
    }
}

fn check_unit_range(name: &str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            name: name.to_string(),
            value,
        })
    }
}

/// On-disk shape of the match configuration. Every key is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MatchConfigFile {
    pub top_k: Option<usize>,
    pub weights: Option<Weights>,
    pub level_adjacency: Option<Vec<AdjacencyEntry>>,
    pub unknown_level_credit: Option<f64>,
    #[serde(default)]
    pub field_vocabulary: BTreeMap<String, Vec<String>>,
    pub enable_semantic: Option<bool>,
    pub explanation_threshold: Option<f64>,
}

/// Validated configuration for ranking runs.
#[derive(Debug, Clone)]
pub struct MatchConfig {
    pub top_k: Option<usize>,
    pub weights: Weights,
    pub level_adjacency: LevelAdjacency,
    /// Level sub-score when either side's level is unknown.
    pub unknown_level_credit: f64,
    pub field_vocabulary: FieldVocabulary,
    pub enable_semantic: bool,
    /// Minimum sub-score for a signal to be listed in an explanation.
    pub explanation_threshold: f64,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            top_k: None,
            weights: Weights::default(),
            level_adjacency: LevelAdjacency::default(),
            unknown_level_credit: 0.5,
            field_vocabulary: FieldVocabulary::builtin(),
            enable_semantic: true,
            explanation_threshold: 0.1,
        }
    }
}

impl MatchConfig {
    pub fn from_file_config(file: MatchConfigFile) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let level_adjacency = match file.level_adjacency {
            Some(entries) => LevelAdjacency::from_entries(&entries)?,
            None => defaults.level_adjacency,
        };
        let field_vocabulary = if file.field_vocabulary.is_empty() {
            defaults.field_vocabulary
        } else {
            FieldVocabulary::with_extensions(&file.field_vocabulary)?
        };

        let config = Self {
            top_k: file.top_k,
            weights: file.weights.unwrap_or(defaults.weights),
            level_adjacency,
            unknown_level_credit: file
                .unknown_level_credit
                .unwrap_or(defaults.unknown_level_credit),
            field_vocabulary,
            enable_semantic: file.enable_semantic.unwrap_or(defaults.enable_semantic),
            explanation_threshold: file
                .explanation_threshold
                .unwrap_or(defaults.explanation_threshold),
        };
        config.validate()?;
        Ok(config)
    }

    /// Applies environment overrides, then re-validates.
    pub fn with_overrides(
        mut self,
        enable_semantic: Option<bool>,
        top_k: Option<usize>,
    ) -> Result<Self, ConfigError> {
        if let Some(enabled) = enable_semantic {
            self.enable_semantic = enabled;
        }
        if top_k.is_some() {
            self.top_k = top_k;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.weights.validate()?;
        check_unit_range("unknown_level_credit", self.unknown_level_credit)?;
        check_unit_range("explanation_threshold", self.explanation_threshold)?;
        if self.top_k == Some(0) {
            return Err(ConfigError::ZeroTopK);
        }
        Ok(())
    }
}

/// Reads the optional JSON configuration file; built-in defaults when no path is given.
pub fn load_match_config(path: Option<&Path>) -> Result<MatchConfig> {
    let file = match path {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read match config '{}'", path.display()))?;
            serde_json::from_str::<MatchConfigFile>(&raw)
                .with_context(|| format!("Match config '{}' is not valid JSON", path.display()))?
        }
        None => MatchConfigFile::default(),
    };
    MatchConfig::from_file_config(file).context("Invalid match configuration")
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn entry(a: &str, b: &str, credit: f64) -> AdjacencyEntry {
        AdjacencyEntry {
            between: [a.to_string(), b.to_string()],
            credit,
        }
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(MatchConfig::default().validate().is_ok());
        assert!((Weights::default().sum() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_effective_weights_redistribute_semantic_share() {
        let w = Weights::default();
        let eff = w.effective(false);
        assert_eq!(eff.semantic, 0.0);
        let sum = eff.level + eff.field + eff.lexical;
        assert!((sum - 1.0).abs() < 1e-9, "sum was {sum}");
        // proportions between remaining signals are preserved
        assert!((eff.level / eff.lexical - w.level / w.lexical).abs() < 1e-9);
    }

    #[test]
    fn test_effective_weights_unchanged_when_semantic_active() {
        let w = Weights::default();
        let eff = w.effective(true);
        assert_eq!(eff.semantic, w.semantic);
        assert_eq!(eff.lexical, w.lexical);
    }

    #[test]
    fn test_weights_not_summing_to_one_rejected() {
        let config = MatchConfig {
            weights: Weights {
                level: 0.5,
                field: 0.5,
                lexical: 0.5,
                semantic: 0.0,
            },
            ..MatchConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::WeightSum(_))));
    }

    #[test]
    fn test_negative_weight_rejected() {
        let config = MatchConfig {
            weights: Weights {
                level: -0.2,
                field: 0.4,
                lexical: 0.5,
                semantic: 0.3,
            },
            ..MatchConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidWeight {
                name: "level",
                value: -0.2
            })
        );
    }

    #[test]
    fn test_semantic_only_weights_rejected() {
        let config = MatchConfig {
            weights: Weights {
                level: 0.0,
                field: 0.0,
                lexical: 0.0,
                semantic: 1.0,
            },
            ..MatchConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::NoNonSemanticWeight));
    }

    #[test]
    fn test_zero_top_k_rejected() {
        let config = MatchConfig {
            top_k: Some(0),
            ..MatchConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroTopK));
    }

    #[test]
    fn test_env_overrides_applied_and_validated() {
        let config = MatchConfig::default()
            .with_overrides(Some(false), Some(3))
            .unwrap();
        assert!(!config.enable_semantic);
        assert_eq!(config.top_k, Some(3));

        let unchanged = MatchConfig::default().with_overrides(None, None).unwrap();
        assert!(unchanged.enable_semantic);

        let err = MatchConfig::default().with_overrides(None, Some(0)).unwrap_err();
        assert_eq!(err, ConfigError::ZeroTopK);
    }

    #[test]
    fn test_adjacency_is_symmetric() {
        let adj = LevelAdjacency::default();
        assert_eq!(
            adj.credit(EducationLevel::Bachelor, EducationLevel::Master),
            adj.credit(EducationLevel::Master, EducationLevel::Bachelor)
        );
        assert_eq!(adj.credit(EducationLevel::PhD, EducationLevel::Bachelor), 0.0);
    }

    #[test]
    fn test_adjacency_unknown_level_rejected() {
        let err = LevelAdjacency::from_entries(&[entry("bachelor", "postdoc", 0.3)]).unwrap_err();
        assert_eq!(err, ConfigError::UnknownLevel("postdoc".to_string()));
    }

    #[test]
    fn test_adjacency_conflicting_directions_rejected() {
        let err = LevelAdjacency::from_entries(&[
            entry("bachelor", "master", 0.5),
            entry("Master", "Bachelor", 0.3),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::AsymmetricAdjacency { .. }));
    }

    #[test]
    fn test_adjacency_credit_out_of_range_rejected() {
        let err = LevelAdjacency::from_entries(&[entry("master", "phd", 1.5)]).unwrap_err();
        assert!(matches!(err, ConfigError::OutOfRange { .. }));
    }

    #[test]
    fn test_adjacency_self_pair_rejected() {
        let err = LevelAdjacency::from_entries(&[entry("phd", "PhD", 0.5)]).unwrap_err();
        assert_eq!(err, ConfigError::SelfAdjacency("phd".to_string()));
    }

    #[test]
    fn test_file_config_applies_overrides() {
        let json = r#"{
            "top_k": 5,
            "weights": {"level": 0.25, "field": 0.25, "lexical": 0.5, "semantic": 0.0},
            "level_adjacency": [{"between": ["bachelor", "master"], "credit": 0.75}],
            "field_vocabulary": {"robotics": ["robotique"]},
            "enable_semantic": false
        }"#;
        let file: MatchConfigFile = serde_json::from_str(json).unwrap();
        let config = MatchConfig::from_file_config(file).unwrap();
        assert_eq!(config.top_k, Some(5));
        assert!(!config.enable_semantic);
        assert_eq!(
            config
                .level_adjacency
                .credit(EducationLevel::Master, EducationLevel::Bachelor),
            0.75
        );
        // pairs absent from a supplied table are hard mismatches
        assert_eq!(
            config
                .level_adjacency
                .credit(EducationLevel::Master, EducationLevel::PhD),
            0.0
        );
        assert!(config
            .field_vocabulary
            .fields_in("robotique avancée")
            .contains("robotics"));
    }

    #[test]
    fn test_file_config_unknown_key_rejected() {
        let result = serde_json::from_str::<MatchConfigFile>(r#"{"wieghts": {}}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_load_match_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"explanation_threshold": 0.2}}"#).unwrap();
        let config = load_match_config(Some(file.path())).unwrap();
        assert_eq!(config.explanation_threshold, 0.2);
        assert!(config.enable_semantic);
    }

    #[test]
    fn test_load_match_config_reports_invalid_values() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"unknown_level_credit": 2.0}}"#).unwrap();
        let err = load_match_config(Some(file.path())).unwrap_err();
        assert!(format!("{err:#}").contains("unknown_level_credit"));
    }

    #[test]
    fn test_load_match_config_without_path_uses_defaults() {
        let config = load_match_config(None).unwrap();
        assert_eq!(config.top_k, None);
        assert_eq!(config.weights, Weights::default());
    }
}
