// src/config.rs
//! Scoring configuration: feature weights, fallback preferences and the
//! application-system policy. Loaded from TOML with every field optional;
//! a missing or unreadable file falls back to the built-in defaults so the
//! service always starts.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

pub const SCORING_CONFIG_ENV: &str = "SCORING_CONFIG_PATH";
const DEFAULT_SCORING_CONFIG_PATH: &str = "config/scoring.toml";

/// Per-feature weights. The compatibility score divides by the weight sum of
/// the features that actually evaluated, so these behave as relative
/// importances rather than absolute points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureWeights {
    pub country_match: f32,
    pub language_match: f32,
    pub campus_setting_match: f32,
    pub major_match: f32,
    pub application_system_match: f32,
    pub accreditation_match: f32,
}

impl Default for FeatureWeights {
    fn default() -> Self {
        Self {
            country_match: 0.20,
            language_match: 0.20,
            campus_setting_match: 0.20,
            major_match: 0.20,
            application_system_match: 0.10,
            accreditation_match: 0.10,
        }
    }
}

impl FeatureWeights {
    pub fn sum(&self) -> f32 {
        self.country_match
            + self.language_match
            + self.campus_setting_match
            + self.major_match
            + self.application_system_match
            + self.accreditation_match
    }

    /// Off-balance weights are legal (normalization absorbs them) but almost
    /// always a config typo, so say so once at load time.
    pub fn warn_if_unbalanced(&self) {
        let sum = self.sum();
        if (sum - 1.0).abs() > 1e-3 {
            warn!(
                sum,
                "feature weights do not sum to 1.0; scores stay normalized over evaluable weight"
            );
        }
    }
}

/// Fallback preferences applied when a student record leaves the
/// corresponding field empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchDefaults {
    pub desired_majors: Vec<String>,
    pub desired_accreditations: Vec<String>,
    pub desired_application_system: Option<String>,
}

impl Default for MatchDefaults {
    fn default() -> Self {
        Self {
            desired_majors: vec!["architecture".to_string()],
            desired_accreditations: vec!["RIBA".to_string(), "ARB".to_string()],
            desired_application_system: None,
        }
    }
}

/// What to do about the application-system feature when no desired system is
/// configured in [`MatchDefaults`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationSystemPolicy {
    /// Leave the feature unevaluated, like any other missing field.
    #[default]
    SkipWhenUnset,
    /// Expect the conventional system of the university's country: UCAS for
    /// UK universities, direct applications everywhere else.
    InferFromCountry,
}

impl ApplicationSystemPolicy {
    /// The system conventionally used in a country (canonical token), when
    /// inference is on.
    pub fn implied_system(&self, country_token: &str) -> Option<&'static str> {
        match self {
            ApplicationSystemPolicy::SkipWhenUnset => None,
            ApplicationSystemPolicy::InferFromCountry => {
                Some(match country_token {
                    "gb" | "uk" | "united_kingdom" => "ucas",
                    _ => "direct",
                })
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub weights: FeatureWeights,
    pub defaults: MatchDefaults,
    pub application_system_policy: ApplicationSystemPolicy,
}

impl ScoringConfig {
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading scoring config at {}", path.display()))?;
        let config: Self = toml::from_str(&raw)
            .with_context(|| format!("parsing scoring config at {}", path.display()))?;
        config.weights.warn_if_unbalanced();
        Ok(config)
    }

    /// Resolve `SCORING_CONFIG_PATH` (or the conventional location) and load.
    /// An absent file falls back to the built-in defaults; a present but
    /// malformed file is a startup error.
    pub fn load() -> Result<Self> {
        let path =
            env::var(SCORING_CONFIG_ENV).unwrap_or_else(|_| DEFAULT_SCORING_CONFIG_PATH.to_string());
        let path = Path::new(&path);
        if !path.exists() {
            debug!(path = %path.display(), "no scoring config file; using built-in defaults");
            return Ok(Self::default());
        }
        let config = Self::from_toml_file(path)?;
        info!(path = %path.display(), "loaded scoring config");
        Ok(config)
    }
}
