//! Configuration
//!
//! Loaded once at startup and read-only afterwards. Every section has
//! defaults, so an empty or missing file yields a working evaluator.

use crate::bayes::{vars, InferenceMethod};
use crate::error::{EngineError, Result};
use crate::rules::catalog::{default_catalog, RuleSpec};
use crate::types::BetType;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

/// Environment variable prefix, e.g. `SAFEBET_FUSION__BLEND_WEIGHT=0.6`
pub const ENV_PREFIX: &str = "SAFEBET";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub fusion: FusionConfig,
    /// Ordered rule catalog; order is the signal tie-break basis
    #[serde(default = "default_catalog")]
    pub rules: Vec<RuleSpec>,
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub evidence: EvidenceConfig,
    #[serde(default = "default_outcomes")]
    pub outcomes: Vec<OutcomeMapping>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            fusion: FusionConfig::default(),
            rules: default_catalog(),
            network: NetworkConfig::default(),
            evidence: EvidenceConfig::default(),
            outcomes: default_outcomes(),
        }
    }
}

impl Config {
    /// Load from a TOML file (optional) layered with `SAFEBET_*` environment overrides
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path.as_ref()).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;
        let config: Config = settings.try_deserialize()?;
        config.validate()?;
        tracing::debug!(path = %path.as_ref().display(), rules = config.rules.len(), "configuration loaded");
        Ok(config)
    }

    /// Range and consistency checks that do not need the network
    pub fn validate(&self) -> Result<()> {
        self.fusion.validate()?;
        self.evidence.validate()?;

        let mut seen = BTreeSet::new();
        for rule in &self.rules {
            if !seen.insert(rule.id()) {
                return Err(EngineError::Config(format!("rule '{}' is listed twice", rule.id())));
            }
            rule.validate()?;
        }

        self.network.inference.validate()?;

        let mut mapped = BTreeSet::new();
        for outcome in &self.outcomes {
            if !mapped.insert(outcome.bet_type) {
                return Err(EngineError::Config(format!(
                    "bet type '{}' has more than one outcome mapping",
                    outcome.bet_type
                )));
            }
            if outcome.safe_states.is_empty() {
                return Err(EngineError::Config(format!(
                    "bet type '{}' has no safe-consistent states",
                    outcome.bet_type
                )));
            }
        }
        if let Some(missing) = BetType::ALL.iter().find(|b| !mapped.contains(*b)) {
            return Err(EngineError::Config(format!("bet type '{}' has no outcome mapping", missing)));
        }
        Ok(())
    }

    pub fn outcome_for(&self, bet_type: BetType) -> Option<&OutcomeMapping> {
        self.outcomes.iter().find(|o| o.bet_type == bet_type)
    }
}

/// Blend of rule and network scores
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusionConfig {
    /// α: weight of the rule score; the network gets 1 − α
    #[serde(default = "default_blend_weight")]
    pub blend_weight: f64,
    /// Confidence at or above this is reported as high
    #[serde(default = "default_high_confidence")]
    pub high_confidence: f64,
    #[serde(default = "default_medium_confidence")]
    pub medium_confidence: f64,
}

fn default_blend_weight() -> f64 {
    0.5
}

fn default_high_confidence() -> f64 {
    0.5
}

fn default_medium_confidence() -> f64 {
    0.2
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            blend_weight: default_blend_weight(),
            high_confidence: default_high_confidence(),
            medium_confidence: default_medium_confidence(),
        }
    }
}

impl FusionConfig {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.blend_weight) {
            return Err(EngineError::Config(format!(
                "blend_weight must be within [0, 1], got {}",
                self.blend_weight
            )));
        }
        if !(0.0..=1.0).contains(&self.medium_confidence)
            || !(0.0..=1.0).contains(&self.high_confidence)
            || self.medium_confidence > self.high_confidence
        {
            return Err(EngineError::Config(format!(
                "confidence bands must satisfy 0 <= medium <= high <= 1, got {} / {}",
                self.medium_confidence, self.high_confidence
            )));
        }
        Ok(())
    }
}

/// Network source and inference method
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// JSON network definition; the built-in football network when absent
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub inference: InferenceMethod,
}

/// Discretization thresholds for fact-to-evidence mapping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvidenceConfig {
    /// Win rate below this is "poor" form
    pub form_poor_below: f64,
    /// Win rate at or above this is "good" form
    pub form_good_from: f64,
    /// Unavailable share of key players that makes a squad "depleted"
    pub depleted_fraction: f64,
    pub h2h_home_dominant_above: f64,
    pub h2h_away_dominant_below: f64,
    /// Expected goals per team below this is a "low" attack
    pub attack_low_below: f64,
    pub attack_high_from: f64,
}

impl Default for EvidenceConfig {
    fn default() -> Self {
        Self {
            form_poor_below: 0.4,
            form_good_from: 0.7,
            depleted_fraction: 0.25,
            h2h_home_dominant_above: 0.6,
            h2h_away_dominant_below: 0.4,
            attack_low_below: 1.0,
            attack_high_from: 1.8,
        }
    }
}

impl EvidenceConfig {
    pub fn validate(&self) -> Result<()> {
        if self.form_poor_below > self.form_good_from {
            return Err(EngineError::Config("form_poor_below must not exceed form_good_from".into()));
        }
        if self.h2h_away_dominant_below > self.h2h_home_dominant_above {
            return Err(EngineError::Config(
                "h2h_away_dominant_below must not exceed h2h_home_dominant_above".into(),
            ));
        }
        if self.attack_low_below > self.attack_high_from {
            return Err(EngineError::Config("attack_low_below must not exceed attack_high_from".into()));
        }
        if !(0.0..=1.0).contains(&self.depleted_fraction) {
            return Err(EngineError::Config("depleted_fraction must be within [0, 1]".into()));
        }
        Ok(())
    }
}

/// Which network variable settles a bet, and which of its states mean "safe"
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeMapping {
    pub bet_type: BetType,
    pub variable: String,
    pub safe_states: Vec<String>,
}

impl OutcomeMapping {
    pub fn new(bet_type: BetType, variable: &str, safe_states: &[&str]) -> Self {
        Self {
            bet_type,
            variable: variable.to_string(),
            safe_states: safe_states.iter().map(|s| s.to_string()).collect(),
        }
    }
}

pub fn default_outcomes() -> Vec<OutcomeMapping> {
    vec![
        OutcomeMapping::new(BetType::HomeWin, vars::MATCH_OUTCOME, &["home_win"]),
        OutcomeMapping::new(BetType::Draw, vars::MATCH_OUTCOME, &["draw"]),
        OutcomeMapping::new(BetType::AwayWin, vars::MATCH_OUTCOME, &["away_win"]),
        OutcomeMapping::new(BetType::Over, vars::TOTAL_GOALS, &["over"]),
        OutcomeMapping::new(BetType::Under, vars::TOTAL_GOALS, &["under"]),
        OutcomeMapping::new(BetType::BttsYes, vars::BOTH_TEAMS_SCORE, &["yes"]),
        OutcomeMapping::new(BetType::BttsNo, vars::BOTH_TEAMS_SCORE, &["no"]),
    ]
}
