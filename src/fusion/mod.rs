//! Fusion
//!
//! Blends the rule signals and the network posterior into one verdict:
//! - rule score: signed weight sum over max(1, n), clamped to [-1, 1]
//! - bayes score: 2·P(safe states) − 1
//! - combined: α·rule + (1 − α)·bayes, safe when ≥ 0
//!
//! Pure function of its inputs; no randomness, no clock.


use crate::bayes::Posterior;
use crate::config::FusionConfig;
use crate::rules::Signal;
use crate::types::BetType;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    Safe,
    Risky,
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Classification::Safe => write!(f, "safe"),
            Classification::Risky => write!(f, "risky"),
        }
    }
}

/// Coarse reading of `confidence`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceBand {
    High,
    Medium,
    Low,
}

impl fmt::Display for ConfidenceBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfidenceBand::High => write!(f, "high"),
            ConfidenceBand::Medium => write!(f, "medium"),
            ConfidenceBand::Low => write!(f, "low"),
        }
    }
}

/// Whether rules and network point the same way
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Concordance {
    Agree,
    Disagree,
    /// No signals fired, or they cancelled out
    RulesSilent,
}

impl fmt::Display for Concordance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Concordance::Agree => write!(f, "agree"),
            Concordance::Disagree => write!(f, "disagree"),
            Concordance::RulesSilent => write!(f, "rules silent"),
        }
    }
}

/// Final output for one bet
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Verdict {
    pub bet_type: BetType,
    pub classification: Classification,
    /// |combined score|, within [0, 1]
    pub confidence: f64,
    pub confidence_band: ConfidenceBand,
    pub concordance: Concordance,
    pub rule_score: f64,
    pub bayes_score: f64,
    pub combined_score: f64,
    /// Posterior mass on the bet's safe-consistent states
    pub safe_probability: f64,
    /// Sorted by weight descending, then rule id
    pub contributing_signals: Vec<Signal>,
    pub posterior_summary: Posterior,
    /// Rationales in catalog order, then the posterior sentence
    pub explanation: Vec<String>,
}

impl Verdict {
    pub fn is_safe(&self) -> bool {
        self.classification == Classification::Safe
    }

    /// Explanation as a single paragraph
    pub fn explanation_text(&self) -> String {
        self.explanation.join(". ")
    }
}

/// Stateless score blender
#[derive(Debug, Clone)]
pub struct FusionEngine {
    config: FusionConfig,
}

impl FusionEngine {
    pub fn new(config: FusionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FusionConfig {
        &self.config
    }

    pub fn blend_weight(&self) -> f64 {
        self.config.blend_weight
    }

    /// Mean signed weight; zero signals score 0
    pub fn rule_score(signals: &[Signal]) -> f64 {
        let sum: f64 = signals.iter().map(Signal::signed_weight).sum();
        (sum / signals.len().max(1) as f64).clamp(-1.0, 1.0)
    }

    /// Map a safe-state probability onto [-1, 1]
    pub fn bayes_score(safe_probability: f64) -> f64 {
        (2.0 * safe_probability - 1.0).clamp(-1.0, 1.0)
    }

    pub fn band(&self, confidence: f64) -> ConfidenceBand {
        if confidence >= self.config.high_confidence {
            ConfidenceBand::High
        } else if confidence >= self.config.medium_confidence {
            ConfidenceBand::Medium
        } else {
            ConfidenceBand::Low
        }
    }

    /// Combine `signals` (catalog order) with `posterior` into a verdict
    pub fn fuse<S: AsRef<str>>(
        &self,
        bet_type: BetType,
        signals: Vec<Signal>,
        posterior: Posterior,
        safe_states: &[S],
    ) -> Verdict {
        let alpha = self.config.blend_weight;
        let rule_score = Self::rule_score(&signals);
        let safe_probability = posterior.probability_of(safe_states).clamp(0.0, 1.0);
        let bayes_score = Self::bayes_score(safe_probability);
        let combined_score = (alpha * rule_score + (1.0 - alpha) * bayes_score).clamp(-1.0, 1.0);

        let classification = if combined_score >= 0.0 {
            Classification::Safe
        } else {
            Classification::Risky
        };
        let confidence = combined_score.abs().clamp(0.0, 1.0);

        let concordance = if rule_score == 0.0 {
            Concordance::RulesSilent
        } else if (rule_score > 0.0) == (bayes_score >= 0.0) {
            Concordance::Agree
        } else {
            Concordance::Disagree
        };

        let mut explanation: Vec<String> = signals.iter().map(|s| s.rationale().to_string()).collect();
        explanation.push(posterior_sentence(&posterior, safe_states, safe_probability));

        let mut contributing_signals = signals;
        contributing_signals.sort_by(|a, b| {
            b.weight()
                .total_cmp(&a.weight())
                .then_with(|| a.rule_id().cmp(b.rule_id()))
        });

        tracing::debug!(
            bet = %bet_type,
            rule_score,
            bayes_score,
            combined_score,
            %classification,
            "fused verdict"
        );

        Verdict {
            bet_type,
            classification,
            confidence,
            confidence_band: self.band(confidence),
            concordance,
            rule_score,
            bayes_score,
            combined_score,
            safe_probability,
            contributing_signals,
            posterior_summary: posterior,
            explanation,
        }
    }
}

impl Default for FusionEngine {
    fn default() -> Self {
        Self::new(FusionConfig::default())
    }
}

fn posterior_sentence<S: AsRef<str>>(posterior: &Posterior, safe_states: &[S], probability: f64) -> String {
    let states: Vec<&str> = safe_states.iter().map(|s| s.as_ref()).collect();
    format!(
        "Bayesian network: P({} = {}) = {:.1}%",
        posterior.variable(),
        states.join(" or "),
        probability * 100.0
    )
}
