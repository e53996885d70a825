//! Fact-to-evidence mapping
//!
//! Discretizes facts into network states. A variable whose source fact is
//! absent stays unobserved and gets marginalized by inference.

use super::{vars, BayesianNetwork, Evidence};
use crate::config::EvidenceConfig;
use crate::types::FactSet;

#[derive(Debug, Clone)]
pub struct EvidenceMapper {
    config: EvidenceConfig,
}

impl EvidenceMapper {
    pub fn new(config: EvidenceConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EvidenceConfig {
        &self.config
    }

    /// Evidence over the built-in variable names
    pub fn map(&self, facts: &FactSet) -> Evidence {
        let c = &self.config;
        let mut evidence = Evidence::new();

        evidence.insert(vars::HOME_FORM, self.form_state(facts.home().win_rate()));
        evidence.insert(vars::AWAY_FORM, self.form_state(facts.away().win_rate()));
        evidence.insert(vars::COMPETITION_STAGE, facts.match_fact().competition_stage().as_str());

        if let Some(state) = facts.home().unavailable_fraction().map(|f| self.availability_state(f)) {
            evidence.insert(vars::HOME_AVAILABILITY, state);
        }
        if let Some(state) = facts.away().unavailable_fraction().map(|f| self.availability_state(f)) {
            evidence.insert(vars::AWAY_AVAILABILITY, state);
        }

        if let Some(share) = facts.match_fact().head_to_head().and_then(|h| h.home_share()) {
            let state = if share > c.h2h_home_dominant_above {
                "home_dominant"
            } else if share < c.h2h_away_dominant_below {
                "away_dominant"
            } else {
                "even"
            };
            evidence.insert(vars::HEAD_TO_HEAD, state);
        }

        if let (Some(home_scored), Some(home_conceded), Some(away_scored), Some(away_conceded)) = (
            facts.home().goals_per_match(),
            facts.home().goals_conceded_per_match(),
            facts.away().goals_per_match(),
            facts.away().goals_conceded_per_match(),
        ) {
            evidence.insert(vars::HOME_ATTACK, self.attack_state((home_scored + away_conceded) / 2.0));
            evidence.insert(vars::AWAY_ATTACK, self.attack_state((away_scored + home_conceded) / 2.0));
        }

        evidence
    }

    /// Same as [`map`](Self::map) but drops variables the network does not model
    pub fn map_for(&self, facts: &FactSet, network: &BayesianNetwork) -> Evidence {
        let mut evidence = self.map(facts);
        evidence.retain(|variable| network.contains(variable));
        evidence
    }

    fn form_state(&self, win_rate: f64) -> &'static str {
        if win_rate < self.config.form_poor_below {
            "poor"
        } else if win_rate < self.config.form_good_from {
            "average"
        } else {
            "good"
        }
    }

    fn availability_state(&self, unavailable_fraction: f64) -> &'static str {
        if unavailable_fraction >= self.config.depleted_fraction {
            "depleted"
        } else {
            "full"
        }
    }

    fn attack_state(&self, expected_goals: f64) -> &'static str {
        if expected_goals < self.config.attack_low_below {
            "low"
        } else if expected_goals < self.config.attack_high_from {
            "medium"
        } else {
            "high"
        }
    }
}

impl Default for EvidenceMapper {
    fn default() -> Self {
        Self::new(EvidenceConfig::default())
    }
}
