//! Bayesian evidence module
//!
//! Propagates observed evidence through a fixed discrete network and returns
//! the posterior over an outcome variable:
//! - Network definition and structural validation
//! - Exact inference by variable elimination (default)
//! - Seeded likelihood weighting as an approximate fallback
//! - Fact-to-evidence discretization
//!
//! Unobserved variables are marginalized, never defaulted, so partial
//! evidence is always valid input.

mod elimination;
pub mod evidence;
mod factor;
pub mod football;
pub mod network;
pub mod sampling;


pub use evidence::EvidenceMapper;
pub use football::{football_definition, football_network};
pub use network::{BayesianNetwork, NetworkDefinition, NodeDefinition, PROBABILITY_TOLERANCE};
pub use sampling::SamplerSettings;

use crate::error::{EngineError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Variable names of the built-in network
pub mod vars {
    pub const HOME_FORM: &str = "home_form";
    pub const AWAY_FORM: &str = "away_form";
    pub const HOME_AVAILABILITY: &str = "home_availability";
    pub const AWAY_AVAILABILITY: &str = "away_availability";
    pub const HOME_STRENGTH: &str = "home_strength";
    pub const AWAY_STRENGTH: &str = "away_strength";
    pub const COMPETITION_STAGE: &str = "competition_stage";
    pub const HEAD_TO_HEAD: &str = "head_to_head_history";
    pub const MATCH_OUTCOME: &str = "match_outcome";
    pub const HOME_ATTACK: &str = "home_attack";
    pub const AWAY_ATTACK: &str = "away_attack";
    pub const TOTAL_GOALS: &str = "total_goals";
    pub const BOTH_TEAMS_SCORE: &str = "both_teams_score";
}

/// Observed variable assignments, ordered by variable name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Evidence {
    observations: BTreeMap<String, String>,
}

impl Evidence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn observe(mut self, variable: impl Into<String>, state: impl Into<String>) -> Self {
        self.insert(variable, state);
        self
    }

    pub fn insert(&mut self, variable: impl Into<String>, state: impl Into<String>) {
        self.observations.insert(variable.into(), state.into());
    }

    pub fn remove(&mut self, variable: &str) -> Option<String> {
        self.observations.remove(variable)
    }

    pub fn retain(&mut self, mut keep: impl FnMut(&str) -> bool) {
        self.observations.retain(|variable, _| keep(variable));
    }

    pub fn get(&self, variable: &str) -> Option<&str> {
        self.observations.get(variable).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.observations.iter().map(|(v, s)| (v.as_str(), s.as_str()))
    }
}

/// Probability of a single outcome state
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateProbability {
    pub state: String,
    pub probability: f64,
}

/// Posterior distribution over one variable. Always sums to 1 ± 1e-6.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Posterior {
    variable: String,
    distribution: Vec<StateProbability>,
}

impl Posterior {
    /// Build from explicit probabilities, rejecting anything that is not a distribution
    pub fn new(variable: impl Into<String>, distribution: Vec<(String, f64)>) -> Result<Self> {
        let variable = variable.into();
        if distribution.is_empty() {
            return Err(EngineError::InvalidPosterior(format!("'{}' has no states", variable)));
        }
        if distribution.iter().any(|(_, p)| !p.is_finite() || *p < 0.0) {
            return Err(EngineError::InvalidPosterior(format!(
                "'{}' has a negative or non-finite probability",
                variable
            )));
        }
        let total: f64 = distribution.iter().map(|(_, p)| p).sum();
        if (total - 1.0).abs() > PROBABILITY_TOLERANCE {
            return Err(EngineError::InvalidPosterior(format!(
                "'{}' sums to {:.8}",
                variable, total
            )));
        }
        Ok(Self {
            variable,
            distribution: distribution
                .into_iter()
                .map(|(state, probability)| StateProbability { state, probability })
                .collect(),
        })
    }

    /// Uniform distribution over `states`
    pub fn uniform(variable: impl Into<String>, states: &[&str]) -> Result<Self> {
        let p = 1.0 / states.len().max(1) as f64;
        Self::new(variable, states.iter().map(|s| (s.to_string(), p)).collect())
    }

    fn from_normalized(variable: &str, states: &[String], probabilities: Vec<f64>) -> Self {
        debug_assert!(
            (probabilities.iter().sum::<f64>() - 1.0).abs() <= PROBABILITY_TOLERANCE,
            "inference produced an unnormalized posterior"
        );
        Self {
            variable: variable.to_string(),
            distribution: states
                .iter()
                .cloned()
                .zip(probabilities)
                .map(|(state, probability)| StateProbability { state, probability })
                .collect(),
        }
    }

    pub fn variable(&self) -> &str {
        &self.variable
    }

    pub fn distribution(&self) -> &[StateProbability] {
        &self.distribution
    }

    pub fn probability(&self, state: &str) -> Option<f64> {
        self.distribution
            .iter()
            .find(|sp| sp.state == state)
            .map(|sp| sp.probability)
    }

    /// Total mass of `states`; unknown states contribute nothing
    pub fn probability_of<S: AsRef<str>>(&self, states: &[S]) -> f64 {
        self.distribution
            .iter()
            .filter(|sp| states.iter().any(|s| s.as_ref() == sp.state))
            .map(|sp| sp.probability)
            .sum()
    }

    pub fn total(&self) -> f64 {
        self.distribution.iter().map(|sp| sp.probability).sum()
    }

    /// Highest-probability state, first declared wins ties
    pub fn most_likely(&self) -> &StateProbability {
        self.distribution
            .iter()
            .fold(&self.distribution[0], |best, sp| {
                if sp.probability > best.probability {
                    sp
                } else {
                    best
                }
            })
    }
}

/// How posteriors are computed
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum InferenceMethod {
    #[default]
    Exact,
    LikelihoodWeighting(SamplerSettings),
}

impl InferenceMethod {
    pub fn validate(&self) -> Result<()> {
        match self {
            InferenceMethod::Exact => Ok(()),
            InferenceMethod::LikelihoodWeighting(settings) => settings.validate(),
        }
    }
}

impl BayesianNetwork {
    /// Posterior over `query` given `evidence`
    pub fn infer(&self, evidence: &Evidence, query: &str, method: &InferenceMethod) -> Result<Posterior> {
        let query_index = self.node_index(query)?;
        let resolved = self.resolve_evidence(evidence)?;

        let probabilities = match method {
            InferenceMethod::Exact => elimination::variable_elimination(self, query_index, &resolved)?,
            InferenceMethod::LikelihoodWeighting(settings) => {
                sampling::likelihood_weighting(self, query_index, &resolved, settings)?
            }
        };
        Ok(Posterior::from_normalized(
            query,
            &self.nodes[query_index].states,
            probabilities,
        ))
    }

    /// Exact posterior; shorthand for `infer` with [`InferenceMethod::Exact`]
    pub fn infer_exact(&self, evidence: &Evidence, query: &str) -> Result<Posterior> {
        self.infer(evidence, query, &InferenceMethod::Exact)
    }

    /// Translate names to (node, state) indices, rejecting unknown variables and states
    fn resolve_evidence(&self, evidence: &Evidence) -> Result<Vec<(usize, usize)>> {
        let mut resolved = Vec::with_capacity(evidence.len());
        for (variable, state) in evidence.iter() {
            let node = self.node_index(variable)?;
            let state_index = self.nodes[node]
                .state_index(state)
                .ok_or_else(|| EngineError::InvalidState {
                    variable: variable.to_string(),
                    state: state.to_string(),
                })?;
            resolved.push((node, state_index));
        }
        resolved.sort_unstable();
        Ok(resolved)
    }
}
