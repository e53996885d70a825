//! Bet evaluator
//!
//! Wires facts, rules, network, and fusion into a single query entry point.
//! Built once from configuration and then shared read-only; `evaluate`
//! takes `&self`, so concurrent queries need no locking.

use crate::bayes::{football_network, BayesianNetwork, Evidence, EvidenceMapper, InferenceMethod};
use crate::config::{Config, OutcomeMapping};
use crate::error::{EngineError, Result};
use crate::fusion::{FusionEngine, Verdict};
use crate::rules::RuleEngine;
use crate::types::{BetCandidateFact, BetType, FactSet, MatchFact, TeamFact};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Query file accepted by the CLI
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchQuery {
    #[serde(rename = "match")]
    pub match_fact: MatchFact,
    pub home_team: TeamFact,
    pub away_team: TeamFact,
    /// Single bet for `evaluate`
    #[serde(default)]
    pub bet: Option<BetCandidateFact>,
    /// Decimal odds per bet type for `analyze`
    #[serde(default)]
    pub odds: BTreeMap<BetType, f64>,
}

impl MatchQuery {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

pub struct BetEvaluator {
    rules: RuleEngine,
    network: BayesianNetwork,
    inference: InferenceMethod,
    mapper: EvidenceMapper,
    fusion: FusionEngine,
    outcomes: BTreeMap<BetType, OutcomeMapping>,
}

impl BetEvaluator {
    /// Build from configuration, loading the network it names
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;
        let network = match &config.network.path {
            Some(path) => BayesianNetwork::from_json_file(path)?,
            None => football_network()?,
        };
        let evaluator = Self::new(
            RuleEngine::from_specs(&config.rules)?,
            network,
            config.network.inference.clone(),
            EvidenceMapper::new(config.evidence.clone()),
            FusionEngine::new(config.fusion.clone()),
            config.outcomes.clone(),
        )?;
        tracing::info!(
            rules = evaluator.rules.len(),
            variables = evaluator.network.len(),
            inference = ?evaluator.inference,
            "bet evaluator ready"
        );
        Ok(evaluator)
    }

    /// Default configuration over the built-in network
    pub fn with_defaults() -> Result<Self> {
        Self::from_config(&Config::default())
    }

    /// Assemble from parts. Validates the fusion, evidence and sampler
    /// settings and checks every outcome mapping against the network.
    pub fn new(
        rules: RuleEngine,
        network: BayesianNetwork,
        inference: InferenceMethod,
        mapper: EvidenceMapper,
        fusion: FusionEngine,
        outcomes: Vec<OutcomeMapping>,
    ) -> Result<Self> {
        fusion.config().validate()?;
        mapper.config().validate()?;
        inference.validate()?;

        let mut by_bet = BTreeMap::new();
        for outcome in outcomes {
            let states = network.states(&outcome.variable).map_err(|_| {
                EngineError::Config(format!(
                    "bet type '{}' maps to unknown variable '{}'",
                    outcome.bet_type, outcome.variable
                ))
            })?;
            if let Some(bad) = outcome.safe_states.iter().find(|s| !states.contains(s)) {
                return Err(EngineError::Config(format!(
                    "bet type '{}' maps to unknown state '{}' of '{}'",
                    outcome.bet_type, bad, outcome.variable
                )));
            }
            by_bet.insert(outcome.bet_type, outcome);
        }

        let expected = fact_mapped_variables();
        let unmodelled: Vec<&str> = expected.iter().copied().filter(|v| !network.contains(v)).collect();
        if !unmodelled.is_empty() {
            tracing::warn!(?unmodelled, "network does not model some fact-derived variables; they stay unobserved");
        }

        Ok(Self {
            rules,
            network,
            inference,
            mapper,
            fusion,
            outcomes: by_bet,
        })
    }

    pub fn network(&self) -> &BayesianNetwork {
        &self.network
    }

    pub fn rules(&self) -> &RuleEngine {
        &self.rules
    }

    /// Evaluate one bet on one match
    pub fn evaluate(
        &self,
        match_fact: &MatchFact,
        home: &TeamFact,
        away: &TeamFact,
        bet: &BetCandidateFact,
    ) -> Result<Verdict> {
        let facts = FactSet::new(match_fact.clone(), home.clone(), away.clone(), bet.clone())?;
        self.evaluate_facts(&facts)
    }

    /// Evaluate an already validated fact set
    pub fn evaluate_facts(&self, facts: &FactSet) -> Result<Verdict> {
        let bet_type = facts.bet().bet_type();
        let outcome = self
            .outcomes
            .get(&bet_type)
            .ok_or_else(|| EngineError::Config(format!("bet type '{}' has no outcome mapping", bet_type)))?;

        let signals = self.rules.fire(facts);
        let evidence = self.evidence_for(facts);
        let posterior = self.network.infer(&evidence, &outcome.variable, &self.inference)?;

        Ok(self.fusion.fuse(bet_type, signals, posterior, outcome.safe_states.as_slice()))
    }

    /// Evidence the evaluator would hand to the network for `facts`
    pub fn evidence_for(&self, facts: &FactSet) -> Evidence {
        self.mapper.map_for(facts, &self.network)
    }

    /// Evaluate every bet type for a match, in bet type order.
    /// Odds are looked up per bet type; missing odds leave the bet without them.
    pub fn analyze_matchup(
        &self,
        match_fact: &MatchFact,
        home: &TeamFact,
        away: &TeamFact,
        odds: &BTreeMap<BetType, f64>,
    ) -> Result<Vec<Verdict>> {
        BetType::ALL
            .iter()
            .map(|bet_type| {
                let bet = BetCandidateFact::new(*bet_type, odds.get(bet_type).copied())?;
                self.evaluate(match_fact, home, away, &bet)
            })
            .collect()
    }
}

fn fact_mapped_variables() -> [&'static str; 8] {
    use crate::bayes::vars;
    [
        vars::HOME_FORM,
        vars::AWAY_FORM,
        vars::HOME_AVAILABILITY,
        vars::AWAY_AVAILABILITY,
        vars::COMPETITION_STAGE,
        vars::HEAD_TO_HEAD,
        vars::HOME_ATTACK,
        vars::AWAY_ATTACK,
    ]
}
