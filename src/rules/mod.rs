//! Rule engine
//!
//! Single forward pass over an ordered rule catalog:
//! - Each rule examines the fact set and either fires a signal or stays silent
//! - Rules are independent; no rule sees another rule's output
//! - Missing data means "did not fire", never an error
//!
//! Signals come out in catalog order, which keeps explanations stable.

pub mod catalog;


pub use catalog::{default_catalog, RuleSpec};

use crate::error::Result;
use crate::types::{BetType, FactSet};
use serde::Serialize;
use std::fmt;

/// Which way a signal pushes the verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    FavorsSafe,
    FavorsRisky,
}

impl Direction {
    /// +1 for safe, -1 for risky
    pub fn sign(&self) -> f64 {
        match self {
            Direction::FavorsSafe => 1.0,
            Direction::FavorsRisky => -1.0,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::FavorsSafe => write!(f, "favors safe"),
            Direction::FavorsRisky => write!(f, "favors risky"),
        }
    }
}

/// Output of a fired rule
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Signal {
    rule_id: String,
    direction: Direction,
    weight: f64,
    rationale: String,
}

impl Signal {
    /// Weight is clamped to [0, 1]; NaN becomes 0
    pub fn new(
        rule_id: impl Into<String>,
        direction: Direction,
        weight: f64,
        rationale: impl Into<String>,
    ) -> Self {
        let weight = if weight.is_nan() { 0.0 } else { weight.clamp(0.0, 1.0) };
        Self {
            rule_id: rule_id.into(),
            direction,
            weight,
            rationale: rationale.into(),
        }
    }

    pub fn rule_id(&self) -> &str {
        &self.rule_id
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }

    pub fn rationale(&self) -> &str {
        &self.rationale
    }

    /// Weight with the direction's sign applied
    pub fn signed_weight(&self) -> f64 {
        self.direction.sign() * self.weight
    }
}

/// Result of evaluating one applicable rule
#[derive(Debug, Clone, PartialEq)]
pub enum RuleOutcome {
    Fired(Signal),
    /// Data present, condition not met
    NotMatched,
    /// A fact the rule needs is absent
    MissingData(String),
}

/// A single independent predicate over a fact set
pub trait Rule: Send + Sync {
    /// Stable identifier, unique within a catalog
    fn id(&self) -> &'static str;

    /// Whether the rule speaks to this kind of bet at all
    fn applies_to(&self, bet_type: BetType) -> bool;

    fn evaluate(&self, facts: &FactSet) -> RuleOutcome;
}

/// Ordered rule catalog
#[derive(Default)]
pub struct RuleEngine {
    rules: Vec<Box<dyn Rule>>,
}

impl RuleEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Engine over the built-in catalog with default parameters
    pub fn with_defaults() -> Self {
        let mut engine = Self::new();
        for spec in default_catalog() {
            engine.add_rule(spec.build());
        }
        engine
    }

    /// Build from configured specs, validating each one
    pub fn from_specs(specs: &[RuleSpec]) -> Result<Self> {
        let mut engine = Self::new();
        for spec in specs {
            spec.validate()?;
            engine.add_rule(spec.build());
        }
        Ok(engine)
    }

    /// Append a rule at the end of the catalog
    pub fn add_rule(&mut self, rule: Box<dyn Rule>) {
        self.rules.push(rule);
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn rule_ids(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.id()).collect()
    }

    /// Evaluate every rule once, in catalog order
    pub fn fire(&self, facts: &FactSet) -> Vec<Signal> {
        let bet_type = facts.bet().bet_type();
        let mut signals = Vec::new();

        for rule in &self.rules {
            if !rule.applies_to(bet_type) {
                tracing::debug!(rule = rule.id(), bet = %bet_type, "rule not applicable");
                continue;
            }
            match rule.evaluate(facts) {
                RuleOutcome::Fired(signal) => {
                    tracing::debug!(
                        rule = rule.id(),
                        direction = %signal.direction(),
                        weight = signal.weight(),
                        "rule fired"
                    );
                    signals.push(signal);
                }
                RuleOutcome::NotMatched => {
                    tracing::debug!(rule = rule.id(), "rule did not match");
                }
                RuleOutcome::MissingData(what) => {
                    tracing::debug!(rule = rule.id(), missing = %what, "rule skipped, data missing");
                }
            }
        }
        signals
    }
}

impl fmt::Debug for RuleEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleEngine").field("rules", &self.rule_ids()).finish()
    }
}
