//! Safe-bet inference engine
//!
//! Classifies a sports bet as safe or risky by fusing two independent
//! reasoning paths over the same validated facts.
//!
//! ## Architecture
//!
//! ```text
//!                 ┌─► RuleEngine ──► signals ─────┐
//! facts ─► FactSet┤                               ├─► FusionEngine ─► Verdict
//!                 └─► EvidenceMapper ─► network ──┘
//!                                      (posterior)
//! ```

pub mod bayes;
pub mod config;
pub mod engine;
pub mod error;
pub mod fixtures;
pub mod fusion;
pub mod rules;
pub mod types;

pub use engine::{BetEvaluator, MatchQuery};
pub use error::{EngineError, Result};
pub use fusion::{Classification, Verdict};

#[cfg(test)]
mod types_tests;
#[cfg(test)]
mod error_tests;
#[cfg(test)]
mod integration_tests;
