//! Error types for the evaluation pipeline
//!
//! Every failure a query can produce is a caller or configuration error.
//! Nothing is retried internally; the evaluator holds no mutable state, so a
//! failed query can simply be re-issued.

use thiserror::Error;

/// Errors surfaced by fact construction, inference, and configuration
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Malformed fact: {0}")]
    MalformedFact(String),

    #[error("Unknown variable: {0}")]
    UnknownVariable(String),

    #[error("Invalid state '{state}' for variable '{variable}'")]
    InvalidState { variable: String, state: String },

    #[error("Inference did not converge after {samples} samples (last delta {delta:.6})")]
    InferenceNonconvergence { samples: usize, delta: f64 },

    #[error("Evidence has zero probability under the network")]
    ImpossibleEvidence,

    #[error("Invalid network: {0}")]
    InvalidNetwork(String),

    #[error("Invalid posterior: {0}")]
    InvalidPosterior(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    ConfigSource(#[from] config::ConfigError),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl EngineError {
    pub(crate) fn malformed(msg: impl Into<String>) -> Self {
        EngineError::MalformedFact(msg.into())
    }

    /// True for errors caused by the query's input rather than configuration
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            EngineError::MalformedFact(_)
                | EngineError::UnknownVariable(_)
                | EngineError::InvalidState { .. }
                | EngineError::ImpossibleEvidence
        )
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
