//! Likelihood-weighting sampler
//!
//! Approximate fallback for networks too large for exact elimination.
//! Runs in fixed-size batches and stops once consecutive batch estimates
//! agree within the tolerance. Deterministic for a given seed.

use super::network::BayesianNetwork;
use crate::error::{EngineError, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Sampler budget and convergence settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplerSettings {
    /// Hard cap on drawn samples
    #[serde(default = "default_samples")]
    pub samples: usize,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// Max absolute change between batch estimates to count as converged
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
}

fn default_samples() -> usize {
    200_000
}

fn default_batch_size() -> usize {
    5_000
}

fn default_seed() -> u64 {
    42
}

fn default_tolerance() -> f64 {
    0.002
}

impl Default for SamplerSettings {
    fn default() -> Self {
        Self {
            samples: default_samples(),
            batch_size: default_batch_size(),
            seed: default_seed(),
            tolerance: default_tolerance(),
        }
    }
}

impl SamplerSettings {
    /// Budget must allow at least one batch and the tolerance must be positive
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 || self.samples < self.batch_size {
            return Err(EngineError::Config(format!(
                "sampler needs batch_size > 0 and samples >= batch_size, got {} / {}",
                self.batch_size, self.samples
            )));
        }
        if !(self.tolerance > 0.0) {
            return Err(EngineError::Config("sampler tolerance must be positive".into()));
        }
        Ok(())
    }
}

pub(crate) fn likelihood_weighting(
    net: &BayesianNetwork,
    query: usize,
    evidence: &[(usize, usize)],
    settings: &SamplerSettings,
) -> Result<Vec<f64>> {
    let card = net.nodes[query].card();
    let mut observed: Vec<Option<usize>> = vec![None; net.len()];
    for (node, state) in evidence {
        observed[*node] = Some(*state);
    }

    let mut rng = StdRng::seed_from_u64(settings.seed);
    let mut totals = vec![0.0; card];
    let mut assignment = vec![0usize; net.len()];
    let mut previous: Option<Vec<f64>> = None;
    let mut delta = f64::INFINITY;
    let mut drawn = 0;

    while drawn < settings.samples {
        let batch = settings.batch_size.min(settings.samples - drawn);
        for _ in 0..batch {
            let mut weight = 1.0;
            for node in &net.topo_order {
                let row = net.cpt_row(*node, &assignment);
                match observed[*node] {
                    Some(state) => {
                        weight *= row[state];
                        assignment[*node] = state;
                    }
                    None => assignment[*node] = sample_index(row, rng.random::<f64>()),
                }
            }
            totals[assignment[query]] += weight;
        }
        drawn += batch;

        let total: f64 = totals.iter().sum();
        if total <= 0.0 {
            continue;
        }
        let estimate: Vec<f64> = totals.iter().map(|t| t / total).collect();
        if let Some(prev) = &previous {
            delta = prev
                .iter()
                .zip(&estimate)
                .map(|(a, b)| (a - b).abs())
                .fold(0.0, f64::max);
            tracing::debug!(drawn, delta, "likelihood weighting batch");
            if delta < settings.tolerance {
                return Ok(estimate);
            }
        }
        previous = Some(estimate);
    }

    if totals.iter().all(|t| *t <= 0.0) {
        return Err(EngineError::ImpossibleEvidence);
    }
    Err(EngineError::InferenceNonconvergence { samples: drawn, delta })
}

fn sample_index(row: &[f64], u: f64) -> usize {
    let mut cumulative = 0.0;
    for (i, p) in row.iter().enumerate() {
        cumulative += p;
        if u < cumulative {
            return i;
        }
    }
    row.len() - 1
}
