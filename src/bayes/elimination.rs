//! Exact inference by variable elimination

use super::factor::Factor;
use super::network::BayesianNetwork;
use crate::error::{EngineError, Result};

/// Unnormalized-then-normalized distribution over `query` given `evidence`.
///
/// `evidence` pairs are (node, state). Only ancestors of the query and the
/// evidence contribute; every other node sums to one and is skipped.
pub(crate) fn variable_elimination(
    net: &BayesianNetwork,
    query: usize,
    evidence: &[(usize, usize)],
) -> Result<Vec<f64>> {
    let card = net.nodes[query].card();
    if let Some(&(_, state)) = evidence.iter().find(|(node, _)| *node == query) {
        // The observed state still has to be reachable under the rest of the evidence
        let rest: Vec<(usize, usize)> = evidence.iter().copied().filter(|(node, _)| *node != query).collect();
        let marginal = variable_elimination(net, query, &rest)?;
        if marginal[state] <= 0.0 {
            return Err(EngineError::ImpossibleEvidence);
        }
        let mut dist = vec![0.0; card];
        dist[state] = 1.0;
        return Ok(dist);
    }

    let mut seeds = vec![query];
    seeds.extend(evidence.iter().map(|(node, _)| *node));
    let relevant = ancestors(net, &seeds);

    let mut factors: Vec<Factor> = relevant
        .iter()
        .map(|node| {
            evidence
                .iter()
                .fold(Factor::from_node(net, *node), |f, (var, state)| f.reduce(*var, *state))
        })
        .collect();

    let mut hidden: Vec<usize> = relevant
        .iter()
        .copied()
        .filter(|node| *node != query && !evidence.iter().any(|(e, _)| e == node))
        .collect();

    let mut order = Vec::with_capacity(hidden.len());
    while !hidden.is_empty() {
        // Greedy min-size; ties resolved by lowest node index since `hidden` is sorted
        let (pick, _) = hidden
            .iter()
            .enumerate()
            .map(|(i, var)| {
                let touching: Vec<&Factor> = factors.iter().filter(|f| f.contains(*var)).collect();
                (i, Factor::union_size(&touching))
            })
            .min_by(|a, b| a.1.cmp(&b.1).then(a.0.cmp(&b.0)))
            .unwrap_or((0, 0));
        let var = hidden.remove(pick);
        order.push(var);

        let (touching, rest): (Vec<Factor>, Vec<Factor>) = factors.into_iter().partition(|f| f.contains(var));
        let merged = touching
            .iter()
            .fold(Factor::unit(), |acc, f| acc.product(f))
            .sum_out(var);
        factors = rest;
        factors.push(merged);
    }

    tracing::debug!(
        query = %net.nodes[query].name,
        order = ?order.iter().map(|v| net.nodes[*v].name.as_str()).collect::<Vec<_>>(),
        "variable elimination order"
    );

    // Everything but the query has been reduced or eliminated by now
    let joint = factors.iter().fold(Factor::unit(), |acc, f| acc.product(f));
    debug_assert_eq!(joint.vars, vec![query]);

    let total: f64 = joint.values.iter().sum();
    if !total.is_finite() || total <= 0.0 || joint.values.len() != card {
        return Err(EngineError::ImpossibleEvidence);
    }
    Ok(joint.values.iter().map(|v| v / total).collect())
}

/// The seed nodes plus all their ancestors, ascending by index
fn ancestors(net: &BayesianNetwork, seeds: &[usize]) -> Vec<usize> {
    let mut keep = vec![false; net.len()];
    let mut stack: Vec<usize> = seeds.to_vec();
    while let Some(node) = stack.pop() {
        if keep[node] {
            continue;
        }
        keep[node] = true;
        stack.extend(net.nodes[node].parents.iter().copied());
    }
    (0..net.len()).filter(|i| keep[*i]).collect()
}
