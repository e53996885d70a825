//! Network definition, validation and CPT lookup

use crate::error::{EngineError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Tolerance for CPT rows and posteriors summing to one
pub const PROBABILITY_TOLERANCE: f64 = 1e-6;

/// Serializable description of one node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDefinition {
    pub name: String,
    pub states: Vec<String>,
    #[serde(default)]
    pub parents: Vec<String>,
    /// One row per parent assignment, first parent most significant.
    /// Each row holds a probability per state of this node.
    pub cpt: Vec<Vec<f64>>,
}

/// Serializable description of a whole network
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkDefinition {
    pub nodes: Vec<NodeDefinition>,
}

#[derive(Debug, Clone)]
pub(crate) struct Node {
    pub name: String,
    pub states: Vec<String>,
    pub parents: Vec<usize>,
    /// Row strides for each parent, aligned with `parents`
    pub strides: Vec<usize>,
    /// Flattened rows, `states.len()` entries per row
    pub cpt: Vec<f64>,
}

impl Node {
    pub fn card(&self) -> usize {
        self.states.len()
    }

    pub fn state_index(&self, state: &str) -> Option<usize> {
        self.states.iter().position(|s| s == state)
    }
}

/// Fixed discrete Bayesian network. Read-only after construction.
#[derive(Debug, Clone)]
pub struct BayesianNetwork {
    pub(crate) nodes: Vec<Node>,
    index: HashMap<String, usize>,
    /// Parents always precede children
    pub(crate) topo_order: Vec<usize>,
}

impl BayesianNetwork {
    /// Validate a definition and build the network
    pub fn from_definition(def: NetworkDefinition) -> Result<Self> {
        if def.nodes.is_empty() {
            return Err(EngineError::InvalidNetwork("network has no nodes".into()));
        }

        let mut index = HashMap::new();
        for (i, node) in def.nodes.iter().enumerate() {
            if node.name.trim().is_empty() {
                return Err(EngineError::InvalidNetwork(format!("node #{} has an empty name", i)));
            }
            if index.insert(node.name.clone(), i).is_some() {
                return Err(EngineError::InvalidNetwork(format!("duplicate node '{}'", node.name)));
            }
            if node.states.is_empty() {
                return Err(EngineError::InvalidNetwork(format!("node '{}' has no states", node.name)));
            }
            for (j, state) in node.states.iter().enumerate() {
                if node.states[..j].contains(state) {
                    return Err(EngineError::InvalidNetwork(format!(
                        "node '{}' lists state '{}' twice",
                        node.name, state
                    )));
                }
            }
        }

        let mut nodes = Vec::with_capacity(def.nodes.len());
        for node in &def.nodes {
            let mut parents = Vec::with_capacity(node.parents.len());
            for parent in &node.parents {
                let p = *index.get(parent).ok_or_else(|| {
                    EngineError::InvalidNetwork(format!(
                        "node '{}' references unknown parent '{}'",
                        node.name, parent
                    ))
                })?;
                if parent == &node.name {
                    return Err(EngineError::InvalidNetwork(format!("node '{}' is its own parent", node.name)));
                }
                if parents.contains(&p) {
                    return Err(EngineError::InvalidNetwork(format!(
                        "node '{}' lists parent '{}' twice",
                        node.name, parent
                    )));
                }
                parents.push(p);
            }

            let parent_cards: Vec<usize> = parents.iter().map(|p| def.nodes[*p].states.len()).collect();
            let rows: usize = parent_cards.iter().product();
            if node.cpt.len() != rows {
                return Err(EngineError::InvalidNetwork(format!(
                    "node '{}' needs {} CPT rows, got {}",
                    node.name,
                    rows,
                    node.cpt.len()
                )));
            }

            let card = node.states.len();
            let mut cpt = Vec::with_capacity(rows * card);
            for (r, row) in node.cpt.iter().enumerate() {
                if row.len() != card {
                    return Err(EngineError::InvalidNetwork(format!(
                        "node '{}' row {} has {} entries, expected {}",
                        node.name,
                        r,
                        row.len(),
                        card
                    )));
                }
                if row.iter().any(|p| !p.is_finite() || *p < 0.0) {
                    return Err(EngineError::InvalidNetwork(format!(
                        "node '{}' row {} has a negative or non-finite probability",
                        node.name, r
                    )));
                }
                let sum: f64 = row.iter().sum();
                if (sum - 1.0).abs() > PROBABILITY_TOLERANCE {
                    return Err(EngineError::InvalidNetwork(format!(
                        "node '{}' row {} sums to {:.8}",
                        node.name, r, sum
                    )));
                }
                cpt.extend_from_slice(row);
            }

            nodes.push(Node {
                name: node.name.clone(),
                states: node.states.clone(),
                strides: strides(&parent_cards),
                parents,
                cpt,
            });
        }

        let topo_order = topological_order(&nodes)?;
        Ok(Self {
            nodes,
            index,
            topo_order,
        })
    }

    /// Load a JSON network definition from disk
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let def: NetworkDefinition = serde_json::from_str(&raw)?;
        Self::from_definition(def)
    }

    pub fn to_definition(&self) -> NetworkDefinition {
        NetworkDefinition {
            nodes: self
                .nodes
                .iter()
                .map(|n| NodeDefinition {
                    name: n.name.clone(),
                    states: n.states.clone(),
                    parents: n.parents.iter().map(|p| self.nodes[*p].name.clone()).collect(),
                    cpt: n.cpt.chunks(n.card()).map(|row| row.to_vec()).collect(),
                })
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, variable: &str) -> bool {
        self.index.contains_key(variable)
    }

    /// Variable names in definition order
    pub fn variables(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().map(|n| n.name.as_str())
    }

    pub fn states(&self, variable: &str) -> Result<&[String]> {
        Ok(&self.nodes[self.node_index(variable)?].states)
    }

    pub fn parents(&self, variable: &str) -> Result<Vec<&str>> {
        let node = &self.nodes[self.node_index(variable)?];
        Ok(node.parents.iter().map(|p| self.nodes[*p].name.as_str()).collect())
    }

    pub(crate) fn node_index(&self, variable: &str) -> Result<usize> {
        self.index
            .get(variable)
            .copied()
            .ok_or_else(|| EngineError::UnknownVariable(variable.to_string()))
    }

    /// CPT row for `node` under a full assignment of network states
    pub(crate) fn cpt_row(&self, node: usize, assignment: &[usize]) -> &[f64] {
        let n = &self.nodes[node];
        let row: usize = n
            .parents
            .iter()
            .zip(&n.strides)
            .map(|(p, stride)| assignment[*p] * stride)
            .sum();
        &n.cpt[row * n.card()..(row + 1) * n.card()]
    }
}

/// Row-major strides, last position fastest
pub(crate) fn strides(cards: &[usize]) -> Vec<usize> {
    let mut out = vec![1; cards.len()];
    for i in (0..cards.len().saturating_sub(1)).rev() {
        out[i] = out[i + 1] * cards[i + 1];
    }
    out
}

/// Kahn's algorithm, always taking the lowest ready index so the order is stable
fn topological_order(nodes: &[Node]) -> Result<Vec<usize>> {
    let mut remaining: Vec<usize> = nodes.iter().map(|n| n.parents.len()).collect();
    let mut children: Vec<Vec<usize>> = vec![Vec::new(); nodes.len()];
    for (i, n) in nodes.iter().enumerate() {
        for p in &n.parents {
            children[*p].push(i);
        }
    }

    let mut ready: std::collections::BTreeSet<usize> =
        (0..nodes.len()).filter(|i| remaining[*i] == 0).collect();
    let mut order = Vec::with_capacity(nodes.len());
    while let Some(next) = ready.pop_first() {
        order.push(next);
        for child in &children[next] {
            remaining[*child] -= 1;
            if remaining[*child] == 0 {
                ready.insert(*child);
            }
        }
    }

    if order.len() != nodes.len() {
        let cyclic: Vec<&str> = (0..nodes.len())
            .filter(|i| remaining[*i] > 0)
            .map(|i| nodes[i].name.as_str())
            .collect();
        return Err(EngineError::InvalidNetwork(format!(
            "network contains a cycle through: {}",
            cyclic.join(", ")
        )));
    }
    Ok(order)
}
