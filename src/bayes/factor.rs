//! Discrete factors for variable elimination
//!
//! Values are stored row-major over `vars`, last variable fastest.

use super::network::{strides, BayesianNetwork};

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Factor {
    pub vars: Vec<usize>,
    pub cards: Vec<usize>,
    pub values: Vec<f64>,
}

impl Factor {
    /// P(node | parents) as a factor over `parents ++ [node]`
    pub fn from_node(net: &BayesianNetwork, node: usize) -> Self {
        let n = &net.nodes[node];
        let mut vars = n.parents.clone();
        vars.push(node);
        let cards = vars.iter().map(|v| net.nodes[*v].card()).collect();
        Self {
            vars,
            cards,
            values: n.cpt.clone(),
        }
    }

    pub fn size(&self) -> usize {
        self.values.len()
    }

    pub fn contains(&self, var: usize) -> bool {
        self.vars.contains(&var)
    }

    /// Fix `var` to `state` and drop it from the scope
    pub fn reduce(&self, var: usize, state: usize) -> Factor {
        let Some(pos) = self.vars.iter().position(|v| *v == var) else {
            return self.clone();
        };
        let old_strides = strides(&self.cards);
        let mut vars = self.vars.clone();
        let mut cards = self.cards.clone();
        vars.remove(pos);
        cards.remove(pos);

        let values = self
            .values
            .iter()
            .enumerate()
            .filter(|(idx, _)| (idx / old_strides[pos]) % self.cards[pos] == state)
            .map(|(_, v)| *v)
            .collect();
        Factor { vars, cards, values }
    }

    /// Pointwise product over the union of both scopes
    pub fn product(&self, other: &Factor) -> Factor {
        let mut vars = self.vars.clone();
        let mut cards = self.cards.clone();
        for (v, c) in other.vars.iter().zip(&other.cards) {
            if !vars.contains(v) {
                vars.push(*v);
                cards.push(*c);
            }
        }

        let result_strides = strides(&cards);
        let self_strides = strides(&self.cards);
        let other_strides = strides(&other.cards);
        let self_pos: Vec<usize> = self.vars.iter().map(|v| position(&vars, *v)).collect();
        let other_pos: Vec<usize> = other.vars.iter().map(|v| position(&vars, *v)).collect();

        let size: usize = cards.iter().product();
        let mut values = Vec::with_capacity(size);
        for idx in 0..size {
            let state_at = |pos: usize| (idx / result_strides[pos]) % cards[pos];
            let si: usize = self_pos
                .iter()
                .zip(&self_strides)
                .map(|(pos, stride)| state_at(*pos) * stride)
                .sum();
            let oi: usize = other_pos
                .iter()
                .zip(&other_strides)
                .map(|(pos, stride)| state_at(*pos) * stride)
                .sum();
            values.push(self.values[si] * other.values[oi]);
        }
        Factor { vars, cards, values }
    }

    /// Marginalize `var` away
    pub fn sum_out(&self, var: usize) -> Factor {
        let Some(pos) = self.vars.iter().position(|v| *v == var) else {
            return self.clone();
        };
        let old_strides = strides(&self.cards);
        let mut vars = self.vars.clone();
        let mut cards = self.cards.clone();
        vars.remove(pos);
        cards.remove(pos);
        let new_strides = strides(&cards);

        let mut values = vec![0.0; cards.iter().product()];
        for (idx, v) in self.values.iter().enumerate() {
            let mut target = 0;
            let mut k = 0;
            for old in 0..self.vars.len() {
                if old == pos {
                    continue;
                }
                target += ((idx / old_strides[old]) % self.cards[old]) * new_strides[k];
                k += 1;
            }
            values[target] += v;
        }
        Factor { vars, cards, values }
    }

    /// Cardinality product of the union scope, used to pick elimination order
    pub fn union_size(factors: &[&Factor]) -> usize {
        let mut seen: Vec<(usize, usize)> = Vec::new();
        for f in factors {
            for (v, c) in f.vars.iter().zip(&f.cards) {
                if !seen.iter().any(|(sv, _)| sv == v) {
                    seen.push((*v, *c));
                }
            }
        }
        seen.iter().map(|(_, c)| c).product()
    }

    pub fn unit() -> Factor {
        Factor {
            vars: Vec::new(),
            cards: Vec::new(),
            values: vec![1.0],
        }
    }
}

fn position(vars: &[usize], var: usize) -> usize {
    vars.iter().position(|v| *v == var).unwrap_or(0)
}
