//! Built-in football network
//!
//! ```text
//! home_form ─┐                      ┌─ away_form
//! home_avail ┴► home_strength ─┐ ┌─ away_strength ◄┴ away_avail
//!                              ▼ ▼
//!       head_to_head ───► match_outcome ◄─── competition_stage
//!                                                  │
//! home_attack ─┬──────► total_goals ◄──────────────┘
//! away_attack ─┴──────► both_teams_score
//! ```
//!
//! CPT shapes follow expert heuristics rather than fitted parameters:
//! strength differences move mass between home and away wins, knockout
//! stages inflate draws and suppress goals.

use super::network::{BayesianNetwork, NetworkDefinition, NodeDefinition};
use super::vars;
use crate::error::Result;

const FORM_STATES: [&str; 3] = ["poor", "average", "good"];
const AVAILABILITY_STATES: [&str; 2] = ["full", "depleted"];
const STRENGTH_STATES: [&str; 3] = ["weak", "medium", "strong"];
const STAGE_STATES: [&str; 5] = ["group", "round_of_16", "quarterfinal", "semifinal", "final"];
const H2H_STATES: [&str; 3] = ["home_dominant", "even", "away_dominant"];
const OUTCOME_STATES: [&str; 3] = ["home_win", "draw", "away_win"];
const ATTACK_STATES: [&str; 3] = ["low", "medium", "high"];
const GOALS_STATES: [&str; 2] = ["under", "over"];
const BTTS_STATES: [&str; 2] = ["yes", "no"];

/// Extra draw mass per stage, indexed like `STAGE_STATES`
const STAGE_DRAW_BOOST: [f64; 5] = [0.0, 0.03, 0.04, 0.05, 0.06];
/// Reduction of P(over) per stage
const STAGE_GOAL_TIGHTNESS: [f64; 5] = [0.0, 0.02, 0.03, 0.04, 0.05];

pub fn football_network() -> Result<BayesianNetwork> {
    BayesianNetwork::from_definition(football_definition())
}

pub fn football_definition() -> NetworkDefinition {
    let nodes = vec![
        root(vars::HOME_FORM, &FORM_STATES, &[0.3, 0.4, 0.3]),
        root(vars::AWAY_FORM, &FORM_STATES, &[0.3, 0.4, 0.3]),
        root(vars::HOME_AVAILABILITY, &AVAILABILITY_STATES, &[0.8, 0.2]),
        root(vars::AWAY_AVAILABILITY, &AVAILABILITY_STATES, &[0.8, 0.2]),
        strength_node(vars::HOME_STRENGTH, vars::HOME_FORM, vars::HOME_AVAILABILITY),
        strength_node(vars::AWAY_STRENGTH, vars::AWAY_FORM, vars::AWAY_AVAILABILITY),
        root(vars::COMPETITION_STAGE, &STAGE_STATES, &[0.6, 0.16, 0.12, 0.08, 0.04]),
        root(vars::HEAD_TO_HEAD, &H2H_STATES, &[0.3, 0.4, 0.3]),
        match_outcome_node(),
        root(vars::HOME_ATTACK, &ATTACK_STATES, &[0.3, 0.4, 0.3]),
        root(vars::AWAY_ATTACK, &ATTACK_STATES, &[0.3, 0.4, 0.3]),
        total_goals_node(),
        btts_node(),
    ];
    NetworkDefinition { nodes }
}

fn names(states: &[&str]) -> Vec<String> {
    states.iter().map(|s| s.to_string()).collect()
}

fn root(name: &str, states: &[&str], prior: &[f64]) -> NodeDefinition {
    NodeDefinition {
        name: name.to_string(),
        states: names(states),
        parents: Vec::new(),
        cpt: vec![prior.to_vec()],
    }
}

fn strength_node(name: &str, form: &str, availability: &str) -> NodeDefinition {
    // Rows: (form, availability) with availability fastest
    let cpt = vec![
        vec![0.65, 0.28, 0.07], // poor, full
        vec![0.80, 0.17, 0.03], // poor, depleted
        vec![0.20, 0.60, 0.20], // average, full
        vec![0.38, 0.50, 0.12], // average, depleted
        vec![0.07, 0.28, 0.65], // good, full
        vec![0.15, 0.42, 0.43], // good, depleted
    ];
    NodeDefinition {
        name: name.to_string(),
        states: names(&STRENGTH_STATES),
        parents: vec![form.to_string(), availability.to_string()],
        cpt,
    }
}

fn match_outcome_node() -> NodeDefinition {
    let mut cpt = Vec::with_capacity(3 * 3 * 3 * 5);
    for hs in 0..3 {
        for aws in 0..3 {
            for h2h in 0..3 {
                for stage in 0..5 {
                    cpt.push(outcome_row(hs, aws, h2h, stage));
                }
            }
        }
    }
    NodeDefinition {
        name: vars::MATCH_OUTCOME.to_string(),
        states: names(&OUTCOME_STATES),
        parents: vec![
            vars::HOME_STRENGTH.to_string(),
            vars::AWAY_STRENGTH.to_string(),
            vars::HEAD_TO_HEAD.to_string(),
            vars::COMPETITION_STAGE.to_string(),
        ],
        cpt,
    }
}

fn outcome_row(home_strength: usize, away_strength: usize, h2h: usize, stage: usize) -> Vec<f64> {
    const HOME_ADVANTAGE: f64 = 0.06;
    let diff = home_strength as f64 - away_strength as f64;
    let h2h_shift = match h2h {
        0 => 0.06,
        2 => -0.06,
        _ => 0.0,
    };

    let p_home = (0.40 + HOME_ADVANTAGE + 0.15 * diff + h2h_shift).clamp(0.05, 0.85);
    let p_away = (0.30 - 0.12 * diff - h2h_shift).clamp(0.05, 0.80);
    let p_draw = (1.0 - p_home - p_away).max(0.10) + STAGE_DRAW_BOOST[stage];

    let total = p_home + p_draw + p_away;
    vec![p_home / total, p_draw / total, p_away / total]
}

fn total_goals_node() -> NodeDefinition {
    let mut cpt = Vec::with_capacity(3 * 3 * 5);
    for ha in 0..3 {
        for aa in 0..3 {
            for stage in 0..5 {
                let goal_factor = (ha + aa) as f64 / 4.0;
                let p_over = (0.30 + 0.40 * goal_factor - STAGE_GOAL_TIGHTNESS[stage]).clamp(0.05, 0.95);
                cpt.push(vec![1.0 - p_over, p_over]);
            }
        }
    }
    NodeDefinition {
        name: vars::TOTAL_GOALS.to_string(),
        states: names(&GOALS_STATES),
        parents: vec![
            vars::HOME_ATTACK.to_string(),
            vars::AWAY_ATTACK.to_string(),
            vars::COMPETITION_STAGE.to_string(),
        ],
        cpt,
    }
}

fn btts_node() -> NodeDefinition {
    let mut cpt = Vec::with_capacity(9);
    for ha in 0..3 {
        for aa in 0..3 {
            // Both sides have to score, so the weaker attack dominates
            let weakest = ha.min(aa) as f64;
            let p_yes = 0.25 + 0.20 * weakest + 0.05 * (ha + aa) as f64;
            cpt.push(vec![p_yes, 1.0 - p_yes]);
        }
    }
    NodeDefinition {
        name: vars::BOTH_TEAMS_SCORE.to_string(),
        states: names(&BTTS_STATES),
        parents: vec![vars::HOME_ATTACK.to_string(), vars::AWAY_ATTACK.to_string()],
        cpt,
    }
}
