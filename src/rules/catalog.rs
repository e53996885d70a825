//! Built-in rules
//!
//! Every rule is plain data: its thresholds deserialize straight from the
//! `[[rules]]` config tables, tagged by `id`. A rule that omits `bet_types`
//! applies to its own default markets.

use super::{Direction, Rule, RuleOutcome, Signal};
use crate::error::{EngineError, Result};
use crate::types::{BetType, FactSet, TeamFact};
use serde::{Deserialize, Serialize};

const RESULT_BETS: &[BetType] = &[BetType::HomeWin, BetType::Draw, BetType::AwayWin];
const GOAL_LINE_BETS: &[BetType] = &[BetType::Over, BetType::Under];
const BTTS_BETS: &[BetType] = &[BetType::BttsYes, BetType::BttsNo];

/// One configured catalog entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "id", rename_all = "snake_case")]
pub enum RuleSpec {
    FormAdvantage(FormAdvantageRule),
    KnockoutStage(KnockoutStageRule),
    HomeAdvantage(HomeAdvantageRule),
    AwayFormAdvantage(AwayFormAdvantageRule),
    BalancedForm(BalancedFormRule),
    KeyPlayerAbsence(KeyPlayerAbsenceRule),
    DisciplineRisk(DisciplineRiskRule),
    GoalExpectation(GoalExpectationRule),
    BothTeamsScore(BothTeamsScoreRule),
    OddsValue(OddsValueRule),
}

impl RuleSpec {
    fn as_rule(&self) -> &dyn Rule {
        match self {
            RuleSpec::FormAdvantage(r) => r,
            RuleSpec::KnockoutStage(r) => r,
            RuleSpec::HomeAdvantage(r) => r,
            RuleSpec::AwayFormAdvantage(r) => r,
            RuleSpec::BalancedForm(r) => r,
            RuleSpec::KeyPlayerAbsence(r) => r,
            RuleSpec::DisciplineRisk(r) => r,
            RuleSpec::GoalExpectation(r) => r,
            RuleSpec::BothTeamsScore(r) => r,
            RuleSpec::OddsValue(r) => r,
        }
    }

    pub fn id(&self) -> &'static str {
        self.as_rule().id()
    }

    pub fn build(&self) -> Box<dyn Rule> {
        match self {
            RuleSpec::FormAdvantage(r) => Box::new(r.clone()),
            RuleSpec::KnockoutStage(r) => Box::new(r.clone()),
            RuleSpec::HomeAdvantage(r) => Box::new(r.clone()),
            RuleSpec::AwayFormAdvantage(r) => Box::new(r.clone()),
            RuleSpec::BalancedForm(r) => Box::new(r.clone()),
            RuleSpec::KeyPlayerAbsence(r) => Box::new(r.clone()),
            RuleSpec::DisciplineRisk(r) => Box::new(r.clone()),
            RuleSpec::GoalExpectation(r) => Box::new(r.clone()),
            RuleSpec::BothTeamsScore(r) => Box::new(r.clone()),
            RuleSpec::OddsValue(r) => Box::new(r.clone()),
        }
    }

    /// Weights must lie in [0, 1] and thresholds must be finite
    pub fn validate(&self) -> Result<()> {
        let id = self.id();
        match self {
            RuleSpec::FormAdvantage(r) => {
                check_finite(id, "margin", r.margin)?;
                check_weight(id, "max_weight", r.max_weight)
            }
            RuleSpec::AwayFormAdvantage(r) => {
                check_finite(id, "margin", r.margin)?;
                check_weight(id, "max_weight", r.max_weight)
            }
            RuleSpec::KnockoutStage(r) => check_weight(id, "weight", r.weight),
            RuleSpec::HomeAdvantage(r) => {
                check_finite(id, "threshold", r.threshold)?;
                check_weight(id, "max_weight", r.max_weight)
            }
            RuleSpec::BalancedForm(r) => {
                check_finite(id, "max_gap", r.max_gap)?;
                check_weight(id, "weight", r.weight)
            }
            RuleSpec::KeyPlayerAbsence(r) => {
                if r.min_missing == 0 {
                    return Err(EngineError::Config(format!("rule '{}': min_missing must be at least 1", id)));
                }
                check_weight(id, "per_player_weight", r.per_player_weight)?;
                check_weight(id, "max_weight", r.max_weight)
            }
            RuleSpec::DisciplineRisk(r) => {
                if r.stat.trim().is_empty() {
                    return Err(EngineError::Config(format!("rule '{}': stat must not be empty", id)));
                }
                check_finite(id, "threshold", r.threshold)?;
                check_weight(id, "weight", r.weight)
            }
            RuleSpec::GoalExpectation(r) => {
                check_finite(id, "margin", r.margin)?;
                check_weight(id, "max_weight", r.max_weight)
            }
            RuleSpec::BothTeamsScore(r) => {
                check_finite(id, "threshold", r.threshold)?;
                check_weight(id, "weight", r.weight)
            }
            RuleSpec::OddsValue(r) => {
                check_finite(id, "short_from", r.short_from)?;
                check_finite(id, "long_below", r.long_below)?;
                if r.long_below >= r.short_from {
                    return Err(EngineError::Config(format!(
                        "rule '{}': long_below must be less than short_from",
                        id
                    )));
                }
                check_weight(id, "max_weight", r.max_weight)
            }
        }
    }
}

/// Catalog used when the config lists no rules
pub fn default_catalog() -> Vec<RuleSpec> {
    vec![
        RuleSpec::FormAdvantage(FormAdvantageRule::default()),
        RuleSpec::KnockoutStage(KnockoutStageRule::default()),
        RuleSpec::HomeAdvantage(HomeAdvantageRule::default()),
        RuleSpec::AwayFormAdvantage(AwayFormAdvantageRule::default()),
        RuleSpec::BalancedForm(BalancedFormRule::default()),
        RuleSpec::KeyPlayerAbsence(KeyPlayerAbsenceRule::default()),
        RuleSpec::DisciplineRisk(DisciplineRiskRule::default()),
        RuleSpec::GoalExpectation(GoalExpectationRule::default()),
        RuleSpec::BothTeamsScore(BothTeamsScoreRule::default()),
        RuleSpec::OddsValue(OddsValueRule::default()),
    ]
}

fn check_weight(rule: &str, field: &str, value: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&value) {
        return Err(EngineError::Config(format!(
            "rule '{}': {} must be within [0, 1], got {}",
            rule, field, value
        )));
    }
    Ok(())
}

fn check_finite(rule: &str, field: &str, value: f64) -> Result<()> {
    if !value.is_finite() {
        return Err(EngineError::Config(format!("rule '{}': {} must be finite", rule, field)));
    }
    Ok(())
}

fn applies(configured: &Option<Vec<BetType>>, defaults: &[BetType], bet_type: BetType) -> bool {
    match configured {
        Some(bets) => bets.contains(&bet_type),
        None => defaults.contains(&bet_type),
    }
}

fn percent(rate: f64) -> f64 {
    rate * 100.0
}

/// Expected goals for (home, away): own scoring averaged with the opponent's conceding
fn expected_goals(facts: &FactSet) -> Option<(f64, f64)> {
    let home = facts.home();
    let away = facts.away();
    let home_xg = (home.goals_per_match()? + away.goals_conceded_per_match()?) / 2.0;
    let away_xg = (away.goals_per_match()? + home.goals_conceded_per_match()?) / 2.0;
    Some((home_xg, away_xg))
}

fn form_lead(
    id: &'static str,
    leader: &TeamFact,
    trailer: &TeamFact,
    margin: f64,
    max_weight: f64,
) -> RuleOutcome {
    let gap = leader.win_rate() - trailer.win_rate();
    if gap <= margin {
        return RuleOutcome::NotMatched;
    }
    RuleOutcome::Fired(Signal::new(
        id,
        Direction::FavorsSafe,
        gap.min(max_weight),
        format!(
            "{} are in clearly better form ({:.0}% wins vs {:.0}% for {})",
            leader.team_id(),
            percent(leader.win_rate()),
            percent(trailer.win_rate()),
            trailer.team_id()
        ),
    ))
}

// ============================================================================
// Form and venue
// ============================================================================

/// Home side's recent win rate exceeds the away side's by more than `margin`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormAdvantageRule {
    pub margin: f64,
    pub max_weight: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bet_types: Option<Vec<BetType>>,
}

impl Default for FormAdvantageRule {
    fn default() -> Self {
        Self {
            margin: 0.25,
            max_weight: 0.8,
            bet_types: None,
        }
    }
}

impl Rule for FormAdvantageRule {
    fn id(&self) -> &'static str {
        "form_advantage"
    }

    fn applies_to(&self, bet_type: BetType) -> bool {
        applies(&self.bet_types, &[BetType::HomeWin], bet_type)
    }

    fn evaluate(&self, facts: &FactSet) -> RuleOutcome {
        form_lead(self.id(), facts.home(), facts.away(), self.margin, self.max_weight)
    }
}

/// Mirror of [`FormAdvantageRule`] for the away side
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AwayFormAdvantageRule {
    pub margin: f64,
    pub max_weight: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bet_types: Option<Vec<BetType>>,
}

impl Default for AwayFormAdvantageRule {
    fn default() -> Self {
        Self {
            margin: 0.25,
            max_weight: 0.8,
            bet_types: None,
        }
    }
}

impl Rule for AwayFormAdvantageRule {
    fn id(&self) -> &'static str {
        "away_form_advantage"
    }

    fn applies_to(&self, bet_type: BetType) -> bool {
        applies(&self.bet_types, &[BetType::AwayWin], bet_type)
    }

    fn evaluate(&self, facts: &FactSet) -> RuleOutcome {
        form_lead(self.id(), facts.away(), facts.home(), self.margin, self.max_weight)
    }
}

/// Knockout matches carry more variance than group matches
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KnockoutStageRule {
    pub weight: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bet_types: Option<Vec<BetType>>,
}

impl Default for KnockoutStageRule {
    fn default() -> Self {
        Self {
            weight: 0.3,
            bet_types: None,
        }
    }
}

impl Rule for KnockoutStageRule {
    fn id(&self) -> &'static str {
        "knockout_stage"
    }

    fn applies_to(&self, bet_type: BetType) -> bool {
        applies(&self.bet_types, &BetType::ALL, bet_type)
    }

    fn evaluate(&self, facts: &FactSet) -> RuleOutcome {
        let stage = facts.match_fact().competition_stage();
        if !stage.is_knockout() {
            return RuleOutcome::NotMatched;
        }
        RuleOutcome::Fired(Signal::new(
            self.id(),
            Direction::FavorsRisky,
            self.weight,
            format!("{} is a knockout match, where upsets are more common", stage),
        ))
    }
}

/// Strong historical home record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HomeAdvantageRule {
    pub threshold: f64,
    pub max_weight: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bet_types: Option<Vec<BetType>>,
}

impl Default for HomeAdvantageRule {
    fn default() -> Self {
        Self {
            threshold: 0.5,
            max_weight: 0.5,
            bet_types: None,
        }
    }
}

impl Rule for HomeAdvantageRule {
    fn id(&self) -> &'static str {
        "home_advantage"
    }

    fn applies_to(&self, bet_type: BetType) -> bool {
        applies(&self.bet_types, &[BetType::HomeWin], bet_type)
    }

    fn evaluate(&self, facts: &FactSet) -> RuleOutcome {
        let Some(rate) = facts.home().home_win_rate() else {
            return RuleOutcome::MissingData("home_win_rate".into());
        };
        let weight = (rate - 0.5).max(0.0).min(self.max_weight);
        if rate <= self.threshold || weight <= 0.0 {
            return RuleOutcome::NotMatched;
        }
        RuleOutcome::Fired(Signal::new(
            self.id(),
            Direction::FavorsSafe,
            weight,
            format!(
                "{} win {:.0}% of their home matches",
                facts.home().team_id(),
                percent(rate)
            ),
        ))
    }
}

/// Evenly matched sides make a draw plausible
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BalancedFormRule {
    pub max_gap: f64,
    pub weight: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bet_types: Option<Vec<BetType>>,
}

impl Default for BalancedFormRule {
    fn default() -> Self {
        Self {
            max_gap: 0.1,
            weight: 0.3,
            bet_types: None,
        }
    }
}

impl Rule for BalancedFormRule {
    fn id(&self) -> &'static str {
        "balanced_form"
    }

    fn applies_to(&self, bet_type: BetType) -> bool {
        applies(&self.bet_types, &[BetType::Draw], bet_type)
    }

    fn evaluate(&self, facts: &FactSet) -> RuleOutcome {
        let gap = facts.form_gap();
        if gap.abs() > self.max_gap {
            return RuleOutcome::NotMatched;
        }
        RuleOutcome::Fired(Signal::new(
            self.id(),
            Direction::FavorsSafe,
            self.weight,
            format!(
                "{} and {} are in similar form ({:.0}% vs {:.0}% wins)",
                facts.home().team_id(),
                facts.away().team_id(),
                percent(facts.home().win_rate()),
                percent(facts.away().win_rate())
            ),
        ))
    }
}

// ============================================================================
// Squad and discipline
// ============================================================================

/// Missing key players weaken the side the bet depends on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyPlayerAbsenceRule {
    pub min_missing: usize,
    pub per_player_weight: f64,
    pub max_weight: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bet_types: Option<Vec<BetType>>,
}

impl Default for KeyPlayerAbsenceRule {
    fn default() -> Self {
        Self {
            min_missing: 1,
            per_player_weight: 0.15,
            max_weight: 0.6,
            bet_types: None,
        }
    }
}

impl Rule for KeyPlayerAbsenceRule {
    fn id(&self) -> &'static str {
        "key_player_absence"
    }

    fn applies_to(&self, bet_type: BetType) -> bool {
        applies(&self.bet_types, RESULT_BETS, bet_type)
    }

    fn evaluate(&self, facts: &FactSet) -> RuleOutcome {
        // A win bet only depends on the backed side's squad
        let teams: Vec<&TeamFact> = match facts.bet().bet_type() {
            BetType::HomeWin => vec![facts.home()],
            BetType::AwayWin => vec![facts.away()],
            _ => vec![facts.home(), facts.away()],
        };
        if teams.iter().all(|t| t.key_player_availability().is_empty()) {
            return RuleOutcome::MissingData("key_player_availability".into());
        }

        let absences: Vec<String> = teams
            .iter()
            .filter(|t| !t.unavailable_players().is_empty())
            .map(|t| format!("{} ({})", t.team_id(), t.unavailable_players().join(", ")))
            .collect();
        let missing: usize = teams.iter().map(|t| t.unavailable_players().len()).sum();
        if missing < self.min_missing {
            return RuleOutcome::NotMatched;
        }
        RuleOutcome::Fired(Signal::new(
            self.id(),
            Direction::FavorsRisky,
            (self.per_player_weight * missing as f64).min(self.max_weight),
            format!("Key players unavailable: {}", absences.join("; ")),
        ))
    }
}

/// Heavy fouling signals an ill-tempered, unpredictable match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisciplineRiskRule {
    pub stat: String,
    pub threshold: f64,
    pub weight: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bet_types: Option<Vec<BetType>>,
}

impl Default for DisciplineRiskRule {
    fn default() -> Self {
        Self {
            stat: "fouls".to_string(),
            threshold: 26.0,
            weight: 0.2,
            bet_types: None,
        }
    }
}

impl Rule for DisciplineRiskRule {
    fn id(&self) -> &'static str {
        "discipline_risk"
    }

    fn applies_to(&self, bet_type: BetType) -> bool {
        applies(&self.bet_types, &BetType::ALL, bet_type)
    }

    fn evaluate(&self, facts: &FactSet) -> RuleOutcome {
        let Some(value) = facts.match_fact().stat(&self.stat) else {
            return RuleOutcome::MissingData(format!("observed stat '{}'", self.stat));
        };
        if value < self.threshold {
            return RuleOutcome::NotMatched;
        }
        RuleOutcome::Fired(Signal::new(
            self.id(),
            Direction::FavorsRisky,
            self.weight,
            format!("{:.0} {} observed, a sign of low discipline", value, self.stat),
        ))
    }
}

// ============================================================================
// Goals and market
// ============================================================================

/// Expected total goals versus the bet's line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GoalExpectationRule {
    pub margin: f64,
    pub max_weight: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bet_types: Option<Vec<BetType>>,
}

impl Default for GoalExpectationRule {
    fn default() -> Self {
        Self {
            margin: 0.3,
            max_weight: 0.6,
            bet_types: None,
        }
    }
}

impl Rule for GoalExpectationRule {
    fn id(&self) -> &'static str {
        "goal_expectation"
    }

    fn applies_to(&self, bet_type: BetType) -> bool {
        applies(&self.bet_types, GOAL_LINE_BETS, bet_type)
    }

    fn evaluate(&self, facts: &FactSet) -> RuleOutcome {
        let bet_type = facts.bet().bet_type();
        if !bet_type.is_goal_line() {
            return RuleOutcome::NotMatched;
        }
        let Some((home_xg, away_xg)) = expected_goals(facts) else {
            return RuleOutcome::MissingData("goal averages".into());
        };
        let expected = home_xg + away_xg;
        let line = facts.bet().line();
        let diff = expected - line;
        if diff.abs() <= self.margin {
            return RuleOutcome::NotMatched;
        }

        let agrees = (bet_type == BetType::Over) == (diff > 0.0);
        let direction = if agrees { Direction::FavorsSafe } else { Direction::FavorsRisky };
        let side = if diff > 0.0 { "above" } else { "below" };
        RuleOutcome::Fired(Signal::new(
            self.id(),
            direction,
            (diff.abs() / 2.0).min(self.max_weight),
            format!("Expected goals {:.2} sit {} the {:.1} line", expected, side, line),
        ))
    }
}

/// Both attacks clear the scoring threshold, or at least one does not
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BothTeamsScoreRule {
    pub threshold: f64,
    pub weight: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bet_types: Option<Vec<BetType>>,
}

impl Default for BothTeamsScoreRule {
    fn default() -> Self {
        Self {
            threshold: 1.0,
            weight: 0.35,
            bet_types: None,
        }
    }
}

impl Rule for BothTeamsScoreRule {
    fn id(&self) -> &'static str {
        "both_teams_score"
    }

    fn applies_to(&self, bet_type: BetType) -> bool {
        applies(&self.bet_types, BTTS_BETS, bet_type)
    }

    fn evaluate(&self, facts: &FactSet) -> RuleOutcome {
        let bet_type = facts.bet().bet_type();
        if !bet_type.is_btts() {
            return RuleOutcome::NotMatched;
        }
        let Some((home_xg, away_xg)) = expected_goals(facts) else {
            return RuleOutcome::MissingData("goal averages".into());
        };
        let likely = home_xg >= self.threshold && away_xg >= self.threshold;
        let agrees = (bet_type == BetType::BttsYes) == likely;
        let direction = if agrees { Direction::FavorsSafe } else { Direction::FavorsRisky };
        let verdict = if likely { "both sides likely to score" } else { "a clean sheet is plausible" };
        RuleOutcome::Fired(Signal::new(
            self.id(),
            direction,
            self.weight,
            format!(
                "Expected goals {:.2} for {} and {:.2} for {}: {}",
                home_xg,
                facts.home().team_id(),
                away_xg,
                facts.away().team_id(),
                verdict
            ),
        ))
    }
}

/// Bookmaker odds as a prior: short prices back the bet, long prices doubt it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OddsValueRule {
    /// Implied probability at or above this favors the bet
    pub short_from: f64,
    /// Implied probability at or below this counts against it
    pub long_below: f64,
    pub max_weight: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bet_types: Option<Vec<BetType>>,
}

impl Default for OddsValueRule {
    fn default() -> Self {
        Self {
            short_from: 0.6,
            long_below: 0.3,
            max_weight: 0.4,
            bet_types: None,
        }
    }
}

impl Rule for OddsValueRule {
    fn id(&self) -> &'static str {
        "odds_value"
    }

    fn applies_to(&self, bet_type: BetType) -> bool {
        applies(&self.bet_types, &BetType::ALL, bet_type)
    }

    fn evaluate(&self, facts: &FactSet) -> RuleOutcome {
        let (Some(odds), Some(implied)) = (facts.bet().market_odds(), facts.bet().implied_probability())
        else {
            return RuleOutcome::MissingData("market_odds".into());
        };
        let (direction, weight, reading) = if implied >= self.short_from {
            (Direction::FavorsSafe, implied - 0.5, "the market expects it")
        } else if implied <= self.long_below {
            (Direction::FavorsRisky, 0.5 - implied, "the market doubts it")
        } else {
            return RuleOutcome::NotMatched;
        };
        // A market near even money carries no signal either way
        let weight = weight.min(self.max_weight);
        if weight <= 0.0 {
            return RuleOutcome::NotMatched;
        }
        RuleOutcome::Fired(Signal::new(
            self.id(),
            direction,
            weight,
            format!(
                "Odds of {:.2} imply {:.0}% for {}: {}",
                odds,
                percent(implied),
                facts.bet().bet_type(),
                reading
            ),
        ))
    }
}
