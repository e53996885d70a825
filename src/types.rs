//! Core fact types
//!
//! Facts are immutable, validated at construction, and scoped to a single
//! inference run. Deserialization goes through the same constructors, so a
//! fact that exists is always a valid fact.

use crate::error::{EngineError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Stats that can never be negative when observed
pub const NON_NEGATIVE_STATS: &[&str] = &[
    "possession",
    "shots",
    "shots_on_target",
    "fouls",
    "corners",
    "yellow_cards",
    "red_cards",
    "goals",
];

/// Default goal line for over/under bets
pub const DEFAULT_GOAL_LINE: f64 = 2.5;

/// Tournament stage of a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompetitionStage {
    Group,
    RoundOf16,
    Quarterfinal,
    Semifinal,
    Final,
}

impl CompetitionStage {
    pub const ALL: [CompetitionStage; 5] = [
        CompetitionStage::Group,
        CompetitionStage::RoundOf16,
        CompetitionStage::Quarterfinal,
        CompetitionStage::Semifinal,
        CompetitionStage::Final,
    ];

    /// Elimination matches: everything after the group phase
    pub fn is_knockout(&self) -> bool {
        !matches!(self, CompetitionStage::Group)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CompetitionStage::Group => "group",
            CompetitionStage::RoundOf16 => "round_of_16",
            CompetitionStage::Quarterfinal => "quarterfinal",
            CompetitionStage::Semifinal => "semifinal",
            CompetitionStage::Final => "final",
        }
    }
}

impl fmt::Display for CompetitionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a single past match from a team's perspective
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormResult {
    Win,
    Draw,
    Loss,
}

/// The wager under evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BetType {
    HomeWin,
    Draw,
    AwayWin,
    Over,
    Under,
    BttsYes,
    BttsNo,
}

impl BetType {
    pub const ALL: [BetType; 7] = [
        BetType::HomeWin,
        BetType::Draw,
        BetType::AwayWin,
        BetType::Over,
        BetType::Under,
        BetType::BttsYes,
        BetType::BttsNo,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BetType::HomeWin => "home_win",
            BetType::Draw => "draw",
            BetType::AwayWin => "away_win",
            BetType::Over => "over",
            BetType::Under => "under",
            BetType::BttsYes => "btts_yes",
            BetType::BttsNo => "btts_no",
        }
    }

    /// Bets settled on the match result (1X2 market)
    pub fn is_result_market(&self) -> bool {
        matches!(self, BetType::HomeWin | BetType::Draw | BetType::AwayWin)
    }

    pub fn is_goal_line(&self) -> bool {
        matches!(self, BetType::Over | BetType::Under)
    }

    pub fn is_btts(&self) -> bool {
        matches!(self, BetType::BttsYes | BetType::BttsNo)
    }
}

impl fmt::Display for BetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Past meetings between the two sides, counted from the home side's view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeadToHead {
    pub home_wins: u32,
    pub draws: u32,
    pub away_wins: u32,
}

impl HeadToHead {
    pub fn total(&self) -> u64 {
        u64::from(self.home_wins) + u64::from(self.draws) + u64::from(self.away_wins)
    }

    /// Home share of head-to-head points, draws counting half. `None` without meetings.
    pub fn home_share(&self) -> Option<f64> {
        let total = self.total();
        if total == 0 {
            return None;
        }
        Some((self.home_wins as f64 + 0.5 * self.draws as f64) / total as f64)
    }
}

// ============================================================================
// TeamFact
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
struct TeamFactRecord {
    team_id: String,
    recent_form: Vec<FormResult>,
    #[serde(default)]
    competition_performance: f64,
    #[serde(default)]
    key_player_availability: BTreeMap<String, bool>,
    #[serde(default)]
    home_win_rate: Option<f64>,
    #[serde(default)]
    goals_per_match: Option<f64>,
    #[serde(default)]
    goals_conceded_per_match: Option<f64>,
}

/// Per-team facts derived by the data provider from historical records
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TeamFactRecord")]
pub struct TeamFact {
    team_id: String,
    recent_form: Vec<FormResult>,
    competition_performance: f64,
    key_player_availability: BTreeMap<String, bool>,
    home_win_rate: Option<f64>,
    goals_per_match: Option<f64>,
    goals_conceded_per_match: Option<f64>,
}

impl TeamFact {
    pub fn new(
        team_id: impl Into<String>,
        recent_form: Vec<FormResult>,
        competition_performance: f64,
        key_player_availability: BTreeMap<String, bool>,
    ) -> Result<Self> {
        let team_id = team_id.into();
        if team_id.trim().is_empty() {
            return Err(EngineError::malformed("team_id must not be empty"));
        }
        if recent_form.is_empty() {
            return Err(EngineError::malformed(format!(
                "recent_form for team '{}' is empty",
                team_id
            )));
        }
        if !competition_performance.is_finite() {
            return Err(EngineError::malformed(format!(
                "competition_performance for team '{}' is not finite",
                team_id
            )));
        }
        Ok(Self {
            team_id,
            recent_form,
            competition_performance,
            key_player_availability,
            home_win_rate: None,
            goals_per_match: None,
            goals_conceded_per_match: None,
        })
    }

    /// Attach the team's historical home win rate (0-1)
    pub fn with_home_win_rate(mut self, rate: f64) -> Result<Self> {
        if !(0.0..=1.0).contains(&rate) {
            return Err(EngineError::malformed(format!(
                "home_win_rate for team '{}' must be within [0, 1], got {}",
                self.team_id, rate
            )));
        }
        self.home_win_rate = Some(rate);
        Ok(self)
    }

    /// Attach scoring and conceding averages per match
    pub fn with_goal_averages(mut self, scored: f64, conceded: f64) -> Result<Self> {
        for (name, value) in [("goals_per_match", scored), ("goals_conceded_per_match", conceded)] {
            if !value.is_finite() || value < 0.0 {
                return Err(EngineError::malformed(format!(
                    "{} for team '{}' must be a non-negative number, got {}",
                    name, self.team_id, value
                )));
            }
        }
        self.goals_per_match = Some(scored);
        self.goals_conceded_per_match = Some(conceded);
        Ok(self)
    }

    pub fn team_id(&self) -> &str {
        &self.team_id
    }

    pub fn recent_form(&self) -> &[FormResult] {
        &self.recent_form
    }

    pub fn competition_performance(&self) -> f64 {
        self.competition_performance
    }

    pub fn key_player_availability(&self) -> &BTreeMap<String, bool> {
        &self.key_player_availability
    }

    pub fn home_win_rate(&self) -> Option<f64> {
        self.home_win_rate
    }

    pub fn goals_per_match(&self) -> Option<f64> {
        self.goals_per_match
    }

    pub fn goals_conceded_per_match(&self) -> Option<f64> {
        self.goals_conceded_per_match
    }

    /// Wins divided by matches in `recent_form`
    pub fn win_rate(&self) -> f64 {
        let wins = self
            .recent_form
            .iter()
            .filter(|r| **r == FormResult::Win)
            .count();
        wins as f64 / self.recent_form.len() as f64
    }

    /// Key players flagged as unavailable, in id order
    pub fn unavailable_players(&self) -> Vec<&str> {
        self.key_player_availability
            .iter()
            .filter(|(_, available)| !**available)
            .map(|(id, _)| id.as_str())
            .collect()
    }

    /// Fraction of tracked key players that are unavailable. `None` when nothing is tracked.
    pub fn unavailable_fraction(&self) -> Option<f64> {
        if self.key_player_availability.is_empty() {
            return None;
        }
        Some(self.unavailable_players().len() as f64 / self.key_player_availability.len() as f64)
    }
}

impl TryFrom<TeamFactRecord> for TeamFact {
    type Error = EngineError;

    fn try_from(r: TeamFactRecord) -> Result<Self> {
        let mut fact = TeamFact::new(
            r.team_id,
            r.recent_form,
            r.competition_performance,
            r.key_player_availability,
        )?;
        if let Some(rate) = r.home_win_rate {
            fact = fact.with_home_win_rate(rate)?;
        }
        match (r.goals_per_match, r.goals_conceded_per_match) {
            (Some(scored), Some(conceded)) => fact = fact.with_goal_averages(scored, conceded)?,
            (None, None) => {}
            _ => {
                return Err(EngineError::malformed(format!(
                    "team '{}' must supply both goals_per_match and goals_conceded_per_match or neither",
                    fact.team_id
                )))
            }
        }
        Ok(fact)
    }
}

// ============================================================================
// MatchFact
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
struct MatchFactRecord {
    home_team_id: String,
    away_team_id: String,
    competition_stage: CompetitionStage,
    #[serde(default)]
    observed_stats: BTreeMap<String, f64>,
    #[serde(default)]
    head_to_head: Option<HeadToHead>,
}

/// The match under analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "MatchFactRecord")]
pub struct MatchFact {
    home_team_id: String,
    away_team_id: String,
    competition_stage: CompetitionStage,
    observed_stats: BTreeMap<String, f64>,
    head_to_head: Option<HeadToHead>,
}

impl MatchFact {
    pub fn new(
        home_team_id: impl Into<String>,
        away_team_id: impl Into<String>,
        competition_stage: CompetitionStage,
        observed_stats: BTreeMap<String, f64>,
    ) -> Result<Self> {
        let home_team_id = home_team_id.into();
        let away_team_id = away_team_id.into();
        if home_team_id == away_team_id {
            return Err(EngineError::malformed(format!(
                "home and away team are both '{}'",
                home_team_id
            )));
        }
        for (name, value) in &observed_stats {
            if !value.is_finite() {
                return Err(EngineError::malformed(format!("stat '{}' is not finite", name)));
            }
            if *value < 0.0 && NON_NEGATIVE_STATS.contains(&name.as_str()) {
                return Err(EngineError::malformed(format!(
                    "stat '{}' must be non-negative, got {}",
                    name, value
                )));
            }
        }
        if let Some(possession) = observed_stats.get("possession") {
            if *possession > 100.0 {
                return Err(EngineError::malformed(format!(
                    "possession is a percentage, got {}",
                    possession
                )));
            }
        }
        Ok(Self {
            home_team_id,
            away_team_id,
            competition_stage,
            observed_stats,
            head_to_head: None,
        })
    }

    pub fn with_head_to_head(mut self, h2h: HeadToHead) -> Self {
        self.head_to_head = Some(h2h);
        self
    }

    pub fn home_team_id(&self) -> &str {
        &self.home_team_id
    }

    pub fn away_team_id(&self) -> &str {
        &self.away_team_id
    }

    pub fn competition_stage(&self) -> CompetitionStage {
        self.competition_stage
    }

    pub fn observed_stats(&self) -> &BTreeMap<String, f64> {
        &self.observed_stats
    }

    pub fn stat(&self, name: &str) -> Option<f64> {
        self.observed_stats.get(name).copied()
    }

    pub fn head_to_head(&self) -> Option<&HeadToHead> {
        self.head_to_head.as_ref()
    }
}

impl TryFrom<MatchFactRecord> for MatchFact {
    type Error = EngineError;

    fn try_from(r: MatchFactRecord) -> Result<Self> {
        let fact = MatchFact::new(r.home_team_id, r.away_team_id, r.competition_stage, r.observed_stats)?;
        Ok(match r.head_to_head {
            Some(h2h) => fact.with_head_to_head(h2h),
            None => fact,
        })
    }
}

// ============================================================================
// BetCandidateFact
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
struct BetCandidateRecord {
    bet_type: BetType,
    #[serde(default)]
    market_odds: Option<f64>,
    #[serde(default)]
    line: Option<f64>,
}

/// The specific wager under evaluation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "BetCandidateRecord")]
pub struct BetCandidateFact {
    bet_type: BetType,
    market_odds: Option<f64>,
    line: f64,
}

impl BetCandidateFact {
    pub fn new(bet_type: BetType, market_odds: Option<f64>) -> Result<Self> {
        if let Some(odds) = market_odds {
            if !odds.is_finite() || odds <= 0.0 {
                return Err(EngineError::malformed(format!(
                    "market_odds must be a positive number, got {}",
                    odds
                )));
            }
        }
        Ok(Self {
            bet_type,
            market_odds,
            line: DEFAULT_GOAL_LINE,
        })
    }

    /// Override the goal line used by over/under bets
    pub fn with_line(mut self, line: f64) -> Result<Self> {
        if !line.is_finite() || line <= 0.0 {
            return Err(EngineError::malformed(format!("goal line must be positive, got {}", line)));
        }
        self.line = line;
        Ok(self)
    }

    pub fn bet_type(&self) -> BetType {
        self.bet_type
    }

    pub fn market_odds(&self) -> Option<f64> {
        self.market_odds
    }

    pub fn line(&self) -> f64 {
        self.line
    }

    /// Bookmaker implied probability (1 / decimal odds)
    pub fn implied_probability(&self) -> Option<f64> {
        self.market_odds.map(|odds| 1.0 / odds)
    }
}

impl TryFrom<BetCandidateRecord> for BetCandidateFact {
    type Error = EngineError;

    fn try_from(r: BetCandidateRecord) -> Result<Self> {
        let bet = BetCandidateFact::new(r.bet_type, r.market_odds)?;
        match r.line {
            Some(line) => bet.with_line(line),
            None => Ok(bet),
        }
    }
}

// ============================================================================
// FactSet
// ============================================================================

/// Validated fact set for one query. The only input rules and the evidence mapper see.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FactSet {
    match_fact: MatchFact,
    home: TeamFact,
    away: TeamFact,
    bet: BetCandidateFact,
}

impl FactSet {
    /// Cross-checks that the match references exactly the supplied teams
    pub fn new(
        match_fact: MatchFact,
        home: TeamFact,
        away: TeamFact,
        bet: BetCandidateFact,
    ) -> Result<Self> {
        if match_fact.home_team_id() != home.team_id() {
            return Err(EngineError::malformed(format!(
                "match home team '{}' does not correspond to supplied team '{}'",
                match_fact.home_team_id(),
                home.team_id()
            )));
        }
        if match_fact.away_team_id() != away.team_id() {
            return Err(EngineError::malformed(format!(
                "match away team '{}' does not correspond to supplied team '{}'",
                match_fact.away_team_id(),
                away.team_id()
            )));
        }
        Ok(Self {
            match_fact,
            home,
            away,
            bet,
        })
    }

    pub fn match_fact(&self) -> &MatchFact {
        &self.match_fact
    }

    pub fn home(&self) -> &TeamFact {
        &self.home
    }

    pub fn away(&self) -> &TeamFact {
        &self.away
    }

    pub fn bet(&self) -> &BetCandidateFact {
        &self.bet
    }

    /// Home win rate minus away win rate over recent form
    pub fn form_gap(&self) -> f64 {
        self.home.win_rate() - self.away.win_rate()
    }
}
