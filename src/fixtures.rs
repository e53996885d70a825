//! Canonical fact sets
//!
//! Shared by the test suites and the `demo` command.

use crate::engine::MatchQuery;
use crate::error::Result;
use crate::types::{
    BetCandidateFact, BetType, CompetitionStage, FactSet, FormResult, HeadToHead, MatchFact, TeamFact,
};
use std::collections::BTreeMap;

/// Recent form with wins first, then draws, then losses
pub fn form(wins: usize, draws: usize, losses: usize) -> Vec<FormResult> {
    let mut results = vec![FormResult::Win; wins];
    results.extend(std::iter::repeat(FormResult::Draw).take(draws));
    results.extend(std::iter::repeat(FormResult::Loss).take(losses));
    results
}

/// Team with only recent form; no availability, venue, or goal data
pub fn team(id: &str, wins: usize, draws: usize, losses: usize) -> Result<TeamFact> {
    TeamFact::new(id, form(wins, draws, losses), 0.0, BTreeMap::new())
}

pub fn plain_match(home: &str, away: &str, stage: CompetitionStage) -> Result<MatchFact> {
    MatchFact::new(home, away, stage, BTreeMap::new())
}

/// Unbeaten home side against a struggling visitor in the group stage
pub fn dominant_home(bet_type: BetType) -> Result<FactSet> {
    FactSet::new(
        plain_match("HOME", "AWAY", CompetitionStage::Group)?,
        team("HOME", 5, 0, 0)?,
        team("AWAY", 1, 1, 3)?,
        BetCandidateFact::new(bet_type, None)?,
    )
}

/// Two sides with identical form at the given stage
pub fn balanced(stage: CompetitionStage, bet_type: BetType) -> Result<FactSet> {
    FactSet::new(
        plain_match("HOME", "AWAY", stage)?,
        team("HOME", 2, 2, 1)?,
        team("AWAY", 2, 2, 1)?,
        BetCandidateFact::new(bet_type, None)?,
    )
}

/// Fully populated quarterfinal used by the `demo` command
pub fn demo_query() -> Result<MatchQuery> {
    let stats = BTreeMap::from([
        ("possession".to_string(), 54.0),
        ("shots".to_string(), 13.0),
        ("fouls".to_string(), 27.0),
    ]);
    let match_fact = MatchFact::new("ARG", "NED", CompetitionStage::Quarterfinal, stats)?.with_head_to_head(
        HeadToHead {
            home_wins: 3,
            draws: 4,
            away_wins: 1,
        },
    );

    let home_team = TeamFact::new(
        "ARG",
        form(4, 1, 0),
        2.4,
        BTreeMap::from([("messi".to_string(), true), ("di_maria".to_string(), false)]),
    )?
    .with_home_win_rate(0.68)?
    .with_goal_averages(2.1, 0.7)?;

    let away_team = TeamFact::new(
        "NED",
        form(3, 1, 1),
        2.1,
        BTreeMap::from([("van_dijk".to_string(), true), ("de_jong".to_string(), true)]),
    )?
    .with_home_win_rate(0.55)?
    .with_goal_averages(1.8, 0.9)?;

    let odds = BTreeMap::from([
        (BetType::HomeWin, 1.95),
        (BetType::Draw, 3.30),
        (BetType::AwayWin, 4.20),
        (BetType::Over, 2.05),
        (BetType::Under, 1.80),
        (BetType::BttsYes, 1.95),
        (BetType::BttsNo, 1.85),
    ]);

    Ok(MatchQuery {
        match_fact,
        home_team,
        away_team,
        bet: Some(BetCandidateFact::new(BetType::HomeWin, Some(1.95))?),
        odds,
    })
}
