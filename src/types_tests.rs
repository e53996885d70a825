//! Tests for core fact types

#[cfg(test)]
mod tests {
    use super::super::error::EngineError;
    use super::super::fixtures::{form, team};
    use super::super::types::*;
    use std::collections::BTreeMap;

    fn make_test_stats(pairs: &[(&str, f64)]) -> BTreeMap<String, f64> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_bet_type_serialization() {
        assert_eq!(serde_json::to_string(&BetType::HomeWin).unwrap(), "\"home_win\"");
        assert_eq!(serde_json::to_string(&BetType::BttsNo).unwrap(), "\"btts_no\"");
        let parsed: BetType = serde_json::from_str("\"away_win\"").unwrap();
        assert_eq!(parsed, BetType::AwayWin);
    }

    #[test]
    fn test_stage_names_match_serde() {
        for stage in CompetitionStage::ALL {
            let json = serde_json::to_string(&stage).unwrap();
            assert_eq!(json, format!("\"{}\"", stage.as_str()));
        }
        assert!(!CompetitionStage::Group.is_knockout());
        assert!(CompetitionStage::Final.is_knockout());
        assert!(CompetitionStage::RoundOf16.is_knockout());
    }

    #[test]
    fn test_bet_type_markets() {
        assert!(BetType::Draw.is_result_market());
        assert!(BetType::Under.is_goal_line());
        assert!(BetType::BttsYes.is_btts());
        assert!(!BetType::Over.is_result_market());
    }

    #[test]
    fn test_win_rate() {
        let t = team("ARG", 3, 1, 1).unwrap();
        assert!((t.win_rate() - 0.6).abs() < 1e-12);
        let unbeaten = team("ESP", 5, 0, 0).unwrap();
        assert_eq!(unbeaten.win_rate(), 1.0);
    }

    #[test]
    fn test_team_rejects_empty_form() {
        let err = TeamFact::new("ARG", Vec::new(), 0.0, BTreeMap::new()).unwrap_err();
        assert!(matches!(err, EngineError::MalformedFact(_)));
    }

    #[test]
    fn test_team_rejects_empty_id() {
        assert!(TeamFact::new("  ", form(1, 0, 0), 0.0, BTreeMap::new()).is_err());
    }

    #[test]
    fn test_team_rejects_non_finite_performance() {
        assert!(TeamFact::new("ARG", form(1, 0, 0), f64::NAN, BTreeMap::new()).is_err());
    }

    #[test]
    fn test_home_win_rate_range() {
        let t = team("ARG", 1, 0, 0).unwrap();
        assert!(t.clone().with_home_win_rate(1.2).is_err());
        assert!(t.clone().with_home_win_rate(-0.1).is_err());
        assert_eq!(t.with_home_win_rate(0.7).unwrap().home_win_rate(), Some(0.7));
    }

    #[test]
    fn test_goal_averages_non_negative() {
        let t = team("ARG", 1, 0, 0).unwrap();
        assert!(t.clone().with_goal_averages(-1.0, 1.0).is_err());
        let t = t.with_goal_averages(1.5, 0.8).unwrap();
        assert_eq!(t.goals_per_match(), Some(1.5));
        assert_eq!(t.goals_conceded_per_match(), Some(0.8));
    }

    #[test]
    fn test_unavailable_players() {
        let availability = BTreeMap::from([
            ("b_player".to_string(), false),
            ("a_player".to_string(), false),
            ("c_player".to_string(), true),
        ]);
        let t = TeamFact::new("ARG", form(2, 0, 0), 1.0, availability).unwrap();
        assert_eq!(t.unavailable_players(), vec!["a_player", "b_player"]);
        assert!((t.unavailable_fraction().unwrap() - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(team("NED", 1, 0, 0).unwrap().unavailable_fraction(), None);
    }

    #[test]
    fn test_match_rejects_same_teams() {
        let err = MatchFact::new("ARG", "ARG", CompetitionStage::Final, BTreeMap::new()).unwrap_err();
        assert!(err.is_caller_error());
    }

    #[test]
    fn test_match_rejects_negative_stat() {
        let stats = make_test_stats(&[("possession", -5.0)]);
        assert!(MatchFact::new("ARG", "NED", CompetitionStage::Group, stats).is_err());
    }

    #[test]
    fn test_match_allows_negative_unknown_stat() {
        let stats = make_test_stats(&[("goal_difference", -2.0)]);
        let m = MatchFact::new("ARG", "NED", CompetitionStage::Group, stats).unwrap();
        assert_eq!(m.stat("goal_difference"), Some(-2.0));
        assert_eq!(m.stat("fouls"), None);
    }

    #[test]
    fn test_match_rejects_possession_over_100() {
        let stats = make_test_stats(&[("possession", 120.0)]);
        assert!(MatchFact::new("ARG", "NED", CompetitionStage::Group, stats).is_err());
    }

    #[test]
    fn test_match_rejects_nan_stat() {
        let stats = make_test_stats(&[("shots", f64::NAN)]);
        assert!(MatchFact::new("ARG", "NED", CompetitionStage::Group, stats).is_err());
    }

    #[test]
    fn test_head_to_head_share() {
        let h2h = HeadToHead {
            home_wins: 2,
            draws: 2,
            away_wins: 0,
        };
        assert_eq!(h2h.total(), 4);
        assert!((h2h.home_share().unwrap() - 0.75).abs() < 1e-12);
        let none = HeadToHead {
            home_wins: 0,
            draws: 0,
            away_wins: 0,
        };
        assert_eq!(none.home_share(), None);
    }

    #[test]
    fn test_head_to_head_share_with_huge_counts() {
        let h2h = HeadToHead {
            home_wins: u32::MAX,
            draws: 1,
            away_wins: 0,
        };
        assert_eq!(h2h.total(), u64::from(u32::MAX) + 1);
        let share = h2h.home_share().unwrap();
        assert!(share > 0.99 && share <= 1.0);
    }

    #[test]
    fn test_bet_candidate_odds() {
        assert!(BetCandidateFact::new(BetType::HomeWin, Some(0.0)).is_err());
        assert!(BetCandidateFact::new(BetType::HomeWin, Some(f64::INFINITY)).is_err());
        let bet = BetCandidateFact::new(BetType::HomeWin, Some(2.0)).unwrap();
        assert_eq!(bet.implied_probability(), Some(0.5));
        assert_eq!(bet.line(), DEFAULT_GOAL_LINE);
        assert_eq!(BetCandidateFact::new(BetType::Draw, None).unwrap().implied_probability(), None);
    }

    #[test]
    fn test_bet_candidate_line() {
        let bet = BetCandidateFact::new(BetType::Over, None).unwrap();
        assert!(bet.clone().with_line(0.0).is_err());
        assert_eq!(bet.with_line(3.5).unwrap().line(), 3.5);
    }

    #[test]
    fn test_fact_set_cross_check() {
        let m = MatchFact::new("ARG", "NED", CompetitionStage::Group, BTreeMap::new()).unwrap();
        let bet = BetCandidateFact::new(BetType::HomeWin, None).unwrap();
        let swapped = FactSet::new(
            m.clone(),
            team("NED", 1, 0, 0).unwrap(),
            team("ARG", 1, 0, 0).unwrap(),
            bet.clone(),
        );
        assert!(matches!(swapped, Err(EngineError::MalformedFact(_))));

        let ok = FactSet::new(m, team("ARG", 4, 0, 1).unwrap(), team("NED", 1, 0, 4).unwrap(), bet).unwrap();
        assert!((ok.form_gap() - 0.6).abs() < 1e-12);
    }

    #[test]
    fn test_team_deserialization_validates() {
        let json = r#"{"team_id": "ARG", "recent_form": ["win", "draw"], "home_win_rate": 0.6}"#;
        let t: TeamFact = serde_json::from_str(json).unwrap();
        assert_eq!(t.recent_form(), &[FormResult::Win, FormResult::Draw]);
        assert_eq!(t.home_win_rate(), Some(0.6));

        let empty = r#"{"team_id": "ARG", "recent_form": []}"#;
        let err = serde_json::from_str::<TeamFact>(empty).unwrap_err();
        assert!(err.to_string().contains("recent_form"));

        let half = r#"{"team_id": "ARG", "recent_form": ["win"], "goals_per_match": 1.2}"#;
        assert!(serde_json::from_str::<TeamFact>(half).is_err());
    }

    #[test]
    fn test_match_deserialization() {
        let json = r#"{
            "home_team_id": "ARG",
            "away_team_id": "NED",
            "competition_stage": "quarterfinal",
            "observed_stats": {"fouls": 30},
            "head_to_head": {"home_wins": 3, "draws": 1, "away_wins": 1}
        }"#;
        let m: MatchFact = serde_json::from_str(json).unwrap();
        assert_eq!(m.competition_stage(), CompetitionStage::Quarterfinal);
        assert_eq!(m.stat("fouls"), Some(30.0));
        assert_eq!(m.head_to_head().unwrap().home_wins, 3);
    }

    #[test]
    fn test_bet_deserialization_line_default() {
        let bet: BetCandidateFact = serde_json::from_str(r#"{"bet_type": "under"}"#).unwrap();
        assert_eq!(bet.line(), 2.5);
        assert!(serde_json::from_str::<BetCandidateFact>(r#"{"bet_type": "over", "line": -1}"#).is_err());
    }
}
