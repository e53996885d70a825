//! End-to-end tests for the bet evaluator

#[cfg(test)]
mod tests {
    use super::super::bayes::{football_network, EvidenceMapper, InferenceMethod, SamplerSettings, PROBABILITY_TOLERANCE};
    use super::super::config::{Config, EvidenceConfig, FusionConfig, OutcomeMapping};
    use super::super::engine::{BetEvaluator, MatchQuery};
    use super::super::error::EngineError;
    use super::super::fixtures::{balanced, demo_query, dominant_home, plain_match, team};
    use super::super::fusion::{Classification, Concordance, FusionEngine, Verdict};
    use super::super::rules::{Direction, RuleEngine};
    use super::super::types::*;
    use std::collections::BTreeMap;
    use std::io::Write;

    fn make_test_evaluator() -> BetEvaluator {
        BetEvaluator::with_defaults().unwrap()
    }

    fn evaluate(evaluator: &BetEvaluator, facts: &FactSet) -> Verdict {
        evaluator
            .evaluate(facts.match_fact(), facts.home(), facts.away(), facts.bet())
            .unwrap()
    }

    fn signal_weight(verdict: &Verdict, rule_id: &str) -> Option<f64> {
        verdict
            .contributing_signals
            .iter()
            .find(|s| s.rule_id() == rule_id)
            .map(|s| s.weight())
    }

    #[test]
    fn test_dominant_home_form_is_safe() {
        let evaluator = make_test_evaluator();
        let verdict = evaluate(&evaluator, &dominant_home(BetType::HomeWin).unwrap());

        let form = verdict
            .contributing_signals
            .iter()
            .find(|s| s.rule_id() == "form_advantage")
            .unwrap();
        assert_eq!(form.direction(), Direction::FavorsSafe);
        assert!((form.weight() - 0.8).abs() < 1e-9);
        assert!(signal_weight(&verdict, "knockout_stage").is_none());
        assert_eq!(verdict.classification, Classification::Safe);
        assert_eq!(verdict.concordance, Concordance::Agree);
        assert!(verdict.safe_probability > 0.5);
    }

    #[test]
    fn test_final_pulls_toward_risky() {
        let evaluator = make_test_evaluator();
        let group = evaluate(&evaluator, &balanced(CompetitionStage::Group, BetType::HomeWin).unwrap());
        let final_match = evaluate(&evaluator, &balanced(CompetitionStage::Final, BetType::HomeWin).unwrap());

        assert!(signal_weight(&group, "knockout_stage").is_none());
        let knockout = final_match
            .contributing_signals
            .iter()
            .find(|s| s.rule_id() == "knockout_stage")
            .unwrap();
        assert_eq!(knockout.direction(), Direction::FavorsRisky);
        assert!((knockout.weight() - 0.3).abs() < 1e-12);
        assert!(final_match.combined_score < group.combined_score);
        assert!(final_match.rule_score < group.rule_score);
    }

    #[test]
    fn test_confidence_and_posterior_bounds() {
        let evaluator = make_test_evaluator();
        let q = demo_query().unwrap();
        let mut fact_sets = Vec::new();
        for bet_type in BetType::ALL {
            fact_sets.push(dominant_home(bet_type).unwrap());
            for stage in CompetitionStage::ALL {
                fact_sets.push(balanced(stage, bet_type).unwrap());
            }
            let bet = BetCandidateFact::new(bet_type, q.odds.get(&bet_type).copied()).unwrap();
            fact_sets.push(FactSet::new(q.match_fact.clone(), q.home_team.clone(), q.away_team.clone(), bet).unwrap());
        }

        for facts in &fact_sets {
            let v = evaluate(&evaluator, facts);
            assert!((0.0..=1.0).contains(&v.confidence), "{:?}", v);
            assert!((-1.0..=1.0).contains(&v.rule_score));
            assert!((-1.0..=1.0).contains(&v.combined_score));
            assert!((v.posterior_summary.total() - 1.0).abs() <= PROBABILITY_TOLERANCE);
            assert_eq!(v.classification == Classification::Safe, v.combined_score >= 0.0);
            for s in &v.contributing_signals {
                assert!((0.0..=1.0).contains(&s.weight()));
            }
        }
    }

    #[test]
    fn test_evaluation_is_deterministic() {
        let evaluator = make_test_evaluator();
        let q = demo_query().unwrap();
        let bet = q.bet.clone().unwrap();
        let a = evaluator.evaluate(&q.match_fact, &q.home_team, &q.away_team, &bet).unwrap();
        let b = evaluator.evaluate(&q.match_fact, &q.home_team, &q.away_team, &bet).unwrap();
        assert_eq!(a, b);
        assert_eq!(serde_json::to_string(&a).unwrap(), serde_json::to_string(&b).unwrap());

        let other = make_test_evaluator();
        let c = other.evaluate(&q.match_fact, &q.home_team, &q.away_team, &bet).unwrap();
        assert_eq!(a, c);
    }

    #[test]
    fn test_home_form_monotonic() {
        let evaluator = make_test_evaluator();
        let away = team("AWAY", 1, 1, 3).unwrap();
        let bet = BetCandidateFact::new(BetType::HomeWin, None).unwrap();
        let m = plain_match("HOME", "AWAY", CompetitionStage::Group).unwrap();

        let mut last_weight = 0.0;
        let mut last_rule = f64::NEG_INFINITY;
        let mut last_combined = f64::NEG_INFINITY;
        for wins in 0..=5 {
            let home = team("HOME", wins, 0, 5 - wins).unwrap();
            let v = evaluator.evaluate(&m, &home, &away, &bet).unwrap();
            let weight = signal_weight(&v, "form_advantage").unwrap_or(0.0);
            assert!(weight >= last_weight, "form weight fell at {} wins", wins);
            assert!(v.rule_score >= last_rule);
            assert!(v.combined_score >= last_combined);
            last_weight = weight;
            last_rule = v.rule_score;
            last_combined = v.combined_score;
        }
        assert!(last_weight > 0.0);
    }

    #[test]
    fn test_huge_head_to_head_counts_evaluate() {
        let evaluator = make_test_evaluator();
        let match_fact: MatchFact = serde_json::from_str(
            r#"{"home_team_id":"HOME","away_team_id":"AWAY","competition_stage":"group",
                "head_to_head":{"home_wins":4294967295,"draws":1,"away_wins":0}}"#,
        )
        .unwrap();
        let verdict = evaluator
            .evaluate(
                &match_fact,
                &team("HOME", 3, 1, 1).unwrap(),
                &team("AWAY", 2, 1, 2).unwrap(),
                &BetCandidateFact::new(BetType::HomeWin, None).unwrap(),
            )
            .unwrap();
        assert!((verdict.posterior_summary.total() - 1.0).abs() <= PROBABILITY_TOLERANCE);
    }

    #[test]
    fn test_partial_facts_still_evaluate() {
        let evaluator = make_test_evaluator();
        // No goal averages, availability, odds, or head-to-head
        let v = evaluate(&evaluator, &balanced(CompetitionStage::Group, BetType::Over).unwrap());
        assert_eq!(v.posterior_summary.variable(), "total_goals");
        assert!((v.posterior_summary.total() - 1.0).abs() <= PROBABILITY_TOLERANCE);
    }

    #[test]
    fn test_zero_signals_use_bayes_only() {
        let evaluator = make_test_evaluator();
        let v = evaluate(&evaluator, &dominant_home(BetType::Under).unwrap());
        assert!(v.contributing_signals.is_empty());
        assert_eq!(v.rule_score, 0.0);
        assert_eq!(v.combined_score, 0.5 * v.bayes_score);
        assert_eq!(v.concordance, Concordance::RulesSilent);
        assert_eq!(v.explanation.len(), 1);
    }

    #[test]
    fn test_explanation_follows_catalog_order() {
        let evaluator = make_test_evaluator();
        let q = demo_query().unwrap();
        let bet = q.bet.clone().unwrap();
        let v = evaluator.evaluate(&q.match_fact, &q.home_team, &q.away_team, &bet).unwrap();

        let catalog = evaluator.rules().rule_ids();
        let mut fired: Vec<&str> = v.contributing_signals.iter().map(|s| s.rule_id()).collect();
        fired.sort_by_key(|id| catalog.iter().position(|c| c == id));
        let expected: Vec<String> = fired
            .iter()
            .map(|id| {
                v.contributing_signals
                    .iter()
                    .find(|s| s.rule_id() == *id)
                    .unwrap()
                    .rationale()
                    .to_string()
            })
            .collect();

        assert_eq!(v.explanation.len(), expected.len() + 1);
        assert_eq!(&v.explanation[..expected.len()], expected.as_slice());
        assert!(v.explanation.last().unwrap().contains("match_outcome"));
    }

    #[test]
    fn test_demo_home_win_signals() {
        let evaluator = make_test_evaluator();
        let q = demo_query().unwrap();
        let bet = q.bet.clone().unwrap();
        let v = evaluator.evaluate(&q.match_fact, &q.home_team, &q.away_team, &bet).unwrap();
        // Quarterfinal, a missing winger, heavy fouling, strong home record
        assert!(signal_weight(&v, "knockout_stage").is_some());
        assert!((signal_weight(&v, "key_player_absence").unwrap() - 0.15).abs() < 1e-12);
        assert!(signal_weight(&v, "discipline_risk").is_some());
        assert!((signal_weight(&v, "home_advantage").unwrap() - 0.18).abs() < 1e-9);
        assert!(signal_weight(&v, "form_advantage").is_none());
    }

    #[test]
    fn test_mismatched_teams_rejected() {
        let evaluator = make_test_evaluator();
        let m = plain_match("HOME", "AWAY", CompetitionStage::Group).unwrap();
        let bet = BetCandidateFact::new(BetType::HomeWin, None).unwrap();
        let err = evaluator
            .evaluate(&m, &team("HOME", 1, 0, 0).unwrap(), &team("OTHER", 1, 0, 0).unwrap(), &bet)
            .unwrap_err();
        assert!(matches!(err, EngineError::MalformedFact(_)));
    }

    #[test]
    fn test_analyze_matchup_covers_all_bets() {
        let evaluator = make_test_evaluator();
        let q = demo_query().unwrap();
        let verdicts = evaluator
            .analyze_matchup(&q.match_fact, &q.home_team, &q.away_team, &q.odds)
            .unwrap();
        let bets: Vec<BetType> = verdicts.iter().map(|v| v.bet_type).collect();
        assert_eq!(bets, BetType::ALL.to_vec());

        // Complementary markets read opposite states of the same variable
        let over = &verdicts[3];
        let under = &verdicts[4];
        assert!((over.safe_probability + under.safe_probability - 1.0).abs() < 1e-9);
        let yes = &verdicts[5];
        let no = &verdicts[6];
        assert!((yes.bayes_score + no.bayes_score).abs() < 1e-9);
    }

    #[test]
    fn test_analyze_without_odds() {
        let evaluator = make_test_evaluator();
        let facts = dominant_home(BetType::HomeWin).unwrap();
        let verdicts = evaluator
            .analyze_matchup(facts.match_fact(), facts.home(), facts.away(), &BTreeMap::new())
            .unwrap();
        assert_eq!(verdicts.len(), 7);
        assert!(verdicts.iter().all(|v| signal_weight(v, "odds_value").is_none()));
    }

    #[test]
    fn test_concurrent_queries_share_evaluator() {
        let evaluator = make_test_evaluator();
        let facts: Vec<FactSet> = BetType::ALL
            .iter()
            .map(|b| balanced(CompetitionStage::Semifinal, *b).unwrap())
            .collect();
        let sequential: Vec<Verdict> = facts.iter().map(|f| evaluate(&evaluator, f)).collect();

        let parallel: Vec<Verdict> = std::thread::scope(|scope| {
            let handles: Vec<_> = facts
                .iter()
                .map(|f| {
                    let evaluator = &evaluator;
                    scope.spawn(move || evaluate(evaluator, f))
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        assert_eq!(sequential, parallel);
    }

    #[test]
    fn test_blend_weight_from_config() {
        let mut config = Config::default();
        config.fusion.blend_weight = 1.0;
        let rules_only = BetEvaluator::from_config(&config).unwrap();
        let v = evaluate(&rules_only, &dominant_home(BetType::HomeWin).unwrap());
        assert!((v.combined_score - v.rule_score).abs() < 1e-12);
    }

    #[test]
    fn test_assembled_evaluator_validates_settings() {
        let config = Config::default();
        let build = |fusion: FusionConfig, evidence: EvidenceConfig, inference: InferenceMethod| {
            BetEvaluator::new(
                RuleEngine::with_defaults(),
                football_network().unwrap(),
                inference,
                EvidenceMapper::new(evidence),
                FusionEngine::new(fusion),
                config.outcomes.clone(),
            )
        };

        let out_of_range = FusionConfig {
            blend_weight: 1.5,
            ..FusionConfig::default()
        };
        let err = build(out_of_range, EvidenceConfig::default(), InferenceMethod::Exact).err().unwrap();
        assert!(matches!(err, EngineError::Config(_)));

        let empty_budget = InferenceMethod::LikelihoodWeighting(SamplerSettings {
            batch_size: 0,
            ..SamplerSettings::default()
        });
        assert!(build(FusionConfig::default(), EvidenceConfig::default(), empty_budget).is_err());

        assert!(build(FusionConfig::default(), EvidenceConfig::default(), InferenceMethod::Exact).is_ok());
    }

    #[test]
    fn test_outcome_mapping_checked_against_network() {
        let mut config = Config::default();
        config.outcomes.retain(|o| o.bet_type != BetType::Draw);
        config
            .outcomes
            .push(OutcomeMapping::new(BetType::Draw, "match_outcome", &["stalemate"]));
        let err = BetEvaluator::from_config(&config).err().unwrap();
        assert!(matches!(err, EngineError::Config(_)));

        let mut config = Config::default();
        config.outcomes.retain(|o| o.bet_type != BetType::Draw);
        config.outcomes.push(OutcomeMapping::new(BetType::Draw, "weather", &["rain"]));
        assert!(BetEvaluator::from_config(&config).is_err());
    }

    #[test]
    fn test_safe_states_can_widen() {
        let mut config = Config::default();
        config.outcomes.retain(|o| o.bet_type != BetType::HomeWin);
        config
            .outcomes
            .push(OutcomeMapping::new(BetType::HomeWin, "match_outcome", &["home_win", "draw"]));
        let double_chance = BetEvaluator::from_config(&config).unwrap();
        let strict = make_test_evaluator();

        let facts = balanced(CompetitionStage::Group, BetType::HomeWin).unwrap();
        let wide = evaluate(&double_chance, &facts);
        let narrow = evaluate(&strict, &facts);
        assert!(wide.safe_probability > narrow.safe_probability);
    }

    #[test]
    fn test_network_loaded_from_file() {
        let default = make_test_evaluator();
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(
            file,
            "{}",
            serde_json::to_string(&default.network().to_definition()).unwrap()
        )
        .unwrap();

        let mut config = Config::default();
        config.network.path = Some(file.path().to_string_lossy().into_owned());
        let from_file = BetEvaluator::from_config(&config).unwrap();

        let facts = dominant_home(BetType::AwayWin).unwrap();
        let a = evaluate(&from_file, &facts);
        let b = evaluate(&default, &facts);
        assert_eq!(a.classification, b.classification);
        assert_eq!(a.contributing_signals, b.contributing_signals);
        assert!((a.combined_score - b.combined_score).abs() < 1e-9);
    }

    #[test]
    fn test_sampling_evaluator_agrees_on_clear_case() {
        let mut config = Config::default();
        config.network.inference = InferenceMethod::LikelihoodWeighting(SamplerSettings::default());
        let sampling = BetEvaluator::from_config(&config).unwrap();
        let exact = make_test_evaluator();

        let facts = dominant_home(BetType::HomeWin).unwrap();
        let a = evaluate(&sampling, &facts);
        let b = evaluate(&exact, &facts);
        assert_eq!(a.classification, b.classification);
        assert!((a.safe_probability - b.safe_probability).abs() < 0.02);
    }

    #[test]
    fn test_query_json_parsing() {
        let json = r#"{
            "match": {"home_team_id": "FRA", "away_team_id": "MAR", "competition_stage": "semifinal"},
            "home_team": {"team_id": "FRA", "recent_form": ["win", "win", "draw", "win", "loss"]},
            "away_team": {"team_id": "MAR", "recent_form": ["draw", "win", "draw", "win", "win"]},
            "bet": {"bet_type": "draw", "market_odds": 3.1},
            "odds": {"home_win": 1.9, "draw": 3.1}
        }"#;
        let q: MatchQuery = serde_json::from_str(json).unwrap();
        assert_eq!(q.odds.get(&BetType::Draw), Some(&3.1));

        let evaluator = make_test_evaluator();
        let v = evaluator
            .evaluate(&q.match_fact, &q.home_team, &q.away_team, q.bet.as_ref().unwrap())
            .unwrap();
        assert_eq!(v.bet_type, BetType::Draw);
        assert!(signal_weight(&v, "balanced_form").is_some());
        assert!(signal_weight(&v, "knockout_stage").is_some());
    }

    #[test]
    fn test_invalid_query_json_is_malformed() {
        let json = r#"{
            "match": {"home_team_id": "FRA", "away_team_id": "FRA", "competition_stage": "group"},
            "home_team": {"team_id": "FRA", "recent_form": ["win"]},
            "away_team": {"team_id": "MAR", "recent_form": ["win"]}
        }"#;
        let err = serde_json::from_str::<MatchQuery>(json).unwrap_err();
        assert!(err.to_string().contains("home and away team"));
    }
}
