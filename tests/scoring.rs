mod common;

use predictor_league::history::History;
use predictor_league::predictions::{GroupFilter, Prediction};
use predictor_league::scoring::{
    Participant, leaderboard, score_all_participants, score_consensus, score_gameweek,
    verify_stored_scores,
};

use common::{predictions, snapshot, table_order};

#[test]
fn perfect_prediction_scores_zero() {
    let results = score_all_participants(&snapshot(1), &predictions(), &GroupFilter::All);
    let alice = results.iter().find(|r| r.name == "Alice").unwrap();
    assert_eq!(alice.total_score, 0);
    assert_eq!(alice.team_scores.len(), 20);
}

#[test]
fn reversed_prediction_scores_two_hundred() {
    let results = score_all_participants(&snapshot(1), &predictions(), &GroupFilter::All);
    let bob = results.iter().find(|r| r.name == "Bob").unwrap();
    assert_eq!(bob.total_score, 200);
    let arsenal = bob.team_scores["Arsenal"];
    assert_eq!(arsenal.predicted_position, 20);
    assert_eq!(arsenal.actual_position, 1);
    assert_eq!(arsenal.difference, 19);
    assert_eq!(arsenal.score, 19);
}

#[test]
fn totals_are_sums_of_non_negative_team_scores() {
    for result in score_gameweek(&snapshot(4), &predictions()) {
        let sum: u32 = result.team_scores.values().map(|s| s.score).sum();
        assert_eq!(result.total_score, sum, "{}", result.name);
        for score in result.team_scores.values() {
            assert_eq!(score.score, score.difference.unsigned_abs());
        }
    }
}

#[test]
fn results_are_sorted_ascending() {
    let results = score_all_participants(&snapshot(1), &predictions(), &GroupFilter::All);
    let names: Vec<&str> = results.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["Alice", "Cara", "Bob"]);
    assert_eq!(results[1].total_score, 2);
}

#[test]
fn ties_keep_encounter_order() {
    let order = table_order();
    let preds = vec![
        Prediction::new("Zed", ["LIV"], order.clone()),
        Prediction::new("Amy", ["LIV"], order),
    ];
    let results = score_all_participants(&snapshot(1), &preds, &GroupFilter::All);
    assert_eq!(results[0].name, "Zed");
    assert_eq!(results[1].name, "Amy");
}

#[test]
fn scoring_is_deterministic() {
    let first = score_gameweek(&snapshot(9), &predictions());
    let second = score_gameweek(&snapshot(9), &predictions());
    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

#[test]
fn group_filter_only_admits_members() {
    let preds = predictions();
    let all = score_all_participants(&snapshot(1), &preds, &GroupFilter::All);
    let liv = score_all_participants(&snapshot(1), &preds, &GroupFilter::Group("LIV".into()));
    assert!(liv.iter().all(|r| r.groups.contains("LIV")));
    assert!(liv.len() <= all.len());
    assert_eq!(liv.len(), 2);
    let none = score_all_participants(&snapshot(1), &preds, &GroupFilter::Group("XYZ".into()));
    assert!(none.is_empty());
}

#[test]
fn unknown_prediction_teams_are_skipped() {
    let mut order = table_order();
    order[16] = "Tottenham".to_string();
    let preds = vec![Prediction::new("Dan", ["FPL"], order)];
    let results = score_all_participants(&snapshot(1), &preds, &GroupFilter::All);
    assert_eq!(results[0].total_score, 0);
    assert_eq!(results[0].team_scores.len(), 19);
    assert!(!results[0].team_scores.contains_key("Tottenham"));
}

#[test]
fn consensus_uses_mean_positions() {
    // Alice and Bob are exact opposites, so every mean is 10.5 and first-encounter order wins.
    let consensus =
        score_consensus(&snapshot(1), &predictions(), &GroupFilter::Group("LIV".into())).unwrap();
    assert!(consensus.is_consensus());
    assert_eq!(consensus.name, "LIV Consensus");
    assert_eq!(consensus.total_score, 0);
    let unused = GroupFilter::Group("XYZ".into());
    assert!(score_consensus(&snapshot(1), &predictions(), &unused).is_none());
}

#[test]
fn gameweek_scores_include_one_consensus_per_filter() {
    let scores = score_gameweek(&snapshot(1), &predictions());
    let consensus: Vec<&str> = scores
        .iter()
        .filter(|r| r.is_consensus())
        .map(|r| r.name.as_str())
        .collect();
    assert_eq!(consensus.len(), 4);
    for name in ["Group Consensus", "LIV Consensus", "TOG Consensus", "FPL Consensus"] {
        assert!(consensus.contains(&name), "{name} missing");
    }
    assert_eq!(scores.len(), 7);
    assert!(scores.windows(2).all(|w| w[0].total_score <= w[1].total_score));
}

#[test]
fn leaderboard_filters_consensus_rows_by_their_own_group() {
    let scores = score_gameweek(&snapshot(1), &predictions());
    let tog = leaderboard(&scores, &GroupFilter::Group("TOG".into()));
    let names: Vec<&str> = tog.iter().map(|r| r.result.name.as_str()).collect();
    assert_eq!(names.len(), 2);
    assert!(names.contains(&"Bob"));
    assert!(names.contains(&"TOG Consensus"));
    assert_eq!(tog[0].rank, 1);

    let all = leaderboard(&scores, &GroupFilter::All);
    assert_eq!(all.len(), 4);
    assert!(all.iter().any(|r| matches!(
        &r.result.participant,
        Participant::Consensus { filter: GroupFilter::All }
    )));
}

#[test]
fn self_check_flags_tampered_scores() {
    let preds = predictions();
    let mut history = History::default();
    for gw in 1..=2 {
        history.standings.insert(gw, snapshot(gw));
        history.scores.insert(gw, score_gameweek(&snapshot(gw), &preds));
    }
    assert!(verify_stored_scores(&history, &preds).is_empty());

    history.scores.get_mut(&2).unwrap()[0].total_score += 1;
    assert_eq!(verify_stored_scores(&history, &preds), vec![2]);
}

#[test]
fn repeated_team_only_scores_first_listing() {
    let mut rankings = table_order();
    rankings[0] = "Chelsea".to_string();
    rankings[19] = "Chelsea".to_string();
    let dup = Prediction::new("Dee", ["FPL"], rankings);

    let results = score_all_participants(&snapshot(1), &[dup], &GroupFilter::All);
    let dee = &results[0];
    let sum: u32 = dee.team_scores.values().map(|s| s.score).sum();
    assert_eq!(dee.total_score, sum);
    assert_eq!(dee.team_scores.len(), 18);
    assert_eq!(dee.team_scores["Chelsea"].predicted_position, 1);
    assert_eq!(dee.total_score, 6);
}

#[test]
fn positions_past_u8_range_are_ignored() {
    let mut rankings: Vec<String> = (0..255).map(|i| format!("Nobody {i}")).collect();
    rankings.push("Arsenal".to_string());
    let long = Prediction::new("Eve", ["FPL"], rankings);

    let results = score_all_participants(&snapshot(1), &[long], &GroupFilter::All);
    assert!(results[0].team_scores.is_empty());
    assert_eq!(results[0].total_score, 0);
}
