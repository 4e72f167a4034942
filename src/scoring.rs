use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::history::History;
use crate::predictions::{GroupFilter, Prediction, distinct_groups, filter_predictions};
use crate::standings::StandingsSnapshot;

pub const CONSENSUS_SUFFIX: &str = "Consensus";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamScore {
    pub score: u32,
    pub predicted_position: u8,
    pub actual_position: u8,
    /// predicted - actual; negative means the team is doing worse than predicted.
    pub difference: i32,
}

/// Who a scored row belongs to. Consensus rows share the result shape so consumers
/// can filter them without a second type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Participant {
    Real,
    Consensus { filter: GroupFilter },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredResult {
    pub name: String,
    #[serde(default)]
    pub groups: BTreeSet<String>,
    pub participant: Participant,
    pub total_score: u32,
    pub team_scores: BTreeMap<String, TeamScore>,
}

impl ScoredResult {
    pub fn is_consensus(&self) -> bool {
        matches!(self.participant, Participant::Consensus { .. })
    }

    /// Real rows pass when they belong to the group; consensus rows only for the filter they
    /// were built for.
    pub fn admitted_by(&self, filter: &GroupFilter) -> bool {
        match &self.participant {
            Participant::Real => match filter {
                GroupFilter::All => true,
                GroupFilter::Group(group) => self.groups.contains(group),
            },
            Participant::Consensus { filter: own } => own == filter,
        }
    }
}

fn actual_positions(snapshot: &StandingsSnapshot) -> HashMap<&str, u8> {
    snapshot.iter().map(|(pos, team)| (team, pos.get())).collect()
}

fn score_rankings(
    name: &str,
    groups: BTreeSet<String>,
    participant: Participant,
    rankings: &[String],
    actual: &HashMap<&str, u8>,
) -> ScoredResult {
    let mut team_scores: BTreeMap<String, TeamScore> = BTreeMap::new();
    let mut total_score = 0u32;
    for (idx, team) in rankings.iter().enumerate() {
        // Teams that don't match a canonical name contribute nothing.
        let Some(&actual_position) = actual.get(team.as_str()) else {
            continue;
        };
        // Only a team's first listing counts.
        if team_scores.contains_key(team) {
            continue;
        }
        let Ok(predicted_position) = u8::try_from(idx + 1) else {
            break;
        };
        let difference = i32::from(predicted_position) - i32::from(actual_position);
        let score = difference.unsigned_abs();
        total_score += score;
        team_scores.insert(
            team.clone(),
            TeamScore {
                score,
                predicted_position,
                actual_position,
                difference,
            },
        );
    }
    ScoredResult {
        name: name.to_string(),
        groups,
        participant,
        total_score,
        team_scores,
    }
}

fn sort_by_total(results: &mut [ScoredResult]) {
    // Stable: ties keep encounter order.
    results.sort_by_key(|r| r.total_score);
}

/// Scores every participant admitted by `filter` against one gameweek's standings,
/// best (lowest) total first.
pub fn score_all_participants(
    snapshot: &StandingsSnapshot,
    predictions: &[Prediction],
    filter: &GroupFilter,
) -> Vec<ScoredResult> {
    let actual = actual_positions(snapshot);
    let mut results: Vec<ScoredResult> = filter_predictions(predictions, filter)
        .into_iter()
        .map(|p| {
            score_rankings(
                &p.name,
                p.groups.clone(),
                Participant::Real,
                &p.rankings,
                &actual,
            )
        })
        .collect();
    sort_by_total(&mut results);
    results
}

/// Teams ordered by their mean predicted position across `predictions`.
/// Ties keep the order in which teams were first encountered.
pub fn consensus_ranking(predictions: &[&Prediction]) -> Vec<String> {
    let mut order: Vec<&str> = Vec::new();
    let mut sums: HashMap<&str, (f64, u32)> = HashMap::new();
    for p in predictions {
        let mut seen = HashSet::new();
        for (idx, team) in p.rankings.iter().enumerate() {
            if !seen.insert(team.as_str()) {
                continue;
            }
            let entry = sums.entry(team.as_str()).or_insert_with(|| {
                order.push(team.as_str());
                (0.0, 0)
            });
            entry.0 += (idx + 1) as f64;
            entry.1 += 1;
        }
    }

    let mut means: Vec<(&str, f64)> = order
        .into_iter()
        .map(|team| {
            let (sum, n) = sums[team];
            (team, sum / f64::from(n))
        })
        .collect();
    means.sort_by(|a, b| a.1.total_cmp(&b.1));
    means.into_iter().map(|(team, _)| team.to_string()).collect()
}

pub fn consensus_name(filter: &GroupFilter) -> String {
    match filter {
        GroupFilter::All => format!("Group {CONSENSUS_SUFFIX}"),
        GroupFilter::Group(group) => format!("{group} {CONSENSUS_SUFFIX}"),
    }
}

/// Scores the group's average prediction. `None` when no participant is admitted.
pub fn score_consensus(
    snapshot: &StandingsSnapshot,
    predictions: &[Prediction],
    filter: &GroupFilter,
) -> Option<ScoredResult> {
    let members = filter_predictions(predictions, filter);
    if members.is_empty() {
        return None;
    }
    let rankings = consensus_ranking(&members);
    let groups = match filter {
        GroupFilter::All => BTreeSet::new(),
        GroupFilter::Group(group) => BTreeSet::from([group.clone()]),
    };
    Some(score_rankings(
        &consensus_name(filter),
        groups,
        Participant::Consensus {
            filter: filter.clone(),
        },
        &rankings,
        &actual_positions(snapshot),
    ))
}

/// Everything stored for a gameweek: all real participants plus one consensus row
/// for `all` and for each group in use, best first.
pub fn score_gameweek(
    snapshot: &StandingsSnapshot,
    predictions: &[Prediction],
) -> Vec<ScoredResult> {
    let mut results = score_all_participants(snapshot, predictions, &GroupFilter::All);

    let filters = std::iter::once(GroupFilter::All)
        .chain(distinct_groups(predictions).into_iter().map(GroupFilter::Group));
    for filter in filters {
        if let Some(consensus) = score_consensus(snapshot, predictions, &filter) {
            results.push(consensus);
        }
    }
    sort_by_total(&mut results);
    results
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaderboardRow<'a> {
    pub rank: usize,
    pub result: &'a ScoredResult,
}

/// The filtered view of a stored, already sorted score list with 1-based ranks.
pub fn leaderboard<'a>(
    scores: &'a [ScoredResult],
    filter: &GroupFilter,
) -> Vec<LeaderboardRow<'a>> {
    scores
        .iter()
        .filter(|r| r.admitted_by(filter))
        .enumerate()
        .map(|(idx, result)| LeaderboardRow {
            rank: idx + 1,
            result,
        })
        .collect()
}

pub fn recompute_all_scores(
    history: &History,
    predictions: &[Prediction],
) -> BTreeMap<u8, Vec<ScoredResult>> {
    history
        .standings
        .iter()
        .map(|(gw, snapshot)| (*gw, score_gameweek(snapshot, predictions)))
        .collect()
}

/// Gameweeks whose stored scores no longer match a fresh computation.
pub fn verify_stored_scores(history: &History, predictions: &[Prediction]) -> Vec<u8> {
    recompute_all_scores(history, predictions)
        .into_iter()
        .filter(|(gw, fresh)| history.scores(*gw) != Some(fresh.as_slice()))
        .map(|(gw, _)| gw)
        .collect()
}
