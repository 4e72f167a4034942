use std::collections::HashMap;

use serde::Serialize;

use crate::history::History;
use crate::predictions::GroupFilter;
use crate::scoring::ScoredResult;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Comparison {
    pub name: String,
    pub is_consensus: bool,
    pub current_position: usize,
    pub current_score: u32,
    pub previous_position: Option<usize>,
    pub previous_score: Option<u32>,
    /// previous - current; positive means the participant climbed.
    pub position_change: Option<i64>,
    /// current - previous; negative means the participant improved.
    pub score_change: Option<i64>,
}

/// Joins two gameweeks' leaderboards by participant name. `None` if either week has no
/// stored scores.
pub fn compare(
    history: &History,
    week_a: u8,
    week_b: u8,
    filter: &GroupFilter,
) -> Option<Vec<Comparison>> {
    let previous = history.scores(week_a).filter(|s| !s.is_empty())?;
    let current = history.scores(week_b).filter(|s| !s.is_empty())?;
    Some(compare_scores(previous, current, filter))
}

/// Both lists must already be sorted best first, as they are when stored.
pub fn compare_scores(
    previous: &[ScoredResult],
    current: &[ScoredResult],
    filter: &GroupFilter,
) -> Vec<Comparison> {
    let before: HashMap<&str, (usize, u32)> = previous
        .iter()
        .filter(|r| r.admitted_by(filter))
        .enumerate()
        .map(|(idx, r)| (r.name.as_str(), (idx + 1, r.total_score)))
        .collect();

    current
        .iter()
        .filter(|r| r.admitted_by(filter))
        .enumerate()
        .map(|(idx, r)| {
            let current_position = idx + 1;
            let prior = before.get(r.name.as_str()).copied();
            Comparison {
                name: r.name.clone(),
                is_consensus: r.is_consensus(),
                current_position,
                current_score: r.total_score,
                previous_position: prior.map(|(pos, _)| pos),
                previous_score: prior.map(|(_, score)| score),
                position_change: prior.map(|(pos, _)| pos as i64 - current_position as i64),
                score_change: prior.map(|(_, score)| i64::from(r.total_score) - i64::from(score)),
            }
        })
        .collect()
}

/// Largest absolute rank moves first; participants without prior data or a move are left out.
pub fn biggest_movers(comparisons: &[Comparison], n: usize) -> Vec<&Comparison> {
    let mut moved: Vec<&Comparison> = comparisons
        .iter()
        .filter(|c| c.position_change.is_some_and(|d| d != 0))
        .collect();
    moved.sort_by_key(|c| std::cmp::Reverse(c.position_change.map(i64::abs)));
    moved.truncate(n);
    moved
}

/// Most negative score change first.
pub fn top_improvers(comparisons: &[Comparison], n: usize) -> Vec<&Comparison> {
    let mut improved: Vec<&Comparison> = comparisons
        .iter()
        .filter(|c| c.score_change.is_some_and(|d| d < 0))
        .collect();
    improved.sort_by_key(|c| c.score_change);
    improved.truncate(n);
    improved
}

/// Most positive score change first.
pub fn top_decliners(comparisons: &[Comparison], n: usize) -> Vec<&Comparison> {
    let mut declined: Vec<&Comparison> = comparisons
        .iter()
        .filter(|c| c.score_change.is_some_and(|d| d > 0))
        .collect();
    declined.sort_by_key(|c| std::cmp::Reverse(c.score_change));
    declined.truncate(n);
    declined
}
