use std::collections::{BTreeMap, HashMap};

use crate::standings::{LiveTable, Position, StandingEntry};
use crate::teams::{TEAM_COUNT, is_canonical};

pub const SEASON_GAMEWEEKS: i64 = 38;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<String>,
}

impl ValidationReport {
    fn from_errors(errors: Vec<String>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GamesPlayedReport {
    pub valid: bool,
    pub errors: Vec<String>,
    pub offending: Vec<(String, u32)>,
}

/// Structural checks on a candidate table. Every check runs so all problems are reported together.
pub fn validate_snapshot(entries: &[StandingEntry]) -> ValidationReport {
    let mut errors = Vec::new();

    if entries.len() != TEAM_COUNT {
        errors.push(format!("expected {TEAM_COUNT} teams, found {}", entries.len()));
    }

    for entry in entries {
        if Position::new(entry.position).is_none() {
            errors.push(format!(
                "position {} is outside {}..={}",
                entry.position,
                Position::MIN,
                Position::MAX
            ));
        }
    }
    for pos in Position::all() {
        if !entries.iter().any(|e| e.position == u32::from(pos.get())) {
            errors.push(format!("missing position {pos}"));
        }
    }

    // Preserve first-encounter order so reports are stable.
    let mut team_positions: Vec<(&str, Vec<u32>)> = Vec::new();
    let mut team_index: HashMap<&str, usize> = HashMap::new();
    for entry in entries {
        let idx = *team_index.entry(entry.team.as_str()).or_insert_with(|| {
            team_positions.push((entry.team.as_str(), Vec::new()));
            team_positions.len() - 1
        });
        team_positions[idx].1.push(entry.position);
    }
    for (team, positions) in &team_positions {
        if positions.len() > 1 {
            let listed = positions
                .iter()
                .map(u32::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            errors.push(format!("duplicate team {team} at positions {listed}"));
        }
    }

    let mut position_counts: BTreeMap<u32, usize> = BTreeMap::new();
    for entry in entries {
        *position_counts.entry(entry.position).or_default() += 1;
    }
    for (pos, count) in position_counts {
        if count > 1 {
            errors.push(format!("duplicate position {pos} ({count} teams)"));
        }
    }

    for (team, _) in &team_positions {
        if !is_canonical(team) {
            errors.push(format!("unrecognized team {team}"));
        }
    }

    ValidationReport::from_errors(errors)
}

pub fn validate_gameweek_number(gameweek: i64) -> ValidationReport {
    let mut errors = Vec::new();
    if !(1..=SEASON_GAMEWEEKS).contains(&gameweek) {
        errors.push(format!("gameweek {gameweek} is outside 1..={SEASON_GAMEWEEKS}"));
    }
    ValidationReport::from_errors(errors)
}

/// Every team must report exactly `expected` games played; offenders are collected, not
/// short-circuited.
pub fn validate_games_played(table: &LiveTable, expected: u32) -> GamesPlayedReport {
    let offending: Vec<(String, u32)> = table
        .entries
        .iter()
        .filter(|e| e.played_games != expected)
        .map(|e| (e.team.clone(), e.played_games))
        .collect();
    let errors = offending
        .iter()
        .map(|(team, played)| format!("{team} has played {played}, expected {expected}"))
        .collect::<Vec<_>>();
    GamesPlayedReport {
        valid: errors.is_empty(),
        errors,
        offending,
    }
}
