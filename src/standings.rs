use std::collections::BTreeMap;
use std::fmt;

use anyhow::{Context, Result, anyhow};
use serde::Deserialize;

use crate::error::PipelineError;
use crate::teams::{TEAM_COUNT, TeamNormalizer};
use crate::validate::{validate_gameweek_number, validate_snapshot};

/// A league position, always within 1..=20.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Position(u8);

impl Position {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = TEAM_COUNT as u8;

    pub fn new(value: u32) -> Option<Self> {
        if (Self::MIN as u32..=Self::MAX as u32).contains(&value) {
            Some(Self(value as u8))
        } else {
            None
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }

    pub fn all() -> impl Iterator<Item = Position> {
        (Self::MIN..=Self::MAX).map(Position)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One unvalidated row of a candidate table: a raw position and a team name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StandingEntry {
    pub position: u32,
    pub team: String,
}

impl StandingEntry {
    pub fn new(position: u32, team: impl Into<String>) -> Self {
        Self {
            position,
            team: team.into(),
        }
    }
}

/// A validated, immutable league table for one gameweek.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StandingsSnapshot {
    gameweek: u8,
    // Index is position - 1.
    teams: Vec<String>,
}

impl StandingsSnapshot {
    /// Runs every validator check and builds the snapshot only when all of them pass.
    pub fn from_entries(gameweek: u8, entries: &[StandingEntry]) -> Result<Self, PipelineError> {
        let mut errors = validate_gameweek_number(i64::from(gameweek)).errors;
        errors.extend(validate_snapshot(entries).errors);
        if !errors.is_empty() {
            return Err(PipelineError::Validation { errors });
        }

        let mut sorted: Vec<&StandingEntry> = entries.iter().collect();
        sorted.sort_by_key(|e| e.position);
        Ok(Self {
            gameweek,
            teams: sorted.into_iter().map(|e| e.team.clone()).collect(),
        })
    }

    pub fn from_position_map(
        gameweek: u8,
        map: &BTreeMap<u32, String>,
    ) -> Result<Self, PipelineError> {
        let entries: Vec<StandingEntry> = map
            .iter()
            .map(|(pos, team)| StandingEntry::new(*pos, team.clone()))
            .collect();
        Self::from_entries(gameweek, &entries)
    }

    pub fn gameweek(&self) -> u8 {
        self.gameweek
    }

    pub fn team_at(&self, position: Position) -> &str {
        &self.teams[usize::from(position.get()) - 1]
    }

    pub fn position_of(&self, team: &str) -> Option<Position> {
        self.teams
            .iter()
            .position(|t| t == team)
            .and_then(|idx| Position::new(idx as u32 + 1))
    }

    /// Teams in finishing order, top of the table first.
    pub fn teams(&self) -> &[String] {
        &self.teams
    }

    pub fn iter(&self) -> impl Iterator<Item = (Position, &str)> {
        Position::all().zip(self.teams.iter().map(String::as_str))
    }

    pub fn to_position_map(&self) -> BTreeMap<u32, String> {
        self.iter()
            .map(|(pos, team)| (u32::from(pos.get()), team.to_string()))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeasonInfo {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub current_matchday: Option<u32>,
}

/// One row of the live table as reported by the standings provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveEntry {
    pub position: u32,
    pub team: String,
    pub played_games: u32,
    pub points: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveTable {
    pub season: Option<SeasonInfo>,
    pub entries: Vec<LiveEntry>,
}

impl LiveTable {
    pub fn new(entries: Vec<LiveEntry>) -> Self {
        Self {
            season: None,
            entries,
        }
    }

    /// Latest gameweek every team has played. A round is only complete once the
    /// slowest team has caught up, so this is the minimum, never the maximum.
    pub fn highest_complete(&self) -> Option<u32> {
        self.entries.iter().map(|e| e.played_games).min()
    }

    /// Informational only; must never gate persistence.
    pub fn max_games_played(&self) -> Option<u32> {
        self.entries.iter().map(|e| e.played_games).max()
    }

    pub fn team_names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.team.as_str())
    }

    /// Converts the live rows to canonical names, failing with every unmappable name at once.
    pub fn to_candidate(
        &self,
        normalizer: &TeamNormalizer,
    ) -> Result<Vec<StandingEntry>, PipelineError> {
        let unknown = normalizer.check_all_mappable(self.team_names());
        if !unknown.is_empty() {
            return Err(PipelineError::UnknownTeam { names: unknown });
        }
        self.entries
            .iter()
            .map(|e| {
                normalizer
                    .normalize(&e.team)
                    .map(|canonical| StandingEntry::new(e.position, canonical))
            })
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct StandingsResponse {
    season: Option<ApiSeason>,
    #[serde(default)]
    standings: Vec<ApiStanding>,
}

#[derive(Debug, Deserialize)]
struct ApiSeason {
    #[serde(rename = "startDate")]
    start_date: Option<String>,
    #[serde(rename = "endDate")]
    end_date: Option<String>,
    #[serde(rename = "currentMatchday")]
    current_matchday: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ApiStanding {
    #[serde(rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    table: Vec<ApiTableRow>,
}

#[derive(Debug, Deserialize)]
struct ApiTableRow {
    position: u32,
    team: ApiTeam,
    #[serde(rename = "playedGames")]
    played_games: u32,
    #[serde(default)]
    points: i32,
}

#[derive(Debug, Deserialize)]
struct ApiTeam {
    name: String,
}

/// Parses a football-data.org `/competitions/{code}/standings` body. Prefers the
/// overall (`TOTAL`) table over home/away splits.
pub fn parse_standings_json(raw: &str) -> Result<LiveTable> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Err(anyhow!("empty standings response"));
    }
    let resp: StandingsResponse = serde_json::from_str(trimmed).context("invalid standings json")?;

    let mut standings = resp.standings;
    if standings.is_empty() {
        return Err(anyhow!("standings response has no tables"));
    }
    let idx = standings
        .iter()
        .position(|s| s.kind.as_deref() == Some("TOTAL"))
        .unwrap_or(0);
    let table = standings.swap_remove(idx).table;

    let entries = table
        .into_iter()
        .map(|row| LiveEntry {
            position: row.position,
            team: row.team.name,
            played_games: row.played_games,
            points: row.points,
        })
        .collect();

    Ok(LiveTable {
        season: resp.season.map(|s| SeasonInfo {
            start_date: s.start_date,
            end_date: s.end_date,
            current_matchday: s.current_matchday,
        }),
        entries,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_rejects_out_of_range() {
        assert!(Position::new(0).is_none());
        assert!(Position::new(21).is_none());
        assert_eq!(Position::new(20).map(Position::get), Some(20));
        assert_eq!(Position::all().count(), TEAM_COUNT);
    }

    #[test]
    fn highest_complete_uses_minimum() {
        let table = LiveTable::new(vec![
            LiveEntry {
                position: 1,
                team: "Arsenal FC".to_string(),
                played_games: 7,
                points: 18,
            },
            LiveEntry {
                position: 2,
                team: "Chelsea FC".to_string(),
                played_games: 6,
                points: 14,
            },
        ]);
        assert_eq!(table.highest_complete(), Some(6));
        assert_eq!(table.max_games_played(), Some(7));
    }

    #[test]
    fn empty_table_has_no_complete_gameweek() {
        assert_eq!(LiveTable::new(Vec::new()).highest_complete(), None);
    }
}
