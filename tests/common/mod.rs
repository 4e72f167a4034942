#![allow(dead_code)]

use std::fs;
use std::path::PathBuf;

use predictor_league::predictions::Prediction;
use predictor_league::standings::{LiveEntry, LiveTable, StandingEntry, StandingsSnapshot};
use predictor_league::teams::CANONICAL_TEAMS;

/// API spellings, index-aligned with `CANONICAL_TEAMS`.
pub const API_NAMES: [&str; 20] = [
    "Arsenal FC",
    "Aston Villa FC",
    "AFC Bournemouth",
    "Brentford FC",
    "Brighton & Hove Albion FC",
    "Burnley FC",
    "Chelsea FC",
    "Crystal Palace FC",
    "Everton FC",
    "Fulham FC",
    "Leeds United FC",
    "Liverpool FC",
    "Manchester City FC",
    "Manchester United FC",
    "Newcastle United FC",
    "Nottingham Forest FC",
    "Tottenham Hotspur FC",
    "Sunderland AFC",
    "West Ham United FC",
    "Wolverhampton Wanderers FC",
];

/// Standings in `CANONICAL_TEAMS` order: Arsenal 1st ... Wolves 20th.
pub fn table_order() -> Vec<String> {
    CANONICAL_TEAMS.iter().map(|t| t.to_string()).collect()
}

pub fn entries() -> Vec<StandingEntry> {
    table_order()
        .into_iter()
        .enumerate()
        .map(|(idx, team)| StandingEntry::new(idx as u32 + 1, team))
        .collect()
}

pub fn snapshot(gameweek: u8) -> StandingsSnapshot {
    StandingsSnapshot::from_entries(gameweek, &entries()).expect("fixture standings are valid")
}

pub fn live_table(played: u32) -> LiveTable {
    LiveTable::new(
        API_NAMES
            .iter()
            .enumerate()
            .map(|(idx, name)| LiveEntry {
                position: idx as u32 + 1,
                team: name.to_string(),
                played_games: played,
                points: 60 - idx as i32,
            })
            .collect(),
    )
}

pub fn predictions() -> Vec<Prediction> {
    let order = table_order();
    let reversed: Vec<String> = order.iter().rev().cloned().collect();
    let mut swapped = order.clone();
    swapped.swap(0, 1);
    vec![
        Prediction::new("Alice", ["LIV"], order),
        Prediction::new("Bob", ["LIV", "TOG"], reversed),
        Prediction::new("Cara", ["FPL"], swapped),
    ]
}

pub fn temp_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "predictor_league_{tag}_{}",
        std::process::id()
    ));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).expect("temp dir should be creatable");
    dir
}

pub fn read_fixture(name: &str) -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    fs::read_to_string(path).expect("fixture file should be readable")
}
