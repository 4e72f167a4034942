use std::collections::{HashMap, HashSet};

use crate::error::PipelineError;

pub const TEAM_COUNT: usize = 20;

/// Internal spellings used as the join key across standings, predictions and scores.
pub const CANONICAL_TEAMS: [&str; TEAM_COUNT] = [
    "Arsenal",
    "Aston Villa",
    "Bournemouth",
    "Brentford",
    "Brighton",
    "Burnley",
    "Chelsea",
    "Crystal Palace",
    "Everton",
    "Fulham",
    "Leeds",
    "Liverpool",
    "Man City",
    "Man Utd",
    "Newcastle",
    "Nottingham Forest",
    "Spurs",
    "Sunderland",
    "West Ham",
    "Wolves",
];

// Names as reported by football-data.org.
const API_ALIASES: &[(&str, &str)] = &[
    ("Arsenal FC", "Arsenal"),
    ("Aston Villa FC", "Aston Villa"),
    ("AFC Bournemouth", "Bournemouth"),
    ("Brentford FC", "Brentford"),
    ("Brighton & Hove Albion FC", "Brighton"),
    ("Burnley FC", "Burnley"),
    ("Chelsea FC", "Chelsea"),
    ("Crystal Palace FC", "Crystal Palace"),
    ("Everton FC", "Everton"),
    ("Fulham FC", "Fulham"),
    ("Leeds United FC", "Leeds"),
    ("Liverpool FC", "Liverpool"),
    ("Manchester City FC", "Man City"),
    ("Manchester United FC", "Man Utd"),
    ("Newcastle United FC", "Newcastle"),
    ("Nottingham Forest FC", "Nottingham Forest"),
    ("Sunderland AFC", "Sunderland"),
    ("Tottenham Hotspur FC", "Spurs"),
    ("West Ham United FC", "West Ham"),
    ("Wolverhampton Wanderers FC", "Wolves"),
];

pub fn is_canonical(name: &str) -> bool {
    CANONICAL_TEAMS.contains(&name)
}

/// Maps external team-name spellings to canonical names.
#[derive(Debug, Clone)]
pub struct TeamNormalizer {
    aliases: HashMap<String, String>,
}

impl Default for TeamNormalizer {
    fn default() -> Self {
        let mut aliases: HashMap<String, String> = API_ALIASES
            .iter()
            .map(|(external, canonical)| (external.to_string(), canonical.to_string()))
            .collect();
        for name in CANONICAL_TEAMS {
            aliases.insert(name.to_string(), name.to_string());
        }
        Self { aliases }
    }
}

impl TeamNormalizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Extends the mapping table. Targets must already be canonical names.
    pub fn with_aliases<I, K, V>(mut self, extra: I) -> Result<Self, PipelineError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (external, canonical) in extra {
            let canonical = canonical.into();
            if !is_canonical(&canonical) {
                return Err(PipelineError::unknown_team(canonical));
            }
            self.aliases.insert(external.into(), canonical);
        }
        Ok(self)
    }

    pub fn normalize(&self, external: &str) -> Result<&str, PipelineError> {
        self.aliases
            .get(external.trim())
            .map(String::as_str)
            .ok_or_else(|| PipelineError::unknown_team(external))
    }

    /// Returns every name without a mapping, in input order and without duplicates.
    pub fn check_all_mappable<'a, I>(&self, names: I) -> Vec<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut seen = HashSet::new();
        let mut invalid = Vec::new();
        for name in names {
            if self.normalize(name).is_err() && seen.insert(name) {
                invalid.push(name.to_string());
            }
        }
        invalid
    }
}
