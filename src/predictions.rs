use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::teams::{TEAM_COUNT, is_canonical};

/// A participant's pre-season ranking. Position is index + 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prediction {
    pub name: String,
    #[serde(default)]
    pub groups: BTreeSet<String>,
    pub rankings: Vec<String>,
}

impl Prediction {
    pub fn new<G, R>(name: impl Into<String>, groups: G, rankings: R) -> Self
    where
        G: IntoIterator,
        G::Item: Into<String>,
        R: IntoIterator,
        R::Item: Into<String>,
    {
        Self {
            name: name.into(),
            groups: groups.into_iter().map(Into::into).collect(),
            rankings: rankings.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum GroupFilter {
    All,
    Group(String),
}

impl GroupFilter {
    pub fn admits(&self, prediction: &Prediction) -> bool {
        match self {
            GroupFilter::All => true,
            GroupFilter::Group(group) => prediction.groups.contains(group),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            GroupFilter::All => "all",
            GroupFilter::Group(group) => group,
        }
    }
}

impl From<String> for GroupFilter {
    fn from(raw: String) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("all") {
            GroupFilter::All
        } else {
            GroupFilter::Group(trimmed.to_string())
        }
    }
}

impl From<GroupFilter> for String {
    fn from(filter: GroupFilter) -> Self {
        filter.label().to_string()
    }
}

impl FromStr for GroupFilter {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(GroupFilter::from(s.to_string()))
    }
}

impl fmt::Display for GroupFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

pub fn filter_predictions<'a>(
    predictions: &'a [Prediction],
    filter: &GroupFilter,
) -> Vec<&'a Prediction> {
    predictions.iter().filter(|p| filter.admits(p)).collect()
}

/// Every group tag in use, sorted.
pub fn distinct_groups(predictions: &[Prediction]) -> Vec<String> {
    predictions
        .iter()
        .flat_map(|p| p.groups.iter().cloned())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

pub fn load_predictions(path: &Path) -> Result<Vec<Prediction>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("read predictions from {}", path.display()))?;
    parse_predictions_json(&raw)
}

pub fn parse_predictions_json(raw: &str) -> Result<Vec<Prediction>> {
    serde_json::from_str::<Vec<Prediction>>(raw.trim()).context("invalid predictions json")
}

/// Dataset problems worth surfacing. Scoring tolerates all of these, so they are warnings.
pub fn check_predictions(predictions: &[Prediction]) -> Vec<String> {
    let mut warnings = Vec::new();
    let mut names = HashSet::new();
    for p in predictions {
        if !names.insert(p.name.as_str()) {
            warnings.push(format!("duplicate participant name {}", p.name));
        }
        if p.rankings.len() != TEAM_COUNT {
            warnings.push(format!(
                "{} ranks {} teams, expected {TEAM_COUNT}",
                p.name,
                p.rankings.len()
            ));
        }
        let mut seen = HashSet::new();
        for team in &p.rankings {
            if !seen.insert(team.as_str()) {
                warnings.push(format!("{} ranks {team} more than once", p.name));
            }
            if !is_canonical(team) {
                warnings.push(format!("{} ranks unrecognized team {team}", p.name));
            }
        }
    }
    warnings
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_filter_parses_all_case_insensitively() {
        assert_eq!("ALL".parse::<GroupFilter>().unwrap(), GroupFilter::All);
        assert_eq!(
            "LIV".parse::<GroupFilter>().unwrap(),
            GroupFilter::Group("LIV".to_string())
        );
    }

    #[test]
    fn predictions_json_defaults_missing_groups() {
        let raw = r#"[{"name": "Ann", "rankings": ["Arsenal"]}]"#;
        let parsed = parse_predictions_json(raw).unwrap();
        assert!(parsed[0].groups.is_empty());
        assert!(!GroupFilter::Group("LIV".into()).admits(&parsed[0]));
        assert!(GroupFilter::All.admits(&parsed[0]));
    }

    #[test]
    fn check_flags_short_and_duplicate_rankings() {
        let p = Prediction::new("Ann", ["LIV"], ["Arsenal", "Arsenal"]);
        let warnings = check_predictions(&[p.clone(), p]);
        assert!(warnings.iter().any(|w| w.contains("duplicate participant")));
        assert!(warnings.iter().any(|w| w.contains("more than once")));
        assert!(warnings.iter().any(|w| w.contains("expected 20")));
    }
}
