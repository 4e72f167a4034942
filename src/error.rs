use thiserror::Error;

/// Failures that abort a pipeline run before anything is written to the history store.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("unknown team name(s) with no canonical mapping: {}", .names.join(", "))]
    UnknownTeam { names: Vec<String> },

    #[error("standings failed validation: {}", .errors.join("; "))]
    Validation { errors: Vec<String> },

    #[error(
        "missed gameweek(s) {first_missed}..={last_missed}: last saved {last_saved}, \
         highest complete {highest_complete}; manual backfill required"
    )]
    MissedGameweek {
        last_saved: u8,
        highest_complete: u8,
        first_missed: u8,
        last_missed: u8,
    },

    #[error("games played mismatch for gameweek {expected}: {}", format_offenders(.offending))]
    GamesPlayedMismatch {
        expected: u32,
        offending: Vec<(String, u32)>,
    },

    #[error("gameweek {0} already exists in history; refusing to overwrite")]
    GameweekExists(u8),

    #[error("gameweek {gameweek} is out of order; next gameweek to save is {expected}")]
    OutOfOrder { gameweek: u8, expected: u8 },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PipelineError {
    pub fn unknown_team(name: impl Into<String>) -> Self {
        Self::UnknownTeam {
            names: vec![name.into()],
        }
    }

    /// The gameweeks a `MissedGameweek` error asks to be backfilled by hand.
    pub fn missed_range(&self) -> Option<std::ops::RangeInclusive<u8>> {
        match self {
            Self::MissedGameweek {
                first_missed,
                last_missed,
                ..
            } => Some(*first_missed..=*last_missed),
            _ => None,
        }
    }
}

fn format_offenders(offending: &[(String, u32)]) -> String {
    offending
        .iter()
        .map(|(team, played)| format!("{team} has played {played}"))
        .collect::<Vec<_>>()
        .join(", ")
}
