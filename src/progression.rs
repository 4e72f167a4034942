use log::{debug, info, warn};

use crate::error::PipelineError;
use crate::gaps::GapTracker;
use crate::history::HistoryStore;
use crate::predictions::Prediction;
use crate::provider::StandingsProvider;
use crate::scoring::score_gameweek;
use crate::standings::{LiveTable, StandingEntry, StandingsSnapshot};
use crate::teams::{TEAM_COUNT, TeamNormalizer};
use crate::validate::{validate_games_played, validate_gameweek_number};

/// What to do given the last stored gameweek and the latest complete one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    InProgress,
    AlreadySaved,
    Advance(u8),
    Gap { first_missed: u8, last_missed: u8 },
}

pub fn decide(last_saved: u8, highest_complete: u8) -> Decision {
    let next_to_save = last_saved.saturating_add(1);
    if highest_complete == last_saved {
        Decision::AlreadySaved
    } else if highest_complete < next_to_save {
        Decision::InProgress
    } else if highest_complete > next_to_save {
        Decision::Gap {
            first_missed: next_to_save,
            last_missed: highest_complete - 1,
        }
    } else {
        Decision::Advance(next_to_save)
    }
}

/// Result of a run that did not fail. Only `Advanced` wrote anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    InProgress { last_saved: u8, highest_complete: u8 },
    AlreadySaved { gameweek: u8 },
    TargetExists { gameweek: u8 },
    Advanced { gameweek: u8 },
}

impl Progress {
    pub fn wrote(&self) -> bool {
        matches!(self, Progress::Advanced { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ManualFill {
    pub gameweek: u8,
    /// Whether a pending gap record was resolved by this fill.
    pub gap_resolved: bool,
}

/// Moves the stored history forward by at most one gameweek per run.
pub struct Pipeline<'a, S: HistoryStore> {
    store: &'a mut S,
    gaps: &'a mut GapTracker,
    predictions: &'a [Prediction],
    normalizer: &'a TeamNormalizer,
    strict_games_played: bool,
}

impl<'a, S: HistoryStore> Pipeline<'a, S> {
    pub fn new(
        store: &'a mut S,
        gaps: &'a mut GapTracker,
        predictions: &'a [Prediction],
        normalizer: &'a TeamNormalizer,
    ) -> Self {
        Self {
            store,
            gaps,
            predictions,
            normalizer,
            strict_games_played: true,
        }
    }

    /// When false, teams ahead of the gameweek being saved only produce a warning.
    pub fn strict_games_played(mut self, strict: bool) -> Self {
        self.strict_games_played = strict;
        self
    }

    /// Fetches the live table and processes it. Provider failures abort before any write.
    pub fn run(&mut self, provider: &dyn StandingsProvider) -> Result<Progress, PipelineError> {
        let table = provider.fetch_table()?;
        self.process(&table)
    }

    pub fn process(&mut self, table: &LiveTable) -> Result<Progress, PipelineError> {
        if table.entries.len() != TEAM_COUNT {
            return Err(PipelineError::Validation {
                errors: vec![format!(
                    "live table has {} teams, expected {TEAM_COUNT}",
                    table.entries.len()
                )],
            });
        }
        let highest_complete = table
            .highest_complete()
            .and_then(|n| u8::try_from(n).ok())
            .ok_or_else(|| PipelineError::Validation {
                errors: vec!["live table reports an impossible games-played count".to_string()],
            })?;
        // 0 is a pre-season table; anything past the last round is a bad feed.
        if highest_complete > 0 {
            let report = validate_gameweek_number(i64::from(highest_complete));
            if !report.valid {
                return Err(PipelineError::Validation {
                    errors: report.errors,
                });
            }
        }
        let last_saved = self.store.last_saved()?;
        debug!(
            "last saved {last_saved}, highest complete {highest_complete}, max played {:?}",
            table.max_games_played()
        );

        match decide(last_saved, highest_complete) {
            Decision::AlreadySaved => {
                info!("gameweek {last_saved} already saved");
                Ok(Progress::AlreadySaved {
                    gameweek: last_saved,
                })
            }
            Decision::InProgress => {
                if highest_complete < last_saved {
                    warn!(
                        "live table is behind stored history ({highest_complete} < {last_saved})"
                    );
                } else {
                    info!("gameweek {} in progress", last_saved.saturating_add(1));
                }
                Ok(Progress::InProgress {
                    last_saved,
                    highest_complete,
                })
            }
            Decision::Gap {
                first_missed,
                last_missed,
            } => {
                self.gaps.record_gap(last_saved, highest_complete)?;
                Err(PipelineError::MissedGameweek {
                    last_saved,
                    highest_complete,
                    first_missed,
                    last_missed,
                })
            }
            Decision::Advance(gameweek) => self.advance(table, gameweek),
        }
    }

    fn advance(&mut self, table: &LiveTable, gameweek: u8) -> Result<Progress, PipelineError> {
        if self.store.exists(gameweek)? {
            warn!("gameweek {gameweek} already stored; not overwriting");
            return Ok(Progress::TargetExists { gameweek });
        }

        let candidate = table.to_candidate(self.normalizer)?;

        let played = validate_games_played(table, u32::from(gameweek));
        if !played.valid {
            if self.strict_games_played {
                return Err(PipelineError::GamesPlayedMismatch {
                    expected: u32::from(gameweek),
                    offending: played.offending,
                });
            }
            for err in &played.errors {
                warn!("{err}");
            }
        }

        let snapshot = StandingsSnapshot::from_entries(gameweek, &candidate)?;
        self.store_snapshot(snapshot)?;
        info!("advanced to gameweek {gameweek}");
        Ok(Progress::Advanced { gameweek })
    }

    /// Accepts an externally supplied table for the next gameweek, validated exactly like the
    /// automatic path, and resolves the matching gap record.
    pub fn manual_override(
        &mut self,
        gameweek: u8,
        entries: &[StandingEntry],
    ) -> Result<ManualFill, PipelineError> {
        if self.store.exists(gameweek)? {
            return Err(PipelineError::GameweekExists(gameweek));
        }
        let expected = self.store.last_saved()?.saturating_add(1);
        if gameweek != expected {
            return Err(PipelineError::OutOfOrder { gameweek, expected });
        }

        let unknown = self
            .normalizer
            .check_all_mappable(entries.iter().map(|e| e.team.as_str()));
        if !unknown.is_empty() {
            return Err(PipelineError::UnknownTeam { names: unknown });
        }
        let candidate = entries
            .iter()
            .map(|e| {
                self.normalizer
                    .normalize(&e.team)
                    .map(|team| StandingEntry::new(e.position, team))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let snapshot = StandingsSnapshot::from_entries(gameweek, &candidate)?;
        self.store_snapshot(snapshot)?;
        info!("manually filled gameweek {gameweek}");
        // The standings are already committed; a failure here only leaves the gap record stale.
        let gap_resolved = match self.gaps.mark_as_manually_filled(gameweek) {
            Ok(resolved) => resolved,
            Err(err) => {
                warn!("could not mark gap record for gameweek {gameweek} as filled: {err:#}");
                false
            }
        };
        Ok(ManualFill {
            gameweek,
            gap_resolved,
        })
    }

    fn store_snapshot(&mut self, snapshot: StandingsSnapshot) -> Result<(), PipelineError> {
        let scores = score_gameweek(&snapshot, self.predictions);
        debug!(
            "scored {} rows for gameweek {}",
            scores.len(),
            snapshot.gameweek()
        );
        self.store.append(snapshot, scores)
    }
}
