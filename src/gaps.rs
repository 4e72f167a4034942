use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::history::{read_json_or_default, write_json_atomic};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GapStatus {
    NeedsManualBackfill,
    ManuallyFilled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GapRecord {
    pub gameweek: u8,
    pub detected_at: DateTime<Utc>,
    pub status: GapStatus,
    pub reason: String,
    #[serde(default)]
    pub filled_at: Option<DateTime<Utc>>,
}

/// Durable list of gameweeks the automatic path skipped. Records are only removed by
/// `clear_all_gaps`.
#[derive(Debug, Clone, Default)]
pub struct GapTracker {
    records: BTreeMap<u8, GapRecord>,
    path: Option<PathBuf>,
}

impl GapTracker {
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Loads `path` if it exists; every mutation is written back to it.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let records: BTreeMap<u8, GapRecord> = read_json_or_default(&path)
            .with_context(|| format!("load gap records from {}", path.display()))?;
        Ok(Self {
            records,
            path: Some(path),
        })
    }

    /// Records every gameweek in `last_saved + 1 ..= current_complete - 1` that has no record yet.
    /// Returns the gameweeks newly recorded.
    pub fn record_gap(&mut self, last_saved: u8, current_complete: u8) -> Result<Vec<u8>> {
        let first = last_saved.saturating_add(1);
        let last = current_complete.saturating_sub(1);
        let now = Utc::now();
        let mut added = Vec::new();
        for gw in first..=last {
            if self.records.contains_key(&gw) {
                continue;
            }
            self.records.insert(
                gw,
                GapRecord {
                    gameweek: gw,
                    detected_at: now,
                    status: GapStatus::NeedsManualBackfill,
                    reason: format!(
                        "gameweek {gw} completed between runs (last saved {last_saved}, \
                         highest complete {current_complete})"
                    ),
                    filled_at: None,
                },
            );
            added.push(gw);
        }
        if !added.is_empty() {
            warn!("recorded missed gameweek(s) {added:?}");
            self.persist()?;
        }
        Ok(added)
    }

    /// Returns false when there is no record for `gameweek`.
    pub fn mark_as_manually_filled(&mut self, gameweek: u8) -> Result<bool> {
        let Some(record) = self.records.get_mut(&gameweek) else {
            return Ok(false);
        };
        record.status = GapStatus::ManuallyFilled;
        record.filled_at = Some(Utc::now());
        info!("gameweek {gameweek} marked as manually filled");
        self.persist()?;
        Ok(true)
    }

    /// Records still waiting for manual backfill, lowest gameweek first.
    pub fn missed_gameweeks(&self) -> Vec<&GapRecord> {
        self.records
            .values()
            .filter(|r| r.status == GapStatus::NeedsManualBackfill)
            .collect()
    }

    pub fn records(&self) -> impl Iterator<Item = &GapRecord> {
        self.records.values()
    }

    pub fn clear_all_gaps(&mut self) -> Result<()> {
        let n = self.records.len();
        self.records.clear();
        info!("cleared {n} gap record(s)");
        self.persist()
    }

    fn persist(&self) -> Result<()> {
        match &self.path {
            Some(path) => write_json_atomic(path, &self.records),
            None => Ok(()),
        }
    }
}
