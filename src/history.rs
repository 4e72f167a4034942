use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;
use crate::scoring::ScoredResult;
use crate::standings::StandingsSnapshot;

const STANDINGS_FILE: &str = "standings.json";
const SCORES_FILE: &str = "scores.json";
const BACKUP_DIR: &str = "backups";

/// Everything persisted about the season so far, read fully into memory.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct History {
    pub standings: BTreeMap<u8, StandingsSnapshot>,
    pub scores: BTreeMap<u8, Vec<ScoredResult>>,
    pub standings_updated: Option<DateTime<Utc>>,
    pub scores_updated: Option<DateTime<Utc>>,
}

impl History {
    /// Highest stored gameweek, 0 when nothing is stored yet.
    pub fn last_saved(&self) -> u8 {
        self.standings.keys().next_back().copied().unwrap_or(0)
    }

    pub fn exists(&self, gameweek: u8) -> bool {
        self.standings.contains_key(&gameweek)
    }

    pub fn standings(&self, gameweek: u8) -> Option<&StandingsSnapshot> {
        self.standings.get(&gameweek)
    }

    pub fn scores(&self, gameweek: u8) -> Option<&[ScoredResult]> {
        self.scores.get(&gameweek).map(Vec::as_slice)
    }

    pub fn gameweeks(&self) -> impl Iterator<Item = u8> + '_ {
        self.standings.keys().copied()
    }

    /// Stored keys must be exactly 1..=last_saved, with scores for the same gameweeks as standings.
    pub fn check_invariants(&self) -> Vec<String> {
        let mut problems = Vec::new();
        for (expected, gw) in (1u8..).zip(self.standings.keys()) {
            if *gw != expected {
                problems.push(format!(
                    "standings are not contiguous: expected gameweek {expected}, found {gw}"
                ));
                break;
            }
        }
        for gw in self.standings.keys() {
            if !self.scores.contains_key(gw) {
                problems.push(format!("gameweek {gw} has standings but no scores"));
            }
        }
        for gw in self.scores.keys() {
            if !self.standings.contains_key(gw) {
                problems.push(format!("gameweek {gw} has scores but no standings"));
            }
        }
        problems
    }

    fn append(
        &mut self,
        snapshot: StandingsSnapshot,
        scores: Vec<ScoredResult>,
        now: DateTime<Utc>,
    ) -> Result<(), PipelineError> {
        let gw = snapshot.gameweek();
        // Scores without standings are leftovers of an interrupted write and get replaced.
        if self.standings.contains_key(&gw) {
            return Err(PipelineError::GameweekExists(gw));
        }
        self.standings.insert(gw, snapshot);
        self.scores.insert(gw, scores);
        self.standings_updated = Some(now);
        self.scores_updated = Some(now);
        Ok(())
    }

    fn replace_scores(
        &mut self,
        scores: BTreeMap<u8, Vec<ScoredResult>>,
        now: DateTime<Utc>,
    ) -> Result<()> {
        if !scores.keys().eq(self.standings.keys()) {
            return Err(anyhow!(
                "replacement scores must cover exactly the stored standings gameweeks"
            ));
        }
        self.scores = scores;
        self.scores_updated = Some(now);
        Ok(())
    }
}

/// Append-only storage for standings and their derived scores.
pub trait HistoryStore {
    fn read_all(&self) -> Result<History>;

    /// Stores one gameweek's standings and scores together. Never overwrites.
    fn append(
        &mut self,
        snapshot: StandingsSnapshot,
        scores: Vec<ScoredResult>,
    ) -> Result<(), PipelineError>;

    /// Rewrites derived scores only; standings stay untouched.
    fn replace_scores(&mut self, scores: BTreeMap<u8, Vec<ScoredResult>>) -> Result<()>;

    fn exists(&self, gameweek: u8) -> Result<bool> {
        Ok(self.read_all()?.exists(gameweek))
    }

    fn last_saved(&self) -> Result<u8> {
        Ok(self.read_all()?.last_saved())
    }
}

/// In-memory store that counts writes.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    history: History,
    writes: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_history(history: History) -> Self {
        Self { history, writes: 0 }
    }

    pub fn writes(&self) -> usize {
        self.writes
    }

    pub fn history(&self) -> &History {
        &self.history
    }
}

impl HistoryStore for MemoryStore {
    fn read_all(&self) -> Result<History> {
        Ok(self.history.clone())
    }

    fn append(
        &mut self,
        snapshot: StandingsSnapshot,
        scores: Vec<ScoredResult>,
    ) -> Result<(), PipelineError> {
        self.history.append(snapshot, scores, Utc::now())?;
        self.writes += 1;
        Ok(())
    }

    fn replace_scores(&mut self, scores: BTreeMap<u8, Vec<ScoredResult>>) -> Result<()> {
        self.history.replace_scores(scores, Utc::now())?;
        self.writes += 1;
        Ok(())
    }

    fn exists(&self, gameweek: u8) -> Result<bool> {
        Ok(self.history.exists(gameweek))
    }

    fn last_saved(&self) -> Result<u8> {
        Ok(self.history.last_saved())
    }
}

/// Called with the path of a file right before it is overwritten.
pub trait BackupHook {
    fn before_write(&self, path: &Path) -> Result<()>;
}

impl<F> BackupHook for F
where
    F: Fn(&Path) -> Result<()>,
{
    fn before_write(&self, path: &Path) -> Result<()> {
        self(path)
    }
}

/// Copies the current file to `<dir>/<stem>-<timestamp>.json` so a bad write can be rolled
/// back by hand.
#[derive(Debug, Clone)]
pub struct TimestampedCopy {
    dir: PathBuf,
}

impl TimestampedCopy {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl BackupHook for TimestampedCopy {
    fn before_write(&self, path: &Path) -> Result<()> {
        if !path.exists() {
            return Ok(());
        }
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("create backup dir {}", self.dir.display()))?;
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("history");
        let stamp = Utc::now().format("%Y%m%dT%H%M%S%.3f");
        let target = self.dir.join(format!("{stem}-{stamp}.json"));
        fs::copy(path, &target)
            .with_context(|| format!("back up {} to {}", path.display(), target.display()))?;
        debug!("backed up {} to {}", path.display(), target.display());
        Ok(())
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StandingsFile {
    #[serde(default)]
    gameweeks: BTreeMap<u8, BTreeMap<u32, String>>,
    #[serde(rename = "lastUpdated", default)]
    last_updated: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct ScoresFile {
    #[serde(default)]
    gameweeks: BTreeMap<u8, Vec<ScoredResult>>,
    #[serde(rename = "lastUpdated", default)]
    last_updated: Option<DateTime<Utc>>,
}

/// JSON files in one directory: `standings.json` and `scores.json`.
pub struct JsonFileStore {
    dir: PathBuf,
    backup: Box<dyn BackupHook>,
}

impl JsonFileStore {
    /// Store with timestamped backups under `<dir>/backups`.
    pub fn open(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        let backup = TimestampedCopy::new(dir.join(BACKUP_DIR));
        Self {
            dir,
            backup: Box::new(backup),
        }
    }

    pub fn with_backup(dir: impl Into<PathBuf>, backup: impl BackupHook + 'static) -> Self {
        Self {
            dir: dir.into(),
            backup: Box::new(backup),
        }
    }

    fn standings_path(&self) -> PathBuf {
        self.dir.join(STANDINGS_FILE)
    }

    fn scores_path(&self) -> PathBuf {
        self.dir.join(SCORES_FILE)
    }

    fn write(&self, history: &History) -> Result<()> {
        let standings = StandingsFile {
            gameweeks: history
                .standings
                .iter()
                .map(|(gw, snapshot)| (*gw, snapshot.to_position_map()))
                .collect(),
            last_updated: history.standings_updated,
        };
        let scores = ScoresFile {
            gameweeks: history.scores.clone(),
            last_updated: history.scores_updated,
        };

        let standings_path = self.standings_path();
        let scores_path = self.scores_path();
        self.backup.before_write(&standings_path)?;
        self.backup.before_write(&scores_path)?;

        let previous_scores = read_if_exists(&scores_path)?;
        write_json_atomic(&scores_path, &scores)?;
        if let Err(err) = write_json_atomic(&standings_path, &standings) {
            if let Err(restore_err) = restore(&scores_path, previous_scores.as_deref()) {
                warn!("could not roll back {}: {restore_err:#}", scores_path.display());
            }
            return Err(err);
        }
        Ok(())
    }
}

impl HistoryStore for JsonFileStore {
    fn read_all(&self) -> Result<History> {
        let standings: StandingsFile = read_json_or_default(&self.standings_path())?;
        let scores: ScoresFile = read_json_or_default(&self.scores_path())?;

        let mut history = History {
            standings_updated: standings.last_updated,
            scores_updated: scores.last_updated,
            scores: scores.gameweeks,
            ..History::default()
        };
        for (gw, map) in standings.gameweeks {
            let snapshot = StandingsSnapshot::from_position_map(gw, &map)
                .with_context(|| format!("stored standings for gameweek {gw} are invalid"))?;
            history.standings.insert(gw, snapshot);
        }
        Ok(history)
    }

    fn append(
        &mut self,
        snapshot: StandingsSnapshot,
        scores: Vec<ScoredResult>,
    ) -> Result<(), PipelineError> {
        let gw = snapshot.gameweek();
        let mut history = self.read_all()?;
        history.append(snapshot, scores, Utc::now())?;
        self.write(&history)?;
        info!("stored gameweek {gw} in {}", self.dir.display());
        Ok(())
    }

    fn replace_scores(&mut self, scores: BTreeMap<u8, Vec<ScoredResult>>) -> Result<()> {
        let mut history = self.read_all()?;
        history.replace_scores(scores, Utc::now())?;
        self.write(&history)
    }
}

pub(crate) fn read_json_or_default<T>(path: &Path) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    if !path.exists() {
        return Ok(T::default());
    }
    let raw = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    if raw.trim().is_empty() {
        return Ok(T::default());
    }
    serde_json::from_str(&raw).with_context(|| format!("parse {}", path.display()))
}

fn read_if_exists(path: &Path) -> Result<Option<Vec<u8>>> {
    if !path.exists() {
        return Ok(None);
    }
    fs::read(path)
        .map(Some)
        .with_context(|| format!("read {}", path.display()))
}

/// Puts `path` back to its earlier contents, or removes it if it did not exist.
fn restore(path: &Path, previous: Option<&[u8]>) -> Result<()> {
    match previous {
        Some(bytes) => fs::write(path, bytes),
        None => fs::remove_file(path),
    }
    .with_context(|| format!("restore {}", path.display()))
}

/// Writes to `<path>.tmp` then renames over the target.
pub(crate) fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("create {}", parent.display()))?;
    }
    let tmp = path.with_extension("json.tmp");
    let json = serde_json::to_string_pretty(value)
        .with_context(|| format!("serialize {}", path.display()))?;
    fs::write(&tmp, json).with_context(|| format!("write {}", tmp.display()))?;
    fs::rename(&tmp, path).with_context(|| format!("swap {}", path.display()))?;
    Ok(())
}
