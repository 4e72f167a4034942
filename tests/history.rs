mod common;

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::Result;
use serde_json::Value;

use predictor_league::error::PipelineError;
use predictor_league::gaps::{GapStatus, GapTracker};
use predictor_league::history::{History, HistoryStore, JsonFileStore, MemoryStore};
use predictor_league::progression::{Pipeline, Progress};
use predictor_league::scoring::score_gameweek;
use predictor_league::teams::TeamNormalizer;

use common::{live_table, predictions, snapshot, temp_dir};

#[test]
fn json_store_round_trips_and_refuses_overwrite() {
    let dir = temp_dir("history_roundtrip");
    let mut store = JsonFileStore::open(&dir);
    assert_eq!(store.last_saved().unwrap(), 0);

    let preds = predictions();
    store
        .append(snapshot(1), score_gameweek(&snapshot(1), &preds))
        .unwrap();
    store
        .append(snapshot(2), score_gameweek(&snapshot(2), &preds))
        .unwrap();

    let history = store.read_all().unwrap();
    assert_eq!(history.last_saved(), 2);
    assert_eq!(history.standings(2), Some(&snapshot(2)));
    assert_eq!(
        history.scores(1).unwrap(),
        score_gameweek(&snapshot(1), &preds).as_slice()
    );
    assert!(history.check_invariants().is_empty());

    let err = store
        .append(snapshot(2), score_gameweek(&snapshot(2), &preds))
        .unwrap_err();
    assert!(matches!(err, PipelineError::GameweekExists(2)));
    assert_eq!(store.read_all().unwrap(), history);
}

#[test]
fn json_layout_keys_gameweeks_and_positions() {
    let dir = temp_dir("history_layout");
    let mut store = JsonFileStore::open(&dir);
    store
        .append(snapshot(1), score_gameweek(&snapshot(1), &predictions()))
        .unwrap();

    let raw = fs::read_to_string(dir.join("standings.json")).unwrap();
    let v: Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(v["gameweeks"]["1"]["1"], "Arsenal");
    assert_eq!(v["gameweeks"]["1"]["20"], "Wolves");
    assert!(v["lastUpdated"].is_string());

    let raw = fs::read_to_string(dir.join("scores.json")).unwrap();
    let v: Value = serde_json::from_str(&raw).unwrap();
    let first = &v["gameweeks"]["1"][0];
    assert_eq!(first["name"], "Alice");
    assert_eq!(first["totalScore"], 0);
    assert_eq!(first["participant"]["kind"], "real");
}

#[test]
fn backup_hook_runs_before_each_overwrite() {
    let dir = temp_dir("history_backup");
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let mut store = JsonFileStore::with_backup(&dir, move |_: &Path| -> Result<()> {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });
    let preds = predictions();
    store
        .append(snapshot(1), score_gameweek(&snapshot(1), &preds))
        .unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn default_backups_copy_previous_files() {
    let dir = temp_dir("history_default_backup");
    let mut store = JsonFileStore::open(&dir);
    let preds = predictions();
    store
        .append(snapshot(1), score_gameweek(&snapshot(1), &preds))
        .unwrap();
    // Nothing existed before the first write.
    assert!(!dir.join("backups").exists());

    store
        .append(snapshot(2), score_gameweek(&snapshot(2), &preds))
        .unwrap();
    let backups = fs::read_dir(dir.join("backups")).unwrap().count();
    assert_eq!(backups, 2);
}

#[test]
fn corrupt_stored_standings_fail_to_load() {
    let dir = temp_dir("history_corrupt");
    fs::write(
        dir.join("standings.json"),
        r#"{"gameweeks": {"1": {"1": "Arsenal", "2": "Arsenal"}}, "lastUpdated": null}"#,
    )
    .unwrap();
    let store = JsonFileStore::open(&dir);
    assert!(store.read_all().is_err());
}

#[test]
fn replace_scores_must_cover_stored_gameweeks() {
    let preds = predictions();
    let mut store = MemoryStore::new();
    store
        .append(snapshot(1), score_gameweek(&snapshot(1), &preds))
        .unwrap();

    let mut wrong = std::collections::BTreeMap::new();
    wrong.insert(2u8, score_gameweek(&snapshot(2), &preds));
    assert!(store.replace_scores(wrong).is_err());

    let mut right = std::collections::BTreeMap::new();
    right.insert(1u8, Vec::new());
    store.replace_scores(right).unwrap();
    assert_eq!(store.history().scores(1), Some(&[][..]));
    assert_eq!(store.writes(), 2);
}

#[test]
fn invariants_flag_non_contiguous_and_mismatched_keys() {
    let mut history = History::default();
    history.standings.insert(1, snapshot(1));
    history.standings.insert(3, snapshot(3));
    history.scores.insert(1, Vec::new());
    let problems = history.check_invariants();
    assert!(problems.iter().any(|p| p.contains("not contiguous")));
    assert!(problems.iter().any(|p| p.contains("gameweek 3 has standings but no scores")));
}

#[test]
fn gap_records_persist_across_reopen() {
    let dir = temp_dir("gaps_persist");
    let path = dir.join("gaps.json");

    let mut gaps = GapTracker::open(&path).unwrap();
    assert_eq!(gaps.record_gap(5, 8).unwrap(), vec![6, 7]);
    assert!(gaps.record_gap(5, 8).unwrap().is_empty());

    let mut reopened = GapTracker::open(&path).unwrap();
    assert_eq!(reopened.missed_gameweeks().len(), 2);
    assert!(reopened.mark_as_manually_filled(6).unwrap());
    assert!(!reopened.mark_as_manually_filled(30).unwrap());

    let reopened = GapTracker::open(&path).unwrap();
    let six = reopened.records().find(|r| r.gameweek == 6).unwrap();
    assert_eq!(six.status, GapStatus::ManuallyFilled);
    assert!(six.filled_at.is_some());
    let missed: Vec<u8> = reopened.missed_gameweeks().iter().map(|r| r.gameweek).collect();
    assert_eq!(missed, vec![7]);
}

#[test]
fn clearing_gaps_is_explicit_and_total() {
    let mut gaps = GapTracker::in_memory();
    gaps.record_gap(0, 4).unwrap();
    assert_eq!(gaps.records().count(), 3);
    gaps.clear_all_gaps().unwrap();
    assert_eq!(gaps.records().count(), 0);
}

#[test]
fn adjacent_gameweeks_record_no_gap() {
    let mut gaps = GapTracker::in_memory();
    assert!(gaps.record_gap(5, 6).unwrap().is_empty());
    assert!(gaps.record_gap(5, 5).unwrap().is_empty());
}

#[test]
fn failed_standings_write_leaves_scores_as_they_were() {
    let dir = temp_dir("history_rollback");
    let mut store = JsonFileStore::open(&dir);
    let preds = predictions();
    store
        .append(snapshot(1), score_gameweek(&snapshot(1), &preds))
        .unwrap();
    let before = fs::read(dir.join("scores.json")).unwrap();

    // A directory where the temp file should go makes the standings write fail.
    fs::create_dir_all(dir.join("standings.json.tmp")).unwrap();
    assert!(
        store
            .append(snapshot(2), score_gameweek(&snapshot(2), &preds))
            .is_err()
    );
    assert_eq!(fs::read(dir.join("scores.json")).unwrap(), before);
    let history = store.read_all().unwrap();
    assert_eq!(history.last_saved(), 1);
    assert!(history.check_invariants().is_empty());

    fs::remove_dir_all(dir.join("standings.json.tmp")).unwrap();
    store
        .append(snapshot(2), score_gameweek(&snapshot(2), &preds))
        .unwrap();
    assert_eq!(store.last_saved().unwrap(), 2);
}

#[test]
fn failed_first_write_removes_new_scores_file() {
    let dir = temp_dir("history_rollback_fresh");
    let mut store = JsonFileStore::open(&dir);
    fs::create_dir_all(dir.join("standings.json.tmp")).unwrap();
    assert!(
        store
            .append(snapshot(1), score_gameweek(&snapshot(1), &predictions()))
            .is_err()
    );
    assert!(!dir.join("scores.json").exists());
    assert!(store.read_all().unwrap().check_invariants().is_empty());
}

#[test]
fn scores_without_standings_do_not_block_the_pipeline() {
    let dir = temp_dir("history_orphan_scores");
    fs::write(
        dir.join("scores.json"),
        r#"{"gameweeks": {"1": []}, "lastUpdated": null}"#,
    )
    .unwrap();
    let mut store = JsonFileStore::open(&dir);
    let mut gaps = GapTracker::in_memory();
    let preds = predictions();
    let normalizer = TeamNormalizer::new();

    let progress = Pipeline::new(&mut store, &mut gaps, &preds, &normalizer)
        .process(&live_table(1))
        .unwrap();
    assert_eq!(progress, Progress::Advanced { gameweek: 1 });

    let history = store.read_all().unwrap();
    assert!(history.check_invariants().is_empty());
    assert_eq!(
        history.scores(1).unwrap(),
        score_gameweek(&snapshot(1), &preds).as_slice()
    );
}
