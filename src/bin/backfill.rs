use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};

use predictor_league::config::{self, Config};
use predictor_league::gaps::GapTracker;
use predictor_league::history::JsonFileStore;
use predictor_league::predictions::load_predictions;
use predictor_league::progression::Pipeline;
use predictor_league::standings::StandingEntry;
use predictor_league::teams::TeamNormalizer;

/// Usage: backfill --gameweek <n> --file <standings.json>
/// The file maps positions to team names: {"1": "Arsenal", "2": "Man City", ...}
fn main() -> Result<()> {
    config::load_dotenv();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let gameweek = arg_value(&args, "--gameweek")
        .context("missing --gameweek")?
        .parse::<u8>()
        .context("--gameweek must be a number between 1 and 38")?;
    let file = arg_value(&args, "--file")
        .map(PathBuf::from)
        .context("missing --file")?;

    let raw = fs::read_to_string(&file).with_context(|| format!("read {}", file.display()))?;
    let table: BTreeMap<u32, String> =
        serde_json::from_str(&raw).context("standings file must map positions to team names")?;
    if table.is_empty() {
        return Err(anyhow!("standings file is empty"));
    }
    let entries = table
        .into_iter()
        .map(|(position, team)| StandingEntry::new(position, team))
        .collect::<Vec<_>>();

    let cfg = Config::from_env()?;
    let predictions = load_predictions(&cfg.predictions_path)?;
    let normalizer = TeamNormalizer::new();
    let mut store = JsonFileStore::open(&cfg.data_dir);
    let mut gaps = GapTracker::open(cfg.gaps_path())?;

    let fill = Pipeline::new(&mut store, &mut gaps, &predictions, &normalizer)
        .manual_override(gameweek, &entries)
        .context("manual backfill rejected; nothing was written")?;

    println!("Backfilled gameweek {}", fill.gameweek);
    if fill.gap_resolved {
        println!("Gap record for gameweek {} marked as filled", fill.gameweek);
    }
    let remaining = gaps.missed_gameweeks();
    if !remaining.is_empty() {
        let pending = remaining
            .iter()
            .map(|r| r.gameweek.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        println!("Still waiting for backfill: {pending}");
    }
    Ok(())
}

fn arg_value(args: &[String], flag: &str) -> Option<String> {
    let prefix = format!("{flag}=");
    for (idx, arg) in args.iter().enumerate() {
        if let Some(value) = arg.strip_prefix(&prefix) {
            return Some(value.trim().to_string());
        }
        if arg == flag {
            return args.get(idx + 1).map(|v| v.trim().to_string());
        }
    }
    None
}
