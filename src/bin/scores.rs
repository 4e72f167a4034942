use anyhow::{Context, Result, anyhow};
use log::info;

use predictor_league::config::{self, Config};
use predictor_league::history::{HistoryStore, JsonFileStore};
use predictor_league::predictions::{GroupFilter, load_predictions};
use predictor_league::scoring::{leaderboard, recompute_all_scores, verify_stored_scores};

/// Usage: scores [show [--gameweek <n>] [--group <tag|all>] | verify | recompute]
fn main() -> Result<()> {
    config::load_dotenv();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cfg = Config::from_env()?;
    let mut store = JsonFileStore::open(&cfg.data_dir);
    let history = store.read_all()?;
    let args = std::env::args().skip(1).collect::<Vec<_>>();

    match args.first().map(String::as_str).unwrap_or("show") {
        "show" => {
            let gameweek = match arg_value(&args, "--gameweek") {
                Some(raw) => raw.parse::<u8>().context("--gameweek must be a number")?,
                None => history.last_saved(),
            };
            let filter = arg_value(&args, "--group")
                .map(GroupFilter::from)
                .unwrap_or(GroupFilter::All);
            let scores = history
                .scores(gameweek)
                .ok_or_else(|| anyhow!("no scores stored for gameweek {gameweek}"))?;
            println!("GW{gameweek} leaderboard ({filter})");
            for row in leaderboard(scores, &filter) {
                let marker = if row.result.is_consensus() { "*" } else { " " };
                println!(
                    "{:>4}{marker} {:<24} {:>4}",
                    row.rank, row.result.name, row.result.total_score
                );
            }
        }
        "verify" => {
            let predictions = load_predictions(&cfg.predictions_path)?;
            let stale = verify_stored_scores(&history, &predictions);
            if stale.is_empty() {
                println!("All stored scores match recomputation");
            } else {
                return Err(anyhow!("stored scores differ for gameweek(s) {stale:?}"));
            }
        }
        "recompute" => {
            let predictions = load_predictions(&cfg.predictions_path)?;
            let scores = recompute_all_scores(&history, &predictions);
            let n = scores.len();
            store.replace_scores(scores)?;
            info!("recomputed scores for {n} gameweek(s)");
            println!("Recomputed scores for {n} gameweek(s)");
        }
        other => return Err(anyhow!("unknown command {other}")),
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
