use anyhow::{Context, Result};
use log::{error, warn};

use predictor_league::config::{self, Config};
use predictor_league::error::PipelineError;
use predictor_league::gaps::GapTracker;
use predictor_league::history::{HistoryStore, JsonFileStore};
use predictor_league::predictions::{check_predictions, load_predictions};
use predictor_league::progression::{Pipeline, Progress};
use predictor_league::provider::FootballDataProvider;
use predictor_league::scoring::verify_stored_scores;
use predictor_league::teams::TeamNormalizer;

fn main() -> Result<()> {
    config::load_dotenv();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cfg = Config::from_env()?;
    let predictions = load_predictions(&cfg.predictions_path)?;
    for warning in check_predictions(&predictions) {
        warn!("predictions: {warning}");
    }

    let normalizer = TeamNormalizer::new();
    let mut store = JsonFileStore::open(&cfg.data_dir);
    let mut gaps = GapTracker::open(cfg.gaps_path())?;
    for problem in store.read_all()?.check_invariants() {
        warn!("history: {problem}");
    }

    let provider = FootballDataProvider::from_config(&cfg)?;
    let outcome = Pipeline::new(&mut store, &mut gaps, &predictions, &normalizer)
        .strict_games_played(cfg.strict_games_played)
        .run(&provider);

    let progress = match outcome {
        Ok(progress) => progress,
        Err(err @ PipelineError::MissedGameweek { .. }) => {
            error!("{err}");
            for gameweek in err.missed_range().into_iter().flatten() {
                error!("gameweek {gameweek} needs manual backfill");
            }
            return Err(err).context("automatic update stopped; run the backfill tool");
        }
        Err(err) => return Err(err).context("update failed; nothing was written"),
    };

    match progress {
        Progress::InProgress {
            last_saved,
            highest_complete,
        } => println!(
            "Gameweek {} in progress (last saved {last_saved}, complete {highest_complete})",
            last_saved.saturating_add(1)
        ),
        Progress::AlreadySaved { gameweek } => println!("Gameweek {gameweek} already saved"),
        Progress::TargetExists { gameweek } => {
            println!("Gameweek {gameweek} already stored; left untouched")
        }
        Progress::Advanced { gameweek } => println!("Saved gameweek {gameweek}"),
    }

    let history = store.read_all()?;
    let stale = verify_stored_scores(&history, &predictions);
    if !stale.is_empty() {
        warn!("stored scores differ from recomputation for gameweek(s) {stale:?}");
    }
    Ok(())
}
