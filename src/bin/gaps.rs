use anyhow::{Context, Result, anyhow};

use predictor_league::config::{self, Config};
use predictor_league::gaps::{GapStatus, GapTracker};

/// Usage: gaps [list | all | mark <gameweek> | clear --yes]
fn main() -> Result<()> {
    config::load_dotenv();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cfg = Config::from_env()?;
    let mut gaps = GapTracker::open(cfg.gaps_path())?;
    let args = std::env::args().skip(1).collect::<Vec<_>>();

    match args.first().map(String::as_str).unwrap_or("list") {
        "list" => {
            let missed = gaps.missed_gameweeks();
            if missed.is_empty() {
                println!("No missed gameweeks");
            }
            for record in missed {
                println!(
                    "GW{:>2}  detected {}  {}",
                    record.gameweek,
                    record.detected_at.format("%Y-%m-%d %H:%M"),
                    record.reason
                );
            }
        }
        "all" => {
            for record in gaps.records() {
                let status = match record.status {
                    GapStatus::NeedsManualBackfill => "needs backfill".to_string(),
                    GapStatus::ManuallyFilled => match record.filled_at {
                        Some(at) => format!("filled {}", at.format("%Y-%m-%d %H:%M")),
                        None => "filled".to_string(),
                    },
                };
                println!("GW{:>2}  {status}", record.gameweek);
            }
        }
        "mark" => {
            let gameweek = args
                .get(1)
                .context("usage: gaps mark <gameweek>")?
                .parse::<u8>()
                .context("gameweek must be a number")?;
            if gaps.mark_as_manually_filled(gameweek)? {
                println!("Gameweek {gameweek} marked as filled");
            } else {
                println!("No gap recorded for gameweek {gameweek}");
            }
        }
        "clear" => {
            if !args.iter().any(|a| a == "--yes") {
                return Err(anyhow!("refusing to clear gap records without --yes"));
            }
            gaps.clear_all_gaps()?;
            println!("Cleared all gap records");
        }
        other => return Err(anyhow!("unknown command {other}")),
    }
    Ok(())
}
