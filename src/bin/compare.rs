use anyhow::{Context, Result, anyhow};

use predictor_league::compare::{Comparison, biggest_movers, compare, top_decliners, top_improvers};
use predictor_league::config::{self, Config};
use predictor_league::history::{HistoryStore, JsonFileStore};
use predictor_league::predictions::GroupFilter;

const DEFAULT_TOP: usize = 3;

/// Usage: compare [--from <gw>] [--to <gw>] [--group <tag|all>] [--top <n>]
fn main() -> Result<()> {
    config::load_dotenv();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cfg = Config::from_env()?;
    let history = JsonFileStore::open(&cfg.data_dir).read_all()?;
    let last = history.last_saved();

    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let to = match arg_value(&args, "--to") {
        Some(raw) => raw.parse::<u8>().context("--to must be a gameweek number")?,
        None => last,
    };
    let from = match arg_value(&args, "--from") {
        Some(raw) => raw.parse::<u8>().context("--from must be a gameweek number")?,
        None => to.saturating_sub(1),
    };
    let filter = arg_value(&args, "--group")
        .map(GroupFilter::from)
        .unwrap_or(GroupFilter::All);
    let top = arg_value(&args, "--top")
        .and_then(|raw| raw.parse::<usize>().ok())
        .unwrap_or(DEFAULT_TOP);

    let rows = compare(&history, from, to, &filter)
        .ok_or_else(|| anyhow!("no stored scores for gameweek {from} and/or {to}"))?;

    println!("GW{from} -> GW{to} ({filter})");
    println!("{:>4}  {:<24} {:>6} {:>6} {:>6}", "Pos", "Name", "Score", "dPos", "dScore");
    for row in &rows {
        println!(
            "{:>4}  {:<24} {:>6} {:>6} {:>6}",
            row.current_position,
            row.name,
            row.current_score,
            signed(row.position_change),
            signed(row.score_change)
        );
    }

    print_section("Biggest movers", &biggest_movers(&rows, top), |c| c.position_change);
    print_section("Top improvers", &top_improvers(&rows, top), |c| c.score_change);
    print_section("Top decliners", &top_decliners(&rows, top), |c| c.score_change);
    Ok(())
}

fn print_section(title: &str, rows: &[&Comparison], value: impl Fn(&Comparison) -> Option<i64>) {
    if rows.is_empty() {
        return;
    }
    println!();
    println!("{title}:");
    for row in rows {
        println!("  {:<24} {:>6}", row.name, signed(value(row)));
    }
}

fn signed(value: Option<i64>) -> String {
    match value {
        Some(v) if v > 0 => format!("+{v}"),
        Some(v) => v.to_string(),
        None => "new".to_string(),
    }
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
