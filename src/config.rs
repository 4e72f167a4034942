use std::env;
use std::path::PathBuf;

use anyhow::{Result, anyhow};

const APP_DIR: &str = "predictor_league";
const DEFAULT_API_BASE: &str = "https://api.football-data.org/v4";
const DEFAULT_COMPETITION: &str = "PL";
const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone)]
pub struct Config {
    pub data_dir: PathBuf,
    pub predictions_path: PathBuf,
    pub api_base: String,
    pub api_token: Option<String>,
    pub competition: String,
    pub strict_games_played: bool,
}

/// `.env.local` wins over `.env`; neither is required.
pub fn load_dotenv() {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let data_dir = env_non_empty("PREDICTOR_DATA_DIR")
            .map(PathBuf::from)
            .or_else(default_data_dir)
            .ok_or_else(|| anyhow!("unable to resolve data directory; set PREDICTOR_DATA_DIR"))?;
        let predictions_path = env_non_empty("PREDICTIONS_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("predictions.json"));

        Ok(Self {
            predictions_path,
            api_base: env_non_empty("FOOTBALL_DATA_API_BASE")
                .unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            api_token: env_non_empty("FOOTBALL_DATA_API_TOKEN"),
            competition: env_non_empty("COMPETITION_CODE")
                .unwrap_or_else(|| DEFAULT_COMPETITION.to_string()),
            strict_games_played: env_non_empty("STRICT_GAMES_PLAYED")
                .map(|raw| parse_bool(&raw))
                .unwrap_or(true),
            data_dir,
        })
    }

    pub fn gaps_path(&self) -> PathBuf {
        self.data_dir.join("gaps.json")
    }

    pub fn http_cache_path(&self) -> PathBuf {
        self.data_dir.join("http_cache.json")
    }
}

/// `HTTP_TIMEOUT_SECS`, at least one second.
pub fn http_timeout_secs() -> u64 {
    env_non_empty("HTTP_TIMEOUT_SECS")
        .and_then(|raw| raw.parse::<u64>().ok())
        .unwrap_or(DEFAULT_TIMEOUT_SECS)
        .max(1)
}

fn default_data_dir() -> Option<PathBuf> {
    if let Some(base) = env_non_empty("XDG_DATA_HOME") {
        return Some(PathBuf::from(base).join(APP_DIR));
    }
    let home = env_non_empty("HOME")?;
    Some(PathBuf::from(home).join(".local").join("share").join(APP_DIR))
}

fn env_non_empty(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_bool(raw: &str) -> bool {
    !matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "0" | "false" | "no" | "off"
    )
}
