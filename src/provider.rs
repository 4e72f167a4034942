use anyhow::{Context, Result, anyhow};
use log::debug;

use crate::config::Config;
use crate::http_cache::HttpCache;
use crate::http_client::http_client;
use crate::standings::{LiveTable, parse_standings_json};

/// Source of the current league table. Either a complete table or an error; retrying is the
/// caller's business.
pub trait StandingsProvider {
    fn fetch_table(&self) -> Result<LiveTable>;
}

impl StandingsProvider for LiveTable {
    fn fetch_table(&self) -> Result<LiveTable> {
        Ok(self.clone())
    }
}

/// football-data.org v4 standings endpoint.
#[derive(Debug)]
pub struct FootballDataProvider {
    api_base: String,
    competition: String,
    token: String,
    cache: HttpCache,
}

impl FootballDataProvider {
    pub fn new(api_base: &str, competition: &str, token: &str, cache: HttpCache) -> Self {
        Self {
            api_base: api_base.trim_end_matches('/').to_string(),
            competition: competition.to_string(),
            token: token.to_string(),
            cache,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let token = config
            .api_token
            .as_deref()
            .ok_or_else(|| anyhow!("FOOTBALL_DATA_API_TOKEN is not set"))?;
        Ok(Self::new(
            &config.api_base,
            &config.competition,
            token,
            HttpCache::open(Some(config.http_cache_path())),
        ))
    }

    pub fn standings_url(&self) -> String {
        format!(
            "{}/competitions/{}/standings",
            self.api_base, self.competition
        )
    }
}

impl StandingsProvider for FootballDataProvider {
    fn fetch_table(&self) -> Result<LiveTable> {
        let client = http_client()?;
        let url = self.standings_url();
        debug!("fetching standings from {url}");
        let body = self
            .cache
            .fetch_json_cached(client, &url, &[("X-Auth-Token", self.token.as_str())])
            .context("standings request failed")?;
        parse_standings_json(&body)
    }
}
