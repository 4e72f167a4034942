use std::time::Duration;

use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use reqwest::blocking::Client;

use crate::config::http_timeout_secs;

static CLIENT: OnceCell<Client> = OnceCell::new();

/// Shared blocking client; the timeout is read from the environment on first use.
pub fn http_client() -> Result<&'static Client> {
    CLIENT.get_or_try_init(|| {
        Client::builder()
            .timeout(Duration::from_secs(http_timeout_secs()))
            .user_agent(concat!("predictor_league/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed to build http client")
    })
}
