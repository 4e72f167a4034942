use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result, anyhow};
use chrono::Utc;
use log::debug;
use reqwest::StatusCode;
use reqwest::blocking::Client;
use reqwest::header::{ETAG, HeaderName, IF_MODIFIED_SINCE, IF_NONE_MATCH, LAST_MODIFIED};
use serde::{Deserialize, Serialize};

use crate::history::{read_json_or_default, write_json_atomic};

const CACHE_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct HttpCacheFile {
    version: u32,
    entries: HashMap<String, CacheEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheEntry {
    body: String,
    etag: Option<String>,
    last_modified: Option<String>,
    fetched_at: i64,
}

/// Conditional-request cache: replays the stored body when the server answers 304.
#[derive(Debug)]
pub struct HttpCache {
    path: Option<PathBuf>,
    file: Mutex<HttpCacheFile>,
}

impl HttpCache {
    pub fn open(path: Option<PathBuf>) -> Self {
        let mut file = path
            .as_deref()
            .and_then(|p| read_json_or_default::<HttpCacheFile>(p).ok())
            .unwrap_or_default();
        if file.version != CACHE_VERSION {
            file = HttpCacheFile {
                version: CACHE_VERSION,
                entries: HashMap::new(),
            };
        }
        Self {
            path,
            file: Mutex::new(file),
        }
    }

    pub fn fetch_json_cached(
        &self,
        client: &Client,
        url: &str,
        extra_headers: &[(&str, &str)],
    ) -> Result<String> {
        let cached_entry = self.lock()?.entries.get(url).cloned();

        let mut req = client.get(url);
        for (name, value) in extra_headers {
            req = req.header(*name, *value);
        }
        if let Some(entry) = cached_entry.as_ref() {
            if let Some(etag) = entry.etag.as_ref() {
                req = req.header(IF_NONE_MATCH, etag);
            }
            if let Some(last_modified) = entry.last_modified.as_ref() {
                req = req.header(IF_MODIFIED_SINCE, last_modified);
            }
        }

        let resp = req.send().context("request failed")?;
        let status = resp.status();
        let headers = resp.headers().clone();
        if status == StatusCode::NOT_MODIFIED {
            let Some(entry) = cached_entry else {
                return Err(anyhow!("received 304 without cache body"));
            };
            debug!("{url} not modified; using cached body");
            return Ok(entry.body);
        }

        let body = resp.text().context("failed reading body")?;
        if !status.is_success() {
            return Err(anyhow!("http {}: {}", status, body));
        }

        let header_string = |name: HeaderName| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(|v| v.to_string())
        };
        let entry = CacheEntry {
            body: body.clone(),
            etag: header_string(ETAG),
            last_modified: header_string(LAST_MODIFIED),
            fetched_at: Utc::now().timestamp(),
        };
        self.store(url, entry)?;
        Ok(body)
    }

    fn store(&self, url: &str, entry: CacheEntry) -> Result<()> {
        let mut file = self.lock()?;
        file.entries.insert(url.to_string(), entry);
        match &self.path {
            Some(path) => write_json_atomic(path, &*file).context("save http cache"),
            None => Ok(()),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HttpCacheFile>> {
        self.file
            .lock()
            .map_err(|_| anyhow!("http cache lock poisoned"))
    }
}
