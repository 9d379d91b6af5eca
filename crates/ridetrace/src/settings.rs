use std::env;
use std::time::Duration;

use anyhow::{Context, Result};

pub const DEFAULT_BASE_URL: &str =
    "http://goldencheetah-opendata.s3-website-us-east-1.amazonaws.com/data/";
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 600;

pub const BASE_URL_VAR: &str = "RIDETRACE_BASE_URL";
pub const HTTP_TIMEOUT_VAR: &str = "RIDETRACE_HTTP_TIMEOUT_SECS";
pub const WORKERS_VAR: &str = "RIDETRACE_WORKERS";

/// Run configuration resolved from the environment (and `.env`), then
/// overridden by command-line flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub base_url: String,
    pub http_timeout: Duration,
    pub workers: usize,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let base_url = lookup(BASE_URL_VAR)
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let http_timeout = match lookup(HTTP_TIMEOUT_VAR) {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .with_context(|| format!("{HTTP_TIMEOUT_VAR} must be a whole number of seconds"))?,
            None => DEFAULT_HTTP_TIMEOUT_SECS,
        };

        let workers = match lookup(WORKERS_VAR) {
            Some(raw) => raw
                .trim()
                .parse::<usize>()
                .with_context(|| format!("{WORKERS_VAR} must be a positive integer"))?,
            None => default_workers(),
        };

        Ok(Self {
            base_url,
            http_timeout: Duration::from_secs(http_timeout),
            workers: workers.max(1),
        })
    }

    pub fn with_base_url(mut self, base_url: Option<String>) -> Self {
        if let Some(base_url) = base_url {
            self.base_url = base_url;
        }
        self
    }

    pub fn with_workers(mut self, workers: Option<usize>) -> Self {
        if let Some(workers) = workers {
            self.workers = workers.max(1);
        }
        self
    }
}

fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}
