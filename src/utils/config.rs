// Centralized configuration for DisTok Bot

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

/// Maximum number of watched accounts per guild
pub const MAX_ENTRIES_PER_GUILD: usize = 10;

pub const DEFAULT_RAPIDAPI_HOST: &str = "tiktok-scraper-api2.p.rapidapi.com";
pub const DEFAULT_DATA_FILE: &str = "data.json";
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 5 * 60;
pub const DEFAULT_LOOKUP_TIMEOUT_SECS: u64 = 30;

/// Discord embed colors
pub mod colors {
    pub const PRIMARY: u32 = 0x00bfff;
    pub const SUCCESS: u32 = 0x2ecc71;
    pub const ERROR: u32 = 0xff0000;
}

/// Runtime settings read from the environment
#[derive(Debug, Clone)]
pub struct Settings {
    pub discord_token: String,
    pub rapidapi_key: String,
    pub rapidapi_host: String,
    pub data_file: PathBuf,
    pub poll_interval: Duration,
    pub lookup_timeout: Duration,
}

impl Settings {
    /// Load settings from process environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load settings through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let discord_token = lookup("DISCORD_TOKEN").context("DISCORD_TOKEN must be set")?;
        let rapidapi_key = lookup("RAPIDAPI_KEY").context("RAPIDAPI_KEY must be set")?;
        let rapidapi_host =
            lookup("RAPIDAPI_HOST").unwrap_or_else(|| DEFAULT_RAPIDAPI_HOST.to_string());
        let data_file = lookup("DISTOK_DATA_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_FILE));

        let poll_interval = parse_secs(
            lookup("DISTOK_POLL_INTERVAL_SECS"),
            "DISTOK_POLL_INTERVAL_SECS",
            DEFAULT_POLL_INTERVAL_SECS,
        )?;
        let lookup_timeout = parse_secs(
            lookup("DISTOK_LOOKUP_TIMEOUT_SECS"),
            "DISTOK_LOOKUP_TIMEOUT_SECS",
            DEFAULT_LOOKUP_TIMEOUT_SECS,
        )?;

        Ok(Self {
            discord_token,
            rapidapi_key,
            rapidapi_host,
            data_file,
            poll_interval,
            lookup_timeout,
        })
    }
}

fn parse_secs(raw: Option<String>, key: &str, default: u64) -> Result<Duration> {
    let secs = match raw {
        Some(value) => value
            .trim()
            .parse::<u64>()
            .with_context(|| format!("{} must be a whole number of seconds, got {:?}", key, value))?,
        None => default,
    };

    if secs == 0 {
        anyhow::bail!("{} must be greater than zero", key);
    }

    Ok(Duration::from_secs(secs))
}
