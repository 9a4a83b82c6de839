//! Runtime settings resolved from the environment.

use std::path::{Path, PathBuf};

use chrono_tz::Tz;

use crate::error::{AppError, Result};

/// Process-wide runtime settings.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Project configuration file (re-read on every use)
    pub config_path: PathBuf,

    /// Directory holding `YYYY-MM-DD.json` snapshots and `manifest.json`
    pub history_dir: PathBuf,

    /// Tile proxy cache directory
    pub cache_dir: PathBuf,

    /// Live snapshot file
    pub live_path: PathBuf,

    /// Upstream credential file
    pub credentials_path: Option<PathBuf>,

    /// Secret token forwarded by the tile proxy
    pub tile_token: Option<String>,

    /// Zone the daily schedule is evaluated in
    pub timezone: Tz,

    /// HTTP listen address
    pub bind_addr: String,

    /// Upstream HTTP behavior
    pub upstream: UpstreamSettings,
}

/// Upstream HTTP client settings.
#[derive(Debug, Clone)]
pub struct UpstreamSettings {
    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Datasets fetched concurrently during one extraction
    pub max_concurrent: usize,
}

impl Default for UpstreamSettings {
    fn default() -> Self {
        Self {
            timeout_secs: defaults::timeout(),
            max_concurrent: defaults::max_concurrent(),
        }
    }
}

impl Settings {
    /// Resolve settings from process environment variables.
    pub fn from_env(base_dir: impl AsRef<Path>) -> Result<Self> {
        Self::from_lookup(base_dir, |key| std::env::var(key).ok())
    }

    /// Resolve settings through an arbitrary variable lookup.
    ///
    /// Relative paths are resolved against `base_dir`. Empty values count
    /// as unset.
    pub fn from_lookup<F>(base_dir: impl AsRef<Path>, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_dir = base_dir.as_ref();
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let path = |key: &str, default: &str| base_dir.join(var(key).unwrap_or_else(|| default.into()));

        let timezone = match var("SCHEDULER_TIMEZONE") {
            Some(tz) => parse_timezone(&tz)?,
            None => Tz::UTC,
        };

        let upstream = UpstreamSettings {
            timeout_secs: parse_number(var("UPSTREAM_TIMEOUT_SECS"), "UPSTREAM_TIMEOUT_SECS")?
                .unwrap_or_else(defaults::timeout),
            max_concurrent: parse_number(var("UPSTREAM_MAX_CONCURRENT"), "UPSTREAM_MAX_CONCURRENT")?
                .unwrap_or_else(defaults::max_concurrent),
        };

        let settings = Self {
            config_path: path("PROJECT_CONFIG_PATH", defaults::CONFIG_FILE),
            history_dir: path("HISTORY_DIR", defaults::HISTORY_DIR),
            cache_dir: path("CACHE_DIR", defaults::CACHE_DIR),
            live_path: path("SAMPLE_JSON", defaults::LIVE_FILE),
            credentials_path: var("GOOGLE_APPLICATION_CREDENTIALS").map(|p| base_dir.join(p)),
            tile_token: var("MAPBOX_ACCESS_TOKEN"),
            timezone,
            bind_addr: var("BIND_ADDR").unwrap_or_else(|| defaults::BIND_ADDR.into()),
            upstream,
        };
        settings.validate()?;
        Ok(settings)
    }

    /// Validate settings values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.upstream.timeout_secs == 0 {
            return Err(AppError::settings("UPSTREAM_TIMEOUT_SECS must be > 0"));
        }
        if self.upstream.max_concurrent == 0 {
            return Err(AppError::settings("UPSTREAM_MAX_CONCURRENT must be > 0"));
        }
        if self.bind_addr.trim().is_empty() {
            return Err(AppError::settings("BIND_ADDR is empty"));
        }
        Ok(())
    }
}

/// Parse an IANA zone name such as `UTC` or `Africa/Khartoum`.
pub fn parse_timezone(value: &str) -> Result<Tz> {
    let value = value.trim();
    value.parse::<Tz>().map_err(|e| {
        AppError::settings(format!("SCHEDULER_TIMEZONE '{value}' is not a known timezone: {e}"))
    })
}

fn parse_number<T: std::str::FromStr>(value: Option<String>, key: &str) -> Result<Option<T>> {
    value
        .map(|v| {
            v.trim()
                .parse()
                .map_err(|_| AppError::settings(format!("{key} must be a number, got '{v}'")))
        })
        .transpose()
}

mod defaults {
    pub const CONFIG_FILE: &str = "project_config.json";
    pub const HISTORY_DIR: &str = "history";
    pub const CACHE_DIR: &str = "cache-directory";
    pub const LIVE_FILE: &str = "sample.json";
    pub const BIND_ADDR: &str = "0.0.0.0:5000";

    pub fn timeout() -> u64 {
        30
    }
    pub fn max_concurrent() -> usize {
        4
    }
}
