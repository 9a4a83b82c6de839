// src/services/tiles.rs

//! Tile-style proxy.
//!
//! Forwards `styles/v1/{path}` requests to the upstream map API with the
//! server-held token appended, so the token never reaches clients. Successful
//! responses are cached on disk for an hour, keyed by path and query string.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use url::Url;

use crate::error::{AppError, Result};
use crate::models::UpstreamSettings;
use crate::utils::Clock;
use crate::utils::fs::{read_json_optional, read_optional, write_atomic, write_json_atomic};
use crate::utils::http::create_async_client;

/// Default upstream API root.
pub const TILE_API_BASE: &str = "https://api.mapbox.com/styles/v1/";

/// How long a cached response stays fresh.
pub const CACHE_TTL_SECS: i64 = 3600;

/// Upstream response headers passed through to clients.
pub const FORWARDED_HEADERS: [&str; 5] = [
    "content-type",
    "cache-control",
    "etag",
    "last-modified",
    "expires",
];

/// Proxied upstream response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileResponse {
    pub status: u16,
    /// Forwarded headers, lowercase names
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl TileResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Cache entry header, stored next to the body.
#[derive(Debug, Serialize, Deserialize)]
struct CacheMeta {
    status: u16,
    #[serde(default)]
    headers: Vec<(String, String)>,
    stored_at: DateTime<Utc>,
}

/// On-disk response cache.
pub struct TileCache {
    dir: PathBuf,
    ttl: TimeDelta,
    clock: Arc<dyn Clock>,
}

impl TileCache {
    pub fn new(dir: impl Into<PathBuf>, clock: Arc<dyn Clock>) -> Self {
        Self {
            dir: dir.into(),
            ttl: TimeDelta::seconds(CACHE_TTL_SECS),
            clock,
        }
    }

    /// Cache key for a request: SHA-256 of `path?query`.
    pub fn key(path: &str, query: Option<&str>) -> String {
        let mut hasher = Sha256::new();
        hasher.update(path.as_bytes());
        hasher.update(b"?");
        hasher.update(query.unwrap_or("").as_bytes());
        hex::encode(hasher.finalize())
    }

    fn meta_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    fn body_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.bin"))
    }

    /// Fresh cached response for `key`, if any.
    pub async fn get(&self, key: &str) -> Result<Option<TileResponse>> {
        let Some(meta) = read_json_optional::<CacheMeta>(&self.meta_path(key)).await? else {
            return Ok(None);
        };
        if self.clock.now() - meta.stored_at >= self.ttl {
            return Ok(None);
        }
        let Some(body) = read_optional(&self.body_path(key)).await? else {
            return Ok(None);
        };
        Ok(Some(TileResponse {
            status: meta.status,
            headers: meta.headers,
            body,
        }))
    }

    /// Store a response; the header is written last so a reader never sees
    /// a header without its body.
    pub async fn put(&self, key: &str, response: &TileResponse) -> Result<()> {
        write_atomic(&self.body_path(key), &response.body).await?;
        let meta = CacheMeta {
            status: response.status,
            headers: response.headers.clone(),
            stored_at: self.clock.now(),
        };
        write_json_atomic(&self.meta_path(key), &meta).await
    }
}

/// Token-hiding reverse proxy for map styles.
pub struct TileProxy {
    client: Client,
    base_url: Url,
    token: Option<String>,
    cache: TileCache,
}

impl TileProxy {
    pub fn new(config: &UpstreamSettings, token: Option<String>, cache: TileCache) -> Result<Self> {
        Ok(Self {
            client: create_async_client(config)?,
            base_url: Url::parse(TILE_API_BASE)?,
            token,
            cache,
        })
    }

    /// Point the proxy at a different API root.
    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = base_url;
        self
    }

    /// Upstream URL for `path` with the client's query and the secret token.
    ///
    /// Every path segment is appended encoded under the base path, so the
    /// result always keeps the base scheme, host and path prefix.
    fn upstream_url(&self, path: &str, query: Option<&str>, token: &str) -> Result<Url> {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        if segments.is_empty() || segments.iter().any(|s| matches!(*s, "." | "..")) {
            return Err(AppError::not_found(format!("style path {path}")));
        }

        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| AppError::Proxy(format!("invalid tile API base URL {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);

        let prefix = self.base_url.path().trim_end_matches('/');
        let escaped = url.scheme() != self.base_url.scheme()
            || url.host_str() != self.base_url.host_str()
            || url.port_or_known_default() != self.base_url.port_or_known_default()
            || !url.path().starts_with(&format!("{prefix}/"));
        if escaped {
            return Err(AppError::not_found(format!("style path {path}")));
        }

        {
            let mut pairs = url.query_pairs_mut();
            pairs.clear();
            if let Some(query) = query {
                for (name, value) in url::form_urlencoded::parse(query.as_bytes()) {
                    if name != "access_token" {
                        pairs.append_pair(&name, &value);
                    }
                }
            }
            pairs.append_pair("access_token", token);
        }
        Ok(url)
    }

    /// Fetch `path`, serving from cache when fresh.
    ///
    /// Non-success upstream statuses come back as `Ok` with that status and
    /// are not cached.
    pub async fn fetch(&self, path: &str, query: Option<&str>) -> Result<TileResponse> {
        let token = self
            .token
            .as_deref()
            .ok_or_else(|| AppError::Proxy("MAPBOX_ACCESS_TOKEN not set".into()))?;

        let key = TileCache::key(path, query);
        match self.cache.get(&key).await {
            Ok(Some(hit)) => {
                log::debug!("Tile cache hit for {}", path);
                return Ok(hit);
            }
            Ok(None) => log::debug!("Tile cache miss for {}", path),
            Err(e) => log::warn!("Tile cache read failed for {}: {}", path, e),
        }

        let url = self.upstream_url(path, query, token)?;
        let response = self.client.get(url).send().await?;
        let status = response.status().as_u16();
        let headers = FORWARDED_HEADERS
            .iter()
            .filter_map(|name| {
                let value = response.headers().get(*name)?.to_str().ok()?;
                Some((name.to_string(), value.to_string()))
            })
            .collect();
        let body = response.bytes().await?.to_vec();

        let tile = TileResponse {
            status,
            headers,
            body,
        };

        if tile.is_success() {
            if let Err(e) = self.cache.put(&key, &tile).await {
                log::warn!("Tile cache write failed for {}: {}", path, e);
            }
        } else {
            log::warn!("Tile upstream returned {} for {}", status, path);
        }
        Ok(tile)
    }
}
