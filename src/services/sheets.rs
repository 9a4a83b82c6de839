// src/services/sheets.rs

//! Upstream spreadsheet source.
//!
//! [`SheetSource`] is the port the extractor depends on; [`SheetsClient`]
//! implements it against the Google Sheets v4 `values` endpoint.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{Row, UpstreamSettings};
use crate::utils::http::create_async_client;

/// Default Sheets API root.
pub const SHEETS_API_BASE: &str = "https://sheets.googleapis.com/v4/";

/// Source of raw rows for a range.
#[async_trait]
pub trait SheetSource: Send + Sync {
    /// Fetch all rows for `range`. An empty range yields no rows.
    async fn fetch_rows(&self, sheet_id: &str, range: &str) -> Result<Vec<Row>>;
}

/// Credential used to authorize upstream requests.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// OAuth bearer token
    AccessToken(String),
    /// API key for publicly readable sheets
    ApiKey(String),
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AccessToken(_) => f.write_str("AccessToken(<redacted>)"),
            Self::ApiKey(_) => f.write_str("ApiKey(<redacted>)"),
        }
    }
}

#[derive(Deserialize)]
struct CredentialFile {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    api_key: Option<String>,
    #[serde(default, rename = "type")]
    kind: Option<String>,
}

impl Credentials {
    /// Load credentials from the credential file.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path
            .ok_or_else(|| AppError::credential("GOOGLE_APPLICATION_CREDENTIALS env var is not set"))?;
        if !path.exists() {
            return Err(AppError::credential(format!(
                "GOOGLE_APPLICATION_CREDENTIALS file not found: {}",
                path.display()
            )));
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            AppError::credential(format!("credential file {} is unreadable: {e}", path.display()))
        })?;
        let file: CredentialFile = serde_json::from_str(&content).map_err(|e| {
            AppError::credential(format!("credential file {} is not valid JSON: {e}", path.display()))
        })?;

        let non_empty = |v: Option<String>| v.filter(|s| !s.trim().is_empty());
        if let Some(token) = non_empty(file.access_token) {
            return Ok(Self::AccessToken(token));
        }
        if let Some(key) = non_empty(file.api_key) {
            return Ok(Self::ApiKey(key));
        }

        match file.kind.as_deref() {
            Some("service_account") => Err(AppError::credential(
                "service account keys must be exchanged for an access_token before use",
            )),
            _ => Err(AppError::credential(
                "credential file must contain 'access_token' or 'api_key'",
            )),
        }
    }
}

/// Response body of `spreadsheets.values.get`.
#[derive(Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Row>,
}

/// Google Sheets HTTP client.
pub struct SheetsClient {
    client: Client,
    base_url: Url,
    credentials_path: Option<PathBuf>,
}

impl SheetsClient {
    /// Create a client. Credentials are read on every fetch.
    pub fn new(config: &UpstreamSettings, credentials_path: Option<PathBuf>) -> Result<Self> {
        Ok(Self {
            client: create_async_client(config)?,
            base_url: Url::parse(SHEETS_API_BASE)?,
            credentials_path,
        })
    }

    /// Point the client at a different API root.
    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = base_url;
        self
    }

    fn values_url(&self, sheet_id: &str, range: &str) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| AppError::upstream(format!("invalid API base URL {}", self.base_url)))?
            .pop_if_empty()
            .extend(["spreadsheets", sheet_id, "values", range]);
        Ok(url)
    }
}

#[async_trait]
impl SheetSource for SheetsClient {
    async fn fetch_rows(&self, sheet_id: &str, range: &str) -> Result<Vec<Row>> {
        let credentials = Credentials::load(self.credentials_path.as_deref())?;
        let url = self.values_url(sheet_id, range)?;

        let request = match &credentials {
            Credentials::AccessToken(token) => self.client.get(url).bearer_auth(token),
            Credentials::ApiKey(key) => self.client.get(url).query(&[("key", key)]),
        };

        let response = request
            .send()
            .await
            .map_err(|e| AppError::upstream(format!("request for range '{range}' failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let snippet: String = body.chars().take(300).collect();
            return Err(AppError::upstream(format!(
                "Sheets API returned {status} for range '{range}': {snippet}"
            )));
        }

        let value_range: ValueRange = response
            .json()
            .await
            .map_err(|e| AppError::upstream(format!("unreadable response for range '{range}': {e}")))?;

        log::debug!("Fetched {} rows for range '{}'", value_range.values.len(), range);
        Ok(value_range.values)
    }
}
