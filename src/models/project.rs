//! Declarative dataset configuration (`project_config.json`).
//!
//! The file is re-read on every operation that needs it, so edits take
//! effect without a restart. Validation is structural only: range selectors
//! and column indices are not checked against the upstream sheet.

use std::fs;
use std::path::Path;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{AppError, Result};

/// Root project configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectConfig {
    /// Display name, optional
    pub project_name: Option<String>,

    /// Opaque upstream spreadsheet identifier
    pub sheet_id: String,

    /// Datasets in the order they appear in the file
    pub datasets: Vec<DatasetSpec>,
}

/// One named dataset: an upstream range plus its column projections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetSpec {
    pub name: String,

    /// Upstream range selector (e.g. `Sheet1!A2:F`)
    pub range: String,

    /// Output fields in configuration order
    pub fields: Vec<FieldSpec>,
}

/// Output field name bound to a zero-based column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: String,

    /// `None` when the configured index is not a non-negative integer;
    /// such a field always projects to null.
    pub column: Option<usize>,
}

/// Non-secret view of the configuration served at `/config`.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PublicConfig {
    pub project_name: String,
    pub datasets: Vec<String>,
}

impl ProjectConfig {
    /// Load and validate configuration from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(AppError::config_missing(path));
        }
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
            .map_err(|e| match e {
                AppError::ConfigInvalid(msg) => {
                    AppError::config_invalid(format!("{}: {}", path.display(), msg))
                }
                other => other,
            })
    }

    /// Parse and validate configuration from JSON text.
    pub fn parse(content: &str) -> Result<Self> {
        let root: Value = serde_json::from_str(content)
            .map_err(|e| AppError::config_invalid(format!("malformed JSON: {e}")))?;
        let root = root
            .as_object()
            .ok_or_else(|| AppError::config_invalid("top level must be a JSON object"))?;

        let project_name = match root.get("project_name") {
            None | Some(Value::Null) => None,
            Some(Value::String(name)) => Some(name.clone()),
            Some(_) => return Err(AppError::config_invalid("'project_name' must be a string")),
        };

        let sheet_id = match root.get("sheet_id") {
            Some(Value::String(id)) => id.clone(),
            Some(_) => return Err(AppError::config_invalid("'sheet_id' must be a string")),
            None => return Err(AppError::config_invalid("config must include 'sheet_id'")),
        };

        let datasets = match root.get("datasets") {
            Some(Value::Object(map)) if !map.is_empty() => map,
            _ => {
                return Err(AppError::config_invalid(
                    "config must include non-empty 'datasets' object",
                ));
            }
        };

        let datasets = datasets
            .iter()
            .map(|(name, spec)| DatasetSpec::parse(name, spec))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            project_name,
            sheet_id,
            datasets,
        })
    }

    /// Dataset names in configuration order.
    pub fn dataset_names(&self) -> Vec<String> {
        self.datasets.iter().map(|d| d.name.clone()).collect()
    }

    /// Project name or an empty string.
    pub fn project_name_or_default(&self) -> &str {
        self.project_name.as_deref().unwrap_or("")
    }

    /// Strip everything but the project name and dataset names.
    pub fn public(&self) -> PublicConfig {
        PublicConfig {
            project_name: self.project_name_or_default().to_string(),
            datasets: self.dataset_names(),
        }
    }
}

impl DatasetSpec {
    fn parse(name: &str, spec: &Value) -> Result<Self> {
        let spec = spec
            .as_object()
            .ok_or_else(|| AppError::config_invalid(format!("Dataset '{name}' must be an object")))?;

        let range = match spec.get("range") {
            Some(Value::String(range)) => range.clone(),
            Some(_) => {
                return Err(AppError::config_invalid(format!(
                    "Dataset '{name}' has non-string 'range'"
                )));
            }
            None => {
                return Err(AppError::config_invalid(format!(
                    "Dataset '{name}' missing 'range'"
                )));
            }
        };

        let fields = match spec.get("fields") {
            Some(Value::Object(map)) if !map.is_empty() => parse_fields(map),
            _ => {
                return Err(AppError::config_invalid(format!(
                    "Dataset '{name}' missing non-empty 'fields' mapping"
                )));
            }
        };

        Ok(Self {
            name: name.to_string(),
            range,
            fields,
        })
    }
}

fn parse_fields(map: &Map<String, Value>) -> Vec<FieldSpec> {
    map.iter()
        .map(|(name, index)| FieldSpec {
            name: name.clone(),
            column: index.as_u64().and_then(|i| usize::try_from(i).ok()),
        })
        .collect()
}
