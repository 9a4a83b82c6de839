// src/pipeline/project.rs

//! Row projection: one upstream row to one flat record.

use serde_json::Value;

use crate::models::{FieldSpec, FlatRecord};

/// Project `row` through `fields`.
///
/// Every configured field appears in the output. A field whose column is
/// missing from the row (short or sparse rows) or is not a valid index is
/// set to null.
pub fn project(row: &[Value], fields: &[FieldSpec]) -> FlatRecord {
    fields
        .iter()
        .map(|field| {
            let value = field
                .column
                .and_then(|index| row.get(index))
                .cloned()
                .unwrap_or(Value::Null);
            (field.name.clone(), value)
        })
        .collect()
}
