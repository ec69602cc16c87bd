//! CLI command handlers.

pub mod apply;
pub mod inject;
pub mod schema;
pub mod tools;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::path::Path;

use crate::models::{EditorState, FeatureCollection, Tool, ToolCatalogue};

/// Read and deserialize a JSON file.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("Failed to parse {}", path.display()))
}

/// A catalogue file holds either `{"tools": [...]}` or a bare tool array.
pub fn read_catalogue(path: &Path) -> Result<ToolCatalogue> {
    let value: Value = read_json(path)?;
    let catalogue = if value.is_array() {
        ToolCatalogue {
            tools: serde_json::from_value::<Vec<Tool>>(value)?,
        }
    } else {
        serde_json::from_value(value)?
    };
    tracing::debug!("Loaded {} tools from {}", catalogue.tools.len(), path.display());
    Ok(catalogue)
}

pub fn read_collection(path: &Path) -> Result<FeatureCollection> {
    read_json(path)
}

pub fn read_state(path: &Path) -> Result<EditorState> {
    read_json(path)
}
