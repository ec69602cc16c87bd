//! `debrief schema`: JSON Schema for the engine's data shapes.

use anyhow::Result;

use crate::cli::SchemaTarget;
use crate::models::{DebriefCommand, EditorState, Feature, Tool, ToolCatalogue};

pub fn handle_schema(target: SchemaTarget) -> Result<()> {
    let schema = match target {
        SchemaTarget::Command => schemars::schema_for!(DebriefCommand),
        SchemaTarget::Tool => schemars::schema_for!(Tool),
        SchemaTarget::Catalogue => schemars::schema_for!(ToolCatalogue),
        SchemaTarget::Feature => schemars::schema_for!(Feature),
        SchemaTarget::State => schemars::schema_for!(EditorState),
    };
    println!("{}", serde_json::to_string_pretty(&schema)?);
    Ok(())
}
