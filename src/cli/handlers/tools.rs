//! `debrief tools`: applicable tools for a feature selection.

use anyhow::Result;
use std::path::Path;

use super::{read_catalogue, read_collection};
use crate::cli::output::{
    output_json, print_header, print_hint, print_table, print_warning, yes_no, OutputMode,
};
use crate::init::AppContext;
use crate::models::Feature;

pub fn handle_tools(
    ctx: &AppContext,
    catalogue_path: &Path,
    features_path: &Path,
    select: &[String],
    details: bool,
    mode: OutputMode,
) -> Result<()> {
    let catalogue = read_catalogue(catalogue_path)?;
    let collection = read_collection(features_path)?;
    let selected: Vec<Feature> = if select.is_empty() {
        collection.to_features()
    } else {
        collection.select_by_ids(select)
    };

    let result = ctx
        .filter_service
        .get_applicable_tools(&selected, &catalogue);

    if mode == OutputMode::Json {
        output_json(result.as_ref());
        return Ok(());
    }

    print_header(&format!(
        "Applicable tools ({} of {}, {} feature(s) selected)",
        result.tools.len(),
        catalogue.tools.len(),
        selected.len()
    ));

    let rows = result
        .tools
        .iter()
        .map(|tool| {
            let execution = result
                .validation(&tool.name)
                .and_then(|v| v.execution_mode.as_ref())
                .map(|m| m.description.clone())
                .unwrap_or_else(|| "-".to_string());
            vec![
                tool.name.clone(),
                tool.description.clone(),
                execution,
            ]
        })
        .collect();
    print_table(&["Tool", "Description", "Execution"], rows);

    for error in &result.errors {
        print_warning(&format!("{}: {}", error.tool_name, error.message));
    }
    for warning in &result.warnings {
        print_hint(warning);
    }

    if details {
        print_header("Validation details");
        let mut rows = Vec::new();
        for validation in &result.validations {
            for (name, param) in validation.parameter_validation.iter().flatten() {
                rows.push(vec![
                    validation.tool_name.clone(),
                    name.clone(),
                    param.kind.label().to_string(),
                    yes_no(param.is_required),
                    yes_no(param.can_satisfy),
                    param.matching_feature_count.to_string(),
                    param.note.clone().unwrap_or_default(),
                ]);
            }
        }
        print_table(
            &["Tool", "Parameter", "Kind", "Required", "Satisfied", "Matches", "Note"],
            rows,
        );
    }

    Ok(())
}
