//! `debrief inject`: resolve the parameters a tool would be invoked with.

use anyhow::{anyhow, bail, Result};
use serde::Serialize;
use serde_json::{Map, Value};
use std::path::Path;

use super::{read_catalogue, read_collection, read_state};
use crate::cli::output::{
    output_json, print_header, print_kv, print_success, print_table, print_warning, yes_no,
    OutputMode,
};
use crate::init::AppContext;
use crate::models::Feature;
use crate::services::{ExecutionModeKind, ParameterSatisfaction, ToolAnalysis};
use crate::state::{StateProvider, DEFAULT_EDITOR};

pub struct InjectArgs<'a> {
    pub catalogue: &'a Path,
    pub tool: &'a str,
    pub features: Option<&'a Path>,
    pub state: Option<&'a Path>,
    pub select: &'a [String],
    pub params: Option<&'a str>,
    pub invocation_mode: ExecutionModeKind,
}

#[derive(Serialize)]
struct InjectReport {
    analysis: ToolAnalysis,
    satisfaction: ParameterSatisfaction,
    invocations: Vec<Map<String, Value>>,
}

pub fn handle_inject(ctx: &AppContext, args: InjectArgs<'_>, mode: OutputMode) -> Result<()> {
    let catalogue = read_catalogue(args.catalogue)?;
    let tool = catalogue
        .find(args.tool)
        .ok_or_else(|| anyhow!("Tool '{}' not found in catalogue", args.tool))?;

    if let Some(path) = args.state {
        ctx.state.insert_editor(DEFAULT_EDITOR, read_state(path)?);
    }
    if let Some(path) = args.features {
        ctx.state.set_feature_collection(read_collection(path)?);
    }

    let selected: Vec<Feature> = if args.select.is_empty() {
        ctx.state.selected_features()
    } else {
        ctx.state
            .feature_collection()
            .map(|fc| fc.select_by_ids(args.select))
            .unwrap_or_default()
    };

    let user_params = match args.params {
        Some(raw) => match serde_json::from_str::<Value>(raw)? {
            Value::Object(map) => map,
            other => bail!("--params must be a JSON object, got {}", other),
        },
        None => Map::new(),
    };

    let service = &ctx.parameter_service;
    let report = InjectReport {
        analysis: service.analyze(tool),
        satisfaction: service.validate_parameter_satisfaction(tool, &selected, &user_params),
        invocations: service.plan_invocations(tool, &selected, args.invocation_mode, &user_params),
    };

    if mode == OutputMode::Json {
        output_json(&report);
        return Ok(());
    }

    print_header(&format!("Parameters for '{}'", tool.name));
    let rows = report
        .analysis
        .parameters
        .iter()
        .map(|p| {
            vec![
                p.name.clone(),
                p.schema_type.clone().unwrap_or_else(|| "-".to_string()),
                yes_no(p.is_required),
                p.injection
                    .map(|k| format!("{:?}", k))
                    .unwrap_or_else(|| "-".to_string()),
                yes_no(p.requires_user_input),
            ]
        })
        .collect();
    print_table(
        &["Parameter", "Type", "Required", "Injected from", "User input"],
        rows,
    );
    print_kv("Selected features", &selected.len().to_string());
    print_kv("Auto-injectable", &report.analysis.auto_injectable_count.to_string());

    if report.satisfaction.can_execute {
        print_success(&format!(
            "Ready to run ({} invocation(s))",
            report.invocations.len()
        ));
    } else {
        print_warning(&format!(
            "Missing required parameters: {}",
            report.satisfaction.missing_params.join(", ")
        ));
    }

    for (index, params) in report.invocations.iter().enumerate() {
        print_header(&format!("Invocation {}", index + 1));
        println!("{}", serde_json::to_string_pretty(params)?);
    }

    Ok(())
}
