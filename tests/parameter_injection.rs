//! Parameter analysis, injection and satisfaction against a live state store.

mod common;

use std::sync::Arc;

use common::{point, track, ToolBuilder};
use debrief::models::{
    EditorState, FeatureCollection, SelectionState, TimeState, ViewportState,
};
use debrief::services::{ExecutionModeKind, InjectionKind, ToolParameterService};
use debrief::state::EditorStateStore;
use pretty_assertions::assert_eq;
use serde_json::{json, Map, Value};

fn service_with(state: EditorState) -> ToolParameterService {
    ToolParameterService::new(Arc::new(EditorStateStore::with_state(state)))
}

fn full_state() -> EditorState {
    let mut fc = FeatureCollection::new(vec![track("t1"), point("p1"), track("t2")]);
    fc.extra.insert("name".into(), json!("exercise-7"));
    EditorState {
        time_state: Some(TimeState::new(
            "2024-03-01T12:00:00Z",
            "2024-03-01T00:00:00Z",
            "2024-03-02T00:00:00Z",
        )),
        viewport_state: Some(ViewportState {
            bounds: [-5.0, 49.0, -3.0, 51.0],
        }),
        selection_state: Some(SelectionState {
            selected_ids: vec!["p1".into()],
        }),
        feature_collection: Some(fc),
    }
}

#[test]
fn test_analysis_counts() {
    let tool = ToolBuilder::new("plot")
        .required_param("viewport", json!({"$ref": "#/$defs/ViewportState"}))
        .required_param(
            "features",
            json!({"type": "array", "items": {"$ref": "#/$defs/DebriefPointFeature"}}),
        )
        .param("title", json!({"type": "string"}))
        .param("scale", json!({"type": "number", "default": 1.0}))
        .param("style", json!({"type": "object"}))
        .build();

    let service = service_with(EditorState::default());
    let analysis = service.analyze(&tool);

    assert_eq!(analysis.auto_injectable_count, 2);
    assert_eq!(analysis.user_input_count, 2);
    assert_eq!(
        analysis.parameter("features").unwrap().injection,
        Some(InjectionKind::SelectedFeatures)
    );
    assert!(!analysis.parameter("scale").unwrap().requires_user_input);

    let prompts: Vec<String> = service
        .user_input_parameters(&tool)
        .into_iter()
        .map(|p| p.name)
        .collect();
    assert_eq!(prompts, vec!["style".to_string(), "title".to_string()]);
}

#[test]
fn test_injects_every_state_slice() {
    let tool = ToolBuilder::new("everything")
        .param("viewport", json!({"$ref": "#/$defs/ViewportState"}))
        .param("time", json!({"$ref": "#/$defs/TimeState"}))
        .param("selection", json!({"$ref": "#/$defs/SelectionState"}))
        .param("editor", json!({"$ref": "#/$defs/EditorState"}))
        .build();
    let state = full_state();
    let service = service_with(state.clone());

    let params = service.inject_parameters(&tool, &[], Map::new());

    assert_eq!(params["viewport"], json!({"bounds": [-5.0, 49.0, -3.0, 51.0]}));
    assert_eq!(params["time"]["current"], json!("2024-03-01T12:00:00Z"));
    assert_eq!(params["selection"], json!({"selectedIds": ["p1"]}));
    assert_eq!(params["editor"], serde_json::to_value(&state).unwrap());
}

#[test]
fn test_missing_state_injects_null() {
    let tool = ToolBuilder::new("fit")
        .required_param("viewport", json!({"$ref": "#/$defs/ViewportState"}))
        .build();
    let service = service_with(EditorState::default());

    let params = service.inject_parameters(&tool, &[], Map::new());
    assert_eq!(params["viewport"], Value::Null);

    let satisfaction = service.validate_parameter_satisfaction(&tool, &[], &Map::new());
    assert!(!satisfaction.can_execute);
    assert_eq!(satisfaction.missing_params, vec!["viewport".to_string()]);
}

#[test]
fn test_caller_values_are_never_overwritten() {
    let tool = ToolBuilder::new("fit")
        .required_param("viewport", json!({"$ref": "#/$defs/ViewportState"}))
        .build();
    let service = service_with(full_state());

    let mut user = Map::new();
    user.insert("viewport".into(), json!("mine"));
    user.insert("extra".into(), json!(42));

    let params = service.inject_parameters(&tool, &[], user);
    assert_eq!(params["viewport"], json!("mine"));
    assert_eq!(params["extra"], json!(42));
}

#[test]
fn test_feature_collection_narrowed_to_selection_keeps_metadata() {
    let tool = ToolBuilder::new("summarise")
        .required_param("fc", json!({"$ref": "#/$defs/DebriefFeatureCollection"}))
        .build();
    let service = service_with(full_state());

    let narrowed = service.inject_parameters(&tool, &[track("t2")], Map::new());
    let fc: FeatureCollection = serde_json::from_value(narrowed["fc"].clone()).unwrap();
    assert_eq!(fc.len(), 1);
    assert_eq!(fc.extra.get("name"), Some(&json!("exercise-7")));

    let everything = service.inject_parameters(&tool, &[], Map::new());
    let fc: FeatureCollection = serde_json::from_value(everything["fc"].clone()).unwrap();
    assert_eq!(fc.len(), 3);
}

#[test]
fn test_track_falls_back_to_collection() {
    let tool = ToolBuilder::new("speed")
        .required_param("track", json!({"$ref": "#/$defs/DebriefTrackFeature"}))
        .build();
    let service = service_with(full_state());

    let from_selection = service.inject_parameters(&tool, &[point("p1"), track("t2")], Map::new());
    assert_eq!(from_selection["track"]["id"], json!("t2"));

    let fallback = service.inject_parameters(&tool, &[point("p1")], Map::new());
    assert_eq!(fallback["track"]["id"], json!("t1"));
}

#[test]
fn test_selected_features_fall_back_to_provider_selection() {
    let tool = ToolBuilder::new("label")
        .required_param(
            "points",
            json!({"type": "array", "items": {"$ref": "#/$defs/DebriefPointFeature"}}),
        )
        .build();
    let service = service_with(full_state());

    let params = service.inject_parameters(&tool, &[], Map::new());
    assert_eq!(params["points"].as_array().map(Vec::len), Some(1));
    assert_eq!(params["points"][0]["id"], json!("p1"));
}

#[test]
fn test_satisfaction_counts_defaults_and_user_values() {
    let tool = ToolBuilder::new("speed")
        .required_param("track", json!({"$ref": "#/$defs/DebriefTrackFeature"}))
        .required_param("threshold", json!({"type": "number", "default": 5}))
        .required_param("label", json!({"type": "string"}))
        .build();
    let service = service_with(full_state());

    let before = service.validate_parameter_satisfaction(&tool, &[], &Map::new());
    assert_eq!(before.missing_params, vec!["label".to_string()]);

    let mut user = Map::new();
    user.insert("label".into(), json!("fast legs"));
    let after = service.validate_parameter_satisfaction(&tool, &[], &user);
    assert!(after.can_execute);
}

#[test]
fn test_plan_multiple_fans_out_per_track() {
    let tool = ToolBuilder::new("per_track")
        .required_param("track", json!({"type": "object", "description": "track to analyse"}))
        .param("others", json!({"type": "array", "items": {"$ref": "#/$defs/DebriefFeature"}}))
        .build();
    let service = service_with(full_state());
    let selected = [track("t1"), track("t2"), point("p1")];

    let runs = service.plan_invocations(&tool, &selected, ExecutionModeKind::Multiple, &Map::new());
    assert_eq!(runs.len(), 2);
    for run in &runs {
        // each run sees the point plus exactly one track
        assert_eq!(run["others"].as_array().map(Vec::len), Some(2));
    }

    let single = service.plan_invocations(&tool, &selected, ExecutionModeKind::Single, &Map::new());
    assert_eq!(single.len(), 1);
    assert_eq!(single[0]["others"].as_array().map(Vec::len), Some(3));
}
