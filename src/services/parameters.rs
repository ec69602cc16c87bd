//! Tool parameter analysis and state injection.
//!
//! Analysis inspects only the schema shape: which parameters can be filled
//! from ambient state or the selection, and which need a human. Injection
//! then resolves concrete values through a [`StateProvider`].

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::debug;

use crate::models::{Feature, FeatureCollection, ParameterSchema, Tool};
use crate::services::classify::{
    classify_parameter, ParamKind, ANNOTATION_FEATURE_REF, EDITOR_STATE_REF,
    FEATURE_COLLECTION_REF, FEATURE_REF, FEATURE_VARIANT_REFS, POINT_FEATURE_REF,
    SELECTION_STATE_REF, TIME_STATE_REF, TRACK_FEATURE_REF, VIEWPORT_STATE_REF,
};
use crate::services::filter::ExecutionModeKind;
use crate::state::StateProvider;

/// Where an auto-injectable parameter gets its value from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InjectionKind {
    Viewport,
    Time,
    Editor,
    Selection,
    /// The feature collection, narrowed to the selection when there is one.
    FeatureCollection,
    /// First selected track, else first track in the full collection.
    TrackFeature,
    /// The selected features as an array.
    SelectedFeatures,
}

impl InjectionKind {
    fn from_reference(reference: &str) -> Option<Self> {
        match reference {
            VIEWPORT_STATE_REF => Some(InjectionKind::Viewport),
            TIME_STATE_REF => Some(InjectionKind::Time),
            EDITOR_STATE_REF => Some(InjectionKind::Editor),
            SELECTION_STATE_REF => Some(InjectionKind::Selection),
            FEATURE_COLLECTION_REF => Some(InjectionKind::FeatureCollection),
            TRACK_FEATURE_REF => Some(InjectionKind::TrackFeature),
            POINT_FEATURE_REF | ANNOTATION_FEATURE_REF | FEATURE_REF => {
                Some(InjectionKind::SelectedFeatures)
            }
            _ => None,
        }
    }

    /// Injection implied by a parameter schema, if any.
    pub fn for_schema(schema: &ParameterSchema) -> Option<Self> {
        if let Some(kind) = schema.references().find_map(Self::from_reference) {
            return Some(kind);
        }
        let items = schema.items.as_deref().filter(|_| schema.is_array())?;
        items
            .references()
            .any(|r| FEATURE_VARIANT_REFS.contains(&r))
            .then_some(InjectionKind::SelectedFeatures)
    }
}

/// How a single declared parameter will be supplied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterAnalysis {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub injection: Option<InjectionKind>,
    pub requires_user_input: bool,
    pub is_required: bool,
    pub has_default: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ParameterAnalysis {
    pub fn is_auto_injectable(&self) -> bool {
        self.injection.is_some()
    }
}

/// Per-tool summary of parameter sources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolAnalysis {
    pub tool_name: String,
    pub parameters: Vec<ParameterAnalysis>,
    pub auto_injectable_count: usize,
    pub user_input_count: usize,
}

impl ToolAnalysis {
    pub fn parameter(&self, name: &str) -> Option<&ParameterAnalysis> {
        self.parameters.iter().find(|p| p.name == name)
    }
}

/// Outcome of checking whether a tool can run with what is available.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSatisfaction {
    pub can_execute: bool,
    pub missing_params: Vec<String>,
}

/// Classify every declared parameter of `tool`.
pub fn analyze_tool(tool: &Tool) -> ToolAnalysis {
    let parameters: Vec<ParameterAnalysis> = tool
        .properties()
        .into_iter()
        .flatten()
        .map(|(name, schema)| analyze_parameter(tool, name, schema))
        .collect();

    let auto_injectable_count = parameters.iter().filter(|p| p.is_auto_injectable()).count();
    let user_input_count = parameters.iter().filter(|p| p.requires_user_input).count();

    ToolAnalysis {
        tool_name: tool.name.clone(),
        parameters,
        auto_injectable_count,
        user_input_count,
    }
}

fn analyze_parameter(tool: &Tool, name: &str, schema: &ParameterSchema) -> ParameterAnalysis {
    let injection = InjectionKind::for_schema(schema);
    let requires_user_input = match injection {
        Some(_) => false,
        // A primitive with a default is satisfied implicitly.
        None if schema.is_primitive() => !schema.has_default(),
        None => true,
    };

    ParameterAnalysis {
        name: name.to_string(),
        injection,
        requires_user_input,
        is_required: tool.is_required(name),
        has_default: schema.has_default(),
        schema_type: schema.type_name().map(str::to_string),
        description: schema.description.clone(),
    }
}

fn json_or_null<T: Serialize>(value: Option<T>) -> Value {
    match value.map(serde_json::to_value) {
        Some(Ok(json)) => json,
        Some(Err(e)) => {
            tracing::warn!("Failed to serialize injected state: {}", e);
            Value::Null
        }
        None => Value::Null,
    }
}

/// Analyzer + injector bound to a state provider.
pub struct ToolParameterService {
    provider: Arc<dyn StateProvider>,
}

impl ToolParameterService {
    pub fn new(provider: Arc<dyn StateProvider>) -> Self {
        Self { provider }
    }

    pub fn analyze(&self, tool: &Tool) -> ToolAnalysis {
        analyze_tool(tool)
    }

    /// Parameters a caller has to prompt for.
    pub fn user_input_parameters(&self, tool: &Tool) -> Vec<ParameterAnalysis> {
        analyze_tool(tool)
            .parameters
            .into_iter()
            .filter(|p| p.requires_user_input)
            .collect()
    }

    /// Resolve the concrete value for one injection source.
    pub fn resolve(&self, kind: InjectionKind, selected: &[Feature]) -> Value {
        match kind {
            InjectionKind::Viewport => json_or_null(self.provider.viewport_state()),
            InjectionKind::Time => json_or_null(self.provider.time_state()),
            InjectionKind::Selection => json_or_null(self.provider.selection_state()),
            InjectionKind::Editor => json_or_null(self.provider.editor_state(None)),
            InjectionKind::FeatureCollection => {
                json_or_null(self.collection_for_selection(selected))
            }
            InjectionKind::TrackFeature => json_or_null(self.track_feature(selected)),
            InjectionKind::SelectedFeatures => {
                if selected.is_empty() {
                    json_or_null(Some(self.provider.selected_features()))
                } else {
                    json_or_null(Some(selected))
                }
            }
        }
    }

    /// The selection as a collection, keeping the provider collection's
    /// metadata; the full collection when nothing is selected.
    fn collection_for_selection(&self, selected: &[Feature]) -> Option<FeatureCollection> {
        let full = self.provider.feature_collection();
        if selected.is_empty() {
            return full;
        }
        let features = selected.iter().cloned().map(Arc::new).collect();
        Some(match full {
            Some(fc) => fc.with_features(features),
            None => FeatureCollection::default().with_features(features),
        })
    }

    fn track_feature(&self, selected: &[Feature]) -> Option<Feature> {
        if let Some(track) = selected.iter().find(|f| f.is_track()) {
            return Some(track.clone());
        }
        self.provider
            .feature_collection()?
            .iter()
            .find(|f| f.is_track())
            .cloned()
    }

    /// Fill every auto-injectable parameter the caller did not supply.
    ///
    /// Caller-supplied values are never overwritten.
    pub fn inject_parameters(
        &self,
        tool: &Tool,
        selected: &[Feature],
        user_params: Map<String, Value>,
    ) -> Map<String, Value> {
        let mut params = user_params;
        for param in analyze_tool(tool).parameters {
            let Some(kind) = param.injection else {
                continue;
            };
            if params.contains_key(&param.name) {
                debug!(tool = %tool.name, param = %param.name, "Keeping caller-supplied value");
                continue;
            }
            let value = self.resolve(kind, selected);
            debug!(tool = %tool.name, param = %param.name, ?kind, "Injected parameter");
            params.insert(param.name, value);
        }
        params
    }

    /// Whether every required parameter will have a value, without
    /// building the parameter map.
    pub fn validate_parameter_satisfaction(
        &self,
        tool: &Tool,
        selected: &[Feature],
        user_params: &Map<String, Value>,
    ) -> ParameterSatisfaction {
        let analysis = analyze_tool(tool);
        let missing_params: Vec<String> = tool
            .required()
            .iter()
            .filter(|name| !self.is_satisfied(&analysis, name, selected, user_params))
            .cloned()
            .collect();

        ParameterSatisfaction {
            can_execute: missing_params.is_empty(),
            missing_params,
        }
    }

    fn is_satisfied(
        &self,
        analysis: &ToolAnalysis,
        name: &str,
        selected: &[Feature],
        user_params: &Map<String, Value>,
    ) -> bool {
        if user_params.contains_key(name) {
            return true;
        }
        match analysis.parameter(name) {
            Some(ParameterAnalysis {
                injection: Some(kind),
                ..
            }) => !self.resolve(*kind, selected).is_null(),
            Some(param) => param.has_default,
            None => false,
        }
    }

    /// Expand an execution mode into the parameter maps to invoke with.
    ///
    /// `Multiple` yields one map per feature matching the fanned-out
    /// parameter (other selected features ride along unchanged); every other
    /// mode yields a single map.
    pub fn plan_invocations(
        &self,
        tool: &Tool,
        selected: &[Feature],
        mode: ExecutionModeKind,
        user_params: &Map<String, Value>,
    ) -> Vec<Map<String, Value>> {
        let fan_out = match mode {
            ExecutionModeKind::Multiple => fan_out_kind(tool, selected),
            _ => None,
        };
        let Some(kind) = fan_out else {
            return vec![self.inject_parameters(tool, selected, user_params.clone())];
        };

        let (matching, others): (Vec<&Feature>, Vec<&Feature>) =
            selected.iter().partition(|f| kind.matches(f));
        matching
            .into_iter()
            .map(|feature| {
                let mut subset: Vec<Feature> = others.iter().map(|f| (*f).clone()).collect();
                subset.push(feature.clone());
                self.inject_parameters(tool, &subset, user_params.clone())
            })
            .collect()
    }
}

/// Kind of the first required, non-array feature parameter matched by more
/// than one selected feature.
fn fan_out_kind(tool: &Tool, selected: &[Feature]) -> Option<ParamKind> {
    let properties = tool.properties()?;
    tool.required().iter().find_map(|name| {
        let schema = properties.get(name)?;
        let kind = classify_parameter(name, schema);
        (kind.is_feature() && !schema.is_array() && kind.count_matches(selected) > 1)
            .then_some(kind)
    })
}
