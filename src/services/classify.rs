//! Parameter classification.
//!
//! Decides what kind of value a tool parameter expects, either from a
//! well-known schema reference or, failing that, from name/description
//! heuristics. All matching rules live here so the filter engine and the
//! parameter service agree on them.

use serde::{Deserialize, Serialize};

use crate::models::feature::{DATA_TYPE_REFERENCE_POINT, DATA_TYPE_TRACK, DATA_TYPE_ZONE};
use crate::models::{Feature, ParameterSchema};
use crate::services::compatibility::is_compatible;

pub const VIEWPORT_STATE_REF: &str = "#/$defs/ViewportState";
pub const TIME_STATE_REF: &str = "#/$defs/TimeState";
pub const EDITOR_STATE_REF: &str = "#/$defs/EditorState";
pub const SELECTION_STATE_REF: &str = "#/$defs/SelectionState";
pub const FEATURE_COLLECTION_REF: &str = "#/$defs/DebriefFeatureCollection";
pub const TRACK_FEATURE_REF: &str = "#/$defs/DebriefTrackFeature";
pub const POINT_FEATURE_REF: &str = "#/$defs/DebriefPointFeature";
pub const ANNOTATION_FEATURE_REF: &str = "#/$defs/DebriefAnnotationFeature";
pub const FEATURE_REF: &str = "#/$defs/DebriefFeature";

/// References that name a single feature variant.
pub const FEATURE_VARIANT_REFS: &[&str] = &[
    TRACK_FEATURE_REF,
    POINT_FEATURE_REF,
    ANNOTATION_FEATURE_REF,
    FEATURE_REF,
];

/// Which slice of application state a state parameter stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateKind {
    Time,
    Viewport,
    Selection,
    Editor,
}

impl StateKind {
    const ALL: [StateKind; 4] = [
        StateKind::Time,
        StateKind::Viewport,
        StateKind::Selection,
        StateKind::Editor,
    ];

    fn stem(self) -> &'static str {
        match self {
            StateKind::Time => "time",
            StateKind::Viewport => "viewport",
            StateKind::Selection => "selection",
            StateKind::Editor => "editor",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            StateKind::Time => "time_state",
            StateKind::Viewport => "viewport_state",
            StateKind::Selection => "selection_state",
            StateKind::Editor => "editor_state",
        }
    }

    fn mentioned_in(self, text: &str) -> bool {
        let stem = self.stem();
        text.contains(&format!("{stem}_state"))
            || text.contains(&format!("{stem} state"))
            || text.contains(&format!("{stem}state"))
    }
}

/// What a parameter expects to receive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "state", rename_all = "snake_case")]
pub enum ParamKind {
    Track,
    Point,
    Zone,
    FeatureCollection,
    GenericFeature,
    /// Plain configuration; never satisfiable by selecting features.
    Config,
    /// Supplied by the environment rather than by feature selection.
    State(StateKind),
}

impl ParamKind {
    /// Whether `feature` is an acceptable value for this kind.
    pub fn matches(self, feature: &Feature) -> bool {
        match self {
            ParamKind::Track => {
                is_compatible(feature, DATA_TYPE_TRACK) || is_compatible(feature, "LineString")
            }
            ParamKind::Point => {
                is_compatible(feature, DATA_TYPE_REFERENCE_POINT)
                    || is_compatible(feature, "Point")
            }
            ParamKind::Zone => {
                is_compatible(feature, DATA_TYPE_ZONE) || is_compatible(feature, "Polygon")
            }
            ParamKind::FeatureCollection | ParamKind::GenericFeature => true,
            ParamKind::Config | ParamKind::State(_) => false,
        }
    }

    pub fn count_matches(self, features: &[Feature]) -> usize {
        features.iter().filter(|f| self.matches(f)).count()
    }

    pub fn is_feature(self) -> bool {
        !matches!(self, ParamKind::Config | ParamKind::State(_))
    }

    pub fn label(self) -> &'static str {
        match self {
            ParamKind::Track => "track",
            ParamKind::Point => "point",
            ParamKind::Zone => "zone",
            ParamKind::FeatureCollection => "feature collection",
            ParamKind::GenericFeature => "feature",
            ParamKind::Config => "configuration",
            ParamKind::State(state) => state.label(),
        }
    }
}

/// Kind implied by a single well-known reference.
pub fn kind_for_reference(reference: &str) -> Option<ParamKind> {
    match reference {
        VIEWPORT_STATE_REF => Some(ParamKind::State(StateKind::Viewport)),
        TIME_STATE_REF => Some(ParamKind::State(StateKind::Time)),
        EDITOR_STATE_REF => Some(ParamKind::State(StateKind::Editor)),
        SELECTION_STATE_REF => Some(ParamKind::State(StateKind::Selection)),
        FEATURE_COLLECTION_REF => Some(ParamKind::FeatureCollection),
        TRACK_FEATURE_REF => Some(ParamKind::Track),
        POINT_FEATURE_REF => Some(ParamKind::Point),
        ANNOTATION_FEATURE_REF | FEATURE_REF => Some(ParamKind::GenericFeature),
        _ => None,
    }
}

/// Kind implied by the schema's references, if any are well known.
///
/// The node's own `$ref`/`anyOf`/`oneOf` are checked first; for arrays the
/// `items` references are used, collapsing mixed feature variants to
/// [`ParamKind::GenericFeature`].
pub fn schema_kind(schema: &ParameterSchema) -> Option<ParamKind> {
    if let Some(kind) = schema.references().find_map(kind_for_reference) {
        return Some(kind);
    }
    if !schema.is_array() {
        return None;
    }
    let items = schema.items.as_deref()?;
    let mut kinds = items
        .references()
        .filter(|r| FEATURE_VARIANT_REFS.contains(r))
        .filter_map(kind_for_reference);
    let first = kinds.next()?;
    if kinds.all(|k| k == first) {
        Some(first)
    } else {
        Some(ParamKind::GenericFeature)
    }
}

/// Classify by name and description alone.
pub fn classify_by_text(name: &str, description: Option<&str>) -> ParamKind {
    let text = format!("{} {}", name, description.unwrap_or_default()).to_lowercase();

    if let Some(state) = StateKind::ALL.into_iter().find(|s| s.mentioned_in(&text)) {
        return ParamKind::State(state);
    }
    if text.contains("feature_collection")
        || text.contains("featurecollection")
        || text.contains("feature collection")
    {
        return ParamKind::FeatureCollection;
    }
    if text.contains("track") {
        return ParamKind::Track;
    }
    if text.contains("point") {
        return ParamKind::Point;
    }
    if text.contains("zone") || text.contains("polygon") {
        return ParamKind::Zone;
    }
    if text.contains("feature") {
        return ParamKind::GenericFeature;
    }
    ParamKind::Config
}

/// Classify a declared parameter: well-known references win, heuristics
/// decide the rest.
pub fn classify_parameter(name: &str, schema: &ParameterSchema) -> ParamKind {
    schema_kind(schema).unwrap_or_else(|| classify_by_text(name, schema.description.as_deref()))
}
