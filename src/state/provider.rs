use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::{
    EditorState, Feature, FeatureCollection, ImagePayload, LogLevel, SelectionState, TimeState,
    ViewportState,
};

/// Read-only view of the current application state.
///
/// The engine never owns state; it only asks for the current value of each
/// slice. Every getter returns `None` (or an empty list) when unavailable.
pub trait StateProvider: Send + Sync {
    fn time_state(&self) -> Option<TimeState>;

    fn viewport_state(&self) -> Option<ViewportState>;

    fn selection_state(&self) -> Option<SelectionState>;

    fn feature_collection(&self) -> Option<FeatureCollection>;

    /// Whole editor state, for the given editor or the active one.
    fn editor_state(&self, _editor_id: Option<&str>) -> Option<EditorState> {
        let state = EditorState {
            time_state: self.time_state(),
            viewport_state: self.viewport_state(),
            selection_state: self.selection_state(),
            feature_collection: self.feature_collection(),
        };
        if state == EditorState::default() {
            None
        } else {
            Some(state)
        }
    }

    /// Features of the collection whose id is in the current selection.
    fn selected_features(&self) -> Vec<Feature> {
        match (self.selection_state(), self.feature_collection()) {
            (Some(selection), Some(fc)) => fc.select_by_ids(&selection.selected_ids),
            _ => Vec::new(),
        }
    }
}

/// Write-only, fire-and-forget sink for state changes and display effects.
#[async_trait]
pub trait StateSetter: Send + Sync {
    async fn set_viewport_state(&self, viewport: ViewportState);

    async fn set_selection_state(&self, selection: SelectionState);

    async fn set_time_state(&self, time: TimeState);

    async fn set_editor_state(&self, state: EditorState);

    async fn show_text(&self, text: String);

    async fn show_data(&self, data: Value);

    async fn show_image(&self, image: ImagePayload);

    async fn log_message(&self, message: String, level: LogLevel);
}

/// A display or log side effect, as recorded by in-memory setters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DisplayEvent {
    Text { text: String },
    Data { data: Value },
    Image { image: ImagePayload },
    Log { message: String, level: LogLevel },
}
