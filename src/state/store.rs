use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::models::{
    EditorState, FeatureCollection, ImagePayload, LogLevel, SelectionState, TimeState,
    ViewportState,
};
use crate::state::provider::{DisplayEvent, StateProvider, StateSetter};

/// Editor id used when callers never name one.
pub const DEFAULT_EDITOR: &str = "default";

#[derive(Debug, Default)]
struct StoreInner {
    editors: HashMap<String, EditorState>,
    active: Option<String>,
    events: Vec<DisplayEvent>,
}

/// In-memory state for one or more editors.
///
/// Reads go to the active editor (or the one named in `editor_state`);
/// writes from the command pipeline always land on the active editor.
/// Display and log effects are recorded in arrival order.
#[derive(Debug, Default)]
pub struct EditorStateStore {
    inner: RwLock<StoreInner>,
}

impl EditorStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store with a single active editor seeded with `state`.
    pub fn with_state(state: EditorState) -> Self {
        let store = Self::new();
        store.insert_editor(DEFAULT_EDITOR, state);
        store
    }

    fn read(&self) -> RwLockReadGuard<'_, StoreInner> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, StoreInner> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Add or replace an editor. The first editor inserted becomes active.
    pub fn insert_editor(&self, editor_id: &str, state: EditorState) {
        let mut inner = self.write();
        inner.editors.insert(editor_id.to_string(), state);
        if inner.active.is_none() {
            inner.active = Some(editor_id.to_string());
        }
    }

    /// Replace the active editor's feature collection.
    pub fn set_feature_collection(&self, fc: FeatureCollection) {
        self.update_active(|state| state.feature_collection = Some(fc));
    }

    /// Snapshot of every display/log effect recorded so far.
    pub fn events(&self) -> Vec<DisplayEvent> {
        self.read().events.clone()
    }

    /// Drain recorded display/log effects.
    pub fn take_events(&self) -> Vec<DisplayEvent> {
        std::mem::take(&mut self.write().events)
    }

    fn with_active<T>(&self, f: impl FnOnce(&EditorState) -> Option<T>) -> Option<T> {
        let inner = self.read();
        let active = inner.active.as_ref()?;
        inner.editors.get(active).and_then(f)
    }

    fn update_active(&self, f: impl FnOnce(&mut EditorState)) {
        let mut inner = self.write();
        let active = inner
            .active
            .get_or_insert_with(|| DEFAULT_EDITOR.to_string())
            .clone();
        f(inner.editors.entry(active).or_default());
    }

    fn record(&self, event: DisplayEvent) {
        self.write().events.push(event);
    }
}

impl StateProvider for EditorStateStore {
    fn time_state(&self) -> Option<TimeState> {
        self.with_active(|s| s.time_state.clone())
    }

    fn viewport_state(&self) -> Option<ViewportState> {
        self.with_active(|s| s.viewport_state)
    }

    fn selection_state(&self) -> Option<SelectionState> {
        self.with_active(|s| s.selection_state.clone())
    }

    fn feature_collection(&self) -> Option<FeatureCollection> {
        self.with_active(|s| s.feature_collection.clone())
    }

    fn editor_state(&self, editor_id: Option<&str>) -> Option<EditorState> {
        let inner = self.read();
        let id = editor_id.map(str::to_string).or_else(|| inner.active.clone())?;
        inner.editors.get(&id).cloned()
    }
}

#[async_trait]
impl StateSetter for EditorStateStore {
    async fn set_viewport_state(&self, viewport: ViewportState) {
        self.update_active(|state| state.viewport_state = Some(viewport));
    }

    async fn set_selection_state(&self, selection: SelectionState) {
        self.update_active(|state| state.selection_state = Some(selection));
    }

    async fn set_time_state(&self, time: TimeState) {
        if time.current.is_some() && time.current_instant().is_none() {
            tracing::warn!("Time state current {:?} is not an RFC 3339 instant", time.current);
        }
        if let Some((start, end)) = time.period() {
            if start > end {
                tracing::warn!("Time state period starts after it ends ({} > {})", start, end);
            }
        }
        self.update_active(|state| state.time_state = Some(time));
    }

    async fn set_editor_state(&self, new_state: EditorState) {
        self.update_active(|state| *state = new_state);
    }

    async fn show_text(&self, text: String) {
        self.record(DisplayEvent::Text { text });
    }

    async fn show_data(&self, data: Value) {
        self.record(DisplayEvent::Data { data });
    }

    async fn show_image(&self, image: ImagePayload) {
        self.record(DisplayEvent::Image { image });
    }

    async fn log_message(&self, message: String, level: LogLevel) {
        self.record(DisplayEvent::Log { message, level });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Feature, FeatureId};

    fn seeded() -> EditorStateStore {
        let fc = FeatureCollection::new(vec![
            Feature::new(Some(FeatureId::from("a")), None),
            Feature::new(Some(FeatureId::from("b")), None),
        ]);
        EditorStateStore::with_state(EditorState {
            selection_state: Some(SelectionState {
                selected_ids: vec!["b".into()],
            }),
            feature_collection: Some(fc),
            ..Default::default()
        })
    }

    #[test]
    fn test_selected_features_follow_selection() {
        let store = seeded();
        let selected = store.selected_features();
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].id_string().as_deref(), Some("b"));
    }

    #[test]
    fn test_empty_store_reports_nothing() {
        let store = EditorStateStore::new();
        assert!(store.feature_collection().is_none());
        assert!(store.editor_state(None).is_none());
        assert!(store.selected_features().is_empty());
    }

    #[test]
    fn test_first_inserted_editor_stays_active() {
        let store = seeded();
        store.insert_editor("second", EditorState::default());
        let active = store.editor_state(None).unwrap();
        assert!(active.feature_collection.is_some());
    }

    #[tokio::test]
    async fn test_setters_write_active_editor() {
        let store = seeded();
        store
            .set_viewport_state(ViewportState {
                bounds: [-1.0, 50.0, 1.0, 51.0],
            })
            .await;
        store.show_text("done".into()).await;

        assert_eq!(store.viewport_state().unwrap().bounds[1], 50.0);
        assert_eq!(
            store.take_events(),
            vec![DisplayEvent::Text {
                text: "done".into()
            }]
        );
        assert!(store.events().is_empty());
    }

    #[tokio::test]
    async fn test_unparseable_time_is_still_stored() {
        let store = seeded();
        store.set_time_state(TimeState::new("noon", "dawn", "dusk")).await;
        assert_eq!(store.time_state().unwrap().current.as_deref(), Some("noon"));
    }

    #[tokio::test]
    async fn test_named_editor_lookup() {
        let store = seeded();
        store.insert_editor("second", EditorState::default());
        assert!(store.editor_state(Some("second")).is_some());
        assert!(store.editor_state(Some("missing")).is_none());
    }
}
