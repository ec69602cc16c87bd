//! Application state slices held per editor.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::models::feature::FeatureCollection;

/// Time controller state. Older documents carry `range: [start, end]`
/// instead of separate `start`/`end` fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TimeState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<[String; 2]>,
}

impl TimeState {
    pub fn new(
        current: impl Into<String>,
        start: impl Into<String>,
        end: impl Into<String>,
    ) -> Self {
        Self {
            current: Some(current.into()),
            start: Some(start.into()),
            end: Some(end.into()),
            range: None,
        }
    }

    /// Fold the legacy `range` form into `start`/`end`.
    ///
    /// Explicit `start`/`end` win over the range when both are present.
    pub fn normalized(&self) -> Self {
        let (range_start, range_end) = match &self.range {
            Some([s, e]) => (Some(s.clone()), Some(e.clone())),
            None => (None, None),
        };
        Self {
            current: self.current.clone(),
            start: self.start.clone().or(range_start),
            end: self.end.clone().or(range_end),
            range: None,
        }
    }

    /// Parse `current` as an RFC 3339 instant.
    pub fn current_instant(&self) -> Option<DateTime<Utc>> {
        parse_instant(self.current.as_deref()?)
    }

    /// Parse the normalized `(start, end)` period.
    pub fn period(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let normalized = self.normalized();
        let start = parse_instant(normalized.start.as_deref()?)?;
        let end = parse_instant(normalized.end.as_deref()?)?;
        Some((start, end))
    }
}

fn parse_instant(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Map viewport as `[west, south, east, north]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ViewportState {
    pub bounds: [f64; 4],
}

/// Ordered ids of the currently selected features.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SelectionState {
    #[serde(default)]
    pub selected_ids: Vec<String>,
}

/// All four slices for one editor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct EditorState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_state: Option<TimeState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub viewport_state: Option<ViewportState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selection_state: Option<SelectionState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_collection: Option<FeatureCollection>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_legacy_range_is_normalized() {
        let time: TimeState = serde_json::from_value(json!({
            "current": "2024-01-01T12:00:00Z",
            "range": ["2024-01-01T00:00:00Z", "2024-01-02T00:00:00Z"]
        }))
        .unwrap();
        let normalized = time.normalized();
        assert_eq!(normalized.start.as_deref(), Some("2024-01-01T00:00:00Z"));
        assert_eq!(normalized.end.as_deref(), Some("2024-01-02T00:00:00Z"));
        assert!(normalized.range.is_none());
    }

    #[test]
    fn test_period_parses_rfc3339() {
        let time = TimeState::new(
            "2024-01-01T12:00:00Z",
            "2024-01-01T00:00:00Z",
            "2024-01-02T00:00:00Z",
        );
        let (start, end) = time.period().unwrap();
        assert!(start < end);
        assert!(time.current_instant().is_some());
    }

    #[test]
    fn test_unparseable_time_yields_none() {
        let time = TimeState::new("noon", "dawn", "dusk");
        assert!(time.current_instant().is_none());
        assert!(time.period().is_none());
    }

    #[test]
    fn test_selection_uses_camel_case() {
        let selection: SelectionState =
            serde_json::from_value(json!({"selectedIds": ["a", "b"]})).unwrap();
        assert_eq!(selection.selected_ids, vec!["a", "b"]);
    }
}
