//! GeoJSON-shaped features as the engine sees them.
//!
//! Features are treated as immutable values: collections hold them behind
//! `Arc`, and every mutation builds a new collection that shares the
//! untouched features with its predecessor.

use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

/// `properties.dataType` value carried by track features.
pub const DATA_TYPE_TRACK: &str = "track";
/// `properties.dataType` value carried by reference points.
pub const DATA_TYPE_REFERENCE_POINT: &str = "reference-point";
/// `properties.dataType` value carried by zones.
pub const DATA_TYPE_ZONE: &str = "zone";

fn feature_type() -> String {
    "Feature".to_string()
}

fn collection_type() -> String {
    "FeatureCollection".to_string()
}

/// GeoJSON allows `"properties": null`.
fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Map<String, Value>, D::Error> {
    Ok(Option::<Map<String, Value>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Feature identifier: GeoJSON allows either a string or a number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum FeatureId {
    Text(String),
    Number(#[schemars(with = "f64")] serde_json::Number),
}

impl fmt::Display for FeatureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureId::Text(s) => write!(f, "{}", s),
            FeatureId::Number(n) => write!(f, "{}", n),
        }
    }
}

impl From<&str> for FeatureId {
    fn from(value: &str) -> Self {
        FeatureId::Text(value.to_string())
    }
}

impl From<String> for FeatureId {
    fn from(value: String) -> Self {
        FeatureId::Text(value)
    }
}

impl From<u64> for FeatureId {
    fn from(value: u64) -> Self {
        FeatureId::Number(value.into())
    }
}

/// Geometry of a feature. Only the type discriminator matters to the engine;
/// coordinates and any other members are carried through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Geometry {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub coordinates: Value,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Geometry {
    pub fn new(kind: impl Into<String>, coordinates: Value) -> Self {
        Self {
            kind: kind.into(),
            coordinates,
            extra: Map::new(),
        }
    }
}

/// A geometry-bearing record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Feature {
    #[serde(rename = "type", default = "feature_type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<FeatureId>,
    #[serde(default)]
    pub geometry: Option<Geometry>,
    #[serde(default, deserialize_with = "null_as_empty")]
    #[schemars(with = "Map<String, Value>")]
    pub properties: Map<String, Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Feature {
    pub fn new(id: Option<FeatureId>, geometry: Option<Geometry>) -> Self {
        Self {
            kind: feature_type(),
            id,
            geometry,
            properties: Map::new(),
            extra: Map::new(),
        }
    }

    /// The geometry type, if the feature has a geometry.
    pub fn geometry_type(&self) -> Option<&str> {
        self.geometry.as_ref().map(|g| g.kind.as_str())
    }

    /// The `properties.dataType` discriminator, if it is a string.
    pub fn data_type(&self) -> Option<&str> {
        self.properties.get("dataType").and_then(Value::as_str)
    }

    pub fn is_track(&self) -> bool {
        self.data_type() == Some(DATA_TYPE_TRACK)
    }

    /// Stringified id, the form used for selection and deletion matching.
    pub fn id_string(&self) -> Option<String> {
        self.id.as_ref().map(|id| id.to_string())
    }
}

/// An ordered sequence of features plus optional top-level metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FeatureCollection {
    #[serde(rename = "type", default = "collection_type")]
    pub kind: String,
    #[serde(default)]
    #[schemars(with = "Vec<Feature>")]
    pub features: Vec<Arc<Feature>>,
    /// Members other than `type`/`features` (e.g. `bbox`, `properties`).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for FeatureCollection {
    fn default() -> Self {
        Self {
            kind: collection_type(),
            features: Vec::new(),
            extra: Map::new(),
        }
    }
}

impl FeatureCollection {
    pub fn new(features: Vec<Feature>) -> Self {
        Self {
            features: features.into_iter().map(Arc::new).collect(),
            ..Self::default()
        }
    }

    /// A collection with the same metadata as `self` but different features.
    pub fn with_features(&self, features: Vec<Arc<Feature>>) -> Self {
        Self {
            kind: self.kind.clone(),
            features,
            extra: self.extra.clone(),
        }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Feature> {
        self.features.iter().map(|f| f.as_ref())
    }

    /// Owned copies of the features, in collection order.
    pub fn to_features(&self) -> Vec<Feature> {
        self.iter().cloned().collect()
    }

    /// Features whose stringified id appears in `ids`, in collection order.
    pub fn select_by_ids(&self, ids: &[String]) -> Vec<Feature> {
        self.iter()
            .filter(|f| f.id_string().is_some_and(|id| ids.contains(&id)))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_null_properties_read_as_empty() {
        let feature: Feature = serde_json::from_value(json!({
            "type": "Feature",
            "id": "t1",
            "geometry": {"type": "LineString", "coordinates": [[0.0, 0.0], [1.0, 1.0]]},
            "properties": null
        }))
        .unwrap();
        assert!(feature.properties.is_empty());
        assert!(feature.data_type().is_none());
    }

    #[test]
    fn test_feature_id_display_stringifies_numbers() {
        assert_eq!(FeatureId::from(42u64).to_string(), "42");
        assert_eq!(FeatureId::from("track-1").to_string(), "track-1");
    }

    #[test]
    fn test_feature_id_equality_is_strict() {
        assert_ne!(FeatureId::from("1"), FeatureId::from(1u64));
    }

    #[test]
    fn test_feature_preserves_unknown_members() {
        let raw = json!({
            "type": "Feature",
            "id": 7,
            "geometry": {"type": "Point", "coordinates": [1.0, 2.0]},
            "properties": {"dataType": "reference-point", "name": "buoy"},
            "bbox": [1.0, 2.0, 1.0, 2.0]
        });
        let feature: Feature = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(feature.id, Some(FeatureId::from(7u64)));
        assert_eq!(feature.geometry_type(), Some("Point"));
        assert_eq!(feature.data_type(), Some("reference-point"));
        assert_eq!(serde_json::to_value(&feature).unwrap(), raw);
    }

    #[test]
    fn test_feature_without_geometry_parses() {
        let feature: Feature = serde_json::from_value(json!({"properties": {}})).unwrap();
        assert_eq!(feature.geometry_type(), None);
        assert!(!feature.is_track());
    }

    #[test]
    fn test_collection_keeps_metadata() {
        let raw = json!({
            "type": "FeatureCollection",
            "features": [],
            "properties": {"name": "exercise"}
        });
        let fc: FeatureCollection = serde_json::from_value(raw).unwrap();
        assert!(fc.is_empty());
        assert_eq!(fc.extra["properties"]["name"], "exercise");
    }

    #[test]
    fn test_select_by_ids_matches_stringified_ids() {
        let fc = FeatureCollection::new(vec![
            Feature::new(Some(FeatureId::from(1u64)), None),
            Feature::new(Some(FeatureId::from("b")), None),
            Feature::new(None, None),
        ]);
        let selected = fc.select_by_ids(&["1".to_string(), "b".to_string()]);
        assert_eq!(selected.len(), 2);
    }
}
