//! Test data builders for features and tools.
//!
//! Provides fluent API for creating test data with sensible defaults.

use serde_json::{json, Map, Value};

use debrief::models::{Feature, FeatureId, Geometry, Tool};

/// Builder for test features.
pub struct FeatureBuilder {
    id: Option<FeatureId>,
    geometry: String,
    properties: Map<String, Value>,
}

impl FeatureBuilder {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: Some(FeatureId::from(id.into())),
            geometry: "Point".to_string(),
            properties: Map::new(),
        }
    }

    pub fn without_id(mut self) -> Self {
        self.id = None;
        self
    }

    pub fn geometry(mut self, kind: impl Into<String>) -> Self {
        self.geometry = kind.into();
        self
    }

    pub fn data_type(self, data_type: &str) -> Self {
        self.property("dataType", json!(data_type))
    }

    pub fn property(mut self, key: &str, value: Value) -> Self {
        self.properties.insert(key.to_string(), value);
        self
    }

    pub fn build(self) -> Feature {
        let coordinates = match self.geometry.as_str() {
            "Point" => json!([-4.1, 50.3]),
            "LineString" => json!([[-4.1, 50.3], [-4.0, 50.4]]),
            _ => json!([]),
        };
        let mut feature = Feature::new(self.id, Some(Geometry::new(self.geometry, coordinates)));
        feature.properties = self.properties;
        feature
    }
}

pub fn track(id: &str) -> Feature {
    FeatureBuilder::new(id)
        .geometry("LineString")
        .data_type("track")
        .build()
}

pub fn point(id: &str) -> Feature {
    FeatureBuilder::new(id).data_type("reference-point").build()
}

pub fn zone(id: &str) -> Feature {
    FeatureBuilder::new(id)
        .geometry("Polygon")
        .data_type("zone")
        .build()
}

/// Builder for test tools.
pub struct ToolBuilder {
    name: String,
    description: String,
    properties: Map<String, Value>,
    required: Vec<String>,
    has_schema: bool,
}

impl ToolBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: "test tool".to_string(),
            properties: Map::new(),
            required: Vec::new(),
            has_schema: true,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Tool whose schema declares no `properties` at all.
    pub fn schemaless(mut self) -> Self {
        self.has_schema = false;
        self
    }

    pub fn param(mut self, name: &str, schema: Value) -> Self {
        self.properties.insert(name.to_string(), schema);
        self
    }

    pub fn required_param(mut self, name: &str, schema: Value) -> Self {
        self.required.push(name.to_string());
        self.param(name, schema)
    }

    pub fn build(self) -> Tool {
        let input_schema = if self.has_schema {
            json!({
                "type": "object",
                "properties": self.properties,
                "required": self.required,
            })
        } else {
            json!({ "type": "object", "required": self.required })
        };
        serde_json::from_value(json!({
            "name": self.name,
            "description": self.description,
            "inputSchema": input_schema,
        }))
        .expect("tool builder produced invalid tool")
    }
}
