//! Tool catalogue entries and their JSON-Schema-like input contracts.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// `type` of a schema node: a single name or a union of names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum SchemaType {
    Single(String),
    Union(Vec<String>),
}

impl SchemaType {
    /// The first non-`null` type name.
    pub fn primary(&self) -> Option<&str> {
        match self {
            SchemaType::Single(name) => Some(name.as_str()),
            SchemaType::Union(names) => names
                .iter()
                .map(String::as_str)
                .find(|name| *name != "null"),
        }
    }
}

/// Declared shape of a single tool parameter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ParameterSchema {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub schema_type: Option<SchemaType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(rename = "$ref", default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<ParameterSchema>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub any_of: Option<Vec<ParameterSchema>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub one_of: Option<Vec<ParameterSchema>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ParameterSchema {
    pub fn type_name(&self) -> Option<&str> {
        self.schema_type.as_ref().and_then(SchemaType::primary)
    }

    pub fn is_array(&self) -> bool {
        self.type_name() == Some("array")
    }

    pub fn is_primitive(&self) -> bool {
        matches!(
            self.type_name(),
            Some("string" | "number" | "integer" | "boolean")
        )
    }

    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }

    /// Every `$ref` on this node and its direct `anyOf`/`oneOf` alternatives.
    pub fn references(&self) -> impl Iterator<Item = &str> {
        let alternatives = self
            .any_of
            .iter()
            .flatten()
            .chain(self.one_of.iter().flatten());
        self.reference
            .as_deref()
            .into_iter()
            .chain(alternatives.filter_map(|alt| alt.reference.as_deref()))
    }
}

/// A tool's input contract.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct InputSchema {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub schema_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<BTreeMap<String, ParameterSchema>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// An externally-registered analysis tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Tool {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_schema: Option<InputSchema>,
}

impl Tool {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema: None,
        }
    }

    pub fn with_schema(mut self, schema: InputSchema) -> Self {
        self.input_schema = Some(schema);
        self
    }

    /// Declared properties; `None` when the schema declares none at all.
    pub fn properties(&self) -> Option<&BTreeMap<String, ParameterSchema>> {
        self.input_schema.as_ref()?.properties.as_ref()
    }

    /// Names listed under `required` (empty when there is no schema).
    pub fn required(&self) -> &[String] {
        self.input_schema
            .as_ref()
            .map(|schema| schema.required.as_slice())
            .unwrap_or(&[])
    }

    pub fn is_required(&self, param: &str) -> bool {
        self.required().iter().any(|name| name == param)
    }
}

/// `{ tools: [...] }` as served by the tool registry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ToolCatalogue {
    #[serde(default)]
    pub tools: Vec<Tool>,
}

impl ToolCatalogue {
    pub fn find(&self, name: &str) -> Option<&Tool> {
        self.tools.iter().find(|tool| tool.name == name)
    }
}
