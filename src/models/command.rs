//! Structured tool results: instructions describing how a tool's output
//! mutates feature and view state.

use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::models::feature::{Feature, FeatureCollection, FeatureId};
use crate::models::state::{SelectionState, TimeState, ViewportState};
use crate::DebriefError;

/// Every command tag the pipeline knows how to process.
pub const SUPPORTED_COMMANDS: &[&str] = &[
    "addFeatures",
    "updateFeatures",
    "deleteFeatures",
    "setFeatureCollection",
    "setViewport",
    "setSelection",
    "setTimeState",
    "showText",
    "showData",
    "showImage",
    "logMessage",
    "composite",
];

/// Image returned by a tool for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImagePayload {
    /// Base64-encoded image bytes.
    pub data: String,
    pub media_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl ImagePayload {
    pub fn is_complete(&self) -> bool {
        !self.data.is_empty() && !self.media_type.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Unknown level names fall back to `Info`.
    pub fn from_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "debug" | "trace" => LogLevel::Debug,
            "warn" | "warning" => LogLevel::Warn,
            "error" => LogLevel::Error,
            _ => LogLevel::Info,
        }
    }
}

fn lenient_level<'de, D: Deserializer<'de>>(deserializer: D) -> Result<LogLevel, D::Error> {
    let name = Option::<String>::deserialize(deserializer)?;
    Ok(name.map(|n| LogLevel::from_name(&n)).unwrap_or_default())
}

/// `logMessage` accepts a bare string or `{message, level}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum LogPayload {
    Text(String),
    Structured {
        message: String,
        #[serde(default, deserialize_with = "lenient_level")]
        #[schemars(with = "LogLevel")]
        level: LogLevel,
    },
}

impl LogPayload {
    pub fn message(&self) -> &str {
        match self {
            LogPayload::Text(message) => message,
            LogPayload::Structured { message, .. } => message,
        }
    }

    pub fn level(&self) -> LogLevel {
        match self {
            LogPayload::Text(_) => LogLevel::Info,
            LogPayload::Structured { level, .. } => *level,
        }
    }
}

/// A tagged instruction produced by a tool call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "command", content = "payload", rename_all = "camelCase")]
pub enum DebriefCommand {
    AddFeatures(Vec<Feature>),
    UpdateFeatures(Vec<Feature>),
    DeleteFeatures(Vec<FeatureId>),
    SetFeatureCollection(FeatureCollection),
    SetViewport(ViewportState),
    SetSelection(SelectionState),
    SetTimeState(TimeState),
    ShowText(String),
    ShowData(Value),
    ShowImage(ImagePayload),
    LogMessage(LogPayload),
    /// Sub-commands stay raw; each is parsed when its turn comes.
    Composite(Vec<Value>),
}

impl DebriefCommand {
    /// The wire tag of this command.
    pub fn tag(&self) -> &'static str {
        match self {
            DebriefCommand::AddFeatures(_) => "addFeatures",
            DebriefCommand::UpdateFeatures(_) => "updateFeatures",
            DebriefCommand::DeleteFeatures(_) => "deleteFeatures",
            DebriefCommand::SetFeatureCollection(_) => "setFeatureCollection",
            DebriefCommand::SetViewport(_) => "setViewport",
            DebriefCommand::SetSelection(_) => "setSelection",
            DebriefCommand::SetTimeState(_) => "setTimeState",
            DebriefCommand::ShowText(_) => "showText",
            DebriefCommand::ShowData(_) => "showData",
            DebriefCommand::ShowImage(_) => "showImage",
            DebriefCommand::LogMessage(_) => "logMessage",
            DebriefCommand::Composite(_) => "composite",
        }
    }
}

/// Check that `value` is an object with a string `command` and a `payload`.
///
/// Returns the tag on success.
pub fn command_tag(value: &Value) -> Result<&str, DebriefError> {
    let object = value.as_object().ok_or(DebriefError::CommandStructure)?;
    let tag = object
        .get("command")
        .and_then(Value::as_str)
        .ok_or(DebriefError::CommandStructure)?;
    if !object.contains_key("payload") {
        return Err(DebriefError::CommandStructure);
    }
    Ok(tag)
}

/// Parse raw tool output into a command.
///
/// The envelope is checked first, then the tag, then the payload, so each
/// failure maps onto exactly one error kind.
pub fn parse_command(value: &Value) -> Result<DebriefCommand, DebriefError> {
    let tag = command_tag(value)?;
    if !SUPPORTED_COMMANDS.contains(&tag) {
        return Err(DebriefError::UnsupportedCommand(tag.to_string()));
    }

    if tag == "composite" {
        let items = value["payload"].as_array().ok_or_else(|| {
            DebriefError::PayloadShape("Composite payload must be an array of commands".into())
        })?;
        return Ok(DebriefCommand::Composite(items.clone()));
    }

    serde_json::from_value(value.clone()).map_err(|err| payload_error(tag, &err))
}

fn payload_error(tag: &str, err: &serde_json::Error) -> DebriefError {
    match tag {
        "showImage" => DebriefError::PayloadShape("Invalid image payload structure".into()),
        "logMessage" => DebriefError::PayloadShape("Invalid log message payload".into()),
        _ => DebriefError::PayloadShape(format!("Invalid payload for {}: {}", tag, err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_wire_shape_round_trips() {
        let raw = json!({"command": "showText", "payload": "hello"});
        let command = parse_command(&raw).unwrap();
        assert_eq!(command, DebriefCommand::ShowText("hello".into()));
        assert_eq!(serde_json::to_value(&command).unwrap(), raw);
    }

    #[test]
    fn test_missing_payload_is_structure_error() {
        let err = parse_command(&json!({"command": "showText"})).unwrap_err();
        assert!(matches!(err, DebriefError::CommandStructure));
        assert_eq!(err.to_string(), "Invalid command structure");
    }

    #[test]
    fn test_non_object_is_structure_error() {
        let err = parse_command(&json!("addFeatures")).unwrap_err();
        assert!(matches!(err, DebriefError::CommandStructure));
    }

    #[test]
    fn test_unknown_tag_is_unsupported() {
        let err = parse_command(&json!({"command": "launchMissiles", "payload": {}})).unwrap_err();
        assert_eq!(err.to_string(), "Unsupported command type: launchMissiles");
    }

    #[test]
    fn test_bad_image_payload() {
        let err =
            parse_command(&json!({"command": "showImage", "payload": "not-an-object"})).unwrap_err();
        assert_eq!(err.to_string(), "Invalid image payload structure");
    }

    #[test]
    fn test_log_payload_forms() {
        let bare = parse_command(&json!({"command": "logMessage", "payload": "hi"})).unwrap();
        let structured = parse_command(&json!({
            "command": "logMessage",
            "payload": {"message": "careful", "level": "warn"}
        }))
        .unwrap();

        match (bare, structured) {
            (DebriefCommand::LogMessage(a), DebriefCommand::LogMessage(b)) => {
                assert_eq!(a.level(), LogLevel::Info);
                assert_eq!(b.level(), LogLevel::Warn);
                assert_eq!(b.message(), "careful");
            }
            other => panic!("unexpected parse: {:?}", other),
        }
    }

    #[test]
    fn test_unknown_log_level_falls_back_to_info() {
        let parsed = parse_command(&json!({
            "command": "logMessage",
            "payload": {"message": "chatty", "level": "verbose"}
        }))
        .unwrap();
        match parsed {
            DebriefCommand::LogMessage(payload) => {
                assert_eq!(payload.level(), LogLevel::Info);
                assert_eq!(payload.message(), "chatty");
            }
            other => panic!("unexpected parse: {:?}", other),
        }
        assert_eq!(LogLevel::from_name("WARNING"), LogLevel::Warn);
    }

    #[test]
    fn test_composite_keeps_sub_commands_raw() {
        let parsed = parse_command(&json!({
            "command": "composite",
            "payload": [{"command": "showText", "payload": "ok"}, {"command": "nope", "payload": 1}]
        }))
        .unwrap();
        match parsed {
            DebriefCommand::Composite(items) => {
                assert_eq!(items.len(), 2);
                assert_eq!(items[1]["command"], "nope");
            }
            other => panic!("unexpected parse: {:?}", other),
        }
    }

    #[test]
    fn test_composite_payload_must_be_array() {
        let err = parse_command(&json!({"command": "composite", "payload": {"x": 1}})).unwrap_err();
        assert_eq!(err.to_string(), "Composite payload must be an array of commands");
    }
}
