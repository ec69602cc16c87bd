use thiserror::Error;

/// Custom error type for Debrief engine operations.
#[derive(Debug, Error)]
pub enum DebriefError {
    /// A tool schema is malformed or a parameter cannot be resolved.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A command object lacks a recognizable `command`/`payload` shape.
    #[error("Invalid command structure")]
    CommandStructure,

    /// A command tag has no registered processor.
    #[error("Unsupported command type: {0}")]
    UnsupportedCommand(String),

    /// A recognized command carries a payload its processor rejects.
    #[error("{0}")]
    PayloadShape(String),

    /// Composite commands nested deeper than the configured bound.
    #[error("Composite command nesting exceeds maximum depth of {0}")]
    CompositeDepth(usize),

    /// Configuration could not be read or parsed.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Filesystem access failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DebriefError {
    /// Short machine-readable code, used by the CLI's JSON error output.
    pub fn code(&self) -> &'static str {
        match self {
            DebriefError::Validation(_) => "VALIDATION_ERROR",
            DebriefError::CommandStructure => "COMMAND_STRUCTURE_ERROR",
            DebriefError::UnsupportedCommand(_) => "UNSUPPORTED_COMMAND",
            DebriefError::PayloadShape(_) => "PAYLOAD_SHAPE_ERROR",
            DebriefError::CompositeDepth(_) => "COMPOSITE_DEPTH_EXCEEDED",
            DebriefError::Config(_) => "CONFIG_ERROR",
            DebriefError::Io(_) => "IO_ERROR",
            DebriefError::Json(_) => "JSON_ERROR",
        }
    }
}
