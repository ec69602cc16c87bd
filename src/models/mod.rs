pub mod command;
pub mod feature;
pub mod state;
pub mod tool;

pub use command::{
    parse_command, DebriefCommand, ImagePayload, LogLevel, LogPayload,
    SUPPORTED_COMMANDS,
};
pub use feature::{Feature, FeatureCollection, FeatureId, Geometry};
pub use state::{EditorState, SelectionState, TimeState, ViewportState};
pub use tool::{InputSchema, ParameterSchema, SchemaType, Tool, ToolCatalogue};
