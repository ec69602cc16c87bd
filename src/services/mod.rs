pub mod classify;
pub mod commands;
pub mod compatibility;
pub mod filter;
pub mod parameters;

pub use classify::{classify_parameter, ParamKind, StateKind};
pub use commands::{
    CommandBatchOutcome, CommandConfig, CommandMetadata, CommandProcessor, CommandResult,
};
pub use compatibility::is_compatible;
pub use filter::{
    validate_tool, CachedResult, ExecutionMode, ExecutionModeKind, FilterConfig,
    ParameterValidation, ToolFilterError, ToolFilterResult, ToolFilterService,
    ToolValidationResult,
};
pub use parameters::{
    analyze_tool, InjectionKind, ParameterAnalysis, ParameterSatisfaction, ToolAnalysis,
    ToolParameterService,
};
