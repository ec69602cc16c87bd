//! Shared initialization for the CLI.

use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::{load_config, DebriefConfig};
use crate::services::{CommandProcessor, ToolFilterService, ToolParameterService};
use crate::state::EditorStateStore;

/// Application context holding the state store and every engine service.
pub struct AppContext {
    pub data_path: PathBuf,
    pub config: DebriefConfig,
    pub state: Arc<EditorStateStore>,
    pub parameter_service: ToolParameterService,
    pub filter_service: ToolFilterService,
    pub command_processor: CommandProcessor,
}

impl AppContext {
    /// Initialize application context.
    ///
    /// Data path priority: explicit path > DEBRIEF_DATA_PATH env > ./.debrief (if exists) > ~/.debrief
    pub fn new(explicit_path: Option<PathBuf>) -> Result<Self> {
        let data_path = resolve_data_path(explicit_path);
        tracing::info!("Using data path: {}", data_path.display());

        let config = load_config(&data_path);
        Ok(Self::with_config(data_path, config))
    }

    /// Wire services around a fresh state store.
    pub fn with_config(data_path: PathBuf, config: DebriefConfig) -> Self {
        let state = Arc::new(EditorStateStore::new());
        let parameter_service = ToolParameterService::new(state.clone());
        let filter_service = ToolFilterService::new(config.filter.clone());
        let command_processor = CommandProcessor::new(state.clone(), config.commands.clone());

        Self {
            data_path,
            config,
            state,
            parameter_service,
            filter_service,
            command_processor,
        }
    }
}

pub fn resolve_data_path(explicit_path: Option<PathBuf>) -> PathBuf {
    explicit_path
        .or_else(|| std::env::var("DEBRIEF_DATA_PATH").ok().map(PathBuf::from))
        .or_else(|| {
            let local_path = Path::new(".debrief");
            if local_path.exists() && local_path.is_dir() {
                Some(local_path.to_path_buf())
            } else {
                None
            }
        })
        .unwrap_or_else(|| {
            dirs::home_dir()
                .map(|h| h.join(".debrief"))
                .unwrap_or_else(|| PathBuf::from(".debrief"))
        })
}
