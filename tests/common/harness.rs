//! Test harness for an isolated application context.

use std::path::Path;
use tempfile::TempDir;

use debrief::config::DebriefConfig;
use debrief::init::AppContext;

/// Wires an `AppContext` over a temporary data directory.
///
/// The directory is removed when the harness is dropped.
pub struct TestHarness {
    pub ctx: AppContext,
    /// Temporary directory (kept alive while harness exists)
    pub temp_dir: TempDir,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_config(DebriefConfig::default())
    }

    pub fn with_config(config: DebriefConfig) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let ctx = AppContext::with_config(temp_dir.path().to_path_buf(), config);
        Self { ctx, temp_dir }
    }

    pub fn temp_path(&self) -> &Path {
        self.temp_dir.path()
    }
}
