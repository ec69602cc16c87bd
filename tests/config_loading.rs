//! Configuration loading priority.

use debrief::config::{load_config_with_env, DebriefConfig, CONFIG_FILE};
use debrief::init::AppContext;
use tempfile::TempDir;

#[test]
fn test_file_wins_over_env() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join(CONFIG_FILE),
        "[filter]\ncache_ttl_ms = 500\n\n[commands]\nmax_composite_depth = 3\n",
    )
    .unwrap();

    let config = load_config_with_env(
        dir.path(),
        Some(r#"{"filter": {"cache_ttl_ms": 9}}"#.to_string()),
    );

    assert_eq!(config.filter.cache_ttl_ms, 500);
    assert_eq!(config.filter.cache_capacity, 1_000);
    assert_eq!(config.commands.max_composite_depth, 3);
}

#[test]
fn test_env_used_without_file() {
    let dir = TempDir::new().unwrap();
    let config = load_config_with_env(
        dir.path(),
        Some(r#"{"commands": {"enable_rollback": true}}"#.to_string()),
    );
    assert!(config.commands.enable_rollback);
    assert_eq!(config.filter.cache_ttl_ms, 60_000);
}

#[test]
fn test_broken_sources_fall_back_to_defaults() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join(CONFIG_FILE), "this is = = not toml").unwrap();

    let config = load_config_with_env(dir.path(), Some("{oops".to_string()));
    assert_eq!(config, DebriefConfig::default());
}

#[test]
fn test_context_uses_explicit_data_path() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join(CONFIG_FILE),
        "[commands]\nenable_rollback = true\n",
    )
    .unwrap();

    let ctx = AppContext::new(Some(dir.path().to_path_buf())).unwrap();
    assert_eq!(ctx.data_path, dir.path());
    assert!(ctx.command_processor.config().enable_rollback);
}
