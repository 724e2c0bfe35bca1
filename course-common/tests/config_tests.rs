//! Tests for configuration loading and graceful degradation
//!
//! Tests that manipulate COURSEGEN_ROOT_FOLDER are marked with #[serial]
//! so they never race each other on the process environment.

use course_common::config::{
    self, load_or_default, load_toml_config, resolve_root_folder, write_toml_config, TomlConfig,
    ROOT_FOLDER_ENV,
};
use serial_test::serial;
use std::env;
use std::path::PathBuf;
use tempfile::TempDir;

#[test]
fn test_missing_file_yields_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let missing = temp_dir.path().join("does-not-exist.toml");

    let config = load_or_default(Some(&missing)).unwrap();
    assert_eq!(config, TomlConfig::default());
}

#[test]
fn test_no_location_yields_defaults() {
    let config = load_or_default(None).unwrap();
    assert_eq!(config, TomlConfig::default());
}

#[test]
fn test_malformed_file_is_an_error() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("broken.toml");
    std::fs::write(&path, "port = \"not a number\"").unwrap();

    let result = load_or_default(Some(&path));
    assert!(matches!(result, Err(course_common::Error::Config(_))));
}

#[test]
fn test_write_then_load_preserves_values() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("nested").join("course-gen.toml");

    let mut config = TomlConfig::default();
    config.root_folder = Some(PathBuf::from("/srv/coursegen"));
    config.llm.api_key = Some("test-key".to_string());
    config.generation.max_concurrent_jobs = 2;

    write_toml_config(&config, &path).unwrap();
    let loaded = load_toml_config(&path).unwrap();

    assert_eq!(loaded, config);
    // No temp files left behind next to the config
    let entries: Vec<_> = std::fs::read_dir(path.parent().unwrap())
        .unwrap()
        .collect();
    assert_eq!(entries.len(), 1);
}

#[test]
#[serial]
fn test_env_var_beats_toml() {
    env::set_var(ROOT_FOLDER_ENV, "/tmp/coursegen-env");

    let config = TomlConfig {
        root_folder: Some(PathBuf::from("/tmp/coursegen-toml")),
        ..TomlConfig::default()
    };
    let resolved = resolve_root_folder(None, &config);

    env::remove_var(ROOT_FOLDER_ENV);
    assert_eq!(resolved, PathBuf::from("/tmp/coursegen-env"));
}

#[test]
#[serial]
fn test_toml_used_when_env_absent() {
    env::remove_var(ROOT_FOLDER_ENV);

    let config = TomlConfig {
        root_folder: Some(PathBuf::from("/tmp/coursegen-toml")),
        ..TomlConfig::default()
    };
    assert_eq!(
        resolve_root_folder(None, &config),
        PathBuf::from("/tmp/coursegen-toml")
    );
}

#[test]
#[serial]
fn test_compiled_default_is_last_resort() {
    env::remove_var(ROOT_FOLDER_ENV);

    let resolved = resolve_root_folder(None, &TomlConfig::default());
    assert_eq!(resolved, config::default_root_folder());
    assert!(!resolved.as_os_str().is_empty());
}

#[test]
fn test_ensure_root_folder_creates_directory() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().join("a").join("b");

    config::ensure_root_folder(&root).unwrap();
    assert!(root.is_dir());
    // Idempotent
    config::ensure_root_folder(&root).unwrap();
}
