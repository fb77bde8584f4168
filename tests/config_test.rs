//! Integration tests for Settings config loading with layered merge semantics.
//!
//! Layers:
//! - Defaults -> Global -> Local: each file only replaces the keys it sets
//! - Any -> Env vars: REPLACE (explicit user override)
//!
//! Note: These tests run without a global config (temp directories only),
//! so they effectively test local config merging with defaults.

use std::fs;

use tempfile::TempDir;

use landalloc::application::ApplicationError;
use landalloc::config::Settings;

#[test]
fn given_local_config_with_model_section_when_load_then_overrides_only_given_keys() {
    // Arrange
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("landalloc.toml");
    fs::write(
        &path,
        r#"
[model]
period_count = 4
timestep = 5
"#,
    )
    .unwrap();

    // Act
    let settings = Settings::load(Some(&path)).expect("load settings");

    // Assert
    assert_eq!(settings.model.period_count, 4);
    assert_eq!(settings.model.timestep, 5);
    let ctx = settings.context().unwrap();
    assert_eq!(ctx.period_count(), 4);
    assert_eq!(ctx.year(3), ctx.start_year() + 15);
}

#[test]
fn given_diagnostics_section_when_load_file_then_maps_to_domain_diagnostics() {
    // Arrange
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("custom.toml");
    fs::write(
        &path,
        r#"
[diagnostics]
warn_on_missing = true
"#,
    )
    .unwrap();

    // Act
    let settings = Settings::load_file(&path).expect("load file");

    // Assert
    let diagnostics = settings.diagnostics();
    assert!(diagnostics.warn_on_missing);
    assert!(!diagnostics.warn_on_duplicate);
    assert_eq!(settings.model, Settings::default().model);
}

#[test]
fn given_missing_explicit_config_when_load_then_config_error() {
    // Arrange
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("absent.toml");

    // Act
    let result = Settings::load(Some(&path));

    // Assert
    assert!(matches!(result, Err(ApplicationError::Config { .. })));
}

#[test]
fn given_malformed_config_when_load_then_config_error_names_file() {
    // Arrange
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("broken.toml");
    fs::write(&path, "[model\nperiod_count = ").unwrap();

    // Act
    let result = Settings::load_file(&path);

    // Assert
    match result {
        Err(ApplicationError::Config { message }) => assert!(message.contains("broken.toml")),
        other => panic!("unexpected: {other:?}"),
    }
}

#[test]
fn given_env_var_when_load_then_overrides_file_value() {
    // Arrange
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("landalloc.toml");
    fs::write(&path, "[model]\nstart_year = 2000\n").unwrap();
    std::env::set_var("LANDALLOC_MODEL__START_YEAR", "2020");

    // Act
    let settings = Settings::load(Some(&path));
    std::env::remove_var("LANDALLOC_MODEL__START_YEAR");

    // Assert
    assert_eq!(settings.expect("load settings").model.start_year, 2020);
}

#[test]
fn given_effective_settings_when_written_and_reloaded_then_identical() {
    // Arrange
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("landalloc.toml");
    let mut settings = Settings::default();
    settings.model.period_count = 6;
    settings.diagnostics.warn_on_duplicate = true;
    fs::write(&path, settings.to_toml().unwrap()).unwrap();

    // Act
    let reloaded = Settings::load_file(&path).unwrap();

    // Assert
    assert_eq!(reloaded, settings);
}
