//! Settings loading and resolution tests
//!
//! Note: Uses serial_test to prevent CLOCKHARVEST_CONFIG race conditions
//! between tests that manipulate the environment.

use clockharvest_common::config::{Settings, CONFIG_ENV_VAR};
use clockharvest_common::Error;
use serial_test::serial;
use std::env;
use std::io::Write;

fn write_config(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    file.write_all(content.as_bytes()).expect("write config");
    file
}

#[test]
#[serial]
fn no_file_anywhere_uses_defaults() {
    env::remove_var(CONFIG_ENV_VAR);

    let settings = Settings::load(None).expect("defaults should load");
    assert_eq!(settings.window_days, 1);
    assert_eq!(settings.site_id, 4570);
    assert_eq!(settings.probe_attempts, 2);
}

#[test]
#[serial]
fn partial_toml_fills_remaining_defaults() {
    env::remove_var(CONFIG_ENV_VAR);
    let file = write_config("window_days = 3\nsite_id = 9001\n");

    let settings = Settings::load(Some(file.path())).expect("should load");
    assert_eq!(settings.window_days, 3);
    assert_eq!(settings.site_id, 9001);
    // untouched fields keep compiled defaults
    assert_eq!(settings.default_port, 4370);
    assert_eq!(settings.max_concurrency, 1);
}

#[test]
#[serial]
fn env_var_names_the_file() {
    let file = write_config("window_days = 7\n");
    env::set_var(CONFIG_ENV_VAR, file.path());

    let settings = Settings::load(None).expect("should load from env path");
    assert_eq!(settings.window_days, 7);

    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
#[serial]
fn cli_path_beats_env_var() {
    let env_file = write_config("window_days = 7\n");
    let cli_file = write_config("window_days = 2\n");
    env::set_var(CONFIG_ENV_VAR, env_file.path());

    let settings = Settings::load(Some(cli_file.path())).expect("should load");
    assert_eq!(settings.window_days, 2);

    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
#[serial]
fn explicit_missing_file_is_config_error() {
    env::remove_var(CONFIG_ENV_VAR);
    let result = Settings::load(Some(std::path::Path::new("/nonexistent/clockharvest.toml")));
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
#[serial]
fn malformed_toml_is_config_error() {
    env::remove_var(CONFIG_ENV_VAR);
    let file = write_config("window_days = \"not a number");

    let result = Settings::load(Some(file.path()));
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
#[serial]
fn invalid_values_rejected_on_load() {
    env::remove_var(CONFIG_ENV_VAR);
    let file = write_config("max_concurrency = 0\n");

    let result = Settings::load(Some(file.path()));
    assert!(matches!(result, Err(Error::Config(_))));
}
