//! Unit tests for configuration loading and setting resolution
//!
//! Note: Uses serial_test crate to prevent ENV variable race conditions.
//! Tests that manipulate SMSX_* variables are marked with #[serial]
//! to ensure they run sequentially, not in parallel.

use serial_test::serial;
use smsx_common::config::{
    load_toml_config, resolve_config_path, resolve_setting, SettingSource, CONFIG_ENV_VAR,
};
use smsx_common::Error;
use std::env;
use std::path::{Path, PathBuf};

const TEST_VAR: &str = "SMSX_TEST_SETTING";

#[test]
#[serial]
fn test_env_overrides_toml() {
    env::set_var(TEST_VAR, "env-value");

    let resolved = resolve_setting(None, TEST_VAR, Some("toml-value"));
    assert_eq!(
        resolved,
        Some(("env-value".to_string(), SettingSource::Environment))
    );

    env::remove_var(TEST_VAR);
}

#[test]
#[serial]
fn test_cli_overrides_env() {
    env::set_var(TEST_VAR, "env-value");

    let resolved = resolve_setting(Some("cli-value"), TEST_VAR, Some("toml-value"));
    assert_eq!(
        resolved,
        Some(("cli-value".to_string(), SettingSource::CommandLine))
    );

    env::remove_var(TEST_VAR);
}

#[test]
#[serial]
fn test_whitespace_env_is_ignored() {
    env::set_var(TEST_VAR, "   ");

    let resolved = resolve_setting(None, TEST_VAR, Some("toml-value"));
    assert_eq!(resolved, Some(("toml-value".to_string(), SettingSource::Toml)));

    env::remove_var(TEST_VAR);
}

#[test]
#[serial]
fn test_nothing_configured() {
    env::remove_var(TEST_VAR);
    assert_eq!(resolve_setting(None, TEST_VAR, None), None);
}

#[test]
#[serial]
fn test_config_path_priority() {
    env::set_var(CONFIG_ENV_VAR, "/tmp/smsx-env.toml");

    let explicit = resolve_config_path(Some(Path::new("/tmp/explicit.toml")));
    assert_eq!(explicit, Some(PathBuf::from("/tmp/explicit.toml")));

    let from_env = resolve_config_path(None);
    assert_eq!(from_env, Some(PathBuf::from("/tmp/smsx-env.toml")));

    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
fn test_missing_file_uses_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = load_toml_config(Some(&dir.path().join("nope.toml"))).unwrap();
    assert_eq!(config.logging.level, "info");
    assert!(config.shortener.api_key.is_none());
}

#[test]
fn test_full_file_loads() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
data_folder = "/srv/experiment"

[logging]
level = "debug"

[shortener]
api_key = "rb-key"
domain = "go.example.org"
page_size = 20

[messaging]
account_sid = "AC123"
auth_token = "secret"
source_number = "+15550001111"
"#,
    )
    .unwrap();

    let config = load_toml_config(Some(&path)).unwrap();
    assert_eq!(config.data_folder, Some(PathBuf::from("/srv/experiment")));
    assert_eq!(config.logging.level, "debug");
    assert_eq!(config.shortener.domain.as_deref(), Some("go.example.org"));
    assert_eq!(config.shortener.page_size, 20);
    assert_eq!(config.messaging.account_sid.as_deref(), Some("AC123"));
    assert_eq!(config.messaging.country_code, "1");
}

#[test]
fn test_malformed_file_is_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[shortener\napi_key = ").unwrap();

    let result = load_toml_config(Some(&path));
    assert!(matches!(result, Err(Error::Config(_))));
}
