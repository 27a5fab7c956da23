//! Tests for config file resolution and graceful degradation
//!
//! Tests that manipulate REPCOUNT_CONFIG are marked with #[serial] so they
//! run sequentially, not in parallel.

use repcount_common::config::{resolve_config_path, TomlConfig, CONFIG_ENV_VAR};
use repcount_common::Error;
use serial_test::serial;
use std::env;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
#[serial]
fn test_cli_argument_wins_over_env() {
    env::set_var(CONFIG_ENV_VAR, "/tmp/repcount-env-config.toml");

    let resolved = resolve_config_path(Some(Path::new("/tmp/repcount-cli-config.toml")));
    assert_eq!(resolved.unwrap(), Path::new("/tmp/repcount-cli-config.toml"));

    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
#[serial]
fn test_env_var_used_without_cli() {
    env::set_var(CONFIG_ENV_VAR, "/tmp/repcount-env-config.toml");

    let resolved = resolve_config_path(None);
    assert_eq!(resolved.unwrap(), Path::new("/tmp/repcount-env-config.toml"));

    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
#[serial]
fn test_missing_file_falls_back_to_defaults() {
    env::remove_var(CONFIG_ENV_VAR);

    let missing = Path::new("/tmp/repcount-definitely-missing-config.toml");
    let config = TomlConfig::load_or_default(Some(missing)).unwrap();
    assert_eq!(config, TomlConfig::default());
}

#[test]
#[serial]
fn test_env_file_is_loaded() {
    let file = write_config("[counter]\nextended_threshold_deg = 150.0\n\n[logging]\nlevel = \"debug\"\n");
    env::set_var(CONFIG_ENV_VAR, file.path());

    let config = TomlConfig::load_or_default(None).unwrap();
    assert_eq!(config.counter.extended_threshold_deg, 150.0);
    assert_eq!(config.counter.flexed_threshold_deg, 30.0);
    assert_eq!(config.logging.level, "debug");

    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
fn test_full_config_file() {
    let file = write_config(
        r#"
[counter]
extended_threshold_deg = 165.0
flexed_threshold_deg = 35.0
min_visibility = 0.6
min_segment_length = 0.001

[session]
event_capacity = 250

[logging]
level = "warn"
"#,
    );

    let config = TomlConfig::load(file.path()).unwrap();
    assert_eq!(config.counter.extended_threshold_deg, 165.0);
    assert_eq!(config.counter.flexed_threshold_deg, 35.0);
    assert_eq!(config.counter.min_visibility, 0.6);
    assert_eq!(config.counter.min_segment_length, 0.001);
    assert_eq!(config.session.event_capacity, 250);
    assert_eq!(config.logging.level, "warn");
}

#[test]
fn test_invalid_file_is_an_error() {
    let file = write_config("[counter]\nflexed_threshold_deg = 170.0\n");

    match TomlConfig::load_or_default(Some(file.path())) {
        Err(Error::Config(msg)) => assert!(msg.contains("flexed_threshold_deg"), "{}", msg),
        other => panic!("expected config error, got {:?}", other),
    }
}
