//! Configuration loading and validation.

use std::io::Write;

use arena_server::{MAX_TICK_RATE_HZ, ServerConfig};
use tempfile::NamedTempFile;

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("Failed to create temp file");
    file.write_all(contents.as_bytes()).expect("Failed to write config");
    file
}

#[test]
fn test_defaults() {
    let config = ServerConfig::default();

    assert_eq!(config.db_path(), "arena.db");
    assert_eq!(*config.turn_timeout_secs(), 30);
    assert_eq!(config.turn_timeout(), chrono::Duration::seconds(30));
    assert_eq!(*config.k_factor(), 20.0);
    assert_eq!(*config.initial_rating(), 1200);
    assert_eq!(config.default_mode(), "casual");
    assert_eq!(config.tick_interval(), std::time::Duration::from_secs(1));
}

#[test]
fn test_partial_file_keeps_defaults() {
    let file = write_config("db_path = \"/tmp/test-arena.db\"\nturn_timeout_secs = 10\n");

    let config = ServerConfig::from_file(file.path()).unwrap();

    assert_eq!(config.db_path(), "/tmp/test-arena.db");
    assert_eq!(*config.turn_timeout_secs(), 10);
    assert_eq!(*config.k_factor(), 20.0);
}

#[test]
fn test_invalid_values_rejected() {
    for contents in [
        "turn_timeout_secs = 0",
        "tick_rate_hz = 0",
        "tick_rate_hz = 2000",
        "k_factor = -1.0",
    ] {
        let file = write_config(contents);
        assert!(ServerConfig::from_file(file.path()).is_err(), "{contents}");
    }
}

#[test]
fn test_unparseable_file_rejected() {
    let file = write_config("turn_timeout_secs = \"soon\"");

    let err = ServerConfig::from_file(file.path()).unwrap_err();

    assert!(err.message.contains("Failed to parse config"));
}

#[test]
fn test_missing_file_falls_back_to_defaults() {
    let dir = tempfile::tempdir().unwrap();

    let config = ServerConfig::load_or_default(dir.path().join("absent.toml")).unwrap();

    assert_eq!(config, ServerConfig::default());
}

#[test]
fn test_huge_timeout_does_not_overflow() {
    let config = ServerConfig::default().with_turn_timeout_secs(u64::MAX);

    assert!(config.turn_timeout() > chrono::Duration::days(365));
}

#[test]
fn test_fastest_tick_rate_accepted() {
    let file = write_config(&format!("tick_rate_hz = {MAX_TICK_RATE_HZ}"));

    let config = ServerConfig::from_file(file.path()).unwrap();

    assert_eq!(config.tick_interval(), std::time::Duration::from_millis(1));
}

#[test]
fn test_tick_interval_never_zero() {
    // Deserialized directly, so validation is skipped.
    let config: ServerConfig = toml::from_str("tick_rate_hz = 2000").unwrap();

    assert!(!config.tick_interval().is_zero());
}
