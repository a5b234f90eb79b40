#![allow(clippy::unwrap_used)]
// File-level tests for config loading and saving.

use std::fs;

use pretty_assertions::assert_eq;
use tempfile::TempDir;

use invisia_config::{Config, ConfigError, Profile, load_config_from, save_config_to};

fn profile() -> Profile {
    toml::from_str(
        r#"
        email = "driver@example.com"
        password_env = "GARAGE_PASSWORD"
        installation_id = 42
        rfid_id = 123
        "#,
    )
    .unwrap()
}

#[test]
fn missing_file_yields_defaults() {
    let dir = TempDir::new().unwrap();
    let config = load_config_from(&dir.path().join("absent.toml")).unwrap();

    assert_eq!(config.default_profile.as_deref(), Some("default"));
    assert_eq!(config.defaults.timeout, 15);
    assert_eq!(config.defaults.poll_interval, 30);
    assert!(config.profiles.is_empty());
}

#[test]
fn saved_config_loads_back() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("config.toml");

    let mut config = Config::default();
    config.default_profile = Some("garage".into());
    config.profiles.insert("garage".into(), profile());
    save_config_to(&config, &path).unwrap();

    let written = fs::read_to_string(&path).unwrap();
    assert!(written.contains("[profiles.garage]"), "{written}");
    assert!(!written.contains("password ="), "{written}");

    let loaded = load_config_from(&path).unwrap();
    let garage = loaded.profile("garage").unwrap();
    assert_eq!(garage.installation_id, "42");
    assert_eq!(garage.rfid_id, "123");
    assert_eq!(garage.password_env.as_deref(), Some("GARAGE_PASSWORD"));
    assert_eq!(loaded.active_profile_name(None), "garage");
}

#[test]
fn integer_ids_in_file_are_normalised() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(
        &path,
        r#"
        [profiles.default]
        email = "driver@example.com"
        installation_id = 42
        rfid_id = "0123"
        charging_station_id = 9
        "#,
    )
    .unwrap();

    let config = load_config_from(&path).unwrap();
    let profile = config.profile("default").unwrap();
    assert_eq!(profile.installation_id, "42");
    assert_eq!(profile.rfid_id, "123");
    assert_eq!(profile.charging_station_id.as_deref(), Some("9"));
}

#[test]
fn malformed_id_fails_loading() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(
        &path,
        r#"
        [profiles.default]
        email = "driver@example.com"
        installation_id = "forty-two"
        rfid_id = 1
        "#,
    )
    .unwrap();

    let err = load_config_from(&path).unwrap_err();
    assert!(matches!(err, ConfigError::Figment(_)), "{err:?}");
}

#[test]
fn unknown_profile_is_reported() {
    let err = Config::default().profile("nope").unwrap_err();
    assert_eq!(err.to_string(), "profile 'nope' not found");
}

#[test]
fn plaintext_password_builds_coordinator_config() {
    let mut profile = profile();
    profile.password_env = Some("INVISIA_TEST_PASSWORD_THAT_IS_NEVER_SET".into());
    profile.password = Some("hunter2".into());
    profile.timeout = Some(5);

    let config = invisia_config::profile_to_coordinator_config(
        &profile,
        "invisia-config-test-profile",
        &invisia_config::Defaults::default(),
    )
    .unwrap();

    assert_eq!(config.credentials.email, "driver@example.com");
    assert_eq!(config.timeout, std::time::Duration::from_secs(5));
    assert_eq!(config.poll_interval, std::time::Duration::from_secs(30));
}
