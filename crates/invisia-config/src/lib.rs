//! Shared configuration for Invisia tools.
//!
//! TOML profiles, credential resolution (env + keyring + plaintext),
//! and translation to `invisia_core::CoordinatorConfig`. The CLI adds
//! flag-aware wrappers on top.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use invisia_core::{CoordinatorConfig, Credentials, Ids};

/// Keyring service under which passwords are stored.
pub const KEYRING_SERVICE: &str = "invisia";
/// Environment variable overriding the config file location.
pub const CONFIG_PATH_ENV: &str = "INVISIA_CONFIG";
/// Environment variable consulted for the password.
pub const PASSWORD_ENV: &str = "INVISIA_PASSWORD";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no password configured for profile '{profile}'")]
    NoCredentials { profile: String },

    #[error("profile '{name}' not found")]
    ProfileNotFound { name: String },

    #[error("keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named installation profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

impl Config {
    /// Name of the profile to use: an explicit choice, else the configured
    /// default, else `"default"`.
    pub fn active_profile_name(&self, explicit: Option<&str>) -> String {
        explicit
            .map(str::to_owned)
            .or_else(|| self.default_profile.clone())
            .unwrap_or_else(|| "default".into())
    }

    pub fn profile(&self, name: &str) -> Result<&Profile, ConfigError> {
        self.profiles
            .get(name)
            .ok_or_else(|| ConfigError::ProfileNotFound { name: name.into() })
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Poll interval in seconds.
    #[serde(default = "default_poll_interval")]
    pub poll_interval: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            timeout: default_timeout(),
            poll_interval: default_poll_interval(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_timeout() -> u64 {
    15
}
fn default_poll_interval() -> u64 {
    30
}

/// A named installation + RFID pairing.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Profile {
    /// Backend base URL.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Login email.
    pub email: String,

    /// Password (plaintext; prefer keyring or env var).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// Environment variable name containing the password.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_env: Option<String>,

    #[serde(deserialize_with = "id")]
    pub installation_id: String,

    #[serde(deserialize_with = "id")]
    pub rfid_id: String,

    #[serde(default, deserialize_with = "optional_id", skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    #[serde(default, deserialize_with = "optional_id", skip_serializing_if = "Option::is_none")]
    pub charging_station_id: Option<String>,

    /// Path to an extra CA certificate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca_cert: Option<PathBuf>,

    /// Override request timeout (seconds).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,

    /// Override poll interval (seconds).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poll_interval: Option<u64>,
}

fn default_base_url() -> String {
    invisia_core::config::DEFAULT_BASE_URL.into()
}

// ── Identifier coercion ─────────────────────────────────────────────

/// Normalise an identifier to its canonical digit string.
///
/// Surrounding whitespace and leading zeros are dropped; anything that
/// is not a non-negative integer is rejected.
pub fn normalize_id(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let stripped = trimmed.trim_start_matches('0');
    Some(if stripped.is_empty() { "0" } else { stripped }.to_owned())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Int(u64),
    Text(String),
}

impl RawId {
    fn normalize<E: serde::de::Error>(self) -> Result<String, E> {
        match self {
            Self::Int(n) => Ok(n.to_string()),
            Self::Text(s) => normalize_id(&s)
                .ok_or_else(|| E::custom(format!("expected a numeric identifier, got '{s}'"))),
        }
    }
}

fn id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    RawId::deserialize(deserializer)?.normalize()
}

fn optional_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    match Option::<RawId>::deserialize(deserializer)? {
        None => Ok(None),
        Some(RawId::Text(s)) if s.trim().is_empty() => Ok(None),
        Some(raw) => raw.normalize().map(Some),
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path: `INVISIA_CONFIG`, else XDG / platform
/// conventions.
pub fn config_path() -> PathBuf {
    if let Some(path) = std::env::var_os(CONFIG_PATH_ENV).filter(|p| !p.is_empty()) {
        return PathBuf::from(path);
    }
    ProjectDirs::from("ch", "invisia", "invisia").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("invisia");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load the full Config from `path` + environment.
///
/// Environment overrides use `INVISIA_` with `__` separating nesting
/// levels, e.g. `INVISIA_DEFAULTS__TIMEOUT=30`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("INVISIA_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if the file doesn't exist.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path();
    save_config_to(cfg, &path)?;
    Ok(path)
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Credential resolution ───────────────────────────────────────────

/// Where a resolved password came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordSource {
    ProfileEnv,
    Env,
    Keyring,
    Plaintext,
}

impl fmt::Display for PasswordSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::ProfileEnv => "profile env var",
            Self::Env => PASSWORD_ENV,
            Self::Keyring => "keyring",
            Self::Plaintext => "config file",
        })
    }
}

fn keyring_entry(profile_name: &str) -> Result<keyring::Entry, ConfigError> {
    Ok(keyring::Entry::new(
        KEYRING_SERVICE,
        &format!("{profile_name}/password"),
    )?)
}

/// Resolve the password from the credential chain.
pub fn resolve_password(
    profile: &Profile,
    profile_name: &str,
) -> Result<(SecretString, PasswordSource), ConfigError> {
    // 1. Profile's password_env → env var lookup
    if let Some(ref env_name) = profile.password_env {
        if let Ok(val) = std::env::var(env_name) {
            return Ok((SecretString::from(val), PasswordSource::ProfileEnv));
        }
    }

    // 2. Global env var
    if let Ok(pw) = std::env::var(PASSWORD_ENV) {
        return Ok((SecretString::from(pw), PasswordSource::Env));
    }

    // 3. System keyring
    if let Ok(entry) = keyring_entry(profile_name) {
        if let Ok(pw) = entry.get_password() {
            return Ok((SecretString::from(pw), PasswordSource::Keyring));
        }
    }

    // 4. Plaintext in config
    if let Some(ref pw) = profile.password {
        return Ok((SecretString::from(pw.clone()), PasswordSource::Plaintext));
    }

    Err(ConfigError::NoCredentials {
        profile: profile_name.into(),
    })
}

/// Store a password in the system keyring for `profile_name`.
pub fn store_password(profile_name: &str, password: &str) -> Result<(), ConfigError> {
    keyring_entry(profile_name)?.set_password(password)?;
    Ok(())
}

// ── Translation ─────────────────────────────────────────────────────

fn validate(profile: &Profile) -> Result<(), ConfigError> {
    profile
        .base_url
        .parse::<url::Url>()
        .map_err(|_| ConfigError::Validation {
            field: "base_url".into(),
            reason: format!("invalid URL: {}", profile.base_url),
        })?;
    if profile.email.trim().is_empty() {
        return Err(ConfigError::Validation {
            field: "email".into(),
            reason: "must not be empty".into(),
        });
    }
    Ok(())
}

/// Build a `CoordinatorConfig` from a profile, resolving the password
/// through the credential chain.
pub fn profile_to_coordinator_config(
    profile: &Profile,
    profile_name: &str,
    defaults: &Defaults,
) -> Result<CoordinatorConfig, ConfigError> {
    let (password, _) = resolve_password(profile, profile_name)?;
    build_coordinator_config(profile, password, defaults)
}

/// Build a `CoordinatorConfig` from a profile and an already resolved
/// password.
pub fn build_coordinator_config(
    profile: &Profile,
    password: SecretString,
    defaults: &Defaults,
) -> Result<CoordinatorConfig, ConfigError> {
    validate(profile)?;

    let credentials = Credentials {
        email: profile.email.trim().to_owned(),
        password,
        installation_id: profile.installation_id.clone(),
    };

    let mut ids = Ids::new(profile.rfid_id.clone());
    ids.user_id.clone_from(&profile.user_id);
    ids.charging_station_id.clone_from(&profile.charging_station_id);

    let mut config = CoordinatorConfig::new(credentials, ids);
    config.base_url.clone_from(&profile.base_url);
    config.ca_cert.clone_from(&profile.ca_cert);
    config.timeout = Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout));
    config.poll_interval =
        Duration::from_secs(profile.poll_interval.unwrap_or(defaults.poll_interval));
    Ok(config)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use secrecy::ExposeSecret;

    fn parse(toml_str: &str) -> Result<Profile, toml::de::Error> {
        toml::from_str(toml_str)
    }

    #[test]
    fn ids_accept_integers_and_strings() {
        let profile = parse(
            r#"
            email = "driver@example.com"
            installation_id = 42
            rfid_id = " 00123 "
            user_id = "7"
            "#,
        )
        .unwrap();
        assert_eq!(profile.installation_id, "42");
        assert_eq!(profile.rfid_id, "123");
        assert_eq!(profile.user_id.as_deref(), Some("7"));
        assert_eq!(profile.charging_station_id, None);
        assert_eq!(profile.base_url, "https://app.invisia.ch");
    }

    #[test]
    fn non_numeric_id_is_rejected() {
        let err = parse(
            r#"
            email = "driver@example.com"
            installation_id = "abc"
            rfid_id = 1
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("numeric identifier"), "{err}");
    }

    #[test]
    fn blank_optional_id_reads_as_absent() {
        let profile = parse(
            r#"
            email = "driver@example.com"
            installation_id = 1
            rfid_id = 2
            charging_station_id = ""
            "#,
        )
        .unwrap();
        assert_eq!(profile.charging_station_id, None);
    }

    #[test]
    fn normalize_id_cases() {
        assert_eq!(normalize_id("0").as_deref(), Some("0"));
        assert_eq!(normalize_id("000").as_deref(), Some("0"));
        assert_eq!(normalize_id("-5"), None);
        assert_eq!(normalize_id("1.5"), None);
        assert_eq!(normalize_id(""), None);
    }

    #[test]
    fn coordinator_config_uses_profile_then_defaults() {
        let mut profile = parse(
            r#"
            email = " driver@example.com "
            installation_id = 42
            rfid_id = 123
            charging_station_id = 9
            poll_interval = 60
            "#,
        )
        .unwrap();
        profile.base_url = "http://localhost:8080".into();

        let config = build_coordinator_config(
            &profile,
            SecretString::from("hunter2".to_owned()),
            &Defaults::default(),
        )
        .unwrap();

        assert_eq!(config.base_url, "http://localhost:8080");
        assert_eq!(config.credentials.email, "driver@example.com");
        assert_eq!(config.credentials.password.expose_secret(), "hunter2");
        assert_eq!(config.installation_id(), "42");
        assert_eq!(config.ids.rfid_id, "123");
        assert_eq!(config.ids.charging_station_id.as_deref(), Some("9"));
        assert_eq!(config.timeout, Duration::from_secs(15));
        assert_eq!(config.poll_interval, Duration::from_secs(60));
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let mut profile = parse(
            r#"
            email = "driver@example.com"
            installation_id = 1
            rfid_id = 2
            "#,
        )
        .unwrap();
        profile.base_url = "not a url".into();

        let err = build_coordinator_config(
            &profile,
            SecretString::from(String::new()),
            &Defaults::default(),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "base_url"));
    }

    #[test]
    fn active_profile_falls_back_to_default() {
        let mut config = Config::default();
        assert_eq!(config.active_profile_name(None), "default");
        config.default_profile = Some("garage".into());
        assert_eq!(config.active_profile_name(None), "garage");
        assert_eq!(config.active_profile_name(Some("office")), "office");
    }
}
