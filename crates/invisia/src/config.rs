//! CLI-side configuration: profile selection and flag overrides on top of
//! `invisia_config`.
//!
//! Core never sees these types -- it receives a pre-built `CoordinatorConfig`.

use std::time::Duration;

use invisia_config::{Config, build_coordinator_config, load_config_or_default, resolve_password};
use invisia_core::CoordinatorConfig;

use crate::cli::GlobalOpts;
use crate::error::CliError;

pub use invisia_config::config_path;

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    config.active_profile_name(global.profile.as_deref())
}

/// Comma-separated profile names, for help texts.
pub fn available_profiles(config: &Config) -> String {
    let mut names: Vec<_> = config.profiles.keys().cloned().collect();
    if names.is_empty() {
        return "(none)".into();
    }
    names.sort();
    names.join(", ")
}

/// Build a `CoordinatorConfig` from the config file, the active profile,
/// and CLI overrides.
pub fn resolve_coordinator_config(global: &GlobalOpts) -> Result<CoordinatorConfig, CliError> {
    let cfg = load_config_or_default();
    let profile_name = active_profile_name(global, &cfg);

    let Some(profile) = cfg.profiles.get(&profile_name) else {
        if cfg.profiles.is_empty() {
            return Err(CliError::NoConfig {
                path: config_path().display().to_string(),
            });
        }
        return Err(CliError::ProfileNotFound {
            name: profile_name,
            available: available_profiles(&cfg),
        });
    };

    let mut profile = profile.clone();
    if let Some(ref base_url) = global.base_url {
        profile.base_url.clone_from(base_url);
    }

    let (password, source) = resolve_password(&profile, &profile_name)?;
    tracing::debug!(profile = %profile_name, %source, "resolved password");

    let mut config = build_coordinator_config(&profile, password, &cfg.defaults)?;
    if let Some(secs) = global.timeout {
        config.timeout = Duration::from_secs(secs);
    }

    tracing::debug!(
        profile = %profile_name,
        base_url = %config.base_url,
        installation_id = %config.installation_id(),
        rfid_id = %config.ids.rfid_id,
        "resolved coordinator config"
    );
    Ok(config)
}
