//! Config subcommand handlers.

use dialoguer::{Input, Password, Select};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use tabled::Tabled;

use invisia_config::{
    Config, Profile, load_config_or_default, normalize_id, save_config, store_password,
};
use invisia_core::config::DEFAULT_BASE_URL;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts, OutputFormat};
use crate::config::{active_profile_name, available_profiles, config_path};
use crate::error::CliError;
use crate::output;

// ── Helpers ─────────────────────────────────────────────────────────

/// Map a dialoguer / interactive I/O failure into CliError.
fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

fn prompt_id(label: &str, required: bool) -> Result<Option<String>, CliError> {
    let raw: String = Input::new()
        .with_prompt(label)
        .allow_empty(!required)
        .validate_with(move |input: &String| -> Result<(), &'static str> {
            if (!required && input.trim().is_empty()) || normalize_id(input).is_some() {
                Ok(())
            } else {
                Err("expected a numeric identifier")
            }
        })
        .interact_text()
        .map_err(prompt_err)?;
    Ok(normalize_id(&raw))
}

const MASK: &str = "********";

fn masked(cfg: &Config) -> Config {
    let mut cfg = cfg.clone();
    for profile in cfg.profiles.values_mut() {
        if profile.password.is_some() {
            profile.password = Some(MASK.into());
        }
    }
    cfg
}

#[derive(Clone, Serialize, Tabled)]
struct ProfileRow {
    #[tabled(rename = "")]
    active: &'static str,
    name: String,
    email: String,
    installation: String,
    rfid: String,
    station: String,
}

fn profile_rows(cfg: &Config) -> Vec<ProfileRow> {
    let default = cfg.default_profile.as_deref().unwrap_or("default");
    let mut rows: Vec<ProfileRow> = cfg
        .profiles
        .iter()
        .map(|(name, p)| ProfileRow {
            active: if name == default { "*" } else { "" },
            name: name.clone(),
            email: p.email.clone(),
            installation: p.installation_id.clone(),
            rfid: p.rfid_id.clone(),
            station: p.charging_station_id.clone().unwrap_or_default(),
        })
        .collect();
    rows.sort_by(|a, b| a.name.cmp(&b.name));
    rows
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Init => init(global),

        // ── Show ────────────────────────────────────────────────────
        ConfigCommand::Show => {
            let cfg = masked(&load_config_or_default());
            let out = match global.output {
                OutputFormat::Table => toml::to_string_pretty(&cfg).map_err(|e| {
                    CliError::Config {
                        message: format!("failed to serialize config: {e}"),
                    }
                })?,
                ref format => output::render_single(format, &cfg, |_| String::new())?,
            };
            output::print_output(&out, global.quiet);
            Ok(())
        }

        // ── Profiles ────────────────────────────────────────────────
        ConfigCommand::Profiles => {
            let cfg = load_config_or_default();
            if cfg.profiles.is_empty() {
                eprintln!("No profiles configured. Run: invisia config init");
                return Ok(());
            }
            let rows = profile_rows(&cfg);
            let out = output::render_list(&global.output, &rows, ProfileRow::clone)?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        // ── Use <name> ─────────────────────────────────────────────
        ConfigCommand::Use { name } => {
            let mut cfg = load_config_or_default();

            if !cfg.profiles.contains_key(&name) {
                return Err(CliError::ProfileNotFound {
                    available: available_profiles(&cfg),
                    name,
                });
            }

            cfg.default_profile = Some(name.clone());
            save_config(&cfg)?;
            eprintln!("✓ Default profile set to '{name}'");
            Ok(())
        }

        // ── SetPassword ─────────────────────────────────────────────
        ConfigCommand::SetPassword => {
            let cfg = load_config_or_default();
            let profile_name = active_profile_name(global, &cfg);

            if !cfg.profiles.contains_key(&profile_name) {
                return Err(CliError::ProfileNotFound {
                    available: available_profiles(&cfg),
                    name: profile_name,
                });
            }

            let secret = Password::new()
                .with_prompt(format!("Password for profile '{profile_name}'"))
                .interact()
                .map(SecretString::from)
                .map_err(prompt_err)?;

            if secret.expose_secret().is_empty() {
                return Err(CliError::Validation {
                    field: "password".into(),
                    reason: "value cannot be empty".into(),
                });
            }

            store_password(&profile_name, secret.expose_secret())?;
            eprintln!("✓ Password stored in system keyring for profile '{profile_name}'");
            Ok(())
        }
    }
}

// ── Init: interactive wizard ────────────────────────────────────────

fn init(global: &GlobalOpts) -> Result<(), CliError> {
    let path = config_path();
    eprintln!("Invisia CLI configuration wizard");
    eprintln!("   Config path: {}\n", path.display());

    let mut cfg = load_config_or_default();

    // 1. Profile name
    let profile_name: String = Input::new()
        .with_prompt("Profile name")
        .default(global.profile.clone().unwrap_or_else(|| "default".into()))
        .interact_text()
        .map_err(prompt_err)?;

    // 2. Login
    let email: String = Input::new()
        .with_prompt("Email")
        .interact_text()
        .map_err(prompt_err)?;
    let password = Password::new()
        .with_prompt("Password")
        .interact()
        .map(SecretString::from)
        .map_err(prompt_err)?;
    if email.trim().is_empty() || password.expose_secret().is_empty() {
        return Err(CliError::Validation {
            field: "credentials".into(),
            reason: "email and password cannot be empty".into(),
        });
    }

    // 3. Identifiers
    let installation_id = prompt_id("Installation ID", true)?.unwrap_or_default();
    let rfid_id = prompt_id("RFID ID", true)?.unwrap_or_default();
    let user_id = prompt_id("User ID (optional)", false)?;
    let charging_station_id = prompt_id("Charging station ID (optional)", false)?;

    // 4. Password storage
    let store_choices = &[
        "Store in system keyring (recommended)",
        "Save to config file (plaintext)",
    ];
    let store_selection = Select::new()
        .with_prompt("Where to store the password?")
        .items(store_choices)
        .default(0)
        .interact()
        .map_err(prompt_err)?;

    let password_field = if store_selection == 0 {
        store_password(&profile_name, password.expose_secret())?;
        eprintln!("   ✓ Password stored in system keyring");
        None
    } else {
        Some(password.expose_secret().to_owned())
    };

    // 5. Build profile and write config
    let profile = Profile {
        base_url: global
            .base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.into()),
        email: email.trim().to_owned(),
        password: password_field,
        password_env: None,
        installation_id,
        rfid_id,
        user_id,
        charging_station_id,
        ca_cert: None,
        timeout: None,
        poll_interval: None,
    };

    cfg.profiles.insert(profile_name.clone(), profile);
    if cfg.profiles.len() == 1 || cfg.default_profile.is_none() {
        cfg.default_profile = Some(profile_name.clone());
    }

    let written = save_config(&cfg)?;

    eprintln!("\n✓ Configuration written to {}", written.display());
    eprintln!("  Profile: {profile_name}");
    eprintln!("\n  Test it: invisia status --profile {profile_name}");
    Ok(())
}
