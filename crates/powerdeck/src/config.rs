//! Resolution of the config file, active profile, and global flags into
//! a `powerdeck_core::EngineConfig`.
//!
//! Precedence: CLI flag (or its `POWERDECK_*` env var) > profile > `[defaults]`.

use std::time::Duration;

use powerdeck_config::{Config, Profile};
use powerdeck_core::{EngineConfig, TlsVerification};

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .profile
        .clone()
        .unwrap_or_else(|| config.active_profile_name().to_owned())
}

/// Build the engine config for a server-bound command.
pub fn build_engine_config(global: &GlobalOpts) -> Result<EngineConfig, CliError> {
    let cfg = powerdeck_config::load_config()?;
    resolve(&cfg, global)
}

/// Resolve against an already-loaded `Config`.
pub fn resolve(cfg: &Config, global: &GlobalOpts) -> Result<EngineConfig, CliError> {
    let profile_name = active_profile_name(global, cfg);

    let mut engine = match (cfg.profiles.get(&profile_name), global.server.as_deref()) {
        (Some(profile), _) => profile_config(cfg, profile, &profile_name)?,
        (None, Some(server)) => {
            let mut engine = EngineConfig::new(powerdeck_config::parse_server_url(server)?);
            engine.request_timeout = Duration::from_secs(cfg.defaults.timeout);
            if cfg.defaults.insecure {
                engine.tls = TlsVerification::DangerAcceptInvalid;
            }
            engine
        }
        (None, None) if global.profile.is_some() => {
            return Err(CliError::ProfileNotFound {
                name: profile_name,
                available: available_profiles(cfg),
            });
        }
        (None, None) => {
            return Err(CliError::NoConfig {
                path: powerdeck_config::config_path().display().to_string(),
            });
        }
    };

    if let Some(server) = global.server.as_deref() {
        engine.server = powerdeck_config::parse_server_url(server)?;
    }
    if let Some(secs) = global.timeout {
        engine.request_timeout = Duration::from_secs(secs);
    }
    if global.insecure {
        engine.tls = TlsVerification::DangerAcceptInvalid;
    }

    tracing::debug!(
        profile = %profile_name,
        server = %engine.server,
        timeout_secs = engine.request_timeout.as_secs(),
        "resolved engine config"
    );
    Ok(engine)
}

fn profile_config(
    cfg: &Config,
    profile: &Profile,
    profile_name: &str,
) -> Result<EngineConfig, CliError> {
    let mut engine = powerdeck_config::profile_to_engine_config(profile, profile_name)?;
    if profile.timeout.is_none() {
        engine.request_timeout = Duration::from_secs(cfg.defaults.timeout);
    }
    if profile.insecure.is_none() && cfg.defaults.insecure {
        engine.tls = TlsVerification::DangerAcceptInvalid;
    }
    Ok(engine)
}

/// Comma-separated profile names, sorted, for diagnostics.
pub fn available_profiles(cfg: &Config) -> String {
    let mut names: Vec<&str> = cfg.profiles.keys().map(String::as_str).collect();
    if names.is_empty() {
        return "(none)".into();
    }
    names.sort_unstable();
    names.join(", ")
}
