//! Shared configuration for the powerdeck CLI.
//!
//! TOML profiles plus `POWERDECK_` environment overrides, and translation
//! to `powerdeck_core::EngineConfig`. The CLI layers its global flags on
//! top of what this crate resolves.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use powerdeck_core::{
    ConnectionOption, EngineConfig, OptionCatalog, ScheduledDevice, TlsVerification,
};

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

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
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named dashboard server profiles.
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
    /// Name of the profile to use when none is given explicitly.
    pub fn active_profile_name(&self) -> &str {
        self.default_profile.as_deref().unwrap_or("default")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    #[serde(default)]
    pub insecure: bool,

    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            insecure: false,
            timeout: default_timeout(),
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
    10
}

/// A named dashboard server profile.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
pub struct Profile {
    /// Dashboard server base URL (e.g., "http://192.168.2.177:8000").
    pub server: String,

    /// Status poll period in seconds. 0 disables polling.
    pub status_poll_secs: Option<u64>,

    /// Path to custom CA certificate.
    pub ca_cert: Option<PathBuf>,

    /// Accept invalid TLS certificates.
    pub insecure: Option<bool>,

    /// Override request timeout (seconds).
    pub timeout: Option<u64>,

    /// Device the shutoff scheduler manages.
    pub scheduled_device: Option<ScheduledDeviceConfig>,

    /// Replaces the built-in connection catalog when non-empty.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<ConnectionOption>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ScheduledDeviceConfig {
    #[serde(default = "default_device_name")]
    pub name: String,
    #[serde(default = "default_device_port")]
    pub port: u8,
}

impl Default for ScheduledDeviceConfig {
    fn default() -> Self {
        Self {
            name: default_device_name(),
            port: default_device_port(),
        }
    }
}

fn default_device_name() -> String {
    ScheduledDevice::default().name
}
fn default_device_port() -> u8 {
    ScheduledDevice::default().port
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "powerdeck", "powerdeck").map_or_else(
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
    p.push("powerdeck");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load Config from `path` + environment. A missing file yields defaults.
///
/// Nested keys use a double underscore: `POWERDECK_DEFAULTS__TIMEOUT=5`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("POWERDECK_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path();
    save_config_to(cfg, &path)?;
    Ok(path)
}

/// Serialize config to TOML and write it to `path`.
pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Translation ─────────────────────────────────────────────────────

/// Parse and check a server URL.
pub fn parse_server_url(raw: &str) -> Result<url::Url, ConfigError> {
    let url: url::Url = raw.parse().map_err(|_| ConfigError::Validation {
        field: "server".into(),
        reason: format!("invalid URL: {raw}"),
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::Validation {
            field: "server".into(),
            reason: format!("expected an http or https URL, got '{}'", url.scheme()),
        });
    }
    Ok(url)
}

/// Build an `EngineConfig` from a profile. No CLI flag overrides.
pub fn profile_to_engine_config(
    profile: &Profile,
    profile_name: &str,
) -> Result<EngineConfig, ConfigError> {
    let server = parse_server_url(&profile.server).map_err(|e| match e {
        ConfigError::Validation { reason, .. } => ConfigError::Validation {
            field: format!("profiles.{profile_name}.server"),
            reason,
        },
        other => other,
    })?;

    let mut config = EngineConfig::new(server);

    config.tls = if profile.insecure.unwrap_or(false) {
        TlsVerification::DangerAcceptInvalid
    } else if let Some(ref ca_path) = profile.ca_cert {
        TlsVerification::CustomCa(ca_path.clone())
    } else {
        TlsVerification::SystemDefaults
    };

    config.request_timeout = Duration::from_secs(profile.timeout.unwrap_or_else(default_timeout));
    if let Some(secs) = profile.status_poll_secs {
        config.status_poll_interval = Duration::from_secs(secs);
    }

    if let Some(ref device) = profile.scheduled_device {
        if device.port == 0 {
            return Err(ConfigError::Validation {
                field: format!("profiles.{profile_name}.scheduled_device.port"),
                reason: "port 0 is reserved for \"all sources off\"".into(),
            });
        }
        config.scheduled_device = ScheduledDevice {
            name: device.name.clone(),
            port: device.port,
        };
    }

    if !profile.options.is_empty() {
        config.catalog =
            OptionCatalog::new(profile.options.clone()).map_err(|e| ConfigError::Validation {
                field: format!("profiles.{profile_name}.options"),
                reason: e.to_string(),
            })?;
    }

    Ok(config)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    const RIG_TOML: &str = r#"
default_profile = "rig"

[defaults]
output = "json"
timeout = 5

[profiles.rig]
server = "http://192.168.2.177:8000"
status_poll_secs = 15
scheduled_device = { name = "NAS", port = 7 }
"#;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.defaults, Defaults::default());
        assert!(config.profiles.is_empty());
        assert_eq!(config.active_profile_name(), "default");
    }

    #[test]
    fn file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, RIG_TOML).unwrap();

        let config = load_config_from(&path).unwrap();
        assert_eq!(config.active_profile_name(), "rig");
        assert_eq!(config.defaults.output, "json");
        assert_eq!(config.defaults.timeout, 5);
        assert_eq!(config.defaults.color, "auto");

        let engine = profile_to_engine_config(&config.profiles["rig"], "rig").unwrap();
        assert_eq!(engine.server.as_str(), "http://192.168.2.177:8000/");
        assert_eq!(engine.status_poll_interval, Duration::from_secs(15));
        assert_eq!(engine.request_timeout, Duration::from_secs(10));
        assert_eq!(
            engine.scheduled_device,
            ScheduledDevice {
                name: "NAS".into(),
                port: 7
            }
        );
        assert_eq!(engine.catalog, OptionCatalog::rig_default());
    }

    #[test]
    fn save_then_load_preserves_profiles() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.profiles.insert(
            "default".into(),
            Profile {
                server: "http://10.0.0.2:8000".into(),
                timeout: Some(3),
                ..Profile::default()
            },
        );
        save_config_to(&config, &path).unwrap();

        let loaded = load_config_from(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn custom_catalog_is_validated() {
        let profile = Profile {
            server: "http://rig.local:8000".into(),
            options: vec![
                ConnectionOption::new("lte", "LTE", 1, 12),
                ConnectionOption::new("lte", "LTE backup", 2, 12),
            ],
            ..Profile::default()
        };
        let err = profile_to_engine_config(&profile, "rig").unwrap_err();
        assert!(
            matches!(
                err,
                ConfigError::Validation { ref field, .. } if field == "profiles.rig.options"
            ),
            "{err}"
        );
    }

    #[test]
    fn custom_catalog_replaces_default() {
        let profile = Profile {
            server: "http://rig.local:8000".into(),
            options: vec![
                ConnectionOption::new("lte", "LTE", 1, 12),
                ConnectionOption::new("off", "Off", 0, 0),
            ],
            ..Profile::default()
        };
        let engine = profile_to_engine_config(&profile, "rig").unwrap();
        assert_eq!(engine.catalog.options().len(), 2);
        assert!(engine.catalog.get("starlink").is_none());
    }

    #[test]
    fn bad_server_url_is_rejected() {
        for server in ["not a url", "ftp://rig.local"] {
            let profile = Profile {
                server: server.into(),
                ..Profile::default()
            };
            let err = profile_to_engine_config(&profile, "rig").unwrap_err();
            assert!(matches!(err, ConfigError::Validation { .. }), "{err}");
        }
    }

    #[test]
    fn insecure_wins_over_ca_cert() {
        let profile = Profile {
            server: "https://rig.local".into(),
            insecure: Some(true),
            ca_cert: Some("/etc/rig-ca.pem".into()),
            ..Profile::default()
        };
        let engine = profile_to_engine_config(&profile, "rig").unwrap();
        assert_eq!(engine.tls, TlsVerification::DangerAcceptInvalid);
    }
}
