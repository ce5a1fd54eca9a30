// ── Runtime engine configuration ──
//
// Describes which server to talk to and how the engine behaves. Never
// touches disk: the CLI builds an `EngineConfig` (usually through
// `powerdeck-config`) and hands it in.

use std::time::Duration;

use url::Url;

use crate::model::OptionCatalog;

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(std::path::PathBuf),
    /// Skip verification (self-signed reverse proxy).
    DangerAcceptInvalid,
}

/// The device whose power the scheduler manages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledDevice {
    pub name: String,
    pub port: u8,
}

impl Default for ScheduledDevice {
    fn default() -> Self {
        Self {
            name: "Plex server".into(),
            port: 5,
        }
    }
}

/// Configuration for one engine instance.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Dashboard server root (e.g., `http://192.168.2.177:8000`).
    pub server: Url,
    pub tls: TlsVerification,
    /// Upper bound on every external call.
    pub request_timeout: Duration,
    /// Status poll period. Zero disables the poll task.
    pub status_poll_interval: Duration,
    pub scheduled_device: ScheduledDevice,
    pub catalog: OptionCatalog,
}

impl EngineConfig {
    pub fn new(server: Url) -> Self {
        Self {
            server,
            tls: TlsVerification::default(),
            request_timeout: Duration::from_secs(10),
            status_poll_interval: Duration::from_secs(30),
            scheduled_device: ScheduledDevice::default(),
            catalog: OptionCatalog::rig_default(),
        }
    }
}
