// ── HTTP-backed collaborators ──
//
// Adapts `powerdeck_api::DashboardClient` to the engine's collaborator
// traits. One client serves both relay control and schedule storage.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::debug;

use powerdeck_api::models::{PowerAction, PowerRequest};
use powerdeck_api::transport::{TlsMode, TransportConfig};
use powerdeck_api::DashboardClient;

use crate::config::{EngineConfig, TlsVerification};
use crate::device::{CommandAck, ConnectivityReport, DeviceControl, PowerCommand, ScheduleStore};
use crate::error::CoreError;

/// `DeviceControl` + `ScheduleStore` over the dashboard server's JSON API.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: DashboardClient,
}

impl HttpBackend {
    pub fn new(client: DashboardClient) -> Self {
        Self { client }
    }

    /// Build the HTTP client described by an engine config.
    pub fn from_config(config: &EngineConfig) -> Result<Self, CoreError> {
        let client = DashboardClient::new(config.server.clone(), &build_transport(config))?;
        Ok(Self::new(client))
    }

    pub fn client(&self) -> &DashboardClient {
        &self.client
    }
}

/// Translate engine TLS/timeout settings into the API crate's transport config.
pub fn build_transport(config: &EngineConfig) -> TransportConfig {
    let tls = match &config.tls {
        TlsVerification::SystemDefaults => TlsMode::System,
        TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
        TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
    };
    TransportConfig {
        tls,
        timeout: config.request_timeout,
    }
}

#[async_trait]
impl DeviceControl for HttpBackend {
    async fn power(&self, command: PowerCommand) -> Result<CommandAck, CoreError> {
        let request = PowerRequest {
            port: command.port,
            action: if command.on {
                PowerAction::On
            } else {
                PowerAction::Off
            },
            auxiliary_port: command.auxiliary_port,
        };
        let resp = self.client.power(&request).await?;
        Ok(CommandAck {
            success: resp.success,
            message: resp.message,
        })
    }

    async fn test_connectivity(&self, option_id: &str) -> Result<ConnectivityReport, CoreError> {
        let resp = self.client.connectivity_test(option_id).await?;
        Ok(ConnectivityReport {
            success: resp.success,
            connected: resp.connected,
            message: resp.message,
        })
    }

    async fn device_status(&self) -> Result<String, CoreError> {
        let resp = self.client.device_status().await?;
        if resp.success {
            Ok(resp.message)
        } else {
            Err(CoreError::Rejected {
                message: resp.message,
            })
        }
    }
}

#[async_trait]
impl ScheduleStore for HttpBackend {
    async fn load(&self) -> Result<Option<DateTime<Utc>>, CoreError> {
        let resp = self.client.get_schedule().await?;
        if !resp.success {
            return Err(CoreError::Rejected {
                message: resp.message,
            });
        }
        Ok(resp.scheduled_at())
    }

    async fn store(&self, hours: f64) -> Result<DateTime<Utc>, CoreError> {
        let resp = self.client.set_schedule(hours).await?;
        if !resp.success {
            return Err(CoreError::Rejected {
                message: resp.message,
            });
        }
        let target = resp.scheduled_at().ok_or_else(|| CoreError::Api {
            message: "server accepted the schedule but returned no scheduled_time".into(),
            status: None,
        })?;
        debug!(deadline = %target, "schedule persisted");
        Ok(target)
    }

    async fn clear(&self) -> Result<(), CoreError> {
        let resp = self.client.delete_schedule().await?;
        if resp.success {
            Ok(())
        } else {
            Err(CoreError::Rejected {
                message: resp.message,
            })
        }
    }
}
