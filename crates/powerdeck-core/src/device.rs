// ── External collaborators ──
//
// The engine never talks HTTP directly. Relay control, the connectivity
// probe and the schedule store sit behind these traits so the workflows
// can be driven by in-memory fakes under paused tokio time.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::CoreError;

/// One relay switch request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PowerCommand {
    pub port: u8,
    pub on: bool,
    pub auxiliary_port: Option<u8>,
}

impl PowerCommand {
    pub fn on(port: u8, auxiliary_port: Option<u8>) -> Self {
        Self {
            port,
            on: true,
            auxiliary_port,
        }
    }

    pub fn off(port: u8) -> Self {
        Self {
            port,
            on: false,
            auxiliary_port: None,
        }
    }

    /// Port 0 off: every source relay off.
    pub fn all_off() -> Self {
        Self::off(0)
    }
}

/// Server acknowledgement for a relay command.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandAck {
    pub success: bool,
    pub message: String,
}

/// Result of a post-switch connectivity probe.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConnectivityReport {
    pub success: bool,
    pub connected: bool,
    pub message: String,
}

/// Relay control and hardware probes.
#[async_trait]
pub trait DeviceControl: Send + Sync {
    /// Switch a relay. Powering one source on implies the others go off.
    async fn power(&self, command: PowerCommand) -> Result<CommandAck, CoreError>;

    /// Probe internet reachability through the named option.
    async fn test_connectivity(&self, option_id: &str) -> Result<ConnectivityReport, CoreError>;

    /// Raw free-text status of the scheduled device.
    async fn device_status(&self) -> Result<String, CoreError>;
}

/// Authoritative store for the scheduled shutoff target.
#[async_trait]
pub trait ScheduleStore: Send + Sync {
    /// The persisted target, if any.
    async fn load(&self) -> Result<Option<DateTime<Utc>>, CoreError>;

    /// Persist a shutoff `hours` from now and return the stored target.
    async fn store(&self, hours: f64) -> Result<DateTime<Utc>, CoreError>;

    /// Remove any persisted target. Idempotent.
    async fn clear(&self) -> Result<(), CoreError>;
}

/// Wall-clock source for countdown math.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// `Utc::now()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Await an external call, failing with `Timeout` once `limit` elapses.
///
/// The underlying request is dropped on expiry; the result is never applied.
pub(crate) async fn with_timeout<T>(
    limit: std::time::Duration,
    call: impl std::future::Future<Output = Result<T, CoreError>>,
) -> Result<T, CoreError> {
    tokio::time::timeout(limit, call)
        .await
        .unwrap_or_else(|_| {
            Err(CoreError::Timeout {
                timeout_secs: limit.as_secs(),
            })
        })
}
