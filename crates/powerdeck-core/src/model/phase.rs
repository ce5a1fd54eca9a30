// ── Connection switch state machine ──

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::status::DeviceStatusReport;

/// Current step of the source-switch workflow.
///
/// Replaced wholesale on every transition, and only by the workflow
/// generation that is current at the time of the write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum ConnectionPhase {
    Idle,
    PoweringOn,
    Initializing { remaining_secs: u64 },
    Testing,
    Connected { message: String },
    PartialConnectivity { message: String },
    Failed { message: String },
}

impl ConnectionPhase {
    /// Terminal phases end a workflow; `Idle` counts as terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Idle
                | Self::Connected { .. }
                | Self::PartialConnectivity { .. }
                | Self::Failed { .. }
        )
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::PoweringOn => "powering on",
            Self::Initializing { .. } => "initializing",
            Self::Testing => "testing",
            Self::Connected { .. } => "connected",
            Self::PartialConnectivity { .. } => "partial",
            Self::Failed { .. } => "failed",
        }
    }

    /// Seconds left in the initialization countdown, if counting.
    pub fn remaining_secs(&self) -> Option<u64> {
        match self {
            Self::Initializing { remaining_secs } => Some(*remaining_secs),
            _ => None,
        }
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Connected { message }
            | Self::PartialConnectivity { message }
            | Self::Failed { message } => Some(message),
            _ => None,
        }
    }
}

impl std::fmt::Display for ConnectionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Initializing { remaining_secs } => write!(f, "initializing ({remaining_secs}s)"),
            other => f.write_str(other.label()),
        }
    }
}

/// What the display layer reads for the connection page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseSnapshot {
    /// Generation that last wrote this snapshot (`0` before any selection).
    pub generation: u64,
    pub option_id: Option<String>,
    pub phase: ConnectionPhase,
    /// Human-readable progress line ("Powering on Starlink (Port 3)...").
    pub status_line: String,
    /// Last polled status report accepted while no workflow was running.
    pub device_status: Option<DeviceStatusReport>,
    pub updated_at: DateTime<Utc>,
}

impl PhaseSnapshot {
    pub fn initial(now: DateTime<Utc>) -> Self {
        Self {
            generation: 0,
            option_id: None,
            phase: ConnectionPhase::Idle,
            status_line: String::new(),
            device_status: None,
            updated_at: now,
        }
    }

    /// `true` while a workflow is between `PoweringOn` and its terminal phase.
    pub fn in_flight(&self) -> bool {
        !self.phase.is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_phases() {
        assert!(ConnectionPhase::Idle.is_terminal());
        assert!(ConnectionPhase::Failed { message: "x".into() }.is_terminal());
        assert!(!ConnectionPhase::Testing.is_terminal());
        assert!(!ConnectionPhase::Initializing { remaining_secs: 3 }.is_terminal());
    }

    #[test]
    fn phase_serializes_tagged() {
        let json = serde_json::to_value(ConnectionPhase::Initializing { remaining_secs: 5 })
            .unwrap_or_default();
        assert_eq!(
            json,
            serde_json::json!({"phase": "initializing", "remaining_secs": 5})
        );
    }
}
