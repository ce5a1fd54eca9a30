// Dashboard server request/response types
//
// Every endpoint answers with a flat JSON object carrying a `success` flag
// and, usually, a free-text `message`. Fields use `#[serde(default)]`
// because older server builds omit `message` on success and `connected`
// on failure.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ── Power ────────────────────────────────────────────────────────────

/// Relay action for `POST /api/internet/power`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PowerAction {
    On,
    Off,
}

/// Body of `POST /api/internet/power`.
///
/// `port == 0` with `action == off` means "everything off". The server
/// owns exclusivity: powering one port on switches the others off.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PowerRequest {
    pub port: u8,
    pub action: PowerAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auxiliary_port: Option<u8>,
}

/// Generic `{success, message}` reply used by POWER and STATUS.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandResponse {
    pub success: bool,
    #[serde(default)]
    pub message: String,
}

// ── Connectivity test ────────────────────────────────────────────────

/// Body of `POST /api/internet/test`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestRequest {
    pub connection_type: String,
}

/// Reply of `POST /api/internet/test`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestResponse {
    pub success: bool,
    #[serde(default)]
    pub connected: bool,
    #[serde(default)]
    pub message: String,
}

// ── Schedule ─────────────────────────────────────────────────────────

/// Reply of `GET`/`POST /api/plex/schedule`.
///
/// `scheduled_time` is absolute epoch seconds. The server writes it with
/// Python's `time.time()`, so fractional seconds are possible.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScheduleResponse {
    pub success: bool,
    #[serde(default)]
    pub scheduled_time: Option<f64>,
    #[serde(default)]
    pub message: String,
}

impl ScheduleResponse {
    /// The persisted target as a UTC timestamp, if one is set.
    pub fn scheduled_at(&self) -> Option<DateTime<Utc>> {
        self.scheduled_time.and_then(epoch_to_datetime)
    }
}

/// Body of `POST /api/plex/schedule`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleRequest {
    pub hours: f64,
}

/// Reply of `DELETE /api/plex/schedule`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub success: bool,
    #[serde(default)]
    pub message: String,
}

// ── WiFi credentials ─────────────────────────────────────────────────

/// Body of `POST /api/wifi-config`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WifiConfigRequest {
    pub ssid: String,
    pub password: String,
    pub permanent: bool,
}

/// Reply of `POST /api/wifi-config`: the provisioning script's exit code
/// and captured output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WifiConfigResponse {
    pub exit_code: i32,
    #[serde(default)]
    pub output: String,
}

/// Interpretation of the provisioning script's exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WifiConfigOutcome {
    /// Connected and saved.
    Applied,
    /// Connection, packet, or server failure.
    Failed,
    /// Credentials stored but activation failed (likely a bad password).
    ActivationFailed,
    /// Credentials stored but the network was unreachable.
    ConnectionFailed,
    /// Exit code outside the documented set.
    Unknown(i32),
}

impl WifiConfigResponse {
    pub fn outcome(&self) -> WifiConfigOutcome {
        match self.exit_code {
            0 => WifiConfigOutcome::Applied,
            1 => WifiConfigOutcome::Failed,
            100 => WifiConfigOutcome::ActivationFailed,
            101 => WifiConfigOutcome::ConnectionFailed,
            other => WifiConfigOutcome::Unknown(other),
        }
    }
}

impl WifiConfigOutcome {
    pub fn describe(self) -> String {
        match self {
            Self::Applied => "WiFi connected and configuration saved".into(),
            Self::Failed => "General failure (connection, invalid packet, or server error)".into(),
            Self::ActivationFailed => {
                "SSID/password updated but activation failed (likely bad password)".into()
            }
            Self::ConnectionFailed => {
                "SSID/password updated but WiFi connection failed (bad/unreachable SSID or timeout)"
                    .into()
            }
            Self::Unknown(code) => format!("Unknown result: exit code {code}"),
        }
    }
}

// ── Helpers ──────────────────────────────────────────────────────────

/// Convert fractional epoch seconds to a UTC timestamp (millisecond precision).
#[allow(clippy::cast_possible_truncation, clippy::as_conversions)]
pub fn epoch_to_datetime(secs: f64) -> Option<DateTime<Utc>> {
    if !secs.is_finite() {
        return None;
    }
    DateTime::from_timestamp_millis((secs * 1000.0).round() as i64)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn power_request_omits_missing_auxiliary_port() {
        let req = PowerRequest {
            port: 2,
            action: PowerAction::On,
            auxiliary_port: None,
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json, serde_json::json!({"port": 2, "action": "on"}));
    }

    #[test]
    fn schedule_time_accepts_fractional_seconds() {
        let resp: ScheduleResponse =
            serde_json::from_str(r#"{"success": true, "scheduled_time": 1700000000.75}"#).unwrap();
        let at = resp.scheduled_at().unwrap();
        assert_eq!(at.timestamp(), 1_700_000_000);
        assert_eq!(at.timestamp_subsec_millis(), 750);
    }

    #[test]
    fn null_schedule_means_none() {
        let resp: ScheduleResponse =
            serde_json::from_str(r#"{"success": true, "scheduled_time": null}"#).unwrap();
        assert!(resp.scheduled_at().is_none());
    }

    #[test]
    fn wifi_exit_codes_map_to_outcomes() {
        let outcome = |code| {
            WifiConfigResponse {
                exit_code: code,
                output: String::new(),
            }
            .outcome()
        };
        assert_eq!(outcome(0), WifiConfigOutcome::Applied);
        assert_eq!(outcome(100), WifiConfigOutcome::ActivationFailed);
        assert_eq!(outcome(101), WifiConfigOutcome::ConnectionFailed);
        assert_eq!(outcome(7), WifiConfigOutcome::Unknown(7));
    }
}
