// ── Scheduled auto-shutoff ──

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::status::DeviceStatusReport;

/// A persisted shutoff target. The external store wins on conflict.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScheduledShutdown {
    /// Absolute UTC deadline.
    pub target: DateTime<Utc>,
    /// Duration the schedule was created with; unknown after a resync.
    pub source_duration_hours: Option<f64>,
}

impl ScheduledShutdown {
    /// Whole seconds until the target, rounded up and clamped at zero.
    pub fn remaining_secs(&self, now: DateTime<Utc>) -> u64 {
        let millis = (self.target - now).num_milliseconds();
        u64::try_from(millis).map_or(0, |m| m.div_ceil(1000))
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.remaining_secs(now) == 0
    }
}

/// The scheduled device's operating mode as the user picked it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ScheduleSelection {
    /// Powered off, no schedule.
    #[default]
    Off,
    /// Powered on with an auto-shutoff after `hours`.
    Timed { hours: f64 },
    /// Powered on until turned off.
    Manual,
}

impl ScheduleSelection {
    /// Mode implied by a status report when no schedule exists.
    pub fn from_status(report: &DeviceStatusReport) -> Self {
        if report.running { Self::Manual } else { Self::Off }
    }
}

impl std::fmt::Display for ScheduleSelection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Off => f.write_str("off"),
            Self::Timed { hours } => write!(f, "on for {hours}h"),
            Self::Manual => f.write_str("on (manual)"),
        }
    }
}

/// Countdown state of the scheduler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SchedulePhase {
    #[default]
    Inactive,
    CountingDown,
    /// The shutoff fired; `message` reports how the power-off went.
    Expired { message: String },
}

/// What the display layer reads for the scheduled-device page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ScheduleSnapshot {
    pub selection: ScheduleSelection,
    pub schedule: Option<ScheduledShutdown>,
    pub remaining_secs: u64,
    pub phase: SchedulePhase,
    pub device_status: Option<DeviceStatusReport>,
}
