// ── Device status reports ──

use serde::{Deserialize, Serialize};

use crate::reconciler::{self, StatusVerdict};

/// A classified status report for the scheduled device.
///
/// Derived from the server's free-text status on every fetch; never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceStatusReport {
    pub raw_message: String,
    pub running: bool,
    pub ethernet_active: bool,
}

impl DeviceStatusReport {
    pub fn from_raw(raw: &str) -> Self {
        let StatusVerdict {
            running,
            ethernet_active,
        } = reconciler::classify(raw);
        Self {
            raw_message: raw.to_owned(),
            running,
            ethernet_active,
        }
    }
}
