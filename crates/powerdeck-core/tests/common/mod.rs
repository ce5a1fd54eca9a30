// Shared fakes for engine integration tests.
//
// Every delay goes through `tokio::time`, so tests run under
// `start_paused = true` and finish instantly.

#![allow(dead_code, clippy::unwrap_used, clippy::as_conversions, clippy::cast_possible_truncation)]

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};

use powerdeck_core::{
    Clock, CommandAck, ConnectivityReport, CoreError, DeviceControl, PowerCommand, ScheduleStore,
};

// ── Clock ───────────────────────────────────────────────────────────

/// Wall clock that advances with tokio's (pausable) clock.
pub struct TokioClock {
    base: DateTime<Utc>,
    start: tokio::time::Instant,
}

impl TokioClock {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            base: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
            start: tokio::time::Instant::now(),
        })
    }
}

impl Clock for TokioClock {
    fn now(&self) -> DateTime<Utc> {
        self.base + TimeDelta::from_std(self.start.elapsed()).unwrap()
    }
}

// ── Device ──────────────────────────────────────────────────────────

pub struct FakeDevice {
    pub power_calls: Mutex<Vec<PowerCommand>>,
    pub test_calls: Mutex<Vec<String>>,
    pub status_calls: AtomicUsize,
    power_delay: Duration,
    test_delay: Duration,
    power_reply: Mutex<Result<CommandAck, String>>,
    test_reply: Mutex<Result<ConnectivityReport, String>>,
    status_text: Mutex<String>,
}

impl FakeDevice {
    pub fn new() -> Self {
        Self {
            power_calls: Mutex::new(Vec::new()),
            test_calls: Mutex::new(Vec::new()),
            status_calls: AtomicUsize::new(0),
            power_delay: Duration::from_millis(50),
            test_delay: Duration::from_millis(500),
            power_reply: Mutex::new(Ok(CommandAck {
                success: true,
                message: String::new(),
            })),
            test_reply: Mutex::new(Ok(ConnectivityReport {
                success: true,
                connected: true,
                message: String::new(),
            })),
            status_text: Mutex::new("Plex Media Server is running. Ethernet: active".into()),
        }
    }

    pub fn with_power_delay(mut self, delay: Duration) -> Self {
        self.power_delay = delay;
        self
    }

    pub fn with_test_delay(mut self, delay: Duration) -> Self {
        self.test_delay = delay;
        self
    }

    pub fn reject_power(self, message: &str) -> Self {
        *self.power_reply.lock().unwrap() = Ok(CommandAck {
            success: false,
            message: message.into(),
        });
        self
    }

    pub fn fail_power(self, message: &str) -> Self {
        *self.power_reply.lock().unwrap() = Err(message.into());
        self
    }

    pub fn set_test_reply(&self, success: bool, connected: bool, message: &str) {
        *self.test_reply.lock().unwrap() = Ok(ConnectivityReport {
            success,
            connected,
            message: message.into(),
        });
    }

    pub fn set_status(&self, text: &str) {
        *self.status_text.lock().unwrap() = text.into();
    }

    pub fn powers(&self) -> Vec<PowerCommand> {
        self.power_calls.lock().unwrap().clone()
    }

    pub fn tests(&self) -> Vec<String> {
        self.test_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl DeviceControl for FakeDevice {
    async fn power(&self, command: PowerCommand) -> Result<CommandAck, CoreError> {
        self.power_calls.lock().unwrap().push(command);
        tokio::time::sleep(self.power_delay).await;
        self.power_reply
            .lock()
            .unwrap()
            .clone()
            .map_err(|reason| CoreError::ConnectionFailed { reason })
    }

    async fn test_connectivity(&self, option_id: &str) -> Result<ConnectivityReport, CoreError> {
        self.test_calls.lock().unwrap().push(option_id.to_owned());
        tokio::time::sleep(self.test_delay).await;
        self.test_reply
            .lock()
            .unwrap()
            .clone()
            .map_err(|reason| CoreError::ConnectionFailed { reason })
    }

    async fn device_status(&self) -> Result<String, CoreError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.status_text.lock().unwrap().clone())
    }
}

// ── Schedule store ──────────────────────────────────────────────────

pub struct FakeStore {
    clock: Arc<TokioClock>,
    pub target: Mutex<Option<DateTime<Utc>>>,
    pub loads: AtomicUsize,
    pub stores: AtomicUsize,
    pub clears: AtomicUsize,
    failing_loads: AtomicUsize,
    reject_store: bool,
    fail_clear: bool,
    sticky: bool,
}

impl FakeStore {
    pub fn new(clock: Arc<TokioClock>) -> Self {
        Self {
            clock,
            target: Mutex::new(None),
            loads: AtomicUsize::new(0),
            stores: AtomicUsize::new(0),
            clears: AtomicUsize::new(0),
            failing_loads: AtomicUsize::new(0),
            reject_store: false,
            fail_clear: false,
            sticky: false,
        }
    }

    pub fn rejecting(mut self) -> Self {
        self.reject_store = true;
        self
    }

    /// Fail the next `count` loads with a connection error.
    pub fn failing_loads(self, count: usize) -> Self {
        self.failing_loads.store(count, Ordering::SeqCst);
        self
    }

    /// Fail every delete, keeping the persisted target.
    pub fn failing_clears(mut self) -> Self {
        self.fail_clear = true;
        self
    }

    /// Acknowledge deletes without forgetting the target.
    pub fn sticky(mut self) -> Self {
        self.sticky = true;
        self
    }

    /// Pretend a previous session persisted a target `secs` from now.
    pub fn persist_in(&self, secs: i64) {
        *self.target.lock().unwrap() = Some(self.clock.now() + TimeDelta::seconds(secs));
    }

    pub fn persisted(&self) -> Option<DateTime<Utc>> {
        *self.target.lock().unwrap()
    }
}

#[async_trait]
impl ScheduleStore for FakeStore {
    async fn load(&self) -> Result<Option<DateTime<Utc>>, CoreError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        let failing = self
            .failing_loads
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(CoreError::ConnectionFailed {
                reason: "schedule store unreachable".into(),
            });
        }
        Ok(self.persisted())
    }

    async fn store(&self, hours: f64) -> Result<DateTime<Utc>, CoreError> {
        if self.reject_store {
            return Err(CoreError::Rejected {
                message: "disk full".into(),
            });
        }
        self.stores.fetch_add(1, Ordering::SeqCst);
        let target = self.clock.now() + TimeDelta::milliseconds((hours * 3_600_000.0) as i64);
        *self.target.lock().unwrap() = Some(target);
        Ok(target)
    }

    async fn clear(&self) -> Result<(), CoreError> {
        self.clears.fetch_add(1, Ordering::SeqCst);
        if self.fail_clear {
            return Err(CoreError::ConnectionFailed {
                reason: "schedule store unreachable".into(),
            });
        }
        if !self.sticky {
            *self.target.lock().unwrap() = None;
        }
        Ok(())
    }
}
