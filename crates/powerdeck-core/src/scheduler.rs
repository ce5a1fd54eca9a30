// ── Power scheduler ──
//
// A single scheduled auto-shutoff for the scheduled device. The absolute
// target lives in the external store; this module caches it, recomputes
// the remaining time from the wall clock every second (never decrements a
// counter), and fires the shutoff exactly once via a compare-and-take on
// the schedule cell.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::ScheduledDevice;
use crate::device::{with_timeout, Clock, DeviceControl, PowerCommand, ScheduleStore};
use crate::error::CoreError;
use crate::model::{
    DeviceStatusReport, ScheduleSelection, ScheduleSnapshot, SchedulePhase, ScheduledShutdown,
};

const TICK: Duration = Duration::from_secs(1);

/// What a single [`PowerScheduler::tick`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// No schedule is set.
    Inactive,
    /// Still counting; seconds left.
    Remaining(u64),
    /// The target was reached and this tick performed the shutoff.
    Fired,
}

/// Owner of the schedule cell.
///
/// Cheaply cloneable via `Arc<SchedulerInner>`.
#[derive(Clone)]
pub struct PowerScheduler {
    inner: Arc<SchedulerInner>,
}

struct SchedulerInner {
    device: Arc<dyn DeviceControl>,
    store: Arc<dyn ScheduleStore>,
    clock: Arc<dyn Clock>,
    scheduled_device: ScheduledDevice,
    request_timeout: Duration,
    state: watch::Sender<ScheduleSnapshot>,
    /// Target of the last shutoff that fired, so a resync racing the
    /// persisted delete cannot re-arm it.
    last_fired: Mutex<Option<DateTime<Utc>>>,
}

impl PowerScheduler {
    pub fn new(
        device: Arc<dyn DeviceControl>,
        store: Arc<dyn ScheduleStore>,
        clock: Arc<dyn Clock>,
        scheduled_device: ScheduledDevice,
        request_timeout: Duration,
    ) -> Self {
        let (state, _) = watch::channel(ScheduleSnapshot::default());
        Self {
            inner: Arc::new(SchedulerInner {
                device,
                store,
                clock,
                scheduled_device,
                request_timeout,
                state,
                last_fired: Mutex::new(None),
            }),
        }
    }

    pub fn scheduled_device(&self) -> &ScheduledDevice {
        &self.inner.scheduled_device
    }

    pub fn snapshot(&self) -> ScheduleSnapshot {
        self.inner.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ScheduleSnapshot> {
        self.inner.state.subscribe()
    }

    /// Seconds until the cached target, computed from the clock right now.
    pub fn remaining_seconds(&self) -> Option<u64> {
        let schedule = self.inner.state.borrow().schedule;
        schedule.map(|s| s.remaining_secs(self.inner.clock.now()))
    }

    // ── Schedule mutation ────────────────────────────────────────────

    /// Persist a shutoff `hours` from now and start counting down to it.
    ///
    /// Local state is untouched if the store rejects the write.
    pub async fn schedule_shutdown(&self, hours: f64) -> Result<DateTime<Utc>, CoreError> {
        validate_hours(hours)?;

        let target = with_timeout(self.inner.request_timeout, self.inner.store.store(hours)).await?;
        let shutdown = ScheduledShutdown {
            target,
            source_duration_hours: Some(hours),
        };
        let remaining = shutdown.remaining_secs(self.inner.clock.now());

        self.inner.state.send_modify(|s| {
            s.schedule = Some(shutdown);
            s.selection = ScheduleSelection::Timed { hours };
            s.phase = SchedulePhase::CountingDown;
            s.remaining_secs = remaining;
        });

        info!(hours, deadline = %target, remaining, "shutdown scheduled");
        Ok(target)
    }

    /// Delete the persisted schedule and stop counting. Idempotent.
    pub async fn cancel_schedule(&self) -> Result<(), CoreError> {
        with_timeout(self.inner.request_timeout, self.inner.store.clear()).await?;

        let mut had_schedule = false;
        self.inner.state.send_if_modified(|s| {
            had_schedule = s.schedule.take().is_some();
            if !had_schedule {
                return false;
            }
            s.remaining_secs = 0;
            s.phase = SchedulePhase::Inactive;
            if matches!(s.selection, ScheduleSelection::Timed { .. }) {
                s.selection = ScheduleSelection::Manual;
            }
            true
        });

        if had_schedule {
            info!("shutdown schedule cancelled");
        } else {
            debug!("no shutdown schedule to cancel");
        }
        Ok(())
    }

    // ── Countdown ────────────────────────────────────────────────────

    /// Recompute the remaining time and fire the shutoff once it hits zero.
    pub async fn tick(&self) -> Tick {
        let now = self.inner.clock.now();
        let Some(shutdown) = self.inner.state.borrow().schedule else {
            return Tick::Inactive;
        };

        if !shutdown.is_due(now) {
            let remaining = shutdown.remaining_secs(now);
            self.inner.state.send_if_modified(|s| {
                if s.schedule != Some(shutdown) || s.remaining_secs == remaining {
                    return false;
                }
                s.remaining_secs = remaining;
                true
            });
            return Tick::Remaining(remaining);
        }

        // Compare-and-take: only the tick that removes this exact target fires.
        // `last_fired` is recorded under the same channel lock so a resync
        // cannot re-arm the target in between.
        let taken = self.inner.state.send_if_modified(|s| {
            if s.schedule != Some(shutdown) {
                return false;
            }
            s.schedule = None;
            s.remaining_secs = 0;
            *self
                .inner
                .last_fired
                .lock()
                .unwrap_or_else(PoisonError::into_inner) = Some(shutdown.target);
            true
        });
        if !taken {
            return Tick::Inactive;
        }

        self.fire(shutdown).await;
        Tick::Fired
    }

    /// Tick once per second until `cancel` fires.
    pub async fn run_countdown(&self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(TICK);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    if self.tick().await == Tick::Fired {
                        debug!("countdown fired");
                    }
                }
            }
        }
    }

    async fn fire(&self, shutdown: ScheduledShutdown) {
        let device = &self.inner.scheduled_device;
        info!(deadline = %shutdown.target, device = %device.name, "scheduled shutdown reached");

        let powered_off = with_timeout(
            self.inner.request_timeout,
            self.inner.device.power(PowerCommand::off(device.port)),
        )
        .await;

        let (message, selection) = match powered_off {
            Ok(ack) if ack.success => (
                format!("{} powered off by schedule", device.name),
                ScheduleSelection::Off,
            ),
            Ok(ack) => {
                warn!(port = device.port, error = %ack.message, "scheduled power-off rejected");
                (
                    format!("Scheduled power-off of {} failed: {}", device.name, ack.message),
                    ScheduleSelection::Manual,
                )
            }
            Err(e) => {
                warn!(port = device.port, error = %e, "scheduled power-off failed");
                (
                    format!("Scheduled power-off of {} failed: {e}", device.name),
                    ScheduleSelection::Manual,
                )
            }
        };

        if let Err(e) = with_timeout(self.inner.request_timeout, self.inner.store.clear()).await {
            warn!(error = %e, "failed to clear persisted schedule after shutoff");
        }

        // A schedule set while the shutoff was in flight keeps its state.
        self.inner.state.send_if_modified(|s| {
            if s.schedule.is_some() {
                return false;
            }
            s.phase = SchedulePhase::Expired { message };
            s.selection = selection;
            true
        });
    }

    // ── Reconciliation ───────────────────────────────────────────────

    /// Rebuild local state from the store and the device status.
    ///
    /// Both are fetched concurrently. A persisted target restarts the
    /// countdown from the fresh value; otherwise the mode is derived from
    /// whether the device reports itself running.
    pub async fn resync(&self) -> Result<ScheduleSnapshot, CoreError> {
        let timeout = self.inner.request_timeout;
        let (schedule, status) = tokio::join!(
            with_timeout(timeout, self.inner.store.load()),
            with_timeout(timeout, self.inner.device.device_status()),
        );

        let report = match status {
            Ok(raw) => Some(DeviceStatusReport::from_raw(&raw)),
            Err(e) => {
                warn!(error = %e, "device status unavailable during resync");
                None
            }
        };

        let target = match schedule {
            Ok(target) => target,
            Err(e) => {
                if let Some(report) = report {
                    self.observe_status(report);
                }
                return Err(e);
            }
        };

        let now = self.inner.clock.now();

        self.inner.state.send_modify(|s| {
            // Read under the channel lock, the same one `tick` records it under.
            let last_fired = *self
                .inner
                .last_fired
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            let target = target.filter(|t| Some(*t) != last_fired);
            if let Some(report) = report {
                s.device_status = Some(report);
            }
            if let Some(target) = target {
                let hours = s
                    .schedule
                    .filter(|cached| cached.target == target)
                    .and_then(|cached| cached.source_duration_hours);
                let shutdown = ScheduledShutdown {
                    target,
                    source_duration_hours: hours,
                };
                let remaining = shutdown.remaining_secs(now);
                s.schedule = Some(shutdown);
                s.selection = ScheduleSelection::Timed {
                    hours: hours.unwrap_or_else(|| secs_to_hours(remaining)),
                };
                s.phase = SchedulePhase::CountingDown;
                s.remaining_secs = remaining;
            } else {
                s.schedule = None;
                s.remaining_secs = 0;
                if s.phase == SchedulePhase::CountingDown {
                    s.phase = SchedulePhase::Inactive;
                }
                s.selection = derive_selection(s.device_status.as_ref());
            }
        });

        let snapshot = self.snapshot();
        info!(
            selection = %snapshot.selection,
            remaining = snapshot.remaining_secs,
            "schedule resynced"
        );
        Ok(snapshot)
    }

    /// Record a polled status report; without a schedule, re-derive the mode.
    pub fn observe_status(&self, report: DeviceStatusReport) {
        self.inner.state.send_if_modified(|s| {
            let mut changed = s.device_status.as_ref() != Some(&report);
            if s.schedule.is_none() {
                let derived = ScheduleSelection::from_status(&report);
                if s.selection != derived {
                    debug!(from = %s.selection, to = %derived, "mode re-derived from status");
                    s.selection = derived;
                    changed = true;
                }
            }
            s.device_status = Some(report);
            changed
        });
    }

    // ── Mode selection ───────────────────────────────────────────────

    /// Apply a user-selected mode for the scheduled device.
    pub async fn select(
        &self,
        selection: ScheduleSelection,
    ) -> Result<ScheduleSnapshot, CoreError> {
        info!(%selection, "schedule mode selected");
        match selection {
            ScheduleSelection::Timed { hours } => {
                validate_hours(hours)?;
                self.switch(true).await?;
                self.schedule_shutdown(hours).await?;
            }
            ScheduleSelection::Manual => {
                self.switch(true).await?;
                self.cancel_schedule().await?;
                self.settle_mode(ScheduleSelection::Manual);
            }
            ScheduleSelection::Off => {
                self.cancel_schedule().await?;
                self.switch(false).await?;
                self.settle_mode(ScheduleSelection::Off);
            }
        }
        Ok(self.snapshot())
    }

    async fn switch(&self, on: bool) -> Result<(), CoreError> {
        let device = &self.inner.scheduled_device;
        let command = if on {
            PowerCommand::on(device.port, None)
        } else {
            PowerCommand::off(device.port)
        };
        let ack = with_timeout(self.inner.request_timeout, self.inner.device.power(command)).await?;
        if ack.success {
            debug!(port = device.port, on, "scheduled device switched");
            Ok(())
        } else {
            Err(CoreError::Rejected {
                message: ack.message,
            })
        }
    }

    fn settle_mode(&self, selection: ScheduleSelection) {
        self.inner.state.send_modify(|s| {
            s.selection = selection;
            s.phase = SchedulePhase::Inactive;
        });
    }
}

fn validate_hours(hours: f64) -> Result<(), CoreError> {
    if hours.is_finite() && hours > 0.0 {
        Ok(())
    } else {
        Err(CoreError::ValidationFailed {
            message: format!("shutdown delay must be a positive number of hours, got {hours}"),
        })
    }
}

fn derive_selection(report: Option<&DeviceStatusReport>) -> ScheduleSelection {
    report.map_or(ScheduleSelection::Off, ScheduleSelection::from_status)
}

fn secs_to_hours(secs: u64) -> f64 {
    f64::from(u32::try_from(secs).unwrap_or(u32::MAX)) / 3600.0
}
