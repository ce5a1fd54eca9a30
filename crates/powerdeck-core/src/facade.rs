// ── Engine facade ──
//
// The boundary the display layer talks to. Wires the orchestrator and the
// scheduler to shared collaborators, exposes snapshot reads and watch
// subscriptions, accepts selection events, and owns the background tasks
// (status poll, shutdown countdown).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::backend::HttpBackend;
use crate::config::EngineConfig;
use crate::device::{with_timeout, Clock, DeviceControl, ScheduleStore, SystemClock};
use crate::error::CoreError;
use crate::model::{
    ConnectionOption, DeviceStatusReport, PhaseSnapshot, ScheduleSelection, ScheduleSnapshot,
};
use crate::orchestrator::ConnectionOrchestrator;
use crate::scheduler::PowerScheduler;

/// A user selection event.
#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    /// Switch to the connection option with this id.
    Connection(String),
    /// Change the scheduled device's mode.
    Schedule(ScheduleSelection),
}

/// Result of [`Engine::select`].
#[derive(Debug, Clone, PartialEq)]
pub enum SelectionOutcome {
    /// The switch workflow started under this generation.
    Connection { generation: u64 },
    /// The schedule mode was applied.
    Schedule(ScheduleSnapshot),
}

/// Both countdowns the display layer may render.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RemainingTime {
    /// Seconds left in the connection initialization wait.
    pub initialization: Option<u64>,
    /// Seconds until the scheduled shutoff.
    pub shutdown: Option<u64>,
}

/// The main entry point for consumers.
///
/// Cheaply cloneable via `Arc<EngineInner>`. Usable without [`start`]
/// for one-shot commands; `start` adds the background tasks.
///
/// [`start`]: Self::start
#[derive(Clone)]
pub struct Engine {
    inner: Arc<EngineInner>,
}

struct EngineInner {
    config: EngineConfig,
    device: Arc<dyn DeviceControl>,
    orchestrator: ConnectionOrchestrator,
    scheduler: PowerScheduler,
    cancel: CancellationToken,
    started: AtomicBool,
    /// Set while the persisted schedule has not been read successfully.
    resync_pending: AtomicBool,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Engine {
    /// Build an engine talking to the dashboard server over HTTP.
    pub fn new(config: EngineConfig) -> Result<Self, CoreError> {
        let backend = Arc::new(HttpBackend::from_config(&config)?);
        Ok(Self::with_collaborators(
            config,
            backend.clone(),
            backend,
            Arc::new(SystemClock),
        ))
    }

    /// Build an engine over arbitrary collaborators.
    pub fn with_collaborators(
        config: EngineConfig,
        device: Arc<dyn DeviceControl>,
        store: Arc<dyn ScheduleStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let cancel = CancellationToken::new();
        let orchestrator = ConnectionOrchestrator::new(
            config.catalog.clone(),
            Arc::clone(&device),
            Arc::clone(&clock),
            config.request_timeout,
            cancel.clone(),
        );
        let scheduler = PowerScheduler::new(
            Arc::clone(&device),
            store,
            clock,
            config.scheduled_device.clone(),
            config.request_timeout,
        );

        Self {
            inner: Arc::new(EngineInner {
                config,
                device,
                orchestrator,
                scheduler,
                cancel,
                started: AtomicBool::new(false),
                resync_pending: AtomicBool::new(false),
                task_handles: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    pub fn options(&self) -> &[ConnectionOption] {
        self.inner.orchestrator.catalog().options()
    }

    pub fn orchestrator(&self) -> &ConnectionOrchestrator {
        &self.inner.orchestrator
    }

    pub fn scheduler(&self) -> &PowerScheduler {
        &self.inner.scheduler
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Resync the scheduler and spawn the background tasks.
    ///
    /// A failed resync is logged, not fatal: the status poll task retries
    /// it on every tick until one succeeds. Calling `start` twice is a no-op.
    pub async fn start(&self) -> Result<(), CoreError> {
        if self.inner.cancel.is_cancelled() {
            return Err(CoreError::EngineStopped);
        }
        if self.inner.started.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        if let Err(e) = self.inner.scheduler.resync().await {
            warn!(error = %e, "initial schedule resync failed");
            self.inner.resync_pending.store(true, Ordering::Release);
        }

        let mut handles = self.inner.task_handles.lock().await;

        let scheduler = self.inner.scheduler.clone();
        let cancel = self.inner.cancel.clone();
        handles.push(tokio::spawn(async move {
            scheduler.run_countdown(cancel).await;
        }));

        let interval = self.inner.config.status_poll_interval;
        if !interval.is_zero() {
            let engine = Arc::downgrade(&self.inner);
            let cancel = self.inner.cancel.clone();
            handles.push(tokio::spawn(status_poll_task(engine, interval, cancel)));
        }

        info!(server = %self.inner.config.server, "engine started");
        Ok(())
    }

    /// Cancel every workflow and background task, then join them.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();
        self.inner.orchestrator.shutdown().await;

        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            let _ = handle.await;
        }
        debug!("engine stopped");
    }

    // ── Reads ────────────────────────────────────────────────────────

    pub fn current_phase(&self) -> PhaseSnapshot {
        self.inner.orchestrator.snapshot()
    }

    pub fn schedule(&self) -> ScheduleSnapshot {
        self.inner.scheduler.snapshot()
    }

    pub fn remaining_seconds(&self) -> RemainingTime {
        RemainingTime {
            initialization: self.inner.orchestrator.snapshot().phase.remaining_secs(),
            shutdown: self.inner.scheduler.remaining_seconds(),
        }
    }

    pub fn phase_updates(&self) -> watch::Receiver<PhaseSnapshot> {
        self.inner.orchestrator.subscribe()
    }

    pub fn schedule_updates(&self) -> watch::Receiver<ScheduleSnapshot> {
        self.inner.scheduler.subscribe()
    }

    // ── Events ───────────────────────────────────────────────────────

    pub async fn select(&self, selection: Selection) -> Result<SelectionOutcome, CoreError> {
        if self.inner.cancel.is_cancelled() {
            return Err(CoreError::EngineStopped);
        }
        match selection {
            Selection::Connection(id) => {
                let generation = self.inner.orchestrator.select(&id)?;
                Ok(SelectionOutcome::Connection { generation })
            }
            Selection::Schedule(mode) => {
                let snapshot = self.inner.scheduler.select(mode).await?;
                Ok(SelectionOutcome::Schedule(snapshot))
            }
        }
    }

    /// Fetch, classify and distribute one device status report.
    ///
    /// The scheduler always sees it. The connection snapshot only records it
    /// when no workflow started or ran while the fetch was outstanding.
    pub async fn poll_status(&self) -> Result<DeviceStatusReport, CoreError> {
        let observed = self.inner.orchestrator.current_generation();
        let raw = with_timeout(
            self.inner.config.request_timeout,
            self.inner.device.device_status(),
        )
        .await?;

        let report = DeviceStatusReport::from_raw(&raw);
        debug!(
            running = report.running,
            ethernet_active = report.ethernet_active,
            "device status polled"
        );
        self.inner.scheduler.observe_status(report.clone());
        self.inner
            .orchestrator
            .apply_status_report(report.clone(), observed);
        Ok(report)
    }
}

// ── Background tasks ─────────────────────────────────────────────────

/// Periodically poll the scheduled device's status, retrying a failed
/// schedule resync first.
///
/// Holds the engine weakly; the task ends once every `Engine` is dropped.
async fn status_poll_task(
    engine: Weak<EngineInner>,
    interval: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.tick().await; // start() just resynced

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = ticker.tick() => {
                let Some(inner) = engine.upgrade() else {
                    break;
                };
                Engine { inner }.poll_tick().await;
            }
        }
    }
}

impl Engine {
    async fn poll_tick(&self) {
        if self.inner.resync_pending.load(Ordering::Acquire) {
            match self.inner.scheduler.resync().await {
                Ok(snapshot) => {
                    self.inner.resync_pending.store(false, Ordering::Release);
                    info!(selection = %snapshot.selection, "deferred schedule resync succeeded");
                }
                Err(e) => warn!(error = %e, "schedule resync retry failed"),
            }
        }
        if let Err(e) = self.poll_status().await {
            warn!(error = %e, "status poll failed");
        }
    }
}
