// ── Connection orchestrator ──
//
// Runs the source-switch workflow: power command, timed initialization
// wait, connectivity probe, classified result. Each selection gets a fresh
// generation; every phase write is a compare-and-set against that
// generation under the watch channel's lock, so a superseded workflow can
// keep running to its next suspension point without ever touching the
// published snapshot.
//
// Already-dispatched relay commands are not rolled back when a workflow is
// superseded. The relay board may briefly reflect a stale selection; the
// next workflow's POWER command corrects it.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cancel::{GenerationCounter, WorkflowToken};
use crate::device::{with_timeout, Clock, DeviceControl, PowerCommand};
use crate::error::CoreError;
use crate::model::{
    ConnectionOption, ConnectionPhase, DeviceStatusReport, OptionCatalog, PhaseSnapshot,
};

const DEFAULT_CONNECTED_MESSAGE: &str = "Connected - Internet Verified";
const COUNTDOWN_STEP: Duration = Duration::from_secs(1);

/// Owner of the connection phase cell and the switch workflows.
///
/// Cheaply cloneable via `Arc<OrchestratorInner>`.
#[derive(Clone)]
pub struct ConnectionOrchestrator {
    inner: Arc<OrchestratorInner>,
}

struct OrchestratorInner {
    catalog: OptionCatalog,
    device: Arc<dyn DeviceControl>,
    clock: Arc<dyn Clock>,
    counter: GenerationCounter,
    phase: watch::Sender<PhaseSnapshot>,
    request_timeout: Duration,
    cancel: CancellationToken,
    workflows: Mutex<Vec<JoinHandle<()>>>,
}

impl ConnectionOrchestrator {
    /// Workflows are cancelled when `cancel` is.
    pub fn new(
        catalog: OptionCatalog,
        device: Arc<dyn DeviceControl>,
        clock: Arc<dyn Clock>,
        request_timeout: Duration,
        cancel: CancellationToken,
    ) -> Self {
        let (phase, _) = watch::channel(PhaseSnapshot::initial(clock.now()));
        Self {
            inner: Arc::new(OrchestratorInner {
                catalog,
                device,
                clock,
                counter: GenerationCounter::with_parent(cancel.clone()),
                phase,
                request_timeout,
                cancel,
                workflows: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn catalog(&self) -> &OptionCatalog {
        &self.inner.catalog
    }

    pub fn snapshot(&self) -> PhaseSnapshot {
        self.inner.phase.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<PhaseSnapshot> {
        self.inner.phase.subscribe()
    }

    /// The most recently issued workflow generation.
    pub fn current_generation(&self) -> u64 {
        self.inner.counter.current()
    }

    // ── Selection ────────────────────────────────────────────────────

    /// Look up `option_id` in the catalog and start its workflow.
    pub fn select(&self, option_id: &str) -> Result<u64, CoreError> {
        let option = self
            .inner
            .catalog
            .get(option_id)
            .cloned()
            .ok_or_else(|| CoreError::UnknownOption {
                id: option_id.to_owned(),
            })?;
        Ok(self.select_option(option))
    }

    /// Supersede any running workflow and start one for `option`.
    ///
    /// Returns as soon as the new generation has published `PoweringOn`;
    /// the rest of the workflow runs on a spawned task.
    pub fn select_option(&self, option: ConnectionOption) -> u64 {
        let token = self.inner.counter.issue();
        let generation = token.generation();
        info!(generation, option = %option.id, port = option.port, "connection selected");

        let status_line = if option.is_all_off() {
            "Powering off all internet connections...".to_owned()
        } else {
            format!("Powering on {} (Port {})...", option.display_name, option.port)
        };
        self.inner.begin(&token, &option.id, status_line);

        let inner = Arc::clone(&self.inner);
        let handle = tokio::spawn(inner.run_workflow(option, token));

        let mut workflows = self
            .inner
            .workflows
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        workflows.retain(|h| !h.is_finished());
        workflows.push(handle);

        generation
    }

    // ── Reconciliation ───────────────────────────────────────────────

    /// Record a polled status report.
    ///
    /// Accepted only when no workflow is in flight and no selection happened
    /// since the poll started at `observed_generation`. Returns whether the
    /// snapshot changed.
    pub fn apply_status_report(
        &self,
        report: DeviceStatusReport,
        observed_generation: u64,
    ) -> bool {
        let now = self.inner.clock.now();
        let current = self.inner.counter.current();
        let applied = self.inner.phase.send_if_modified(|snap| {
            if snap.in_flight()
                || snap.generation != observed_generation
                || current != observed_generation
                || snap.device_status.as_ref() == Some(&report)
            {
                return false;
            }
            snap.device_status = Some(report);
            snap.updated_at = now;
            true
        });
        if !applied {
            debug!(observed_generation, current, "status report not applied");
        }
        applied
    }

    /// Resolve once `generation` reaches a terminal phase or is superseded.
    pub async fn wait_for_settle(&self, generation: u64) -> Result<PhaseSnapshot, CoreError> {
        let mut rx = self.inner.phase.subscribe();
        let settled = rx.wait_for(|snap| {
            snap.generation > generation
                || (snap.generation == generation && snap.phase.is_terminal())
        });

        tokio::select! {
            biased;
            result = settled => result
                .map(|snap| PhaseSnapshot::clone(&snap))
                .map_err(|_| CoreError::EngineStopped),
            () = self.inner.cancel.cancelled() => Err(CoreError::EngineStopped),
        }
    }

    /// Cancel the running workflow and join every workflow task.
    pub async fn shutdown(&self) {
        self.inner.counter.cancel_current();
        let handles: Vec<_> = std::mem::take(
            &mut *self
                .inner
                .workflows
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        );
        for handle in handles {
            let _ = handle.await;
        }
        debug!("orchestrator stopped");
    }
}

// ── Workflow ─────────────────────────────────────────────────────────

impl OrchestratorInner {
    /// First write of a generation: claim the snapshot.
    fn begin(&self, token: &WorkflowToken, option_id: &str, status_line: String) {
        let now = self.clock.now();
        let claimed = self.phase.send_if_modified(|snap| {
            if token.is_cancelled() {
                return false;
            }
            snap.generation = token.generation();
            snap.option_id = Some(option_id.to_owned());
            snap.phase = ConnectionPhase::PoweringOn;
            snap.status_line = status_line;
            snap.updated_at = now;
            true
        });
        if !claimed {
            debug!(generation = token.generation(), "selection superseded before it began");
        }
    }

    /// Generation-guarded phase write. `false` means the token lost.
    fn publish(&self, token: &WorkflowToken, phase: ConnectionPhase, status_line: String) -> bool {
        let now = self.clock.now();
        let written = self.phase.send_if_modified(|snap| {
            if token.is_cancelled() || snap.generation != token.generation() {
                return false;
            }
            snap.phase = phase;
            snap.status_line = status_line;
            snap.updated_at = now;
            true
        });
        if !written {
            debug!(generation = token.generation(), "suppressed stale phase write");
        }
        written
    }

    async fn run_workflow(self: Arc<Self>, option: ConnectionOption, token: WorkflowToken) {
        if token.is_cancelled() {
            return;
        }
        if option.is_all_off() {
            self.power_off_all(&token).await;
            return;
        }

        let name = option.display_name.as_str();
        let generation = token.generation();

        // Step 1: relay on
        let ack = with_timeout(
            self.request_timeout,
            self.device
                .power(PowerCommand::on(option.port, option.auxiliary_port)),
        )
        .await;
        if token.is_cancelled() {
            debug!(generation, "workflow superseded during power-on");
            return;
        }
        match ack {
            Ok(ack) if ack.success => {
                debug!(generation, port = option.port, "relay switched on");
            }
            Ok(ack) => {
                self.fail(&token, name, or_default(ack.message, "Failed to power on port"));
                return;
            }
            Err(e) => {
                self.fail(&token, name, e.phase_message());
                return;
            }
        }

        // Step 2: initialization countdown, skipped for a zero wait
        if option.init_wait_secs > 0 && !self.count_down(&token, &option).await {
            return;
        }

        // Step 3: connectivity probe
        if !self.publish(
            &token,
            ConnectionPhase::Testing,
            "Testing internet connectivity...".to_owned(),
        ) {
            return;
        }
        let result = with_timeout(
            self.request_timeout,
            self.device.test_connectivity(&option.id),
        )
        .await;
        if token.is_cancelled() {
            debug!(generation, "workflow superseded during connectivity test");
            return;
        }

        let (phase, status_line) = match result {
            Ok(report) if report.success && report.connected => (
                ConnectionPhase::Connected {
                    message: or_default(report.message, DEFAULT_CONNECTED_MESSAGE),
                },
                format!("Internet connection established via {name}!"),
            ),
            Ok(report) => {
                let line = format!(
                    "{name} powered on, but internet connectivity could not be verified. {}",
                    report.message
                );
                (
                    ConnectionPhase::PartialConnectivity {
                        message: report.message,
                    },
                    line.trim_end().to_owned(),
                )
            }
            Err(e) => {
                self.fail(&token, name, e.phase_message());
                return;
            }
        };

        let label = phase.label();
        if self.publish(&token, phase, status_line) {
            info!(generation, option = %option.id, phase = label, "connection workflow finished");
        }
    }

    /// Publish `Initializing` once per second from the option's wait down
    /// to zero. `false` means the token lost.
    async fn count_down(&self, token: &WorkflowToken, option: &ConnectionOption) -> bool {
        let waiting = format!("Waiting for {} to initialize...", option.display_name);
        let mut ticker = tokio::time::interval(COUNTDOWN_STEP);
        for remaining_secs in (0..=option.init_wait_secs).rev() {
            tokio::select! {
                biased;
                () = token.cancelled() => return false,
                _ = ticker.tick() => {}
            }
            let phase = ConnectionPhase::Initializing { remaining_secs };
            if !self.publish(token, phase, waiting.clone()) {
                return false;
            }
        }
        true
    }

    async fn power_off_all(&self, token: &WorkflowToken) {
        let ack = with_timeout(
            self.request_timeout,
            self.device.power(PowerCommand::all_off()),
        )
        .await;
        if token.is_cancelled() {
            return;
        }

        let (phase, status_line) = match ack {
            Ok(ack) if ack.success => (
                ConnectionPhase::Idle,
                "All internet connections powered off".to_owned(),
            ),
            Ok(ack) => {
                let message = or_default(ack.message, "Failed to power off ports");
                let line = format!("Failed to power off connections: {message}");
                (ConnectionPhase::Failed { message }, line)
            }
            Err(e) => {
                let message = e.phase_message();
                let line = format!("Failed to power off connections: {message}");
                (ConnectionPhase::Failed { message }, line)
            }
        };

        if let ConnectionPhase::Failed { message } = &phase {
            warn!(generation = token.generation(), error = %message, "power-off failed");
        } else {
            info!(generation = token.generation(), "all connections powered off");
        }
        self.publish(token, phase, status_line);
    }

    fn fail(&self, token: &WorkflowToken, name: &str, message: String) {
        warn!(
            generation = token.generation(),
            option = name,
            error = %message,
            "connection workflow failed"
        );
        let line = format!("Failed to connect via {name}: {message}");
        self.publish(token, ConnectionPhase::Failed { message }, line);
    }
}

fn or_default(message: String, fallback: &str) -> String {
    if message.trim().is_empty() {
        fallback.to_owned()
    } else {
        message
    }
}
