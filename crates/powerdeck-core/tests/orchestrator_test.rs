#![allow(clippy::unwrap_used)]
// Integration tests for the connection switch workflow.

mod common;

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use powerdeck_core::{
    ConnectionOption, ConnectionOrchestrator, ConnectionPhase, CoreError, DeviceStatusReport,
    OptionCatalog, PhaseSnapshot, PowerCommand,
};

use common::{FakeDevice, TokioClock};

// ── Helpers ─────────────────────────────────────────────────────────

fn orchestrator(device: &Arc<FakeDevice>) -> ConnectionOrchestrator {
    orchestrator_with_cancel(device, CancellationToken::new())
}

fn orchestrator_with_cancel(
    device: &Arc<FakeDevice>,
    cancel: CancellationToken,
) -> ConnectionOrchestrator {
    ConnectionOrchestrator::new(
        OptionCatalog::rig_default(),
        device.clone(),
        TokioClock::new(),
        Duration::from_secs(10),
        cancel,
    )
}

/// Record every published snapshot until a terminal phase shows up.
async fn run_to_terminal(rx: &mut watch::Receiver<PhaseSnapshot>) -> Vec<PhaseSnapshot> {
    let mut seen = vec![rx.borrow_and_update().clone()];
    while !seen.last().unwrap().phase.is_terminal() {
        rx.changed().await.unwrap();
        seen.push(rx.borrow_and_update().clone());
    }
    seen
}

// ── Happy path ──────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_starlink_end_to_end() {
    let device = Arc::new(FakeDevice::new());
    let orch = orchestrator(&device);
    let mut rx = orch.subscribe();

    let generation = orch.select("starlink").unwrap();
    let seen = run_to_terminal(&mut rx).await;

    assert_eq!(device.powers(), vec![PowerCommand::on(3, Some(6))]);
    assert_eq!(device.tests(), vec!["starlink".to_owned()]);

    let phases: Vec<ConnectionPhase> = seen.iter().map(|s| s.phase.clone()).collect();
    assert_eq!(phases.first(), Some(&ConnectionPhase::PoweringOn));

    let countdown: Vec<u64> = phases
        .iter()
        .filter_map(ConnectionPhase::remaining_secs)
        .collect();
    // One value per second. Zero is replaced by Testing within the same step,
    // so observers never see it.
    let expected: Vec<u64> = (1..=20).rev().collect();
    assert_eq!(countdown, expected);

    let testing = phases
        .iter()
        .filter(|p| **p == ConnectionPhase::Testing)
        .count();
    assert_eq!(testing, 1);

    let last = seen.last().unwrap();
    assert_eq!(
        last.phase,
        ConnectionPhase::Connected {
            message: "Connected - Internet Verified".into()
        }
    );
    assert_eq!(last.generation, generation);
    assert_eq!(last.option_id.as_deref(), Some("starlink"));
    assert_eq!(last.status_line, "Internet connection established via Starlink!");
}

#[tokio::test(start_paused = true)]
async fn test_powering_on_is_visible_immediately() {
    let device = Arc::new(FakeDevice::new());
    let orch = orchestrator(&device);

    let generation = orch.select("wifi").unwrap();
    let snap = orch.snapshot();

    assert_eq!(snap.generation, generation);
    assert_eq!(snap.phase, ConnectionPhase::PoweringOn);
    assert_eq!(snap.status_line, "Powering on WiFi (Port 2)...");
}

#[tokio::test(start_paused = true)]
async fn test_server_message_used_when_connected() {
    let device = Arc::new(FakeDevice::new());
    device.set_test_reply(true, true, "Ping 42ms");
    let orch = orchestrator(&device);

    let generation = orch.select("wired").unwrap();
    let settled = orch.wait_for_settle(generation).await.unwrap();

    assert_eq!(
        settled.phase,
        ConnectionPhase::Connected {
            message: "Ping 42ms".into()
        }
    );
}

#[tokio::test(start_paused = true)]
async fn test_all_off_skips_countdown_and_test() {
    let device = Arc::new(FakeDevice::new());
    let orch = orchestrator(&device);
    let mut rx = orch.subscribe();

    orch.select("none").unwrap();
    let seen = run_to_terminal(&mut rx).await;

    assert_eq!(device.powers(), vec![PowerCommand::all_off()]);
    assert!(device.tests().is_empty());
    assert!(seen.iter().all(|s| s.phase.remaining_secs().is_none()));

    let last = seen.last().unwrap();
    assert_eq!(last.phase, ConnectionPhase::Idle);
    assert_eq!(last.status_line, "All internet connections powered off");
}

#[tokio::test(start_paused = true)]
async fn test_zero_wait_goes_straight_to_testing() {
    let device = Arc::new(FakeDevice::new());
    let catalog = OptionCatalog::new(vec![ConnectionOption::new("lan", "LAN", 4, 0)]).unwrap();
    let orch = ConnectionOrchestrator::new(
        catalog,
        device.clone(),
        TokioClock::new(),
        Duration::from_secs(10),
        CancellationToken::new(),
    );
    let mut rx = orch.subscribe();

    orch.select("lan").unwrap();
    let seen = run_to_terminal(&mut rx).await;

    let phases: Vec<ConnectionPhase> = seen.iter().map(|s| s.phase.clone()).collect();
    assert_eq!(
        phases,
        vec![
            ConnectionPhase::PoweringOn,
            ConnectionPhase::Testing,
            ConnectionPhase::Connected {
                message: "Connected - Internet Verified".into()
            },
        ]
    );
    assert_eq!(device.powers(), vec![PowerCommand::on(4, None)]);
    assert_eq!(device.tests(), vec!["lan".to_owned()]);
}

// ── Failures ────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_power_rejection_fails_without_test() {
    let device = Arc::new(FakeDevice::new().reject_power("relay board offline"));
    let orch = orchestrator(&device);

    let generation = orch.select("wifi").unwrap();
    let settled = orch.wait_for_settle(generation).await.unwrap();

    assert_eq!(
        settled.phase,
        ConnectionPhase::Failed {
            message: "relay board offline".into()
        }
    );
    assert_eq!(
        settled.status_line,
        "Failed to connect via WiFi: relay board offline"
    );
    assert!(device.tests().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_power_transport_error_fails() {
    let device = Arc::new(FakeDevice::new().fail_power("connection refused"));
    let orch = orchestrator(&device);

    let generation = orch.select("cellular").unwrap();
    let settled = orch.wait_for_settle(generation).await.unwrap();

    let ConnectionPhase::Failed { message } = settled.phase else {
        panic!("expected Failed, got {:?}", settled.phase);
    };
    assert!(message.contains("connection refused"), "{message}");
}

#[tokio::test(start_paused = true)]
async fn test_slow_power_command_times_out() {
    let device = Arc::new(FakeDevice::new().with_power_delay(Duration::from_secs(30)));
    let orch = orchestrator(&device);

    let generation = orch.select("wifi").unwrap();
    let settled = orch.wait_for_settle(generation).await.unwrap();

    assert_eq!(
        settled.phase,
        ConnectionPhase::Failed {
            message: "Request timed out after 10s".into()
        }
    );
}

#[tokio::test(start_paused = true)]
async fn test_unverified_connectivity_is_partial() {
    let device = Arc::new(FakeDevice::new());
    device.set_test_reply(true, false, "DNS lookup failed");
    let orch = orchestrator(&device);

    let generation = orch.select("wifi").unwrap();
    let settled = orch.wait_for_settle(generation).await.unwrap();

    assert_eq!(
        settled.phase,
        ConnectionPhase::PartialConnectivity {
            message: "DNS lookup failed".into()
        }
    );
    assert_eq!(
        settled.status_line,
        "WiFi powered on, but internet connectivity could not be verified. DNS lookup failed"
    );
}

#[tokio::test(start_paused = true)]
async fn test_unsuccessful_connectivity_test_is_partial() {
    let device = Arc::new(FakeDevice::new());
    device.set_test_reply(false, false, "");
    let orch = orchestrator(&device);

    let generation = orch.select("wired").unwrap();
    let settled = orch.wait_for_settle(generation).await.unwrap();

    assert!(matches!(
        settled.phase,
        ConnectionPhase::PartialConnectivity { .. }
    ));
    assert_eq!(
        settled.status_line,
        "Wired powered on, but internet connectivity could not be verified."
    );
}

#[tokio::test(start_paused = true)]
async fn test_unknown_option_is_rejected() {
    let device = Arc::new(FakeDevice::new());
    let orch = orchestrator(&device);

    let result = orch.select("dialup");
    assert!(matches!(result, Err(CoreError::UnknownOption { ref id }) if id == "dialup"));
    assert_eq!(orch.current_generation(), 0);
    assert!(device.powers().is_empty());
}

// ── Supersession ────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_rapid_reselect_only_last_wins() {
    let device = Arc::new(FakeDevice::new());
    let orch = orchestrator(&device);

    let first = orch.select("wifi").unwrap();
    tokio::time::sleep(Duration::from_secs(3)).await;
    let second = orch.select("starlink").unwrap();
    let third = orch.select("cellular").unwrap();
    assert!(first < second && second < third);

    let mut rx = orch.subscribe();
    let seen = run_to_terminal(&mut rx).await;
    assert!(seen.iter().all(|s| s.generation == third));

    let settled = seen.last().unwrap().clone();
    assert_eq!(settled.option_id.as_deref(), Some("cellular"));
    assert!(matches!(settled.phase, ConnectionPhase::Connected { .. }));

    // Superseded workflows never write again.
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(orch.snapshot(), settled);

    // wifi was mid-countdown, starlink never got past its first check.
    assert_eq!(
        device.powers(),
        vec![PowerCommand::on(2, None), PowerCommand::on(1, None)]
    );
    assert_eq!(device.tests(), vec!["cellular".to_owned()]);
}

#[tokio::test(start_paused = true)]
async fn test_result_of_superseded_connectivity_test_is_dropped() {
    let device = Arc::new(FakeDevice::new().with_test_delay(Duration::from_secs(5)));
    let orch = orchestrator(&device);

    orch.select("wired").unwrap();
    tokio::time::sleep(Duration::from_secs(9)).await;
    assert_eq!(orch.snapshot().phase, ConnectionPhase::Testing);

    let off = orch.select("none").unwrap();
    let settled = orch.wait_for_settle(off).await.unwrap();
    assert_eq!(settled.phase, ConnectionPhase::Idle);

    // The wired connectivity test resolves after this, and must not surface.
    tokio::time::sleep(Duration::from_secs(10)).await;
    let snap = orch.snapshot();
    assert_eq!(snap.generation, off);
    assert_eq!(snap.phase, ConnectionPhase::Idle);
    assert_eq!(device.tests(), vec!["wired".to_owned()]);
}

#[tokio::test(start_paused = true)]
async fn test_wait_for_settle_reports_supersession() {
    let device = Arc::new(FakeDevice::new());
    let orch = orchestrator(&device);

    let first = orch.select("starlink").unwrap();
    let waiter = {
        let orch = orch.clone();
        tokio::spawn(async move { orch.wait_for_settle(first).await })
    };
    tokio::time::sleep(Duration::from_secs(2)).await;
    let second = orch.select("wired").unwrap();

    let snap = waiter.await.unwrap().unwrap();
    assert_eq!(snap.generation, second);
}

#[tokio::test(start_paused = true)]
async fn test_cancellation_stops_waiters() {
    let device = Arc::new(FakeDevice::new());
    let cancel = CancellationToken::new();
    let orch = orchestrator_with_cancel(&device, cancel.clone());

    let generation = orch.select("starlink").unwrap();
    tokio::time::sleep(Duration::from_secs(5)).await;
    cancel.cancel();

    let result = orch.wait_for_settle(generation).await;
    assert!(matches!(result, Err(CoreError::EngineStopped)));

    orch.shutdown().await;
    assert!(device.tests().is_empty());
}

// ── Status reconciliation ───────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_status_report_applied_only_when_idle() {
    let device = Arc::new(FakeDevice::new());
    let orch = orchestrator(&device);

    let report = DeviceStatusReport::from_raw("Plex is running");
    assert!(orch.apply_status_report(report.clone(), 0));
    assert_eq!(orch.snapshot().device_status, Some(report));

    let generation = orch.select("wifi").unwrap();
    let during = DeviceStatusReport::from_raw("ethernet: active");
    assert!(!orch.apply_status_report(during.clone(), generation));

    orch.wait_for_settle(generation).await.unwrap();
    assert!(orch.apply_status_report(during.clone(), generation));
    assert_eq!(orch.snapshot().device_status, Some(during));
}

#[tokio::test(start_paused = true)]
async fn test_status_report_from_before_selection_is_stale() {
    let device = Arc::new(FakeDevice::new());
    let orch = orchestrator(&device);

    let observed = orch.current_generation();
    let generation = orch.select("none").unwrap();
    orch.wait_for_settle(generation).await.unwrap();

    let report = DeviceStatusReport::from_raw("Plex is running");
    assert!(!orch.apply_status_report(report, observed));
    assert_eq!(orch.snapshot().device_status, None);
}
