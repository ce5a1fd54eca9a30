//! Scheduled device command handlers.

use serde::Serialize;

use powerdeck_core::{
    Engine, ScheduleSelection, ScheduleSnapshot, SchedulePhase, Selection, SelectionOutcome,
};

use crate::cli::{GlobalOpts, ScheduleArgs, ScheduleCommand};
use crate::error::CliError;
use crate::output;

use super::util;

/// Snapshot plus the device it concerns, for structured output.
#[derive(Serialize)]
struct ScheduleView<'a> {
    device: &'a str,
    port: u8,
    #[serde(flatten)]
    snapshot: &'a ScheduleSnapshot,
}

impl<'a> ScheduleView<'a> {
    fn new(engine: &'a Engine, snapshot: &'a ScheduleSnapshot) -> Self {
        let device = engine.scheduler().scheduled_device();
        Self {
            device: &device.name,
            port: device.port,
            snapshot,
        }
    }
}

fn phase_text(phase: &SchedulePhase) -> String {
    match phase {
        SchedulePhase::Inactive => "inactive".into(),
        SchedulePhase::CountingDown => "counting down".into(),
        SchedulePhase::Expired { message } => format!("expired ({message})"),
    }
}

fn detail(v: &ScheduleView<'_>, color: bool) -> String {
    let s = v.snapshot;
    let mut lines = vec![
        format!("Device:    {} (Port {})", v.device, v.port),
        format!("Mode:      {}", s.selection),
        format!("State:     {}", phase_text(&s.phase)),
    ];
    if let Some(schedule) = s.schedule {
        lines.push(format!("Remaining: {}", util::format_secs(s.remaining_secs)));
        lines.push(format!("Shutoff:   {}", util::format_local(schedule.target)));
    }
    if let Some(ref status) = s.device_status {
        lines.push(format!("Running:   {}", output::paint_flag(status.running, color)));
        lines.push(format!(
            "Ethernet:  {}",
            output::paint_flag(status.ethernet_active, color)
        ));
    }
    lines.join("\n")
}

fn render(
    engine: &Engine,
    snapshot: &ScheduleSnapshot,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let color = output::should_color(global.color);
    let view = ScheduleView::new(engine, snapshot);
    let out = output::render_single(
        global.output,
        &view,
        |v| detail(v, color),
        |v| v.snapshot.selection.to_string(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    engine: &Engine,
    args: ScheduleArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let selection = match args.command {
        ScheduleCommand::Show => {
            let snapshot = engine.scheduler().resync().await?;
            return render(engine, &snapshot, global);
        }
        ScheduleCommand::Set { hours } => ScheduleSelection::Timed { hours },
        ScheduleCommand::Manual => ScheduleSelection::Manual,
        ScheduleCommand::Off => ScheduleSelection::Off,
    };

    let snapshot = match engine.select(Selection::Schedule(selection)).await? {
        SelectionOutcome::Schedule(snapshot) => snapshot,
        SelectionOutcome::Connection { .. } => engine.schedule(),
    };
    render(engine, &snapshot, global)
}
