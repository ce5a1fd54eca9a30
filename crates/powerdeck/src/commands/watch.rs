//! `watch`: run the engine's background tasks and stream state changes.
//!
//! Table and plain output print one line per change. JSON output is one
//! compact object per line, YAML one document per change.

use chrono::Local;
use serde::Serialize;

use powerdeck_core::{Engine, PhaseSnapshot, ScheduleSnapshot, SchedulePhase};

use crate::cli::{GlobalOpts, OutputFormat};
use crate::error::CliError;
use crate::output;

use super::util;

#[derive(Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum Event<'a> {
    Connection(&'a PhaseSnapshot),
    Schedule(&'a ScheduleSnapshot),
}

/// The per-second countdown tick alone is not worth a line.
fn schedule_changed(prev: &ScheduleSnapshot, next: &ScheduleSnapshot) -> bool {
    prev.selection != next.selection
        || prev.schedule != next.schedule
        || prev.phase != next.phase
        || prev.device_status != next.device_status
}

fn event_line(event: &Event<'_>, color: bool) -> String {
    let now = Local::now().format("%H:%M:%S");
    match event {
        Event::Connection(s) => {
            let option = s.option_id.as_deref().unwrap_or("-");
            let phase = output::paint_phase(&s.phase, color);
            format!("{now}  connection  {option}  {phase}  {}", s.status_line)
                .trim_end()
                .to_owned()
        }
        Event::Schedule(s) => {
            let mut line = format!("{now}  schedule    {}", s.selection);
            match s.phase {
                SchedulePhase::CountingDown => {
                    line.push_str(&format!(
                        "  {} left",
                        util::format_secs(s.remaining_secs)
                    ));
                }
                SchedulePhase::Expired { ref message } => {
                    line.push_str(&format!("  {message}"));
                }
                SchedulePhase::Inactive => {}
            }
            if let Some(ref status) = s.device_status {
                let state = if status.running { "running" } else { "stopped" };
                line.push_str(&format!("  ({state})"));
            }
            line
        }
    }
}

fn emit(event: &Event<'_>, global: &GlobalOpts, color: bool) -> Result<(), CliError> {
    let out = match global.output {
        OutputFormat::Table | OutputFormat::Plain => event_line(event, color),
        OutputFormat::Json | OutputFormat::JsonCompact => output::render_event(event)?,
        OutputFormat::Yaml => format!(
            "---\n{}",
            serde_yaml::to_string(event).map_err(|e| CliError::Render(e.to_string()))?
        ),
    };
    output::print_output(out.trim_end(), global.quiet);
    Ok(())
}

pub async fn handle(engine: Engine, global: &GlobalOpts) -> Result<(), CliError> {
    let color = output::should_color(global.color);
    engine.start().await?;

    if !global.quiet && matches!(global.output, OutputFormat::Table) {
        eprintln!(
            "Watching {}. Press Ctrl-C to stop.",
            engine.config().server
        );
    }

    let mut phases = engine.phase_updates();
    let mut schedules = engine.schedule_updates();

    let mut last_schedule = schedules.borrow_and_update().clone();
    emit(&Event::Schedule(&last_schedule), global, color)?;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let result = loop {
        tokio::select! {
            signal = &mut ctrl_c => break signal.map_err(CliError::from),
            changed = phases.changed() => {
                if changed.is_err() {
                    break Ok(());
                }
                let snapshot = phases.borrow_and_update().clone();
                if let Err(e) = emit(&Event::Connection(&snapshot), global, color) {
                    break Err(e);
                }
            }
            changed = schedules.changed() => {
                if changed.is_err() {
                    break Ok(());
                }
                let snapshot = schedules.borrow_and_update().clone();
                if schedule_changed(&last_schedule, &snapshot) {
                    if let Err(e) = emit(&Event::Schedule(&snapshot), global, color) {
                        break Err(e);
                    }
                }
                last_schedule = snapshot;
            }
        }
    };

    tracing::debug!("watch stopping");
    engine.shutdown().await;
    result
}
