//! Internet source command handlers.

use tabled::Tabled;
use tracing::debug;

use powerdeck_core::{
    ConnectionOption, ConnectionPhase, Engine, PhaseSnapshot, Selection, SelectionOutcome,
};

use crate::cli::{GlobalOpts, InternetArgs, InternetCommand};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct OptionRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Port")]
    port: String,
    #[tabled(rename = "Aux")]
    aux: String,
    #[tabled(rename = "Init Wait")]
    wait: String,
}

impl From<&ConnectionOption> for OptionRow {
    fn from(o: &ConnectionOption) -> Self {
        Self {
            id: o.id.clone(),
            name: o.display_name.clone(),
            port: if o.is_all_off() {
                "all off".into()
            } else {
                o.port.to_string()
            },
            aux: o.auxiliary_port.map(|p| p.to_string()).unwrap_or_default(),
            wait: if o.init_wait_secs == 0 {
                "-".into()
            } else {
                util::format_secs(o.init_wait_secs)
            },
        }
    }
}

fn phase_detail(s: &PhaseSnapshot, color: bool) -> String {
    let mut lines = vec![
        format!("Option:     {}", s.option_id.as_deref().unwrap_or("-")),
        format!("Phase:      {}", output::paint_phase(&s.phase, color)),
    ];
    if !s.status_line.is_empty() {
        lines.push(format!("Status:     {}", s.status_line));
    }
    if let Some(message) = s.phase.message() {
        lines.push(format!("Message:    {message}"));
    }
    lines.push(format!("Generation: {}", s.generation));
    lines.join("\n")
}

/// One spinner line per published snapshot.
fn progress_line(s: &PhaseSnapshot) -> String {
    match s.phase {
        ConnectionPhase::Initializing { remaining_secs } => {
            format!("{} {remaining_secs}s", s.status_line)
        }
        _ => s.status_line.clone(),
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    engine: &Engine,
    args: InternetArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        InternetCommand::Options => {
            let out = output::render_list(
                global.output,
                engine.options(),
                |o| OptionRow::from(o),
                |o| o.id.clone(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        InternetCommand::Select { id, no_wait } => {
            let outcome = engine.select(Selection::Connection(id)).await?;
            let SelectionOutcome::Connection { generation } = outcome else {
                return Err(CliError::OperationFailed {
                    message: "unexpected selection outcome".into(),
                });
            };
            debug!(generation, no_wait, "connection switch started");

            let snapshot = if no_wait {
                wait_for_power_ack(engine, generation).await?
            } else {
                follow(engine, generation, global).await?
            };
            render_phase(&snapshot, global)?;

            if snapshot.generation != generation {
                return Err(CliError::OperationFailed {
                    message: "selection was superseded by a newer one".into(),
                });
            }
            match snapshot.phase {
                ConnectionPhase::Failed { .. } => Err(CliError::OperationFailed {
                    message: snapshot.status_line,
                }),
                _ => Ok(()),
            }
        }
    }
}

/// Wait until the relay board has answered the power command.
///
/// The workflow runs inside this process, so whatever comes after this
/// point (countdown, connectivity test) is abandoned when the command exits.
async fn wait_for_power_ack(engine: &Engine, generation: u64) -> Result<PhaseSnapshot, CliError> {
    let mut updates = engine.phase_updates();
    let acked = updates
        .wait_for(|s| s.generation != generation || s.phase != ConnectionPhase::PoweringOn)
        .await
        .map(|s| PhaseSnapshot::clone(&s))
        .map_err(|_| CliError::Stopped)?;
    debug!(generation, phase = acked.phase.label(), "power command acknowledged");
    Ok(acked)
}

/// Drive the spinner from phase updates until `generation` settles.
async fn follow(
    engine: &Engine,
    generation: u64,
    global: &GlobalOpts,
) -> Result<PhaseSnapshot, CliError> {
    let spinner = util::spinner(global);
    let mut updates = engine.phase_updates();
    spinner.set_message(progress_line(&updates.borrow_and_update()));

    let settle = engine.orchestrator().wait_for_settle(generation);
    tokio::pin!(settle);

    let settled = loop {
        tokio::select! {
            result = &mut settle => break result,
            changed = updates.changed() => {
                if changed.is_err() {
                    break (&mut settle).await;
                }
                let line = progress_line(&updates.borrow_and_update());
                spinner.set_message(line);
            }
        }
    };

    spinner.finish_and_clear();
    settled.map_err(CliError::from)
}

fn render_phase(snapshot: &PhaseSnapshot, global: &GlobalOpts) -> Result<(), CliError> {
    let color = output::should_color(global.color);
    let out = output::render_single(
        global.output,
        snapshot,
        |s| phase_detail(s, color),
        |s| s.phase.label().to_owned(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}
