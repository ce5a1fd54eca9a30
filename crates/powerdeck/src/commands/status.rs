//! Device status handler.

use serde::Serialize;

use powerdeck_core::{DeviceStatusReport, Engine};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

#[derive(Serialize)]
struct StatusView<'a> {
    device: &'a str,
    #[serde(flatten)]
    report: &'a DeviceStatusReport,
}

fn detail(v: &StatusView<'_>, color: bool) -> String {
    [
        format!("Device:   {}", v.device),
        format!("Running:  {}", output::paint_flag(v.report.running, color)),
        format!(
            "Ethernet: {}",
            output::paint_flag(v.report.ethernet_active, color)
        ),
        format!("Message:  {}", v.report.raw_message.trim()),
    ]
    .join("\n")
}

pub async fn handle(engine: &Engine, global: &GlobalOpts) -> Result<(), CliError> {
    let report = engine.poll_status().await?;
    let color = output::should_color(global.color);
    let view = StatusView {
        device: &engine.scheduler().scheduled_device().name,
        report: &report,
    };
    let out = output::render_single(
        global.output,
        &view,
        |v| detail(v, color),
        |v| if v.report.running { "running" } else { "stopped" }.to_owned(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}
