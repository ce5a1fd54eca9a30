//! WiFi credential handler. Talks to the API client directly; the engine
//! has no state for this request.

use dialoguer::Password;
use serde::Serialize;

use powerdeck_api::{WifiConfigOutcome, WifiConfigRequest, WifiConfigResponse};
use powerdeck_core::{EngineConfig, HttpBackend};

use crate::cli::{GlobalOpts, WifiArgs, WifiCommand};
use crate::error::CliError;
use crate::output;

use super::util;

#[derive(Serialize)]
struct WifiView<'a> {
    ssid: &'a str,
    permanent: bool,
    outcome: WifiConfigOutcome,
    description: String,
    #[serde(flatten)]
    response: &'a WifiConfigResponse,
}

fn detail(v: &WifiView<'_>) -> String {
    let mut lines = vec![
        format!("SSID:      {}", v.ssid),
        format!("Permanent: {}", if v.permanent { "yes" } else { "no" }),
        format!("Exit code: {}", v.response.exit_code),
        format!("Result:    {}", v.description),
    ];
    let captured = v.response.output.trim();
    if !captured.is_empty() {
        lines.push(String::new());
        lines.push(captured.to_owned());
    }
    lines.join("\n")
}

pub async fn handle(
    config: &EngineConfig,
    args: WifiArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        WifiCommand::Configure {
            ssid,
            password,
            permanent,
        } => {
            if ssid.trim().is_empty() {
                return Err(CliError::Validation {
                    field: "ssid".into(),
                    reason: "SSID cannot be empty".into(),
                });
            }
            let password = match password {
                Some(p) => p,
                None => Password::new()
                    .with_prompt(format!("Password for {ssid}"))
                    .interact()
                    .map_err(util::prompt_err)?,
            };

            let backend = HttpBackend::from_config(config)?;
            let request = WifiConfigRequest {
                ssid,
                password,
                permanent,
            };
            let response = backend.client().configure_wifi(&request).await?;
            let outcome = response.outcome();
            tracing::info!(exit_code = response.exit_code, ?outcome, "WiFi configuration applied");

            let view = WifiView {
                ssid: &request.ssid,
                permanent,
                outcome,
                description: outcome.describe(),
                response: &response,
            };
            let out = output::render_single(global.output, &view, detail, |v| {
                v.response.exit_code.to_string()
            })?;
            output::print_output(&out, global.quiet);

            match outcome {
                WifiConfigOutcome::Applied => Ok(()),
                other => Err(CliError::OperationFailed {
                    message: other.describe(),
                }),
            }
        }
    }
}
