//! Config subcommand handlers.

use dialoguer::Input;

use powerdeck_config::{Profile, ScheduledDeviceConfig};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config;
use crate::error::CliError;
use crate::output;

use super::util::prompt_err;

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Init => init(global),

        ConfigCommand::Show => {
            let cfg = powerdeck_config::load_config()?;
            let out = output::render_single(
                global.output,
                &cfg,
                |c| toml::to_string_pretty(c).unwrap_or_else(|e| format!("# {e}\n{c:#?}")),
                |c| c.active_profile_name().to_owned(),
            )?;
            output::print_output(out.trim_end(), global.quiet);
            Ok(())
        }

        ConfigCommand::Path => {
            output::print_output(
                &powerdeck_config::config_path().display().to_string(),
                global.quiet,
            );
            Ok(())
        }

        ConfigCommand::Profiles => {
            let cfg = powerdeck_config::load_config()?;
            if cfg.profiles.is_empty() {
                eprintln!("No profiles configured. Run: powerdeck config init");
                return Ok(());
            }
            let default = cfg.active_profile_name();
            let mut names: Vec<&String> = cfg.profiles.keys().collect();
            names.sort_unstable();
            for name in names {
                let marker = if name == default { " *" } else { "" };
                println!("{name}{marker}");
            }
            Ok(())
        }

        ConfigCommand::Use { name } => {
            let mut cfg = powerdeck_config::load_config()?;
            if !cfg.profiles.contains_key(&name) {
                return Err(CliError::ProfileNotFound {
                    available: config::available_profiles(&cfg),
                    name,
                });
            }
            cfg.default_profile = Some(name.clone());
            powerdeck_config::save_config(&cfg)?;
            eprintln!("✓ Default profile set to '{name}'");
            Ok(())
        }
    }
}

// ── Init: interactive wizard ────────────────────────────────────────

fn init(global: &GlobalOpts) -> Result<(), CliError> {
    let config_path = powerdeck_config::config_path();
    eprintln!("powerdeck configuration wizard");
    eprintln!("   Config path: {}\n", config_path.display());

    let mut cfg = powerdeck_config::load_config().unwrap_or_default();

    let profile_name: String = Input::new()
        .with_prompt("Profile name")
        .default(config::active_profile_name(global, &cfg))
        .interact_text()
        .map_err(prompt_err)?;

    let server: String = Input::new()
        .with_prompt("Dashboard server URL")
        .default(
            global
                .server
                .clone()
                .unwrap_or_else(|| "http://192.168.2.177:8000".into()),
        )
        .validate_with(|input: &String| {
            powerdeck_config::parse_server_url(input)
                .map(|_| ())
                .map_err(|e| e.to_string())
        })
        .interact_text()
        .map_err(prompt_err)?;

    let defaults = ScheduledDeviceConfig::default();
    let device_name: String = Input::new()
        .with_prompt("Scheduled device name")
        .default(defaults.name)
        .interact_text()
        .map_err(prompt_err)?;

    let device_port: u8 = Input::new()
        .with_prompt("Scheduled device relay port")
        .default(defaults.port)
        .validate_with(|port: &u8| {
            if *port == 0 {
                Err("port 0 is reserved for \"all sources off\"")
            } else {
                Ok(())
            }
        })
        .interact_text()
        .map_err(prompt_err)?;

    let poll_secs: u64 = Input::new()
        .with_prompt("Status poll interval (seconds, 0 disables)")
        .default(30)
        .interact_text()
        .map_err(prompt_err)?;

    let profile = Profile {
        server,
        status_poll_secs: Some(poll_secs),
        scheduled_device: Some(ScheduledDeviceConfig {
            name: device_name,
            port: device_port,
        }),
        ..Profile::default()
    };
    // Reject anything the engine would refuse before writing it.
    powerdeck_config::profile_to_engine_config(&profile, &profile_name)?;

    cfg.profiles.insert(profile_name.clone(), profile);
    cfg.default_profile = Some(profile_name.clone());
    let written = powerdeck_config::save_config(&cfg)?;

    eprintln!("\n✓ Configuration written to {}", written.display());
    eprintln!("  Active profile: {profile_name}");
    eprintln!("\n  Test it: powerdeck status");
    Ok(())
}
