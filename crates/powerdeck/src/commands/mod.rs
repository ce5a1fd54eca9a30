//! Command dispatch: bridges CLI args -> engine calls -> output formatting.

pub mod config_cmd;
pub mod internet;
pub mod schedule;
pub mod status;
pub mod util;
pub mod watch;
pub mod wifi;

use powerdeck_core::{Engine, EngineConfig};

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a server-bound command to the appropriate handler.
pub async fn dispatch(
    cmd: Command,
    config: EngineConfig,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Wifi(args) => wifi::handle(&config, args, global).await,
        Command::Internet(args) => internet::handle(&Engine::new(config)?, args, global).await,
        Command::Schedule(args) => schedule::handle(&Engine::new(config)?, args, global).await,
        Command::Status => status::handle(&Engine::new(config)?, global).await,
        Command::Watch => watch::handle(Engine::new(config)?, global).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => unreachable!(),
    }
}
