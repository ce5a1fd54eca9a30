//! Clap derive structures for the `powerdeck` CLI.
//!
//! Defines the command tree, global flags, and shared types.

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// powerdeck -- switch internet sources and schedule device power
#[derive(Debug, Parser)]
#[command(
    name = "powerdeck",
    version,
    about = "Switch internet sources and schedule device power from the command line",
    long_about = "Drives a relay-controlled power board through its dashboard server.\n\n\
        Selects which internet source (cellular, WiFi, Starlink, wired) is powered,\n\
        waits for it to initialize, verifies connectivity, and manages a timed\n\
        auto-shutoff for one scheduled device.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Server profile to use
    #[arg(long, short = 'p', env = "POWERDECK_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Dashboard server URL (overrides profile)
    #[arg(long, short = 's', env = "POWERDECK_SERVER", global = true)]
    pub server: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "POWERDECK_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Accept self-signed TLS certificates
    #[arg(long, short = 'k', env = "POWERDECK_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds (overrides profile)
    #[arg(long, env = "POWERDECK_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Select and inspect internet sources
    #[command(alias = "net", alias = "i")]
    Internet(InternetArgs),

    /// Manage the scheduled device's power mode
    #[command(alias = "sched")]
    Schedule(ScheduleArgs),

    /// Show the scheduled device's classified status
    Status,

    /// Run the engine and stream connection and schedule changes
    Watch,

    /// Configure WiFi credentials on the server
    #[command(alias = "w")]
    Wifi(WifiArgs),

    /// Manage CLI configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Internet ─────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct InternetArgs {
    #[command(subcommand)]
    pub command: InternetCommand,
}

#[derive(Debug, Subcommand)]
pub enum InternetCommand {
    /// List the configured connection options
    #[command(alias = "ls")]
    Options,

    /// Switch to a connection option and verify connectivity
    Select {
        /// Option id (see `powerdeck internet options`)
        id: String,

        /// Return once the relay board acknowledges the power command. The
        /// initialization wait and connectivity test do not outlive the command.
        #[arg(long)]
        no_wait: bool,
    },
}

// ── Schedule ─────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ScheduleArgs {
    #[command(subcommand)]
    pub command: ScheduleCommand,
}

#[derive(Debug, Subcommand)]
pub enum ScheduleCommand {
    /// Show the current mode and countdown
    Show,

    /// Power the device on and shut it off after a number of hours
    Set {
        /// Hours until shutoff (fractions allowed, e.g. 1.5)
        hours: f64,
    },

    /// Power the device on with no shutoff
    Manual,

    /// Cancel any schedule and power the device off
    Off,
}

// ── WiFi ─────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct WifiArgs {
    #[command(subcommand)]
    pub command: WifiCommand,
}

#[derive(Debug, Subcommand)]
pub enum WifiCommand {
    /// Send new WiFi credentials to the server
    Configure {
        /// Network name
        #[arg(long)]
        ssid: String,

        /// Network password (prompted when omitted)
        #[arg(long, env = "POWERDECK_WIFI_PASSWORD", hide_env_values = true)]
        password: Option<String>,

        /// Persist the credentials across reboots
        #[arg(long)]
        permanent: bool,
    },
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Create initial config file with guided setup
    Init,

    /// Display current resolved configuration
    Show,

    /// Print the config file path
    Path,

    /// List configured profiles
    Profiles,

    /// Set the default profile
    Use {
        /// Profile name to set as default
        name: String,
    },
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
