//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError`, `ConfigError`, and API errors into user-facing errors
//! with actionable help text and stable exit codes.

use miette::Diagnostic;
use thiserror::Error;

use powerdeck_config::ConfigError;
use powerdeck_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not reach the dashboard server: {reason}")]
    #[diagnostic(
        code(powerdeck::connection_failed),
        help(
            "Check that the dashboard server is running and reachable.\n\
             Override the address with --server, or use --insecure (-k) for self-signed TLS."
        )
    )]
    ConnectionFailed { reason: String },

    #[error("Request timed out after {seconds}s")]
    #[diagnostic(
        code(powerdeck::timeout),
        help("Increase the timeout with --timeout or check the server's responsiveness.")
    )]
    Timeout { seconds: u64 },

    // ── Resources ────────────────────────────────────────────────────
    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(powerdeck::not_found),
        help("Run: powerdeck {list_command} to see what is available")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    // ── Server ───────────────────────────────────────────────────────
    #[error("Server rejected the request: {message}")]
    #[diagnostic(code(powerdeck::rejected))]
    Rejected { message: String },

    #[error("API error: {message}")]
    #[diagnostic(code(powerdeck::api_error))]
    ApiError { message: String, status: Option<u16> },

    #[error("{message}")]
    #[diagnostic(code(powerdeck::operation_failed))]
    OperationFailed { message: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(powerdeck::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(powerdeck::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: powerdeck config init"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("No dashboard server configured")]
    #[diagnostic(
        code(powerdeck::no_config),
        help(
            "Create a profile with: powerdeck config init\n\
             Or pass --server (POWERDECK_SERVER).\n\
             Expected config at: {path}"
        )
    )]
    NoConfig { path: String },

    #[error(transparent)]
    #[diagnostic(code(powerdeck::config))]
    Config(ConfigError),

    #[error("Engine has been shut down")]
    #[diagnostic(code(powerdeck::stopped))]
    Stopped,

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to render output: {0}")]
    #[diagnostic(code(powerdeck::render))]
    Render(String),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::NotFound { .. }
            | Self::ProfileNotFound { .. }
            | Self::ApiError {
                status: Some(404),
                ..
            } => exit_code::NOT_FOUND,
            Self::Validation { .. } | Self::NoConfig { .. } | Self::Config(_) => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { reason } => CliError::ConnectionFailed { reason },
            CoreError::Timeout { timeout_secs } => CliError::Timeout {
                seconds: timeout_secs,
            },
            CoreError::UnknownOption { id } => CliError::NotFound {
                resource_type: "connection option".into(),
                identifier: id,
                list_command: "internet options".into(),
            },
            CoreError::Rejected { message } => CliError::Rejected { message },
            CoreError::ValidationFailed { message } => CliError::Validation {
                field: "input".into(),
                reason: message,
            },
            CoreError::Api { message, status } => CliError::ApiError { message, status },
            CoreError::Config { message } => CliError::Validation {
                field: "config".into(),
                reason: message,
            },
            CoreError::EngineStopped => CliError::Stopped,
            CoreError::Internal(message) => CliError::OperationFailed { message },
        }
    }
}

impl From<powerdeck_api::Error> for CliError {
    fn from(err: powerdeck_api::Error) -> Self {
        CoreError::from(err).into()
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::Io(e) => CliError::Io(e),
            other => CliError::Config(other),
        }
    }
}
