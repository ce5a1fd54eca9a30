// ── Core error types ──
//
// Engine-level errors. Consumers never match on reqwest or serde failures
// directly: `From<powerdeck_api::Error>` folds transport-layer errors into
// the variants below.

use thiserror::Error;

/// Unified error type for the engine crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot reach dashboard server: {reason}")]
    ConnectionFailed { reason: String },

    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    // ── Data errors ──────────────────────────────────────────────────
    #[error("Unknown connection option: {id}")]
    UnknownOption { id: String },

    // ── Operation errors ─────────────────────────────────────────────
    #[error("Operation rejected by server: {message}")]
    Rejected { message: String },

    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },

    // ── API errors (wrapped, not exposed raw) ────────────────────────
    #[error("API error: {message}")]
    Api {
        message: String,
        /// HTTP status code (if applicable).
        status: Option<u16>,
    },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Lifecycle errors ─────────────────────────────────────────────
    #[error("Engine has been shut down")]
    EngineStopped,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Short text suitable for a `Failed{message}` phase.
    pub fn phase_message(&self) -> String {
        match self {
            Self::Rejected { message } | Self::Api { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<powerdeck_api::Error> for CoreError {
    fn from(err: powerdeck_api::Error) -> Self {
        let status = err.status();
        match err {
            powerdeck_api::Error::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout { timeout_secs: 0 }
                } else if e.is_connect() {
                    CoreError::ConnectionFailed {
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::Api {
                        message: e.to_string(),
                        status,
                    }
                }
            }
            powerdeck_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            powerdeck_api::Error::Timeout { timeout_secs } => CoreError::Timeout { timeout_secs },
            powerdeck_api::Error::Tls(msg) => CoreError::ConnectionFailed {
                reason: format!("TLS error: {msg}"),
            },
            powerdeck_api::Error::Http { message, .. } => CoreError::Api { message, status },
            powerdeck_api::Error::Deserialization { message, body: _ } => {
                CoreError::Internal(format!("Deserialization error: {message}"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_status_survives_conversion() {
        let err: CoreError = powerdeck_api::Error::Http {
            status: 502,
            message: "bad gateway".into(),
        }
        .into();
        assert!(matches!(err, CoreError::Api { status: Some(502), .. }));
        assert_eq!(err.phase_message(), "bad gateway");
    }

    #[test]
    fn api_timeout_keeps_duration() {
        let err: CoreError = powerdeck_api::Error::Timeout { timeout_secs: 10 }.into();
        assert_eq!(err.to_string(), "Request timed out after 10s");
    }
}
