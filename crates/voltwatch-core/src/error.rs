// ── Core error types ──
//
// User-facing errors from voltwatch-core. Consumers classify failures by
// `ErrorKind` instead of matching on HTTP status codes or parse failures.
// The `From<voltwatch_api::Error>` impl translates transport-layer errors
// into that taxonomy.

use serde::Serialize;
use thiserror::Error;

/// Failure category surfaced to callers and published in poller state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, strum::Display, strum::AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    Auth,
    Connectivity,
    Endpoint,
    Server,
    Validation,
    Config,
    Storage,
    Cancelled,
    Superseded,
}

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    Auth { message: String },

    // ── Connectivity ─────────────────────────────────────────────────
    #[error("Server unreachable: {reason}")]
    Connectivity { reason: String },

    // ── Server responses ─────────────────────────────────────────────
    #[error("Endpoint not found: {message}")]
    Endpoint { message: String },

    #[error("Server error: {message}")]
    Server { status: Option<u16>, message: String },

    #[error("Invalid data: {message}")]
    Validation { message: String },

    // ── Local failures ───────────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Token storage error: {message}")]
    Storage { message: String },

    // ── Lifecycle ────────────────────────────────────────────────────
    #[error("Operation cancelled")]
    Cancelled,

    #[error("Query superseded by a newer request")]
    Superseded,
}

impl CoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Auth { .. } => ErrorKind::Auth,
            Self::Connectivity { .. } => ErrorKind::Connectivity,
            Self::Endpoint { .. } => ErrorKind::Endpoint,
            Self::Server { .. } => ErrorKind::Server,
            Self::Validation { .. } => ErrorKind::Validation,
            Self::Config { .. } => ErrorKind::Config,
            Self::Storage { .. } => ErrorKind::Storage,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::Superseded => ErrorKind::Superseded,
        }
    }

    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<voltwatch_api::Error> for CoreError {
    fn from(err: voltwatch_api::Error) -> Self {
        use voltwatch_api::Error as Api;

        match err {
            Api::Authentication { message } => CoreError::Auth { message },
            Api::Http {
                status: 401,
                message,
            } => CoreError::Auth { message },
            Api::Http {
                status: 404,
                message,
            } => CoreError::Endpoint { message },
            Api::Http { status, message } => CoreError::Server {
                status: Some(status),
                message,
            },
            Api::Deserialization { message, .. } => CoreError::Server {
                status: None,
                message: format!("malformed response: {message}"),
            },
            Api::Connectivity { attempts, reason } => CoreError::Connectivity {
                reason: format!("{reason} (after {attempts} attempt(s))"),
            },
            e @ (Api::Transport(_) | Api::Timeout { .. }) => CoreError::Connectivity {
                reason: e.to_string(),
            },
            Api::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            Api::Tls(msg) => CoreError::Config {
                message: format!("TLS error: {msg}"),
            },
            Api::Cancelled => CoreError::Cancelled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_map_to_taxonomy() {
        let auth: CoreError = voltwatch_api::Error::Http {
            status: 401,
            message: "expired".into(),
        }
        .into();
        assert_eq!(auth.kind(), ErrorKind::Auth);

        let missing: CoreError = voltwatch_api::Error::Http {
            status: 404,
            message: "Not found".into(),
        }
        .into();
        assert_eq!(missing.kind(), ErrorKind::Endpoint);

        let forbidden: CoreError = voltwatch_api::Error::Http {
            status: 403,
            message: "nope".into(),
        }
        .into();
        assert_eq!(forbidden.kind(), ErrorKind::Server);
    }

    #[test]
    fn exhausted_retries_are_connectivity() {
        let err: CoreError = voltwatch_api::Error::Connectivity {
            attempts: 4,
            reason: "connection refused".into(),
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::Connectivity);
        assert!(err.to_string().contains("4 attempt"));
    }

    #[test]
    fn kind_displays_snake_case() {
        assert_eq!(ErrorKind::Superseded.to_string(), "superseded");
        assert_eq!(ErrorKind::Auth.as_ref(), "auth");
    }
}
