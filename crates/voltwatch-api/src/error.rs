use std::time::Duration;

use thiserror::Error;

/// Top-level error type for the `voltwatch-api` crate.
///
/// Covers every failure mode of the HTTP surface: authentication,
/// transport, timeouts, non-2xx responses and payload decoding.
/// `voltwatch-core` maps these into the user-facing taxonomy.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// Login rejected or the login response carried no token.
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// A single attempt exceeded the hard request timeout.
    #[error("Request timed out after {timeout:?}")]
    Timeout { timeout: Duration },

    /// Every attempt failed with a transient error.
    #[error("Server unreachable after {attempts} attempt(s): {reason}")]
    Connectivity { attempts: u32, reason: String },

    /// TLS setup or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Responses ───────────────────────────────────────────────────
    /// Non-2xx response. `message` comes from the error body when present.
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },

    // ── Lifecycle ───────────────────────────────────────────────────
    /// The caller cancelled the request (poller stopped, query superseded).
    #[error("Request cancelled")]
    Cancelled,
}

impl Error {
    /// Returns `true` if this error indicates the bearer token is no
    /// longer accepted and re-authentication might resolve it.
    pub fn is_auth_expired(&self) -> bool {
        matches!(
            self,
            Self::Authentication { .. } | Self::Http { status: 401, .. }
        )
    }

    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => {
                e.is_timeout() || e.is_connect() || e.is_request() || e.is_body()
            }
            Self::Timeout { .. } => true,
            _ => false,
        }
    }

    /// Returns `true` if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Transport(e) => e.status() == Some(reqwest::StatusCode::NOT_FOUND),
            Self::Http { status: 404, .. } => true,
            _ => false,
        }
    }

    /// HTTP status code, if the failure carried one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_401_counts_as_expired_auth() {
        let err = Error::Http {
            status: 401,
            message: "token expired".into(),
        };
        assert!(err.is_auth_expired());
        assert!(!err.is_transient());
        assert_eq!(err.status(), Some(401));
    }

    #[test]
    fn timeout_is_transient_but_http_errors_are_not() {
        let timeout = Error::Timeout {
            timeout: Duration::from_secs(30),
        };
        assert!(timeout.is_transient());

        let server = Error::Http {
            status: 503,
            message: "unavailable".into(),
        };
        assert!(!server.is_transient());
        assert!(!server.is_not_found());
    }

    #[test]
    fn not_found_is_detected_from_status() {
        let err = Error::Http {
            status: 404,
            message: "Not found".into(),
        };
        assert!(err.is_not_found());
    }
}
