//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text and process exit codes.

use miette::Diagnostic;
use thiserror::Error;

use voltwatch_config::ConfigError;
use voltwatch_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
    pub const INTERRUPTED: i32 = 130;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not reach the energy server")]
    #[diagnostic(
        code(voltwatch::connection_failed),
        help(
            "{reason}\n\
             Check that the server is running and reachable, or raise --timeout."
        )
    )]
    ConnectionFailed { reason: String },

    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(voltwatch::auth_failed),
        help(
            "Verify the username and password for this profile.\n\
             Store a new password with: voltwatch config set-password"
        )
    )]
    AuthFailed { message: String },

    #[error("No password configured for profile '{profile}'")]
    #[diagnostic(
        code(voltwatch::no_credentials),
        help(
            "Configure credentials with: voltwatch config init\n\
             Or set the VOLTWATCH_PASSWORD environment variable."
        )
    )]
    NoCredentials { profile: String },

    // ── Server responses ─────────────────────────────────────────────
    #[error("Endpoint not found: {message}")]
    #[diagnostic(
        code(voltwatch::endpoint_not_found),
        help("Check the server URL and the device id (--device).")
    )]
    EndpointNotFound { message: String },

    #[error("{}", server_error_message(*status, message))]
    #[diagnostic(code(voltwatch::server_error))]
    ServerError { status: Option<u16>, message: String },

    #[error("Invalid data: {message}")]
    #[diagnostic(code(voltwatch::invalid_data))]
    InvalidData { message: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(voltwatch::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(voltwatch::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: voltwatch config init"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("Configuration file not found")]
    #[diagnostic(
        code(voltwatch::no_config),
        help(
            "Create one with: voltwatch config init\n\
             Or pass --url / set VOLTWATCH_URL.\n\
             Expected at: {path}"
        )
    )]
    NoConfig { path: String },

    #[error(transparent)]
    #[diagnostic(code(voltwatch::config))]
    Config(Box<figment::Error>),

    #[error("{message}")]
    #[diagnostic(code(voltwatch::storage))]
    Storage { message: String },

    // ── Lifecycle ────────────────────────────────────────────────────
    #[error("Interrupted")]
    #[diagnostic(code(voltwatch::interrupted))]
    Interrupted,

    // ── IO / Serialization ────────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Serialization failed: {0}")]
    #[diagnostic(code(voltwatch::json))]
    Json(#[from] serde_json::Error),
}

fn server_error_message(status: Option<u16>, message: &str) -> String {
    match status {
        Some(code) => format!("Server error (HTTP {code}): {message}"),
        None => format!("Server error: {message}"),
    }
}

impl From<figment::Error> for CliError {
    fn from(err: figment::Error) -> Self {
        Self::Config(Box::new(err))
    }
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::AuthFailed { .. } | Self::NoCredentials { .. } => exit_code::AUTH,
            Self::EndpointNotFound { .. } | Self::ProfileNotFound { .. } => exit_code::NOT_FOUND,
            Self::Validation { .. } | Self::NoConfig { .. } => exit_code::USAGE,
            Self::Interrupted => exit_code::INTERRUPTED,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Auth { message } => CliError::AuthFailed { message },
            CoreError::Connectivity { reason } => CliError::ConnectionFailed { reason },
            CoreError::Endpoint { message } => CliError::EndpointNotFound { message },
            CoreError::Server { status, message } => CliError::ServerError { status, message },
            CoreError::Validation { message } => CliError::Validation {
                field: "input".into(),
                reason: message,
            },
            CoreError::Config { message } => CliError::Validation {
                field: "config".into(),
                reason: message,
            },
            CoreError::Storage { message } => CliError::Storage { message },
            CoreError::Cancelled | CoreError::Superseded => CliError::Interrupted,
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::NoCredentials { profile } => CliError::NoCredentials { profile },
            ConfigError::UnknownProfile { profile } => CliError::ProfileNotFound {
                name: profile,
                available: "(see: voltwatch config profiles)".into(),
            },
            ConfigError::Figment(inner) => CliError::Config(inner),
            ConfigError::Io(e) => CliError::Io(e),
            other => CliError::Storage {
                message: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_errors_map_to_exit_codes() {
        let cases = [
            (CoreError::Auth { message: "bad".into() }, exit_code::AUTH),
            (
                CoreError::Connectivity {
                    reason: "refused".into(),
                },
                exit_code::CONNECTION,
            ),
            (
                CoreError::Endpoint {
                    message: "no device".into(),
                },
                exit_code::NOT_FOUND,
            ),
            (
                CoreError::Validation {
                    message: "bad date".into(),
                },
                exit_code::USAGE,
            ),
            (
                CoreError::Server {
                    status: Some(500),
                    message: "boom".into(),
                },
                exit_code::GENERAL,
            ),
        ];
        for (core, code) in cases {
            let label = core.to_string();
            assert_eq!(CliError::from(core).exit_code(), code, "{label}");
        }
    }

    #[test]
    fn missing_password_is_an_auth_exit() {
        let err = CliError::from(ConfigError::NoCredentials {
            profile: "home".into(),
        });
        assert!(matches!(err, CliError::NoCredentials { ref profile } if profile == "home"));
        assert_eq!(err.exit_code(), exit_code::AUTH);
    }

    #[test]
    fn server_error_mentions_status_when_known() {
        let err = CliError::ServerError {
            status: Some(503),
            message: "maintenance".into(),
        };
        assert_eq!(err.to_string(), "Server error (HTTP 503): maintenance");
    }
}
