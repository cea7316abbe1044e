// ── Runtime session configuration ──
//
// These types describe *how* to talk to an energy-telemetry server.
// They carry credential data and polling/tariff tuning, but never touch
// disk. The CLI constructs a `SessionConfig` and hands it in.

use std::time::Duration;

use secrecy::SecretString;
use url::Url;

use crate::cost::Tariff;

/// Device id used when neither the profile nor the payload names one.
pub const DEFAULT_DEVICE_ID: &str = "ESP32_EnergyMonitor";
/// Login name the stock firmware server ships with.
pub const DEFAULT_USERNAME: &str = "admin";
/// Bounded realtime history length.
pub const DEFAULT_HISTORY_CAPACITY: usize = 50;
/// Realtime refresh cadence.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(std::path::PathBuf),
    /// Skip verification (self-signed lab servers).
    DangerAcceptInvalid,
}

/// Configuration for one device on one server.
///
/// Built by the CLI, passed to `Session` -- core never reads config files.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Server root (e.g., `http://192.168.1.7:5000`).
    pub url: Url,
    pub device_id: String,
    pub username: String,
    pub password: SecretString,
    pub tls: TlsVerification,
    /// Hard timeout for one request attempt.
    pub timeout: Duration,
    /// Extra attempts after the first for transient failures.
    pub retries: u32,
    pub retry_delay: Duration,
    pub poll_interval: Duration,
    pub history_capacity: usize,
    pub tariff: Tariff,
}

impl SessionConfig {
    /// Config with stock defaults for everything but the endpoint and login.
    pub fn new(url: Url, username: impl Into<String>, password: SecretString) -> Self {
        Self {
            url,
            device_id: DEFAULT_DEVICE_ID.into(),
            username: username.into(),
            password,
            tls: TlsVerification::default(),
            timeout: Duration::from_secs(30),
            retries: 3,
            retry_delay: Duration::from_secs(1),
            poll_interval: DEFAULT_POLL_INTERVAL,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            tariff: Tariff::default(),
        }
    }
}
