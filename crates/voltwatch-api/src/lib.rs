// voltwatch-api: Async Rust client for remote energy-telemetry REST APIs

pub mod auth;
pub mod client;
pub mod error;
pub mod executor;
pub mod models;
pub mod transport;

pub use auth::Credential;
pub use client::EnergyClient;
pub use error::Error;
pub use executor::{ApiRequest, FetchExecutor};
pub use transport::{TlsMode, TransportConfig};
