//! Domain layer between `voltwatch-api` and the CLI.
//!
//! - **[`Session`]**: one device on one server. Owns the HTTP client, the
//!   [`CredentialManager`] and the root cancellation token. Every
//!   authorized call re-authenticates once on a rejected token.
//!
//! - **[`RealtimePoller`]**: interval-driven live readings with a bounded
//!   [`HistoryBuffer`], published through a `watch` channel as
//!   [`PollerState`]. Ticks resolve to a [`TickOutcome`] and never error.
//!
//! - **[`HistoryAggregator`]**: concurrent history + cost fetch for a
//!   [`Period`] and date key, last-write-wins across overlapping queries.
//!
//! - **[`cost`]** and **[`chart`]**: pure time-of-use pricing and chart
//!   series preparation.

pub mod aggregator;
pub mod buffer;
pub mod chart;
pub mod config;
mod convert;
pub mod cost;
pub mod credential;
pub mod error;
pub mod model;
pub mod poller;
pub mod session;

// ── Primary re-exports ──────────────────────────────────────────────
pub use aggregator::HistoryAggregator;
pub use buffer::HistoryBuffer;
pub use chart::{ChartPoint, Metric};
pub use config::{SessionConfig, TlsVerification};
pub use cost::{PeakWindow, Tariff, TariffSplit};
pub use credential::{CredentialManager, FileTokenStore, MemoryTokenStore, TokenStore};
pub use error::{CoreError, ErrorKind};
pub use poller::{ConnectionState, PollerState, RealtimePoller, TickOutcome};
pub use session::Session;

pub use model::{
    Consumption, CostReport, Costs, EnergySample, HistoryQuery, HistoryWindow, Period, Summary,
    TariffInfo,
};

pub use voltwatch_api::Credential;
