// ── Domain model ──
//
// Canonical types produced from wire payloads. Everything here is plain
// data: serializable for CLI output, cloneable, and free of I/O.

pub mod history;
pub mod period;
pub mod sample;

pub use history::{
    Consumption, CostReport, Costs, HistoryQuery, HistoryWindow, Summary, TariffInfo,
};
pub use period::{Period, date_key, parse_date, period_title, shift_date};
pub use sample::{DEFAULT_FREQUENCY, EnergySample, normalize_sample};
