// Period-scoped history and cost report types.

use serde::{Deserialize, Serialize};

use super::period::Period;
use super::sample::EnergySample;

/// Aggregate figures over a window of samples.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    /// kWh.
    pub total_energy: f64,
    /// Watts.
    pub avg_power: f64,
    pub max_power: f64,
    pub min_power: f64,
}

impl Summary {
    /// Compute the summary locally. All zeros for an empty window.
    #[allow(clippy::cast_precision_loss, clippy::as_conversions)]
    pub fn from_samples(samples: &[EnergySample]) -> Self {
        if samples.is_empty() {
            return Self::default();
        }
        let total_energy = samples.iter().map(|s| s.energy).sum();
        let total_power: f64 = samples.iter().map(|s| s.power).sum();
        let max_power = samples.iter().map(|s| s.power).fold(f64::MIN, f64::max);
        let min_power = samples.iter().map(|s| s.power).fold(f64::MAX, f64::min);
        Self {
            total_energy,
            avg_power: total_power / samples.len() as f64,
            max_power,
            min_power,
        }
    }
}

/// One history query result. Replaced wholesale on every query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryWindow {
    pub period: Period,
    /// Date key the window was requested with.
    pub date: String,
    pub samples: Vec<EnergySample>,
    pub summary: Summary,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Consumption {
    pub total_kwh: f64,
    pub daily_average: f64,
    pub peak_hours_kwh: f64,
    pub off_peak_kwh: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Costs {
    pub total_cost: f64,
    pub peak_hours_cost: f64,
    pub off_peak_cost: f64,
    pub currency: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TariffInfo {
    pub peak_rate: f64,
    pub off_peak_rate: f64,
    /// Window label, e.g. `18:00-22:00`.
    pub peak_hours: String,
}

/// Time-of-use cost report for one period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostReport {
    pub period: Period,
    pub date: String,
    pub consumption: Consumption,
    pub costs: Costs,
    pub tariff: TariffInfo,
}

/// History window and cost report fetched together for the same key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryQuery {
    pub window: HistoryWindow,
    pub cost: CostReport,
}
