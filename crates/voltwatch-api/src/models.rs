// Wire types for the energy-telemetry REST API.
//
// Every field is optional on the wire: servers in the field omit blocks
// (simulated fallbacks, older firmware) and the core decides defaults.
// Raw samples stay as `serde_json::Value` because the core normalizes
// them field-by-field.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// `POST /api/auth/login` response.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub token: Option<String>,
}

/// `GET /energy/history/{device}` response.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct HistoryResponse {
    #[serde(default)]
    pub period: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub data: Vec<Value>,
    #[serde(default)]
    pub summary: Option<SummaryWire>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SummaryWire {
    #[serde(default)]
    pub total_energy: Option<f64>,
    #[serde(default)]
    pub avg_power: Option<f64>,
    #[serde(default)]
    pub max_power: Option<f64>,
    #[serde(default)]
    pub min_power: Option<f64>,
}

/// `GET /energy/costs/{device}` response.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CostResponse {
    #[serde(default)]
    pub period: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub consumption: ConsumptionWire,
    #[serde(default)]
    pub costs: CostsWire,
    #[serde(default)]
    pub tariff: TariffWire,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ConsumptionWire {
    #[serde(default)]
    pub total_kwh: Option<f64>,
    #[serde(default)]
    pub daily_average: Option<f64>,
    #[serde(default)]
    pub peak_hours_kwh: Option<f64>,
    #[serde(default)]
    pub off_peak_kwh: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CostsWire {
    #[serde(default)]
    pub total_cost: Option<f64>,
    #[serde(default)]
    pub peak_hours_cost: Option<f64>,
    #[serde(default)]
    pub off_peak_cost: Option<f64>,
    #[serde(default)]
    pub currency: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TariffWire {
    #[serde(default)]
    pub peak_rate: Option<f64>,
    #[serde(default)]
    pub off_peak_rate: Option<f64>,
    /// Human-readable window, e.g. `"18:00-22:00"`.
    #[serde(default)]
    pub peak_hours: Option<String>,
}
