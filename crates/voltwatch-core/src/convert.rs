// ── Wire → domain conversion ──
//
// Reconciles what the server sent with what can be derived locally: a
// missing summary is computed from the samples, missing cost figures are
// priced with the configured tariff.

use chrono::{DateTime, FixedOffset};
use tracing::warn;

use voltwatch_api::models::{CostResponse, HistoryResponse, SummaryWire};

use crate::cost::{PeakWindow, Tariff, compute_tariff_split, daily_average, distinct_days};
use crate::model::{
    Consumption, CostReport, Costs, EnergySample, HistoryWindow, Period, Summary, TariffInfo,
    normalize_sample,
};

/// Normalize every history entry. Entries that fail normalization are
/// logged and dropped rather than failing the whole window.
pub(crate) fn history_window(
    resp: HistoryResponse,
    period: Period,
    key: &str,
    device_id: &str,
    now: DateTime<FixedOffset>,
) -> HistoryWindow {
    let samples: Vec<EnergySample> = resp
        .data
        .iter()
        .enumerate()
        .filter_map(|(i, raw)| match normalize_sample(raw, device_id, now) {
            Ok(sample) => Some(sample),
            Err(e) => {
                warn!(index = i, error = %e, "dropping malformed history sample");
                None
            }
        })
        .collect();

    let local = Summary::from_samples(&samples);
    let summary = match resp.summary {
        Some(wire) => merge_summary(&wire, local),
        None => local,
    };

    HistoryWindow {
        period,
        date: key.to_owned(),
        samples,
        summary,
    }
}

fn merge_summary(wire: &SummaryWire, local: Summary) -> Summary {
    Summary {
        total_energy: wire.total_energy.unwrap_or(local.total_energy),
        avg_power: wire.avg_power.unwrap_or(local.avg_power),
        max_power: wire.max_power.unwrap_or(local.max_power),
        min_power: wire.min_power.unwrap_or(local.min_power),
    }
}

/// The server's peak window when it sent a parseable one, else the
/// configured window.
fn server_peak_window(peak_hours: Option<&str>, tariff: &Tariff) -> PeakWindow {
    match peak_hours.map(str::parse::<PeakWindow>) {
        Some(Ok(window)) => window,
        Some(Err(e)) => {
            warn!(error = %e, fallback = %tariff.peak_window, "ignoring server peak hours");
            tariff.peak_window
        }
        None => tariff.peak_window,
    }
}

/// Fill every missing cost figure from `samples` priced at the server's
/// rates when present, else `tariff`.
pub(crate) fn cost_report(
    resp: CostResponse,
    period: Period,
    key: &str,
    samples: &[EnergySample],
    tariff: &Tariff,
) -> CostReport {
    let peak_rate = resp.tariff.peak_rate.unwrap_or(tariff.peak_rate);
    let off_peak_rate = resp.tariff.off_peak_rate.unwrap_or(tariff.off_peak_rate);
    let peak_window = server_peak_window(resp.tariff.peak_hours.as_deref(), tariff);
    let split = compute_tariff_split(samples, peak_window, peak_rate, off_peak_rate);

    let c = resp.consumption;
    let total_kwh = c.total_kwh.unwrap_or(split.peak_kwh + split.off_peak_kwh);
    let peak_hours_kwh = c.peak_hours_kwh.unwrap_or(split.peak_kwh);
    let off_peak_kwh = c.off_peak_kwh.unwrap_or(split.off_peak_kwh);
    let daily = c
        .daily_average
        .unwrap_or_else(|| daily_average(total_kwh, distinct_days(samples)));

    let k = resp.costs;
    let peak_hours_cost = k.peak_hours_cost.unwrap_or(peak_hours_kwh * peak_rate);
    let off_peak_cost = k.off_peak_cost.unwrap_or(off_peak_kwh * off_peak_rate);

    CostReport {
        period,
        date: key.to_owned(),
        consumption: Consumption {
            total_kwh,
            daily_average: daily,
            peak_hours_kwh,
            off_peak_kwh,
        },
        costs: Costs {
            total_cost: k.total_cost.unwrap_or(peak_hours_cost + off_peak_cost),
            peak_hours_cost,
            off_peak_cost,
            currency: k.currency.unwrap_or_else(|| tariff.currency.clone()),
        },
        tariff: TariffInfo {
            peak_rate,
            off_peak_rate,
            peak_hours: peak_window.to_string(),
        },
    }
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use serde_json::json;

    use super::*;

    fn now() -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339("2025-06-01T00:00:00Z").expect("valid")
    }

    fn month_of_days() -> HistoryResponse {
        let data = (1..=31)
            .map(|d| json!({ "timestamp": format!("2025-05-{d:02}T12:00:00Z"), "energy": 10.0, "power": 400.0 }))
            .collect();
        HistoryResponse {
            period: Some("month".into()),
            date: Some("2025-05".into()),
            data,
            summary: None,
        }
    }

    #[test]
    fn summary_computed_when_missing() {
        let window = history_window(month_of_days(), Period::Month, "2025-05", "d", now());
        assert_eq!(window.samples.len(), 31);
        assert!((window.summary.total_energy - 310.0).abs() < 1e-9);
        assert_eq!(window.summary.avg_power, 400.0);
    }

    #[test]
    fn malformed_entries_are_dropped() {
        let mut resp = month_of_days();
        resp.data.push(json!("garbage"));
        resp.data.push(json!({ "timestamp": "not a time" }));
        let window = history_window(resp, Period::Month, "2025-05", "d", now());
        assert_eq!(window.samples.len(), 31);
    }

    #[test]
    fn cost_filled_locally() {
        let window = history_window(month_of_days(), Period::Month, "2025-05", "d", now());
        let report = cost_report(
            CostResponse::default(),
            Period::Month,
            "2025-05",
            &window.samples,
            &Tariff::default(),
        );
        assert!((report.consumption.total_kwh - 310.0).abs() < 1e-9);
        assert!((report.consumption.daily_average - 10.0).abs() < 1e-9);
        // Noon samples are all off-peak.
        assert_eq!(report.consumption.peak_hours_kwh, 0.0);
        assert!((report.costs.total_cost - 310.0 * 0.13).abs() < 1e-9);
        assert_eq!(report.costs.currency, "PEN");
        assert_eq!(report.tariff.peak_hours, "18:00-22:00");
    }

    #[test]
    fn server_peak_hours_drive_the_local_split() {
        let samples: Vec<EnergySample> = [("2025-05-10T17:30:00Z", 2.0), ("2025-05-10T21:30:00Z", 3.0)]
            .iter()
            .map(|(ts, kwh)| {
                normalize_sample(&json!({ "timestamp": ts, "energy": kwh }), "d", now()).expect("valid")
            })
            .collect();
        let mut resp = CostResponse::default();
        resp.tariff.peak_hours = Some("17:00-21:00".into());

        let report = cost_report(resp, Period::Day, "2025-05-10", &samples, &Tariff::default());
        assert_eq!(report.tariff.peak_hours, "17:00-21:00");
        assert_eq!(report.consumption.peak_hours_kwh, 2.0);
        assert_eq!(report.consumption.off_peak_kwh, 3.0);
    }

    #[test]
    fn unparseable_server_peak_hours_fall_back_to_tariff() {
        let mut resp = CostResponse::default();
        resp.tariff.peak_hours = Some("evenings".into());
        let report = cost_report(resp, Period::Day, "2025-05-10", &[], &Tariff::default());
        assert_eq!(report.tariff.peak_hours, "18:00-22:00");
    }

    #[test]
    fn server_figures_win() {
        let mut resp = CostResponse::default();
        resp.consumption.total_kwh = Some(42.0);
        resp.costs.total_cost = Some(7.0);
        resp.costs.currency = Some("USD".into());
        let report = cost_report(resp, Period::Day, "2025-05-10", &[], &Tariff::default());
        assert_eq!(report.consumption.total_kwh, 42.0);
        assert_eq!(report.consumption.daily_average, 0.0);
        assert_eq!(report.costs.total_cost, 7.0);
        assert_eq!(report.costs.currency, "USD");
    }
}
