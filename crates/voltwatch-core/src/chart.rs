// ── Chart series preparation ──
//
// Turns sample windows into labeled points small enough for a terminal or
// mobile chart: bounded downsampling, period-aware axis labels, and the
// grouped bar view.

use chrono::{DateTime, Datelike, FixedOffset, Timelike};
use serde::{Deserialize, Serialize};

use crate::model::{EnergySample, Period};

/// Label used for the placeholder point of an empty series.
pub const NO_DATA_LABEL: &str = "no data";
/// Point budget for history line charts.
pub const DEFAULT_MAX_POINTS: usize = 20;
/// Bar budget for the grouped bar view.
pub const DEFAULT_MAX_BARS: usize = 7;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint {
    pub label: String,
    pub value: f64,
}

impl ChartPoint {
    pub fn new(label: impl Into<String>, value: f64) -> Self {
        Self {
            label: label.into(),
            value,
        }
    }

    fn no_data() -> Self {
        Self::new(NO_DATA_LABEL, 0.0)
    }
}

/// Which sample field a series plots.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum Metric {
    Voltage,
    Current,
    #[default]
    Power,
    Energy,
    PowerFactor,
    Frequency,
}

impl Metric {
    pub fn value_of(self, sample: &EnergySample) -> f64 {
        match self {
            Self::Voltage => sample.voltage,
            Self::Current => sample.current,
            Self::Power => sample.power,
            Self::Energy => sample.energy,
            Self::PowerFactor => sample.power_factor,
            Self::Frequency => sample.frequency,
        }
    }

    pub fn unit(self) -> &'static str {
        match self {
            Self::Voltage => "V",
            Self::Current => "A",
            Self::Power => "W",
            Self::Energy => "kWh",
            Self::PowerFactor => "",
            Self::Frequency => "Hz",
        }
    }
}

/// Reduce `series` to at most `max_points`, keeping the first and last
/// points and evenly spaced ones between. `max_points` below 2 is read
/// as 2. An empty series yields a single "no data" point.
pub fn downsample(series: &[ChartPoint], max_points: usize) -> Vec<ChartPoint> {
    let Some(last_index) = series.len().checked_sub(1) else {
        return vec![ChartPoint::no_data()];
    };
    let max_points = max_points.max(2);
    if series.len() <= max_points {
        return series.to_vec();
    }

    let step = series.len().div_ceil(max_points);
    let mut indices: Vec<usize> = (0..series.len()).step_by(step).collect();
    if indices.last() != Some(&last_index) {
        if indices.len() >= max_points {
            indices.pop();
        }
        indices.push(last_index);
    }

    indices
        .into_iter()
        .filter_map(|i| series.get(i).cloned())
        .collect()
}

/// Axis label for a sample time: day `08h`, week `Mon`, month `17`,
/// year `5`.
pub fn label_for(period: Period, timestamp: &DateTime<FixedOffset>) -> String {
    match period {
        Period::Day => format!("{:02}h", timestamp.hour()),
        Period::Week => timestamp.format("%a").to_string(),
        Period::Month => timestamp.day().to_string(),
        Period::Year => timestamp.month().to_string(),
    }
}

/// One labeled point per sample, not yet downsampled.
pub fn series(period: Period, samples: &[EnergySample], metric: Metric) -> Vec<ChartPoint> {
    samples
        .iter()
        .map(|s| ChartPoint::new(label_for(period, &s.timestamp), metric.value_of(s)))
        .collect()
}

/// Realtime view: index labels on every 10th point, blank elsewhere.
pub fn realtime_series(samples: &[EnergySample], metric: Metric) -> Vec<ChartPoint> {
    if samples.is_empty() {
        return vec![ChartPoint::no_data()];
    }
    samples
        .iter()
        .enumerate()
        .map(|(i, s)| {
            let label = if i % 10 == 0 { i.to_string() } else { String::new() };
            ChartPoint::new(label, metric.value_of(s))
        })
        .collect()
}

/// Average energy over consecutive groups, at most `max_bars` bars
/// labeled `1..`. Group size is `len / max_bars` (at least 1); a tail
/// that does not fill a group past the last bar is not plotted.
#[allow(clippy::cast_precision_loss, clippy::as_conversions)]
pub fn group_bars(samples: &[EnergySample], max_bars: usize) -> Vec<ChartPoint> {
    if samples.is_empty() || max_bars == 0 {
        return vec![ChartPoint::no_data()];
    }
    let size = (samples.len() / max_bars).max(1);
    samples
        .chunks(size)
        .take(max_bars)
        .enumerate()
        .map(|(i, group)| {
            let total: f64 = group.iter().map(|s| s.energy).sum();
            ChartPoint::new((i + 1).to_string(), total / group.len() as f64)
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::float_cmp, clippy::cast_precision_loss, clippy::as_conversions)]
mod tests {
    use super::*;

    fn points(n: usize) -> Vec<ChartPoint> {
        (0..n).map(|i| ChartPoint::new(i.to_string(), i as f64)).collect()
    }

    fn sample_at(ts: &str, energy: f64) -> EnergySample {
        EnergySample {
            voltage: 230.0,
            current: 2.0,
            power: 460.0,
            energy,
            power_factor: 0.9,
            frequency: 50.0,
            timestamp: DateTime::parse_from_rfc3339(ts).expect("valid"),
            device_id: "d".into(),
        }
    }

    #[test]
    fn downsample_bounds_and_keeps_endpoints() {
        for n in [21, 31, 50, 99, 100, 1000] {
            let out = downsample(&points(n), 20);
            assert!(out.len() <= 20, "n={n} gave {}", out.len());
            assert_eq!(out.first().map(|p| p.value), Some(0.0));
            assert_eq!(out.last().map(|p| p.value), Some((n - 1) as f64));
        }
    }

    #[test]
    fn downsample_short_series_is_unchanged() {
        assert_eq!(downsample(&points(20), 20), points(20));
        assert_eq!(downsample(&points(3), 20), points(3));
    }

    #[test]
    fn downsample_empty_yields_placeholder() {
        let out = downsample(&[], 20);
        assert_eq!(out, vec![ChartPoint::new("no data", 0.0)]);
    }

    #[test]
    fn downsample_tiny_budget_is_two() {
        let out = downsample(&points(10), 0);
        assert_eq!(out.len(), 2);
        assert_eq!(out.first().map(|p| p.value), Some(0.0));
        assert_eq!(out.last().map(|p| p.value), Some(9.0));
    }

    #[test]
    fn labels_per_period() {
        let ts = DateTime::parse_from_rfc3339("2025-05-12T08:30:00+00:00").expect("valid");
        assert_eq!(label_for(Period::Day, &ts), "08h");
        assert_eq!(label_for(Period::Week, &ts), "Mon");
        assert_eq!(label_for(Period::Month, &ts), "12");
        assert_eq!(label_for(Period::Year, &ts), "5");
    }

    #[test]
    fn realtime_labels_every_tenth() {
        let samples: Vec<_> = (0..25).map(|_| sample_at("2025-05-12T08:30:00Z", 1.0)).collect();
        let out = realtime_series(&samples, Metric::Voltage);
        assert_eq!(out.len(), 25);
        assert_eq!(out[0].label, "0");
        assert_eq!(out[10].label, "10");
        assert_eq!(out[20].label, "20");
        assert!(out[5].label.is_empty());
        assert_eq!(out[3].value, 230.0);
    }

    #[test]
    fn bars_average_energy_in_groups() {
        let samples: Vec<_> = (1..=14)
            .map(|i| sample_at("2025-05-12T08:30:00Z", f64::from(i)))
            .collect();
        let bars = group_bars(&samples, 7);
        assert_eq!(bars.len(), 7);
        assert_eq!(bars[0], ChartPoint::new("1", 1.5));
        assert_eq!(bars[6], ChartPoint::new("7", 13.5));
    }

    #[test]
    fn bars_for_short_series_are_one_per_sample() {
        let samples: Vec<_> = (1..=3)
            .map(|i| sample_at("2025-05-12T08:30:00Z", f64::from(i)))
            .collect();
        let bars = group_bars(&samples, 7);
        assert_eq!(bars.len(), 3);
        assert_eq!(bars[2].value, 3.0);
    }

    #[test]
    fn metric_parses_kebab_case() {
        assert_eq!("power-factor".parse::<Metric>().ok(), Some(Metric::PowerFactor));
        assert_eq!(Metric::Energy.unit(), "kWh");
    }
}
