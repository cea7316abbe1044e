// ── Time-of-use cost calculation ──
//
// Splits consumption into peak and off-peak buckets by the local hour of
// each sample and prices each bucket at its own rate.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use chrono::Timelike;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::model::EnergySample;

/// Half-open hour range `[start, end)`. `start > end` wraps past midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PeakWindow {
    start: u32,
    end: u32,
}

impl PeakWindow {
    /// `start` in `0..24`, `end` in `0..=24`, and the two must differ.
    pub fn new(start: u32, end: u32) -> Result<Self, CoreError> {
        if start >= 24 || end > 24 || start == end {
            return Err(CoreError::validation(format!(
                "invalid peak window {start}..{end}: hours must be distinct, start < 24, end <= 24"
            )));
        }
        Ok(Self { start, end })
    }

    pub fn start(self) -> u32 {
        self.start
    }

    pub fn end(self) -> u32 {
        self.end
    }

    pub fn contains(self, hour: u32) -> bool {
        if self.start < self.end {
            (self.start..self.end).contains(&hour)
        } else {
            hour >= self.start || hour < self.end
        }
    }
}

impl Default for PeakWindow {
    fn default() -> Self {
        Self { start: 18, end: 22 }
    }
}

impl fmt::Display for PeakWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:00-{:02}:00", self.start, self.end)
    }
}

/// Accepts `18:00-22:00` or `18-22`.
impl FromStr for PeakWindow {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CoreError::validation(format!("invalid peak hours {s:?} (expected HH:00-HH:00)"));
        let (start, end) = s.trim().split_once('-').ok_or_else(invalid)?;
        let hour = |part: &str| -> Result<u32, CoreError> {
            let part = part.trim();
            let digits = match part.split_once(':') {
                Some((h, "00")) => h,
                Some(_) => return Err(invalid()),
                None => part,
            };
            digits.parse::<u32>().map_err(|_| invalid())
        };
        Self::new(hour(start)?, hour(end)?)
    }
}

impl TryFrom<String> for PeakWindow {
    type Error = CoreError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<PeakWindow> for String {
    fn from(w: PeakWindow) -> Self {
        w.to_string()
    }
}

/// Rates per kWh and the peak window they switch on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tariff {
    pub peak_rate: f64,
    pub off_peak_rate: f64,
    pub peak_window: PeakWindow,
    pub currency: String,
}

impl Default for Tariff {
    fn default() -> Self {
        Self {
            peak_rate: 0.18,
            off_peak_rate: 0.13,
            peak_window: PeakWindow::default(),
            currency: "PEN".into(),
        }
    }
}

impl Tariff {
    /// Rate in effect at `hour`.
    pub fn rate_at(&self, hour: u32) -> f64 {
        if self.peak_window.contains(hour) {
            self.peak_rate
        } else {
            self.off_peak_rate
        }
    }
}

/// Result of [`compute_tariff_split`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct TariffSplit {
    pub peak_kwh: f64,
    pub off_peak_kwh: f64,
    pub peak_cost: f64,
    pub off_peak_cost: f64,
    pub total_cost: f64,
}

/// Bucket each sample's energy by the hour of its own timestamp offset.
pub fn compute_tariff_split(
    samples: &[EnergySample],
    peak_window: PeakWindow,
    peak_rate: f64,
    off_peak_rate: f64,
) -> TariffSplit {
    let (peak_kwh, off_peak_kwh) = samples.iter().fold((0.0, 0.0), |(peak, off), s| {
        if peak_window.contains(s.timestamp.hour()) {
            (peak + s.energy, off)
        } else {
            (peak, off + s.energy)
        }
    });
    let peak_cost = peak_kwh * peak_rate;
    let off_peak_cost = off_peak_kwh * off_peak_rate;
    TariffSplit {
        peak_kwh,
        off_peak_kwh,
        peak_cost,
        off_peak_cost,
        total_cost: peak_cost + off_peak_cost,
    }
}

/// Price of `latest_energy` kWh at the rate in effect at `now`.
pub fn estimate_instantaneous_cost(latest_energy: f64, now: &impl Timelike, tariff: &Tariff) -> f64 {
    latest_energy * tariff.rate_at(now.hour())
}

/// `total_kwh / days`, or 0 for an empty window.
#[allow(clippy::cast_precision_loss, clippy::as_conversions)]
pub fn daily_average(total_kwh: f64, distinct_days: usize) -> f64 {
    if distinct_days == 0 {
        0.0
    } else {
        total_kwh / distinct_days as f64
    }
}

/// Number of calendar days (in each sample's own offset) covered.
pub fn distinct_days(samples: &[EnergySample]) -> usize {
    samples
        .iter()
        .map(|s| s.timestamp.date_naive())
        .collect::<HashSet<_>>()
        .len()
}
