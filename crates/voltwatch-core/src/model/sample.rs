// Energy samples and payload normalization.
//
// Devices report loosely typed JSON: numbers as strings, missing fields,
// nulls, camelCase keys from newer firmware. `normalize_sample` is the one
// place that turns such a payload into an `EnergySample`.

use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::CoreError;

/// Grid frequency assumed when a payload carries none.
pub const DEFAULT_FREQUENCY: f64 = 50.0;

/// One electrical measurement from a device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnergySample {
    /// Volts.
    pub voltage: f64,
    /// Amperes.
    pub current: f64,
    /// Watts.
    pub power: f64,
    /// kWh.
    pub energy: f64,
    pub power_factor: f64,
    /// Hz.
    pub frequency: f64,
    pub timestamp: DateTime<FixedOffset>,
    pub device_id: String,
}

/// Normalize a raw payload.
///
/// | field          | accepted keys                  | default           |
/// |----------------|--------------------------------|-------------------|
/// | `voltage`      | `voltage`                      | 0                 |
/// | `current`      | `current`                      | 0                 |
/// | `power`        | `power`                        | 0                 |
/// | `energy`       | `energy`                       | 0                 |
/// | `power_factor` | `power_factor`, `powerFactor`  | 0                 |
/// | `frequency`    | `frequency`                    | 50                |
/// | `timestamp`    | `timestamp`                    | `now`             |
/// | `device_id`    | `device_id`, `deviceId`        | `default_device`  |
///
/// Numeric fields take JSON numbers or numeric strings; anything else
/// falls back to the default. A payload that is not an object, or a
/// timestamp that is present but unreadable, is a validation error.
pub fn normalize_sample(
    raw: &Value,
    default_device: &str,
    now: DateTime<FixedOffset>,
) -> Result<EnergySample, CoreError> {
    let Value::Object(obj) = raw else {
        return Err(CoreError::validation(format!(
            "expected a JSON object for an energy sample, got {}",
            json_type(raw)
        )));
    };

    Ok(EnergySample {
        voltage: number(obj, &["voltage"]).unwrap_or(0.0),
        current: number(obj, &["current"]).unwrap_or(0.0),
        power: number(obj, &["power"]).unwrap_or(0.0),
        energy: number(obj, &["energy"]).unwrap_or(0.0),
        power_factor: number(obj, &["power_factor", "powerFactor"]).unwrap_or(0.0),
        frequency: number(obj, &["frequency"]).unwrap_or(DEFAULT_FREQUENCY),
        timestamp: timestamp(obj.get("timestamp"))?.unwrap_or(now),
        device_id: obj
            .get("device_id")
            .or_else(|| obj.get("deviceId"))
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .unwrap_or(default_device)
            .to_owned(),
    })
}

fn number(obj: &Map<String, Value>, keys: &[&str]) -> Option<f64> {
    keys.iter()
        .filter_map(|k| obj.get(*k))
        .find_map(|v| match v {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        })
        .filter(|n| n.is_finite())
}

/// `Ok(None)` means "absent, use the default".
fn timestamp(value: Option<&Value>) -> Result<Option<DateTime<FixedOffset>>, CoreError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => parse_timestamp(s.trim()).map(Some),
        // Epoch milliseconds
        Some(Value::Number(n)) => n
            .as_i64()
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
            .map(|dt| Some(dt.fixed_offset()))
            .ok_or_else(|| CoreError::validation(format!("timestamp out of range: {n}"))),
        Some(other) => Err(CoreError::validation(format!(
            "timestamp must be a string, got {}",
            json_type(other)
        ))),
    }
}

/// RFC 3339 first; offset-less ISO forms are read as UTC.
fn parse_timestamp(s: &str) -> Result<DateTime<FixedOffset>, CoreError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt);
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|naive| naive.and_utc().fixed_offset())
        .ok_or_else(|| CoreError::validation(format!("unparseable timestamp: {s:?}")))
}

fn json_type(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn now() -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339("2025-05-10T12:00:00+00:00").expect("valid")
    }

    #[test]
    fn empty_object_takes_every_default() {
        let s = normalize_sample(&json!({}), "ESP32_EnergyMonitor", now()).expect("sample");
        assert_eq!(s.voltage, 0.0);
        assert_eq!(s.power_factor, 0.0);
        assert_eq!(s.frequency, 50.0);
        assert_eq!(s.timestamp, now());
        assert_eq!(s.device_id, "ESP32_EnergyMonitor");
    }

    #[test]
    fn numeric_strings_and_aliases_are_accepted() {
        let raw = json!({
            "voltage": "220.5",
            "current": 1.25,
            "power": null,
            "energy": "n/a",
            "powerFactor": "0.95",
            "frequency": 60,
            "deviceId": "meter-2",
            "timestamp": "2025-05-10T19:30:00-05:00"
        });
        let s = normalize_sample(&raw, "fallback", now()).expect("sample");
        assert_eq!(s.voltage, 220.5);
        assert_eq!(s.current, 1.25);
        assert_eq!(s.power, 0.0);
        assert_eq!(s.energy, 0.0);
        assert_eq!(s.power_factor, 0.95);
        assert_eq!(s.frequency, 60.0);
        assert_eq!(s.device_id, "meter-2");
        assert_eq!(s.timestamp.offset().local_minus_utc(), -5 * 3600);
    }

    #[test]
    fn explicit_zero_is_kept() {
        let s = normalize_sample(&json!({ "frequency": 0 }), "d", now()).expect("sample");
        assert_eq!(s.frequency, 0.0);
    }

    #[test]
    fn offsetless_timestamp_is_utc() {
        let s = normalize_sample(&json!({ "timestamp": "2025-05-10 08:15:00" }), "d", now())
            .expect("sample");
        assert_eq!(s.timestamp.to_rfc3339(), "2025-05-10T08:15:00+00:00");
    }

    #[test]
    fn non_object_payload_is_rejected() {
        let err = normalize_sample(&json!([1, 2, 3]), "d", now()).expect_err("array");
        assert!(matches!(err, CoreError::Validation { .. }));
    }

    #[test]
    fn garbage_timestamp_is_rejected() {
        let err = normalize_sample(&json!({ "timestamp": "yesterday" }), "d", now())
            .expect_err("bad timestamp");
        assert!(matches!(err, CoreError::Validation { .. }));
    }
}
