//! Shared helpers for command handlers.

use chrono::{Local, NaiveDate};

use voltwatch_core::Period;
use voltwatch_core::model::{date_key, parse_date, shift_date};

use crate::error::CliError;

/// Date key for a query: `--date` (or today) shaped for `period`, then
/// moved by `shift` periods.
pub fn resolve_date_key(period: Period, date: Option<&str>, shift: i32) -> Result<String, CliError> {
    resolve_date_key_from(period, date, shift, Local::now().date_naive())
}

fn resolve_date_key_from(
    period: Period,
    date: Option<&str>,
    shift: i32,
    today: NaiveDate,
) -> Result<String, CliError> {
    let anchor = match date {
        Some(input) => parse_date(input)?,
        None => today,
    };
    let key = date_key(period, anchor);
    if shift == 0 {
        return Ok(key);
    }
    Ok(shift_date(period, &key, shift)?)
}

/// Prompt for confirmation, auto-approving if `--yes` was passed.
pub fn confirm(message: &str, yes_flag: bool) -> Result<bool, CliError> {
    if yes_flag {
        return Ok(true);
    }
    let confirmed = dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(|e| CliError::Io(std::io::Error::other(e)))?;
    Ok(confirmed)
}

/// Format a float with a fixed number of decimals and a unit.
pub fn fmt_unit(value: f64, decimals: usize, unit: &str) -> String {
    if unit.is_empty() {
        format!("{value:.decimals$}")
    } else {
        format!("{value:.decimals$} {unit}")
    }
}
