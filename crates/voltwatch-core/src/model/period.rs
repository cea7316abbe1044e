// Reporting periods and date-key arithmetic.
//
// A history query is addressed by a period plus a date key whose shape
// depends on the period: `YYYY-MM-DD` for day and week (the week anchor),
// `YYYY-MM` for month, `YYYY` for year.

use chrono::{Datelike, Months, NaiveDate, TimeDelta};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Aggregation period, lowercase on the wire.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Period {
    Day,
    Week,
    Month,
    Year,
}

/// Parse `YYYY`, `YYYY-MM` or `YYYY-MM-DD`; missing parts default to 1.
pub fn parse_date(input: &str) -> Result<NaiveDate, CoreError> {
    let invalid = || CoreError::validation(format!("invalid date {input:?} (expected YYYY[-MM[-DD]])"));

    let mut parts = input.trim().split('-');
    let year = parts
        .next()
        .filter(|y| y.len() == 4)
        .and_then(|y| y.parse::<i32>().ok())
        .ok_or_else(invalid)?;
    let mut component = |name: &str| -> Result<u32, CoreError> {
        match parts.next() {
            None => Ok(1),
            Some(p) if (1..=2).contains(&p.len()) => p.parse::<u32>().map_err(|_| invalid()),
            Some(_) => Err(CoreError::validation(format!("invalid {name} in {input:?}"))),
        }
    };
    let month = component("month")?;
    let day = component("day")?;
    if parts.next().is_some() {
        return Err(invalid());
    }

    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(invalid)
}

/// Format `date` as the key `period` expects.
pub fn date_key(period: Period, date: NaiveDate) -> String {
    match period {
        Period::Day | Period::Week => date.format("%Y-%m-%d").to_string(),
        Period::Month => date.format("%Y-%m").to_string(),
        Period::Year => date.format("%Y").to_string(),
    }
}

/// Move a date key by `delta` periods and re-key it.
///
/// Month and year steps clamp to the end of the month, so
/// `shift_date(Month, "2025-01-31", 1)` lands on February 28th and a
/// leap day shifted by a year becomes February 28th.
pub fn shift_date(period: Period, current: &str, delta: i32) -> Result<String, CoreError> {
    let date = parse_date(current)?;
    let shifted = match period {
        Period::Day => date.checked_add_signed(TimeDelta::days(i64::from(delta))),
        Period::Week => date.checked_add_signed(TimeDelta::weeks(i64::from(delta))),
        Period::Month => add_months(date, delta),
        Period::Year => add_months(date, delta.saturating_mul(12)),
    }
    .ok_or_else(|| CoreError::validation(format!("date out of range shifting {current:?} by {delta}")))?;
    Ok(date_key(period, shifted))
}

fn add_months(date: NaiveDate, delta: i32) -> Option<NaiveDate> {
    let months = Months::new(delta.unsigned_abs());
    if delta >= 0 {
        date.checked_add_months(months)
    } else {
        date.checked_sub_months(months)
    }
}

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// Human title for a query header: `10 May 2025`, `Week 2, May 2025`,
/// `May 2025`, `2025`.
pub fn period_title(period: Period, date: NaiveDate) -> String {
    let month = MONTH_NAMES
        .get(date.month0() as usize)
        .copied()
        .unwrap_or_default();
    match period {
        Period::Day => format!("{} {month} {}", date.day(), date.year()),
        Period::Week => format!("Week {}, {month} {}", date.day().div_ceil(7), date.year()),
        Period::Month => format!("{month} {}", date.year()),
        Period::Year => date.year().to_string(),
    }
}
