//! Output formatting: table, JSON, YAML, plain.
//!
//! Renders data in the format selected by `--output`. Table uses `tabled`,
//! structured formats use serde, plain emits one line per item.

use std::io::{self, IsTerminal, Write};

use owo_colors::OwoColorize;
use tabled::{Table, Tabled, settings::Style};

use voltwatch_core::{ChartPoint, ConnectionState};

use crate::cli::{ColorMode, OutputFormat};

// ── Color helpers ────────────────────────────────────────────────────

/// Determine whether color output should be enabled.
pub fn should_color(mode: ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => io::stdout().is_terminal() && std::env::var("NO_COLOR").is_err(),
    }
}

/// Connection indicator, green or red when color is on.
pub fn connection_label(state: ConnectionState, color: bool) -> String {
    let label = state.to_string();
    if !color {
        return label;
    }
    match state {
        ConnectionState::Connected => label.green().to_string(),
        ConnectionState::Disconnected => label.red().to_string(),
    }
}

/// Horizontal bar scaled against `max`, `width` cells wide at full scale.
pub fn bar(value: f64, max: f64, width: usize) -> String {
    if !max.is_finite() || max <= 0.0 || !value.is_finite() || value <= 0.0 {
        return String::new();
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::as_conversions)]
    let cells = ((value / max).min(1.0) * width as f64).round() as usize;
    "█".repeat(cells.max(1))
}

// ── Charts ───────────────────────────────────────────────────────────

const CHART_WIDTH: usize = 30;

#[derive(Tabled)]
struct ChartRow {
    #[tabled(rename = "")]
    label: String,
    #[tabled(rename = "Value")]
    value: String,
    #[tabled(rename = "")]
    bar: String,
}

/// Terminal chart: one table row per point with a proportional bar.
pub fn render_chart(points: &[ChartPoint], unit: &str) -> String {
    let max = points.iter().map(|p| p.value).fold(0.0_f64, f64::max);
    let rows: Vec<ChartRow> = points
        .iter()
        .map(|p| ChartRow {
            label: p.label.clone(),
            value: if unit.is_empty() {
                format!("{:.2}", p.value)
            } else {
                format!("{:.2} {unit}", p.value)
            },
            bar: bar(p.value, max, CHART_WIDTH),
        })
        .collect();
    render_table(&rows)
}

// ── Render dispatchers ───────────────────────────────────────────────

/// Render a list of serde-serializable + tabled items in the chosen format.
///
/// - `table`: uses the `Tabled` derive to build a pretty table
/// - `json` / `json-compact`: serializes the original data via serde
/// - `yaml`: serializes via serde_yaml
/// - `plain`: calls `line_fn` on each item to emit one line per item
pub fn render_list<T, R>(
    format: OutputFormat,
    data: &[T],
    to_row: impl Fn(&T) -> R,
    line_fn: impl Fn(&T) -> String,
) -> String
where
    T: serde::Serialize,
    R: Tabled,
{
    match format {
        OutputFormat::Table => {
            let rows: Vec<R> = data.iter().map(to_row).collect();
            render_table(&rows)
        }
        OutputFormat::Json => render_json(data, false),
        OutputFormat::JsonCompact => render_json(data, true),
        OutputFormat::Yaml => render_yaml(data),
        OutputFormat::Plain => data.iter().map(&line_fn).collect::<Vec<_>>().join("\n"),
    }
}

/// Render a single serde-serializable item in the chosen format.
///
/// Table rendering uses a custom `detail_fn` that returns a pre-formatted
/// string, since detail views don't use `Tabled` derive.
pub fn render_single<T>(
    format: OutputFormat,
    data: &T,
    detail_fn: impl Fn(&T) -> String,
    plain_fn: impl Fn(&T) -> String,
) -> String
where
    T: serde::Serialize,
{
    match format {
        OutputFormat::Table => detail_fn(data),
        OutputFormat::Json => render_json(data, false),
        OutputFormat::JsonCompact => render_json(data, true),
        OutputFormat::Yaml => render_yaml(data),
        OutputFormat::Plain => plain_fn(data),
    }
}

/// Print the rendered output to stdout, respecting quiet mode.
pub fn print_output(output: &str, quiet: bool) {
    if quiet || output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
}

// ── Format-specific renderers ────────────────────────────────────────

pub(crate) fn render_table<R: Tabled>(rows: &[R]) -> String {
    Table::new(rows).with(Style::rounded()).to_string()
}

/// Pretty-printed JSON.
pub(crate) fn render_json_pretty<T: serde::Serialize + ?Sized>(data: &T) -> String {
    serde_json::to_string_pretty(data).unwrap_or_else(|e| serialization_failed(&e))
}

/// Compact single-line JSON.
pub(crate) fn render_json_compact<T: serde::Serialize + ?Sized>(data: &T) -> String {
    serde_json::to_string(data).unwrap_or_else(|e| serialization_failed(&e))
}

fn render_json<T: serde::Serialize + ?Sized>(data: &T, compact: bool) -> String {
    if compact {
        render_json_compact(data)
    } else {
        render_json_pretty(data)
    }
}

/// YAML output.
pub(crate) fn render_yaml<T: serde::Serialize + ?Sized>(data: &T) -> String {
    serde_yaml::to_string(data).unwrap_or_else(|e| serialization_failed(&e))
}

fn serialization_failed(err: &dyn std::fmt::Display) -> String {
    tracing::error!(error = %err, "failed to serialize output");
    String::new()
}

#[cfg(test)]
mod tests {
    use serde::Serialize;

    use super::*;

    #[derive(Serialize)]
    struct Item {
        name: &'static str,
        watts: f64,
    }

    #[derive(Tabled)]
    struct ItemRow {
        #[tabled(rename = "Name")]
        name: String,
    }

    fn items() -> Vec<Item> {
        vec![
            Item {
                name: "fridge",
                watts: 120.0,
            },
            Item {
                name: "oven",
                watts: 2000.0,
            },
        ]
    }

    #[test]
    fn plain_lists_one_line_per_item() {
        let out = render_list(
            OutputFormat::Plain,
            &items(),
            |i| ItemRow { name: i.name.into() },
            |i| i.name.to_owned(),
        );
        assert_eq!(out, "fridge\noven");
    }

    #[test]
    fn compact_json_is_single_line() {
        let out = render_list(
            OutputFormat::JsonCompact,
            &items(),
            |i| ItemRow { name: i.name.into() },
            |i| i.name.to_owned(),
        );
        assert_eq!(out, r#"[{"name":"fridge","watts":120.0},{"name":"oven","watts":2000.0}]"#);
    }

    #[test]
    fn table_has_header() {
        let out = render_list(
            OutputFormat::Table,
            &items(),
            |i| ItemRow { name: i.name.into() },
            |i| i.name.to_owned(),
        );
        assert!(out.contains("Name"));
        assert!(out.contains("oven"));
    }

    #[test]
    fn bar_scales_and_clamps() {
        assert_eq!(bar(5.0, 10.0, 10).chars().count(), 5);
        assert_eq!(bar(50.0, 10.0, 10).chars().count(), 10);
        assert_eq!(bar(0.01, 10.0, 10).chars().count(), 1);
        assert!(bar(0.0, 10.0, 10).is_empty());
        assert!(bar(3.0, 0.0, 10).is_empty());
    }

    #[test]
    fn chart_rows_carry_units_and_bars() {
        let out = render_chart(
            &[ChartPoint::new("08h", 100.0), ChartPoint::new("09h", 50.0)],
            "W",
        );
        assert!(out.contains("100.00 W"));
        assert!(out.contains("50.00 W"));
        assert!(out.contains(&"█".repeat(CHART_WIDTH)));
    }

    #[test]
    fn uncolored_connection_label_is_plain() {
        assert_eq!(connection_label(ConnectionState::Connected, false), "connected");
    }
}
