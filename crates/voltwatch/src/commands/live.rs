//! `live` handler: run the realtime poller and print every update.
//!
//! Structured formats stream one document per update (`json` is emitted
//! compact so the stream stays line-delimited). Ctrl-C or `--ticks`
//! stops the poller; table output then closes with a chart of the
//! buffered readings.

use std::fmt::Write;
use std::io::IsTerminal;
use std::time::Duration;

use chrono::Local;
use indicatif::ProgressBar;
use serde::Serialize;

use voltwatch_core::chart::{self, DEFAULT_MAX_POINTS};
use voltwatch_core::{
    ConnectionState, EnergySample, ErrorKind, Metric, PollerState, RealtimePoller, Session,
};

use crate::cli::{GlobalOpts, LiveArgs, OutputFormat};
use crate::commands::util::fmt_unit;
use crate::error::CliError;
use crate::output;

#[derive(Debug, Serialize)]
struct LiveUpdate<'a> {
    tick: u64,
    connection: ConnectionState,
    sample: Option<&'a EnergySample>,
    estimated_cost: Option<f64>,
    currency: &'a str,
    error: Option<&'a str>,
    error_kind: Option<ErrorKind>,
    buffered: usize,
}

impl<'a> LiveUpdate<'a> {
    fn new(state: &'a PollerState, estimated_cost: Option<f64>, currency: &'a str) -> Self {
        Self {
            tick: state.ticks,
            connection: state.connection,
            sample: state.current.as_ref(),
            estimated_cost,
            currency,
            error: state.last_error.as_deref(),
            error_kind: state.last_error_kind,
            buffered: state.history.len(),
        }
    }
}

fn line(update: &LiveUpdate<'_>, color: bool) -> String {
    let status = output::connection_label(update.connection, color);
    let Some(s) = update.sample else {
        return format!(
            "#{:<4} {status}  {}",
            update.tick,
            update.error.unwrap_or("waiting for data")
        );
    };

    let mut out = format!(
        "#{:<4} {}  {:>9}  {:>8}  {:>9}  {:>11}  PF {:.2}  {:>7}  {status}",
        update.tick,
        s.timestamp.with_timezone(&Local).format("%H:%M:%S"),
        fmt_unit(s.voltage, 1, "V"),
        fmt_unit(s.current, 2, "A"),
        fmt_unit(s.power, 1, "W"),
        fmt_unit(s.energy, 3, "kWh"),
        s.power_factor,
        fmt_unit(s.frequency, 1, "Hz"),
    );
    if let Some(cost) = update.estimated_cost {
        let _ = write!(out, "  ~{}", fmt_unit(cost, 2, update.currency));
    }
    if let Some(err) = update.error {
        let _ = write!(out, "  ({err})");
    }
    out
}

fn plain(update: &LiveUpdate<'_>) -> String {
    update.sample.map_or_else(
        || format!("{}\t{}", update.tick, update.connection),
        |s| format!("{}\t{}\t{}\t{}", update.tick, s.timestamp.to_rfc3339(), s.power, s.energy),
    )
}

fn waiting_spinner(global: &GlobalOpts) -> Option<ProgressBar> {
    if global.quiet || global.output != OutputFormat::Table || !std::io::stderr().is_terminal() {
        return None;
    }
    let spinner = ProgressBar::new_spinner();
    spinner.set_message("waiting for the first reading...");
    spinner.enable_steady_tick(Duration::from_millis(120));
    Some(spinner)
}

pub async fn handle(session: &Session, args: &LiveArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let poller = RealtimePoller::new(session.clone());
    let mut rx = poller.subscribe();
    let format = match global.output {
        OutputFormat::Json => OutputFormat::JsonCompact,
        other => other,
    };
    let color = crate::output::should_color(global.color);
    let currency = session.tariff().currency.clone();

    let mut spinner = waiting_spinner(global);
    poller.start();

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let mut interrupted = false;
    loop {
        tokio::select! {
            biased;
            _ = &mut ctrl_c => {
                interrupted = true;
                break;
            }
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                if let Some(s) = spinner.take() {
                    s.finish_and_clear();
                }
                let state = rx.borrow_and_update().clone();
                let update = LiveUpdate::new(&state, poller.estimated_cost(), &currency);
                let out = output::render_single(format, &update, |u| line(u, color), plain);
                output::print_output(&out, global.quiet);

                if args.ticks.is_some_and(|n| state.ticks >= n) {
                    break;
                }
            }
        }
    }

    if let Some(s) = spinner.take() {
        s.finish_and_clear();
    }
    poller.stop().await;

    let state = poller.state();
    tracing::info!(
        ticks = state.ticks,
        failures = state.failures,
        interrupted,
        "live session finished"
    );

    if global.output == OutputFormat::Table && !global.quiet && !state.history.is_empty() {
        let metric = Metric::from(args.metric);
        let series = chart::realtime_series(&state.history.to_vec(), metric);
        let points = chart::downsample(&series, DEFAULT_MAX_POINTS);
        eprintln!(
            "\n{} readings buffered, {} failed polls",
            state.history.len(),
            state.failures
        );
        output::print_output(&output::render_chart(&points, metric.unit()), false);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::DateTime;
    use voltwatch_core::HistoryBuffer;

    use super::*;

    fn state_with(sample: Option<EnergySample>, error: Option<&str>) -> PollerState {
        PollerState {
            current: sample,
            connection: ConnectionState::Disconnected,
            history: HistoryBuffer::new(10),
            last_error: error.map(str::to_owned),
            last_error_kind: None,
            ticks: 3,
            failures: 0,
            updated_at: None,
        }
    }

    fn sample() -> EnergySample {
        EnergySample {
            voltage: 229.8,
            current: 1.25,
            power: 287.3,
            energy: 1.234,
            power_factor: 0.95,
            frequency: 50.0,
            timestamp: DateTime::parse_from_rfc3339("2025-05-17T19:00:00+00:00")
                .unwrap_or_else(|e| panic!("fixture: {e}")),
            device_id: "ESP32_EnergyMonitor".into(),
        }
    }

    #[test]
    fn line_shows_reading_and_cost() {
        let state = state_with(Some(sample()), None);
        let update = LiveUpdate::new(&state, Some(0.22), "PEN");
        let text = line(&update, false);
        assert!(text.contains("229.8 V"), "{text}");
        assert!(text.contains("287.3 W"), "{text}");
        assert!(text.contains("~0.22 PEN"), "{text}");
    }

    #[test]
    fn line_without_sample_shows_error() {
        let state = state_with(None, Some("Server unreachable: refused"));
        let update = LiveUpdate::new(&state, None, "PEN");
        let text = line(&update, false);
        assert!(text.contains("disconnected"), "{text}");
        assert!(text.contains("Server unreachable"), "{text}");
    }

    #[test]
    fn plain_is_tab_separated() {
        let state = state_with(Some(sample()), None);
        let update = LiveUpdate::new(&state, None, "PEN");
        assert_eq!(plain(&update), "3\t2025-05-17T19:00:00+00:00\t287.3\t1.234");
    }
}
