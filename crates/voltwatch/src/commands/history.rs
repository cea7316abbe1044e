//! `history` handler: period summary and a chart-ready series.

use std::fmt::Write;

use serde::Serialize;

use voltwatch_core::chart::{self, DEFAULT_MAX_BARS};
use voltwatch_core::model::{parse_date, period_title};
use voltwatch_core::{ChartPoint, HistoryAggregator, HistoryQuery, Metric, Period, Session, Summary};

use crate::cli::{GlobalOpts, HistoryArgs};
use crate::commands::util::{self, fmt_unit};
use crate::error::CliError;
use crate::output;

#[derive(Debug, Serialize)]
struct HistoryView<'a> {
    title: String,
    period: Period,
    date: &'a str,
    device_id: &'a str,
    samples: usize,
    summary: &'a Summary,
    /// `energy` for the bar view, otherwise the requested metric.
    metric: Metric,
    points: Vec<ChartPoint>,
}

impl<'a> HistoryView<'a> {
    fn build(query: &'a HistoryQuery, device_id: &'a str, args: &HistoryArgs) -> Result<Self, CliError> {
        let window = &query.window;
        let (metric, points) = if args.bars {
            (Metric::Energy, chart::group_bars(&window.samples, DEFAULT_MAX_BARS))
        } else {
            let metric = Metric::from(args.metric);
            let series = chart::series(window.period, &window.samples, metric);
            (metric, chart::downsample(&series, args.max_points))
        };
        Ok(Self {
            title: period_title(window.period, parse_date(&window.date)?),
            period: window.period,
            date: &window.date,
            device_id,
            samples: window.samples.len(),
            summary: &window.summary,
            metric,
            points,
        })
    }
}

fn detail(view: &HistoryView<'_>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} ({}, {})", view.title, view.period, view.device_id);
    let _ = writeln!(out);
    let _ = writeln!(out, "  Total energy:  {}", fmt_unit(view.summary.total_energy, 3, "kWh"));
    let _ = writeln!(out, "  Average power: {}", fmt_unit(view.summary.avg_power, 1, "W"));
    let _ = writeln!(out, "  Peak power:    {}", fmt_unit(view.summary.max_power, 1, "W"));
    let _ = writeln!(out, "  Min power:     {}", fmt_unit(view.summary.min_power, 1, "W"));
    let _ = writeln!(out, "  Samples:       {}", view.samples);
    let _ = writeln!(out);
    let _ = write!(out, "{}", output::render_chart(&view.points, view.metric.unit()));
    out
}

fn plain(view: &HistoryView<'_>) -> String {
    view.points
        .iter()
        .map(|p| format!("{}\t{}", p.label, p.value))
        .collect::<Vec<_>>()
        .join("\n")
}

pub async fn handle(session: &Session, args: &HistoryArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let period = Period::from(args.period);
    let key = util::resolve_date_key(period, args.date.as_deref(), args.shift)?;

    let aggregator = HistoryAggregator::new(session.clone());
    let query = aggregator.query(period, &key).await?;

    let view = HistoryView::build(&query, session.device_id(), args)?;
    let out = output::render_single(global.output, &view, detail, plain);
    output::print_output(&out, global.quiet);
    Ok(())
}
