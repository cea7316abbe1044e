//! `cost` handler: time-of-use cost report for a period.

use std::fmt::Write;

use voltwatch_core::model::{parse_date, period_title};
use voltwatch_core::{CostReport, HistoryAggregator, Period, Session};

use crate::cli::{CostArgs, GlobalOpts};
use crate::commands::util::{self, fmt_unit};
use crate::error::CliError;
use crate::output;

fn detail(report: &CostReport) -> String {
    let title = parse_date(&report.date).map_or_else(
        |_| report.date.clone(),
        |date| period_title(report.period, date),
    );
    let currency = report.costs.currency.as_str();
    let c = &report.consumption;
    let t = &report.tariff;

    let mut out = String::new();
    let _ = writeln!(out, "Cost report: {title} ({})", report.period);
    let _ = writeln!(out);
    let _ = writeln!(out, "  Consumption");
    let _ = writeln!(out, "    Total:         {}", fmt_unit(c.total_kwh, 3, "kWh"));
    let _ = writeln!(out, "    Daily average: {}", fmt_unit(c.daily_average, 3, "kWh"));
    let _ = writeln!(out, "    Peak hours:    {}", fmt_unit(c.peak_hours_kwh, 3, "kWh"));
    let _ = writeln!(out, "    Off-peak:      {}", fmt_unit(c.off_peak_kwh, 3, "kWh"));
    let _ = writeln!(out);
    let _ = writeln!(out, "  Costs");
    let _ = writeln!(out, "    Total:         {}", fmt_unit(report.costs.total_cost, 2, currency));
    let _ = writeln!(out, "    Peak hours:    {}", fmt_unit(report.costs.peak_hours_cost, 2, currency));
    let _ = writeln!(out, "    Off-peak:      {}", fmt_unit(report.costs.off_peak_cost, 2, currency));
    let _ = writeln!(out);
    let _ = writeln!(out, "  Tariff");
    let _ = writeln!(out, "    Peak rate:     {} /kWh", fmt_unit(t.peak_rate, 2, currency));
    let _ = writeln!(out, "    Off-peak rate: {} /kWh", fmt_unit(t.off_peak_rate, 2, currency));
    let _ = write!(out, "    Peak hours:    {}", t.peak_hours);
    out
}

fn plain(report: &CostReport) -> String {
    format!("{:.2}\t{}", report.costs.total_cost, report.costs.currency)
}

pub async fn handle(session: &Session, args: &CostArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let period = Period::from(args.period);
    let key = util::resolve_date_key(period, args.date.as_deref(), args.shift)?;

    let aggregator = HistoryAggregator::new(session.clone());
    let query = aggregator.query(period, &key).await?;

    let out = output::render_single(global.output, &query.cost, detail, plain);
    output::print_output(&out, global.quiet);
    Ok(())
}
