//! Clap derive structures for the `voltwatch` CLI.
//!
//! Defines the command tree, global flags, and shared value enums.

use clap::{Args, Parser, Subcommand, ValueEnum};

use voltwatch_core::{Metric, Period};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// voltwatch -- live readings, history and costs from an energy monitor
#[derive(Debug, Parser)]
#[command(
    name = "voltwatch",
    version,
    about = "Watch an ESP32 energy monitor from the command line",
    long_about = "Client for energy-telemetry servers fed by ESP32 power meters.\n\n\
        Streams live readings, aggregates day/week/month/year history and\n\
        prices consumption with a peak/off-peak tariff.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Server profile to use
    #[arg(long, short = 'p', env = "VOLTWATCH_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Server URL (overrides profile)
    #[arg(long, short = 'u', env = "VOLTWATCH_URL", global = true)]
    pub url: Option<String>,

    /// Device identifier (overrides profile)
    #[arg(long, short = 'd', env = "VOLTWATCH_DEVICE", global = true)]
    pub device: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "VOLTWATCH_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Accept self-signed TLS certificates
    #[arg(long, short = 'k', env = "VOLTWATCH_INSECURE", global = true)]
    pub insecure: bool,

    /// Per-request timeout in seconds (overrides profile)
    #[arg(long, env = "VOLTWATCH_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
    JsonCompact,
    Yaml,
    Plain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ColorMode {
    Auto,
    Always,
    Never,
}

/// Aggregation period accepted on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PeriodArg {
    Day,
    Week,
    Month,
    Year,
}

impl From<PeriodArg> for Period {
    fn from(arg: PeriodArg) -> Self {
        match arg {
            PeriodArg::Day => Period::Day,
            PeriodArg::Week => Period::Week,
            PeriodArg::Month => Period::Month,
            PeriodArg::Year => Period::Year,
        }
    }
}

/// Sample field to chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MetricArg {
    Voltage,
    Current,
    Power,
    Energy,
    PowerFactor,
    Frequency,
}

impl From<MetricArg> for Metric {
    fn from(arg: MetricArg) -> Self {
        match arg {
            MetricArg::Voltage => Metric::Voltage,
            MetricArg::Current => Metric::Current,
            MetricArg::Power => Metric::Power,
            MetricArg::Energy => Metric::Energy,
            MetricArg::PowerFactor => Metric::PowerFactor,
            MetricArg::Frequency => Metric::Frequency,
        }
    }
}

// ── Commands ─────────────────────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Stream live readings until Ctrl-C
    Live(LiveArgs),

    /// Show consumption history for a period
    History(HistoryArgs),

    /// Show the time-of-use cost report for a period
    Cost(CostArgs),

    /// Authenticate and store a bearer token
    Login,

    /// Forget the stored bearer token
    Logout(LogoutArgs),

    /// Manage configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Debug, Args)]
pub struct LiveArgs {
    /// Stop after this many poll ticks
    #[arg(long, short = 'n')]
    pub ticks: Option<u64>,

    /// Metric plotted in the closing summary chart
    #[arg(long, short = 'm', default_value = "power")]
    pub metric: MetricArg,
}

#[derive(Debug, Args)]
pub struct HistoryArgs {
    /// Aggregation period
    pub period: PeriodArg,

    /// Anchor date (YYYY, YYYY-MM or YYYY-MM-DD); defaults to today
    #[arg(long)]
    pub date: Option<String>,

    /// Move the anchor by N periods (negative goes back)
    #[arg(long, short = 's', default_value_t = 0, allow_hyphen_values = true)]
    pub shift: i32,

    /// Maximum number of chart points
    #[arg(long, default_value_t = voltwatch_core::chart::DEFAULT_MAX_POINTS)]
    pub max_points: usize,

    /// Metric to chart
    #[arg(long, short = 'm', default_value = "power")]
    pub metric: MetricArg,

    /// Show the grouped energy bar view instead of the line series
    #[arg(long)]
    pub bars: bool,
}

#[derive(Debug, Args)]
pub struct CostArgs {
    /// Aggregation period
    pub period: PeriodArg,

    /// Anchor date (YYYY, YYYY-MM or YYYY-MM-DD); defaults to today
    #[arg(long)]
    pub date: Option<String>,

    /// Move the anchor by N periods (negative goes back)
    #[arg(long, short = 's', default_value_t = 0, allow_hyphen_values = true)]
    pub shift: i32,
}

#[derive(Debug, Args)]
pub struct LogoutArgs {
    /// Also remove the profile password from the system keyring
    #[arg(long)]
    pub forget_password: bool,
}

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Create initial config file with guided setup
    Init,

    /// Display current resolved configuration
    Show,

    /// Print the config file location
    Path,

    /// List configured profiles
    Profiles,

    /// Set the default profile
    Use {
        /// Profile name to set as default
        name: String,
    },

    /// Store a password in the system keyring
    SetPassword {
        /// Profile name
        #[arg(long)]
        profile: Option<String>,
    },
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn command_tree_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn negative_shift_parses() {
        let cli = Cli::try_parse_from(["voltwatch", "history", "month", "--shift", "-2"])
            .unwrap_or_else(|e| panic!("parse failed: {e}"));
        match cli.command {
            Command::History(args) => {
                assert_eq!(args.shift, -2);
                assert_eq!(Period::from(args.period), Period::Month);
                assert!(args.date.is_none());
            }
            other => panic!("expected history, got {other:?}"),
        }
    }

    #[test]
    fn metric_arg_maps_to_core_metric() {
        assert_eq!(Metric::from(MetricArg::PowerFactor), Metric::PowerFactor);
        assert_eq!(Metric::from(MetricArg::Energy), Metric::Energy);
    }
}
