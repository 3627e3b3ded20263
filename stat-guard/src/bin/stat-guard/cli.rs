//! CLI argument definitions.

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "stat-guard",
    version,
    about = "StatGuard: statistical validation of tabular data",
    after_help = "Examples:\n  stat-guard validate data.csv --target metric --group treatment\n  stat-guard profile data.csv --output profile.json\n  stat-guard compare train.csv test.csv --target metric"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for info, -vv for debug, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Log output format.
    #[arg(long = "log-format", value_enum, default_value = "pretty", global = true)]
    pub log_format: LogFormatArg,
}

#[derive(Subcommand)]
pub enum Command {
    /// Validate a CSV file for statistical analysis.
    Validate(ValidateArgs),
    /// Profile every column of a CSV file.
    Profile(ProfileArgs),
    /// Compare one column between two CSV files.
    Compare(CompareArgs),
    /// List the registered checks.
    Checks,
    /// List the available policies.
    Policies,
}

#[derive(Args)]
pub struct ValidateArgs {
    /// Input CSV file.
    pub file: PathBuf,

    /// Target column to validate.
    #[arg(short = 't', long)]
    pub target: String,

    /// Grouping column.
    #[arg(short = 'g', long)]
    pub group: Option<String>,

    /// Unit identifier column.
    #[arg(short = 'u', long)]
    pub unit: Option<String>,

    /// Timestamp column.
    #[arg(long)]
    pub time: Option<String>,

    /// Policy name, or a path to a JSON policy file.
    #[arg(short = 'p', long, default_value = "default")]
    pub policy: String,

    /// Stop after the first check that reports an error.
    #[arg(long)]
    pub fail_fast: bool,

    /// Evaluate checks in parallel.
    #[arg(long)]
    pub parallel: bool,

    /// Write the report to this file; the format follows the extension.
    #[arg(short = 'o', long)]
    pub output: Option<PathBuf>,

    /// Format of the report printed to stdout.
    #[arg(long, value_enum, default_value = "human")]
    pub format: OutputFormat,

    /// Disable colored output.
    #[arg(long)]
    pub no_color: bool,
}

#[derive(Args)]
pub struct ProfileArgs {
    /// Input CSV file.
    pub file: PathBuf,

    /// Skip the pairwise correlation matrix.
    #[arg(long)]
    pub no_correlations: bool,

    /// Write the profile as JSON to this file.
    #[arg(short = 'o', long)]
    pub output: Option<PathBuf>,

    /// Format of the profile printed to stdout.
    #[arg(long, value_enum, default_value = "human")]
    pub format: OutputFormat,
}

#[derive(Args)]
pub struct CompareArgs {
    /// First CSV file.
    pub file_a: PathBuf,

    /// Second CSV file.
    pub file_b: PathBuf,

    /// Column to compare.
    #[arg(short = 't', long)]
    pub target: String,

    /// Significance level.
    #[arg(long, default_value_t = stat_guard::analyzers::DEFAULT_DRIFT_ALPHA)]
    pub alpha: f64,

    /// Write the comparison as JSON to this file.
    #[arg(short = 'o', long)]
    pub output: Option<PathBuf>,

    /// Format of the comparison printed to stdout.
    #[arg(long, value_enum, default_value = "human")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Human,
    Json,
    Markdown,
    Html,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Json,
}
