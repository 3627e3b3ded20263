//! StatGuard CLI.

use clap::Parser;
use stat_guard::analyzers::{Comparator, DatasetProfiler, ProfileOptions};
use stat_guard::api::{self, ValidateOptions};
use stat_guard::core::{ColumnRoles, DatasetView, Policy, Report};
use stat_guard::formatters::{
    FormatterConfig, HtmlFormatter, HumanFormatter, JsonFormatter, MarkdownFormatter, ReportFormatter,
};
use stat_guard::logging::setup::{init_logging, LoggingConfig};
use stat_guard::prelude::*;
use stat_guard::sources::{CsvSource, DataSource};
use std::io::{self, IsTerminal};
use std::path::Path;

mod cli;

use crate::cli::{Cli, Command, CompareArgs, LogFormatArg, OutputFormat, ProfileArgs, ValidateArgs};

/// Exit code for a clean run.
const EXIT_OK: i32 = 0;
/// Exit code when validation fails or drift is detected.
const EXIT_FINDINGS: i32 = 1;
/// Exit code for usage, I/O or configuration errors.
const EXIT_ERROR: i32 = 2;

fn main() {
    let cli = Cli::parse();
    if let Err(error) = init_logging(logging_config_from_cli(&cli)) {
        eprintln!("error: failed to initialize logging: {error}");
        std::process::exit(EXIT_ERROR);
    }

    let result = match cli.command {
        Command::Validate(args) => run_validate(&args),
        Command::Profile(args) => run_profile(&args),
        Command::Compare(args) => run_compare(&args),
        Command::Checks => run_checks(),
        Command::Policies => run_policies(),
    };
    let exit_code = match result {
        Ok(code) => code,
        Err(error) => {
            eprintln!("error: {error}");
            EXIT_ERROR
        }
    };
    std::process::exit(exit_code);
}

/// Maps `-v`/`-q` flags onto the StatGuard log level.
fn logging_config_from_cli(cli: &Cli) -> LoggingConfig {
    let json = cli.log_format == LogFormatArg::Json;
    let config = LoggingConfig::default().with_json_format(json);
    match cli.verbosity.tracing_level() {
        Some(level) => config.with_stat_guard_level(level),
        None => config.with_env_filter("off"),
    }
}

fn load(path: &Path) -> Result<DatasetView> {
    CsvSource::new(path).load()
}

fn resolve_policy(policy: &str) -> Result<Policy> {
    let path = Path::new(policy);
    let is_file = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));
    if is_file {
        Policy::from_json_file(path)
    } else {
        Policy::named(policy)
    }
}

fn render(report: &Report, format: OutputFormat, colors: bool) -> Result<String> {
    match format {
        OutputFormat::Human => {
            HumanFormatter::with_config(FormatterConfig::default().with_colors(colors)).format(report)
        }
        OutputFormat::Json => JsonFormatter::new().format(report),
        OutputFormat::Markdown => MarkdownFormatter::new().format(report),
        OutputFormat::Html => HtmlFormatter::new().format(report),
    }
}

fn run_validate(args: &ValidateArgs) -> Result<i32> {
    let view = load(&args.file)?;
    let policy = resolve_policy(&args.policy)?;

    let mut roles = ColumnRoles::new().with_target(&args.target);
    if let Some(group) = &args.group {
        roles = roles.with_group(group);
    }
    if let Some(unit) = &args.unit {
        roles = roles.with_unit(unit);
    }
    if let Some(time) = &args.time {
        roles = roles.with_time(time);
    }

    let options = ValidateOptions::new()
        .fail_fast(args.fail_fast)
        .parallel(args.parallel);
    let report = api::validate_with(&view, &roles, &policy, options)?;

    let colors = !args.no_color && io::stdout().is_terminal();
    print!("{}", render(&report, args.format, colors)?);

    if let Some(output) = &args.output {
        report.save(output)?;
        eprintln!("Report saved to: {}", output.display());
    }

    Ok(if report.is_valid() { EXIT_OK } else { EXIT_FINDINGS })
}

fn run_profile(args: &ProfileArgs) -> Result<i32> {
    let view = load(&args.file)?;
    let options = ProfileOptions::default().with_correlations(!args.no_correlations);
    let profile = DatasetProfiler::new(options).profile(&view)?;

    match args.format {
        OutputFormat::Json => println!("{}", profile.to_json()?),
        _ => print!("{}", profile.to_human()?),
    }
    if let Some(output) = &args.output {
        std::fs::write(output, profile.to_json()?)
            .with_context(|| format!("writing profile to {}", output.display()))?;
        eprintln!("Profile saved to: {}", output.display());
    }
    Ok(EXIT_OK)
}

fn run_compare(args: &CompareArgs) -> Result<i32> {
    let a = load(&args.file_a)?;
    let b = load(&args.file_b)?;
    let result = Comparator::new().alpha(args.alpha).compare(&a, &b, &args.target)?;

    match args.format {
        OutputFormat::Json => println!("{}", result.to_json()?),
        _ => print!("{}", result.to_human()?),
    }
    if let Some(output) = &args.output {
        std::fs::write(output, result.to_json()?)
            .with_context(|| format!("writing comparison to {}", output.display()))?;
        eprintln!("Comparison saved to: {}", output.display());
    }
    Ok(if result.drift_detected { EXIT_FINDINGS } else { EXIT_OK })
}

fn run_checks() -> Result<i32> {
    for check in api::list_checks() {
        println!("{}  {:<28} {:<12} {}", check.code, check.name, check.category.as_str(), check.description);
    }
    Ok(EXIT_OK)
}

fn run_policies() -> Result<i32> {
    for name in api::available_policies() {
        let policy = Policy::named(&name)?;
        println!("{name:<14} {}", policy.description());
    }
    Ok(EXIT_OK)
}
