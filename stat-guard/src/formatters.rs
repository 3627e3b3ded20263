//! Report rendering for StatGuard validation runs.
//!
//! A [`Report`] can be rendered as JSON for programmatic consumption, as
//! human-readable text for terminals, as Markdown for documentation, or as a
//! self-contained HTML page.
//!
//! # Examples
//!
//! ```rust
//! use stat_guard::core::{Report, ReportParts, RunMetadata, Severity, Violation};
//! use stat_guard::formatters::{HumanFormatter, ReportFormatter};
//!
//! let report = Report::from_parts(ReportParts::new(
//!     RunMetadata::new("default"),
//!     vec![Violation::new("SG203", Severity::Warning, "High skewness (2.40) in group 'overall'")],
//! ));
//!
//! let output = HumanFormatter::new().without_colors().format(&report).unwrap();
//! assert!(output.contains("Validation PASSED"));
//! assert!(output.contains("SG203"));
//! ```

use crate::core::{Report, Severity, Violation};
use crate::prelude::*;
use crate::stats::Summary;
use std::fmt::Write;

/// Configuration options for rendering reports.
#[derive(Debug, Clone)]
pub struct FormatterConfig {
    /// Include the severity counts and run metadata
    pub include_summary: bool,
    /// Include individual violations
    pub include_violations: bool,
    /// Include each violation's context values
    pub include_context: bool,
    /// Include skipped checks and their reasons
    pub include_skipped: bool,
    /// Include descriptive statistics of the target
    pub include_target_summary: bool,
    /// Maximum number of violations to display (`None` for all)
    pub max_violations: Option<usize>,
    /// Whether to use colorized output (human formatter)
    pub use_colors: bool,
    /// Whether to include the run timestamp
    pub include_timestamps: bool,
}

impl Default for FormatterConfig {
    fn default() -> Self {
        Self {
            include_summary: true,
            include_violations: true,
            include_context: true,
            include_skipped: true,
            include_target_summary: true,
            max_violations: None,
            use_colors: true,
            include_timestamps: true,
        }
    }
}

impl FormatterConfig {
    /// Creates a minimal configuration showing only the summary.
    pub fn minimal() -> Self {
        Self {
            include_summary: true,
            include_violations: false,
            include_context: false,
            include_skipped: false,
            include_target_summary: false,
            max_violations: Some(0),
            use_colors: false,
            include_timestamps: false,
        }
    }

    /// Creates a configuration suitable for CI logs.
    pub fn ci() -> Self {
        Self {
            include_context: false,
            include_target_summary: false,
            max_violations: Some(50),
            use_colors: false,
            ..Self::default()
        }
    }

    /// Sets whether to include individual violations.
    pub fn with_violations(mut self, include: bool) -> Self {
        self.include_violations = include;
        self
    }

    /// Sets whether to include violation context.
    pub fn with_context(mut self, include: bool) -> Self {
        self.include_context = include;
        self
    }

    /// Sets the maximum number of violations to display.
    pub fn with_max_violations(mut self, max: usize) -> Self {
        self.max_violations = Some(max);
        self
    }

    /// Sets whether to use colorized output.
    pub fn with_colors(mut self, use_colors: bool) -> Self {
        self.use_colors = use_colors;
        self
    }

    /// The violations to render and how many were left out.
    fn visible<'a>(&self, report: &'a Report) -> (&'a [Violation], usize) {
        let all = report.violations();
        if !self.include_violations {
            return (&[], 0);
        }
        let shown = self.max_violations.map_or(all.len(), |max| max.min(all.len()));
        (&all[..shown], all.len() - shown)
    }
}

/// Trait for rendering reports into an output format.
///
/// # Examples
///
/// ```rust
/// use stat_guard::core::Report;
/// use stat_guard::formatters::ReportFormatter;
///
/// struct Verdict;
///
/// impl ReportFormatter for Verdict {
///     fn format(&self, report: &Report) -> stat_guard::prelude::Result<String> {
///         Ok(if report.is_valid() { "ok" } else { "invalid" }.to_string())
///     }
/// }
/// ```
pub trait ReportFormatter {
    /// Renders a report.
    fn format(&self, report: &Report) -> Result<String>;

    /// Renders a report with a custom configuration.
    fn format_with_config(&self, report: &Report, _config: &FormatterConfig) -> Result<String> {
        self.format(report)
    }
}

/// Renders reports as structured JSON.
#[derive(Debug, Clone)]
pub struct JsonFormatter {
    config: FormatterConfig,
    pretty: bool,
}

impl JsonFormatter {
    /// Creates a pretty-printing JSON formatter.
    pub fn new() -> Self {
        Self {
            config: FormatterConfig::default(),
            pretty: true,
        }
    }

    /// Creates a JSON formatter with the specified configuration.
    pub fn with_config(config: FormatterConfig) -> Self {
        Self { config, pretty: true }
    }

    /// Sets whether to pretty-print.
    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }
}

impl Default for JsonFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportFormatter for JsonFormatter {
    fn format(&self, report: &Report) -> Result<String> {
        self.format_with_config(report, &self.config)
    }

    fn format_with_config(&self, report: &Report, config: &FormatterConfig) -> Result<String> {
        let mut filtered = if config.include_timestamps {
            report.clone()
        } else {
            report.without_timestamp()
        };
        if !config.include_violations {
            filtered = filtered.truncated(0);
        } else if let Some(max) = config.max_violations {
            filtered = filtered.truncated(max);
        }

        let rendered = if self.pretty {
            serde_json::to_string_pretty(&filtered)
        } else {
            serde_json::to_string(&filtered)
        };
        rendered.map_err(|e| StatGuardError::Serialization(format!("Failed to serialize report to JSON: {e}")))
    }
}

/// Renders reports for terminals and logs.
#[derive(Debug, Clone)]
pub struct HumanFormatter {
    config: FormatterConfig,
}

impl HumanFormatter {
    /// Creates a colorized human formatter.
    pub fn new() -> Self {
        Self {
            config: FormatterConfig::default(),
        }
    }

    /// Creates a human formatter with the specified configuration.
    pub fn with_config(config: FormatterConfig) -> Self {
        Self { config }
    }

    /// Disables ANSI colors.
    pub fn without_colors(mut self) -> Self {
        self.config.use_colors = false;
        self
    }
}

impl Default for HumanFormatter {
    fn default() -> Self {
        Self::new()
    }
}

fn paint(text: &str, color: &str, enabled: bool) -> String {
    if enabled {
        format!("\x1b[{color}m{text}\x1b[0m")
    } else {
        text.to_string()
    }
}

fn severity_symbol(severity: Severity) -> &'static str {
    match severity {
        Severity::Error => "🚨",
        Severity::Warning => "⚠️",
        Severity::Info => "ℹ️",
    }
}

fn severity_color(severity: Severity) -> &'static str {
    match severity {
        Severity::Error => "31",
        Severity::Warning => "33",
        Severity::Info => "34",
    }
}

fn stat(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v:.3}"))
}

impl ReportFormatter for HumanFormatter {
    fn format(&self, report: &Report) -> Result<String> {
        self.format_with_config(report, &self.config)
    }

    fn format_with_config(&self, report: &Report, config: &FormatterConfig) -> Result<String> {
        let mut output = String::new();
        let metadata = report.metadata();
        let colors = config.use_colors;

        writeln!(output)?;
        if report.is_valid() {
            writeln!(output, "✅ {}", paint("Validation PASSED", "32", colors))?;
        } else {
            writeln!(output, "❌ {}", paint("Validation FAILED", "31", colors))?;
        }
        if !report.is_complete() {
            writeln!(output, "{}", paint("   (run cancelled before all checks ran)", "33", colors))?;
        }

        writeln!(output)?;
        writeln!(output, "Policy: {}", metadata.policy)?;
        writeln!(output, "Dataset: {} rows x {} columns", metadata.n_rows, metadata.n_columns)?;
        if config.include_timestamps && !metadata.timestamp.is_empty() {
            writeln!(output, "Timestamp: {}", metadata.timestamp)?;
        }

        if config.include_summary {
            let summary = report.summary();
            writeln!(output)?;
            writeln!(output, "📊 Summary:")?;
            writeln!(output, "   Checks Run: {}", report.checks_run().len())?;
            writeln!(output, "   Checks Skipped: {}", report.checks_skipped().len())?;
            writeln!(output, "   🚨 Errors: {}", paint(&summary.error.to_string(), "31", colors))?;
            writeln!(output, "   ⚠️  Warnings: {}", paint(&summary.warning.to_string(), "33", colors))?;
            writeln!(output, "   ℹ️  Info: {}", paint(&summary.info.to_string(), "34", colors))?;
            if metadata.stopped_early {
                writeln!(output, "   Stopped early after the first error (fail-fast)")?;
            }
            writeln!(output, "   Execution Time: {}ms", metadata.execution_time_ms)?;
        }

        let (shown, hidden) = config.visible(report);
        if !shown.is_empty() {
            writeln!(output)?;
            writeln!(output, "🔍 Violations:")?;
            for (i, violation) in shown.iter().enumerate() {
                writeln!(output)?;
                let symbol = paint(
                    severity_symbol(violation.severity),
                    severity_color(violation.severity),
                    colors,
                );
                writeln!(
                    output,
                    "   {symbol} #{} [{}] {}",
                    i + 1,
                    violation.code,
                    violation.check_name
                )?;
                writeln!(output, "      Severity: {}", violation.severity)?;
                writeln!(output, "      Message: {}", violation.message)?;
                if let Some(suggestion) = &violation.suggestion {
                    writeln!(output, "      Suggestion: {suggestion}")?;
                }
                if config.include_context {
                    for (key, value) in &violation.context {
                        writeln!(output, "      {key}: {value}")?;
                    }
                }
            }
            if hidden > 0 {
                writeln!(output)?;
                writeln!(output, "   ... and {hidden} more violations")?;
            }
        }

        if config.include_skipped && !report.checks_skipped().is_empty() {
            writeln!(output)?;
            writeln!(output, "⏭️  Skipped Checks:")?;
            for skipped in report.checks_skipped() {
                writeln!(output, "   {} {}: {}", skipped.code, skipped.name, skipped.reason)?;
            }
        }

        if let Some(target) = report.target_summary().filter(|_| config.include_target_summary) {
            writeln!(output)?;
            writeln!(output, "📈 Target '{}':", target.column)?;
            write_summary_line(&mut output, "overall", &target.overall)?;
            for (group, summary) in &target.by_group {
                write_summary_line(&mut output, group, summary)?;
            }
        }

        writeln!(output)?;
        Ok(output)
    }
}

fn write_summary_line(output: &mut String, label: &str, summary: &Summary) -> Result<()> {
    writeln!(
        output,
        "   {label}: n={} mean={} std={} median={} min={} max={}",
        summary.count,
        stat(summary.mean),
        stat(summary.std),
        stat(summary.median),
        stat(summary.min),
        stat(summary.max)
    )?;
    Ok(())
}

/// Renders reports as Markdown.
#[derive(Debug, Clone)]
pub struct MarkdownFormatter {
    config: FormatterConfig,
    heading_level: u8,
}

impl MarkdownFormatter {
    /// Creates a Markdown formatter starting at heading level 2.
    pub fn new() -> Self {
        Self {
            config: FormatterConfig::default(),
            heading_level: 2,
        }
    }

    /// Creates a Markdown formatter with the specified configuration.
    pub fn with_config(config: FormatterConfig) -> Self {
        Self {
            config,
            heading_level: 2,
        }
    }

    /// Sets the base heading level for the output.
    pub fn with_heading_level(mut self, level: u8) -> Self {
        self.heading_level = level.clamp(1, 5);
        self
    }
}

impl Default for MarkdownFormatter {
    fn default() -> Self {
        Self::new()
    }
}

/// Escapes table cell separators.
fn cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}

impl ReportFormatter for MarkdownFormatter {
    fn format(&self, report: &Report) -> Result<String> {
        self.format_with_config(report, &self.config)
    }

    fn format_with_config(&self, report: &Report, config: &FormatterConfig) -> Result<String> {
        let mut output = String::new();
        let metadata = report.metadata();
        let h = "#".repeat(usize::from(self.heading_level));

        if report.is_valid() {
            writeln!(output, "{h} ✅ StatGuard Report - PASSED")?;
        } else {
            writeln!(output, "{h} ❌ StatGuard Report - FAILED")?;
        }
        writeln!(output)?;
        writeln!(output, "**Policy:** {}", metadata.policy)?;
        writeln!(output, "**Dataset:** {} rows x {} columns", metadata.n_rows, metadata.n_columns)?;
        if config.include_timestamps && !metadata.timestamp.is_empty() {
            writeln!(output, "**Timestamp:** {}", metadata.timestamp)?;
        }
        if !report.is_complete() {
            writeln!(output)?;
            writeln!(output, "> **Note:** the run was cancelled before all checks ran.")?;
        }

        if config.include_summary {
            let summary = report.summary();
            writeln!(output)?;
            writeln!(output, "{h}# Summary")?;
            writeln!(output)?;
            writeln!(output, "| Metric | Value |")?;
            writeln!(output, "|--------|-------|")?;
            writeln!(output, "| Checks Run | {} |", report.checks_run().len())?;
            writeln!(output, "| Checks Skipped | {} |", report.checks_skipped().len())?;
            writeln!(output, "| Errors | {} |", summary.error)?;
            writeln!(output, "| Warnings | {} |", summary.warning)?;
            writeln!(output, "| Info | {} |", summary.info)?;
            writeln!(output, "| Execution Time | {}ms |", metadata.execution_time_ms)?;
        }

        let (shown, hidden) = config.visible(report);
        if !shown.is_empty() {
            writeln!(output)?;
            writeln!(output, "{h}# Violations")?;
            writeln!(output)?;
            writeln!(output, "| | Code | Check | Message | Suggestion |")?;
            writeln!(output, "|---|------|-------|---------|------------|")?;
            for violation in shown {
                writeln!(
                    output,
                    "| {} | {} | {} | {} | {} |",
                    severity_symbol(violation.severity),
                    violation.code,
                    cell(&violation.check_name),
                    cell(&violation.message),
                    cell(violation.suggestion.as_deref().unwrap_or(""))
                )?;
            }
            if hidden > 0 {
                writeln!(output)?;
                writeln!(output, "> **Note:** {hidden} additional violations not shown in this report.")?;
            }
        }

        if config.include_skipped && !report.checks_skipped().is_empty() {
            writeln!(output)?;
            writeln!(output, "{h}# Skipped Checks")?;
            writeln!(output)?;
            for skipped in report.checks_skipped() {
                writeln!(output, "- **{}** {}: {}", skipped.code, skipped.name, skipped.reason)?;
            }
        }

        if let Some(target) = report.target_summary().filter(|_| config.include_target_summary) {
            writeln!(output)?;
            writeln!(output, "{h}# Target `{}`", target.column)?;
            writeln!(output)?;
            writeln!(output, "| Group | n | Mean | Std | Median | Min | Max |")?;
            writeln!(output, "|-------|---|------|-----|--------|-----|-----|")?;
            let rows = std::iter::once(("overall", &target.overall))
                .chain(target.by_group.iter().map(|(group, summary)| (group.as_str(), summary)));
            for (group, summary) in rows {
                writeln!(
                    output,
                    "| {} | {} | {} | {} | {} | {} | {} |",
                    cell(group),
                    summary.count,
                    stat(summary.mean),
                    stat(summary.std),
                    stat(summary.median),
                    stat(summary.min),
                    stat(summary.max)
                )?;
            }
        }

        Ok(output)
    }
}

/// Renders reports as a standalone HTML page.
#[derive(Debug, Clone)]
pub struct HtmlFormatter {
    config: FormatterConfig,
    title: String,
}

impl HtmlFormatter {
    /// Creates an HTML formatter with the default title.
    pub fn new() -> Self {
        Self {
            config: FormatterConfig::default(),
            title: "StatGuard Validation Report".to_string(),
        }
    }

    /// Creates an HTML formatter with the specified configuration.
    pub fn with_config(config: FormatterConfig) -> Self {
        Self {
            config,
            ..Self::new()
        }
    }

    /// Sets the page title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }
}

impl Default for HtmlFormatter {
    fn default() -> Self {
        Self::new()
    }
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

const HTML_STYLE: &str = "body{font-family:sans-serif;margin:2em;color:#222}\
table{border-collapse:collapse;margin:1em 0}\
td,th{border:1px solid #ccc;padding:4px 8px;text-align:left}\
.passed{color:#1a7f37}.failed{color:#cf222e}\
.error{background:#ffebe9}.warning{background:#fff8c5}.info{background:#ddf4ff}";

impl ReportFormatter for HtmlFormatter {
    fn format(&self, report: &Report) -> Result<String> {
        self.format_with_config(report, &self.config)
    }

    fn format_with_config(&self, report: &Report, config: &FormatterConfig) -> Result<String> {
        let mut output = String::new();
        let metadata = report.metadata();
        let title = escape_html(&self.title);

        writeln!(output, "<!DOCTYPE html>")?;
        writeln!(output, "<html lang=\"en\">")?;
        writeln!(output, "<head>")?;
        writeln!(output, "<meta charset=\"utf-8\">")?;
        writeln!(output, "<title>{title}</title>")?;
        writeln!(output, "<style>{HTML_STYLE}</style>")?;
        writeln!(output, "</head>")?;
        writeln!(output, "<body>")?;
        writeln!(output, "<h1>{title}</h1>")?;
        if report.is_valid() {
            writeln!(output, "<p class=\"passed\"><strong>PASSED</strong></p>")?;
        } else {
            writeln!(output, "<p class=\"failed\"><strong>FAILED</strong></p>")?;
        }
        writeln!(
            output,
            "<p>Policy: {} &middot; {} rows &times; {} columns</p>",
            escape_html(&metadata.policy),
            metadata.n_rows,
            metadata.n_columns
        )?;
        if config.include_timestamps && !metadata.timestamp.is_empty() {
            writeln!(output, "<p>Generated: {}</p>", escape_html(&metadata.timestamp))?;
        }
        if !report.is_complete() {
            writeln!(output, "<p><em>The run was cancelled before all checks ran.</em></p>")?;
        }

        if config.include_summary {
            let summary = report.summary();
            writeln!(output, "<h2>Summary</h2>")?;
            writeln!(output, "<table>")?;
            writeln!(output, "<tr><th>Checks run</th><td>{}</td></tr>", report.checks_run().len())?;
            writeln!(output, "<tr><th>Checks skipped</th><td>{}</td></tr>", report.checks_skipped().len())?;
            writeln!(output, "<tr class=\"error\"><th>Errors</th><td>{}</td></tr>", summary.error)?;
            writeln!(output, "<tr class=\"warning\"><th>Warnings</th><td>{}</td></tr>", summary.warning)?;
            writeln!(output, "<tr class=\"info\"><th>Info</th><td>{}</td></tr>", summary.info)?;
            writeln!(output, "</table>")?;
        }

        let (shown, hidden) = config.visible(report);
        if !shown.is_empty() {
            writeln!(output, "<h2>Violations</h2>")?;
            writeln!(output, "<table>")?;
            writeln!(output, "<tr><th>Severity</th><th>Code</th><th>Check</th><th>Message</th><th>Suggestion</th></tr>")?;
            for violation in shown {
                writeln!(
                    output,
                    "<tr class=\"{severity}\"><td>{severity}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
                    escape_html(&violation.code),
                    escape_html(&violation.check_name),
                    escape_html(&violation.message),
                    escape_html(violation.suggestion.as_deref().unwrap_or("")),
                    severity = violation.severity
                )?;
            }
            writeln!(output, "</table>")?;
            if hidden > 0 {
                writeln!(output, "<p>{hidden} additional violations not shown.</p>")?;
            }
        }

        if config.include_skipped && !report.checks_skipped().is_empty() {
            writeln!(output, "<h2>Skipped checks</h2>")?;
            writeln!(output, "<ul>")?;
            for skipped in report.checks_skipped() {
                writeln!(
                    output,
                    "<li><strong>{}</strong> {}: {}</li>",
                    escape_html(&skipped.code),
                    escape_html(&skipped.name),
                    escape_html(&skipped.reason.to_string())
                )?;
            }
            writeln!(output, "</ul>")?;
        }

        writeln!(output, "</body>")?;
        writeln!(output, "</html>")?;
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ReportParts, Role, RunMetadata, SkipReason, SkippedCheck};

    fn create_test_report() -> Report {
        let mut metadata = RunMetadata::new("strict");
        metadata.n_rows = 120;
        metadata.n_columns = 4;
        metadata.execution_time_ms = 15;

        let mut parts = ReportParts::new(
            metadata,
            vec![
                Violation::new("SG201", Severity::Error, "Zero or near-zero variance in group 'overall' (var=0.00e0)")
                    .with_check_name("Zero Variance")
                    .with_suggestion("Metric has no variability")
                    .with_context("variance", 0.0),
                Violation::new("SG203", Severity::Warning, "High skewness (2.40) in group 'a|b'")
                    .with_check_name("Skewness <shape>"),
            ],
        );
        parts.checks_run = vec!["SG201".to_string(), "SG203".to_string()];
        parts.checks_skipped = vec![SkippedCheck {
            code: "SG301".to_string(),
            name: "Duplicate Units".to_string(),
            reason: SkipReason::MissingRole { role: Role::Unit },
        }];
        Report::from_parts(parts)
    }

    #[test]
    fn test_formatter_config() {
        let config = FormatterConfig::default();
        assert!(config.include_violations);
        assert!(config.use_colors);
        assert_eq!(config.max_violations, None);

        let minimal = FormatterConfig::minimal();
        assert!(!minimal.include_violations);
        assert!(!minimal.use_colors);

        let ci = FormatterConfig::ci();
        assert!(!ci.use_colors);
        assert_eq!(ci.max_violations, Some(50));
    }

    #[test]
    fn test_json_formatter() {
        let report = create_test_report();
        let output = JsonFormatter::new().format(&report).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed["is_valid"], false);
        assert_eq!(parsed["summary"]["error"], 1);
        assert_eq!(parsed["violations"][0]["code"], "SG201");
        assert_eq!(parsed["metadata"]["policy"], "strict");

        let minimal = JsonFormatter::new()
            .with_pretty(false)
            .format_with_config(&report, &FormatterConfig::minimal())
            .unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&minimal).unwrap();
        assert_eq!(parsed["violations"].as_array().unwrap().len(), 0);
        assert_eq!(parsed["summary"]["total"], 2);
        assert_eq!(parsed["metadata"]["timestamp"], "");
    }

    #[test]
    fn test_human_formatter() {
        let report = create_test_report();
        let output = HumanFormatter::new().format(&report).unwrap();
        assert!(output.contains("Validation FAILED"));
        assert!(output.contains("Policy: strict"));
        assert!(output.contains("[SG201] Zero Variance"));
        assert!(output.contains("SG301 Duplicate Units: no unit column bound"));
        assert!(output.contains("\x1b["));

        let plain = HumanFormatter::new().without_colors().format(&report).unwrap();
        assert!(!plain.contains("\x1b["));
        assert!(plain.contains("variance: 0.0"));
    }

    #[test]
    fn test_max_violations() {
        let report = create_test_report();
        let config = FormatterConfig::default().with_colors(false).with_max_violations(1);
        let output = HumanFormatter::new().format_with_config(&report, &config).unwrap();
        assert!(output.contains("#1"));
        assert!(!output.contains("#2"));
        assert!(output.contains("... and 1 more violations"));
    }

    #[test]
    fn test_markdown_formatter() {
        let report = create_test_report();
        let output = MarkdownFormatter::new().format(&report).unwrap();
        assert!(output.contains("## ❌ StatGuard Report - FAILED"));
        assert!(output.contains("**Policy:** strict"));
        assert!(output.contains("| Errors | 1 |"));
        assert!(output.contains("group 'a\\|b'"));

        let output = MarkdownFormatter::new().with_heading_level(1).format(&report).unwrap();
        assert!(output.starts_with("# ❌"));
    }

    #[test]
    fn test_html_formatter_escapes() {
        let report = create_test_report();
        let output = HtmlFormatter::new().format(&report).unwrap();
        assert!(output.starts_with("<!DOCTYPE html>"));
        assert!(output.contains("class=\"failed\""));
        assert!(output.contains("Skewness &lt;shape&gt;"));
        assert!(output.contains("<td>SG201</td>"));
        assert!(output.trim_end().ends_with("</html>"));
    }
}
