//! Validation reports.

use super::{ColumnRoles, Severity, SkipReason, Violation};
use crate::formatters::{HtmlFormatter, HumanFormatter, JsonFormatter, MarkdownFormatter, ReportFormatter};
use crate::prelude::*;
use crate::stats::Summary;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

/// Violation counts per severity.
///
/// Informational findings are counted for display; only errors affect
/// validity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SeveritySummary {
    pub info: usize,
    pub warning: usize,
    pub error: usize,
    pub total: usize,
}

impl SeveritySummary {
    /// Counts violations in a single pass.
    pub fn from_violations(violations: &[Violation]) -> Self {
        violations.iter().fold(Self::default(), |mut summary, v| {
            match v.severity {
                Severity::Info => summary.info += 1,
                Severity::Warning => summary.warning += 1,
                Severity::Error => summary.error += 1,
            }
            summary.total += 1;
            summary
        })
    }

    /// Returns the count for one severity.
    pub fn count(&self, severity: Severity) -> usize {
        match severity {
            Severity::Info => self.info,
            Severity::Warning => self.warning,
            Severity::Error => self.error,
        }
    }
}

/// A check the engine did not run, with the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedCheck {
    pub code: String,
    pub name: String,
    pub reason: SkipReason,
}

/// Facts about the run that produced a report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunMetadata {
    pub policy: String,
    pub n_rows: usize,
    pub n_columns: usize,
    pub roles: ColumnRoles,
    pub fail_fast: bool,
    /// True when fail-fast stopped the run at an error
    pub stopped_early: bool,
    pub parallel: bool,
    /// RFC 3339 time the run started; empty when omitted by a formatter
    pub timestamp: String,
    pub execution_time_ms: u64,
}

impl RunMetadata {
    /// Creates metadata for a run under `policy`, timestamped now.
    pub fn new(policy: impl Into<String>) -> Self {
        Self {
            policy: policy.into(),
            n_rows: 0,
            n_columns: 0,
            roles: ColumnRoles::default(),
            fail_fast: false,
            stopped_early: false,
            parallel: false,
            timestamp: chrono::Utc::now().to_rfc3339(),
            execution_time_ms: 0,
        }
    }
}

/// Descriptive statistics of the target column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TargetSummary {
    pub column: String,
    pub overall: Summary,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub by_group: BTreeMap<String, Summary>,
}

/// Inputs for [`Report::from_parts`].
#[derive(Debug, Clone)]
pub struct ReportParts {
    pub violations: Vec<Violation>,
    pub checks_run: Vec<String>,
    pub checks_skipped: Vec<SkippedCheck>,
    pub complete: bool,
    pub metadata: RunMetadata,
    pub target_summary: Option<TargetSummary>,
}

impl ReportParts {
    /// Parts for a finished run with the given violations.
    pub fn new(metadata: RunMetadata, violations: Vec<Violation>) -> Self {
        Self {
            violations,
            checks_run: Vec::new(),
            checks_skipped: Vec::new(),
            complete: true,
            metadata,
            target_summary: None,
        }
    }
}

/// The immutable outcome of a validation run.
///
/// Violations are kept in check execution order. The report is valid if and
/// only if no violation has [`Severity::Error`].
///
/// # Examples
///
/// ```rust
/// use stat_guard::core::{Report, ReportParts, RunMetadata, Severity, Violation};
///
/// let report = Report::from_parts(ReportParts::new(
///     RunMetadata::new("default"),
///     vec![
///         Violation::new("SG203", Severity::Warning, "skewed"),
///         Violation::new("SG105", Severity::Info, "tiny effect"),
///     ],
/// ));
///
/// assert!(report.is_valid());
/// assert_eq!(report.summary().warning, 1);
/// assert_eq!(report.summary().info, 1);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    is_valid: bool,
    complete: bool,
    summary: SeveritySummary,
    violations: Vec<Violation>,
    checks_run: Vec<String>,
    checks_skipped: Vec<SkippedCheck>,
    metadata: RunMetadata,
    #[serde(skip_serializing_if = "Option::is_none")]
    target_summary: Option<TargetSummary>,
}

impl Report {
    /// Assembles a report, deriving validity and counts from the violations.
    pub fn from_parts(parts: ReportParts) -> Self {
        let summary = SeveritySummary::from_violations(&parts.violations);
        Self {
            is_valid: summary.error == 0,
            complete: parts.complete,
            summary,
            violations: parts.violations,
            checks_run: parts.checks_run,
            checks_skipped: parts.checks_skipped,
            metadata: parts.metadata,
            target_summary: parts.target_summary,
        }
    }

    /// Returns false iff an error-severity violation is present.
    pub fn is_valid(&self) -> bool {
        self.is_valid
    }

    /// Returns false if the run was cancelled before all checks ran.
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Returns all violations in execution order.
    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    /// Returns counts per severity.
    pub fn summary(&self) -> SeveritySummary {
        self.summary
    }

    /// Returns violations of one severity.
    pub fn with_severity(&self, severity: Severity) -> Vec<&Violation> {
        self.violations
            .iter()
            .filter(|v| v.severity == severity)
            .collect()
    }

    /// Returns error-severity violations.
    pub fn errors(&self) -> Vec<&Violation> {
        self.with_severity(Severity::Error)
    }

    /// Returns warning-severity violations.
    pub fn warnings(&self) -> Vec<&Violation> {
        self.with_severity(Severity::Warning)
    }

    /// Returns informational violations.
    pub fn infos(&self) -> Vec<&Violation> {
        self.with_severity(Severity::Info)
    }

    /// Groups violations by check code.
    pub fn by_code(&self) -> BTreeMap<&str, Vec<&Violation>> {
        let mut grouped: BTreeMap<&str, Vec<&Violation>> = BTreeMap::new();
        for violation in &self.violations {
            grouped.entry(violation.code.as_str()).or_default().push(violation);
        }
        grouped
    }

    /// Returns true if any violation carries `code`.
    pub fn has_violation_code(&self, code: &str) -> bool {
        self.violations.iter().any(|v| v.code == code)
    }

    /// Returns the codes of checks that ran, in execution order.
    pub fn checks_run(&self) -> &[String] {
        &self.checks_run
    }

    /// Returns the checks that were skipped and why.
    pub fn checks_skipped(&self) -> &[SkippedCheck] {
        &self.checks_skipped
    }

    /// Returns metadata about the run.
    pub fn metadata(&self) -> &RunMetadata {
        &self.metadata
    }

    /// Returns the target's descriptive statistics, if computed.
    pub fn target_summary(&self) -> Option<&TargetSummary> {
        self.target_summary.as_ref()
    }

    /// Returns a copy with the timestamp cleared, for formatters that omit it.
    pub(crate) fn without_timestamp(&self) -> Self {
        let mut report = self.clone();
        report.metadata.timestamp = String::new();
        report
    }

    /// Returns a copy keeping only the first `max` violations.
    ///
    /// Counts and validity still describe the full run.
    pub(crate) fn truncated(&self, max: usize) -> Self {
        let mut report = self.clone();
        report.violations.truncate(max);
        report
    }

    /// Formats the report with a custom formatter.
    pub fn format_with<F: ReportFormatter>(&self, formatter: &F) -> Result<String> {
        formatter.format(self)
    }

    /// Pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        JsonFormatter::new().format(self)
    }

    /// Markdown document.
    pub fn to_markdown(&self) -> Result<String> {
        MarkdownFormatter::new().format(self)
    }

    /// Standalone HTML page.
    pub fn to_html(&self) -> Result<String> {
        HtmlFormatter::new().format(self)
    }

    /// Console text without ANSI colors.
    pub fn to_human(&self) -> Result<String> {
        HumanFormatter::new().without_colors().format(self)
    }

    /// Writes JSON to `path`.
    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<()> {
        self.write(path.as_ref(), self.to_json()?)
    }

    /// Writes Markdown to `path`.
    pub fn save_markdown(&self, path: impl AsRef<Path>) -> Result<()> {
        self.write(path.as_ref(), self.to_markdown()?)
    }

    /// Writes HTML to `path`.
    pub fn save_html(&self, path: impl AsRef<Path>) -> Result<()> {
        self.write(path.as_ref(), self.to_html()?)
    }

    /// Writes the report in the format implied by the file extension.
    ///
    /// `.json`, `.md`/`.markdown` and `.html`/`.htm` are recognised; anything
    /// else gets plain text.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        match extension.as_str() {
            "json" => self.save_json(path),
            "md" | "markdown" => self.save_markdown(path),
            "html" | "htm" => self.save_html(path),
            _ => self.write(path, self.to_human()?),
        }
    }

    fn write(&self, path: &Path, contents: String) -> Result<()> {
        std::fs::write(path, contents).with_context(|| format!("writing report to {}", path.display()))?;
        info!(path = %path.display(), "Saved validation report");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(severities: &[Severity]) -> Report {
        let violations = severities
            .iter()
            .enumerate()
            .map(|(i, s)| Violation::new(format!("SG10{i}"), *s, "finding"))
            .collect();
        Report::from_parts(ReportParts::new(RunMetadata::new("default"), violations))
    }

    #[test]
    fn test_validity_follows_errors() {
        assert!(report(&[]).is_valid());
        assert!(report(&[Severity::Info, Severity::Warning]).is_valid());
        assert!(!report(&[Severity::Info, Severity::Error]).is_valid());
    }

    #[test]
    fn test_summary_counts() {
        let report = report(&[Severity::Info, Severity::Error, Severity::Warning, Severity::Error]);
        let summary = report.summary();
        assert_eq!((summary.info, summary.warning, summary.error, summary.total), (1, 1, 2, 4));
        assert_eq!(report.errors().len(), 2);
        assert_eq!(report.infos()[0].code, "SG100");
    }

    #[test]
    fn test_by_code_and_lookup() {
        let report = report(&[Severity::Warning, Severity::Warning]);
        assert!(report.has_violation_code("SG101"));
        assert!(!report.has_violation_code("SG999"));
        assert_eq!(report.by_code().len(), 2);
    }

    #[test]
    fn test_truncated_keeps_counts() {
        let full = report(&[Severity::Error, Severity::Warning, Severity::Info]);
        let truncated = full.truncated(1);
        assert_eq!(truncated.violations().len(), 1);
        assert_eq!(truncated.summary().total, 3);
        assert!(!truncated.is_valid());
    }

    #[test]
    fn test_save_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let report = report(&[Severity::Error]);

        for name in ["report.json", "report.md", "report.html", "report.txt"] {
            let path = dir.path().join(name);
            report.save(&path).unwrap();
            let contents = std::fs::read_to_string(&path).unwrap();
            assert!(contents.contains("SG100"), "{name}");
        }

        let json = std::fs::read_to_string(dir.path().join("report.json")).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["is_valid"], false);
    }
}
