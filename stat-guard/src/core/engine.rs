//! The validation engine: selects, executes and aggregates checks.

use super::{
    Check, CheckRegistry, ColumnKind, ColumnRoles, DatasetView, Params, Policy, Report, ReportParts,
    RunMetadata, Severity, SkipReason, SkippedCheck, TargetSummary, Violation,
};
use crate::log_check;
use crate::logging::LogConfig;
use crate::prelude::*;
use crate::stats;
use rayon::prelude::*;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

/// Reserved code for checks that failed internally.
///
/// It is never registered, but reports may always contain it.
pub const INTERNAL_FAILURE_CODE: &str = "SG000";

const INTERNAL_FAILURE_NAME: &str = "Internal Check Failure";

/// Execution settings for a [`ValidationEngine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Stop after the first check that produced an error
    pub fail_fast: bool,
    /// Evaluate checks on the rayon thread pool
    pub parallel: bool,
    /// Attach descriptive statistics of the target to the report
    pub include_target_summary: bool,
    /// Verbosity of per-check logging
    pub logging: LogConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fail_fast: false,
            parallel: false,
            include_target_summary: true,
            logging: LogConfig::default(),
        }
    }
}

/// Cooperative cancellation flag shared between a caller and a running engine.
///
/// The engine looks at the flag between checks; a check that is already
/// running finishes normally.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    /// Creates a token that is not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Returns true once cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Result of attempting one check.
#[derive(Debug)]
enum Outcome {
    Skipped(SkipReason),
    Ran(Vec<Violation>),
}

impl Outcome {
    fn has_error(&self) -> bool {
        matches!(self, Outcome::Ran(violations) if violations.iter().any(Violation::is_error))
    }
}

/// Runs the checks of a registry against a dataset under a policy.
///
/// Checks execute in ascending code order. A check that returns an error or
/// panics does not abort the run: it is reported as a single
/// [`INTERNAL_FAILURE_CODE`] violation and the remaining checks continue.
///
/// # Examples
///
/// ```rust
/// use arrow::array::{ArrayRef, Float64Array};
/// use stat_guard::core::{CheckRegistry, ColumnRoles, DatasetView, Policy, ValidationEngine};
/// use std::sync::Arc;
///
/// let values: Vec<f64> = (0..100).map(|i| (i % 17) as f64 + 0.5 * (i % 5) as f64).collect();
/// let view = DatasetView::try_from_columns(vec![(
///     "revenue",
///     Arc::new(Float64Array::from(values)) as ArrayRef,
/// )])
/// .unwrap();
///
/// let engine = ValidationEngine::builder()
///     .registry(Arc::new(CheckRegistry::with_builtins()))
///     .fail_fast(false)
///     .build();
/// let report = engine
///     .run(&view, &Policy::default(), &ColumnRoles::new().with_target("revenue"))
///     .unwrap();
///
/// assert!(report.is_complete());
/// assert!(report.checks_run().contains(&"SG101".to_string()));
/// ```
#[derive(Debug, Clone)]
pub struct ValidationEngine {
    registry: Arc<CheckRegistry>,
    config: EngineConfig,
    cancellation: Option<CancellationToken>,
}

impl Default for ValidationEngine {
    fn default() -> Self {
        Self::new(CheckRegistry::global())
    }
}

impl ValidationEngine {
    /// Creates an engine with default settings over `registry`.
    pub fn new(registry: Arc<CheckRegistry>) -> Self {
        Self {
            registry,
            config: EngineConfig::default(),
            cancellation: None,
        }
    }

    /// Creates a builder that starts from the global registry.
    pub fn builder() -> ValidationEngineBuilder {
        ValidationEngineBuilder::default()
    }

    /// Returns the execution settings.
    pub fn config(&self) -> EngineConfig {
        self.config
    }

    /// Returns the registry checks are drawn from.
    pub fn registry(&self) -> &Arc<CheckRegistry> {
        &self.registry
    }

    /// Validates `view` under `policy` with the given role bindings.
    ///
    /// Configuration problems (a role naming a missing column, a check
    /// declaring a parameter the policy lacks) fail the call before any
    /// check runs. Problems in the data never fail the call; they become
    /// violations in the report.
    #[instrument(skip(self, view, policy, roles), fields(
        policy.name = %policy.name(),
        dataset.rows = view.row_count(),
        dataset.columns = view.column_count(),
        engine.parallel = self.config.parallel,
        engine.fail_fast = self.config.fail_fast
    ))]
    pub fn run(&self, view: &DatasetView, policy: &Policy, roles: &ColumnRoles) -> Result<Report> {
        let start_time = Instant::now();
        let mut metadata = RunMetadata::new(policy.name());

        roles.validate(view)?;

        let candidates = self
            .registry
            .snapshot()
            .into_iter()
            .filter(|check| {
                let enabled = policy.is_enabled(check.code());
                if !enabled {
                    debug!(check.code = %check.code(), "Check disabled by policy");
                }
                enabled
            })
            .map(|check| {
                let params = policy.params_for(check.parameters())?;
                Ok((check, params))
            })
            .collect::<Result<Vec<_>>>()?;

        info!(
            policy.name = %policy.name(),
            checks.candidates = candidates.len(),
            "Starting validation run"
        );

        let outcomes = if self.config.parallel {
            self.run_parallel(view, roles, &candidates)
        } else {
            self.run_sequential(view, roles, &candidates)
        };

        let complete = outcomes.len() == candidates.len() || self.stopped_by_fail_fast(&outcomes);
        let stopped_early = self.stopped_by_fail_fast(&outcomes) && outcomes.len() < candidates.len();

        let mut violations = Vec::new();
        let mut checks_run = Vec::new();
        let mut checks_skipped = Vec::new();
        for ((check, _), outcome) in candidates.iter().zip(outcomes) {
            match outcome {
                Outcome::Skipped(reason) => checks_skipped.push(SkippedCheck {
                    code: check.code().to_string(),
                    name: check.name().to_string(),
                    reason,
                }),
                Outcome::Ran(found) => {
                    checks_run.push(check.code().to_string());
                    violations.extend(found);
                }
            }
        }

        if !complete {
            warn!(
                checks.run = checks_run.len(),
                checks.candidates = candidates.len(),
                "Validation run cancelled"
            );
        }

        let target_summary = if self.config.include_target_summary {
            target_summary(view, roles)?
        } else {
            None
        };

        metadata.n_rows = view.row_count();
        metadata.n_columns = view.column_count();
        metadata.roles = roles.clone();
        metadata.fail_fast = self.config.fail_fast;
        metadata.stopped_early = stopped_early;
        metadata.parallel = self.config.parallel;
        metadata.execution_time_ms = start_time.elapsed().as_millis() as u64;

        let report = Report::from_parts(ReportParts {
            violations,
            checks_run,
            checks_skipped,
            complete,
            metadata,
            target_summary,
        });

        let summary = report.summary();
        info!(
            policy.name = %policy.name(),
            report.valid = report.is_valid(),
            report.complete = report.is_complete(),
            violations.error = summary.error,
            violations.warning = summary.warning,
            violations.info = summary.info,
            checks.run = report.checks_run().len(),
            checks.skipped = report.checks_skipped().len(),
            execution_time_ms = report.metadata().execution_time_ms,
            "Validation run completed"
        );

        Ok(report)
    }

    fn run_sequential(
        &self,
        view: &DatasetView,
        roles: &ColumnRoles,
        candidates: &[(Arc<dyn Check>, Params)],
    ) -> Vec<Outcome> {
        let mut outcomes = Vec::with_capacity(candidates.len());
        for (check, params) in candidates {
            if self.is_cancelled() {
                break;
            }
            let outcome = execute(check.as_ref(), view, roles, params);
            self.log_outcome(check.as_ref(), &outcome);
            let stop = self.config.fail_fast && outcome.has_error();
            outcomes.push(outcome);
            if stop {
                info!(check.code = %check.code(), "Fail-fast: stopping after error");
                break;
            }
        }
        outcomes
    }

    fn run_parallel(
        &self,
        view: &DatasetView,
        roles: &ColumnRoles,
        candidates: &[(Arc<dyn Check>, Params)],
    ) -> Vec<Outcome> {
        let results: Vec<Option<Outcome>> = candidates
            .par_iter()
            .map(|(check, params)| {
                if self.is_cancelled() {
                    return None;
                }
                Some(execute(check.as_ref(), view, roles, params))
            })
            .collect();

        // Merge in code order; stop at the first cancelled slot or the first
        // error in fail-fast mode so the output matches a sequential run.
        let mut outcomes = Vec::with_capacity(results.len());
        for ((check, _), outcome) in candidates.iter().zip(results) {
            let Some(outcome) = outcome else {
                break;
            };
            self.log_outcome(check.as_ref(), &outcome);
            let stop = self.config.fail_fast && outcome.has_error();
            outcomes.push(outcome);
            if stop {
                break;
            }
        }
        outcomes
    }

    fn log_outcome(&self, check: &dyn Check, outcome: &Outcome) {
        match outcome {
            Outcome::Skipped(reason) => {
                log_check!(self.config.logging, check.code = %check.code(), reason = %reason, "Skipping check");
            }
            Outcome::Ran(violations) => {
                log_check!(
                    self.config.logging,
                    check.code = %check.code(),
                    check.name = %check.name(),
                    violations = violations.len(),
                    "Check completed"
                );
            }
        }
    }

    fn stopped_by_fail_fast(&self, outcomes: &[Outcome]) -> bool {
        self.config.fail_fast && outcomes.last().is_some_and(Outcome::has_error)
    }

    fn is_cancelled(&self) -> bool {
        self.cancellation
            .as_ref()
            .is_some_and(CancellationToken::is_cancelled)
    }
}

/// Builder for [`ValidationEngine`].
#[derive(Debug, Clone, Default)]
pub struct ValidationEngineBuilder {
    registry: Option<Arc<CheckRegistry>>,
    config: EngineConfig,
    cancellation: Option<CancellationToken>,
}

impl ValidationEngineBuilder {
    /// Uses `registry` instead of the global one.
    pub fn registry(mut self, registry: Arc<CheckRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Stops after the first check that emits an error.
    pub fn fail_fast(mut self, fail_fast: bool) -> Self {
        self.config.fail_fast = fail_fast;
        self
    }

    /// Evaluates checks in parallel.
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.config.parallel = parallel;
        self
    }

    /// Controls whether the target summary is computed.
    pub fn include_target_summary(mut self, include: bool) -> Self {
        self.config.include_target_summary = include;
        self
    }

    /// Sets per-check logging verbosity.
    pub fn logging(mut self, logging: LogConfig) -> Self {
        self.config.logging = logging;
        self
    }

    /// Replaces all settings at once.
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Observes `token` between checks.
    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Builds the engine.
    pub fn build(self) -> ValidationEngine {
        ValidationEngine {
            registry: self.registry.unwrap_or_else(CheckRegistry::global),
            config: self.config,
            cancellation: self.cancellation,
        }
    }
}

/// Runs one check, containing errors and panics.
fn execute(check: &dyn Check, view: &DatasetView, roles: &ColumnRoles, params: &Params) -> Outcome {
    let attempt = panic::catch_unwind(AssertUnwindSafe(|| -> Result<Outcome> {
        if let Some(reason) = check.requirements().unmet(view, roles)? {
            return Ok(Outcome::Skipped(reason));
        }
        check.evaluate(view, roles, params).map(Outcome::Ran)
    }));

    match attempt {
        Ok(Ok(Outcome::Skipped(reason))) => Outcome::Skipped(reason),
        Ok(Ok(Outcome::Ran(violations))) => Outcome::Ran(
            violations
                .into_iter()
                .map(|mut violation| {
                    violation.code = check.code().to_string();
                    violation.check_name = check.name().to_string();
                    violation
                })
                .collect(),
        ),
        Ok(Err(err)) => {
            warn!(check.code = %check.code(), error = %err, "Check failed");
            Outcome::Ran(vec![internal_failure(check, &err.to_string())])
        }
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            warn!(check.code = %check.code(), panic = %message, "Check panicked");
            Outcome::Ran(vec![internal_failure(check, &message)])
        }
    }
}

fn internal_failure(check: &dyn Check, message: &str) -> Violation {
    Violation::new(
        INTERNAL_FAILURE_CODE,
        Severity::Error,
        format!("Check {} ({}) failed: {message}", check.code(), check.name()),
    )
    .with_check_name(INTERNAL_FAILURE_NAME)
    .with_suggestion("This is a defect in the check, not in the data")
    .with_context("check_code", check.code())
    .with_context("error", message)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "panic with non-string payload".to_string()
    }
}

fn target_summary(view: &DatasetView, roles: &ColumnRoles) -> Result<Option<TargetSummary>> {
    let Some(target) = roles.target() else {
        return Ok(None);
    };
    if view.column_kind(target)? != ColumnKind::Numeric {
        return Ok(None);
    }

    let overall = stats::describe(&view.present_numeric(target)?);
    let by_group = match roles.group() {
        Some(group) => view
            .grouped_numeric(target, group)?
            .into_iter()
            .map(|(label, values)| (label, stats::describe(&values)))
            .collect(),
        None => Default::default(),
    };

    Ok(Some(TargetSummary {
        column: target.to_string(),
        overall,
        by_group,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{CheckCategory, Requirements};
    use arrow::array::{ArrayRef, Float64Array, StringArray};

    #[derive(Debug)]
    struct Fixed {
        code: &'static str,
        severity: Option<Severity>,
    }

    impl Check for Fixed {
        fn code(&self) -> &str {
            self.code
        }

        fn name(&self) -> &str {
            "fixed"
        }

        fn category(&self) -> CheckCategory {
            CheckCategory::Custom
        }

        fn evaluate(&self, _: &DatasetView, _: &ColumnRoles, _: &Params) -> Result<Vec<Violation>> {
            Ok(self
                .severity
                .map(|severity| vec![Violation::new("WRONG", severity, "fixed finding")])
                .unwrap_or_default())
        }
    }

    #[derive(Debug)]
    struct Failing;

    impl Check for Failing {
        fn code(&self) -> &str {
            "CU002"
        }

        fn name(&self) -> &str {
            "failing"
        }

        fn evaluate(&self, _: &DatasetView, _: &ColumnRoles, _: &Params) -> Result<Vec<Violation>> {
            Err(StatGuardError::check_evaluation("CU002", "boom"))
        }
    }

    #[derive(Debug)]
    struct Panicking;

    impl Check for Panicking {
        fn code(&self) -> &str {
            "CU003"
        }

        fn name(&self) -> &str {
            "panicking"
        }

        fn evaluate(&self, _: &DatasetView, _: &ColumnRoles, _: &Params) -> Result<Vec<Violation>> {
            panic!("division by zero in custom check")
        }
    }

    #[derive(Debug)]
    struct NeedsGroup;

    impl Check for NeedsGroup {
        fn code(&self) -> &str {
            "CU004"
        }

        fn name(&self) -> &str {
            "needs group"
        }

        fn requirements(&self) -> Requirements {
            Requirements::new().min_groups(2)
        }

        fn parameters(&self) -> &[&'static str] {
            &["max_smd"]
        }

        fn evaluate(&self, _: &DatasetView, _: &ColumnRoles, params: &Params) -> Result<Vec<Violation>> {
            params.f64("max_smd")?;
            Ok(vec![])
        }
    }

    #[derive(Debug)]
    struct NeedsUnknownParameter;

    impl Check for NeedsUnknownParameter {
        fn code(&self) -> &str {
            "CU005"
        }

        fn name(&self) -> &str {
            "unknown parameter"
        }

        fn parameters(&self) -> &[&'static str] {
            &["max_banana"]
        }

        fn evaluate(&self, _: &DatasetView, _: &ColumnRoles, _: &Params) -> Result<Vec<Violation>> {
            Ok(vec![])
        }
    }

    fn view() -> DatasetView {
        DatasetView::try_from_columns(vec![
            (
                "y",
                Arc::new(Float64Array::from(vec![1.0, 2.0, 3.0, 4.0])) as ArrayRef,
            ),
            (
                "arm",
                Arc::new(StringArray::from(vec!["a", "b", "a", "b"])) as ArrayRef,
            ),
        ])
        .unwrap()
    }

    fn registry(checks: Vec<Arc<dyn Check>>) -> Arc<CheckRegistry> {
        let registry = CheckRegistry::new();
        for check in checks {
            registry.register(check).unwrap();
        }
        Arc::new(registry)
    }

    fn fixed(code: &'static str, severity: Option<Severity>) -> Arc<dyn Check> {
        Arc::new(Fixed { code, severity })
    }

    #[test]
    fn test_violations_are_stamped_and_ordered() {
        let engine = ValidationEngine::new(registry(vec![
            fixed("CU020", Some(Severity::Info)),
            fixed("CU010", Some(Severity::Warning)),
        ]));
        let report = engine.run(&view(), &Policy::default(), &ColumnRoles::new()).unwrap();

        let codes: Vec<_> = report.violations().iter().map(|v| v.code.as_str()).collect();
        assert_eq!(codes, vec!["CU010", "CU020"]);
        assert!(report.violations().iter().all(|v| v.check_name == "fixed"));
        assert!(report.is_valid());
    }

    #[test]
    fn test_failures_are_contained() {
        let engine = ValidationEngine::new(registry(vec![
            Arc::new(Failing),
            Arc::new(Panicking),
            fixed("CU009", Some(Severity::Warning)),
        ]));
        let report = engine.run(&view(), &Policy::default(), &ColumnRoles::new()).unwrap();

        let internal: Vec<_> = report
            .violations()
            .iter()
            .filter(|v| v.code == INTERNAL_FAILURE_CODE)
            .collect();
        assert_eq!(internal.len(), 2);
        assert_eq!(internal[0].context["check_code"], "CU002");
        assert_eq!(internal[1].context["check_code"], "CU003");
        assert!(internal[1].message.contains("division by zero"));
        assert!(report.has_violation_code("CU009"));
        assert!(!report.is_valid());
    }

    #[test]
    fn test_fail_fast_stops_after_first_error() {
        let engine = ValidationEngine::builder()
            .registry(registry(vec![
                fixed("CU001", Some(Severity::Warning)),
                fixed("CU002", Some(Severity::Error)),
                fixed("CU003", Some(Severity::Error)),
            ]))
            .fail_fast(true)
            .build();
        let report = engine.run(&view(), &Policy::default(), &ColumnRoles::new()).unwrap();

        assert_eq!(report.violations().len(), 2);
        assert_eq!(report.checks_run(), &["CU001".to_string(), "CU002".to_string()]);
        assert!(report.metadata().stopped_early);
        assert!(report.is_complete());
    }

    #[test]
    fn test_cancellation_marks_report_incomplete() {
        let token = CancellationToken::new();
        token.cancel();
        let engine = ValidationEngine::builder()
            .registry(registry(vec![fixed("CU001", Some(Severity::Error))]))
            .cancellation(token)
            .build();
        let report = engine.run(&view(), &Policy::default(), &ColumnRoles::new()).unwrap();

        assert!(!report.is_complete());
        assert!(report.violations().is_empty());
        assert!(report.is_valid());
    }

    #[test]
    fn test_missing_role_skips_check() {
        let engine = ValidationEngine::new(registry(vec![Arc::new(NeedsGroup)]));
        let report = engine.run(&view(), &Policy::default(), &ColumnRoles::new()).unwrap();
        assert!(report.checks_run().is_empty());
        assert_eq!(report.checks_skipped()[0].code, "CU004");

        let grouped = engine
            .run(&view(), &Policy::default(), &ColumnRoles::new().with_group("arm"))
            .unwrap();
        assert_eq!(grouped.checks_run(), &["CU004".to_string()]);
    }

    #[test]
    fn test_configuration_errors_precede_execution() {
        let engine = ValidationEngine::new(registry(vec![Arc::new(Panicking)]));
        let err = engine
            .run(&view(), &Policy::default(), &ColumnRoles::new().with_target("revenue"))
            .unwrap_err();
        assert!(matches!(err, StatGuardError::ColumnNotFound { .. }));

        let engine = ValidationEngine::new(registry(vec![Arc::new(NeedsUnknownParameter)]));
        let err = engine
            .run(&view(), &Policy::default(), &ColumnRoles::new())
            .unwrap_err();
        assert!(matches!(err, StatGuardError::UnknownParameter { name } if name == "max_banana"));
    }

    #[test]
    fn test_disabled_checks_do_not_run() {
        let engine = ValidationEngine::new(registry(vec![fixed("CU001", Some(Severity::Error))]));
        let policy = Policy::builder("quiet")
            .base(&Policy::default())
            .disable("CU001")
            .build()
            .unwrap();
        let report = engine.run(&view(), &policy, &ColumnRoles::new()).unwrap();
        assert!(report.checks_run().is_empty());
        assert!(report.is_valid());
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let checks = || {
            registry(vec![
                fixed("CU001", Some(Severity::Info)),
                Arc::new(Failing),
                fixed("CU003", None),
                fixed("CU004", Some(Severity::Error)),
                fixed("CU005", Some(Severity::Warning)),
            ])
        };
        for fail_fast in [false, true] {
            let sequential = ValidationEngine::builder()
                .registry(checks())
                .fail_fast(fail_fast)
                .build()
                .run(&view(), &Policy::default(), &ColumnRoles::new())
                .unwrap();
            let parallel = ValidationEngine::builder()
                .registry(checks())
                .fail_fast(fail_fast)
                .parallel(true)
                .build()
                .run(&view(), &Policy::default(), &ColumnRoles::new())
                .unwrap();
            assert_eq!(sequential.violations(), parallel.violations());
            assert_eq!(sequential.checks_run(), parallel.checks_run());
        }
    }

    #[test]
    fn test_target_summary() {
        let engine = ValidationEngine::new(registry(vec![]));
        let report = engine
            .run(
                &view(),
                &Policy::default(),
                &ColumnRoles::new().with_target("y").with_group("arm"),
            )
            .unwrap();
        let summary = report.target_summary().unwrap();
        assert_eq!(summary.overall.count, 4);
        assert_eq!(summary.overall.mean, Some(2.5));
        assert_eq!(summary.by_group["a"].count, 2);
        assert_eq!(summary.by_group["b"].mean, Some(3.0));
    }
}
