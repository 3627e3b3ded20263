//! Catalog of checks keyed by code.

use super::{Check, CheckDescriptor, INTERNAL_FAILURE_CODE};
use crate::prelude::*;
use once_cell::sync::Lazy;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, info};

static GLOBAL_REGISTRY: Lazy<Arc<CheckRegistry>> = Lazy::new(|| Arc::new(CheckRegistry::with_builtins()));

/// Maps check codes to check implementations.
///
/// Reads take a shared lock, so lookups may run concurrently with each other
/// and with validation runs. Registration takes the write lock, which
/// serialises concurrent registrations of the same code: exactly one wins and
/// the others fail with `DuplicateCheckCode`.
///
/// The engine receives a registry explicitly. [`CheckRegistry::global`]
/// returns a process-wide instance initialised with the built-in checks.
///
/// # Examples
///
/// ```rust
/// use stat_guard::core::CheckRegistry;
///
/// let registry = CheckRegistry::with_builtins();
/// assert!(registry.contains("SG101"));
/// assert!(registry.lookup("SG999").is_err());
/// ```
#[derive(Debug, Default)]
pub struct CheckRegistry {
    checks: RwLock<BTreeMap<String, Arc<dyn Check>>>,
}

impl CheckRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding every built-in check.
    pub fn with_builtins() -> Self {
        let checks = crate::checks::builtin_checks()
            .into_iter()
            .map(|check| (check.code().to_string(), check))
            .collect();
        Self {
            checks: RwLock::new(checks),
        }
    }

    /// Returns the process-wide registry.
    pub fn global() -> Arc<CheckRegistry> {
        Arc::clone(&GLOBAL_REGISTRY)
    }

    /// Registers a check; fails with `DuplicateCheckCode` if the code is taken.
    ///
    /// On failure the registry is left unchanged.
    pub fn register(&self, check: Arc<dyn Check>) -> Result<()> {
        let code = validate_code(check.as_ref())?;
        let mut checks = self.checks.write().unwrap_or_else(PoisonError::into_inner);
        if checks.contains_key(&code) {
            return Err(StatGuardError::DuplicateCheckCode { code });
        }
        info!(check.code = %code, check.name = %check.name(), "Registered check");
        checks.insert(code, check);
        Ok(())
    }

    /// Registers a check, replacing and returning any check with the same code.
    pub fn register_with_override(&self, check: Arc<dyn Check>) -> Result<Option<Arc<dyn Check>>> {
        let code = validate_code(check.as_ref())?;
        let mut checks = self.checks.write().unwrap_or_else(PoisonError::into_inner);
        let previous = checks.insert(code.clone(), check);
        if previous.is_some() {
            info!(check.code = %code, "Replaced registered check");
        }
        Ok(previous)
    }

    /// Removes a check.
    pub fn unregister(&self, code: &str) -> Result<Arc<dyn Check>> {
        let removed = self
            .checks
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(code)
            .ok_or_else(|| StatGuardError::UnknownCheckCode {
                code: code.to_string(),
            })?;
        debug!(check.code = %code, "Unregistered check");
        Ok(removed)
    }

    /// Returns the check registered under `code`.
    pub fn lookup(&self, code: &str) -> Result<Arc<dyn Check>> {
        self.read()
            .get(code)
            .cloned()
            .ok_or_else(|| StatGuardError::UnknownCheckCode {
                code: code.to_string(),
            })
    }

    /// Returns true if a check is registered under `code`.
    pub fn contains(&self, code: &str) -> bool {
        self.read().contains_key(code)
    }

    /// Returns every registered code in ascending order.
    pub fn all_codes(&self) -> BTreeSet<String> {
        self.read().keys().cloned().collect()
    }

    /// Returns the registered checks ordered by code.
    pub fn snapshot(&self) -> Vec<Arc<dyn Check>> {
        self.read().values().cloned().collect()
    }

    /// Returns listing information for every check, ordered by code.
    pub fn descriptors(&self) -> Vec<CheckDescriptor> {
        self.read().values().map(|check| check.descriptor()).collect()
    }

    /// Returns the number of registered checks.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Returns true if no checks are registered.
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, BTreeMap<String, Arc<dyn Check>>> {
        self.checks.read().unwrap_or_else(PoisonError::into_inner)
    }
}

fn validate_code(check: &dyn Check) -> Result<String> {
    let code = check.code().trim();
    if code.is_empty() {
        return Err(StatGuardError::Configuration(format!(
            "check '{}' has an empty code",
            check.name()
        )));
    }
    if code == INTERNAL_FAILURE_CODE {
        return Err(StatGuardError::DuplicateCheckCode {
            code: code.to_string(),
        });
    }
    Ok(code.to_string())
}
