//! Which modules depend on which glob patterns.
//!
//! One table per build session. Each transformed module owns one entry,
//! replaced wholesale whenever the module is transformed again.

use super::call::ResolvedGlobSet;
use super::matcher::GlobMatcher;
use rustc_hash::FxHashMap;
use std::collections::BTreeSet;
use std::sync::{PoisonError, RwLock};
use tracing::{debug, trace};

/// Module id → resolved pattern sets, one set per call in the module.
#[derive(Debug, Default)]
pub struct DependencyIndex {
    records: RwLock<FxHashMap<String, Vec<Vec<String>>>>,
}

impl DependencyIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget everything. Called at the start of a build.
    pub fn reset(&self) {
        self.records
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        debug!("dependency index reset");
    }

    /// Replace the entry for `module_id`.
    ///
    /// Returns the patterns the host should watch: every non-negated pattern
    /// of every set.
    pub fn record(&self, module_id: &str, globs: &[ResolvedGlobSet]) -> Vec<String> {
        let sets: Vec<Vec<String>> = globs.iter().map(|set| set.resolved.clone()).collect();
        let watch = sets
            .iter()
            .flatten()
            .filter(|pattern| !pattern.starts_with('!'))
            .cloned()
            .collect();

        trace!(module_id, sets = sets.len(), "recording glob dependencies");
        self.records
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(module_id.to_string(), sets);
        watch
    }

    /// Drop the entry for `module_id`. Returns whether one existed.
    pub fn remove(&self, module_id: &str) -> bool {
        self.records
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(module_id)
            .is_some()
    }

    /// The recorded pattern sets of a module.
    pub fn get(&self, module_id: &str) -> Option<Vec<Vec<String>>> {
        self.records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(module_id)
            .cloned()
    }

    /// Number of modules with recorded globs.
    pub fn len(&self) -> usize {
        self.records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Modules with at least one pattern set matching `changed_path`,
    /// de-duplicated and sorted.
    pub fn affected_modules(&self, changed_path: &str, matcher: &dyn GlobMatcher) -> Vec<String> {
        let records = self.records.read().unwrap_or_else(PoisonError::into_inner);
        let affected: BTreeSet<&String> = records
            .iter()
            .filter(|(_, sets)| sets.iter().any(|set| matcher.is_match(changed_path, set)))
            .map(|(id, _)| id)
            .collect();

        debug!(changed_path, affected = affected.len(), "computed affected modules");
        affected.into_iter().cloned().collect()
    }
}

/// Modules in `index` that must be invalidated when `changed_path` is added
/// or removed.
pub fn compute_affected_modules(
    changed_path: &str,
    index: &DependencyIndex,
    matcher: &dyn GlobMatcher,
) -> Vec<String> {
    index.affected_modules(&crate::paths::to_posix(changed_path), matcher)
}
