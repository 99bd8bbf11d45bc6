//! In-process [`Store`] with an explicit set of valid paths.

use std::collections::BTreeSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::{Store, StorePath};
use crate::{CacheError, Result};

/// A call made into a [`MemoryStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    TempRoot(StorePath),
    ValidityCheck(StorePath),
}

#[derive(Default)]
struct State {
    valid: BTreeSet<StorePath>,
    events: Vec<StoreEvent>,
    fail_temp_roots: bool,
    fail_validity: bool,
}

/// A store that keeps its valid-path set in memory.
///
/// Records every temp root registration and validity query as a
/// [`StoreEvent`] so tests can assert on the order of calls. Either call
/// can be made to fail with [`CacheError::Store`]; a failed call records no
/// event.
pub struct MemoryStore {
    store_dir: String,
    state: Mutex<State>,
}

impl MemoryStore {
    /// Create an empty store rooted at `/nix/store`.
    pub fn new() -> Self {
        Self::with_store_dir("/nix/store")
    }

    /// Create an empty store rooted at `store_dir`.
    pub fn with_store_dir(store_dir: impl Into<String>) -> Self {
        Self {
            store_dir: store_dir.into().trim_end_matches('/').to_string(),
            state: Mutex::new(State::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make `path` valid.
    pub fn add_path(&self, path: StorePath) {
        self.state().valid.insert(path);
    }

    /// Make `path` invalid, as if the garbage collector had reclaimed it.
    pub fn collect_path(&self, path: &StorePath) {
        self.state().valid.remove(path);
    }

    /// Make every subsequent temp root registration fail.
    pub fn fail_temp_roots(&self, fail: bool) {
        self.state().fail_temp_roots = fail;
    }

    /// Make every subsequent validity query fail.
    pub fn fail_validity(&self, fail: bool) {
        self.state().fail_validity = fail;
    }

    /// Every temp root registration and validity query, in call order.
    pub fn events(&self) -> Vec<StoreEvent> {
        self.state().events.clone()
    }

    /// Paths registered as temp roots, in registration order.
    pub fn temp_roots(&self) -> Vec<StorePath> {
        self.state()
            .events
            .iter()
            .filter_map(|event| match event {
                StoreEvent::TempRoot(path) => Some(path.clone()),
                StoreEvent::ValidityCheck(_) => None,
            })
            .collect()
    }

    /// Whether `path` was checked for validity, and every check was preceded
    /// by a temp root registration for it.
    pub fn rooted_before_check(&self, path: &StorePath) -> bool {
        let mut rooted = false;
        let mut checked = false;
        for event in &self.state().events {
            match event {
                StoreEvent::TempRoot(p) if p == path => rooted = true,
                StoreEvent::ValidityCheck(p) if p == path => {
                    if !rooted {
                        return false;
                    }
                    checked = true;
                }
                _ => {}
            }
        }
        checked
    }

    /// Number of validity queries made for `path`.
    pub fn validity_checks(&self, path: &StorePath) -> usize {
        self.state()
            .events
            .iter()
            .filter(|event| matches!(event, StoreEvent::ValidityCheck(p) if p == path))
            .count()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Store for MemoryStore {
    fn store_dir(&self) -> &str {
        &self.store_dir
    }

    fn add_temp_root(&self, path: &StorePath) -> Result<()> {
        let mut state = self.state();
        if state.fail_temp_roots {
            return Err(CacheError::Store(format!(
                "cannot add temp root for '{}'",
                path.base_name()
            )));
        }
        state.events.push(StoreEvent::TempRoot(path.clone()));
        Ok(())
    }

    fn is_valid_path(&self, path: &StorePath) -> Result<bool> {
        let mut state = self.state();
        if state.fail_validity {
            return Err(CacheError::Store(format!(
                "cannot query validity of '{}'",
                path.base_name()
            )));
        }
        state.events.push(StoreEvent::ValidityCheck(path.clone()));
        Ok(state.valid.contains(path))
    }
}
