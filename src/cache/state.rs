//! Lock-guarded backend state.

use std::sync::{Mutex, MutexGuard, PoisonError};

/// A backend reachable only through a scoped lock.
///
/// Every cache operation holds the guard for its whole duration, so a
/// single call is atomic with respect to other calls in the same process.
/// Nothing spans two calls.
pub(crate) struct Guarded<T> {
    inner: Mutex<T>,
}

impl<T> Guarded<T> {
    pub(crate) fn new(value: T) -> Self {
        Self {
            inner: Mutex::new(value),
        }
    }

    /// Acquire the lock. Released when the guard drops, on every exit path.
    ///
    /// Poisoning is ignored: backends apply each row write as a single
    /// statement, so a panic elsewhere cannot leave a half-written row.
    pub(crate) fn lock(&self) -> MutexGuard<'_, T> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
