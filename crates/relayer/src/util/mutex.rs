//! Helper to lock a [`Mutex`] without propagating poisoning.

use std::sync::{Mutex, MutexGuard, PoisonError};

pub trait MutexUtil<T> {
    /// Locks the mutex, recovering the guard of a poisoned lock.
    fn acquire_mutex(&self) -> MutexGuard<'_, T>;
}

impl<T> MutexUtil<T> for Mutex<T> {
    fn acquire_mutex(&self) -> MutexGuard<'_, T> {
        self.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
