//! An invalidatable memo slot.
//!
//! [`CacheCell`] holds either nothing or one complete computed value. It is
//! never updated in place: [`CacheCell::invalidate`] drops the whole value and
//! the next access recomputes it synchronously on the calling thread.

use std::sync::{Arc, PoisonError, RwLock};

/// A lazily computed, explicitly invalidated value.
#[derive(Debug)]
pub struct CacheCell<T> {
    slot: RwLock<Option<Arc<T>>>,
}

impl<T> CacheCell<T> {
    /// Create an empty cell.
    pub fn new() -> Self {
        Self {
            slot: RwLock::new(None),
        }
    }

    /// Return the cached value, computing it with `compute` if absent.
    ///
    /// A failed computation leaves the cell empty.
    pub fn get_or_try_init<E, F>(&self, compute: F) -> Result<Arc<T>, E>
    where
        F: FnOnce() -> Result<T, E>,
    {
        if let Some(value) = self.slot.read().unwrap_or_else(PoisonError::into_inner).as_ref() {
            return Ok(Arc::clone(value));
        }
        let value = Arc::new(compute()?);
        *self.slot.write().unwrap_or_else(PoisonError::into_inner) = Some(Arc::clone(&value));
        Ok(value)
    }

    /// Drop the cached value. Cheap and idempotent.
    pub fn invalidate(&self) {
        self.slot.write().unwrap_or_else(PoisonError::into_inner).take();
    }

    /// Returns `true` if a value is currently cached.
    pub fn is_cached(&self) -> bool {
        self.slot.read().unwrap_or_else(PoisonError::into_inner).is_some()
    }
}

impl<T> Default for CacheCell<T> {
    fn default() -> Self {
        Self::new()
    }
}
