//! Shared mutable slot handed out by [`TargetStore::use_state`](crate::TargetStore::use_state)

use crate::StoreError;
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;

/// Handle to one entry of a store partition
///
/// Clones share the same slot, so a value written through one handle is
/// immediately visible through every other handle for the same key.
/// Reads and writes are individually atomic; sequences of them are not.
#[derive(Debug, Clone)]
pub struct StoreState {
    key: Arc<str>,
    value: Arc<RwLock<Value>>,
}

impl StoreState {
    pub(crate) fn new(key: &str, initial: Value) -> Self {
        Self {
            key: Arc::from(key),
            value: Arc::new(RwLock::new(initial)),
        }
    }

    /// Key this slot is stored under
    #[inline]
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Snapshot of the current value
    #[inline]
    #[must_use]
    pub fn get(&self) -> Value {
        self.value.read().clone()
    }

    /// Decode the current value into `T`
    ///
    /// # Errors
    /// Returns [`StoreError::Deserialize`] if the stored JSON does not fit `T`
    pub fn get_as<T: DeserializeOwned>(&self) -> Result<T, StoreError> {
        serde_json::from_value(self.get()).map_err(|source| StoreError::Deserialize {
            key: self.key.to_string(),
            source,
        })
    }

    /// Replace the current value
    #[inline]
    pub fn set(&self, value: impl Into<Value>) {
        *self.value.write() = value.into();
    }

    /// Mutate the value in place under the write lock
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&mut Value),
    {
        let mut guard = self.value.write();
        f(&mut guard);
    }

    /// Write `new` only if the current value equals `expected`
    ///
    /// Returns `true` when the swap happened.
    pub fn compare_and_set(&self, expected: &Value, new: impl Into<Value>) -> bool {
        let mut guard = self.value.write();
        if *guard == *expected {
            *guard = new.into();
            true
        } else {
            false
        }
    }
}

impl PartialEq for StoreState {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.value, &other.value)
    }
}
