//! One `(session, environment)` partition

use crate::state::StoreState;
use dashmap::DashMap;
use serde_json::Value;

/// Key-value partition owned by a [`StoreRegistry`](crate::StoreRegistry)
#[derive(Debug)]
pub struct TargetStore {
    session_id: String,
    environment_id: Option<String>,
    entries: DashMap<String, StoreState>,
}

impl TargetStore {
    pub(crate) fn new(session_id: &str, environment_id: Option<&str>) -> Self {
        Self {
            session_id: session_id.to_string(),
            environment_id: environment_id.map(str::to_string),
            entries: DashMap::new(),
        }
    }

    /// Session this partition belongs to
    #[inline]
    #[must_use]
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Environment this partition belongs to, `None` for the session-global one
    #[inline]
    #[must_use]
    pub fn environment_id(&self) -> Option<&str> {
        self.environment_id.as_deref()
    }

    /// Get the slot for `key`, creating it with `default` when absent
    ///
    /// `default` is ignored when the key already exists.
    pub fn use_state(&self, key: &str, default: impl Into<Value>) -> StoreState {
        self.entries
            .entry(key.to_string())
            .or_insert_with(|| StoreState::new(key, default.into()))
            .clone()
    }

    /// Get the slot for `key` without creating it
    #[must_use]
    pub fn get(&self, key: &str) -> Option<StoreState> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    /// Whether `key` exists
    #[inline]
    #[must_use]
    pub fn has(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Remove `key`, returning whether it existed
    ///
    /// Handles obtained earlier keep their value but are detached.
    #[inline]
    pub fn delete(&self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    /// Remove every key
    #[inline]
    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Keys in lexical order
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries.iter().map(|e| e.key().clone()).collect();
        keys.sort();
        keys
    }

    /// Number of entries
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the partition is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
