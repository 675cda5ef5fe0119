//! Process-wide catalog of store partitions
//!
//! Constructed explicitly and shared by `Arc` so that tests and sessions can
//! hold isolated registries.

use crate::store::TargetStore;
use dashmap::DashMap;
use std::sync::Arc;

/// Partition name used when no environment is given
pub const GLOBAL_PARTITION: &str = "<global>";

/// Readable name of a `(session, environment)` pair, for logs
///
/// Not unique: ids may themselves contain `/` or `<global>`. Partitions are
/// keyed by the pair itself.
#[must_use]
pub fn compose_key(session_id: &str, environment_id: Option<&str>) -> String {
    format!(
        "{session_id}/{}",
        environment_id.unwrap_or(GLOBAL_PARTITION)
    )
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct PartitionKey {
    session_id: String,
    environment_id: Option<String>,
}

impl PartitionKey {
    fn new(session_id: &str, environment_id: Option<&str>) -> Self {
        Self {
            session_id: session_id.to_string(),
            environment_id: environment_id.map(str::to_string),
        }
    }
}

/// Owner of every store partition
#[derive(Debug, Default)]
pub struct StoreRegistry {
    stores: DashMap<PartitionKey, Arc<TargetStore>>,
}

impl StoreRegistry {
    /// Create an empty registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            stores: DashMap::new(),
        }
    }

    /// Get the partition for `(session, environment)`, creating it when absent
    ///
    /// `None` addresses the session-global partition.
    pub fn get_store(&self, session_id: &str, environment_id: Option<&str>) -> Arc<TargetStore> {
        self.stores
            .entry(PartitionKey::new(session_id, environment_id))
            .or_insert_with(|| {
                tracing::trace!(session_id, ?environment_id, "creating store partition");
                Arc::new(TargetStore::new(session_id, environment_id))
            })
            .clone()
    }

    /// Get an existing partition without creating it
    #[must_use]
    pub fn find_store(
        &self,
        session_id: &str,
        environment_id: Option<&str>,
    ) -> Option<Arc<TargetStore>> {
        self.stores
            .get(&PartitionKey::new(session_id, environment_id))
            .map(|entry| Arc::clone(entry.value()))
    }

    /// Clear and remove one partition
    ///
    /// Returns `false` if it did not exist.
    pub fn destroy_store(&self, session_id: &str, environment_id: Option<&str>) -> bool {
        match self.stores.remove(&PartitionKey::new(session_id, environment_id)) {
            Some((_, store)) => {
                store.clear();
                tracing::debug!(
                    partition = %compose_key(session_id, environment_id),
                    "destroyed store partition"
                );
                true
            }
            None => false,
        }
    }

    /// Clear and remove every partition of a session
    ///
    /// Returns the number of partitions removed.
    pub fn destroy_session(&self, session_id: &str) -> usize {
        let keys: Vec<PartitionKey> = self
            .stores
            .iter()
            .filter(|entry| entry.key().session_id == session_id)
            .map(|entry| entry.key().clone())
            .collect();

        let mut removed = 0;
        for key in keys {
            if let Some((_, store)) = self.stores.remove(&key) {
                store.clear();
                removed += 1;
            }
        }
        tracing::debug!(session_id, removed, "destroyed session stores");
        removed
    }

    /// Number of live partitions
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.stores.len()
    }

    /// Whether no partitions exist
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stores.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn compose_key_uses_global_partition() {
        assert_eq!(compose_key("s1", None), "s1/<global>");
        assert_eq!(compose_key("s1", Some("metis")), "s1/metis");
    }

    #[test]
    fn ids_that_render_alike_stay_separate() {
        let registry = StoreRegistry::new();
        registry
            .get_store("a", Some("b/<global>"))
            .use_state("k", 0)
            .set(42);
        registry.get_store("s", Some(GLOBAL_PARTITION)).use_state("k", 0).set(7);

        assert_eq!(registry.get_store("a/b", None).use_state("k", 0).get(), json!(0));
        assert_eq!(registry.get_store("s", None).use_state("k", 0).get(), json!(0));
        assert_eq!(registry.len(), 4);

        assert_eq!(registry.destroy_session("a/b"), 1);
        assert!(registry.find_store("a", Some("b/<global>")).is_some());
        assert_eq!(registry.destroy_session("a"), 1);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn environments_are_isolated() {
        let registry = StoreRegistry::new();
        let a = registry.get_store("s1", Some("envA")).use_state("k", 0);
        let b = registry.get_store("s1", Some("envB")).use_state("k", 0);

        a.set(42);
        assert_eq!(a.get(), json!(42));
        assert_eq!(b.get(), json!(0));
    }

    #[test]
    fn sessions_are_isolated() {
        let registry = StoreRegistry::new();
        registry.get_store("s1", None).use_state("k", 0).set(1);
        assert_eq!(registry.get_store("s2", None).use_state("k", 0).get(), json!(0));
    }

    #[test]
    fn get_store_returns_same_partition() {
        let registry = StoreRegistry::new();
        let first = registry.get_store("s1", Some("metis"));
        let second = registry.get_store("s1", Some("metis"));
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn destroy_store_clears_outstanding_handles() {
        let registry = StoreRegistry::new();
        let store = registry.get_store("s1", Some("metis"));
        store.use_state("k", 1);

        assert!(registry.destroy_store("s1", Some("metis")));
        assert!(!registry.destroy_store("s1", Some("metis")));
        assert!(store.is_empty());
        assert!(registry.find_store("s1", Some("metis")).is_none());
    }

    #[test]
    fn destroy_session_removes_all_partitions_of_that_session() {
        let registry = StoreRegistry::new();
        registry.get_store("s1", None);
        registry.get_store("s1", Some("a"));
        registry.get_store("s1", Some("b"));
        registry.get_store("s2", Some("a"));

        assert_eq!(registry.destroy_session("s1"), 3);
        assert_eq!(registry.len(), 1);
        assert!(registry.find_store("s2", Some("a")).is_some());
    }
}
