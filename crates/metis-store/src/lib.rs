//! METIS Environment/Target Store
//!
//! Isolated key-value memory for target scripts, partitioned by
//! `(session, environment)`:
//! - [`StoreRegistry`]: the service owning every partition
//! - [`TargetStore`]: one partition (`use_state`, `has`, `delete`, `clear`, `keys`)
//! - [`StoreState`]: a shared, mutable slot inside a partition
//!
//! Partitions have no TTL or eviction. The owner of a session must call
//! [`StoreRegistry::destroy_store`] or [`StoreRegistry::destroy_session`]
//! when the session ends.
//!
//! # Example
//!
//! ```rust
//! use metis_store::StoreRegistry;
//!
//! let registry = StoreRegistry::new();
//! let store = registry.get_store("session-1", Some("metis"));
//! let visits = store.use_state("visits", 0);
//! visits.update(|v| *v = (v.as_i64().unwrap_or(0) + 1).into());
//! assert_eq!(visits.get(), 1);
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod registry;
mod state;
mod store;

pub use registry::{compose_key, StoreRegistry, GLOBAL_PARTITION};
pub use state::StoreState;
pub use store::TargetStore;

/// Errors raised when reading typed values out of a store
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Stored JSON does not match the requested type
    #[error("store value `{key}` has an unexpected shape: {source}")]
    Deserialize {
        /// Key of the offending entry
        key: String,
        /// Underlying decode error
        #[source]
        source: serde_json::Error,
    },
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
