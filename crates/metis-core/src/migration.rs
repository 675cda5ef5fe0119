//! Target migration registry
//!
//! Ordered `(version -> transform)` pairs upgrading an effect's stored
//! argument bag to a newer target contract. Built fluently:
//!
//! ```rust
//! use metis_core::TargetMigrationRegistry;
//!
//! let migrations = TargetMigrationRegistry::new()
//!     .register("0.2.0", |mut args| {
//!         if let Some(modifier) = args.remove("modifier") {
//!             args.insert("amount".into(), modifier);
//!         }
//!         Ok(args)
//!     })?
//!     .register("0.3.0", Ok)?;
//! assert_eq!(migrations.len(), 2);
//! # Ok::<(), metis_core::DefinitionError>(())
//! ```
//!
//! Transforms must be pure and idempotent for input that already has the
//! target shape: migration runs on every read unless the caller persists the
//! result.

use crate::effect::EffectArgs;
use crate::error::{parse_version, DefinitionError, MigrationError};
use semver::Version;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::ops::Bound;
use std::sync::Arc;

/// Transform upgrading an argument bag to one version
pub type MigrationTransform = Arc<dyn Fn(EffectArgs) -> Result<EffectArgs, String> + Send + Sync>;

/// Versioned argument transforms of one target
#[derive(Clone, Default)]
pub struct TargetMigrationRegistry {
    migrations: BTreeMap<Version, MigrationTransform>,
}

/// Result of migrating an argument bag
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MigratedArgs {
    /// Argument bag after every applicable transform
    pub args: EffectArgs,
    /// Version the arguments now conform to
    pub version: Version,
    /// Transform versions applied, ascending
    pub applied: Vec<Version>,
}

impl MigratedArgs {
    /// Whether any transform ran
    #[inline]
    #[must_use]
    pub fn is_upgrade(&self) -> bool {
        !self.applied.is_empty()
    }
}

impl TargetMigrationRegistry {
    /// Create empty registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            migrations: BTreeMap::new(),
        }
    }

    /// Register a transform for `version`
    ///
    /// # Errors
    /// - [`DefinitionError::InvalidVersion`] if `version` is not a semantic version
    /// - [`DefinitionError::DuplicateMigration`] if `version` is already registered
    pub fn register<F>(mut self, version: &str, transform: F) -> Result<Self, DefinitionError>
    where
        F: Fn(EffectArgs) -> Result<EffectArgs, String> + Send + Sync + 'static,
    {
        let version = parse_version(version)?;
        if self.migrations.contains_key(&version) {
            return Err(DefinitionError::DuplicateMigration(version));
        }
        self.migrations.insert(version, Arc::new(transform));
        Ok(self)
    }

    /// Highest registered version
    #[inline]
    #[must_use]
    pub fn latest(&self) -> Option<&Version> {
        self.migrations.keys().next_back()
    }

    /// Registered versions, ascending
    pub fn versions(&self) -> impl Iterator<Item = &Version> {
        self.migrations.keys()
    }

    /// Number of registered transforms
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.migrations.len()
    }

    /// Whether no transforms are registered
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.migrations.is_empty()
    }

    /// Apply every transform newer than `from`, ascending
    ///
    /// Returns the final bag and the versions applied.
    ///
    /// # Errors
    /// [`MigrationError::TransformFailed`] naming the first failing version
    pub fn migrate(
        &self,
        from: &Version,
        args: EffectArgs,
    ) -> Result<(EffectArgs, Vec<Version>), MigrationError> {
        let mut args = args;
        let mut applied = Vec::new();
        for (version, transform) in self
            .migrations
            .range((Bound::Excluded(from), Bound::Unbounded))
        {
            args = transform(args).map_err(|reason| MigrationError::TransformFailed {
                version: version.clone(),
                reason,
            })?;
            applied.push(version.clone());
        }
        Ok((args, applied))
    }
}

impl fmt::Debug for TargetMigrationRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TargetMigrationRegistry")
            .field("versions", &self.migrations.keys().collect::<Vec<_>>())
            .finish()
    }
}
