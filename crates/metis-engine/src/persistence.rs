//! Optional write-back of migrated effect arguments

use crate::error::Result;
use metis_core::{Effect, MigratedArgs};

/// Host hook persisting migrated arguments
///
/// Only called when [`EngineConfig::persist_migrations`](crate::EngineConfig)
/// is set and a migration actually upgraded an effect. A failure is logged
/// and does not affect the effect's outcome.
#[async_trait::async_trait]
pub trait EffectPersistence: Send + Sync {
    /// Store `migrated` as the new arguments and version of `effect`
    async fn persist_migrated(&self, effect: &Effect, migrated: &MigratedArgs) -> Result<()>;
}

/// Persistence that discards everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPersistence;

#[async_trait::async_trait]
impl EffectPersistence for NoPersistence {
    async fn persist_migrated(&self, _effect: &Effect, _migrated: &MigratedArgs) -> Result<()> {
        Ok(())
    }
}
