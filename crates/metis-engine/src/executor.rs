//! Effect executor
//!
//! Runs the effects of one trigger as an ordered batch.
//!
//! # Critical Invariant
//!
//! Effects run strictly one after another, in ascending `order`. A failure
//! of any kind is confined to its own effect: the batch always produces one
//! report per effect, and later effects observe every mutation the earlier
//! ones applied.

use crate::config::EngineConfig;
use crate::outcome::{EffectOutcome, EffectReport, ExecutionReport};
use crate::persistence::{EffectPersistence, NoPersistence};
use futures::FutureExt;
use metis_core::{
    select_batch, CancellationToken, Effect, EffectExecutionContext, EffectTrigger,
    ScriptExecutionError, SessionHandle, TargetEnvironmentRegistry, TargetError,
};
use metis_store::StoreRegistry;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Executes trigger batches against a session
pub struct EffectExecutor {
    registry: Arc<TargetEnvironmentRegistry>,
    stores: Arc<StoreRegistry>,
    persistence: Arc<dyn EffectPersistence>,
    persist_migrations: bool,
}

impl EffectExecutor {
    /// Create an executor over `registry` and `stores`
    pub fn new(registry: Arc<TargetEnvironmentRegistry>, stores: Arc<StoreRegistry>) -> Self {
        Self {
            registry,
            stores,
            persistence: Arc::new(NoPersistence),
            persist_migrations: false,
        }
    }

    /// Apply the relevant configuration
    #[must_use]
    pub fn with_config(mut self, config: &EngineConfig) -> Self {
        self.persist_migrations = config.persist_migrations;
        self
    }

    /// Use a persistence hook for migrated arguments
    #[must_use]
    pub fn with_persistence(mut self, persistence: Arc<dyn EffectPersistence>) -> Self {
        self.persistence = persistence;
        self
    }

    /// Target registry
    #[inline]
    #[must_use]
    pub fn registry(&self) -> &Arc<TargetEnvironmentRegistry> {
        &self.registry
    }

    /// Store registry
    #[inline]
    #[must_use]
    pub fn stores(&self) -> &Arc<StoreRegistry> {
        &self.stores
    }

    /// Run every effect of `effects` fired by `trigger`, in order
    ///
    /// Never fails as a whole. Once `cancellation` fires, the effect in
    /// flight sees it through its context and every later effect is
    /// reported as [`EffectOutcome::Aborted`] without running.
    #[instrument(skip_all, fields(%trigger, session_id = session.session_id()))]
    pub async fn execute_trigger(
        &self,
        effects: &[Effect],
        trigger: EffectTrigger,
        session: &Arc<dyn SessionHandle>,
        cancellation: &CancellationToken,
    ) -> ExecutionReport {
        let batch = select_batch(effects, trigger);
        let mut report = ExecutionReport::new(trigger);
        if batch.is_empty() {
            return report;
        }
        debug!(effects = batch.len(), "executing batch");

        for effect in batch {
            let effect_report = if cancellation.is_cancelled() {
                EffectReport::new(effect, EffectOutcome::Aborted)
            } else {
                self.execute_effect(effect, session, cancellation).await
            };
            report.reports.push(effect_report);
        }

        info!(succeeded = report.succeeded(), failed = report.failed(), "batch complete");
        report
    }

    /// Resolve, migrate and run one effect
    #[instrument(
        level = "debug",
        skip_all,
        fields(effect_id = %effect.id, target_id = %effect.target_id)
    )]
    pub async fn execute_effect(
        &self,
        effect: &Effect,
        session: &Arc<dyn SessionHandle>,
        cancellation: &CancellationToken,
    ) -> EffectReport {
        let target = match self.registry.resolve(effect) {
            Ok(target) => target,
            Err(error) => {
                warn!(effect_id = %effect.id, %error, "effect target not resolved");
                return EffectReport::new(effect, EffectOutcome::ResolutionFailed(error));
            }
        };

        let migrated = match target.migrate(effect) {
            Ok(migrated) => migrated,
            Err(error) => {
                warn!(
                    effect_id = %effect.id,
                    target_id = target.id(),
                    %error,
                    "effect migration failed"
                );
                return EffectReport::new(effect, EffectOutcome::MigrationFailed(error));
            }
        };
        if migrated.is_upgrade() {
            debug!(
                effect_id = %effect.id,
                from = %effect.target_environment_version,
                to = %migrated.version,
                "effect arguments migrated"
            );
            if self.persist_migrations {
                if let Err(error) = self.persistence.persist_migrated(effect, &migrated).await {
                    warn!(effect_id = %effect.id, %error, "failed to persist migrated arguments");
                }
            }
        }

        let args = target.resolve_args(migrated.args.clone());
        let ctx = EffectExecutionContext::new(
            effect.clone(),
            Arc::clone(&target),
            args,
            Arc::clone(session),
            &self.stores,
            cancellation.clone(),
        );

        let result = AssertUnwindSafe(target.script().execute(&ctx))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Err(TargetError::Panicked(panic_message(panic.as_ref()))));

        let outcome = match result {
            Ok(()) => {
                debug!(effect_id = %effect.id, target_id = target.id(), "effect succeeded");
                EffectOutcome::Succeeded
            }
            Err(TargetError::Aborted) => {
                info!(effect_id = %effect.id, "effect aborted");
                EffectOutcome::Aborted
            }
            Err(source) => {
                warn!(
                    effect_id = %effect.id,
                    target_id = target.id(),
                    error = %source,
                    "effect failed"
                );
                EffectOutcome::ScriptFailed(ScriptExecutionError {
                    effect_id: effect.id.clone(),
                    effect_name: effect.name.clone(),
                    source,
                })
            }
        };
        EffectReport::new(effect, outcome).with_migration(migrated)
    }
}

impl std::fmt::Debug for EffectExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectExecutor")
            .field("environments", &self.registry.len())
            .field("persist_migrations", &self.persist_migrations)
            .finish_non_exhaustive()
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panic_message_reads_both_payload_kinds() {
        let literal: Box<dyn std::any::Any + Send> = Box::new("static");
        let owned: Box<dyn std::any::Any + Send> = Box::new(String::from("owned"));
        let other: Box<dyn std::any::Any + Send> = Box::new(7u8);
        assert_eq!(panic_message(literal.as_ref()), "static");
        assert_eq!(panic_message(owned.as_ref()), "owned");
        assert_eq!(panic_message(other.as_ref()), "unknown panic");
    }
}
