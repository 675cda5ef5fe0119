//! Engine facade wiring registry, stores, executor and runner together

use crate::config::EngineConfig;
use crate::executor::EffectExecutor;
use crate::outcome::ExecutionReport;
use crate::persistence::EffectPersistence;
use crate::runner::{ActionExecutionReport, ActionRunner, MissionAction};
use crate::tracker::ExecutionTracker;
use metis_core::{
    CancellationToken, Effect, EffectTrigger, SessionHandle, TargetEnvironmentRegistry,
};
use metis_store::StoreRegistry;
use std::sync::Arc;
use tracing::{info, warn};

/// One engine per host process
///
/// Owns the store service and the execution tracker; the environment
/// registry is shared with whoever installs environments.
#[derive(Debug)]
pub struct EffectEngine {
    config: EngineConfig,
    registry: Arc<TargetEnvironmentRegistry>,
    stores: Arc<StoreRegistry>,
    tracker: Arc<ExecutionTracker>,
    executor: Arc<EffectExecutor>,
    runner: ActionRunner,
}

impl EffectEngine {
    /// Create an engine over `registry`
    pub fn new(config: EngineConfig, registry: Arc<TargetEnvironmentRegistry>) -> Self {
        Self::build(config, registry, None)
    }

    /// Create an engine that persists migrated arguments through `persistence`
    pub fn with_persistence(
        config: EngineConfig,
        registry: Arc<TargetEnvironmentRegistry>,
        persistence: Arc<dyn EffectPersistence>,
    ) -> Self {
        Self::build(config, registry, Some(persistence))
    }

    fn build(
        config: EngineConfig,
        registry: Arc<TargetEnvironmentRegistry>,
        persistence: Option<Arc<dyn EffectPersistence>>,
    ) -> Self {
        let stores = Arc::new(StoreRegistry::new());
        let tracker = Arc::new(ExecutionTracker::new());
        let mut executor =
            EffectExecutor::new(Arc::clone(&registry), Arc::clone(&stores)).with_config(&config);
        if let Some(persistence) = persistence {
            executor = executor.with_persistence(persistence);
        }
        let executor = Arc::new(executor);
        let runner = ActionRunner::new(Arc::clone(&executor), Arc::clone(&tracker), &config);
        Self {
            config,
            registry,
            stores,
            tracker,
            executor,
            runner,
        }
    }

    /// Configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Environment registry
    #[inline]
    #[must_use]
    pub fn registry(&self) -> &Arc<TargetEnvironmentRegistry> {
        &self.registry
    }

    /// Store service
    #[inline]
    #[must_use]
    pub fn stores(&self) -> &Arc<StoreRegistry> {
        &self.stores
    }

    /// Execution tracker, for sessions that abort on node close
    #[inline]
    #[must_use]
    pub fn tracker(&self) -> &Arc<ExecutionTracker> {
        &self.tracker
    }

    /// Effect executor
    #[inline]
    #[must_use]
    pub fn executor(&self) -> &Arc<EffectExecutor> {
        &self.executor
    }

    /// Action runner
    #[inline]
    #[must_use]
    pub fn runner(&self) -> &ActionRunner {
        &self.runner
    }

    /// Run every environment's setup hook for a new session
    ///
    /// Hook failures are logged; the session starts regardless. Returns the
    /// number of hooks that failed.
    pub async fn start_session(&self, session: &dyn SessionHandle) -> usize {
        let mut failures = 0;
        for environment in self.registry.environments() {
            let Some(hooks) = environment.hooks() else {
                continue;
            };
            let store = self.stores.get_store(session.session_id(), Some(environment.id()));
            if let Err(error) = hooks.setup(session, &store).await {
                failures += 1;
                warn!(
                    environment_id = environment.id(),
                    session_id = session.session_id(),
                    %error,
                    "environment setup failed"
                );
            }
        }
        info!(session_id = session.session_id(), failures, "session started");
        failures
    }

    /// Run teardown hooks, then destroy every store partition of the session
    ///
    /// Returns the number of hooks that failed.
    pub async fn end_session(&self, session: &dyn SessionHandle) -> usize {
        let mut failures = 0;
        for environment in self.registry.environments() {
            let Some(hooks) = environment.hooks() else {
                continue;
            };
            let store = self.stores.get_store(session.session_id(), Some(environment.id()));
            if let Err(error) = hooks.teardown(session, &store).await {
                failures += 1;
                warn!(
                    environment_id = environment.id(),
                    session_id = session.session_id(),
                    %error,
                    "environment teardown failed"
                );
            }
        }
        let destroyed = self.stores.destroy_session(session.session_id());
        info!(session_id = session.session_id(), destroyed, failures, "session ended");
        failures
    }

    /// Run one trigger batch with a fresh, uncancelled token
    pub async fn execute_trigger(
        &self,
        effects: &[Effect],
        trigger: EffectTrigger,
        session: &Arc<dyn SessionHandle>,
    ) -> ExecutionReport {
        self.executor
            .execute_trigger(effects, trigger, session, &CancellationToken::new())
            .await
    }

    /// Run a full action execution
    pub async fn execute_action(
        &self,
        action: &MissionAction,
        session: &Arc<dyn SessionHandle>,
    ) -> ActionExecutionReport {
        self.runner.execute_action(action, session).await
    }
}
