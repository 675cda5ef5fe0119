//! Action runner
//!
//! Drives one mission action through its phases:
//!
//! 1. `execution-initiation` effects
//! 2. wait out the process time
//! 3. roll against the success chance
//! 4. `execution-success` or `execution-failure` effects
//!
//! The execution is registered with the [`ExecutionTracker`] for its whole
//! lifetime, so closing the action's node (or an ancestor) aborts it. An
//! aborted execution never reaches step 4.

use crate::config::EngineConfig;
use crate::executor::EffectExecutor;
use crate::outcome::ExecutionReport;
use crate::tracker::{ExecutionId, ExecutionTracker};
use metis_core::{
    ActionLocator, ActionParameters, Effect, EffectTrigger, NodeLocator, SessionHandle,
};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument};

/// A mission action and the effects attached to it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MissionAction {
    /// Action key, unique within its node
    pub key: String,
    /// Node the action belongs to
    pub node: NodeLocator,
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Authored success chance, used when the session does not track one
    #[serde(default)]
    pub success_chance: Option<f64>,
    /// Authored process time, used when the session does not track one
    #[serde(default)]
    pub process_time_ms: Option<u64>,
    /// Effects of every trigger
    #[serde(default)]
    pub effects: Vec<Effect>,
}

impl MissionAction {
    /// Locator of this action
    #[must_use]
    pub fn locator(&self) -> ActionLocator {
        ActionLocator::new(&self.node.force_key, &self.node.node_key, &self.key)
    }
}

/// Final result of an action execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActionResult {
    /// Roll succeeded
    Succeeded,
    /// Roll failed
    Failed,
    /// Cancelled before completion
    Aborted,
}

/// Everything one action execution did
#[derive(Debug)]
pub struct ActionExecutionReport {
    /// Execution id
    pub execution_id: ExecutionId,
    /// Action executed
    pub action: ActionLocator,
    /// Final result
    pub result: ActionResult,
    /// Batches run, in order
    pub batches: Vec<ExecutionReport>,
}

impl ActionExecutionReport {
    /// Batch of a given trigger, if it ran
    #[must_use]
    pub fn batch(&self, trigger: EffectTrigger) -> Option<&ExecutionReport> {
        self.batches.iter().find(|b| b.trigger == trigger)
    }
}

/// Runs mission actions end to end
pub struct ActionRunner {
    executor: Arc<EffectExecutor>,
    tracker: Arc<ExecutionTracker>,
    rng: Mutex<StdRng>,
    default_success_chance: f64,
    default_process_time_ms: u64,
}

impl ActionRunner {
    /// Create a runner
    ///
    /// Outcome rolls are seeded from `config.rng_seed` when set.
    pub fn new(
        executor: Arc<EffectExecutor>,
        tracker: Arc<ExecutionTracker>,
        config: &EngineConfig,
    ) -> Self {
        let rng = match config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            executor,
            tracker,
            rng: Mutex::new(rng),
            default_success_chance: config.default_success_chance,
            default_process_time_ms: config.default_process_time_ms,
        }
    }

    /// Effect executor
    #[inline]
    #[must_use]
    pub fn executor(&self) -> &Arc<EffectExecutor> {
        &self.executor
    }

    /// Execution tracker
    #[inline]
    #[must_use]
    pub fn tracker(&self) -> &Arc<ExecutionTracker> {
        &self.tracker
    }

    /// Execute `action` against `session`
    #[instrument(skip_all, fields(action = %action.key, node = %action.node))]
    pub async fn execute_action(
        &self,
        action: &MissionAction,
        session: &Arc<dyn SessionHandle>,
    ) -> ActionExecutionReport {
        let locator = action.locator();
        let guard = self.tracker.register(locator.clone());
        let token = guard.token().clone();
        let mut report = ActionExecutionReport {
            execution_id: guard.id(),
            action: locator.clone(),
            result: ActionResult::Aborted,
            batches: Vec::new(),
        };
        info!(execution_id = %guard.id(), action = %locator, "action execution started");

        let initiation = self
            .executor
            .execute_trigger(&action.effects, EffectTrigger::ExecutionInitiation, session, &token)
            .await;
        report.batches.push(initiation);
        if token.is_cancelled() {
            info!(execution_id = %guard.id(), "action aborted during initiation");
            return report;
        }

        let parameters = self.parameters(action, &locator, session.as_ref());
        debug!(
            execution_id = %guard.id(),
            success_chance = parameters.success_chance,
            process_time_ms = parameters.process_time_ms,
            "action processing"
        );
        tokio::select! {
            () = tokio::time::sleep(Duration::from_millis(parameters.process_time_ms)) => {}
            () = token.cancelled() => {
                info!(execution_id = %guard.id(), "action aborted while processing");
                return report;
            }
        }

        let succeeded = self.roll(parameters.success_chance);
        let trigger = if succeeded {
            EffectTrigger::ExecutionSuccess
        } else {
            EffectTrigger::ExecutionFailure
        };
        let outcome = self
            .executor
            .execute_trigger(&action.effects, trigger, session, &token)
            .await;
        report.batches.push(outcome);

        report.result = match (token.is_cancelled(), succeeded) {
            (true, _) => ActionResult::Aborted,
            (false, true) => ActionResult::Succeeded,
            (false, false) => ActionResult::Failed,
        };
        info!(execution_id = %guard.id(), result = ?report.result, "action execution finished");
        report
    }

    /// Live parameters, falling back to the authored values, then defaults
    fn parameters(
        &self,
        action: &MissionAction,
        locator: &ActionLocator,
        session: &dyn SessionHandle,
    ) -> ActionParameters {
        session.action_parameters(locator).unwrap_or(ActionParameters {
            success_chance: action
                .success_chance
                .unwrap_or(self.default_success_chance)
                .clamp(0.0, 1.0),
            process_time_ms: action.process_time_ms.unwrap_or(self.default_process_time_ms),
        })
    }

    fn roll(&self, success_chance: f64) -> bool {
        self.rng.lock().random::<f64>() < success_chance
    }
}

impl std::fmt::Debug for ActionRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionRunner")
            .field("running", &self.tracker.len())
            .field("default_success_chance", &self.default_success_chance)
            .field("default_process_time_ms", &self.default_process_time_ms)
            .finish_non_exhaustive()
    }
}
