//! Effect execution context
//!
//! The only object a target script receives. It exposes a fixed set of
//! session mutations and read access to the effect being executed; scripts
//! never touch the session directly.
//!
//! # Critical Invariant
//!
//! The context holds no buffer. Every mutation goes straight to the
//! [`SessionHandle`] and is visible to the next effect in the same batch.
//! Once the surrounding execution is cancelled every mutation fails with
//! [`TargetError::Aborted`] and nothing further is applied.

use crate::args::TargetArgs;
use crate::effect::Effect;
use crate::error::{SessionError, TargetError};
use crate::metadata::{ActionLocator, ForceLocator, NodeLocator};
use crate::session::{OutputKind, OutputMessage, SessionHandle};
use crate::target::Target;
use metis_store::{StoreRegistry, TargetStore};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Context passed to [`TargetScript::execute`](crate::TargetScript::execute)
pub struct EffectExecutionContext {
    effect: Effect,
    target: Arc<Target>,
    args: TargetArgs,
    session: Arc<dyn SessionHandle>,
    store: Arc<TargetStore>,
    global_store: Arc<TargetStore>,
    cancellation: CancellationToken,
}

impl EffectExecutionContext {
    /// Build a context for one effect execution
    ///
    /// Store partitions are looked up in `stores` by the session id and the
    /// target's environment.
    pub fn new(
        effect: Effect,
        target: Arc<Target>,
        args: TargetArgs,
        session: Arc<dyn SessionHandle>,
        stores: &StoreRegistry,
        cancellation: CancellationToken,
    ) -> Self {
        let store = stores.get_store(session.session_id(), Some(target.environment_id()));
        let global_store = stores.get_store(session.session_id(), None);
        Self {
            effect,
            target,
            args,
            session,
            store,
            global_store,
            cancellation,
        }
    }

    /// Effect being executed, as stored
    #[inline]
    #[must_use]
    pub fn effect(&self) -> &Effect {
        &self.effect
    }

    /// Resolved target
    #[inline]
    #[must_use]
    pub fn target(&self) -> &Target {
        &self.target
    }

    /// Migrated arguments with defaults applied
    #[inline]
    #[must_use]
    pub fn args(&self) -> &TargetArgs {
        &self.args
    }

    /// Session id
    #[inline]
    #[must_use]
    pub fn session_id(&self) -> &str {
        self.session.session_id()
    }

    /// Store partition of the target's environment in this session
    #[inline]
    #[must_use]
    pub fn store(&self) -> &TargetStore {
        &self.store
    }

    /// Session-global store partition
    #[inline]
    #[must_use]
    pub fn global_store(&self) -> &TargetStore {
        &self.global_store
    }

    /// Whether the surrounding execution was cancelled
    #[inline]
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Wait for `duration`, returning early with [`TargetError::Aborted`]
    /// if the execution is cancelled
    ///
    /// # Errors
    /// [`TargetError::Aborted`] on cancellation
    pub async fn sleep(&self, duration: Duration) -> Result<(), TargetError> {
        tokio::select! {
            () = tokio::time::sleep(duration) => Ok(()),
            () = self.cancellation.cancelled() => Err(TargetError::Aborted),
        }
    }

    /// Add a signed amount to a force's resource pool
    ///
    /// # Errors
    /// Cancelled execution or session rejection
    pub fn modify_resource_pool(
        &self,
        amount: f64,
        force: &ForceLocator,
    ) -> Result<(), TargetError> {
        self.ensure_active()?;
        debug!(effect_id = %self.effect.id, %force, amount, "modify resource pool");
        Ok(self.session.modify_resource_pool(force, amount)?)
    }

    /// Add a signed delta to an action's success chance
    ///
    /// # Errors
    /// Cancelled execution or session rejection
    pub fn modify_success_chance(
        &self,
        delta: f64,
        action: &ActionLocator,
    ) -> Result<(), TargetError> {
        self.ensure_active()?;
        debug!(effect_id = %self.effect.id, %action, delta, "modify success chance");
        Ok(self.session.modify_success_chance(action, delta)?)
    }

    /// Add a signed delta (ms) to an action's process time
    ///
    /// # Errors
    /// Cancelled execution or session rejection
    pub fn modify_process_time(
        &self,
        delta_ms: i64,
        action: &ActionLocator,
    ) -> Result<(), TargetError> {
        self.ensure_active()?;
        debug!(effect_id = %self.effect.id, %action, delta_ms, "modify process time");
        Ok(self.session.modify_process_time(action, delta_ms)?)
    }

    /// Open a node; opening an open node is a silent no-op
    ///
    /// Returns whether the node changed state.
    ///
    /// # Errors
    /// Cancelled execution or unknown node
    pub fn open_node(&self, node: &NodeLocator) -> Result<bool, TargetError> {
        self.ensure_active()?;
        let changed = self.session.open_node(node)?;
        debug!(effect_id = %self.effect.id, %node, changed, "open node");
        Ok(changed)
    }

    /// Close a node; closing a closed node is a silent no-op
    ///
    /// The session aborts executions pending on the node's descendants.
    /// Returns whether the node changed state.
    ///
    /// # Errors
    /// Cancelled execution or unknown node
    pub fn close_node(&self, node: &NodeLocator) -> Result<bool, TargetError> {
        self.ensure_active()?;
        let changed = self.session.close_node(node)?;
        debug!(effect_id = %self.effect.id, %node, changed, "close node");
        Ok(changed)
    }

    /// Give a force access to a file; no-op if it already has access
    ///
    /// # Errors
    /// Cancelled execution, unknown file or unknown force
    pub fn grant_file_access(
        &self,
        file_id: &str,
        force: &ForceLocator,
    ) -> Result<bool, TargetError> {
        self.ensure_active()?;
        self.ensure_file(file_id)?;
        if self.session.has_file_access(file_id, force) {
            return Ok(false);
        }
        self.session.grant_file_access(file_id, force)?;
        debug!(effect_id = %self.effect.id, file_id, %force, "grant file access");
        Ok(true)
    }

    /// Take a file away from a force; no-op if it has no access
    ///
    /// # Errors
    /// Cancelled execution, unknown file or unknown force
    pub fn revoke_file_access(
        &self,
        file_id: &str,
        force: &ForceLocator,
    ) -> Result<bool, TargetError> {
        self.ensure_active()?;
        self.ensure_file(file_id)?;
        if !self.session.has_file_access(file_id, force) {
            return Ok(false);
        }
        self.session.revoke_file_access(file_id, force)?;
        debug!(effect_id = %self.effect.id, file_id, %force, "revoke file access");
        Ok(true)
    }

    /// Append a message to a force's output, or broadcast when `to` is `None`
    ///
    /// # Errors
    /// Cancelled execution or unknown force
    pub fn send_output(
        &self,
        message: impl Into<String>,
        to: Option<&ForceLocator>,
    ) -> Result<(), TargetError> {
        self.send_output_kind(OutputKind::Info, message, to)
    }

    /// [`send_output`](Self::send_output) with an explicit kind
    ///
    /// # Errors
    /// Cancelled execution or unknown force
    pub fn send_output_kind(
        &self,
        kind: OutputKind,
        message: impl Into<String>,
        to: Option<&ForceLocator>,
    ) -> Result<(), TargetError> {
        self.ensure_active()?;
        let message = OutputMessage::new(kind, message).from_effect(self.effect.id.clone());
        Ok(self.session.send_output(message, to)?)
    }

    fn ensure_active(&self) -> Result<(), TargetError> {
        if self.cancellation.is_cancelled() {
            Err(TargetError::Aborted)
        } else {
            Ok(())
        }
    }

    fn ensure_file(&self, file_id: &str) -> Result<(), TargetError> {
        match self.session.file(file_id) {
            Some(_) => Ok(()),
            None => Err(SessionError::FileNotFound(file_id.to_string()).into()),
        }
    }
}

impl std::fmt::Debug for EffectExecutionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectExecutionContext")
            .field("effect_id", &self.effect.id)
            .field("target_id", &self.target.id())
            .field("session_id", &self.session.session_id())
            .field("cancelled", &self.is_cancelled())
            .finish_non_exhaustive()
    }
}
