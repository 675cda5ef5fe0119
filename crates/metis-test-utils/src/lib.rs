//! Testing utilities for the METIS workspace
//!
//! Shared fixtures: effect builders, a sample session, and targets and hooks
//! that record what they were asked to do.

#![allow(missing_docs)]

use futures::future::BoxFuture;
use metis_core::{
    ArgSpec, ArgType, DefinitionError, Effect, EffectArgs, EffectExecutionContext, EffectTrigger,
    EnvironmentHooks, MigratedArgs, SessionHandle, Target, TargetEnvironment,
    TargetMigrationRegistry, TargetError,
};
use metis_engine::{
    ActionState, EffectPersistence, FileState, ForceState, InMemorySession, NodeState,
    SessionSnapshot,
};
use metis_store::TargetStore;
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

pub const TEST_SESSION_ID: &str = "session-1";
pub const TEST_ENVIRONMENT_ID: &str = "test";

/// Builder for effects used in tests
#[derive(Debug, Clone)]
pub struct EffectBuilder {
    effect: Effect,
}

impl EffectBuilder {
    pub fn new(id: &str, target_id: &str) -> Self {
        Self {
            effect: Effect {
                id: id.to_string(),
                local_key: id.to_string(),
                name: format!("effect {id}"),
                description: String::new(),
                target_id: target_id.to_string(),
                environment_id: None,
                target_environment_version: "0.1.0".to_string(),
                trigger: EffectTrigger::ExecutionSuccess,
                order: 1,
                args: EffectArgs::new(),
            },
        }
    }

    #[must_use]
    pub fn environment(mut self, environment_id: &str) -> Self {
        self.effect.environment_id = Some(environment_id.to_string());
        self
    }

    #[must_use]
    pub fn version(mut self, version: &str) -> Self {
        self.effect.target_environment_version = version.to_string();
        self
    }

    #[must_use]
    pub fn trigger(mut self, trigger: EffectTrigger) -> Self {
        self.effect.trigger = trigger;
        self
    }

    #[must_use]
    pub fn order(mut self, order: u32) -> Self {
        self.effect.order = order;
        self
    }

    /// Replace the argument bag; `args` must be a JSON object
    #[must_use]
    pub fn args(mut self, args: Value) -> Self {
        self.effect.args = args.as_object().cloned().unwrap_or_default();
        self
    }

    pub fn build(self) -> Effect {
        self.effect
    }
}

pub fn effect(id: &str, target_id: &str) -> EffectBuilder {
    EffectBuilder::new(id, target_id)
}

/// Session with force `f1` (10 resources) and force `f2` (0 resources)
///
/// `f1` owns the tree `root -> child -> grandchild` plus `sibling`, with
/// action `a1` on every node. File `intel` exists and nobody can read it.
pub fn sample_snapshot() -> SessionSnapshot {
    let action = || ActionState::new("a1", 0.5, 1000);
    SessionSnapshot {
        session_id: TEST_SESSION_ID.to_string(),
        forces: vec![
            ForceState::new("f1", 10.0)
                .with_node(NodeState::new("root").opened().with_action(action()))
                .with_node(NodeState::new("child").child_of("root").opened().with_action(action()))
                .with_node(
                    NodeState::new("grandchild")
                        .child_of("child")
                        .opened()
                        .with_action(action()),
                )
                .with_node(NodeState::new("sibling").opened().with_action(action())),
            ForceState::new("f2", 0.0),
        ],
        files: vec![FileState::new("intel", "Intel Report")],
    }
}

pub fn sample_session() -> Arc<InMemorySession> {
    Arc::new(InMemorySession::new(sample_snapshot()))
}

/// Shared log of target invocations, in call order
#[derive(Debug, Clone, Default)]
pub struct InvocationLog(Arc<Mutex<Vec<String>>>);

impl InvocationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().clone()
    }
}

/// Target that logs the effect id of every invocation
pub fn recording_target(id: &str, log: &InvocationLog) -> Target {
    let log = log.clone();
    Target::builder(id)
        .arg(ArgSpec::new("label", ArgType::String))
        .sync_script(move |ctx| {
            log.push(ctx.effect().id.clone());
            Ok(())
        })
}

/// Target that always fails after logging
pub fn failing_target(id: &str, log: &InvocationLog) -> Target {
    let log = log.clone();
    Target::builder(id).sync_script(move |ctx| {
        log.push(ctx.effect().id.clone());
        Err(TargetError::script("deliberate failure"))
    })
}

/// Target that panics
pub fn panicking_target(id: &str) -> Target {
    Target::builder(id).sync_script(|_| panic!("target blew up"))
}

fn slow_script(ctx: &EffectExecutionContext) -> BoxFuture<'_, Result<(), TargetError>> {
    Box::pin(async move {
        ctx.sleep(Duration::from_secs(3600)).await?;
        ctx.send_output("finished sleeping", None)
    })
}

/// Target that sleeps an hour, cancellably, then broadcasts
pub fn slow_target(id: &str) -> Target {
    Target::builder(id).async_script(slow_script)
}

/// Recording target with a `0.1.0` migration that rejects `{ "broken": true }`
pub fn strict_target(id: &str, log: &InvocationLog) -> Result<Target, DefinitionError> {
    let migrations = TargetMigrationRegistry::new().register("0.1.0", |args: EffectArgs| {
        if args.get("broken") == Some(&Value::Bool(true)) {
            Err("legacy arguments are broken".to_string())
        } else {
            Ok(args)
        }
    })?;
    let log = log.clone();
    Ok(Target::builder(id).migrations(migrations).sync_script(move |ctx| {
        log.push(ctx.effect().id.clone());
        Ok(())
    }))
}

/// Environment `test` v0.1.0 with recording, strict, failing and panicking targets
pub fn test_environment(log: &InvocationLog) -> TargetEnvironment {
    TargetEnvironment::builder(TEST_ENVIRONMENT_ID, "0.1.0")
        .and_then(|builder| {
            Ok(builder
                .target(recording_target("record", log))
                .target(strict_target("strict", log)?))
        })
        .and_then(|builder| {
            builder
                .target(failing_target("fail", log))
                .target(panicking_target("panic"))
                .target(slow_target("slow"))
                .hooks(RecordingHooks::new(log))
                .build()
        })
        .expect("test environment definition is valid")
}

/// Hooks that log setup and teardown and leave a marker in the store
#[derive(Debug, Clone)]
pub struct RecordingHooks {
    log: InvocationLog,
}

impl RecordingHooks {
    pub fn new(log: &InvocationLog) -> Self {
        Self { log: log.clone() }
    }
}

#[async_trait::async_trait]
impl EnvironmentHooks for RecordingHooks {
    async fn setup(
        &self,
        session: &dyn SessionHandle,
        store: &TargetStore,
    ) -> Result<(), TargetError> {
        store.use_state("setup", true);
        self.log.push(format!("setup {}", session.session_id()));
        Ok(())
    }

    async fn teardown(
        &self,
        session: &dyn SessionHandle,
        store: &TargetStore,
    ) -> Result<(), TargetError> {
        self.log.push(format!("teardown {} setup={}", session.session_id(), store.has("setup")));
        Ok(())
    }
}

/// Persistence that records what it was handed
#[derive(Debug, Clone, Default)]
pub struct RecordingPersistence {
    persisted: Arc<Mutex<Vec<(String, MigratedArgs)>>>,
}

impl RecordingPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn persisted(&self) -> Vec<(String, MigratedArgs)> {
        self.persisted.lock().clone()
    }
}

#[async_trait::async_trait]
impl EffectPersistence for RecordingPersistence {
    async fn persist_migrated(
        &self,
        effect: &Effect,
        migrated: &MigratedArgs,
    ) -> metis_engine::Result<()> {
        self.persisted.lock().push((effect.id.clone(), migrated.clone()));
        Ok(())
    }
}
