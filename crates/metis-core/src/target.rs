//! Targets: named, versioned units of mutation logic
//!
//! A [`Target`] bundles an argument schema, a [`TargetScript`] and a
//! [`TargetMigrationRegistry`]. Targets are owned by exactly one
//! [`TargetEnvironment`](crate::TargetEnvironment), which stamps them with
//! its id and version when it is built.

use crate::args::{ArgSpec, TargetArgs};
use crate::context::EffectExecutionContext;
use crate::effect::{Effect, EffectArgs};
use crate::error::{parse_version, MigrationError, TargetError};
use crate::migration::{MigratedArgs, TargetMigrationRegistry};
use futures::future::BoxFuture;
use semver::Version;
use std::fmt;
use std::sync::Arc;

/// Script executed for every effect pointing at a target
///
/// Returning an error fails only the current effect.
#[async_trait::async_trait]
pub trait TargetScript: Send + Sync {
    /// Run against a freshly built context
    async fn execute(&self, ctx: &EffectExecutionContext) -> Result<(), TargetError>;
}

/// Adapter for synchronous closure scripts
pub struct SyncScript<F>(F);

#[async_trait::async_trait]
impl<F> TargetScript for SyncScript<F>
where
    F: Fn(&EffectExecutionContext) -> Result<(), TargetError> + Send + Sync,
{
    async fn execute(&self, ctx: &EffectExecutionContext) -> Result<(), TargetError> {
        (self.0)(ctx)
    }
}

/// Adapter for asynchronous closure scripts returning boxed futures
pub struct AsyncScript<F>(F);

#[async_trait::async_trait]
impl<F> TargetScript for AsyncScript<F>
where
    F: for<'c> Fn(&'c EffectExecutionContext) -> BoxFuture<'c, Result<(), TargetError>>
        + Send
        + Sync,
{
    async fn execute(&self, ctx: &EffectExecutionContext) -> Result<(), TargetError> {
        (self.0)(ctx).await
    }
}

/// Named, versioned capability pluggable into effects
pub struct Target {
    id: String,
    name: String,
    description: String,
    args: Arc<[ArgSpec]>,
    script: Arc<dyn TargetScript>,
    migrations: TargetMigrationRegistry,
    environment_id: String,
    environment_version: Version,
}

impl Target {
    /// Start defining a target
    #[inline]
    pub fn builder(id: impl Into<String>) -> TargetBuilder {
        TargetBuilder::new(id)
    }

    /// Target id, unique within its environment
    #[inline]
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Display name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Description
    #[inline]
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Argument schema
    #[inline]
    #[must_use]
    pub fn args(&self) -> &[ArgSpec] {
        &self.args
    }

    /// Script
    #[inline]
    #[must_use]
    pub fn script(&self) -> &Arc<dyn TargetScript> {
        &self.script
    }

    /// Migrations
    #[inline]
    #[must_use]
    pub fn migrations(&self) -> &TargetMigrationRegistry {
        &self.migrations
    }

    /// Owning environment id
    #[inline]
    #[must_use]
    pub fn environment_id(&self) -> &str {
        &self.environment_id
    }

    /// Current argument contract version
    ///
    /// The newer of the environment version and the latest migration.
    #[must_use]
    pub fn current_version(&self) -> Version {
        match self.migrations.latest() {
            Some(latest) if *latest > self.environment_version => latest.clone(),
            _ => self.environment_version.clone(),
        }
    }

    /// Bring an effect's stored arguments up to the current contract
    ///
    /// Perform-on-read: the effect itself is not modified.
    ///
    /// # Errors
    /// - [`MigrationError::InvalidRecordedVersion`] for a malformed recorded version
    /// - [`MigrationError::AheadOfTarget`] when the effect is newer than this target
    /// - [`MigrationError::TransformFailed`] when a transform rejects the bag
    pub fn migrate(&self, effect: &Effect) -> Result<MigratedArgs, MigrationError> {
        let recorded = parse_version(&effect.target_environment_version)?;
        let current = self.current_version();
        if recorded > current {
            return Err(MigrationError::AheadOfTarget { recorded, current });
        }
        let (args, applied) = self.migrations.migrate(&recorded, effect.args.clone())?;
        Ok(MigratedArgs {
            args,
            version: current,
            applied,
        })
    }

    /// Resolve an argument bag against this target's schema
    #[must_use]
    pub fn resolve_args(&self, args: EffectArgs) -> TargetArgs {
        TargetArgs::resolve(Arc::clone(&self.args), args)
    }

    pub(crate) fn stamp(&mut self, environment_id: &str, environment_version: &Version) {
        self.environment_id = environment_id.to_string();
        self.environment_version = environment_version.clone();
    }
}

impl fmt::Debug for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Target")
            .field("id", &self.id)
            .field("environment_id", &self.environment_id)
            .field("version", &self.current_version())
            .field("args", &self.args.len())
            .field("migrations", &self.migrations)
            .finish_non_exhaustive()
    }
}

/// Builder for [`Target`]
pub struct TargetBuilder {
    id: String,
    name: Option<String>,
    description: String,
    args: Vec<ArgSpec>,
    migrations: TargetMigrationRegistry,
}

impl TargetBuilder {
    /// Create builder
    #[inline]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            description: String::new(),
            args: Vec::new(),
            migrations: TargetMigrationRegistry::new(),
        }
    }

    /// Display name (defaults to the id)
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Description
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Append an argument
    #[must_use]
    pub fn arg(mut self, spec: ArgSpec) -> Self {
        self.args.push(spec);
        self
    }

    /// Set migrations
    #[must_use]
    pub fn migrations(mut self, migrations: TargetMigrationRegistry) -> Self {
        self.migrations = migrations;
        self
    }

    /// Finish with a script object
    pub fn script(self, script: impl TargetScript + 'static) -> Target {
        self.finish(Arc::new(script))
    }

    /// Finish with a synchronous closure
    pub fn sync_script<F>(self, f: F) -> Target
    where
        F: Fn(&EffectExecutionContext) -> Result<(), TargetError> + Send + Sync + 'static,
    {
        self.finish(Arc::new(SyncScript(f)))
    }

    /// Finish with an asynchronous closure
    pub fn async_script<F>(self, f: F) -> Target
    where
        F: for<'c> Fn(&'c EffectExecutionContext) -> BoxFuture<'c, Result<(), TargetError>>
            + Send
            + Sync
            + 'static,
    {
        self.finish(Arc::new(AsyncScript(f)))
    }

    fn finish(self, script: Arc<dyn TargetScript>) -> Target {
        Target {
            name: self.name.unwrap_or_else(|| self.id.clone()),
            id: self.id,
            description: self.description,
            args: self.args.into(),
            script,
            migrations: self.migrations,
            environment_id: String::new(),
            environment_version: Version::new(0, 0, 0),
        }
    }
}
