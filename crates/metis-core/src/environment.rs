//! Target environments: versioned bundles of targets

use crate::error::{parse_version, DefinitionError, TargetError};
use crate::session::SessionHandle;
use crate::target::Target;
use indexmap::IndexMap;
use metis_store::TargetStore;
use semver::Version;
use std::fmt;
use std::sync::Arc;

/// Per-session lifecycle of an environment
///
/// Both hooks default to doing nothing.
#[async_trait::async_trait]
pub trait EnvironmentHooks: Send + Sync {
    /// Called once when a session starts
    async fn setup(
        &self,
        session: &dyn SessionHandle,
        store: &TargetStore,
    ) -> Result<(), TargetError> {
        let _ = (session, store);
        Ok(())
    }

    /// Called once when a session ends, before its store is destroyed
    async fn teardown(
        &self,
        session: &dyn SessionHandle,
        store: &TargetStore,
    ) -> Result<(), TargetError> {
        let _ = (session, store);
        Ok(())
    }
}

/// Named, versioned collection of targets
pub struct TargetEnvironment {
    id: String,
    name: String,
    description: String,
    version: Version,
    targets: IndexMap<String, Arc<Target>>,
    hooks: Option<Arc<dyn EnvironmentHooks>>,
}

impl TargetEnvironment {
    /// Start defining an environment
    ///
    /// # Errors
    /// [`DefinitionError::InvalidVersion`] if `version` is not a semantic version
    pub fn builder(
        id: impl Into<String>,
        version: &str,
    ) -> Result<TargetEnvironmentBuilder, DefinitionError> {
        Ok(TargetEnvironmentBuilder {
            id: id.into(),
            name: None,
            description: String::new(),
            version: parse_version(version)?,
            targets: Vec::new(),
            hooks: None,
        })
    }

    /// Environment id
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

    /// Environment version
    #[inline]
    #[must_use]
    pub fn version(&self) -> &Version {
        &self.version
    }

    /// Target by id
    #[inline]
    #[must_use]
    pub fn target(&self, target_id: &str) -> Option<&Arc<Target>> {
        self.targets.get(target_id)
    }

    /// Targets in declaration order
    pub fn targets(&self) -> impl Iterator<Item = &Arc<Target>> {
        self.targets.values()
    }

    /// Whether the environment has a target with this id
    #[inline]
    #[must_use]
    pub fn contains(&self, target_id: &str) -> bool {
        self.targets.contains_key(target_id)
    }

    /// Lifecycle hooks, if any
    #[inline]
    #[must_use]
    pub fn hooks(&self) -> Option<&Arc<dyn EnvironmentHooks>> {
        self.hooks.as_ref()
    }
}

impl fmt::Debug for TargetEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TargetEnvironment")
            .field("id", &self.id)
            .field("version", &self.version)
            .field("targets", &self.targets.keys().collect::<Vec<_>>())
            .field("hooks", &self.hooks.is_some())
            .finish_non_exhaustive()
    }
}

/// Builder for [`TargetEnvironment`]
pub struct TargetEnvironmentBuilder {
    id: String,
    name: Option<String>,
    description: String,
    version: Version,
    targets: Vec<Target>,
    hooks: Option<Arc<dyn EnvironmentHooks>>,
}

impl TargetEnvironmentBuilder {
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

    /// Add a target
    #[must_use]
    pub fn target(mut self, target: Target) -> Self {
        self.targets.push(target);
        self
    }

    /// Attach lifecycle hooks
    #[must_use]
    pub fn hooks(mut self, hooks: impl EnvironmentHooks + 'static) -> Self {
        self.hooks = Some(Arc::new(hooks));
        self
    }

    /// Stamp targets with this environment and freeze
    ///
    /// # Errors
    /// [`DefinitionError::DuplicateTarget`] if two targets share an id
    pub fn build(self) -> Result<TargetEnvironment, DefinitionError> {
        let mut targets = IndexMap::with_capacity(self.targets.len());
        for mut target in self.targets {
            if targets.contains_key(target.id()) {
                return Err(DefinitionError::DuplicateTarget {
                    environment_id: self.id,
                    target_id: target.id().to_string(),
                });
            }
            target.stamp(&self.id, &self.version);
            targets.insert(target.id().to_string(), Arc::new(target));
        }

        Ok(TargetEnvironment {
            name: self.name.unwrap_or_else(|| self.id.clone()),
            id: self.id,
            description: self.description,
            version: self.version,
            targets,
            hooks: self.hooks,
        })
    }
}
