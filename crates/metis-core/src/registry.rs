//! Target environment registry
//!
//! Catalog of installed environments. Absence is always a `None` or an empty
//! `Vec`; only [`TargetEnvironmentRegistry::resolve`] turns it into a
//! [`ResolutionError`] for diagnostics.

use crate::effect::Effect;
use crate::environment::TargetEnvironment;
use crate::error::ResolutionError;
use crate::target::Target;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Registry of installed target environments
///
/// Constructed explicitly and shared by `Arc`; there is no process-global
/// instance.
#[derive(Debug, Default)]
pub struct TargetEnvironmentRegistry {
    environments: RwLock<BTreeMap<String, Arc<TargetEnvironment>>>,
}

impl TargetEnvironmentRegistry {
    /// Create empty registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            environments: RwLock::new(BTreeMap::new()),
        }
    }

    /// Install an environment
    ///
    /// An id collision logs a warning and leaves the installed environment
    /// in place. Returns whether the environment was inserted.
    pub fn register(&self, environment: TargetEnvironment) -> bool {
        let mut environments = self.environments.write();
        if environments.contains_key(environment.id()) {
            tracing::warn!(
                environment_id = environment.id(),
                "target environment already registered, ignoring"
            );
            return false;
        }
        tracing::debug!(
            environment_id = environment.id(),
            version = %environment.version(),
            targets = environment.targets().count(),
            "registered target environment"
        );
        environments.insert(environment.id().to_string(), Arc::new(environment));
        true
    }

    /// Environment by id
    #[must_use]
    pub fn get(&self, environment_id: &str) -> Option<Arc<TargetEnvironment>> {
        self.environments.read().get(environment_id).cloned()
    }

    /// Target by `(target, environment)`
    #[must_use]
    pub fn get_target(&self, target_id: &str, environment_id: &str) -> Option<Arc<Target>> {
        self.environments
            .read()
            .get(environment_id)
            .and_then(|env| env.target(target_id).cloned())
    }

    /// Target by id alone, only if exactly one environment has it
    #[must_use]
    pub fn infer_target(&self, target_id: &str) -> Option<Arc<Target>> {
        let environments = self.environments.read();
        let mut matches = environments.values().filter_map(|env| env.target(target_id));
        match (matches.next(), matches.next()) {
            (Some(target), None) => Some(Arc::clone(target)),
            _ => None,
        }
    }

    /// Targets of an environment; empty when it is absent
    #[must_use]
    pub fn get_targets(&self, environment_id: &str) -> Vec<Arc<Target>> {
        self.environments
            .read()
            .get(environment_id)
            .map(|env| env.targets().cloned().collect())
            .unwrap_or_default()
    }

    /// Installed environments, sorted by id
    #[must_use]
    pub fn environments(&self) -> Vec<Arc<TargetEnvironment>> {
        self.environments.read().values().cloned().collect()
    }

    /// Number of installed environments
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.environments.read().len()
    }

    /// Whether nothing is installed
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.environments.read().is_empty()
    }

    /// Resolve the target an effect points at
    ///
    /// Uses the effect's environment when it names one, environment-less
    /// inference otherwise.
    ///
    /// # Errors
    /// [`ResolutionError`] describing which lookup failed
    pub fn resolve(&self, effect: &Effect) -> Result<Arc<Target>, ResolutionError> {
        let environments = self.environments.read();
        match effect.environment_id.as_deref() {
            Some(environment_id) => {
                let env = environments
                    .get(environment_id)
                    .ok_or_else(|| {
                        ResolutionError::UnknownEnvironment(environment_id.to_string())
                    })?;
                env.target(&effect.target_id)
                    .cloned()
                    .ok_or_else(|| ResolutionError::UnknownTarget {
                        target_id: effect.target_id.clone(),
                        environment_id: environment_id.to_string(),
                    })
            }
            None => {
                let carriers: Vec<&Arc<TargetEnvironment>> = environments
                    .values()
                    .filter(|env| env.contains(&effect.target_id))
                    .collect();
                match carriers.as_slice() {
                    [] => Err(ResolutionError::NoMatchingTarget(effect.target_id.clone())),
                    [env] => env
                        .target(&effect.target_id)
                        .cloned()
                        .ok_or_else(|| ResolutionError::NoMatchingTarget(effect.target_id.clone())),
                    many => Err(ResolutionError::Ambiguous {
                        target_id: effect.target_id.clone(),
                        environments: many.iter().map(|env| env.id().to_string()).collect(),
                    }),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effect::{EffectArgs, EffectTrigger};

    fn env(id: &str, targets: &[&str]) -> TargetEnvironment {
        targets
            .iter()
            .fold(TargetEnvironment::builder(id, "1.0.0").unwrap(), |builder, target| {
                builder.target(Target::builder(*target).sync_script(|_| Ok(())))
            })
            .build()
            .unwrap()
    }

    fn effect(target_id: &str, environment_id: Option<&str>) -> Effect {
        Effect {
            id: "e1".into(),
            local_key: "1".into(),
            name: "test".into(),
            description: String::new(),
            target_id: target_id.into(),
            environment_id: environment_id.map(str::to_string),
            target_environment_version: "1.0.0".into(),
            trigger: EffectTrigger::ExecutionSuccess,
            order: 1,
            args: EffectArgs::new(),
        }
    }

    #[test]
    fn registry_new_empty() {
        let registry = TargetEnvironmentRegistry::new();
        assert!(registry.is_empty());
        assert!(registry.get("metis").is_none());
        assert!(registry.get_targets("metis").is_empty());
    }

    #[test]
    fn duplicate_registration_is_ignored() {
        let registry = TargetEnvironmentRegistry::new();
        assert!(registry.register(env("metis", &["output"])));
        assert!(!registry.register(env("metis", &["delay"])));

        assert_eq!(registry.len(), 1);
        assert!(registry.get_target("output", "metis").is_some());
        assert!(registry.get_target("delay", "metis").is_none());
    }

    #[test]
    fn get_target_fails_on_either_lookup() {
        let registry = TargetEnvironmentRegistry::new();
        registry.register(env("metis", &["output"]));
        assert!(registry.get_target("output", "other").is_none());
        assert!(registry.get_target("missing", "metis").is_none());
    }

    #[test]
    fn infer_target_requires_unique_id() {
        let registry = TargetEnvironmentRegistry::new();
        registry.register(env("a", &["output", "alpha"]));
        registry.register(env("b", &["output", "beta"]));

        assert!(registry.infer_target("output").is_none());
        assert_eq!(registry.infer_target("beta").unwrap().environment_id(), "b");
        assert!(registry.infer_target("gamma").is_none());
    }

    #[test]
    fn get_targets_preserves_declaration_order() {
        let registry = TargetEnvironmentRegistry::new();
        registry.register(env("metis", &["zeta", "alpha"]));
        let ids: Vec<String> = registry
            .get_targets("metis")
            .iter()
            .map(|t| t.id().to_string())
            .collect();
        assert_eq!(ids, vec!["zeta", "alpha"]);
    }

    #[test]
    fn resolve_explains_failures() {
        let registry = TargetEnvironmentRegistry::new();
        registry.register(env("a", &["output", "alpha"]));
        registry.register(env("b", &["output"]));

        assert!(registry.resolve(&effect("alpha", Some("a"))).is_ok());
        assert!(registry.resolve(&effect("alpha", None)).is_ok());
        assert_eq!(
            registry.resolve(&effect("alpha", Some("zz"))).unwrap_err(),
            ResolutionError::UnknownEnvironment("zz".into())
        );
        assert!(matches!(
            registry.resolve(&effect("missing", Some("a"))),
            Err(ResolutionError::UnknownTarget { .. })
        ));
        assert_eq!(
            registry.resolve(&effect("output", None)).unwrap_err(),
            ResolutionError::Ambiguous {
                target_id: "output".into(),
                environments: vec!["a".into(), "b".into()],
            }
        );
        assert_eq!(
            registry.resolve(&effect("missing", None)).unwrap_err(),
            ResolutionError::NoMatchingTarget("missing".into())
        );
    }
}
