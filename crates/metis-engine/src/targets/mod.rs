//! Built-in `metis` target environment
//!
//! The targets every METIS installation ships with. Hosts install them with
//! [`install_builtin`] and may register further environments beside them.

use metis_core::{
    DefinitionError, EnvironmentHooks, SessionHandle, TargetEnvironment, TargetEnvironmentRegistry,
    TargetError,
};
use metis_store::TargetStore;
use serde_json::{json, Value};

mod counter;
mod delay;
mod file_access;
mod node;
mod output;
mod process_time;
mod resource_pool;
mod success_chance;

/// Id of the built-in environment
pub const METIS_ENVIRONMENT_ID: &str = "metis";

/// Version of the built-in environment
pub const METIS_ENVIRONMENT_VERSION: &str = "0.2.0";

/// Store key holding the per-session counters
pub(crate) const COUNTERS_KEY: &str = "counters";

/// Build the `metis` environment
///
/// # Errors
/// [`DefinitionError`] if a built-in definition is malformed
pub fn metis_environment() -> Result<TargetEnvironment, DefinitionError> {
    TargetEnvironment::builder(METIS_ENVIRONMENT_ID, METIS_ENVIRONMENT_VERSION)?
        .name("METIS")
        .description("Core targets for mission sessions")
        .target(output::target())
        .target(resource_pool::target()?)
        .target(success_chance::target())
        .target(process_time::target())
        .target(node::target())
        .target(file_access::target())
        .target(delay::target())
        .target(counter::target())
        .hooks(MetisHooks)
        .build()
}

/// Register the `metis` environment with `registry`
///
/// Returns `false` if an environment with the same id was already installed.
///
/// # Errors
/// [`DefinitionError`] if a built-in definition is malformed
pub fn install_builtin(registry: &TargetEnvironmentRegistry) -> Result<bool, DefinitionError> {
    Ok(registry.register(metis_environment()?))
}

/// Seeds and reports the session's counters
struct MetisHooks;

#[async_trait::async_trait]
impl EnvironmentHooks for MetisHooks {
    async fn setup(
        &self,
        session: &dyn SessionHandle,
        store: &TargetStore,
    ) -> Result<(), TargetError> {
        store.use_state(COUNTERS_KEY, json!({}));
        tracing::debug!(session_id = session.session_id(), "metis environment ready");
        Ok(())
    }

    async fn teardown(
        &self,
        session: &dyn SessionHandle,
        store: &TargetStore,
    ) -> Result<(), TargetError> {
        let counters = store.get(COUNTERS_KEY).map(|state| state.get());
        let count = counters.as_ref().and_then(Value::as_object).map_or(0, |c| c.len());
        tracing::debug!(
            session_id = session.session_id(),
            counters = count,
            "metis environment closed"
        );
        Ok(())
    }
}
