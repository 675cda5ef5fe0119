//! Self-contained scenarios: a session snapshot plus the effects of one action
//!
//! The `metis-effects` binary runs these. [`ScenarioPersistence`] collects
//! migrated arguments so the scenario can be saved back in upgraded form.

use crate::error::{EngineError, Result};
use crate::persistence::EffectPersistence;
use crate::session::SessionSnapshot;
use metis_core::{Effect, MigratedArgs};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Session state and the effects to run against it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    /// Starting session state
    pub session: SessionSnapshot,
    /// Effects of every trigger
    #[serde(default)]
    pub effects: Vec<Effect>,
}

impl Scenario {
    /// Decode a scenario from JSON
    ///
    /// # Errors
    /// [`EngineError::Scenario`] if the text is not a valid scenario
    pub fn from_json_str(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Encode as pretty-printed JSON
    ///
    /// # Errors
    /// [`EngineError::Scenario`] if encoding fails
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Writes migrated arguments into an in-memory copy of a scenario's effects
#[derive(Debug, Default)]
pub struct ScenarioPersistence {
    effects: Mutex<Vec<Effect>>,
    persisted: Mutex<usize>,
}

impl ScenarioPersistence {
    /// Track `effects`
    pub fn new(effects: Vec<Effect>) -> Self {
        Self {
            effects: Mutex::new(effects),
            persisted: Mutex::new(0),
        }
    }

    /// Current effects, with every persisted migration applied
    #[must_use]
    pub fn effects(&self) -> Vec<Effect> {
        self.effects.lock().clone()
    }

    /// Number of migrations persisted so far
    #[must_use]
    pub fn persisted(&self) -> usize {
        *self.persisted.lock()
    }
}

#[async_trait::async_trait]
impl EffectPersistence for ScenarioPersistence {
    async fn persist_migrated(&self, effect: &Effect, migrated: &MigratedArgs) -> Result<()> {
        let mut effects = self.effects.lock();
        let stored = effects.iter_mut().find(|e| e.id == effect.id).ok_or_else(|| {
            EngineError::persistence(&effect.id, "effect is not part of the scenario")
        })?;
        stored.args = migrated.args.clone();
        stored.target_environment_version = migrated.version.to_string();
        *self.persisted.lock() += 1;
        Ok(())
    }
}
