//! Engine configuration
//!
//! Loaded from TOML, every field optional:
//!
//! ```toml
//! persist_migrations = true
//! log_filter = "metis_engine=debug"
//! default_success_chance = 0.5
//! default_process_time_ms = 5000
//! rng_seed = 42
//! ```

use crate::error::{EngineError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration of an [`EffectEngine`](crate::EffectEngine)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Hand migrated arguments to the persistence hook
    pub persist_migrations: bool,
    /// Default tracing filter directive
    pub log_filter: String,
    /// Success chance for actions the session does not track
    pub default_success_chance: f64,
    /// Process time for actions the session does not track
    pub default_process_time_ms: u64,
    /// Seed for the action outcome roll; entropy when unset
    pub rng_seed: Option<u64>,
}

impl EngineConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse configuration from TOML text
    ///
    /// # Errors
    /// [`EngineError::ConfigParse`] on malformed TOML or wrong field types
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Read configuration from a TOML file
    ///
    /// # Errors
    /// [`EngineError::ConfigIo`] if the file cannot be read,
    /// [`EngineError::ConfigParse`] if it does not parse
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| EngineError::ConfigIo {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// With migration persistence
    #[inline]
    #[must_use]
    pub fn with_persist_migrations(mut self, persist: bool) -> Self {
        self.persist_migrations = persist;
        self
    }

    /// With log filter
    #[inline]
    #[must_use]
    pub fn with_log_filter(mut self, filter: impl Into<String>) -> Self {
        self.log_filter = filter.into();
        self
    }

    /// With fallback success chance, clamped to `[0, 1]`
    #[inline]
    #[must_use]
    pub fn with_default_success_chance(mut self, chance: f64) -> Self {
        self.default_success_chance = chance.clamp(0.0, 1.0);
        self
    }

    /// With fallback process time
    #[inline]
    #[must_use]
    pub fn with_default_process_time_ms(mut self, ms: u64) -> Self {
        self.default_process_time_ms = ms;
        self
    }

    /// With deterministic outcome rolls
    #[inline]
    #[must_use]
    pub fn with_rng_seed(mut self, seed: u64) -> Self {
        self.rng_seed = Some(seed);
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            persist_migrations: false,
            log_filter: "info".to_string(),
            default_success_chance: 0.5,
            default_process_time_ms: 5000,
            rng_seed: None,
        }
    }
}
