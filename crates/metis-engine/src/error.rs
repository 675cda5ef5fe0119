//! Error types for the METIS engine
//!
//! Per-effect failures never surface here: they are reported as outcomes.
//! [`EngineError`] covers configuration, definitions, scenarios and the
//! persistence hook.

use metis_core::DefinitionError;

/// Engine-level failure
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration file could not be read
    #[error("failed to read config `{path}`: {source}")]
    ConfigIo {
        /// Path that was read
        path: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Configuration file is not valid TOML for [`EngineConfig`](crate::EngineConfig)
    #[error("invalid config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Target or environment definition rejected
    #[error(transparent)]
    Definition(#[from] DefinitionError),

    /// Migrated arguments could not be persisted
    #[error("failed to persist migrated effect `{effect_id}`: {reason}")]
    Persistence {
        /// Effect being persisted
        effect_id: String,
        /// Persistence layer message
        reason: String,
    },

    /// Scenario or snapshot could not be decoded
    #[error("invalid scenario: {0}")]
    Scenario(#[from] serde_json::Error),
}

impl EngineError {
    /// Create a persistence failure
    #[inline]
    pub fn persistence(effect_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Persistence {
            effect_id: effect_id.into(),
            reason: reason.into(),
        }
    }

    /// Whether this failure came from configuration
    #[inline]
    #[must_use]
    pub fn is_config_error(&self) -> bool {
        matches!(self, Self::ConfigIo { .. } | Self::ConfigParse(_))
    }
}

/// Result alias for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn persistence_error_names_effect() {
        let err = EngineError::persistence("e7", "disk full");
        assert!(err.to_string().contains("e7"));
        assert!(!err.is_config_error());
    }

    #[test]
    fn config_errors_are_classified() {
        let err = EngineError::from(toml::from_str::<toml::Value>("= 1").unwrap_err());
        assert!(err.is_config_error());
    }
}
