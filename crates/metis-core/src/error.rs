//! Error types for METIS Core
//!
//! Provides the effect failure taxonomy:
//! - Target/environment resolution failures
//! - Argument migration failures
//! - Argument validation failures raised by target scripts
//! - Script execution failures
//! - Definition errors, which are fatal at registration time

use crate::args::ArgType;
use metis_store::StoreError;
use semver::Version;

/// A target could not be resolved for an effect
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolutionError {
    /// The named environment is not installed
    #[error("environment `{0}` is not installed")]
    UnknownEnvironment(String),

    /// The environment exists but has no such target
    #[error("target `{target_id}` not found in environment `{environment_id}`")]
    UnknownTarget {
        /// Requested target
        target_id: String,
        /// Environment searched
        environment_id: String,
    },

    /// Environment-less lookup found no target with this id
    #[error("target `{0}` not found in any environment")]
    NoMatchingTarget(String),

    /// Environment-less lookup found the id in several environments
    #[error("target `{target_id}` is ambiguous across environments {environments:?}")]
    Ambiguous {
        /// Requested target
        target_id: String,
        /// Every environment carrying the id
        environments: Vec<String>,
    },
}

/// A version string is not a valid semantic version
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid semantic version `{version}`: {reason}")]
pub struct InvalidVersionError {
    /// Offending input
    pub version: String,
    /// Parser message
    pub reason: String,
}

/// Parse a semantic version, mapping failures to [`InvalidVersionError`]
///
/// # Errors
/// Returns [`InvalidVersionError`] if `version` is not `MAJOR.MINOR.PATCH[-pre][+build]`
pub fn parse_version(version: &str) -> Result<Version, InvalidVersionError> {
    Version::parse(version).map_err(|e| InvalidVersionError {
        version: version.to_string(),
        reason: e.to_string(),
    })
}

/// Stored arguments could not be brought up to the target's contract
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MigrationError {
    /// The effect's recorded version does not parse
    #[error("effect records an invalid version: {0}")]
    InvalidRecordedVersion(#[from] InvalidVersionError),

    /// The effect was saved against a newer target than the one installed
    #[error("effect version {recorded} is ahead of target version {current}")]
    AheadOfTarget {
        /// Version stored on the effect
        recorded: Version,
        /// Installed target version
        current: Version,
    },

    /// A registered transform rejected the argument bag
    #[error("migration to {version} failed: {reason}")]
    TransformFailed {
        /// Version of the failing transform
        version: Version,
        /// Transform message
        reason: String,
    },
}

/// An argument is missing, mistyped or out of bounds
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ArgumentValidationError {
    /// Argument not present and no default applies
    #[error("required argument `{0}` is missing")]
    Missing(String),

    /// Argument is not declared in the target's schema
    #[error("argument `{0}` is not declared by the target")]
    Undeclared(String),

    /// Argument has the wrong JSON shape
    #[error("argument `{arg}` expected {expected}, found {found}")]
    WrongType {
        /// Argument id
        arg: String,
        /// Declared type
        expected: ArgType,
        /// Rendered value found
        found: String,
    },

    /// Numeric argument outside its declared bounds
    #[error("argument `{arg}` = {value} is out of range [{min:?}, {max:?}]")]
    OutOfRange {
        /// Argument id
        arg: String,
        /// Value found
        value: f64,
        /// Declared minimum
        min: Option<f64>,
        /// Declared maximum
        max: Option<f64>,
    },

    /// Dropdown argument outside its option list
    #[error("argument `{arg}` has value `{value}` which is not an allowed option")]
    InvalidOption {
        /// Argument id
        arg: String,
        /// Value found
        value: String,
    },
}

/// The session rejected a mutation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// No force with this key
    #[error("force `{0}` not found")]
    ForceNotFound(String),

    /// No node with this key in the force
    #[error("node `{node_key}` not found in force `{force_key}`")]
    NodeNotFound {
        /// Force searched
        force_key: String,
        /// Node requested
        node_key: String,
    },

    /// No action with this key on the node
    #[error("action `{action_key}` not found on node `{node_key}` in force `{force_key}`")]
    ActionNotFound {
        /// Force searched
        force_key: String,
        /// Node searched
        node_key: String,
        /// Action requested
        action_key: String,
    },

    /// No file with this id
    #[error("file `{0}` not found")]
    FileNotFound(String),

    /// Any other refusal by the session layer
    #[error("session rejected mutation: {0}")]
    Rejected(String),
}

/// Failure returned by a target script
#[derive(Debug, thiserror::Error)]
pub enum TargetError {
    /// Argument validation failed
    #[error(transparent)]
    Argument(#[from] ArgumentValidationError),

    /// Session mutation was rejected
    #[error(transparent)]
    Session(#[from] SessionError),

    /// Store value could not be decoded
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The surrounding action execution was cancelled
    #[error("execution aborted")]
    Aborted,

    /// The script panicked
    #[error("script panicked: {0}")]
    Panicked(String),

    /// Script-specific failure
    #[error("{0}")]
    Script(String),
}

impl TargetError {
    /// Create a script-specific failure
    #[inline]
    pub fn script(message: impl Into<String>) -> Self {
        Self::Script(message.into())
    }

    /// Whether this failure is an argument validation failure
    #[inline]
    #[must_use]
    pub fn is_argument_error(&self) -> bool {
        matches!(self, Self::Argument(_))
    }

    /// Whether this failure came from cancellation
    #[inline]
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        matches!(self, Self::Aborted)
    }
}

/// A target script failed while executing an effect
#[derive(Debug, thiserror::Error)]
#[error("effect `{effect_name}` ({effect_id}) failed: {source}")]
pub struct ScriptExecutionError {
    /// Failing effect id
    pub effect_id: String,
    /// Failing effect name
    pub effect_name: String,
    /// What the script returned
    #[source]
    pub source: TargetError,
}

/// Programming errors in target or environment definitions
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DefinitionError {
    /// Malformed version on an environment or migration
    #[error(transparent)]
    InvalidVersion(#[from] InvalidVersionError),

    /// Two migrations registered for the same version
    #[error("migration for version {0} registered twice")]
    DuplicateMigration(Version),

    /// Two targets with the same id in one environment
    #[error("target `{target_id}` defined twice in environment `{environment_id}`")]
    DuplicateTarget {
        /// Environment being built
        environment_id: String,
        /// Duplicated target id
        target_id: String,
    },
}
