//! METIS Core - targets, environments and the effect execution context
//!
//! The vocabulary of the effect engine:
//! - [`Effect`]: a configured invocation of a target, fired by a trigger
//! - [`Target`]: argument schema, script and migrations behind an effect
//! - [`TargetEnvironment`]: a versioned bundle of targets
//! - [`TargetEnvironmentRegistry`]: lookup and inference of targets
//! - [`EffectExecutionContext`]: the only surface a script can mutate through
//!
//! # Example
//!
//! ```rust
//! use metis_core::prelude::*;
//!
//! # fn example() -> Result<(), DefinitionError> {
//! let environment = TargetEnvironment::builder("metis", "0.2.0")?
//!     .name("METIS")
//!     .target(
//!         Target::builder("output")
//!             .arg(ArgSpec::new("message", ArgType::LargeString).required())
//!             .sync_script(|ctx| {
//!                 let message = ctx.args().string("message")?;
//!                 ctx.send_output(message, None)
//!             }),
//!     )
//!     .build()?;
//!
//! let registry = TargetEnvironmentRegistry::new();
//! registry.register(environment);
//! assert!(registry.infer_target("output").is_some());
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod args;
pub mod context;
pub mod effect;
pub mod environment;
pub mod error;
pub mod metadata;
pub mod migration;
pub mod registry;
pub mod session;
pub mod target;

// Re-exports for convenience
pub use args::{ArgDependency, ArgSpec, ArgType, DependencyCondition, TargetArgs};
pub use context::EffectExecutionContext;
pub use effect::{next_order, select_batch, Effect, EffectArgs, EffectTrigger};
pub use environment::{EnvironmentHooks, TargetEnvironment, TargetEnvironmentBuilder};
pub use error::{
    parse_version, ArgumentValidationError, DefinitionError, InvalidVersionError, MigrationError,
    ResolutionError, ScriptExecutionError, SessionError, TargetError,
};
pub use metadata::{ActionLocator, FileLocator, ForceLocator, NodeLocator};
pub use migration::{MigratedArgs, MigrationTransform, TargetMigrationRegistry};
pub use registry::TargetEnvironmentRegistry;
pub use session::{ActionParameters, FileInfo, OutputKind, OutputMessage, SessionHandle};
pub use target::{Target, TargetBuilder, TargetScript};

pub use tokio_util::sync::CancellationToken;

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for defining targets and environments
    pub use crate::{
        ActionLocator, ArgDependency, ArgSpec, ArgType, DefinitionError, Effect,
        EffectExecutionContext, EffectTrigger, EnvironmentHooks, ForceLocator, NodeLocator,
        SessionHandle, Target, TargetEnvironment, TargetEnvironmentRegistry,
        TargetMigrationRegistry, TargetError, TargetScript,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
