//! METIS Engine - effect execution for live mission sessions
//!
//! Runs the effects attached to mission actions:
//! - [`EffectExecutor`]: ordered, failure-isolated trigger batches
//! - [`ActionRunner`]: initiation, processing, outcome roll, outcome batch
//! - [`ExecutionTracker`]: aborts running executions when nodes close
//! - [`InMemorySession`]: a self-contained session for hosts and tests
//! - [`targets`]: the built-in `metis` environment
//!
//! # Example
//!
//! ```rust,no_run
//! use metis_core::{EffectTrigger, SessionHandle, TargetEnvironmentRegistry};
//! use metis_engine::{targets, EffectEngine, EngineConfig, InMemorySession, SessionSnapshot};
//! use std::sync::Arc;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let registry = Arc::new(TargetEnvironmentRegistry::new());
//! targets::install_builtin(&registry)?;
//! let engine = EffectEngine::new(EngineConfig::new(), registry);
//!
//! let snapshot: SessionSnapshot = serde_json::from_str(r#"{"sessionId": "s1"}"#)?;
//! let session: Arc<dyn SessionHandle> =
//!     Arc::new(InMemorySession::new(snapshot).with_tracker(Arc::clone(engine.tracker())));
//!
//! engine.start_session(session.as_ref()).await;
//! let report = engine.execute_trigger(&[], EffectTrigger::ExecutionSuccess, &session).await;
//! assert!(report.is_empty());
//! engine.end_session(session.as_ref()).await;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod config;
pub mod engine;
pub mod error;
pub mod executor;
pub mod logging;
pub mod outcome;
pub mod persistence;
pub mod runner;
pub mod scenario;
pub mod session;
pub mod targets;
pub mod tracker;

// Re-exports for convenience
pub use config::EngineConfig;
pub use engine::EffectEngine;
pub use error::{EngineError, Result};
pub use executor::EffectExecutor;
pub use outcome::{EffectOutcome, EffectReport, EffectSummary, ExecutionReport};
pub use persistence::{EffectPersistence, NoPersistence};
pub use runner::{ActionExecutionReport, ActionResult, ActionRunner, MissionAction};
pub use scenario::{Scenario, ScenarioPersistence};
pub use session::{
    ActionState, FileState, ForceState, InMemorySession, NodeState, SessionSnapshot,
};
pub use tracker::{ExecutionGuard, ExecutionId, ExecutionTracker};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
