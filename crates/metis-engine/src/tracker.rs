//! Registry of in-flight action executions
//!
//! Each running action holds an [`ExecutionGuard`]. Dropping the guard
//! unregisters the execution, so an execution is tracked exactly as long
//! as it runs, whatever path it exits by.

use dashmap::DashMap;
use metis_core::{ActionLocator, CancellationToken, NodeLocator};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use ulid::Ulid;

/// Identifier of one action execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ExecutionId(pub Ulid);

impl ExecutionId {
    /// Generate a new id
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for ExecutionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ExecutionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug)]
struct TrackedExecution {
    action: ActionLocator,
    token: CancellationToken,
}

/// Tracks running executions and aborts them by node
#[derive(Debug, Default)]
pub struct ExecutionTracker {
    executions: DashMap<ExecutionId, TrackedExecution>,
}

impl ExecutionTracker {
    /// Create empty tracker
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            executions: DashMap::new(),
        }
    }

    /// Track an execution of `action` until the guard drops
    pub fn register(self: &Arc<Self>, action: ActionLocator) -> ExecutionGuard {
        let id = ExecutionId::new();
        let token = CancellationToken::new();
        tracing::debug!(execution_id = %id, %action, "execution registered");
        self.executions.insert(
            id,
            TrackedExecution {
                action,
                token: token.clone(),
            },
        );
        ExecutionGuard {
            id,
            token,
            tracker: Arc::clone(self),
        }
    }

    /// Cancel every execution running on `node`
    ///
    /// Returns how many were cancelled.
    pub fn abort_node(&self, node: &NodeLocator) -> usize {
        let mut aborted = 0;
        for entry in &self.executions {
            let execution = entry.value();
            let on_node = execution.action.force_key == node.force_key
                && execution.action.node_key == node.node_key;
            if on_node && !execution.token.is_cancelled() {
                execution.token.cancel();
                aborted += 1;
                tracing::info!(
                    execution_id = %entry.key(),
                    action = %execution.action,
                    "execution aborted"
                );
            }
        }
        aborted
    }

    /// Cancel one execution; returns whether it was running
    pub fn abort(&self, id: ExecutionId) -> bool {
        self.executions
            .get(&id)
            .map(|execution| execution.token.cancel())
            .is_some()
    }

    /// Whether anything is running on `node`
    #[must_use]
    pub fn is_node_busy(&self, node: &NodeLocator) -> bool {
        self.executions.iter().any(|entry| {
            entry.action.force_key == node.force_key && entry.action.node_key == node.node_key
        })
    }

    /// Number of running executions
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.executions.len()
    }

    /// Whether nothing is running
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.executions.is_empty()
    }
}

/// Registration of one running execution
///
/// Unregisters on drop.
#[derive(Debug)]
pub struct ExecutionGuard {
    id: ExecutionId,
    token: CancellationToken,
    tracker: Arc<ExecutionTracker>,
}

impl ExecutionGuard {
    /// Execution id
    #[inline]
    #[must_use]
    pub fn id(&self) -> ExecutionId {
        self.id
    }

    /// Token cancelled when the execution is aborted
    #[inline]
    #[must_use]
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}

impl Drop for ExecutionGuard {
    fn drop(&mut self) {
        self.tracker.executions.remove(&self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_unregisters_on_drop() {
        let tracker = Arc::new(ExecutionTracker::new());
        let guard = tracker.register(ActionLocator::new("f1", "n1", "a1"));
        assert_eq!(tracker.len(), 1);
        assert!(tracker.is_node_busy(&NodeLocator::new("f1", "n1")));
        drop(guard);
        assert!(tracker.is_empty());
    }

    #[test]
    fn abort_node_only_hits_that_node() {
        let tracker = Arc::new(ExecutionTracker::new());
        let on_node = tracker.register(ActionLocator::new("f1", "n1", "a1"));
        let elsewhere = tracker.register(ActionLocator::new("f1", "n2", "a1"));
        let other_force = tracker.register(ActionLocator::new("f2", "n1", "a1"));

        assert_eq!(tracker.abort_node(&NodeLocator::new("f1", "n1")), 1);
        assert!(on_node.token().is_cancelled());
        assert!(!elsewhere.token().is_cancelled());
        assert!(!other_force.token().is_cancelled());

        // Already cancelled executions are not counted twice.
        assert_eq!(tracker.abort_node(&NodeLocator::new("f1", "n1")), 0);
    }

    #[test]
    fn abort_by_id() {
        let tracker = Arc::new(ExecutionTracker::new());
        let guard = tracker.register(ActionLocator::new("f1", "n1", "a1"));
        let id = guard.id();
        assert!(tracker.abort(id));
        assert!(guard.token().is_cancelled());
        drop(guard);
        assert!(!tracker.abort(id));
    }
}
