//! In-memory session
//!
//! A self-contained [`SessionHandle`] for hosts without their own session
//! layer, the CLI and tests. State round-trips through [`SessionSnapshot`].

use crate::tracker::ExecutionTracker;
use metis_core::{
    ActionLocator, ActionParameters, FileInfo, ForceLocator, NodeLocator, OutputMessage,
    SessionError, SessionHandle,
};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Serializable state of a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    /// Session id
    pub session_id: String,
    /// Participating forces
    #[serde(default)]
    pub forces: Vec<ForceState>,
    /// Mission files
    #[serde(default)]
    pub files: Vec<FileState>,
}

/// State of one force
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForceState {
    /// Force key
    pub key: String,
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Resources available to the force
    #[serde(default)]
    pub resource_pool: f64,
    /// Whether the pool may go below zero
    #[serde(default)]
    pub allow_negative_resources: bool,
    /// Nodes of the force's mission tree
    #[serde(default)]
    pub nodes: Vec<NodeState>,
    /// Output log
    #[serde(default)]
    pub outputs: Vec<OutputMessage>,
}

impl ForceState {
    /// Create a force with a resource pool
    pub fn new(key: impl Into<String>, resource_pool: f64) -> Self {
        let key = key.into();
        Self {
            name: key.clone(),
            key,
            resource_pool,
            allow_negative_resources: false,
            nodes: Vec::new(),
            outputs: Vec::new(),
        }
    }

    /// Add a node
    #[must_use]
    pub fn with_node(mut self, node: NodeState) -> Self {
        self.nodes.push(node);
        self
    }

    /// Let the resource pool go negative
    #[must_use]
    pub fn allow_negative(mut self) -> Self {
        self.allow_negative_resources = true;
        self
    }

    fn node(&self, key: &str) -> Option<&NodeState> {
        self.nodes.iter().find(|n| n.key == key)
    }

    fn node_mut(&mut self, key: &str) -> Option<&mut NodeState> {
        self.nodes.iter_mut().find(|n| n.key == key)
    }

    /// Keys of every node below `key`
    fn descendants(&self, key: &str) -> Vec<String> {
        let mut found: Vec<String> = Vec::new();
        let mut frontier = vec![key.to_string()];
        while let Some(parent) = frontier.pop() {
            for node in &self.nodes {
                if node.parent.as_deref() == Some(parent.as_str()) && !found.contains(&node.key) {
                    found.push(node.key.clone());
                    frontier.push(node.key.clone());
                }
            }
        }
        found
    }
}

/// State of one mission node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeState {
    /// Node key
    pub key: String,
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Parent node key; `None` for roots
    #[serde(default)]
    pub parent: Option<String>,
    /// Whether the node is open
    #[serde(default)]
    pub opened: bool,
    /// Actions on the node
    #[serde(default)]
    pub actions: Vec<ActionState>,
}

impl NodeState {
    /// Create a closed root node
    pub fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            name: key.clone(),
            key,
            parent: None,
            opened: false,
            actions: Vec::new(),
        }
    }

    /// Place under `parent`
    #[must_use]
    pub fn child_of(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    /// Start open
    #[must_use]
    pub fn opened(mut self) -> Self {
        self.opened = true;
        self
    }

    /// Add an action
    #[must_use]
    pub fn with_action(mut self, action: ActionState) -> Self {
        self.actions.push(action);
        self
    }
}

/// Live parameters of one action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionState {
    /// Action key
    pub key: String,
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Probability of success in `[0, 1]`; clamped on load
    #[serde(deserialize_with = "deserialize_chance")]
    pub success_chance: f64,
    /// Processing time in milliseconds
    pub process_time_ms: u64,
}

impl ActionState {
    /// Create an action
    pub fn new(key: impl Into<String>, success_chance: f64, process_time_ms: u64) -> Self {
        let key = key.into();
        Self {
            name: key.clone(),
            key,
            success_chance: success_chance.clamp(0.0, 1.0),
            process_time_ms,
        }
    }
}

fn deserialize_chance<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    f64::deserialize(deserializer).map(|chance| chance.clamp(0.0, 1.0))
}

/// A mission file and the forces that can read it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileState {
    /// File id
    pub id: String,
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Force keys with access
    #[serde(default)]
    pub access: BTreeSet<String>,
}

impl FileState {
    /// Create a file nobody can access
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            access: BTreeSet::new(),
        }
    }
}

/// Session held entirely in memory
#[derive(Debug)]
pub struct InMemorySession {
    session_id: String,
    state: RwLock<SessionSnapshot>,
    tracker: Option<Arc<ExecutionTracker>>,
}

impl InMemorySession {
    /// Start a session from a snapshot
    ///
    /// Success chances outside `[0, 1]` are clamped.
    pub fn new(mut snapshot: SessionSnapshot) -> Self {
        let actions = snapshot
            .forces
            .iter_mut()
            .flat_map(|force| force.nodes.iter_mut())
            .flat_map(|node| node.actions.iter_mut());
        for action in actions {
            action.success_chance = action.success_chance.clamp(0.0, 1.0);
        }
        Self {
            session_id: snapshot.session_id.clone(),
            state: RwLock::new(snapshot),
            tracker: None,
        }
    }

    /// Abort tracked executions when nodes close
    #[must_use]
    pub fn with_tracker(mut self, tracker: Arc<ExecutionTracker>) -> Self {
        self.tracker = Some(tracker);
        self
    }

    /// Copy of the current state
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        self.state.read().clone()
    }

    /// Resource pool of a force
    #[must_use]
    pub fn resource_pool(&self, force: &ForceLocator) -> Option<f64> {
        self.state
            .read()
            .forces
            .iter()
            .find(|f| f.key == force.force_key)
            .map(|f| f.resource_pool)
    }

    /// Whether a node is open
    #[must_use]
    pub fn is_node_open(&self, node: &NodeLocator) -> Option<bool> {
        let state = self.state.read();
        let force = state.forces.iter().find(|f| f.key == node.force_key)?;
        force.node(&node.node_key).map(|n| n.opened)
    }

    /// Output log of a force
    #[must_use]
    pub fn outputs(&self, force: &ForceLocator) -> Vec<OutputMessage> {
        self.state
            .read()
            .forces
            .iter()
            .find(|f| f.key == force.force_key)
            .map(|f| f.outputs.clone())
            .unwrap_or_default()
    }

    fn with_force<T>(
        &self,
        force_key: &str,
        f: impl FnOnce(&mut ForceState) -> Result<T, SessionError>,
    ) -> Result<T, SessionError> {
        let mut state = self.state.write();
        let force = state
            .forces
            .iter_mut()
            .find(|force| force.key == force_key)
            .ok_or_else(|| SessionError::ForceNotFound(force_key.to_string()))?;
        f(force)
    }

    fn with_action<T>(
        &self,
        action: &ActionLocator,
        f: impl FnOnce(&mut ActionState) -> T,
    ) -> Result<T, SessionError> {
        self.with_force(&action.force_key, |force| {
            let node = force
                .node_mut(&action.node_key)
                .ok_or_else(|| node_not_found(&action.node()))?;
            let state = node
                .actions
                .iter_mut()
                .find(|a| a.key == action.action_key)
                .ok_or_else(|| SessionError::ActionNotFound {
                    force_key: action.force_key.clone(),
                    node_key: action.node_key.clone(),
                    action_key: action.action_key.clone(),
                })?;
            Ok(f(state))
        })
    }

    fn with_file<T>(
        &self,
        file_id: &str,
        f: impl FnOnce(&mut FileState) -> T,
    ) -> Result<T, SessionError> {
        let mut state = self.state.write();
        let file = state
            .files
            .iter_mut()
            .find(|file| file.id == file_id)
            .ok_or_else(|| SessionError::FileNotFound(file_id.to_string()))?;
        Ok(f(file))
    }

    fn ensure_force(&self, force: &ForceLocator) -> Result<(), SessionError> {
        self.with_force(&force.force_key, |_| Ok(()))
    }
}

impl SessionHandle for InMemorySession {
    fn session_id(&self) -> &str {
        &self.session_id
    }

    fn modify_resource_pool(&self, force: &ForceLocator, amount: f64) -> Result<(), SessionError> {
        self.with_force(&force.force_key, |state| {
            let next = state.resource_pool + amount;
            state.resource_pool = if state.allow_negative_resources {
                next
            } else {
                next.max(0.0)
            };
            Ok(())
        })
    }

    fn modify_success_chance(
        &self,
        action: &ActionLocator,
        delta: f64,
    ) -> Result<(), SessionError> {
        self.with_action(action, |state| {
            state.success_chance = (state.success_chance + delta).clamp(0.0, 1.0);
        })
    }

    fn modify_process_time(
        &self,
        action: &ActionLocator,
        delta_ms: i64,
    ) -> Result<(), SessionError> {
        self.with_action(action, |state| {
            state.process_time_ms = state.process_time_ms.saturating_add_signed(delta_ms);
        })
    }

    fn open_node(&self, node: &NodeLocator) -> Result<bool, SessionError> {
        self.with_force(&node.force_key, |force| {
            let state = force
                .node_mut(&node.node_key)
                .ok_or_else(|| node_not_found(node))?;
            let changed = !state.opened;
            state.opened = true;
            Ok(changed)
        })
    }

    fn close_node(&self, node: &NodeLocator) -> Result<bool, SessionError> {
        let (changed, descendants) = self.with_force(&node.force_key, |force| {
            let state = force
                .node_mut(&node.node_key)
                .ok_or_else(|| node_not_found(node))?;
            let changed = state.opened;
            state.opened = false;
            Ok((changed, force.descendants(&node.node_key)))
        })?;

        if changed {
            if let Some(tracker) = &self.tracker {
                let aborted: usize = descendants
                    .into_iter()
                    .map(|key| tracker.abort_node(&NodeLocator::new(node.force_key.clone(), key)))
                    .sum();
                if aborted > 0 {
                    tracing::info!(%node, aborted, "closed node aborted descendant executions");
                }
            }
        }
        Ok(changed)
    }

    fn file(&self, file_id: &str) -> Option<FileInfo> {
        self.state
            .read()
            .files
            .iter()
            .find(|f| f.id == file_id)
            .map(|f| FileInfo {
                id: f.id.clone(),
                name: f.name.clone(),
            })
    }

    fn has_file_access(&self, file_id: &str, force: &ForceLocator) -> bool {
        self.state
            .read()
            .files
            .iter()
            .any(|f| f.id == file_id && f.access.contains(&force.force_key))
    }

    fn grant_file_access(&self, file_id: &str, force: &ForceLocator) -> Result<(), SessionError> {
        self.ensure_force(force)?;
        self.with_file(file_id, |file| {
            file.access.insert(force.force_key.clone());
        })
    }

    fn revoke_file_access(&self, file_id: &str, force: &ForceLocator) -> Result<(), SessionError> {
        self.ensure_force(force)?;
        self.with_file(file_id, |file| {
            file.access.remove(&force.force_key);
        })
    }

    fn send_output(
        &self,
        message: OutputMessage,
        to: Option<&ForceLocator>,
    ) -> Result<(), SessionError> {
        match to {
            Some(force) => self.with_force(&force.force_key, |state| {
                state.outputs.push(message);
                Ok(())
            }),
            None => {
                for state in &mut self.state.write().forces {
                    state.outputs.push(message.clone());
                }
                Ok(())
            }
        }
    }

    fn action_parameters(&self, action: &ActionLocator) -> Option<ActionParameters> {
        let state = self.state.read();
        let force = state.forces.iter().find(|f| f.key == action.force_key)?;
        let node = force.node(&action.node_key)?;
        let action = node.actions.iter().find(|a| a.key == action.action_key)?;
        Some(ActionParameters {
            success_chance: action.success_chance,
            process_time_ms: action.process_time_ms,
        })
    }
}

fn node_not_found(node: &NodeLocator) -> SessionError {
    SessionError::NodeNotFound {
        force_key: node.force_key.clone(),
        node_key: node.node_key.clone(),
    }
}
