//! Session mutation surface
//!
//! The live session (forces, nodes, actions, files, output logs) belongs to
//! the host. The engine only sees it through [`SessionHandle`], and target
//! scripts only see it through the execution context.

use crate::error::SessionError;
use crate::metadata::{ActionLocator, ForceLocator, NodeLocator};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Kind of output message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputKind {
    /// Plain informational text
    #[default]
    Info,
    /// Reported on success
    Success,
    /// Reported on failure
    Failure,
}

/// One entry of a force's output log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputMessage {
    /// Unique, time-sortable id
    pub id: Ulid,
    /// Kind
    pub kind: OutputKind,
    /// Text
    pub message: String,
    /// When it was produced
    pub timestamp: DateTime<Utc>,
    /// Effect that produced it, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effect_id: Option<String>,
}

impl OutputMessage {
    /// Create a message stamped now
    pub fn new(kind: OutputKind, message: impl Into<String>) -> Self {
        Self {
            id: Ulid::new(),
            kind,
            message: message.into(),
            timestamp: Utc::now(),
            effect_id: None,
        }
    }

    /// Attribute to an effect
    #[must_use]
    pub fn from_effect(mut self, effect_id: impl Into<String>) -> Self {
        self.effect_id = Some(effect_id.into());
        self
    }
}

/// Mission file as seen by scripts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileInfo {
    /// File id
    pub id: String,
    /// Display name
    pub name: String,
}

/// Live execution parameters of an action
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionParameters {
    /// Probability of success in `[0, 1]`
    pub success_chance: f64,
    /// Processing time in milliseconds
    pub process_time_ms: u64,
}

/// Mutation surface a session exposes to the engine
///
/// Every mutation is applied synchronously and is visible to whatever runs
/// next. Implementations own clamping and policy: resource floors per
/// force, success chance in `[0, 1]`, process time `>= 0`.
pub trait SessionHandle: Send + Sync {
    /// Session id, used to address store partitions
    fn session_id(&self) -> &str;

    /// Add a signed amount to a force's resource pool
    ///
    /// # Errors
    /// Unknown force, or the session refuses the change
    fn modify_resource_pool(&self, force: &ForceLocator, amount: f64) -> Result<(), SessionError>;

    /// Add a signed delta to an action's success chance
    ///
    /// # Errors
    /// Unknown force, node or action
    fn modify_success_chance(&self, action: &ActionLocator, delta: f64) -> Result<(), SessionError>;

    /// Add a signed delta (ms) to an action's process time
    ///
    /// # Errors
    /// Unknown force, node or action
    fn modify_process_time(
        &self,
        action: &ActionLocator,
        delta_ms: i64,
    ) -> Result<(), SessionError>;

    /// Open a node; returns `false` if it was already open
    ///
    /// # Errors
    /// Unknown force or node
    fn open_node(&self, node: &NodeLocator) -> Result<bool, SessionError>;

    /// Close a node and abort executions on its descendants; returns
    /// `false` if it was already closed
    ///
    /// # Errors
    /// Unknown force or node
    fn close_node(&self, node: &NodeLocator) -> Result<bool, SessionError>;

    /// Look up a file
    fn file(&self, file_id: &str) -> Option<FileInfo>;

    /// Whether a force can access a file
    fn has_file_access(&self, file_id: &str, force: &ForceLocator) -> bool;

    /// Give a force access to a file
    ///
    /// # Errors
    /// Unknown file or force
    fn grant_file_access(&self, file_id: &str, force: &ForceLocator) -> Result<(), SessionError>;

    /// Take a file away from a force
    ///
    /// # Errors
    /// Unknown file or force
    fn revoke_file_access(&self, file_id: &str, force: &ForceLocator) -> Result<(), SessionError>;

    /// Append to one force's output log, or every force's when `to` is `None`
    ///
    /// # Errors
    /// Unknown force
    fn send_output(
        &self,
        message: OutputMessage,
        to: Option<&ForceLocator>,
    ) -> Result<(), SessionError>;

    /// Live parameters of an action, if the session tracks them
    fn action_parameters(&self, action: &ActionLocator) -> Option<ActionParameters> {
        let _ = action;
        None
    }
}
