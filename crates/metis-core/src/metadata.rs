//! Keys addressing forces, nodes, actions and files in a session
//!
//! These are the shapes target arguments store, e.g.
//! `{"forceMetadata": {"forceKey": "f1"}}`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Addresses a force
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForceLocator {
    /// Force key
    pub force_key: String,
}

impl ForceLocator {
    /// Create locator
    #[inline]
    pub fn new(force_key: impl Into<String>) -> Self {
        Self {
            force_key: force_key.into(),
        }
    }
}

impl fmt::Display for ForceLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.force_key)
    }
}

/// Addresses a node within a force
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeLocator {
    /// Force key
    pub force_key: String,
    /// Node key
    pub node_key: String,
}

impl NodeLocator {
    /// Create locator
    #[inline]
    pub fn new(force_key: impl Into<String>, node_key: impl Into<String>) -> Self {
        Self {
            force_key: force_key.into(),
            node_key: node_key.into(),
        }
    }

    /// Owning force
    #[inline]
    #[must_use]
    pub fn force(&self) -> ForceLocator {
        ForceLocator::new(self.force_key.clone())
    }
}

impl fmt::Display for NodeLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.force_key, self.node_key)
    }
}

/// Addresses an action on a node
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionLocator {
    /// Force key
    pub force_key: String,
    /// Node key
    pub node_key: String,
    /// Action key
    pub action_key: String,
}

impl ActionLocator {
    /// Create locator
    #[inline]
    pub fn new(
        force_key: impl Into<String>,
        node_key: impl Into<String>,
        action_key: impl Into<String>,
    ) -> Self {
        Self {
            force_key: force_key.into(),
            node_key: node_key.into(),
            action_key: action_key.into(),
        }
    }

    /// Owning node
    #[inline]
    #[must_use]
    pub fn node(&self) -> NodeLocator {
        NodeLocator::new(self.force_key.clone(), self.node_key.clone())
    }
}

impl fmt::Display for ActionLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.force_key, self.node_key, self.action_key)
    }
}

/// Addresses a file attached to the mission
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileLocator {
    /// File id
    pub file_id: String,
}
