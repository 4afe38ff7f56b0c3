//! # Entity Identity
//!
//! A ledger-backed entity is addressed by its kind and an opaque string id.
//! Domains use their name, ideas and backup requests their numeric id.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifier of a ledger entity.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct EntityId(pub String);

impl EntityId {
    /// Create an id from anything string-like.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw id.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True for the empty id, which the ledger never assigns.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for EntityId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<u64> for EntityId {
    fn from(value: u64) -> Self {
        Self(value.to_string())
    }
}

/// Category of a ledger entity.
///
/// Each category owns its own cache and state map; ids of different kinds
/// never collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// A registered knowledge domain.
    Domain,
    /// A registered idea with royalty distribution.
    Idea,
    /// A backup request awaiting a provider.
    BackupRequest,
    /// The node reward pool (singleton entity).
    NodeRewards,
}

impl EntityKind {
    /// All kinds, in declaration order.
    pub const ALL: [EntityKind; 4] = [
        EntityKind::Domain,
        EntityKind::Idea,
        EntityKind::BackupRequest,
        EntityKind::NodeRewards,
    ];

    /// Stable lowercase label used in logs and metrics.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            EntityKind::Domain => "domain",
            EntityKind::Idea => "idea",
            EntityKind::BackupRequest => "backup_request",
            EntityKind::NodeRewards => "node_rewards",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Fully qualified reference to one entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityRef {
    pub kind: EntityKind,
    pub id: EntityId,
}

impl EntityRef {
    pub fn new(kind: EntityKind, id: impl Into<EntityId>) -> Self {
        Self {
            kind,
            id: id.into(),
        }
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}
