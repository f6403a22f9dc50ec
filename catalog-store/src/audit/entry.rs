//! Audit entry types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Kind of mutation being audited
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AuditAction {
    /// A record was registered
    Create,
    /// A record's profile was updated
    Update,
    /// A record was deactivated (soft delete)
    Delete,
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create => write!(f, "CREATE"),
            Self::Update => write!(f, "UPDATE"),
            Self::Delete => write!(f, "DELETE"),
        }
    }
}

/// Who performed a mutation. Serializes as the actor id, or `"system"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Actor {
    /// Internal or unattributed change
    #[default]
    System,
    /// An authenticated user, by id
    User(String),
}

impl Actor {
    const SYSTEM: &'static str = "system";

    /// An actor for the given user id
    pub fn user(id: impl Into<String>) -> Self {
        Self::User(id.into())
    }

    /// The actor id as recorded in the audit trail
    pub fn as_str(&self) -> &str {
        match self {
            Self::System => Self::SYSTEM,
            Self::User(id) => id,
        }
    }
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for Actor {
    fn from(s: String) -> Self {
        if s == Self::SYSTEM {
            Self::System
        } else {
            Self::User(s)
        }
    }
}

impl From<&str> for Actor {
    fn from(s: &str) -> Self {
        Self::from(s.to_string())
    }
}

impl From<Actor> for String {
    fn from(actor: Actor) -> Self {
        match actor {
            Actor::System => Actor::SYSTEM.to_string(),
            Actor::User(id) => id,
        }
    }
}

/// A single, immutable audit trail entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    /// Unique entry identifier (UUIDv7, time-ordered)
    pub id: Uuid,
    /// Who performed the mutation
    pub performed_by: Actor,
    /// Id of the mutated record
    pub entity_id: String,
    /// Resource type name, e.g. `Genre`
    pub entity_type: String,
    /// What happened
    pub action: AuditAction,
    /// Free-text detail
    pub detail: String,
    /// When the entry was created
    pub created_at: DateTime<Utc>,
}

impl AuditEntry {
    /// Create an entry stamped with a fresh id and the current time
    pub fn new(
        performed_by: Actor,
        entity_id: impl Into<String>,
        action: AuditAction,
        detail: impl Into<String>,
        entity_type: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            performed_by,
            entity_id: entity_id.into(),
            entity_type: entity_type.into(),
            action,
            detail: detail.into(),
            created_at: Utc::now(),
        }
    }
}
