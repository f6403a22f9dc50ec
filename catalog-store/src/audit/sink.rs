//! Audit sink trait and in-process implementations
//!
//! The [`AuditSink`] trait is the audit store collaborator. Implementations are append-only:
//! nothing in this crate updates or deletes an entry once logged.

use async_trait::async_trait;
use std::sync::{Mutex, PoisonError};

use super::entry::AuditEntry;
use crate::error::Error;

/// Trait for audit entry persistence
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Append an entry
    async fn log(&self, entry: &AuditEntry) -> Result<(), Error>;
}

/// In-memory audit sink, queryable by entity id
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    entries: Mutex<Vec<AuditEntry>>,
}

impl MemoryAuditSink {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// All entries, in append order
    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// The trail of one entity, in append order. Tombstoned entities keep their trail.
    pub fn entries_for(&self, entity_id: &str) -> Vec<AuditEntry> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|e| e.entity_id == entity_id)
            .cloned()
            .collect()
    }

    /// Number of entries logged
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether nothing has been logged yet
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl AuditSink for MemoryAuditSink {
    async fn log(&self, entry: &AuditEntry) -> Result<(), Error> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(entry.clone());
        Ok(())
    }
}

/// Writes audit entries as structured `info` events on the `audit` target
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditSink;

#[async_trait]
impl AuditSink for TracingAuditSink {
    async fn log(&self, entry: &AuditEntry) -> Result<(), Error> {
        tracing::info!(
            target: "audit",
            audit_id = %entry.id,
            performed_by = %entry.performed_by,
            entity_type = %entry.entity_type,
            entity_id = %entry.entity_id,
            action = %entry.action,
            created_at = %entry.created_at.to_rfc3339(),
            "{}",
            entry.detail
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::{Actor, AuditAction};

    #[tokio::test]
    async fn test_memory_sink_filters_by_entity() {
        let sink = MemoryAuditSink::new();
        for (id, action) in [
            ("genre_a", AuditAction::Create),
            ("genre_b", AuditAction::Create),
            ("genre_a", AuditAction::Delete),
        ] {
            let entry = AuditEntry::new(Actor::System, id, action, "", "Genre");
            sink.log(&entry).await.unwrap();
        }

        assert_eq!(sink.len(), 3);
        let trail: Vec<_> = sink
            .entries_for("genre_a")
            .into_iter()
            .map(|e| e.action)
            .collect();
        assert_eq!(trail, vec![AuditAction::Create, AuditAction::Delete]);
    }

    #[tokio::test]
    async fn test_tracing_sink_never_fails() {
        let entry = AuditEntry::new(Actor::user("usr_1"), "genre_a", AuditAction::Update, "", "Genre");
        assert!(TracingAuditSink.log(&entry).await.is_ok());
    }
}
