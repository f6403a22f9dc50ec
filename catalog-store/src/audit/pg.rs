//! PostgreSQL audit sink
//!
//! Enforces immutability using `CREATE RULE` to silently discard UPDATE/DELETE operations.

use async_trait::async_trait;
use sqlx::PgPool;

use super::entry::AuditEntry;
use super::sink::AuditSink;
use crate::error::Error;

/// PostgreSQL-backed, append-only audit sink
pub struct PgAuditSink {
    pool: PgPool,
}

impl PgAuditSink {
    /// Create a sink over a caller-owned pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the `audit_logs` table, its indexes and immutability rules
    ///
    /// Should be called once during application startup.
    pub async fn initialize(&self) -> Result<(), Error> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS audit_logs (
                id UUID PRIMARY KEY,
                performed_by TEXT NOT NULL,
                entity_id TEXT NOT NULL,
                entity_type TEXT NOT NULL,
                action TEXT NOT NULL,
                detail TEXT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| Error::Internal(format!("Failed to create audit_logs table: {}", e)))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_audit_logs_entity ON audit_logs (entity_type, entity_id)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| Error::Internal(format!("Failed to create audit entity index: {}", e)))?;

        sqlx::query(
            r#"
            DO $$
            BEGIN
                IF NOT EXISTS (
                    SELECT 1 FROM pg_rules
                    WHERE rulename = 'audit_logs_no_update' AND tablename = 'audit_logs'
                ) THEN
                    CREATE RULE audit_logs_no_update AS ON UPDATE TO audit_logs DO INSTEAD NOTHING;
                END IF;

                IF NOT EXISTS (
                    SELECT 1 FROM pg_rules
                    WHERE rulename = 'audit_logs_no_delete' AND tablename = 'audit_logs'
                ) THEN
                    CREATE RULE audit_logs_no_delete AS ON DELETE TO audit_logs DO INSTEAD NOTHING;
                END IF;
            END
            $$;
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| Error::Internal(format!("Failed to create audit immutability rules: {}", e)))?;

        Ok(())
    }
}

#[async_trait]
impl AuditSink for PgAuditSink {
    async fn log(&self, entry: &AuditEntry) -> Result<(), Error> {
        sqlx::query(
            r#"
            INSERT INTO audit_logs (
                id, performed_by, entity_id, entity_type, action, detail, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(entry.id)
        .bind(entry.performed_by.as_str())
        .bind(&entry.entity_id)
        .bind(&entry.entity_type)
        .bind(entry.action.to_string())
        .bind(&entry.detail)
        .bind(entry.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| Error::Internal(format!("Failed to append audit entry: {}", e)))?;

        Ok(())
    }
}
