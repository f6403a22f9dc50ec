//! Post-mutation audit hook

use std::sync::Arc;

use super::config::{AuditConfig, AuditFailurePolicy};
use super::entry::AuditEntry;
use super::sink::AuditSink;
use crate::error::Error;

/// Emits one audit entry after each successful mutation.
///
/// The sink call is awaited inline. With [`AuditFailurePolicy::Propagate`] a sink failure is
/// returned to the caller; with [`AuditFailurePolicy::Tolerate`] it is logged and swallowed.
#[derive(Clone)]
pub struct AuditHook {
    sink: Option<Arc<dyn AuditSink>>,
    policy: AuditFailurePolicy,
}

impl AuditHook {
    /// Create a hook over `sink`. A disabled config yields a no-op hook.
    pub fn new(sink: Arc<dyn AuditSink>, config: &AuditConfig) -> Self {
        Self {
            sink: config.enabled.then_some(sink),
            policy: config.failure_policy,
        }
    }

    /// A hook that records nothing
    pub fn disabled() -> Self {
        Self {
            sink: None,
            policy: AuditFailurePolicy::default(),
        }
    }

    /// Whether entries reach a sink
    pub fn is_enabled(&self) -> bool {
        self.sink.is_some()
    }

    /// Record an entry according to the failure policy
    pub async fn record(&self, entry: AuditEntry) -> Result<(), Error> {
        let Some(sink) = &self.sink else {
            return Ok(());
        };

        match sink.log(&entry).await {
            Ok(()) => Ok(()),
            Err(e) if self.policy == AuditFailurePolicy::Tolerate => {
                tracing::warn!(
                    entity_type = %entry.entity_type,
                    entity_id = %entry.entity_id,
                    action = %entry.action,
                    error = %e,
                    "Audit sink failed; continuing"
                );
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

impl std::fmt::Debug for AuditHook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditHook")
            .field("enabled", &self.is_enabled())
            .field("policy", &self.policy)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::{Actor, AuditAction, MemoryAuditSink};
    use async_trait::async_trait;

    struct BrokenSink;

    #[async_trait]
    impl AuditSink for BrokenSink {
        async fn log(&self, _entry: &AuditEntry) -> Result<(), Error> {
            Err(Error::Internal("audit store unavailable".to_string()))
        }
    }

    fn entry() -> AuditEntry {
        AuditEntry::new(Actor::System, "genre_a", AuditAction::Create, "", "Genre")
    }

    #[tokio::test]
    async fn test_records_to_sink() {
        let sink = Arc::new(MemoryAuditSink::new());
        let hook = AuditHook::new(sink.clone(), &AuditConfig::default());
        hook.record(entry()).await.unwrap();
        assert_eq!(sink.len(), 1);
    }

    #[tokio::test]
    async fn test_disabled_config_records_nothing() {
        let sink = Arc::new(MemoryAuditSink::new());
        let config = AuditConfig {
            enabled: false,
            ..AuditConfig::default()
        };
        let hook = AuditHook::new(sink.clone(), &config);
        assert!(!hook.is_enabled());
        hook.record(entry()).await.unwrap();
        assert!(sink.is_empty());
    }

    #[tokio::test]
    async fn test_propagate_policy_returns_error() {
        let hook = AuditHook::new(Arc::new(BrokenSink), &AuditConfig::default());
        assert!(hook.record(entry()).await.is_err());
    }

    #[tokio::test]
    async fn test_tolerate_policy_swallows_error() {
        let config = AuditConfig {
            failure_policy: AuditFailurePolicy::Tolerate,
            ..AuditConfig::default()
        };
        let hook = AuditHook::new(Arc::new(BrokenSink), &config);
        assert!(hook.record(entry()).await.is_ok());
    }
}
