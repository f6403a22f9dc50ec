//! Audit hook configuration
//!
//! Loaded from the `[audit]` section of config.toml or `CATALOG_AUDIT__*` environment variables.

use serde::{Deserialize, Serialize};

/// Audit hook configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Record audit entries for mutations (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// What a failing audit sink does to the mutation that triggered it
    #[serde(default)]
    pub failure_policy: AuditFailurePolicy,
}

/// Behaviour when the audit sink fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditFailurePolicy {
    /// Fail the operation with an internal error. The write has already happened.
    #[default]
    Propagate,
    /// Log the failure at `warn` and let the operation succeed
    Tolerate,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            failure_policy: AuditFailurePolicy::default(),
        }
    }
}

fn default_true() -> bool {
    true
}
