//! Audit trail for repository mutations
//!
//! Every successful `register`, `updateProfile` and `deactivate` emits exactly one
//! [`AuditEntry`] through the [`AuditHook`]. Entries are immutable once written.
//!
//! # Available Sinks
//!
//! - [`MemoryAuditSink`]: in-process, queryable by entity id
//! - [`TracingAuditSink`]: structured `tracing` events on the `audit` target
//! - `PgAuditSink` (`database` feature): append-only table guarded by `CREATE RULE`

pub mod config;
pub mod entry;
pub mod hook;
pub mod sink;

#[cfg(feature = "database")]
pub mod pg;

pub use config::{AuditConfig, AuditFailurePolicy};
pub use entry::{Actor, AuditAction, AuditEntry};
pub use hook::AuditHook;
pub use sink::{AuditSink, MemoryAuditSink, TracingAuditSink};

#[cfg(feature = "database")]
pub use pg::PgAuditSink;
