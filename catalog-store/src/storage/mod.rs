//! Storage collaborator trait and backends
//!
//! The repository layer talks to storage only through [`Storage`]. Backends own the
//! `createdAt`/`updatedAt` timestamps and are the final enforcement point for unique rules: a
//! write that would duplicate an active record's key fails with a
//! [`StorageErrorKind::UniqueViolation`] naming the rule's index.
//!
//! # Available Backends
//!
//! - [`MemoryStorage`]: in-process map guarded by a `tokio` `RwLock`
//! - `PgStorage` (`database` feature): one JSONB table per resource with partial unique
//!   expression indexes

use chrono::{DateTime, Utc};
use std::future::Future;

use crate::ids::EntityId;
use crate::repository::{OrderBy, Record, Resource};

pub mod criteria;
pub mod error;
pub mod memory;

#[cfg(feature = "database")]
pub mod postgres;

pub use criteria::{Criteria, FilterCondition, FilterOperator, Visibility};
pub use error::{StorageError, StorageErrorKind, StorageOperation};
pub use memory::MemoryStorage;

#[cfg(feature = "database")]
pub use postgres::PgStorage;

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Persistence for one resource type
pub trait Storage<T: Resource>: Send + Sync {
    /// Insert a new active record, stamping both timestamps
    fn create(
        &self,
        id: EntityId,
        data: T,
    ) -> impl Future<Output = StorageResult<Record<T>>> + Send;

    /// First record matching the criteria
    fn find_one(
        &self,
        criteria: &Criteria,
    ) -> impl Future<Output = StorageResult<Option<Record<T>>>> + Send;

    /// A window of matching records in the given order, plus the total match count.
    ///
    /// `limit = None` returns every record from `offset` on.
    fn find_many(
        &self,
        criteria: &Criteria,
        order: &OrderBy,
        offset: u64,
        limit: Option<u64>,
    ) -> impl Future<Output = StorageResult<(Vec<Record<T>>, u64)>> + Send;

    /// Replace an active record's business data and bump `updatedAt`.
    ///
    /// Returns `false` when no active record has the id.
    fn update(&self, id: &EntityId, data: T) -> impl Future<Output = StorageResult<bool>> + Send;

    /// Set the tombstone on an active record.
    ///
    /// Returns `false` when no active record has the id.
    fn mark_deleted(
        &self,
        id: &EntityId,
        at: DateTime<Utc>,
    ) -> impl Future<Output = StorageResult<bool>> + Send;

    /// Number of records matching the criteria
    fn count(&self, criteria: &Criteria) -> impl Future<Output = StorageResult<u64>> + Send;
}
