//! Generic paginated data-access layer
//!
//! This module provides the building blocks every catalog resource composes:
//!
//! - **Schema mapping**: [`Schema`], [`FieldDef`], [`UniqueRule`] and the [`Fields`] trait
//! - **Pagination**: [`PaginationEngine`] turns a [`PageRequest`] into an offset/limit window
//!   and builds [`PageMeta`]
//! - **Uniqueness**: [`UniqueValidator`] checks unique rules before each write
//! - **Soft delete**: [`SoftDeleteManager`] tombstones records instead of removing them
//! - **Composition**: [`ResourceRepository`] wires the above to a
//!   [`Storage`](crate::storage::Storage) backend and an [`AuditHook`](crate::audit::AuditHook)
//!
//! # Example
//!
//! ```rust,ignore
//! use catalog_store::prelude::*;
//!
//! let genres: GenreRepository<_> =
//!     GenreRepository::from_config(MemoryStorage::new(), Arc::new(TracingAuditSink), &config);
//!
//! let g1 = genres.register(Genre::new("Fiction"), &Actor::System).await?;
//! let err = genres.register(Genre::new("fiction"), &Actor::System).await.unwrap_err();
//! assert!(err.is_conflict());
//!
//! genres.deactivate(&g1.id, &Actor::System).await?;
//! assert!(genres.find_by_id(&g1.id).await.unwrap_err().is_not_found());
//! ```

pub mod error;
pub mod model;
pub mod pagination;
pub mod resource;
pub mod schema;
pub mod soft_delete;
pub mod unique;

pub use error::{RepositoryError, RepositoryErrorKind, RepositoryOperation, RepositoryResult};
pub use model::{
    FieldValue, Fields, Record, Resource, CREATED_AT_FIELD, ID_FIELD, UPDATED_AT_FIELD,
};
pub use pagination::{
    OrderBy, PageMeta, PageRequest, PageWindow, Paginated, PaginationEngine, SortOrder,
};
pub use resource::ResourceRepository;
pub use schema::{FieldDef, FieldKind, Schema, Transform, UniqueRule};
pub use soft_delete::{Deactivated, SoftDeleteManager};
pub use unique::UniqueValidator;
