//! # catalog-store
//!
//! Generic paginated data-access layer for a library catalog backend. Every catalog resource
//! (genres, authors, publishers, ...) gets the same repository operations from one generic
//! implementation.
//!
//! ## Features
//!
//! - **Pagination**: offset/limit windows with `total`, `totalPages`, `hasNext`, `hasPrev`
//! - **Uniqueness**: declarative rules with trim/lowercase transforms, checked before each
//!   write and enforced again by the storage backend
//! - **Soft delete**: tombstones that hide records from every default read path
//! - **Audit trail**: one immutable entry per successful create, update and delete
//! - **Storage backends**: in-memory, or PostgreSQL JSONB tables (`database` feature)
//! - **Configuration**: layered defaults, TOML files and `CATALOG_` environment variables
//!
//! ## Example
//!
//! ```rust,no_run
//! use catalog_store::prelude::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = Config::load()?;
//!     init_tracing(&config)?;
//!
//!     let genres: GenreRepository<_> = GenreRepository::from_config(
//!         MemoryStorage::new(),
//!         Arc::new(TracingAuditSink),
//!         &config,
//!     );
//!
//!     let fiction = genres
//!         .register(Genre::new("Fiction"), &Actor::user("usr_librarian"))
//!         .await?;
//!     let page = genres.search("fic", &PageRequest::new()).await?;
//!     assert_eq!(page.data[0].id, fiction.id);
//!
//!     Ok(())
//! }
//! ```

pub mod audit;
pub mod catalog;
pub mod config;
pub mod error;
pub mod ids;
pub mod observability;
pub mod repository;
pub mod storage;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{Config, LogFormat, PaginationConfig, ServiceConfig};
    pub use crate::error::{Error, Result};
    pub use crate::ids::{EntityId, EntityIdError};
    pub use crate::observability::init_tracing;

    pub use crate::audit::{
        Actor, AuditAction, AuditConfig, AuditEntry, AuditFailurePolicy, AuditHook, AuditSink,
        MemoryAuditSink, TracingAuditSink,
    };

    #[cfg(feature = "database")]
    pub use crate::audit::PgAuditSink;

    pub use crate::repository::{
        Deactivated, FieldDef, FieldValue, Fields, PageMeta, PageRequest, Paginated,
        PaginationEngine, Record, RepositoryError, RepositoryErrorKind, RepositoryResult,
        Resource, ResourceRepository, Schema, SortOrder, Transform, UniqueRule,
    };

    pub use crate::storage::{Criteria, FilterCondition, MemoryStorage, Storage};

    #[cfg(feature = "database")]
    pub use crate::storage::PgStorage;

    pub use crate::catalog::{
        Author, AuthorPatch, AuthorRepository, Genre, GenrePatch, GenreRepository, Publisher,
        PublisherPatch, PublisherRepository,
    };

    pub use tracing::{debug, error, info, instrument, trace, warn};
}
