//! Generic per-resource repository
//!
//! [`ResourceRepository`] composes the pagination engine, the unique validator, the soft
//! delete manager and the audit hook over a [`Storage`] backend. One instance serves one
//! resource type; every resource gets the same operations.
//!
//! Within one call the steps run strictly in sequence: validate, write, audit, respond.

use std::marker::PhantomData;
use std::sync::Arc;

use tracing::{debug, info, instrument};

use super::error::{RepositoryError, RepositoryOperation, RepositoryResult};
use super::model::{FieldValue, Record, Resource};
use super::pagination::{PageRequest, Paginated, PaginationEngine};
use super::schema::{FieldKind, Schema};
use super::soft_delete::{Deactivated, SoftDeleteManager};
use super::unique::UniqueValidator;
use crate::audit::{Actor, AuditAction, AuditEntry, AuditHook, AuditSink};
use crate::config::Config;
use crate::ids::EntityId;
use crate::storage::{Criteria, FilterCondition, FilterOperator, Storage};

/// Data access for one resource type
///
/// # Example
///
/// ```rust,ignore
/// use catalog_store::audit::{Actor, AuditConfig, AuditHook, MemoryAuditSink};
/// use catalog_store::catalog::{Genre, GenreRepository};
/// use catalog_store::repository::{PageRequest, PaginationEngine};
/// use catalog_store::storage::MemoryStorage;
/// use std::sync::Arc;
///
/// let sink = Arc::new(MemoryAuditSink::new());
/// let genres: GenreRepository<_> = GenreRepository::new(
///     MemoryStorage::new(),
///     AuditHook::new(sink.clone(), &AuditConfig::default()),
///     PaginationEngine::default(),
/// );
///
/// let fiction = genres.register(Genre::new("Fiction"), &Actor::System).await?;
/// let page = genres.find_all_paged(&PageRequest::new()).await?;
/// assert_eq!(page.data[0].id, fiction.id);
/// assert_eq!(sink.len(), 1);
/// ```
pub struct ResourceRepository<T, S> {
    storage: S,
    audit: AuditHook,
    pagination: PaginationEngine,
    unique: UniqueValidator,
    soft_delete: SoftDeleteManager,
    _resource: PhantomData<fn() -> T>,
}

impl<T, S> ResourceRepository<T, S>
where
    T: Resource,
    S: Storage<T>,
{
    /// Create a repository from its collaborators
    pub fn new(storage: S, audit: AuditHook, pagination: PaginationEngine) -> Self {
        Self {
            storage,
            audit,
            pagination,
            unique: UniqueValidator,
            soft_delete: SoftDeleteManager,
            _resource: PhantomData,
        }
    }

    /// Create a repository using the pagination and audit sections of `config`
    pub fn from_config(storage: S, sink: Arc<dyn AuditSink>, config: &Config) -> Self {
        Self::new(
            storage,
            AuditHook::new(sink, &config.audit),
            PaginationEngine::new(config.pagination.clone()),
        )
    }

    /// The storage backend
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// The resource schema
    pub fn schema(&self) -> &'static Schema {
        T::schema()
    }

    /// Create a record.
    ///
    /// Checks required fields and unique rules, writes, then records a `CREATE` audit entry.
    #[instrument(skip_all, fields(entity_type = %T::schema().entity_type))]
    pub async fn register(&self, data: T, performed_by: &Actor) -> RepositoryResult<Record<T>> {
        let op = RepositoryOperation::Register;
        let schema = T::schema();

        schema
            .check_required(&data)
            .map_err(|m| RepositoryError::validation(op, m))?;
        self.unique
            .validate::<T, S>(&self.storage, op, &data, None)
            .await?;

        let id = EntityId::generate(&schema.id_prefix);
        let record = self
            .storage
            .create(id, data)
            .await
            .map_err(|e| RepositoryError::from_storage(op, schema, e))?;

        self.record_audit(
            op,
            performed_by,
            &record.id,
            AuditAction::Create,
            format!("Registered {} {}", schema.display_name, record.id),
        )
        .await?;

        info!(entity_id = %record.id, performed_by = %performed_by, "Registered {}", schema.display_name);
        Ok(record)
    }

    /// Fetch an active record; tombstoned and unknown ids are `NotFound`
    #[instrument(skip_all, fields(entity_type = %T::schema().entity_type, entity_id = %id))]
    pub async fn find_by_id(&self, id: &EntityId) -> RepositoryResult<Record<T>> {
        let record = self.fetch_active(RepositoryOperation::FindById, id).await?;
        debug!("Found {}", T::schema().display_name);
        Ok(record)
    }

    /// Apply a patch to an active record.
    ///
    /// Unique rules are re-checked for the fields the patch touches, excluding the record
    /// itself. Returns the record as re-read after the write.
    #[instrument(skip_all, fields(entity_type = %T::schema().entity_type, entity_id = %id))]
    pub async fn update_profile(
        &self,
        id: &EntityId,
        patch: T::Patch,
        performed_by: &Actor,
    ) -> RepositoryResult<Record<T>> {
        let op = RepositoryOperation::UpdateProfile;
        let schema = T::schema();

        schema
            .check_patch(&patch)
            .map_err(|m| RepositoryError::validation(op, m))?;
        let current = self.fetch_active(op, id).await?;
        self.unique
            .validate(&self.storage, op, &patch, Some(&current))
            .await?;

        let mut data = current.data;
        data.apply_patch(patch);
        let changed = self
            .storage
            .update(id, data)
            .await
            .map_err(|e| RepositoryError::from_storage(op, schema, e))?;
        if !changed {
            // Deactivated between the read and the write
            return Err(Self::not_found(op, id));
        }

        self.record_audit(
            op,
            performed_by,
            id,
            AuditAction::Update,
            format!("Updated {} {}", schema.display_name, id),
        )
        .await?;

        info!(performed_by = %performed_by, "Updated {}", schema.display_name);
        self.fetch_active(op, id).await
    }

    /// Tombstone an active record and record a `DELETE` audit entry
    #[instrument(skip_all, fields(entity_type = %T::schema().entity_type, entity_id = %id))]
    pub async fn deactivate(
        &self,
        id: &EntityId,
        performed_by: &Actor,
    ) -> RepositoryResult<Deactivated> {
        let op = RepositoryOperation::Deactivate;
        let schema = T::schema();

        let deactivated = self.soft_delete.deactivate::<T, S>(&self.storage, id).await?;

        self.record_audit(
            op,
            performed_by,
            id,
            AuditAction::Delete,
            format!("Deactivated {} {}", schema.display_name, id),
        )
        .await?;

        info!(performed_by = %performed_by, "Deactivated {}", schema.display_name);
        Ok(deactivated)
    }

    /// A page of active records
    #[instrument(skip_all, fields(entity_type = %T::schema().entity_type))]
    pub async fn find_all_paged(&self, request: &PageRequest) -> RepositoryResult<Paginated<Record<T>>> {
        self.list(RepositoryOperation::FindAllPaged, Criteria::active(), request)
            .await
    }

    /// A page of active records whose searchable text fields contain `term`, ignoring case.
    ///
    /// A blank term lists every active record.
    #[instrument(skip_all, fields(entity_type = %T::schema().entity_type, term = %term))]
    pub async fn search(
        &self,
        term: &str,
        request: &PageRequest,
    ) -> RepositoryResult<Paginated<Record<T>>> {
        let op = RepositoryOperation::Search;
        let schema = T::schema();
        let term = term.trim();

        if term.is_empty() {
            return self.list(op, Criteria::active(), request).await;
        }

        let mut fields = schema.searchable_fields().peekable();
        if fields.peek().is_none() {
            return Err(RepositoryError::validation(
                op,
                format!("{} have no searchable fields", schema.plural),
            ));
        }
        let criteria = fields.fold(Criteria::active(), |criteria, field| {
            criteria.or(FilterCondition::contains(field, term))
        });

        self.list(op, criteria, request).await
    }

    /// Same as [`search`](Self::search)
    pub async fn filter(
        &self,
        term: &str,
        request: &PageRequest,
    ) -> RepositoryResult<Paginated<Record<T>>> {
        self.search(term, request).await
    }

    /// A page of active records satisfying every condition.
    ///
    /// Conditions may only name filterable fields.
    #[instrument(skip_all, fields(entity_type = %T::schema().entity_type, conditions = conditions.len()))]
    pub async fn filter_by(
        &self,
        conditions: Vec<FilterCondition>,
        request: &PageRequest,
    ) -> RepositoryResult<Paginated<Record<T>>> {
        let op = RepositoryOperation::FilterBy;
        let schema = T::schema();

        let mut criteria = Criteria::active();
        for mut condition in conditions {
            let def = schema
                .field(&condition.field)
                .filter(|f| f.filterable)
                .ok_or_else(|| {
                    RepositoryError::validation(
                        op,
                        format!("Cannot filter {} by '{}'", schema.plural, condition.field),
                    )
                })?;
            if condition.operator == FilterOperator::Contains && def.kind != FieldKind::Text {
                return Err(RepositoryError::validation(
                    op,
                    format!("{} is not text and cannot be matched by substring", def.name),
                ));
            }
            condition.value = def
                .coerce(condition.value)
                .map_err(|m| RepositoryError::validation(op, m))?;
            criteria = criteria.and(condition);
        }

        self.list(op, criteria, request).await
    }

    /// Whether an active record holds `value` in `field`.
    ///
    /// When a unique rule covers the field, its transform applies to both sides.
    #[instrument(skip_all, fields(entity_type = %T::schema().entity_type, field = %field))]
    pub async fn exists_by_field(
        &self,
        field: &str,
        value: impl Into<FieldValue>,
    ) -> RepositoryResult<bool> {
        let op = RepositoryOperation::ExistsByField;
        let schema = T::schema();

        let Some(def) = schema.field(field) else {
            return Err(RepositoryError::validation(
                op,
                format!("{} have no field '{}'", schema.plural, field),
            ));
        };
        let value = def
            .coerce(value.into())
            .map_err(|m| RepositoryError::validation(op, m))?;

        let transform = schema.rule_for_field(field).and_then(|r| r.transform);
        let value = match &transform {
            Some(t) => t.normalize(value),
            None => value,
        };
        let criteria = Criteria::active()
            .and(FilterCondition::eq(field, value).with_transform(transform));

        let found = self
            .storage
            .find_one(&criteria)
            .await
            .map_err(|e| RepositoryError::from_storage(op, schema, e))?;
        Ok(found.is_some())
    }

    /// Number of active records
    #[instrument(skip_all, fields(entity_type = %T::schema().entity_type))]
    pub async fn count(&self) -> RepositoryResult<u64> {
        let op = RepositoryOperation::Count;
        self.storage
            .count(&Criteria::active())
            .await
            .map_err(|e| RepositoryError::from_storage(op, T::schema(), e))
    }

    async fn fetch_active(
        &self,
        op: RepositoryOperation,
        id: &EntityId,
    ) -> RepositoryResult<Record<T>> {
        self.storage
            .find_one(&Criteria::active().with_id(id.clone()))
            .await
            .map_err(|e| RepositoryError::from_storage(op, T::schema(), e))?
            .ok_or_else(|| Self::not_found(op, id))
    }

    async fn list(
        &self,
        op: RepositoryOperation,
        criteria: Criteria,
        request: &PageRequest,
    ) -> RepositoryResult<Paginated<Record<T>>> {
        let schema = T::schema();
        let window = self
            .pagination
            .paginate(request, schema)
            .map_err(|e| e.with_operation(op))?;

        let (data, total) = self
            .storage
            .find_many(&criteria, &window.order, window.offset, window.fetch_limit())
            .await
            .map_err(|e| RepositoryError::from_storage(op, schema, e))?;
        let meta = self.pagination.build_meta(total, &window);

        debug!(
            total = meta.total,
            page = meta.page,
            returned = data.len(),
            "Listed {}",
            schema.plural
        );
        Ok(Paginated { data, meta })
    }

    async fn record_audit(
        &self,
        op: RepositoryOperation,
        performed_by: &Actor,
        id: &EntityId,
        action: AuditAction,
        detail: String,
    ) -> RepositoryResult<()> {
        let schema = T::schema();
        let entry = AuditEntry::new(
            performed_by.clone(),
            id.as_str(),
            action,
            detail,
            schema.entity_type.as_str(),
        );
        self.audit.record(entry).await.map_err(|e| {
            RepositoryError::internal(op, schema, e).with_entity(&schema.entity_type, id.as_str())
        })
    }

    fn not_found(op: RepositoryOperation, id: &EntityId) -> RepositoryError {
        RepositoryError::not_found(&T::schema().entity_type, id.as_str()).with_operation(op)
    }
}
