//! In-memory storage backend
//!
//! Records live in a map behind a `tokio` `RwLock`. Unique rules from the resource schema are
//! checked under the write lock, so two racing writers cannot both store the same key.

use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::marker::PhantomData;
use tokio::sync::RwLock;

use super::{Criteria, Storage, StorageError, StorageOperation, StorageResult};
use crate::ids::EntityId;
use crate::repository::{OrderBy, Record, Resource, SortOrder};

struct Row<T> {
    seq: u64,
    record: Record<T>,
}

struct State<T> {
    rows: HashMap<EntityId, Row<T>>,
    next_seq: u64,
}

/// In-memory [`Storage`] for one resource type
pub struct MemoryStorage<T> {
    state: RwLock<State<T>>,
    _resource: PhantomData<fn() -> T>,
}

impl<T: Resource> MemoryStorage<T> {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            state: RwLock::new(State {
                rows: HashMap::new(),
                next_seq: 0,
            }),
            _resource: PhantomData,
        }
    }

    /// Number of stored records, tombstoned ones included
    pub async fn len(&self) -> usize {
        self.state.read().await.rows.len()
    }

    /// Whether nothing has been stored
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn check_unique(
        state: &State<T>,
        operation: StorageOperation,
        candidate: &T,
        exclude: Option<&EntityId>,
    ) -> StorageResult<()> {
        let schema = T::schema();
        for rule in &schema.unique {
            let taken = state.rows.values().any(|row| {
                row.record.is_active()
                    && Some(&row.record.id) != exclude
                    && rule.collides(candidate, &row.record.data)
            });
            if taken {
                return Err(StorageError::unique_violation(
                    operation,
                    rule.constraint_name(&schema.table),
                ));
            }
        }
        Ok(())
    }
}

impl<T: Resource> Default for MemoryStorage<T> {
    fn default() -> Self {
        Self::new()
    }
}

fn compare_rows<T: Resource>(a: &Row<T>, b: &Row<T>, order: &OrderBy) -> Ordering {
    let by_field = match (a.record.value(&order.field), b.record.value(&order.field)) {
        (Some(x), Some(y)) => x.compare(&y),
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    let ordering = by_field.then(a.seq.cmp(&b.seq));
    match order.order {
        SortOrder::Asc => ordering,
        SortOrder::Desc => ordering.reverse(),
    }
}

impl<T: Resource> Storage<T> for MemoryStorage<T> {
    async fn create(&self, id: EntityId, data: T) -> StorageResult<Record<T>> {
        let mut state = self.state.write().await;
        Self::check_unique(&state, StorageOperation::Create, &data, None)?;

        let now = Utc::now();
        let record = Record {
            id: id.clone(),
            data,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        let seq = state.next_seq;
        state.next_seq += 1;
        state.rows.insert(
            id,
            Row {
                seq,
                record: record.clone(),
            },
        );
        Ok(record)
    }

    async fn find_one(&self, criteria: &Criteria) -> StorageResult<Option<Record<T>>> {
        let state = self.state.read().await;
        Ok(state
            .rows
            .values()
            .filter(|row| criteria.matches(&row.record))
            .min_by_key(|row| row.seq)
            .map(|row| row.record.clone()))
    }

    async fn find_many(
        &self,
        criteria: &Criteria,
        order: &OrderBy,
        offset: u64,
        limit: Option<u64>,
    ) -> StorageResult<(Vec<Record<T>>, u64)> {
        let state = self.state.read().await;
        let mut matching: Vec<&Row<T>> = state
            .rows
            .values()
            .filter(|row| criteria.matches(&row.record))
            .collect();
        matching.sort_by(|a, b| compare_rows(a, b, order));

        let total = matching.len() as u64;
        let page = matching
            .into_iter()
            .skip(usize::try_from(offset).unwrap_or(usize::MAX))
            .take(limit.map_or(usize::MAX, |l| usize::try_from(l).unwrap_or(usize::MAX)))
            .map(|row| row.record.clone())
            .collect();
        Ok((page, total))
    }

    async fn update(&self, id: &EntityId, data: T) -> StorageResult<bool> {
        let mut state = self.state.write().await;
        if !state.rows.get(id).is_some_and(|row| row.record.is_active()) {
            return Ok(false);
        }
        Self::check_unique(&state, StorageOperation::Update, &data, Some(id))?;

        let Some(row) = state.rows.get_mut(id) else {
            return Ok(false);
        };
        row.record.data = data;
        row.record.updated_at = Utc::now().max(row.record.updated_at);
        Ok(true)
    }

    async fn mark_deleted(&self, id: &EntityId, at: DateTime<Utc>) -> StorageResult<bool> {
        let mut state = self.state.write().await;
        match state.rows.get_mut(id) {
            Some(row) if row.record.is_active() => {
                row.record.deleted_at = Some(at);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn count(&self, criteria: &Criteria) -> StorageResult<u64> {
        let state = self.state.read().await;
        Ok(state
            .rows
            .values()
            .filter(|row| criteria.matches(&row.record))
            .count() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Genre, GENRE_PREFIX};
    use crate::storage::{FilterCondition, StorageErrorKind};

    fn genre(name: &str) -> Genre {
        Genre::new(name)
    }

    fn by(field: &str, order: SortOrder) -> OrderBy {
        OrderBy {
            field: field.to_string(),
            order,
        }
    }

    async fn seeded(names: &[&str]) -> MemoryStorage<Genre> {
        let storage = MemoryStorage::new();
        for name in names {
            storage
                .create(EntityId::generate(GENRE_PREFIX), genre(name))
                .await
                .unwrap();
        }
        storage
    }

    #[tokio::test]
    async fn test_create_stamps_timestamps() {
        let storage = MemoryStorage::new();
        let record = storage
            .create(EntityId::generate(GENRE_PREFIX), genre("Fiction"))
            .await
            .unwrap();
        assert_eq!(record.created_at, record.updated_at);
        assert!(record.is_active());
        assert_eq!(storage.len().await, 1);
    }

    #[tokio::test]
    async fn test_unique_index_enforced_under_lock() {
        let storage = seeded(&["Fiction"]).await;
        let err = storage
            .create(EntityId::generate(GENRE_PREFIX), genre("  FICTION "))
            .await
            .unwrap_err();
        assert_eq!(err.kind, StorageErrorKind::UniqueViolation);
        assert_eq!(err.constraint.as_deref(), Some("genres_name_key"));
    }

    #[tokio::test]
    async fn test_tombstoned_rows_release_unique_key() {
        let storage = MemoryStorage::new();
        let first = storage
            .create(EntityId::generate(GENRE_PREFIX), genre("Fiction"))
            .await
            .unwrap();
        assert!(storage.mark_deleted(&first.id, Utc::now()).await.unwrap());
        assert!(storage
            .create(EntityId::generate(GENRE_PREFIX), genre("Fiction"))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_mark_deleted_only_once() {
        let storage = seeded(&[]).await;
        let record = storage
            .create(EntityId::generate(GENRE_PREFIX), genre("Poetry"))
            .await
            .unwrap();
        assert!(storage.mark_deleted(&record.id, Utc::now()).await.unwrap());
        assert!(!storage.mark_deleted(&record.id, Utc::now()).await.unwrap());
        assert!(!storage
            .mark_deleted(&EntityId::generate(GENRE_PREFIX), Utc::now())
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_update_skips_tombstoned() {
        let storage = seeded(&[]).await;
        let record = storage
            .create(EntityId::generate(GENRE_PREFIX), genre("Poetry"))
            .await
            .unwrap();
        storage.mark_deleted(&record.id, Utc::now()).await.unwrap();
        assert!(!storage.update(&record.id, genre("Verse")).await.unwrap());
    }

    #[tokio::test]
    async fn test_update_keeps_updated_at_monotonic() {
        let storage = seeded(&[]).await;
        let record = storage
            .create(EntityId::generate(GENRE_PREFIX), genre("Poetry"))
            .await
            .unwrap();
        assert!(storage.update(&record.id, genre("Verse")).await.unwrap());

        let stored = storage
            .find_one(&Criteria::active().with_id(record.id.clone()))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.data.name, "Verse");
        assert!(stored.updated_at >= record.updated_at);
        assert_eq!(stored.created_at, record.created_at);
    }

    #[tokio::test]
    async fn test_update_excludes_self_from_unique_check() {
        let storage = seeded(&["Drama"]).await;
        let record = storage
            .find_one(&Criteria::active())
            .await
            .unwrap()
            .unwrap();
        assert!(storage.update(&record.id, genre("drama")).await.unwrap());
    }

    #[tokio::test]
    async fn test_find_many_orders_and_slices() {
        let storage = seeded(&["Crime", "Adventure", "Biography", "Drama", "Epic"]).await;

        let (page, total) = storage
            .find_many(&Criteria::active(), &by("name", SortOrder::Asc), 1, Some(2))
            .await
            .unwrap();
        assert_eq!(total, 5);
        let names: Vec<_> = page.iter().map(|r| r.data.name.as_str()).collect();
        assert_eq!(names, vec!["Biography", "Crime"]);

        // createdAt ties break by insertion order
        let (page, _) = storage
            .find_many(&Criteria::active(), &by("createdAt", SortOrder::Desc), 0, None)
            .await
            .unwrap();
        let names: Vec<_> = page.iter().map(|r| r.data.name.as_str()).collect();
        assert_eq!(names, vec!["Epic", "Drama", "Biography", "Adventure", "Crime"]);
    }

    #[tokio::test]
    async fn test_count_respects_criteria() {
        let storage = seeded(&["Crime", "Crime Fiction", "Drama"]).await;
        let criteria = Criteria::active().and(FilterCondition::contains("name", "crime"));
        assert_eq!(storage.count(&criteria).await.unwrap(), 2);
        assert_eq!(storage.count(&Criteria::active()).await.unwrap(), 3);
    }
}
