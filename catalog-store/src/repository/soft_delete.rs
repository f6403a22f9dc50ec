//! Soft delete
//!
//! Deactivation sets a tombstone timestamp instead of removing the row. Tombstoned records
//! disappear from every default read path but stay addressable by id in the audit trail.
//! There is no undelete.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::error::{RepositoryError, RepositoryOperation, RepositoryResult};
use super::model::Resource;
use crate::ids::EntityId;
use crate::storage::Storage;

/// Result of a successful deactivation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deactivated {
    /// Id of the tombstoned record
    pub id: EntityId,
}

/// Tombstones records through the storage collaborator
#[derive(Debug, Clone, Copy, Default)]
pub struct SoftDeleteManager;

impl SoftDeleteManager {
    /// Tombstone an active record.
    ///
    /// Fails with `NotFound` when the record does not exist or is already tombstoned,
    /// including when a concurrent deactivation got there first.
    pub async fn deactivate<T, S>(&self, storage: &S, id: &EntityId) -> RepositoryResult<Deactivated>
    where
        T: Resource,
        S: Storage<T>,
    {
        let schema = T::schema();
        let changed = storage
            .mark_deleted(id, Utc::now())
            .await
            .map_err(|e| RepositoryError::from_storage(RepositoryOperation::Deactivate, schema, e))?;

        if !changed {
            return Err(RepositoryError::not_found(&schema.entity_type, id.as_str())
                .with_operation(RepositoryOperation::Deactivate));
        }

        Ok(Deactivated { id: id.clone() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Genre, GENRE_PREFIX};
    use crate::storage::{Criteria, MemoryStorage};

    #[tokio::test]
    async fn test_deactivate_hides_record() {
        let storage = MemoryStorage::new();
        let record = storage
            .create(EntityId::generate(GENRE_PREFIX), Genre::new("Fiction"))
            .await
            .unwrap();

        let done = SoftDeleteManager
            .deactivate::<Genre, _>(&storage, &record.id)
            .await
            .unwrap();
        assert_eq!(done.id, record.id);

        let visible = storage
            .find_one(&Criteria::active().with_id(record.id.clone()))
            .await
            .unwrap();
        assert!(visible.is_none());

        let stored = storage
            .find_one(&Criteria::active().with_id(record.id.clone()).including_deleted())
            .await
            .unwrap()
            .unwrap();
        assert!(stored.deleted_at.is_some());
    }

    #[tokio::test]
    async fn test_second_deactivate_is_not_found() {
        let storage = MemoryStorage::new();
        let record = storage
            .create(EntityId::generate(GENRE_PREFIX), Genre::new("Fiction"))
            .await
            .unwrap();

        SoftDeleteManager
            .deactivate::<Genre, _>(&storage, &record.id)
            .await
            .unwrap();
        let err = SoftDeleteManager
            .deactivate::<Genre, _>(&storage, &record.id)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.operation, RepositoryOperation::Deactivate);
    }

    #[tokio::test]
    async fn test_unknown_id_is_not_found() {
        let storage = MemoryStorage::<Genre>::new();
        let err = SoftDeleteManager
            .deactivate::<Genre, _>(&storage, &EntityId::generate(GENRE_PREFIX))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
