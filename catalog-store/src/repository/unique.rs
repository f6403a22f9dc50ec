//! Pre-write uniqueness validation
//!
//! Rules are checked in declaration order against active records; the first rule that finds a
//! conflicting record fails the write with its message. The check is a fast path for a good
//! error message. Storage backends enforce the same rules on the write itself.

use super::error::{RepositoryError, RepositoryOperation, RepositoryResult};
use super::model::{Fields, Record, Resource};
use super::schema::UniqueRule;
use crate::storage::{Criteria, FilterCondition, Storage};

/// Checks a candidate against a resource's unique rules
#[derive(Debug, Clone, Copy, Default)]
pub struct UniqueValidator;

impl UniqueValidator {
    /// Validate `candidate` against every rule.
    ///
    /// On the update path `current` is the stored record: it is excluded from the lookup and
    /// supplies the missing components of composite keys. A rule the candidate does not touch
    /// is skipped.
    pub async fn validate<T, S>(
        &self,
        storage: &S,
        operation: RepositoryOperation,
        candidate: &(dyn Fields + Sync),
        current: Option<&Record<T>>,
    ) -> RepositoryResult<()>
    where
        T: Resource,
        S: Storage<T>,
    {
        let schema = T::schema();
        for rule in &schema.unique {
            let Some(criteria) = Self::lookup_criteria(rule, candidate, current) else {
                continue;
            };

            let existing = storage
                .find_one(&criteria)
                .await
                .map_err(|e| RepositoryError::from_storage(operation, schema, e))?;

            if let Some(existing) = existing {
                tracing::debug!(
                    entity_type = %schema.entity_type,
                    conflicting_id = %existing.id,
                    fields = ?rule.fields,
                    "Unique rule violated"
                );
                return Err(RepositoryError::conflict(operation, rule.message.clone()));
            }
        }
        Ok(())
    }

    fn lookup_criteria<T: Resource>(
        rule: &UniqueRule,
        candidate: &(dyn Fields + Sync),
        current: Option<&Record<T>>,
    ) -> Option<Criteria> {
        let fallback = current.map(|r| &r.data as &dyn Fields);
        let key = rule.key(candidate, fallback)?;

        let criteria = key.into_iter().fold(
            Criteria::active().excluding(current.map(|r| r.id.clone())),
            |criteria, (field, value)| {
                criteria.and(FilterCondition::eq(field, value).with_transform(rule.transform))
            },
        );
        Some(criteria)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Author, AuthorPatch, Genre, GenrePatch, AUTHOR_PREFIX, GENRE_PREFIX};
    use crate::ids::EntityId;
    use crate::storage::MemoryStorage;
    use chrono::Utc;

    async fn genre_store(names: &[&str]) -> (MemoryStorage<Genre>, Vec<Record<Genre>>) {
        let storage = MemoryStorage::new();
        let mut records = Vec::new();
        for name in names {
            records.push(
                storage
                    .create(EntityId::generate(GENRE_PREFIX), Genre::new(*name))
                    .await
                    .unwrap(),
            );
        }
        (storage, records)
    }

    #[tokio::test]
    async fn test_transformed_duplicate_conflicts() {
        let (storage, _) = genre_store(&["Fiction"]).await;
        let err = UniqueValidator
            .validate::<Genre, _>(
                &storage,
                RepositoryOperation::Register,
                &Genre::new(" fiction "),
                None,
            )
            .await
            .unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(err.message, "Genre with this name already exists");
    }

    #[tokio::test]
    async fn test_tombstoned_match_does_not_conflict() {
        let (storage, records) = genre_store(&["Fiction"]).await;
        storage.mark_deleted(&records[0].id, Utc::now()).await.unwrap();
        assert!(UniqueValidator
            .validate::<Genre, _>(
                &storage,
                RepositoryOperation::Register,
                &Genre::new("Fiction"),
                None,
            )
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_update_excludes_self() {
        let (storage, records) = genre_store(&["Fiction", "Poetry"]).await;
        let patch = GenrePatch::default().with_name("FICTION");
        assert!(UniqueValidator
            .validate(
                &storage,
                RepositoryOperation::UpdateProfile,
                &patch,
                Some(&records[0]),
            )
            .await
            .is_ok());

        let err = UniqueValidator
            .validate(
                &storage,
                RepositoryOperation::UpdateProfile,
                &patch,
                Some(&records[1]),
            )
            .await
            .unwrap_err();
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn test_untouched_fields_skip_rules() {
        let (storage, records) = genre_store(&["Fiction", "Poetry"]).await;
        let patch = GenrePatch::default().with_description("Verse and rhyme");
        assert!(UniqueValidator
            .validate(
                &storage,
                RepositoryOperation::UpdateProfile,
                &patch,
                Some(&records[0]),
            )
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_first_failing_rule_wins() {
        let storage = MemoryStorage::new();
        storage
            .create(
                EntityId::generate(AUTHOR_PREFIX),
                Author::new("Ursula", "Le Guin").with_email("ursula@example.com"),
            )
            .await
            .unwrap();

        // Collides on both the email rule and the name rule; email is declared first
        let candidate = Author::new("Ursula", "Le Guin").with_email("URSULA@example.com");
        let err = UniqueValidator
            .validate::<Author, _>(&storage, RepositoryOperation::Register, &candidate, None)
            .await
            .unwrap_err();
        assert_eq!(err.message, "Author with this email already exists");
    }

    #[tokio::test]
    async fn test_composite_key_completed_from_current() {
        let storage = MemoryStorage::new();
        let ursula = storage
            .create(EntityId::generate(AUTHOR_PREFIX), Author::new("Ursula", "Le Guin"))
            .await
            .unwrap();
        let other = storage
            .create(EntityId::generate(AUTHOR_PREFIX), Author::new("Ursula", "Vernon"))
            .await
            .unwrap();

        // Renaming "Ursula Vernon" to "Ursula Le Guin" by patching only the last name
        let patch = AuthorPatch::default().with_last_name("Le Guin");
        let err = UniqueValidator
            .validate(&storage, RepositoryOperation::UpdateProfile, &patch, Some(&other))
            .await
            .unwrap_err();
        assert_eq!(err.message, "Author with this name already exists");

        // The same patch on the record that already holds the name is fine
        assert!(UniqueValidator
            .validate(&storage, RepositoryOperation::UpdateProfile, &patch, Some(&ursula))
            .await
            .is_ok());
    }
}
