//! Repository error types
//!
//! Every repository operation fails with a [`RepositoryError`] of one of four kinds. Domain
//! errors (`NotFound`, `Conflict`, `ValidationFailed`) carry a caller-facing message. Anything
//! else is normalised to `Internal` with a fixed per-operation message; the underlying cause is
//! kept in [`RepositoryError::cause`] and never shown by `Display`.
//!
//! # Example
//!
//! ```rust
//! use catalog_store::repository::{RepositoryError, RepositoryErrorKind};
//!
//! let error = RepositoryError::not_found("Genre", "genre_01h455vb4pex5vsknk084sn02q");
//! assert!(matches!(error.kind, RepositoryErrorKind::NotFound));
//! assert!(error.entity_id.is_some());
//! ```

use std::fmt;

use super::schema::Schema;
use crate::storage::StorageError;

/// Repository operation being performed when the error occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RepositoryOperation {
    /// Creating a new record
    Register,
    /// Fetching one active record
    FindById,
    /// Applying a patch
    UpdateProfile,
    /// Soft deleting a record
    Deactivate,
    /// Listing a page of records
    FindAllPaged,
    /// Free-text search
    Search,
    /// Structured filtering
    FilterBy,
    /// Checking whether a value is taken
    ExistsByField,
    /// Counting active records
    Count,
}

impl RepositoryOperation {
    /// Fixed message used when an unexpected failure is normalised to `Internal`
    pub fn fallback_message(&self, schema: &Schema) -> String {
        let (verb, noun) = match self {
            Self::Register => ("register", &schema.display_name),
            Self::FindById => ("fetch", &schema.display_name),
            Self::UpdateProfile => ("update", &schema.display_name),
            Self::Deactivate => ("deactivate", &schema.display_name),
            Self::FindAllPaged => ("list", &schema.plural),
            Self::Search => ("search", &schema.plural),
            Self::FilterBy => ("filter", &schema.plural),
            Self::ExistsByField => ("check existence of", &schema.display_name),
            Self::Count => ("count", &schema.plural),
        };
        format!("Failed to {} {}", verb, noun)
    }
}

impl fmt::Display for RepositoryOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Register => write!(f, "register"),
            Self::FindById => write!(f, "find_by_id"),
            Self::UpdateProfile => write!(f, "update_profile"),
            Self::Deactivate => write!(f, "deactivate"),
            Self::FindAllPaged => write!(f, "find_all_paged"),
            Self::Search => write!(f, "search"),
            Self::FilterBy => write!(f, "filter_by"),
            Self::ExistsByField => write!(f, "exists_by_field"),
            Self::Count => write!(f, "count"),
        }
    }
}

/// Category of repository error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RepositoryErrorKind {
    /// No active record with the given id
    NotFound,
    /// A uniqueness rule rejected the write
    Conflict,
    /// Input was rejected before storage was touched
    ValidationFailed,
    /// Unexpected failure; see `cause`
    Internal,
}

impl fmt::Display for RepositoryErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "not_found"),
            Self::Conflict => write!(f, "conflict"),
            Self::ValidationFailed => write!(f, "validation_failed"),
            Self::Internal => write!(f, "internal"),
        }
    }
}

/// Structured repository error with operation context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryError {
    /// The operation being performed when the error occurred
    pub operation: RepositoryOperation,
    /// The category of error
    pub kind: RepositoryErrorKind,
    /// Caller-facing message
    pub message: String,
    /// The type of entity involved (e.g., "Genre")
    pub entity_type: Option<String>,
    /// The ID of the entity involved
    pub entity_id: Option<String>,
    /// Underlying cause of an internal error. Not part of `Display`.
    pub cause: Option<String>,
}

impl RepositoryError {
    /// Create a new repository error
    pub fn new(
        operation: RepositoryOperation,
        kind: RepositoryErrorKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            operation,
            kind,
            message: message.into(),
            entity_type: None,
            entity_id: None,
            cause: None,
        }
    }

    /// Create a "not found" error with entity context
    pub fn not_found(entity_type: impl Into<String>, entity_id: impl Into<String>) -> Self {
        let entity_type = entity_type.into();
        let message = format!("{} not found", entity_type);
        Self::new(
            RepositoryOperation::FindById,
            RepositoryErrorKind::NotFound,
            message,
        )
        .with_entity(entity_type, entity_id)
    }

    /// Create a conflict error carrying a rule's message
    pub fn conflict(operation: RepositoryOperation, message: impl Into<String>) -> Self {
        Self::new(operation, RepositoryErrorKind::Conflict, message)
    }

    /// Create a validation error
    pub fn validation(operation: RepositoryOperation, message: impl Into<String>) -> Self {
        Self::new(operation, RepositoryErrorKind::ValidationFailed, message)
    }

    /// Create an internal error with the operation's fallback message
    pub fn internal(
        operation: RepositoryOperation,
        schema: &Schema,
        cause: impl fmt::Display,
    ) -> Self {
        let error = Self::new(
            operation,
            RepositoryErrorKind::Internal,
            operation.fallback_message(schema),
        );
        tracing::error!(
            operation = %operation,
            entity_type = %schema.entity_type,
            cause = %cause,
            "{}",
            error.message
        );
        Self {
            entity_type: Some(schema.entity_type.clone()),
            cause: Some(cause.to_string()),
            ..error
        }
    }

    /// Normalise a storage failure.
    ///
    /// A unique violation becomes a conflict carrying the message of the rule whose index fired
    /// (the first rule's message when the index is unknown). Everything else is internal.
    pub fn from_storage(operation: RepositoryOperation, schema: &Schema, err: StorageError) -> Self {
        if err.is_unique_violation() {
            let rule = err
                .constraint
                .as_deref()
                .and_then(|c| schema.rule_for_constraint(c))
                .or_else(|| schema.unique.first());
            if let Some(rule) = rule {
                return Self::conflict(operation, rule.message.clone());
            }
        }
        Self::internal(operation, schema, err)
    }

    /// Attach the entity type and id
    #[must_use]
    pub fn with_entity(
        mut self,
        entity_type: impl Into<String>,
        entity_id: impl Into<String>,
    ) -> Self {
        self.entity_type = Some(entity_type.into());
        self.entity_id = Some(entity_id.into());
        self
    }

    /// Re-tag the error with the operation that observed it
    #[must_use]
    pub fn with_operation(mut self, operation: RepositoryOperation) -> Self {
        self.operation = operation;
        self
    }

    /// Check if this is a not found error
    pub fn is_not_found(&self) -> bool {
        self.kind == RepositoryErrorKind::NotFound
    }

    /// Check if this is a conflict error
    pub fn is_conflict(&self) -> bool {
        self.kind == RepositoryErrorKind::Conflict
    }

    /// Check if this is a validation error
    pub fn is_validation(&self) -> bool {
        self.kind == RepositoryErrorKind::ValidationFailed
    }

    /// Check if this is an internal error
    pub fn is_internal(&self) -> bool {
        self.kind == RepositoryErrorKind::Internal
    }
}

impl fmt::Display for RepositoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Repository {} error during {}: {}",
            self.kind, self.operation, self.message
        )?;
        if let (Some(entity_type), Some(entity_id)) = (&self.entity_type, &self.entity_id)
        {
            write!(f, " [{}: {}]", entity_type, entity_id)?;
        }
        Ok(())
    }
}

impl std::error::Error for RepositoryError {}

/// Result type for repository operations
pub type RepositoryResult<T> = Result<T, RepositoryError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{Transform, UniqueRule};
    use crate::storage::StorageOperation;

    fn schema() -> Schema {
        Schema::new("Genre", "genre")
            .with_unique(
                UniqueRule::new("name", "Genre with this name already exists")
                    .with_transform(Transform::TrimLowercase),
            )
            .with_unique(UniqueRule::new("slug", "Genre slug already exists"))
    }

    #[test]
    fn test_fallback_messages() {
        let schema = schema();
        assert_eq!(
            RepositoryOperation::Register.fallback_message(&schema),
            "Failed to register genre"
        );
        assert_eq!(
            RepositoryOperation::FindAllPaged.fallback_message(&schema),
            "Failed to list genres"
        );
        assert_eq!(
            RepositoryOperation::Deactivate.fallback_message(&schema),
            "Failed to deactivate genre"
        );
    }

    #[test]
    fn test_internal_hides_cause() {
        let err = RepositoryError::internal(
            RepositoryOperation::Register,
            &schema(),
            "connection reset by peer",
        );
        assert!(err.is_internal());
        assert_eq!(err.message, "Failed to register genre");
        assert_eq!(err.cause.as_deref(), Some("connection reset by peer"));
        assert!(!err.to_string().contains("connection reset"));
    }

    #[test]
    fn test_unique_violation_maps_to_matching_rule() {
        let schema = schema();
        let err = RepositoryError::from_storage(
            RepositoryOperation::Register,
            &schema,
            StorageError::unique_violation(StorageOperation::Create, "genres_slug_key"),
        );
        assert!(err.is_conflict());
        assert_eq!(err.message, "Genre slug already exists");
    }

    #[test]
    fn test_unknown_constraint_uses_first_rule() {
        let err = RepositoryError::from_storage(
            RepositoryOperation::Register,
            &schema(),
            StorageError::unique_violation(StorageOperation::Create, "mystery_key"),
        );
        assert_eq!(err.message, "Genre with this name already exists");
    }

    #[test]
    fn test_other_storage_errors_are_internal() {
        let err = RepositoryError::from_storage(
            RepositoryOperation::Count,
            &schema(),
            StorageError::query_failed(StorageOperation::Count, "syntax error"),
        );
        assert!(err.is_internal());
        assert_eq!(err.message, "Failed to count genres");
    }

    #[test]
    fn test_not_found_display() {
        let err = RepositoryError::not_found("Genre", "genre_123");
        assert_eq!(
            err.to_string(),
            "Repository not_found error during find_by_id: Genre not found [Genre: genre_123]"
        );
    }
}
