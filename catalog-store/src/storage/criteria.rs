//! Selection criteria passed to storage backends
//!
//! # Example
//!
//! ```rust
//! use catalog_store::storage::{Criteria, FilterCondition};
//!
//! // Active records whose name or description contains "myth" (case-insensitive)
//! let criteria = Criteria::active()
//!     .or(FilterCondition::contains("name", "myth"))
//!     .or(FilterCondition::contains("description", "myth"));
//! ```

use std::fmt;

use crate::ids::EntityId;
use crate::repository::{FieldValue, Fields, Record, Transform};

/// Comparison operators for filter conditions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOperator {
    /// Equal to (=)
    Equal,
    /// Not equal to (!=)
    NotEqual,
    /// Case-insensitive substring match (ILIKE '%value%')
    Contains,
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Equal => write!(f, "="),
            Self::NotEqual => write!(f, "!="),
            Self::Contains => write!(f, "ILIKE"),
        }
    }
}

/// A single condition on a business field
#[derive(Debug, Clone)]
pub struct FilterCondition {
    /// Field name
    pub field: String,
    /// Comparison operator
    pub operator: FilterOperator,
    /// Value to compare against
    pub value: FieldValue,
    /// Normalisation applied to the stored value before comparing
    pub transform: Option<Transform>,
}

impl FilterCondition {
    /// Create a new filter condition
    pub fn new(
        field: impl Into<String>,
        operator: FilterOperator,
        value: impl Into<FieldValue>,
    ) -> Self {
        Self {
            field: field.into(),
            operator,
            value: value.into(),
            transform: None,
        }
    }

    /// Create an equality condition
    pub fn eq(field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self::new(field, FilterOperator::Equal, value)
    }

    /// Create a not-equal condition
    pub fn ne(field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self::new(field, FilterOperator::NotEqual, value)
    }

    /// Create a case-insensitive substring condition
    pub fn contains(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(field, FilterOperator::Contains, FieldValue::Text(value.into()))
    }

    /// Normalise the stored value with `transform` before comparing
    #[must_use]
    pub fn with_transform(mut self, transform: Option<Transform>) -> Self {
        self.transform = transform;
        self
    }

    /// Evaluate against a stored value
    pub fn matches(&self, stored: Option<FieldValue>) -> bool {
        let stored = match (stored, &self.transform) {
            (Some(v), Some(t)) => Some(t.normalize(v)),
            (v, _) => v,
        };
        match self.operator {
            FilterOperator::Equal => stored.as_ref() == Some(&self.value),
            FilterOperator::NotEqual => stored.as_ref() != Some(&self.value),
            FilterOperator::Contains => match (stored, self.value.as_text()) {
                (Some(FieldValue::Text(s)), Some(needle)) => {
                    s.to_lowercase().contains(&needle.to_lowercase())
                }
                _ => false,
            },
        }
    }
}

/// Which records are visible to a query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visibility {
    /// Only records without a tombstone
    #[default]
    Active,
    /// Every record, tombstoned or not
    All,
}

/// Record selection: id constraints, conditions and visibility.
///
/// A record matches when it satisfies the id constraints, every `all` condition, and (when
/// `any` is non-empty) at least one `any` condition.
#[derive(Debug, Clone, Default)]
pub struct Criteria {
    /// Only the record with this id
    pub id: Option<EntityId>,
    /// Never the record with this id
    pub exclude_id: Option<EntityId>,
    /// Conditions that must all hold
    pub all: Vec<FilterCondition>,
    /// Conditions of which at least one must hold
    pub any: Vec<FilterCondition>,
    /// Tombstone visibility
    pub visibility: Visibility,
}

impl Criteria {
    /// Every active record
    #[must_use]
    pub fn active() -> Self {
        Self::default()
    }

    /// Restrict to one id
    #[must_use]
    pub fn with_id(mut self, id: EntityId) -> Self {
        self.id = Some(id);
        self
    }

    /// Exclude one id
    #[must_use]
    pub fn excluding(mut self, id: Option<EntityId>) -> Self {
        self.exclude_id = id;
        self
    }

    /// Add a condition that must hold
    #[must_use]
    pub fn and(mut self, condition: FilterCondition) -> Self {
        self.all.push(condition);
        self
    }

    /// Add an alternative condition
    #[must_use]
    pub fn or(mut self, condition: FilterCondition) -> Self {
        self.any.push(condition);
        self
    }

    /// Include tombstoned records
    #[must_use]
    pub fn including_deleted(mut self) -> Self {
        self.visibility = Visibility::All;
        self
    }

    /// Evaluate against a record
    pub fn matches<T: Fields>(&self, record: &Record<T>) -> bool {
        if self.visibility == Visibility::Active && !record.is_active() {
            return false;
        }
        if self.id.as_ref().is_some_and(|id| *id != record.id) {
            return false;
        }
        if self.exclude_id.as_ref().is_some_and(|id| *id == record.id) {
            return false;
        }
        self.all.iter().all(|c| c.matches(record.value(&c.field)))
            && (self.any.is_empty() || self.any.iter().any(|c| c.matches(record.value(&c.field))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct Book {
        title: String,
        year: i64,
    }

    impl Fields for Book {
        fn field(&self, name: &str) -> Option<FieldValue> {
            match name {
                "title" => Some(self.title.as_str().into()),
                "year" => Some(self.year.into()),
                _ => None,
            }
        }
    }

    fn book(title: &str, year: i64) -> Record<Book> {
        let now = Utc::now();
        Record {
            id: EntityId::generate("book"),
            data: Book {
                title: title.to_string(),
                year,
            },
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    #[test]
    fn test_contains_is_case_insensitive() {
        let cond = FilterCondition::contains("title", "DUNE");
        assert!(cond.matches(Some("Children of Dune".into())));
        assert!(!cond.matches(Some("Foundation".into())));
        assert!(!cond.matches(None));
        assert!(!cond.matches(Some(1965_i64.into())));
    }

    #[test]
    fn test_equal_with_transform() {
        let cond = FilterCondition::eq("title", "dune").with_transform(Some(Transform::TrimLowercase));
        assert!(cond.matches(Some("  Dune ".into())));
        assert!(!FilterCondition::eq("title", "dune").matches(Some("Dune".into())));
    }

    #[test]
    fn test_active_hides_tombstoned() {
        let mut record = book("Dune", 1965);
        assert!(Criteria::active().matches(&record));
        record.deleted_at = Some(Utc::now());
        assert!(!Criteria::active().matches(&record));
        assert!(Criteria::active().including_deleted().matches(&record));
    }

    #[test]
    fn test_id_constraints() {
        let record = book("Dune", 1965);
        assert!(Criteria::active().with_id(record.id.clone()).matches(&record));
        assert!(!Criteria::active()
            .excluding(Some(record.id.clone()))
            .matches(&record));
        assert!(!Criteria::active()
            .with_id(EntityId::generate("book"))
            .matches(&record));
    }

    #[test]
    fn test_all_and_any_groups() {
        let record = book("Dune", 1965);
        let criteria = Criteria::active()
            .and(FilterCondition::eq("year", 1965_i64))
            .or(FilterCondition::contains("title", "foundation"))
            .or(FilterCondition::contains("title", "dun"));
        assert!(criteria.matches(&record));

        let criteria = Criteria::active()
            .and(FilterCondition::ne("year", 1965_i64))
            .or(FilterCondition::contains("title", "dun"));
        assert!(!criteria.matches(&record));
    }
}
