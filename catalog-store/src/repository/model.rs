//! Record model shared by every resource
//!
//! Business structs stay plain data. The layer reaches into them only through the [`Fields`]
//! trait, which returns a [`FieldValue`] for a field name. A [`Resource`] ties a business struct
//! to its patch type and its [`Schema`](super::Schema). Stored rows are [`Record`]s: the
//! business data plus the storage-managed id and timestamps.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

use super::schema::Schema;
use crate::ids::EntityId;

/// Name of the id metadata field
pub const ID_FIELD: &str = "id";
/// Name of the creation timestamp metadata field
pub const CREATED_AT_FIELD: &str = "createdAt";
/// Name of the last-update timestamp metadata field
pub const UPDATED_AT_FIELD: &str = "updatedAt";

/// A single field value, as seen by uniqueness checks, filters and sorting
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Text value
    Text(String),
    /// Integer value
    Integer(i64),
    /// Boolean value
    Boolean(bool),
    /// Timestamp value
    Timestamp(DateTime<Utc>),
}

impl FieldValue {
    /// Returns the text content, if this is a text value
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Textual form used when comparing against stored JSON text
    pub fn to_storage_text(&self) -> String {
        match self {
            Self::Text(s) => s.clone(),
            Self::Integer(i) => i.to_string(),
            Self::Boolean(b) => b.to_string(),
            Self::Timestamp(t) => t.to_rfc3339(),
        }
    }

    /// Orders two values of the same variant. Mixed variants compare equal.
    pub fn compare(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
            (Self::Integer(a), Self::Integer(b)) => a.cmp(b),
            (Self::Boolean(a), Self::Boolean(b)) => a.cmp(b),
            (Self::Timestamp(a), Self::Timestamp(b)) => a.cmp(b),
            _ => Ordering::Equal,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_storage_text())
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<i64> for FieldValue {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

impl From<i32> for FieldValue {
    fn from(i: i32) -> Self {
        Self::Integer(i64::from(i))
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(t: DateTime<Utc>) -> Self {
        Self::Timestamp(t)
    }
}

/// Named field access over a business struct or its patch.
///
/// Returns `None` when the field is absent (unset optional, or not part of a patch).
pub trait Fields {
    /// Look up a field by its external (camelCase) name
    fn field(&self, name: &str) -> Option<FieldValue>;
}

/// A catalog resource managed by the generic repository.
///
/// # Example
///
/// ```rust
/// use catalog_store::repository::{FieldDef, FieldValue, Fields, Resource, Schema};
/// use once_cell::sync::Lazy;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Debug, Clone, Serialize, Deserialize)]
/// struct Shelf {
///     label: String,
/// }
///
/// #[derive(Debug, Default)]
/// struct ShelfPatch {
///     label: Option<String>,
/// }
///
/// impl Fields for Shelf {
///     fn field(&self, name: &str) -> Option<FieldValue> {
///         match name {
///             "label" => Some(self.label.clone().into()),
///             _ => None,
///         }
///     }
/// }
///
/// impl Fields for ShelfPatch {
///     fn field(&self, name: &str) -> Option<FieldValue> {
///         match name {
///             "label" => self.label.clone().map(Into::into),
///             _ => None,
///         }
///     }
/// }
///
/// static SHELF_SCHEMA: Lazy<Schema> = Lazy::new(|| {
///     Schema::new("Shelf", "shelf").with_field(FieldDef::text("label").required())
/// });
///
/// impl Resource for Shelf {
///     type Patch = ShelfPatch;
///
///     fn schema() -> &'static Schema {
///         &SHELF_SCHEMA
///     }
///
///     fn apply_patch(&mut self, patch: ShelfPatch) {
///         if let Some(label) = patch.label {
///             self.label = label;
///         }
///     }
/// }
/// ```
pub trait Resource: Fields + Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Partial update payload
    type Patch: Fields + Send + Sync;

    /// The resource's schema
    fn schema() -> &'static Schema;

    /// Apply the present fields of a patch to this value
    fn apply_patch(&mut self, patch: Self::Patch);
}

/// A stored entity: business data plus storage-managed metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record<T> {
    /// Opaque, immutable identifier
    pub id: EntityId,
    /// Business fields
    #[serde(flatten)]
    pub data: T,
    /// When the record was created
    pub created_at: DateTime<Utc>,
    /// When the record was last written
    pub updated_at: DateTime<Utc>,
    /// Tombstone timestamp; set once the record is deactivated
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl<T> Record<T> {
    /// Whether the record has not been tombstoned
    pub fn is_active(&self) -> bool {
        self.deleted_at.is_none()
    }
}

impl<T: Fields> Record<T> {
    /// Look up a metadata or business field by name
    pub fn value(&self, name: &str) -> Option<FieldValue> {
        match name {
            ID_FIELD => Some(FieldValue::Text(self.id.to_string())),
            CREATED_AT_FIELD => Some(FieldValue::Timestamp(self.created_at)),
            UPDATED_AT_FIELD => Some(FieldValue::Timestamp(self.updated_at)),
            _ => self.data.field(name),
        }
    }
}

impl<T: Fields> Fields for Record<T> {
    fn field(&self, name: &str) -> Option<FieldValue> {
        self.value(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Tag {
        label: String,
    }

    impl Fields for Tag {
        fn field(&self, name: &str) -> Option<FieldValue> {
            match name {
                "label" => Some(self.label.as_str().into()),
                _ => None,
            }
        }
    }

    fn tag_record() -> Record<Tag> {
        let now = Utc::now();
        Record {
            id: EntityId::generate("tag"),
            data: Tag {
                label: "classic".to_string(),
            },
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    #[test]
    fn test_value_reads_metadata_and_data() {
        let record = tag_record();
        assert_eq!(
            record.value("label"),
            Some(FieldValue::Text("classic".to_string()))
        );
        assert_eq!(
            record.value(CREATED_AT_FIELD),
            Some(FieldValue::Timestamp(record.created_at))
        );
        assert_eq!(
            record.value(ID_FIELD),
            Some(FieldValue::Text(record.id.to_string()))
        );
        assert_eq!(record.value("missing"), None);
    }

    #[test]
    fn test_record_serializes_flat_camel_case() {
        let record = tag_record();
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["label"], "classic");
        assert!(json.get("createdAt").is_some());
        assert!(json.get("updatedAt").is_some());
        assert!(json.get("deletedAt").is_none());
        assert_eq!(json["id"], record.id.as_str());
    }

    #[test]
    fn test_compare_same_variant() {
        let a = FieldValue::from(1984_i64);
        let b = FieldValue::from(2001_i64);
        assert_eq!(a.compare(&b), Ordering::Less);
        assert_eq!(
            FieldValue::from("b").compare(&FieldValue::from("a")),
            Ordering::Greater
        );
    }

    #[test]
    fn test_storage_text() {
        assert_eq!(FieldValue::from(true).to_storage_text(), "true");
        assert_eq!(FieldValue::from(42_i64).to_storage_text(), "42");
    }
}
