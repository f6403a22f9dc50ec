//! Declarative resource schemas
//!
//! A [`Schema`] describes a resource to the generic layer: its names (used in messages and ids),
//! the fields that may be sorted, searched or filtered, which fields are required, and the
//! [`UniqueRule`]s checked before every write.
//!
//! # Example
//!
//! ```rust
//! use catalog_store::repository::{FieldDef, Schema, Transform, UniqueRule};
//!
//! let schema = Schema::new("Genre", "genre")
//!     .with_field(FieldDef::text("name").required().sortable().searchable())
//!     .with_field(FieldDef::text("description").searchable())
//!     .with_unique(
//!         UniqueRule::new("name", "Genre with this name already exists")
//!             .with_transform(Transform::TrimLowercase),
//!     );
//!
//! assert_eq!(schema.plural, "genres");
//! assert!(schema.is_sortable("createdAt"));
//! assert!(schema.is_sortable("name"));
//! assert!(!schema.is_sortable("description"));
//! ```

use std::fmt;

use super::model::{FieldValue, Fields, CREATED_AT_FIELD, ID_FIELD, UPDATED_AT_FIELD};

/// Storage type of a business field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Free text
    Text,
    /// 64-bit integer
    Integer,
    /// Boolean flag
    Boolean,
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Integer => write!(f, "an integer"),
            Self::Boolean => write!(f, "a boolean"),
        }
    }
}

/// Definition of one business field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDef {
    /// External (camelCase) field name
    pub name: String,
    /// Storage type
    pub kind: FieldKind,
    /// Must be present and non-blank on create
    pub required: bool,
    /// May be used as `sortBy`
    pub sortable: bool,
    /// Included in free-text search
    pub searchable: bool,
    /// May be used in structured filters
    pub filterable: bool,
}

impl FieldDef {
    fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            required: false,
            sortable: false,
            searchable: false,
            filterable: false,
        }
    }

    /// A text field
    #[must_use]
    pub fn text(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Text)
    }

    /// An integer field
    #[must_use]
    pub fn integer(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Integer)
    }

    /// A boolean field
    #[must_use]
    pub fn boolean(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Boolean)
    }

    /// Mark the field as required
    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Allow sorting by this field
    #[must_use]
    pub fn sortable(mut self) -> Self {
        self.sortable = true;
        self
    }

    /// Include this field in free-text search. Only meaningful for text fields.
    #[must_use]
    pub fn searchable(mut self) -> Self {
        self.searchable = true;
        self
    }

    /// Allow structured filters on this field
    #[must_use]
    pub fn filterable(mut self) -> Self {
        self.filterable = true;
        self
    }

    /// Convert a lookup value to this field's kind.
    ///
    /// Text fields accept any value in its textual form. Integer and boolean fields accept
    /// their own variant or text that parses as one; anything else is an error message.
    pub fn coerce(&self, value: FieldValue) -> Result<FieldValue, String> {
        let mismatch = |v: &FieldValue| format!("{} expects {}, got '{}'", self.name, self.kind, v);
        match (self.kind, value) {
            (FieldKind::Text, FieldValue::Text(s)) => Ok(FieldValue::Text(s)),
            (FieldKind::Text, other) => Ok(FieldValue::Text(other.to_storage_text())),
            (FieldKind::Integer, FieldValue::Integer(i)) => Ok(FieldValue::Integer(i)),
            (FieldKind::Integer, FieldValue::Text(s)) => s
                .trim()
                .parse::<i64>()
                .map(FieldValue::Integer)
                .map_err(|_| mismatch(&FieldValue::Text(s))),
            (FieldKind::Boolean, FieldValue::Boolean(b)) => Ok(FieldValue::Boolean(b)),
            (FieldKind::Boolean, FieldValue::Text(s)) => match s.trim().to_lowercase().as_str() {
                "true" => Ok(FieldValue::Boolean(true)),
                "false" => Ok(FieldValue::Boolean(false)),
                _ => Err(mismatch(&FieldValue::Text(s))),
            },
            (_, other) => Err(mismatch(&other)),
        }
    }
}

/// Normalisation applied to text before a uniqueness comparison
#[derive(Clone, Copy)]
pub enum Transform {
    /// Strip leading and trailing whitespace
    Trim,
    /// Lowercase
    Lowercase,
    /// Trim, then lowercase
    TrimLowercase,
    /// Caller-supplied normalisation. Not expressible as a database index.
    Custom(fn(&str) -> String),
}

impl Transform {
    /// Apply the transform to a text value
    pub fn apply(&self, value: &str) -> String {
        match self {
            Self::Trim => value.trim().to_string(),
            Self::Lowercase => value.to_lowercase(),
            Self::TrimLowercase => value.trim().to_lowercase(),
            Self::Custom(f) => f(value),
        }
    }

    /// Apply the transform to a field value. Non-text values pass through.
    pub fn normalize(&self, value: FieldValue) -> FieldValue {
        match value {
            FieldValue::Text(s) => FieldValue::Text(self.apply(&s)),
            other => other,
        }
    }

    /// SQL expression applying the same normalisation to `expr`
    pub fn sql_expression(&self, expr: &str) -> Option<String> {
        match self {
            Self::Trim => Some(format!("btrim({})", expr)),
            Self::Lowercase => Some(format!("lower({})", expr)),
            Self::TrimLowercase => Some(format!("lower(btrim({}))", expr)),
            Self::Custom(_) => None,
        }
    }
}

impl fmt::Debug for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Trim => write!(f, "Trim"),
            Self::Lowercase => write!(f, "Lowercase"),
            Self::TrimLowercase => write!(f, "TrimLowercase"),
            Self::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

/// A declarative uniqueness rule over one field or a composite key.
#[derive(Debug, Clone)]
pub struct UniqueRule {
    /// Field names forming the key, in declaration order
    pub fields: Vec<String>,
    /// Conflict message surfaced to the caller
    pub message: String,
    /// Normalisation applied to both the candidate and stored values
    pub transform: Option<Transform>,
}

impl UniqueRule {
    /// A rule over a single field
    #[must_use]
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            fields: vec![field.into()],
            message: message.into(),
            transform: None,
        }
    }

    /// A rule over a composite key
    #[must_use]
    pub fn composite(fields: &[&str], message: impl Into<String>) -> Self {
        Self {
            fields: fields.iter().map(|f| (*f).to_string()).collect(),
            message: message.into(),
            transform: None,
        }
    }

    /// Set the normalisation transform
    #[must_use]
    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = Some(transform);
        self
    }

    /// Apply this rule's transform, if any
    pub fn normalize(&self, value: FieldValue) -> FieldValue {
        match &self.transform {
            Some(t) => t.normalize(value),
            None => value,
        }
    }

    /// Whether the candidate carries at least one field of this rule
    pub fn is_touched_by(&self, candidate: &dyn Fields) -> bool {
        self.fields.iter().any(|f| candidate.field(f).is_some())
    }

    /// Normalised key of the candidate.
    ///
    /// Returns `None` when the candidate touches none of the rule's fields, or when a component
    /// is absent from both the candidate and the fallback (a partial key never conflicts).
    pub fn key(
        &self,
        candidate: &dyn Fields,
        fallback: Option<&dyn Fields>,
    ) -> Option<Vec<(String, FieldValue)>> {
        if !self.is_touched_by(candidate) {
            return None;
        }
        self.fields
            .iter()
            .map(|name| {
                candidate
                    .field(name)
                    .or_else(|| fallback.and_then(|f| f.field(name)))
                    .map(|value| (name.clone(), self.normalize(value)))
            })
            .collect()
    }

    /// Whether two complete values collide under this rule
    pub fn collides(&self, a: &dyn Fields, b: &dyn Fields) -> bool {
        match (self.key(a, None), self.key(b, None)) {
            (Some(ka), Some(kb)) => ka == kb,
            _ => false,
        }
    }

    /// Name of the unique index backing this rule
    pub fn constraint_name(&self, table: &str) -> String {
        format!("{}_{}_key", table, self.fields.join("_")).to_lowercase()
    }
}

/// Declarative description of a resource
#[derive(Debug, Clone)]
pub struct Schema {
    /// Entity type name, e.g. `Genre`
    pub entity_type: String,
    /// Singular name used in messages, e.g. `genre`
    pub display_name: String,
    /// Plural name used in messages, e.g. `genres`
    pub plural: String,
    /// Backing table name
    pub table: String,
    /// Prefix of generated ids
    pub id_prefix: String,
    /// Business fields
    pub fields: Vec<FieldDef>,
    /// Uniqueness rules, checked in declaration order
    pub unique: Vec<UniqueRule>,
}

impl Schema {
    /// Create a schema. Display name, plural and table are derived from the entity type.
    #[must_use]
    pub fn new(entity_type: impl Into<String>, id_prefix: impl Into<String>) -> Self {
        let entity_type = entity_type.into();
        let display_name = entity_type.to_lowercase();
        let plural = format!("{}s", display_name);
        Self {
            table: plural.clone(),
            plural,
            display_name,
            entity_type,
            id_prefix: id_prefix.into(),
            fields: Vec::new(),
            unique: Vec::new(),
        }
    }

    /// Override the plural (and the table name derived from it)
    #[must_use]
    pub fn with_plural(mut self, plural: impl Into<String>) -> Self {
        self.plural = plural.into();
        self.table = self.plural.replace(' ', "_");
        self
    }

    /// Override the table name
    #[must_use]
    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }

    /// Add a business field
    #[must_use]
    pub fn with_field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }

    /// Add a uniqueness rule
    #[must_use]
    pub fn with_unique(mut self, rule: UniqueRule) -> Self {
        self.unique.push(rule);
        self
    }

    /// Look up a field definition
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Whether `name` may be used as a sort key
    pub fn is_sortable(&self, name: &str) -> bool {
        matches!(name, ID_FIELD | CREATED_AT_FIELD | UPDATED_AT_FIELD)
            || self.field(name).is_some_and(|f| f.sortable)
    }

    /// Whether `name` may be used in structured filters
    pub fn is_filterable(&self, name: &str) -> bool {
        self.field(name).is_some_and(|f| f.filterable)
    }

    /// Text fields included in free-text search
    pub fn searchable_fields(&self) -> impl Iterator<Item = &str> {
        self.fields
            .iter()
            .filter(|f| f.searchable && f.kind == FieldKind::Text)
            .map(|f| f.name.as_str())
    }

    /// The rule governing `field`: a single-field rule if one exists, else the first rule
    /// that includes it
    pub fn rule_for_field(&self, field: &str) -> Option<&UniqueRule> {
        self.unique
            .iter()
            .find(|r| r.fields.len() == 1 && r.fields[0] == field)
            .or_else(|| self.unique.iter().find(|r| r.fields.iter().any(|f| f == field)))
    }

    /// The rule whose index carries the given name
    pub fn rule_for_constraint(&self, constraint: &str) -> Option<&UniqueRule> {
        self.unique
            .iter()
            .find(|r| r.constraint_name(&self.table) == constraint)
    }

    /// Check a create payload against the required fields
    pub fn check_required(&self, candidate: &dyn Fields) -> Result<(), String> {
        for def in self.fields.iter().filter(|f| f.required) {
            match candidate.field(&def.name) {
                None => return Err(format!("{} is required", def.name)),
                Some(FieldValue::Text(s)) if s.trim().is_empty() => {
                    return Err(format!("{} must not be blank", def.name))
                }
                Some(_) => {}
            }
        }
        Ok(())
    }

    /// Check a patch: required text fields it carries must not be blank
    pub fn check_patch(&self, patch: &dyn Fields) -> Result<(), String> {
        for def in self.fields.iter().filter(|f| f.required) {
            if let Some(FieldValue::Text(s)) = patch.field(&def.name) {
                if s.trim().is_empty() {
                    return Err(format!("{} must not be blank", def.name));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct Map(HashMap<&'static str, FieldValue>);

    impl Fields for Map {
        fn field(&self, name: &str) -> Option<FieldValue> {
            self.0.get(name).cloned()
        }
    }

    fn map(pairs: &[(&'static str, &str)]) -> Map {
        Map(pairs
            .iter()
            .map(|(k, v)| (*k, FieldValue::from(*v)))
            .collect())
    }

    fn author_schema() -> Schema {
        Schema::new("Author", "author")
            .with_field(FieldDef::text("firstName").required().sortable())
            .with_field(FieldDef::text("lastName").required().sortable())
            .with_field(FieldDef::integer("birthYear").filterable())
            .with_unique(UniqueRule::composite(
                &["firstName", "lastName"],
                "Author with this name already exists",
            ))
    }

    #[test]
    fn test_transforms() {
        assert_eq!(Transform::Trim.apply("  Fiction "), "Fiction");
        assert_eq!(Transform::Lowercase.apply(" Fiction"), " fiction");
        assert_eq!(Transform::TrimLowercase.apply("  Fiction "), "fiction");
        assert_eq!(
            Transform::Custom(|s| s.replace('-', "")).apply("sci-fi"),
            "scifi"
        );
        assert_eq!(
            Transform::TrimLowercase.sql_expression("data->>'name'"),
            Some("lower(btrim(data->>'name'))".to_string())
        );
        assert!(Transform::Custom(|s| s.to_string())
            .sql_expression("x")
            .is_none());
    }

    #[test]
    fn test_rule_key_skips_untouched() {
        let schema = author_schema();
        let rule = &schema.unique[0];
        assert!(rule.key(&map(&[("bio", "x")]), None).is_none());
    }

    #[test]
    fn test_rule_key_fills_from_fallback() {
        let schema = author_schema();
        let rule = &schema.unique[0];
        let current = map(&[("firstName", "Ursula"), ("lastName", "Le Guin")]);
        let key = rule
            .key(&map(&[("firstName", "Ursula K.")]), Some(&current))
            .unwrap();
        assert_eq!(
            key,
            vec![
                ("firstName".to_string(), FieldValue::from("Ursula K.")),
                ("lastName".to_string(), FieldValue::from("Le Guin")),
            ]
        );
    }

    #[test]
    fn test_rule_key_incomplete_without_fallback() {
        let schema = author_schema();
        let rule = &schema.unique[0];
        assert!(rule.key(&map(&[("firstName", "Ursula")]), None).is_none());
    }

    #[test]
    fn test_collides_uses_transform() {
        let rule = UniqueRule::new("name", "taken").with_transform(Transform::TrimLowercase);
        assert!(rule.collides(&map(&[("name", "Fiction")]), &map(&[("name", " fiction ")])));
        assert!(!rule.collides(&map(&[("name", "Fiction")]), &map(&[("name", "Poetry")])));
    }

    #[test]
    fn test_constraint_names() {
        let schema = author_schema();
        let name = schema.unique[0].constraint_name(&schema.table);
        assert_eq!(name, "authors_firstname_lastname_key");
        assert!(schema.rule_for_constraint(&name).is_some());
        assert!(schema.rule_for_constraint("other_key").is_none());
    }

    #[test]
    fn test_sortable_and_filterable() {
        let schema = author_schema();
        assert!(schema.is_sortable("updatedAt"));
        assert!(schema.is_sortable("lastName"));
        assert!(!schema.is_sortable("birthYear"));
        assert!(schema.is_filterable("birthYear"));
        assert!(!schema.is_filterable("firstName"));
    }

    #[test]
    fn test_required_checks() {
        let schema = author_schema();
        assert_eq!(
            schema.check_required(&map(&[("firstName", "Ursula")])),
            Err("lastName is required".to_string())
        );
        assert_eq!(
            schema.check_required(&map(&[("firstName", " "), ("lastName", "Le Guin")])),
            Err("firstName must not be blank".to_string())
        );
        assert!(schema
            .check_required(&map(&[("firstName", "Ursula"), ("lastName", "Le Guin")]))
            .is_ok());

        assert!(schema.check_patch(&map(&[])).is_ok());
        assert!(schema.check_patch(&map(&[("lastName", "")])).is_err());
    }

    #[test]
    fn test_rule_for_field_prefers_single() {
        let schema = Schema::new("Author", "author")
            .with_unique(UniqueRule::composite(&["firstName", "lastName"], "pair"))
            .with_unique(UniqueRule::new("lastName", "single"));
        assert_eq!(schema.rule_for_field("lastName").unwrap().message, "single");
        assert_eq!(schema.rule_for_field("firstName").unwrap().message, "pair");
        assert!(schema.rule_for_field("bio").is_none());
    }

    #[test]
    fn test_coerce_to_field_kind() {
        let year = FieldDef::integer("birthYear");
        assert_eq!(year.coerce(" 1929 ".into()), Ok(FieldValue::Integer(1929)));
        assert_eq!(year.coerce(1929_i64.into()), Ok(FieldValue::Integer(1929)));
        assert!(year.coerce("nineteen".into()).is_err());
        assert!(year.coerce(true.into()).is_err());

        let flag = FieldDef::boolean("inPrint");
        assert_eq!(flag.coerce("TRUE".into()), Ok(FieldValue::Boolean(true)));
        assert!(flag.coerce(1_i64.into()).is_err());

        let name = FieldDef::text("name");
        assert_eq!(name.coerce(42_i64.into()), Ok(FieldValue::Text("42".to_string())));
    }
}
