//! Genres

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::repository::{
    FieldDef, FieldValue, Fields, Resource, ResourceRepository, Schema, Transform, UniqueRule,
};

/// Id prefix of genres
pub const GENRE_PREFIX: &str = "genre";

static GENRE_SCHEMA: Lazy<Schema> = Lazy::new(|| {
    Schema::new("Genre", GENRE_PREFIX)
        .with_field(FieldDef::text("name").required().sortable().searchable())
        .with_field(FieldDef::text("description").searchable())
        .with_unique(
            UniqueRule::new("name", "Genre with this name already exists")
                .with_transform(Transform::TrimLowercase),
        )
});

/// A literary genre
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Genre {
    /// Display name, unique ignoring case and surrounding whitespace
    pub name: String,
    /// Optional description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Genre {
    /// A genre with just a name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
        }
    }

    /// Set the description
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Partial update of a genre
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GenrePatch {
    /// New name
    pub name: Option<String>,
    /// New description
    pub description: Option<String>,
}

impl GenrePatch {
    /// Change the name
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Change the description
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

impl Fields for Genre {
    fn field(&self, name: &str) -> Option<FieldValue> {
        match name {
            "name" => Some(self.name.clone().into()),
            "description" => self.description.clone().map(Into::into),
            _ => None,
        }
    }
}

impl Fields for GenrePatch {
    fn field(&self, name: &str) -> Option<FieldValue> {
        match name {
            "name" => self.name.clone().map(Into::into),
            "description" => self.description.clone().map(Into::into),
            _ => None,
        }
    }
}

impl Resource for Genre {
    type Patch = GenrePatch;

    fn schema() -> &'static Schema {
        &GENRE_SCHEMA
    }

    fn apply_patch(&mut self, patch: GenrePatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(description) = patch.description {
            self.description = Some(description);
        }
    }
}

/// Repository for genres over storage `S`
pub type GenreRepository<S> = ResourceRepository<Genre, S>;
