//! Authors
//!
//! Authors carry two unique rules, checked in this order: the contact email (when present) and
//! the full name. Both ignore case and surrounding whitespace.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::repository::{
    FieldDef, FieldValue, Fields, Resource, ResourceRepository, Schema, Transform, UniqueRule,
};

/// Id prefix of authors
pub const AUTHOR_PREFIX: &str = "author";

static AUTHOR_SCHEMA: Lazy<Schema> = Lazy::new(|| {
    Schema::new("Author", AUTHOR_PREFIX)
        .with_field(FieldDef::text("firstName").required().sortable().searchable())
        .with_field(FieldDef::text("lastName").required().sortable().searchable())
        .with_field(FieldDef::text("email"))
        .with_field(FieldDef::text("bio").searchable())
        .with_field(FieldDef::integer("birthYear").sortable().filterable())
        .with_unique(
            UniqueRule::new("email", "Author with this email already exists")
                .with_transform(Transform::TrimLowercase),
        )
        .with_unique(
            UniqueRule::composite(
                &["firstName", "lastName"],
                "Author with this name already exists",
            )
            .with_transform(Transform::TrimLowercase),
        )
});

/// A book author
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Author {
    /// Given name
    pub first_name: String,
    /// Family name
    pub last_name: String,
    /// Contact email
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Short biography
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    /// Year of birth
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub birth_year: Option<i64>,
}

impl Author {
    /// An author with just a name
    pub fn new(first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
            email: None,
            bio: None,
            birth_year: None,
        }
    }

    /// Set the email
    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Set the biography
    #[must_use]
    pub fn with_bio(mut self, bio: impl Into<String>) -> Self {
        self.bio = Some(bio.into());
        self
    }

    /// Set the year of birth
    #[must_use]
    pub fn with_birth_year(mut self, year: i64) -> Self {
        self.birth_year = Some(year);
        self
    }
}

/// Partial update of an author
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AuthorPatch {
    /// New given name
    pub first_name: Option<String>,
    /// New family name
    pub last_name: Option<String>,
    /// New contact email
    pub email: Option<String>,
    /// New biography
    pub bio: Option<String>,
    /// New year of birth
    pub birth_year: Option<i64>,
}

impl AuthorPatch {
    /// Change the given name
    #[must_use]
    pub fn with_first_name(mut self, first_name: impl Into<String>) -> Self {
        self.first_name = Some(first_name.into());
        self
    }

    /// Change the family name
    #[must_use]
    pub fn with_last_name(mut self, last_name: impl Into<String>) -> Self {
        self.last_name = Some(last_name.into());
        self
    }

    /// Change the email
    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Change the biography
    #[must_use]
    pub fn with_bio(mut self, bio: impl Into<String>) -> Self {
        self.bio = Some(bio.into());
        self
    }

    /// Change the year of birth
    #[must_use]
    pub fn with_birth_year(mut self, year: i64) -> Self {
        self.birth_year = Some(year);
        self
    }
}

impl Fields for Author {
    fn field(&self, name: &str) -> Option<FieldValue> {
        match name {
            "firstName" => Some(self.first_name.clone().into()),
            "lastName" => Some(self.last_name.clone().into()),
            "email" => self.email.clone().map(Into::into),
            "bio" => self.bio.clone().map(Into::into),
            "birthYear" => self.birth_year.map(Into::into),
            _ => None,
        }
    }
}

impl Fields for AuthorPatch {
    fn field(&self, name: &str) -> Option<FieldValue> {
        match name {
            "firstName" => self.first_name.clone().map(Into::into),
            "lastName" => self.last_name.clone().map(Into::into),
            "email" => self.email.clone().map(Into::into),
            "bio" => self.bio.clone().map(Into::into),
            "birthYear" => self.birth_year.map(Into::into),
            _ => None,
        }
    }
}

impl Resource for Author {
    type Patch = AuthorPatch;

    fn schema() -> &'static Schema {
        &AUTHOR_SCHEMA
    }

    fn apply_patch(&mut self, patch: AuthorPatch) {
        if let Some(first_name) = patch.first_name {
            self.first_name = first_name;
        }
        if let Some(last_name) = patch.last_name {
            self.last_name = last_name;
        }
        if patch.email.is_some() {
            self.email = patch.email;
        }
        if patch.bio.is_some() {
            self.bio = patch.bio;
        }
        if patch.birth_year.is_some() {
            self.birth_year = patch.birth_year;
        }
    }
}

/// Repository for authors over storage `S`
pub type AuthorRepository<S> = ResourceRepository<Author, S>;
