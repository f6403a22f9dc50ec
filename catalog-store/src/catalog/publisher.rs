//! Publishers

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::repository::{
    FieldDef, FieldValue, Fields, Resource, ResourceRepository, Schema, Transform, UniqueRule,
};

/// Id prefix of publishers
pub const PUBLISHER_PREFIX: &str = "publisher";

static PUBLISHER_SCHEMA: Lazy<Schema> = Lazy::new(|| {
    Schema::new("Publisher", PUBLISHER_PREFIX)
        .with_field(FieldDef::text("name").required().sortable().searchable())
        .with_field(FieldDef::text("website"))
        .with_field(FieldDef::text("country").sortable().filterable())
        .with_unique(
            UniqueRule::new("name", "Publisher with this name already exists")
                .with_transform(Transform::TrimLowercase),
        )
});

/// A publishing house
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Publisher {
    /// Imprint name, unique ignoring case and surrounding whitespace
    pub name: String,
    /// Homepage URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    /// ISO 3166 country code
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

impl Publisher {
    /// A publisher with just a name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            website: None,
            country: None,
        }
    }

    /// Set the homepage
    #[must_use]
    pub fn with_website(mut self, website: impl Into<String>) -> Self {
        self.website = Some(website.into());
        self
    }

    /// Set the country code
    #[must_use]
    pub fn with_country(mut self, country: impl Into<String>) -> Self {
        self.country = Some(country.into());
        self
    }
}

/// Partial update of a publisher
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PublisherPatch {
    /// New name
    pub name: Option<String>,
    /// New homepage
    pub website: Option<String>,
    /// New country code
    pub country: Option<String>,
}

impl Fields for Publisher {
    fn field(&self, name: &str) -> Option<FieldValue> {
        match name {
            "name" => Some(self.name.clone().into()),
            "website" => self.website.clone().map(Into::into),
            "country" => self.country.clone().map(Into::into),
            _ => None,
        }
    }
}

impl Fields for PublisherPatch {
    fn field(&self, name: &str) -> Option<FieldValue> {
        match name {
            "name" => self.name.clone().map(Into::into),
            "website" => self.website.clone().map(Into::into),
            "country" => self.country.clone().map(Into::into),
            _ => None,
        }
    }
}

impl Resource for Publisher {
    type Patch = PublisherPatch;

    fn schema() -> &'static Schema {
        &PUBLISHER_SCHEMA
    }

    fn apply_patch(&mut self, patch: PublisherPatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if patch.website.is_some() {
            self.website = patch.website;
        }
        if patch.country.is_some() {
            self.country = patch.country;
        }
    }
}

/// Repository for publishers over storage `S`
pub type PublisherRepository<S> = ResourceRepository<Publisher, S>;
