//! Catalog resources
//!
//! Each resource is a plain data struct, a patch struct and a schema. Wiring one up to storage
//! is a type alias over [`ResourceRepository`](crate::repository::ResourceRepository).

pub mod author;
pub mod genre;
pub mod publisher;

pub use author::{Author, AuthorPatch, AuthorRepository, AUTHOR_PREFIX};
pub use genre::{Genre, GenrePatch, GenreRepository, GENRE_PREFIX};
pub use publisher::{Publisher, PublisherPatch, PublisherRepository, PUBLISHER_PREFIX};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{Fields, Resource};

    #[test]
    fn test_schemas_name_their_tables() {
        assert_eq!(Genre::schema().table, "genres");
        assert_eq!(Author::schema().table, "authors");
        assert_eq!(Publisher::schema().table, "publishers");
        assert_eq!(Author::schema().id_prefix, AUTHOR_PREFIX);
    }

    #[test]
    fn test_patch_applies_present_fields_only() {
        let mut author = Author::new("Ursula", "Le Guin").with_bio("Wrote Earthsea");
        author.apply_patch(AuthorPatch::default().with_birth_year(1929));
        assert_eq!(author.birth_year, Some(1929));
        assert_eq!(author.bio.as_deref(), Some("Wrote Earthsea"));
        assert_eq!(author.first_name, "Ursula");
    }

    #[test]
    fn test_fields_expose_camel_case_names() {
        let author = Author::new("Ursula", "Le Guin").with_birth_year(1929);
        assert!(author.field("firstName").is_some());
        assert!(author.field("first_name").is_none());
        assert!(author.field("email").is_none());
        assert!(AuthorPatch::default().field("lastName").is_none());
    }

    #[test]
    fn test_genre_deserializes_without_description() {
        let genre: Genre = serde_json::from_str(r#"{"name": "Fiction"}"#).unwrap();
        assert_eq!(genre, Genre::new("Fiction"));
    }
}
