//! Offset/limit pagination
//!
//! [`PaginationEngine`] turns a [`PageRequest`] into a storage-level [`PageWindow`] (offset,
//! limit, order) and builds [`PageMeta`] from the raw match count. Both steps are pure.
//!
//! # Example
//!
//! ```rust
//! use catalog_store::config::PaginationConfig;
//! use catalog_store::repository::{PageRequest, PaginationEngine, Schema};
//!
//! let engine = PaginationEngine::new(PaginationConfig::default());
//! let schema = Schema::new("Genre", "genre");
//!
//! let window = engine.paginate(&PageRequest::new().with_page(3), &schema).unwrap();
//! assert_eq!(window.offset, 20);
//!
//! let meta = engine.build_meta(25, &window);
//! assert_eq!(meta.total_pages, 3);
//! assert!(!meta.has_next);
//! assert!(meta.has_prev);
//! ```

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use super::error::{RepositoryError, RepositoryOperation, RepositoryResult};
use super::schema::Schema;
use crate::config::PaginationConfig;

/// Sort direction. Serializes as `ASC`/`DESC`; parses in any letter case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    /// Ascending (A-Z, 0-9, oldest first)
    Asc,
    /// Descending (Z-A, 9-0, newest first)
    #[default]
    Desc,
}

impl SortOrder {
    /// SQL keyword for this direction
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("asc") {
            Ok(Self::Asc)
        } else if s.eq_ignore_ascii_case("desc") {
            Ok(Self::Desc)
        } else {
            Err(format!("invalid sort order '{}', expected ASC or DESC", s))
        }
    }
}

impl Serialize for SortOrder {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_sql())
    }
}

impl<'de> Deserialize<'de> for SortOrder {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Page, limit and sort requested by a caller. Absent values fall back to configured defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PageRequest {
    /// 1-based page number
    pub page: Option<i64>,
    /// Page size
    pub limit: Option<i64>,
    /// Field to sort by
    pub sort_by: Option<String>,
    /// Sort direction
    pub sort_order: Option<SortOrder>,
}

impl PageRequest {
    /// A request using every default
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the page number
    #[must_use]
    pub fn with_page(mut self, page: i64) -> Self {
        self.page = Some(page);
        self
    }

    /// Set the page size
    #[must_use]
    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Set the sort field and direction
    #[must_use]
    pub fn with_sort(mut self, sort_by: impl Into<String>, sort_order: SortOrder) -> Self {
        self.sort_by = Some(sort_by.into());
        self.sort_order = Some(sort_order);
        self
    }
}

/// Resolved ordering
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    /// Field name (a metadata field or a schema field)
    pub field: String,
    /// Direction
    pub order: SortOrder,
}

/// Storage-level slice of a listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageWindow {
    /// 1-based page number
    pub page: u64,
    /// Page size; zero means a single unbounded page
    pub limit: u64,
    /// Number of matching records to skip
    pub offset: u64,
    /// Ordering to apply before slicing
    pub order: OrderBy,
}

impl PageWindow {
    /// Limit to pass to storage; `None` for an unbounded page
    pub fn fetch_limit(&self) -> Option<u64> {
        (self.limit > 0).then_some(self.limit)
    }
}

/// Pagination metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    /// Number of matching records before slicing
    pub total: u64,
    /// 1-based page number
    pub page: u64,
    /// Page size
    pub limit: u64,
    /// Number of pages
    pub total_pages: u64,
    /// Whether a later page exists
    pub has_next: bool,
    /// Whether an earlier page exists
    pub has_prev: bool,
}

/// One page of results plus its metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paginated<T> {
    /// Records on this page, in requested order
    pub data: Vec<T>,
    /// Pagination metadata
    pub meta: PageMeta,
}

impl<T> Paginated<T> {
    /// Transform each item, keeping the metadata
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Paginated<U> {
        Paginated {
            data: self.data.into_iter().map(f).collect(),
            meta: self.meta,
        }
    }
}

/// Converts page requests into storage windows and builds response metadata
#[derive(Debug, Clone, Default)]
pub struct PaginationEngine {
    config: PaginationConfig,
}

impl PaginationEngine {
    /// Create an engine with the given defaults and limits
    pub fn new(config: PaginationConfig) -> Self {
        Self { config }
    }

    /// The engine's configuration
    pub fn config(&self) -> &PaginationConfig {
        &self.config
    }

    /// Resolve a request against the defaults and the resource's sortable fields.
    ///
    /// Absent or non-positive `page`/`limit` fall back to the defaults; `limit` is capped at
    /// `max_limit`. An unknown `sortBy` fails with a validation error.
    pub fn paginate(&self, request: &PageRequest, schema: &Schema) -> RepositoryResult<PageWindow> {
        let page = match request.page {
            Some(p) if p > 0 => p as u64,
            _ => 1,
        };
        let limit = match request.limit {
            Some(l) if l > 0 => l as u64,
            _ => u64::from(self.config.default_limit),
        }
        .min(u64::from(self.config.max_limit));

        let field = request
            .sort_by
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(self.config.default_sort_by.as_str());
        if !schema.is_sortable(field) {
            return Err(RepositoryError::validation(
                RepositoryOperation::FindAllPaged,
                format!("Cannot sort {} by '{}'", schema.plural, field),
            ));
        }

        // A zero limit is one unbounded page; later pages start past every record
        let offset = match limit {
            0 if page > 1 => u64::MAX,
            _ => page.saturating_sub(1).saturating_mul(limit),
        };

        Ok(PageWindow {
            page,
            limit,
            offset,
            order: OrderBy {
                field: field.to_string(),
                order: request
                    .sort_order
                    .unwrap_or(self.config.default_sort_order),
            },
        })
    }

    /// Build metadata for a window from the full match count
    pub fn build_meta(&self, total: u64, window: &PageWindow) -> PageMeta {
        let total_pages = if window.limit == 0 {
            u64::from(total > 0)
        } else {
            total.div_ceil(window.limit)
        };

        PageMeta {
            total,
            page: window.page,
            limit: window.limit,
            total_pages,
            has_next: window.page < total_pages,
            has_prev: window.page > 1,
        }
    }
}
