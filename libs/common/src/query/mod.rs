//! Typed listing queries
//!
//! Route code describes a listing as a [`ListQuery`]: an entity filter, an
//! optional case-insensitive search term, an optional typed sort field, a
//! direction and a skip/limit window. The same plan is rendered to SQL by
//! [`sql`] and evaluated in process by [`memory`]; both apply the steps in
//! the same order:
//!
//! 1. equality filters (AND-combined)
//! 2. search on the display name
//! 3. sort on a case-folded, numeric-aware key, ties broken by id
//! 4. skip, then limit (unless unlimited)
//!
//! Counting uses steps 1 and 2 only.

pub mod collation;
pub mod filters;
pub mod memory;
pub mod sql;

use serde::Deserialize;
use std::fmt;

use crate::pagination::Window;

pub use collation::natural_cmp;
pub use filters::{
    AlbumFilter, AlbumQuery, AlbumSort, DraftStatus, FileFilter, FileQuery, FileSort, UserFilter,
    UserQuery, UserSort,
};

/// Sort direction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// A field an entity can be sorted by
pub trait SortField: Copy + fmt::Debug + Send + Sync + 'static {
    /// Parse a request field name. Unknown names yield `None`, meaning the
    /// listing is returned unsorted rather than failing.
    fn parse(name: &str) -> Option<Self>;
}

/// A listing request against one entity type
#[derive(Debug, Clone, PartialEq)]
pub struct ListQuery<F, S> {
    pub filter: F,
    pub search: Option<String>,
    pub sort: Option<S>,
    pub order: SortOrder,
    pub window: Window,
}

impl<F: Default, S: SortField> Default for ListQuery<F, S> {
    fn default() -> Self {
        Self::new(F::default())
    }
}

impl<F, S: SortField> ListQuery<F, S> {
    /// Unsorted, unsearched, untruncated query over `filter`
    pub fn new(filter: F) -> Self {
        Self {
            filter,
            search: None,
            sort: None,
            order: SortOrder::Asc,
            window: Window::ALL,
        }
    }

    /// Set the search term; blank terms are ignored
    pub fn search(mut self, term: Option<String>) -> Self {
        self.search = term
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());
        self
    }

    pub fn sort(mut self, sort: Option<S>) -> Self {
        self.sort = sort;
        self
    }

    /// Set the sort from a request field name, dropping unknown names
    pub fn sort_by_name(mut self, name: Option<&str>) -> Self {
        self.sort = name.and_then(S::parse);
        self
    }

    pub fn order(mut self, order: SortOrder) -> Self {
        self.order = order;
        self
    }

    pub fn window(mut self, window: Window) -> Self {
        self.window = window;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pagination::Limit;

    #[test]
    fn test_unknown_sort_field_means_no_sort() {
        let query = AlbumQuery::new(AlbumFilter::default()).sort_by_name(Some("$where"));
        assert_eq!(query.sort, None);

        let query = AlbumQuery::new(AlbumFilter::default()).sort_by_name(Some("lowerName"));
        assert_eq!(query.sort, Some(AlbumSort::LowerName));
    }

    #[test]
    fn test_blank_search_is_dropped() {
        let query = FileQuery::default().search(Some("   ".to_string()));
        assert_eq!(query.search, None);
        let query = FileQuery::default().search(Some(" beach ".to_string()));
        assert_eq!(query.search.as_deref(), Some("beach"));
    }

    #[test]
    fn test_defaults() {
        let query = UserQuery::default();
        assert_eq!(query.order, SortOrder::Asc);
        assert_eq!(query.window.limit, Limit::Unlimited);
        assert_eq!(query.sort, None);
    }

    #[test]
    fn test_order_deserializes_lowercase() {
        let order: SortOrder = serde_json::from_str("\"desc\"").unwrap();
        assert_eq!(order, SortOrder::Desc);
        assert!(serde_json::from_str::<SortOrder>("\"sideways\"").is_err());
    }
}
