//! In-process evaluation of a [`ListQuery`]

use std::cmp::Ordering;
use uuid::Uuid;

use super::{AlbumFilter, AlbumSort, FileFilter, FileSort, ListQuery, SortField, SortOrder};
use super::{UserFilter, UserSort};
use crate::models::{Album, File, User};
use crate::pagination;

/// A record the memory store can filter, search and sort
pub trait Queryable: Clone {
    type Filter;
    type Sort: SortField;

    fn id(&self) -> Uuid;
    fn matches_filter(&self, filter: &Self::Filter) -> bool;
    /// Fields the search term is matched against
    fn search_fields(&self) -> Vec<&str>;
    fn compare(&self, other: &Self, sort: Self::Sort) -> Ordering;
}

impl Queryable for Album {
    type Filter = AlbumFilter;
    type Sort = AlbumSort;

    fn id(&self) -> Uuid {
        self.id
    }

    fn matches_filter(&self, filter: &AlbumFilter) -> bool {
        filter.matches(self)
    }

    fn search_fields(&self) -> Vec<&str> {
        vec![self.name.as_str()]
    }

    fn compare(&self, other: &Self, sort: AlbumSort) -> Ordering {
        sort.compare(self, other)
    }
}

impl Queryable for File {
    type Filter = FileFilter;
    type Sort = FileSort;

    fn id(&self) -> Uuid {
        self.id
    }

    fn matches_filter(&self, filter: &FileFilter) -> bool {
        filter.matches(self)
    }

    fn search_fields(&self) -> Vec<&str> {
        vec![self.name.as_str()]
    }

    fn compare(&self, other: &Self, sort: FileSort) -> Ordering {
        sort.compare(self, other)
    }
}

impl Queryable for User {
    type Filter = UserFilter;
    type Sort = UserSort;

    fn id(&self) -> Uuid {
        self.id
    }

    fn matches_filter(&self, _filter: &UserFilter) -> bool {
        true
    }

    fn search_fields(&self) -> Vec<&str> {
        vec![self.first_name.as_str(), self.last_name.as_str()]
    }

    fn compare(&self, other: &Self, sort: UserSort) -> Ordering {
        sort.compare(self, other)
    }
}

fn matches<T: Queryable>(record: &T, query: &ListQuery<T::Filter, T::Sort>) -> bool {
    if !record.matches_filter(&query.filter) {
        return false;
    }

    match &query.search {
        Some(term) => {
            let term = term.to_lowercase();
            record
                .search_fields()
                .iter()
                .any(|field| field.to_lowercase().contains(&term))
        }
        None => true,
    }
}

/// Filter, search, sort and window `records`
pub fn evaluate<'a, T>(
    records: impl IntoIterator<Item = &'a T>,
    query: &ListQuery<T::Filter, T::Sort>,
) -> Vec<T>
where
    T: Queryable + 'a,
{
    let mut matched: Vec<T> = records
        .into_iter()
        .filter(|record| matches(*record, query))
        .cloned()
        .collect();

    if let Some(sort) = query.sort {
        matched.sort_by(|a, b| {
            let ord = a.compare(b, sort);
            let ord = match query.order {
                SortOrder::Asc => ord,
                SortOrder::Desc => ord.reverse(),
            };
            ord.then_with(|| a.id().cmp(&b.id()))
        });
    }

    pagination::slice(matched, query.window)
}

/// Count the records matching the query's filter and search, ignoring
/// its sort and window
pub fn count<'a, T>(
    records: impl IntoIterator<Item = &'a T>,
    query: &ListQuery<T::Filter, T::Sort>,
) -> u64
where
    T: Queryable + 'a,
{
    records
        .into_iter()
        .filter(|record| matches(*record, query))
        .count() as u64
}
