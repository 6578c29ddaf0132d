//! SQL rendering of a [`ListQuery`]
//!
//! Every value is bound as a parameter; column names only ever come from
//! the static tables below, so route input never reaches the SQL text.

use sqlx::{Postgres, QueryBuilder};

use super::{AlbumFilter, AlbumSort, FileFilter, FileSort, ListQuery, SortField, SortOrder};
use super::{UserFilter, UserSort};
use crate::pagination::Limit;

/// Collation created by the migrations for natural name ordering
pub const NATURAL_COLLATION: &str = "natural_ci";

/// How a sort field is rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortColumn {
    /// Case-folded text ordered with the natural collation
    Text(&'static str),
    /// Column ordered by its native type
    Value(&'static str),
}

/// A table (or join) a [`ListQuery`] can be rendered against
pub trait SqlSource {
    type Filter;
    type Sort: SortField;

    /// Qualified id column, used as the ordering tie-breaker
    const ID_COLUMN: &'static str;
    /// Qualified columns the search term is matched against
    const SEARCH_COLUMNS: &'static [&'static str];

    /// Push ` AND <predicate>` clauses for the active filters
    fn push_filter(filter: &Self::Filter, qb: &mut QueryBuilder<'_, Postgres>);

    fn sort_column(sort: Self::Sort) -> SortColumn;
}

/// Album rows, aliased `a`
pub struct AlbumSource;

impl SqlSource for AlbumSource {
    type Filter = AlbumFilter;
    type Sort = AlbumSort;

    const ID_COLUMN: &'static str = "a.id";
    const SEARCH_COLUMNS: &'static [&'static str] = &["a.name"];

    fn push_filter(filter: &AlbumFilter, qb: &mut QueryBuilder<'_, Postgres>) {
        if let Some(draft) = filter.status.draft_flag() {
            qb.push(" AND a.draft = ").push_bind(draft);
        }
        if filter.favorites {
            qb.push(" AND a.favorite = TRUE");
        }
        if filter.featured {
            qb.push(" AND a.featured = TRUE");
        }
    }

    fn sort_column(sort: AlbumSort) -> SortColumn {
        match sort {
            AlbumSort::LowerName => SortColumn::Text("a.name"),
            AlbumSort::CreatedAt => SortColumn::Value("a.created_at"),
            AlbumSort::ModifiedAt => SortColumn::Value("a.modified_at"),
            AlbumSort::PostedAt => SortColumn::Value("a.posted_at"),
        }
    }
}

/// File rows, aliased `f`
pub struct FileSource;

impl SqlSource for FileSource {
    type Filter = FileFilter;
    type Sort = FileSort;

    const ID_COLUMN: &'static str = "f.id";
    const SEARCH_COLUMNS: &'static [&'static str] = &["f.name"];

    fn push_filter(filter: &FileFilter, qb: &mut QueryBuilder<'_, Postgres>) {
        if let Some(album_id) = filter.album_id {
            qb.push(" AND f.album_id = ").push_bind(album_id);
        }
    }

    fn sort_column(sort: FileSort) -> SortColumn {
        match sort {
            FileSort::LowerName => SortColumn::Text("f.name"),
            FileSort::Size => SortColumn::Value("f.size"),
            FileSort::CreatedAt => SortColumn::Value("f.created_at"),
            FileSort::ModifiedAt => SortColumn::Value("f.modified_at"),
        }
    }
}

/// User metadata `m` joined with credentials `c`
pub struct UserSource;

impl SqlSource for UserSource {
    type Filter = UserFilter;
    type Sort = UserSort;

    const ID_COLUMN: &'static str = "m.id";
    const SEARCH_COLUMNS: &'static [&'static str] = &["m.first_name", "m.last_name"];

    fn push_filter(_filter: &UserFilter, _qb: &mut QueryBuilder<'_, Postgres>) {}

    fn sort_column(sort: UserSort) -> SortColumn {
        match sort {
            UserSort::FirstName => SortColumn::Text("m.first_name"),
            UserSort::LastName => SortColumn::Text("m.last_name"),
            UserSort::CreatedAt => SortColumn::Value("m.created_at"),
        }
    }
}

/// Escape `LIKE` wildcards so the term matches literally
pub fn like_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Push the `WHERE` clause: filters, then search
pub fn push_predicate<S: SqlSource>(
    qb: &mut QueryBuilder<'_, Postgres>,
    query: &ListQuery<S::Filter, S::Sort>,
) {
    qb.push(" WHERE TRUE");
    S::push_filter(&query.filter, qb);

    if let Some(term) = &query.search {
        let pattern = like_pattern(term);
        qb.push(" AND (");
        for (i, column) in S::SEARCH_COLUMNS.iter().enumerate() {
            if i > 0 {
                qb.push(" OR ");
            }
            qb.push(*column)
                .push(" ILIKE ")
                .push_bind(pattern.clone())
                .push(" ESCAPE '\\'");
        }
        qb.push(")");
    }
}

/// Push `ORDER BY`, then `OFFSET`/`LIMIT`
pub fn push_order_and_window<S: SqlSource>(
    qb: &mut QueryBuilder<'_, Postgres>,
    query: &ListQuery<S::Filter, S::Sort>,
) {
    if let Some(sort) = query.sort {
        let nulls = match query.order {
            SortOrder::Asc => "NULLS FIRST",
            SortOrder::Desc => "NULLS LAST",
        };

        qb.push(" ORDER BY ");
        match S::sort_column(sort) {
            SortColumn::Text(column) => {
                qb.push(format_args!("lower({column}) COLLATE \"{NATURAL_COLLATION}\""));
            }
            SortColumn::Value(column) => {
                qb.push(column);
            }
        }
        qb.push(format_args!(
            " {} {}, {} ASC",
            query.order.as_sql(),
            nulls,
            S::ID_COLUMN
        ));
    }

    if query.window.skip > 0 {
        qb.push(" OFFSET ").push_bind(clamp_i64(query.window.skip));
    }
    if let Limit::Count(n) = query.window.limit {
        qb.push(" LIMIT ").push_bind(clamp_i64(n));
    }
}

fn clamp_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

/// Render a full listing statement: `select` must end with the aliased
/// `FROM` clause of `S`
pub fn build_list<'q, S: SqlSource>(
    select: &str,
    query: &ListQuery<S::Filter, S::Sort>,
) -> QueryBuilder<'q, Postgres> {
    let mut qb = QueryBuilder::new(select);
    push_predicate::<S>(&mut qb, query);
    push_order_and_window::<S>(&mut qb, query);
    qb
}

/// Render a count over the query's predicate: `from` is the aliased
/// `FROM` clause of `S`
pub fn build_count<'q, S: SqlSource>(
    from: &str,
    query: &ListQuery<S::Filter, S::Sort>,
) -> QueryBuilder<'q, Postgres> {
    let mut qb = QueryBuilder::new("SELECT COUNT(*) ");
    qb.push(from);
    push_predicate::<S>(&mut qb, query);
    qb
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pagination::Window;
    use crate::query::{AlbumQuery, DraftStatus, FileQuery, UserQuery};

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("photo"), "%photo%");
        assert_eq!(like_pattern("100%_done\\"), "%100\\%\\_done\\\\%");
    }

    #[test]
    fn test_album_listing_sql_orders_steps() {
        let query = AlbumQuery::new(AlbumFilter {
            status: DraftStatus::Posted,
            favorites: true,
            featured: false,
        })
        .search(Some("trip".to_string()))
        .sort(Some(AlbumSort::LowerName))
        .order(SortOrder::Desc)
        .window(Window {
            skip: 50,
            limit: Limit::Count(25),
        });

        let qb = build_list::<AlbumSource>("SELECT a.id FROM albums a", &query);
        assert_eq!(
            qb.sql(),
            "SELECT a.id FROM albums a WHERE TRUE AND a.draft = $1 AND a.favorite = TRUE \
             AND (a.name ILIKE $2 ESCAPE '\\') \
             ORDER BY lower(a.name) COLLATE \"natural_ci\" DESC NULLS LAST, a.id ASC \
             OFFSET $3 LIMIT $4"
        );
    }

    #[test]
    fn test_unlimited_and_unsorted_sql() {
        let query = FileQuery::new(FileFilter::default());
        let qb = build_list::<FileSource>("SELECT f.id FROM files f", &query);
        assert_eq!(qb.sql(), "SELECT f.id FROM files f WHERE TRUE");
    }

    #[test]
    fn test_count_ignores_sort_and_window() {
        let query = UserQuery::new(UserFilter)
            .search(Some("ada".to_string()))
            .sort(Some(UserSort::CreatedAt))
            .window(Window {
                skip: 10,
                limit: Limit::Count(5),
            });
        let qb = build_count::<UserSource>("FROM user_metadata m", &query);
        assert_eq!(
            qb.sql(),
            "SELECT COUNT(*) FROM user_metadata m WHERE TRUE \
             AND (m.first_name ILIKE $1 ESCAPE '\\' OR m.last_name ILIKE $2 ESCAPE '\\')"
        );
    }

    #[test]
    fn test_value_sort_has_no_collation() {
        let query = FileQuery::default().sort(Some(FileSort::Size));
        let qb = build_list::<FileSource>("SELECT f.id FROM files f", &query);
        assert!(qb.sql().ends_with("ORDER BY f.size ASC NULLS FIRST, f.id ASC"));
    }
}
