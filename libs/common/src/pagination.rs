//! Page arithmetic shared by every listing endpoint
//!
//! A listing request carries a 1-based `page` and a `limit`. The limit `-1`
//! is a sentinel for "every matching record"; `0` yields an empty page.

use serde::Serialize;
use thiserror::Error;

/// Page used when the request does not name one
pub const DEFAULT_PAGE: i64 = 1;
/// Page size used when the request does not name one
pub const DEFAULT_LIMIT: i64 = 25;
/// Raw limit value meaning "no limit"
pub const UNLIMITED: i64 = -1;

/// Page size of a listing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Limit {
    /// Return every matching record
    Unlimited,
    /// Return at most this many records
    Count(u64),
}

impl Limit {
    /// Parse a raw limit. `-1` is unlimited; other negative values are invalid.
    pub fn from_raw(raw: i64) -> Option<Self> {
        match raw {
            UNLIMITED => Some(Limit::Unlimited),
            n if n >= 0 => Some(Limit::Count(n as u64)),
            _ => None,
        }
    }
}

/// Rejected page size
#[derive(Debug, Error, PartialEq, Eq)]
#[error("limit must be -1 or a non-negative integer, got {0}")]
pub struct InvalidLimit(pub i64);

/// Skip/limit pair applied to an ordered sequence, skip first
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub skip: u64,
    pub limit: Limit,
}

impl Window {
    /// No truncation at all
    pub const ALL: Window = Window {
        skip: 0,
        limit: Limit::Unlimited,
    };

    /// Whether the window can only ever produce an empty result
    pub fn is_empty(&self) -> bool {
        self.limit == Limit::Count(0)
    }
}

impl Default for Window {
    fn default() -> Self {
        Window::ALL
    }
}

/// Result of [`paginate`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    /// Number of records to skip before the page starts
    pub skip: u64,
    /// Total number of pages for the given record count
    pub page_count: u64,
}

/// Compute the skip offset and page count for a request.
///
/// `page` below 1 is treated as 1. An unlimited page never skips and
/// counts as a single page unless there is nothing to show.
pub fn paginate(page: i64, limit: Limit, total_count: u64) -> Pagination {
    let page = page.max(1) as u64;

    match limit {
        Limit::Unlimited => Pagination {
            skip: 0,
            page_count: if total_count == 0 { 0 } else { 1 },
        },
        Limit::Count(0) => Pagination {
            skip: 0,
            page_count: 0,
        },
        Limit::Count(n) => Pagination {
            skip: (page - 1).saturating_mul(n),
            page_count: total_count.div_ceil(n),
        },
    }
}

/// Parsed `page`/`limit` query parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub limit: Limit,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            limit: Limit::Count(DEFAULT_LIMIT as u64),
        }
    }
}

impl PageRequest {
    /// Build a request from raw query values, applying defaults and clamping
    /// the page. Only a negative limit other than `-1` is an error.
    pub fn from_raw(page: Option<i64>, limit: Option<i64>) -> Result<Self, InvalidLimit> {
        let raw_limit = limit.unwrap_or(DEFAULT_LIMIT);
        let limit = Limit::from_raw(raw_limit).ok_or(InvalidLimit(raw_limit))?;

        Ok(Self {
            page: page.unwrap_or(DEFAULT_PAGE).max(1),
            limit,
        })
    }

    /// The skip/limit window selecting this page
    pub fn window(&self) -> Window {
        Window {
            skip: paginate(self.page, self.limit, 0).skip,
            limit: self.limit,
        }
    }

    /// Number of pages needed for `total_count` records
    pub fn page_count(&self, total_count: u64) -> u64 {
        paginate(self.page, self.limit, total_count).page_count
    }

    /// Wrap a page of records in the listing envelope
    pub fn into_page<T>(self, data: Vec<T>, count: u64) -> Page<T> {
        Page {
            data,
            count,
            pages: self.page_count(count),
        }
    }
}

/// Listing response envelope
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub count: u64,
    pub pages: u64,
}

impl<T> Page<T> {
    /// Convert every record, keeping the counts
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            data: self.data.into_iter().map(f).collect(),
            count: self.count,
            pages: self.pages,
        }
    }
}

/// Apply a window to an already ordered sequence
pub fn slice<T>(items: impl IntoIterator<Item = T>, window: Window) -> Vec<T> {
    let skip = usize::try_from(window.skip).unwrap_or(usize::MAX);
    let iter = items.into_iter().skip(skip);

    match window.limit {
        Limit::Unlimited => iter.collect(),
        Limit::Count(n) => iter.take(usize::try_from(n).unwrap_or(usize::MAX)).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_count_is_ceiling_of_count_over_limit() {
        for limit in 1..=12u64 {
            for count in 0..=50u64 {
                let expected = (count as f64 / limit as f64).ceil() as u64;
                assert_eq!(
                    paginate(1, Limit::Count(limit), count).page_count,
                    expected,
                    "count={count} limit={limit}"
                );
            }
        }
    }

    #[test]
    fn test_skip_uses_previous_pages() {
        assert_eq!(paginate(1, Limit::Count(25), 100).skip, 0);
        assert_eq!(paginate(3, Limit::Count(25), 100).skip, 50);
    }

    #[test]
    fn test_page_below_one_is_clamped() {
        assert_eq!(paginate(0, Limit::Count(10), 30), paginate(1, Limit::Count(10), 30));
        assert_eq!(paginate(-4, Limit::Count(10), 30).skip, 0);
    }

    #[test]
    fn test_unlimited_is_one_page_without_skip() {
        let p = paginate(7, Limit::Unlimited, 1234);
        assert_eq!(p.skip, 0);
        assert_eq!(p.page_count, 1);
        assert_eq!(paginate(1, Limit::Unlimited, 0).page_count, 0);
    }

    #[test]
    fn test_zero_limit_is_an_empty_page() {
        let p = paginate(2, Limit::Count(0), 40);
        assert_eq!(p.page_count, 0);
        assert_eq!(p.skip, 0);

        let request = PageRequest::from_raw(Some(2), Some(0)).unwrap();
        assert!(request.window().is_empty());
        assert!(slice(0..40, request.window()).is_empty());
    }

    #[test]
    fn test_page_request_defaults_and_validation() {
        let request = PageRequest::from_raw(None, None).unwrap();
        assert_eq!(request, PageRequest::default());
        assert_eq!(request.limit, Limit::Count(25));

        assert_eq!(
            PageRequest::from_raw(Some(1), Some(-1)).unwrap().limit,
            Limit::Unlimited
        );
        assert_eq!(PageRequest::from_raw(Some(1), Some(-2)), Err(InvalidLimit(-2)));
        assert_eq!(PageRequest::from_raw(Some(-3), None).unwrap().page, 1);
    }

    #[test]
    fn test_slice_matches_page_bounds() {
        let records: Vec<u32> = (0..53).collect();
        for page in 1..=7i64 {
            let request = PageRequest::from_raw(Some(page), Some(10)).unwrap();
            let start = ((page - 1) * 10) as usize;
            let end = (page * 10).min(53) as usize;
            let expected: Vec<u32> = records.get(start..end).map(|s| s.to_vec()).unwrap_or_default();
            assert_eq!(slice(records.clone(), request.window()), expected);
        }

        let all = PageRequest::from_raw(Some(4), Some(-1)).unwrap();
        assert_eq!(slice(records.clone(), all.window()).len(), 53);
    }

    #[test]
    fn test_into_page_envelope() {
        let request = PageRequest::from_raw(Some(1), Some(2)).unwrap();
        let page = request.into_page(vec!["a", "b"], 5);
        assert_eq!(page.count, 5);
        assert_eq!(page.pages, 3);
        let json = serde_json::to_value(page.map(str::to_uppercase)).unwrap();
        assert_eq!(json, serde_json::json!({"data": ["A", "B"], "count": 5, "pages": 3}));
    }
}
