//! # Pagination
//!
//! Page requests and page metadata shared by every list endpoint.
//!
//! ```text
//! total = 45, page_size = 20
//!
//!   page 1: rows  0..20   has_prev=false has_next=true
//!   page 2: rows 20..40   has_prev=true  has_next=true
//!   page 3: rows 40..45   has_prev=true  has_next=false
//!
//! total_pages = ceil(45 / 20) = 3
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::MAX_PAGE_SIZE;

/// Page size used when a request does not name one.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

// =============================================================================
// Page Request
// =============================================================================

/// A normalized, 1-based page request.
///
/// Construct via [`PageRequest::new`] so out-of-range input is clamped
/// rather than rejected: page 0 becomes page 1, oversized pages shrink to
/// [`MAX_PAGE_SIZE`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: u32,
    page_size: u32,
}

impl PageRequest {
    /// Creates a page request from optional query-string values.
    ///
    /// ## Example
    /// ```rust
    /// use bazaar_core::pagination::PageRequest;
    ///
    /// let req = PageRequest::new(Some(3), Some(10));
    /// assert_eq!(req.offset(), 20);
    ///
    /// let defaults = PageRequest::new(None, None);
    /// assert_eq!((defaults.page(), defaults.page_size()), (1, 20));
    /// ```
    pub fn new(page: Option<u32>, page_size: Option<u32>) -> Self {
        PageRequest::with_default_size(page, page_size, DEFAULT_PAGE_SIZE)
    }

    /// Like [`PageRequest::new`] but with a caller-chosen default size.
    ///
    /// The product catalog and review lists default to 10 per page.
    pub fn with_default_size(page: Option<u32>, page_size: Option<u32>, default_size: u32) -> Self {
        PageRequest {
            page: page.unwrap_or(1).max(1),
            page_size: page_size.unwrap_or(default_size).clamp(1, MAX_PAGE_SIZE),
        }
    }

    #[inline]
    pub fn page(&self) -> u32 {
        self.page
    }

    #[inline]
    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Rows to skip (SQL `OFFSET`).
    #[inline]
    pub fn offset(&self) -> i64 {
        (self.page as i64 - 1) * self.page_size as i64
    }

    /// Rows to take (SQL `LIMIT`).
    #[inline]
    pub fn limit(&self) -> i64 {
        self.page_size as i64
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        PageRequest::new(None, None)
    }
}

// =============================================================================
// Sort Direction
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    /// SQL keyword for `ORDER BY`.
    pub const fn as_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

// =============================================================================
// Page Metadata
// =============================================================================

/// Metadata returned alongside every page of results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PageMeta {
    pub total: i64,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: i64,
    pub has_prev: bool,
    pub has_next: bool,
}

impl PageMeta {
    /// Computes metadata for a page.
    ///
    /// ## Example
    /// ```rust
    /// use bazaar_core::pagination::{PageMeta, PageRequest};
    ///
    /// let meta = PageMeta::new(45, PageRequest::new(Some(3), Some(20)));
    /// assert_eq!(meta.total_pages, 3);
    /// assert!(meta.has_prev);
    /// assert!(!meta.has_next);
    /// ```
    pub fn new(total: i64, request: PageRequest) -> Self {
        let total = total.max(0);
        let size = request.page_size() as i64;
        let total_pages = (total + size - 1) / size;
        let page = request.page();

        PageMeta {
            total,
            page,
            page_size: request.page_size(),
            total_pages,
            has_prev: page > 1,
            has_next: (page as i64) < total_pages,
        }
    }
}

// =============================================================================
// Page
// =============================================================================

/// One page of results plus its metadata.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub meta: PageMeta,
}

impl<T> Page<T> {
    pub fn new(data: Vec<T>, total: i64, request: PageRequest) -> Self {
        Page {
            data,
            meta: PageMeta::new(total, request),
        }
    }

    /// An empty first page.
    pub fn empty(request: PageRequest) -> Self {
        Page::new(Vec::new(), 0, PageRequest::new(Some(1), Some(request.page_size())))
    }

    /// Transforms the rows while keeping the metadata.
    pub fn map<U, F: FnMut(T) -> U>(self, f: F) -> Page<U> {
        Page {
            data: self.data.into_iter().map(f).collect(),
            meta: self.meta,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
