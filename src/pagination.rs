//! This module defines the common functionality for paging data.

use serde::Serialize;

/// The config for pagination.
#[derive(Debug, Clone, PartialEq)]
pub struct PaginationConfig {
    /// The page size to use when a request does not specify one.
    pub default_page_size: u64,
    /// The largest page size a request may ask for.
    pub max_page_size: u64,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_page_size: 20,
            max_page_size: 100,
        }
    }
}

/// The direction to sort query results in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    /// Sort in order of increasing value.
    Ascending,
    /// Sort in order of decreasing value (most recent first for dates).
    #[default]
    Descending,
}

/// A request for one page of query results.
#[derive(Debug, Clone, PartialEq)]
pub struct PageQuery {
    /// The 1-based page number.
    pub page: u64,
    /// The number of records per page.
    pub per_page: u64,
    /// The direction to sort by effective date.
    pub sort: SortOrder,
}

impl Default for PageQuery {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: PaginationConfig::default().default_page_size,
            sort: SortOrder::Descending,
        }
    }
}

impl PageQuery {
    /// Clamp the page number to at least 1 and the page size into
    /// `[1, config.max_page_size]`.
    pub fn normalized(&self, config: &PaginationConfig) -> PageQuery {
        PageQuery {
            page: self.page.max(1),
            per_page: self.per_page.clamp(1, config.max_page_size),
            sort: self.sort,
        }
    }

    /// The number of records to skip before the requested page starts.
    ///
    /// Saturates at `u64::MAX` so an absurd page number yields an empty page
    /// rather than overflowing.
    pub fn skip(&self) -> u64 {
        self.page
            .max(1)
            .saturating_sub(1)
            .saturating_mul(self.per_page.max(1))
    }
}

/// One page of query results, along with the total count computed
/// independently of the page slice.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    /// The records in the requested slice.
    pub data: Vec<T>,
    /// The total number of records matching the query.
    pub total: u64,
    /// The number of records skipped before this slice.
    pub skip: u64,
    /// The page size used for the slice.
    pub limit: u64,
    /// The number of pages the query spans: `ceil(total / limit)`.
    pub pages: u64,
}

impl<T> Page<T> {
    /// Assemble a page from a slice of data and the independent total count.
    ///
    /// An empty result set yields `total = 0` and `pages = 0`, never an
    /// error.
    pub fn new(data: Vec<T>, total: u64, skip: u64, limit: u64) -> Self {
        Self {
            data,
            total,
            skip,
            limit,
            pages: page_count(total, limit),
        }
    }
}

/// The number of pages needed to hold `total` records at `limit` records per
/// page.
pub fn page_count(total: u64, limit: u64) -> u64 {
    total.div_ceil(limit.max(1))
}
