//! This modules defines the common functionality for paging data.

use serde::Serialize;

/// The page number to default to when not specified in a request.
pub const DEFAULT_PAGE: u64 = 1;
/// The number of items per page when not specified in a request.
pub const DEFAULT_PAGE_SIZE: u64 = 10;

/// How a list endpoint shapes its response.
///
/// Dashboard clients expect a bare array of every matching item, while paged
/// clients expect an envelope with the pagination metadata. The mode is
/// selected by whether the request has a `page` parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseMode {
    /// Return every matching item as a plain array.
    Bare,
    /// Return one page of items wrapped in `{data, pagination}`.
    Paginated(PageRequest),
}

impl ResponseMode {
    /// Select the response mode from the raw `page` and `limit` parameters.
    ///
    /// A `page` or `limit` of zero falls back to the default.
    pub fn from_params(page: Option<u64>, limit: Option<u64>) -> Self {
        match page {
            None => ResponseMode::Bare,
            Some(page) => ResponseMode::Paginated(PageRequest::new(page, limit)),
        }
    }
}

/// A request for one page of results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// The 1-indexed page number.
    pub page: u64,
    /// The maximum number of items per page.
    pub limit: u64,
}

impl PageRequest {
    /// Create a page request, replacing missing or zero values with the defaults.
    pub fn new(page: u64, limit: Option<u64>) -> Self {
        let page = if page == 0 { DEFAULT_PAGE } else { page };
        let limit = match limit {
            Some(limit) if limit > 0 => limit,
            _ => DEFAULT_PAGE_SIZE,
        };

        Self { page, limit }
    }

    /// The number of items to skip to reach this page.
    pub fn offset(&self) -> u64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

/// The pagination metadata returned alongside a page of results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    /// The number of items matching the query across all pages.
    pub total: u64,
    /// The current page.
    pub page: u64,
    /// The number of pages needed to show every item.
    pub total_pages: u64,
    /// The maximum number of items per page.
    pub limit: u64,
}

impl Pagination {
    /// Build the metadata for `request` given the `total` number of matching items.
    pub fn new(request: PageRequest, total: u64) -> Self {
        Self {
            total,
            page: request.page,
            total_pages: total.div_ceil(request.limit),
            limit: request.limit,
        }
    }
}
