//! Query parameters and pagination utilities

use super::error::{ApiError, ApiResult};
use serde::{Deserialize, Serialize};

/// Default page size when the client does not send `limit`
pub const DEFAULT_LIMIT: usize = 20;

/// Hard ceiling on the page size a client can request
pub const MAX_LIMIT: usize = 100;

/// Pagination parameters as they arrive in the query string
///
/// # Example
/// ```text
/// GET /notes?page=2&limit=10
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
pub struct QueryParams {
    /// Page number (starts at 1)
    pub page: Option<usize>,

    /// Number of items per page
    pub limit: Option<usize>,
}

impl QueryParams {
    /// Turn raw query parameters into a validated [`Pagination`]
    ///
    /// Missing values take their defaults; a zero page or limit is rejected
    /// and a limit above `max_limit` is capped.
    pub fn pagination(&self, default_limit: usize, max_limit: usize) -> ApiResult<Pagination> {
        let page = self.page.unwrap_or(1);
        let limit = self.limit.unwrap_or(default_limit).min(max_limit);
        Pagination::new(page, limit)
    }
}

/// A validated page request: `page >= 1`, `limit > 0`, and an offset that
/// fits a signed 64-bit SQL `OFFSET`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    page: usize,
    limit: usize,
    offset: usize,
}

impl Pagination {
    pub fn new(page: usize, limit: usize) -> ApiResult<Self> {
        if page == 0 {
            return Err(ApiError::validation("page must be 1 or greater"));
        }
        if limit == 0 {
            return Err(ApiError::validation("limit must be greater than 0"));
        }
        let offset = (page - 1)
            .checked_mul(limit)
            .filter(|offset| i64::try_from(*offset).is_ok())
            .ok_or_else(|| ApiError::validation("page is out of range"))?;

        Ok(Self {
            page,
            limit,
            offset,
        })
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Number of rows skipped before this page
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Metadata for this page given the total row count
    pub fn meta(&self, total: usize) -> PaginationMeta {
        PaginationMeta::new(self.page, self.limit, total)
    }
}

/// Pagination metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationMeta {
    /// Current page number (starts at 1)
    pub page: usize,

    /// Number of items per page
    pub limit: usize,

    /// Total number of items matching the predicate
    pub total: usize,

    /// Total number of pages
    pub total_pages: usize,

    /// Whether there is a next page
    pub has_next: bool,

    /// Whether there is a previous page
    pub has_prev: bool,
}

impl PaginationMeta {
    pub fn new(page: usize, limit: usize, total: usize) -> Self {
        let limit = limit.max(1);
        let page = page.max(1);
        let total_pages = total.div_ceil(limit);

        Self {
            page,
            limit,
            total,
            total_pages,
            has_next: page.saturating_mul(limit) < total,
            has_prev: page > 1,
        }
    }
}
