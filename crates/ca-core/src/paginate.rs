//! # Paginator
//!
//! Turns a 1-based page request into a row offset and limit, and rejects
//! pages that lie past the end of the result set.
//!
//! # Invariant
//!
//! For any successful [`paginate`] call, `range_start = (page - 1) * size`
//! and `range_start < total` unless `page == 1`. Page 1 always succeeds so
//! an empty listing renders as an empty page instead of an error.
//!
//! This invariant is also stated as Kani proofs in `ca-verify`.

use crate::error::{QueryError, QueryResult};
use crate::params::RawParams;

/// Rows per page when the request does not say.
pub const DEFAULT_PAGE_SIZE: u64 = 50;

/// Upper bound on rows per page.
pub const MAX_PAGE_SIZE: u64 = 1000;

/// A validated page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page_number: u64,
    page_size: u64,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page_number: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PageRequest {
    /// # Errors
    ///
    /// [`QueryError::InvalidParameter`] if `page_number < 1` or `page_size`
    /// is outside `1..=MAX_PAGE_SIZE`.
    pub fn new(page_number: u64, page_size: u64) -> QueryResult<Self> {
        if page_number < 1 {
            return Err(QueryError::invalid("Page number must be at least 1"));
        }
        if !(1..=MAX_PAGE_SIZE).contains(&page_size) {
            return Err(QueryError::invalid(format!(
                "Illegal page size {} (allowed 1..={})",
                page_size, MAX_PAGE_SIZE
            )));
        }
        Ok(Self {
            page_number,
            page_size,
        })
    }

    /// Read `page` and `pagesize`, applying defaults for absent values.
    pub fn from_params(params: &RawParams) -> QueryResult<Self> {
        let page_size = match params.get_non_empty("pagesize") {
            Some(raw) => raw
                .parse::<u64>()
                .map_err(|_| QueryError::invalid("Illegal page size parameter"))?,
            None => DEFAULT_PAGE_SIZE,
        };
        let page_number = match params.get_non_empty("page") {
            Some(raw) => raw
                .parse::<u64>()
                .map_err(|_| QueryError::invalid("Illegal page parameter"))?,
            None => 1,
        };
        Self::new(page_number, page_size)
    }

    pub fn page_number(&self) -> u64 {
        self.page_number
    }

    pub fn page_size(&self) -> u64 {
        self.page_size
    }
}

/// Where a page starts and how many rows to ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    /// 0-based offset of the first row.
    pub range_start: u64,
    pub limit: u64,
}

/// Compute the row window for `request` against `total_matches` rows.
///
/// # Errors
///
/// [`QueryError::NotFound`] when `page_number > 1` and the page would start
/// at or beyond `total_matches`.
pub fn paginate(request: &PageRequest, total_matches: u64) -> QueryResult<Pagination> {
    let page_not_found = || {
        QueryError::not_found(format!(
            "Page {} is beyond the last page of {} results",
            request.page_number, total_matches
        ))
    };

    let range_start = (request.page_number - 1)
        .checked_mul(request.page_size)
        .ok_or_else(page_not_found)?;

    if request.page_number > 1 && range_start >= total_matches {
        return Err(page_not_found());
    }

    Ok(Pagination {
        range_start,
        limit: request.page_size,
    })
}

/// Number of pages needed for `total_matches` rows. Never less than 1.
pub fn page_count(total_matches: u64, page_size: u64) -> u64 {
    if page_size == 0 {
        return 1;
    }
    total_matches.div_ceil(page_size).max(1)
}
