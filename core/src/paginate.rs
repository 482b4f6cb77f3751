//! Page planning for searches larger than one response.
//!
//! A search that asks for every match (or for more than one page) is sent
//! as a sequence of requests carrying `$$FIRST` (offset) and `$$LIMIT`
//! (page size). The plan is computed up front from the true match count.

use tracing::debug;

use crate::error::ApiError;

pub const FIRST_PARAM: &str = "$$FIRST";
pub const LIMIT_PARAM: &str = "$$LIMIT";

/// One page of a search: skip `offset` results, return at most `size`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub offset: usize,
    pub size: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PagePlan {
    /// `min(true_count, limit)`, or `true_count` without a limit.
    pub effective_total: usize,
    /// `min(limit, max_page_size)`, or `max_page_size` without a limit.
    pub page_size: usize,
    /// Pages in increasing offset order. Sizes sum to `effective_total`.
    pub pages: Vec<Page>,
}

/// Plan the pages needed to fetch `min(true_count, limit)` results.
///
/// Every page but the last has `page_size` results; the last has the exact
/// remainder, which is never zero. A zero total yields no pages.
pub fn plan_pages(
    true_count: usize,
    limit: Option<usize>,
    max_page_size: usize,
) -> Result<PagePlan, ApiError> {
    if max_page_size == 0 {
        return Err(ApiError::validation("page size must be positive"));
    }
    let (effective_total, page_size) = match limit {
        Some(limit) => (true_count.min(limit), limit.min(max_page_size)),
        None => (true_count, max_page_size),
    };
    if effective_total == 0 {
        return Ok(PagePlan {
            effective_total,
            page_size,
            pages: Vec::new(),
        });
    }

    let page_count = effective_total.div_ceil(page_size);
    let pages = (0..page_count)
        .map(|i| {
            let offset = i * page_size;
            let size = if i + 1 == page_count {
                effective_total - (page_count - 1) * page_size
            } else {
                page_size
            };
            Page { offset, size }
        })
        .collect();
    debug!(true_count, effective_total, page_size, page_count, "planned search pages");

    Ok(PagePlan {
        effective_total,
        page_size,
        pages,
    })
}
