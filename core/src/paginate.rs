use crate::error::QueryError;
use serde::Serialize;
use std::num::NonZeroUsize;

/// One window of an ordered result sequence.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub max_page: usize,
    pub page_size: usize,
    pub total: usize,
}

/// `floor(count / page_size) + 1`. An exact multiple still gets a trailing empty page.
pub fn max_page(count: usize, page_size: NonZeroUsize) -> usize {
    count / page_size.get() + 1
}

/// Pages are numbered from 1. Anything past the end is clamped later, not rejected.
pub fn check_page(requested_page: i64) -> Result<(), QueryError> {
    if requested_page < 1 {
        return Err(QueryError::invalid(format!("page must be at least 1, got {requested_page}")));
    }
    Ok(())
}

/// Slice `items` to `requested_page`, clamping pages past the end to the last page.
/// Pages below 1 are rejected.
pub fn paginate<T>(items: Vec<T>, requested_page: i64, page_size: NonZeroUsize) -> Result<Page<T>, QueryError> {
    check_page(requested_page)?;
    let total = items.len();
    let max_page = max_page(total, page_size);
    let page = usize::try_from(requested_page).map_or(max_page, |p| p.min(max_page));

    let start = (page - 1) * page_size.get();
    let items = items.into_iter().skip(start).take(page_size.get()).collect();
    Ok(Page { items, page, max_page, page_size: page_size.get(), total })
}
