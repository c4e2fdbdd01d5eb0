use crate::catalog::Catalog;
use crate::error::QueryError;
use crate::paginate::{check_page, paginate};
use crate::query::{rank, Weights};
use crate::track::Track;
use serde::Serialize;
use std::num::NonZeroUsize;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub struct QueryRequest {
    pub search_term: String,
    pub weights: Weights,
    pub page: i64,
}

impl Default for QueryRequest {
    fn default() -> Self {
        Self { search_term: String::new(), weights: Weights::new(), page: 1 }
    }
}

impl QueryRequest {
    pub fn new(search_term: impl Into<String>, weights: Weights, page: i64) -> Self {
        Self { search_term: search_term.into(), weights, page }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResult<'a> {
    pub records: Vec<&'a Track>,
    pub page: usize,
    pub max_page: usize,
    pub page_size: usize,
    pub total_hits: usize,
}

/// Runs queries against one catalog snapshot with a fixed page size.
#[derive(Debug, Clone)]
pub struct QueryEngine {
    catalog: Arc<Catalog>,
    page_size: NonZeroUsize,
}

impl QueryEngine {
    pub fn new(catalog: Arc<Catalog>, page_size: NonZeroUsize) -> Self {
        Self { catalog, page_size }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn page_size(&self) -> NonZeroUsize {
        self.page_size
    }

    pub fn query(&self, request: &QueryRequest) -> Result<QueryResult<'_>, QueryError> {
        // rejected before any ranking work
        check_page(request.page)?;
        let ranked = rank(
            self.catalog.tracks(),
            self.catalog.normalization(),
            &request.search_term,
            &request.weights,
        )?;
        let page = paginate(ranked, request.page, self.page_size)?;
        tracing::debug!(
            search = %request.search_term,
            weights = request.weights.len(),
            hits = page.total,
            page = page.page,
            max_page = page.max_page,
            "query executed"
        );
        Ok(QueryResult {
            records: page.items.into_iter().map(|r| r.track).collect(),
            page: page.page,
            max_page: page.max_page,
            page_size: page.page_size,
            total_hits: page.total,
        })
    }
}
