//! # Query Engine
//!
//! Runs one paginated report query: compile, count, paginate, select.
//!
//! The count and the page select are two store round-trips against the same
//! predicate and parameters. They are not wrapped in a transaction, so a
//! report inserted between them can appear in the page while missing from
//! `total_matches`. That window is accepted.

use std::sync::Arc;

use serde::Serialize;

use crate::criteria::FilterCriteria;
use crate::error::{QueryError, QueryResult};
use crate::paginate::{paginate, PageRequest};
use crate::params::RawParams;
use crate::predicate::CompiledPredicate;
use crate::report::ReportSummary;
use crate::store::ReportStore;

/// One page of a report listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageResult {
    /// Newest id first.
    pub rows: Vec<ReportSummary>,
    pub total_matches: u64,
    pub page_number: u64,
    pub page_size: u64,
    /// 0-based offset of `rows[0]` within the full match set.
    pub range_start: u64,
}

/// Executes report queries against a [`ReportStore`].
pub struct QueryEngine<S> {
    store: Arc<S>,
}

impl<S> Clone for QueryEngine<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

impl<S: ReportStore> QueryEngine<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Parse filter and page parameters, then execute.
    ///
    /// Both parses complete before the store is touched.
    pub async fn execute_params(&self, params: &RawParams) -> QueryResult<PageResult> {
        let criteria = FilterCriteria::from_params(params)?;
        let page = PageRequest::from_params(params)?;
        self.execute(&criteria, page).await
    }

    /// Execute validated criteria.
    pub async fn execute(
        &self,
        criteria: &FilterCriteria,
        page: PageRequest,
    ) -> QueryResult<PageResult> {
        let predicate = criteria.compile();
        tracing::debug!("search generated query: {}", predicate);
        self.execute_predicate(&predicate, page).await
    }

    /// Execute an already-built predicate.
    pub async fn execute_predicate(
        &self,
        predicate: &CompiledPredicate,
        page: PageRequest,
    ) -> QueryResult<PageResult> {
        let total_matches = self
            .store
            .count(predicate)
            .await
            .map_err(|e| storage_failure("count", predicate, e))?;
        tracing::debug!("{} reports match {}", total_matches, predicate.where_clause());

        let window = paginate(&page, total_matches)?;

        let rows = self
            .store
            .select_page(predicate, window.range_start, window.limit)
            .await
            .map_err(|e| storage_failure("select", predicate, e))?;

        Ok(PageResult {
            rows,
            total_matches,
            page_number: page.page_number(),
            page_size: page.page_size(),
            range_start: window.range_start,
        })
    }
}

fn storage_failure(
    stage: &str,
    predicate: &CompiledPredicate,
    err: crate::store::StoreFailure,
) -> QueryError {
    tracing::error!(
        "report {} failed: {} (query: {})",
        stage,
        err,
        predicate
    );
    QueryError::StorageFailure(format!("report {} failed", stage))
}
