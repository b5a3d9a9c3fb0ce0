//! # Report Store Boundary
//!
//! The persistence engine the query engine reads from. Implementations bind
//! [`CompiledPredicate::params`] positionally against the `?` placeholders in
//! [`CompiledPredicate::where_clause`]; they never splice parameter values
//! into query text.

use crate::predicate::CompiledPredicate;
use crate::report::ReportSummary;

/// Boxed store error. Implementations surface their own error types; the
/// engine only needs to log and classify them.
pub type StoreFailure = Box<dyn std::error::Error + Send + Sync>;

/// Read-only view of the crash report collection.
#[async_trait::async_trait]
pub trait ReportStore: Send + Sync {
    /// Number of reports matching `predicate`.
    async fn count(&self, predicate: &CompiledPredicate) -> Result<u64, StoreFailure>;

    /// Reports matching `predicate`, ordered by id descending, skipping
    /// `offset` rows and returning at most `limit`.
    async fn select_page(
        &self,
        predicate: &CompiledPredicate,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<ReportSummary>, StoreFailure>;
}
