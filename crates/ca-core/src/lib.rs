//! # ca-core — The "Compiler" of CrashArchive
//!
//! Turns ad-hoc report search parameters into a safe, deterministic
//! predicate and pages through the matching reports.
//!
//! - [`criteria`] validates raw parameters and compiles them.
//! - [`paginate`] maps a page request onto a row window.
//! - [`engine`] runs count → paginate → select against a [`ReportStore`].
//!
//! Nothing here holds shared mutable state; every value lives for one request.

pub mod criteria;
pub mod engine;
pub mod error;
pub mod paginate;
pub mod params;
pub mod predicate;
pub mod report;
pub mod store;
pub mod versions;

pub use criteria::{compile, BuildComparator, BuildFilter, FilterCriteria, IdRange};
pub use engine::{PageResult, QueryEngine};
pub use error::{QueryError, QueryResult};
pub use paginate::{paginate, PageRequest, Pagination, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
pub use params::RawParams;
pub use predicate::{CompareOp, CompiledPredicate, Param, PredicateBuilder};
pub use report::{Involvement, ReportSummary};
pub use store::{ReportStore, StoreFailure};
