//! # ca-verify — The "Law" of CrashArchive
//!
//! Kani proofs for the pagination arithmetic and predicate assembly.
//!
//! # Proof: Page Window
//!
//! For every page request that passes validation and every result count,
//! [`paginate`](ca_core::paginate) either rejects the page as not found or
//! returns a window that starts inside the result set. Page 1 is never
//! rejected and the offset never overflows.

extern crate ca_core;

#[cfg(kani)]
use ca_core::{paginate, CompareOp, IdRange, PageRequest, PredicateBuilder, QueryError};

#[cfg(kani)]
mod proofs {
    use super::*;

    /// **Proof: Validation bounds**
    ///
    /// Any request accepted by `PageRequest::new` has a page number of at
    /// least 1 and a page size inside `1..=MAX_PAGE_SIZE`.
    #[kani::proof]
    fn verify_page_request_bounds() {
        let page: u64 = kani::any();
        let size: u64 = kani::any();

        if let Ok(request) = PageRequest::new(page, size) {
            assert!(request.page_number() >= 1);
            assert!(request.page_size() >= 1);
            assert!(request.page_size() <= ca_core::MAX_PAGE_SIZE);
        }
    }

    /// **Proof: First page always succeeds**
    #[kani::proof]
    fn verify_first_page_never_fails() {
        let size: u64 = kani::any();
        let total: u64 = kani::any();
        kani::assume(size >= 1 && size <= ca_core::MAX_PAGE_SIZE);

        let request = PageRequest::new(1, size).unwrap();
        let window = paginate(&request, total).unwrap();
        assert!(window.range_start == 0);
        assert!(window.limit == size);
    }

    /// **Proof: Window starts inside the result set**
    ///
    /// If page N > 1 is served, `range_start = (N - 1) * size < total`.
    /// Otherwise the error is `NotFound`, never anything else.
    #[kani::proof]
    fn verify_window_inside_results() {
        let page: u64 = kani::any();
        let size: u64 = kani::any();
        let total: u64 = kani::any();
        kani::assume(page >= 2);
        kani::assume(size >= 1 && size <= ca_core::MAX_PAGE_SIZE);

        let request = PageRequest::new(page, size).unwrap();
        match paginate(&request, total) {
            Ok(window) => {
                assert!(window.range_start < total);
                assert!(window.range_start == (page - 1) * size);
                assert!(window.limit == size);
            }
            Err(err) => assert!(matches!(err, QueryError::NotFound(_))),
        }
    }

    /// **Proof: Id range ordering**
    #[kani::proof]
    fn verify_id_range_ordered() {
        let min: u64 = kani::any();
        let max: u64 = kani::any();

        match IdRange::new(min, max) {
            Some(range) => assert!(range.min() <= range.max()),
            None => assert!(min > max),
        }
    }

    /// **Proof: Placeholders match parameters**
    ///
    /// Every clause the builder emits carries exactly as many `?` as it
    /// pushes parameters, so positional binding cannot drift.
    #[kani::proof]
    fn verify_placeholders_match_params() {
        let low: u64 = kani::any();
        let high: u64 = kani::any();
        let build: u64 = kani::any();
        let with_range: bool = kani::any();

        let mut builder = PredicateBuilder::new().is_false("duplicate");
        if with_range {
            builder = builder.between("id", low, high);
        }
        let predicate = builder.compare("build", CompareOp::Gt, build).build();

        assert!(predicate.placeholder_count() == predicate.params().len());
    }
}

// Kani proofs are compiled only under cfg(kani).
// Run `cargo kani --package ca-verify` to execute them.
#[cfg(not(kani))]
pub fn _proof_placeholder() {}
