//! Test utilities and mock types for arena-mr development.
//!
//! Provides [`MockUpstream`], an instrumented [`Upstream`] that counts
//! acquisitions and releases, enforces an optional byte limit, and
//! checks that every release matches an earlier acquisition.
//!
//! [`Upstream`]: arena_mr_core::Upstream

#![deny(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod upstream;

pub use upstream::MockUpstream;
