//! Test utilities and workload generators for tagheap development.
//!
//! - [`workload`]: seeded random allocation workloads shared by the
//!   integration tests and the benchmarks.
//! - [`pattern`]: byte patterns for checking that allocations do not
//!   overlap each other or the allocator's boundary tags.
//! - [`init_tracing`]: opt-in log output for a test run.

#![deny(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod pattern;
pub mod workload;

pub use workload::{WorkItem, Workload};

/// Install a test-friendly `tracing` subscriber filtered by `RUST_LOG`.
///
/// Safe to call from every test; only the first call installs anything.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
