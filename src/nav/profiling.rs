//! Performance profiling utilities
//!
//! The guard is only compiled when the `perf_stats` feature is enabled.

pub use lodestar_macros::profile;
