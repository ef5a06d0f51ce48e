//! Analysis modules.
//!
//! Turns fetched posts into monthly em dash statistics.

pub mod aggregator;

pub use aggregator::*;
