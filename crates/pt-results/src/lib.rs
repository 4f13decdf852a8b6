//! pt-results: serializable run records and summaries.
//!
//! The simulation engine produces these; how they are stored or exported is
//! the caller's business.

pub mod types;

pub use types::*;
