//! pt-core: stable foundation for the powertrain simulation engine.
//!
//! Contains:
//! - units (uom SI types + constructors + physical constants)
//! - numeric (Real + tolerances + float helpers)
//! - ids (stable compact IDs for component-tree objects)
//! - error (shared error types)

pub mod error;
pub mod ids;
pub mod numeric;
pub mod units;

// Re-exports: nice ergonomics for downstream crates
pub use error::{PtError, PtResult};
pub use ids::*;
pub use numeric::*;
pub use units::*;
