//! Error types for route processing.

use pt_core::PtError;
use thiserror::Error;

/// Data-quality errors raised before a simulation starts.
#[derive(Error, Debug, Clone)]
pub enum RouteError {
    #[error("Insufficient track data: {count} samples (need at least 2)")]
    InsufficientData { count: usize },

    #[error("Track has no elevation data at all")]
    MissingElevation,

    #[error("Track has no timestamp data at all")]
    MissingTimestamps,

    #[error("Resampled distance axis is non-monotonic at sample {index}")]
    NonMonotonicDistance { index: usize },

    #[error("Invalid option: {what}")]
    InvalidOption { what: &'static str },
}

pub type RouteResult<T> = Result<T, RouteError>;

impl From<RouteError> for PtError {
    fn from(e: RouteError) -> Self {
        match e {
            RouteError::NonMonotonicDistance { .. } => PtError::Invariant {
                what: "non-monotonic resampled distance axis",
            },
            RouteError::InvalidOption { what } => PtError::InvalidArg { what },
            _ => PtError::InvalidArg {
                what: "malformed track data",
            },
        }
    }
}
