//! Error types for powertrain components.

use pt_core::PtError;
use thiserror::Error;

/// Errors that can occur while building or resolving a component tree.
#[derive(Error, Debug, Clone)]
pub enum PowertrainError {
    #[error("Non-physical value: {what}")]
    NonPhysical { what: &'static str },

    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error("Inconsistent tree: {what}")]
    InconsistentTree { what: String },

    #[error("Missing operating point: {what}")]
    MissingOperatingPoint { what: &'static str },
}

pub type PowertrainResult<T> = Result<T, PowertrainError>;

impl From<PowertrainError> for PtError {
    fn from(e: PowertrainError) -> Self {
        match e {
            PowertrainError::NonPhysical { what } => PtError::InvalidArg { what },
            PowertrainError::InvalidArg { what } => PtError::InvalidArg { what },
            PowertrainError::InconsistentTree { .. } => PtError::Invariant {
                what: "inconsistent component tree",
            },
            PowertrainError::MissingOperatingPoint { what } => PtError::InvalidArg { what },
        }
    }
}
