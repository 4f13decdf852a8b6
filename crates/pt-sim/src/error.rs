//! Error types for the simulation engine.

use pt_components::PowertrainError;
use pt_core::PtError;
use pt_route::RouteError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SimError {
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error("Powertrain error: {0}")]
    Powertrain(#[from] PowertrainError),

    #[error("Route error: {0}")]
    Route(#[from] RouteError),

    #[error("Core error: {0}")]
    Core(#[from] PtError),
}

pub type SimResult<T> = Result<T, SimError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn powertrain_errors_convert() {
        let err: SimError = PowertrainError::InvalidArg { what: "dt" }.into();
        assert!(err.to_string().contains("dt"));
    }
}
