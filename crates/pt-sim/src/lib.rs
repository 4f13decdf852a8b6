//! pt-sim: the simulation engine.
//!
//! Couples a [`Vehicle`] (chassis losses plus an owned powertrain tree) to
//! a resampled route profile. Each step computes the energy the route
//! transition demands, resolves it against the powertrain, and integrates
//! the achieved speed from what was actually delivered: an underpowered or
//! depleted powertrain makes the vehicle fall behind the recording rather
//! than failing the run.

pub mod error;
pub mod run;
pub mod sinks;
pub mod vehicle;

pub use error::{SimError, SimResult};
pub use run::{RunRecord, SimOptions, run_batch, run_route};
pub use sinks::{EnergySink, StepConditions};
pub use vehicle::{StepOutcome, Vehicle, VehicleSpec, WheelSpec};
