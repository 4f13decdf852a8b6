//! pt-components: the powertrain component tree and its energy-resolution
//! protocol.
//!
//! A powertrain is a strictly-owned tree of [`Component`]s: power converters
//! (engine, motor, gearbox), a brake, and stateful [`EnergySource`]s (fuel,
//! battery). Each timestep the vehicle asks the root to deliver a demanded
//! amount of energy; the iterative resolution protocol distributes the
//! demand across the tree, honoring each leaf's power and capacity limits
//! and each converter's efficiency.

pub mod component;
pub mod efficiency;
pub mod error;
pub mod library;
pub mod resolve;
pub mod source;

pub use component::{Component, ComponentKind, Domain};
pub use efficiency::{EfficiencyCurve, OperatingPoint};
pub use error::{PowertrainError, PowertrainResult};
pub use resolve::{Allocation, DeliveryRow, Resolution, ResolveOptions, SourceLevelRow};
pub use source::{Delivery, EnergySource, SourceKind};
