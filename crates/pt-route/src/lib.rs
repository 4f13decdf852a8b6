//! pt-route: turns raw recorded tracks into uniform kinematic profiles.
//!
//! The input is an ordered sequence of recorded samples, either geographic
//! (lat/lon/elevation/time) or already distance-based. The output is a
//! [`KinematicProfile`]: cumulative distance, elevation, target speed and
//! elapsed time on a uniform time grid, plus moving statistics.
//!
//! All data-quality problems are reported before simulation starts; the
//! processor never fails mid-profile.

pub mod error;
pub mod processor;
pub mod track;

pub use error::{RouteError, RouteResult};
pub use processor::{KinematicProfile, KinematicSample, MovingStats, RouteOptions, RouteProcessor};
pub use track::{GeoPoint, RawTrack, TrackPoint};
