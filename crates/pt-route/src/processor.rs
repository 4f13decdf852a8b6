//! Resampling of raw tracks into uniform kinematic profiles.

use tracing::{debug, warn};

use crate::error::{RouteError, RouteResult};
use crate::track::{RawTrack, TrackPoint};
use pt_core::{interp_clamped, kmh};

/// One route point after resampling.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct KinematicSample {
    /// Cumulative distance along the route (m), non-decreasing.
    pub distance_m: f64,
    /// Elevation (m).
    pub elevation_m: f64,
    /// Target speed derived from the recording (m/s).
    pub target_speed_mps: f64,
    /// Elapsed time since the start of the route (s), strictly increasing.
    pub target_time_s: f64,
    /// Whether the rider was judged to be moving at this sample. Non-moving
    /// samples stay in the profile so a continuous route can be replayed;
    /// they are only excluded from the moving statistics.
    pub is_moving: bool,
}

/// Route-level statistics computed during processing.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MovingStats {
    pub total_distance_m: f64,
    pub total_time_s: f64,
    pub moving_distance_m: f64,
    pub moving_time_s: f64,
    pub average_speed_mps: f64,
    pub moving_average_speed_mps: f64,
}

/// A uniformly resampled route, ready for the stepping loop.
#[derive(Clone, Debug, PartialEq)]
pub struct KinematicProfile {
    pub samples: Vec<KinematicSample>,
    pub stats: MovingStats,
}

impl KinematicProfile {
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Options for route processing.
#[derive(Clone, Copy, Debug)]
pub struct RouteOptions {
    /// Resampling interval on the time axis (s).
    pub sample_interval_s: f64,
    /// Moving-average window for distance/elevation smoothing (samples).
    pub smoothing_window: usize,
    /// Apply smoothing before resampling. Off by default: smoothing is not
    /// idempotent, so enabling it means reprocessing a processed profile
    /// will not reproduce it exactly.
    pub apply_smoothing: bool,
    /// Speeds below this are treated as stationary GPS dither (m/s).
    pub min_moving_speed_mps: f64,
    /// Speeds above this are treated as sensor error and clipped (m/s).
    pub max_plausible_speed_mps: f64,
    /// Half-width of the derivative window used for target speed (samples).
    pub speed_window: usize,
}

impl Default for RouteOptions {
    fn default() -> Self {
        Self {
            sample_interval_s: 1.0,
            smoothing_window: 5,
            apply_smoothing: false,
            min_moving_speed_mps: kmh(10.0).value,
            max_plausible_speed_mps: kmh(300.0).value,
            speed_window: 2,
        }
    }
}

/// Converts raw recorded tracks into [`KinematicProfile`]s.
///
/// Processing pipeline:
/// 1. validate the input (sample count, elevation/time presence)
/// 2. fill individually missing elevations/timestamps by interpolation
/// 3. normalize time to start at zero, drop non-increasing timestamps
/// 4. optional moving-average smoothing of distance and elevation
/// 5. linear interpolation onto a uniform time grid
/// 6. windowed central-difference target speed, clamped to the plausible range
/// 7. stationary-sample marking and moving statistics
///
/// All failures are data-quality errors raised here, never mid-simulation.
#[derive(Clone, Debug)]
pub struct RouteProcessor {
    opts: RouteOptions,
}

impl RouteProcessor {
    pub fn new(opts: RouteOptions) -> RouteResult<Self> {
        if !(opts.sample_interval_s > 0.0) {
            return Err(RouteError::InvalidOption {
                what: "sample_interval_s must be positive",
            });
        }
        if opts.max_plausible_speed_mps <= 0.0 {
            return Err(RouteError::InvalidOption {
                what: "max_plausible_speed_mps must be positive",
            });
        }
        if opts.min_moving_speed_mps < 0.0 {
            return Err(RouteError::InvalidOption {
                what: "min_moving_speed_mps cannot be negative",
            });
        }
        if opts.speed_window == 0 {
            return Err(RouteError::InvalidOption {
                what: "speed_window must be at least 1",
            });
        }
        if opts.apply_smoothing && opts.smoothing_window < 2 {
            return Err(RouteError::InvalidOption {
                what: "smoothing_window must be at least 2 when smoothing is on",
            });
        }
        Ok(Self { opts })
    }

    pub fn options(&self) -> &RouteOptions {
        &self.opts
    }

    pub fn process(&self, track: &RawTrack) -> RouteResult<KinematicProfile> {
        let points = track.to_track_points();
        if points.len() < 2 {
            return Err(RouteError::InsufficientData {
                count: points.len(),
            });
        }
        if points.iter().all(|p| p.elevation_m.is_none()) {
            return Err(RouteError::MissingElevation);
        }
        if points.iter().all(|p| p.time_s.is_none()) {
            return Err(RouteError::MissingTimestamps);
        }

        let mut distance: Vec<f64> = points.iter().map(|p| p.distance_m).collect();
        let mut elevation = fill_missing(&points, |p| p.elevation_m);
        let time = fill_missing(&points, |p| p.time_s);

        // Normalize time and keep only strictly increasing timestamps
        // (duplicate GPS fixes are common; keep the first of each run).
        let t0 = time[0];
        let mut kept_distance = Vec::with_capacity(points.len());
        let mut kept_elevation = Vec::with_capacity(points.len());
        let mut kept_time = Vec::with_capacity(points.len());
        for i in 0..points.len() {
            let t = time[i] - t0;
            if kept_time.last().is_none_or(|&last| t > last) {
                kept_distance.push(distance[i]);
                kept_elevation.push(elevation[i]);
                kept_time.push(t);
            }
        }
        distance = kept_distance;
        elevation = kept_elevation;
        let time = kept_time;

        if time.len() < 2 {
            return Err(RouteError::InsufficientData { count: time.len() });
        }

        if self.opts.apply_smoothing {
            distance = moving_average(&distance, self.opts.smoothing_window);
            elevation = moving_average(&elevation, self.opts.smoothing_window);
        }

        // Uniform time grid covering the recording.
        let dt = self.opts.sample_interval_s;
        let t_end = *time.last().expect("non-empty after dedupe");
        let n_grid = (t_end / dt).floor() as usize + 1;
        if n_grid < 2 {
            return Err(RouteError::InsufficientData { count: n_grid });
        }

        let grid_time: Vec<f64> = (0..n_grid).map(|i| i as f64 * dt).collect();
        let grid_distance: Vec<f64> = grid_time
            .iter()
            .map(|&t| interp_clamped(&time, &distance, t))
            .collect();
        let grid_elevation: Vec<f64> = grid_time
            .iter()
            .map(|&t| interp_clamped(&time, &elevation, t))
            .collect();

        for i in 1..n_grid {
            if grid_distance[i] < grid_distance[i - 1] - 1e-9 {
                return Err(RouteError::NonMonotonicDistance { index: i });
            }
        }

        // Target speed: windowed central difference, then clamp. A single
        // sample pair is too noisy for GPS data, so the derivative spans
        // `speed_window` samples each side where available.
        let w = self.opts.speed_window;
        let mut clipped = 0usize;
        let samples: Vec<KinematicSample> = (0..n_grid)
            .map(|i| {
                let lo = i.saturating_sub(w);
                let hi = (i + w).min(n_grid - 1);
                let raw_speed = (grid_distance[hi] - grid_distance[lo])
                    / (grid_time[hi] - grid_time[lo]);
                let speed = raw_speed.clamp(0.0, self.opts.max_plausible_speed_mps);
                if speed != raw_speed {
                    clipped += 1;
                }
                KinematicSample {
                    distance_m: grid_distance[i],
                    elevation_m: grid_elevation[i],
                    target_speed_mps: speed,
                    target_time_s: grid_time[i],
                    is_moving: speed >= self.opts.min_moving_speed_mps,
                }
            })
            .collect();

        if clipped > 0 {
            warn!(clipped, "clipped implausible target speeds");
        }

        let stats = compute_stats(&samples);
        debug!(
            samples = samples.len(),
            total_distance_m = stats.total_distance_m,
            moving_time_s = stats.moving_time_s,
            "route processed"
        );

        Ok(KinematicProfile { samples, stats })
    }
}

/// Re-ingest a processed profile as a raw track (e.g. to reprocess it at a
/// different interval, or to feed a pre-resampled profile to the engine).
impl From<&KinematicProfile> for RawTrack {
    fn from(profile: &KinematicProfile) -> Self {
        RawTrack::Distance(
            profile
                .samples
                .iter()
                .map(|s| TrackPoint::new(s.distance_m, s.elevation_m, s.target_time_s))
                .collect(),
        )
    }
}

fn compute_stats(samples: &[KinematicSample]) -> MovingStats {
    let first = &samples[0];
    let last = &samples[samples.len() - 1];
    let total_distance_m = last.distance_m - first.distance_m;
    let total_time_s = last.target_time_s - first.target_time_s;

    let mut moving_distance_m = 0.0;
    let mut moving_time_s = 0.0;
    for pair in samples.windows(2) {
        // An interval counts as moving if it starts on a moving sample.
        if pair[0].is_moving {
            moving_distance_m += pair[1].distance_m - pair[0].distance_m;
            moving_time_s += pair[1].target_time_s - pair[0].target_time_s;
        }
    }

    let average_speed_mps = if total_time_s > 0.0 {
        total_distance_m / total_time_s
    } else {
        0.0
    };
    let moving_average_speed_mps = if moving_time_s > 0.0 {
        moving_distance_m / moving_time_s
    } else {
        0.0
    };

    MovingStats {
        total_distance_m,
        total_time_s,
        moving_distance_m,
        moving_time_s,
        average_speed_mps,
        moving_average_speed_mps,
    }
}

/// Fill individually missing values by interpolating between known
/// neighbours; runs at either end take the nearest known value.
fn fill_missing(points: &[TrackPoint], get: impl Fn(&TrackPoint) -> Option<f64>) -> Vec<f64> {
    let known: Vec<(usize, f64)> = points
        .iter()
        .enumerate()
        .filter_map(|(i, p)| get(p).map(|v| (i, v)))
        .collect();
    debug_assert!(!known.is_empty(), "caller validates presence");

    let xs: Vec<f64> = known.iter().map(|&(i, _)| i as f64).collect();
    let ys: Vec<f64> = known.iter().map(|&(_, v)| v).collect();

    (0..points.len())
        .map(|i| match get(&points[i]) {
            Some(v) => v,
            None => interp_clamped(&xs, &ys, i as f64),
        })
        .collect()
}

/// Centered moving average with the window truncated at the ends, so no
/// zero-padding artifacts leak into the profile boundaries.
fn moving_average(values: &[f64], window: usize) -> Vec<f64> {
    let half = window / 2;
    (0..values.len())
        .map(|i| {
            let lo = i.saturating_sub(half);
            let hi = (i + half).min(values.len() - 1);
            let slice = &values[lo..=hi];
            slice.iter().sum::<f64>() / slice.len() as f64
        })
        .collect()
}
