//! Raw track representations and distance reconstruction.

use pt_core::units::constants::EARTH_RADIUS_M;

/// One recorded geographic sample (GPS fix).
#[derive(Clone, Copy, Debug)]
pub struct GeoPoint {
    pub lat_deg: f64,
    pub lon_deg: f64,
    /// Elevation above sea level (m); `None` when the recorder dropped it.
    pub elevation_m: Option<f64>,
    /// Elapsed or absolute time (s); `None` when the recorder dropped it.
    pub time_s: Option<f64>,
}

/// One recorded distance-based sample.
#[derive(Clone, Copy, Debug)]
pub struct TrackPoint {
    /// Cumulative distance along the route (m).
    pub distance_m: f64,
    pub elevation_m: Option<f64>,
    pub time_s: Option<f64>,
}

impl TrackPoint {
    pub fn new(distance_m: f64, elevation_m: f64, time_s: f64) -> Self {
        Self {
            distance_m,
            elevation_m: Some(elevation_m),
            time_s: Some(time_s),
        }
    }
}

/// A raw recorded route, before resampling.
#[derive(Clone, Debug)]
pub enum RawTrack {
    /// Geographic fixes; cumulative distance is reconstructed from
    /// great-circle segments combined with elevation change.
    Geographic(Vec<GeoPoint>),
    /// Samples that already carry a cumulative distance axis.
    Distance(Vec<TrackPoint>),
}

impl RawTrack {
    pub fn len(&self) -> usize {
        match self {
            RawTrack::Geographic(points) => points.len(),
            RawTrack::Distance(points) => points.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Flatten to distance-based points.
    ///
    /// For geographic tracks each segment length is the hypotenuse of the
    /// flat great-circle distance and the elevation delta, accumulated from
    /// zero. Missing elevations contribute no vertical component.
    pub fn to_track_points(&self) -> Vec<TrackPoint> {
        match self {
            RawTrack::Distance(points) => points.clone(),
            RawTrack::Geographic(points) => {
                let mut out = Vec::with_capacity(points.len());
                let mut cumulative_m = 0.0;
                for (i, p) in points.iter().enumerate() {
                    if i > 0 {
                        let prev = &points[i - 1];
                        let flat = haversine_m(prev.lat_deg, prev.lon_deg, p.lat_deg, p.lon_deg);
                        let rise = match (prev.elevation_m, p.elevation_m) {
                            (Some(a), Some(b)) => b - a,
                            _ => 0.0,
                        };
                        cumulative_m += (flat * flat + rise * rise).sqrt();
                    }
                    out.push(TrackPoint {
                        distance_m: cumulative_m,
                        elevation_m: p.elevation_m,
                        time_s: p.time_s,
                    });
                }
                out
            }
        }
    }
}

/// Great-circle distance between two fixes (m), haversine formula.
pub fn haversine_m(lat1_deg: f64, lon1_deg: f64, lat2_deg: f64, lon2_deg: f64) -> f64 {
    let lat1 = lat1_deg.to_radians();
    let lat2 = lat2_deg.to_radians();
    let dlat = (lat2_deg - lat1_deg).to_radians();
    let dlon = (lon2_deg - lon1_deg).to_radians();

    let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_M * c
}
