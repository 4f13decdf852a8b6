//! Result data types.

use serde::{Deserialize, Serialize};

pub type RunId = String;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunManifest {
    pub run_id: RunId,
    pub vehicle: String,
    pub route: String,
    pub timestamp: String,
    pub sample_interval_s: f64,
    pub steps: usize,
    pub summary: RunSummary,
}

impl RunManifest {
    /// Stamp a manifest with the current UTC time.
    pub fn new(
        run_id: RunId,
        vehicle: impl Into<String>,
        route: impl Into<String>,
        sample_interval_s: f64,
        steps: usize,
        summary: RunSummary,
    ) -> Self {
        Self {
            run_id,
            vehicle: vehicle.into(),
            route: route.into(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            sample_interval_s,
            steps,
            summary,
        }
    }
}

/// Whole-run aggregates.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RunSummary {
    pub distance_m: f64,
    pub duration_s: f64,
    /// Time spent above the moving threshold on the target profile.
    pub moving_time_s: f64,
    pub energy_demanded_j: f64,
    pub energy_delivered_j: f64,
    pub shortfall_j: f64,
    pub braking_loss_j: f64,
    pub regenerated_j: f64,
    pub mean_speed_mps: f64,
    pub min_speed_mps: f64,
    pub max_speed_mps: f64,
    /// Steps where the achieved speed fell short of the target.
    pub steps_under_target: usize,
    /// Whole-vehicle average consumption over the run (J/m).
    pub avg_consumption_j_per_m: f64,
    pub source_consumption: Vec<SourceConsumptionSnapshot>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConsumptionSnapshot {
    pub name: String,
    pub consumed_j: f64,
    pub remaining_j: f64,
    pub capacity_j: f64,
    /// Distance this source could still cover at its average consumption
    /// rate over the run. `None` when the source was never drawn from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_range_m: Option<f64>,
}

impl SourceConsumptionSnapshot {
    pub fn percent_remaining(&self) -> f64 {
        if self.capacity_j > 0.0 {
            100.0 * self.remaining_j / self.capacity_j
        } else {
            0.0
        }
    }
}

/// One simulated timestep.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRecord {
    pub time_s: f64,
    pub distance_m: f64,
    pub elevation_m: f64,
    pub target_speed_mps: f64,
    pub achieved_speed_mps: f64,
    pub demand_j: f64,
    pub delivered_j: f64,
    pub shortfall_j: f64,
    pub braking_loss_j: f64,
    pub regenerated_j: f64,
    pub under_target: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<ComponentSnapshot>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<SourceSnapshot>,
}

/// Per-component delivery within a step, in tree preorder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentSnapshot {
    pub index: u32,
    pub name: String,
    pub delivered_j: f64,
}

/// Reservoir fill level after a step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceSnapshot {
    pub index: u32,
    pub name: String,
    pub remaining_j: f64,
    pub capacity_j: f64,
}

/// A filesystem-friendly run id: vehicle slug plus a UTC stamp.
pub fn make_run_id(vehicle: &str) -> RunId {
    let slug: String = vehicle
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '-' })
        .collect();
    let stamp = chrono::Utc::now().format("%Y%m%dT%H%M%S%3fZ");
    format!("{slug}-{stamp}")
}
