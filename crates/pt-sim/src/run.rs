//! The outer simulation loop: step a vehicle along a whole route.

use crate::error::{SimError, SimResult};
use crate::vehicle::Vehicle;
use pt_components::ResolveOptions;
use pt_results::{
    ComponentSnapshot, RunManifest, RunSummary, SourceConsumptionSnapshot, SourceSnapshot,
    StepRecord, make_run_id,
};
use pt_route::KinematicProfile;
use rayon::prelude::*;
use tracing::info;

/// Options for simulation runs.
#[derive(Clone, Debug)]
pub struct SimOptions {
    pub resolve: ResolveOptions,
    /// Recover surplus kinetic energy into electrical storage before
    /// burning it in the brakes.
    pub regen_enabled: bool,
    /// Record every N-th step (decimation). The final step is always
    /// recorded.
    pub record_every: usize,
}

impl Default for SimOptions {
    fn default() -> Self {
        Self {
            resolve: ResolveOptions::default(),
            regen_enabled: true,
            record_every: 1,
        }
    }
}

/// A completed run: manifest with aggregates, plus the recorded steps.
#[derive(Clone, Debug)]
pub struct RunRecord {
    pub manifest: RunManifest,
    pub steps: Vec<StepRecord>,
}

/// Step the vehicle along the profile, one transition per sample pair.
///
/// The vehicle starts at the first sample's target speed. Energy state is
/// whatever the vehicle currently holds: runs are resumable by design, and
/// [`Vehicle::refill_sources`] is the explicit reset.
///
/// # Errors
/// Returns an error for malformed options or profiles; never for energy
/// shortfalls along the way.
pub fn run_route(
    vehicle: &mut Vehicle,
    route_label: &str,
    profile: &KinematicProfile,
    opts: &SimOptions,
) -> SimResult<RunRecord> {
    if opts.record_every == 0 {
        return Err(SimError::InvalidArg {
            what: "record_every must be positive",
        });
    }
    if profile.len() < 2 {
        return Err(SimError::InvalidArg {
            what: "profile needs at least two samples",
        });
    }

    let samples = &profile.samples;
    let initial_levels = vehicle.source_levels()?;

    let mut summary = RunSummary {
        distance_m: samples[samples.len() - 1].distance_m - samples[0].distance_m,
        duration_s: samples[samples.len() - 1].target_time_s - samples[0].target_time_s,
        min_speed_mps: f64::INFINITY,
        ..RunSummary::default()
    };

    let mut speed_mps = samples[0].target_speed_mps;
    let mut speed_time_product = 0.0;
    let mut steps = Vec::with_capacity(samples.len() / opts.record_every + 1);

    for (i, pair) in samples.windows(2).enumerate() {
        let (current, next) = (&pair[0], &pair[1]);
        let outcome = vehicle.step(speed_mps, current, next, &opts.resolve, opts.regen_enabled)?;
        let dt_s = next.target_time_s - current.target_time_s;

        speed_mps = outcome.achieved_speed_mps;
        if next.is_moving {
            summary.moving_time_s += dt_s;
        }
        summary.energy_demanded_j += outcome.demand_j;
        summary.energy_delivered_j += outcome.delivered_j;
        summary.shortfall_j += outcome.shortfall_j;
        summary.braking_loss_j += outcome.braking_loss_j;
        summary.regenerated_j += outcome.regenerated_j;
        summary.steps_under_target += usize::from(outcome.under_target);
        summary.min_speed_mps = summary.min_speed_mps.min(speed_mps);
        summary.max_speed_mps = summary.max_speed_mps.max(speed_mps);
        speed_time_product += speed_mps * dt_s;

        let is_last = i + 2 == samples.len();
        if (i + 1) % opts.record_every == 0 || is_last {
            steps.push(StepRecord {
                time_s: next.target_time_s,
                distance_m: next.distance_m,
                elevation_m: next.elevation_m,
                target_speed_mps: next.target_speed_mps,
                achieved_speed_mps: outcome.achieved_speed_mps,
                demand_j: outcome.demand_j,
                delivered_j: outcome.delivered_j,
                shortfall_j: outcome.shortfall_j,
                braking_loss_j: outcome.braking_loss_j,
                regenerated_j: outcome.regenerated_j,
                under_target: outcome.under_target,
                components: outcome
                    .rows
                    .iter()
                    .map(|row| ComponentSnapshot {
                        index: row.id.index(),
                        name: row.name.clone(),
                        delivered_j: row.delivered_j,
                    })
                    .collect(),
                sources: vehicle
                    .source_levels()?
                    .into_iter()
                    .map(|level| SourceSnapshot {
                        index: level.id.index(),
                        name: level.name,
                        remaining_j: level.remaining_j,
                        capacity_j: level.capacity_j,
                    })
                    .collect(),
            });
        }
    }

    if summary.duration_s > 0.0 {
        summary.mean_speed_mps = speed_time_product / summary.duration_s;
    }
    summary.source_consumption = vehicle
        .source_levels()?
        .into_iter()
        .zip(initial_levels)
        .map(|(level, initial)| {
            let consumed_j = initial.remaining_j - level.remaining_j;
            // Range estimate from this source's average burn rate (J/m).
            let estimated_range_m = (consumed_j > 0.0 && summary.distance_m > 0.0)
                .then(|| level.remaining_j / (consumed_j / summary.distance_m));
            SourceConsumptionSnapshot {
                name: level.name,
                consumed_j,
                remaining_j: level.remaining_j,
                capacity_j: level.capacity_j,
                estimated_range_m,
            }
        })
        .collect();
    if summary.distance_m > 0.0 {
        let total_consumed_j: f64 = summary
            .source_consumption
            .iter()
            .map(|s| s.consumed_j)
            .sum();
        summary.avg_consumption_j_per_m = total_consumed_j / summary.distance_m;
    }

    info!(
        route = route_label,
        distance_m = summary.distance_m,
        shortfall_j = summary.shortfall_j,
        under_target = summary.steps_under_target,
        "route simulated"
    );

    let sample_interval_s = samples[1].target_time_s - samples[0].target_time_s;
    let manifest = RunManifest::new(
        make_run_id(vehicle.name()),
        vehicle.name(),
        route_label,
        sample_interval_s,
        samples.len() - 1,
        summary,
    );

    Ok(RunRecord { manifest, steps })
}

/// Simulate many routes in parallel, one fresh vehicle per route.
pub fn run_batch<F>(
    routes: &[(String, KinematicProfile)],
    vehicle_factory: F,
    opts: &SimOptions,
) -> Vec<SimResult<RunRecord>>
where
    F: Fn() -> SimResult<Vehicle> + Sync,
{
    routes
        .par_iter()
        .map(|(label, profile)| {
            let mut vehicle = vehicle_factory()?;
            run_route(&mut vehicle, label, profile, opts)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sim_options_defaults() {
        let opts = SimOptions::default();
        assert!(opts.regen_enabled);
        assert_eq!(opts.record_every, 1);
        assert_eq!(opts.resolve.max_iterations, 8);
    }
}
