//! The vehicle: a powertrain tree plus the loss model acting on it.

use crate::error::{SimError, SimResult};
use crate::sinks::{EnergySink, StepConditions};
use pt_components::{Component, DeliveryRow, ResolveOptions, SourceLevelRow};
use pt_core::ensure_finite;
use pt_core::units::{Area, Length, Mass, MomentOfInertia};
use pt_route::KinematicSample;
use tracing::debug;

/// One wheel's contribution to the loss model.
#[derive(Clone, Copy, Debug)]
pub struct WheelSpec {
    pub radius: Length,
    pub inertia: MomentOfInertia,
    pub rolling_resistance: f64,
}

/// Chassis-level parameters, everything except the powertrain.
#[derive(Clone, Debug)]
pub struct VehicleSpec {
    pub name: String,
    /// Dry mass excluding the powertrain components.
    pub dry_mass: Mass,
    /// Share of the total mass carried by the front wheel.
    pub front_mass_ratio: f64,
    pub front_wheel: WheelSpec,
    pub rear_wheel: WheelSpec,
    pub frontal_area: Area,
    pub drag_coefficient: f64,
}

/// Outcome of one simulated step.
#[derive(Clone, Debug)]
pub struct StepOutcome {
    pub achieved_speed_mps: f64,
    /// Total energy the step asked the powertrain for (J).
    pub demand_j: f64,
    pub delivered_j: f64,
    pub shortfall_j: f64,
    /// Surplus kinetic energy dumped into friction braking (J).
    pub braking_loss_j: f64,
    /// Surplus kinetic energy recovered into storage (J).
    pub regenerated_j: f64,
    /// The achieved speed fell short of the target.
    pub under_target: bool,
    /// Per-component delivery breakdown, tree preorder.
    pub rows: Vec<DeliveryRow>,
}

/// A complete vehicle: chassis losses plus an owned powertrain.
///
/// Construction is the only fatal error class: the tree is validated and
/// ids are assigned here, so stepping can only fail on malformed arguments,
/// never on route data.
#[derive(Clone, Debug)]
pub struct Vehicle {
    name: String,
    dry_mass_kg: f64,
    rear_wheel_radius_m: f64,
    sinks: Vec<EnergySink>,
    powertrain: Component,
}

impl Vehicle {
    /// # Errors
    /// Returns an error if the spec is non-physical or the powertrain tree
    /// is inconsistent (duplicate names, domain mismatches).
    pub fn new(spec: VehicleSpec, mut powertrain: Component) -> SimResult<Self> {
        ensure_finite(spec.dry_mass.value, "vehicle dry mass")?;
        ensure_finite(spec.frontal_area.value, "frontal area")?;
        ensure_finite(spec.drag_coefficient, "drag coefficient")?;
        ensure_finite(spec.front_mass_ratio, "front mass ratio")?;
        if spec.dry_mass.value < 0.0 {
            return Err(SimError::InvalidArg {
                what: "dry mass cannot be negative",
            });
        }
        if !(0.0..=1.0).contains(&spec.front_mass_ratio) {
            return Err(SimError::InvalidArg {
                what: "front mass ratio must be within [0, 1]",
            });
        }
        for wheel in [&spec.front_wheel, &spec.rear_wheel] {
            if wheel.radius.value <= 0.0 {
                return Err(SimError::InvalidArg {
                    what: "wheel radius must be positive",
                });
            }
            if wheel.inertia.value < 0.0 {
                return Err(SimError::InvalidArg {
                    what: "wheel inertia cannot be negative",
                });
            }
        }
        if spec.frontal_area.value <= 0.0 {
            return Err(SimError::InvalidArg {
                what: "frontal area must be positive",
            });
        }

        powertrain.finalize()?;

        let sinks = vec![
            EnergySink::LinearInertia,
            EnergySink::AngularInertia {
                inertia_kgm2: spec.front_wheel.inertia.value,
                radius_m: spec.front_wheel.radius.value,
            },
            EnergySink::AngularInertia {
                inertia_kgm2: spec.rear_wheel.inertia.value,
                radius_m: spec.rear_wheel.radius.value,
            },
            EnergySink::Gravitational,
            EnergySink::AeroDrag {
                frontal_area_m2: spec.frontal_area.value,
                cd: spec.drag_coefficient,
            },
            EnergySink::RollingResistance {
                mass_ratio: spec.front_mass_ratio,
                crr: spec.front_wheel.rolling_resistance,
            },
            EnergySink::RollingResistance {
                mass_ratio: 1.0 - spec.front_mass_ratio,
                crr: spec.rear_wheel.rolling_resistance,
            },
        ];

        Ok(Self {
            name: spec.name,
            dry_mass_kg: spec.dry_mass.value,
            rear_wheel_radius_m: spec.rear_wheel.radius.value,
            sinks,
            powertrain,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current total mass, including the remaining fuel.
    pub fn mass_kg(&self) -> f64 {
        self.dry_mass_kg + self.powertrain.mass_kg()
    }

    /// Reset every reservoir to full. Never happens implicitly; reusing a
    /// vehicle across routes without this carries the depletion over.
    pub fn refill_sources(&mut self) {
        self.powertrain.refill_sources();
    }

    pub fn source_levels(&self) -> SimResult<Vec<SourceLevelRow>> {
        let mut levels = Vec::new();
        self.powertrain.source_levels(&mut levels)?;
        Ok(levels)
    }

    /// Coefficient of `v²` in the vehicle's total kinetic energy.
    fn kinetic_coefficient(&self, mass_kg: f64) -> f64 {
        self.sinks
            .iter()
            .map(|s| s.kinetic_coefficient(mass_kg))
            .sum()
    }

    /// Advance the vehicle across one sample transition.
    ///
    /// Computes the energy demand for reaching the target speed, resolves
    /// it against the powertrain, and integrates the achieved speed from
    /// whatever the powertrain actually delivered. Shortfalls slow the
    /// vehicle; surpluses are recovered regeneratively (when enabled) or
    /// burned in the brakes. A halt under positive demand floors the speed
    /// at zero and flags the step, it is not an error.
    pub fn step(
        &mut self,
        current_speed_mps: f64,
        current: &KinematicSample,
        next: &KinematicSample,
        resolve_opts: &ResolveOptions,
        regen_enabled: bool,
    ) -> SimResult<StepOutcome> {
        let dt_s = next.target_time_s - current.target_time_s;
        if dt_s <= 0.0 {
            return Err(SimError::InvalidArg {
                what: "samples must be strictly ordered in time",
            });
        }

        let mass_kg = self.mass_kg();
        let conditions = StepConditions {
            mass_kg,
            current_speed_mps,
            target_speed_mps: next.target_speed_mps,
            delta_distance_m: next.distance_m - current.distance_m,
            delta_elevation_m: next.elevation_m - current.elevation_m,
        };

        let demand_j: f64 = self
            .sinks
            .iter()
            .map(|s| s.energy_required(&conditions))
            .sum();
        let inertial_j: f64 = self
            .sinks
            .iter()
            .filter(|s| s.is_inertial())
            .map(|s| s.energy_required(&conditions))
            .sum();

        let omega_rad_s = current_speed_mps / self.rear_wheel_radius_m;
        let resolution = self
            .powertrain
            .resolve(demand_j, dt_s, Some(omega_rad_s), resolve_opts)?;
        let delivered_j = resolution.delivered_j;
        let shortfall_j = demand_j - delivered_j;

        // Whatever the powertrain could not deliver (or absorb) lands on
        // the kinetic term: the vehicle deviates from the target speed.
        let net_inertial_j = inertial_j - shortfall_j;
        let ke_coeff = self.kinetic_coefficient(mass_kg);
        let speed_squared =
            current_speed_mps * current_speed_mps + net_inertial_j / ke_coeff;

        let mut achieved_speed_mps = if speed_squared >= 0.0 {
            speed_squared.sqrt()
        } else {
            0.0
        };

        // Surplus above the target (typically descents with a saturated or
        // absent regen path) is recovered first, burned in the brakes after.
        let mut regenerated_j = 0.0;
        let mut braking_loss_j = 0.0;
        if achieved_speed_mps > next.target_speed_mps {
            let excess_j = ke_coeff
                * (achieved_speed_mps * achieved_speed_mps
                    - next.target_speed_mps * next.target_speed_mps);
            if regen_enabled {
                regenerated_j = self.powertrain.regenerate(excess_j, dt_s)?;
            }
            braking_loss_j = excess_j - regenerated_j;
            achieved_speed_mps = next.target_speed_mps;
            debug!(
                excess_j,
                regenerated_j, braking_loss_j, "surplus speed braked away"
            );
        }

        // Flag only deficits the resolver's own tolerance cannot explain:
        // a sub-epsilon shortfall is a converged step, not a failure.
        let deficit_j = ke_coeff
            * (next.target_speed_mps * next.target_speed_mps
                - achieved_speed_mps * achieved_speed_mps);
        let under_target = deficit_j > resolve_opts.epsilon_j;

        Ok(StepOutcome {
            achieved_speed_mps,
            demand_j,
            delivered_j,
            shortfall_j,
            braking_loss_j,
            regenerated_j,
            under_target,
            rows: resolution.rows,
        })
    }
}
