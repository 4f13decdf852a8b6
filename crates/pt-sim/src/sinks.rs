//! Stateless energy sinks: where delivered energy goes over one step.
//!
//! Each sink answers "how much energy does this mechanism consume between
//! two route samples". Resistive sinks (drag, rolling, gravity) depend on
//! the path; inertia sinks depend only on the speed change and additionally
//! expose their kinetic-energy coefficient so the speed integration can
//! invert `E = Σ coeff · v²`.

use pt_core::constants::{AIR_DENSITY_KG_M3, G_MPS2};

/// Conditions over one step, shared by every sink.
#[derive(Clone, Copy, Debug)]
pub struct StepConditions {
    pub mass_kg: f64,
    pub current_speed_mps: f64,
    pub target_speed_mps: f64,
    pub delta_distance_m: f64,
    pub delta_elevation_m: f64,
}

/// The closed set of loss mechanisms acting on the vehicle.
#[derive(Clone, Copy, Debug)]
pub enum EnergySink {
    /// `0.5 · ρ · Cd · A · v̄² · Δd`, with v̄ the mean of the current and
    /// target speeds over the step.
    AeroDrag { frontal_area_m2: f64, cd: f64 },
    /// `m · ratio · Crr · g · Δd`; one per wheel, split by the static
    /// weight distribution.
    RollingResistance { mass_ratio: f64, crr: f64 },
    /// `m · g · Δelev`, signed: descents give energy back.
    Gravitational,
    /// Translational kinetic energy of the whole vehicle.
    LinearInertia,
    /// Rotational kinetic energy of a wheel, folded onto the ground speed
    /// through `ω = v / r`.
    AngularInertia { inertia_kgm2: f64, radius_m: f64 },
}

impl EnergySink {
    /// Energy this sink consumes over the step (J). Negative values mean
    /// the sink releases energy (downhill gravity, deceleration).
    pub fn energy_required(&self, c: &StepConditions) -> f64 {
        match *self {
            EnergySink::AeroDrag {
                frontal_area_m2,
                cd,
            } => {
                let v_avg = 0.5 * (c.current_speed_mps + c.target_speed_mps);
                0.5 * frontal_area_m2 * cd * AIR_DENSITY_KG_M3 * v_avg * v_avg
                    * c.delta_distance_m
            }
            EnergySink::RollingResistance { mass_ratio, crr } => {
                c.mass_kg * mass_ratio * crr * G_MPS2 * c.delta_distance_m
            }
            EnergySink::Gravitational => c.mass_kg * G_MPS2 * c.delta_elevation_m,
            EnergySink::LinearInertia | EnergySink::AngularInertia { .. } => {
                let coeff = self.kinetic_coefficient(c.mass_kg);
                coeff
                    * (c.target_speed_mps * c.target_speed_mps
                        - c.current_speed_mps * c.current_speed_mps)
            }
        }
    }

    /// Coefficient in `E_kinetic = coeff · v²`. Zero for resistive sinks.
    pub fn kinetic_coefficient(&self, mass_kg: f64) -> f64 {
        match *self {
            EnergySink::LinearInertia => 0.5 * mass_kg,
            EnergySink::AngularInertia {
                inertia_kgm2,
                radius_m,
            } => 0.5 * inertia_kgm2 / (radius_m * radius_m),
            _ => 0.0,
        }
    }

    pub fn is_inertial(&self) -> bool {
        matches!(
            self,
            EnergySink::LinearInertia | EnergySink::AngularInertia { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conditions() -> StepConditions {
        StepConditions {
            mass_kg: 250.0,
            current_speed_mps: 20.0,
            target_speed_mps: 20.0,
            delta_distance_m: 20.0,
            delta_elevation_m: 0.0,
        }
    }

    #[test]
    fn drag_grows_with_the_square_of_speed() {
        let sink = EnergySink::AeroDrag {
            frontal_area_m2: 0.6,
            cd: 0.7,
        };
        let slow = sink.energy_required(&conditions());
        let fast = sink.energy_required(&StepConditions {
            current_speed_mps: 40.0,
            target_speed_mps: 40.0,
            ..conditions()
        });
        assert!((fast / slow - 4.0).abs() < 1e-9);

        // 0.5 · 0.6 · 0.7 · 1.18 · 400 · 20
        assert!((slow - 0.5 * 0.6 * 0.7 * 1.18 * 400.0 * 20.0).abs() < 1e-9);
    }

    #[test]
    fn drag_uses_the_mean_speed_over_the_step() {
        let sink = EnergySink::AeroDrag {
            frontal_area_m2: 1.0,
            cd: 1.0,
        };
        let accelerating = sink.energy_required(&StepConditions {
            current_speed_mps: 10.0,
            target_speed_mps: 30.0,
            ..conditions()
        });
        let steady = sink.energy_required(&conditions());
        // Mean of 10 and 30 is 20: same as steady 20 m/s.
        assert!((accelerating - steady).abs() < 1e-9);
    }

    #[test]
    fn rolling_resistance_is_speed_independent() {
        let sink = EnergySink::RollingResistance {
            mass_ratio: 0.5,
            crr: 0.02,
        };
        let e = sink.energy_required(&conditions());
        assert!((e - 250.0 * 0.5 * 0.02 * 9.81 * 20.0).abs() < 1e-9);
    }

    #[test]
    fn gravity_is_signed() {
        let sink = EnergySink::Gravitational;
        let up = sink.energy_required(&StepConditions {
            delta_elevation_m: 5.0,
            ..conditions()
        });
        let down = sink.energy_required(&StepConditions {
            delta_elevation_m: -5.0,
            ..conditions()
        });
        assert!((up - 250.0 * 9.81 * 5.0).abs() < 1e-9);
        assert!((up + down).abs() < 1e-9);
    }

    #[test]
    fn inertia_tracks_kinetic_energy_difference() {
        let sink = EnergySink::LinearInertia;
        let e = sink.energy_required(&StepConditions {
            current_speed_mps: 10.0,
            target_speed_mps: 20.0,
            ..conditions()
        });
        // 0.5 · 250 · (400 − 100)
        assert!((e - 0.5 * 250.0 * 300.0).abs() < 1e-9);

        // Decelerating releases the same amount.
        let e_back = sink.energy_required(&StepConditions {
            current_speed_mps: 20.0,
            target_speed_mps: 10.0,
            ..conditions()
        });
        assert!((e + e_back).abs() < 1e-9);
    }

    #[test]
    fn wheel_inertia_folds_through_the_radius() {
        let sink = EnergySink::AngularInertia {
            inertia_kgm2: 0.8,
            radius_m: 0.32,
        };
        let coeff = sink.kinetic_coefficient(250.0);
        assert!((coeff - 0.5 * 0.8 / (0.32 * 0.32)).abs() < 1e-12);
        assert!(sink.is_inertial());
        assert!(!EnergySink::Gravitational.is_inertial());
    }
}
