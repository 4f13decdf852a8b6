//! Stateful energy reservoirs: fuel tanks and battery packs.

use crate::efficiency::{EfficiencyCurve, OperatingPoint};
use crate::error::{PowertrainError, PowertrainResult};
use pt_core::units::{Energy, Mass, Power};

/// What kind of reservoir this is.
///
/// Chemical sources cannot absorb energy (fuel cannot be un-burnt);
/// electrical sources may accept regenerative charge up to their charge
/// power limit and remaining headroom.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SourceKind {
    Chemical,
    Electrical,
}

/// Outcome of a single energy request.
#[derive(Clone, Copy, Debug, Default)]
pub struct Delivery {
    /// Energy handed to the parent (J). Negative when absorbing.
    pub delivered_j: f64,
    /// Reserve-side movement (J): positive debit on discharge, negative
    /// credit on regenerative charge. Differs from `delivered_j` by the
    /// conversion losses.
    pub drawn_from_reserve_j: f64,
}

/// A depletable store of energy with power limits and a conversion
/// efficiency.
///
/// The reserve is mutated only by [`EnergySource::request`] (and the
/// explicit [`EnergySource::refill`]). Depletion is a normal operating
/// condition: once the reserve hits zero further requests deliver 0
/// indefinitely, without error.
#[derive(Clone, Debug)]
pub struct EnergySource {
    kind: SourceKind,
    capacity_j: f64,
    remaining_j: f64,
    energy_density_j_per_kg: f64,
    max_power_w: f64,
    max_charge_power_w: f64,
    efficiency: EfficiencyCurve,
    /// Charge energy already accepted this timestep. Resolution and the
    /// regenerative pass share one `max_charge_power_w · dt` budget.
    step_charge_used_j: f64,
}

impl EnergySource {
    /// A fuel reservoir: `capacity = energy_density · fuel_mass`.
    ///
    /// # Errors
    /// Returns an error if the parameters are non-physical.
    pub fn chemical(
        energy_density_j_per_kg: f64,
        fuel_mass: Mass,
        max_power: Power,
        efficiency: EfficiencyCurve,
    ) -> PowertrainResult<Self> {
        Self::build(
            SourceKind::Chemical,
            energy_density_j_per_kg,
            fuel_mass.value,
            max_power.value,
            0.0,
            efficiency,
        )
    }

    /// A battery pack: `capacity = energy_density · cell_mass`.
    pub fn electrical(
        energy_density_j_per_kg: f64,
        cell_mass: Mass,
        max_power: Power,
        max_charge_power: Power,
        efficiency: EfficiencyCurve,
    ) -> PowertrainResult<Self> {
        Self::build(
            SourceKind::Electrical,
            energy_density_j_per_kg,
            cell_mass.value,
            max_power.value,
            max_charge_power.value,
            efficiency,
        )
    }

    fn build(
        kind: SourceKind,
        energy_density_j_per_kg: f64,
        fuel_mass_kg: f64,
        max_power_w: f64,
        max_charge_power_w: f64,
        efficiency: EfficiencyCurve,
    ) -> PowertrainResult<Self> {
        if energy_density_j_per_kg <= 0.0 {
            return Err(PowertrainError::NonPhysical {
                what: "energy density must be positive",
            });
        }
        if fuel_mass_kg < 0.0 {
            return Err(PowertrainError::NonPhysical {
                what: "fuel mass cannot be negative",
            });
        }
        if max_power_w <= 0.0 {
            return Err(PowertrainError::NonPhysical {
                what: "max power must be positive",
            });
        }
        if max_charge_power_w < 0.0 {
            return Err(PowertrainError::NonPhysical {
                what: "max charge power cannot be negative",
            });
        }
        let capacity_j = energy_density_j_per_kg * fuel_mass_kg;
        Ok(Self {
            kind,
            capacity_j,
            remaining_j: capacity_j,
            energy_density_j_per_kg,
            max_power_w,
            max_charge_power_w,
            efficiency,
            step_charge_used_j: 0.0,
        })
    }

    /// Open a fresh per-step charge budget. Called by the tree when a new
    /// timestep first reaches this source.
    pub(crate) fn begin_step(&mut self) {
        self.step_charge_used_j = 0.0;
    }

    pub fn kind(&self) -> SourceKind {
        self.kind
    }

    pub fn capacity(&self) -> Energy {
        pt_core::joule(self.capacity_j)
    }

    pub fn remaining_j(&self) -> f64 {
        self.remaining_j
    }

    pub fn capacity_j(&self) -> f64 {
        self.capacity_j
    }

    pub fn consumed_j(&self) -> f64 {
        self.capacity_j - self.remaining_j
    }

    pub fn is_depleted(&self) -> bool {
        self.remaining_j <= 0.0
    }

    /// Mass of the stored energy carrier (kg). Fuel burns off; battery
    /// cells weigh the same full or empty.
    pub fn carrier_mass_kg(&self) -> f64 {
        match self.kind {
            SourceKind::Chemical => {
                (self.remaining_j / self.energy_density_j_per_kg).max(0.0)
            }
            SourceKind::Electrical => self.capacity_j / self.energy_density_j_per_kg,
        }
    }

    /// Reset the reserve to full capacity. Never called by the engine
    /// itself; runs over fresh routes must do this explicitly.
    pub fn refill(&mut self) {
        self.remaining_j = self.capacity_j;
    }

    /// Attempt to deliver (or, for electrical sources, absorb) energy.
    ///
    /// The demand is clamped to the discharge power limit and the step's
    /// remaining charge budget (charge accepted earlier in the same step,
    /// during resolution, counts against later regenerative offers), then
    /// converted through the efficiency curve to a reserve-side amount,
    /// then limited by the reserve (discharge) or the headroom
    /// `capacity − remaining` (charge). The reserve moves by the limited
    /// reserve-side amount; the parent receives the output-side equivalent.
    pub fn request(
        &mut self,
        demand_j: f64,
        dt_s: f64,
        op: &OperatingPoint,
    ) -> PowertrainResult<Delivery> {
        if dt_s <= 0.0 {
            return Err(PowertrainError::InvalidArg {
                what: "dt must be positive",
            });
        }

        // Chemical sources cannot be un-burnt.
        if demand_j < 0.0 && self.kind == SourceKind::Chemical {
            return Ok(Delivery::default());
        }

        let charge_budget_j =
            (self.max_charge_power_w * dt_s - self.step_charge_used_j).max(0.0);
        let max_e = self.max_power_w * dt_s;
        let clamped = demand_j.clamp(-charge_budget_j, max_e);

        let reserve_side = self.efficiency.energy_required(clamped, op)?;
        let feasible = if reserve_side >= 0.0 {
            reserve_side.min(self.remaining_j.max(0.0))
        } else {
            reserve_side.max(-(self.capacity_j - self.remaining_j))
        };

        self.remaining_j -= feasible;
        let delivered = self.efficiency.energy_delivered(feasible, op)?;
        if delivered < 0.0 {
            self.step_charge_used_j -= delivered;
        }

        Ok(Delivery {
            delivered_j: delivered,
            drawn_from_reserve_j: feasible,
        })
    }
}
