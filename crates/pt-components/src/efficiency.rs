//! Efficiency curves: operating point → conversion ratio.

use crate::error::{PowertrainError, PowertrainResult};
use pt_core::interp_clamped;

/// The operating point a conversion happens at.
///
/// Mechanical nodes carry an angular velocity; any node with a finite power
/// limit additionally knows its load fraction. Curves pick the coordinate
/// they need and ignore the rest.
#[derive(Clone, Copy, Debug, Default)]
pub struct OperatingPoint {
    pub omega_rad_s: Option<f64>,
    pub load_fraction: Option<f64>,
}

impl OperatingPoint {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn at_omega(omega_rad_s: Option<f64>) -> Self {
        Self {
            omega_rad_s,
            load_fraction: None,
        }
    }
}

/// Maps an operating point to an efficiency ratio in (0, 1].
///
/// Immutable and stateless. The two mappings are inverses of each other:
/// `energy_required` answers "how much must my children supply so I can
/// deliver this output", `energy_delivered` answers "how much do I deliver
/// given what my children supplied". Negative energies (absorption) mirror
/// the ratio, so losses always shrink what comes out of the conversion.
#[derive(Clone, Debug)]
pub enum EfficiencyCurve {
    Constant {
        eta: f64,
    },
    /// Linear interpolation over sorted angular-velocity breakpoints,
    /// clamped at the endpoints.
    AngularVelocity {
        omega_rad_s: Vec<f64>,
        eta: Vec<f64>,
    },
}

impl EfficiencyCurve {
    /// Lossless conversion.
    pub fn identity() -> Self {
        EfficiencyCurve::Constant { eta: 1.0 }
    }

    pub fn constant(eta: f64) -> PowertrainResult<Self> {
        if !(eta > 0.0 && eta <= 1.0) {
            return Err(PowertrainError::NonPhysical {
                what: "efficiency ratio must be in (0, 1]",
            });
        }
        Ok(EfficiencyCurve::Constant { eta })
    }

    pub fn angular_velocity(omega_rad_s: Vec<f64>, eta: Vec<f64>) -> PowertrainResult<Self> {
        if omega_rad_s.len() != eta.len() {
            return Err(PowertrainError::InvalidArg {
                what: "omega and efficiency lookups must have equal length",
            });
        }
        if omega_rad_s.len() < 2 {
            return Err(PowertrainError::InvalidArg {
                what: "angular-velocity curve needs at least 2 breakpoints",
            });
        }
        if !omega_rad_s.windows(2).all(|w| w[0] < w[1]) {
            return Err(PowertrainError::InvalidArg {
                what: "omega breakpoints must be strictly increasing",
            });
        }
        if eta.iter().any(|&e| !(e > 0.0 && e <= 1.0)) {
            return Err(PowertrainError::NonPhysical {
                what: "efficiency ratio must be in (0, 1]",
            });
        }
        Ok(EfficiencyCurve::AngularVelocity { omega_rad_s, eta })
    }

    /// Efficiency ratio at the given operating point.
    pub fn eta_at(&self, op: &OperatingPoint) -> PowertrainResult<f64> {
        match self {
            EfficiencyCurve::Constant { eta } => Ok(*eta),
            EfficiencyCurve::AngularVelocity { omega_rad_s, eta } => {
                let omega = op.omega_rad_s.ok_or(PowertrainError::MissingOperatingPoint {
                    what: "angular-velocity curve evaluated on a node with no omega",
                })?;
                Ok(interp_clamped(omega_rad_s, eta, omega))
            }
        }
    }

    /// Energy the children must supply for `energy_out_j` of output.
    pub fn energy_required(&self, energy_out_j: f64, op: &OperatingPoint) -> PowertrainResult<f64> {
        let eta = self.eta_at(op)?;
        Ok(if energy_out_j >= 0.0 {
            energy_out_j / eta
        } else {
            energy_out_j * eta
        })
    }

    /// Energy delivered out of the conversion given `energy_in_j` supplied.
    pub fn energy_delivered(&self, energy_in_j: f64, op: &OperatingPoint) -> PowertrainResult<f64> {
        let eta = self.eta_at(op)?;
        Ok(if energy_in_j >= 0.0 {
            energy_in_j * eta
        } else {
            energy_in_j / eta
        })
    }
}
