//! Catalog of realistic motorcycle powertrain parts.
//!
//! Specs describe generic hardware classes (displacement/power for engines,
//! pack size and C-rate for batteries) rather than manufacturer parts. The
//! builders turn a spec into a ready-to-compose [`Component`].

use crate::component::{Component, Domain};
use crate::efficiency::EfficiencyCurve;
use crate::error::PowertrainResult;
use crate::source::EnergySource;
use pt_core::{kg, watt};
use std::f64::consts::PI;

const RPM_TO_RAD_S: f64 = 2.0 * PI / 60.0;

/// Gasoline, near enough.
pub const PETROL_ENERGY_DENSITY_J_PER_KG: f64 = 43.0e6;
pub const PETROL_DENSITY_KG_PER_L: f64 = 0.75;

/// A combustion engine class.
#[derive(Clone, Copy, Debug)]
pub struct EngineSpec {
    pub max_power_kw: f64,
    pub dry_mass_kg: f64,
    /// Peak brake thermal efficiency.
    pub efficiency_peak: f64,
    pub rpm_max: f64,
}

pub const ENGINE_250CC_20KW: EngineSpec = EngineSpec {
    max_power_kw: 20.0,
    dry_mass_kg: 35.0,
    efficiency_peak: 0.28,
    rpm_max: 10_000.0,
};

pub const ENGINE_650CC_50KW: EngineSpec = EngineSpec {
    max_power_kw: 50.0,
    dry_mass_kg: 65.0,
    efficiency_peak: 0.36,
    rpm_max: 9_000.0,
};

pub const ENGINE_1000CC_80KW: EngineSpec = EngineSpec {
    max_power_kw: 80.0,
    dry_mass_kg: 85.0,
    efficiency_peak: 0.40,
    rpm_max: 10_000.0,
};

/// An electric motor class.
#[derive(Clone, Copy, Debug)]
pub struct MotorSpec {
    pub max_power_kw: f64,
    pub dry_mass_kg: f64,
    pub efficiency_peak: f64,
}

pub const MOTOR_15KW_MID_DRIVE: MotorSpec = MotorSpec {
    max_power_kw: 15.0,
    dry_mass_kg: 20.0,
    efficiency_peak: 0.92,
};

pub const MOTOR_30KW_MID_DRIVE: MotorSpec = MotorSpec {
    max_power_kw: 30.0,
    dry_mass_kg: 28.0,
    efficiency_peak: 0.94,
};

pub const MOTOR_80KW_HIGH_PERF: MotorSpec = MotorSpec {
    max_power_kw: 80.0,
    dry_mass_kg: 42.0,
    efficiency_peak: 0.96,
};

/// A battery pack class.
#[derive(Clone, Copy, Debug)]
pub struct BatterySpec {
    pub capacity_kwh: f64,
    pub energy_density_wh_per_kg: f64,
    pub cell_mass_kg: f64,
    pub pack_overhead_kg: f64,
    pub max_discharge_rate_c: f64,
    pub efficiency: f64,
}

pub const BATTERY_5KWH: BatterySpec = BatterySpec {
    capacity_kwh: 5.0,
    energy_density_wh_per_kg: 180.0,
    cell_mass_kg: 27.8,
    pack_overhead_kg: 8.0,
    max_discharge_rate_c: 3.0,
    efficiency: 0.92,
};

pub const BATTERY_10KWH: BatterySpec = BatterySpec {
    capacity_kwh: 10.0,
    energy_density_wh_per_kg: 200.0,
    cell_mass_kg: 50.0,
    pack_overhead_kg: 12.0,
    max_discharge_rate_c: 3.5,
    efficiency: 0.93,
};

pub const BATTERY_20KWH: BatterySpec = BatterySpec {
    capacity_kwh: 20.0,
    energy_density_wh_per_kg: 180.0,
    cell_mass_kg: 111.1,
    pack_overhead_kg: 20.0,
    max_discharge_rate_c: 5.0,
    efficiency: 0.92,
};

/// Thermal efficiency over the rev range: poor at idle, peaking mid-range,
/// falling off toward the redline.
pub fn engine_efficiency_curve(spec: &EngineSpec) -> PowertrainResult<EfficiencyCurve> {
    let fractions = [0.0, 0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8, 0.9, 1.0];
    let shape = [0.15, 0.25, 0.40, 0.65, 0.85, 0.95, 1.00, 0.90, 0.75, 0.60, 0.45];

    let omega = fractions
        .iter()
        .map(|f| f * spec.rpm_max * RPM_TO_RAD_S)
        .collect();
    let eta = shape.iter().map(|s| s * spec.efficiency_peak).collect();
    EfficiencyCurve::angular_velocity(omega, eta)
}

/// A petrol tank source leaf.
///
/// # Errors
/// Returns an error if the capacity is negative.
pub fn fuel_tank(capacity_l: f64) -> PowertrainResult<Component> {
    let source = EnergySource::chemical(
        PETROL_ENERGY_DENSITY_J_PER_KG,
        kg(capacity_l * PETROL_DENSITY_KG_PER_L),
        // The engine above it is the power bottleneck, not the fuel line.
        watt(f64::INFINITY),
        EfficiencyCurve::identity(),
    )?;
    Ok(Component::source(format!("Fuel Tank {capacity_l:.0}L"), source)
        .with_dry_mass(kg(2.0 + capacity_l * 0.2)))
}

/// A combustion engine with its fuel tank attached. The engine switches
/// off at zero demand rather than idling.
pub fn combustion_engine(spec: &EngineSpec, fuel_capacity_l: f64) -> PowertrainResult<Component> {
    let tank = fuel_tank(fuel_capacity_l)?;
    Ok(Component::converter(
        format!("Engine {:.0}kW", spec.max_power_kw),
        Domain::Mechanical,
        vec![tank],
    )
    .with_dry_mass(kg(spec.dry_mass_kg))
    .with_efficiency(engine_efficiency_curve(spec)?)
    .with_power_window(watt(0.0), watt(spec.max_power_kw * 1e3))
    .disableable())
}

/// An electric motor over the given electrical children (typically one
/// battery pack). `regen_power_ratio` scales how hard it can brake
/// regeneratively relative to its drive power.
pub fn electric_motor(
    spec: &MotorSpec,
    regen_power_ratio: f64,
    children: Vec<Component>,
) -> PowertrainResult<Component> {
    Ok(Component::converter(
        format!("Motor {:.0}kW", spec.max_power_kw),
        Domain::Both,
        children,
    )
    .with_dry_mass(kg(spec.dry_mass_kg))
    .with_efficiency(EfficiencyCurve::constant(spec.efficiency_peak)?)
    .with_power_window(
        watt(-spec.max_power_kw * 1e3 * regen_power_ratio),
        watt(spec.max_power_kw * 1e3),
    ))
}

/// A generator for series-hybrid layouts: a motor pinned at its most
/// efficient shaft speed, with no regenerative path.
pub fn generator(
    spec: &MotorSpec,
    fixed_rpm: f64,
    children: Vec<Component>,
) -> PowertrainResult<Component> {
    Ok(electric_motor(spec, 0.0, children)?.with_fixed_omega(fixed_rpm * RPM_TO_RAD_S))
}

/// A battery pack source leaf. Discharge power follows the C-rate;
/// charge acceptance is 80% of that.
pub fn battery_pack(spec: &BatterySpec) -> PowertrainResult<Component> {
    let max_power_w = spec.capacity_kwh * 1e3 * spec.max_discharge_rate_c;
    let source = EnergySource::electrical(
        spec.energy_density_wh_per_kg * 3_600.0,
        kg(spec.cell_mass_kg),
        watt(max_power_w),
        watt(max_power_w * 0.8),
        EfficiencyCurve::constant(spec.efficiency)?,
    )?;
    Ok(
        Component::source(format!("Battery {:.1}kWh", spec.capacity_kwh), source)
            .with_dry_mass(kg(spec.pack_overhead_kg)),
    )
}

/// A single-ratio transmission stage (chain or belt final drive included),
/// modeled as a constant-efficiency converter with its own dry mass.
pub fn transmission(
    name: impl Into<String>,
    efficiency: f64,
    dry_mass_kg: f64,
    children: Vec<Component>,
) -> PowertrainResult<Component> {
    Ok(Component::converter(name, Domain::Mechanical, children)
        .with_dry_mass(kg(dry_mass_kg))
        .with_efficiency(EfficiencyCurve::constant(efficiency)?))
}

/// A friction brake on the rear wheel.
pub fn mechanical_brake() -> Component {
    Component::brake("Friction Brake")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::efficiency::OperatingPoint;
    use crate::resolve::ResolveOptions;

    #[test]
    fn battery_capacity_matches_cell_mass_and_density() {
        let pack = battery_pack(&BATTERY_10KWH).unwrap();
        let mut levels = Vec::new();
        let mut pack = pack;
        pack.finalize().unwrap();
        pack.source_levels(&mut levels).unwrap();
        // 50 kg at 200 Wh/kg is 10 kWh.
        assert!((levels[0].capacity_j - 3.6e7).abs() < 1e3);
    }

    #[test]
    fn engine_curve_peaks_mid_range() {
        let curve = engine_efficiency_curve(&ENGINE_650CC_50KW).unwrap();
        let at = |rpm: f64| {
            curve
                .eta_at(&OperatingPoint::at_omega(Some(rpm * RPM_TO_RAD_S)))
                .unwrap()
        };
        let idle = at(900.0);
        let peak = at(0.6 * ENGINE_650CC_50KW.rpm_max);
        let redline = at(ENGINE_650CC_50KW.rpm_max);
        assert!(peak > idle);
        assert!(peak > redline);
        assert!((peak - 0.36).abs() < 1e-12);
    }

    #[test]
    fn engine_mass_includes_tank_and_fuel() {
        let engine = combustion_engine(&ENGINE_650CC_50KW, 20.0).unwrap();
        // 65 engine + (2 + 4) tank + 15 fuel.
        assert!((engine.mass_kg() - 86.0).abs() < 1e-9);
    }

    #[test]
    fn transmission_adds_mass_and_losses() {
        let engine = combustion_engine(&ENGINE_650CC_50KW, 15.0).unwrap();
        let engine_mass = engine.mass_kg();
        let gearbox = transmission("Gearbox", 0.92, 15.0, vec![engine]).unwrap();
        assert!((gearbox.mass_kg() - (engine_mass + 15.0)).abs() < 1e-9);
    }

    #[test]
    fn hybrid_layout_composes_and_resolves() {
        let engine = combustion_engine(&ENGINE_250CC_20KW, 12.0).unwrap();
        let motor = electric_motor(
            &MOTOR_30KW_MID_DRIVE,
            0.8,
            vec![battery_pack(&BATTERY_5KWH).unwrap()],
        )
        .unwrap();
        let mut root = Component::converter(
            "Rear Wheel",
            Domain::Mechanical,
            vec![engine, motor, mechanical_brake()],
        );
        root.finalize().unwrap();

        let r = root
            .resolve(5_000.0, 1.0, Some(200.0), &ResolveOptions::default())
            .unwrap();
        assert!(r.delivered_j > 0.0);
        assert!(r.delivered_j <= 5_000.0 + 1.0);
    }
}
