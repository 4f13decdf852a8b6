// pt-core/src/units.rs

use uom::si::f64::{
    Area as UomArea, Energy as UomEnergy, Length as UomLength, Mass as UomMass,
    MomentOfInertia as UomMomentOfInertia, Power as UomPower, Velocity as UomVelocity,
};

// Public canonical unit types (SI, f64)
pub type Area = UomArea;
pub type Energy = UomEnergy;
pub type Length = UomLength;
pub type Mass = UomMass;
pub type MomentOfInertia = UomMomentOfInertia;
pub type Power = UomPower;
pub type Velocity = UomVelocity;

#[inline]
pub fn kg(v: f64) -> Mass {
    use uom::si::mass::kilogram;
    Mass::new::<kilogram>(v)
}

#[inline]
pub fn m(v: f64) -> Length {
    use uom::si::length::meter;
    Length::new::<meter>(v)
}

#[inline]
pub fn m2(v: f64) -> Area {
    use uom::si::area::square_meter;
    Area::new::<square_meter>(v)
}

#[inline]
pub fn kmh(v: f64) -> Velocity {
    use uom::si::velocity::kilometer_per_hour;
    Velocity::new::<kilometer_per_hour>(v)
}

#[inline]
pub fn joule(v: f64) -> Energy {
    use uom::si::energy::joule;
    Energy::new::<joule>(v)
}

#[inline]
pub fn watt(v: f64) -> Power {
    use uom::si::power::watt;
    Power::new::<watt>(v)
}

#[inline]
pub fn kgm2(v: f64) -> MomentOfInertia {
    use uom::si::moment_of_inertia::kilogram_square_meter;
    MomentOfInertia::new::<kilogram_square_meter>(v)
}

pub mod constants {
    /// Gravitational acceleration used by the sink formulas (m/s²).
    pub const G_MPS2: f64 = 9.81;

    /// Nominal sea-level air density for aerodynamic drag (kg/m³).
    pub const AIR_DENSITY_KG_M3: f64 = 1.18;

    /// Mean Earth radius for great-circle distances (m).
    pub const EARTH_RADIUS_M: f64 = 6_371_000.0;
}
