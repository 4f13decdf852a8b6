//! The composable component tree.

use crate::efficiency::EfficiencyCurve;
use crate::error::{PowertrainError, PowertrainResult};
use crate::source::EnergySource;
use pt_core::units::{Mass, MomentOfInertia, Power};
use pt_core::CompId;
use std::collections::HashSet;

/// Which hardware side of the powertrain a component lives on.
///
/// A parent and child must share a side; `Both` bridges (an electric motor
/// is mechanical toward the wheel and electrical toward the battery).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Domain {
    Mechanical,
    Electrical,
    Both,
}

impl Domain {
    pub fn is_mechanical(self) -> bool {
        matches!(self, Domain::Mechanical | Domain::Both)
    }

    pub fn is_electrical(self) -> bool {
        matches!(self, Domain::Electrical | Domain::Both)
    }
}

/// Closed set of node behaviors the resolution protocol branches on.
#[derive(Clone, Debug)]
pub enum ComponentKind {
    /// Passes demand through to its children, applying its efficiency.
    Converter,
    /// A converter that picks its child gearing ratio from a gear table:
    /// the first gear whose upshift angular velocity has not been exceeded.
    Gearbox {
        ratios: Vec<f64>,
        upshift_omega_rad_s: Vec<f64>,
    },
    /// Absorbs any amount of surplus energy, produces none.
    Brake,
    /// A stateful energy reservoir leaf.
    Source(EnergySource),
}

/// A node in the strictly-owned powertrain tree.
///
/// Children are owned exclusively (`Vec<Component>`), so cycles and shared
/// parents are unrepresentable; [`Component::finalize`] still validates
/// name uniqueness and domain compatibility, and assigns preorder ids.
#[derive(Clone, Debug)]
pub struct Component {
    pub(crate) name: String,
    pub(crate) id: Option<CompId>,
    pub(crate) dry_mass_kg: f64,
    pub(crate) inertia_kgm2: f64,
    /// Multiplier from this node's angular velocity to its children's.
    pub(crate) gearing_ratio: f64,
    pub(crate) domain: Domain,
    pub(crate) efficiency: EfficiencyCurve,
    pub(crate) min_power_w: f64,
    pub(crate) max_power_w: f64,
    /// Pinned angular velocity for nodes with no mechanical link to the
    /// wheels (series-hybrid generator sets). Driving such a node with an
    /// external omega is an invariant error.
    pub(crate) fixed_omega_rad_s: Option<f64>,
    /// Engines and motors can be switched off: zero demand short-circuits
    /// to a zeroed breakdown without touching children.
    pub(crate) disable_on_zero_demand: bool,
    pub(crate) kind: ComponentKind,
    pub(crate) children: Vec<Component>,
}

impl Component {
    fn base(name: impl Into<String>, domain: Domain, kind: ComponentKind) -> Self {
        Self {
            name: name.into(),
            id: None,
            dry_mass_kg: 0.0,
            inertia_kgm2: 0.0,
            gearing_ratio: 1.0,
            domain,
            efficiency: EfficiencyCurve::identity(),
            min_power_w: f64::NEG_INFINITY,
            max_power_w: f64::INFINITY,
            fixed_omega_rad_s: None,
            disable_on_zero_demand: false,
            kind,
            children: Vec::new(),
        }
    }

    /// A power converter with the given children.
    pub fn converter(
        name: impl Into<String>,
        domain: Domain,
        children: Vec<Component>,
    ) -> Self {
        let mut c = Self::base(name, domain, ComponentKind::Converter);
        c.children = children;
        c
    }

    /// A multi-ratio gearbox.
    ///
    /// # Errors
    /// Returns an error if the gear tables are empty or of unequal length.
    pub fn gearbox(
        name: impl Into<String>,
        ratios: Vec<f64>,
        upshift_omega_rad_s: Vec<f64>,
        children: Vec<Component>,
    ) -> PowertrainResult<Self> {
        if ratios.is_empty() {
            return Err(PowertrainError::InvalidArg {
                what: "gearbox needs at least one gear ratio",
            });
        }
        if ratios.len() != upshift_omega_rad_s.len() {
            return Err(PowertrainError::InvalidArg {
                what: "gear ratio and upshift tables must have equal length",
            });
        }
        let mut c = Self::base(
            name,
            Domain::Mechanical,
            ComponentKind::Gearbox {
                ratios,
                upshift_omega_rad_s,
            },
        );
        c.children = children;
        Ok(c)
    }

    /// A friction brake: infinite absorption, zero production.
    pub fn brake(name: impl Into<String>) -> Self {
        let mut c = Self::base(name, Domain::Mechanical, ComponentKind::Brake);
        c.max_power_w = 0.0;
        c
    }

    /// A reservoir leaf; the domain follows the source kind.
    pub fn source(name: impl Into<String>, source: EnergySource) -> Self {
        let domain = match source.kind() {
            crate::source::SourceKind::Chemical => Domain::Mechanical,
            crate::source::SourceKind::Electrical => Domain::Electrical,
        };
        Self::base(name, domain, ComponentKind::Source(source))
    }

    pub fn with_dry_mass(mut self, mass: Mass) -> Self {
        self.dry_mass_kg = mass.value;
        self
    }

    pub fn with_inertia(mut self, inertia: MomentOfInertia) -> Self {
        self.inertia_kgm2 = inertia.value;
        self
    }

    pub fn with_gearing_ratio(mut self, ratio: f64) -> Self {
        self.gearing_ratio = ratio;
        self
    }

    pub fn with_efficiency(mut self, efficiency: EfficiencyCurve) -> Self {
        self.efficiency = efficiency;
        self
    }

    /// Power generation window. Negative minimum means the component can
    /// absorb (regenerate) through itself.
    pub fn with_power_window(mut self, min_power: Power, max_power: Power) -> Self {
        self.min_power_w = min_power.value;
        self.max_power_w = max_power.value;
        self
    }

    pub fn with_max_power(mut self, max_power: Power) -> Self {
        self.max_power_w = max_power.value;
        self
    }

    pub fn with_fixed_omega(mut self, omega_rad_s: f64) -> Self {
        self.fixed_omega_rad_s = Some(omega_rad_s);
        self
    }

    pub fn disableable(mut self) -> Self {
        self.disable_on_zero_demand = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn id(&self) -> Option<CompId> {
        self.id
    }

    pub fn domain(&self) -> Domain {
        self.domain
    }

    pub fn kind(&self) -> &ComponentKind {
        &self.kind
    }

    pub fn children(&self) -> &[Component] {
        &self.children
    }

    /// Total mass: own dry mass, the energy carrier where applicable, and
    /// all children.
    pub fn mass_kg(&self) -> f64 {
        let carrier = match &self.kind {
            ComponentKind::Source(src) => src.carrier_mass_kg(),
            _ => 0.0,
        };
        self.dry_mass_kg
            + carrier
            + self.children.iter().map(Component::mass_kg).sum::<f64>()
    }

    /// Rotational inertia folded up through the gearing. Electrical
    /// subtrees contribute none.
    pub fn inertia_kgm2(&self) -> f64 {
        if !self.domain.is_mechanical() {
            return 0.0;
        }
        self.inertia_kgm2
            + self.gearing_ratio * self.gearing_ratio
                * self
                    .children
                    .iter()
                    .map(Component::inertia_kgm2)
                    .sum::<f64>()
    }

    /// Validate the tree and assign preorder ids. Must be called on the
    /// root before resolution; the vehicle does this at construction.
    pub fn finalize(&mut self) -> PowertrainResult<()> {
        let mut names = HashSet::new();
        self.validate(&mut names)?;
        let mut next = 0u32;
        self.assign_ids(&mut next);
        Ok(())
    }

    fn validate(&self, names: &mut HashSet<String>) -> PowertrainResult<()> {
        if !names.insert(self.name.clone()) {
            return Err(PowertrainError::InconsistentTree {
                what: format!("duplicate component name '{}'", self.name),
            });
        }
        if self.fixed_omega_rad_s.is_some() && !self.domain.is_mechanical() {
            return Err(PowertrainError::InconsistentTree {
                what: format!("non-mechanical component '{}' has a fixed omega", self.name),
            });
        }
        for child in &self.children {
            let compatible = (self.domain.is_electrical() && child.domain.is_electrical())
                || (self.domain.is_mechanical() && child.domain.is_mechanical());
            if !compatible {
                return Err(PowertrainError::InconsistentTree {
                    what: format!(
                        "child '{}' is incompatible with '{}': hardware type mismatch",
                        child.name, self.name
                    ),
                });
            }
            child.validate(names)?;
        }
        Ok(())
    }

    fn assign_ids(&mut self, next: &mut u32) {
        self.id = Some(CompId::from_index(*next));
        *next += 1;
        for child in &mut self.children {
            child.assign_ids(next);
        }
    }

    /// The gearing ratio between this node's output and its children's
    /// input at the given angular velocity.
    pub(crate) fn child_gearing_ratio(&self, omega_rad_s: Option<f64>) -> f64 {
        match (&self.kind, omega_rad_s) {
            (
                ComponentKind::Gearbox {
                    ratios,
                    upshift_omega_rad_s,
                },
                Some(omega),
            ) => {
                let selected = ratios
                    .iter()
                    .zip(upshift_omega_rad_s)
                    .position(|(&r, &upshift)| omega * r < upshift);
                match selected {
                    Some(i) => ratios[i],
                    // Past the last upshift point: stay in top gear.
                    None => ratios.last().copied().unwrap_or(self.gearing_ratio),
                }
            }
            _ => self.gearing_ratio,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pt_core::{kg, kgm2, watt};

    fn battery_leaf(name: &str) -> Component {
        Component::source(
            name,
            EnergySource::electrical(
                1.0,
                kg(1_000.0),
                watt(1e5),
                watt(1e5),
                EfficiencyCurve::identity(),
            )
            .unwrap(),
        )
    }

    #[test]
    fn mass_rolls_up_through_children() {
        let motor = Component::converter("motor", Domain::Both, vec![battery_leaf("battery")])
            .with_dry_mass(kg(25.0));
        // Battery carrier mass is 1000 kg at 1 J/kg density.
        assert!((motor.mass_kg() - 1_025.0).abs() < 1e-9);
    }

    #[test]
    fn inertia_folds_through_gearing() {
        let inner = Component::converter("shaft", Domain::Mechanical, vec![])
            .with_inertia(kgm2(2.0));
        let outer = Component::converter("drive", Domain::Mechanical, vec![inner])
            .with_inertia(kgm2(1.0))
            .with_gearing_ratio(3.0);
        // 1 + 3² · 2 = 19
        assert!((outer.inertia_kgm2() - 19.0).abs() < 1e-9);
    }

    #[test]
    fn electrical_subtree_has_no_inertia() {
        let battery = battery_leaf("battery");
        assert_eq!(battery.inertia_kgm2(), 0.0);
    }

    #[test]
    fn duplicate_names_rejected() {
        let mut tree = Component::converter(
            "root",
            Domain::Both,
            vec![battery_leaf("cell"), battery_leaf("cell")],
        );
        let err = tree.finalize().unwrap_err();
        assert!(matches!(err, PowertrainError::InconsistentTree { .. }));
    }

    #[test]
    fn domain_mismatch_rejected() {
        // Battery (electrical) directly under a mechanical-only node.
        let mut tree = Component::converter(
            "final drive",
            Domain::Mechanical,
            vec![battery_leaf("battery")],
        );
        let err = tree.finalize().unwrap_err();
        assert!(matches!(err, PowertrainError::InconsistentTree { .. }));
    }

    #[test]
    fn motor_bridges_domains() {
        let motor = Component::converter("motor", Domain::Both, vec![battery_leaf("battery")]);
        let mut tree = Component::converter("chassis", Domain::Mechanical, vec![motor]);
        assert!(tree.finalize().is_ok());
    }

    #[test]
    fn finalize_assigns_preorder_ids() {
        let motor = Component::converter("motor", Domain::Both, vec![battery_leaf("battery")]);
        let mut tree = Component::converter("chassis", Domain::Mechanical, vec![motor]);
        tree.finalize().unwrap();

        assert_eq!(tree.id().unwrap().index(), 0);
        assert_eq!(tree.children()[0].id().unwrap().index(), 1);
        assert_eq!(tree.children()[0].children()[0].id().unwrap().index(), 2);
    }

    #[test]
    fn gearbox_selects_gear_by_upshift() {
        let gb = Component::gearbox(
            "gearbox",
            vec![3.0, 2.0, 1.0],
            vec![300.0, 500.0, f64::INFINITY],
            vec![],
        )
        .unwrap();

        // Low speed: first gear holds (50 · 3 = 150 < 300).
        assert_eq!(gb.child_gearing_ratio(Some(50.0)), 3.0);
        // 150 · 3 = 450 ≥ 300 but 150 · 2 = 300 < 500: second gear.
        assert_eq!(gb.child_gearing_ratio(Some(150.0)), 2.0);
        // Very fast: top gear.
        assert_eq!(gb.child_gearing_ratio(Some(10_000.0)), 1.0);
    }

    #[test]
    fn gearbox_tables_validated() {
        assert!(Component::gearbox("g", vec![], vec![], vec![]).is_err());
        assert!(Component::gearbox("g", vec![1.0], vec![1.0, 2.0], vec![]).is_err());
    }
}
