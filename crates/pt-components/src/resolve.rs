//! Iterative energy resolution over the component tree.
//!
//! Each timestep the root is asked for a demanded amount of energy. A
//! composite node converts the demand to an input-side target through its
//! efficiency curve and splits it across its children. Children that cannot
//! meet their share (power window, empty reservoir) are frozen at what they
//! produced and the remaining shortfall is redistributed among the rest,
//! until the total settles within tolerance or every child is frozen.
//!
//! Reservoirs mutate on every request, so each redistribution round replays
//! against a snapshot of the children taken on entry; only the final round's
//! debits stand.

use crate::component::{Component, ComponentKind};
use crate::efficiency::OperatingPoint;
use crate::error::{PowertrainError, PowertrainResult};
use crate::source::SourceKind;
use pt_core::CompId;
use tracing::warn;

/// How a composite splits its input-side target across children.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Allocation {
    /// Every unfrozen child is asked for an equal share of the remainder.
    #[default]
    EqualShare,
    /// Children are asked in declaration order, each for the full
    /// remainder. Deterministic in a single pass.
    PriorityOrder,
}

/// Tuning for the resolution loop.
#[derive(Clone, Copy, Debug)]
pub struct ResolveOptions {
    /// Convergence tolerance on delivered energy (J).
    pub epsilon_j: f64,
    /// Redistribution rounds per composite before giving up. Each
    /// non-final round freezes at least one child, so `children + 1`
    /// always suffices.
    pub max_iterations: usize,
    pub allocation: Allocation,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            epsilon_j: 1.0,
            max_iterations: 8,
            allocation: Allocation::EqualShare,
        }
    }
}

/// Per-component share of a resolved step, in preorder.
#[derive(Clone, Debug)]
pub struct DeliveryRow {
    pub id: CompId,
    pub name: String,
    pub delivered_j: f64,
}

/// Reservoir fill state, captured after a step.
#[derive(Clone, Debug)]
pub struct SourceLevelRow {
    pub id: CompId,
    pub name: String,
    pub remaining_j: f64,
    pub capacity_j: f64,
}

/// Outcome of resolving one demand against a subtree.
#[derive(Clone, Debug, Default)]
pub struct Resolution {
    /// Energy actually delivered at this node's output (J).
    pub delivered_j: f64,
    /// Breakdown for this node and everything below it, self first.
    pub rows: Vec<DeliveryRow>,
}

impl Component {
    fn require_id(&self) -> PowertrainResult<CompId> {
        self.id.ok_or_else(|| PowertrainError::InconsistentTree {
            what: format!("component '{}' used before finalize", self.name),
        })
    }

    /// Resolve a demand against this subtree, mutating reservoir levels.
    ///
    /// Positive demand asks the subtree to produce; negative demand offers
    /// it energy to absorb. The delivered amount may fall short of the
    /// demand; that is an operating condition, not an error.
    ///
    /// # Arguments
    /// * `demand_j` - Energy wanted at this node's output over the step (J).
    /// * `dt_s` - Step duration, for power-window clamping.
    /// * `omega_rad_s` - Shaft angular velocity at this node, if driven.
    ///
    /// # Errors
    /// Returns an error if ids were never assigned, `dt_s` is not positive,
    /// or a fixed-omega node is driven by an external angular velocity.
    pub fn resolve(
        &mut self,
        demand_j: f64,
        dt_s: f64,
        omega_rad_s: Option<f64>,
        opts: &ResolveOptions,
    ) -> PowertrainResult<Resolution> {
        if dt_s <= 0.0 {
            return Err(PowertrainError::InvalidArg {
                what: "dt must be positive",
            });
        }
        let id = self.require_id()?;

        let node_omega = match (self.fixed_omega_rad_s, omega_rad_s) {
            (Some(_), Some(_)) => {
                return Err(PowertrainError::InconsistentTree {
                    what: format!(
                        "fixed-omega component '{}' driven by an external angular velocity",
                        self.name
                    ),
                });
            }
            (Some(fixed), None) => Some(fixed),
            (None, driven) => driven,
        };

        if self.disable_on_zero_demand && demand_j == 0.0 {
            let mut rows = Vec::new();
            self.push_zero_rows(&mut rows)?;
            return Ok(Resolution {
                delivered_j: 0.0,
                rows,
            });
        }

        if let ComponentKind::Source(src) = &mut self.kind {
            src.begin_step();
            let d = src.request(demand_j, dt_s, &OperatingPoint::at_omega(node_omega))?;
            return Ok(Resolution {
                delivered_j: d.delivered_j,
                rows: vec![DeliveryRow {
                    id,
                    name: self.name.clone(),
                    delivered_j: d.delivered_j,
                }],
            });
        }

        if matches!(self.kind, ComponentKind::Brake) {
            // Absorbs any surplus, produces nothing.
            let delivered = demand_j.min(0.0);
            return Ok(Resolution {
                delivered_j: delivered,
                rows: vec![DeliveryRow {
                    id,
                    name: self.name.clone(),
                    delivered_j: delivered,
                }],
            });
        }

        self.resolve_composite(id, demand_j, dt_s, node_omega, opts)
    }

    fn resolve_composite(
        &mut self,
        id: CompId,
        demand_j: f64,
        dt_s: f64,
        omega_rad_s: Option<f64>,
        opts: &ResolveOptions,
    ) -> PowertrainResult<Resolution> {
        let clamped_j = demand_j.clamp(self.min_power_w * dt_s, self.max_power_w * dt_s);
        let load_fraction = if self.max_power_w.is_finite() && self.max_power_w > 0.0 {
            Some((clamped_j / dt_s / self.max_power_w).abs().min(1.0))
        } else {
            None
        };
        let op = OperatingPoint {
            omega_rad_s,
            load_fraction,
        };
        let target_in_j = self.efficiency.energy_required(clamped_j, &op)?;

        if self.children.is_empty() {
            return Ok(Resolution {
                delivered_j: 0.0,
                rows: vec![DeliveryRow {
                    id,
                    name: self.name.clone(),
                    delivered_j: 0.0,
                }],
            });
        }

        let ratio = self.child_gearing_ratio(omega_rad_s);
        let n = self.children.len();
        let mut child_rows: Vec<Vec<DeliveryRow>> = vec![Vec::new(); n];
        let mut total_in_j = 0.0;

        match opts.allocation {
            Allocation::PriorityOrder => {
                let mut remaining = target_in_j;
                for (i, child) in self.children.iter_mut().enumerate() {
                    let child_omega = if child.domain.is_mechanical() {
                        omega_rad_s.map(|w| w * ratio)
                    } else {
                        None
                    };
                    let r = child.resolve(remaining, dt_s, child_omega, opts)?;
                    remaining -= r.delivered_j;
                    child_rows[i] = r.rows;
                }
                total_in_j = target_in_j - remaining;
            }
            Allocation::EqualShare => {
                let snapshot = self.children.clone();
                let mut frozen: Vec<Option<f64>> = vec![None; n];
                let mut converged = false;

                for _ in 0..opts.max_iterations {
                    // Replay against pristine reservoirs each round.
                    self.children.clone_from(&snapshot);

                    let active = frozen.iter().filter(|f| f.is_none()).count();
                    let frozen_sum: f64 = frozen.iter().flatten().sum();
                    let share_j = if active == 0 {
                        0.0
                    } else {
                        (target_in_j - frozen_sum) / active as f64
                    };

                    let mut newly_frozen = 0;
                    total_in_j = 0.0;
                    for i in 0..n {
                        let ask_j = frozen[i].unwrap_or(share_j);
                        let child_omega = if self.children[i].domain.is_mechanical() {
                            omega_rad_s.map(|w| w * ratio)
                        } else {
                            None
                        };
                        let r = self.children[i].resolve(ask_j, dt_s, child_omega, opts)?;
                        if frozen[i].is_none() && (r.delivered_j - ask_j).abs() > opts.epsilon_j {
                            frozen[i] = Some(r.delivered_j);
                            newly_frozen += 1;
                        }
                        total_in_j += r.delivered_j;
                        child_rows[i] = r.rows;
                    }

                    let shortfall_j = target_in_j - total_in_j;
                    if shortfall_j.abs() <= opts.epsilon_j || newly_frozen == 0 {
                        converged = true;
                        break;
                    }
                }

                if !converged {
                    warn!(
                        component = %self.name,
                        target_j = target_in_j,
                        supplied_j = total_in_j,
                        "energy resolution stopped at the iteration cap"
                    );
                }
            }
        }

        let delivered_j = self.efficiency.energy_delivered(total_in_j, &op)?;
        let mut rows = Vec::with_capacity(1 + child_rows.iter().map(Vec::len).sum::<usize>());
        rows.push(DeliveryRow {
            id,
            name: self.name.clone(),
            delivered_j,
        });
        for r in child_rows {
            rows.extend(r);
        }
        Ok(Resolution { delivered_j, rows })
    }

    fn push_zero_rows(&mut self, rows: &mut Vec<DeliveryRow>) -> PowertrainResult<()> {
        if let ComponentKind::Source(src) = &mut self.kind {
            src.begin_step();
        }
        rows.push(DeliveryRow {
            id: self.require_id()?,
            name: self.name.clone(),
            delivered_j: 0.0,
        });
        for child in &mut self.children {
            child.push_zero_rows(rows)?;
        }
        Ok(())
    }

    /// Offer surplus energy to the subtree's regenerative reservoirs,
    /// depth-first. Returns the amount absorbed; whatever remains is for
    /// the friction brakes. Each reservoir's per-step charge budget is
    /// shared with the resolution pass, so a step can never accept more
    /// than `max_charge_power_w · dt` in total.
    pub fn regenerate(&mut self, surplus_j: f64, dt_s: f64) -> PowertrainResult<f64> {
        if surplus_j <= 0.0 {
            return Ok(0.0);
        }
        if let ComponentKind::Source(src) = &mut self.kind {
            if src.kind() == SourceKind::Electrical {
                let d = src.request(-surplus_j, dt_s, &OperatingPoint::none())?;
                return Ok(-d.delivered_j);
            }
            return Ok(0.0);
        }
        if matches!(self.kind, ComponentKind::Brake) {
            return Ok(0.0);
        }
        let mut absorbed_j = 0.0;
        for child in &mut self.children {
            let left = surplus_j - absorbed_j;
            if left <= 0.0 {
                break;
            }
            absorbed_j += child.regenerate(left, dt_s)?;
        }
        Ok(absorbed_j)
    }

    /// Capture reservoir fill levels across the subtree, in preorder.
    pub fn source_levels(&self, out: &mut Vec<SourceLevelRow>) -> PowertrainResult<()> {
        if let ComponentKind::Source(src) = &self.kind {
            out.push(SourceLevelRow {
                id: self.require_id()?,
                name: self.name.clone(),
                remaining_j: src.remaining_j(),
                capacity_j: src.capacity_j(),
            });
        }
        for child in &self.children {
            child.source_levels(out)?;
        }
        Ok(())
    }

    /// Reset every reservoir in the subtree to full capacity.
    pub fn refill_sources(&mut self) {
        if let ComponentKind::Source(src) = &mut self.kind {
            src.refill();
        }
        for child in &mut self.children {
            child.refill_sources();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::Domain;
    use crate::efficiency::EfficiencyCurve;
    use crate::source::EnergySource;
    use pt_core::{kg, watt};

    fn battery(name: &str, capacity_j: f64, max_power_w: f64) -> Component {
        Component::source(
            name,
            EnergySource::electrical(
                1.0,
                kg(capacity_j),
                watt(max_power_w),
                watt(max_power_w),
                EfficiencyCurve::identity(),
            )
            .unwrap(),
        )
    }

    fn finalized(mut root: Component) -> Component {
        root.finalize().unwrap();
        root
    }

    #[test]
    fn resolve_before_finalize_is_an_error() {
        let mut b = battery("battery", 1e6, 1e6);
        let err = b
            .resolve(100.0, 1.0, None, &ResolveOptions::default())
            .unwrap_err();
        assert!(matches!(err, PowertrainError::InconsistentTree { .. }));
    }

    #[test]
    fn equal_share_splits_between_identical_children() {
        let mut root = finalized(Component::converter(
            "bus",
            Domain::Electrical,
            vec![battery("a", 1e6, 1e6), battery("b", 1e6, 1e6)],
        ));
        let r = root
            .resolve(1_000.0, 1.0, None, &ResolveOptions::default())
            .unwrap();

        assert!((r.delivered_j - 1_000.0).abs() < 1e-9);
        assert_eq!(r.rows.len(), 3);
        assert!((r.rows[1].delivered_j - 500.0).abs() < 1e-9);
        assert!((r.rows[2].delivered_j - 500.0).abs() < 1e-9);
    }

    #[test]
    fn shortfall_redistributes_to_the_stronger_child() {
        // "a" caps out at 200 W; "b" must pick up the remaining 800 J.
        let mut root = finalized(Component::converter(
            "bus",
            Domain::Electrical,
            vec![battery("a", 1e6, 200.0), battery("b", 1e6, 1e6)],
        ));
        let r = root
            .resolve(1_000.0, 1.0, None, &ResolveOptions::default())
            .unwrap();

        assert!((r.delivered_j - 1_000.0).abs() < 1e-9);
        assert!((r.rows[1].delivered_j - 200.0).abs() < 1e-9);
        assert!((r.rows[2].delivered_j - 800.0).abs() < 1e-9);
    }

    #[test]
    fn replay_debits_each_reservoir_exactly_once() {
        let mut root = finalized(Component::converter(
            "bus",
            Domain::Electrical,
            vec![battery("a", 1e6, 200.0), battery("b", 1e6, 1e6)],
        ));
        root.resolve(1_000.0, 1.0, None, &ResolveOptions::default())
            .unwrap();

        let mut levels = Vec::new();
        root.source_levels(&mut levels).unwrap();
        assert!((levels[0].remaining_j - (1e6 - 200.0)).abs() < 1e-9);
        assert!((levels[1].remaining_j - (1e6 - 800.0)).abs() < 1e-9);
    }

    #[test]
    fn depleted_tree_reports_shortfall_without_error() {
        let mut root = finalized(Component::converter(
            "bus",
            Domain::Electrical,
            vec![battery("a", 300.0, 1e6)],
        ));
        let r = root
            .resolve(1_000.0, 1.0, None, &ResolveOptions::default())
            .unwrap();
        assert!((r.delivered_j - 300.0).abs() < 1e-9);
    }

    #[test]
    fn priority_order_drains_in_declaration_order() {
        let mut root = finalized(Component::converter(
            "bus",
            Domain::Electrical,
            vec![battery("first", 1_000.0, 1e6), battery("second", 1_000.0, 1e6)],
        ));
        let opts = ResolveOptions {
            allocation: Allocation::PriorityOrder,
            ..Default::default()
        };
        let r = root.resolve(1_500.0, 1.0, None, &opts).unwrap();

        assert!((r.delivered_j - 1_500.0).abs() < 1e-9);
        assert!((r.rows[1].delivered_j - 1_000.0).abs() < 1e-9);
        assert!((r.rows[2].delivered_j - 500.0).abs() < 1e-9);
    }

    #[test]
    fn converter_losses_inflate_the_reserve_debit() {
        let motor = Component::converter("motor", Domain::Both, vec![battery("battery", 1e6, 1e6)])
            .with_efficiency(EfficiencyCurve::constant(0.8).unwrap());
        let mut root = finalized(motor);

        let r = root
            .resolve(800.0, 1.0, None, &ResolveOptions::default())
            .unwrap();
        assert!((r.delivered_j - 800.0).abs() < 1e-9);

        let mut levels = Vec::new();
        root.source_levels(&mut levels).unwrap();
        assert!((levels[0].remaining_j - (1e6 - 1_000.0)).abs() < 1e-9);
    }

    #[test]
    fn brake_absorbs_surplus_and_produces_nothing() {
        let mut brake = finalized(Component::brake("rear brake"));
        let r = brake
            .resolve(-400.0, 1.0, Some(50.0), &ResolveOptions::default())
            .unwrap();
        assert!((r.delivered_j + 400.0).abs() < 1e-9);

        let r = brake
            .resolve(400.0, 1.0, Some(50.0), &ResolveOptions::default())
            .unwrap();
        assert_eq!(r.delivered_j, 0.0);
    }

    #[test]
    fn disabled_converter_short_circuits_at_zero_demand() {
        let engine = Component::converter(
            "engine",
            Domain::Mechanical,
            vec![Component::source(
                "tank",
                EnergySource::chemical(43e6, kg(10.0), watt(5e4), EfficiencyCurve::identity())
                    .unwrap(),
            )],
        )
        .disableable();
        let mut root = finalized(engine);

        let r = root
            .resolve(0.0, 1.0, Some(100.0), &ResolveOptions::default())
            .unwrap();
        assert_eq!(r.delivered_j, 0.0);
        assert_eq!(r.rows.len(), 2);
        assert!(r.rows.iter().all(|row| row.delivered_j == 0.0));
    }

    #[test]
    fn fixed_omega_drives_its_own_efficiency_lookup() {
        // Generator pinned at 300 rad/s with an omega-dependent curve.
        let genset = Component::converter(
            "generator",
            Domain::Both,
            vec![battery("buffer", 1e6, 1e6)],
        )
        .with_efficiency(
            EfficiencyCurve::angular_velocity(vec![0.0, 300.0, 600.0], vec![0.2, 0.5, 0.2])
                .unwrap(),
        )
        .with_fixed_omega(300.0);
        let mut root = finalized(genset);

        let r = root
            .resolve(500.0, 1.0, None, &ResolveOptions::default())
            .unwrap();
        assert!((r.delivered_j - 500.0).abs() < 1e-9);

        // eta 0.5 at 300 rad/s: the buffer paid 1000 J.
        let mut levels = Vec::new();
        root.source_levels(&mut levels).unwrap();
        assert!((levels[0].remaining_j - (1e6 - 1_000.0)).abs() < 1e-9);
    }

    #[test]
    fn driving_a_fixed_omega_node_is_an_error() {
        let mut root = finalized(
            Component::converter("generator", Domain::Mechanical, vec![]).with_fixed_omega(300.0),
        );
        let err = root
            .resolve(100.0, 1.0, Some(50.0), &ResolveOptions::default())
            .unwrap_err();
        assert!(matches!(err, PowertrainError::InconsistentTree { .. }));
    }

    #[test]
    fn regenerate_prefers_electrical_sources() {
        let tank = Component::source(
            "tank",
            EnergySource::chemical(43e6, kg(10.0), watt(5e4), EfficiencyCurve::identity()).unwrap(),
        );
        let engine = Component::converter("engine", Domain::Mechanical, vec![tank]);
        let motor = Component::converter("motor", Domain::Both, vec![battery("battery", 1e6, 1e6)]);
        let mut root = finalized(Component::converter(
            "chassis",
            Domain::Mechanical,
            vec![engine, motor, Component::brake("brake")],
        ));

        // Drain a little so there is headroom, then offer 400 J back.
        root.resolve(1_000.0, 1.0, Some(50.0), &ResolveOptions::default())
            .unwrap();
        let absorbed = root.regenerate(400.0, 1.0).unwrap();
        assert!((absorbed - 400.0).abs() < 1e-9);
    }

    #[test]
    fn regenerate_stops_at_charge_headroom() {
        let mut root = finalized(Component::converter(
            "chassis",
            Domain::Mechanical,
            vec![Component::converter(
                "motor",
                Domain::Both,
                vec![battery("battery", 1e6, 1e6)],
            )],
        ));
        // Full battery: nothing lands.
        let absorbed = root.regenerate(400.0, 1.0).unwrap();
        assert_eq!(absorbed, 0.0);
    }

    #[test]
    fn refill_restores_every_reservoir() {
        let mut root = finalized(Component::converter(
            "bus",
            Domain::Electrical,
            vec![battery("a", 1_000.0, 1e6), battery("b", 1_000.0, 1e6)],
        ));
        root.resolve(800.0, 1.0, None, &ResolveOptions::default())
            .unwrap();
        root.refill_sources();

        let mut levels = Vec::new();
        root.source_levels(&mut levels).unwrap();
        assert!(levels.iter().all(|l| l.remaining_j == l.capacity_j));
    }
}
