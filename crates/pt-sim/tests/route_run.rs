//! Whole-route runs: processing a track, stepping it, and the aggregates.

use pt_components::{Component, Domain, EfficiencyCurve, EnergySource, library};
use pt_core::{kg, kgm2, m, m2, watt};
use pt_route::{RawTrack, RouteOptions, RouteProcessor, TrackPoint};
use pt_sim::{SimOptions, Vehicle, VehicleSpec, WheelSpec, run_batch, run_route};

fn spec() -> VehicleSpec {
    VehicleSpec {
        name: "commuter".into(),
        dry_mass: kg(160.0),
        front_mass_ratio: 0.48,
        front_wheel: WheelSpec {
            radius: m(0.3),
            inertia: kgm2(0.6),
            rolling_resistance: 0.015,
        },
        rear_wheel: WheelSpec {
            radius: m(0.32),
            inertia: kgm2(0.8),
            rolling_resistance: 0.015,
        },
        frontal_area: m2(0.6),
        drag_coefficient: 0.7,
    }
}

fn electric_vehicle() -> Vehicle {
    let battery = Component::source(
        "battery",
        EnergySource::electrical(
            7.2e5,
            kg(50.0),
            watt(3e4),
            watt(2e4),
            EfficiencyCurve::constant(0.93).unwrap(),
        )
        .unwrap(),
    );
    let motor = Component::converter("motor", Domain::Both, vec![battery])
        .with_efficiency(EfficiencyCurve::constant(0.94).unwrap());
    let wheel = Component::converter(
        "rear wheel",
        Domain::Mechanical,
        vec![motor, Component::brake("brake")],
    );
    Vehicle::new(spec(), wheel).unwrap()
}

/// A steady 18 m/s cruise with a gentle hill in the middle.
fn hilly_track(n: usize) -> RawTrack {
    RawTrack::Distance(
        (0..n)
            .map(|i| {
                let t = i as f64;
                let elevation = 100.0 + 10.0 * (t / n as f64 * std::f64::consts::PI).sin();
                TrackPoint::new(t * 18.0, elevation, t)
            })
            .collect(),
    )
}

#[test]
fn route_run_collects_records_and_aggregates() {
    let processor = RouteProcessor::new(RouteOptions::default()).unwrap();
    let profile = processor.process(&hilly_track(120)).unwrap();

    let mut vehicle = electric_vehicle();
    let record = run_route(&mut vehicle, "hilly commute", &profile, &SimOptions::default())
        .unwrap();

    assert_eq!(record.steps.len(), profile.len() - 1);
    assert_eq!(record.manifest.route, "hilly commute");
    assert_eq!(record.manifest.steps, profile.len() - 1);

    let summary = &record.manifest.summary;
    assert!(summary.distance_m > 0.0);
    assert!((summary.duration_s - 119.0).abs() < 1e-9);
    assert!(summary.energy_delivered_j > 0.0);
    // Demand, delivery, shortfall stay consistent in aggregate.
    assert!(
        (summary.energy_demanded_j - summary.energy_delivered_j - summary.shortfall_j).abs()
            < 1e-6
    );
    assert!(summary.mean_speed_mps > 0.0);
    // An 18 m/s cruise never drops below the moving threshold.
    assert!((summary.moving_time_s - summary.duration_s).abs() < 1e-9);
    assert!(summary.min_speed_mps <= summary.max_speed_mps);
    assert_eq!(summary.source_consumption.len(), 1);
    let battery = &summary.source_consumption[0];
    assert!(battery.consumed_j > 0.0);
    assert!(battery.percent_remaining() < 100.0);

    // Range estimate extrapolates the run's own burn rate.
    let burn_j_per_m = battery.consumed_j / summary.distance_m;
    assert!((summary.avg_consumption_j_per_m - burn_j_per_m).abs() < 1e-9);
    let range_m = battery.estimated_range_m.unwrap();
    assert!((range_m - battery.remaining_j / burn_j_per_m).abs() < 1e-6);
}

#[test]
fn battery_level_is_monotonic_in_the_records_uphill() {
    let processor = RouteProcessor::new(RouteOptions::default()).unwrap();
    // Steady climb: no descent, so no regenerative recharge anywhere.
    let track = RawTrack::Distance(
        (0..60)
            .map(|i| TrackPoint::new(i as f64 * 15.0, 100.0 + i as f64 * 0.5, i as f64))
            .collect(),
    );
    let profile = processor.process(&track).unwrap();

    let mut vehicle = electric_vehicle();
    let record = run_route(&mut vehicle, "climb", &profile, &SimOptions::default()).unwrap();

    let mut previous = f64::INFINITY;
    for step in &record.steps {
        let level = step.sources[0].remaining_j;
        assert!(level <= previous + 1e-9);
        previous = level;
    }
}

#[test]
fn record_decimation_keeps_the_final_step() {
    let processor = RouteProcessor::new(RouteOptions::default()).unwrap();
    let profile = processor.process(&hilly_track(100)).unwrap();

    let opts = SimOptions {
        record_every: 7,
        ..SimOptions::default()
    };
    let mut vehicle = electric_vehicle();
    let record = run_route(&mut vehicle, "decimated", &profile, &opts).unwrap();

    assert!(record.steps.len() < profile.len() - 1);
    let last = record.steps.last().unwrap();
    let final_sample = profile.samples.last().unwrap();
    assert!((last.time_s - final_sample.target_time_s).abs() < 1e-9);
}

#[test]
fn depletion_carries_over_until_refilled() {
    let processor = RouteProcessor::new(RouteOptions::default()).unwrap();
    let profile = processor.process(&hilly_track(60)).unwrap();
    let opts = SimOptions::default();

    let mut vehicle = electric_vehicle();
    run_route(&mut vehicle, "leg 1", &profile, &opts).unwrap();
    let after_first = vehicle.source_levels().unwrap()[0].remaining_j;

    run_route(&mut vehicle, "leg 2", &profile, &opts).unwrap();
    let after_second = vehicle.source_levels().unwrap()[0].remaining_j;
    assert!(after_second < after_first);

    vehicle.refill_sources();
    let levels = vehicle.source_levels().unwrap();
    assert_eq!(levels[0].remaining_j, levels[0].capacity_j);
}

#[test]
fn hybrid_from_the_catalog_completes_a_route() {
    let processor = RouteProcessor::new(RouteOptions::default()).unwrap();
    let profile = processor.process(&hilly_track(90)).unwrap();

    let engine = library::combustion_engine(&library::ENGINE_250CC_20KW, 12.0).unwrap();
    let motor = library::electric_motor(
        &library::MOTOR_15KW_MID_DRIVE,
        0.8,
        vec![library::battery_pack(&library::BATTERY_5KWH).unwrap()],
    )
    .unwrap();
    let wheel = Component::converter(
        "rear wheel",
        Domain::Mechanical,
        vec![engine, motor, library::mechanical_brake()],
    );
    let mut vehicle = Vehicle::new(spec(), wheel).unwrap();

    let record = run_route(&mut vehicle, "hybrid", &profile, &SimOptions::default()).unwrap();
    let summary = &record.manifest.summary;
    assert!(summary.energy_delivered_j > 0.0);
    // Both reservoirs show up in the consumption report.
    assert_eq!(summary.source_consumption.len(), 2);
}

#[test]
fn batch_runs_each_route_on_a_fresh_vehicle() {
    let processor = RouteProcessor::new(RouteOptions::default()).unwrap();
    let routes: Vec<(String, _)> = [40, 60, 80]
        .into_iter()
        .map(|n| {
            (
                format!("route {n}"),
                processor.process(&hilly_track(n)).unwrap(),
            )
        })
        .collect();

    let results = run_batch(&routes, || Ok(electric_vehicle()), &SimOptions::default());

    assert_eq!(results.len(), 3);
    for (result, (label, _)) in results.iter().zip(&routes) {
        let record = result.as_ref().expect("route should simulate");
        assert_eq!(&record.manifest.route, label);
        assert!(record.manifest.summary.energy_delivered_j > 0.0);
    }
}
