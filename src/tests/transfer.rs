use std::{collections::HashMap, f64::consts::PI};

use approx::assert_relative_eq;

use super::{assertions::*, init_tracing, seeders::*};
use crate::{
    geometry::signed_angle, hohmann, BodyId, HohmannTransfer, Orbit, OrbitProvider,
    ShipCapabilities, SolverConfig, TransferError, TransferPlan,
};

fn hohmann_plan(
    provider: &HashMap<BodyId, Orbit>,
    from: BodyId,
    to: BodyId,
) -> (TransferPlan, HohmannTransfer) {
    let mut plan = TransferPlan::new(from, to, 0.0, 1.0);
    let transfer = plan
        .initialize_hohmann(provider, 0.0, &SolverConfig::default())
        .expect("Hohmann plan should solve");

    (plan, transfer)
}

#[test]
fn hohmann_estimate_matches_closed_form() {
    let provider = circular_pair(1.0);
    let from = &provider[&DEPARTURE];
    let to = &provider[&ARRIVAL];

    let transfer = hohmann::hohmann_transfer(from, to, 0.0, &Default::default());
    let transfer_sma = 0.5 * (ENCELADUS_SMA + TETHYS_SMA);

    assert_relative_eq!(transfer.transfer_semi_major_axis, transfer_sma, max_relative = 1e-12);
    assert_relative_eq!(
        transfer.flight_time,
        PI * (transfer_sma.powi(3) / SATURN_MU).sqrt(),
        max_relative = 1e-12
    );
    assert!(transfer.departure_time >= 0.0);
    assert!(transfer.departure_time < synodic_period(from, to));

    // At departure the target must be exactly where the ship arrives half
    // an orbit later.
    let departure = from.get_position(transfer.departure_time).cartesian;
    let arrival = to.get_position(transfer.arrival_time).cartesian;
    let swept = signed_angle(departure, arrival, from.get_normal());

    assert!((swept.abs() - PI).abs() < 1e-6, "swept {swept}");
}

fn synodic_period(from: &Orbit, to: &Orbit) -> f64 {
    (2.0 * PI / (from.get_mean_motion() - to.get_mean_motion())).abs()
}

#[test]
fn lambert_reproduces_hohmann_outward() {
    init_tracing();
    let provider = circular_pair(1.0);
    let (plan, transfer) = hohmann_plan(&provider, DEPARTURE, ARRIVAL);

    assert!(plan.is_solved());
    assert_eq!(plan.departure_time(), transfer.departure_time);
    assert_eq!(plan.arrival_time(), transfer.arrival_time);

    let primary = plan.primary().expect("solved plan");
    assert!(!primary.case.is_hyperbolic());
    assert!(primary.orbit.is_prograde());

    assert_almost_eq_rel(plan.tot_dv(), transfer.total_dv(), 1e-5, "total delta-v");
    assert_almost_eq_rel(primary.departure_dv, transfer.departure_dv, 1e-5, "departure delta-v");
    assert_almost_eq_rel(primary.arrival_dv, transfer.arrival_dv, 1e-5, "arrival delta-v");
    assert_almost_eq_rel(
        primary.orbit.get_semi_major_axis(),
        transfer.transfer_semi_major_axis,
        1e-6,
        "transfer orbit sma",
    );

    // Speeding up at periapsis, then being overtaken by the target
    let departure_velocity = provider
        .velocity_at(DEPARTURE, plan.departure_time())
        .expect("known body");
    let arrival_velocity = provider
        .velocity_at(ARRIVAL, plan.arrival_time())
        .expect("known body");

    assert!(primary.departure_excess.dot(departure_velocity) > 0.0);
    assert!(primary.arrival_excess.dot(arrival_velocity) > 0.0);
}

#[test]
fn lambert_reproduces_hohmann_inward() {
    let provider = circular_pair(2.5);
    let (plan, transfer) = hohmann_plan(&provider, ARRIVAL, DEPARTURE);

    assert_almost_eq_rel(plan.tot_dv(), transfer.total_dv(), 1e-5, "total delta-v");
}

#[test]
fn lambert_reproduces_hohmann_retrograde() {
    let provider = retrograde_pair(1.0);
    let (plan, transfer) = hohmann_plan(&provider, DEPARTURE, ARRIVAL);

    assert!(plan.is_solved());
    assert_almost_eq_rel(plan.tot_dv(), transfer.total_dv(), 1e-4, "total delta-v");

    let primary = plan.primary().expect("solved plan");
    assert!(!primary.orbit.is_prograde());

    let departure_velocity = provider
        .velocity_at(DEPARTURE, plan.departure_time())
        .expect("known body");
    assert!(primary.departure_excess.dot(departure_velocity) > 0.0);

    let departure = provider[&DEPARTURE].get_position(plan.departure_time()).cartesian;
    let arrival = provider[&ARRIVAL].get_position(plan.arrival_time()).cartesian;

    for branch in plan.branches() {
        let what = format!("{:?} branch", branch.case);
        assert_vec3_close_rel(
            branch.orbit.get_position(plan.departure_time()).cartesian,
            departure,
            1e-4,
            &format!("{what} departure"),
        );
        assert_vec3_close_rel(
            branch.orbit.get_position(plan.arrival_time()).cartesian,
            arrival,
            1e-4,
            &format!("{what} arrival"),
        );
    }
}

#[test]
fn transfer_orbit_reaches_target() {
    let provider = circular_pair(0.3);
    let mut plan = TransferPlan::new(DEPARTURE, ARRIVAL, 1.0e4, 8.0e4);
    plan.solve(&provider, &SolverConfig::default())
        .expect("plan should solve");

    let target = provider[&ARRIVAL].get_position(plan.arrival_time()).cartesian;

    for branch in plan.branches() {
        assert_vec3_close_rel(
            branch.orbit.get_position(plan.arrival_time()).cartesian,
            target,
            1e-4,
            &format!("{:?} branch arrival", branch.case),
        );
    }
}

#[test]
fn primary_is_the_cheaper_branch() {
    let provider = circular_pair(1.7);
    let config = SolverConfig::default();

    for (departure, arrival) in [(0.0, 3.0e4), (2.0e4, 9.0e4), (5.0e4, 2.0e5), (0.0, 4.0e3)] {
        let mut plan = TransferPlan::new(DEPARTURE, ARRIVAL, departure, arrival);
        plan.solve(&provider, &config).expect("plan should solve");

        assert!(plan.num_solutions() > 0);
        let primary = plan.primary().expect("solved plan");
        assert_eq!(primary.total_dv(), plan.tot_dv());

        match plan.secondary() {
            Some(secondary) => {
                assert!(plan.tot_dv() <= plan.tot_dv_sec());
                assert_eq!(secondary.total_dv(), plan.tot_dv_sec());
            }
            None => assert_eq!(plan.tot_dv_sec(), f64::INFINITY),
        }
    }
}

#[test]
fn unsolved_plan_costs_infinity() {
    let provider = circular_pair(1.0);
    let mut plan = TransferPlan::new(DEPARTURE, ARRIVAL, 0.0, 5.0e4);

    assert!(!plan.is_solved());
    assert_eq!(plan.num_solutions(), 0);
    assert!(plan.primary().is_none());
    assert_eq!(plan.tot_dv(), f64::INFINITY);
    assert_eq!(plan.tot_dv_sec(), f64::INFINITY);

    plan.solve(&provider, &SolverConfig::default())
        .expect("plan should solve");
    assert!(plan.is_solved());

    plan.set_arrival_time(6.0e4);
    assert!(!plan.is_solved());
    assert_eq!(plan.tot_dv(), f64::INFINITY);
}

#[test]
fn unknown_body_is_reported() {
    let provider = circular_pair(1.0);
    let mut plan = TransferPlan::new(DEPARTURE, BodyId(7), 0.0, 5.0e4);

    assert_eq!(
        plan.solve(&provider, &SolverConfig::default()),
        Err(TransferError::UnknownBody(BodyId(7)))
    );
    assert!(!plan.is_solved());
}

#[test]
fn arrival_must_follow_departure() {
    let provider = circular_pair(1.0);
    let mut plan = TransferPlan::new(DEPARTURE, ARRIVAL, 5.0e4, 5.0e4);

    assert_eq!(
        plan.solve(&provider, &SolverConfig::default()),
        Err(TransferError::NonMonotonicTimes {
            departure: 5.0e4,
            arrival: 5.0e4,
        })
    );
}

#[test]
fn bodies_must_share_a_central_body() {
    let provider = HashMap::from([
        (DEPARTURE, Orbit::new_flat(0.0, 1.0, 0.0, 0.0, 1.0, true).expect("valid orbit")),
        (ARRIVAL, Orbit::new_flat(0.0, 2.0, 0.0, 0.0, 2.0, true).expect("valid orbit")),
    ]);
    let mut plan = TransferPlan::new(DEPARTURE, ARRIVAL, 0.0, 1.0);

    assert_eq!(
        plan.solve(&provider, &SolverConfig::default()),
        Err(TransferError::MismatchedMu {
            departure: 1.0,
            arrival: 2.0,
        })
    );
}

#[test]
fn payload_follows_the_rocket_equation() {
    let ship = ShipCapabilities::default();

    assert_almost_eq(ship.payload_capacity(0.0), ship.max_capacity, "no delta-v");
    assert_almost_eq(ship.payload_capacity(ship.max_dv), 0.0, "all delta-v");
    assert_eq!(ship.payload_capacity(2.0 * ship.max_dv), 0.0);

    let mut previous = ship.max_capacity;
    for i in 1..=10 {
        let payload = ship.payload_capacity(i as f64 * 0.1 * ship.max_dv);
        assert!(payload <= previous);
        previous = payload;
    }
}

#[test]
fn payload_depends_on_validity() {
    let provider = circular_pair(1.0);
    let (mut plan, transfer) = hohmann_plan(&provider, DEPARTURE, ARRIVAL);
    let ship = ShipCapabilities::default();

    let before_departure = transfer.departure_time - 1.0;
    assert!(plan.is_valid(&ship, before_departure));

    plan.update_payload(&ship, before_departure);
    assert_almost_eq_rel(
        plan.resource_transfer.quantity,
        ship.payload_capacity(plan.tot_dv()),
        1e-12,
        "payload before departure",
    );
    assert!(plan.resource_transfer.quantity > 0.0);

    plan.update_payload(&ship, transfer.departure_time + 1.0);
    assert_eq!(plan.resource_transfer.quantity, 0.0);

    let weak_ship = ShipCapabilities {
        max_dv: 0.5 * plan.tot_dv(),
        ..ship
    };
    assert!(!plan.is_valid(&weak_ship, before_departure));
}
