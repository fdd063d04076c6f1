//! Plans transfers between Saturn's moons.
//!
//! Run with `RUST_LOG=debug` to see the solvers at work. With the `serde`
//! feature enabled, a TOML solver config can be passed as the first
//! argument.

use keplerian_transfer::{
    body_presets::saturn, optimizer, BodyId, ShipCapabilities, SolverConfig, TransferPlan,
    Universe,
};
use tracing_subscriber::EnvFilter;

const HOUR: f64 = 3600.0;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = load_config()?;

    let mut universe = Universe::default();
    let system = saturn::add_saturn_system(&mut universe)?;
    let ship = ShipCapabilities::default();

    let routes = [
        (system.enceladus, system.tethys),
        (system.tethys, system.rhea),
        (system.rhea, system.titan),
        (system.titan, system.enceladus),
    ];

    for (from, to) in routes {
        plan_route(&universe, &config, &ship, from, to)?;
    }

    Ok(())
}

fn plan_route(
    universe: &Universe,
    config: &SolverConfig,
    ship: &ShipCapabilities,
    from: BodyId,
    to: BodyId,
) -> Result<(), Box<dyn std::error::Error>> {
    let name = |id| universe.get_body(id).map_or("?", |body| body.name.as_str());
    println!("=== {} -> {} ===", name(from), name(to));

    let mut plan = TransferPlan::new(from, to, 0.0, 1.0);
    let hohmann = plan.initialize_hohmann(universe, universe.time, config)?;

    println!(
        "Hohmann: depart at {:.1} h, fly {:.1} h, estimate {:.1} m/s, solved {:.1} m/s",
        hohmann.departure_time / HOUR,
        hohmann.flight_time / HOUR,
        hohmann.total_dv(),
        plan.tot_dv(),
    );

    let window = 0.25 * hohmann.flight_time;
    let departure = optimizer::set_best_departure(
        &mut plan,
        universe,
        hohmann.departure_time - window,
        hohmann.departure_time + window,
        config,
    )?;

    println!(
        "Best departure: {:.1} h ({}), {:.1} m/s",
        departure.value() / HOUR,
        if departure.is_converged() { "converged" } else { "capped out" },
        plan.tot_dv(),
    );

    let dv_limit = 1.25 * plan.tot_dv();
    let arrival = optimizer::soonest(&mut plan, universe, dv_limit, universe.time, config)?;

    println!(
        "Soonest arrival within {:.1} m/s: {:.1} h after departure, {:.1} m/s",
        dv_limit,
        (arrival.value() - plan.departure_time()) / HOUR,
        plan.tot_dv(),
    );

    plan.update_payload(ship, universe.time);
    println!("Payload: {:.0} kg", plan.resource_transfer.quantity);

    Ok(())
}

#[cfg(feature = "serde")]
fn load_config() -> Result<SolverConfig, Box<dyn std::error::Error>> {
    match std::env::args().nth(1) {
        Some(path) => Ok(SolverConfig::load(path)?),
        None => Ok(SolverConfig::default()),
    }
}

#[cfg(not(feature = "serde"))]
fn load_config() -> Result<SolverConfig, Box<dyn std::error::Error>> {
    Ok(SolverConfig::default())
}
