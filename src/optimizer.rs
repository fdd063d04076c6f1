//! Searches over departure and arrival times.
//!
//! Both searches drive a [`TransferPlan`] directly: every probe sets the
//! plan's times and re-solves it, and the plan is left solved at the
//! returned time.

use tracing::{debug, warn};

use crate::{
    hohmann, transfer_plan::resolve_orbits, Convergence, OrbitProvider, SolverConfig,
    TransferError, TransferPlan,
};

fn departure_cost<P>(
    plan: &mut TransferPlan,
    provider: &P,
    config: &SolverConfig,
    departure_time: f64,
) -> Result<f64, TransferError>
where
    P: OrbitProvider + ?Sized,
{
    plan.set_departure_time(departure_time);
    plan.solve(provider, config)?;
    Ok(plan.tot_dv())
}

fn arrival_cost<P>(
    plan: &mut TransferPlan,
    provider: &P,
    config: &SolverConfig,
    arrival_time: f64,
) -> Result<f64, TransferError>
where
    P: OrbitProvider + ?Sized,
{
    plan.set_arrival_time(arrival_time);
    plan.solve(provider, config)?;
    Ok(plan.tot_dv())
}

/// Moves the plan's departure within `[window_start, window_end]` to
/// minimize its total delta-v, keeping the arrival fixed.
///
/// This is a one-dimensional Newton search on central differences with a
/// shrinking step cap. Steps that don't lower the cost are rejected and
/// halve the cap instead, so the cost never rises above the one at the
/// (clamped) starting departure. The search stops once a step or the cap
/// drops below [`time_precision`][crate::OptimizerConfig::time_precision].
///
/// Departures are kept one derivative step away from the window edges,
/// and from the arrival.
///
/// Returns the best departure found, which the plan is left solved at.
/// Running out of iterations yields [`Convergence::CappedOut`].
///
/// # Errors
/// Returns [`TransferError::InvalidWindow`] if the window is too short or
/// doesn't end before the arrival, and propagates any solve error. When a
/// solve fails mid-search, the plan is first re-solved at the best
/// departure found so far.
pub fn set_best_departure<P>(
    plan: &mut TransferPlan,
    provider: &P,
    window_start: f64,
    window_end: f64,
    config: &SolverConfig,
) -> Result<Convergence<f64>, TransferError>
where
    P: OrbitProvider + ?Sized,
{
    let settings = &config.optimizer;
    let h = settings.derivative_step;
    let arrival_time = plan.arrival_time();

    if !(window_end - h < arrival_time) {
        return Err(TransferError::InvalidWindow {
            start: window_start,
            end: window_end,
            reason: "window must end before the arrival",
        });
    }

    let low = window_start + h;
    let high = window_end.min(arrival_time - h) - h;

    if !(low < high) {
        return Err(TransferError::InvalidWindow {
            start: window_start,
            end: window_end,
            reason: "window is too short for the derivative step",
        });
    }

    let start_time = plan.departure_time().clamp(low, high);
    let mut best = (start_time, departure_cost(plan, provider, config, start_time)?);
    let max_step = settings.max_step_fraction * (window_end - window_start);

    let outcome = newton_departure(plan, provider, config, (low, high), max_step, &mut best);

    // A failed probe leaves the plan unsolved at the probe time
    let restored = departure_cost(plan, provider, config, best.0);
    let result = outcome?;
    restored?;

    Ok(result)
}

/// Runs the Newton iterations of [`set_best_departure`], keeping the best
/// `(departure, cost)` pair seen so far in `best`.
fn newton_departure<P>(
    plan: &mut TransferPlan,
    provider: &P,
    config: &SolverConfig,
    (low, high): (f64, f64),
    mut max_step: f64,
    best: &mut (f64, f64),
) -> Result<Convergence<f64>, TransferError>
where
    P: OrbitProvider + ?Sized,
{
    let settings = &config.optimizer;
    let h = settings.derivative_step;

    for iteration in 0..settings.max_iterations {
        let (best_time, best_cost) = *best;

        let cost_before = departure_cost(plan, provider, config, best_time - h)?;
        let cost_after = departure_cost(plan, provider, config, best_time + h)?;

        let slope = (cost_after - cost_before) / (2.0 * h);
        let curvature = (cost_after - 2.0 * best_cost + cost_before) / (h * h);

        let step = if curvature > 0.0 {
            -slope / curvature
        } else {
            // Not locally convex; walk downhill as far as allowed
            -slope.signum() * max_step
        };

        if !step.is_finite() {
            warn!(best_time, best_cost, "departure search hit a non-finite step");
            return Ok(Convergence::CappedOut(best_time));
        }

        let step = step.clamp(-max_step, max_step);

        debug!(iteration, best_time, best_cost, slope, curvature, step, "departure search step");

        if step.abs() < settings.time_precision {
            return Ok(Convergence::Converged(best_time));
        }

        let candidate = (best_time + step).clamp(low, high);
        let candidate_cost = departure_cost(plan, provider, config, candidate)?;

        if candidate_cost < best_cost {
            *best = (candidate, candidate_cost);
        } else {
            max_step *= 0.5;

            if max_step < settings.time_precision {
                return Ok(Convergence::Converged(best_time));
            }
        }
    }

    let (best_time, best_cost) = *best;
    warn!(best_time, best_cost, "departure search hit its iteration cap");

    Ok(Convergence::CappedOut(best_time))
}

/// Finds the earliest arrival that fits within `dv_limit`, departing at
/// the Hohmann-optimal time at or after `earliest`.
///
/// The arrival is bisected between a short flight of
/// [`min_flight_fraction`][crate::OptimizerConfig::min_flight_fraction]
/// times the Hohmann flight time, assumed too expensive, and the Hohmann
/// arrival itself, assumed affordable. The search stops once the
/// expensive bound is within
/// [`dv_precision`][crate::OptimizerConfig::dv_precision] of the limit.
///
/// Returns the arrival time, which the plan is left solved at together
/// with the chosen departure. The returned arrival is always one that was
/// found to fit within `dv_limit`, except when even the Hohmann arrival
/// doesn't: then a warning is logged and the Hohmann arrival is returned
/// as [`Convergence::CappedOut`]. Running out of iterations also yields
/// [`Convergence::CappedOut`].
///
/// # Errors
/// Propagates errors from resolving the bodies or solving the plan.
pub fn soonest<P>(
    plan: &mut TransferPlan,
    provider: &P,
    dv_limit: f64,
    earliest: f64,
    config: &SolverConfig,
) -> Result<Convergence<f64>, TransferError>
where
    P: OrbitProvider + ?Sized,
{
    let settings = &config.optimizer;

    let (from, to) = resolve_orbits(provider, plan.departure_planet(), plan.arrival_planet())?;
    let transfer = hohmann::hohmann_transfer(from, to, earliest, &config.hohmann);

    let departure_time = transfer.departure_time;
    let mut feasible = transfer.arrival_time;
    let mut infeasible = departure_time + settings.min_flight_fraction * transfer.flight_time;

    plan.set_times(departure_time, feasible);
    plan.solve(provider, config)?;

    if plan.tot_dv() > dv_limit {
        warn!(
            dv_limit,
            hohmann_dv = plan.tot_dv(),
            "even the Hohmann arrival exceeds the delta-v limit"
        );
        return Ok(Convergence::CappedOut(feasible));
    }

    let mut infeasible_cost = arrival_cost(plan, provider, config, infeasible)?;
    if infeasible_cost <= dv_limit {
        return Ok(Convergence::Converged(infeasible));
    }

    let mut converged = false;

    for iteration in 0..settings.max_iterations {
        if infeasible_cost - dv_limit < settings.dv_precision
            || feasible - infeasible < settings.time_precision
        {
            converged = true;
            break;
        }

        let mid = 0.5 * (feasible + infeasible);
        let cost = arrival_cost(plan, provider, config, mid)?;

        debug!(iteration, mid, cost, dv_limit, "arrival search step");

        if cost <= dv_limit {
            feasible = mid;
        } else {
            infeasible = mid;
            infeasible_cost = cost;
        }
    }

    arrival_cost(plan, provider, config, feasible)?;

    if converged {
        Ok(Convergence::Converged(feasible))
    } else {
        warn!(feasible, "arrival search hit its iteration cap");
        Ok(Convergence::CappedOut(feasible))
    }
}
