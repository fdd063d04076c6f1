use glam::DVec3;
use thiserror::Error;
use tracing::{debug, warn};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{
    hohmann::{self, HohmannTransfer},
    lambert::{self, LambertCase, LambertError, LambertProblem},
    BodyId, Orbit, OrbitProvider, SolverConfig,
};

/// Relative difference below which two gravitational parameters are
/// considered to belong to the same central body.
const MU_RELATIVE_TOLERANCE: f64 = 1e-9;

/// An error that can occur while solving or optimizing a [`TransferPlan`].
#[non_exhaustive]
#[derive(Clone, Copy, Debug, PartialEq, Error)]
pub enum TransferError {
    /// The body is unknown to the provider or has no orbit.
    #[error("body {0} is unknown or has no orbit")]
    UnknownBody(BodyId),

    /// The arrival doesn't come after the departure.
    #[error("arrival time {arrival} must come after departure time {departure}")]
    NonMonotonicTimes {
        #[allow(missing_docs)]
        departure: f64,
        #[allow(missing_docs)]
        arrival: f64,
    },

    /// The two bodies orbit different central bodies.
    #[error("bodies orbit different central bodies (mu {departure} vs {arrival})")]
    MismatchedMu {
        #[allow(missing_docs)]
        departure: f64,
        #[allow(missing_docs)]
        arrival: f64,
    },

    /// An optimizer search window can't be used.
    #[error("search window [{start}, {end}] is invalid: {reason}")]
    InvalidWindow {
        #[allow(missing_docs)]
        start: f64,
        #[allow(missing_docs)]
        end: f64,
        #[allow(missing_docs)]
        reason: &'static str,
    },

    /// Lambert's problem couldn't be solved.
    #[error(transparent)]
    Lambert(#[from] LambertError),
}

/// What a transfer carries.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ResourceTransfer {
    /// The kind of resource carried, if any.
    pub resource: Option<u32>,
    /// How much is carried, in kilograms.
    pub quantity: f64,
}

/// The propulsion limits of a ship.
///
/// Payload capacity trades off against delta-v through the rocket
/// equation: at zero delta-v the whole capacity is payload, at
/// [`max_dv`][Self::max_dv] it is all fuel.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ShipCapabilities {
    /// The delta-v with an empty cargo hold, in m/s.
    pub max_dv: f64,
    /// The effective exhaust velocity, in m/s.
    pub exhaust_velocity: f64,
    /// The combined fuel and payload capacity, in kilograms.
    pub max_capacity: f64,
}

impl ShipCapabilities {
    /// Gets the payload, in kilograms, that can be carried through a
    /// given delta-v.
    ///
    /// With `fuel_ratio = (exp(dv / v_e) - 1) / (exp(max_dv / v_e) - 1)`,
    /// the payload is `(1 - fuel_ratio) * max_capacity`, clamped to
    /// `[0, max_capacity]`.
    pub fn payload_capacity(&self, dv: f64) -> f64 {
        let fuel_ratio = (dv / self.exhaust_velocity).exp_m1()
            / (self.max_dv / self.exhaust_velocity).exp_m1();

        ((1.0 - fuel_ratio) * self.max_capacity).clamp(0.0, self.max_capacity)
    }
}

impl Default for ShipCapabilities {
    fn default() -> Self {
        Self {
            max_dv: 10_000.0,
            exhaust_velocity: 10_000.0,
            max_capacity: 100_000.0,
        }
    }
}

/// One way of flying a transfer, with its costs.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TransferBranch {
    /// Which regime of the Lambert time equation produced this branch.
    pub case: LambertCase,
    /// The transfer orbit around the central body.
    pub orbit: Orbit,
    /// Transfer orbit velocity minus departure body velocity, at departure.
    pub departure_excess: DVec3,
    /// Arrival body velocity minus transfer orbit velocity, at arrival.
    pub arrival_excess: DVec3,
    /// Delta-v to leave the departure body, in m/s.
    pub departure_dv: f64,
    /// Delta-v to be captured by the arrival body, in m/s.
    pub arrival_dv: f64,
}

impl TransferBranch {
    /// Gets the total delta-v of this branch, in m/s.
    pub fn total_dv(&self) -> f64 {
        self.departure_dv + self.arrival_dv
    }
}

/// A planned transfer from one body to another.
///
/// A plan is either unsolved or solved. Editing any of its bodies or times
/// clears the solution; [`solve`][Self::solve] fills it in again.
///
/// A solved plan holds one or two [`TransferBranch`]es. The cheaper one is
/// the primary solution, and its cost is [`tot_dv`][Self::tot_dv].
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TransferPlan {
    /// The cargo of this transfer.
    pub resource_transfer: ResourceTransfer,

    departure_planet: BodyId,
    arrival_planet: BodyId,
    departure_time: f64,
    arrival_time: f64,

    #[cfg_attr(feature = "serde", serde(skip))]
    branches: Vec<TransferBranch>,
    #[cfg_attr(feature = "serde", serde(skip))]
    primary_solution: usize,
}

impl TransferPlan {
    /// Creates a new, unsolved plan.
    pub fn new(
        departure_planet: BodyId,
        arrival_planet: BodyId,
        departure_time: f64,
        arrival_time: f64,
    ) -> Self {
        Self {
            resource_transfer: ResourceTransfer::default(),
            departure_planet,
            arrival_planet,
            departure_time,
            arrival_time,
            branches: Vec::new(),
            primary_solution: 0,
        }
    }

    /// Gets the body the transfer leaves from.
    pub fn departure_planet(&self) -> BodyId {
        self.departure_planet
    }

    /// Gets the body the transfer arrives at.
    pub fn arrival_planet(&self) -> BodyId {
        self.arrival_planet
    }

    /// Gets the departure time, in seconds.
    pub fn departure_time(&self) -> f64 {
        self.departure_time
    }

    /// Gets the arrival time, in seconds.
    pub fn arrival_time(&self) -> f64 {
        self.arrival_time
    }

    /// Sets the body the transfer leaves from, clearing any solution.
    pub fn set_departure_planet(&mut self, body: BodyId) {
        self.departure_planet = body;
        self.clear_solution();
    }

    /// Sets the body the transfer arrives at, clearing any solution.
    pub fn set_arrival_planet(&mut self, body: BodyId) {
        self.arrival_planet = body;
        self.clear_solution();
    }

    /// Sets the departure time, clearing any solution.
    pub fn set_departure_time(&mut self, time: f64) {
        self.departure_time = time;
        self.clear_solution();
    }

    /// Sets the arrival time, clearing any solution.
    pub fn set_arrival_time(&mut self, time: f64) {
        self.arrival_time = time;
        self.clear_solution();
    }

    /// Sets both times at once, clearing any solution.
    pub fn set_times(&mut self, departure_time: f64, arrival_time: f64) {
        self.departure_time = departure_time;
        self.arrival_time = arrival_time;
        self.clear_solution();
    }

    fn clear_solution(&mut self) {
        self.branches.clear();
        self.primary_solution = 0;
    }

    /// Returns `true` if the plan holds at least one solution.
    pub fn is_solved(&self) -> bool {
        !self.branches.is_empty()
    }

    /// Gets the number of solutions, 0 to 2.
    pub fn num_solutions(&self) -> usize {
        self.branches.len()
    }

    /// Gets the index of the cheaper solution within [`branches`][Self::branches].
    pub fn primary_solution(&self) -> usize {
        self.primary_solution
    }

    /// Gets all solutions, direct branch first.
    pub fn branches(&self) -> &[TransferBranch] {
        &self.branches
    }

    /// Gets the cheaper solution.
    pub fn primary(&self) -> Option<&TransferBranch> {
        self.branches.get(self.primary_solution)
    }

    /// Gets the more expensive solution, if there are two.
    pub fn secondary(&self) -> Option<&TransferBranch> {
        if self.branches.len() < 2 {
            return None;
        }
        self.branches.get(1 - self.primary_solution)
    }

    /// Gets the total delta-v of the primary solution, in m/s.
    ///
    /// Returns infinity for an unsolved plan.
    pub fn tot_dv(&self) -> f64 {
        self.primary()
            .map_or(f64::INFINITY, TransferBranch::total_dv)
    }

    /// Gets the total delta-v of the secondary solution, in m/s.
    ///
    /// Returns infinity unless there are two solutions.
    pub fn tot_dv_sec(&self) -> f64 {
        self.secondary()
            .map_or(f64::INFINITY, TransferBranch::total_dv)
    }

    /// Solves the plan for its current bodies and times.
    ///
    /// Both Lambert branches are computed. Each one gets its excess
    /// velocities and the delta-v the provider assigns to them, and the
    /// cheaper one becomes the primary solution.
    ///
    /// # Errors
    /// Returns an error (and leaves the plan unsolved) if a body can't be
    /// resolved, if the arrival doesn't come after the departure, if the
    /// two bodies orbit different central bodies, or if Lambert's problem
    /// fails.
    pub fn solve<P>(&mut self, provider: &P, config: &SolverConfig) -> Result<(), TransferError>
    where
        P: OrbitProvider + ?Sized,
    {
        self.clear_solution();

        let (from, to) = resolve_orbits(provider, self.departure_planet, self.arrival_planet)?;

        if !(self.arrival_time > self.departure_time) {
            return Err(TransferError::NonMonotonicTimes {
                departure: self.departure_time,
                arrival: self.arrival_time,
            });
        }

        let departure = from.get_position(self.departure_time);
        let arrival = to.get_position(self.arrival_time);
        let departure_velocity = from.get_velocity(&departure);
        let arrival_velocity = to.get_velocity(&arrival);

        let problem = LambertProblem {
            r1: departure.cartesian,
            t1: self.departure_time,
            r2: arrival.cartesian,
            t2: self.arrival_time,
            mu: from.get_gravitational_parameter(),
            reference_normal: from.get_normal(),
        };

        let solutions = lambert::solve(&problem, &config.lambert)?;
        let (departure_planet, arrival_planet) = (self.departure_planet, self.arrival_planet);

        self.branches = solutions
            .into_iter()
            .map(|solution| {
                let departure_excess = solution.departure_velocity() - departure_velocity;
                let arrival_excess = arrival_velocity - solution.arrival_velocity();

                TransferBranch {
                    case: solution.case,
                    departure_dv: provider.dv_from_excess_velocity(departure_planet, departure_excess),
                    arrival_dv: provider.dv_from_excess_velocity(arrival_planet, arrival_excess),
                    orbit: solution.orbit,
                    departure_excess,
                    arrival_excess,
                }
            })
            .filter(|branch| {
                let finite = branch.total_dv().is_finite();
                if !finite {
                    warn!(case = ?branch.case, "dropping transfer branch with non-finite delta-v");
                }
                finite
            })
            .collect();

        self.primary_solution = match self.branches.as_slice() {
            [first, second] if second.total_dv() < first.total_dv() => 1,
            _ => 0,
        };

        debug!(
            departure_time = self.departure_time,
            arrival_time = self.arrival_time,
            num_solutions = self.num_solutions(),
            tot_dv = self.tot_dv(),
            tot_dv_sec = self.tot_dv_sec(),
            "solved transfer plan"
        );

        Ok(())
    }

    /// Sets the times to the Hohmann transfer departing at or after `now`,
    /// then solves the plan.
    ///
    /// # Errors
    /// See [`solve`][Self::solve].
    pub fn initialize_hohmann<P>(
        &mut self,
        provider: &P,
        now: f64,
        config: &SolverConfig,
    ) -> Result<HohmannTransfer, TransferError>
    where
        P: OrbitProvider + ?Sized,
    {
        let (from, to) = resolve_orbits(provider, self.departure_planet, self.arrival_planet)?;
        let transfer = hohmann::hohmann_transfer(from, to, now, &config.hohmann);

        self.set_times(transfer.departure_time, transfer.arrival_time);
        self.solve(provider, config)?;

        Ok(transfer)
    }

    /// Returns `true` if the plan is solved, affordable for `ship`, and
    /// departs after `now`.
    pub fn is_valid(&self, ship: &ShipCapabilities, now: f64) -> bool {
        self.is_solved() && self.tot_dv() <= ship.max_dv && self.departure_time > now
    }

    /// Sets the carried quantity to the most `ship` can take through this
    /// plan's delta-v, or to zero if the plan isn't valid.
    pub fn update_payload(&mut self, ship: &ShipCapabilities, now: f64) {
        self.resource_transfer.quantity = if self.is_valid(ship, now) {
            ship.payload_capacity(self.tot_dv())
        } else {
            0.0
        };
    }
}

/// Resolves both bodies to their orbits and checks that they share a
/// central body.
pub(crate) fn resolve_orbits<P>(
    provider: &P,
    departure: BodyId,
    arrival: BodyId,
) -> Result<(&Orbit, &Orbit), TransferError>
where
    P: OrbitProvider + ?Sized,
{
    let from = provider
        .orbit(departure)
        .ok_or(TransferError::UnknownBody(departure))?;
    let to = provider
        .orbit(arrival)
        .ok_or(TransferError::UnknownBody(arrival))?;

    let mu_from = from.get_gravitational_parameter();
    let mu_to = to.get_gravitational_parameter();

    if (mu_from - mu_to).abs() > MU_RELATIVE_TOLERANCE * mu_from.max(mu_to) {
        return Err(TransferError::MismatchedMu {
            departure: mu_from,
            arrival: mu_to,
        });
    }

    Ok((from, to))
}
