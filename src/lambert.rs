//! Lambert's problem: find the conic that connects two positions in a
//! given flight time.
//!
//! The problem is normalized the classic way. With chord `c`,
//! `s = r1 + r2` and the minimum-energy semi-major axis
//! `a_min = (s + c) / 4`, define
//!
//! ```text
//! K = sqrt((s - c) / (s + c))
//! y = dt * sqrt(mu / a_min^3)
//! x = sqrt(a_min / |a|)
//! ```
//!
//! so that the flight time becomes a function `y = F(x, K)` of a single
//! unknown. [`time_of_flight`] evaluates `F` for each [`LambertCase`], and
//! [`solve_time_equation`] inverts it.
//!
//! For every pair of positions there are two ways around: the
//! [`Direct`][LambertBranch::Direct] branch sweeps less than half a turn
//! and the [`Indirect`][LambertBranch::Indirect] branch sweeps the rest.
//! [`solve`] returns one conic per branch.

use std::f64::consts::{PI, TAU};

use glam::DVec3;
use thiserror::Error;
use tracing::{debug, warn};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{
    geometry::{self, BranchSelector, FocusSide},
    LambertConfig, Orbit, OrbitError,
};

/// Below this `|x|`, the near-arc time functions switch to their Taylor
/// series to dodge the `0 / 0` at the parabolic limit.
const SERIES_THRESHOLD: f64 = 1e-3;

/// The smallest `x` the solvers will try. `x = 0` is the parabola.
const MIN_X: f64 = 1e-5;

/// Beyond this `x`, the hyperbolic solver switches from bisection to Newton.
const HYPERBOLIC_BISECTION_MAX_X: f64 = 2.0;

/// Conics whose flight time misses the requested one by more than this
/// fraction are dropped.
const FLIGHT_TIME_MISMATCH: f64 = 1e-3;

/// An error that can occur while solving Lambert's problem.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, PartialEq, Error)]
pub enum LambertError {
    /// The arrival time doesn't come after the departure time.
    #[error("flight time must be positive, got {flight_time} s")]
    NonPositiveFlightTime {
        #[allow(missing_docs)]
        flight_time: f64,
    },

    /// The two positions don't span a usable transfer.
    #[error("degenerate Lambert geometry: {reason}")]
    DegenerateGeometry {
        #[allow(missing_docs)]
        reason: &'static str,
    },

    /// The bisection bracket holds no sign change.
    #[error("time equation root is not bracketed in [{low}, {high}] for {case:?} (y = {normalized_time})")]
    UnbracketedRoot {
        #[allow(missing_docs)]
        case: LambertCase,
        #[allow(missing_docs)]
        normalized_time: f64,
        #[allow(missing_docs)]
        low: f64,
        #[allow(missing_docs)]
        high: f64,
    },

    /// The solver ran out of iterations.
    #[error("time equation did not converge within {iterations} iterations for {case:?} (y = {normalized_time})")]
    IterationCapExceeded {
        #[allow(missing_docs)]
        case: LambertCase,
        #[allow(missing_docs)]
        normalized_time: f64,
        #[allow(missing_docs)]
        iterations: u32,
    },
}

/// Which way around the central body a transfer goes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum LambertBranch {
    /// Sweeps at most half a turn.
    Direct,
    /// Sweeps at least half a turn.
    Indirect,
}

impl LambertBranch {
    /// Both branches, in a fixed order.
    pub const ALL: [LambertBranch; 2] = [LambertBranch::Direct, LambertBranch::Indirect];

    /// The sign in front of the `beta` terms of the time equation.
    fn sign(self) -> f64 {
        match self {
            LambertBranch::Direct => -1.0,
            LambertBranch::Indirect => 1.0,
        }
    }
}

/// The regime of a Lambert time equation.
///
/// Elliptic transfers come in a "near" form, where the empty focus lies
/// outside the region enclosed by the chord and the arc (the flight time
/// is shorter than for the minimum-energy ellipse), and a "far" form,
/// where it lies inside.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum LambertCase {
    #[allow(missing_docs)]
    EllipticDirect,
    #[allow(missing_docs)]
    EllipticDirectFar,
    #[allow(missing_docs)]
    EllipticIndirect,
    #[allow(missing_docs)]
    EllipticIndirectFar,
    /// Hyperbolic transfer on the direct branch.
    HyperbolicNear,
    /// Hyperbolic transfer on the indirect branch.
    HyperbolicFar,
}

impl LambertCase {
    /// Every case, in a fixed order.
    pub const ALL: [LambertCase; 6] = [
        LambertCase::EllipticDirect,
        LambertCase::EllipticDirectFar,
        LambertCase::EllipticIndirect,
        LambertCase::EllipticIndirectFar,
        LambertCase::HyperbolicNear,
        LambertCase::HyperbolicFar,
    ];

    /// Picks the case for a normalized flight time on a given branch.
    ///
    /// Flight times longer than the parabolic one are elliptic; of those,
    /// the ones at least as long as the minimum-energy transfer are "far".
    pub fn classify(normalized_time: f64, k: f64, branch: LambertBranch) -> Self {
        let (near, far, hyperbolic) = match branch {
            LambertBranch::Direct => (
                LambertCase::EllipticDirect,
                LambertCase::EllipticDirectFar,
                LambertCase::HyperbolicNear,
            ),
            LambertBranch::Indirect => (
                LambertCase::EllipticIndirect,
                LambertCase::EllipticIndirectFar,
                LambertCase::HyperbolicFar,
            ),
        };

        if normalized_time <= time_of_flight(0.0, k, near) {
            hyperbolic
        } else if normalized_time < time_of_flight(1.0, k, near) {
            near
        } else {
            far
        }
    }

    /// The branch this case belongs to.
    pub fn branch(self) -> LambertBranch {
        match self {
            LambertCase::EllipticDirect
            | LambertCase::EllipticDirectFar
            | LambertCase::HyperbolicNear => LambertBranch::Direct,
            LambertCase::EllipticIndirect
            | LambertCase::EllipticIndirectFar
            | LambertCase::HyperbolicFar => LambertBranch::Indirect,
        }
    }

    /// Returns `true` for the two hyperbolic cases.
    pub fn is_hyperbolic(self) -> bool {
        matches!(self, LambertCase::HyperbolicNear | LambertCase::HyperbolicFar)
    }

    /// Returns `true` for the two elliptic "far" cases.
    pub fn is_far(self) -> bool {
        matches!(
            self,
            LambertCase::EllipticDirectFar | LambertCase::EllipticIndirectFar
        )
    }
}

/// Evaluates the normalized flight time `F(x, K)` for a case.
///
/// Near `x = 0` the near-arc cases use the Taylor expansion
/// `4/3 (1 +/- K^3) +/- 0.4 (1 +/- K^5) x^2`. The far cases diverge there.
///
/// The hyperbolic cases are even in `x`.
pub fn time_of_flight(x: f64, k: f64, case: LambertCase) -> f64 {
    let s = case.branch().sign();

    if !case.is_far() && x.abs() < SERIES_THRESHOLD {
        let curvature = if case.is_hyperbolic() { -0.4 } else { 0.4 };
        return 4.0 / 3.0 * (1.0 + s * k.powi(3)) + curvature * (1.0 + s * k.powi(5)) * x * x;
    }

    let x_cubed = x * x * x;

    if case.is_hyperbolic() {
        let alpha = 2.0 * x.asinh();
        let beta = 2.0 * (k * x).asinh();

        ((alpha.sinh() - alpha) + s * (beta.sinh() - beta)) / x_cubed
    } else {
        let alpha = 2.0 * x.asin();
        let beta = 2.0 * (k * x).asin();

        let arc = alpha - alpha.sin();
        let arc = if case.is_far() { TAU - arc } else { arc };

        (arc + s * (beta - beta.sin())) / x_cubed
    }
}

/// Evaluates `dF/dx` for a case.
pub fn time_of_flight_derivative(x: f64, k: f64, case: LambertCase) -> f64 {
    let s = case.branch().sign();

    if !case.is_far() && x.abs() < SERIES_THRESHOLD {
        let curvature = if case.is_hyperbolic() { -0.4 } else { 0.4 };
        return 2.0 * curvature * (1.0 + s * k.powi(5)) * x;
    }

    let (numerator, numerator_derivative) = if case.is_hyperbolic() {
        let alpha = 2.0 * x.asinh();
        let beta = 2.0 * (k * x).asinh();
        let d_alpha = 2.0 / (x * x + 1.0).sqrt();
        let d_beta = 2.0 * k / (x * x * k * k + 1.0).sqrt();

        (
            (alpha.sinh() - alpha) + s * (beta.sinh() - beta),
            (alpha.cosh() - 1.0) * d_alpha + s * (beta.cosh() - 1.0) * d_beta,
        )
    } else {
        let alpha = 2.0 * x.asin();
        let beta = 2.0 * (k * x).asin();
        let d_alpha = 2.0 / (1.0 - x * x).sqrt();
        let d_beta = 2.0 * k / (1.0 - x * x * k * k).sqrt();

        let arc = alpha - alpha.sin();
        let d_arc = (1.0 - alpha.cos()) * d_alpha;
        let (arc, d_arc) = if case.is_far() {
            (TAU - arc, -d_arc)
        } else {
            (arc, d_arc)
        };

        (
            arc + s * (beta - beta.sin()),
            d_arc + s * (1.0 - beta.cos()) * d_beta,
        )
    };

    let x_cubed = x * x * x;
    numerator_derivative / x_cubed - 3.0 * numerator / (x_cubed * x)
}

/// Inverts the time equation: finds `x` such that
/// `time_of_flight(x, k, case) ≈ normalized_time`.
///
/// Elliptic cases bisect over `(0, 1]`. Hyperbolic cases bisect over
/// `(0, 2]` when the root lies there and use Newton's method otherwise.
///
/// # Errors
/// Returns [`LambertError::UnbracketedRoot`] if the time doesn't belong
/// to `case`, or [`LambertError::IterationCapExceeded`] if the solver
/// doesn't converge within the configured iterations.
pub fn solve_time_equation(
    normalized_time: f64,
    k: f64,
    case: LambertCase,
    config: &LambertConfig,
) -> Result<f64, LambertError> {
    if !case.is_hyperbolic() {
        return bisect(normalized_time, k, case, MIN_X, 1.0, config);
    }

    if normalized_time > time_of_flight(HYPERBOLIC_BISECTION_MAX_X, k, case) {
        bisect(
            normalized_time,
            k,
            case,
            MIN_X,
            HYPERBOLIC_BISECTION_MAX_X,
            config,
        )
    } else {
        newton(normalized_time, k, case, config)
    }
}

fn bisect(
    normalized_time: f64,
    k: f64,
    case: LambertCase,
    mut low: f64,
    mut high: f64,
    config: &LambertConfig,
) -> Result<f64, LambertError> {
    let tolerance = config.tolerance * normalized_time;

    let residual_low = time_of_flight(low, k, case) - normalized_time;
    let mut residual_high = time_of_flight(high, k, case) - normalized_time;

    // Exact endpoints do happen: a Hohmann transfer lands on x = 1.
    if residual_low.abs() <= tolerance {
        return Ok(low);
    }
    if residual_high.abs() <= tolerance {
        return Ok(high);
    }

    if residual_low * residual_high > 0.0 {
        return Err(LambertError::UnbracketedRoot {
            case,
            normalized_time,
            low,
            high,
        });
    }

    for _ in 0..config.max_iterations {
        let mid = 0.5 * (low + high);
        let residual_mid = time_of_flight(mid, k, case) - normalized_time;

        if residual_mid.abs() <= tolerance {
            return Ok(mid);
        }

        if residual_mid * residual_high < 0.0 {
            low = mid;
        } else {
            high = mid;
            residual_high = residual_mid;
        }
    }

    Err(LambertError::IterationCapExceeded {
        case,
        normalized_time,
        iterations: config.max_iterations,
    })
}

fn newton(
    normalized_time: f64,
    k: f64,
    case: LambertCase,
    config: &LambertConfig,
) -> Result<f64, LambertError> {
    let tolerance = config.tolerance * normalized_time;

    // For large x, F ~ 2 (1 +/- K^2) / x
    let seed = 2.0 * (1.0 + case.branch().sign() * k * k) / normalized_time;
    let mut x = if seed.is_finite() && seed > 0.0 {
        seed
    } else {
        HYPERBOLIC_BISECTION_MAX_X
    };

    for _ in 0..config.max_iterations {
        let residual = time_of_flight(x, k, case) - normalized_time;

        if residual.abs() <= tolerance {
            return Ok(x);
        }

        let derivative = time_of_flight_derivative(x, k, case);
        let step = -residual / derivative;

        let next = x + step;
        x = if !next.is_finite() {
            // F falls with x, so move towards the root by doubling or halving
            if residual > 0.0 {
                2.0 * x
            } else {
                0.5 * x
            }
        } else if next <= 0.0 {
            0.5 * x
        } else {
            next
        };
    }

    Err(LambertError::IterationCapExceeded {
        case,
        normalized_time,
        iterations: config.max_iterations,
    })
}

/// Two timed positions around a central body.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LambertProblem {
    /// The departure position, in meters.
    pub r1: DVec3,
    /// The departure time, in seconds.
    pub t1: f64,
    /// The arrival position, in meters.
    pub r2: DVec3,
    /// The arrival time, in seconds.
    pub t2: f64,
    /// The gravitational parameter of the central body.
    pub mu: f64,
    /// The normal that counts as "prograde" for this transfer, usually the
    /// departure body's orbit normal. It orients the transfer plane, and
    /// stands in for it when `r1` and `r2` are collinear.
    pub reference_normal: DVec3,
}

/// One conic solving a [`LambertProblem`].
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LambertSolution {
    /// Which regime of the time equation produced this conic.
    pub case: LambertCase,
    /// The transfer orbit.
    pub orbit: Orbit,
    /// The true anomaly of the departure position on [`orbit`][Self::orbit].
    pub departure_true_anomaly: f64,
    /// The true anomaly of the arrival position on [`orbit`][Self::orbit].
    pub arrival_true_anomaly: f64,
}

impl LambertSolution {
    /// The velocity on the transfer orbit at the departure position.
    pub fn departure_velocity(&self) -> DVec3 {
        self.orbit
            .get_velocity_at_true_anomaly(self.departure_true_anomaly)
    }

    /// The velocity on the transfer orbit at the arrival position.
    pub fn arrival_velocity(&self) -> DVec3 {
        self.orbit
            .get_velocity_at_true_anomaly(self.arrival_true_anomaly)
    }
}

/// Solves Lambert's problem on both branches.
///
/// The result holds up to two solutions, the direct one first. A branch
/// whose conic can't be built from the solved semi-major axis (for
/// instance because its geometry collapses) is skipped with a warning.
///
/// # Errors
/// Returns an error if the flight time isn't positive, if the two
/// positions coincide, or if the time equation itself fails.
pub fn solve(
    problem: &LambertProblem,
    config: &LambertConfig,
) -> Result<Vec<LambertSolution>, LambertError> {
    let flight_time = problem.t2 - problem.t1;
    if !(flight_time > 0.0) {
        return Err(LambertError::NonPositiveFlightTime { flight_time });
    }

    let chord = (problem.r2 - problem.r1).length();
    if !(chord > 0.0) {
        return Err(LambertError::DegenerateGeometry {
            reason: "departure and arrival positions coincide",
        });
    }

    let radius_sum = problem.r1.length() + problem.r2.length();
    let min_energy_sma = 0.25 * (radius_sum + chord);
    let k = ((radius_sum - chord).max(0.0) / (radius_sum + chord)).sqrt();
    let normalized_time = flight_time * (problem.mu / min_energy_sma.powi(3)).sqrt();

    let (plane_normal, sweep) = geometry::transfer_plane(problem.r1, problem.r2, problem.reference_normal);
    let short_way_normal = if sweep <= PI {
        plane_normal
    } else {
        -plane_normal
    };

    let mut solutions = Vec::with_capacity(2);

    for branch in LambertBranch::ALL {
        let case = LambertCase::classify(normalized_time, k, branch);
        let x = solve_time_equation(normalized_time, k, case, config)?;

        debug!(?case, x, k, normalized_time, "solved Lambert time equation");

        let semi_major_axis = if case.is_hyperbolic() {
            -min_energy_sma / (x * x)
        } else {
            min_energy_sma / (x * x)
        };

        let normal = match branch {
            LambertBranch::Direct => short_way_normal,
            LambertBranch::Indirect => -short_way_normal,
        };

        match fit_conic(problem, case, semi_major_axis, normal) {
            Ok(solution) => solutions.push(solution),
            Err(err) => warn!(?case, semi_major_axis, %err, "dropping Lambert branch"),
        }
    }

    Ok(solutions)
}

/// Builds the conic through both positions with the given semi-major axis,
/// picking the empty focus whose flight time matches the problem.
fn fit_conic(
    problem: &LambertProblem,
    case: LambertCase,
    semi_major_axis: f64,
    normal: DVec3,
) -> Result<LambertSolution, OrbitError> {
    let flight_time = problem.t2 - problem.t1;

    let mut best: Option<(f64, LambertSolution)> = None;
    let mut last_err = OrbitError::DegenerateGeometry {
        reason: "no focus candidate produced a conic",
    };

    for focus_side in FocusSide::ALL {
        let selector = BranchSelector {
            semi_major_axis,
            normal,
            focus_side,
        };

        let orbit = match Orbit::from_two_points(
            problem.r1,
            problem.r2,
            problem.t1,
            &selector,
            problem.mu,
        ) {
            Ok(orbit) => orbit,
            Err(err) => {
                last_err = err;
                continue;
            }
        };

        let departure_true_anomaly = orbit.get_true_anomaly_at_position(problem.r1);
        let arrival_true_anomaly = orbit.get_true_anomaly_at_position(problem.r2);
        let mismatch = (orbit.get_time_of_flight(departure_true_anomaly, arrival_true_anomaly)
            - flight_time)
            .abs();

        if !mismatch.is_finite() {
            continue;
        }

        let improves = match &best {
            Some((best_mismatch, _)) => mismatch < *best_mismatch,
            None => true,
        };

        if improves {
            best = Some((
                mismatch,
                LambertSolution {
                    case,
                    orbit,
                    departure_true_anomaly,
                    arrival_true_anomaly,
                },
            ));
        }
    }

    match best {
        Some((mismatch, solution)) if mismatch <= FLIGHT_TIME_MISMATCH * flight_time => {
            Ok(solution)
        }
        Some(_) => Err(OrbitError::DegenerateGeometry {
            reason: "no focus candidate matches the flight time",
        }),
        None => Err(last_err),
    }
}
