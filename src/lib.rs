//! # Keplerian Transfer Planning
//! This library crate contains logic for Keplerian orbits and for planning
//! impulsive transfers between bodies on those orbits, similar to what
//! you'd find in a space logistics game.
//!
//! Every body in the system moves "on rails" around a single central body.
//! Positions are never integrated with time steps; instead, each orbit is
//! a closed-form function of time, so any epoch can be queried directly.
//!
//! Planning a transfer boils down to three questions:
//! - Where will the departure and arrival bodies be? ([`Orbit`])
//! - Which conic connects those two points in the given flight time?
//!   ([`lambert`])
//! - How much delta-v does it cost, and can we do better by moving the
//!   departure or arrival date? ([`TransferPlan`], [`optimizer`])
//!
//! ## Getting started
//! This crate provides these main structs:
//! - [`Orbit`]: An immutable Keplerian orbit around the central body.
//! - [`Body`]: A celestial body with a mass, a radius and an optional orbit.
//! - [`Universe`]: A collection of bodies and a simulation clock. It
//!   implements [`OrbitProvider`], which is what the planner uses to
//!   look bodies up.
//! - [`TransferPlan`]: A departure/arrival pair with its solved transfer
//!   branches and delta-v costs.
//!
//! We also provide a [`body_presets`] module with the Saturnian system,
//! which makes a good playground for moon-to-moon transfers.
//!
//! ## Example
//!
//! ```rust
//! use keplerian_transfer::{body_presets, SolverConfig, TransferPlan, Universe};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut universe = Universe::new(None, None);
//! let system = body_presets::saturn::add_saturn_system(&mut universe)?;
//!
//! let config = SolverConfig::default();
//! let mut plan = TransferPlan::new(system.enceladus, system.tethys, 0.0, 1.0);
//! let hohmann = plan.initialize_hohmann(&universe, 0.0, &config)?;
//!
//! assert!(hohmann.departure_time >= 0.0);
//! assert!(plan.num_solutions() > 0);
//! assert!(plan.tot_dv() <= plan.tot_dv_sec());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod anomaly;
mod body;
pub mod body_presets;
mod config;
mod geometry;
pub mod hohmann;
pub mod lambert;
mod orbit;
pub mod optimizer;
mod provider;
mod transfer_plan;
mod universe;

pub use body::Body;
pub use config::{ConfigError, HohmannConfig, LambertConfig, OptimizerConfig, SolverConfig};
pub use geometry::{resolve_branch_geometry, BranchGeometry, BranchSelector, FocusSide};
pub use hohmann::HohmannTransfer;
pub use orbit::{Orbit, OrbitError, OrbitPos, StateVectors};
pub use provider::{BodyId, OrbitProvider};
pub use transfer_plan::{
    ResourceTransfer, ShipCapabilities, TransferBranch, TransferError, TransferPlan,
};
pub use universe::{BodyAddError, BodyRelation, Universe};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The maximum number of iterations for the numerical approach algorithms.
///
/// This is used to prevent infinite loops in case the method fails to converge.
pub const NUMERIC_MAX_ITERS: u32 = 1000;

/// The outcome of an iterative solver.
///
/// Solvers in this crate never loop forever. When one of them runs out of
/// iterations it still hands back its best estimate, but wrapped in
/// [`CappedOut`][Convergence::CappedOut] so that callers can tell the
/// difference.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Convergence<T> {
    /// The solver met its tolerance.
    Converged(T),
    /// The solver hit its iteration cap. The value is the last estimate.
    CappedOut(T),
}

impl<T> Convergence<T> {
    /// Returns the wrapped value, whether or not the solver converged.
    pub fn value(self) -> T {
        match self {
            Convergence::Converged(value) | Convergence::CappedOut(value) => value,
        }
    }

    /// Returns `true` if the solver met its tolerance.
    pub fn is_converged(&self) -> bool {
        matches!(self, Convergence::Converged(_))
    }

    /// Maps the wrapped value, keeping the convergence state.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Convergence<U> {
        match self {
            Convergence::Converged(value) => Convergence::Converged(f(value)),
            Convergence::CappedOut(value) => Convergence::CappedOut(f(value)),
        }
    }
}

/// Get the hyperbolic sine and cosine of a number.
///
/// Usually faster than calling `x.sinh()` and `x.cosh()` separately.
///
/// Returns a tuple which contains:
/// - 0: The hyperbolic sine of the number.
/// - 1: The hyperbolic cosine of the number.
pub fn sinhcosh(x: f64) -> (f64, f64) {
    let e_x = x.exp();
    let e_neg_x = (-x).exp();

    ((e_x - e_neg_x) * 0.5, (e_x + e_neg_x) * 0.5)
}

#[cfg(test)]
mod tests;
