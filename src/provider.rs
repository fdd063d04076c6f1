use std::{collections::HashMap, fmt};

use glam::DVec3;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::Orbit;

/// An opaque handle to a body known to an [`OrbitProvider`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BodyId(pub u64);

impl fmt::Display for BodyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A source of body orbits for the transfer planner.
///
/// Implementors only need to resolve a [`BodyId`] to its orbit. The
/// remaining methods have defaults that derive everything from the orbit.
///
/// All orbits served by one provider are expected to share the same
/// central body.
pub trait OrbitProvider {
    /// Gets the orbit of a body, or `None` if the body is unknown or not
    /// orbiting anything.
    fn orbit(&self, body: BodyId) -> Option<&Orbit>;

    /// Gets the velocity of a body at a given time.
    fn velocity_at(&self, body: BodyId, time: f64) -> Option<DVec3> {
        let orbit = self.orbit(body)?;
        Some(orbit.get_velocity(&orbit.get_position(time)))
    }

    /// Converts a hyperbolic excess velocity relative to `body` into the
    /// delta-v needed to leave it or be captured by it.
    ///
    /// By default the body is treated as a point with no gravity well, so
    /// the delta-v is the magnitude of the excess velocity.
    fn dv_from_excess_velocity(&self, _body: BodyId, excess_velocity: DVec3) -> f64 {
        excess_velocity.length()
    }
}

impl OrbitProvider for HashMap<BodyId, Orbit> {
    fn orbit(&self, body: BodyId) -> Option<&Orbit> {
        self.get(&body)
    }
}
