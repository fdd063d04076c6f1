use glam::DVec3;

use crate::Orbit;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A struct representing a celestial body.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Body {
    /// The name of the celestial body.
    pub name: String,

    /// The mass of the celestial body, in kilograms.
    pub mass: f64,

    /// The radius of the celestial body, in meters.
    pub radius: f64,

    /// The orbit of the celestial body, if it is orbiting one.
    pub orbit: Option<Orbit>,
}

impl Body {
    /// Creates a new `Body` instance.
    ///
    /// # Arguments
    ///
    /// * `name` - The name of the celestial body.
    /// * `mass` - The mass of the celestial body, in kilograms.
    /// * `radius` - The radius of the celestial body, in meters.
    /// * `orbit` - An optional orbit for the celestial body.
    pub fn new(name: String, mass: f64, radius: f64, orbit: Option<Orbit>) -> Self {
        Self {
            name,
            mass,
            radius,
            orbit,
        }
    }

    /// Releases the body from its orbit.
    pub fn release_from_orbit(&mut self) {
        self.orbit = None;
    }

    /// Gets the gravitational parameter of this body, `G * mass`.
    pub fn get_gravitational_parameter(&self, g: f64) -> f64 {
        g * self.mass
    }

    /// Gets the delta-v needed to reach (or be captured from) a given
    /// hyperbolic excess velocity, starting from (or ending in) an orbit
    /// just above the surface.
    ///
    /// This is `sqrt(mu / (2 R) + |v_inf|^2)`. A body without mass or
    /// radius has no gravity well, and the excess speed is returned as-is.
    pub fn get_dv_from_excess_velocity(&self, g: f64, excess_velocity: DVec3) -> f64 {
        let excess_speed_sq = excess_velocity.length_squared();

        if self.mass > 0.0 && self.radius > 0.0 {
            (self.get_gravitational_parameter(g) / (2.0 * self.radius) + excess_speed_sq).sqrt()
        } else {
            excess_speed_sq.sqrt()
        }
    }
}

impl Default for Body {
    /// Creates a default `Body` instance.
    ///
    /// Currently, this function returns Saturn.
    /// However, do not rely on this behavior, as it may change in the future.
    fn default() -> Self {
        crate::body_presets::saturn::saturn()
    }
}
