use std::f64::consts::{PI, TAU};

use glam::DVec3;
use thiserror::Error;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{
    anomaly,
    geometry::{self, BranchSelector},
};

/// Below this eccentricity, a state vector conversion treats the orbit
/// as circular.
const CIRCULAR_ECCENTRICITY: f64 = 1e-12;

/// How close to the asymptotes hyperbolic sampling is allowed to get,
/// as a fraction of the asymptote angle.
const HYPERBOLA_SAMPLE_MARGIN: f64 = 0.99;

/// An error that can occur when building or querying an [`Orbit`].
#[non_exhaustive]
#[derive(Clone, Copy, Debug, PartialEq, Error)]
pub enum OrbitError {
    /// The operation is only defined for closed (elliptic) orbits.
    #[error("operation is only defined for closed orbits, but eccentricity is {eccentricity}")]
    HyperbolicUnsupported {
        /// The eccentricity of the orbit that was queried.
        eccentricity: f64,
    },

    /// The orbital elements don't describe a valid conic.
    #[error("invalid orbital elements: {reason}")]
    InvalidElements {
        /// What was wrong with the elements.
        reason: &'static str,
    },

    /// No conic can be fit through the given points.
    #[error("degenerate two-point geometry: {reason}")]
    DegenerateGeometry {
        /// What made the geometry degenerate.
        reason: &'static str,
    },
}

/// A struct representing a position and velocity at a point in the orbit.
///
/// The position and velocity vectors are three-dimensional.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StateVectors {
    /// The 3D position at a point in the orbit, in meters.
    pub position: DVec3,
    /// The 3D velocity at a point in the orbit, in meters per second.
    pub velocity: DVec3,
}

impl StateVectors {
    /// Create a new [`Orbit`] from the state vectors, a given mu value,
    /// and the time at which the state vectors were sampled.
    ///
    /// # Mu
    /// Mu is also known as the gravitational parameter, and
    /// is equal to `GM`, where `G` is the gravitational constant,
    /// and `M` is the mass of the parent body.
    ///
    /// Learn more about the gravitational parameter:
    /// <https://en.wikipedia.org/wiki/Standard_gravitational_parameter>
    ///
    /// # Errors
    /// Returns [`OrbitError::InvalidElements`] if the state is radial
    /// (no angular momentum), parabolic, or otherwise doesn't describe a
    /// valid conic.
    pub fn to_orbit(self, mu: f64, time: f64) -> Result<Orbit, OrbitError> {
        // Reference:
        // https://orbital-mechanics.space/classical-orbital-elements/orbital-elements-and-the-state-vector.html
        let radius = self.position.length();
        let speed_sq = self.velocity.length_squared();

        let angular_momentum = self.position.cross(self.velocity);
        if !(angular_momentum.length() > 0.0) {
            return Err(OrbitError::InvalidElements {
                reason: "state vectors have no angular momentum",
            });
        }
        let normal = angular_momentum.normalize();

        // e = (v x h) / mu - r / |r|
        let eccentricity_vector = self.velocity.cross(angular_momentum) / mu - self.position / radius;
        let eccentricity = eccentricity_vector.length();

        // Vis-viva: v^2 = mu (2/r - 1/a)
        let semi_major_axis = (2.0 / radius - speed_sq / mu).recip();

        let periapsis_dir = if eccentricity > CIRCULAR_ECCENTRICITY {
            eccentricity_vector / eccentricity
        } else {
            self.position / radius
        };

        let true_anomaly = geometry::signed_angle(periapsis_dir, self.position, normal);

        Orbit::from_parts(
            mu,
            semi_major_axis,
            eccentricity,
            periapsis_dir,
            normal,
            true_anomaly,
            time,
        )
    }
}

/// A position on an orbit at a specific time.
///
/// Values of this type are produced by [`Orbit::get_position`] and carry
/// the intermediate anomalies so that follow-up queries, like
/// [`Orbit::get_velocity`], don't have to solve Kepler's equation again.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct OrbitPos {
    /// The time this position was sampled at, in seconds.
    pub time: f64,

    /// The position relative to the central body, in meters.
    pub cartesian: DVec3,

    /// The mean anomaly at [`time`][Self::time].
    ///
    /// Elliptic mean anomalies are reduced into `[-pi, pi)`.
    pub mean_anomaly: f64,

    /// The true anomaly at [`time`][Self::time].
    pub true_anomaly: f64,

    /// The distance from the central body, in meters.
    pub radius: f64,
}

/// An immutable Keplerian orbit around a central body.
///
/// The orbit is stored as its shape (semi-major axis and eccentricity),
/// its orientation (a unit vector towards periapsis and a unit normal)
/// and its timing (the time of periapsis passage).
///
/// Motion is always counterclockwise about [`normal`][Self::get_normal],
/// so the mean motion is always positive. An orbit whose normal has a
/// negative Z component is called retrograde.
///
/// Hyperbolic orbits have a negative semi-major axis.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Orbit {
    mu: f64,
    semi_major_axis: f64,
    eccentricity: f64,
    periapsis_dir: DVec3,
    normal: DVec3,
    epoch: f64,
}

fn validate_elements(mu: f64, semi_major_axis: f64, eccentricity: f64) -> Result<(), OrbitError> {
    let reason = if !(mu > 0.0) || !mu.is_finite() {
        "gravitational parameter must be positive and finite"
    } else if !semi_major_axis.is_finite() || semi_major_axis == 0.0 {
        "semi-major axis must be finite and nonzero"
    } else if !(eccentricity >= 0.0) || !eccentricity.is_finite() {
        "eccentricity must be non-negative and finite"
    } else if eccentricity == 1.0 {
        "parabolic trajectories are not supported"
    } else if (eccentricity < 1.0) != (semi_major_axis > 0.0) {
        "semi-major axis sign must be positive for ellipses and negative for hyperbolas"
    } else {
        return Ok(());
    };

    Err(OrbitError::InvalidElements { reason })
}

/// Returns the periapsis direction (P) and the orbit normal (W) of the
/// perifocal frame.
///
/// These are the first column and the cross product of both columns of the
/// usual 3x2 PQW-to-inertial rotation matrix.
fn perifocal_basis(inclination: f64, arg_pe: f64, long_asc_node: f64) -> (DVec3, DVec3) {
    let (sin_inc, cos_inc) = inclination.sin_cos();
    let (sin_arg_pe, cos_arg_pe) = arg_pe.sin_cos();
    let (sin_lan, cos_lan) = long_asc_node.sin_cos();

    let p = DVec3::new(
        cos_arg_pe * cos_lan - sin_arg_pe * cos_inc * sin_lan,
        cos_arg_pe * sin_lan + sin_arg_pe * cos_inc * cos_lan,
        sin_arg_pe * sin_inc,
    );
    let q = DVec3::new(
        -(sin_arg_pe * cos_lan + cos_arg_pe * cos_inc * sin_lan),
        cos_arg_pe * cos_inc * cos_lan - sin_arg_pe * sin_lan,
        cos_arg_pe * sin_inc,
    );

    (p, p.cross(q))
}

impl Orbit {
    /// Creates a new orbit from classical orbital elements.
    ///
    /// # Parameters
    /// - `eccentricity`: The eccentricity of the orbit.
    /// - `semi_major_axis`: The semi-major axis, in meters. Must be
    ///   negative for hyperbolic orbits.
    /// - `inclination`: The inclination, in radians.
    /// - `arg_pe`: The argument of periapsis, in radians.
    /// - `long_asc_node`: The longitude of the ascending node, in radians.
    /// - `epoch`: The time of periapsis passage, in seconds.
    /// - `mu`: The gravitational parameter of the central body, in m^3 s^-2.
    ///
    /// # Errors
    /// Returns [`OrbitError::InvalidElements`] when the elements don't
    /// describe a non-parabolic conic.
    pub fn new(
        eccentricity: f64,
        semi_major_axis: f64,
        inclination: f64,
        arg_pe: f64,
        long_asc_node: f64,
        epoch: f64,
        mu: f64,
    ) -> Result<Self, OrbitError> {
        validate_elements(mu, semi_major_axis, eccentricity)?;

        let (periapsis_dir, normal) = perifocal_basis(inclination, arg_pe, long_asc_node);

        Ok(Self {
            mu,
            semi_major_axis,
            eccentricity,
            periapsis_dir,
            normal,
            epoch,
        })
    }

    /// Creates a new orbit lying in the XY plane.
    ///
    /// # Parameters
    /// - `eccentricity`: The eccentricity of the orbit.
    /// - `semi_major_axis`: The semi-major axis, in meters.
    /// - `longitude_of_periapsis`: The angle from +X to periapsis,
    ///   measured counterclockwise about +Z, in radians.
    /// - `epoch`: The time of periapsis passage, in seconds.
    /// - `mu`: The gravitational parameter of the central body.
    /// - `prograde`: Whether the body moves counterclockwise about +Z.
    ///
    /// # Errors
    /// See [`Orbit::new`].
    pub fn new_flat(
        eccentricity: f64,
        semi_major_axis: f64,
        longitude_of_periapsis: f64,
        epoch: f64,
        mu: f64,
        prograde: bool,
    ) -> Result<Self, OrbitError> {
        validate_elements(mu, semi_major_axis, eccentricity)?;

        let (sin_lop, cos_lop) = longitude_of_periapsis.sin_cos();

        Ok(Self {
            mu,
            semi_major_axis,
            eccentricity,
            periapsis_dir: DVec3::new(cos_lop, sin_lop, 0.0),
            normal: if prograde { DVec3::Z } else { DVec3::NEG_Z },
            epoch,
        })
    }

    /// Creates the orbit passing through `pos1` and `pos2` that is picked
    /// out by `selector`, timed so that the body is at `pos1` at
    /// `time_at_pos1`.
    ///
    /// See [`resolve_branch_geometry`][crate::resolve_branch_geometry]
    /// for how the shape is resolved.
    ///
    /// # Errors
    /// Returns an error if the geometry is degenerate or the resulting
    /// elements are invalid.
    pub fn from_two_points(
        pos1: DVec3,
        pos2: DVec3,
        time_at_pos1: f64,
        selector: &BranchSelector,
        mu: f64,
    ) -> Result<Self, OrbitError> {
        let shape = geometry::resolve_branch_geometry(pos1, pos2, selector)?;
        let normal = selector.normal.normalize();
        let true_anomaly = geometry::signed_angle(shape.periapsis_dir, pos1, normal);

        Self::from_parts(
            mu,
            selector.semi_major_axis,
            shape.eccentricity,
            shape.periapsis_dir,
            normal,
            true_anomaly,
            time_at_pos1,
        )
    }

    /// Builds an orbit from its shape and orientation, timed so that the
    /// body is at `true_anomaly` at `time`.
    fn from_parts(
        mu: f64,
        semi_major_axis: f64,
        eccentricity: f64,
        periapsis_dir: DVec3,
        normal: DVec3,
        true_anomaly: f64,
        time: f64,
    ) -> Result<Self, OrbitError> {
        validate_elements(mu, semi_major_axis, eccentricity)?;

        let mut orbit = Self {
            mu,
            semi_major_axis,
            eccentricity,
            periapsis_dir,
            normal,
            epoch: 0.0,
        };

        let mean_anomaly = anomaly::true_to_mean(true_anomaly, eccentricity);
        orbit.epoch = time - mean_anomaly / orbit.get_mean_motion();

        if !orbit.epoch.is_finite() {
            return Err(OrbitError::InvalidElements {
                reason: "position lies outside the hyperbola's asymptotes",
            });
        }

        Ok(orbit)
    }

    /// Gets the gravitational parameter of the central body, in m^3 s^-2.
    pub fn get_gravitational_parameter(&self) -> f64 {
        self.mu
    }

    /// Gets the semi-major axis, in meters. Negative for hyperbolas.
    pub fn get_semi_major_axis(&self) -> f64 {
        self.semi_major_axis
    }

    /// Gets the eccentricity of the orbit.
    pub fn get_eccentricity(&self) -> f64 {
        self.eccentricity
    }

    /// Gets the unit vector pointing from the central body to periapsis.
    pub fn get_periapsis_dir(&self) -> DVec3 {
        self.periapsis_dir
    }

    /// Gets the unit orbit normal.
    pub fn get_normal(&self) -> DVec3 {
        self.normal
    }

    /// Gets the time of periapsis passage, in seconds.
    pub fn get_epoch(&self) -> f64 {
        self.epoch
    }

    /// Returns `true` for closed orbits.
    pub fn is_elliptic(&self) -> bool {
        self.eccentricity < 1.0
    }

    /// Returns `true` if the orbit runs counterclockwise about +Z.
    pub fn is_prograde(&self) -> bool {
        self.normal.z >= 0.0
    }

    /// Gets the semi-latus rectum, `a (1 - e^2)`, in meters.
    pub fn get_semi_latus_rectum(&self) -> f64 {
        self.semi_major_axis * (1.0 - self.eccentricity * self.eccentricity)
    }

    /// Gets the periapsis distance, in meters.
    pub fn get_periapsis(&self) -> f64 {
        self.semi_major_axis * (1.0 - self.eccentricity)
    }

    /// Gets the apoapsis distance, in meters.
    ///
    /// Returns infinity for hyperbolic orbits.
    pub fn get_apoapsis(&self) -> f64 {
        if self.is_elliptic() {
            self.semi_major_axis * (1.0 + self.eccentricity)
        } else {
            f64::INFINITY
        }
    }

    /// Gets the mean motion, `sqrt(mu / |a|^3)`, in radians per second.
    pub fn get_mean_motion(&self) -> f64 {
        (self.mu / self.semi_major_axis.abs().powi(3)).sqrt()
    }

    /// Gets the orbital period, in seconds.
    ///
    /// Returns infinity for hyperbolic orbits.
    pub fn get_period(&self) -> f64 {
        if self.is_elliptic() {
            TAU / self.get_mean_motion()
        } else {
            f64::INFINITY
        }
    }

    /// Gets the mean anomaly at a given time.
    ///
    /// Elliptic mean anomalies are reduced into `[-pi, pi)`.
    pub fn get_mean_anomaly_at_time(&self, time: f64) -> f64 {
        let mean_anomaly = self.get_mean_motion() * (time - self.epoch);

        if self.is_elliptic() {
            (mean_anomaly + PI).rem_euclid(TAU) - PI
        } else {
            mean_anomaly
        }
    }

    /// Gets the distance from the central body at a given true anomaly.
    pub fn get_radius_at_true_anomaly(&self, true_anomaly: f64) -> f64 {
        self.get_semi_latus_rectum() / (1.0 + self.eccentricity * true_anomaly.cos())
    }

    /// Gets the position at a given true anomaly.
    pub fn get_position_at_true_anomaly(&self, true_anomaly: f64) -> DVec3 {
        self.get_radius_at_true_anomaly(true_anomaly) * self.radial_dir(true_anomaly)
    }

    /// Gets the true anomaly of a point, measured counterclockwise about the
    /// orbit normal from periapsis.
    ///
    /// The point is projected onto the orbital plane; it does not have to
    /// lie on the orbit.
    pub fn get_true_anomaly_at_position(&self, position: DVec3) -> f64 {
        geometry::signed_angle(self.periapsis_dir, position, self.normal)
    }

    /// Gets the position of the body at a given time.
    ///
    /// If Kepler's equation fails to converge, the last estimate is used
    /// and a warning is logged by the solver.
    pub fn get_position(&self, time: f64) -> OrbitPos {
        let mean_anomaly = self.get_mean_anomaly_at_time(time);
        let true_anomaly = anomaly::mean_to_true(mean_anomaly, self.eccentricity).value();
        let radius = self.get_radius_at_true_anomaly(true_anomaly);

        OrbitPos {
            time,
            cartesian: radius * self.radial_dir(true_anomaly),
            mean_anomaly,
            true_anomaly,
            radius,
        }
    }

    /// Gets the velocity of the body at a position previously obtained
    /// from [`get_position`][Self::get_position].
    pub fn get_velocity(&self, position: &OrbitPos) -> DVec3 {
        self.get_velocity_at_true_anomaly(position.true_anomaly)
    }

    /// Gets the velocity at a given true anomaly, in meters per second.
    pub fn get_velocity_at_true_anomaly(&self, true_anomaly: f64) -> DVec3 {
        let radius = self.get_radius_at_true_anomaly(true_anomaly);

        // Vis-viva: v^2 = mu (2/r - 1/a)
        let speed = (self.mu * (2.0 / radius - 1.0 / self.semi_major_axis)).sqrt();

        let (sin, cos) = true_anomaly.sin_cos();
        let radial = self.radial_dir(true_anomaly);
        let transverse = self.normal.cross(radial);

        // Cotangent of the angle between the radius vector and the velocity
        let cot_angle = self.eccentricity * sin / (1.0 + self.eccentricity * cos);

        speed * (cot_angle * radial + transverse).normalize()
    }

    /// Gets the position and velocity of the body at a given time.
    pub fn get_state_vectors_at_time(&self, time: f64) -> StateVectors {
        let position = self.get_position(time);

        StateVectors {
            position: position.cartesian,
            velocity: self.get_velocity(&position),
        }
    }

    /// Gets the time it takes to go from `true_anomaly_1` to
    /// `true_anomaly_2`, in seconds.
    ///
    /// On an ellipse the body always moves forward, so the result is in
    /// `[0, period)`. On a hyperbola the result is negative if the second
    /// anomaly comes before the first.
    pub fn get_time_of_flight(&self, true_anomaly_1: f64, true_anomaly_2: f64) -> f64 {
        let mean_1 = anomaly::true_to_mean(true_anomaly_1, self.eccentricity);
        let mean_2 = anomaly::true_to_mean(true_anomaly_2, self.eccentricity);

        if self.is_elliptic() {
            (mean_2 - mean_1).rem_euclid(TAU) / self.get_mean_motion()
        } else {
            (mean_2 - mean_1) / self.get_mean_motion()
        }
    }

    /// Gets the earliest time at or after `start` at which the body is at
    /// `true_anomaly`.
    ///
    /// # Errors
    /// Returns [`OrbitError::HyperbolicUnsupported`] for hyperbolic orbits,
    /// which pass each anomaly at most once.
    pub fn get_next_time_at_true_anomaly(
        &self,
        true_anomaly: f64,
        start: f64,
    ) -> Result<f64, OrbitError> {
        if !self.is_elliptic() {
            return Err(OrbitError::HyperbolicUnsupported {
                eccentricity: self.eccentricity,
            });
        }

        let mean_anomaly = anomaly::true_to_mean(true_anomaly, self.eccentricity);
        let reference = self.epoch + mean_anomaly / self.get_mean_motion();

        Ok(start + (reference - start).rem_euclid(self.get_period()))
    }

    /// Samples `count` points along the orbit, evenly spaced in true anomaly.
    ///
    /// Ellipses are sampled over a full revolution starting at periapsis.
    /// Hyperbolas are sampled between their asymptotes, stopping short of
    /// them so that every point is finite.
    pub fn sample(&self, count: usize) -> Vec<DVec3> {
        if self.is_elliptic() {
            self.sample_between(0.0, TAU, count)
        } else {
            let limit = (-1.0 / self.eccentricity).acos() * HYPERBOLA_SAMPLE_MARGIN;
            self.sample_between(-limit, limit, count)
        }
    }

    /// Samples `count` points along the orbit going forward from
    /// `true_anomaly_1` to `true_anomaly_2`, evenly spaced in true anomaly.
    ///
    /// On an ellipse, if the second anomaly comes before the first, the
    /// arc wraps through periapsis.
    pub fn sample_between(
        &self,
        true_anomaly_1: f64,
        mut true_anomaly_2: f64,
        count: usize,
    ) -> Vec<DVec3> {
        if self.is_elliptic() && true_anomaly_2 < true_anomaly_1 {
            true_anomaly_2 += TAU;
        }

        match count {
            0 => Vec::new(),
            1 => vec![self.get_position_at_true_anomaly(true_anomaly_1)],
            _ => {
                let step = (true_anomaly_2 - true_anomaly_1) / (count - 1) as f64;

                (0..count)
                    .map(|i| self.get_position_at_true_anomaly(true_anomaly_1 + step * i as f64))
                    .collect()
            }
        }
    }

    fn radial_dir(&self, true_anomaly: f64) -> DVec3 {
        let (sin, cos) = true_anomaly.sin_cos();
        cos * self.periapsis_dir + sin * self.normal.cross(self.periapsis_dir)
    }
}

impl Default for Orbit {
    /// Creates a unit orbit.
    ///
    /// The unit orbit is a perfect circle of radius 1 and no "tilt",
    /// around a central body with a gravitational parameter of 1.
    fn default() -> Self {
        Self {
            mu: 1.0,
            semi_major_axis: 1.0,
            eccentricity: 0.0,
            periapsis_dir: DVec3::X,
            normal: DVec3::Z,
            epoch: 0.0,
        }
    }
}
