//! Analytic Hohmann estimates between two orbits.
//!
//! The estimate treats both orbits as circles with radii equal to their
//! semi-major axes, lying in the departure orbit's plane. It is exact for
//! circular coplanar orbits and a good first guess otherwise, which is
//! what the planner and the optimizers use it for.

use std::f64::consts::{PI, TAU};

use tracing::{debug, warn};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{geometry, HohmannConfig, Orbit};

/// Timing and cost of a Hohmann transfer.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct HohmannTransfer {
    /// The earliest departure with the right phase angle, in seconds.
    pub departure_time: f64,
    /// `departure_time + flight_time`, in seconds.
    pub arrival_time: f64,
    /// Half the period of the transfer ellipse, in seconds.
    pub flight_time: f64,
    /// The semi-major axis of the transfer ellipse, in meters.
    pub transfer_semi_major_axis: f64,
    /// The magnitude of the departure burn, in m/s.
    pub departure_dv: f64,
    /// The magnitude of the arrival burn, in m/s.
    pub arrival_dv: f64,
}

impl HohmannTransfer {
    /// The sum of both burn magnitudes, in m/s.
    pub fn total_dv(&self) -> f64 {
        self.departure_dv + self.arrival_dv
    }
}

/// Computes the Hohmann transfer from `from` to `to` with the earliest
/// departure at or after `earliest`.
///
/// The departure is placed where the target leads (or trails) the
/// departure body by exactly the angle that makes it arrive at the
/// transfer ellipse's apsis together with the ship.
///
/// A warning is logged when the orbit normals differ by more than
/// [`HohmannConfig::coplanar_threshold`] allows, as the estimate is then
/// unreliable. If both orbits share the same mean motion, the phase angle
/// never changes and the departure is `earliest`.
pub fn hohmann_transfer(
    from: &Orbit,
    to: &Orbit,
    earliest: f64,
    config: &HohmannConfig,
) -> HohmannTransfer {
    let mu = from.get_gravitational_parameter();
    let plane_alignment = from.get_normal().dot(to.get_normal());

    if plane_alignment <= config.coplanar_threshold {
        warn!(
            plane_alignment,
            threshold = config.coplanar_threshold,
            "orbits are far from coplanar; Hohmann estimate is unreliable"
        );
    }

    let radius_1 = from.get_semi_major_axis();
    let radius_2 = to.get_semi_major_axis();

    let transfer_semi_major_axis = 0.5 * (radius_1 + radius_2);
    let flight_time = PI * (transfer_semi_major_axis.powi(3) / mu).sqrt();

    let circular_speed_1 = (mu / radius_1).sqrt();
    let circular_speed_2 = (mu / radius_2).sqrt();
    let transfer_speed_1 = (mu * (2.0 / radius_1 - 1.0 / transfer_semi_major_axis)).sqrt();
    let transfer_speed_2 = (mu * (2.0 / radius_2 - 1.0 / transfer_semi_major_axis)).sqrt();

    // Angular rates as seen about the departure orbit's normal
    let mean_motion_1 = from.get_mean_motion();
    let mean_motion_2 = to.get_mean_motion().copysign(plane_alignment);
    let relative_mean_motion = mean_motion_2 - mean_motion_1;

    let reference_dir = from.get_periapsis_dir();
    let reference_normal = from.get_normal();
    let longitude = |orbit: &Orbit| {
        let position = orbit.get_position(earliest).cartesian;
        geometry::signed_angle(reference_dir, position, reference_normal)
    };

    let current_phase = longitude(to) - longitude(from);
    let target_phase = (PI - mean_motion_2 * flight_time).rem_euclid(TAU);

    let wait = if relative_mean_motion.abs() > f64::EPSILON * mean_motion_1 {
        let synodic_period = (TAU / relative_mean_motion).abs();
        ((target_phase - current_phase) / relative_mean_motion).rem_euclid(synodic_period)
    } else {
        0.0
    };

    let departure_time = earliest + wait;

    debug!(
        departure_time,
        flight_time, current_phase, target_phase, "computed Hohmann transfer"
    );

    HohmannTransfer {
        departure_time,
        arrival_time: departure_time + flight_time,
        flight_time,
        transfer_semi_major_axis,
        departure_dv: (transfer_speed_1 - circular_speed_1).abs(),
        arrival_dv: (circular_speed_2 - transfer_speed_2).abs(),
    }
}
