//! Conic geometry through two points.
//!
//! A conic with its primary focus at the origin and a known semi-major
//! axis `a` is pinned down by two points on it, up to a two-way ambiguity.
//! For any point `P` on an ellipse, `|P| + |P - F2| = 2a`, where `F2` is
//! the empty focus; for a hyperbola branch around the primary focus,
//! `|P - F2| - |P| = 2|a|`. Either way, the empty focus lies on a circle
//! around each point:
//!
//! ```text
//! |P1 - F2| = |2a - r1|
//! |P2 - F2| = |2a - r2|
//! ```
//!
//! Those two circles, drawn in the orbital plane, intersect in (at most)
//! two places: one on each side of the chord `P1 -> P2`. The caller picks
//! the side with [`FocusSide`].

use std::f64::consts::TAU;

use glam::DVec3;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::OrbitError;

/// Below this ratio of `|F2| / (2a)` the conic is considered circular.
const CIRCULAR_TOLERANCE: f64 = 1e-12;

/// Below this ratio of `|r1 x r2| / (|r1| |r2|)` two radius vectors are
/// considered collinear.
const COLLINEAR_TOLERANCE: f64 = 1e-10;

/// Which intersection of the two focus circles to use as the empty focus.
///
/// "Left" is the side of the chord `P1 -> P2` that `normal x chord` points
/// to, where `normal` is the orbit normal of the branch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum FocusSide {
    #[allow(missing_docs)]
    Left,
    #[allow(missing_docs)]
    Right,
}

impl FocusSide {
    /// Both sides, in a fixed order.
    pub const ALL: [FocusSide; 2] = [FocusSide::Left, FocusSide::Right];

    fn sign(self) -> f64 {
        match self {
            FocusSide::Left => 1.0,
            FocusSide::Right => -1.0,
        }
    }
}

/// Picks one conic out of the family through two points.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BranchSelector {
    /// The semi-major axis, in meters.
    /// Positive for ellipses, negative for hyperbolas.
    pub semi_major_axis: f64,

    /// The unit orbit normal. Motion along the conic is counterclockwise
    /// about this vector.
    pub normal: DVec3,

    /// Which empty-focus candidate to use.
    pub focus_side: FocusSide,
}

/// The shape and orientation of a conic through two points.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BranchGeometry {
    /// The unit vector pointing from the primary focus to periapsis.
    pub periapsis_dir: DVec3,

    /// The eccentricity of the conic.
    pub eccentricity: f64,

    /// The position of the empty focus, in meters.
    pub empty_focus: DVec3,
}

/// Resolves the eccentricity and periapsis direction of the conic through
/// `r1` and `r2` described by `selector`.
///
/// # Errors
/// Returns [`OrbitError::DegenerateGeometry`] if the two points coincide,
/// if either point sits at the focus, or if the resolved eccentricity
/// contradicts the sign of the semi-major axis.
pub fn resolve_branch_geometry(
    r1: DVec3,
    r2: DVec3,
    selector: &BranchSelector,
) -> Result<BranchGeometry, OrbitError> {
    let sma = selector.semi_major_axis;
    let normal = selector.normal.normalize();

    let chord = r2 - r1;
    let chord_length = chord.length();

    if !(chord_length > 0.0) {
        return Err(OrbitError::DegenerateGeometry {
            reason: "the two points coincide",
        });
    }

    let radius_1 = r1.length();
    let radius_2 = r2.length();

    if radius_1 == 0.0 || radius_2 == 0.0 {
        return Err(OrbitError::DegenerateGeometry {
            reason: "a point sits at the primary focus",
        });
    }

    let along = chord / chord_length;
    let across = normal.cross(along);

    let rho_1 = (2.0 * sma - radius_1).abs();
    let rho_2 = (2.0 * sma - radius_2).abs();

    // Distance from P1 to the foot of the perpendicular through F2
    let foot = (chord_length * chord_length + rho_1 * rho_1 - rho_2 * rho_2) / (2.0 * chord_length);

    // Tangent circles (e.g. a Hohmann half-ellipse) would otherwise give
    // the square root of a tiny negative number.
    let height = (rho_1 * rho_1 - foot * foot).max(0.0).sqrt();

    let empty_focus = r1 + foot * along + selector.focus_side.sign() * height * across;
    let focus_distance = empty_focus.length();

    let eccentricity = focus_distance / (2.0 * sma.abs());

    if !eccentricity.is_finite() || (sma > 0.0) != (eccentricity < 1.0) {
        return Err(OrbitError::DegenerateGeometry {
            reason: "resolved eccentricity contradicts the semi-major axis",
        });
    }

    let periapsis_dir = if eccentricity < CIRCULAR_TOLERANCE {
        // Any direction in the plane works for a circle; pick P1.
        (r1 - r1.dot(normal) * normal).normalize()
    } else if sma > 0.0 {
        // The primary focus sits between periapsis and the empty focus.
        -empty_focus / focus_distance
    } else {
        // The empty focus of a hyperbola sits beyond periapsis.
        empty_focus / focus_distance
    };

    Ok(BranchGeometry {
        periapsis_dir,
        eccentricity,
        empty_focus,
    })
}

/// Returns the prograde normal of the plane containing `r1` and `r2`, and
/// the angle swept going from `r1` to `r2` counterclockwise about it.
///
/// The normal is oriented to agree with `reference_normal`. When the two
/// vectors are collinear the plane is undefined and `reference_normal`
/// is used as-is.
pub(crate) fn transfer_plane(r1: DVec3, r2: DVec3, reference_normal: DVec3) -> (DVec3, f64) {
    let cross = r1.cross(r2);
    let scale = r1.length() * r2.length();

    let mut normal = if cross.length() > COLLINEAR_TOLERANCE * scale {
        cross.normalize()
    } else {
        reference_normal.normalize()
    };

    if normal.dot(reference_normal) < 0.0 {
        normal = -normal;
    }

    let sweep = cross.dot(normal).atan2(r1.dot(r2)).rem_euclid(TAU);

    (normal, sweep)
}

/// The angle from `from` to `to`, measured counterclockwise about `normal`,
/// in `(-pi, pi]`.
pub(crate) fn signed_angle(from: DVec3, to: DVec3, normal: DVec3) -> f64 {
    from.cross(to).dot(normal).atan2(from.dot(to))
}
