//! Conversions between the mean, eccentric and true anomalies.
//!
//! All functions here take the eccentricity explicitly and pick the
//! elliptic or hyperbolic form of each relation from it:
//! eccentricities below 1 are treated as ellipses, anything else as a
//! hyperbola.
//!
//! For hyperbolas, the "eccentric anomaly" is the
//! [hyperbolic eccentric anomaly](https://space.stackexchange.com/questions/27602/what-is-hyperbolic-eccentric-anomaly-f)
//! `F`, related to the mean anomaly through `M = e sinh(F) - F`.
//!
//! # Parabolic Support
//! Parabolic trajectories (eccentricity of exactly 1) are not supported.
//! `NaN`s or nonsensical values may be returned for them.

use std::f64::consts::{PI, TAU};

use tracing::warn;

use crate::{sinhcosh, Convergence, NUMERIC_MAX_ITERS};

/// Step size below which the Kepler solvers consider themselves converged.
pub const KEPLER_TOLERANCE: f64 = 1e-6;

/// Below this eccentricity, the elliptic solver uses a fixed-point step
/// instead of Newton-Raphson.
const FIXED_POINT_ECCENTRICITY: f64 = 0.1;

/// Above `|M| > HYPERBOLIC_LOG_SEED_RATIO * e`, the hyperbolic solver seeds
/// with the logarithmic asymptote.
const HYPERBOLIC_LOG_SEED_RATIO: f64 = 6.0;

#[inline]
fn keplers_equation(mean_anomaly: f64, eccentric_anomaly: f64, eccentricity: f64) -> f64 {
    eccentric_anomaly - (eccentricity * eccentric_anomaly.sin()) - mean_anomaly
}
#[inline]
fn keplers_equation_derivative(eccentric_anomaly: f64, eccentricity: f64) -> f64 {
    1.0 - (eccentricity * eccentric_anomaly.cos())
}
#[inline]
fn hyperbolic_keplers_equation(mean_anomaly: f64, eccentric_anomaly: f64, eccentricity: f64) -> f64 {
    eccentricity * eccentric_anomaly.sinh() - eccentric_anomaly - mean_anomaly
}
#[inline]
fn hyperbolic_keplers_equation_derivative(eccentric_anomaly: f64, eccentricity: f64) -> f64 {
    eccentricity * eccentric_anomaly.cosh() - 1.0
}

/// Gets the eccentric anomaly at a given true anomaly.
///
/// For ellipses, true anomalies in `(-pi, pi]` map to eccentric anomalies
/// in the same range.
///
/// For hyperbolas, the true anomaly must lie strictly between the two
/// asymptote angles `+/- acos(-1/e)`; outside of them `NaN` is returned.
pub fn true_to_eccentric(true_anomaly: f64, eccentricity: f64) -> f64 {
    let half = true_anomaly * 0.5;

    if eccentricity < 1.0 {
        // tan(E / 2) = sqrt((1 - e)/(1 + e)) * tan(v / 2)
        //
        // Written with atan2 on the half-angle sine and cosine so that
        // v = pi doesn't go through an infinite tangent.
        let (sin_half, cos_half) = half.sin_cos();
        2.0 * ((1.0 - eccentricity).sqrt() * sin_half).atan2((1.0 + eccentricity).sqrt() * cos_half)
    } else {
        // tanh(H/2) = tan(f/2) * sqrt((e-1)/(e+1))
        2.0 * (half.tan() * ((eccentricity - 1.0) / (eccentricity + 1.0)).sqrt()).atanh()
    }
}

/// Gets the true anomaly at a given eccentric anomaly.
///
/// Elliptic results are wrapped into `(-pi, pi]`.
pub fn eccentric_to_true(eccentric_anomaly: f64, eccentricity: f64) -> f64 {
    let half = eccentric_anomaly * 0.5;

    if eccentricity < 1.0 {
        // tan(v / 2) = sqrt((1 + e)/(1 - e)) * tan(E / 2)
        let (sin_half, cos_half) = half.sin_cos();
        2.0 * ((1.0 + eccentricity).sqrt() * sin_half).atan2((1.0 - eccentricity).sqrt() * cos_half)
    } else {
        // tan(f/2) = sqrt((e+1)/(e-1))*tanh(H/2)
        2.0 * (((eccentricity + 1.0) / (eccentricity - 1.0)).sqrt() * half.tanh()).atan()
    }
}

/// Gets the mean anomaly at a given eccentric anomaly.
///
/// This is Kepler's equation, `M = E - e sin(E)`, or its hyperbolic
/// counterpart, `M = e sinh(F) - F`.
pub fn eccentric_to_mean(eccentric_anomaly: f64, eccentricity: f64) -> f64 {
    if eccentricity < 1.0 {
        eccentric_anomaly - eccentricity * eccentric_anomaly.sin()
    } else {
        let (sinh, _) = sinhcosh(eccentric_anomaly);
        eccentricity * sinh - eccentric_anomaly
    }
}

/// Gets the mean anomaly at a given true anomaly.
pub fn true_to_mean(true_anomaly: f64, eccentricity: f64) -> f64 {
    eccentric_to_mean(true_to_eccentric(true_anomaly, eccentricity), eccentricity)
}

/// Gets the true anomaly at a given mean anomaly.
///
/// See [`mean_to_eccentric`] for how convergence is reported.
pub fn mean_to_true(mean_anomaly: f64, eccentricity: f64) -> Convergence<f64> {
    mean_to_eccentric(mean_anomaly, eccentricity).map(|e| eccentric_to_true(e, eccentricity))
}

/// Solves Kepler's equation for the eccentric anomaly.
///
/// The result satisfies `eccentric_to_mean(E, e) ≈ M` for every finite `M`;
/// elliptic mean anomalies outside `[-pi, pi)` yield eccentric anomalies
/// shifted by the same number of revolutions.
///
/// The solver iterates until a step is smaller than [`KEPLER_TOLERANCE`].
/// If it runs for [`NUMERIC_MAX_ITERS`] iterations without getting there,
/// a warning is logged and the last estimate is returned as
/// [`Convergence::CappedOut`].
pub fn mean_to_eccentric(mean_anomaly: f64, eccentricity: f64) -> Convergence<f64> {
    let result = if eccentricity < 1.0 {
        mean_to_eccentric_elliptic(mean_anomaly, eccentricity)
    } else {
        mean_to_eccentric_hyperbolic(mean_anomaly, eccentricity)
    };

    if let Convergence::CappedOut(estimate) = result {
        warn!(
            mean_anomaly,
            eccentricity, estimate, "Kepler solver hit its iteration cap"
        );
    }

    result
}

fn mean_to_eccentric_elliptic(mean_anomaly: f64, eccentricity: f64) -> Convergence<f64> {
    // Use the symmetry and periodicity of the eccentric anomaly:
    // solve for |M| in [0, pi] and restore sign and revolutions at the end.
    let revolutions = ((mean_anomaly + PI) / TAU).floor();
    let reduced = mean_anomaly - revolutions * TAU;
    let sign = if reduced < 0.0 { -1.0 } else { 1.0 };
    let reduced = reduced.abs();

    let restore = |eccentric_anomaly: f64| sign * eccentric_anomaly + revolutions * TAU;

    // E - M = e sin(E), so the root lives in [M, min(M + e, pi)].
    // Keeping that bracket around lets us fall back to bisection when
    // Newton overshoots, which happens for eccentricities close to 1.
    let mut low = reduced;
    let mut high = (reduced + eccentricity).min(PI);

    let mut eccentric_anomaly = reduced;

    for _ in 0..NUMERIC_MAX_ITERS {
        let f = keplers_equation(reduced, eccentric_anomaly, eccentricity);

        if f < 0.0 {
            low = low.max(eccentric_anomaly);
        } else {
            high = high.min(eccentric_anomaly);
        }

        let delta = if eccentricity < FIXED_POINT_ECCENTRICITY {
            // E_{k+1} = M + e sin(E_k)
            -f
        } else {
            -f / keplers_equation_derivative(eccentric_anomaly, eccentricity)
        };

        let candidate = eccentric_anomaly + delta;

        if delta.abs() < KEPLER_TOLERANCE {
            return Convergence::Converged(restore(candidate.max(low).min(high)));
        }

        if candidate.is_finite() && candidate >= low && candidate <= high {
            eccentric_anomaly = candidate;
        } else {
            eccentric_anomaly = 0.5 * (low + high);
        }
    }

    Convergence::CappedOut(restore(eccentric_anomaly))
}

fn mean_to_eccentric_hyperbolic(mean_anomaly: f64, eccentricity: f64) -> Convergence<f64> {
    // The hyperbolic Kepler equation is odd in both M and F.
    let sign = mean_anomaly.signum();
    let mean_anomaly = mean_anomaly.abs();

    let mut eccentric_anomaly = if mean_anomaly > HYPERBOLIC_LOG_SEED_RATIO * eccentricity {
        // e sinh(F) ~ e exp(F) / 2 for large F
        (2.0 * mean_anomaly / eccentricity).ln()
    } else {
        // Cubic blend around F = 0:
        // e (F + F^3 / 6) - F ~ M
        let x = (8.0 * (eccentricity - 1.0) / eccentricity).sqrt();
        x * ((3.0 * mean_anomaly / (x * (eccentricity - 1.0))).asinh() / 3.0).sinh()
    };

    // e sinh(F) - F - M is increasing and convex for F >= 0, so Newton
    // from the seed never leaves the positive half-line.
    for _ in 0..NUMERIC_MAX_ITERS {
        let delta = -hyperbolic_keplers_equation(mean_anomaly, eccentric_anomaly, eccentricity)
            / hyperbolic_keplers_equation_derivative(eccentric_anomaly, eccentricity);

        if !delta.is_finite() {
            return Convergence::CappedOut(sign * eccentric_anomaly);
        }

        eccentric_anomaly += delta;

        if delta.abs() < KEPLER_TOLERANCE {
            return Convergence::Converged(sign * eccentric_anomaly);
        }
    }

    Convergence::CappedOut(sign * eccentric_anomaly)
}
