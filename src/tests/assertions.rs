use glam::DVec3;

use crate::Orbit;

const ALMOST_EQ_TOLERANCE: f64 = 1e-6;

pub(super) fn assert_almost_eq(a: f64, b: f64, what: &str) {
    if a.is_nan() && b.is_nan() {
        return;
    }

    let dist = (a - b).abs();
    let msg = format!(
        "Almost-eq assertion failed for '{what}'!\n\
        {a} and {b} has distance {dist}, which is more than max of {ALMOST_EQ_TOLERANCE}"
    );

    assert!(dist < ALMOST_EQ_TOLERANCE, "{msg}");
}

pub(super) fn assert_almost_eq_rel(a: f64, b: f64, max_relative: f64, what: &str) {
    let dist = (a - b).abs();
    let scale = a.abs().max(b.abs()).max(f64::MIN_POSITIVE);
    let relative = dist / scale;

    assert!(
        relative <= max_relative,
        "Relative almost-eq assertion failed for '{what}'!\n\
        {a} and {b} has relative distance {relative}, which is more than max of {max_relative}"
    );
}

pub(super) fn assert_almost_eq_vec3(a: DVec3, b: DVec3, what: &str) {
    let desc = format!("{a:?} vs {b:?}");
    assert_almost_eq(a.x, b.x, &format!("X of {desc} for {what}"));
    assert_almost_eq(a.y, b.y, &format!("Y of {desc} for {what}"));
    assert_almost_eq(a.z, b.z, &format!("Z of {desc} for {what}"));
}

/// Compares two vectors relative to the larger of their lengths.
pub(super) fn assert_vec3_close_rel(a: DVec3, b: DVec3, max_relative: f64, what: &str) {
    let dist = (a - b).length();
    let scale = a.length().max(b.length()).max(f64::MIN_POSITIVE);
    let relative = dist / scale;

    assert!(
        relative <= max_relative,
        "Vector assertion failed for '{what}'!\n\
        {a:?} and {b:?} has relative distance {relative}, which is more than max of {max_relative}"
    );
}

/// Checks that two orbits put the body in the same place at a few times.
pub(super) fn assert_same_trajectory(a: &Orbit, b: &Orbit, times: &[f64], what: &str) {
    assert_almost_eq_rel(
        a.get_semi_major_axis(),
        b.get_semi_major_axis(),
        1e-6,
        &format!("semi-major axis of {what}"),
    );
    assert_almost_eq(
        a.get_eccentricity(),
        b.get_eccentricity(),
        &format!("eccentricity of {what}"),
    );

    for &t in times {
        let a_sv = a.get_state_vectors_at_time(t);
        let b_sv = b.get_state_vectors_at_time(t);

        assert_vec3_close_rel(
            a_sv.position,
            b_sv.position,
            1e-6,
            &format!("position at t = {t} for {what}"),
        );
        assert_vec3_close_rel(
            a_sv.velocity,
            b_sv.velocity,
            1e-6,
            &format!("velocity at t = {t} for {what}"),
        );
    }
}
