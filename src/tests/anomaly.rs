use std::f64::consts::PI;

use super::assertions::*;
use crate::{anomaly, Convergence};

const ELLIPTIC_ECCENTRICITIES: [f64; 6] = [0.0, 0.05, 0.3, 0.7, 0.9, 0.99];
const HYPERBOLIC_ECCENTRICITIES: [f64; 4] = [1.05, 1.5, 3.0, 10.0];

fn true_anomaly_grid(limit: f64, count: usize) -> impl Iterator<Item = f64> {
    (0..count).map(move |i| -limit + 2.0 * limit * i as f64 / (count - 1) as f64)
}

#[test]
fn elliptic_round_trip() {
    for e in ELLIPTIC_ECCENTRICITIES {
        for theta in true_anomaly_grid(3.1, 200) {
            let mean = anomaly::true_to_mean(theta, e);
            let recovered = anomaly::mean_to_true(mean, e);

            assert!(recovered.is_converged(), "e = {e}, theta = {theta}");
            assert!(
                (recovered.value() - theta).abs() < 1e-5,
                "round trip of theta = {theta} at e = {e} gave {}",
                recovered.value()
            );
        }
    }
}

#[test]
fn hyperbolic_round_trip() {
    for e in HYPERBOLIC_ECCENTRICITIES {
        let asymptote = (-1.0 / e).acos();

        for theta in true_anomaly_grid(0.95 * asymptote, 200) {
            let mean = anomaly::true_to_mean(theta, e);
            let recovered = anomaly::mean_to_true(mean, e);

            assert!(recovered.is_converged(), "e = {e}, theta = {theta}");
            assert!(
                (recovered.value() - theta).abs() < 1e-5,
                "round trip of theta = {theta} at e = {e} gave {}",
                recovered.value()
            );
        }
    }
}

#[test]
fn kepler_residual_is_small() {
    let eccentricities = ELLIPTIC_ECCENTRICITIES
        .iter()
        .chain(HYPERBOLIC_ECCENTRICITIES.iter());

    for &e in eccentricities {
        for i in -100..=100 {
            let mean = i as f64 * 0.5;
            let eccentric = anomaly::mean_to_eccentric(mean, e).value();
            let residual = anomaly::eccentric_to_mean(eccentric, e) - mean;

            assert!(
                residual.abs() < 1e-6,
                "Kepler residual {residual} for M = {mean}, e = {e}"
            );
        }
    }
}

#[test]
fn elliptic_keeps_revolutions() {
    // M = 50 is about eight revolutions in
    let e = 0.4;
    let eccentric = anomaly::mean_to_eccentric(50.0, e).value();

    assert!(eccentric > 6.0 * PI);
    assert_almost_eq(anomaly::eccentric_to_mean(eccentric, e), 50.0, "M = 50");
}

#[test]
fn anomalies_agree_at_apsides() {
    for e in ELLIPTIC_ECCENTRICITIES {
        assert_eq!(anomaly::mean_to_eccentric(0.0, e), Convergence::Converged(0.0));
        assert_almost_eq(anomaly::true_to_mean(0.0, e), 0.0, "periapsis");
        assert_almost_eq(anomaly::true_to_eccentric(PI, e).abs(), PI, "apoapsis");
    }
}

#[test]
fn hyperbolic_anomaly_is_odd() {
    for e in HYPERBOLIC_ECCENTRICITIES {
        for mean in [0.1, 1.0, 10.0, 100.0] {
            let ahead = anomaly::mean_to_eccentric(mean, e).value();
            let behind = anomaly::mean_to_eccentric(-mean, e).value();

            assert_almost_eq(ahead, -behind, &format!("odd symmetry at M = {mean}, e = {e}"));
        }
    }
}

#[test]
fn circular_anomalies_coincide() {
    for theta in true_anomaly_grid(3.0, 25) {
        assert_almost_eq(anomaly::true_to_eccentric(theta, 0.0), theta, "E of circle");
        assert_almost_eq(anomaly::true_to_mean(theta, 0.0), theta, "M of circle");
    }
}
