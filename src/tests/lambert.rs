use glam::DVec3;

use super::{assertions::*, init_tracing};
use crate::{
    geometry::signed_angle,
    lambert::{
        self, LambertBranch, LambertCase, LambertError, LambertProblem, LambertSolution,
    },
    LambertConfig,
};

const K_VALUES: [f64; 5] = [0.0, 0.2, 0.4, 0.6, 0.8];

fn sample_xs(case: LambertCase) -> &'static [f64] {
    if case.is_hyperbolic() {
        &[0.1, 0.5, 1.0, 2.0, 5.0]
    } else {
        &[0.1, 0.3, 0.5, 0.7, 0.9]
    }
}

#[test]
fn derivative_matches_central_difference() {
    let eps = 1e-5;

    for case in LambertCase::ALL {
        for k in K_VALUES {
            for &x in sample_xs(case) {
                let analytic = lambert::time_of_flight_derivative(x, k, case);
                let numeric = (lambert::time_of_flight(x + eps, k, case)
                    - lambert::time_of_flight(x - eps, k, case))
                    / (2.0 * eps);

                let tolerance = 1e-5 * analytic.abs().max(1.0);
                assert!(
                    (analytic - numeric).abs() < tolerance,
                    "dF/dx for {case:?} at x = {x}, K = {k}: {analytic} vs {numeric}"
                );
            }
        }
    }
}

#[test]
fn series_joins_closed_form() {
    // Just inside and just outside the series threshold
    for case in [
        LambertCase::EllipticDirect,
        LambertCase::EllipticIndirect,
        LambertCase::HyperbolicNear,
        LambertCase::HyperbolicFar,
    ] {
        for k in K_VALUES {
            let inside = lambert::time_of_flight(0.999e-3, k, case);
            let outside = lambert::time_of_flight(1.001e-3, k, case);

            assert_almost_eq(inside, outside, &format!("series seam for {case:?}, K = {k}"));
        }
    }
}

#[test]
fn minimum_energy_time_is_shared() {
    for k in K_VALUES {
        assert_almost_eq(
            lambert::time_of_flight(1.0, k, LambertCase::EllipticDirect),
            lambert::time_of_flight(1.0, k, LambertCase::EllipticDirectFar),
            "direct near and far meet at x = 1",
        );
        assert_almost_eq(
            lambert::time_of_flight(1.0, k, LambertCase::EllipticIndirect),
            lambert::time_of_flight(1.0, k, LambertCase::EllipticIndirectFar),
            "indirect near and far meet at x = 1",
        );
    }
}

#[test]
fn time_equation_round_trip() {
    let config = LambertConfig::default();

    for case in LambertCase::ALL {
        let xs: &[f64] = if case.is_hyperbolic() {
            &[0.2, 0.8, 1.5, 3.0, 10.0]
        } else {
            &[0.2, 0.5, 0.8]
        };

        for k in K_VALUES {
            for &x in xs {
                let y = lambert::time_of_flight(x, k, case);

                assert_eq!(
                    LambertCase::classify(y, k, case.branch()),
                    case,
                    "classification of y = {y} (x = {x}, K = {k})"
                );

                let solved = lambert::solve_time_equation(y, k, case, &config)
                    .unwrap_or_else(|err| panic!("{case:?} at x = {x}, K = {k}: {err}"));

                let residual = lambert::time_of_flight(solved, k, case) - y;
                assert!(
                    residual.abs() <= config.tolerance * y,
                    "residual {residual} for {case:?} at x = {x}, K = {k}"
                );
                assert!(
                    (solved - x).abs() < 1e-3 * x.max(1.0),
                    "solved x = {solved}, expected {x} for {case:?}, K = {k}"
                );
            }
        }
    }
}

#[test]
fn time_outside_case_is_unbracketed() {
    let config = LambertConfig::default();
    let k = 0.3;

    // Shorter than parabolic, so it can't be an elliptic near transfer
    let y = 0.5 * lambert::time_of_flight(0.0, k, LambertCase::EllipticDirect);

    assert!(matches!(
        lambert::solve_time_equation(y, k, LambertCase::EllipticDirect, &config),
        Err(LambertError::UnbracketedRoot { .. })
    ));
}

fn coplanar_problem(angle: f64, flight_time: f64) -> LambertProblem {
    LambertProblem {
        r1: DVec3::X,
        t1: 3.0,
        r2: 1.5 * DVec3::new(angle.cos(), angle.sin(), 0.0),
        t2: 3.0 + flight_time,
        mu: 1.0,
        reference_normal: DVec3::Z,
    }
}

fn assert_solution_connects(problem: &LambertProblem, solution: &LambertSolution, max_relative: f64) {
    let what = format!("{:?} for {problem:?}", solution.case);

    assert_vec3_close_rel(
        solution.orbit.get_position(problem.t1).cartesian,
        problem.r1,
        max_relative,
        &format!("departure of {what}"),
    );
    assert_vec3_close_rel(
        solution.orbit.get_position(problem.t2).cartesian,
        problem.r2,
        max_relative,
        &format!("arrival of {what}"),
    );

    let swept = signed_angle(problem.r1, problem.r2, solution.orbit.get_normal());
    match solution.case.branch() {
        LambertBranch::Direct => assert!(swept >= 0.0, "direct branch sweeps {swept} for {what}"),
        LambertBranch::Indirect => assert!(swept <= 0.0, "indirect branch sweeps {swept} for {what}"),
    }
}

#[test]
fn elliptic_transfers_connect_both_positions() {
    init_tracing();
    let config = LambertConfig::default();

    for angle in [0.5, 2.0, 3.5] {
        for flight_time in [2.0, 6.0, 20.0] {
            let problem = coplanar_problem(angle, flight_time);
            let solutions = lambert::solve(&problem, &config).expect("solvable problem");

            assert_eq!(solutions.len(), 2, "both branches for {problem:?}");
            assert_eq!(solutions[0].case.branch(), LambertBranch::Direct);
            assert_eq!(solutions[1].case.branch(), LambertBranch::Indirect);

            for solution in &solutions {
                assert!(!solution.case.is_hyperbolic());
                assert_solution_connects(&problem, solution, 1e-4);
            }
        }
    }
}

#[test]
fn hyperbolic_transfers_connect_both_positions() {
    init_tracing();
    let config = LambertConfig::default();

    for angle in [2.0, 3.5] {
        let problem = coplanar_problem(angle, 0.5);
        let solutions = lambert::solve(&problem, &config).expect("solvable problem");

        assert!(
            solutions
                .iter()
                .any(|solution| solution.case == LambertCase::HyperbolicNear),
            "direct hyperbola for {problem:?}"
        );

        for solution in &solutions {
            assert!(solution.case.is_hyperbolic());
            assert!(solution.orbit.get_semi_major_axis() < 0.0);
            assert_solution_connects(&problem, solution, 1e-3);
        }
    }
}

#[test]
fn transfer_velocities_are_consistent() {
    let config = LambertConfig::default();
    let problem = coplanar_problem(2.0, 6.0);

    for solution in lambert::solve(&problem, &config).expect("solvable problem") {
        let mu = problem.mu;
        let energy_1 = 0.5 * solution.departure_velocity().length_squared() - mu / problem.r1.length();
        let energy_2 = 0.5 * solution.arrival_velocity().length_squared() - mu / problem.r2.length();

        assert_almost_eq(energy_1, energy_2, "specific orbital energy");
        assert_almost_eq(
            problem.r1.cross(solution.departure_velocity()).length(),
            problem.r2.cross(solution.arrival_velocity()).length(),
            "specific angular momentum",
        );
    }
}

#[test]
fn invalid_problems_are_rejected() {
    let config = LambertConfig::default();

    let backwards = coplanar_problem(1.0, -1.0);
    assert!(matches!(
        lambert::solve(&backwards, &config),
        Err(LambertError::NonPositiveFlightTime { .. })
    ));

    let coincident = LambertProblem {
        r2: DVec3::X,
        ..coplanar_problem(1.0, 1.0)
    };
    assert!(matches!(
        lambert::solve(&coincident, &config),
        Err(LambertError::DegenerateGeometry { .. })
    ));
}

#[test]
fn reference_normal_does_not_change_the_arcs() {
    let config = LambertConfig::default();

    for (angle, flight_time, max_relative) in
        [(0.5, 6.0, 1e-4), (2.0, 6.0, 1e-4), (3.5, 6.0, 1e-4), (2.0, 0.5, 1e-3), (3.5, 0.5, 1e-3)]
    {
        let prograde = coplanar_problem(angle, flight_time);
        let retrograde = LambertProblem {
            reference_normal: DVec3::NEG_Z,
            ..prograde
        };

        let expected = lambert::solve(&prograde, &config).expect("solvable problem");
        let solutions = lambert::solve(&retrograde, &config).expect("solvable problem");

        assert_eq!(solutions.len(), expected.len(), "branch count for {retrograde:?}");

        for (solution, expected) in solutions.iter().zip(&expected) {
            assert_eq!(solution.case, expected.case);
            assert_solution_connects(&retrograde, solution, max_relative);
            assert_same_trajectory(
                &solution.orbit,
                &expected.orbit,
                &[retrograde.t1, 0.5 * (retrograde.t1 + retrograde.t2), retrograde.t2],
                &format!("{:?} at angle {angle}", solution.case),
            );
        }
    }
}
