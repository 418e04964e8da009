//! The sweep checked against direct Clarabel solves.
//!
//! At any mu inside an interval the interior-point optimum of the MAD linear
//! program must reach the objective of the interval's record.

use madfrontier::prelude::*;
use madfrontier::solver::{solve_mad_grid, SolveStatus};

/// Tolerance for comparing the sweep with the interior-point solver
const TOL: f64 = 1e-5;

/// A test case definition
struct Case {
    name: &'static str,
    assets: &'static [&'static str],
    rows: Vec<Vec<f64>>,
}

fn cases() -> Vec<Case> {
    vec![
        Case {
            name: "two_assets",
            assets: &["A", "B"],
            rows: vec![
                vec![1.20, 1.02],
                vec![0.90, 0.99],
                vec![1.15, 1.01],
                vec![0.95, 1.00],
            ],
        },
        Case {
            name: "four_assets",
            assets: &["SPY", "TLT", "GLD", "QQQ"],
            rows: vec![
                vec![1.031, 1.012, 0.994, 1.045],
                vec![0.978, 1.021, 1.013, 0.962],
                vec![1.024, 0.991, 1.007, 1.038],
                vec![1.006, 1.004, 0.982, 1.011],
                vec![0.957, 1.030, 1.026, 0.941],
                vec![1.042, 0.987, 0.998, 1.057],
            ],
        },
        Case {
            name: "anticorrelated",
            assets: &["A", "B"],
            rows: vec![
                vec![1.30, 0.90],
                vec![0.90, 1.30],
                vec![1.30, 0.90],
                vec![0.90, 1.30],
            ],
        },
    ]
}

fn table(case: &Case) -> ReturnsTable {
    ReturnsTable::new(
        case.assets.iter().map(|s| s.to_string()).collect(),
        case.rows.clone(),
    )
    .unwrap()
}

fn problem(case: &Case) -> MadProblem {
    MadProblem::formulate(&table(case)).unwrap()
}

/// A mu strictly inside every interval of the frontier.
fn interior_points(frontier: &Frontier) -> Vec<f64> {
    frontier
        .breakpoints()
        .iter()
        .map(|bp| {
            if bp.mu_high.is_infinite() {
                2.0 * bp.mu_low + 1.0
            } else {
                0.5 * (bp.mu_low + bp.mu_high)
            }
        })
        .collect()
}

#[test]
fn test_sweep_matches_direct_solves() {
    let settings = Settings::default();
    for case in cases() {
        let problem = problem(&case);
        let frontier = Sweep::new(&problem, SweepSettings::default()).run().unwrap();

        for mu in interior_points(&frontier).into_iter().chain([0.0]) {
            let direct = solve_mad_at(&problem, mu, &settings)
                .unwrap_or_else(|e| panic!("case '{}' at mu = {}: {}", case.name, mu, e));
            assert!(direct.status.is_optimal());

            let swept = frontier.objective_at(mu).unwrap();
            let err = (direct.objective - swept).abs() / (1.0 + swept.abs());
            assert!(
                err < TOL,
                "case '{}' at mu = {}: sweep {} vs direct {} (err={})",
                case.name,
                mu,
                swept,
                direct.objective,
                err
            );
        }
    }
}

#[test]
fn test_terminal_matches_min_mad() {
    for case in cases() {
        let problem = problem(&case);
        let frontier = efficient_frontier(&table(&case)).unwrap();
        let direct = solve_mad_at(&problem, 0.0, &Settings::default()).unwrap();
        let terminal = frontier.terminal().unwrap();
        assert!(
            (direct.risk - terminal.risk).abs() < TOL,
            "case '{}': terminal risk {} vs direct {}",
            case.name,
            terminal.risk,
            direct.risk
        );
    }
}

#[test]
fn test_grid_skips_invalid_points() {
    let problem = problem(&cases()[1]);
    let mus = [0.0, 0.5, -1.0, 2.0, f64::NAN];
    let solutions = solve_mad_grid(&problem, &mus, &Settings::default());
    assert_eq!(solutions.len(), 3);
    assert!(solutions.iter().all(|s| s.status == SolveStatus::Optimal
        || s.status == SolveStatus::AlmostOptimal));
    assert_eq!(
        solutions.iter().map(|s| s.mu).collect::<Vec<_>>(),
        vec![0.0, 0.5, 2.0]
    );
}

#[test]
fn test_variance_model_end_points() {
    let problem = problem(&cases()[1]);
    let settings = Settings::default();

    // Large mu: all weight on the best mean.
    let aggressive = solve_variance_at(&problem, 1e3, &settings).unwrap();
    let best = problem.best_asset();
    assert!(aggressive.weights[best] > 1.0 - 1e-4);

    // mu = 0: no single asset has lower variance.
    let cautious = solve_variance_at(&problem, 0.0, &settings).unwrap();
    let n = problem.num_assets();
    let periods = problem.num_periods() as f64;
    for j in 0..n {
        let mut weights = vec![0.0; n];
        weights[j] = 1.0;
        let variance = madfrontier::data::portfolio_variance(problem.deviations(), &weights)
            * periods
            / (periods - 1.0);
        assert!(cautious.risk <= variance + 1e-7);
    }
    let sum: f64 = cautious.weights.iter().sum();
    assert!((sum - 1.0).abs() < 1e-6);
}
