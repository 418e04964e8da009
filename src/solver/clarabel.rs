//! Clarabel solver integration.
//!
//! Solves single points of the frontier directly with the interior-point
//! solver. The sweep does not depend on this; it is an independent check and
//! a way to compare the MAD model with mean-variance.

use clarabel::algebra::CscMatrix as ClarabelCsc;
use clarabel::solver::{
    DefaultSettingsBuilder, DefaultSolver, IPSolver, SolverStatus, SupportedConeT,
};
use log::{debug, warn};
use serde::Serialize;

use super::stuffing::{stuff_mad, stuff_variance, ConeDims, Model, StuffedProblem};
use crate::canon::MadProblem;
use crate::data::portfolio_variance;
use crate::error::{FrontierError, Result};

/// Solution status from the solver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SolveStatus {
    /// Optimal solution found.
    Optimal,
    /// Solved to reduced accuracy.
    AlmostOptimal,
    Infeasible,
    Unbounded,
    /// Iteration or time limit reached.
    MaxIterations,
    NumericalError,
    Unknown,
}

impl SolveStatus {
    pub fn is_optimal(self) -> bool {
        matches!(self, SolveStatus::Optimal | SolveStatus::AlmostOptimal)
    }
}

impl From<SolverStatus> for SolveStatus {
    fn from(status: SolverStatus) -> Self {
        match status {
            SolverStatus::Solved => SolveStatus::Optimal,
            SolverStatus::AlmostSolved => SolveStatus::AlmostOptimal,
            SolverStatus::PrimalInfeasible | SolverStatus::AlmostPrimalInfeasible => {
                SolveStatus::Infeasible
            }
            SolverStatus::DualInfeasible | SolverStatus::AlmostDualInfeasible => {
                SolveStatus::Unbounded
            }
            SolverStatus::MaxIterations | SolverStatus::MaxTime => SolveStatus::MaxIterations,
            SolverStatus::NumericalError | SolverStatus::InsufficientProgress => {
                SolveStatus::NumericalError
            }
            _ => SolveStatus::Unknown,
        }
    }
}

/// Solver settings.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Print solver output.
    pub verbose: bool,
    /// Maximum iterations.
    pub max_iter: u32,
    /// Time limit in seconds.
    pub time_limit: f64,
    /// Absolute tolerance.
    pub tol_gap_abs: f64,
    /// Relative tolerance.
    pub tol_gap_rel: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            verbose: false,
            max_iter: 200,
            time_limit: f64::INFINITY,
            tol_gap_abs: 1e-9,
            tol_gap_rel: 1e-9,
        }
    }
}

/// Optimal portfolio at a single mu.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PointSolution {
    pub mu: f64,
    pub status: SolveStatus,
    /// Allocation per asset, in input order.
    pub weights: Vec<f64>,
    /// Expected return sum_j r_j x_j.
    pub reward: f64,
    /// Mean absolute deviation for the MAD model, variance for the
    /// mean-variance model.
    pub risk: f64,
    /// `mu * reward - risk`.
    pub objective: f64,
    /// Solve time in seconds.
    pub solve_time: f64,
    pub iterations: u32,
}

/// Raw primal output of one Clarabel run.
#[derive(Debug, Clone)]
struct RawSolution {
    status: SolveStatus,
    x: Vec<f64>,
    solve_time: f64,
    iterations: u32,
}

/// Solve the stuffed problem using Clarabel.
fn solve(problem: &StuffedProblem, settings: &Settings) -> Result<RawSolution> {
    let p = to_clarabel_csc(&problem.p);
    let a = to_clarabel_csc(&problem.a);
    let cones = to_clarabel_cones(&problem.cone_dims);

    let clarabel_settings = DefaultSettingsBuilder::default()
        .verbose(settings.verbose)
        .max_iter(settings.max_iter)
        .time_limit(settings.time_limit)
        .tol_gap_abs(settings.tol_gap_abs)
        .tol_gap_rel(settings.tol_gap_rel)
        .build()
        .map_err(|e| FrontierError::SolverError(e.to_string()))?;

    let mut solver = DefaultSolver::new(&p, &problem.q, &a, &problem.b, &cones, clarabel_settings);
    solver.solve();

    Ok(RawSolution {
        status: solver.solution.status.into(),
        x: solver.solution.x.clone(),
        solve_time: solver.solution.solve_time,
        iterations: solver.info.iterations,
    })
}

/// Convert nalgebra CSC to Clarabel CSC.
fn to_clarabel_csc(m: &nalgebra_sparse::CscMatrix<f64>) -> ClarabelCsc<f64> {
    ClarabelCsc::new(
        m.nrows(),
        m.ncols(),
        m.col_offsets().to_vec(),
        m.row_indices().to_vec(),
        m.values().to_vec(),
    )
}

/// Convert cone dimensions to Clarabel cones.
fn to_clarabel_cones(dims: &ConeDims) -> Vec<SupportedConeT<f64>> {
    let mut cones = Vec::new();
    if dims.zero > 0 {
        cones.push(SupportedConeT::ZeroConeT(dims.zero));
    }
    if dims.nonneg > 0 {
        cones.push(SupportedConeT::NonnegativeConeT(dims.nonneg));
    }
    cones
}

fn check_mu(mu: f64) -> Result<()> {
    if !mu.is_finite() || mu < 0.0 {
        return Err(FrontierError::MalformedInput(format!(
            "mu must be finite and non-negative, got {}",
            mu
        )));
    }
    Ok(())
}

/// Solve a stuffed model and evaluate the portfolio it returns.
fn solve_point(
    problem: &MadProblem,
    stuffed: &StuffedProblem,
    mu: f64,
    settings: &Settings,
) -> Result<PointSolution> {
    let raw = solve(stuffed, settings)?;
    if !raw.status.is_optimal() {
        return Err(FrontierError::SolverError(format!(
            "{:?} model at mu = {}: status {:?}",
            stuffed.model, mu, raw.status
        )));
    }

    // Interior-point iterates sit slightly inside the cone.
    let weights: Vec<f64> = raw.x[..stuffed.num_assets]
        .iter()
        .map(|w| w.max(0.0))
        .collect();
    let reward = problem.reward(&weights);
    let risk = match stuffed.model {
        Model::Mad => problem.mad_risk(&weights),
        Model::Variance => portfolio_variance_sample(problem, &weights),
    };
    debug!(
        "{:?} model at mu = {}: reward {}, risk {}, {} iterations",
        stuffed.model, mu, reward, risk, raw.iterations
    );

    Ok(PointSolution {
        mu,
        status: raw.status,
        weights,
        reward,
        risk,
        objective: mu * reward - risk,
        solve_time: raw.solve_time,
        iterations: raw.iterations,
    })
}

/// Variance of the portfolio under the sample covariance used by the QP.
fn portfolio_variance_sample(problem: &MadProblem, weights: &[f64]) -> f64 {
    let periods = problem.num_periods() as f64;
    portfolio_variance(problem.deviations(), weights) * periods / (periods - 1.0)
}

/// Solve the MAD linear program at a single mu.
pub fn solve_mad_at(problem: &MadProblem, mu: f64, settings: &Settings) -> Result<PointSolution> {
    check_mu(mu)?;
    solve_point(problem, &stuff_mad(problem, mu), mu, settings)
}

/// Solve the MAD program at every mu of a grid. Points the solver cannot
/// handle are logged and skipped.
pub fn solve_mad_grid(problem: &MadProblem, mus: &[f64], settings: &Settings) -> Vec<PointSolution> {
    mus.iter()
        .filter_map(|&mu| match solve_mad_at(problem, mu, settings) {
            Ok(solution) => Some(solution),
            Err(err) => {
                warn!("skipping mu = {}: {}", mu, err);
                None
            }
        })
        .collect()
}

/// Solve the mean-variance quadratic program at a single mu.
pub fn solve_variance_at(
    problem: &MadProblem,
    mu: f64,
    settings: &Settings,
) -> Result<PointSolution> {
    check_mu(mu)?;
    solve_point(problem, &stuff_variance(problem, mu), mu, settings)
}
