//! Matrix stuffing: builds the conic form `(P, q, A, b, K)` of the per-mu
//! programs.
//!
//! Clarabel solves
//!
//! ```text
//! minimize    (1/2) z' P z + q' z
//! subject to  A z + s = b,   s in K
//! ```
//!
//! so both maximisation problems are negated, and every inequality
//! `g(z) <= 0` becomes a row `g` with `b = 0` in the nonnegative cone.

use nalgebra::DMatrix;
use nalgebra_sparse::CscMatrix;

use crate::canon::MadProblem;
use crate::data::covariance;
use crate::sparse::{csc_scale, csc_upper_triangle, csc_vstack, dense_to_csc};

/// Cone dimensions for Clarabel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConeDims {
    /// Number of zero cone (equality) rows.
    pub zero: usize,
    /// Number of nonnegative cone rows.
    pub nonneg: usize,
}

impl ConeDims {
    /// Total number of constraint rows.
    pub fn total(&self) -> usize {
        self.zero + self.nonneg
    }
}

/// Which per-mu model a stuffed problem encodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Model {
    /// Linear program over `[x, y]`.
    Mad,
    /// Quadratic program over `x`.
    Variance,
}

/// Stuffed problem ready for Clarabel.
#[derive(Debug)]
pub struct StuffedProblem {
    pub model: Model,
    /// Quadratic cost matrix P, upper triangle.
    pub p: CscMatrix<f64>,
    /// Linear cost vector q.
    pub q: Vec<f64>,
    /// Constraint matrix A.
    pub a: CscMatrix<f64>,
    /// Constraint vector b.
    pub b: Vec<f64>,
    pub cone_dims: ConeDims,
    /// Leading columns of z holding the allocation x.
    pub num_assets: usize,
}

impl StuffedProblem {
    pub fn num_vars(&self) -> usize {
        self.q.len()
    }
}

/// Budget row `sum_j x_j = 1` over the first `n` of `width` columns.
fn budget_rows(n: usize, width: usize) -> (DMatrix<f64>, Vec<f64>) {
    let mut a = DMatrix::zeros(1, width);
    a.columns_mut(0, n).fill(1.0);
    (a, vec![1.0])
}

/// The MAD linear program at `mu`.
///
/// Variables `z = [x_0..x_{n-1}, y_0..y_{T-1}]`; the deviation bound
/// `-y_t <= sum_j D(t,j) x_j <= y_t` takes two rows per period.
pub fn stuff_mad(problem: &MadProblem, mu: f64) -> StuffedProblem {
    let (n, periods) = (problem.num_assets(), problem.num_periods());
    let width = n + periods;
    let d = problem.deviations();
    let means = problem.mean_returns();

    let mut q = vec![0.0; width];
    for j in 0..n {
        q[j] = -mu * means[j];
    }
    for t in 0..periods {
        q[n + t] = 1.0 / periods as f64;
    }

    let (eq, mut b) = budget_rows(n, width);

    // D_t x - y_t <= 0, -D_t x - y_t <= 0, -x <= 0, -y <= 0
    let rows = 2 * periods + width;
    let mut ineq = DMatrix::zeros(rows, width);
    for t in 0..periods {
        for j in 0..n {
            ineq[(t, j)] = d[(t, j)];
            ineq[(periods + t, j)] = -d[(t, j)];
        }
        ineq[(t, n + t)] = -1.0;
        ineq[(periods + t, n + t)] = -1.0;
    }
    for k in 0..width {
        ineq[(2 * periods + k, k)] = -1.0;
    }
    b.extend(std::iter::repeat(0.0).take(rows));

    StuffedProblem {
        model: Model::Mad,
        p: CscMatrix::zeros(width, width),
        q,
        a: csc_vstack(&dense_to_csc(&eq), &dense_to_csc(&ineq)),
        b,
        cone_dims: ConeDims {
            zero: 1,
            nonneg: rows,
        },
        num_assets: n,
    }
}

/// The mean-variance quadratic program at `mu`, with the sample covariance.
///
/// Clarabel's cost carries a factor 1/2, so `P = 2 * Sigma` gives the
/// objective `x' Sigma x - mu r' x`.
pub fn stuff_variance(problem: &MadProblem, mu: f64) -> StuffedProblem {
    let n = problem.num_assets();
    let sigma = covariance(problem.deviations());
    let q = problem.mean_returns().iter().map(|r| -mu * r).collect();

    let (eq, mut b) = budget_rows(n, n);
    let ineq = -DMatrix::<f64>::identity(n, n);
    b.extend(std::iter::repeat(0.0).take(n));

    StuffedProblem {
        model: Model::Variance,
        p: csc_scale(&csc_upper_triangle(&sigma), 2.0),
        q,
        a: csc_vstack(&dense_to_csc(&eq), &dense_to_csc(&ineq)),
        b,
        cone_dims: ConeDims { zero: 1, nonneg: n },
        num_assets: n,
    }
}
