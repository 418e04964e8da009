//! Direct per-mu solves.
//!
//! This module provides:
//! - Matrix stuffing of the MAD linear program and the mean-variance
//!   quadratic program
//! - Clarabel solver integration

pub mod clarabel;
pub mod stuffing;

pub use self::clarabel::{
    solve_mad_at, solve_mad_grid, solve_variance_at, PointSolution, Settings, SolveStatus,
};
pub use stuffing::{stuff_mad, stuff_variance, ConeDims, Model, StuffedProblem};
