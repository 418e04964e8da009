//! # madfrontier
//!
//! The complete mean absolute deviation (MAD) efficient frontier in one
//! parametric simplex sweep.
//!
//! For a trade-off parameter mu >= 0 the MAD portfolio problem is the linear
//! program
//!
//! ```text
//! maximize    mu * sum_j r_j x_j - (1/T) sum_t |sum_j D(t,j) x_j|
//! subject to  sum_j x_j = 1,  x >= 0
//! ```
//!
//! Rather than solving it once per mu, the sweep starts from the basis that
//! is optimal as mu goes to infinity (everything in the highest-mean asset)
//! and walks mu down to zero, pivoting once at every breakpoint. Each record
//! holds the interval of mu on which its basis stays optimal.
//!
//! ## Quick Start
//!
//! ```
//! use madfrontier::prelude::*;
//!
//! let table = ReturnsTable::new(
//!     vec!["A".into(), "B".into()],
//!     vec![
//!         vec![1.20, 1.02],
//!         vec![0.90, 0.99],
//!         vec![1.15, 1.01],
//!         vec![0.95, 1.00],
//!     ],
//! )?;
//!
//! let frontier = efficient_frontier(&table)?;
//! for bp in frontier.breakpoints() {
//!     println!("({}, {}] reward {} risk {}", bp.mu_low, bp.mu_high, bp.reward, bp.risk);
//! }
//! # Ok::<(), madfrontier::FrontierError>(())
//! ```
//!
//! ## Architecture
//!
//! - **Formulation** (`canon`): means, deviations and the slack-augmented
//!   equality system
//! - **Dictionary** (`simplex::dictionary`): dense tableau with a risk row and
//!   a reward row
//! - **Pivot engine** (`simplex::pivot`): crossing rule and ratio test with
//!   lowest-index tie-breaks
//! - **Controller** (`frontier::sweep`): resumable state machine with drift
//!   recovery and cooperative abort
//! - **Direct solves** (`solver`): Clarabel LP/QP at a single mu

pub mod benchmarks;
pub mod canon;
pub mod data;
pub mod error;
pub mod frontier;
pub mod simplex;
pub mod solver;
pub mod sparse;

/// Prelude module for convenient imports.
///
/// ```
/// use madfrontier::prelude::*;
/// ```
pub mod prelude {
    // Input
    pub use crate::data::{summarize, AssetSummary, ReturnsTable};

    // Formulation
    pub use crate::canon::{MadProblem, Variable};

    // Sweep
    pub use crate::frontier::{
        efficient_frontier, Breakpoint, Diagnostic, Frontier, Sweep, SweepSettings, SweepState,
        Termination,
    };

    // Direct solves
    pub use crate::solver::{solve_mad_at, solve_variance_at, PointSolution, Settings};

    // Benchmarks
    pub use crate::benchmarks::BenchmarkPortfolio;

    // Errors
    pub use crate::error::{FrontierError, Result};
}

// Re-export main types at crate root
pub use error::{FrontierError, Result};
pub use frontier::{efficient_frontier, Breakpoint, Frontier};
