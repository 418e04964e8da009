//! Error types for madfrontier.

use thiserror::Error;

/// Error type for madfrontier operations.
///
/// Fatal sweep errors carry `last_breakpoint`, the lowest μ whose interval was
/// closed before the failure (`f64::INFINITY` if none was).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FrontierError {
    /// Returns table has the wrong shape or contains unusable values.
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    /// Ratio test found no blocking basic variable.
    #[error("Unbounded: entering variable {entering} has no blocking row at mu = {mu} (last breakpoint {last_breakpoint})")]
    Unbounded {
        entering: String,
        mu: f64,
        last_breakpoint: f64,
    },

    /// Dictionary drifted and could not be recovered by refactorisation.
    #[error("Numerical instability at mu = {mu} (last breakpoint {last_breakpoint}): {detail}")]
    NumericalInstability {
        mu: f64,
        last_breakpoint: f64,
        detail: String,
    },

    /// Pivot budget exhausted before reaching mu = 0.
    #[error("Pivot limit of {limit} reached (last breakpoint {last_breakpoint})")]
    PivotLimit { limit: usize, last_breakpoint: f64 },

    /// Sweep cancelled through the abort flag.
    #[error("Sweep aborted (last breakpoint {last_breakpoint})")]
    Aborted { last_breakpoint: f64 },

    /// Direct solver error.
    #[error("Solver error: {0}")]
    SolverError(String),

    /// CSV reading or writing failed.
    #[error("CSV error: {0}")]
    Csv(String),
}

impl FrontierError {
    /// Attach the sweep position to a numerical error raised without one.
    pub(crate) fn at_mu(self, mu: f64, last_breakpoint: f64) -> Self {
        match self {
            FrontierError::NumericalInstability { detail, .. } => {
                FrontierError::NumericalInstability {
                    mu,
                    last_breakpoint,
                    detail,
                }
            }
            other => other,
        }
    }
}

impl From<csv::Error> for FrontierError {
    fn from(err: csv::Error) -> Self {
        FrontierError::Csv(err.to_string())
    }
}

/// Result type for madfrontier operations.
pub type Result<T> = std::result::Result<T, FrontierError>;
