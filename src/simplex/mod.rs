//! Parametric simplex machinery.
//!
//! - `Dictionary`: tableau of one basis with its two objective rows
//! - `pivot`: breakpoint search, ratio test and basis exchange

pub mod dictionary;
pub mod pivot;

pub use dictionary::{BasicExpression, Dictionary, InvariantViolation, ReducedCost};
pub use pivot::{next_pivot, PivotFailure, PivotOutcome, PivotStep, Tolerances};
