//! Problem formulation.
//!
//! Turns a returns table into the canonical parametric LP:
//! - Mean returns and the deviation matrix
//! - The slack-augmented equality system over x, y, w+ and w-
//! - The risk and reward objective rows

pub mod formulation;
pub mod variables;

pub use formulation::{DegenerateStart, MadProblem, PeriodSign, TIE_TOLERANCE};
pub use variables::{Variable, VariableLayout};
