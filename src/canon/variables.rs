//! Variable layout of the parametric MAD program.
//!
//! Columns are laid out as `x_0..x_{n-1}, y_0..y_{T-1}, w+_0..w+_{T-1},
//! w-_0..w-_{T-1}`. Every lowest-index tie-break in the sweep refers to this
//! order.

use std::fmt;

use serde::Serialize;

/// A decision or slack variable of the MAD program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Variable {
    /// Allocation x_j to asset j.
    Allocation(usize),
    /// Absolute deviation surrogate y_t.
    Deviation(usize),
    /// Upper slack w+_t = y_t - sum_j D(t, j) x_j.
    UpperSlack(usize),
    /// Lower slack w-_t = y_t + sum_j D(t, j) x_j.
    LowerSlack(usize),
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Variable::Allocation(j) => write!(f, "x[{}]", j),
            Variable::Deviation(t) => write!(f, "y[{}]", t),
            Variable::UpperSlack(t) => write!(f, "w+[{}]", t),
            Variable::LowerSlack(t) => write!(f, "w-[{}]", t),
        }
    }
}

/// Mapping between `Variable`s and column indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VariableLayout {
    assets: usize,
    periods: usize,
}

impl VariableLayout {
    pub fn new(assets: usize, periods: usize) -> Self {
        VariableLayout { assets, periods }
    }

    pub fn num_assets(&self) -> usize {
        self.assets
    }

    pub fn num_periods(&self) -> usize {
        self.periods
    }

    /// Total number of columns, n + 3T.
    pub fn num_vars(&self) -> usize {
        self.assets + 3 * self.periods
    }

    /// Number of equality rows, 2T + 1.
    pub fn num_rows(&self) -> usize {
        2 * self.periods + 1
    }

    /// Column of a variable.
    pub fn index(&self, var: Variable) -> usize {
        let (n, t) = (self.assets, self.periods);
        match var {
            Variable::Allocation(j) => j,
            Variable::Deviation(p) => n + p,
            Variable::UpperSlack(p) => n + t + p,
            Variable::LowerSlack(p) => n + 2 * t + p,
        }
    }

    /// Variable at a column, `None` if the column is out of range.
    pub fn variable(&self, index: usize) -> Option<Variable> {
        let (n, t) = (self.assets, self.periods);
        let var = match index {
            i if i < n => Variable::Allocation(i),
            i if i < n + t => Variable::Deviation(i - n),
            i if i < n + 2 * t => Variable::UpperSlack(i - n - t),
            i if i < n + 3 * t => Variable::LowerSlack(i - n - 2 * t),
            _ => return None,
        };
        Some(var)
    }

    /// Display label of a column, for logs and error messages.
    pub fn label(&self, index: usize) -> String {
        match self.variable(index) {
            Some(var) => var.to_string(),
            None => format!("column {}", index),
        }
    }

    /// Columns of the allocation variables.
    pub fn allocations(&self) -> std::ops::Range<usize> {
        0..self.assets
    }

    /// Columns of the deviation surrogates.
    pub fn deviations(&self) -> std::ops::Range<usize> {
        self.assets..self.assets + self.periods
    }
}
