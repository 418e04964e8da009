//! Simplex dictionary for the parametric MAD program.
//!
//! The dictionary is stored as one dense tableau with `m + 2` rows and
//! `N + 1` columns, where `m = 2T + 1` and `N = n + 3T`:
//!
//! - rows `0..m` hold `z_B + sum_k a_ik z_k = beta_i` for the basic variable of
//!   each row, with `beta_i` in the last column
//! - row `m` holds the mu-independent reduced costs, with `-risk` in the last
//!   column
//! - row `m + 1` holds the reduced-cost slopes in mu, with `reward` in the last
//!   column
//!
//! The reduced cost of column `k` at a given mu is `row_m[k] + mu * row_{m+1}[k]`;
//! the basis is optimal at mu when every non-basic reduced cost is non-negative.
//! A pivot is one Gauss-Jordan pass over all `m + 2` rows, so the basic rows
//! and both objective rows always move together.

use nalgebra::{DMatrix, DVector};

use crate::canon::{MadProblem, Variable, VariableLayout};
use crate::error::{FrontierError, Result};

/// Reduced cost of a non-basic column as a line in mu: `constant + slope * mu`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReducedCost {
    pub constant: f64,
    pub slope: f64,
}

impl ReducedCost {
    /// Value at a finite mu.
    pub fn at(&self, mu: f64) -> f64 {
        self.constant + self.slope * mu
    }
}

/// Affine expression of a basic variable in the non-basic ones.
#[derive(Debug, Clone, PartialEq)]
pub struct BasicExpression {
    pub constant: f64,
    /// `(column, coefficient)` for every non-basic column with a non-zero
    /// coefficient, so that `z = constant + sum coefficient * z_k`.
    pub terms: Vec<(usize, f64)>,
}

/// Violated dictionary invariant.
#[derive(Debug, Clone, PartialEq)]
pub enum InvariantViolation {
    /// Allocations no longer sum to one.
    Budget { sum: f64 },
    /// A basic variable is negative.
    Negative { column: usize, value: f64 },
}

impl std::fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InvariantViolation::Budget { sum } => {
                write!(f, "allocations sum to {} instead of 1", sum)
            }
            InvariantViolation::Negative { column, value } => {
                write!(f, "basic column {} has negative value {}", column, value)
            }
        }
    }
}

/// Algebraic state of a simplex basis.
#[derive(Debug, Clone)]
pub struct Dictionary {
    tableau: DMatrix<f64>,
    basis: Vec<usize>,
    position: Vec<Option<usize>>,
    layout: VariableLayout,
}

impl Dictionary {
    /// Derive the dictionary of `basis` from scratch.
    ///
    /// Solves `B X = [A | b]` by LU factorisation, so the result carries no
    /// accumulated pivoting error. `basis[i]` becomes the basic variable of
    /// row `i`.
    pub fn from_basis(problem: &MadProblem, basis: Vec<usize>) -> Result<Self> {
        let layout = *problem.layout();
        let (m, nv) = (layout.num_rows(), layout.num_vars());
        if basis.len() != m {
            return Err(FrontierError::NumericalInstability {
                mu: f64::NAN,
                last_breakpoint: f64::NAN,
                detail: format!("basis has {} columns, expected {}", basis.len(), m),
            });
        }

        let mut position = vec![None; nv];
        for (row, &col) in basis.iter().enumerate() {
            if col >= nv || position[col].is_some() {
                return Err(FrontierError::NumericalInstability {
                    mu: f64::NAN,
                    last_breakpoint: f64::NAN,
                    detail: format!("basis column {} is out of range or repeated", col),
                });
            }
            position[col] = Some(row);
        }

        let a = problem.constraint_matrix();
        let b_mat = DMatrix::from_fn(m, m, |i, k| a[(i, basis[k])]);
        let mut rhs = DMatrix::zeros(m, nv + 1);
        rhs.columns_mut(0, nv).copy_from(a);
        rhs.column_mut(nv).copy_from(problem.rhs());

        let body = b_mat.lu().solve(&rhs).ok_or_else(|| FrontierError::NumericalInstability {
            mu: f64::NAN,
            last_breakpoint: f64::NAN,
            detail: "basis matrix is singular".into(),
        })?;

        let mut tableau = DMatrix::zeros(m + 2, nv + 1);
        tableau.rows_mut(0, m).copy_from(&body);

        for (row, &col) in basis.iter().enumerate() {
            // Basic columns are exact unit vectors.
            for r in 0..m {
                tableau[(r, col)] = if r == row { 1.0 } else { 0.0 };
            }
        }

        // Reduced costs c_B . column - c_k, objective values c_B . beta.
        let costs = [problem.risk_costs(), problem.reward_costs()];
        for (offset, c) in costs.iter().enumerate() {
            let c_b = DVector::from_iterator(m, basis.iter().map(|&k| c[k]));
            for k in 0..=nv {
                let own = if k < nv { c[k] } else { 0.0 };
                tableau[(m + offset, k)] = c_b.dot(&body.column(k)) - own;
            }
            for &col in &basis {
                tableau[(m + offset, col)] = 0.0;
            }
        }

        Ok(Dictionary {
            tableau,
            basis,
            position,
            layout,
        })
    }

    pub fn layout(&self) -> &VariableLayout {
        &self.layout
    }

    /// Number of constraint rows.
    pub fn num_rows(&self) -> usize {
        self.basis.len()
    }

    /// Number of columns (variables).
    pub fn num_vars(&self) -> usize {
        self.position.len()
    }

    /// Basic column of every row.
    pub fn basis(&self) -> &[usize] {
        &self.basis
    }

    /// Basic columns in ascending order.
    pub fn sorted_basis(&self) -> Vec<usize> {
        let mut basis = self.basis.clone();
        basis.sort_unstable();
        basis
    }

    pub fn is_basic(&self, col: usize) -> bool {
        self.position[col].is_some()
    }

    /// Row whose basic variable is `col`.
    pub fn row_of(&self, col: usize) -> Option<usize> {
        self.position[col]
    }

    /// Non-basic columns in ascending order.
    pub fn nonbasic(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.num_vars()).filter(move |&k| !self.is_basic(k))
    }

    /// Tableau entry `a_ik`: how much basic row `row` drops per unit of `col`.
    pub fn coefficient(&self, row: usize, col: usize) -> f64 {
        self.tableau[(row, col)]
    }

    /// Constant term `beta_i` of a row.
    pub fn constant(&self, row: usize) -> f64 {
        self.tableau[(row, self.num_vars())]
    }

    /// Current value of a column (zero when non-basic).
    pub fn value(&self, col: usize) -> f64 {
        self.position[col].map_or(0.0, |row| self.constant(row))
    }

    pub fn variable(&self, col: usize) -> Option<Variable> {
        self.layout.variable(col)
    }

    /// Expression of a basic variable in terms of the non-basic ones.
    pub fn expression(&self, col: usize) -> Option<BasicExpression> {
        let row = self.position[col]?;
        let terms = self
            .nonbasic()
            .filter_map(|k| {
                let a = self.tableau[(row, k)];
                (a != 0.0).then_some((k, -a))
            })
            .collect();
        Some(BasicExpression {
            constant: self.constant(row),
            terms,
        })
    }

    /// Reduced cost line of a column.
    pub fn reduced_cost(&self, col: usize) -> ReducedCost {
        let m = self.num_rows();
        ReducedCost {
            constant: self.tableau[(m, col)],
            slope: self.tableau[(m + 1, col)],
        }
    }

    /// Allocation vector x.
    pub fn allocation(&self) -> Vec<f64> {
        self.layout.allocations().map(|j| self.value(j)).collect()
    }

    /// Expected return of the current vertex.
    pub fn reward(&self) -> f64 {
        self.tableau[(self.num_rows() + 1, self.num_vars())]
    }

    /// Mean absolute deviation of the current vertex, (1/T) sum y_t.
    pub fn risk(&self) -> f64 {
        -self.tableau[(self.num_rows(), self.num_vars())]
    }

    /// Objective value `mu * reward - risk` of the current vertex.
    pub fn objective_at(&self, mu: f64) -> f64 {
        mu * self.reward() - self.risk()
    }

    /// Exchange the basic variable of `row` for column `col`.
    ///
    /// The caller guarantees a non-zero pivot element.
    pub fn pivot(&mut self, row: usize, col: usize) {
        let width = self.tableau.ncols();
        let piv = self.tableau[(row, col)];
        for c in 0..width {
            self.tableau[(row, c)] /= piv;
        }
        self.tableau[(row, col)] = 1.0;

        let pivot_row = self.tableau.row(row).clone_owned();
        for r in 0..self.tableau.nrows() {
            if r == row {
                continue;
            }
            let factor = self.tableau[(r, col)];
            if factor == 0.0 {
                continue;
            }
            for c in 0..width {
                self.tableau[(r, c)] -= factor * pivot_row[c];
            }
            self.tableau[(r, col)] = 0.0;
        }

        let leaving = self.basis[row];
        self.position[leaving] = None;
        self.position[col] = Some(row);
        self.basis[row] = col;
    }

    #[cfg(test)]
    pub(crate) fn tableau_mut(&mut self) -> &mut DMatrix<f64> {
        &mut self.tableau
    }

    /// Check the budget constraint and primal feasibility within `tol`.
    pub fn check_invariants(&self, tol: f64) -> std::result::Result<(), InvariantViolation> {
        let sum: f64 = self.allocation().iter().sum();
        if (sum - 1.0).abs() > tol {
            return Err(InvariantViolation::Budget { sum });
        }
        for (row, &col) in self.basis.iter().enumerate() {
            let value = self.constant(row);
            if value < -tol {
                return Err(InvariantViolation::Negative { column: col, value });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::ReturnsTable;
    use approx::assert_relative_eq;

    fn problem() -> MadProblem {
        let table = ReturnsTable::new(
            vec!["A".into(), "B".into()],
            vec![
                vec![1.10, 1.01],
                vec![0.95, 1.00],
                vec![1.08, 0.99],
                vec![0.99, 1.02],
            ],
        )
        .unwrap();
        MadProblem::formulate(&table).unwrap()
    }

    #[test]
    fn test_initial_dictionary_values() {
        let p = problem();
        let dict = Dictionary::from_basis(&p, p.initial_basis()).unwrap();
        let x = dict.allocation();
        assert_relative_eq!(x[0], 1.0, epsilon = 1e-12);
        assert_relative_eq!(x[1], 0.0);
        assert_relative_eq!(dict.reward(), p.mean_returns()[0], epsilon = 1e-12);
        assert_relative_eq!(dict.risk(), p.mad_risk(&[1.0, 0.0]), epsilon = 1e-12);
        assert!(dict.check_invariants(1e-9).is_ok());
    }

    #[test]
    fn test_initial_reduced_costs() {
        let p = problem();
        let dict = Dictionary::from_basis(&p, p.initial_basis()).unwrap();
        // Moving weight to B costs r_A - r_B of reward per unit.
        let rc = dict.reduced_cost(1);
        let gap = p.mean_returns()[0] - p.mean_returns()[1];
        assert_relative_eq!(rc.slope, gap, epsilon = 1e-12);
        // Slacks never touch the reward row and always add risk.
        for k in dict.nonbasic().filter(|&k| k >= p.num_assets()) {
            let rc = dict.reduced_cost(k);
            assert_relative_eq!(rc.slope, 0.0, epsilon = 1e-12);
            assert!(rc.constant > 0.0);
        }
    }

    #[test]
    fn test_pivot_matches_refactorisation() {
        let p = problem();
        let mut dict = Dictionary::from_basis(&p, p.initial_basis()).unwrap();
        let row = dict.row_of(0).unwrap();
        dict.pivot(row, 1);
        let x = dict.allocation();
        assert_relative_eq!(x[0], 0.0);
        assert_relative_eq!(x[1], 1.0, epsilon = 1e-12);

        let fresh = Dictionary::from_basis(&p, dict.basis().to_vec()).unwrap();
        for k in 0..dict.num_vars() {
            let (a, b) = (dict.reduced_cost(k), fresh.reduced_cost(k));
            assert_relative_eq!(a.constant, b.constant, epsilon = 1e-10);
            assert_relative_eq!(a.slope, b.slope, epsilon = 1e-10);
        }
        assert_relative_eq!(dict.risk(), fresh.risk(), epsilon = 1e-12);
        assert_relative_eq!(dict.reward(), p.mean_returns()[1], epsilon = 1e-12);
    }

    #[test]
    fn test_expression_of_basic_variable() {
        let p = problem();
        let dict = Dictionary::from_basis(&p, p.initial_basis()).unwrap();
        // x_A = 1 - x_B
        let expr = dict.expression(0).unwrap();
        assert_relative_eq!(expr.constant, 1.0, epsilon = 1e-12);
        for (k, a) in expr.terms {
            if k == 1 {
                assert_relative_eq!(a, -1.0, epsilon = 1e-12);
            } else {
                assert!(a.abs() < 1e-12, "unexpected term {} on column {}", a, k);
            }
        }
        assert!(dict.expression(1).is_none());
    }

    #[test]
    fn test_repeated_basis_column_rejected() {
        let p = problem();
        let mut basis = p.initial_basis();
        let last = basis.len() - 1;
        basis[last] = basis[0];
        assert!(Dictionary::from_basis(&p, basis).is_err());
    }

    #[test]
    fn test_budget_drift_detected() {
        let p = problem();
        let mut dict = Dictionary::from_basis(&p, p.initial_basis()).unwrap();
        let (row, nv) = (dict.row_of(0).unwrap(), dict.num_vars());
        dict.tableau_mut()[(row, nv)] += 1e-6;

        assert!(dict.check_invariants(1e-3).is_ok());
        match dict.check_invariants(1e-9) {
            Err(InvariantViolation::Budget { sum }) => {
                assert_relative_eq!(sum, 1.0 + 1e-6, epsilon = 1e-12)
            }
            other => panic!("expected a budget violation, got {:?}", other),
        }
    }

    #[test]
    fn test_negative_basic_value_detected() {
        let p = problem();
        let mut dict = Dictionary::from_basis(&p, p.initial_basis()).unwrap();
        let y0 = p.num_assets();
        let (row, nv) = (dict.row_of(y0).unwrap(), dict.num_vars());
        dict.tableau_mut()[(row, nv)] = -1e-3;

        let violation = dict.check_invariants(1e-9).unwrap_err();
        assert_eq!(
            violation,
            InvariantViolation::Negative {
                column: y0,
                value: -1e-3
            }
        );
        assert_eq!(
            violation.to_string(),
            format!("basic column {} has negative value -0.001", y0)
        );
        // Within tolerance the dictionary is still accepted.
        assert!(dict.check_invariants(1e-2).is_ok());
    }
}
