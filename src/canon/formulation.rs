//! Canonical parametric LP for MAD portfolio selection.
//!
//! For a risk/reward trade-off parameter mu >= 0 the program is
//!
//! ```text
//! maximize    mu * sum_j r_j x_j - (1/T) sum_t y_t
//! subject to   sum_j D(t,j) x_j - y_t + w+_t = 0     t = 0..T
//!             -sum_j D(t,j) x_j - y_t + w-_t = 0     t = 0..T
//!              sum_j x_j                     = 1
//!              x, y, w+, w- >= 0
//! ```
//!
//! The objective is split into a mu-independent risk row and a reward row
//! scaled by mu.

use nalgebra::{DMatrix, DVector};

use super::variables::{Variable, VariableLayout};
use crate::data::{deviations, mean_returns, ReturnsTable};
use crate::error::Result;

/// Absolute tolerance for treating two mean returns as tied and a deviation
/// as exactly zero.
pub const TIE_TOLERANCE: f64 = 1e-12;

/// Sign class of a period's deviation for the best asset j*.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeriodSign {
    /// D(t, j*) > 0.
    Positive,
    /// D(t, j*) < 0.
    Negative,
    /// D(t, j*) = 0. Assigned to the positive side.
    Zero,
}

impl PeriodSign {
    fn classify(d: f64) -> Self {
        if d.abs() <= TIE_TOLERANCE {
            PeriodSign::Zero
        } else if d > 0.0 {
            PeriodSign::Positive
        } else {
            PeriodSign::Negative
        }
    }

    /// Whether the period belongs to T+ (positive or zero deviation).
    pub fn is_upper(self) -> bool {
        !matches!(self, PeriodSign::Negative)
    }
}

/// Tie at j* that changes how some zero-deviation periods are partitioned.
#[derive(Debug, Clone, PartialEq)]
pub struct DegenerateStart {
    pub best_asset: usize,
    pub tied_assets: Vec<usize>,
    pub affected_periods: Vec<usize>,
}

/// The formulated MAD program.
#[derive(Debug, Clone)]
pub struct MadProblem {
    assets: Vec<String>,
    means: DVector<f64>,
    deviations: DMatrix<f64>,
    best_asset: usize,
    tied_best: Vec<usize>,
    period_signs: Vec<PeriodSign>,
    layout: VariableLayout,
    a: DMatrix<f64>,
    b: DVector<f64>,
    risk_costs: DVector<f64>,
    reward_costs: DVector<f64>,
}

impl MadProblem {
    /// Formulate the program for a returns table.
    pub fn formulate(table: &ReturnsTable) -> Result<Self> {
        table.validate()?;
        let (periods, n) = (table.num_periods(), table.num_assets());
        let layout = VariableLayout::new(n, periods);

        let means = mean_returns(table.returns());
        let deviations = deviations(table.returns(), &means);

        // Lowest index wins among tied maxima.
        let mut best_asset = 0;
        for j in 1..n {
            if means[j] > means[best_asset] + TIE_TOLERANCE {
                best_asset = j;
            }
        }
        let tied_best: Vec<usize> = (0..n)
            .filter(|&j| j != best_asset && (means[j] - means[best_asset]).abs() <= TIE_TOLERANCE)
            .collect();

        let period_signs: Vec<PeriodSign> = (0..periods)
            .map(|t| PeriodSign::classify(deviations[(t, best_asset)]))
            .collect();

        let (a, b) = build_constraints(&layout, &deviations);

        let mut risk_costs = DVector::zeros(layout.num_vars());
        for col in layout.deviations() {
            risk_costs[col] = -1.0 / periods as f64;
        }
        let mut reward_costs = DVector::zeros(layout.num_vars());
        for j in layout.allocations() {
            reward_costs[j] = means[j];
        }

        Ok(MadProblem {
            assets: table.assets().to_vec(),
            means,
            deviations,
            best_asset,
            tied_best,
            period_signs,
            layout,
            a,
            b,
            risk_costs,
            reward_costs,
        })
    }

    /// Basis that is optimal as mu -> infinity.
    ///
    /// `x_{j*}` and every `y_t` are basic, plus `w-_t` for periods in T+ and
    /// `w+_t` for periods in T-.
    pub fn initial_basis(&self) -> Vec<usize> {
        let layout = &self.layout;
        let mut basis = Vec::with_capacity(layout.num_rows());
        basis.push(layout.index(Variable::Allocation(self.best_asset)));
        basis.extend(layout.deviations());
        for (t, sign) in self.period_signs.iter().enumerate() {
            let slack = if sign.is_upper() {
                Variable::LowerSlack(t)
            } else {
                Variable::UpperSlack(t)
            };
            basis.push(layout.index(slack));
        }
        basis
    }

    /// Report a tie at j* whose tie-break changes the T+/T- partition.
    pub fn degenerate_start(&self) -> Option<DegenerateStart> {
        if self.tied_best.is_empty() {
            return None;
        }
        let mut affected = Vec::new();
        for (t, sign) in self.period_signs.iter().enumerate() {
            let differs = self
                .tied_best
                .iter()
                .any(|&j| PeriodSign::classify(self.deviations[(t, j)]).is_upper() != sign.is_upper());
            if differs && *sign == PeriodSign::Zero {
                affected.push(t);
            }
        }
        if affected.is_empty() {
            return None;
        }
        Some(DegenerateStart {
            best_asset: self.best_asset,
            tied_assets: self.tied_best.clone(),
            affected_periods: affected,
        })
    }

    pub fn assets(&self) -> &[String] {
        &self.assets
    }

    pub fn layout(&self) -> &VariableLayout {
        &self.layout
    }

    pub fn num_assets(&self) -> usize {
        self.layout.num_assets()
    }

    pub fn num_periods(&self) -> usize {
        self.layout.num_periods()
    }

    /// Mean return r_j of every asset.
    pub fn mean_returns(&self) -> &DVector<f64> {
        &self.means
    }

    /// Deviation matrix D (T x n).
    pub fn deviations(&self) -> &DMatrix<f64> {
        &self.deviations
    }

    /// Index j* of the asset with the highest mean return.
    pub fn best_asset(&self) -> usize {
        self.best_asset
    }

    /// Other assets whose mean return ties with j*.
    pub fn tied_best(&self) -> &[usize] {
        &self.tied_best
    }

    pub fn period_signs(&self) -> &[PeriodSign] {
        &self.period_signs
    }

    /// Equality constraint matrix A, (2T + 1) x (n + 3T).
    pub fn constraint_matrix(&self) -> &DMatrix<f64> {
        &self.a
    }

    /// Right-hand side b.
    pub fn rhs(&self) -> &DVector<f64> {
        &self.b
    }

    /// Objective coefficients independent of mu (risk part).
    pub fn risk_costs(&self) -> &DVector<f64> {
        &self.risk_costs
    }

    /// Objective coefficients multiplied by mu (reward part).
    pub fn reward_costs(&self) -> &DVector<f64> {
        &self.reward_costs
    }

    /// Expected return of a weight vector.
    pub fn reward(&self, weights: &[f64]) -> f64 {
        weights.iter().zip(self.means.iter()).map(|(w, r)| w * r).sum()
    }

    /// Mean absolute deviation of a weight vector.
    pub fn mad_risk(&self, weights: &[f64]) -> f64 {
        crate::data::portfolio_mad(&self.deviations, weights)
    }
}

/// Build A and b of the equality system.
fn build_constraints(
    layout: &VariableLayout,
    deviations: &DMatrix<f64>,
) -> (DMatrix<f64>, DVector<f64>) {
    let (n, periods) = (layout.num_assets(), layout.num_periods());
    let mut a = DMatrix::zeros(layout.num_rows(), layout.num_vars());
    let mut b = DVector::zeros(layout.num_rows());

    for t in 0..periods {
        let upper = t;
        let lower = periods + t;
        for j in 0..n {
            a[(upper, j)] = deviations[(t, j)];
            a[(lower, j)] = -deviations[(t, j)];
        }
        let y = layout.index(Variable::Deviation(t));
        a[(upper, y)] = -1.0;
        a[(lower, y)] = -1.0;
        a[(upper, layout.index(Variable::UpperSlack(t)))] = 1.0;
        a[(lower, layout.index(Variable::LowerSlack(t)))] = 1.0;
    }

    let budget = 2 * periods;
    for j in layout.allocations() {
        a[(budget, j)] = 1.0;
    }
    b[budget] = 1.0;

    (a, b)
}
