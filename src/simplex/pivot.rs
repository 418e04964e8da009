//! Parametric pivot selection.
//!
//! As mu decreases, a non-basic reduced cost `a + b * mu` with `b > 0` falls
//! and crosses zero at `mu = -a / b`. The column with the largest crossing
//! enters; the leaving row comes from the ordinary ratio test. Primal values
//! do not depend on mu, so the ratio test does not either.
//!
//! Ties are broken by lowest column index, both for the entering column and
//! for the basic column that leaves.

use super::dictionary::{Dictionary, ReducedCost};

/// Numerical thresholds used by pivot selection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tolerances {
    /// Zero test for reduced costs, crossings and ratios.
    pub zero: f64,
    /// Smallest admissible pivot element.
    pub pivot: f64,
}

impl Default for Tolerances {
    fn default() -> Self {
        Tolerances {
            zero: 1e-9,
            pivot: 1e-11,
        }
    }
}

/// A planned basis exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct PivotStep {
    /// Entering column q.
    pub entering: usize,
    /// Row of the leaving variable.
    pub row: usize,
    /// Leaving column p.
    pub leaving: usize,
    /// Breakpoint at which q's reduced cost reaches zero.
    pub mu: f64,
    /// Value q takes after the pivot.
    pub step: f64,
    /// Columns whose crossing tied with `entering` (including it).
    pub tied_entering: Vec<usize>,
    /// Basic columns whose ratio tied with `leaving` (including it).
    pub tied_leaving: Vec<usize>,
}

/// Result of asking for the next breakpoint.
#[derive(Debug, Clone, PartialEq)]
pub enum PivotOutcome {
    /// A breakpoint was found and a pivot planned.
    Pivot(PivotStep),
    /// The current basis stays optimal down to mu = 0.
    NoMoreBreakpoints,
}

/// Why no pivot could be planned.
#[derive(Debug, Clone, PartialEq)]
pub enum PivotFailure {
    /// No basic variable blocks the entering column.
    Unbounded { entering: usize, mu: f64 },
    /// Only pivot elements below tolerance block the entering column.
    SmallPivot {
        entering: usize,
        mu: f64,
        element: f64,
    },
}

/// Candidate entering column.
#[derive(Debug, Clone, PartialEq)]
pub struct Entering {
    pub column: usize,
    pub mu: f64,
    pub tied: Vec<usize>,
}

/// Candidate leaving row.
#[derive(Debug, Clone, PartialEq)]
pub struct Leaving {
    pub row: usize,
    pub column: usize,
    pub step: f64,
    pub tied: Vec<usize>,
}

/// Value of mu at or below `mu_high` where a reduced cost first turns negative.
///
/// A reduced cost that is already negative at `mu_high` crosses at `mu_high`
/// itself; at `mu_high = inf` that covers negative slopes and flat negative
/// lines. Crossings at or below zero are ignored.
pub fn crossing(rc: ReducedCost, mu_high: f64, tol: f64) -> Option<f64> {
    if mu_high.is_infinite() {
        if rc.slope < -tol || (rc.slope.abs() <= tol && rc.constant < -tol) {
            return Some(f64::INFINITY);
        }
    } else if rc.at(mu_high) < -tol {
        return Some(mu_high);
    }

    if rc.slope > tol {
        let mu = -rc.constant / rc.slope;
        if mu > tol {
            return Some(mu.min(mu_high));
        }
    }
    None
}

pub(crate) fn same_mu(a: f64, b: f64, tol: f64) -> bool {
    if a.is_infinite() || b.is_infinite() {
        return a == b;
    }
    (a - b).abs() <= tol * a.abs().max(b.abs()).max(1.0)
}

/// Pick the entering column: the largest crossing not above `mu_high`.
pub fn select_entering(dict: &Dictionary, mu_high: f64, tol: f64) -> Option<Entering> {
    let mut best: Option<Entering> = None;
    for col in dict.nonbasic() {
        let Some(mu) = crossing(dict.reduced_cost(col), mu_high, tol) else {
            continue;
        };
        match best.as_mut() {
            Some(b) if same_mu(mu, b.mu, tol) => b.tied.push(col),
            Some(b) if mu < b.mu => {}
            _ => {
                best = Some(Entering {
                    column: col,
                    mu,
                    tied: vec![col],
                })
            }
        }
    }
    best
}

/// Ratio test for `entering`: the basic variable that reaches zero first.
pub fn ratio_test(
    dict: &Dictionary,
    entering: usize,
    tolerances: Tolerances,
) -> Result<Leaving, Option<f64>> {
    let mut best: Option<Leaving> = None;
    let mut small: Option<f64> = None;

    for row in 0..dict.num_rows() {
        let a = dict.coefficient(row, entering);
        if a <= 0.0 {
            continue;
        }
        if a <= tolerances.pivot {
            small = Some(small.map_or(a, |s: f64| s.max(a)));
            continue;
        }
        let column = dict.basis()[row];
        let step = dict.constant(row).max(0.0) / a;
        match best.as_mut() {
            Some(b) if same_mu(step, b.step, tolerances.zero) => {
                b.tied.push(column);
                if column < b.column {
                    b.row = row;
                    b.column = column;
                    b.step = b.step.min(step);
                }
            }
            Some(b) if step > b.step => {}
            _ => {
                best = Some(Leaving {
                    row,
                    column,
                    step,
                    tied: vec![column],
                })
            }
        }
    }

    match best {
        Some(mut leaving) => {
            leaving.tied.sort_unstable();
            Ok(leaving)
        }
        None => Err(small),
    }
}

/// Find the next breakpoint below `mu_high` and plan the pivot there.
pub fn next_pivot(
    dict: &Dictionary,
    mu_high: f64,
    tolerances: Tolerances,
) -> Result<PivotOutcome, PivotFailure> {
    let Some(entering) = select_entering(dict, mu_high, tolerances.zero) else {
        return Ok(PivotOutcome::NoMoreBreakpoints);
    };

    let leaving = ratio_test(dict, entering.column, tolerances).map_err(|small| match small {
        Some(element) => PivotFailure::SmallPivot {
            entering: entering.column,
            mu: entering.mu,
            element,
        },
        None => PivotFailure::Unbounded {
            entering: entering.column,
            mu: entering.mu,
        },
    })?;

    Ok(PivotOutcome::Pivot(PivotStep {
        entering: entering.column,
        row: leaving.row,
        leaving: leaving.column,
        mu: entering.mu,
        step: leaving.step,
        tied_entering: entering.tied,
        tied_leaving: leaving.tied,
    }))
}

/// Apply a planned pivot.
pub fn apply(dict: &mut Dictionary, step: &PivotStep) {
    dict.pivot(step.row, step.entering);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canon::MadProblem;
    use crate::data::ReturnsTable;
    use approx::assert_relative_eq;

    fn rc(constant: f64, slope: f64) -> ReducedCost {
        ReducedCost { constant, slope }
    }

    #[test]
    fn test_crossing_rules() {
        let tol = 1e-9;
        // a + b mu = -1 + 2 mu crosses at 0.5.
        assert_eq!(crossing(rc(-1.0, 2.0), f64::INFINITY, tol), Some(0.5));
        // Clamped to the current upper bound.
        assert_eq!(crossing(rc(-1.0, 2.0), 0.4, tol), Some(0.4));
        // Non-negative for every mu >= 0.
        assert_eq!(crossing(rc(1.0, 2.0), f64::INFINITY, tol), None);
        assert_eq!(crossing(rc(1.0, -2.0), 0.3, tol), None);
        assert_eq!(crossing(rc(1.0, 0.0), f64::INFINITY, tol), None);
        // Flat and negative: improving at every mu.
        assert_eq!(crossing(rc(-1.0, 0.0), f64::INFINITY, tol), Some(f64::INFINITY));
        // Already negative below a finite bound.
        assert_eq!(crossing(rc(-1.0, 0.0), 2.0, tol), Some(2.0));
    }

    fn two_asset_problem() -> MadProblem {
        // A has the higher mean, B the lower deviation.
        let table = ReturnsTable::new(
            vec!["A".into(), "B".into()],
            vec![
                vec![1.20, 1.02],
                vec![0.90, 0.99],
                vec![1.15, 1.01],
                vec![0.95, 1.00],
            ],
        )
        .unwrap();
        MadProblem::formulate(&table).unwrap()
    }

    #[test]
    fn test_first_pivot_brings_in_low_risk_asset() {
        let p = two_asset_problem();
        let dict = Dictionary::from_basis(&p, p.initial_basis()).unwrap();
        let outcome = next_pivot(&dict, f64::INFINITY, Tolerances::default()).unwrap();
        let PivotOutcome::Pivot(step) = outcome else {
            panic!("expected a breakpoint");
        };
        assert_eq!(step.entering, 1);
        assert!(step.mu > 0.0 && step.mu.is_finite());
        let rc = dict.reduced_cost(1);
        assert_relative_eq!(rc.at(step.mu), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_single_asset_has_no_breakpoints() {
        let table = ReturnsTable::new(vec!["A".into()], vec![vec![1.1], vec![0.9], vec![1.0]])
            .unwrap();
        let p = MadProblem::formulate(&table).unwrap();
        let dict = Dictionary::from_basis(&p, p.initial_basis()).unwrap();
        let outcome = next_pivot(&dict, f64::INFINITY, Tolerances::default()).unwrap();
        assert_eq!(outcome, PivotOutcome::NoMoreBreakpoints);
    }

    #[test]
    fn test_ratio_test_prefers_lowest_column_on_tie() {
        // Perfectly offsetting assets: every deviation row hits zero at x_B = 0.5.
        let table = ReturnsTable::new(
            vec!["A".into(), "B".into()],
            vec![
                vec![1.30, 0.90],
                vec![0.90, 1.30],
                vec![1.30, 0.90],
                vec![0.90, 1.30],
            ],
        )
        .unwrap();
        let p = MadProblem::formulate(&table).unwrap();
        let dict = Dictionary::from_basis(&p, p.initial_basis()).unwrap();
        let leaving = ratio_test(&dict, 1, Tolerances::default()).unwrap();
        assert_relative_eq!(leaving.step, 0.5, epsilon = 1e-12);
        assert_eq!(leaving.column, *leaving.tied.iter().min().unwrap());
        assert!(leaving.tied.len() > 1);
    }

    #[test]
    fn test_apply_zeroes_entering_reduced_cost() {
        let p = two_asset_problem();
        let mut dict = Dictionary::from_basis(&p, p.initial_basis()).unwrap();
        let PivotOutcome::Pivot(step) =
            next_pivot(&dict, f64::INFINITY, Tolerances::default()).unwrap()
        else {
            panic!("expected a breakpoint");
        };
        apply(&mut dict, &step);
        assert!(dict.is_basic(step.entering));
        assert!(!dict.is_basic(step.leaving));
        let rc = dict.reduced_cost(step.entering);
        assert_relative_eq!(rc.constant, 0.0, epsilon = 1e-15);
        assert_relative_eq!(rc.slope, 0.0, epsilon = 1e-15);
        // The leaving column is optimal to keep out just below the breakpoint.
        assert!(dict.reduced_cost(step.leaving).at(step.mu * 0.99) >= -1e-12);
    }

    /// Column of `w+_0`. Period 0 lies in T+ for `two_asset_problem`, so the
    /// column starts non-basic.
    const UPPER_SLACK_0: usize = 6;

    /// Overwrite the reduced cost line of a column.
    fn set_reduced_cost(dict: &mut Dictionary, col: usize, rc: ReducedCost) {
        let m = dict.num_rows();
        let tableau = dict.tableau_mut();
        tableau[(m, col)] = rc.constant;
        tableau[(m + 1, col)] = rc.slope;
    }

    #[test]
    fn test_ratio_test_without_blocking_row() {
        let p = two_asset_problem();
        let dict = Dictionary::from_basis(&p, p.initial_basis()).unwrap();
        assert!(!dict.is_basic(UPPER_SLACK_0));
        // Raising w+_0 only raises y_0 and w-_0.
        assert!((0..dict.num_rows()).all(|row| dict.coefficient(row, UPPER_SLACK_0) <= 0.0));
        assert_eq!(ratio_test(&dict, UPPER_SLACK_0, Tolerances::default()), Err(None));
    }

    #[test]
    fn test_unbounded_entering_column() {
        let p = two_asset_problem();
        let mut dict = Dictionary::from_basis(&p, p.initial_basis()).unwrap();
        set_reduced_cost(&mut dict, UPPER_SLACK_0, rc(-1.0, 0.0));
        let failure = next_pivot(&dict, f64::INFINITY, Tolerances::default()).unwrap_err();
        assert_eq!(
            failure,
            PivotFailure::Unbounded {
                entering: UPPER_SLACK_0,
                mu: f64::INFINITY
            }
        );
    }

    #[test]
    fn test_small_pivot_reported() {
        let p = two_asset_problem();
        let dict = Dictionary::from_basis(&p, p.initial_basis()).unwrap();
        let tolerances = Tolerances {
            zero: 1e-9,
            pivot: 10.0,
        };
        // x_A blocks x_B with element 1, below the pivot tolerance.
        match ratio_test(&dict, 1, tolerances) {
            Err(Some(element)) => assert_relative_eq!(element, 1.0, epsilon = 1e-12),
            other => panic!("expected only small pivot elements, got {:?}", other),
        }
        match next_pivot(&dict, f64::INFINITY, tolerances) {
            Err(PivotFailure::SmallPivot {
                entering, element, ..
            }) => {
                assert_eq!(entering, 1);
                assert_relative_eq!(element, 1.0, epsilon = 1e-12);
            }
            other => panic!("expected a small pivot, got {:?}", other),
        }
    }

    #[test]
    fn test_crossing_tie_prefers_lowest_column() {
        let p = two_asset_problem();
        let mut dict = Dictionary::from_basis(&p, p.initial_basis()).unwrap();
        let x_b = dict.reduced_cost(1);
        // w+_0 and w+_2 cross at the same mu as x_B.
        set_reduced_cost(&mut dict, UPPER_SLACK_0, x_b);
        set_reduced_cost(&mut dict, UPPER_SLACK_0 + 2, x_b);

        let entering = select_entering(&dict, f64::INFINITY, 1e-9).unwrap();
        assert_eq!(entering.column, 1);
        assert_eq!(entering.tied, vec![1, UPPER_SLACK_0, UPPER_SLACK_0 + 2]);
        assert_relative_eq!(entering.mu, -x_b.constant / x_b.slope, epsilon = 1e-12);
    }
}
