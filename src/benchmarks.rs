//! Reference portfolios to compare against the frontier.

use serde::Serialize;

use crate::canon::MadProblem;
use crate::data::mad_sharpe;
use crate::frontier::Frontier;

/// A fixed portfolio with its MAD statistics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BenchmarkPortfolio {
    pub name: String,
    pub weights: Vec<f64>,
    pub reward: f64,
    pub risk: f64,
}

impl BenchmarkPortfolio {
    fn evaluate(problem: &MadProblem, name: String, weights: Vec<f64>) -> Self {
        BenchmarkPortfolio {
            reward: problem.reward(&weights),
            risk: problem.mad_risk(&weights),
            name,
            weights,
        }
    }

    /// Reward-to-MAD ratio over `risk_free`.
    pub fn sharpe(&self, risk_free: f64) -> f64 {
        mad_sharpe(self.reward, self.risk, risk_free)
    }
}

/// 1/n in every asset.
pub fn equal_weight(problem: &MadProblem) -> BenchmarkPortfolio {
    let n = problem.num_assets();
    BenchmarkPortfolio::evaluate(problem, "equal weight".into(), vec![1.0 / n as f64; n])
}

/// Everything in j*, the asset with the highest mean return.
pub fn max_return(problem: &MadProblem) -> BenchmarkPortfolio {
    let best = problem.best_asset();
    let mut weights = vec![0.0; problem.num_assets()];
    weights[best] = 1.0;
    BenchmarkPortfolio::evaluate(
        problem,
        format!("max return ({})", problem.assets()[best]),
        weights,
    )
}

/// The terminal (mu = 0) portfolio of a frontier.
pub fn min_risk(frontier: &Frontier) -> Option<BenchmarkPortfolio> {
    frontier.terminal().map(|bp| BenchmarkPortfolio {
        name: "min risk".into(),
        weights: bp.weights.clone(),
        reward: bp.reward,
        risk: bp.risk,
    })
}

/// One single-asset portfolio per asset.
pub fn single_assets(problem: &MadProblem) -> Vec<BenchmarkPortfolio> {
    let n = problem.num_assets();
    problem
        .assets()
        .iter()
        .enumerate()
        .map(|(j, label)| {
            let mut weights = vec![0.0; n];
            weights[j] = 1.0;
            BenchmarkPortfolio::evaluate(problem, label.clone(), weights)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::ReturnsTable;
    use crate::frontier::{Sweep, SweepSettings};
    use approx::assert_relative_eq;

    fn problem() -> MadProblem {
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
        MadProblem::formulate(&table).unwrap()
    }

    #[test]
    fn test_equal_weight_hedges_anticorrelated_assets() {
        let b = equal_weight(&problem());
        assert_eq!(b.weights, vec![0.5, 0.5]);
        assert_relative_eq!(b.reward, 1.10, epsilon = 1e-12);
        assert_relative_eq!(b.risk, 0.0, epsilon = 1e-12);
        assert!(b.sharpe(0.0).is_infinite());
    }

    #[test]
    fn test_single_assets() {
        let p = problem();
        let singles = single_assets(&p);
        assert_eq!(singles.len(), 2);
        assert_eq!(singles[1].name, "B");
        assert_relative_eq!(singles[0].risk, 0.2, epsilon = 1e-12);
        assert_eq!(max_return(&p).weights, singles[0].weights);
    }

    #[test]
    fn test_min_risk_is_terminal_record() {
        let p = problem();
        let frontier = Sweep::new(&p, SweepSettings::default()).run().unwrap();
        let b = min_risk(&frontier).unwrap();
        assert_relative_eq!(b.risk, 0.0, epsilon = 1e-9);
        assert!(b.risk <= equal_weight(&p).risk + 1e-9);
    }
}
