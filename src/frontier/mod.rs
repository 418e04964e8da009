//! The efficient frontier as a sequence of breakpoint records.
//!
//! Records are ordered by decreasing mu. Record `k` covers `(mu_low, mu_high]`
//! and its `mu_low` is the `mu_high` of record `k + 1`; the first record is
//! open towards infinity and the last one ends at zero.

pub mod sweep;

use std::io::Write;

use serde::Serialize;

use crate::canon::{MadProblem, Variable};
use crate::data::ReturnsTable;
use crate::error::Result;

pub use sweep::{Diagnostic, Sweep, SweepSettings, SweepState, Termination};

/// One interval of mu over which a single basis is optimal.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Breakpoint {
    /// Lower end (exclusive). Zero for the terminal record.
    pub mu_low: f64,
    /// Upper end (inclusive). Infinite for the first record.
    pub mu_high: f64,
    /// Basic variables, sorted by column index.
    pub basis: Vec<Variable>,
    /// Allocation per asset, in input order.
    pub weights: Vec<f64>,
    /// Expected return sum_j r_j x_j.
    pub reward: f64,
    /// Mean absolute deviation (1/T) sum_t y_t.
    pub risk: f64,
    /// Variable that entered the basis at `mu_low`.
    pub entering: Option<Variable>,
    /// Variable that left the basis at `mu_low`.
    pub leaving: Option<Variable>,
}

impl Breakpoint {
    /// Optimal objective `mu * reward - risk` on this interval.
    pub fn objective_at(&self, mu: f64) -> f64 {
        mu * self.reward - self.risk
    }

    /// Whether `mu` lies in `(mu_low, mu_high]`.
    pub fn contains(&self, mu: f64) -> bool {
        mu > self.mu_low && mu <= self.mu_high
    }

    pub fn is_terminal(&self) -> bool {
        self.mu_low == 0.0
    }
}

/// Flat table row for downstream reporting.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrontierRow {
    pub mu_low: f64,
    pub mu_high: f64,
    pub reward: f64,
    pub risk: f64,
    pub weights: Vec<(String, f64)>,
}

/// Result of a completed sweep.
#[derive(Debug, Clone)]
pub struct Frontier {
    pub(crate) assets: Vec<String>,
    pub(crate) breakpoints: Vec<Breakpoint>,
    pub(crate) diagnostics: Vec<Diagnostic>,
    pub(crate) pivots: usize,
}

impl Frontier {
    pub fn assets(&self) -> &[String] {
        &self.assets
    }

    pub fn breakpoints(&self) -> &[Breakpoint] {
        &self.breakpoints
    }

    pub fn len(&self) -> usize {
        self.breakpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.breakpoints.is_empty()
    }

    /// Record valid as mu goes to infinity.
    pub fn first(&self) -> Option<&Breakpoint> {
        self.breakpoints.first()
    }

    /// Record valid down to mu = 0: the minimum-risk portfolio.
    pub fn terminal(&self) -> Option<&Breakpoint> {
        self.breakpoints.last()
    }

    /// Record whose interval contains `mu`. `mu = 0` maps to the terminal record.
    pub fn portfolio_at(&self, mu: f64) -> Option<&Breakpoint> {
        if mu.is_nan() || mu < 0.0 {
            return None;
        }
        if mu == 0.0 {
            return self.terminal();
        }
        self.breakpoints.iter().find(|bp| bp.contains(mu))
    }

    /// Optimal objective value at `mu`.
    pub fn objective_at(&self, mu: f64) -> Option<f64> {
        self.portfolio_at(mu).map(|bp| bp.objective_at(mu))
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Total pivots, including zero-width ones.
    pub fn pivots(&self) -> usize {
        self.pivots
    }

    /// Weights of `record` labelled by asset.
    pub fn weights_by_asset(&self, record: &Breakpoint) -> Vec<(String, f64)> {
        self.assets
            .iter()
            .cloned()
            .zip(record.weights.iter().copied())
            .collect()
    }

    /// One flat row per breakpoint.
    pub fn rows(&self) -> Vec<FrontierRow> {
        self.breakpoints
            .iter()
            .map(|bp| FrontierRow {
                mu_low: bp.mu_low,
                mu_high: bp.mu_high,
                reward: bp.reward,
                risk: bp.risk,
                weights: self.weights_by_asset(bp),
            })
            .collect()
    }

    /// Write the frontier as CSV: `mu_low,mu_high,reward,risk` then one
    /// weight column per asset.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut wtr = csv::Writer::from_writer(writer);

        let mut header = vec![
            "mu_low".to_string(),
            "mu_high".to_string(),
            "reward".to_string(),
            "risk".to_string(),
        ];
        header.extend(self.assets.iter().cloned());
        wtr.write_record(&header)?;

        for bp in &self.breakpoints {
            let mut record = vec![
                bp.mu_low.to_string(),
                bp.mu_high.to_string(),
                bp.reward.to_string(),
                bp.risk.to_string(),
            ];
            record.extend(bp.weights.iter().map(|w| w.to_string()));
            wtr.write_record(&record)?;
        }
        wtr.flush()
            .map_err(|e| crate::error::FrontierError::Csv(e.to_string()))?;
        Ok(())
    }
}

/// Compute the full MAD efficient frontier with default settings.
pub fn efficient_frontier(table: &ReturnsTable) -> Result<Frontier> {
    let problem = MadProblem::formulate(table)?;
    Sweep::new(&problem, SweepSettings::default()).run()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(mu_low: f64, mu_high: f64, reward: f64, risk: f64) -> Breakpoint {
        Breakpoint {
            mu_low,
            mu_high,
            basis: Vec::new(),
            weights: vec![1.0, 0.0],
            reward,
            risk,
            entering: None,
            leaving: None,
        }
    }

    fn frontier() -> Frontier {
        Frontier {
            assets: vec!["A".into(), "B".into()],
            breakpoints: vec![
                record(2.0, f64::INFINITY, 1.10, 0.08),
                record(0.5, 2.0, 1.05, 0.02),
                record(0.0, 0.5, 1.01, 0.01),
            ],
            diagnostics: Vec::new(),
            pivots: 2,
        }
    }

    #[test]
    fn test_interval_lookup() {
        let f = frontier();
        assert_eq!(f.portfolio_at(1e6).unwrap().mu_low, 2.0);
        // Upper ends are inclusive.
        assert_eq!(f.portfolio_at(2.0).unwrap().mu_low, 0.5);
        assert_eq!(f.portfolio_at(0.5).unwrap().mu_low, 0.0);
        assert!(f.portfolio_at(0.0).unwrap().is_terminal());
        assert!(f.portfolio_at(-1.0).is_none());
        assert!(f.portfolio_at(f64::NAN).is_none());
    }

    #[test]
    fn test_objective_at() {
        let f = frontier();
        assert_eq!(f.objective_at(1.0), Some(1.0 * 1.05 - 0.02));
    }

    #[test]
    fn test_write_csv() {
        let f = frontier();
        let mut out = Vec::new();
        f.write_csv(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("mu_low,mu_high,reward,risk,A,B"));
        assert_eq!(lines.next(), Some("2,inf,1.1,0.08,1,0"));
        assert_eq!(text.lines().count(), 4);
    }

    #[test]
    fn test_rows_label_weights() {
        let rows = frontier().rows();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].weights, vec![("A".to_string(), 1.0), ("B".to_string(), 0.0)]);
    }
}
