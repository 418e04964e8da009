//! Summary statistics over a returns table.
//!
//! Deviations are always taken from the historical mean of each asset:
//! D(t, j) = R_j(t) - r_j.

use nalgebra::{DMatrix, DVector};
use serde::Serialize;

use super::returns::ReturnsTable;

/// Descriptive statistics for one asset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssetSummary {
    pub asset: String,
    pub mean: f64,
    /// Sample standard deviation (T - 1 denominator).
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
}

/// Mean return r_j of every asset.
pub fn mean_returns(returns: &DMatrix<f64>) -> DVector<f64> {
    let t = returns.nrows() as f64;
    DVector::from_iterator(
        returns.ncols(),
        returns.column_iter().map(|c| c.sum() / t),
    )
}

/// Deviation matrix D(t, j) = R_j(t) - r_j.
pub fn deviations(returns: &DMatrix<f64>, means: &DVector<f64>) -> DMatrix<f64> {
    DMatrix::from_fn(returns.nrows(), returns.ncols(), |t, j| {
        returns[(t, j)] - means[j]
    })
}

/// Per-asset summary statistics.
pub fn summarize(table: &ReturnsTable) -> Vec<AssetSummary> {
    let returns = table.returns();
    let means = mean_returns(returns);
    let t = returns.nrows() as f64;

    table
        .assets()
        .iter()
        .enumerate()
        .map(|(j, asset)| {
            let col = returns.column(j);
            let ss: f64 = col.iter().map(|v| (v - means[j]).powi(2)).sum();
            AssetSummary {
                asset: asset.clone(),
                mean: means[j],
                std_dev: (ss / (t - 1.0)).sqrt(),
                min: col.min(),
                max: col.max(),
            }
        })
        .collect()
}

/// Portfolio deviation series D x.
fn portfolio_deviations(deviations: &DMatrix<f64>, weights: &[f64]) -> DVector<f64> {
    deviations * DVector::from_column_slice(weights)
}

/// Mean absolute deviation of a portfolio.
pub fn portfolio_mad(deviations: &DMatrix<f64>, weights: &[f64]) -> f64 {
    let d = portfolio_deviations(deviations, weights);
    d.iter().map(|v| v.abs()).sum::<f64>() / d.len() as f64
}

/// Population variance of a portfolio's deviation series.
pub fn portfolio_variance(deviations: &DMatrix<f64>, weights: &[f64]) -> f64 {
    let d = portfolio_deviations(deviations, weights);
    d.iter().map(|v| v * v).sum::<f64>() / d.len() as f64
}

/// Sample covariance matrix of the asset deviations (T - 1 denominator).
pub fn covariance(deviations: &DMatrix<f64>) -> DMatrix<f64> {
    let denom = (deviations.nrows() as f64 - 1.0).max(1.0);
    (deviations.transpose() * deviations) / denom
}

/// Reward-to-MAD ratio. Infinite when the portfolio carries no risk.
pub fn mad_sharpe(reward: f64, risk: f64, risk_free: f64) -> f64 {
    if risk > 0.0 {
        (reward - risk_free) / risk
    } else {
        f64::INFINITY
    }
}
