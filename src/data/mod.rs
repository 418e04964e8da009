//! Returns input and descriptive statistics.

pub mod returns;
pub mod stats;

pub use returns::ReturnsTable;
pub use stats::{
    covariance, deviations, mad_sharpe, mean_returns, portfolio_mad, portfolio_variance,
    summarize, AssetSummary,
};
