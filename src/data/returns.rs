//! Historical returns table.
//!
//! A `ReturnsTable` is the rectangular input of the whole crate: one column
//! per asset, one row per period, each cell a return multiplier (`1.032`
//! meaning +3.2%). Rows may be ordered oldest-to-newest or the reverse; the
//! mean and deviation computations do not depend on row order.

use std::collections::HashSet;
use std::io::Read;

use nalgebra::DMatrix;

use crate::error::{FrontierError, Result};

/// Per-period returns for a universe of assets.
#[derive(Debug, Clone, PartialEq)]
pub struct ReturnsTable {
    assets: Vec<String>,
    returns: DMatrix<f64>,
}

impl ReturnsTable {
    /// Build a table from row-major data, one `Vec` per period.
    pub fn new(assets: Vec<String>, rows: Vec<Vec<f64>>) -> Result<Self> {
        let n = assets.len();
        for (t, row) in rows.iter().enumerate() {
            if row.len() != n {
                return Err(FrontierError::MalformedInput(format!(
                    "row {} has {} cells, expected {}",
                    t,
                    row.len(),
                    n
                )));
            }
        }
        let t = rows.len();
        let returns = DMatrix::from_fn(t, n, |i, j| rows[i][j]);
        Self::from_matrix(assets, returns)
    }

    /// Build a table from a T x n matrix.
    pub fn from_matrix(assets: Vec<String>, returns: DMatrix<f64>) -> Result<Self> {
        validate(&assets, &returns)?;
        Ok(ReturnsTable { assets, returns })
    }

    /// Read a table from CSV with a header row of asset labels.
    ///
    /// `period_column` names a column holding period labels (e.g. `Year-Month`)
    /// that is skipped. Every other column must be an asset with a numeric
    /// value in every row; missing cells are rejected, never imputed.
    pub fn from_csv_reader<R: Read>(reader: R, period_column: Option<&str>) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(reader);
        let headers = reader.headers()?.clone();

        let skip = match period_column {
            Some(name) => Some(headers.iter().position(|h| h == name).ok_or_else(|| {
                FrontierError::MalformedInput(format!("period column '{}' not found", name))
            })?),
            None => None,
        };

        let columns: Vec<usize> = (0..headers.len()).filter(|&i| Some(i) != skip).collect();
        let assets: Vec<String> = columns.iter().map(|&i| headers[i].to_string()).collect();

        let mut rows = Vec::new();
        for (t, record) in reader.records().enumerate() {
            let record = record?;
            if record.len() != headers.len() {
                return Err(FrontierError::MalformedInput(format!(
                    "period {} has {} cells, expected {}",
                    t,
                    record.len(),
                    headers.len()
                )));
            }
            let mut row = Vec::with_capacity(columns.len());
            for (&i, asset) in columns.iter().zip(&assets) {
                let cell = record.get(i).unwrap_or("");
                let value = cell.parse::<f64>().map_err(|_| {
                    FrontierError::MalformedInput(format!(
                        "cell '{}' for asset '{}' at period {} is not numeric",
                        cell, asset, t
                    ))
                })?;
                row.push(value);
            }
            rows.push(row);
        }

        Self::new(assets, rows)
    }

    /// Asset labels in column order.
    pub fn assets(&self) -> &[String] {
        &self.assets
    }

    /// The T x n return matrix.
    pub fn returns(&self) -> &DMatrix<f64> {
        &self.returns
    }

    /// Number of periods T.
    pub fn num_periods(&self) -> usize {
        self.returns.nrows()
    }

    /// Number of assets n.
    pub fn num_assets(&self) -> usize {
        self.returns.ncols()
    }

    /// Re-check the table invariants.
    pub fn validate(&self) -> Result<()> {
        validate(&self.assets, &self.returns)
    }
}

/// Check the shape and values of a returns matrix.
fn validate(assets: &[String], returns: &DMatrix<f64>) -> Result<()> {
    if assets.is_empty() {
        return Err(FrontierError::MalformedInput(
            "at least one asset is required".into(),
        ));
    }
    if returns.ncols() != assets.len() {
        return Err(FrontierError::MalformedInput(format!(
            "{} asset labels for {} return columns",
            assets.len(),
            returns.ncols()
        )));
    }
    if returns.nrows() < 2 {
        return Err(FrontierError::MalformedInput(format!(
            "at least 2 periods are required, got {}",
            returns.nrows()
        )));
    }

    let mut seen = HashSet::new();
    for label in assets.iter() {
        if label.trim().is_empty() {
            return Err(FrontierError::MalformedInput("empty asset label".into()));
        }
        if !seen.insert(label.as_str()) {
            return Err(FrontierError::MalformedInput(format!(
                "duplicate asset label '{}'",
                label
            )));
        }
    }

    for j in 0..returns.ncols() {
        for t in 0..returns.nrows() {
            let v = returns[(t, j)];
            if !v.is_finite() {
                return Err(FrontierError::MalformedInput(format!(
                    "non-finite return {} for asset '{}' at period {}",
                    v, assets[j], t
                )));
            }
        }
    }

    Ok(())
}
