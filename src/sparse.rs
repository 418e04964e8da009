//! Sparse matrix helpers for the direct solver.
//!
//! Clarabel takes its data in CSC form; the MAD and variance programs are
//! assembled densely by block and converted here.

use nalgebra::DMatrix;
use nalgebra_sparse::{CooMatrix, CscMatrix};

/// Entries at or below this magnitude are dropped when sparsifying.
const DROP_TOLERANCE: f64 = 1e-15;

/// Create a CSC matrix from triplets (row, col, value).
///
/// Duplicates are summed together; out-of-range triplets are ignored.
pub fn csc_from_triplets(
    nrows: usize,
    ncols: usize,
    rows: Vec<usize>,
    cols: Vec<usize>,
    vals: Vec<f64>,
) -> CscMatrix<f64> {
    if rows.is_empty() {
        return CscMatrix::zeros(nrows, ncols);
    }

    let mut coo = CooMatrix::new(nrows, ncols);
    for ((row, col), val) in rows.into_iter().zip(cols).zip(vals) {
        if row < nrows && col < ncols {
            coo.push(row, col, val);
        }
    }
    CscMatrix::from(&coo)
}

/// Convert a dense matrix to CSC format.
pub fn dense_to_csc(dense: &DMatrix<f64>) -> CscMatrix<f64> {
    let (rows, cols, vals) = nonzeros(dense, |_, _| true);
    csc_from_triplets(dense.nrows(), dense.ncols(), rows, cols, vals)
}

/// Upper triangle (diagonal included) of a square dense matrix, the form
/// Clarabel expects for its quadratic cost.
pub fn csc_upper_triangle(dense: &DMatrix<f64>) -> CscMatrix<f64> {
    let (rows, cols, vals) = nonzeros(dense, |i, j| i <= j);
    csc_from_triplets(dense.nrows(), dense.ncols(), rows, cols, vals)
}

fn nonzeros(
    dense: &DMatrix<f64>,
    keep: impl Fn(usize, usize) -> bool,
) -> (Vec<usize>, Vec<usize>, Vec<f64>) {
    let mut rows = Vec::new();
    let mut cols = Vec::new();
    let mut vals = Vec::new();
    for j in 0..dense.ncols() {
        for i in 0..dense.nrows() {
            let v = dense[(i, j)];
            if v.abs() > DROP_TOLERANCE && keep(i, j) {
                rows.push(i);
                cols.push(j);
                vals.push(v);
            }
        }
    }
    (rows, cols, vals)
}

/// Convert CSC to dense matrix.
pub fn csc_to_dense(sparse: &CscMatrix<f64>) -> DMatrix<f64> {
    let mut dense = DMatrix::zeros(sparse.nrows(), sparse.ncols());
    for (row, col, val) in sparse.triplet_iter() {
        dense[(row, col)] = *val;
    }
    dense
}

/// Stack two CSC matrices vertically.
pub fn csc_vstack(a: &CscMatrix<f64>, b: &CscMatrix<f64>) -> CscMatrix<f64> {
    let mut rows = Vec::new();
    let mut cols = Vec::new();
    let mut vals = Vec::new();

    for (r, c, v) in a.triplet_iter() {
        rows.push(r);
        cols.push(c);
        vals.push(*v);
    }
    for (r, c, v) in b.triplet_iter() {
        rows.push(r + a.nrows());
        cols.push(c);
        vals.push(*v);
    }

    csc_from_triplets(
        a.nrows() + b.nrows(),
        a.ncols().max(b.ncols()),
        rows,
        cols,
        vals,
    )
}

/// Scale a CSC matrix.
pub fn csc_scale(a: &CscMatrix<f64>, scalar: f64) -> CscMatrix<f64> {
    let mut scaled = a.clone();
    for v in scaled.values_mut() {
        *v *= scalar;
    }
    scaled
}
