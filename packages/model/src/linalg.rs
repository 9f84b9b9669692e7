//! Row-major helpers and the bridge to `smartcore` matrices.

use smartcore::linalg::basic::matrix::DenseMatrix;

use crate::ModelError;

/// Squared Euclidean distance.
pub fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// Keeps only the given columns of every row.
pub fn project(rows: &[Vec<f64>], columns: &[usize]) -> Vec<Vec<f64>> {
    rows.iter()
        .map(|row| columns.iter().map(|&c| row[c]).collect())
        .collect()
}

/// Copies `rows` into a dense matrix for the estimators.
///
/// # Errors
///
/// * If `rows` is empty
pub fn to_matrix(rows: &[Vec<f64>]) -> Result<DenseMatrix<f64>, ModelError> {
    DenseMatrix::from_2d_vec(&rows.to_vec()).map_err(ModelError::estimator)
}

/// `+1` for the positive class, `-1` otherwise.
pub fn signed_labels(y: &[bool]) -> Vec<i32> {
    y.iter().map(|&label| if label { 1 } else { -1 }).collect()
}
