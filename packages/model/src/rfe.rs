//! Recursive feature elimination against a linear SVM.
//!
//! Repeatedly fits [`LinearSvm`] on the surviving columns and drops the
//! column with the smallest squared weight. The ranking mirrors the order
//! of elimination: the last surviving column gets rank `1`, the first one
//! dropped gets rank `width`.

use crate::ModelError;
use crate::linalg::project;
use crate::svm::LinearSvm;

/// Regularization strength of the ranking SVM.
pub const RANKING_SVM_C: f64 = 1.0;

/// Ranks every column of `x`; lower is more informative.
///
/// Ties on weight eliminate the earlier column first.
///
/// # Errors
///
/// * If an intermediate SVM cannot be fitted
pub fn rank_features(x: &[Vec<f64>], y: &[bool], seed: u64) -> Result<Vec<usize>, ModelError> {
    let width = x.first().map_or(0, Vec::len);
    let mut ranks = vec![1; width];
    let mut remaining: Vec<usize> = (0..width).collect();

    while remaining.len() > 1 {
        let svm = LinearSvm::fit(&project(x, &remaining), y, RANKING_SVM_C, seed)?;

        let weakest = svm
            .weights
            .iter()
            .enumerate()
            .fold((0, f64::INFINITY), |(best, best_w), (pos, w)| {
                let w = w * w;
                if w < best_w { (pos, w) } else { (best, best_w) }
            })
            .0;

        ranks[remaining[weakest]] = remaining.len();
        remaining.remove(weakest);
    }

    Ok(ranks)
}

/// Indices of the `keep` best-ranked columns, best first.
#[must_use]
pub fn top_ranked(ranks: &[usize], keep: usize) -> Vec<usize> {
    let mut order: Vec<usize> = (0..ranks.len()).collect();
    order.sort_by_key(|&col| ranks[col]);
    order.truncate(keep);
    order
}
