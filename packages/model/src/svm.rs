//! Linear soft-margin SVM used to rank features.
//!
//! Training is delegated to `smartcore`'s SMO solver with a linear kernel.
//! The primal weights are read back from the decision function: with a
//! linear kernel `f(x) = w . x + b`, so `b = f(0)` and `w_j = f(e_j) - b`.

use serde::{Deserialize, Serialize};
use smartcore::svm::Kernels;
use smartcore::svm::svc::{SVC, SVCParameters};

use crate::ModelError;
use crate::linalg::{signed_labels, to_matrix};

/// A fitted linear separator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearSvm {
    pub weights: Vec<f64>,
    pub bias: f64,
}

impl LinearSvm {
    /// Fits the SVM on rows `x` with boolean labels `y`.
    ///
    /// # Errors
    ///
    /// * If `x` is empty or `y` holds a single class
    pub fn fit(x: &[Vec<f64>], y: &[bool], c: f64, seed: u64) -> Result<Self, ModelError> {
        let width = x.first().map_or(0, Vec::len);
        let matrix = to_matrix(x)?;
        let labels = signed_labels(y);

        let params = SVCParameters::default()
            .with_c(c)
            .with_kernel(Kernels::linear())
            .with_seed(Some(seed));
        let svc = SVC::fit(&matrix, &labels, &params).map_err(ModelError::estimator)?;

        let mut probes = vec![vec![0.0; width]];
        probes.extend((0..width).map(|col| {
            let mut unit = vec![0.0; width];
            unit[col] = 1.0;
            unit
        }));
        let probes = to_matrix(&probes)?;
        let scores: Vec<f64> = svc
            .decision_function(&probes)
            .map_err(ModelError::estimator)?
            .into_iter()
            .collect();

        let bias = scores.first().copied().unwrap_or(0.0);
        let weights = scores.iter().skip(1).map(|score| score - bias).collect();
        log::trace!("Linear SVM fitted on {} rows", x.len());

        Ok(Self { weights, bias })
    }

    /// Signed distance-like score; the sign separates the two classes.
    #[must_use]
    pub fn decision(&self, row: &[f64]) -> f64 {
        self.weights.iter().zip(row).map(|(w, v)| w * v).sum::<f64>() + self.bias
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn separates_linearly_separable_points() {
        let x = vec![
            vec![0.0, 0.1],
            vec![0.1, 0.0],
            vec![0.2, 0.2],
            vec![0.9, 0.8],
            vec![1.0, 1.0],
            vec![0.8, 0.9],
        ];
        let y = vec![false, false, false, true, true, true];

        let svm = LinearSvm::fit(&x, &y, 10.0, 0).unwrap();

        let low = svm.decision(&[0.0, 0.0]);
        let high = svm.decision(&[1.0, 1.0]);
        assert!(low.signum() != high.signum(), "{low} vs {high}");
        for (row, &label) in x.iter().zip(&y) {
            let score = svm.decision(row);
            let expected = if label { high } else { low };
            assert_eq!(score.signum(), expected.signum(), "row {row:?}");
        }
    }

    #[test]
    fn ignores_uninformative_feature() {
        // Second column is constant zero and must get no weight.
        let x = vec![vec![0.0, 0.0], vec![0.1, 0.0], vec![0.9, 0.0], vec![1.0, 0.0]];
        let y = vec![false, false, true, true];

        let svm = LinearSvm::fit(&x, &y, 1.0, 0).unwrap();

        assert!(svm.weights[0].abs() > 1e-6);
        assert!(svm.weights[1].abs() < 1e-9);
    }
}
