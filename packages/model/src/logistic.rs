//! L2-regularized logistic regression with cross-validated strength.
//!
//! The classifier predicts the success target from the selected features.
//! It is not used to answer queries; its cross-validated F1 and
//! coefficients are kept in the model as a sanity check on how much signal
//! the selected features carry.

use rand::SeedableRng as _;
use rand::rngs::StdRng;
use rand::seq::SliceRandom as _;
use serde::{Deserialize, Serialize};
use smartcore::linalg::basic::arrays::Array;
use smartcore::linear::logistic_regression::{LogisticRegression, LogisticRegressionParameters};

use crate::ModelError;
use crate::linalg::{signed_labels, to_matrix};

/// Number of candidate regularization strengths, log-spaced in `[1e-4, 1e4]`.
pub const STRENGTH_GRID_SIZE: u32 = 10;

/// Candidate inverse regularization strengths.
#[must_use]
pub fn strength_grid() -> Vec<f64> {
    (0..STRENGTH_GRID_SIZE)
        .map(|i| 10f64.powf(8.0f64.mul_add(f64::from(i) / f64::from(STRENGTH_GRID_SIZE - 1), -4.0)))
        .collect()
}

/// Coefficients of a fitted binary logistic classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticClassifier {
    pub coefficients: Vec<f64>,
    pub intercept: f64,
}

impl LogisticClassifier {
    /// Fits an L2-penalized logistic regression with inverse strength `c`.
    ///
    /// # Errors
    ///
    /// * If `x` is empty or `y` holds a single class
    pub fn fit(x: &[Vec<f64>], y: &[bool], c: f64) -> Result<Self, ModelError> {
        let matrix = to_matrix(x)?;
        let labels = signed_labels(y);
        let params = LogisticRegressionParameters::default().with_alpha(c.recip());

        let fitted =
            LogisticRegression::fit(&matrix, &labels, params).map_err(ModelError::estimator)?;

        Ok(Self {
            coefficients: fitted.coefficients().iterator(0).copied().collect(),
            intercept: *fitted.intercept().get((0, 0)),
        })
    }

    /// Probability of the positive class.
    #[must_use]
    pub fn predict_proba(&self, row: &[f64]) -> f64 {
        let z: f64 = self
            .coefficients
            .iter()
            .zip(row)
            .map(|(w, v)| w * v)
            .sum::<f64>()
            + self.intercept;
        sigmoid(z)
    }

    #[must_use]
    pub fn predict(&self, row: &[f64]) -> bool {
        self.predict_proba(row) >= 0.5
    }
}

/// Outcome of the cross-validated fit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierDiagnostics {
    /// Chosen inverse regularization strength.
    pub c: f64,
    /// Folds actually used; `0` when the data was too small to validate.
    pub folds: usize,
    /// Mean held-out F1 of the chosen strength.
    pub mean_f1: Option<f64>,
    /// Classifier refit on all rows with the chosen strength.
    pub classifier: LogisticClassifier,
}

/// Picks the strength with the best mean F1 over stratified folds and refits
/// on all rows.
///
/// The fold count is capped by the size of the smaller class. With fewer
/// than two usable folds validation is skipped and `C = 1` is used.
///
/// # Errors
///
/// * If the final refit fails
pub fn cross_validate(
    x: &[Vec<f64>],
    y: &[bool],
    folds: usize,
    seed: u64,
) -> Result<ClassifierDiagnostics, ModelError> {
    let positives = y.iter().filter(|&&label| label).count();
    let smaller_class = positives.min(y.len() - positives);
    let folds = folds.min(smaller_class);

    if folds < 2 {
        log::warn!("Not enough rows per class for cross-validation, using C=1");
        return Ok(ClassifierDiagnostics {
            c: 1.0,
            folds: 0,
            mean_f1: None,
            classifier: LogisticClassifier::fit(x, y, 1.0)?,
        });
    }

    let assignment = stratified_folds(y, folds, seed);

    let mut best: Option<(f64, f64)> = None;
    for c in strength_grid() {
        let mut total = 0.0;
        for fold in 0..folds {
            let (train_x, train_y): (Vec<Vec<f64>>, Vec<bool>) = x
                .iter()
                .zip(y)
                .zip(&assignment)
                .filter(|(_, f)| **f != fold)
                .map(|((row, &label), _)| (row.clone(), label))
                .unzip();
            let model = match LogisticClassifier::fit(&train_x, &train_y, c) {
                Ok(model) => model,
                Err(e) => {
                    log::debug!("C={c:.4e}, fold {fold}: {e}");
                    continue;
                }
            };

            let held_out = x
                .iter()
                .zip(y)
                .zip(&assignment)
                .filter(|(_, f)| **f == fold)
                .map(|((row, &label), _)| (model.predict(row), label));
            total += f1_score(held_out);
        }

        #[allow(clippy::cast_precision_loss)]
        let mean = total / folds as f64;
        log::debug!("C={c:.4e}: mean F1 {mean:.4}");
        if best.is_none_or(|(_, best_f1)| mean > best_f1) {
            best = Some((c, mean));
        }
    }

    let (c, mean_f1) = best.unwrap_or((1.0, 0.0));
    Ok(ClassifierDiagnostics {
        c,
        folds,
        mean_f1: Some(mean_f1),
        classifier: LogisticClassifier::fit(x, y, c)?,
    })
}

/// Assigns every row a fold so that each class is spread evenly.
fn stratified_folds(y: &[bool], folds: usize, seed: u64) -> Vec<usize> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut assignment = vec![0; y.len()];

    for class in [false, true] {
        let mut members: Vec<usize> = (0..y.len()).filter(|&i| y[i] == class).collect();
        members.shuffle(&mut rng);
        for (position, row) in members.into_iter().enumerate() {
            assignment[row] = position % folds;
        }
    }

    assignment
}

/// F1 of `(predicted, actual)` pairs; `0` when nothing is positive.
fn f1_score(pairs: impl Iterator<Item = (bool, bool)>) -> f64 {
    let (mut tp, mut fp, mut fn_) = (0u32, 0u32, 0u32);
    for (predicted, actual) in pairs {
        match (predicted, actual) {
            (true, true) => tp += 1,
            (true, false) => fp += 1,
            (false, true) => fn_ += 1,
            (false, false) => {}
        }
    }
    let denominator = 2 * tp + fp + fn_;
    if denominator == 0 {
        0.0
    } else {
        f64::from(2 * tp) / f64::from(denominator)
    }
}

fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}
