#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Model training over populated grid cells.
//!
//! [`train`] turns the per-cell feature table into a [`TrainedModel`]:
//!
//! 1. Cells missing any requested feature or the target are dropped.
//! 2. Values go through `log1p` and are min-max scaled per feature.
//! 3. The minority target class is oversampled with a seeded RNG.
//! 4. Recursive elimination against a linear SVM (`smartcore`) keeps the
//!    better half of the features.
//! 5. A cross-validated logistic classifier is fit on the balanced data for
//!    diagnostics.
//! 6. Ward clustering over all clean cells assigns the cluster labels.
//!
//! The model keeps the feature order, scaling parameters, and cluster
//! centroids so new feature vectors can be assigned without retraining.

pub mod linalg;
pub mod logistic;
pub mod rfe;
pub mod sampling;
pub mod svm;
pub mod transform;
pub mod ward;

use std::collections::BTreeMap;
use std::time::Instant;

use scout_grid_models::{Cell, CellId, ClusterId};
use serde::{Deserialize, Serialize};

pub use logistic::{ClassifierDiagnostics, LogisticClassifier};
pub use transform::LogMinMaxScaler;

use crate::linalg::{project, squared_distance};

pub const DEFAULT_CLUSTER_COUNT: usize = 20;
pub const DEFAULT_CV_FOLDS: usize = 10;

/// Errors that abort training or assignment.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// One of the target classes has no members after cleaning.
    #[error("Insufficient data: {positives} positive and {negatives} negative cells")]
    InsufficientData { positives: usize, negatives: usize },
    /// A requested feature is not present on any cell.
    #[error("Unknown feature: {name}")]
    UnknownFeature { name: String },
    /// A feature vector does not match the model's feature order.
    #[error("Expected {expected} feature values, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    /// Training parameters are unusable.
    #[error("Invalid training parameters: {message}")]
    InvalidParams { message: String },
    /// An estimator rejected its input.
    #[error("Estimator failed: {message}")]
    Estimator { message: String },
}

impl ModelError {
    pub(crate) fn estimator(err: impl std::fmt::Display) -> Self {
        Self::Estimator {
            message: err.to_string(),
        }
    }
}

/// Inputs to [`train`] besides the cells.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingParams {
    /// Candidate features, in the order feature vectors are laid out.
    pub features: Vec<String>,
    /// Binary target; values above `0.5` are the positive class.
    pub target: String,
    pub cluster_count: usize,
    pub seed: u64,
    pub cv_folds: usize,
}

impl TrainingParams {
    #[must_use]
    pub fn new(features: Vec<String>, target: impl Into<String>) -> Self {
        Self {
            features,
            target: target.into(),
            cluster_count: DEFAULT_CLUSTER_COUNT,
            seed: 0,
            cv_folds: DEFAULT_CV_FOLDS,
        }
    }

    fn validate(&self) -> Result<(), ModelError> {
        if self.features.is_empty() {
            return Err(ModelError::InvalidParams {
                message: "no features requested".to_string(),
            });
        }
        if self.cluster_count == 0 {
            return Err(ModelError::InvalidParams {
                message: "cluster count must be positive".to_string(),
            });
        }
        Ok(())
    }
}

/// Everything needed to label cells and assign new feature vectors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainedModel {
    feature_order: Vec<String>,
    target: String,
    scaler: LogMinMaxScaler,
    selected: Vec<usize>,
    selected_names: Vec<String>,
    /// `(feature, rank)` in feature order; rank `1` is the strongest.
    pub feature_ranking: Vec<(String, usize)>,
    centroids: Vec<Vec<f64>>,
    assignments: Vec<(CellId, ClusterId)>,
    pub classifier: ClassifierDiagnostics,
}

impl TrainedModel {
    /// Features kept by the elimination, in feature order.
    #[must_use]
    pub fn selected_features(&self) -> &[String] {
        &self.selected_names
    }

    /// The full feature order raw vectors must follow.
    #[must_use]
    pub fn feature_order(&self) -> &[String] {
        &self.feature_order
    }

    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }

    #[must_use]
    pub const fn cluster_count(&self) -> usize {
        self.centroids.len()
    }

    /// Labels assigned during training, in cell order.
    #[must_use]
    pub fn assignments(&self) -> &[(CellId, ClusterId)] {
        &self.assignments
    }

    /// Raw feature vector of a cell in the model's feature order.
    #[must_use]
    pub fn feature_vector(&self, cell: &Cell) -> Option<Vec<f64>> {
        cell.features.vector(&self.feature_order)
    }

    /// Assigns a raw feature vector to the nearest cluster centroid.
    ///
    /// # Errors
    ///
    /// * If `raw` does not have one value per feature in [`Self::feature_order`]
    pub fn cluster_of(&self, raw: &[f64]) -> Result<ClusterId, ModelError> {
        if raw.len() != self.feature_order.len() {
            return Err(ModelError::DimensionMismatch {
                expected: self.feature_order.len(),
                actual: raw.len(),
            });
        }

        let scaled = self.scaler.transform_row(raw);
        let selected: Vec<f64> = self.selected.iter().map(|&col| scaled[col]).collect();

        let nearest = self
            .centroids
            .iter()
            .map(|centroid| squared_distance(centroid, &selected))
            .enumerate()
            .fold((0, f64::INFINITY), |(best, best_d), (idx, d)| {
                if d < best_d { (idx, d) } else { (best, best_d) }
            })
            .0;

        Ok(ClusterId(u32::try_from(nearest).unwrap_or(u32::MAX)))
    }

    /// Writes the trained labels onto `cells`. Cells that were dropped for
    /// missing values stay unlabeled. Returns the number of labeled cells.
    pub fn label_cells(&self, cells: &mut [Cell]) -> usize {
        let labels: BTreeMap<CellId, ClusterId> = self.assignments.iter().copied().collect();
        let mut labeled = 0;
        for cell in cells {
            cell.cluster = labels.get(&cell.id).copied();
            if cell.cluster.is_some() {
                labeled += 1;
            }
        }
        labeled
    }
}

/// Trains the selection, classifier, and clustering models.
///
/// # Errors
///
/// * If the parameters are empty or zero
/// * If a requested feature or the target is absent from every cell
/// * If either target class is empty after dropping incomplete cells
/// * If the SVM or the logistic classifier rejects the training data
pub fn train(cells: &[Cell], params: &TrainingParams) -> Result<TrainedModel, ModelError> {
    params.validate()?;
    let start = Instant::now();

    for name in params.features.iter().chain(std::iter::once(&params.target)) {
        if !cells.iter().any(|cell| cell.features.contains(name)) {
            return Err(ModelError::UnknownFeature { name: name.clone() });
        }
    }

    let mut ids = Vec::with_capacity(cells.len());
    let mut raw = Vec::with_capacity(cells.len());
    let mut labels = Vec::with_capacity(cells.len());
    for cell in cells {
        let (Some(row), Some(target)) = (
            cell.features.vector(&params.features),
            cell.features.value(&params.target),
        ) else {
            continue;
        };
        ids.push(cell.id);
        raw.push(row);
        labels.push(target > 0.5);
    }

    let positives = labels.iter().filter(|&&label| label).count();
    let negatives = labels.len() - positives;
    log::info!(
        "Training on {} of {} cells ({positives} positive, {negatives} negative)",
        raw.len(),
        cells.len()
    );
    if positives == 0 || negatives == 0 {
        return Err(ModelError::InsufficientData {
            positives,
            negatives,
        });
    }

    let scaler = LogMinMaxScaler::fit(&raw);
    let scaled = scaler.transform(&raw);

    let sample = sampling::oversample_minority(&labels, params.seed);
    let balanced_x: Vec<Vec<f64>> = sample.iter().map(|&i| scaled[i].clone()).collect();
    let balanced_y: Vec<bool> = sample.iter().map(|&i| labels[i]).collect();
    log::debug!("Balanced training set has {} rows", balanced_x.len());

    let ranks = rfe::rank_features(&balanced_x, &balanced_y, params.seed)?;
    let keep = (params.features.len() / 2).max(1);
    let mut selected = rfe::top_ranked(&ranks, keep);
    selected.sort_unstable();

    let feature_ranking: Vec<(String, usize)> = params
        .features
        .iter()
        .cloned()
        .zip(ranks.iter().copied())
        .collect();
    for (name, rank) in &feature_ranking {
        log::debug!("Feature {name}: rank {rank}");
    }
    let selected_names: Vec<String> = selected
        .iter()
        .map(|&col| params.features[col].clone())
        .collect();
    log::info!("Selected features: {}", selected_names.join(", "));

    let classifier = logistic::cross_validate(
        &project(&balanced_x, &selected),
        &balanced_y,
        params.cv_folds,
        params.seed,
    )?;
    match classifier.mean_f1 {
        Some(f1) => log::info!(
            "Logistic classifier: C={:.4e}, mean F1 {f1:.3} over {} folds",
            classifier.c,
            classifier.folds
        ),
        None => log::info!("Logistic classifier: C={:.4e}, not validated", classifier.c),
    }

    let clustered = project(&scaled, &selected);
    let cluster_labels = ward::ward_clusters(&clustered, params.cluster_count);
    let centroids = centroids(&clustered, &cluster_labels);
    for (label, count) in member_counts(&cluster_labels).iter().enumerate() {
        log::debug!("Cluster {label}: {count} cells");
    }

    let assignments = ids
        .into_iter()
        .zip(cluster_labels)
        .map(|(id, label)| (id, ClusterId(label)))
        .collect();

    log::info!(
        "Trained {} clusters in {:.2}s",
        centroids.len(),
        start.elapsed().as_secs_f64()
    );

    Ok(TrainedModel {
        feature_order: params.features.clone(),
        target: params.target.clone(),
        scaler,
        selected,
        selected_names,
        feature_ranking,
        centroids,
        assignments,
        classifier,
    })
}

fn member_counts(labels: &[u32]) -> Vec<usize> {
    let mut counts = Vec::new();
    for &label in labels {
        let label = label as usize;
        if counts.len() <= label {
            counts.resize(label + 1, 0);
        }
        counts[label] += 1;
    }
    counts
}

/// Mean row of every cluster, indexed by label.
fn centroids(rows: &[Vec<f64>], labels: &[u32]) -> Vec<Vec<f64>> {
    let width = rows.first().map_or(0, Vec::len);
    let counts = member_counts(labels);
    let mut sums = vec![vec![0.0; width]; counts.len()];

    for (row, &label) in rows.iter().zip(labels) {
        for (sum, value) in sums[label as usize].iter_mut().zip(row) {
            *sum += value;
        }
    }

    sums.into_iter()
        .zip(counts)
        .map(|(sum, count)| {
            #[allow(clippy::cast_precision_loss)]
            let count = count as f64;
            sum.into_iter().map(|value| value / count).collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{LineString, Polygon};
    use scout_grid_models::Coordinate;

    fn cell(id: CellId, features: &[(&str, f64)]) -> Cell {
        let mut cell = Cell::new(
            id,
            Coordinate::new(0.0, 0.0),
            Polygon::new(LineString::new(vec![]), vec![]),
        );
        for (name, value) in features {
            cell.features.insert(*name, Some(*value));
        }
        cell
    }

    /// Even cells are busy and successful, odd cells are quiet.
    fn synthetic_cells() -> Vec<Cell> {
        (0..24)
            .map(|i| {
                let busy = i % 2 == 0;
                let activity = if busy { 20.0 + f64::from(i) } else { f64::from(i % 3) };
                let noise = f64::from((i * 7) % 5);
                cell(
                    i,
                    &[
                        ("activity", activity),
                        ("noise", noise),
                        ("constant", 1.0),
                        ("target", if busy { 1.0 } else { 0.0 }),
                    ],
                )
            })
            .collect()
    }

    fn params(cluster_count: usize) -> TrainingParams {
        let mut params = TrainingParams::new(
            vec!["activity".into(), "noise".into(), "constant".into()],
            "target",
        );
        params.cluster_count = cluster_count;
        params.cv_folds = 4;
        params
    }

    #[test]
    fn selects_the_informative_feature() {
        let model = train(&synthetic_cells(), &params(2)).unwrap();

        assert_eq!(model.selected_features(), ["activity".to_string()]);
        let ranking: BTreeMap<_, _> = model.feature_ranking.iter().cloned().collect();
        assert_eq!(ranking["activity"], 1);
        assert_eq!(ranking["constant"], 3);
        assert!(model.classifier.mean_f1.unwrap() > 0.9);
    }

    #[test]
    fn training_is_idempotent() {
        let cells = synthetic_cells();
        assert_eq!(train(&cells, &params(4)).unwrap(), train(&cells, &params(4)).unwrap());
    }

    #[test]
    fn missing_class_is_insufficient_data() {
        let mut cells = synthetic_cells();
        for cell in &mut cells {
            cell.features.insert("target", Some(0.0));
        }

        let err = train(&cells, &params(2)).unwrap_err();
        assert!(matches!(
            err,
            ModelError::InsufficientData {
                positives: 0,
                negatives: 24
            }
        ));
    }

    #[test]
    fn label_count_is_bounded() {
        let mut cells = synthetic_cells();
        let model = train(&cells, &params(3)).unwrap();
        model.label_cells(&mut cells);

        let mut labels: Vec<ClusterId> = cells.iter().filter_map(|cell| cell.cluster).collect();
        labels.sort_unstable_by_key(|label| label.0);
        labels.dedup();
        assert!(labels.len() <= 3);
        assert_eq!(model.cluster_count(), labels.len());
    }

    #[test]
    fn every_complete_cell_gets_one_label() {
        let mut cells = synthetic_cells();
        cells[5] = cell(5, &[("activity", 1.0), ("target", 0.0)]);

        let model = train(&cells, &params(2)).unwrap();
        let labeled = model.label_cells(&mut cells);

        assert_eq!(labeled, 23);
        assert!(cells[5].cluster.is_none());
        assert!(
            cells
                .iter()
                .filter(|cell| cell.id != 5)
                .all(|cell| cell.cluster.is_some())
        );
    }

    #[test]
    fn cluster_of_agrees_with_training_labels() {
        let mut cells = synthetic_cells();
        let model = train(&cells, &params(2)).unwrap();
        model.label_cells(&mut cells);

        for cell in &cells {
            let vector = model.feature_vector(cell).unwrap();
            assert_eq!(Some(model.cluster_of(&vector).unwrap()), cell.cluster);
        }
        // Cell 0 is busy and appears first.
        assert_eq!(cells[0].cluster, Some(ClusterId(0)));
        assert_eq!(cells[1].cluster, Some(ClusterId(1)));
    }

    #[test]
    fn cluster_of_rejects_wrong_length() {
        let model = train(&synthetic_cells(), &params(2)).unwrap();
        assert!(matches!(
            model.cluster_of(&[1.0]),
            Err(ModelError::DimensionMismatch {
                expected: 3,
                actual: 1
            })
        ));
    }

    #[test]
    fn unknown_feature_is_reported() {
        let mut params = params(2);
        params.features.push("missing".into());

        assert!(matches!(
            train(&synthetic_cells(), &params),
            Err(ModelError::UnknownFeature { name }) if name == "missing"
        ));
    }

    #[test]
    fn zero_clusters_is_rejected() {
        assert!(matches!(
            train(&synthetic_cells(), &params(0)),
            Err(ModelError::InvalidParams { .. })
        ));
    }
}
