#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Build orchestration and point queries.
//!
//! [`build`] runs the whole pipeline once: grid construction, locality
//! resolution, the three aggregators, and model training. The result is an
//! immutable [`Artifact`] stored under a content hash of its inputs, so an
//! unchanged configuration with unchanged data reuses the previous build.
//! A failed build leaves the store untouched.
//!
//! [`query`] answers "which venues do well in places like this point"
//! against a built artifact and never mutates it.

pub mod config;
pub mod export;
pub mod locality;
pub mod store;

use std::sync::Arc;
use std::time::Instant;

use scout_features::{
    Aggregator as _, DemographicAggregator, InfrastructureAggregator, ProgressCallback,
    VenueAggregator,
};
use scout_features_models::{DemographicRecord, GeometryRecord, Venue};
use scout_grid_models::{Cell, Coordinate};
use scout_model::{TrainedModel, TrainingParams};
use scout_pipeline_models::{DataConfig, QueryResult, RankedVenue, ScoutConfig};
use scout_query::{SimilarCells, SimilarityIndex, rank_venues};
use scout_source::SourceError;
use serde::{Deserialize, Serialize};

pub use config::{ConfigError, load_config, parse_config, validate_config};
pub use locality::{BoundaryLocalityResolver, LocalityResolver, NoLocality};
pub use store::{ArtifactKey, ArtifactStore, FsArtifactStore, MemoryArtifactStore, StoreError};

/// Errors that abort a build.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// The configuration is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A dataset could not be loaded.
    #[error(transparent)]
    Source(#[from] SourceError),

    /// The grid could not be constructed.
    #[error(transparent)]
    Grid(#[from] scout_grid::GridError),

    /// The region is smaller than one cell, so there is nothing to train on.
    #[error("Region side {side_m}m holds no {cell_side_m}m cell")]
    EmptyGrid { side_m: f64, cell_side_m: f64 },

    /// Training failed, typically for lack of data.
    #[error(transparent)]
    Model(#[from] scout_model::ModelError),

    /// Reading or writing the artifact store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// The three datasets a build consumes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Datasets {
    pub geometries: Vec<GeometryRecord>,
    pub demographics: Vec<DemographicRecord>,
    pub venues: Vec<Venue>,
}

impl Datasets {
    /// Loads every dataset named in `data`.
    ///
    /// # Errors
    ///
    /// * If any of the files cannot be read or parsed
    pub fn load(data: &DataConfig) -> Result<Self, SourceError> {
        let start = Instant::now();
        let datasets = Self {
            geometries: scout_source::load_geometries(&data.geometries)?,
            demographics: scout_source::load_demographics(
                &data.demographics,
                &data.demographics_key,
            )?,
            venues: scout_source::load_venues(&data.venues)?,
        };
        log::info!(
            "Loaded datasets in {:.2}s",
            start.elapsed().as_secs_f64()
        );
        Ok(datasets)
    }

    /// Content hash of all three datasets.
    ///
    /// # Errors
    ///
    /// * If a dataset cannot be serialized
    pub fn fingerprint(&self) -> Result<String, StoreError> {
        store::fingerprint(self)
    }
}

/// Builds the locality resolver configured in `data`.
///
/// Without postal boundaries every cell stays without a locality.
///
/// # Errors
///
/// * If the boundary file cannot be read or parsed
/// * If the boundaries cannot be fingerprinted
pub fn load_resolver(data: &DataConfig) -> Result<Box<dyn LocalityResolver>, BuildError> {
    match &data.postal_boundaries {
        Some(path) => {
            let boundaries = scout_source::load_boundaries(path, &data.postal_code_property)?;
            Ok(Box::new(BoundaryLocalityResolver::new(boundaries)?))
        }
        None => {
            log::warn!("No postal boundaries configured, demographic features will be null");
            Ok(Box::new(NoLocality))
        }
    }
}

/// Output of one build: labeled cells, the trained model, and the venues
/// used for ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    pub key: ArtifactKey,
    pub cells: Vec<Cell>,
    pub model: TrainedModel,
    pub venues: Vec<Venue>,
}

impl Artifact {
    /// Index for repeated queries against this artifact.
    #[must_use]
    pub fn similarity_index(&self) -> SimilarityIndex<'_> {
        SimilarityIndex::new(&self.cells)
    }
}

/// Derives the artifact key from everything that determines the result.
///
/// # Errors
///
/// * If the configuration or datasets cannot be serialized
pub fn artifact_key(
    config: &ScoutConfig,
    datasets: &Datasets,
    resolver: &dyn LocalityResolver,
) -> Result<ArtifactKey, StoreError> {
    let region = store::canonical_json(&config.region)?;
    let model = store::canonical_json(&config.model)?;
    let data = datasets.fingerprint()?;
    let localities = resolver.fingerprint();
    Ok(ArtifactKey::derive(&[&region, &model, &data, &localities]))
}

/// Runs the pipeline, or returns the stored artifact for the same inputs
/// unless `force` is set.
///
/// # Errors
///
/// * If the configuration is invalid
/// * If the grid cannot be built or holds no cells
/// * If training fails, e.g. one target class is empty
/// * If the store cannot be read or written
pub fn build(
    config: &ScoutConfig,
    datasets: &Datasets,
    resolver: &dyn LocalityResolver,
    store: &dyn ArtifactStore,
    progress: Arc<dyn ProgressCallback>,
    force: bool,
) -> Result<Artifact, BuildError> {
    validate_config(config)?;
    let start = Instant::now();

    let key = artifact_key(config, datasets, resolver)?;
    if !force
        && let Some(artifact) = store.load(&key)?
    {
        log::info!("Reusing stored artifact {key}");
        return Ok(artifact);
    }
    log::info!("Building artifact {key}");

    let region = &config.region;
    let mut cells = timed("grid", || {
        scout_grid::build_grid(region.center(), region.side_m, region.cell_side_m)
    })?;
    if cells.is_empty() {
        return Err(BuildError::EmptyGrid {
            side_m: region.side_m,
            cell_side_m: region.cell_side_m,
        });
    }

    let resolved = timed("localities", || {
        locality::assign_localities(&mut cells, resolver)
    });
    log::info!("Resolved localities for {resolved} of {} cells", cells.len());

    let demographics = DemographicAggregator;
    let cells = timed(demographics.name(), || {
        demographics.populate(cells, &datasets.demographics)
    });

    let infrastructure = InfrastructureAggregator::new().with_progress(progress);
    let cells = timed(infrastructure.name(), || {
        infrastructure.populate(cells, &datasets.geometries)
    });

    let venues = VenueAggregator::new(config.model.success_percentile_threshold);
    let mut cells = timed(venues.name(), || venues.populate(cells, &datasets.venues));

    let params = TrainingParams {
        features: config.model.features.clone(),
        target: config.model.target.clone(),
        cluster_count: config.model.cluster_count,
        seed: config.model.seed,
        cv_folds: config.model.cv_folds,
    };
    let model = timed("training", || scout_model::train(&cells, &params))?;
    let labeled = model.label_cells(&mut cells);
    log::info!("Labeled {labeled} of {} cells", cells.len());

    let artifact = Artifact {
        key: key.clone(),
        cells,
        model,
        venues: datasets.venues.clone(),
    };
    store.save(&key, &artifact)?;

    log::info!(
        "Build finished in {:.2}s",
        start.elapsed().as_secs_f64()
    );
    Ok(artifact)
}

/// Venues in cells similar to the one containing `point`, best first.
///
/// `limit` caps the number of venues returned.
#[must_use]
pub fn query(artifact: &Artifact, point: Coordinate, limit: Option<usize>) -> QueryResult {
    query_index(&artifact.similarity_index(), &artifact.venues, point, limit)
}

/// Like [`query`], reusing a prepared index.
#[must_use]
pub fn query_index(
    index: &SimilarityIndex<'_>,
    venues: &[Venue],
    point: Coordinate,
    limit: Option<usize>,
) -> QueryResult {
    let SimilarCells::Found { cells, .. } = index.similar_cells(point) else {
        return QueryResult::NoSimilarLocation;
    };

    let mut ranked: Vec<RankedVenue> = rank_venues(&cells, venues)
        .into_iter()
        .map(RankedVenue::from)
        .collect();
    if let Some(limit) = limit {
        ranked.truncate(limit);
    }

    QueryResult::Ranked {
        similar_cells: cells.len(),
        venues: ranked,
    }
}

fn timed<T>(stage: &str, f: impl FnOnce() -> T) -> T {
    let start = Instant::now();
    let result = f();
    log::info!("Stage {stage} took {:.2}s", start.elapsed().as_secs_f64());
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use geo::Geometry;
    use scout_features::null_progress;
    use scout_features_models::names;
    use scout_grid::geodesy::walk;
    use scout_pipeline_models::ModelConfig;

    const ZURICH_HB: Coordinate = Coordinate::new(8.540_251_5, 47.377_787_3);

    /// 4x4 grid of 250 m cells around Zurich main station.
    fn small_config() -> ScoutConfig {
        let mut config = ScoutConfig::default();
        config.region.side_m = 1000.0;
        config.region.cell_side_m = 250.0;
        config.model = ModelConfig {
            cluster_count: 3,
            cv_folds: 2,
            features: vec![names::FOODS.to_string(), names::BARS.to_string()],
            ..ModelConfig::default()
        };
        config
    }

    fn restaurant(location: Coordinate) -> GeometryRecord {
        let mut tags = BTreeMap::new();
        tags.insert("amenity".to_string(), "restaurant".to_string());
        GeometryRecord {
            tags,
            geometry: Geometry::Point(location.to_point()),
            name: None,
        }
    }

    fn venue(name: &str, location: Coordinate, percentile: f64) -> Venue {
        Venue {
            name: name.to_string(),
            location,
            success_percentile: percentile,
            price_level: None,
            cuisine: vec![],
        }
    }

    /// Dense food streets in the north-east half, nothing elsewhere. Only
    /// the busy cells host successful venues.
    fn datasets(config: &ScoutConfig) -> Datasets {
        let cells = scout_grid::build_grid(
            config.region.center(),
            config.region.side_m,
            config.region.cell_side_m,
        )
        .unwrap();

        let mut geometries = Vec::new();
        let mut venues = Vec::new();
        for cell in cells.iter().filter(|cell| cell.id % 4 < 2) {
            for step in 0..(3 + cell.id % 3) {
                let spot = walk(cell.center, 45.0, 10.0 * f64::from(step + 1)).unwrap();
                geometries.push(restaurant(spot));
            }
            venues.push(venue(&format!("Busy {}", cell.id), cell.center, 5.0 + f64::from(cell.id)));
        }
        for cell in cells.iter().filter(|cell| cell.id % 4 >= 2) {
            venues.push(venue(&format!("Quiet {}", cell.id), cell.center, 80.0));
        }

        Datasets {
            geometries,
            demographics: vec![],
            venues,
        }
    }

    #[test]
    fn builds_and_labels_every_cell() {
        let config = small_config();
        let store = MemoryArtifactStore::new();

        let artifact = build(
            &config,
            &datasets(&config),
            &NoLocality,
            &store,
            null_progress(),
            false,
        )
        .unwrap();

        assert_eq!(artifact.cells.len(), 16);
        assert!(artifact.cells.iter().all(|cell| cell.cluster.is_some()));
        let mut labels: Vec<u32> = artifact
            .cells
            .iter()
            .filter_map(|cell| cell.cluster.map(|label| label.0))
            .collect();
        labels.sort_unstable();
        labels.dedup();
        assert!(labels.len() <= 3);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn second_build_reuses_the_stored_artifact() {
        let config = small_config();
        let data = datasets(&config);
        let store = MemoryArtifactStore::new();

        let first = build(&config, &data, &NoLocality, &store, null_progress(), false).unwrap();
        let second = build(&config, &data, &NoLocality, &store, null_progress(), false).unwrap();
        let forced = build(&config, &data, &NoLocality, &store, null_progress(), true).unwrap();

        assert_eq!(first, second);
        assert_eq!(first, forced);
        assert_eq!(store.len(), 1);
        assert_eq!(store.latest().unwrap(), Some(first));
    }

    #[test]
    fn changed_data_changes_the_key() {
        let config = small_config();
        let data = datasets(&config);
        let mut changed = data.clone();
        changed.venues.pop();

        let a = artifact_key(&config, &data, &NoLocality).unwrap();
        let b = artifact_key(&config, &changed, &NoLocality).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn invalid_config_aborts_before_work() {
        let mut config = small_config();
        config.model.cluster_count = 0;
        let store = MemoryArtifactStore::new();

        let err = build(&config, &datasets(&small_config()), &NoLocality, &store, null_progress(), false)
            .unwrap_err();
        assert!(matches!(err, BuildError::Config(ConfigError::Invalid(_))));
        assert!(store.is_empty());
    }

    #[test]
    fn region_smaller_than_a_cell_reports_an_empty_grid() {
        let mut config = small_config();
        config.region.side_m = 100.0;
        config.region.cell_side_m = 200.0;
        let store = MemoryArtifactStore::new();

        let err = build(&config, &datasets(&small_config()), &NoLocality, &store, null_progress(), false)
            .unwrap_err();
        assert!(matches!(err, BuildError::EmptyGrid { .. }), "{err:?}");
        assert!(store.is_empty());
    }

    #[test]
    fn missing_success_class_fails_and_keeps_store_empty() {
        let config = small_config();
        let mut data = datasets(&config);
        for venue in &mut data.venues {
            venue.success_percentile = 90.0;
        }
        let store = MemoryArtifactStore::new();

        let err = build(&config, &data, &NoLocality, &store, null_progress(), false).unwrap_err();
        assert!(matches!(
            err,
            BuildError::Model(scout_model::ModelError::InsufficientData { positives: 0, .. })
        ));
        assert!(store.is_empty());
    }

    #[test]
    fn query_ranks_venues_of_similar_cells() {
        let config = small_config();
        let store = MemoryArtifactStore::new();
        let artifact = build(
            &config,
            &datasets(&config),
            &NoLocality,
            &store,
            null_progress(),
            false,
        )
        .unwrap();

        let result = query(&artifact, artifact.cells[0].center, None);
        let QueryResult::Ranked { venues, .. } = &result else {
            panic!("expected ranked venues, got {result:?}");
        };
        assert!(!venues.is_empty());
        assert!(
            venues
                .windows(2)
                .all(|pair| pair[0].success_percentile <= pair[1].success_percentile)
        );

        let limited = query(&artifact, artifact.cells[0].center, Some(1));
        assert_eq!(limited.venues().len(), 1);
        assert_eq!(limited.venues()[0], venues[0]);
    }

    #[test]
    fn cells_with_one_label_answer_identically() {
        let config = small_config();
        let store = MemoryArtifactStore::new();
        let artifact = build(
            &config,
            &datasets(&config),
            &NoLocality,
            &store,
            null_progress(),
            false,
        )
        .unwrap();

        let first = &artifact.cells[0];
        let twin = artifact
            .cells
            .iter()
            .skip(1)
            .find(|cell| cell.cluster == first.cluster)
            .unwrap();

        assert_eq!(
            query(&artifact, first.center, None),
            query(&artifact, twin.center, None)
        );
    }

    #[test]
    fn point_outside_the_grid_has_no_similar_location() {
        let config = small_config();
        let store = MemoryArtifactStore::new();
        let artifact = build(
            &config,
            &datasets(&config),
            &NoLocality,
            &store,
            null_progress(),
            false,
        )
        .unwrap();

        let outside = walk(ZURICH_HB, 180.0, 10_000.0).unwrap();
        assert_eq!(query(&artifact, outside, None), QueryResult::NoSimilarLocation);
    }

    #[test]
    fn fs_store_round_trips_artifacts() {
        let dir = std::env::temp_dir().join(format!("scout-store-{}", std::process::id()));
        let store = FsArtifactStore::new(&dir);
        let config = small_config();
        let data = datasets(&config);

        let built = build(&config, &data, &NoLocality, &store, null_progress(), false).unwrap();
        let loaded = store.load(&built.key).unwrap().unwrap();

        assert_eq!(loaded, built);
        assert_eq!(store.latest().unwrap(), Some(built));

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
