#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the location scout.
//!
//! Uses `indicatif-log-bridge` (via [`scout_cli_utils::init_logger`]) to
//! route `log` output through `indicatif::MultiProgress` so that log lines
//! and progress bars never fight for the terminal.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use scout_cli_utils::IndicatifProgress;
use scout_grid_models::Coordinate;
use scout_pipeline::{
    Artifact, ArtifactStore as _, Datasets, FsArtifactStore, export, load_config, load_resolver,
    validate_config,
};
use scout_pipeline_models::ScoutConfig;

const DEFAULT_CONFIG: &str = "scout.toml";

#[derive(Parser)]
#[command(name = "scout", about = "Find places like this one and their best venues")]
struct Cli {
    /// Configuration file. Defaults to `scout.toml` if it exists, built-in
    /// defaults otherwise.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the grid, aggregate features, and train the clustering model
    Build {
        /// Rebuild even if an artifact for the same inputs exists
        #[arg(long)]
        force: bool,
    },
    /// Rank venues in places similar to a coordinate
    Query {
        /// Longitude of the point
        #[arg(long, allow_negative_numbers = true)]
        lon: f64,
        /// Latitude of the point
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,
        /// Maximum number of venues to print
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Write the labeled grid as `GeoJSON`
    Export {
        /// Output file; stdout if omitted
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = scout_cli_utils::init_logger();
    let cli = Cli::parse();
    let config = resolve_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Build { force } => {
            let datasets = Datasets::load(&config.data)?;
            let resolver = load_resolver(&config.data)?;
            let store = FsArtifactStore::new(&config.store.dir);
            let progress = IndicatifProgress::stage_bar(&multi, "Aggregating infrastructure");

            let artifact = scout_pipeline::build(
                &config,
                &datasets,
                resolver.as_ref(),
                &store,
                progress,
                force,
            )?;

            println!(
                "Built artifact {} with {} cells in {} clusters",
                artifact.key,
                artifact.cells.len(),
                artifact.model.cluster_count()
            );
            println!(
                "Selected features: {}",
                artifact.model.selected_features().join(", ")
            );
        }
        Commands::Query { lon, lat, limit } => {
            let artifact = latest_artifact(&config)?;
            let result = scout_pipeline::query(&artifact, Coordinate::new(lon, lat), limit);
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Commands::Export { output } => {
            let artifact = latest_artifact(&config)?;
            let collection = export::cells_to_geojson(&artifact.cells);
            let text = collection.to_string();

            match output {
                Some(path) => {
                    std::fs::write(&path, text)?;
                    log::info!(
                        "Wrote {} cells to {}",
                        artifact.cells.len(),
                        path.display()
                    );
                }
                None => println!("{text}"),
            }
        }
    }

    Ok(())
}

fn resolve_config(path: Option<&Path>) -> Result<ScoutConfig, Box<dyn std::error::Error>> {
    if let Some(path) = path {
        return Ok(load_config(path)?);
    }

    let default_path = Path::new(DEFAULT_CONFIG);
    if default_path.exists() {
        return Ok(load_config(default_path)?);
    }

    log::info!("No {DEFAULT_CONFIG} found, using built-in defaults");
    let config = ScoutConfig::default();
    validate_config(&config)?;
    Ok(config)
}

fn latest_artifact(config: &ScoutConfig) -> Result<Artifact, Box<dyn std::error::Error>> {
    let store = FsArtifactStore::new(&config.store.dir);
    store.latest()?.ok_or_else(|| {
        format!(
            "No artifact in {}, run `scout build` first",
            config.store.dir.display()
        )
        .into()
    })
}
