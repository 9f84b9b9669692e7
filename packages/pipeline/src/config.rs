//! Loading and validating `scout.toml`.

use std::path::Path;

use scout_pipeline_models::ScoutConfig;

/// Errors from reading or checking the configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path of the configuration file.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The file is not valid TOML or does not match the schema.
    #[error("Failed to parse configuration: {0}")]
    Toml(#[from] toml::de::Error),

    /// A value is out of range.
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Parses and validates configuration text.
///
/// # Errors
///
/// * If the text is not valid TOML for [`ScoutConfig`]
/// * If [`validate_config`] rejects it
pub fn parse_config(text: &str) -> Result<ScoutConfig, ConfigError> {
    let config: ScoutConfig = toml::from_str(text)?;
    validate_config(&config)?;
    Ok(config)
}

/// Reads, parses, and validates a configuration file.
///
/// # Errors
///
/// * If the file cannot be read
/// * If [`parse_config`] fails
pub fn load_config(path: &Path) -> Result<ScoutConfig, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let config = parse_config(&text)?;
    log::info!("Loaded configuration from {}", path.display());
    Ok(config)
}

/// Rejects configurations the pipeline cannot run with.
///
/// # Errors
///
/// * If the region center is not finite
/// * If a side length is not finite and positive
/// * If the grid would have more cells than cell ids can address
/// * If the cluster count or fold count is too small
/// * If the success threshold is outside `(0, 100]`
/// * If no features are configured or the target is empty
pub fn validate_config(config: &ScoutConfig) -> Result<(), ConfigError> {
    let region = &config.region;
    if !region.center().is_finite() {
        return Err(invalid(format!(
            "region center {} is not a finite coordinate",
            region.center()
        )));
    }
    for (name, value) in [("side_m", region.side_m), ("cell_side_m", region.cell_side_m)] {
        if !value.is_finite() || value <= 0.0 {
            return Err(invalid(format!("region.{name} must be positive, got {value}")));
        }
    }
    scout_grid::GridLayout::new(region.side_m, region.cell_side_m)
        .and_then(|layout| layout.cell_count())
        .map_err(|e| invalid(format!("region: {e}")))?;

    let model = &config.model;
    if model.cluster_count == 0 {
        return Err(invalid("model.cluster_count must be at least 1".to_string()));
    }
    let threshold = model.success_percentile_threshold;
    if !(threshold > 0.0 && threshold <= 100.0) {
        return Err(invalid(format!(
            "model.success_percentile_threshold must be in (0, 100], got {threshold}"
        )));
    }
    if model.cv_folds < 2 {
        return Err(invalid(format!(
            "model.cv_folds must be at least 2, got {}",
            model.cv_folds
        )));
    }
    if model.features.is_empty() {
        return Err(invalid("model.features must not be empty".to_string()));
    }
    if model.target.trim().is_empty() {
        return Err(invalid("model.target must not be empty".to_string()));
    }

    if region.cell_side_m > region.side_m {
        log::warn!(
            "Cell side {} m exceeds region side {} m, the grid will be empty",
            region.cell_side_m,
            region.side_m
        );
    }

    Ok(())
}

fn invalid(message: String) -> ConfigError {
    ConfigError::Invalid(message)
}
