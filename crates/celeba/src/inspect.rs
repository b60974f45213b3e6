//! `celeba inspect`: load a dataset and report its partitions.

use std::path::PathBuf;

use anyhow::{Context, Result};
use celeba_data::{load_celeba_images, DatasetVariant, LoadedDataset, TrainConfig};

/// Arguments shared by the subcommands that read a config file.
#[derive(Debug, Clone)]
pub struct InspectArgs {
    /// Path to the YAML configuration file.
    pub config_path: PathBuf,
    /// Overrides `train.root`.
    pub root: Option<PathBuf>,
    /// Overrides `train.type`.
    pub variant: Option<DatasetVariant>,
}

impl InspectArgs {
    pub fn new(config_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
            root: None,
            variant: None,
        }
    }

    /// Loads the config file and applies command line overrides.
    pub fn load_config(&self) -> Result<TrainConfig> {
        let mut config = TrainConfig::load(&self.config_path).with_context(|| {
            format!("Failed to load config file: {}", self.config_path.display())
        })?;

        if let Some(root) = &self.root {
            config.root = root.clone();
        }
        if let Some(variant) = self.variant {
            config.variant = variant;
        }
        Ok(config)
    }
}

/// Loads the dataset described by the config and logs split sizes and boundaries.
pub fn run_inspect(args: &InspectArgs) -> Result<LoadedDataset> {
    let config = args.load_config()?;
    let dataset_config = config.dataset_config()?;
    let dataset = load_celeba_images(&dataset_config)
        .with_context(|| format!("Failed to load dataset from {}", config.root.display()))?;

    for ((kind, paths), (_, range)) in dataset.images.iter().zip(dataset.bounds.ranges().iter()) {
        tracing::info!(
            split = %kind,
            images = paths.len(),
            start = range.start,
            end = range.end,
            first = ?paths.first().and_then(|p| p.file_name()),
            last = ?paths.last().and_then(|p| p.file_name()),
            "partition",
        );
    }
    tracing::info!(
        attributes = dataset.catalog.len(),
        columns = dataset.catalog.width(),
        total = dataset.len(),
        "attribute matrix",
    );

    Ok(dataset)
}
