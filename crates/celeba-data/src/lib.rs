//! CelebA attribute dataset for Burn.
//!
//! - [`loader`]: reads the attribute table and image listing and splits both
//!   into train / valid / test partitions.
//! - [`images`]: decodes image files into tensors and normalizes pixels.
//! - [`sampler`]: serves random augmented training batches and sequential
//!   evaluation batches.
//! - [`config`]: typed YAML configuration with an explicit option allow-list.

pub mod attributes;
pub mod config;
pub mod error;
pub mod images;
pub mod loader;
pub mod sampler;
pub mod split;

// Re-export commonly used types
pub use attributes::{
    AttributeCatalog, AttributeMatrix, AttributeSpec, AttributeTable, CELEBA_ATTRIBUTES,
};
pub use config::{ConfigError, TrainConfig};
pub use error::{DatasetError, DatasetResult};
pub use images::{decode_images, normalize_images};
pub use loader::{load_celeba_images, log_attribute_stats, DatasetConfig, DatasetVariant, LoadedDataset};
pub use sampler::{CelebaBatch, DataSampler, SamplerConfig, SamplerError};
pub use split::{Split, SplitBounds, SplitKind, SplitSpec};
