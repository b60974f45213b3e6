//! CelebA dataset loading.
//!
//! Expected layout under the dataset root:
//!
//! ```text
//! <root>/
//! ├── attributes.json            # { "<attribute>": [category per image], ... }
//! ├── celeba_processed/          # "reg" variant
//! └── celeba_align_processed/    # "align" (and, for now, "hq") variant
//! ```
//!
//! Image files are paired with attribute rows by position after sorting the
//! directory listing by numeric file stem.

use std::{
    cmp::Ordering,
    fmt,
    path::{Path, PathBuf},
    str::FromStr,
};

use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use crate::{
    attributes::{AttributeCatalog, AttributeMatrix, AttributeTable},
    error::{DatasetError, DatasetResult},
    split::{Split, SplitBounds, SplitSpec},
};

/// File name of the serialized attribute table.
pub const ATTRIBUTE_TABLE_FILE: &str = "attributes.json";

/// Which preprocessed image set to read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum DatasetVariant {
    /// Uncropped in-the-wild images.
    Regular,
    /// Aligned and cropped faces.
    #[default]
    Aligned,
    /// CelebA-HQ. Not available yet, served from the aligned set.
    HighQuality,
}

impl DatasetVariant {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Regular => "reg",
            Self::Aligned => "align",
            Self::HighQuality => "hq",
        }
    }

    /// Image directory name relative to the dataset root.
    pub const fn image_dir(self) -> &'static str {
        match self {
            Self::Regular => "celeba_processed",
            Self::Aligned | Self::HighQuality => "celeba_align_processed",
        }
    }
}

impl FromStr for DatasetVariant {
    type Err = DatasetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "reg" | "regular" => Ok(Self::Regular),
            "align" | "aligned" => Ok(Self::Aligned),
            "hq" | "high-quality" => Ok(Self::HighQuality),
            _ => Err(DatasetError::UnsupportedVariant {
                variant: s.to_string(),
            }),
        }
    }
}

impl TryFrom<String> for DatasetVariant {
    type Error = DatasetError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DatasetVariant> for String {
    fn from(variant: DatasetVariant) -> Self {
        variant.as_str().to_string()
    }
}

impl fmt::Display for DatasetVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything the loader needs to locate and partition a dataset.
#[derive(Debug, Clone)]
pub struct DatasetConfig {
    pub root: PathBuf,
    pub variant: DatasetVariant,
    pub catalog: AttributeCatalog,
    pub split: SplitSpec,
}

/// Output of [`load_celeba_images`]: image paths and attribute rows, partitioned alike.
#[derive(Debug, Clone)]
pub struct LoadedDataset {
    pub catalog: AttributeCatalog,
    pub bounds: SplitBounds,
    pub images: Split<Vec<PathBuf>>,
    pub attributes: Split<AttributeMatrix>,
}

impl LoadedDataset {
    pub fn len(&self) -> usize {
        self.bounds.total()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All attribute rows in train, valid, test order.
    pub fn all_attributes(&self) -> AttributeMatrix {
        AttributeMatrix::concat(self.attributes.iter().map(|(_, matrix)| matrix))
    }

    /// All image paths in train, valid, test order.
    pub fn all_images(&self) -> Vec<PathBuf> {
        self.images
            .iter()
            .flat_map(|(_, paths)| paths.iter().cloned())
            .collect()
    }
}

/// Loads the attribute table and image listing and partitions both.
///
/// # Errors
///
/// Fails with [`DatasetError::DatasetNotFound`] when the table or the image
/// directory is missing, [`DatasetError::AlignmentMismatch`] when their sizes
/// disagree and [`DatasetError::SplitMismatch`] when the split does not fit.
pub fn load_celeba_images(config: &DatasetConfig) -> DatasetResult<LoadedDataset> {
    let table_path = config.root.join(ATTRIBUTE_TABLE_FILE);
    let table = AttributeTable::load(&table_path)?;
    tracing::debug!(path = %table_path.display(), rows = table.rows(), "attribute table loaded");

    if config.variant == DatasetVariant::HighQuality {
        tracing::warn!("high-quality images are not available yet, using the aligned set");
    }
    let image_root = config.root.join(config.variant.image_dir());
    let images = list_images(&image_root)?;

    if images.len() != table.rows() {
        return Err(DatasetError::AlignmentMismatch {
            path: image_root,
            images: images.len(),
            rows: table.rows(),
        });
    }

    let matrix = AttributeMatrix::from_table(&config.catalog, &table)?;
    let bounds = config.split.resolve(images.len())?;
    let ranges = bounds.ranges();
    let attributes = ranges.map(|range| matrix.slice_rows(range));
    let images = bounds.split_vec(images);

    tracing::info!(
        variant = %config.variant,
        root = %config.root.display(),
        train = bounds.train,
        valid = bounds.valid,
        test = bounds.test,
        columns = matrix.cols(),
        "dataset loaded",
    );

    log_attribute_stats(&config.catalog, &attributes)?;

    Ok(LoadedDataset {
        catalog: config.catalog.clone(),
        bounds,
        images,
        attributes,
    })
}

/// Logs per-category frequencies of every attribute in every split and
/// verifies that each one-hot block sums to the split's row count.
pub fn log_attribute_stats(
    catalog: &AttributeCatalog,
    attributes: &Split<AttributeMatrix>,
) -> DatasetResult<()> {
    for (kind, matrix) in attributes.iter() {
        for (spec, block) in catalog.blocks() {
            let means = block
                .clone()
                .map(|column| format!("{:.5}", matrix.column_mean(column)))
                .collect::<Vec<_>>()
                .join(" / ");
            tracing::debug!(split = %kind, attribute = %spec.name, %means);

            let sum = matrix.block_sum(block);
            if sum != matrix.rows() as f64 {
                return Err(DatasetError::OneHotViolation {
                    split: kind.to_string(),
                    attribute: spec.name.clone(),
                    sum,
                    expected: matrix.rows(),
                });
            }
        }
    }
    Ok(())
}

/// Lists the regular files directly under `dir`, sorted by [`compare_image_names`].
pub fn list_images(dir: &Path) -> DatasetResult<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(DatasetError::DatasetNotFound {
            path: dir.to_path_buf(),
        });
    }

    let mut images = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).follow_links(true) {
        let entry = entry.map_err(|source| DatasetError::DirectoryReadFailed {
            path: dir.to_path_buf(),
            source,
        })?;
        if entry.file_type().is_file() {
            images.push(entry.into_path());
        }
    }

    images.sort_by(|a, b| compare_image_names(a, b));
    Ok(images)
}

/// Orders files with numeric stems (`000001.jpg`) by value, ahead of every
/// other file; the rest are ordered by file name.
pub fn compare_image_names(a: &Path, b: &Path) -> Ordering {
    let numeric = |path: &Path| {
        path.file_stem()
            .and_then(|stem| stem.to_str())
            .and_then(|stem| stem.parse::<u64>().ok())
    };

    match (numeric(a), numeric(b)) {
        (Some(x), Some(y)) => x.cmp(&y).then_with(|| a.file_name().cmp(&b.file_name())),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.file_name().cmp(&b.file_name()),
    }
}
