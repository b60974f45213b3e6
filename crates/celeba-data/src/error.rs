//! Error types for dataset loading and image decoding.
//!
//! Every failure that originates in the filesystem or in the serialized
//! attribute table is mapped to a variant carrying the offending path, so
//! callers can tell a missing dataset apart from a corrupt one.

use std::path::PathBuf;

use thiserror::Error;

/// Error type for dataset operations.
#[derive(Error, Debug)]
pub enum DatasetError {
    /// The dataset variant string is not one of `reg`, `align` or `hq`.
    #[error("unsupported dataset variant: {variant} (expected one of: reg, align, hq)")]
    UnsupportedVariant {
        /// The rejected variant name.
        variant: String,
    },

    /// A required file or directory of the dataset layout does not exist.
    #[error("dataset not found: {path}")]
    DatasetNotFound {
        /// The missing path.
        path: PathBuf,
    },

    /// Reading a file of the dataset failed.
    #[error("failed to read {path}")]
    ReadFailed {
        /// The file that could not be read.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Listing the image directory failed.
    #[error("failed to read directory: {path}")]
    DirectoryReadFailed {
        /// The directory being listed.
        path: PathBuf,
        /// The underlying directory walk error.
        #[source]
        source: walkdir::Error,
    },

    /// The attribute table could not be parsed or is internally inconsistent.
    #[error("corrupt attribute table {path}: {reason}")]
    CorruptAttributeTable {
        /// The attribute table path.
        path: PathBuf,
        /// What is wrong with it.
        reason: String,
    },

    /// The catalog names an attribute that the table does not contain.
    #[error("attribute `{name}` is not present in the attribute table (available: {available})")]
    UnknownAttribute {
        /// The attribute name.
        name: String,
        /// Comma separated names found in the table.
        available: String,
    },

    /// The catalog itself is malformed.
    #[error("invalid attribute catalog: {reason}")]
    InvalidCatalog {
        /// Why the catalog was rejected.
        reason: String,
    },

    /// A category index is outside `0..categories` for its attribute.
    #[error("attribute `{attribute}` row {row}: category {value} is out of range 0..{categories}")]
    InvalidCategory {
        /// The attribute name.
        attribute: String,
        /// The offending row.
        row: usize,
        /// The stored category index.
        value: u32,
        /// The number of categories declared in the catalog.
        categories: usize,
    },

    /// The image listing and the attribute table disagree on the dataset size.
    #[error("{images} images in {path} but the attribute table has {rows} rows")]
    AlignmentMismatch {
        /// The image directory.
        path: PathBuf,
        /// Number of image files found.
        images: usize,
        /// Number of attribute rows.
        rows: usize,
    },

    /// The split specification does not fit the collection.
    #[error("split does not fit {total} images: {reason}")]
    SplitMismatch {
        /// Size of the collection being split.
        total: usize,
        /// Why the split was rejected.
        reason: String,
    },

    /// A one-hot block does not sum to the partition's row count.
    #[error(
        "{split} split, attribute `{attribute}`: one-hot block sums to {sum}, expected {expected}"
    )]
    OneHotViolation {
        /// Split name.
        split: String,
        /// Attribute name.
        attribute: String,
        /// Observed block sum.
        sum: f64,
        /// Number of rows in the split.
        expected: usize,
    },

    /// Decoding was requested for an empty list of images.
    #[error("no images to decode")]
    EmptyCollection,

    /// Opening or decoding an image file failed.
    #[error("failed to open image: {path}")]
    ImageOpenFailed {
        /// The image path.
        path: PathBuf,
        /// The underlying image error.
        #[source]
        source: image::ImageError,
    },

    /// Decoded images do not share the same dimensions.
    #[error(
        "image {path} is {actual_width}x{actual_height}, expected {expected_width}x{expected_height}"
    )]
    InconsistentImageDimensions {
        /// The image with unexpected dimensions.
        path: PathBuf,
        /// Its width.
        actual_width: u32,
        /// Its height.
        actual_height: u32,
        /// Width of the first decoded image.
        expected_width: u32,
        /// Height of the first decoded image.
        expected_height: u32,
    },
}

/// A specialized `Result` type for dataset operations.
pub type DatasetResult<T> = Result<T, DatasetError>;
