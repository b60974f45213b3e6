//! Attribute catalog, serialized attribute table and one-hot attribute matrix.

use std::{
    collections::{BTreeMap, HashSet},
    fs,
    ops::Range,
    path::Path,
};

use burn::tensor::{backend::Backend, Tensor, TensorData};
use serde::Deserialize;

use crate::error::{DatasetError, DatasetResult};

/// The 40 binary attributes annotated in CelebA, in the order of the
/// official annotation file.
pub const CELEBA_ATTRIBUTES: [&str; 40] = [
    "5_o_Clock_Shadow",
    "Arched_Eyebrows",
    "Attractive",
    "Bags_Under_Eyes",
    "Bald",
    "Bangs",
    "Big_Lips",
    "Big_Nose",
    "Black_Hair",
    "Blond_Hair",
    "Blurry",
    "Brown_Hair",
    "Bushy_Eyebrows",
    "Chubby",
    "Double_Chin",
    "Eyeglasses",
    "Goatee",
    "Gray_Hair",
    "Heavy_Makeup",
    "High_Cheekbones",
    "Male",
    "Mouth_Slightly_Open",
    "Mustache",
    "Narrow_Eyes",
    "No_Beard",
    "Oval_Face",
    "Pale_Skin",
    "Pointy_Nose",
    "Receding_Hairline",
    "Rosy_Cheeks",
    "Sideburns",
    "Smiling",
    "Straight_Hair",
    "Wavy_Hair",
    "Wearing_Earrings",
    "Wearing_Hat",
    "Wearing_Lipstick",
    "Wearing_Necklace",
    "Wearing_Necktie",
    "Young",
];

/// Category count used when an attribute is given by name only.
pub const DEFAULT_CATEGORIES: usize = 2;

/// A named categorical attribute with values in `0..categories`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "AttributeEntry")]
pub struct AttributeSpec {
    /// Attribute name as it appears in the attribute table.
    pub name: String,
    /// Number of discrete values.
    pub categories: usize,
}

impl AttributeSpec {
    /// Creates a new attribute specification.
    pub fn new(name: impl Into<String>, categories: usize) -> Self {
        Self {
            name: name.into(),
            categories,
        }
    }

    /// A binary attribute.
    pub fn binary(name: impl Into<String>) -> Self {
        Self::new(name, DEFAULT_CATEGORIES)
    }
}

/// Accepted YAML shapes for a catalog entry: `Male` or `{ name: Male, categories: 2 }`.
#[derive(Deserialize)]
#[serde(untagged)]
enum AttributeEntry {
    Name(String),
    Spec(CategoricalEntry),
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct CategoricalEntry {
    name: String,
    #[serde(default = "default_categories")]
    categories: usize,
}

const fn default_categories() -> usize {
    DEFAULT_CATEGORIES
}

impl From<AttributeEntry> for AttributeSpec {
    fn from(entry: AttributeEntry) -> Self {
        match entry {
            AttributeEntry::Name(name) => Self::binary(name),
            AttributeEntry::Spec(CategoricalEntry { name, categories }) => Self::new(name, categories),
        }
    }
}

/// Ordered list of attributes extracted from the table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeCatalog {
    specs: Vec<AttributeSpec>,
}

impl AttributeCatalog {
    /// Creates a catalog, rejecting empty catalogs, duplicate names and
    /// attributes with fewer than two categories.
    pub fn new(specs: Vec<AttributeSpec>) -> DatasetResult<Self> {
        if specs.is_empty() {
            return Err(DatasetError::InvalidCatalog {
                reason: "no attributes selected".into(),
            });
        }

        let mut seen = HashSet::with_capacity(specs.len());
        for spec in &specs {
            if spec.categories < 2 {
                return Err(DatasetError::InvalidCatalog {
                    reason: format!(
                        "attribute `{}` has {} categories, at least 2 are required",
                        spec.name, spec.categories
                    ),
                });
            }
            if !seen.insert(spec.name.as_str()) {
                return Err(DatasetError::InvalidCatalog {
                    reason: format!("attribute `{}` is listed twice", spec.name),
                });
            }
        }

        Ok(Self { specs })
    }

    /// All 40 CelebA attributes as binary attributes.
    pub fn celeba() -> Self {
        Self {
            specs: CELEBA_ATTRIBUTES
                .iter()
                .map(|name| AttributeSpec::binary(*name))
                .collect(),
        }
    }

    pub fn specs(&self) -> &[AttributeSpec] {
        &self.specs
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// Total number of one-hot columns.
    pub fn width(&self) -> usize {
        self.specs.iter().map(|spec| spec.categories).sum()
    }

    /// Attributes paired with their column range in the attribute matrix.
    pub fn blocks(&self) -> impl Iterator<Item = (&AttributeSpec, Range<usize>)> {
        self.specs.iter().scan(0, |offset, spec| {
            let start = *offset;
            *offset += spec.categories;
            Some((spec, start..*offset))
        })
    }
}

/// Per-image category indices keyed by attribute name.
///
/// Stored on disk as a JSON object mapping each attribute name to an array
/// with one category index per image.
#[derive(Debug, Clone)]
pub struct AttributeTable {
    columns: BTreeMap<String, Vec<u32>>,
    rows: usize,
}

impl AttributeTable {
    /// Builds a table from in-memory columns. All columns must have the same length.
    pub fn from_columns(columns: BTreeMap<String, Vec<u32>>) -> Result<Self, String> {
        let mut lengths = columns.iter().map(|(name, values)| (name, values.len()));
        let rows = match lengths.next() {
            Some((_, rows)) => rows,
            None => 0,
        };
        if let Some((name, len)) = lengths.find(|(_, len)| *len != rows) {
            return Err(format!(
                "column `{name}` has {len} rows, expected {rows}"
            ));
        }
        Ok(Self { columns, rows })
    }

    /// Reads a serialized table from `path`.
    pub fn load(path: &Path) -> DatasetResult<Self> {
        if !path.is_file() {
            return Err(DatasetError::DatasetNotFound {
                path: path.to_path_buf(),
            });
        }
        let raw = fs::read(path).map_err(|source| DatasetError::ReadFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let columns: BTreeMap<String, Vec<u32>> =
            serde_json::from_slice(&raw).map_err(|e| DatasetError::CorruptAttributeTable {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        Self::from_columns(columns).map_err(|reason| DatasetError::CorruptAttributeTable {
            path: path.to_path_buf(),
            reason,
        })
    }

    /// Number of images described by the table.
    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn column(&self, name: &str) -> Option<&[u32]> {
        self.columns.get(name).map(Vec::as_slice)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }
}

/// Row-major one-hot matrix, one row per image.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeMatrix {
    data: Vec<f32>,
    rows: usize,
    cols: usize,
}

impl AttributeMatrix {
    /// Encodes the catalog's attributes from `table` as concatenated one-hot blocks.
    pub fn from_table(catalog: &AttributeCatalog, table: &AttributeTable) -> DatasetResult<Self> {
        let rows = table.rows();
        let cols = catalog.width();
        let mut data = vec![0.0f32; rows * cols];

        for (spec, block) in catalog.blocks() {
            let column = table
                .column(&spec.name)
                .ok_or_else(|| DatasetError::UnknownAttribute {
                    name: spec.name.clone(),
                    available: table.names().collect::<Vec<_>>().join(", "),
                })?;

            for (row, &value) in column.iter().enumerate() {
                if value as usize >= spec.categories {
                    return Err(DatasetError::InvalidCategory {
                        attribute: spec.name.clone(),
                        row,
                        value,
                        categories: spec.categories,
                    });
                }
                data[row * cols + block.start + value as usize] = 1.0;
            }
        }

        Ok(Self { data, rows, cols })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn row(&self, index: usize) -> &[f32] {
        &self.data[index * self.cols..(index + 1) * self.cols]
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Stacks matrices with the same column count row-wise.
    pub fn concat<'a>(parts: impl IntoIterator<Item = &'a AttributeMatrix>) -> Self {
        let mut parts = parts.into_iter().peekable();
        let cols = parts.peek().map_or(0, |m| m.cols);
        let mut data = Vec::new();
        let mut rows = 0;
        for part in parts {
            debug_assert_eq!(part.cols, cols);
            data.extend_from_slice(&part.data);
            rows += part.rows;
        }
        Self { data, rows, cols }
    }

    /// Copies the rows in `range` into a new matrix.
    pub fn slice_rows(&self, range: Range<usize>) -> Self {
        let data = self.data[range.start * self.cols..range.end * self.cols].to_vec();
        Self {
            data,
            rows: range.len(),
            cols: self.cols,
        }
    }

    /// Sum of every entry in the given column range.
    pub fn block_sum(&self, block: Range<usize>) -> f64 {
        (0..self.rows)
            .map(|row| {
                self.row(row)[block.clone()]
                    .iter()
                    .map(|&v| f64::from(v))
                    .sum::<f64>()
            })
            .sum()
    }

    /// Mean of a single column; zero for an empty matrix.
    pub fn column_mean(&self, column: usize) -> f64 {
        if self.rows == 0 {
            return 0.0;
        }
        let total: f64 = (0..self.rows)
            .map(|row| f64::from(self.data[row * self.cols + column]))
            .sum();
        total / self.rows as f64
    }

    /// Uploads the matrix as a `[rows, cols]` tensor.
    pub fn to_tensor<B: Backend>(&self, device: &B::Device) -> Tensor<B, 2> {
        Tensor::from_data(
            TensorData::new(self.data.clone(), [self.rows, self.cols]),
            device,
        )
    }
}
