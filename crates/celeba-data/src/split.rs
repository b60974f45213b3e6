//! Train / validation / test partitioning.

use std::{fmt, ops::Range};

use serde::Deserialize;

use crate::error::{DatasetError, DatasetResult};

/// Number of training images in the official CelebA partition.
pub const CELEBA_TRAIN_COUNT: usize = 162_770;
/// Number of validation images in the official CelebA partition.
pub const CELEBA_VALID_COUNT: usize = 19_867;

/// Which partition a value belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitKind {
    Train,
    Valid,
    Test,
}

impl SplitKind {
    pub const ALL: [SplitKind; 3] = [SplitKind::Train, SplitKind::Valid, SplitKind::Test];

    pub const fn as_str(self) -> &'static str {
        match self {
            SplitKind::Train => "train",
            SplitKind::Valid => "valid",
            SplitKind::Test => "test",
        }
    }
}

impl fmt::Display for SplitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A `(train, valid, test)` triple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Split<T> {
    pub train: T,
    pub valid: T,
    pub test: T,
}

impl<T> Split<T> {
    pub fn get(&self, kind: SplitKind) -> &T {
        match kind {
            SplitKind::Train => &self.train,
            SplitKind::Valid => &self.valid,
            SplitKind::Test => &self.test,
        }
    }

    pub fn map<U>(self, mut f: impl FnMut(T) -> U) -> Split<U> {
        Split {
            train: f(self.train),
            valid: f(self.valid),
            test: f(self.test),
        }
    }

    pub fn as_ref(&self) -> Split<&T> {
        Split {
            train: &self.train,
            valid: &self.valid,
            test: &self.test,
        }
    }

    /// Iterates the partitions in train, valid, test order.
    pub fn iter(&self) -> impl Iterator<Item = (SplitKind, &T)> {
        SplitKind::ALL.into_iter().map(move |kind| (kind, self.get(kind)))
    }

    pub fn into_vec(self) -> Vec<T> {
        vec![self.train, self.valid, self.test]
    }
}

/// How a collection is cut into partitions.
///
/// Counts are absolute image numbers with the test split taking the
/// remainder; ratios are fractions of the collection length.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "SplitEntry")]
pub enum SplitSpec {
    Counts {
        train: usize,
        valid: usize,
        test: Option<usize>,
    },
    Ratios {
        train_ratio: f64,
        valid_ratio: f64,
    },
}

/// Accepted YAML shapes for `split`. Keys from both shapes never mix.
#[derive(Deserialize)]
#[serde(untagged)]
enum SplitEntry {
    Counts(CountsSplit),
    Ratios(RatioSplit),
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct CountsSplit {
    train: usize,
    valid: usize,
    #[serde(default)]
    test: Option<usize>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RatioSplit {
    train_ratio: f64,
    valid_ratio: f64,
}

impl From<SplitEntry> for SplitSpec {
    fn from(entry: SplitEntry) -> Self {
        match entry {
            SplitEntry::Counts(CountsSplit { train, valid, test }) => {
                Self::Counts { train, valid, test }
            }
            SplitEntry::Ratios(RatioSplit {
                train_ratio,
                valid_ratio,
            }) => Self::Ratios {
                train_ratio,
                valid_ratio,
            },
        }
    }
}

impl Default for SplitSpec {
    fn default() -> Self {
        Self::celeba()
    }
}

impl SplitSpec {
    /// The official CelebA partition.
    pub const fn celeba() -> Self {
        Self::Counts {
            train: CELEBA_TRAIN_COUNT,
            valid: CELEBA_VALID_COUNT,
            test: None,
        }
    }

    /// Resolves partition sizes against a collection of `total` items.
    pub fn resolve(&self, total: usize) -> DatasetResult<SplitBounds> {
        let mismatch = |reason: String| DatasetError::SplitMismatch { total, reason };

        let (train, valid) = match *self {
            Self::Counts { train, valid, .. } => (train, valid),
            Self::Ratios {
                train_ratio,
                valid_ratio,
            } => {
                for (name, ratio) in [("train_ratio", train_ratio), ("valid_ratio", valid_ratio)] {
                    if !(0.0..=1.0).contains(&ratio) {
                        return Err(mismatch(format!("{name} {ratio} is outside [0, 1]")));
                    }
                }
                if train_ratio + valid_ratio > 1.0 {
                    return Err(mismatch(format!(
                        "train_ratio + valid_ratio = {} exceeds 1",
                        train_ratio + valid_ratio
                    )));
                }
                (
                    (total as f64 * train_ratio).floor() as usize,
                    (total as f64 * valid_ratio).floor() as usize,
                )
            }
        };

        let test = total
            .checked_sub(train + valid)
            .ok_or_else(|| mismatch(format!("train {train} + valid {valid} exceeds the total")))?;

        if let Self::Counts {
            test: Some(expected),
            ..
        } = *self
        {
            if expected != test {
                return Err(mismatch(format!(
                    "test split expected {expected} images, {test} remain"
                )));
            }
        }

        Ok(SplitBounds { train, valid, test })
    }
}

/// Resolved partition sizes; always sums to the collection length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitBounds {
    pub train: usize,
    pub valid: usize,
    pub test: usize,
}

impl SplitBounds {
    pub const fn total(&self) -> usize {
        self.train + self.valid + self.test
    }

    /// Index ranges of each partition within the full collection.
    pub fn ranges(&self) -> Split<Range<usize>> {
        let valid_start = self.train;
        let test_start = valid_start + self.valid;
        Split {
            train: 0..valid_start,
            valid: valid_start..test_start,
            test: test_start..self.total(),
        }
    }

    /// Cuts `items` into partitions, preserving order.
    pub fn split_vec<T>(&self, mut items: Vec<T>) -> Split<Vec<T>> {
        debug_assert_eq!(items.len(), self.total());
        let test = items.split_off(self.train + self.valid);
        let valid = items.split_off(self.train);
        Split {
            train: items,
            valid,
            test,
        }
    }
}
