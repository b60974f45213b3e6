//! Random and sequential mini-batch sampling over a decoded dataset.

use burn::{
    config::Config,
    tensor::{backend::Backend, Int, Tensor, TensorData},
};
use rand::{rngs::StdRng, Rng, SeedableRng};
use thiserror::Error;

use crate::{images::normalize_images, split::Split};

/// Sampling options.
#[derive(Config, Debug)]
pub struct SamplerConfig {
    /// Default batch size for [`DataSampler::next_train_batch`].
    #[config(default = 32)]
    pub batch_size: usize,
    /// Randomly flip training batches upside down.
    #[config(default = false)]
    pub v_flip: bool,
    /// Randomly mirror training batches left to right.
    #[config(default = false)]
    pub h_flip: bool,
    /// Seed for index sampling and flip decisions. Entropy-seeded when absent.
    #[config(default = "None")]
    pub seed: Option<u64>,
}

/// Error type for batch sampling.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum SamplerError {
    #[error("image count {images} does not match attribute row count {attributes}")]
    LengthMismatch { images: usize, attributes: usize },

    #[error("batch size must be greater than 0")]
    InvalidBatchSize,

    #[error("cannot sample from an empty dataset")]
    Empty,

    #[error("invalid batch range: start {start} must be less than end {end}")]
    InvalidRange { start: usize, end: usize },

    #[error("batch range end {end} exceeds dataset length {len}")]
    OutOfBounds { end: usize, len: usize },
}

/// A batch of normalized images and their attribute rows.
#[derive(Debug, Clone)]
pub struct CelebaBatch<B: Backend> {
    /// Images with shape `[N, C, H, W]`, values in `[-1, 1]`.
    pub images: Tensor<B, 4>,
    /// One-hot attributes with shape `[N, width]`.
    pub attributes: Tensor<B, 2>,
}

impl<B: Backend> CelebaBatch<B> {
    pub const fn new(images: Tensor<B, 4>, attributes: Tensor<B, 2>) -> Self {
        Self { images, attributes }
    }

    /// Number of rows in the batch.
    pub fn len(&self) -> usize {
        self.images.dims()[0]
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Serves batches from images and attributes covering every split.
///
/// Images are held as raw `[0, 255]` values and normalized per batch.
/// Split boundaries are the caller's concern; see
/// [`SplitBounds::ranges`](crate::split::SplitBounds::ranges).
pub struct DataSampler<B: Backend> {
    images: Tensor<B, 4>,
    attributes: Tensor<B, 2>,
    len: usize,
    config: SamplerConfig,
    rng: StdRng,
    device: B::Device,
}

impl<B: Backend> DataSampler<B> {
    /// Creates a sampler, moving both tensors to `device`.
    pub fn new(
        images: Tensor<B, 4>,
        attributes: Tensor<B, 2>,
        config: SamplerConfig,
        device: &B::Device,
    ) -> Result<Self, SamplerError> {
        let len = images.dims()[0];
        let rows = attributes.dims()[0];
        if len != rows {
            return Err(SamplerError::LengthMismatch {
                images: len,
                attributes: rows,
            });
        }

        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_rng(&mut rand::rng()),
        };

        Ok(Self {
            images: images.to_device(device),
            attributes: attributes.to_device(device),
            len,
            config,
            rng,
            device: device.clone(),
        })
    }

    /// Creates a sampler over the train, valid and test partitions, concatenated in that order.
    pub fn from_splits(
        images: Split<Tensor<B, 4>>,
        attributes: Split<Tensor<B, 2>>,
        config: SamplerConfig,
        device: &B::Device,
    ) -> Result<Self, SamplerError> {
        Self::new(
            Tensor::cat(images.into_vec(), 0),
            Tensor::cat(attributes.into_vec(), 0),
            config,
            device,
        )
    }

    pub fn config(&self) -> &SamplerConfig {
        &self.config
    }

    /// Number of images across all splits.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Draws `batch_size` images uniformly at random, with replacement.
    ///
    /// Batches larger than the dataset are allowed. When enabled, vertical
    /// and horizontal flips are each applied with probability 0.5 to the
    /// whole batch at once.
    pub fn train_batch(&mut self, batch_size: usize) -> Result<CelebaBatch<B>, SamplerError> {
        if batch_size == 0 {
            return Err(SamplerError::InvalidBatchSize);
        }
        if self.len == 0 {
            return Err(SamplerError::Empty);
        }

        let indices: Vec<i64> = (0..batch_size)
            .map(|_| self.rng.random_range(0..self.len) as i64)
            .collect();
        let indices =
            Tensor::<B, 1, Int>::from_data(TensorData::new(indices, [batch_size]), &self.device);

        let mut images = normalize_images(self.images.clone().select(0, indices.clone()));
        let attributes = self.attributes.clone().select(0, indices);

        if self.config.v_flip && self.rng.random_bool(0.5) {
            images = images.flip([2]);
        }
        if self.config.h_flip && self.rng.random_bool(0.5) {
            images = images.flip([3]);
        }

        Ok(CelebaBatch::new(images, attributes))
    }

    /// [`train_batch`](Self::train_batch) with the configured batch size.
    pub fn next_train_batch(&mut self) -> Result<CelebaBatch<B>, SamplerError> {
        self.train_batch(self.config.batch_size)
    }

    /// Returns rows `start..end` in order, normalized and without augmentation.
    pub fn eval_batch(&self, start: usize, end: usize) -> Result<CelebaBatch<B>, SamplerError> {
        if start >= end {
            return Err(SamplerError::InvalidRange { start, end });
        }
        if end > self.len {
            return Err(SamplerError::OutOfBounds { end, len: self.len });
        }

        let images = normalize_images(self.images.clone().slice([start..end]));
        let attributes = self.attributes.clone().slice([start..end]);
        Ok(CelebaBatch::new(images, attributes))
    }
}
