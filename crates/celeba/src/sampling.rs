//! `celeba sample`: decode a dataset and draw batches from it.

use anyhow::{ensure, Context, Result};
use burn::tensor::backend::Backend;
use celeba_data::{decode_images, load_celeba_images, DataSampler, SplitKind};

use crate::inspect::InspectArgs;

/// Arguments for the `sample` subcommand.
#[derive(Debug, Clone)]
pub struct SamplingArgs {
    pub source: InspectArgs,
    /// Number of training batches to draw.
    pub batches: usize,
    /// Maximum number of rows in the evaluation batch.
    pub eval_size: usize,
}

/// Summary of a sampling run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SamplingReport {
    pub dataset_len: usize,
    pub train_batches: usize,
    pub train_batch_size: usize,
    pub eval_rows: usize,
}

/// Decodes every image, builds a [`DataSampler`] and draws `batches`
/// training batches followed by one evaluation batch from the start of the
/// validation split (or the test split when validation is empty).
pub fn run_sampling<B: Backend>(
    args: &SamplingArgs,
    device: &B::Device,
) -> Result<SamplingReport> {
    ensure!(args.batches > 0, "Number of batches must be greater than 0");
    ensure!(args.eval_size > 0, "Evaluation size must be greater than 0");

    let config = args.source.load_config()?;
    let dataset = load_celeba_images(&config.dataset_config()?)
        .with_context(|| format!("Failed to load dataset from {}", config.root.display()))?;
    ensure!(!dataset.is_empty(), "Dataset at {} is empty", config.root.display());

    tracing::info!(images = dataset.len(), img_size = ?config.img_size, "decoding images");
    let images = decode_images::<B>(&dataset.all_images(), config.img_size, device)
        .context("Failed to decode images")?;
    let attributes = dataset.all_attributes().to_tensor::<B>(device);

    let mut sampler = DataSampler::new(images, attributes, config.sampler_config(), device)?;
    let batch_size = sampler.config().batch_size;

    for step in 0..args.batches {
        let batch = sampler.next_train_batch()?;
        tracing::info!(
            step,
            images = ?batch.images.dims(),
            attributes = ?batch.attributes.dims(),
            "train batch",
        );
    }

    let ranges = dataset.bounds.ranges();
    let (kind, range) = if ranges.valid.is_empty() {
        (SplitKind::Test, ranges.test)
    } else {
        (SplitKind::Valid, ranges.valid)
    };

    let eval_rows = if range.is_empty() {
        tracing::warn!("no validation or test images, skipping evaluation batch");
        0
    } else {
        let end = range.end.min(range.start + args.eval_size);
        let batch = sampler.eval_batch(range.start, end)?;
        tracing::info!(
            split = %kind,
            start = range.start,
            end,
            images = ?batch.images.dims(),
            "eval batch",
        );
        batch.len()
    };

    Ok(SamplingReport {
        dataset_len: sampler.len(),
        train_batches: args.batches,
        train_batch_size: batch_size,
        eval_rows,
    })
}
