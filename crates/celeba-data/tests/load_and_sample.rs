//! End-to-end tests: config file → loader → decoding → sampler, on a
//! synthetic dataset written to a temporary directory.

use std::{collections::BTreeMap, fs, path::Path};

use anyhow::Result;
use burn::backend::NdArray;
use celeba_data::{
    decode_images, load_celeba_images, DataSampler, DatasetError, DatasetVariant, SplitSpec,
    TrainConfig,
};
use image::{Rgb, RgbImage};

type TestBackend = NdArray<f32>;

const IMAGES: usize = 10;

fn male(i: usize) -> u32 {
    (i % 2) as u32
}

fn hair(i: usize) -> u32 {
    (i % 3) as u32
}

/// Writes `count` 4x3 solid images named `1.png..=count.png` (image `k` has
/// every channel set to `k * 10`) plus a matching attribute table.
fn write_dataset(root: &Path, variant: DatasetVariant, count: usize) -> Result<()> {
    let image_dir = root.join(variant.image_dir());
    fs::create_dir_all(&image_dir)?;

    // Written out of order so the listing order is not creation order.
    for k in (1..=count).rev() {
        let value = (k * 10) as u8;
        RgbImage::from_pixel(4, 3, Rgb([value, value, value]))
            .save(image_dir.join(format!("{k}.png")))?;
    }

    let table = BTreeMap::from([
        ("Male", (0..count).map(male).collect::<Vec<_>>()),
        ("Hair", (0..count).map(hair).collect::<Vec<_>>()),
    ]);
    fs::write(root.join("attributes.json"), serde_json::to_vec(&table)?)?;
    Ok(())
}

fn write_config(root: &Path, extra: &str) -> Result<std::path::PathBuf> {
    let path = root.join("config.yaml");
    let src = format!(
        "train:\n  root: {}\n  type: align\n  attributes: [Male, {{ name: Hair, categories: 3 }}]\n  split: {{ train: 6, valid: 2 }}\n  seed: 1\n{extra}",
        root.display()
    );
    fs::write(&path, src)?;
    Ok(path)
}

#[test]
fn config_to_batches() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let root = tmp.path();
    write_dataset(root, DatasetVariant::Aligned, IMAGES)?;
    let config = TrainConfig::load(write_config(root, "  batch_size: 5\n  h_flip: true\n")?)?;

    let dataset = load_celeba_images(&config.dataset_config()?)?;
    assert_eq!(dataset.len(), IMAGES);
    assert_eq!(
        (dataset.bounds.train, dataset.bounds.valid, dataset.bounds.test),
        (6, 2, 2)
    );

    // Numeric order, not lexical: 1, 2, ..., 10.
    let names: Vec<String> = dataset
        .all_images()
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    let expected: Vec<String> = (1..=IMAGES).map(|k| format!("{k}.png")).collect();
    assert_eq!(names, expected);

    // Attribute rows follow the table, split alike.
    assert_eq!(dataset.attributes.train.rows(), 6);
    assert_eq!(dataset.attributes.valid.row(0), &[1.0, 0.0, 1.0, 0.0, 0.0]);
    assert_eq!(dataset.attributes.test.row(1), &[0.0, 1.0, 1.0, 0.0, 0.0]);

    let device = Default::default();
    let images = decode_images::<TestBackend>(&dataset.all_images(), None, &device)?;
    assert_eq!(images.dims(), [IMAGES, 3, 3, 4]);

    let attributes = dataset
        .attributes
        .as_ref()
        .map(|m| m.to_tensor::<TestBackend>(&device));
    let images = dataset
        .bounds
        .ranges()
        .map(|range| images.clone().slice([range]));
    let mut sampler =
        DataSampler::from_splits(images, attributes, config.sampler_config(), &device)?;
    assert_eq!(sampler.len(), IMAGES);

    let batch = sampler.next_train_batch()?;
    assert_eq!(batch.images.dims(), [5, 3, 3, 4]);
    assert_eq!(batch.attributes.dims(), [5, 5]);

    // First validation image is file 7.png.
    let valid = dataset.bounds.ranges().valid;
    let eval = sampler.eval_batch(valid.start, valid.end)?;
    let pixels = eval.images.into_data().to_vec::<f32>().unwrap();
    let expected = 70.0f32 / 255.0 * 2.0 - 1.0;
    assert!((pixels[0] - expected).abs() < 1e-6);
    let rows = eval.attributes.into_data().to_vec::<f32>().unwrap();
    assert_eq!(&rows[..5], &[1.0, 0.0, 1.0, 0.0, 0.0]);

    Ok(())
}

#[test]
fn decoding_can_resize() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    write_dataset(tmp.path(), DatasetVariant::Aligned, 3)?;
    let dir = tmp.path().join(DatasetVariant::Aligned.image_dir());
    let paths = celeba_data::loader::list_images(&dir)?;

    let images = decode_images::<TestBackend>(&paths, Some(8), &Default::default())?;
    assert_eq!(images.dims(), [3, 3, 8, 8]);
    Ok(())
}

#[test]
fn mixed_image_sizes_are_rejected() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    write_dataset(tmp.path(), DatasetVariant::Aligned, 3)?;
    let dir = tmp.path().join(DatasetVariant::Aligned.image_dir());
    RgbImage::new(5, 5).save(dir.join("4.png"))?;
    let paths = celeba_data::loader::list_images(&dir)?;

    let err = decode_images::<TestBackend>(&paths, None, &Default::default()).unwrap_err();
    assert!(matches!(
        err,
        DatasetError::InconsistentImageDimensions {
            actual_width: 5,
            expected_width: 4,
            ..
        }
    ));
    Ok(())
}

#[test]
fn missing_attribute_table_is_dataset_not_found() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let config = TrainConfig::load(write_config(tmp.path(), "")?)?;

    let err = load_celeba_images(&config.dataset_config()?).unwrap_err();
    assert!(matches!(err, DatasetError::DatasetNotFound { path } if path.ends_with("attributes.json")));
    Ok(())
}

#[test]
fn missing_variant_directory_is_dataset_not_found() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    write_dataset(tmp.path(), DatasetVariant::Aligned, IMAGES)?;
    let mut config = TrainConfig::load(write_config(tmp.path(), "")?)?;
    config.variant = DatasetVariant::Regular;

    let err = load_celeba_images(&config.dataset_config()?).unwrap_err();
    assert!(matches!(err, DatasetError::DatasetNotFound { path } if path.ends_with("celeba_processed")));
    Ok(())
}

#[test]
fn high_quality_reads_the_aligned_set() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    write_dataset(tmp.path(), DatasetVariant::Aligned, IMAGES)?;
    let mut config = TrainConfig::load(write_config(tmp.path(), "")?)?;
    config.variant = DatasetVariant::HighQuality;

    assert_eq!(load_celeba_images(&config.dataset_config()?)?.len(), IMAGES);
    Ok(())
}

#[test]
fn corrupt_attribute_table_is_reported() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    write_dataset(tmp.path(), DatasetVariant::Aligned, IMAGES)?;
    fs::write(tmp.path().join("attributes.json"), b"{ \"Male\": [0, 1,")?;
    let config = TrainConfig::load(write_config(tmp.path(), "")?)?;

    let err = load_celeba_images(&config.dataset_config()?).unwrap_err();
    assert!(matches!(err, DatasetError::CorruptAttributeTable { .. }));
    Ok(())
}

#[test]
fn image_count_must_match_table_rows() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    write_dataset(tmp.path(), DatasetVariant::Aligned, IMAGES)?;
    fs::remove_file(
        tmp.path()
            .join(DatasetVariant::Aligned.image_dir())
            .join("3.png"),
    )?;
    let config = TrainConfig::load(write_config(tmp.path(), "")?)?;

    let err = load_celeba_images(&config.dataset_config()?).unwrap_err();
    assert!(matches!(
        err,
        DatasetError::AlignmentMismatch {
            images: 9,
            rows: 10,
            ..
        }
    ));
    Ok(())
}

#[test]
fn split_larger_than_dataset_is_rejected() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    write_dataset(tmp.path(), DatasetVariant::Aligned, IMAGES)?;
    let mut config = TrainConfig::load(write_config(tmp.path(), "")?)?;
    config.split = SplitSpec::celeba();

    let err = load_celeba_images(&config.dataset_config()?).unwrap_err();
    assert!(matches!(err, DatasetError::SplitMismatch { total: 10, .. }));
    Ok(())
}
