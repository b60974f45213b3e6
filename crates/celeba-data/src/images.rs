//! Image decoding and pixel normalization.

use std::path::PathBuf;

use burn::tensor::{backend::Backend, Tensor, TensorData};
use image::imageops::FilterType;

use crate::error::{DatasetError, DatasetResult};

/// Decodes `paths` into an `[N, 3, H, W]` tensor of raw RGB values in `[0, 255]`.
///
/// When `img_size` is set every image is resized to `img_size x img_size`
/// first; otherwise all images must already share the dimensions of the
/// first one.
pub fn decode_images<B: Backend>(
    paths: &[PathBuf],
    img_size: Option<u32>,
    device: &B::Device,
) -> DatasetResult<Tensor<B, 4>> {
    let Some(first) = paths.first() else {
        return Err(DatasetError::EmptyCollection);
    };

    let mut expected: Option<(u32, u32)> = None;
    let mut pixels: Vec<f32> = Vec::new();

    for path in paths {
        let mut img = image::open(path).map_err(|source| DatasetError::ImageOpenFailed {
            path: path.clone(),
            source,
        })?;
        if let Some(size) = img_size {
            img = img.resize_exact(size, size, FilterType::Lanczos3);
        }
        let rgb = img.to_rgb8();
        let dims = rgb.dimensions();

        match expected {
            None => {
                let (width, height) = dims;
                pixels.reserve(paths.len() * width as usize * height as usize * 3);
                expected = Some(dims);
            }
            Some((expected_width, expected_height)) if dims != (expected_width, expected_height) => {
                return Err(DatasetError::InconsistentImageDimensions {
                    path: path.clone(),
                    actual_width: dims.0,
                    actual_height: dims.1,
                    expected_width,
                    expected_height,
                });
            }
            Some(_) => {}
        }

        pixels.extend(rgb.into_raw().into_iter().map(f32::from));
    }

    let (width, height) = expected.unwrap_or_default();
    tracing::debug!(
        count = paths.len(),
        width,
        height,
        first = %first.display(),
        "images decoded"
    );

    let data = TensorData::new(pixels, [paths.len(), height as usize, width as usize, 3]);
    // NHWC to NCHW
    Ok(Tensor::<B, 4>::from_data(data, device).permute([0, 3, 1, 2]))
}

/// Maps pixel values from `[0, 255]` to `[-1, 1]`: `(x / 255) * 2 - 1`.
pub fn normalize_images<B: Backend, const D: usize>(images: Tensor<B, D>) -> Tensor<B, D> {
    images.div_scalar(255.0).mul_scalar(2.0).add_scalar(-1.0)
}

#[cfg(test)]
mod tests {
    use burn::backend::NdArray;

    use super::*;

    type TestBackend = NdArray<f32>;

    #[test]
    fn normalize_maps_pixel_range_to_unit_interval() {
        let device = Default::default();
        let input = Tensor::<TestBackend, 1>::from_floats([0.0, 127.5, 255.0], &device);

        let output = normalize_images(input).into_data().to_vec::<f32>().unwrap();

        assert_eq!(output[0], -1.0);
        assert!(output[1].abs() < 1e-6);
        assert_eq!(output[2], 1.0);
    }

    #[test]
    fn normalize_preserves_shape() {
        let device = Default::default();
        let input = Tensor::<TestBackend, 4>::zeros([2, 3, 4, 5], &device);

        assert_eq!(normalize_images(input).dims(), [2, 3, 4, 5]);
    }

    #[test]
    fn decoding_nothing_is_an_error() {
        let device = Default::default();
        let err = decode_images::<TestBackend>(&[], None, &device).unwrap_err();
        assert!(matches!(err, DatasetError::EmptyCollection));
    }
}
