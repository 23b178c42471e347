//! Fixed image preprocessing
//!
//! decode → RGB → resize to a square → CHW float in [0, 1] → per-channel
//! normalization with the ImageNet statistics.

use std::path::Path;

use image::imageops::FilterType;
use image::{DynamicImage, ImageReader};

use crate::utils::error::{EyeDiseaseError, Result};
use crate::IMAGE_SIZE;

/// ImageNet normalization mean values (RGB)
pub const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
/// ImageNet normalization std values (RGB)
pub const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Resize + tensor conversion + normalization
#[derive(Debug, Clone, PartialEq)]
pub struct ImageTransform {
    /// Output width and height
    pub image_size: usize,
    /// Per-channel mean subtracted after scaling to [0, 1]
    pub mean: [f32; 3],
    /// Per-channel standard deviation divided out after the mean
    pub std: [f32; 3],
}

impl Default for ImageTransform {
    fn default() -> Self {
        Self {
            image_size: IMAGE_SIZE,
            mean: IMAGENET_MEAN,
            std: IMAGENET_STD,
        }
    }
}

impl ImageTransform {
    /// Transform with a custom output size and ImageNet statistics
    pub fn with_image_size(image_size: usize) -> Self {
        Self {
            image_size,
            ..Self::default()
        }
    }

    /// Number of floats produced per image
    pub fn output_len(&self) -> usize {
        3 * self.image_size * self.image_size
    }

    /// Apply the transform to a decoded image
    ///
    /// Returns a flat CHW vector of length `3 * size * size`.
    pub fn apply(&self, image: &DynamicImage) -> Vec<f32> {
        let size = self.image_size as u32;
        let rgb = image
            .resize_exact(size, size, FilterType::Triangle)
            .to_rgb8();

        let num_pixels = self.image_size * self.image_size;
        let mut tensor = vec![0.0f32; 3 * num_pixels];

        for (i, pixel) in rgb.pixels().enumerate() {
            for c in 0..3 {
                let value = pixel[c] as f32 / 255.0;
                tensor[c * num_pixels + i] = (value - self.mean[c]) / self.std[c];
            }
        }

        tensor
    }

    /// Decode an image file and apply the transform
    pub fn load(&self, path: &Path) -> Result<Vec<f32>> {
        let image = ImageReader::open(path)
            .map_err(|e| EyeDiseaseError::ImageLoadError(path.to_path_buf(), e.to_string()))?
            .with_guessed_format()
            .map_err(|e| EyeDiseaseError::ImageLoadError(path.to_path_buf(), e.to_string()))?
            .decode()
            .map_err(|e| EyeDiseaseError::ImageLoadError(path.to_path_buf(), e.to_string()))?;

        Ok(self.apply(&image))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn test_output_shape_after_resize() {
        let transform = ImageTransform::default();
        let img = DynamicImage::new_rgb8(100, 60);
        let tensor = transform.apply(&img);
        assert_eq!(tensor.len(), 3 * 256 * 256);
        assert_eq!(tensor.len(), transform.output_len());
    }

    #[test]
    fn test_channel_normalization() {
        let transform = ImageTransform::with_image_size(4);
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 4, Rgb([255, 0, 128])));
        let tensor = transform.apply(&img);

        let plane = 16;
        let red = (1.0 - IMAGENET_MEAN[0]) / IMAGENET_STD[0];
        let green = (0.0 - IMAGENET_MEAN[1]) / IMAGENET_STD[1];
        let blue = (128.0 / 255.0 - IMAGENET_MEAN[2]) / IMAGENET_STD[2];

        assert!((tensor[0] - red).abs() < 1e-5);
        assert!((tensor[plane] - green).abs() < 1e-5);
        assert!((tensor[2 * plane + 5] - blue).abs() < 1e-5);
    }

    #[test]
    fn test_load_missing_file() {
        let transform = ImageTransform::default();
        let err = transform.load(Path::new("/nonexistent/eye.png")).unwrap_err();
        assert!(matches!(err, EyeDiseaseError::ImageLoadError(_, _)));
    }
}
