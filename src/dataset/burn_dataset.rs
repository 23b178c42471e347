//! Burn Dataset Integration
//!
//! The item type produced by the eye disease loader and the `Batcher` that
//! stacks preprocessed items into device tensors.

use burn::data::dataloader::batcher::Batcher;
use burn::prelude::*;
use serde::{Deserialize, Serialize};

/// A single preprocessed item ready for Burn
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EyeDiseaseItem {
    /// Normalized image data as flattened CHW float array [3 * H * W]
    pub image: Vec<f32>,
    /// Class label
    pub label: usize,
    /// Image path (for debugging/logging)
    pub path: String,
}

/// A batch of eye images
#[derive(Clone, Debug)]
pub struct EyeDiseaseBatch<B: Backend> {
    /// Batch of images with shape [batch_size, 3, height, width]
    pub images: Tensor<B, 4>,
    /// Batch of labels with shape [batch_size]
    pub targets: Tensor<B, 1, Int>,
}

impl<B: Backend> EyeDiseaseBatch<B> {
    /// Number of samples in the batch
    pub fn len(&self) -> usize {
        self.targets.dims()[0]
    }

    /// Check if the batch holds no samples
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Stacks items into a batch; normalization already happened in the transform
#[derive(Clone, Debug)]
pub struct EyeDiseaseBatcher {
    image_size: usize,
}

impl EyeDiseaseBatcher {
    /// Create a batcher for square images of the given size
    pub fn new(image_size: usize) -> Self {
        Self { image_size }
    }
}

impl<B: Backend> Batcher<B, EyeDiseaseItem, EyeDiseaseBatch<B>> for EyeDiseaseBatcher {
    fn batch(&self, items: Vec<EyeDiseaseItem>, device: &B::Device) -> EyeDiseaseBatch<B> {
        let batch_size = items.len();
        let size = self.image_size;

        let images_data: Vec<f32> = items
            .iter()
            .flat_map(|item| item.image.iter().copied())
            .collect();
        let images = Tensor::<B, 4>::from_floats(
            TensorData::new(images_data, [batch_size, 3, size, size]),
            device,
        );

        let targets_data: Vec<i64> = items.iter().map(|item| item.label as i64).collect();
        let targets =
            Tensor::<B, 1, Int>::from_data(TensorData::new(targets_data, [batch_size]), device);

        EyeDiseaseBatch { images, targets }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn test_batcher_shapes() {
        let device = Default::default();
        let items: Vec<EyeDiseaseItem> = (0..3)
            .map(|i| EyeDiseaseItem {
                image: vec![i as f32; 3 * 4 * 4],
                label: i,
                path: format!("img_{}.png", i),
            })
            .collect();

        let batcher = EyeDiseaseBatcher::new(4);
        let batch: EyeDiseaseBatch<TestBackend> = batcher.batch(items, &device);

        assert_eq!(batch.images.dims(), [3, 3, 4, 4]);
        assert_eq!(batch.targets.dims(), [3]);
        assert_eq!(batch.len(), 3);

        let labels: Vec<i64> = batch.targets.into_data().iter::<i64>().collect();
        assert_eq!(labels, vec![0, 1, 2]);
    }

    #[test]
    fn test_batcher_keeps_pixel_values() {
        let device = Default::default();
        let mut image = vec![0.0f32; 3 * 2 * 2];
        image[5] = 1.5;
        let items = vec![EyeDiseaseItem {
            image,
            label: 7,
            path: String::new(),
        }];

        let batch: EyeDiseaseBatch<TestBackend> = EyeDiseaseBatcher::new(2).batch(items, &device);
        let values: Vec<f32> = batch.images.into_data().iter::<f32>().collect();
        assert_eq!(values[5], 1.5);
        assert_eq!(values.iter().filter(|&&v| v != 0.0).count(), 1);
    }
}
