//! Inference Predictor Module
//!
//! Loads a saved classifier together with its vocabulary and classifies
//! single image files with the same preprocessing used during training.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use burn::prelude::*;
use burn::tensor::Distribution;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::dataset::ImageTransform;
use crate::model::checkpoint::{load_model, ModelMetadata};
use crate::model::EyeDiseaseClassifier;
use crate::utils::error::{EyeDiseaseError, Result};

/// Number of ranked classes kept in a prediction
pub const DEFAULT_TOP_K: usize = 5;

/// Result of a single prediction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionResult {
    /// Path to the input image (if applicable)
    pub image_path: Option<PathBuf>,

    /// Predicted class index
    pub predicted_class: usize,

    /// Predicted class name
    pub class_name: String,

    /// Probability of the predicted class
    pub confidence: f32,

    /// Full probability distribution over all classes
    pub probabilities: Vec<f32>,

    /// Highest-probability classes, best first
    pub top_k: Vec<(usize, String, f32)>,

    /// Inference time in milliseconds
    pub inference_time_ms: f64,
}

impl PredictionResult {
    /// Build a result from a probability vector
    pub fn new(
        probabilities: Vec<f32>,
        class_names: &[String],
        top_k: usize,
        inference_time: Duration,
        image_path: Option<PathBuf>,
    ) -> Self {
        let name_of = |idx: usize| {
            class_names
                .get(idx)
                .cloned()
                .unwrap_or_else(|| "Unknown".to_string())
        };

        let mut ranked: Vec<(usize, f32)> = probabilities.iter().copied().enumerate().collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));

        let (predicted_class, confidence) = ranked.first().copied().unwrap_or((0, 0.0));
        let top_k = ranked
            .iter()
            .take(top_k)
            .map(|&(idx, prob)| (idx, name_of(idx), prob))
            .collect();

        Self {
            image_path,
            predicted_class,
            class_name: name_of(predicted_class),
            confidence,
            probabilities,
            top_k,
            inference_time_ms: inference_time.as_secs_f64() * 1000.0,
        }
    }

    /// Pretty print the prediction result
    pub fn display(&self) -> String {
        let mut output = String::new();

        if let Some(path) = &self.image_path {
            output.push_str(&format!("Image: {:?}\n", path));
        }

        output.push_str(&format!(
            "Prediction: {} (class {})\n",
            self.class_name, self.predicted_class
        ));
        output.push_str(&format!("Confidence: {:.2}%\n", self.confidence * 100.0));
        output.push_str(&format!("Inference time: {:.2} ms\n", self.inference_time_ms));

        output.push_str(&format!("\nTop-{} predictions:\n", self.top_k.len()));
        for (i, (idx, name, prob)) in self.top_k.iter().enumerate() {
            output.push_str(&format!(
                "  {}. {} (class {}) - {:.2}%\n",
                i + 1,
                name,
                idx,
                prob * 100.0
            ));
        }

        output
    }
}

/// Predictor for running inference with a trained model
pub struct Predictor<B: Backend> {
    model: EyeDiseaseClassifier<B>,
    metadata: ModelMetadata,
    transform: ImageTransform,
    device: B::Device,
    top_k: usize,
}

impl<B: Backend> Predictor<B> {
    /// Load the model saved in `model_dir`
    pub fn load(model_dir: &Path, device: &B::Device) -> Result<Self> {
        let (model, metadata) = load_model::<B>(model_dir, device)?;
        Ok(Self::from_model(model, metadata, device))
    }

    /// Wrap an in-memory model
    pub fn from_model(
        model: EyeDiseaseClassifier<B>,
        metadata: ModelMetadata,
        device: &B::Device,
    ) -> Self {
        let transform = ImageTransform::with_image_size(metadata.model.input_size);
        Self {
            model,
            metadata,
            transform,
            device: device.clone(),
            top_k: DEFAULT_TOP_K,
        }
    }

    /// Change the number of ranked classes reported
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn class_names(&self) -> &[String] {
        &self.metadata.class_names
    }

    /// Classify one image file
    pub fn predict_file(&self, path: &Path) -> Result<PredictionResult> {
        let pixels = self.transform.load(path)?;
        let mut result = self.predict_pixels(pixels)?;
        result.image_path = Some(path.to_path_buf());
        Ok(result)
    }

    /// Classify one preprocessed CHW image
    pub fn predict_pixels(&self, pixels: Vec<f32>) -> Result<PredictionResult> {
        if pixels.len() != self.transform.output_len() {
            return Err(EyeDiseaseError::InvalidInput(format!(
                "expected {} values, got {}",
                self.transform.output_len(),
                pixels.len()
            )));
        }

        let size = self.transform.image_size;
        let start = Instant::now();
        let input = Tensor::<B, 4>::from_floats(TensorData::new(pixels, [1, 3, size, size]), &self.device);
        let probabilities: Vec<f32> = self
            .model
            .forward_softmax(input)
            .into_data()
            .iter::<f32>()
            .collect();
        let elapsed = start.elapsed();

        debug!("Inference took {:.2} ms", elapsed.as_secs_f64() * 1000.0);
        Ok(PredictionResult::new(
            probabilities,
            &self.metadata.class_names,
            self.top_k,
            elapsed,
            None,
        ))
    }
}

/// Run one random `[1, 3, size, size]` input through `model` and check that the
/// output is `[1, num_classes]`
pub fn check_output_shape<B: Backend>(
    model: &EyeDiseaseClassifier<B>,
    input_size: usize,
    device: &B::Device,
) -> Result<[usize; 2]> {
    let input = Tensor::<B, 4>::random([1, 3, input_size, input_size], Distribution::Default, device);
    let dims = model.forward(input).dims();
    let expected = [1, model.num_classes()];

    if dims != expected {
        return Err(EyeDiseaseError::Model(format!(
            "unexpected output shape {:?}, expected {:?}",
            dims, expected
        )));
    }
    Ok(dims)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::checkpoint::save_model;
    use crate::model::EyeDiseaseClassifierConfig;
    use burn::backend::NdArray;
    use image::{ImageBuffer, Rgb};
    use tempfile::TempDir;

    type TestBackend = NdArray;

    fn names() -> Vec<String> {
        ["Cataract", "Glaucoma", "Normal"].iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_prediction_result_ranking() {
        let result = PredictionResult::new(
            vec![0.2, 0.7, 0.1],
            &names(),
            2,
            Duration::from_millis(3),
            None,
        );

        assert_eq!(result.predicted_class, 1);
        assert_eq!(result.class_name, "Glaucoma");
        assert!((result.confidence - 0.7).abs() < 1e-6);
        assert_eq!(result.top_k.len(), 2);
        assert_eq!(result.top_k[1].0, 0);
        assert!(result.display().contains("Glaucoma"));
    }

    #[test]
    fn test_predict_file_from_saved_model() {
        let temp = TempDir::new().unwrap();
        let device = Default::default();
        let config = EyeDiseaseClassifierConfig::new()
            .with_num_classes(3)
            .with_input_size(96);
        let model = config.init::<TestBackend>(&device);
        save_model(&model, &ModelMetadata::new(config, names(), 0), temp.path()).unwrap();

        let image_path = temp.path().join("eye.png");
        ImageBuffer::from_fn(40, 30, |x, y| Rgb([x as u8 * 5, y as u8 * 5, 128]))
            .save(&image_path)
            .unwrap();

        let predictor = Predictor::<TestBackend>::load(temp.path(), &device).unwrap();
        let result = predictor.predict_file(&image_path).unwrap();

        assert_eq!(result.probabilities.len(), 3);
        assert!((result.probabilities.iter().sum::<f32>() - 1.0).abs() < 1e-4);
        assert!(result.predicted_class < 3);
        assert_eq!(result.image_path.as_deref(), Some(image_path.as_path()));
    }

    #[test]
    fn test_wrong_pixel_count_rejected() {
        let device = Default::default();
        let config = EyeDiseaseClassifierConfig::new().with_input_size(96);
        let model = config.init::<TestBackend>(&device);
        let predictor =
            Predictor::from_model(model, ModelMetadata::new(config, names(), 0), &device);

        assert!(predictor.predict_pixels(vec![0.0; 10]).is_err());
    }

    #[test]
    fn test_predict_pixels_matches_model_softmax() {
        let device = Default::default();
        let config = EyeDiseaseClassifierConfig::new()
            .with_num_classes(3)
            .with_input_size(64);
        let model = config.init::<TestBackend>(&device);
        let pixels: Vec<f32> = (0..3 * 64 * 64).map(|i| (i % 17) as f32 / 17.0).collect();

        let input = Tensor::<TestBackend, 4>::from_floats(
            TensorData::new(pixels.clone(), [1, 3, 64, 64]),
            &device,
        );
        let expected: Vec<f32> = model.forward_softmax(input).into_data().iter::<f32>().collect();

        let predictor =
            Predictor::from_model(model, ModelMetadata::new(config, names(), 0), &device);
        let result = predictor.predict_pixels(pixels).unwrap();

        assert_eq!(result.probabilities.len(), 3);
        for (got, want) in result.probabilities.iter().zip(&expected) {
            assert!((got - want).abs() < 1e-6);
        }
    }

    #[test]
    fn test_check_output_shape() {
        let device = Default::default();
        let model = EyeDiseaseClassifierConfig::new().init::<TestBackend>(&device);
        assert_eq!(check_output_shape(&model, 256, &device).unwrap(), [1, 15]);
    }
}
