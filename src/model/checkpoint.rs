//! Model persistence
//!
//! Weights are written with Burn's named MessagePack recorder at full
//! precision so a reload reproduces the exact logits. A small JSON file next
//! to them records the architecture and the class vocabulary.

use std::path::{Path, PathBuf};

use burn::module::Module;
use burn::record::{FullPrecisionSettings, NamedMpkFileRecorder};
use burn::tensor::backend::Backend;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::cnn::{EyeDiseaseClassifier, EyeDiseaseClassifierConfig};
use crate::utils::error::{EyeDiseaseError, Result};

/// File stem of the saved weights (the recorder appends `.mpk`)
pub const MODEL_FILE_STEM: &str = "eye_disease_classifier";
/// Architecture and vocabulary description saved with the weights
pub const MODEL_CONFIG_FILE: &str = "model_config.json";

type Recorder = NamedMpkFileRecorder<FullPrecisionSettings>;

/// Everything needed to rebuild a saved classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub model: EyeDiseaseClassifierConfig,
    pub class_names: Vec<String>,
    pub epochs_trained: usize,
    pub saved_at: String,
}

impl ModelMetadata {
    pub fn new(
        model: EyeDiseaseClassifierConfig,
        class_names: Vec<String>,
        epochs_trained: usize,
    ) -> Self {
        Self {
            model,
            class_names,
            epochs_trained,
            saved_at: chrono::Local::now().to_rfc3339(),
        }
    }
}

/// Path of the weights file inside `dir`, including the extension
pub fn weights_path(dir: &Path) -> PathBuf {
    dir.join(format!("{}.mpk", MODEL_FILE_STEM))
}

/// Save weights and metadata into `dir`; returns the weights path
pub fn save_model<B: Backend>(
    model: &EyeDiseaseClassifier<B>,
    metadata: &ModelMetadata,
    dir: &Path,
) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;

    let recorder = Recorder::new();
    model
        .clone()
        .save_file(dir.join(MODEL_FILE_STEM), &recorder)
        .map_err(|e| EyeDiseaseError::Model(format!("failed to save weights: {:?}", e)))?;

    let json = serde_json::to_string_pretty(metadata)?;
    std::fs::write(dir.join(MODEL_CONFIG_FILE), json)?;

    let path = weights_path(dir);
    info!("Model saved to {:?}", path);
    Ok(path)
}

/// Read only the metadata of a saved model
pub fn load_metadata(dir: &Path) -> Result<ModelMetadata> {
    let path = dir.join(MODEL_CONFIG_FILE);
    if !path.exists() {
        return Err(EyeDiseaseError::PathNotFound(path));
    }
    let json = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&json)?)
}

/// Rebuild a saved classifier from `dir` on `device`
pub fn load_model<B: Backend>(
    dir: &Path,
    device: &B::Device,
) -> Result<(EyeDiseaseClassifier<B>, ModelMetadata)> {
    let metadata = load_metadata(dir)?;

    let weights = weights_path(dir);
    if !weights.exists() {
        return Err(EyeDiseaseError::PathNotFound(weights));
    }

    let recorder = Recorder::new();
    let model = EyeDiseaseClassifier::<B>::new(&metadata.model, device)
        .load_file(dir.join(MODEL_FILE_STEM), &recorder, device)
        .map_err(|e| EyeDiseaseError::Model(format!("failed to load weights: {:?}", e)))?;

    info!(
        "Loaded model with {} classes from {:?}",
        metadata.class_names.len(),
        dir
    );
    Ok((model, metadata))
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use burn::tensor::{Distribution, Tensor};
    use tempfile::TempDir;

    type TestBackend = NdArray;

    #[test]
    fn test_round_trip_gives_identical_logits() {
        let temp = TempDir::new().unwrap();
        let device = Default::default();
        let config = EyeDiseaseClassifierConfig::new()
            .with_num_classes(3)
            .with_input_size(96);
        let model = config.init::<TestBackend>(&device);

        let names = vec!["Normal".to_string(), "Stye".to_string(), "Uveitis".to_string()];
        let metadata = ModelMetadata::new(config, names.clone(), 1);
        let path = save_model(&model, &metadata, temp.path()).unwrap();
        assert!(path.exists());
        assert!(temp.path().join(MODEL_CONFIG_FILE).exists());

        let (restored, restored_meta) = load_model::<TestBackend>(temp.path(), &device).unwrap();
        assert_eq!(restored_meta.class_names, names);
        assert_eq!(restored.num_classes(), 3);

        let input = Tensor::<TestBackend, 4>::random([2, 3, 96, 96], Distribution::Default, &device);
        let before: Vec<f32> = model.forward(input.clone()).into_data().iter::<f32>().collect();
        let after: Vec<f32> = restored.forward(input).into_data().iter::<f32>().collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_load_missing_model() {
        let temp = TempDir::new().unwrap();
        let device = Default::default();
        let err = load_model::<TestBackend>(temp.path(), &device).unwrap_err();
        assert!(err.is_not_found());
    }
}
