//! Run Configuration Module
//!
//! Hyperparameters and paths for one training run. Defaults hold the fixed
//! values of the pipeline; the CLI or a JSON file may override any field.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::cnn::{flattened_features, EyeDiseaseClassifierConfig};
use crate::dataset::split::{SplitConfig, DEFAULT_SPLIT_SEED, DEFAULT_TRAIN_RATIO};
use crate::dataset::{default_class_names, ImageTransform};
use crate::utils::error::Result;
use crate::IMAGE_SIZE;

/// Default number of samples per batch
pub const DEFAULT_BATCH_SIZE: usize = 32;
/// Default Adam learning rate
pub const DEFAULT_LEARNING_RATE: f64 = 0.001;
/// Default number of epochs
pub const DEFAULT_EPOCHS: usize = 10;

/// Training configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Dataset root with one folder per class
    pub data_dir: PathBuf,

    /// Directory receiving the weights, charts and reports
    pub output_dir: PathBuf,

    /// Class vocabulary (index = label)
    pub class_names: Vec<String>,

    /// Square image size fed to the network
    pub image_size: usize,

    /// Batch size for training and evaluation
    pub batch_size: usize,

    /// Adam learning rate (constant for the whole run)
    pub learning_rate: f64,

    /// Number of training epochs
    pub epochs: usize,

    /// Fraction of samples used for training
    pub train_ratio: f64,

    /// Seed for the train/test permutation
    pub split_seed: u64,

    /// Seed for the per-epoch shuffle of training batches
    pub shuffle_seed: u64,

    /// Number of image decoding workers (0 = decode on the training thread)
    pub num_workers: usize,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("dataset"),
            output_dir: PathBuf::from("."),
            class_names: default_class_names(),
            image_size: IMAGE_SIZE,
            batch_size: DEFAULT_BATCH_SIZE,
            learning_rate: DEFAULT_LEARNING_RATE,
            epochs: DEFAULT_EPOCHS,
            train_ratio: DEFAULT_TRAIN_RATIO,
            split_seed: DEFAULT_SPLIT_SEED,
            shuffle_seed: DEFAULT_SPLIT_SEED,
            num_workers: 0,
        }
    }
}

impl TrainingConfig {
    /// Validate the configuration
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.class_names.is_empty() {
            return Err("class_names must not be empty".to_string());
        }

        let mut unique = self.class_names.clone();
        unique.sort();
        unique.dedup();
        if unique.len() != self.class_names.len() {
            return Err("class_names must not contain duplicates".to_string());
        }

        if flattened_features(self.image_size) == 0 {
            return Err(format!(
                "image_size {} is too small for three conv stages",
                self.image_size
            ));
        }

        if self.batch_size == 0 {
            return Err("batch_size must be greater than 0".to_string());
        }

        if !(self.learning_rate > 0.0 && self.learning_rate.is_finite()) {
            return Err("learning_rate must be a positive number".to_string());
        }

        if !(self.train_ratio > 0.0 && self.train_ratio < 1.0) {
            return Err("train_ratio must be in range (0.0, 1.0)".to_string());
        }

        Ok(())
    }

    /// Number of output classes
    pub fn num_classes(&self) -> usize {
        self.class_names.len()
    }

    /// Model architecture matching this run
    pub fn model_config(&self) -> EyeDiseaseClassifierConfig {
        EyeDiseaseClassifierConfig::new()
            .with_num_classes(self.num_classes())
            .with_input_size(self.image_size)
    }

    /// Train/test split settings
    pub fn split_config(&self) -> SplitConfig {
        SplitConfig {
            train_ratio: self.train_ratio,
            seed: self.split_seed,
        }
    }

    /// Preprocessing for this run
    pub fn transform(&self) -> ImageTransform {
        ImageTransform::with_image_size(self.image_size)
    }

    /// Save configuration to a JSON file
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load configuration from a JSON file
    ///
    /// Missing fields take their default values.
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_training_config_default() {
        let config = TrainingConfig::default();
        assert_eq!(config.batch_size, 32);
        assert_eq!(config.learning_rate, 0.001);
        assert_eq!(config.epochs, 10);
        assert_eq!(config.train_ratio, 0.8);
        assert_eq!(config.split_seed, 42);
        assert_eq!(config.num_workers, 0);
        assert_eq!(config.num_classes(), 15);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_training_config_validation() {
        let mut config = TrainingConfig::default();
        config.batch_size = 0;
        assert!(config.validate().is_err());

        config = TrainingConfig::default();
        config.train_ratio = 1.0;
        assert!(config.validate().is_err());

        config = TrainingConfig::default();
        config.image_size = 32;
        assert!(config.validate().is_err());

        config = TrainingConfig::default();
        config.class_names.push("Normal".to_string());
        assert!(config.validate().is_err());

        config = TrainingConfig::default();
        config.learning_rate = -1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_model_config_follows_vocabulary() {
        let config = TrainingConfig {
            class_names: vec!["Normal".to_string(), "Cataract".to_string()],
            image_size: 96,
            ..Default::default()
        };
        let model_config = config.model_config();
        assert_eq!(model_config.num_classes, 2);
        assert_eq!(model_config.input_size, 96);
    }

    #[test]
    fn test_save_and_load_partial_json() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("train.json");

        let mut config = TrainingConfig::default();
        config.epochs = 3;
        config.save(&path).unwrap();
        assert_eq!(TrainingConfig::load(&path).unwrap(), config);

        std::fs::write(&path, r#"{ "batch_size": 8 }"#).unwrap();
        let partial = TrainingConfig::load(&path).unwrap();
        assert_eq!(partial.batch_size, 8);
        assert_eq!(partial.epochs, 10);
    }
}
