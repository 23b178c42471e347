//! # Eye Disease CNN
//!
//! A Rust library that trains a small convolutional network to classify eye
//! photographs into 15 disease categories, using the Burn framework.
//!
//! ## Modules
//!
//! - `dataset`: Folder loading, preprocessing, seeded split and batch iteration
//! - `model`: CNN architecture, run configuration and persistence
//! - `training`: Epoch loop, final evaluation and the end-to-end run
//! - `inference`: Prediction from saved weights
//! - `utils`: Logging, metrics, charts and error types
//! - `backend`: Compile-time backend choice and runtime device selection
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use eye_disease_cnn::backend::{ComputeDevice, TrainingBackend};
//! use eye_disease_cnn::model::TrainingConfig;
//! use eye_disease_cnn::training::run_training;
//!
//! let device = ComputeDevice::detect().to_device()?;
//! let outcome = run_training::<TrainingBackend>(&TrainingConfig::default(), &device, true)?;
//! println!("test accuracy: {:.4}", outcome.metrics.accuracy);
//! ```

pub mod backend;
pub mod dataset;
pub mod inference;
pub mod model;
pub mod training;
pub mod utils;

// Re-export commonly used items for convenience
pub use dataset::{
    BatchLoader, BatchLoaderConfig, DatasetSplit, EyeDiseaseBatch, EyeDiseaseBatcher,
    EyeDiseaseDataset, EyeDiseaseItem, ImageTransform, SplitConfig, CLASS_NAMES, NUM_CLASSES,
};
pub use inference::{PredictionResult, Predictor};
pub use model::{EyeDiseaseClassifier, EyeDiseaseClassifierConfig, TrainingConfig};
pub use training::{run_training, TrainingHistory, TrainingOutcome};
pub use utils::error::{EyeDiseaseError, Result};
pub use utils::metrics::{ConfusionMatrix, Metrics};

/// Default image size fed to the network
pub const IMAGE_SIZE: usize = 256;
