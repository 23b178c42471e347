//! Model module for the CNN classifier using the Burn framework
//!
//! This module provides:
//! - The three-stage CNN architecture
//! - Run configuration and hyperparameters
//! - Model serialization and loading utilities

pub mod checkpoint;
pub mod cnn;
pub mod config;

// Re-export main types for convenience
pub use checkpoint::{load_model, save_model, ModelMetadata};
pub use cnn::{EyeDiseaseClassifier, EyeDiseaseClassifierConfig};
pub use config::TrainingConfig;
