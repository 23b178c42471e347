//! Inference module for model prediction
//!
//! This module provides:
//! - Single image prediction from a saved model
//! - An output-shape smoke check for saved weights

pub mod predictor;

// Re-export main types for convenience
pub use predictor::{check_output_shape, PredictionResult, Predictor};
