//! Training module
//!
//! This module provides:
//! - The epoch loop (train phase on the autodiff backend, eval phase on the inner backend)
//! - Final evaluation with the full metric set
//! - The end-to-end supervised run that writes weights, reports and charts

pub mod evaluation;
pub mod supervised;
pub mod trainer;

pub use evaluation::evaluate_model;
pub use supervised::{run_training, TrainingOutcome};
pub use trainer::{fit, TrainerOptions, TrainingHistory};
