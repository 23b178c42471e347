//! Saved model smoke check
//!
//! Loads the weights written by `eye_disease_cnn train`, pushes one random
//! image-shaped tensor through them and verifies the output is `[1, classes]`.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;

use eye_disease_cnn::backend::{ComputeDevice, DefaultBackend};
use eye_disease_cnn::inference::check_output_shape;
use eye_disease_cnn::model::load_model;
use eye_disease_cnn::utils::logging::{init_logging, LogConfig};

#[derive(Parser, Debug)]
#[command(name = "check_model")]
#[command(about = "Load a saved eye disease classifier and check its output shape")]
struct Args {
    /// Directory holding eye_disease_classifier.mpk and model_config.json
    #[arg(default_value = ".")]
    model_dir: PathBuf,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let _ = init_logging(&LogConfig::quiet());

    let device = ComputeDevice::detect()
        .to_device()
        .context("Failed to select a compute device")?;

    let (model, metadata) = load_model::<DefaultBackend>(&args.model_dir, &device)
        .with_context(|| format!("Failed to load model from {:?}", args.model_dir))?;

    let dims = check_output_shape(&model, metadata.model.input_size, &device)
        .context("Output shape check failed")?;

    println!("{} Model loaded successfully", "✓".green());
    println!("  Output shape: {:?}", dims);
    println!("  Classes: {}", metadata.class_names.join(", "));

    Ok(())
}
