//! Eye Disease CNN CLI
//!
//! Entry point for training the eye disease classifier, classifying images
//! with a saved model and inspecting a dataset folder.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing::{info, warn};
use walkdir::WalkDir;

use eye_disease_cnn::backend::{BackendDevice, ComputeDevice, DefaultBackend, TrainingBackend};
use eye_disease_cnn::dataset::loader::is_image_file;
use eye_disease_cnn::dataset::{DatasetSplit, EyeDiseaseDataset};
use eye_disease_cnn::model::TrainingConfig;
use eye_disease_cnn::utils::logging::{init_logging, LogConfig};
use eye_disease_cnn::Predictor;

/// Eye Disease Classification
///
/// Trains a three-stage CNN on a folder of labeled eye images with the Burn
/// framework and reports accuracy, precision, recall and F1.
#[derive(Parser, Debug)]
#[command(name = "eye_disease_cnn")]
#[command(version)]
#[command(about = "Eye disease image classification with Burn", long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, default_value = "false")]
    verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Train the classifier and write weights, reports and charts
    Train {
        /// JSON file with a training configuration; flags override its fields
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Path to the dataset directory
        #[arg(short, long)]
        data_dir: Option<PathBuf>,

        /// Output directory for the model and reports
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Number of training epochs
        #[arg(short, long)]
        epochs: Option<usize>,

        /// Batch size for training and evaluation
        #[arg(short, long)]
        batch_size: Option<usize>,

        /// Learning rate
        #[arg(short, long)]
        learning_rate: Option<f64>,

        /// Fraction of samples used for training (0.0-1.0, exclusive)
        #[arg(long)]
        train_ratio: Option<f64>,

        /// Random seed for the train/test split
        #[arg(long)]
        seed: Option<u64>,

        /// Number of image decoding threads (0 = none)
        #[arg(short, long)]
        workers: Option<usize>,
    },

    /// Classify an image or every image in a directory
    Predict {
        /// Path to input image or directory
        #[arg(short, long)]
        input: PathBuf,

        /// Directory holding the saved model
        #[arg(short, long, default_value = ".")]
        model_dir: PathBuf,

        /// Number of ranked classes to show
        #[arg(short, long, default_value = "5")]
        top_k: usize,
    },

    /// Show dataset statistics
    Stats {
        /// Path to the dataset directory
        #[arg(short, long, default_value = "dataset")]
        data_dir: PathBuf,

        /// Also show the train/test split sizes
        #[arg(long, default_value = "false")]
        show_split: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_config = if cli.verbose {
        LogConfig::verbose()
    } else {
        LogConfig::default()
    };
    let _ = init_logging(&log_config);

    print_banner();

    let compute = ComputeDevice::detect();
    info!("Using device: {}", compute);
    if !compute.is_gpu() {
        warn!("No GPU backend compiled in; training a 256x256 CNN on the CPU is slow");
    }
    let device = compute.to_device().context("Failed to select a compute device")?;

    match cli.command {
        Commands::Train {
            config,
            data_dir,
            output_dir,
            epochs,
            batch_size,
            learning_rate,
            train_ratio,
            seed,
            workers,
        } => {
            let mut train_config = match config {
                Some(path) => TrainingConfig::load(&path)
                    .with_context(|| format!("Failed to read config {:?}", path))?,
                None => TrainingConfig::default(),
            };

            if let Some(v) = data_dir {
                train_config.data_dir = v;
            }
            if let Some(v) = output_dir {
                train_config.output_dir = v;
            }
            if let Some(v) = epochs {
                train_config.epochs = v;
            }
            if let Some(v) = batch_size {
                train_config.batch_size = v;
            }
            if let Some(v) = learning_rate {
                train_config.learning_rate = v;
            }
            if let Some(v) = train_ratio {
                train_config.train_ratio = v;
            }
            if let Some(v) = seed {
                train_config.split_seed = v;
            }
            if let Some(v) = workers {
                train_config.num_workers = v;
            }

            cmd_train(&train_config, &device)?;
        }
        Commands::Predict {
            input,
            model_dir,
            top_k,
        } => {
            cmd_predict(&input, &model_dir, top_k, &device)?;
        }
        Commands::Stats {
            data_dir,
            show_split,
        } => {
            cmd_stats(&data_dir, show_split)?;
        }
    }

    Ok(())
}

fn print_banner() {
    println!(
        "{}",
        r#"
 ╔══════════════════════════════════════════════════════════════════╗
 ║   👁  Eye Disease Classification                                  ║
 ║   Convolutional network training with Burn + Rust                ║
 ╚══════════════════════════════════════════════════════════════════╝
  "#
        .green()
    );
}

fn cmd_train(config: &TrainingConfig, device: &BackendDevice) -> Result<()> {
    info!("Training with data from {:?}", config.data_dir);

    let outcome = eye_disease_cnn::run_training::<TrainingBackend>(config, device, true)
        .context("Training failed")?;

    println!("{}", "Next steps:".cyan().bold());
    println!(
        "  • Run inference: eye_disease_cnn predict --model-dir {:?} --input <image>",
        config.output_dir
    );
    println!(
        "  • Check the weights: check_model {:?}",
        outcome.model_path
    );

    Ok(())
}

fn cmd_predict(input: &Path, model_dir: &Path, top_k: usize, device: &BackendDevice) -> Result<()> {
    let predictor = Predictor::<DefaultBackend>::load(model_dir, device)
        .with_context(|| format!("Failed to load model from {:?}", model_dir))?
        .with_top_k(top_k);

    let images: Vec<PathBuf> = if input.is_dir() {
        let mut files: Vec<PathBuf> = WalkDir::new(input)
            .min_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
            .map(|e| e.into_path())
            .filter(|p| is_image_file(p))
            .collect();
        files.sort();
        files
    } else {
        vec![input.to_path_buf()]
    };

    println!("{}", format!("Classifying {} image(s)...", images.len()).cyan());
    for path in &images {
        let result = predictor
            .predict_file(path)
            .with_context(|| format!("Failed to classify {:?}", path))?;
        println!("{}", result.display());
    }

    Ok(())
}

fn cmd_stats(data_dir: &Path, show_split: bool) -> Result<()> {
    info!("Computing dataset statistics for: {:?}", data_dir);

    let config = TrainingConfig::default();
    let dataset = EyeDiseaseDataset::open(data_dir, config.class_names.clone(), config.transform())
        .with_context(|| format!("Failed to open dataset {:?}", data_dir))?;
    let stats = dataset.get_stats();
    stats.print();

    if show_split {
        let split = DatasetSplit::new(stats.total_samples, &config.split_config())?;
        println!();
        println!("{}", "Train/Test Split:".yellow().bold());
        println!(
            "  🏷️  Train: {} ({:.0}%)",
            split.train.len(),
            config.train_ratio * 100.0
        );
        println!("  🧪 Test:  {}", split.test.len());
    }

    Ok(())
}
