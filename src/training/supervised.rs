//! Supervised Training Run
//!
//! Wires the whole pipeline together: scan the dataset, split it, train,
//! evaluate once more on the test split, then write the weights, reports and
//! charts into the output directory.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use burn::{module::AutodiffModule, tensor::backend::AutodiffBackend};
use chrono::Local;
use colored::Colorize;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::evaluation::{evaluate_model, print_summary};
use super::trainer::{fit, TrainerOptions, TrainingHistory};
use crate::dataset::{BatchLoader, BatchLoaderConfig, DatasetSplit, EyeDiseaseDataset};
use crate::model::{save_model, ModelMetadata, TrainingConfig};
use crate::utils::charts::{save_confusion_matrix, save_loss_curves};
use crate::utils::error::{EyeDiseaseError, Result};
use crate::utils::format_duration;
use crate::utils::metrics::Metrics;

pub const HISTORY_FILE: &str = "training_history.json";
pub const METRICS_FILE: &str = "metrics.json";
pub const CONFUSION_CSV_FILE: &str = "confusion_matrix.csv";
pub const CONFUSION_SVG_FILE: &str = "confusion_matrix.svg";
pub const LOSS_CURVES_FILE: &str = "loss_curves.svg";
pub const TRAINING_CONFIG_FILE: &str = "training_config.json";

/// Saved record of one run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    pub started_at: String,
    pub finished_at: String,
    pub duration_secs: f64,
    pub train_samples: usize,
    pub test_samples: usize,
    pub config: TrainingConfig,
    pub history: TrainingHistory,
}

/// What a finished run produced
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub history: TrainingHistory,
    pub metrics: Metrics,
    pub model_path: PathBuf,
}

/// Run training with the given configuration
///
/// # Type Parameters
/// * `B` - The autodiff backend to use (e.g., `Autodiff<NdArray>` or `Autodiff<Cuda>`)
pub fn run_training<B: AutodiffBackend>(
    config: &TrainingConfig,
    device: &B::Device,
    show_progress: bool,
) -> Result<TrainingOutcome> {
    config.validate().map_err(EyeDiseaseError::Config)?;

    let started_at = Local::now();
    let clock = Instant::now();

    if show_progress {
        println!("{}", "Initializing Training...".green().bold());
        println!("  Device: {:?}", device);
    }
    std::fs::create_dir_all(&config.output_dir)?;

    // Load the dataset
    let dataset = EyeDiseaseDataset::open(
        &config.data_dir,
        config.class_names.clone(),
        config.transform(),
    )?;
    if show_progress {
        dataset.get_stats().print();
    }
    if dataset.is_empty() {
        return Err(EyeDiseaseError::Dataset(format!(
            "no images found under {:?}",
            config.data_dir
        )));
    }
    let dataset = Arc::new(dataset);

    // Split and build loaders
    let split = DatasetSplit::new(dataset.len(), &config.split_config())?;
    info!(
        train = split.train.len(),
        test = split.test.len(),
        "Dataset split created"
    );

    let train_samples = split.train.len();
    let test_samples = split.test.len();
    let mut train_loader = BatchLoader::new(
        dataset.clone(),
        split.train,
        BatchLoaderConfig::train(config.batch_size, config.num_workers, config.shuffle_seed),
    )?;
    let mut test_loader = BatchLoader::new(
        dataset,
        split.test,
        BatchLoaderConfig::test(config.batch_size, config.num_workers),
    )?;

    if show_progress {
        println!();
        println!("{}", "Training Configuration:".cyan().bold());
        println!("  🏷️  Training samples:  {}", train_samples);
        println!("  🧪 Test samples:      {}", test_samples);
        println!("  🔄 Epochs:            {}", config.epochs);
        println!("  📦 Batch size:        {}", config.batch_size);
        println!("  📈 Learning rate:     {}", config.learning_rate);
        println!("  👷 Decode workers:    {}", config.num_workers);
        println!();
        println!("{}", "Starting Training...".green().bold());
    }

    let model_config = config.model_config();
    let model = model_config.init::<B>(device);
    let options = TrainerOptions {
        epochs: config.epochs,
        learning_rate: config.learning_rate,
        show_progress,
    };
    let (model, history) = fit(model, &mut train_loader, &mut test_loader, &options, device)?;

    // Final pass on the evaluation-mode model
    let model = model.valid();
    let metrics = evaluate_model(&model, &mut test_loader, &config.class_names, device)?;

    let metadata = ModelMetadata::new(model_config, config.class_names.clone(), config.epochs);
    let model_path = save_model(&model, &metadata, &config.output_dir)?;

    let record = RunRecord {
        started_at: started_at.to_rfc3339(),
        finished_at: Local::now().to_rfc3339(),
        duration_secs: clock.elapsed().as_secs_f64(),
        train_samples,
        test_samples,
        config: config.clone(),
        history: history.clone(),
    };
    write_reports(&config.output_dir, &record, &metrics, &config.class_names)?;

    if show_progress {
        print_summary(&metrics, &config.class_names);
        println!("{}", "Training Complete!".green().bold());
        println!("  ⏱️  Duration: {}", format_duration(record.duration_secs));
        println!("  💾 Model saved to: {:?}", model_path);
        println!();
    }

    Ok(TrainingOutcome {
        history,
        metrics,
        model_path,
    })
}

/// Write history, metrics, confusion matrix and charts into `dir`
///
/// The run configuration is saved on its own so it can be passed back with
/// `train --config`.
pub fn write_reports(
    dir: &Path,
    record: &RunRecord,
    metrics: &Metrics,
    class_names: &[String],
) -> Result<()> {
    record.config.save(&dir.join(TRAINING_CONFIG_FILE))?;
    std::fs::write(dir.join(HISTORY_FILE), serde_json::to_string_pretty(record)?)?;
    std::fs::write(dir.join(METRICS_FILE), serde_json::to_string_pretty(metrics)?)?;

    metrics
        .confusion_matrix
        .save_csv(&dir.join(CONFUSION_CSV_FILE), class_names)?;
    save_confusion_matrix(
        &metrics.confusion_matrix,
        class_names,
        &dir.join(CONFUSION_SVG_FILE),
    )?;
    save_loss_curves(
        &record.history.train_losses,
        &record.history.test_losses,
        &dir.join(LOSS_CURVES_FILE),
    )?;

    info!("Reports written to {:?}", dir);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::{Autodiff, NdArray};
    use tempfile::TempDir;

    type TestBackend = Autodiff<NdArray>;

    #[test]
    fn test_invalid_config_rejected_before_loading() {
        let temp = TempDir::new().unwrap();
        let config = TrainingConfig {
            data_dir: temp.path().join("missing"),
            output_dir: temp.path().to_path_buf(),
            batch_size: 0,
            ..Default::default()
        };
        let device = Default::default();
        let err = run_training::<TestBackend>(&config, &device, false).unwrap_err();
        assert!(matches!(err, EyeDiseaseError::Config(_)));
    }

    #[test]
    fn test_missing_dataset_is_not_found() {
        let temp = TempDir::new().unwrap();
        let config = TrainingConfig {
            data_dir: temp.path().join("missing"),
            output_dir: temp.path().join("out"),
            ..Default::default()
        };
        let device = Default::default();
        let err = run_training::<TestBackend>(&config, &device, false).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_write_reports_creates_files() {
        let temp = TempDir::new().unwrap();
        let names = vec!["Normal".to_string(), "Stye".to_string()];
        let metrics = Metrics::from_predictions(&[0, 1, 1], &[0, 1, 0], 2).with_class_names(&names);
        let record = RunRecord {
            started_at: Local::now().to_rfc3339(),
            finished_at: Local::now().to_rfc3339(),
            duration_secs: 1.0,
            train_samples: 12,
            test_samples: 3,
            config: TrainingConfig::default(),
            history: TrainingHistory {
                train_losses: vec![0.9, 0.6],
                test_losses: vec![1.0, 0.8],
                train_accuracies: vec![0.5, 0.7],
                test_accuracies: vec![0.4, 0.6],
            },
        };

        write_reports(temp.path(), &record, &metrics, &names).unwrap();

        for file in [
            HISTORY_FILE,
            METRICS_FILE,
            CONFUSION_CSV_FILE,
            CONFUSION_SVG_FILE,
            LOSS_CURVES_FILE,
            TRAINING_CONFIG_FILE,
        ] {
            assert!(temp.path().join(file).exists(), "{} missing", file);
        }

        let saved = TrainingConfig::load(&temp.path().join(TRAINING_CONFIG_FILE)).unwrap();
        assert_eq!(saved, record.config);

        let json = std::fs::read_to_string(temp.path().join(HISTORY_FILE)).unwrap();
        let restored: RunRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.history, record.history);
    }
}
