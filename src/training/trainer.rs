//! Epoch-level training loop
//!
//! Each epoch runs a train phase on the autodiff backend (forward, loss,
//! backward, one Adam step per batch) and then an evaluation phase on the
//! inner backend through `valid()`. Both phases aggregate the mean batch loss
//! and the accuracy over all predictions of the phase.

use burn::{
    module::AutodiffModule,
    nn::loss::CrossEntropyLossConfig,
    optim::{AdamConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::{backend::AutodiffBackend, ElementConversion},
};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::dataset::BatchLoader;
use crate::model::EyeDiseaseClassifier;
use crate::utils::error::Result;
use crate::utils::logging::TrainingLogger;
use crate::utils::metrics::EpochAccumulator;

/// Adam epsilon; Burn defaults to 1e-5
pub const ADAM_EPSILON: f32 = 1e-8;

/// Settings of the epoch loop
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainerOptions {
    pub epochs: usize,
    pub learning_rate: f64,
    /// Draw indicatif bars and colored epoch lines
    pub show_progress: bool,
}

/// Per-epoch scalars of a run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingHistory {
    pub train_losses: Vec<f64>,
    pub test_losses: Vec<f64>,
    pub train_accuracies: Vec<f64>,
    pub test_accuracies: Vec<f64>,
}

impl TrainingHistory {
    /// Number of completed epochs
    pub fn epochs(&self) -> usize {
        self.train_losses.len()
    }

    fn push(&mut self, train: &EpochAccumulator, test: &EpochAccumulator) {
        self.train_losses.push(train.mean_loss());
        self.train_accuracies.push(train.accuracy());
        self.test_losses.push(test.mean_loss());
        self.test_accuracies.push(test.accuracy());
    }
}

/// Flatten an integer tensor of class indices into host labels
pub fn to_labels<B: Backend, const D: usize>(tensor: Tensor<B, D, Int>) -> Vec<usize> {
    tensor
        .into_data()
        .iter::<i64>()
        .map(|v| v.max(0) as usize)
        .collect()
}

/// Argmax over the class dimension of `[B, C]` logits
pub fn predicted_labels<B: Backend>(logits: Tensor<B, 2>) -> Vec<usize> {
    to_labels(logits.argmax(1))
}

fn phase_bar(len: usize, label: &str, visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }

    let bar = ProgressBar::new(len as u64);
    let style = ProgressStyle::default_bar()
        .template("  {msg:>5} [{bar:30.cyan/blue}] {pos}/{len} batches")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=>-");
    bar.set_style(style);
    bar.set_message(label.to_string());
    bar
}

/// Run one training pass and return the updated model with its phase record
pub fn train_epoch<B, O>(
    mut model: EyeDiseaseClassifier<B>,
    optimizer: &mut O,
    loader: &mut BatchLoader,
    learning_rate: f64,
    device: &B::Device,
    progress: &ProgressBar,
) -> Result<(EyeDiseaseClassifier<B>, EpochAccumulator)>
where
    B: AutodiffBackend,
    O: Optimizer<EyeDiseaseClassifier<B>, B>,
{
    let mut record = EpochAccumulator::new();
    let loss_fn = CrossEntropyLossConfig::new().init(device);

    for batch in loader.iter::<B>(device) {
        let batch = batch?;
        let targets = to_labels(batch.targets.clone());

        let logits = model.forward(batch.images);
        let loss = loss_fn.forward(logits.clone(), batch.targets);
        let loss_value: f64 = loss.clone().into_scalar().elem();
        let predictions = predicted_labels(logits.detach());

        let grads = GradientsParams::from_grads(loss.backward(), &model);
        model = optimizer.step(learning_rate, model, grads);

        record.record(loss_value, &predictions, &targets);
        progress.inc(1);
        debug!(loss = loss_value, batch = record.num_batches(), "train batch");
    }

    Ok((model, record))
}

/// Run one evaluation pass without gradient tracking
pub fn evaluate_epoch<B: Backend>(
    model: &EyeDiseaseClassifier<B>,
    loader: &mut BatchLoader,
    device: &B::Device,
    progress: &ProgressBar,
) -> Result<EpochAccumulator> {
    let mut record = EpochAccumulator::new();
    let loss_fn = CrossEntropyLossConfig::new().init(device);

    for batch in loader.iter::<B>(device) {
        let batch = batch?;
        let targets = to_labels(batch.targets.clone());

        let logits = model.forward(batch.images);
        let loss = loss_fn.forward(logits.clone(), batch.targets);
        let loss_value: f64 = loss.into_scalar().elem();

        record.record(loss_value, &predicted_labels(logits), &targets);
        progress.inc(1);
    }

    Ok(record)
}

/// Adam with PyTorch's default epsilon
pub fn adam_config() -> AdamConfig {
    AdamConfig::new().with_epsilon(ADAM_EPSILON)
}

/// Train for `options.epochs` epochs with Adam at a constant learning rate
pub fn fit<B: AutodiffBackend>(
    mut model: EyeDiseaseClassifier<B>,
    train_loader: &mut BatchLoader,
    test_loader: &mut BatchLoader,
    options: &TrainerOptions,
    device: &B::Device,
) -> Result<(EyeDiseaseClassifier<B>, TrainingHistory)> {
    let mut optimizer = adam_config().init::<B, EyeDiseaseClassifier<B>>();
    let mut history = TrainingHistory::default();
    let mut logger = TrainingLogger::new(options.epochs);

    for epoch in 0..options.epochs {
        logger.start_epoch(epoch);
        if options.show_progress {
            println!(
                "{}",
                format!("Epoch {}/{}", epoch + 1, options.epochs).yellow().bold()
            );
        }

        let bar = phase_bar(train_loader.num_batches(), "train", options.show_progress);
        let (trained, train_record) = train_epoch(
            model,
            &mut optimizer,
            train_loader,
            options.learning_rate,
            device,
            &bar,
        )?;
        bar.finish_and_clear();
        model = trained;

        let bar = phase_bar(test_loader.num_batches(), "test", options.show_progress);
        let eval_model = model.valid();
        let test_record = evaluate_epoch(&eval_model, test_loader, device, &bar)?;
        bar.finish_and_clear();

        history.push(&train_record, &test_record);
        logger.end_epoch(
            train_record.mean_loss(),
            train_record.accuracy(),
            test_record.mean_loss(),
            test_record.accuracy(),
        );

        if options.show_progress {
            println!(
                "  {} Train Loss: {:.4} | Train Acc: {:.2}% | Test Loss: {:.4} | Test Acc: {:.2}%",
                "→".cyan(),
                train_record.mean_loss(),
                train_record.accuracy() * 100.0,
                test_record.mean_loss(),
                test_record.accuracy() * 100.0
            );
        }
    }

    logger.log_complete();
    Ok((model, history))
}
