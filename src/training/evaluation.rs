//! Final evaluation over the test split

use burn::prelude::*;
use colored::Colorize;
use indicatif::ProgressBar;
use tracing::info;

use super::trainer::evaluate_epoch;
use crate::dataset::BatchLoader;
use crate::model::EyeDiseaseClassifier;
use crate::utils::error::Result;
use crate::utils::metrics::Metrics;

/// Classify every test batch once and compute the full metric set
///
/// `model` should be on a non-autodiff backend so that dropout and batch-norm
/// updates are off.
pub fn evaluate_model<B: Backend>(
    model: &EyeDiseaseClassifier<B>,
    loader: &mut BatchLoader,
    class_names: &[String],
    device: &B::Device,
) -> Result<Metrics> {
    let record = evaluate_epoch(model, loader, device, &ProgressBar::hidden())?;

    let metrics = Metrics::from_predictions(record.predictions(), record.targets(), class_names.len())
        .with_loss(record.mean_loss())
        .with_class_names(class_names);

    info!(
        accuracy = metrics.accuracy,
        macro_f1 = metrics.macro_f1,
        samples = metrics.total_samples,
        "Final evaluation finished"
    );

    Ok(metrics)
}

/// Print the headline metrics and the confusion matrix
pub fn print_summary(metrics: &Metrics, class_names: &[String]) {
    println!();
    println!("{}", "Final Evaluation".cyan().bold());
    println!("  Precision: {:.4}", metrics.macro_precision);
    println!("  Recall:    {:.4}", metrics.macro_recall);
    println!("  F1 Score:  {:.4}", metrics.macro_f1);
    println!("  Accuracy:  {:.4}", metrics.accuracy);
    println!();
    println!("{}", metrics.display());
    println!("{}", metrics.confusion_matrix.display(Some(class_names)));
}
