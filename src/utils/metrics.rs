//! Metrics Module for Model Evaluation
//!
//! Provides the metrics reported after training:
//! - Accuracy
//! - Macro- and micro-averaged precision, recall and F1-score
//! - Confusion matrix
//! - Per-phase accumulation of losses and predictions

use serde::{Deserialize, Serialize};

/// Evaluation metrics over a full pass of the test set
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Metrics {
    /// Total number of samples evaluated
    pub total_samples: usize,

    /// Number of correct predictions
    pub correct_predictions: usize,

    /// Overall accuracy (correct / total)
    pub accuracy: f64,

    /// Average loss over all batches, if the caller recorded one
    pub loss: Option<f64>,

    /// Macro-averaged precision (unweighted mean over classes)
    pub macro_precision: f64,

    /// Macro-averaged recall
    pub macro_recall: f64,

    /// Macro-averaged F1-score
    pub macro_f1: f64,

    /// Micro-averaged precision (global TP / (TP + FP))
    pub micro_precision: f64,

    /// Micro-averaged recall
    pub micro_recall: f64,

    /// Micro-averaged F1-score
    pub micro_f1: f64,

    /// Weighted F1-score (weighted by class support)
    pub weighted_f1: f64,

    /// Per-class metrics
    pub per_class: Vec<ClassMetrics>,

    /// Confusion matrix
    pub confusion_matrix: ConfusionMatrix,
}

impl Metrics {
    /// Create new metrics from predictions and ground truth labels
    pub fn from_predictions(
        predictions: &[usize],
        ground_truth: &[usize],
        num_classes: usize,
    ) -> Self {
        assert_eq!(
            predictions.len(),
            ground_truth.len(),
            "Predictions and ground truth must have same length"
        );

        let total_samples = predictions.len();
        if total_samples == 0 {
            return Self {
                confusion_matrix: ConfusionMatrix::new(num_classes),
                ..Self::default()
            };
        }

        let confusion_matrix =
            ConfusionMatrix::from_predictions(predictions, ground_truth, num_classes);

        let correct_predictions = predictions
            .iter()
            .zip(ground_truth.iter())
            .filter(|(p, g)| p == g)
            .count();

        let accuracy = correct_predictions as f64 / total_samples as f64;

        let per_class: Vec<ClassMetrics> = (0..num_classes)
            .map(|class_idx| ClassMetrics::from_confusion_matrix(&confusion_matrix, class_idx))
            .collect();

        // Classes that never occur in either predictions or targets carry no
        // information and are left out of the macro average.
        let observed: Vec<&ClassMetrics> = per_class
            .iter()
            .filter(|m| m.true_positives + m.false_positives + m.false_negatives > 0)
            .collect();

        let macro_mean = |f: fn(&ClassMetrics) -> f64| {
            if observed.is_empty() {
                0.0
            } else {
                observed.iter().map(|&m| f(m)).sum::<f64>() / observed.len() as f64
            }
        };

        let macro_precision = macro_mean(|m| m.precision);
        let macro_recall = macro_mean(|m| m.recall);
        let macro_f1 = macro_mean(|m| m.f1);

        let tp: usize = per_class.iter().map(|m| m.true_positives).sum();
        let fp: usize = per_class.iter().map(|m| m.false_positives).sum();
        let fn_: usize = per_class.iter().map(|m| m.false_negatives).sum();

        let micro_precision = safe_ratio(tp, tp + fp);
        let micro_recall = safe_ratio(tp, tp + fn_);
        let micro_f1 = harmonic_mean(micro_precision, micro_recall);

        let total_support: usize = per_class.iter().map(|m| m.support).sum();
        let weighted_f1 = if total_support > 0 {
            per_class
                .iter()
                .map(|m| m.f1 * m.support as f64)
                .sum::<f64>()
                / total_support as f64
        } else {
            0.0
        };

        Self {
            total_samples,
            correct_predictions,
            accuracy,
            loss: None,
            macro_precision,
            macro_recall,
            macro_f1,
            micro_precision,
            micro_recall,
            micro_f1,
            weighted_f1,
            per_class,
            confusion_matrix,
        }
    }

    /// Attach an average loss
    pub fn with_loss(mut self, loss: f64) -> Self {
        self.loss = Some(loss);
        self
    }

    /// Attach class names to the per-class entries
    pub fn with_class_names(mut self, class_names: &[String]) -> Self {
        for m in &mut self.per_class {
            m.class_name = class_names.get(m.class_idx).cloned();
        }
        self
    }

    /// Pretty print metrics
    pub fn display(&self) -> String {
        let mut output = String::new();

        output.push_str("╔══════════════════════════════════════════════════════════════╗\n");
        output.push_str("║                    Evaluation Metrics                        ║\n");
        output.push_str("╠══════════════════════════════════════════════════════════════╣\n");
        output.push_str(&format!("║ Accuracy:          {:6.2}%                                  ║\n", self.accuracy * 100.0));
        output.push_str(&format!("║ Macro Precision:   {:6.2}%                                  ║\n", self.macro_precision * 100.0));
        output.push_str(&format!("║ Macro Recall:      {:6.2}%                                  ║\n", self.macro_recall * 100.0));
        output.push_str(&format!("║ Macro F1:          {:6.2}%                                  ║\n", self.macro_f1 * 100.0));
        output.push_str(&format!("║ Micro Precision:   {:6.2}%                                  ║\n", self.micro_precision * 100.0));
        output.push_str(&format!("║ Micro Recall:      {:6.2}%                                  ║\n", self.micro_recall * 100.0));
        output.push_str(&format!("║ Micro F1:          {:6.2}%                                  ║\n", self.micro_f1 * 100.0));
        output.push_str(&format!("║ Weighted F1:       {:6.2}%                                  ║\n", self.weighted_f1 * 100.0));
        output.push_str(&format!("║ Total Samples:     {:6}                                    ║\n", self.total_samples));
        output.push_str("╚══════════════════════════════════════════════════════════════╝\n");

        output
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self {
            total_samples: 0,
            correct_predictions: 0,
            accuracy: 0.0,
            loss: None,
            macro_precision: 0.0,
            macro_recall: 0.0,
            macro_f1: 0.0,
            micro_precision: 0.0,
            micro_recall: 0.0,
            micro_f1: 0.0,
            weighted_f1: 0.0,
            per_class: Vec::new(),
            confusion_matrix: ConfusionMatrix::default(),
        }
    }
}

impl std::fmt::Display for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display())
    }
}

fn safe_ratio(num: usize, den: usize) -> f64 {
    if den > 0 {
        num as f64 / den as f64
    } else {
        0.0
    }
}

fn harmonic_mean(precision: f64, recall: f64) -> f64 {
    if precision + recall > 0.0 {
        2.0 * precision * recall / (precision + recall)
    } else {
        0.0
    }
}

/// Per-class metrics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClassMetrics {
    /// Class index
    pub class_idx: usize,

    /// Class name (if available)
    pub class_name: Option<String>,

    /// True positives
    pub true_positives: usize,

    /// False positives
    pub false_positives: usize,

    /// False negatives
    pub false_negatives: usize,

    /// Precision = TP / (TP + FP)
    pub precision: f64,

    /// Recall = TP / (TP + FN)
    pub recall: f64,

    /// F1 = 2 * (precision * recall) / (precision + recall)
    pub f1: f64,

    /// Support = number of actual samples of this class
    pub support: usize,
}

impl ClassMetrics {
    /// Calculate metrics for a class from confusion matrix
    pub fn from_confusion_matrix(cm: &ConfusionMatrix, class_idx: usize) -> Self {
        let true_positives = cm.get(class_idx, class_idx);

        // Predicted as this class but actually another class
        let false_positives: usize = (0..cm.num_classes)
            .filter(|&i| i != class_idx)
            .map(|i| cm.get(i, class_idx))
            .sum();

        // Actually this class but predicted as another class
        let false_negatives: usize = (0..cm.num_classes)
            .filter(|&i| i != class_idx)
            .map(|i| cm.get(class_idx, i))
            .sum();

        let precision = safe_ratio(true_positives, true_positives + false_positives);
        let recall = safe_ratio(true_positives, true_positives + false_negatives);

        Self {
            class_idx,
            class_name: None,
            true_positives,
            false_positives,
            false_negatives,
            precision,
            recall,
            f1: harmonic_mean(precision, recall),
            support: true_positives + false_negatives,
        }
    }
}

/// Confusion Matrix for multi-class classification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    /// Number of classes
    pub num_classes: usize,

    /// Matrix data (row = actual, column = predicted)
    /// Stored as a flat vector in row-major order
    pub matrix: Vec<usize>,
}

impl Default for ConfusionMatrix {
    fn default() -> Self {
        Self::new(0)
    }
}

impl ConfusionMatrix {
    /// Create a new empty confusion matrix
    pub fn new(num_classes: usize) -> Self {
        Self {
            num_classes,
            matrix: vec![0; num_classes * num_classes],
        }
    }

    /// Create confusion matrix from predictions and ground truth
    pub fn from_predictions(
        predictions: &[usize],
        ground_truth: &[usize],
        num_classes: usize,
    ) -> Self {
        let mut cm = Self::new(num_classes);

        for (&pred, &actual) in predictions.iter().zip(ground_truth.iter()) {
            cm.add(actual, pred);
        }

        cm
    }

    /// Add a single prediction to the matrix
    pub fn add(&mut self, actual: usize, predicted: usize) {
        if actual < self.num_classes && predicted < self.num_classes {
            let idx = actual * self.num_classes + predicted;
            self.matrix[idx] += 1;
        }
    }

    /// Get the count at (actual, predicted)
    pub fn get(&self, actual: usize, predicted: usize) -> usize {
        if actual < self.num_classes && predicted < self.num_classes {
            self.matrix[actual * self.num_classes + predicted]
        } else {
            0
        }
    }

    /// Get the total count
    pub fn total(&self) -> usize {
        self.matrix.iter().sum()
    }

    /// Get the number of correct predictions (diagonal sum)
    pub fn correct(&self) -> usize {
        (0..self.num_classes).map(|i| self.get(i, i)).sum()
    }

    /// Get overall accuracy
    pub fn accuracy(&self) -> f64 {
        safe_ratio(self.correct(), self.total())
    }

    /// Largest single cell count
    pub fn max_count(&self) -> usize {
        self.matrix.iter().copied().max().unwrap_or(0)
    }

    /// Pretty print the confusion matrix
    pub fn display(&self, class_names: Option<&[String]>) -> String {
        let mut output = String::new();

        output.push_str("\nConfusion Matrix (rows=actual, cols=predicted):\n\n");

        let short = |idx: usize, width: usize| -> String {
            match class_names.and_then(|names| names.get(idx)) {
                Some(name) => name.chars().take(width).collect(),
                None => idx.to_string(),
            }
        };

        output.push_str("          ");
        for col in 0..self.num_classes {
            output.push_str(&format!("{:>6}", short(col, 5)));
        }
        output.push('\n');

        for row in 0..self.num_classes {
            output.push_str(&format!("{:>9} ", short(row, 9)));

            for col in 0..self.num_classes {
                let count = self.get(row, col);
                if row == col {
                    output.push_str(&format!("[{:>4}]", count));
                } else if count > 0 {
                    output.push_str(&format!(" {:>4} ", count));
                } else {
                    output.push_str("    . ");
                }
            }
            output.push('\n');
        }

        output.push_str(&format!("\nAccuracy: {:.2}%\n", self.accuracy() * 100.0));

        output
    }

    /// Save confusion matrix to CSV
    pub fn save_csv(&self, path: &std::path::Path, class_names: &[String]) -> std::io::Result<()> {
        let label = |idx: usize| {
            class_names
                .get(idx)
                .cloned()
                .unwrap_or_else(|| idx.to_string())
        };

        let mut content = String::from("actual\\predicted");
        for col in 0..self.num_classes {
            content.push_str(&format!(",{}", label(col)));
        }
        content.push('\n');

        for row in 0..self.num_classes {
            content.push_str(&label(row));
            for col in 0..self.num_classes {
                content.push_str(&format!(",{}", self.get(row, col)));
            }
            content.push('\n');
        }

        std::fs::write(path, content)
    }
}

impl std::fmt::Display for ConfusionMatrix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display(None))
    }
}

/// Per-phase accumulator: batch losses plus concatenated predictions and targets.
///
/// Reset at the start of every train or eval phase and consumed at its end.
#[derive(Debug, Clone, Default)]
pub struct EpochAccumulator {
    losses: Vec<f64>,
    predictions: Vec<usize>,
    targets: Vec<usize>,
}

impl EpochAccumulator {
    /// Create an empty accumulator
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one batch
    pub fn record(&mut self, loss: f64, predictions: &[usize], targets: &[usize]) {
        self.losses.push(loss);
        self.predictions.extend_from_slice(predictions);
        self.targets.extend_from_slice(targets);
    }

    /// Mean of the per-batch losses (0.0 when nothing was recorded)
    pub fn mean_loss(&self) -> f64 {
        if self.losses.is_empty() {
            0.0
        } else {
            self.losses.iter().sum::<f64>() / self.losses.len() as f64
        }
    }

    /// Accuracy over every prediction recorded in this phase
    pub fn accuracy(&self) -> f64 {
        let correct = self
            .predictions
            .iter()
            .zip(self.targets.iter())
            .filter(|(p, t)| p == t)
            .count();
        safe_ratio(correct, self.targets.len())
    }

    /// Number of batches recorded
    pub fn num_batches(&self) -> usize {
        self.losses.len()
    }

    /// Number of samples recorded
    pub fn num_samples(&self) -> usize {
        self.targets.len()
    }

    /// Concatenated predictions
    pub fn predictions(&self) -> &[usize] {
        &self.predictions
    }

    /// Concatenated targets
    pub fn targets(&self) -> &[usize] {
        &self.targets
    }

    /// Clear everything for the next phase
    pub fn reset(&mut self) {
        self.losses.clear();
        self.predictions.clear();
        self.targets.clear();
    }
}
