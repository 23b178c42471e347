//! Logging Module
//!
//! Structured logging with the `tracing` crate plus a small epoch logger
//! used by the training loop.

use std::time::Instant;

use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Logging configuration
///
/// `RUST_LOG`, when set, takes precedence over `level`.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Level for this crate's own events
    pub level: Level,
    /// Level for dependencies (Burn, image decoders, ...)
    pub dependency_level: Level,
    /// Print the module path of each event
    pub show_target: bool,
    /// Colored output
    pub ansi: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            dependency_level: Level::WARN,
            show_target: false,
            ansi: true,
        }
    }
}

impl LogConfig {
    /// Debug output from this crate, with module paths
    pub fn verbose() -> Self {
        Self {
            level: Level::DEBUG,
            show_target: true,
            ..Self::default()
        }
    }

    /// Errors only
    pub fn quiet() -> Self {
        Self {
            level: Level::ERROR,
            dependency_level: Level::ERROR,
            ..Self::default()
        }
    }

    /// Filter directive equivalent to this config
    pub fn directive(&self) -> String {
        format!(
            "{},{}={}",
            self.dependency_level.as_str().to_lowercase(),
            env!("CARGO_CRATE_NAME"),
            self.level.as_str().to_lowercase()
        )
    }
}

/// Initialize the global tracing subscriber
///
/// Fails if a global subscriber has already been installed.
pub fn init_logging(config: &LogConfig) -> Result<(), String> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config.directive()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(config.ansi)
        .with_target(config.show_target)
        .compact()
        .try_init()
        .map_err(|e| format!("Failed to initialize logging: {}", e))
}

/// Per-epoch timing and summary logger
pub struct TrainingLogger {
    epoch: usize,
    total_epochs: usize,
    epoch_start: Instant,
    training_start: Instant,
}

impl TrainingLogger {
    /// Create a new training logger
    pub fn new(total_epochs: usize) -> Self {
        Self {
            epoch: 0,
            total_epochs,
            epoch_start: Instant::now(),
            training_start: Instant::now(),
        }
    }

    /// Log start of an epoch (0-indexed)
    pub fn start_epoch(&mut self, epoch: usize) {
        self.epoch = epoch;
        self.epoch_start = Instant::now();

        tracing::debug!("Epoch {}/{} started", epoch + 1, self.total_epochs);
    }

    /// Log end of an epoch with its four scalars
    pub fn end_epoch(&self, train_loss: f64, train_acc: f64, test_loss: f64, test_acc: f64) {
        let epoch_time = self.epoch_start.elapsed().as_secs_f64();
        let total_time = self.training_start.elapsed().as_secs_f64();

        let epochs_remaining = self.total_epochs.saturating_sub(self.epoch + 1);
        let eta_secs = epochs_remaining as f64 * total_time / (self.epoch + 1) as f64;

        tracing::info!(
            epoch = self.epoch + 1,
            train_loss,
            train_acc,
            test_loss,
            test_acc,
            "Epoch {}/{} completed in {:.1}s | ETA: {:.0}s",
            self.epoch + 1,
            self.total_epochs,
            epoch_time,
            eta_secs
        );
    }

    /// Log training completion
    pub fn log_complete(&self) {
        tracing::info!(
            "Training complete! {} epochs in {:.1}s",
            self.total_epochs,
            self.training_start.elapsed().as_secs_f64()
        );
    }
}
