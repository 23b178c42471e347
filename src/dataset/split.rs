//! Seeded train/test split
//!
//! The split is a single shuffle of `0..N` with a ChaCha8 generator: the first
//! `floor(ratio * N)` indices become the training set and the rest the test
//! set. Same seed, size and ratio always give the same partition.

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::utils::error::{EyeDiseaseError, Result};

/// Default fraction of samples used for training
pub const DEFAULT_TRAIN_RATIO: f64 = 0.8;
/// Default split seed
pub const DEFAULT_SPLIT_SEED: u64 = 42;

/// Configuration for dataset splitting
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SplitConfig {
    /// Fraction of data for the training set, exclusive range (0, 1)
    pub train_ratio: f64,
    /// Random seed for reproducibility
    pub seed: u64,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            train_ratio: DEFAULT_TRAIN_RATIO,
            seed: DEFAULT_SPLIT_SEED,
        }
    }
}

impl SplitConfig {
    /// Create a validated split configuration
    pub fn new(train_ratio: f64, seed: u64) -> Result<Self> {
        let config = Self { train_ratio, seed };
        config.validate()?;
        Ok(config)
    }

    /// Check that the ratio lies strictly between 0 and 1
    pub fn validate(&self) -> Result<()> {
        if !(self.train_ratio > 0.0 && self.train_ratio < 1.0) {
            return Err(EyeDiseaseError::Config(format!(
                "train ratio must be in (0, 1), got {}",
                self.train_ratio
            )));
        }
        Ok(())
    }
}

/// Disjoint train and test index sets over a dataset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetSplit {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

impl DatasetSplit {
    /// Partition `0..len` according to `config`
    pub fn new(len: usize, config: &SplitConfig) -> Result<Self> {
        config.validate()?;

        let mut indices: Vec<usize> = (0..len).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
        indices.shuffle(&mut rng);

        let train_size = (config.train_ratio * len as f64).floor() as usize;
        let test = indices.split_off(train_size);

        Ok(Self {
            train: indices,
            test,
        })
    }

    /// Total number of indices across both sets
    pub fn total(&self) -> usize {
        self.train.len() + self.test.len()
    }
}
