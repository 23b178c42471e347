//! Dataset module for eye disease image data
//!
//! This module provides:
//! - Loading a class-labeled image folder from disk
//! - The fixed preprocessing transform (resize, CHW tensor, normalization)
//! - Burn `Batcher` integration
//! - A seeded train/test split
//! - Shuffled or ordered mini-batch iteration

pub mod batching;
pub mod burn_dataset;
pub mod loader;
pub mod split;
pub mod transform;

pub use batching::{BatchLoader, BatchLoaderConfig};
pub use burn_dataset::{EyeDiseaseBatch, EyeDiseaseBatcher, EyeDiseaseItem};
pub use loader::{DatasetStats, EyeDiseaseDataset, ImageSample};
pub use split::{DatasetSplit, SplitConfig};
pub use transform::ImageTransform;

/// Number of eye disease categories
pub const NUM_CLASSES: usize = 15;

/// Class vocabulary; the position of a name is its label
pub const CLASS_NAMES: [&str; NUM_CLASSES] = [
    "Blepharitis",
    "Bulging_Eyes",
    "Cataract",
    "Chalazion",
    "Conjunctivitis",
    "Crossed_Eyes",
    "Diabetic_Retinopathy",
    "Eyelid_Drooping",
    "Glaucoma",
    "Jaundice",
    "Keratitis",
    "Normal",
    "Pterygium",
    "Stye",
    "Uveitis",
];

/// The default vocabulary as owned strings
pub fn default_class_names() -> Vec<String> {
    CLASS_NAMES.iter().map(|name| name.to_string()).collect()
}

/// Get the class name for a given label index
pub fn class_name(label: usize) -> Option<&'static str> {
    CLASS_NAMES.get(label).copied()
}

/// Get the label index for a given class name
pub fn class_index(name: &str) -> Option<usize> {
    CLASS_NAMES.iter().position(|&n| n == name)
}
