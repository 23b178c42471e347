//! Eye disease dataset loader
//!
//! Reads a folder laid out as `root/<class_name>/<image files>` against an
//! explicit class vocabulary. The label of an image is the position of its
//! folder name in the vocabulary, never the directory listing order.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use super::burn_dataset::EyeDiseaseItem;
use super::transform::ImageTransform;
use crate::utils::error::{EyeDiseaseError, Result};

/// File extensions recognized as images (compared lowercase)
pub const IMAGE_EXTENSIONS: [&str; 9] = [
    "jpg", "jpeg", "png", "ppm", "bmp", "pgm", "tif", "tiff", "webp",
];

/// A single image sample with its label and metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageSample {
    /// Path to the image file
    pub path: PathBuf,
    /// Class label index
    pub label: usize,
    /// Class name (e.g., "Cataract")
    pub class_name: String,
    /// Position in the dataset
    pub id: usize,
}

/// Eye disease dataset with lazy image decoding
#[derive(Debug, Clone)]
pub struct EyeDiseaseDataset {
    /// Root directory of the dataset
    pub root_dir: PathBuf,
    /// All samples, grouped by label and sorted by path within a class
    pub samples: Vec<ImageSample>,
    /// Class vocabulary (index = label)
    pub class_names: Vec<String>,
    /// Preprocessing applied when an item is accessed
    pub transform: ImageTransform,
}

impl EyeDiseaseDataset {
    /// Scan a dataset directory
    ///
    /// The directory should be structured as:
    /// ```text
    /// root_dir/
    /// ├── Blepharitis/
    /// │   ├── img001.jpg
    /// │   └── img002.jpg
    /// ├── Bulging_Eyes/
    /// │   └── ...
    /// └── ...
    /// ```
    ///
    /// Every vocabulary entry must have a folder, which is scanned
    /// recursively. Folders outside the vocabulary are skipped.
    pub fn open<P: AsRef<Path>>(
        root_dir: P,
        class_names: Vec<String>,
        transform: ImageTransform,
    ) -> Result<Self> {
        let root_dir = root_dir.as_ref().to_path_buf();
        info!("Loading eye disease dataset from: {:?}", root_dir);

        if !root_dir.is_dir() {
            return Err(EyeDiseaseError::PathNotFound(root_dir));
        }
        if class_names.is_empty() {
            return Err(EyeDiseaseError::Config(
                "class vocabulary must not be empty".to_string(),
            ));
        }

        warn_unknown_dirs(&root_dir, &class_names)?;

        let mut samples = Vec::new();
        for (label, class_name) in class_names.iter().enumerate() {
            let class_dir = root_dir.join(class_name);
            if !class_dir.is_dir() {
                return Err(EyeDiseaseError::PathNotFound(class_dir));
            }

            // Nested folders inside a class folder belong to that class
            let mut paths: Vec<PathBuf> = WalkDir::new(&class_dir)
                .min_depth(1)
                .follow_links(true)
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file())
                .map(|e| e.into_path())
                .filter(|p| is_image_file(p))
                .collect();
            paths.sort();

            debug!(
                "Class '{}' (label {}): {} images",
                class_name,
                label,
                paths.len()
            );

            for path in paths {
                let id = samples.len();
                samples.push(ImageSample {
                    path,
                    label,
                    class_name: class_name.clone(),
                    id,
                });
            }
        }

        info!(
            "Loaded {} samples across {} classes",
            samples.len(),
            class_names.len()
        );

        Ok(Self {
            root_dir,
            samples,
            class_names,
            transform,
        })
    }

    /// Get the number of samples in the dataset
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Check if the dataset is empty
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Get the number of classes
    pub fn num_classes(&self) -> usize {
        self.class_names.len()
    }

    /// Decode and preprocess the sample at `index`
    pub fn load_item(&self, index: usize) -> Result<EyeDiseaseItem> {
        let sample = self.samples.get(index).ok_or_else(|| {
            EyeDiseaseError::InvalidInput(format!(
                "sample index {} out of range for dataset of {}",
                index,
                self.samples.len()
            ))
        })?;

        let image = self.transform.load(&sample.path)?;
        Ok(EyeDiseaseItem {
            image,
            label: sample.label,
            path: sample.path.to_string_lossy().to_string(),
        })
    }

    /// Get statistics about the dataset
    pub fn get_stats(&self) -> DatasetStats {
        let mut class_counts = vec![0usize; self.num_classes()];
        for sample in &self.samples {
            class_counts[sample.label] += 1;
        }

        DatasetStats {
            total_samples: self.samples.len(),
            num_classes: self.num_classes(),
            class_counts,
            class_names: self.class_names.clone(),
        }
    }
}

/// Whether `path` has one of the recognized image extensions
pub fn is_image_file(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

fn warn_unknown_dirs(root_dir: &Path, class_names: &[String]) -> Result<()> {
    let known: HashSet<&str> = class_names.iter().map(String::as_str).collect();

    for entry in std::fs::read_dir(root_dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_string();
        if !known.contains(name.as_str()) {
            warn!("Ignoring directory '{}': not in the class vocabulary", name);
        }
    }

    Ok(())
}

/// Statistics about the dataset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetStats {
    pub total_samples: usize,
    pub num_classes: usize,
    pub class_counts: Vec<usize>,
    pub class_names: Vec<String>,
}

impl DatasetStats {
    /// Print statistics to console
    pub fn print(&self) {
        println!("\n📊 Dataset Statistics:");
        println!("  Total samples: {}", self.total_samples);
        println!("  Number of classes: {}", self.num_classes);
        println!("\n  Samples per class:");

        for (idx, (name, count)) in self.class_names.iter().zip(&self.class_counts).enumerate() {
            let bar_len = if self.total_samples > 0 {
                (*count as f32 / self.total_samples as f32 * 40.0) as usize
            } else {
                0
            };
            let bar: String = "█".repeat(bar_len);
            println!("    {:3}. {:24} {:5} {}", idx, name, count, bar);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb};
    use std::fs;
    use tempfile::TempDir;

    fn create_test_image(path: &Path, shade: u8) {
        let img = ImageBuffer::from_fn(8, 8, |x, y| {
            Rgb([shade, (x * 16) as u8, (y * 16) as u8])
        });
        img.save(path).unwrap();
    }

    fn make_class_dir(root: &Path, name: &str, count: usize) {
        let dir = root.join(name);
        fs::create_dir_all(&dir).unwrap();
        for i in 0..count {
            create_test_image(&dir.join(format!("img_{:02}.png", i)), (i * 20) as u8);
        }
    }

    #[test]
    fn test_labels_follow_vocabulary_order() {
        let temp = TempDir::new().unwrap();
        make_class_dir(temp.path(), "Normal", 2);
        make_class_dir(temp.path(), "Cataract", 3);

        // Vocabulary puts Normal first even though Cataract sorts earlier
        let vocab = vec!["Normal".to_string(), "Cataract".to_string()];
        let dataset =
            EyeDiseaseDataset::open(temp.path(), vocab, ImageTransform::with_image_size(8)).unwrap();

        assert_eq!(dataset.len(), 5);
        assert_eq!(dataset.num_classes(), 2);
        assert!(dataset.samples[..2].iter().all(|s| s.label == 0));
        assert!(dataset.samples[2..].iter().all(|s| s.label == 1));
        assert!(dataset.samples.iter().all(|s| s.label < dataset.num_classes()));
    }

    #[test]
    fn test_samples_sorted_and_non_images_skipped() {
        let temp = TempDir::new().unwrap();
        make_class_dir(temp.path(), "Stye", 3);
        fs::write(temp.path().join("Stye").join("notes.txt"), "not an image").unwrap();

        let dataset = EyeDiseaseDataset::open(
            temp.path(),
            vec!["Stye".to_string()],
            ImageTransform::with_image_size(8),
        )
        .unwrap();

        assert_eq!(dataset.len(), 3);
        let paths: Vec<_> = dataset.samples.iter().map(|s| s.path.clone()).collect();
        let mut sorted = paths.clone();
        sorted.sort();
        assert_eq!(paths, sorted);
    }

    #[test]
    fn test_nested_class_folders_are_scanned() {
        let temp = TempDir::new().unwrap();
        make_class_dir(temp.path(), "Normal", 1);
        let nested = temp.path().join("Normal").join("left_eye");
        fs::create_dir_all(&nested).unwrap();
        create_test_image(&nested.join("b.png"), 90);
        create_test_image(&nested.join("c.ppm"), 120);
        fs::write(nested.join("d.gif"), b"skipped by extension").unwrap();

        let dataset = EyeDiseaseDataset::open(
            temp.path(),
            vec!["Normal".to_string()],
            ImageTransform::with_image_size(8),
        )
        .unwrap();

        assert_eq!(dataset.len(), 3);
        assert!(dataset.samples.iter().all(|s| s.label == 0));
        assert!(dataset
            .samples
            .iter()
            .any(|s| s.path.ends_with("left_eye/b.png")));
        assert_eq!(dataset.load_item(2).unwrap().image.len(), 3 * 8 * 8);
    }

    #[test]
    fn test_image_extensions() {
        assert!(is_image_file(Path::new("scan.JPG")));
        assert!(is_image_file(Path::new("scan.pgm")));
        assert!(is_image_file(Path::new("scan.ppm")));
        assert!(!is_image_file(Path::new("scan.gif")));
        assert!(!is_image_file(Path::new("README")));
    }

    #[test]
    fn test_unknown_directories_ignored() {
        let temp = TempDir::new().unwrap();
        make_class_dir(temp.path(), "Glaucoma", 2);
        make_class_dir(temp.path(), "Myopia", 4);

        let dataset = EyeDiseaseDataset::open(
            temp.path(),
            vec!["Glaucoma".to_string()],
            ImageTransform::with_image_size(8),
        )
        .unwrap();

        assert_eq!(dataset.len(), 2);
        assert!(dataset.samples.iter().all(|s| s.class_name == "Glaucoma"));
    }

    #[test]
    fn test_missing_root_is_not_found() {
        let err = EyeDiseaseDataset::open(
            "/nonexistent/eye_dataset",
            vec!["Normal".to_string()],
            ImageTransform::default(),
        )
        .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_missing_class_dir_is_not_found() {
        let temp = TempDir::new().unwrap();
        make_class_dir(temp.path(), "Normal", 1);

        let vocab = vec!["Normal".to_string(), "Uveitis".to_string()];
        let err = EyeDiseaseDataset::open(temp.path(), vocab, ImageTransform::default()).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_load_item_and_stats() {
        let temp = TempDir::new().unwrap();
        make_class_dir(temp.path(), "Jaundice", 2);
        make_class_dir(temp.path(), "Keratitis", 1);

        let dataset = EyeDiseaseDataset::open(
            temp.path(),
            vec!["Jaundice".to_string(), "Keratitis".to_string()],
            ImageTransform::with_image_size(4),
        )
        .unwrap();

        let item = dataset.load_item(2).unwrap();
        assert_eq!(item.label, 1);
        assert_eq!(item.image.len(), 3 * 4 * 4);
        assert!(dataset.load_item(3).is_err());

        let stats = dataset.get_stats();
        assert_eq!(stats.total_samples, 3);
        assert_eq!(stats.class_counts, vec![2, 1]);
    }

    #[test]
    fn test_corrupt_image_fails_on_access() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("Chalazion");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("broken.jpg"), b"definitely not a jpeg").unwrap();

        let dataset = EyeDiseaseDataset::open(
            temp.path(),
            vec!["Chalazion".to_string()],
            ImageTransform::default(),
        )
        .unwrap();

        assert_eq!(dataset.len(), 1);
        let err = dataset.load_item(0).unwrap_err();
        assert!(matches!(err, EyeDiseaseError::ImageLoadError(_, _)));
    }
}
