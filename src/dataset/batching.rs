//! Mini-batch iteration over a subset of the dataset
//!
//! A [`BatchLoader`] owns an index subset and yields `ceil(N / B)` batches per
//! pass. With shuffling enabled, every pass draws a fresh order from the
//! loader's own seeded generator; without it, the order is the subset order.
//! Decoding runs on the caller's thread, or on a dedicated rayon pool when
//! `num_workers > 0`.

use std::sync::Arc;

use burn::data::dataloader::batcher::Batcher;
use burn::prelude::*;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::debug;

use super::burn_dataset::{EyeDiseaseBatch, EyeDiseaseBatcher, EyeDiseaseItem};
use super::loader::EyeDiseaseDataset;
use crate::utils::error::{EyeDiseaseError, Result};

/// Batch iteration settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchLoaderConfig {
    pub batch_size: usize,
    pub shuffle: bool,
    /// Decoding threads; 0 decodes synchronously
    pub num_workers: usize,
    pub seed: u64,
}

impl BatchLoaderConfig {
    /// Shuffled batches for training
    pub fn train(batch_size: usize, num_workers: usize, seed: u64) -> Self {
        Self {
            batch_size,
            shuffle: true,
            num_workers,
            seed,
        }
    }

    /// Fixed-order batches for evaluation
    pub fn test(batch_size: usize, num_workers: usize) -> Self {
        Self {
            batch_size,
            shuffle: false,
            num_workers,
            seed: 0,
        }
    }
}

/// Restartable batch source over an index subset
pub struct BatchLoader {
    dataset: Arc<EyeDiseaseDataset>,
    indices: Vec<usize>,
    config: BatchLoaderConfig,
    batcher: EyeDiseaseBatcher,
    rng: ChaCha8Rng,
    pool: Option<ThreadPool>,
}

impl BatchLoader {
    /// Create a loader over `indices` of `dataset`
    pub fn new(
        dataset: Arc<EyeDiseaseDataset>,
        indices: Vec<usize>,
        config: BatchLoaderConfig,
    ) -> Result<Self> {
        if config.batch_size == 0 {
            return Err(EyeDiseaseError::Config(
                "batch size must be greater than 0".to_string(),
            ));
        }
        if let Some(&bad) = indices.iter().find(|&&i| i >= dataset.len()) {
            return Err(EyeDiseaseError::InvalidInput(format!(
                "index {} out of range for dataset of {}",
                bad,
                dataset.len()
            )));
        }

        let pool = if config.num_workers > 0 {
            let pool = ThreadPoolBuilder::new()
                .num_threads(config.num_workers)
                .thread_name(|i| format!("image-decode-{}", i))
                .build()
                .map_err(|e| EyeDiseaseError::Config(format!("worker pool: {}", e)))?;
            Some(pool)
        } else {
            None
        };

        let batcher = EyeDiseaseBatcher::new(dataset.transform.image_size);

        Ok(Self {
            dataset,
            indices,
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            config,
            batcher,
            pool,
        })
    }

    /// Number of samples covered by one pass
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    /// Check if the loader yields nothing
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Number of batches per pass
    pub fn num_batches(&self) -> usize {
        self.indices.len().div_ceil(self.config.batch_size)
    }

    pub fn config(&self) -> &BatchLoaderConfig {
        &self.config
    }

    /// Index chunks for the next pass
    ///
    /// Advances the shuffle generator, so two calls on a shuffled loader
    /// produce different orders.
    pub fn plan(&mut self) -> Vec<Vec<usize>> {
        let mut order = self.indices.clone();
        if self.config.shuffle {
            order.shuffle(&mut self.rng);
        }

        order
            .chunks(self.config.batch_size)
            .map(|chunk| chunk.to_vec())
            .collect()
    }

    /// Decode the images of one chunk, keeping chunk order
    pub fn load_items(&self, chunk: &[usize]) -> Result<Vec<EyeDiseaseItem>> {
        match &self.pool {
            Some(pool) => pool.install(|| {
                chunk
                    .par_iter()
                    .map(|&i| self.dataset.load_item(i))
                    .collect::<Result<Vec<_>>>()
            }),
            None => chunk.iter().map(|&i| self.dataset.load_item(i)).collect(),
        }
    }

    /// Lazily yield the batches of the next pass on `device`
    pub fn iter<B: Backend>(&mut self, device: &B::Device) -> BatchIter<'_, B> {
        let chunks = self.plan();
        debug!(
            "Starting pass: {} samples in {} batches",
            self.indices.len(),
            chunks.len()
        );

        BatchIter {
            loader: self,
            chunks: chunks.into_iter(),
            device: device.clone(),
        }
    }
}

/// Iterator over one pass of a [`BatchLoader`]
pub struct BatchIter<'a, B: Backend> {
    loader: &'a BatchLoader,
    chunks: std::vec::IntoIter<Vec<usize>>,
    device: B::Device,
}

impl<B: Backend> Iterator for BatchIter<'_, B> {
    type Item = Result<EyeDiseaseBatch<B>>;

    fn next(&mut self) -> Option<Self::Item> {
        let chunk = self.chunks.next()?;
        let batch = self.loader.load_items(&chunk).map(|items| {
            <EyeDiseaseBatcher as Batcher<B, EyeDiseaseItem, EyeDiseaseBatch<B>>>::batch(
                &self.loader.batcher,
                items,
                &self.device,
            )
        });
        Some(batch)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.chunks.size_hint()
    }
}

impl<B: Backend> ExactSizeIterator for BatchIter<'_, B> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::loader::ImageSample;
    use crate::dataset::transform::ImageTransform;
    use burn::backend::NdArray;
    use image::{ImageBuffer, Rgb};
    use std::path::PathBuf;
    use tempfile::TempDir;

    type TestBackend = NdArray;

    fn fake_dataset(len: usize) -> Arc<EyeDiseaseDataset> {
        let samples = (0..len)
            .map(|id| ImageSample {
                path: PathBuf::from(format!("/fake/img_{}.png", id)),
                label: id % 2,
                class_name: if id % 2 == 0 { "Normal" } else { "Stye" }.to_string(),
                id,
            })
            .collect();

        Arc::new(EyeDiseaseDataset {
            root_dir: PathBuf::from("/fake"),
            samples,
            class_names: vec!["Normal".to_string(), "Stye".to_string()],
            transform: ImageTransform::with_image_size(4),
        })
    }

    fn image_dataset(temp: &TempDir, len: usize) -> Arc<EyeDiseaseDataset> {
        for class in ["Normal", "Stye"] {
            std::fs::create_dir_all(temp.path().join(class)).unwrap();
        }
        for i in 0..len {
            let class = if i % 2 == 0 { "Normal" } else { "Stye" };
            let img = ImageBuffer::from_fn(6, 6, |x, y| Rgb([(i * 10) as u8, x as u8, y as u8]));
            img.save(temp.path().join(class).join(format!("img_{:03}.png", i)))
                .unwrap();
        }

        Arc::new(
            EyeDiseaseDataset::open(
                temp.path(),
                vec!["Normal".to_string(), "Stye".to_string()],
                ImageTransform::with_image_size(4),
            )
            .unwrap(),
        )
    }

    #[test]
    fn test_batch_counts_and_sizes() {
        for &(len, batch_size) in &[(10usize, 3usize), (10, 5), (1, 4), (0, 2), (33, 32)] {
            let dataset = fake_dataset(len);
            let mut loader = BatchLoader::new(
                dataset,
                (0..len).collect(),
                BatchLoaderConfig::train(batch_size, 0, 1),
            )
            .unwrap();

            let plan = loader.plan();
            assert_eq!(plan.len(), len.div_ceil(batch_size));
            assert_eq!(loader.num_batches(), plan.len());
            assert_eq!(plan.iter().map(Vec::len).sum::<usize>(), len);

            if let Some((last, rest)) = plan.split_last() {
                assert!(rest.iter().all(|c| c.len() == batch_size));
                let remainder = len % batch_size;
                let expected_last = if remainder == 0 { batch_size } else { remainder };
                assert_eq!(last.len(), expected_last);
            }
        }
    }

    #[test]
    fn test_unshuffled_order_is_stable() {
        let indices = vec![4, 2, 9, 0, 7];
        let mut loader =
            BatchLoader::new(fake_dataset(10), indices.clone(), BatchLoaderConfig::test(2, 0))
                .unwrap();

        let first: Vec<usize> = loader.plan().concat();
        let second: Vec<usize> = loader.plan().concat();
        assert_eq!(first, indices);
        assert_eq!(second, indices);
    }

    #[test]
    fn test_shuffled_order_changes_between_passes() {
        let mut loader = BatchLoader::new(
            fake_dataset(50),
            (0..50).collect(),
            BatchLoaderConfig::train(8, 0, 42),
        )
        .unwrap();

        let first: Vec<usize> = loader.plan().concat();
        let second: Vec<usize> = loader.plan().concat();
        assert_ne!(first, second);

        let mut sorted = first.clone();
        sorted.sort();
        assert_eq!(sorted, (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        let result = BatchLoader::new(fake_dataset(4), vec![0, 1], BatchLoaderConfig::test(0, 0));
        assert!(matches!(result, Err(EyeDiseaseError::Config(_))));
    }

    #[test]
    fn test_out_of_range_index_rejected() {
        let result = BatchLoader::new(fake_dataset(4), vec![0, 4], BatchLoaderConfig::test(2, 0));
        assert!(matches!(result, Err(EyeDiseaseError::InvalidInput(_))));
    }

    #[test]
    fn test_iter_yields_tensors() {
        let temp = TempDir::new().unwrap();
        let dataset = image_dataset(&temp, 7);
        let device = Default::default();

        let mut loader =
            BatchLoader::new(dataset, (0..7).collect(), BatchLoaderConfig::test(3, 0)).unwrap();
        let batches: Vec<EyeDiseaseBatch<TestBackend>> = loader
            .iter::<TestBackend>(&device)
            .collect::<Result<Vec<_>>>()
            .unwrap();

        assert_eq!(batches.len(), 3);
        assert_eq!(batches[0].images.dims(), [3, 3, 4, 4]);
        assert_eq!(batches[2].images.dims(), [1, 3, 4, 4]);
        assert_eq!(batches.iter().map(|b| b.len()).sum::<usize>(), 7);
    }

    #[test]
    fn test_worker_pool_matches_synchronous_decode() {
        let temp = TempDir::new().unwrap();
        let dataset = image_dataset(&temp, 9);
        let chunk = vec![8, 1, 5, 3];

        let sync =
            BatchLoader::new(dataset.clone(), (0..9).collect(), BatchLoaderConfig::test(4, 0))
                .unwrap();
        let pooled =
            BatchLoader::new(dataset, (0..9).collect(), BatchLoaderConfig::test(4, 3)).unwrap();

        let a = sync.load_items(&chunk).unwrap();
        let b = pooled.load_items(&chunk).unwrap();
        assert_eq!(a.len(), 4);
        for (x, y) in a.iter().zip(&b) {
            assert_eq!(x.path, y.path);
            assert_eq!(x.label, y.label);
            assert_eq!(x.image, y.image);
        }
    }

    #[test]
    fn test_decode_error_surfaces_through_iterator() {
        let device = Default::default();
        let mut loader =
            BatchLoader::new(fake_dataset(3), vec![0, 1, 2], BatchLoaderConfig::test(2, 0))
                .unwrap();

        let first = loader.iter::<TestBackend>(&device).next().unwrap();
        assert!(matches!(first, Err(EyeDiseaseError::ImageLoadError(_, _))));
    }
}
