use burn::tensor::backend::Backend;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::dataset::batcher::{ImageBatch, ImageBatcher};
use crate::dataset::split::{ImageShape, ImageSplit, Split};
use crate::error::DataError;

/// Shuffled visiting order of one split plus a cursor into it.
#[derive(Debug, Clone)]
struct Order {
    indices: Vec<usize>,
    cursor: usize,
}

impl Order {
    fn shuffled(len: usize, rng: &mut StdRng) -> Self {
        let mut indices: Vec<usize> = (0..len).collect();
        indices.shuffle(rng);
        Order { indices, cursor: 0 }
    }

    /// Next `n` indices, wrapping to the start of the order at the end.
    fn take(&mut self, n: usize) -> Vec<usize> {
        let len = self.indices.len();
        let mut out = Vec::with_capacity(n);
        for _ in 0..n {
            out.push(self.indices[self.cursor]);
            self.cursor = (self.cursor + 1) % len;
        }
        out
    }
}

/// A labeled image dataset with a train and a test split, served as
/// mini-batches.
///
/// Each split's index order is shuffled exactly once, when the dataset is
/// built. `next_batch` walks that order with a cursor and wraps around, so
/// `batches_per_epoch` consecutive draws visit every training image once.
#[derive(Debug, Clone)]
pub struct ImageDataSet {
    name: &'static str,
    class_names: Vec<String>,
    train: ImageSplit,
    test: ImageSplit,
    train_order: Order,
    test_order: Order,
    batcher: ImageBatcher,
}

impl ImageDataSet {
    pub fn new(
        name: &'static str,
        class_names: Vec<String>,
        train: ImageSplit,
        test: ImageSplit,
        seed: u64,
    ) -> Result<Self, DataError> {
        if train.is_empty() {
            return Err(DataError::EmptySplit(Split::Train.as_str()));
        }
        if test.is_empty() {
            return Err(DataError::EmptySplit(Split::Test.as_str()));
        }
        if train.shape() != test.shape() {
            return Err(DataError::Format(format!(
                "train images are {} but test images are {}",
                train.shape(),
                test.shape()
            )));
        }
        train.check_labels(class_names.len())?;
        test.check_labels(class_names.len())?;

        let mut rng = StdRng::seed_from_u64(seed);
        let train_order = Order::shuffled(train.len(), &mut rng);
        let test_order = Order::shuffled(test.len(), &mut rng);

        Ok(ImageDataSet {
            name,
            class_names,
            batcher: ImageBatcher::new(train.shape()),
            train,
            test,
            train_order,
            test_order,
        })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn shape(&self) -> ImageShape {
        self.train.shape()
    }

    pub fn class_names(&self) -> &[String] {
        &self.class_names
    }

    pub fn num_classes(&self) -> usize {
        self.class_names.len()
    }

    pub fn train_len(&self) -> usize {
        self.train.len()
    }

    pub fn test_len(&self) -> usize {
        self.test.len()
    }

    pub fn split(&self, split: Split) -> &ImageSplit {
        match split {
            Split::Train => &self.train,
            Split::Test => &self.test,
        }
    }

    /// Steps needed for one pass over the training split.
    pub fn batches_per_epoch(&self, batch_size: usize) -> usize {
        if batch_size == 0 {
            return 0;
        }
        self.train.len().div_ceil(batch_size)
    }

    /// Advances the split's cursor by `n` and returns the indices passed over.
    pub fn next_indices(&mut self, split: Split, n: usize) -> Result<Vec<usize>, DataError> {
        if n == 0 {
            return Err(DataError::ZeroBatchSize);
        }
        let order = match split {
            Split::Train => &mut self.train_order,
            Split::Test => &mut self.test_order,
        };
        Ok(order.take(n))
    }

    pub fn next_batch<B: Backend>(
        &mut self,
        split: Split,
        n: usize,
        device: &B::Device,
    ) -> Result<ImageBatch<B>, DataError> {
        let indices = self.next_indices(split, n)?;
        Ok(self.batcher.batch(self.split(split), &indices, device))
    }

    pub fn next_train_batch<B: Backend>(
        &mut self,
        n: usize,
        device: &B::Device,
    ) -> Result<ImageBatch<B>, DataError> {
        self.next_batch(Split::Train, n, device)
    }

    pub fn next_test_batch<B: Backend>(
        &mut self,
        n: usize,
        device: &B::Device,
    ) -> Result<ImageBatch<B>, DataError> {
        self.next_batch(Split::Test, n, device)
    }

    /// The whole split as a single batch, in shuffled order. Cursors are left
    /// untouched.
    pub fn whole<B: Backend>(&self, split: Split, device: &B::Device) -> ImageBatch<B> {
        let order = match split {
            Split::Train => &self.train_order,
            Split::Test => &self.test_order,
        };
        self.batcher.batch(self.split(split), &order.indices, device)
    }

    /// Walks a split front to back in batches of at most `n`, without
    /// wrapping and without touching the cursors.
    pub fn chunks<'a, B: Backend>(
        &'a self,
        split: Split,
        n: usize,
        device: &'a B::Device,
    ) -> Result<impl Iterator<Item = ImageBatch<B>> + 'a, DataError> {
        if n == 0 {
            return Err(DataError::ZeroBatchSize);
        }
        let data = self.split(split);
        let batcher = self.batcher;
        Ok((0..data.len()).step_by(n).map(move |start| {
            let end = (start + n).min(data.len());
            let indices: Vec<usize> = (start..end).collect();
            batcher.batch(data, &indices, device)
        }))
    }
}
