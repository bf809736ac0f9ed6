use std::path::Path;

use crate::dataset::data_set::ImageDataSet;
use crate::dataset::split::{ImageShape, ImageSplit};
use crate::error::DataError;

/// A dataset that can be read from a directory on disk.
///
/// Implementors fix the image geometry and class list; `load` turns the two
/// decoded splits into a shuffled, batch-serving [`ImageDataSet`].
pub trait ImageSource {
    const NAME: &'static str;
    const SHAPE: ImageShape;
    const CLASSES: &'static [&'static str];

    /// Reads and decodes the train and test splits found in `dir`.
    fn load_splits(dir: &Path) -> Result<(ImageSplit, ImageSplit), DataError>;

    fn class_names() -> Vec<String> {
        Self::CLASSES.iter().map(|c| c.to_string()).collect()
    }

    fn load(dir: &Path, seed: u64) -> Result<ImageDataSet, DataError> {
        log::info!("loading {} from '{}'", Self::NAME, dir.display());
        let (train, test) = Self::load_splits(dir)?;
        log::info!(
            "{}: {} train / {} test images of {}",
            Self::NAME,
            train.len(),
            test.len(),
            Self::SHAPE
        );
        ImageDataSet::new(Self::NAME, Self::class_names(), train, test, seed)
    }
}
