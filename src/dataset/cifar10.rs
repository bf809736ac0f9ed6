use std::fs;
use std::path::Path;

use crate::dataset::source::ImageSource;
use crate::dataset::split::{ImageShape, ImageSplit};
use crate::dataset::sprite::{read_json_labels, read_sprite};
use crate::error::DataError;

pub const TRAIN_SPRITES: [&str; 5] = [
    "data_batch_1.png",
    "data_batch_2.png",
    "data_batch_3.png",
    "data_batch_4.png",
    "data_batch_5.png",
];
pub const TRAIN_SPRITE_LABELS: &str = "train_lables.json";
pub const TEST_SPRITES: [&str; 1] = ["test_batch.png"];
pub const TEST_SPRITE_LABELS: &str = "test_lables.json";

pub const TRAIN_BINARIES: [&str; 5] = [
    "data_batch_1.bin",
    "data_batch_2.bin",
    "data_batch_3.bin",
    "data_batch_4.bin",
    "data_batch_5.bin",
];
pub const TEST_BINARIES: [&str; 1] = ["test_batch.bin"];

/// How the CIFAR-10 files in a directory are encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cifar10Layout {
    /// PNG sprite sheets plus JSON label files.
    Sprite,
    /// The official binary batches: a label byte then 3072 planar pixel bytes
    /// per record.
    Binary,
}

/// CIFAR-10: 60000 32x32 colour images in 10 classes.
pub struct Cifar10;

impl Cifar10 {
    pub fn detect(dir: &Path) -> Option<Cifar10Layout> {
        let all_exist = |names: &[&str]| names.iter().all(|n| dir.join(n).is_file());
        if all_exist(&TRAIN_SPRITES) && all_exist(&TEST_SPRITES) {
            Some(Cifar10Layout::Sprite)
        } else if all_exist(&TRAIN_BINARIES) && all_exist(&TEST_BINARIES) {
            Some(Cifar10Layout::Binary)
        } else {
            None
        }
    }

    /// Decodes binary records into a split, reordering each image's colour
    /// planes into interleaved pixels.
    pub fn decode_binary(bytes: &[u8], origin: &Path) -> Result<ImageSplit, DataError> {
        let shape = Self::SHAPE;
        let record = 1 + shape.pixels();
        if bytes.len() % record != 0 {
            return Err(DataError::Format(format!(
                "'{}' is {} bytes, not a whole number of {}-byte records",
                origin.display(),
                bytes.len(),
                record
            )));
        }

        let count = bytes.len() / record;
        let plane = shape.plane();
        let mut pixels = Vec::with_capacity(count * shape.pixels());
        let mut labels = Vec::with_capacity(count);
        for rec in bytes.chunks_exact(record) {
            labels.push(rec[0]);
            let planes = &rec[1..];
            for p in 0..plane {
                for c in 0..shape.channels {
                    pixels.push(planes[c * plane + p]);
                }
            }
        }
        ImageSplit::new(shape, pixels, labels)
    }

    fn read_binaries(dir: &Path, names: &[&str]) -> Result<ImageSplit, DataError> {
        let parts = names
            .iter()
            .map(|name| {
                let path = dir.join(name);
                let bytes = fs::read(&path).map_err(|e| DataError::io(&path, e))?;
                Self::decode_binary(&bytes, &path)
            })
            .collect::<Result<Vec<_>, _>>()?;
        ImageSplit::concat(Self::SHAPE, parts)
    }

    fn read_sprites(dir: &Path, names: &[&str], labels_file: &str) -> Result<ImageSplit, DataError> {
        let labels_path = dir.join(labels_file);
        let labels = read_json_labels(&labels_path, &Self::class_names())?;
        if labels.len() != names.len() {
            return Err(DataError::Format(format!(
                "'{}' has labels for {} sprite sheets, expected {}",
                labels_path.display(),
                labels.len(),
                names.len()
            )));
        }

        let parts = names
            .iter()
            .zip(labels)
            .map(|(name, sheet_labels)| {
                let pixels = read_sprite(&dir.join(name), Self::SHAPE)?;
                ImageSplit::new(Self::SHAPE, pixels, sheet_labels)
            })
            .collect::<Result<Vec<_>, _>>()?;
        ImageSplit::concat(Self::SHAPE, parts)
    }
}

impl ImageSource for Cifar10 {
    const NAME: &'static str = "cifar10";
    const SHAPE: ImageShape = ImageShape::new(32, 32, 3);
    const CLASSES: &'static [&'static str] = &[
        "airplane",
        "automobile",
        "bird",
        "cat",
        "deer",
        "dog",
        "frog",
        "horse",
        "ship",
        "truck",
    ];

    fn load_splits(dir: &Path) -> Result<(ImageSplit, ImageSplit), DataError> {
        match Self::detect(dir) {
            Some(Cifar10Layout::Sprite) => Ok((
                Self::read_sprites(dir, &TRAIN_SPRITES, TRAIN_SPRITE_LABELS)?,
                Self::read_sprites(dir, &TEST_SPRITES, TEST_SPRITE_LABELS)?,
            )),
            Some(Cifar10Layout::Binary) => Ok((
                Self::read_binaries(dir, &TRAIN_BINARIES)?,
                Self::read_binaries(dir, &TEST_BINARIES)?,
            )),
            None => Err(DataError::MissingFiles { dataset: Self::NAME, dir: dir.to_path_buf() }),
        }
    }
}
