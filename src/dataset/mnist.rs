use std::fs;
use std::path::Path;

use crate::dataset::idx::read_idx_pair;
use crate::dataset::source::ImageSource;
use crate::dataset::split::{ImageShape, ImageSplit};
use crate::dataset::sprite::{decode_one_hot, read_sprite};
use crate::error::DataError;

pub const SPRITE_IMAGES: &str = "mnist_images.png";
pub const SPRITE_LABELS: &str = "mnist_labels_uint8";
/// Images of the sprite sheet that belong to the train split; the rest are test.
pub const SPRITE_TRAIN_COUNT: usize = 55_000;

pub const IDX_TRAIN_IMAGES: &str = "train-images-idx3-ubyte";
pub const IDX_TRAIN_LABELS: &str = "train-labels-idx1-ubyte";
pub const IDX_TEST_IMAGES: &str = "t10k-images-idx3-ubyte";
pub const IDX_TEST_LABELS: &str = "t10k-labels-idx1-ubyte";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MnistLayout {
    /// One greyscale sprite sheet plus one-hot `uint8` labels.
    Sprite,
    /// The four IDX files MNIST is distributed as.
    Idx,
}

/// MNIST handwritten digits, 28x28 greyscale.
pub struct Mnist;

impl Mnist {
    pub fn detect(dir: &Path) -> Option<MnistLayout> {
        let all_exist = |names: &[&str]| names.iter().all(|n| dir.join(n).is_file());
        if all_exist(&[SPRITE_IMAGES, SPRITE_LABELS]) {
            Some(MnistLayout::Sprite)
        } else if all_exist(&[IDX_TRAIN_IMAGES, IDX_TRAIN_LABELS, IDX_TEST_IMAGES, IDX_TEST_LABELS]) {
            Some(MnistLayout::Idx)
        } else {
            None
        }
    }

    /// Splits a decoded sprite sheet and its labels at `train_count`.
    pub fn split_sprite(
        pixels: Vec<u8>,
        one_hot: &[u8],
        train_count: usize,
    ) -> Result<(ImageSplit, ImageSplit), DataError> {
        let labels = decode_one_hot(one_hot, Self::CLASSES.len())?;
        let all = ImageSplit::new(Self::SHAPE, pixels, labels)?;
        if all.len() <= train_count {
            return Err(DataError::Format(format!(
                "sprite holds {} images, need more than {} to leave a test split",
                all.len(),
                train_count
            )));
        }
        Ok(all.split_at(train_count))
    }

    fn read_sprite_splits(dir: &Path, train_count: usize) -> Result<(ImageSplit, ImageSplit), DataError> {
        let pixels = read_sprite(&dir.join(SPRITE_IMAGES), Self::SHAPE)?;
        let labels_path = dir.join(SPRITE_LABELS);
        let one_hot = fs::read(&labels_path).map_err(|e| DataError::io(&labels_path, e))?;
        Self::split_sprite(pixels, &one_hot, train_count)
    }
}

impl ImageSource for Mnist {
    const NAME: &'static str = "mnist";
    const SHAPE: ImageShape = ImageShape::new(28, 28, 1);
    const CLASSES: &'static [&'static str] = &["0", "1", "2", "3", "4", "5", "6", "7", "8", "9"];

    fn load_splits(dir: &Path) -> Result<(ImageSplit, ImageSplit), DataError> {
        match Self::detect(dir) {
            Some(MnistLayout::Sprite) => Self::read_sprite_splits(dir, SPRITE_TRAIN_COUNT),
            Some(MnistLayout::Idx) => Ok((
                read_idx_pair(&dir.join(IDX_TRAIN_IMAGES), &dir.join(IDX_TRAIN_LABELS), Self::SHAPE)?,
                read_idx_pair(&dir.join(IDX_TEST_IMAGES), &dir.join(IDX_TEST_LABELS), Self::SHAPE)?,
            )),
            None => Err(DataError::MissingFiles { dataset: Self::NAME, dir: dir.to_path_buf() }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn one_hot(labels: &[u8]) -> Vec<u8> {
        labels
            .iter()
            .flat_map(|&l| {
                let mut row = [0u8; 10];
                row[l as usize] = 1;
                row
            })
            .collect()
    }

    #[test]
    fn sprite_is_split_into_train_and_test() {
        let pixels: Vec<u8> = (0..4u8).flat_map(|i| vec![i; 784]).collect();
        let (train, test) = Mnist::split_sprite(pixels, &one_hot(&[5, 1, 9, 0]), 3).unwrap();
        assert_eq!(train.labels(), &[5, 1, 9]);
        assert_eq!(test.labels(), &[0]);
        assert_eq!(test.image(0)[0], 3);
    }

    #[test]
    fn sprite_without_test_images_is_rejected() {
        let pixels = vec![0u8; 2 * 784];
        assert!(Mnist::split_sprite(pixels, &one_hot(&[1, 2]), 2).is_err());
    }

    #[test]
    fn label_rows_must_match_images() {
        let pixels = vec![0u8; 3 * 784];
        let err = Mnist::split_sprite(pixels, &one_hot(&[1, 2]), 1).unwrap_err();
        assert!(matches!(err, DataError::LabelCountMismatch { images: 3, labels: 2 }));
    }

    fn temp_dir(tag: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir()
            .join(format!("ferrite-vision-mnist-{}-{}", tag, std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    /// Sheet of `shades.len()` digits, each a solid grey.
    fn write_sprite(dir: &Path, shades: &[u8], labels: &[u8]) {
        let pixels: Vec<u8> = shades.iter().flat_map(|&v| vec![v; 784]).collect();
        image::GrayImage::from_raw(784, shades.len() as u32, pixels)
            .unwrap()
            .save(dir.join(SPRITE_IMAGES))
            .unwrap();
        fs::write(dir.join(SPRITE_LABELS), one_hot(labels)).unwrap();
    }

    fn idx_images(count: usize, value: u8) -> Vec<u8> {
        let mut bytes = vec![0, 0, 8, 3];
        for dim in [count as u32, 28, 28] {
            bytes.extend(dim.to_be_bytes());
        }
        bytes.extend(vec![value; count * 784]);
        bytes
    }

    fn idx_labels(labels: &[u8]) -> Vec<u8> {
        let mut bytes = vec![0, 0, 8, 1];
        bytes.extend((labels.len() as u32).to_be_bytes());
        bytes.extend(labels);
        bytes
    }

    #[test]
    fn sprite_layout_is_read_from_disk() {
        let dir = temp_dir("sprite");
        write_sprite(&dir, &[10, 20, 30, 40], &[7, 2, 1, 0]);
        assert_eq!(Mnist::detect(&dir), Some(MnistLayout::Sprite));

        let (train, test) = Mnist::read_sprite_splits(&dir, 3).unwrap();
        assert_eq!(train.labels(), &[7, 2, 1]);
        assert_eq!(test.labels(), &[0]);
        assert!(train.image(1).iter().all(|&v| v == 20));
        assert!(test.image(0).iter().all(|&v| v == 40));

        // The full load keeps the first 55000 digits for training.
        let err = Mnist::load(&dir, 0).unwrap_err();
        match err {
            DataError::Format(msg) => assert!(msg.contains("need more than 55000"), "{}", msg),
            other => panic!("unexpected error: {:?}", other),
        }
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn idx_layout_is_loaded() {
        let dir = temp_dir("idx");
        fs::write(dir.join(IDX_TRAIN_IMAGES), idx_images(3, 5)).unwrap();
        fs::write(dir.join(IDX_TRAIN_LABELS), idx_labels(&[4, 4, 9])).unwrap();
        fs::write(dir.join(IDX_TEST_IMAGES), idx_images(2, 6)).unwrap();
        fs::write(dir.join(IDX_TEST_LABELS), idx_labels(&[1, 3])).unwrap();
        assert_eq!(Mnist::detect(&dir), Some(MnistLayout::Idx));

        let ds = Mnist::load(&dir, 0).unwrap();
        assert_eq!(ds.name(), "mnist");
        assert_eq!((ds.train_len(), ds.test_len()), (3, 2));
        assert_eq!(ds.split(crate::dataset::Split::Train).labels(), &[4, 4, 9]);
        assert_eq!(ds.split(crate::dataset::Split::Test).image(1)[783], 6);
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn empty_directory_has_no_layout() {
        assert_eq!(Mnist::detect(Path::new("/definitely/not/here")), None);
        assert!(Mnist::load(Path::new("/definitely/not/here"), 0).is_err());
    }
}
