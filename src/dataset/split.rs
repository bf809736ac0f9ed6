use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::DataError;

/// Geometry of one image: `width × height` pixels with `channels` bytes each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageShape {
    pub width: usize,
    pub height: usize,
    pub channels: usize,
}

impl ImageShape {
    pub const fn new(width: usize, height: usize, channels: usize) -> Self {
        ImageShape { width, height, channels }
    }

    /// Number of bytes one image occupies in a flat buffer.
    pub const fn pixels(&self) -> usize {
        self.width * self.height * self.channels
    }

    /// Pixels per channel plane.
    pub const fn plane(&self) -> usize {
        self.width * self.height
    }
}

impl fmt::Display for ImageShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}x{}", self.height, self.width, self.channels)
    }
}

/// Which half of a dataset a batch is drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Split {
    Train,
    Test,
}

impl Split {
    pub fn as_str(self) -> &'static str {
        match self {
            Split::Train => "train",
            Split::Test => "test",
        }
    }
}

impl fmt::Display for Split {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decoded images of one split, stored back to back.
///
/// Every image occupies exactly `shape.pixels()` bytes in height-width-channel
/// order, so image `i` is the byte range `i * pixels .. (i + 1) * pixels`.
/// Labels are class indices, one byte per image.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageSplit {
    shape: ImageShape,
    pixels: Vec<u8>,
    labels: Vec<u8>,
}

impl ImageSplit {
    /// Wraps a pixel buffer and its labels, checking that the sizes agree.
    pub fn new(shape: ImageShape, pixels: Vec<u8>, labels: Vec<u8>) -> Result<Self, DataError> {
        let width = shape.pixels();
        if width == 0 {
            return Err(DataError::Format(format!("image shape {} has no pixels", shape)));
        }
        if pixels.len() % width != 0 {
            return Err(DataError::Format(format!(
                "pixel buffer of {} bytes is not a whole number of {} images",
                pixels.len(),
                shape
            )));
        }
        let images = pixels.len() / width;
        if images != labels.len() {
            return Err(DataError::LabelCountMismatch { images, labels: labels.len() });
        }
        Ok(ImageSplit { shape, pixels, labels })
    }

    /// Joins several splits of the same shape, in order.
    pub fn concat(shape: ImageShape, parts: Vec<ImageSplit>) -> Result<Self, DataError> {
        let mut pixels = Vec::with_capacity(parts.iter().map(|p| p.pixels.len()).sum());
        let mut labels = Vec::with_capacity(parts.iter().map(|p| p.labels.len()).sum());
        for part in parts {
            if part.shape != shape {
                return Err(DataError::Format(format!(
                    "cannot join a {} split into a {} split",
                    part.shape, shape
                )));
            }
            pixels.extend_from_slice(&part.pixels);
            labels.extend_from_slice(&part.labels);
        }
        ImageSplit::new(shape, pixels, labels)
    }

    /// Splits off everything from image `at` onwards into a second split.
    pub fn split_at(mut self, at: usize) -> (ImageSplit, ImageSplit) {
        let at = at.min(self.len());
        let tail_pixels = self.pixels.split_off(at * self.shape.pixels());
        let tail_labels = self.labels.split_off(at);
        let tail = ImageSplit { shape: self.shape, pixels: tail_pixels, labels: tail_labels };
        (self, tail)
    }

    /// Fails on the first label that is not a valid class index.
    pub fn check_labels(&self, num_classes: usize) -> Result<(), DataError> {
        match self.labels.iter().position(|&l| l as usize >= num_classes) {
            Some(index) => Err(DataError::LabelOutOfRange {
                index,
                label: self.labels[index] as usize,
                num_classes,
            }),
            None => Ok(()),
        }
    }

    pub fn shape(&self) -> ImageShape {
        self.shape
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// The raw bytes of image `index`.
    pub fn image(&self, index: usize) -> &[u8] {
        let width = self.shape.pixels();
        &self.pixels[index * width..(index + 1) * width]
    }

    pub fn label(&self, index: usize) -> u8 {
        self.labels[index]
    }

    pub fn labels(&self) -> &[u8] {
        &self.labels
    }
}
