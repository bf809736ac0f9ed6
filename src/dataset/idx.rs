//! Readers for the IDX binary files MNIST is distributed in.
//!
//! # IDX3 image file layout
//! ```text
//! bytes  0-1:   0x00 0x00   (reserved, must be zero)
//! byte   2:     0x08        (dtype = uint8)
//! byte   3:     0x03        (number of dimensions = 3)
//! bytes  4-7:   N           (number of images, big-endian u32)
//! bytes  8-11:  rows        (image height in pixels, big-endian u32)
//! bytes 12-15:  cols        (image width in pixels, big-endian u32)
//! bytes 16..:   N * rows * cols bytes, row-major, uint8
//! ```
//!
//! # IDX1 label file layout
//! ```text
//! bytes  0-1:   0x00 0x00   (reserved, must be zero)
//! byte   2:     0x08        (dtype = uint8)
//! byte   3:     0x01        (number of dimensions = 1)
//! bytes  4-7:   N           (number of labels, big-endian u32)
//! bytes  8..:   N bytes, each a class index
//! ```

use std::fs;
use std::path::Path;

use crate::dataset::split::{ImageShape, ImageSplit};
use crate::error::DataError;

/// Pixels of an IDX3 file, images stored back to back.
#[derive(Debug, Clone)]
pub struct IdxImages {
    pub count: usize,
    pub rows: usize,
    pub cols: usize,
    pub pixels: Vec<u8>,
}

fn be_u32(bytes: &[u8], at: usize) -> usize {
    u32::from_be_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]]) as usize
}

fn check_header(bytes: &[u8], dims: u8, what: &str) -> Result<(), DataError> {
    let header = 4 + 4 * dims as usize;
    if bytes.len() < header {
        return Err(DataError::Format(format!(
            "IDX {} file too short: expected at least {} header bytes, got {}",
            what,
            header,
            bytes.len()
        )));
    }
    if bytes[0] != 0x00 || bytes[1] != 0x00 {
        return Err(DataError::Format(format!(
            "IDX {} file: bytes 0-1 must be 0x00 0x00, got 0x{:02X} 0x{:02X}",
            what, bytes[0], bytes[1]
        )));
    }
    if bytes[2] != 0x08 {
        return Err(DataError::Format(format!(
            "IDX {} file: dtype byte must be 0x08 (uint8), got 0x{:02X}",
            what, bytes[2]
        )));
    }
    if bytes[3] != dims {
        return Err(DataError::Format(format!(
            "IDX {} file: expected {} dimensions, got {}",
            what, dims, bytes[3]
        )));
    }
    Ok(())
}

pub fn parse_idx_images(bytes: &[u8]) -> Result<IdxImages, DataError> {
    check_header(bytes, 3, "image")?;

    let count = be_u32(bytes, 4);
    let rows = be_u32(bytes, 8);
    let cols = be_u32(bytes, 12);

    let needed = rows
        .checked_mul(cols)
        .and_then(|per_image| per_image.checked_mul(count))
        .ok_or_else(|| {
            DataError::Format(format!(
                "IDX image file: {} images of {}x{} overflows usize",
                count, rows, cols
            ))
        })?;

    let data = &bytes[16..];
    if data.len() < needed {
        return Err(DataError::Format(format!(
            "IDX image file too short: header declares {} images of {}x{} pixels \
             ({} bytes) but only {} bytes follow",
            count,
            rows,
            cols,
            needed,
            data.len()
        )));
    }

    Ok(IdxImages { count, rows, cols, pixels: data[..needed].to_vec() })
}

pub fn parse_idx_labels(bytes: &[u8]) -> Result<Vec<u8>, DataError> {
    check_header(bytes, 1, "label")?;

    let count = be_u32(bytes, 4);
    let data = &bytes[8..];
    if data.len() < count {
        return Err(DataError::Format(format!(
            "IDX label file too short: header declares {} labels but only {} bytes follow",
            count,
            data.len()
        )));
    }
    Ok(data[..count].to_vec())
}

/// Reads an image/label file pair into a split, checking the image size
/// against `shape`.
pub fn read_idx_pair(
    images_path: &Path,
    labels_path: &Path,
    shape: ImageShape,
) -> Result<ImageSplit, DataError> {
    let image_bytes = fs::read(images_path).map_err(|e| DataError::io(images_path, e))?;
    let label_bytes = fs::read(labels_path).map_err(|e| DataError::io(labels_path, e))?;

    let images = parse_idx_images(&image_bytes)?;
    if images.rows != shape.height || images.cols != shape.width || shape.channels != 1 {
        return Err(DataError::Format(format!(
            "'{}' holds {}x{} images, expected {}",
            images_path.display(),
            images.rows,
            images.cols,
            shape
        )));
    }
    let labels = parse_idx_labels(&label_bytes)?;
    if labels.len() != images.count {
        return Err(DataError::LabelCountMismatch { images: images.count, labels: labels.len() });
    }

    ImageSplit::new(shape, images.pixels, labels)
}
