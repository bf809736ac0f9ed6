//! Sprite-sheet image files: one PNG holding many images, one per row.
//!
//! A sheet for `w × h` images is `w * h` pixels wide and one row tall per
//! image. Colour images use all three channels; greyscale images are read from
//! the red channel.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::dataset::split::ImageShape;
use crate::error::DataError;

/// Decodes a sprite sheet into a flat buffer of `shape`-sized images.
pub fn decode_sprite(bytes: &[u8], shape: ImageShape, origin: &Path) -> Result<Vec<u8>, DataError> {
    let sheet = image::load_from_memory(bytes).map_err(|source| DataError::Image {
        path: origin.to_path_buf(),
        source,
    })?;

    let row = shape.plane();
    if sheet.width() as usize != row {
        return Err(DataError::Format(format!(
            "sprite '{}' is {} pixels wide, expected {} for {} images",
            origin.display(),
            sheet.width(),
            row,
            shape
        )));
    }

    let rgb = sheet.to_rgb8();
    match shape.channels {
        3 => Ok(rgb.into_raw()),
        1 => Ok(rgb.as_raw().iter().step_by(3).copied().collect()),
        c => Err(DataError::Format(format!(
            "sprite sheets hold 1 or 3 channels, not {}",
            c
        ))),
    }
}

pub fn read_sprite(path: &Path, shape: ImageShape) -> Result<Vec<u8>, DataError> {
    let bytes = fs::read(path).map_err(|e| DataError::io(path, e))?;
    decode_sprite(&bytes, shape, path)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LabelEntry {
    Index(usize),
    Text(String),
}

/// Parses a JSON label file: an array with one inner array per sprite sheet.
///
/// Entries may be class indices (as numbers or digit strings) or class names.
/// Returns one label list per sheet.
pub fn parse_json_labels(
    bytes: &[u8],
    class_names: &[String],
    origin: &Path,
) -> Result<Vec<Vec<u8>>, DataError> {
    let sheets: Vec<Vec<LabelEntry>> =
        serde_json::from_slice(bytes).map_err(|source| DataError::Labels {
            path: origin.to_path_buf(),
            source,
        })?;

    sheets
        .into_iter()
        .map(|entries| {
            entries
                .into_iter()
                .enumerate()
                .map(|(i, entry)| resolve_label(entry, class_names, i))
                .collect()
        })
        .collect()
}

pub fn read_json_labels(path: &Path, class_names: &[String]) -> Result<Vec<Vec<u8>>, DataError> {
    let bytes = fs::read(path).map_err(|e| DataError::io(path, e))?;
    parse_json_labels(&bytes, class_names, path)
}

fn resolve_label(entry: LabelEntry, class_names: &[String], index: usize) -> Result<u8, DataError> {
    let label = match entry {
        LabelEntry::Index(i) => i,
        LabelEntry::Text(text) => match text.trim().parse::<usize>() {
            Ok(i) => i,
            Err(_) => class_names
                .iter()
                .position(|name| name == text.trim())
                .ok_or_else(|| DataError::Format(format!("unknown class name '{}'", text)))?,
        },
    };
    if label >= class_names.len() {
        return Err(DataError::LabelOutOfRange { index, label, num_classes: class_names.len() });
    }
    Ok(label as u8)
}

/// Decodes one-hot label rows (`num_classes` bytes per image) into class
/// indices. The hot position is the largest byte of each row; a row with no
/// nonzero byte is an error.
pub fn decode_one_hot(bytes: &[u8], num_classes: usize) -> Result<Vec<u8>, DataError> {
    if num_classes == 0 || bytes.len() % num_classes != 0 {
        return Err(DataError::Format(format!(
            "{} label bytes are not whole rows of {} classes",
            bytes.len(),
            num_classes
        )));
    }
    bytes
        .chunks_exact(num_classes)
        .enumerate()
        .map(|(index, row)| {
            row.iter()
                .enumerate()
                .filter(|&(_, &v)| v != 0)
                .max_by_key(|&(i, &v)| (v, std::cmp::Reverse(i)))
                .map(|(i, _)| i as u8)
                .ok_or_else(|| DataError::Format(format!("label row {} has no hot class", index)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageOutputFormat, RgbImage};
    use std::io::Cursor;

    fn png(width: u32, height: u32, fill: impl Fn(u32, u32) -> [u8; 3]) -> Vec<u8> {
        let img = RgbImage::from_fn(width, height, |x, y| image::Rgb(fill(x, y)));
        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img)
            .write_to(&mut out, ImageOutputFormat::Png)
            .unwrap();
        out.into_inner()
    }

    fn names(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("class{}", i)).collect()
    }

    #[test]
    fn rgb_sheet_rows_become_images() {
        // Three 2x2 colour images; row y has red = y, green = x, blue = 9.
        let bytes = png(4, 3, |x, y| [y as u8, x as u8, 9]);
        let pixels = decode_sprite(&bytes, ImageShape::new(2, 2, 3), Path::new("t.png")).unwrap();
        assert_eq!(pixels.len(), 3 * 12);
        assert_eq!(&pixels[12..18], &[1, 0, 9, 1, 1, 9]);
    }

    #[test]
    fn grey_sheet_reads_red_channel() {
        let bytes = png(4, 2, |x, _| [x as u8 * 10, 200, 200]);
        let pixels = decode_sprite(&bytes, ImageShape::new(2, 2, 1), Path::new("t.png")).unwrap();
        assert_eq!(pixels, vec![0, 10, 20, 30, 0, 10, 20, 30]);
    }

    #[test]
    fn wrong_sheet_width_is_rejected() {
        let bytes = png(5, 1, |_, _| [0, 0, 0]);
        let err = decode_sprite(&bytes, ImageShape::new(2, 2, 3), Path::new("t.png")).unwrap_err();
        assert!(matches!(err, DataError::Format(_)));
    }

    #[test]
    fn json_labels_accept_indices_digits_and_names() {
        let json = br#"[["1", 2, "class0"], ["class2"]]"#;
        let labels = parse_json_labels(json, &names(3), Path::new("l.json")).unwrap();
        assert_eq!(labels, vec![vec![1, 2, 0], vec![2]]);
    }

    #[test]
    fn json_labels_reject_unknown_entries() {
        assert!(parse_json_labels(br#"[["dog"]]"#, &names(3), Path::new("l.json")).is_err());
        assert!(parse_json_labels(br#"[["7"]]"#, &names(3), Path::new("l.json")).is_err());
        assert!(parse_json_labels(b"not json", &names(3), Path::new("l.json")).is_err());
    }

    #[test]
    fn one_hot_rows_decode_to_indices() {
        let bytes = [0, 0, 1, 1, 0, 0, 0, 1, 0];
        assert_eq!(decode_one_hot(&bytes, 3).unwrap(), vec![2, 0, 1]);
        assert!(decode_one_hot(&bytes, 4).is_err());
    }

    #[test]
    fn all_zero_one_hot_row_is_rejected() {
        let bytes = [0, 1, 0, 0, 0, 0];
        let err = decode_one_hot(&bytes, 3).unwrap_err();
        assert!(matches!(err, DataError::Format(ref m) if m.contains("row 1")));
    }
}
