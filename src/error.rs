use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while reading dataset files or serving batches.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("cannot read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot decode image '{path}': {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("cannot parse labels '{path}': {source}")]
    Labels {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Malformed file contents (bad magic, truncated data, wrong width, ...).
    #[error("{0}")]
    Format(String),

    #[error("{images} images but {labels} labels")]
    LabelCountMismatch { images: usize, labels: usize },

    #[error("label {label} at index {index} is out of range for {num_classes} classes")]
    LabelOutOfRange {
        index: usize,
        label: usize,
        num_classes: usize,
    },

    #[error("no {dataset} files found in '{dir}'")]
    MissingFiles { dataset: &'static str, dir: PathBuf },

    #[error("the {0} split is empty")]
    EmptySplit(&'static str),

    #[error("batch size must be at least 1")]
    ZeroBatchSize,
}

impl DataError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        DataError::Io { path: path.into(), source }
    }
}

/// Top-level error of an experiment run.
#[derive(Debug, Error)]
pub enum LabError {
    #[error(transparent)]
    Data(#[from] DataError),

    #[error("cannot write '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot save model record '{path}': {reason}")]
    Record { path: PathBuf, reason: String },

    #[error("invalid configuration: {0}")]
    Config(String),
}
