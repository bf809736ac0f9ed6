pub mod backend;
pub mod chart;
pub mod config;
pub mod dataset;
pub mod error;
pub mod experiment;
pub mod model;
pub mod train;

// Convenience re-exports
pub use backend::{default_device, InnerBackend, TrainBackend};
pub use chart::{ChartKind, ChartLog};
pub use config::LabConfig;
pub use dataset::{Cifar10, ImageBatch, ImageDataSet, ImageShape, ImageSource, ImageSplit, Mnist, Split};
pub use error::{DataError, LabError};
pub use experiment::{Example, Hyperparams, RunReport};
pub use model::{Cnn, CnnConfig, ImageClassifier, Mlp, MlpConfig, ResNet, ResNetConfig};
pub use train::{train_loop, BatchLog, EpochLog, Evaluation, Score, TrainConfig, TrainEvent};
