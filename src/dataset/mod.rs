pub mod batcher;
pub mod cifar10;
pub mod data_set;
pub mod idx;
pub mod mnist;
pub mod source;
pub mod split;
pub mod sprite;

pub use batcher::{ImageBatch, ImageBatcher};
pub use cifar10::{Cifar10, Cifar10Layout};
pub use data_set::ImageDataSet;
pub use mnist::{Mnist, MnistLayout};
pub use source::ImageSource;
pub use split::{ImageShape, ImageSplit, Split};
