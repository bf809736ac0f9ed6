pub mod classifier;
pub mod cnn;
pub mod mlp;
pub mod resnet;

pub use classifier::ImageClassifier;
pub use cnn::{Cnn, CnnConfig};
pub use mlp::{Mlp, MlpConfig};
pub use resnet::{ResNet, ResNetConfig, StageConfig};
