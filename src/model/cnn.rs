use burn::config::Config;
use burn::module::Module;
use burn::nn::conv::{Conv2d, Conv2dConfig};
use burn::nn::pool::{MaxPool2d, MaxPool2dConfig};
use burn::nn::{Dropout, DropoutConfig, Linear, LinearConfig, PaddingConfig2d};
use burn::tensor::activation::relu;
use burn::tensor::{backend::Backend, Tensor};

use crate::dataset::ImageShape;
use crate::error::LabError;
use crate::model::classifier::ImageClassifier;

/// Stacked convolution blocks followed by one hidden dense layer.
///
/// Each block is conv 3x3 → conv 3x3 (valid) → max-pool 2x2 → dropout, with
/// ReLU after both convolutions. With `pad_first` the first convolution of a
/// block keeps the spatial size.
#[derive(Config, Debug)]
pub struct CnnConfig {
    pub input: ImageShape,
    /// Filters of each block's convolutions.
    pub blocks: Vec<usize>,
    pub hidden: usize,
    pub num_classes: usize,
    #[config(default = false)]
    pub pad_first: bool,
    #[config(default = 0.25)]
    pub conv_dropout: f64,
    #[config(default = 0.5)]
    pub dense_dropout: f64,
}

impl CnnConfig {
    /// conv 32 → conv 32 → pool → dense 128 → 10.
    pub fn mnist() -> Self {
        CnnConfig::new(ImageShape::new(28, 28, 1), vec![32], 128, 10)
    }

    /// Two same/valid blocks of 32 then 64 filters → dense 512 → 10.
    pub fn cifar10() -> Self {
        CnnConfig::new(ImageShape::new(32, 32, 3), vec![32, 64], 512, 10).with_pad_first(true)
    }

    /// Height and width of the feature map after every block.
    pub fn feature_size(&self) -> (usize, usize) {
        let shrink = if self.pad_first { 2 } else { 4 };
        self.blocks.iter().fold((self.input.height, self.input.width), |(h, w), _| {
            (h.saturating_sub(shrink) / 2, w.saturating_sub(shrink) / 2)
        })
    }

    /// Feature map size after the last block, or an error when the input is
    /// too small for the configured blocks.
    pub fn check(&self) -> Result<(usize, usize), LabError> {
        match self.feature_size() {
            (height, width) if height > 0 && width > 0 => Ok((height, width)),
            _ => Err(LabError::Config(format!(
                "input {} is too small for {} conv blocks",
                self.input,
                self.blocks.len()
            ))),
        }
    }

    /// # Panics
    /// When `check` fails; call it first if the geometry comes from outside.
    pub fn init<B: Backend>(&self, device: &B::Device) -> Cnn<B> {
        let (height, width) = match self.check() {
            Ok(size) => size,
            Err(e) => panic!("{}", e),
        };

        let mut blocks = Vec::with_capacity(self.blocks.len());
        let mut channels = self.input.channels;
        for &filters in &self.blocks {
            let first_padding = if self.pad_first {
                PaddingConfig2d::Same
            } else {
                PaddingConfig2d::Valid
            };
            blocks.push(ConvBlock {
                first: Conv2dConfig::new([channels, filters], [3, 3])
                    .with_padding(first_padding)
                    .init(device),
                second: Conv2dConfig::new([filters, filters], [3, 3]).init(device),
                pool: MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init(),
                dropout: DropoutConfig::new(self.conv_dropout).init(),
            });
            channels = filters;
        }

        Cnn {
            blocks,
            hidden: LinearConfig::new(channels * height * width, self.hidden).init(device),
            dropout: DropoutConfig::new(self.dense_dropout).init(),
            output: LinearConfig::new(self.hidden, self.num_classes).init(device),
        }
    }
}

#[derive(Module, Debug)]
pub struct ConvBlock<B: Backend> {
    first: Conv2d<B>,
    second: Conv2d<B>,
    pool: MaxPool2d,
    dropout: Dropout,
}

impl<B: Backend> ConvBlock<B> {
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = relu(self.first.forward(x));
        let x = relu(self.second.forward(x));
        self.dropout.forward(self.pool.forward(x))
    }
}

#[derive(Module, Debug)]
pub struct Cnn<B: Backend> {
    blocks: Vec<ConvBlock<B>>,
    hidden: Linear<B>,
    dropout: Dropout,
    output: Linear<B>,
}

impl<B: Backend> ImageClassifier<B> for Cnn<B> {
    fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        let x = self.blocks.iter().fold(images, |x, block| block.forward(x));
        let x = x.flatten::<2>(1, 3);
        let x = self.dropout.forward(relu(self.hidden.forward(x)));
        self.output.forward(x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type B = NdArray<f32>;

    #[test]
    fn feature_sizes_follow_padding_mode() {
        assert_eq!(CnnConfig::mnist().feature_size(), (12, 12));
        assert_eq!(CnnConfig::cifar10().feature_size(), (6, 6));
    }

    #[test]
    fn small_cnn_produces_class_scores() {
        let device = Default::default();
        let config = CnnConfig::new(ImageShape::new(10, 10, 1), vec![4], 8, 3);
        let model = config.init::<B>(&device);
        let logits = model.forward(Tensor::zeros([2, 1, 10, 10], &device));
        assert_eq!(logits.dims(), [2, 3]);

        let probs = model.predict(Tensor::ones([2, 1, 10, 10], &device));
        let sums = probs.sum_dim(1).into_data().to_vec::<f32>().unwrap();
        assert!(sums.iter().all(|s| (s - 1.0).abs() < 1e-5));
    }

    #[test]
    fn padded_blocks_accept_colour_input() {
        let device = Default::default();
        let config =
            CnnConfig::new(ImageShape::new(12, 12, 3), vec![4, 6], 8, 10).with_pad_first(true);
        let model = config.init::<B>(&device);
        let logits = model.forward(Tensor::zeros([1, 3, 12, 12], &device));
        assert_eq!(logits.dims(), [1, 10]);
    }

    #[test]
    fn check_rejects_too_small_input() {
        let config = CnnConfig::new(ImageShape::new(4, 4, 1), vec![4, 4], 8, 2);
        assert!(matches!(config.check(), Err(LabError::Config(_))));
        assert_eq!(CnnConfig::mnist().check().unwrap(), (12, 12));
    }

    #[test]
    #[should_panic(expected = "too small")]
    fn init_panics_on_too_small_input() {
        CnnConfig::new(ImageShape::new(4, 4, 1), vec![4, 4], 8, 2).init::<B>(&Default::default());
    }

    #[test]
    fn summary_lists_parameters() {
        let model = CnnConfig::new(ImageShape::new(10, 10, 1), vec![2], 4, 2).init::<B>(&Default::default());
        let summary = model.summary();
        assert!(summary.contains("Total params"));
        assert!(summary.contains(&model.num_params().to_string()));
    }
}
