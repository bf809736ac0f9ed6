//! Bottleneck residual network (ResNet-50 and smaller variants).
//!
//! Stem: 3 pixels of zero padding, 7x7/2 convolution, batch norm, ReLU and a
//! 3x3/2 max-pool. Then one stage of bottleneck blocks per [`StageConfig`],
//! global average pooling and a dense classifier. The first block of every
//! stage projects its shortcut with a strided 1x1 convolution; the others add
//! their input unchanged.

use burn::config::Config;
use burn::module::Module;
use burn::nn::conv::{Conv2d, Conv2dConfig};
use burn::nn::pool::{AdaptiveAvgPool2d, AdaptiveAvgPool2dConfig, MaxPool2d, MaxPool2dConfig};
use burn::nn::{BatchNorm, BatchNormConfig, Initializer, Linear, LinearConfig, PaddingConfig2d};
use burn::tensor::activation::relu;
use burn::tensor::{backend::Backend, Tensor};

use crate::model::classifier::ImageClassifier;

const GLOROT: Initializer = Initializer::XavierUniform { gain: 1.0 };

#[derive(Config, Debug)]
pub struct StageConfig {
    /// Output channels of the three convolutions of each block.
    pub filters: [usize; 3],
    pub blocks: usize,
    /// Stride of the stage's first block.
    pub stride: usize,
}

#[derive(Config, Debug)]
pub struct ResNetConfig {
    pub channels: usize,
    pub stem_filters: usize,
    pub stages: Vec<StageConfig>,
    pub num_classes: usize,
    /// Kernel size of the middle convolution of each block.
    #[config(default = 3)]
    pub kernel: usize,
}

impl ResNetConfig {
    pub fn resnet50(channels: usize, num_classes: usize) -> Self {
        ResNetConfig::new(
            channels,
            64,
            vec![
                StageConfig::new([64, 64, 256], 3, 1),
                StageConfig::new([128, 128, 512], 4, 2),
                StageConfig::new([256, 256, 1024], 6, 2),
                StageConfig::new([512, 512, 2048], 3, 2),
            ],
            num_classes,
        )
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> ResNet<B> {
        let mut blocks = Vec::new();
        let mut channels = self.stem_filters;
        for stage in &self.stages {
            for i in 0..stage.blocks {
                let stride = if i == 0 { Some(stage.stride) } else { None };
                blocks.push(init_block(channels, stage.filters, self.kernel, stride, device));
                channels = stage.filters[2];
            }
        }

        ResNet {
            stem_conv: Conv2dConfig::new([self.channels, self.stem_filters], [7, 7])
                .with_stride([2, 2])
                .with_padding(PaddingConfig2d::Explicit(3, 3))
                .with_initializer(GLOROT)
                .init(device),
            stem_bn: batch_norm(self.stem_filters, device),
            stem_pool: MaxPool2dConfig::new([3, 3]).with_strides([2, 2]).init(),
            blocks,
            pool: AdaptiveAvgPool2dConfig::new([1, 1]).init(),
            fc: LinearConfig::new(channels, self.num_classes)
                .with_initializer(GLOROT)
                .init(device),
        }
    }
}

fn batch_norm<B: Backend>(features: usize, device: &B::Device) -> BatchNorm<B> {
    BatchNormConfig::new(features)
        .with_epsilon(1e-3)
        .with_momentum(0.01)
        .init(device)
}

fn conv<B: Backend>(
    channels: [usize; 2],
    kernel: usize,
    stride: usize,
    padding: PaddingConfig2d,
    device: &B::Device,
) -> Conv2d<B> {
    Conv2dConfig::new(channels, [kernel, kernel])
        .with_stride([stride, stride])
        .with_padding(padding)
        .with_initializer(GLOROT)
        .init(device)
}

fn init_block<B: Backend>(
    input: usize,
    [f1, f2, f3]: [usize; 3],
    kernel: usize,
    stride: Option<usize>,
    device: &B::Device,
) -> Bottleneck<B> {
    let s = stride.unwrap_or(1);
    Bottleneck {
        conv_a: conv([input, f1], 1, s, PaddingConfig2d::Valid, device),
        bn_a: batch_norm(f1, device),
        conv_b: conv([f1, f2], kernel, 1, PaddingConfig2d::Same, device),
        bn_b: batch_norm(f2, device),
        conv_c: conv([f2, f3], 1, 1, PaddingConfig2d::Valid, device),
        bn_c: batch_norm(f3, device),
        shortcut: stride.map(|s| Shortcut {
            conv: conv([input, f3], 1, s, PaddingConfig2d::Valid, device),
            bn: batch_norm(f3, device),
        }),
    }
}

#[derive(Module, Debug)]
pub struct Shortcut<B: Backend> {
    conv: Conv2d<B>,
    bn: BatchNorm<B>,
}

#[derive(Module, Debug)]
pub struct Bottleneck<B: Backend> {
    conv_a: Conv2d<B>,
    bn_a: BatchNorm<B>,
    conv_b: Conv2d<B>,
    bn_b: BatchNorm<B>,
    conv_c: Conv2d<B>,
    bn_c: BatchNorm<B>,
    shortcut: Option<Shortcut<B>>,
}

impl<B: Backend> Bottleneck<B> {
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let residual = match &self.shortcut {
            Some(shortcut) => shortcut.bn.forward(shortcut.conv.forward(x.clone())),
            None => x.clone(),
        };

        let out = relu(self.bn_a.forward(self.conv_a.forward(x)));
        let out = relu(self.bn_b.forward(self.conv_b.forward(out)));
        let out = self.bn_c.forward(self.conv_c.forward(out));

        relu(out + residual)
    }
}

#[derive(Module, Debug)]
pub struct ResNet<B: Backend> {
    stem_conv: Conv2d<B>,
    stem_bn: BatchNorm<B>,
    stem_pool: MaxPool2d,
    blocks: Vec<Bottleneck<B>>,
    pool: AdaptiveAvgPool2d,
    fc: Linear<B>,
}

impl<B: Backend> ImageClassifier<B> for ResNet<B> {
    fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        let x = relu(self.stem_bn.forward(self.stem_conv.forward(images)));
        let x = self.stem_pool.forward(x);
        let x = self.blocks.iter().fold(x, |x, block| block.forward(x));
        let x = self.pool.forward(x).flatten::<2>(1, 3);
        self.fc.forward(x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type B = NdArray<f32>;

    fn tiny() -> ResNetConfig {
        ResNetConfig::new(
            1,
            8,
            vec![StageConfig::new([4, 4, 8], 1, 1), StageConfig::new([8, 8, 16], 2, 2)],
            5,
        )
    }

    #[test]
    fn tiny_resnet_classifies_a_batch() {
        let device = Default::default();
        let model = tiny().init::<B>(&device);
        let logits = model.forward(Tensor::ones([2, 1, 16, 16], &device));
        assert_eq!(logits.dims(), [2, 5]);
    }

    #[test]
    fn only_first_block_of_a_stage_projects() {
        let model = tiny().init::<B>(&Default::default());
        let projected: Vec<bool> = model.blocks.iter().map(|b| b.shortcut.is_some()).collect();
        assert_eq!(projected, vec![true, true, false]);
    }

    #[test]
    fn resnet50_layout() {
        let config = ResNetConfig::resnet50(3, 10);
        let depths: Vec<usize> = config.stages.iter().map(|s| s.blocks).collect();
        assert_eq!(depths, vec![3, 4, 6, 3]);
        assert_eq!(config.stages.last().map(|s| s.filters[2]), Some(2048));
        assert_eq!(config.kernel, 3);
    }
}
