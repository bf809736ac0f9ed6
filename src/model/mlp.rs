use burn::config::Config;
use burn::module::Module;
use burn::nn::{Dropout, DropoutConfig, Linear, LinearConfig};
use burn::tensor::activation::relu;
use burn::tensor::{backend::Backend, Tensor};

use crate::model::classifier::ImageClassifier;

/// Fully connected network over flattened pixels.
#[derive(Config, Debug)]
pub struct MlpConfig {
    /// Flattened input size (`channels * height * width`).
    pub input: usize,
    /// Width of each hidden ReLU layer.
    pub hidden: Vec<usize>,
    pub num_classes: usize,
    #[config(default = 0.5)]
    pub dropout: f64,
}

impl MlpConfig {
    /// 784 → 512 → 512 → 10 with dropout 0.5 after each hidden layer.
    pub fn mnist() -> Self {
        MlpConfig::new(28 * 28, vec![512, 512], 10)
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> Mlp<B> {
        let mut hidden = Vec::with_capacity(self.hidden.len());
        let mut width = self.input;
        for &size in &self.hidden {
            hidden.push(LinearConfig::new(width, size).init(device));
            width = size;
        }
        Mlp {
            hidden,
            dropout: DropoutConfig::new(self.dropout).init(),
            output: LinearConfig::new(width, self.num_classes).init(device),
        }
    }
}

#[derive(Module, Debug)]
pub struct Mlp<B: Backend> {
    hidden: Vec<Linear<B>>,
    dropout: Dropout,
    output: Linear<B>,
}

impl<B: Backend> ImageClassifier<B> for Mlp<B> {
    fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        let mut x = images.flatten::<2>(1, 3);
        for layer in &self.hidden {
            x = self.dropout.forward(relu(layer.forward(x)));
        }
        self.output.forward(x)
    }
}
