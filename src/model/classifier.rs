use std::fmt::Display;

use burn::module::Module;
use burn::tensor::activation::softmax;
use burn::tensor::{backend::Backend, Tensor};

/// A network mapping a batch of images to class scores.
pub trait ImageClassifier<B: Backend>: Module<B> {
    /// `[batch, channels, height, width]` → logits `[batch, classes]`.
    fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2>;

    /// Class probabilities.
    fn predict(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        softmax(self.forward(images), 1)
    }

    /// Layer listing followed by the trainable parameter count.
    fn summary(&self) -> String
    where
        Self: Display,
    {
        format!("{}\nTotal params: {}", self, self.num_params())
    }
}
