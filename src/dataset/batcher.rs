use burn::tensor::{backend::Backend, Int, Tensor, TensorData};

use crate::dataset::split::{ImageShape, ImageSplit};

/// A mini-batch ready for a model: images and their class indices.
#[derive(Clone, Debug)]
pub struct ImageBatch<B: Backend> {
    /// `[batch, channels, height, width]`, pixels scaled to `[0, 1]`.
    pub images: Tensor<B, 4>,
    /// `[batch]` class indices.
    pub targets: Tensor<B, 1, Int>,
}

impl<B: Backend> ImageBatch<B> {
    pub fn len(&self) -> usize {
        self.targets.dims()[0]
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Copies selected images out of a split into framework tensors.
#[derive(Clone, Copy, Debug)]
pub struct ImageBatcher {
    shape: ImageShape,
}

impl ImageBatcher {
    pub fn new(shape: ImageShape) -> Self {
        ImageBatcher { shape }
    }

    /// Builds one batch from `indices`, in the given order.
    ///
    /// Stored images are height-width-channel bytes; the batch is laid out
    /// channel-first as convolution layers expect.
    pub fn batch<B: Backend>(
        &self,
        split: &ImageSplit,
        indices: &[usize],
        device: &B::Device,
    ) -> ImageBatch<B> {
        let ImageShape { width, height, channels } = self.shape;
        let plane = self.shape.plane();
        let mut pixels = Vec::with_capacity(indices.len() * self.shape.pixels());
        let mut targets = Vec::with_capacity(indices.len());

        for &index in indices {
            let image = split.image(index);
            for c in 0..channels {
                pixels.extend(
                    image[c..]
                        .iter()
                        .step_by(channels)
                        .take(plane)
                        .map(|&px| px as f32 / 255.0),
                );
            }
            targets.push(split.label(index) as i64);
        }

        let n = indices.len();
        let images =
            Tensor::<B, 4>::from_data(TensorData::new(pixels, [n, channels, height, width]), device);
        let targets = Tensor::<B, 1, Int>::from_data(TensorData::new(targets, [n]), device);

        ImageBatch { images, targets }
    }
}
