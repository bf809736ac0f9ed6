use burn::backend::Autodiff;
use burn::tensor::backend::Backend;

#[cfg(not(feature = "wgpu"))]
pub type InnerBackend = burn::backend::NdArray<f32>;
#[cfg(feature = "wgpu")]
pub type InnerBackend = burn::backend::Wgpu<f32>;

/// Backend used for training runs; gradients are tracked by `Autodiff`.
pub type TrainBackend = Autodiff<InnerBackend>;

pub type Device = <TrainBackend as Backend>::Device;

pub fn default_device() -> Device {
    Device::default()
}
