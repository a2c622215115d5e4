//! Backend selector.
//!
//! `cpu` (default) trains on NdArray, `gpu` on Wgpu. Both get an
//! autodiff wrapper for training; inference runs on the plain backend.

use burn::backend::Autodiff;

#[cfg(feature = "gpu")]
mod backend_impl {
    pub use burn::backend::wgpu::{Wgpu, WgpuDevice};
    pub type MyBackend = Wgpu;

    pub fn get_device() -> WgpuDevice {
        WgpuDevice::default()
    }
}

#[cfg(not(feature = "gpu"))]
mod backend_impl {
    pub use burn::backend::ndarray::{NdArray, NdArrayDevice};
    pub type MyBackend = NdArray;

    pub fn get_device() -> NdArrayDevice {
        NdArrayDevice::Cpu
    }
}

pub use backend_impl::{get_device, MyBackend};

/// Backend with autodiff for training
pub type TrainBackend = Autodiff<MyBackend>;

/// Human-readable name of the compiled backend, for logs.
pub fn backend_name() -> &'static str {
    if cfg!(feature = "gpu") { "WGPU" } else { "CPU (NdArray)" }
}
