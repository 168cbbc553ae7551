#![deny(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
//! # Dynamics Compute Layer
//!
//! Device abstraction for the collision stage of the dynamics simulator.
//! Work is described as a [`Kernel`] plus a list of byte buffers
//! ([`BufferView`]) and handed to a [`ComputeBackend`]. The [`CpuBackend`]
//! runs the reference implementation of every kernel on the host; with the
//! `gpu` feature the [`WgpuBackend`] runs the WGSL versions from `shaders/`.

use std::sync::Arc;
use thiserror::Error;

pub mod backend;
pub mod cpu_backend;
pub mod kernels;
pub mod layout;
#[cfg(feature = "gpu")]
pub mod wgpu_backend;

pub use backend::ComputeBackend;
pub use cpu_backend::CpuBackend;
pub use kernels::collide::{CapsuleShape, ParticleCell, SphereShape};
#[cfg(feature = "gpu")]
pub use wgpu_backend::WgpuBackend;

#[derive(Error, Debug)]
pub enum ComputeError {
    #[error("buffer shape mismatch: {0}")]
    ShapeMismatch(&'static str),
    #[error("backend not available")]
    BackendUnavailable,
    #[error("device error: {0}")]
    Device(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kernel {
    /// Push every particle cell out of every sphere shape.
    CollideSpheres,
    /// Push every particle cell out of every capsule shape.
    CollideCapsules,
}

impl Kernel {
    #[must_use]
    pub const fn binding_count(&self) -> u32 {
        layout::binding_count(self)
    }
}

#[derive(Clone, Debug)]
pub struct BufferView {
    pub data: Arc<[u8]>,
    pub shape: Vec<usize>, // Number of elements per dimension
    pub element_size_in_bytes: usize,
}

impl BufferView {
    #[must_use]
    pub fn new(data: Arc<[u8]>, shape: Vec<usize>, element_size_in_bytes: usize) -> Self {
        Self { data, shape, element_size_in_bytes }
    }

    /// Packs a slice of POD elements into a one-dimensional view.
    #[must_use]
    pub fn from_slice<T: bytemuck::Pod>(items: &[T]) -> Self {
        let bytes: Arc<[u8]> = bytemuck::cast_slice(items).to_vec().into();
        Self::new(bytes, vec![items.len()], std::mem::size_of::<T>())
    }

    /// Number of elements described by `shape`.
    #[must_use]
    pub fn len(&self) -> usize {
        self.shape.iter().product()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Returns a compute backend if available, falling back to the CPU implementation.
///
/// With the `gpu` feature enabled this will attempt to create a
/// [`WgpuBackend`]. If no adapter is found, a [`CpuBackend`] is returned.
#[must_use]
pub fn default_backend() -> Arc<dyn ComputeBackend> {
    #[cfg(feature = "gpu")]
    {
        match WgpuBackend::new() {
            Ok(gpu) => {
                tracing::info!("Using wgpu compute backend.");
                return Arc::new(gpu);
            }
            Err(err) => {
                tracing::warn!("wgpu backend initialization failed ({err}), falling back to CPU kernels.");
            }
        }
    }

    tracing::info!("Using CPU compute backend.");
    Arc::new(CpuBackend::new())
}
