use super::{CollisionBackend, CollisionScene, ComputeMethod, SingleThreadBackend};
use compute::kernels::collide::read_elements;
use compute::layout::workgroups_for;
use compute::{BufferView, ComputeBackend, ComputeError, Kernel, ParticleCell};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

static SHARED_DEVICE: OnceLock<Arc<dyn ComputeBackend>> = OnceLock::new();

/// Dispatches the collision kernels through a [`ComputeBackend`].
///
/// When a dispatch fails the step is resolved on the CPU instead, with a
/// warning logged the first time.
pub struct GpuKernelBackend {
    device: Arc<dyn ComputeBackend>,
    warned: AtomicBool,
}

impl GpuKernelBackend {
    #[must_use]
    pub fn new(device: Arc<dyn ComputeBackend>) -> Self {
        Self {
            device,
            warned: AtomicBool::new(false),
        }
    }

    /// Uses the process-wide device, acquiring it on first use.
    #[must_use]
    pub fn shared() -> Self {
        Self::new(SHARED_DEVICE.get_or_init(compute::default_backend).clone())
    }

    fn try_resolve(&self, cells: &mut [ParticleCell], scene: &CollisionScene) -> Result<(), ComputeError> {
        let passes = [
            (Kernel::CollideSpheres, scene.spheres.is_empty(), BufferView::from_slice(&scene.spheres)),
            (Kernel::CollideCapsules, scene.capsules.is_empty(), BufferView::from_slice(&scene.capsules)),
        ];
        for (kernel, empty, shapes) in passes {
            if empty {
                continue;
            }
            let particles = BufferView::from_slice(cells);
            let output = self
                .device
                .dispatch(&kernel, &[particles, shapes], workgroups_for(cells.len()))?;
            let view = output
                .into_iter()
                .next()
                .map(|bytes| BufferView::new(bytes.into(), vec![cells.len()], std::mem::size_of::<ParticleCell>()))
                .ok_or(ComputeError::ShapeMismatch("collision kernel returned no buffers"))?;
            let updated = read_elements::<ParticleCell>(&view, "collision kernel output layout")?;
            if updated.len() != cells.len() {
                return Err(ComputeError::ShapeMismatch("collision kernel output length"));
            }
            cells.copy_from_slice(&updated);
        }
        Ok(())
    }
}

impl CollisionBackend for GpuKernelBackend {
    fn method(&self) -> ComputeMethod {
        ComputeMethod::GpuKernel
    }

    fn resolve(&self, cells: &mut [ParticleCell], scene: &CollisionScene) {
        if cells.is_empty() || scene.is_empty() {
            return;
        }
        let original = cells.to_vec();
        if let Err(err) = self.try_resolve(cells, scene) {
            if !self.warned.swap(true, Ordering::Relaxed) {
                tracing::warn!(
                    device = self.device.name(),
                    "collision kernel dispatch failed, resolving on the CPU: {err}"
                );
            }
            cells.copy_from_slice(&original);
            SingleThreadBackend.resolve(cells, scene);
        }
    }
}
