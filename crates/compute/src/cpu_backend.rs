use crate::{kernels, BufferView, ComputeBackend, ComputeError, Kernel};

/// Host implementation of every [`Kernel`].
///
/// This is the reference the GPU shaders are checked against, and the device
/// used when no adapter is available.
#[derive(Default, Debug, Clone)]
pub struct CpuBackend;

impl CpuBackend {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl ComputeBackend for CpuBackend {
    fn dispatch(
        &self,
        kernel: &Kernel,
        binds: &[BufferView],
        _workgroups: [u32; 3],
    ) -> Result<Vec<Vec<u8>>, ComputeError> {
        for buffer_view in binds {
            let expected_bytes = buffer_view.len() * buffer_view.element_size_in_bytes;

            if buffer_view.data.len() != expected_bytes {
                return Err(ComputeError::ShapeMismatch(
                    "Buffer data length does not match product of shape dimensions and element size",
                ));
            }
        }
        match kernel {
            Kernel::CollideSpheres => kernels::handle_collide_spheres(binds),
            Kernel::CollideCapsules => kernels::handle_collide_capsules(binds),
        }
    }

    fn name(&self) -> &'static str {
        "cpu"
    }
}
