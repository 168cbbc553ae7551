use crate::{BufferView, ComputeError, Kernel};

pub trait ComputeBackend: Send + Sync + 'static {
    /// Dispatches a kernel with the given bindings and workgroup configuration.
    ///
    /// # Arguments
    /// * `kernel`: The kernel to dispatch.
    /// * `binds`: A slice of `BufferView`s in binding order (see [`crate::layout`]).
    /// * `workgroups`: The number of workgroups to dispatch.
    ///
    /// # Returns
    ///
    /// Returns `Ok(Vec<Vec<u8>>)` where each inner `Vec<u8>` holds the bytes of a
    /// buffer the kernel wrote to, in binding order. For the collision kernels
    /// this is a single buffer: the updated particle cells.
    ///
    /// # Errors
    ///
    /// Returns `ComputeError::ShapeMismatch` if any input buffers are invalid.
    /// May return other `ComputeError` variants depending on the backend implementation.
    fn dispatch(
        &self,
        kernel: &Kernel,
        binds: &[BufferView],
        workgroups: [u32; 3],
    ) -> Result<Vec<Vec<u8>>, ComputeError>;

    /// Short label used in logs.
    fn name(&self) -> &'static str;
}
