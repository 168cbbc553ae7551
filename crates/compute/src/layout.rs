pub const STORAGE_PARTICLES: u32 = 0; // read-write, read back after dispatch
pub const STORAGE_SHAPES: u32 = 1; // read-only

pub const WORKGROUP_SIZE: u32 = 64;

const _: () = assert!(STORAGE_PARTICLES == 0);

/// Return expected number of bindings for each kernel.
#[must_use]
pub const fn binding_count(kernel: &crate::Kernel) -> u32 {
    match kernel {
        crate::Kernel::CollideSpheres | crate::Kernel::CollideCapsules => 2,
    }
}

/// Number of workgroups needed to cover `elements` invocations.
#[must_use]
pub fn workgroups_for(elements: usize) -> [u32; 3] {
    let elements = u32::try_from(elements).unwrap_or(u32::MAX);
    [elements.div_ceil(WORKGROUP_SIZE).max(1), 1, 1]
}
