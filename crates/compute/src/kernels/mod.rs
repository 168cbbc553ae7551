//! Host implementations of the compute kernels.

pub mod collide;
pub use collide::{handle_collide_capsules, handle_collide_spheres};
