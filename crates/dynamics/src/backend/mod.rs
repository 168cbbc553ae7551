//! Particle versus collider resolution backends.
//!
//! Every backend applies the same push-out functions from
//! `compute::kernels::collide`: spheres in order, then capsules in order, per
//! particle. The backends differ only in where the loop runs.

mod gpu_kernel;
mod parallel;
mod single_thread;

pub use gpu_kernel::GpuKernelBackend;
pub use parallel::ParallelBackend;
pub use single_thread::SingleThreadBackend;

use crate::collider::{Collider, ModelShape};
use crate::hierarchy::Hierarchy;
use crate::space::ModelSpace;
use compute::{CapsuleShape, ParticleCell, SphereShape};

/// Which backend resolves collider contacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ComputeMethod {
    #[default]
    SingleThread,
    ParallelJobs,
    GpuKernel,
}

/// Colliders of one structure in model space, captured once per step.
#[derive(Debug, Clone, Default)]
pub struct CollisionScene {
    pub spheres: Vec<SphereShape>,
    pub capsules: Vec<CapsuleShape>,
}

impl CollisionScene {
    #[must_use]
    pub fn build(colliders: &[Collider], hierarchy: &Hierarchy, space: &ModelSpace) -> Self {
        let mut scene = Self::default();
        for shape in colliders.iter().filter_map(|c| c.to_model(hierarchy, space)) {
            match shape {
                ModelShape::Sphere(sphere) => scene.spheres.push(sphere),
                ModelShape::Capsule(capsule) => scene.capsules.push(capsule),
            }
        }
        scene
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.spheres.is_empty() && self.capsules.is_empty()
    }
}

/// Resolves particle cells against a collision scene in place.
pub trait CollisionBackend: Send + Sync {
    fn method(&self) -> ComputeMethod;

    fn resolve(&self, cells: &mut [ParticleCell], scene: &CollisionScene);
}

/// Creates the backend for `method`.
#[must_use]
pub fn create_backend(method: ComputeMethod) -> Box<dyn CollisionBackend> {
    match method {
        ComputeMethod::SingleThread => Box::new(SingleThreadBackend),
        ComputeMethod::ParallelJobs => Box::new(ParallelBackend),
        ComputeMethod::GpuKernel => Box::new(GpuKernelBackend::shared()),
    }
}
