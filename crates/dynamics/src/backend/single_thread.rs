use super::{CollisionBackend, CollisionScene, ComputeMethod};
use compute::kernels::collide::{push_out_of_capsule, push_out_of_sphere};
use compute::ParticleCell;

/// Sequential loop over particles and colliders.
#[derive(Debug, Clone, Copy, Default)]
pub struct SingleThreadBackend;

impl CollisionBackend for SingleThreadBackend {
    fn method(&self) -> ComputeMethod {
        ComputeMethod::SingleThread
    }

    fn resolve(&self, cells: &mut [ParticleCell], scene: &CollisionScene) {
        for cell in cells {
            for sphere in &scene.spheres {
                push_out_of_sphere(cell, sphere);
            }
            for capsule in &scene.capsules {
                push_out_of_capsule(cell, capsule);
            }
        }
    }
}
