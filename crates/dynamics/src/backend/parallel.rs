use super::{CollisionBackend, CollisionScene, ComputeMethod};
use compute::kernels::collide::{push_out_of_capsule, push_out_of_sphere};
use compute::ParticleCell;
use rayon::prelude::*;

/// Below this many cells a parallel-for costs more than it saves.
const MIN_CELLS_PER_TASK: usize = 64;

/// One data-parallel pass over the particle cells per collider.
///
/// Cells are independent within a pass, and passes run in collider order,
/// so the result matches [`super::SingleThreadBackend`] exactly.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParallelBackend;

impl CollisionBackend for ParallelBackend {
    fn method(&self) -> ComputeMethod {
        ComputeMethod::ParallelJobs
    }

    fn resolve(&self, cells: &mut [ParticleCell], scene: &CollisionScene) {
        for sphere in &scene.spheres {
            cells
                .par_iter_mut()
                .with_min_len(MIN_CELLS_PER_TASK)
                .for_each(|cell| push_out_of_sphere(cell, sphere));
        }
        for capsule in &scene.capsules {
            cells
                .par_iter_mut()
                .with_min_len(MIN_CELLS_PER_TASK)
                .for_each(|cell| push_out_of_capsule(cell, capsule));
        }
    }
}
