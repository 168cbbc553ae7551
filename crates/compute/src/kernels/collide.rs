//! Particle versus static collider push-out.
//!
//! The functions in this module are the single definition of the collision
//! response. The sequential and parallel CPU paths call them directly, the
//! CPU kernel handlers call them per particle, and `shaders/collide_*.wgsl`
//! mirror them line for line.

use crate::{BufferView, ComputeError};

/// Squared lengths below this are treated as degenerate and skipped.
pub const DEGENERATE_EPSILON: f32 = 1e-10;

/// A particle's collision sphere in model space.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ParticleCell {
    pub center: [f32; 3],
    pub radius: f32,
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct SphereShape {
    pub center: [f32; 3],
    pub radius: f32,
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CapsuleShape {
    pub start: [f32; 3],
    pub radius: f32,
    pub end: [f32; 3],
    pub _pad: f32,
}

fn sub(a: [f32; 3], b: [f32; 3]) -> [f32; 3] {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

fn dot(a: [f32; 3], b: [f32; 3]) -> f32 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

/// Moves `cell` radially away from `center` until the two spheres touch.
///
/// Leaves the cell untouched when it does not overlap or when the centres
/// coincide (no separation direction exists).
fn push_out_of_point(cell: &mut ParticleCell, center: [f32; 3], radius: f32) {
    let delta = sub(cell.center, center);
    let min_distance = cell.radius + radius;
    let distance_sq = dot(delta, delta);
    if distance_sq >= min_distance * min_distance || distance_sq < DEGENERATE_EPSILON {
        return;
    }
    let scale = min_distance / distance_sq.sqrt();
    cell.center = [
        center[0] + delta[0] * scale,
        center[1] + delta[1] * scale,
        center[2] + delta[2] * scale,
    ];
}

/// Closest point to `point` on the segment `start..end`.
#[must_use]
pub fn closest_point_on_segment(point: [f32; 3], start: [f32; 3], end: [f32; 3]) -> [f32; 3] {
    let axis = sub(end, start);
    let length_sq = dot(axis, axis);
    let t = if length_sq < DEGENERATE_EPSILON {
        0.0
    } else {
        (dot(sub(point, start), axis) / length_sq).clamp(0.0, 1.0)
    };
    [
        start[0] + axis[0] * t,
        start[1] + axis[1] * t,
        start[2] + axis[2] * t,
    ]
}

pub fn push_out_of_sphere(cell: &mut ParticleCell, sphere: &SphereShape) {
    push_out_of_point(cell, sphere.center, sphere.radius);
}

pub fn push_out_of_capsule(cell: &mut ParticleCell, capsule: &CapsuleShape) {
    let closest = closest_point_on_segment(cell.center, capsule.start, capsule.end);
    push_out_of_point(cell, closest, capsule.radius);
}

/// Copies a buffer into typed elements. Byte buffers carry no alignment
/// guarantee, so this never casts in place.
pub fn read_elements<T: bytemuck::Pod>(
    view: &BufferView,
    what: &'static str,
) -> Result<Vec<T>, ComputeError> {
    if view.element_size_in_bytes != std::mem::size_of::<T>()
        || view.data.len() % std::mem::size_of::<T>() != 0
    {
        return Err(ComputeError::ShapeMismatch(what));
    }
    Ok(bytemuck::pod_collect_to_vec(&view.data))
}

fn run_collide<S: bytemuck::Pod>(
    binds: &[BufferView],
    label: &'static str,
    resolve: fn(&mut ParticleCell, &S),
) -> Result<Vec<Vec<u8>>, ComputeError> {
    if binds.len() < 2 {
        return Err(ComputeError::ShapeMismatch(label));
    }
    let mut cells = read_elements::<ParticleCell>(&binds[0], "particle buffer layout")?;
    let shapes = read_elements::<S>(&binds[1], "shape buffer layout")?;

    for cell in &mut cells {
        for shape in &shapes {
            resolve(cell, shape);
        }
    }
    Ok(vec![bytemuck::cast_slice(&cells).to_vec()])
}

/// CPU implementation of `Kernel::CollideSpheres`.
///
/// Bindings: `0` particle cells (read-write), `1` sphere shapes.
///
/// # Errors
///
/// `ShapeMismatch` when fewer than two buffers are bound or a buffer does not
/// hold whole elements of the expected layout.
pub fn handle_collide_spheres(binds: &[BufferView]) -> Result<Vec<Vec<u8>>, ComputeError> {
    run_collide::<SphereShape>(
        binds,
        "CollideSpheres expects 2 buffers (particles, spheres)",
        push_out_of_sphere,
    )
}

/// CPU implementation of `Kernel::CollideCapsules`.
///
/// Bindings: `0` particle cells (read-write), `1` capsule shapes.
///
/// # Errors
///
/// `ShapeMismatch` when fewer than two buffers are bound or a buffer does not
/// hold whole elements of the expected layout.
pub fn handle_collide_capsules(binds: &[BufferView]) -> Result<Vec<Vec<u8>>, ComputeError> {
    run_collide::<CapsuleShape>(
        binds,
        "CollideCapsules expects 2 buffers (particles, capsules)",
        push_out_of_capsule,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ComputeBackend, CpuBackend, Kernel};

    fn length(v: [f32; 3]) -> f32 {
        dot(v, v).sqrt()
    }

    #[test]
    fn sphere_pushes_overlapping_cell_to_surface() {
        let mut cell = ParticleCell { center: [0.05, 0.0, 0.0], radius: 0.1 };
        let sphere = SphereShape { center: [0.0, 0.0, 0.0], radius: 0.2 };
        push_out_of_sphere(&mut cell, &sphere);
        assert!((cell.center[0] - 0.3).abs() < 1e-6, "{:?}", cell.center);
        assert!(cell.center[1].abs() < 1e-6);
    }

    #[test]
    fn coincident_centres_are_left_alone() {
        let mut cell = ParticleCell { center: [1.0, 2.0, 3.0], radius: 0.1 };
        let sphere = SphereShape { center: [1.0, 2.0, 3.0], radius: 0.2 };
        push_out_of_sphere(&mut cell, &sphere);
        assert_eq!(cell.center, [1.0, 2.0, 3.0]);
    }

    #[test]
    fn capsule_pushes_along_segment_normal() {
        let capsule = CapsuleShape {
            start: [0.0, -1.0, 0.0],
            radius: 0.5,
            end: [0.0, 1.0, 0.0],
            _pad: 0.0,
        };
        let mut cell = ParticleCell { center: [0.2, 0.5, 0.0], radius: 0.1 };
        push_out_of_capsule(&mut cell, &capsule);
        let radial = [cell.center[0], 0.0, cell.center[2]];
        assert!((length(radial) - 0.6).abs() < 1e-6);
        assert!((cell.center[1] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn degenerate_capsule_behaves_like_sphere() {
        let closest = closest_point_on_segment([3.0, 0.0, 0.0], [1.0, 1.0, 1.0], [1.0, 1.0, 1.0]);
        assert_eq!(closest, [1.0, 1.0, 1.0]);
    }

    #[test]
    fn kernel_matches_direct_calls() {
        let cells = vec![
            ParticleCell { center: [0.1, 0.0, 0.0], radius: 0.1 },
            ParticleCell { center: [2.0, 0.0, 0.0], radius: 0.1 },
            ParticleCell { center: [0.0, 0.15, 0.0], radius: 0.05 },
        ];
        let spheres = vec![
            SphereShape { center: [0.0, 0.0, 0.0], radius: 0.2 },
            SphereShape { center: [2.1, 0.0, 0.0], radius: 0.05 },
        ];

        let mut expected = cells.clone();
        for sphere in &spheres {
            for cell in &mut expected {
                push_out_of_sphere(cell, sphere);
            }
        }

        let result = CpuBackend::new()
            .dispatch(
                &Kernel::CollideSpheres,
                &[BufferView::from_slice(&cells), BufferView::from_slice(&spheres)],
                [1, 1, 1],
            )
            .expect("Dispatch failed");
        assert_eq!(result.len(), 1);
        let actual: Vec<ParticleCell> = bytemuck::pod_collect_to_vec(&result[0]);
        assert_eq!(actual, expected);
    }

    #[test]
    fn empty_shape_buffer_is_a_no_op() {
        let cells = vec![ParticleCell { center: [0.0, 0.0, 0.0], radius: 1.0 }];
        let result = CpuBackend::new()
            .dispatch(
                &Kernel::CollideCapsules,
                &[
                    BufferView::from_slice(&cells),
                    BufferView::from_slice::<CapsuleShape>(&[]),
                ],
                [1, 1, 1],
            )
            .expect("Dispatch failed");
        let actual: Vec<ParticleCell> = bytemuck::pod_collect_to_vec(&result[0]);
        assert_eq!(actual, cells);
    }
}
