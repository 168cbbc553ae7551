use super::pair_mut;
use crate::math;
use crate::particle::Particle;
use std::collections::HashSet;

/// Ordered `(low, high)` index pair, the key of a linked pair.
#[must_use]
pub fn pair_key(a: usize, b: usize) -> (usize, usize) {
    (a.min(b), a.max(b))
}

/// Separates overlapping collision spheres of unlinked particle pairs.
///
/// The separation is shared according to the particles' position anchors;
/// coincident centres are skipped.
pub fn collide_particles(particles: &mut [Particle], linked: &HashSet<(usize, usize)>) {
    let count = particles.len();
    for i in 0..count {
        for j in (i + 1)..count {
            if linked.contains(&(i, j)) {
                continue;
            }
            let Some((a, b)) = pair_mut(particles, i, j) else {
                continue;
            };
            if !a.settings.collision_enabled || !b.settings.collision_enabled {
                continue;
            }
            let cell_a = a.collision_cell();
            let cell_b = b.collision_cell();
            let min_distance = cell_a.radius + cell_b.radius;
            let delta = glam::Vec3::from(cell_b.center) - glam::Vec3::from(cell_a.center);
            if delta.length_squared() >= min_distance * min_distance {
                continue;
            }
            let Some((direction, distance)) = math::try_direction(delta) else {
                continue;
            };
            let Some((share_a, share_b)) =
                math::free_weights(a.settings.position_anchor, b.settings.position_anchor)
            else {
                continue;
            };
            let push = direction * (min_distance - distance);
            a.current_position -= push * share_a;
            b.current_position += push * share_b;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hierarchy::{Hierarchy, Transform};
    use crate::particle::ParticleSettings;
    use crate::space::ModelSpace;
    use glam::Vec3;

    fn two_close(anchor_a: f32) -> Vec<Particle> {
        let mut h = Hierarchy::new();
        let a = h.add_node("A", None, Transform::IDENTITY);
        let b = h.add_node("B", None, Transform::from_translation(Vec3::new(0.1, 0.0, 0.0)));
        let space = ModelSpace::world();
        vec![
            Particle::bind(&h, &space, a, ParticleSettings::default().with_collision(0.1).with_position_anchor(anchor_a)),
            Particle::bind(&h, &space, b, ParticleSettings::default().with_collision(0.1)),
        ]
    }

    #[test]
    fn overlapping_pair_separates_evenly() {
        let mut particles = two_close(0.0);
        collide_particles(&mut particles, &HashSet::new());
        let gap = particles[1].current_position.x - particles[0].current_position.x;
        assert!((gap - 0.2).abs() < 1e-6);
        assert!((particles[0].current_position.x + 0.05).abs() < 1e-6);
    }

    #[test]
    fn pinned_particle_does_not_move() {
        let mut particles = two_close(1.0);
        collide_particles(&mut particles, &HashSet::new());
        assert_eq!(particles[0].current_position, Vec3::ZERO);
        assert!((particles[1].current_position.x - 0.2).abs() < 1e-6);
    }

    #[test]
    fn linked_pairs_are_ignored() {
        let mut particles = two_close(0.0);
        let linked = HashSet::from([pair_key(1, 0)]);
        collide_particles(&mut particles, &linked);
        assert!((particles[1].current_position.x - 0.1).abs() < 1e-6);
    }
}
