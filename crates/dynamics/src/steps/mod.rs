//! The per-substep stages, in pipeline order: integration, particle
//! contacts, link constraints, collider push-out (see `backend`) and the
//! angle limit.

pub mod contact;
pub mod integration;
pub mod link;

use crate::particle::Particle;

/// Mutable access to two distinct particles.
pub(crate) fn pair_mut(particles: &mut [Particle], a: usize, b: usize) -> Option<(&mut Particle, &mut Particle)> {
    if a == b || a >= particles.len() || b >= particles.len() {
        return None;
    }
    if a < b {
        let (head, tail) = particles.split_at_mut(b);
        Some((&mut head[a], &mut tail[0]))
    } else {
        let (head, tail) = particles.split_at_mut(a);
        Some((&mut tail[0], &mut head[b]))
    }
}
