use crate::math;
use crate::particle::Particle;
use glam::Vec3;

/// Advances every particle by one Verlet step, then eases it toward home.
///
/// Velocity is implied by the previous step: `(current - last) / last_dt`,
/// zero when there was no previous step. Gravity scales with the particle.
pub fn integrate(particles: &mut [Particle], gravity: Vec3, friction: f32, dt: f32, last_dt: f32) {
    let dt_scale = math::dt_scale(dt);
    let decay = math::friction_decay(friction, dt_scale);
    for particle in particles {
        let velocity = particle.velocity(last_dt) * decay;
        let acceleration = gravity * particle.scale;
        particle.last_position = particle.current_position;
        particle.current_position += (velocity + acceleration * dt) * dt;
        particle.blend_toward_home(dt_scale);
    }
}
