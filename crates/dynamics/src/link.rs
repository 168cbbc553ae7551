//! Distance and rotation constraints between two particles.

use crate::math;
use crate::particle::{Particle, ParticleId};
use glam::{Quat, Vec3};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LinkId(pub usize);

#[derive(Debug, Clone, PartialEq)]
pub struct LinkSettings {
    /// `0` holds the rest length rigidly, `1` never corrects it.
    pub stretchiness: f32,
    /// Pull of the end toward its rest direction in the start's frame.
    pub rotation_anchor_strength: f32,
    /// `0` disables the cone limit; toward `1` the cone closes around home.
    pub angle_limiting: f32,
    pub propagate_rotation_to_start: bool,
    pub propagate_rotation_to_end: bool,
}

impl Default for LinkSettings {
    fn default() -> Self {
        Self {
            stretchiness: 0.0,
            rotation_anchor_strength: 0.0,
            angle_limiting: 0.0,
            propagate_rotation_to_start: true,
            propagate_rotation_to_end: false,
        }
    }
}

impl LinkSettings {
    #[must_use]
    pub fn with_stretchiness(mut self, stretchiness: f32) -> Self {
        self.stretchiness = stretchiness;
        self
    }

    #[must_use]
    pub fn with_rotation_anchor(mut self, strength: f32) -> Self {
        self.rotation_anchor_strength = strength;
        self
    }

    #[must_use]
    pub fn with_angle_limiting(mut self, limiting: f32) -> Self {
        self.angle_limiting = limiting;
        self
    }

    #[must_use]
    pub fn with_propagation(mut self, to_start: bool, to_end: bool) -> Self {
        self.propagate_rotation_to_start = to_start;
        self.propagate_rotation_to_end = to_end;
        self
    }
}

/// Constraint from `start` to `end`, with rest data captured once.
#[derive(Debug, Clone)]
pub struct Link {
    pub start: ParticleId,
    pub end: ParticleId,
    pub settings: LinkSettings,
    rest_length: f32,
    start_local_direction: Vec3,
    relative_rotation: Quat,
    initialized: bool,
    enabled: bool,
}

impl Link {
    #[must_use]
    pub fn new(start: ParticleId, end: ParticleId, settings: LinkSettings) -> Self {
        Self {
            start,
            end,
            settings,
            rest_length: 0.0,
            start_local_direction: Vec3::Y,
            relative_rotation: Quat::IDENTITY,
            initialized: false,
            enabled: false,
        }
    }

    /// Captures rest length and relative orientation from the endpoints'
    /// current state. Only the first call does any work.
    ///
    /// A missing endpoint, a self link or coincident endpoints leave the
    /// link disabled. Returns whether the link is enabled.
    pub fn initialize(&mut self, particles: &[Particle]) -> bool {
        if self.initialized {
            return self.enabled;
        }
        self.initialized = true;

        let (Some(start), Some(end)) = (particles.get(self.start.0), particles.get(self.end.0)) else {
            tracing::warn!(start = self.start.0, end = self.end.0, "link references a missing particle, disabling");
            return false;
        };
        if self.start == self.end {
            tracing::warn!(particle = self.start.0, "link connects a particle to itself, disabling");
            return false;
        }
        let Some((direction, length)) = math::try_direction(end.current_position - start.current_position) else {
            tracing::warn!(start = self.start.0, end = self.end.0, "link endpoints coincide, disabling");
            return false;
        };

        self.rest_length = length / start.scale;
        self.start_local_direction = (start.rotation.inverse() * direction).normalize();
        self.relative_rotation = (start.rotation.inverse() * end.rotation).normalize();
        self.enabled = true;
        true
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Rest length at unit scale.
    #[must_use]
    pub fn rest_length(&self) -> f32 {
        self.rest_length
    }

    /// Rest direction toward the end, in the start particle's frame.
    #[must_use]
    pub fn start_local_direction(&self) -> Vec3 {
        self.start_local_direction
    }

    /// End rotation expressed in the start's frame at rest.
    #[must_use]
    pub fn relative_rotation(&self) -> Quat {
        self.relative_rotation
    }

    /// Re-points particle indices after a removal. Returns `false` when
    /// either endpoint was the removed particle.
    pub(crate) fn remap_after_removal(&mut self, removed: usize) -> bool {
        if self.start.0 == removed || self.end.0 == removed {
            return false;
        }
        if self.start.0 > removed {
            self.start.0 -= 1;
        }
        if self.end.0 > removed {
            self.end.0 -= 1;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hierarchy::{Hierarchy, Transform};
    use crate::particle::ParticleSettings;
    use crate::space::ModelSpace;

    fn pair(offset: Vec3) -> Vec<Particle> {
        let mut h = Hierarchy::new();
        let a = h.add_node("A", None, Transform::IDENTITY);
        let b = h.add_node("B", Some(a), Transform::from_translation(offset));
        let space = ModelSpace::world();
        vec![
            Particle::bind(&h, &space, a, ParticleSettings::default()),
            Particle::bind(&h, &space, b, ParticleSettings::default()),
        ]
    }

    #[test]
    fn captures_rest_length_once() {
        let mut particles = pair(Vec3::new(0.0, -2.0, 0.0));
        let mut link = Link::new(ParticleId(0), ParticleId(1), LinkSettings::default());
        assert!(link.initialize(&particles));
        assert!((link.rest_length() - 2.0).abs() < 1e-6);
        assert!(link.start_local_direction().abs_diff_eq(Vec3::NEG_Y, 1e-6));

        particles[1].current_position = Vec3::new(0.0, -5.0, 0.0);
        assert!(link.initialize(&particles));
        assert!((link.rest_length() - 2.0).abs() < 1e-6);
    }

    #[test]
    fn invalid_links_are_disabled() {
        let particles = pair(Vec3::ZERO);
        let mut coincident = Link::new(ParticleId(0), ParticleId(1), LinkSettings::default());
        assert!(!coincident.initialize(&particles));

        let mut dangling = Link::new(ParticleId(0), ParticleId(7), LinkSettings::default());
        assert!(!dangling.initialize(&particles));

        let mut looped = Link::new(ParticleId(1), ParticleId(1), LinkSettings::default());
        assert!(!looped.initialize(&particles));
        assert!(!looped.is_enabled());
    }

    #[test]
    fn remap_shifts_indices_past_removed() {
        let mut link = Link::new(ParticleId(2), ParticleId(4), LinkSettings::default());
        assert!(link.remap_after_removal(3));
        assert_eq!((link.start, link.end), (ParticleId(2), ParticleId(3)));
        assert!(!link.remap_after_removal(2));
    }
}
