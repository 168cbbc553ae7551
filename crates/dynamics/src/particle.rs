//! Simulated points bound to hierarchy nodes.

use crate::hierarchy::{Hierarchy, NodeId, Transform};
use crate::math::{self, FULL_ANCHOR};
use crate::space::ModelSpace;
use compute::ParticleCell;
use glam::{Quat, Vec3};

/// Index of a particle inside its structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParticleId(pub usize);

/// Per-particle tuning.
#[derive(Debug, Clone, PartialEq)]
pub struct ParticleSettings {
    /// Pull toward the home position, `0` free to `1` pinned.
    pub position_anchor: f32,
    /// Pull toward the home rotation, `0` free to `1` pinned.
    pub rotation_anchor: f32,
    pub collision_enabled: bool,
    /// Collision sphere radius in model units at unit scale.
    pub collision_radius: f32,
    /// Collision sphere centre in the particle's local frame.
    pub collision_offset: Vec3,
    /// Whether simulation results are written back to the node.
    pub affects_transform: bool,
}

impl Default for ParticleSettings {
    fn default() -> Self {
        Self {
            position_anchor: 0.0,
            rotation_anchor: 0.0,
            collision_enabled: false,
            collision_radius: 0.05,
            collision_offset: Vec3::ZERO,
            affects_transform: true,
        }
    }
}

impl ParticleSettings {
    #[must_use]
    pub fn with_position_anchor(mut self, anchor: f32) -> Self {
        self.position_anchor = anchor;
        self
    }

    #[must_use]
    pub fn with_rotation_anchor(mut self, anchor: f32) -> Self {
        self.rotation_anchor = anchor;
        self
    }

    #[must_use]
    pub fn with_collision(mut self, radius: f32) -> Self {
        self.collision_enabled = true;
        self.collision_radius = radius;
        self
    }

    #[must_use]
    pub fn with_collision_offset(mut self, offset: Vec3) -> Self {
        self.collision_offset = offset;
        self
    }

    #[must_use]
    pub fn with_affects_transform(mut self, affects: bool) -> Self {
        self.affects_transform = affects;
        self
    }
}

/// Verlet state for one node. All positions are in model space.
#[derive(Debug, Clone)]
pub struct Particle {
    node: NodeId,
    depth: usize,
    pub settings: ParticleSettings,
    pub current_position: Vec3,
    pub last_position: Vec3,
    pub rotation: Quat,
    pub home_position: Vec3,
    pub home_rotation: Quat,
    /// Node world scale relative to the model space.
    pub scale: f32,
    home_local: Transform,
    written_local: Option<Transform>,
    initialized: bool,
}

impl Particle {
    /// A particle for `node`. It holds no meaningful state until
    /// [`Particle::initialize`] runs.
    #[must_use]
    pub fn new(node: NodeId, settings: ParticleSettings) -> Self {
        Self {
            node,
            depth: 0,
            settings,
            current_position: Vec3::ZERO,
            last_position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            home_position: Vec3::ZERO,
            home_rotation: Quat::IDENTITY,
            scale: 1.0,
            home_local: Transform::IDENTITY,
            written_local: None,
            initialized: false,
        }
    }

    /// Creates and initializes a particle in one go.
    #[must_use]
    pub fn bind(hierarchy: &Hierarchy, space: &ModelSpace, node: NodeId, settings: ParticleSettings) -> Self {
        let mut particle = Self::new(node, settings);
        particle.initialize(hierarchy, space);
        particle
    }

    /// Captures the home pose from the node and starts at rest there.
    /// Only the first call does any work.
    pub fn initialize(&mut self, hierarchy: &Hierarchy, space: &ModelSpace) {
        if self.initialized {
            return;
        }
        self.initialized = true;
        self.depth = hierarchy.depth(self.node);
        self.home_local = *hierarchy.local(self.node);
        self.home_position = space.to_model_point(hierarchy.world_position(self.node));
        self.home_rotation = space.to_model_rotation(hierarchy.world_rotation(self.node));
        let scale = space.to_model_length(hierarchy.world_scale(self.node));
        self.scale = if scale.is_finite() && scale > 0.0 { scale } else { 1.0 };
        self.snap_to_home();
    }

    #[must_use]
    pub fn node(&self) -> NodeId {
        self.node
    }

    /// Depth of the bound node, used to order write-back parents first.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// The node's local pose as last authored by the host.
    #[must_use]
    pub fn home_local(&self) -> Transform {
        self.home_local
    }

    #[must_use]
    pub fn is_position_anchored(&self) -> bool {
        self.settings.position_anchor > FULL_ANCHOR
    }

    #[must_use]
    pub fn is_rotation_anchored(&self) -> bool {
        self.settings.rotation_anchor > FULL_ANCHOR
    }

    /// Implied velocity over the previous step.
    #[must_use]
    pub fn velocity(&self, last_dt: f32) -> Vec3 {
        if last_dt > 0.0 {
            (self.current_position - self.last_position) / last_dt
        } else {
            Vec3::ZERO
        }
    }

    /// Refreshes the authored local pose.
    ///
    /// A node still holding the pose this particle wrote has not been
    /// animated since, so the previous home pose is kept.
    pub fn capture_home_local(&mut self, hierarchy: &Hierarchy) {
        let local = *hierarchy.local(self.node);
        match self.written_local {
            Some(written) if written.approx_eq(&local, 1e-6) => {}
            _ => {
                self.home_local = local;
                self.written_local = None;
            }
        }
    }

    pub(crate) fn set_home(&mut self, position: Vec3, rotation: Quat, scale: f32) {
        self.home_position = position;
        self.home_rotation = rotation;
        if scale.is_finite() && scale > 0.0 {
            self.scale = scale;
        }
    }

    /// Moves the simulation state to the home pose with zero velocity.
    pub fn snap_to_home(&mut self) {
        self.current_position = self.home_position;
        self.last_position = self.home_position;
        self.rotation = self.home_rotation;
    }

    /// Restores the node to its home pose and restarts from rest.
    ///
    /// Parents must be reset first so the node's world pose is its home pose.
    pub fn reset_to_home_transform(&mut self, hierarchy: &mut Hierarchy, space: &ModelSpace) {
        if self.settings.affects_transform {
            hierarchy.set_local(self.node, self.home_local);
        }
        self.written_local = None;
        let position = space.to_model_point(hierarchy.world_position(self.node));
        let rotation = space.to_model_rotation(hierarchy.world_rotation(self.node));
        let scale = space.to_model_length(hierarchy.world_scale(self.node));
        self.set_home(position, rotation, scale);
        self.snap_to_home();
    }

    /// Writes the simulated pose to the node.
    pub fn write_back(&mut self, hierarchy: &mut Hierarchy, space: &ModelSpace) {
        if !self.settings.affects_transform {
            return;
        }
        hierarchy.set_world_pose(
            self.node,
            space.to_world_point(self.current_position),
            space.to_world_rotation(self.rotation),
        );
        self.written_local = Some(*hierarchy.local(self.node));
    }

    /// Collision sphere in model space.
    #[must_use]
    pub fn collision_cell(&self) -> ParticleCell {
        let center = self.current_position + self.rotation * (self.settings.collision_offset * self.scale);
        ParticleCell {
            center: center.to_array(),
            radius: self.settings.collision_radius.max(0.0) * self.scale,
        }
    }

    /// Replaces non-finite state with the home pose.
    pub(crate) fn sanitize(&mut self) {
        if !self.current_position.is_finite() || !self.last_position.is_finite() || !self.rotation.is_finite() {
            tracing::debug!(node = self.node.0, "particle state became non-finite, snapping home");
            self.snap_to_home();
        }
    }

    /// Eases the state toward home according to the anchors.
    pub(crate) fn blend_toward_home(&mut self, dt_scale: f32) {
        let position_ease = math::anchor_ease(self.settings.position_anchor, dt_scale);
        if position_ease >= 1.0 {
            self.current_position = self.home_position;
        } else if position_ease > 0.0 {
            self.current_position = self.current_position.lerp(self.home_position, position_ease);
        }

        let rotation_ease = math::anchor_ease(self.settings.rotation_anchor, dt_scale);
        if rotation_ease >= 1.0 {
            self.rotation = self.home_rotation;
        } else if rotation_ease > 0.0 {
            self.rotation = self.rotation.slerp(self.home_rotation, rotation_ease).normalize();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single() -> (Hierarchy, Particle) {
        let mut h = Hierarchy::new();
        let node = h.add_node("Tip", None, Transform::from_translation(Vec3::new(0.0, 1.0, 0.0)));
        let p = Particle::bind(&h, &ModelSpace::world(), node, ParticleSettings::default());
        (h, p)
    }

    #[test]
    fn initialize_is_idempotent() {
        let (mut h, mut p) = single();
        assert!(p.initialized);
        h.set_local(p.node(), Transform::from_translation(Vec3::new(5.0, 0.0, 0.0)));
        p.initialize(&h, &ModelSpace::world());
        assert_eq!(p.home_position, Vec3::Y);
        assert_eq!(p.home_local().translation, Vec3::Y);
    }

    #[test]
    fn starts_at_rest_at_node() {
        let (_, p) = single();
        assert_eq!(p.current_position, Vec3::Y);
        assert_eq!(p.velocity(1.0 / 60.0), Vec3::ZERO);
        assert_eq!(p.velocity(0.0), Vec3::ZERO);
    }

    #[test]
    fn written_pose_does_not_become_home() {
        let (mut h, mut p) = single();
        let space = ModelSpace::world();
        p.current_position = Vec3::new(0.5, 0.5, 0.0);
        p.write_back(&mut h, &space);
        p.capture_home_local(&h);
        assert_eq!(p.home_local().translation, Vec3::Y);

        let animated = Transform::from_translation(Vec3::new(2.0, 0.0, 0.0));
        h.set_local(p.node(), animated);
        p.capture_home_local(&h);
        assert_eq!(p.home_local(), animated);
    }

    #[test]
    fn reset_restores_node_and_velocity() {
        let (mut h, mut p) = single();
        let space = ModelSpace::world();
        p.current_position = Vec3::new(3.0, 0.0, 0.0);
        p.write_back(&mut h, &space);
        p.reset_to_home_transform(&mut h, &space);
        assert_eq!(h.local(p.node()).translation, Vec3::Y);
        assert_eq!(p.current_position, Vec3::Y);
        assert_eq!(p.last_position, Vec3::Y);
    }

    #[test]
    fn collision_cell_applies_offset_and_scale() {
        let (_, mut p) = single();
        p.settings = ParticleSettings::default()
            .with_collision(0.1)
            .with_collision_offset(Vec3::X);
        p.scale = 2.0;
        let cell = p.collision_cell();
        assert_eq!(cell.center, [2.0, 1.0, 0.0]);
        assert!((cell.radius - 0.2).abs() < 1e-6);
    }

    #[test]
    fn non_finite_state_snaps_home() {
        let (_, mut p) = single();
        p.current_position = Vec3::splat(f32::NAN);
        p.sanitize();
        assert_eq!(p.current_position, p.home_position);
    }
}
