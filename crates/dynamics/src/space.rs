//! Model space: the reference frame a structure simulates in.
//!
//! Simulating relative to a character's root keeps whole-body locomotion
//! from showing up as particle velocity. Each step snapshots the reference
//! node once; every conversion in that step goes through the snapshot.

use crate::hierarchy::{Hierarchy, NodeId};
use glam::{Affine3A, Quat, Vec3};

/// Node name preferred as the simulation reference.
pub const CANONICAL_ROOT: &str = "Root";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelSpace {
    to_world: Affine3A,
    to_model: Affine3A,
    rotation: Quat,
    scale: f32,
}

impl Default for ModelSpace {
    fn default() -> Self {
        Self::world()
    }
}

impl ModelSpace {
    /// The identity frame.
    #[must_use]
    pub fn world() -> Self {
        Self {
            to_world: Affine3A::IDENTITY,
            to_model: Affine3A::IDENTITY,
            rotation: Quat::IDENTITY,
            scale: 1.0,
        }
    }

    /// Picks the reference node for a simulated node: the nearest ancestor
    /// named [`CANONICAL_ROOT`], else the outermost ancestor. `None` for a
    /// node without ancestors, which simulates in world space.
    #[must_use]
    pub fn detect_reference(hierarchy: &Hierarchy, node: NodeId) -> Option<NodeId> {
        hierarchy
            .ancestors(node)
            .find(|a| hierarchy.name(*a) == CANONICAL_ROOT)
            .or_else(|| hierarchy.ancestors(node).last())
    }

    /// Captures the reference node's current world frame.
    ///
    /// Falls back to world space when the reference is missing or its
    /// transform is singular.
    #[must_use]
    pub fn snapshot(hierarchy: &Hierarchy, reference: Option<NodeId>) -> Self {
        let Some(node) = reference.filter(|r| hierarchy.contains(*r)) else {
            return Self::world();
        };
        let to_world = hierarchy.world_matrix(node);
        let scale = hierarchy.world_scale(node);
        if to_world.matrix3.determinant().abs() < f32::EPSILON || scale < f32::EPSILON {
            tracing::debug!(node = hierarchy.name(node), "reference node is degenerate, using world space");
            return Self::world();
        }
        Self {
            to_world,
            to_model: to_world.inverse(),
            rotation: hierarchy.world_rotation(node),
            scale,
        }
    }

    #[must_use]
    pub fn to_model_point(&self, point: Vec3) -> Vec3 {
        self.to_model.transform_point3(point)
    }

    #[must_use]
    pub fn to_world_point(&self, point: Vec3) -> Vec3 {
        self.to_world.transform_point3(point)
    }

    /// Rotates a world direction into model space without scaling it.
    #[must_use]
    pub fn to_model_direction(&self, direction: Vec3) -> Vec3 {
        self.rotation.inverse() * direction
    }

    #[must_use]
    pub fn to_model_rotation(&self, rotation: Quat) -> Quat {
        (self.rotation.inverse() * rotation).normalize()
    }

    #[must_use]
    pub fn to_world_rotation(&self, rotation: Quat) -> Quat {
        (self.rotation * rotation).normalize()
    }

    /// Converts a world length into model units.
    #[must_use]
    pub fn to_model_length(&self, length: f32) -> f32 {
        length / self.scale
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hierarchy::Transform;

    #[test]
    fn prefers_named_root_over_outermost() {
        let mut h = Hierarchy::new();
        let world = h.add_node("World", None, Transform::IDENTITY);
        let root = h.add_node(CANONICAL_ROOT, Some(world), Transform::IDENTITY);
        let bone = h.add_node("Bone", Some(root), Transform::IDENTITY);
        assert_eq!(ModelSpace::detect_reference(&h, bone), Some(root));

        let loose = h.add_node("Loose", Some(world), Transform::IDENTITY);
        assert_eq!(ModelSpace::detect_reference(&h, loose), Some(world));
        assert_eq!(ModelSpace::detect_reference(&h, world), None);
    }

    #[test]
    fn points_round_trip() {
        let mut h = Hierarchy::new();
        let root = h.add_node(
            CANONICAL_ROOT,
            None,
            Transform::from_translation(Vec3::new(3.0, 1.0, -2.0))
                .with_rotation(Quat::from_rotation_y(0.7))
                .with_scale(Vec3::splat(2.0)),
        );
        let space = ModelSpace::snapshot(&h, Some(root));
        let p = Vec3::new(0.3, -4.0, 9.0);
        assert!(space.to_world_point(space.to_model_point(p)).abs_diff_eq(p, 1e-4));
        assert!((space.to_model_length(2.0) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn singular_reference_falls_back_to_world() {
        let mut h = Hierarchy::new();
        let flat = h.add_node("Flat", None, Transform::IDENTITY.with_scale(Vec3::ZERO));
        assert_eq!(ModelSpace::snapshot(&h, Some(flat)), ModelSpace::world());
        assert_eq!(ModelSpace::snapshot(&h, Some(NodeId(42))), ModelSpace::world());
    }
}
