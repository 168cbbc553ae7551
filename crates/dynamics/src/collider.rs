//! Static sphere and capsule colliders attached to hierarchy nodes.

use crate::hierarchy::{Hierarchy, NodeId};
use crate::space::ModelSpace;
use compute::{CapsuleShape, SphereShape};
use glam::{Quat, Vec3};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ColliderId(pub usize);

/// Collider geometry in the node's local frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ColliderShape {
    Sphere {
        center: Vec3,
        radius: f32,
    },
    /// Capsule along the local Y axis of `rotation`; `height` includes the
    /// hemispherical caps.
    Capsule {
        center: Vec3,
        radius: f32,
        height: f32,
        rotation: Quat,
    },
}

impl ColliderShape {
    #[must_use]
    pub fn sphere(radius: f32) -> Self {
        Self::Sphere {
            center: Vec3::ZERO,
            radius,
        }
    }

    #[must_use]
    pub fn capsule(radius: f32, height: f32) -> Self {
        Self::Capsule {
            center: Vec3::ZERO,
            radius,
            height,
            rotation: Quat::IDENTITY,
        }
    }
}

/// Collider geometry resolved into model space for one step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ModelShape {
    Sphere(SphereShape),
    Capsule(CapsuleShape),
}

#[derive(Debug, Clone)]
pub struct Collider {
    node: NodeId,
    pub shape: ColliderShape,
    pub enabled: bool,
}

impl Collider {
    #[must_use]
    pub fn new(node: NodeId, shape: ColliderShape) -> Self {
        Self {
            node,
            shape,
            enabled: true,
        }
    }

    #[must_use]
    pub fn node(&self) -> NodeId {
        self.node
    }

    /// Places the collider in model space using the node's current pose.
    ///
    /// Disabled colliders and those with a non-positive or non-finite
    /// radius yield `None`.
    #[must_use]
    pub fn to_model(&self, hierarchy: &Hierarchy, space: &ModelSpace) -> Option<ModelShape> {
        if !self.enabled || !hierarchy.contains(self.node) {
            return None;
        }
        let world = hierarchy.world_matrix(self.node);
        let scale = hierarchy.world_scale(self.node);
        let shape = match self.shape {
            ColliderShape::Sphere { center, radius } => {
                let center = space.to_model_point(world.transform_point3(center));
                ModelShape::Sphere(SphereShape {
                    center: center.to_array(),
                    radius: space.to_model_length(radius * scale),
                })
            }
            ColliderShape::Capsule {
                center,
                radius,
                height,
                rotation,
            } => {
                let center = world.transform_point3(center);
                let axis = (hierarchy.world_rotation(self.node) * rotation * Vec3::Y).normalize_or_zero();
                let half_segment = (height * 0.5 - radius).max(0.0) * scale;
                let start = space.to_model_point(center - axis * half_segment);
                let end = space.to_model_point(center + axis * half_segment);
                ModelShape::Capsule(CapsuleShape {
                    start: start.to_array(),
                    radius: space.to_model_length(radius * scale),
                    end: end.to_array(),
                    _pad: 0.0,
                })
            }
        };
        let (radius, finite) = match &shape {
            ModelShape::Sphere(s) => (s.radius, s.center.iter().all(|c| c.is_finite())),
            ModelShape::Capsule(c) => (
                c.radius,
                c.start.iter().chain(&c.end).all(|v| v.is_finite()),
            ),
        };
        (finite && radius.is_finite() && radius > 0.0).then_some(shape)
    }

    /// The same geometry in world space.
    #[must_use]
    pub fn to_world(&self, hierarchy: &Hierarchy) -> Option<ModelShape> {
        self.to_model(hierarchy, &ModelSpace::world())
    }
}
