//! A minimal transform hierarchy standing in for a host scene graph.
//!
//! Nodes live in an arena and are addressed by [`NodeId`]. Each node owns a
//! local [`Transform`] relative to its parent; world poses are composed on
//! demand. Parents are always created before their children.

use glam::{Affine3A, Quat, Vec3};

/// Translation, rotation and scale relative to a parent node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Self = Self {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    #[must_use]
    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            ..Self::IDENTITY
        }
    }

    #[must_use]
    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }

    #[must_use]
    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    #[must_use]
    pub fn to_affine(&self) -> Affine3A {
        Affine3A::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }

    /// Component-wise comparison with a tolerance. Rotations compare by
    /// absolute dot product so `q` and `-q` are equal.
    #[must_use]
    pub fn approx_eq(&self, other: &Self, tolerance: f32) -> bool {
        self.translation.abs_diff_eq(other.translation, tolerance)
            && self.scale.abs_diff_eq(other.scale, tolerance)
            && self.rotation.dot(other.rotation).abs() >= 1.0 - tolerance
    }
}

/// Handle to a node in a [`Hierarchy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

#[derive(Debug, Clone)]
struct Node {
    name: String,
    parent: Option<NodeId>,
    local: Transform,
}

/// Arena of named nodes with parent links.
///
/// Accessors taking a [`NodeId`] panic when the id was not issued by this
/// hierarchy; use [`Hierarchy::contains`] to validate foreign ids.
#[derive(Debug, Clone, Default)]
pub struct Hierarchy {
    nodes: Vec<Node>,
}

impl Hierarchy {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a node. A `parent` that does not exist makes the node a root.
    pub fn add_node(&mut self, name: &str, parent: Option<NodeId>, local: Transform) -> NodeId {
        let parent = parent.filter(|p| self.contains(*p));
        self.nodes.push(Node {
            name: name.to_owned(),
            parent,
            local,
        });
        NodeId(self.nodes.len() - 1)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[must_use]
    pub fn contains(&self, id: NodeId) -> bool {
        id.0 < self.nodes.len()
    }

    #[must_use]
    pub fn name(&self, id: NodeId) -> &str {
        &self.nodes[id.0].name
    }

    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    /// Parent chain of `id`, nearest first, excluding `id` itself.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |node| self.parent(*node))
    }

    #[must_use]
    pub fn depth(&self, id: NodeId) -> usize {
        self.ancestors(id).count()
    }

    /// True when `id` is `root` or lies below it.
    #[must_use]
    pub fn is_within(&self, id: NodeId, root: NodeId) -> bool {
        id == root || self.ancestors(id).any(|a| a == root)
    }

    /// First node with `name`, in creation order.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<NodeId> {
        self.nodes.iter().position(|n| n.name == name).map(NodeId)
    }

    /// First node with `name` inside the subtree rooted at `root`, in creation order.
    #[must_use]
    pub fn find_in_subtree(&self, root: NodeId, name: &str) -> Option<NodeId> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.name == name)
            .map(|(i, _)| NodeId(i))
            .find(|id| self.is_within(*id, root))
    }

    #[must_use]
    pub fn local(&self, id: NodeId) -> &Transform {
        &self.nodes[id.0].local
    }

    pub fn set_local(&mut self, id: NodeId, local: Transform) {
        self.nodes[id.0].local = local;
    }

    #[must_use]
    pub fn world_matrix(&self, id: NodeId) -> Affine3A {
        let local = self.local(id).to_affine();
        match self.parent(id) {
            Some(parent) => self.world_matrix(parent) * local,
            None => local,
        }
    }

    #[must_use]
    pub fn world_position(&self, id: NodeId) -> Vec3 {
        self.world_matrix(id).translation.into()
    }

    #[must_use]
    pub fn world_rotation(&self, id: NodeId) -> Quat {
        let local = self.local(id).rotation;
        match self.parent(id) {
            Some(parent) => (self.world_rotation(parent) * local).normalize(),
            None => local,
        }
    }

    /// Uniform world scale, taken from the x axis of each local scale.
    #[must_use]
    pub fn world_scale(&self, id: NodeId) -> f32 {
        std::iter::once(id)
            .chain(self.ancestors(id))
            .map(|node| self.local(node).scale.x.abs())
            .product()
    }

    /// Places `id` at a world position and rotation, keeping its local scale.
    ///
    /// Does nothing when the parent's world matrix is singular.
    pub fn set_world_pose(&mut self, id: NodeId, position: Vec3, rotation: Quat) {
        let (translation, rotation) = match self.parent(id) {
            Some(parent) => {
                let parent_world = self.world_matrix(parent);
                if parent_world.matrix3.determinant().abs() < f32::EPSILON {
                    return;
                }
                let local_position = parent_world.inverse().transform_point3(position);
                let local_rotation = (self.world_rotation(parent).inverse() * rotation).normalize();
                (local_position, local_rotation)
            }
            None => (position, rotation.normalize()),
        };
        let node = &mut self.nodes[id.0];
        node.local.translation = translation;
        node.local.rotation = rotation;
    }
}
