#![allow(dead_code)]

use dynamics::{
    Hierarchy, LinkSettings, NodeId, ParticleId, ParticleSettings, Structure, StructureSettings, Transform, Vec3,
};

/// A rig of `Root -> Hips -> Bone0 -> Bone1 ...`, with the bones simulated
/// as a chain hanging down from a pinned `Bone0`.
pub struct Chain {
    pub hierarchy: Hierarchy,
    pub structure: Structure,
    pub root: NodeId,
    pub bones: Vec<NodeId>,
    pub particles: Vec<ParticleId>,
}

pub fn chain(count: usize, spacing: f32, settings: StructureSettings, link: LinkSettings) -> Chain {
    let mut hierarchy = Hierarchy::new();
    let root = hierarchy.add_node("Root", None, Transform::IDENTITY);
    let hips = hierarchy.add_node("Hips", Some(root), Transform::from_translation(Vec3::new(0.0, 2.0, 0.0)));
    let mut structure = Structure::new(settings);
    let mut bones = Vec::new();
    let mut particles = Vec::new();
    let mut parent = hips;
    for i in 0..count {
        let offset = if i == 0 { Vec3::ZERO } else { Vec3::new(0.0, -spacing, 0.0) };
        let node = hierarchy.add_node(&format!("Bone{i}"), Some(parent), Transform::from_translation(offset));
        let particle_settings = if i == 0 {
            ParticleSettings::default().with_position_anchor(1.0).with_rotation_anchor(1.0)
        } else {
            ParticleSettings::default().with_collision(spacing * 0.25)
        };
        let id = structure.add_particle(&hierarchy, node, particle_settings).unwrap();
        if let Some(&previous) = particles.last() {
            structure.add_link(previous, id, link.clone());
        }
        bones.push(node);
        particles.push(id);
        parent = node;
    }
    Chain {
        hierarchy,
        structure,
        root,
        bones,
        particles,
    }
}

pub fn assert_finite(structure: &Structure, hierarchy: &Hierarchy) {
    for particle in structure.particles() {
        assert!(particle.current_position.is_finite(), "{particle:?}");
        assert!(particle.last_position.is_finite(), "{particle:?}");
        assert!(particle.rotation.is_finite(), "{particle:?}");
        let node = particle.node();
        assert!(hierarchy.world_position(node).is_finite());
        assert!(hierarchy.world_rotation(node).is_finite());
    }
}
