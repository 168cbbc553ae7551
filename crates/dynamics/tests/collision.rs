mod common;

use dynamics::{
    ColliderShape, ComputeMethod, Hierarchy, LinkSettings, ParticleSettings, Quat, Structure,
    StructureSettings, Transform, Vec3,
};

fn inside_sphere(offset: Vec3) -> (Hierarchy, Structure, dynamics::NodeId, dynamics::ParticleId) {
    let mut h = Hierarchy::new();
    let root = h.add_node("Root", None, Transform::IDENTITY);
    let head = h.add_node("Head", Some(root), Transform::from_translation(Vec3::new(0.0, 1.0, 0.0)));
    let strand = h.add_node("Strand", Some(head), Transform::from_translation(offset));

    let mut structure = Structure::new(StructureSettings::default().with_gravity(Vec3::ZERO));
    let id = structure
        .add_particle(&h, strand, ParticleSettings::default().with_collision(0.1))
        .unwrap();
    structure.add_collider(&h, head, ColliderShape::sphere(0.2)).unwrap();
    (h, structure, strand, id)
}

#[test]
fn particle_is_ejected_from_sphere() {
    let offset = Vec3::new(0.03, 0.04, 0.0);
    let (mut h, mut structure, strand, id) = inside_sphere(offset);

    assert!(structure.step(&mut h, 1.0 / 60.0));
    let center = Vec3::new(0.0, 1.0, 0.0);
    let position = structure.particle(id).unwrap().current_position;
    assert!((position.distance(center) - 0.3).abs() < 1e-5, "{position}");
    assert!((position - center).normalize().abs_diff_eq(offset.normalize(), 1e-5));
    assert!((h.world_position(strand).distance(center) - 0.3).abs() < 1e-5);
}

#[test]
fn coincident_particle_is_left_in_place() {
    let (mut h, mut structure, _, id) = inside_sphere(Vec3::ZERO);
    assert!(structure.step(&mut h, 1.0 / 60.0));
    let position = structure.particle(id).unwrap().current_position;
    assert!(position.abs_diff_eq(Vec3::new(0.0, 1.0, 0.0), 1e-6), "{position}");
}

#[test]
fn pinned_particles_ignore_colliders() {
    let mut h = Hierarchy::new();
    let root = h.add_node("Root", None, Transform::IDENTITY);
    let node = h.add_node("Pinned", Some(root), Transform::IDENTITY);
    let mut structure = Structure::default();
    let id = structure
        .add_particle(&h, node, ParticleSettings::default().with_position_anchor(1.0).with_collision(0.1))
        .unwrap();
    structure.add_collider(&h, root, ColliderShape::sphere(1.0)).unwrap();
    structure.step(&mut h, 1.0 / 60.0);
    assert_eq!(structure.particle(id).unwrap().current_position, Vec3::ZERO);
}

fn run_scene(method: ComputeMethod) -> Vec<Vec3> {
    let settings = StructureSettings::default()
        .with_compute_method(method)
        .with_gravity(Vec3::new(1.5, -9.81, 0.5));
    let mut chain = common::chain(24, 0.08, settings, LinkSettings::default().with_stretchiness(0.1));
    let head = chain.hierarchy.add_node(
        "Head",
        Some(chain.root),
        Transform::from_translation(Vec3::new(0.15, 1.4, 0.0)),
    );
    let body = chain.hierarchy.add_node(
        "Body",
        Some(chain.root),
        Transform::from_translation(Vec3::new(-0.1, 0.8, 0.05)).with_rotation(Quat::from_rotation_z(0.4)),
    );
    chain.structure.add_collider(&chain.hierarchy, head, ColliderShape::sphere(0.2)).unwrap();
    chain.structure.add_collider(&chain.hierarchy, body, ColliderShape::capsule(0.25, 1.2)).unwrap();
    for _ in 0..60 {
        chain.structure.step(&mut chain.hierarchy, 1.0 / 60.0);
    }
    common::assert_finite(&chain.structure, &chain.hierarchy);
    chain.structure.particles().iter().map(|p| p.current_position).collect()
}

#[test]
fn backends_agree() {
    let reference = run_scene(ComputeMethod::SingleThread);
    for method in [ComputeMethod::ParallelJobs, ComputeMethod::GpuKernel] {
        let positions = run_scene(method);
        for (i, (a, b)) in reference.iter().zip(&positions).enumerate() {
            assert!(a.abs_diff_eq(*b, 1e-4), "{method:?} particle {i}: {a} vs {b}");
        }
    }
}

#[test]
fn chain_drapes_over_capsule() {
    let mut chain = common::chain(12, 0.1, StructureSettings::default(), LinkSettings::default());
    let shoulder = chain.hierarchy.add_node(
        "Shoulder",
        Some(chain.root),
        Transform::from_translation(Vec3::new(0.05, 1.4, 0.0))
            .with_rotation(Quat::from_rotation_x(std::f32::consts::FRAC_PI_2)),
    );
    chain.structure.add_collider(&chain.hierarchy, shoulder, ColliderShape::capsule(0.1, 1.0)).unwrap();
    for _ in 0..120 {
        chain.structure.step(&mut chain.hierarchy, 1.0 / 60.0);
    }
    for particle in chain.structure.particles().iter().skip(1) {
        let p = particle.current_position;
        let radial = Vec3::new(p.x - 0.05, p.y - 1.4, 0.0).length();
        let radius = particle.collision_cell().radius;
        assert!(radial >= 0.1 + radius - 0.02, "particle penetrates capsule: {p}");
    }
}
