mod common;

use dynamics::{
    ColliderShape, ComputeMethod, Hierarchy, LinkSettings, ParticleSettings, Structure, StructureSettings,
    Transform, Vec3,
};

#[test]
fn degenerate_inputs_stay_finite() {
    let mut h = Hierarchy::new();
    let root = h.add_node("Root", None, Transform::IDENTITY);
    let a = h.add_node("A", Some(root), Transform::IDENTITY);
    let b = h.add_node("B", Some(a), Transform::IDENTITY);
    let c = h.add_node("C", Some(b), Transform::from_translation(Vec3::new(0.0, -0.5, 0.0)));
    let flat = h.add_node("Flat", Some(root), Transform::IDENTITY.with_scale(Vec3::ZERO));
    let inside = h.add_node("Inside", Some(root), Transform::from_translation(Vec3::new(0.0, -0.5, 0.0)));

    let settings = StructureSettings::default()
        .with_particle_collisions(true)
        .with_iterations(3)
        .with_friction(2.0);
    let mut structure = Structure::new(settings);
    let collision = ParticleSettings::default().with_collision(0.1);
    let pa = structure.add_particle(&h, a, collision.clone().with_position_anchor(1.0)).unwrap();
    let pb = structure.add_particle(&h, b, collision.clone()).unwrap();
    let pc = structure.add_particle(&h, c, collision.clone()).unwrap();
    let pf = structure.add_particle(&h, flat, collision).unwrap();

    // Coincident endpoints: disabled rather than dividing by zero.
    let zero_length = structure.add_link(pa, pb, LinkSettings::default());
    structure.add_link(pb, pc, LinkSettings::default().with_angle_limiting(1.0).with_rotation_anchor(0.5));
    structure.add_link(pc, pf, LinkSettings::default().with_propagation(true, true));
    structure.add_link(pf, pf, LinkSettings::default());
    assert!(!structure.links()[zero_length.0].is_enabled());

    structure.add_collider(&h, inside, ColliderShape::sphere(0.2)).unwrap();
    structure.add_collider(&h, inside, ColliderShape::capsule(0.0, 0.0)).unwrap();
    structure.add_collider(&h, flat, ColliderShape::capsule(0.3, 0.2)).unwrap();

    for method in [ComputeMethod::SingleThread, ComputeMethod::ParallelJobs, ComputeMethod::GpuKernel] {
        structure.settings.compute_method = method;
        for dt in [1.0 / 60.0, 0.25, 1e-4] {
            structure.step(&mut h, dt);
            common::assert_finite(&structure, &h);
        }
    }
}

#[test]
fn fully_pinned_structure_is_static() {
    let mut chain = common::chain(2, 0.2, StructureSettings::default(), LinkSettings::default());
    chain
        .structure
        .particle_mut(chain.particles[1])
        .unwrap()
        .settings
        .position_anchor = 1.0;
    let before: Vec<Vec3> = chain.structure.particles().iter().map(|p| p.current_position).collect();
    for _ in 0..50 {
        chain.structure.step(&mut chain.hierarchy, 1.0 / 30.0);
    }
    for (particle, start) in chain.structure.particles().iter().zip(&before) {
        assert!(particle.current_position.abs_diff_eq(*start, 1e-6));
    }
}

#[test]
fn long_chain_survives_extreme_gravity() {
    let settings = StructureSettings::default()
        .with_gravity(Vec3::new(1e4, -1e5, 3e3))
        .with_iterations(4);
    let mut chain = common::chain(40, 0.05, settings, LinkSettings::default().with_stretchiness(0.3));
    for _ in 0..200 {
        chain.structure.step(&mut chain.hierarchy, 1.0 / 60.0);
    }
    common::assert_finite(&chain.structure, &chain.hierarchy);
}
