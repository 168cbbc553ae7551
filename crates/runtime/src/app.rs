//! Demo character and frame loop.

use anyhow::{Context, Result};
use dynamics::{
    share, ComputeMethod, DynamicsManager, Hierarchy, HostCallback, NodeId, Transform, UpdateMethod, Vec3,
};
use recipe::{ColliderDef, LinkDef, ParticleDef, Recipe};
use std::f32::consts::TAU;
use std::path::PathBuf;

/// Rate of the host's fixed physics tick.
const PHYSICS_TICK: f32 = 1.0 / 50.0;
const HAIR_SEGMENTS: usize = 6;
const LOG_EVERY: u32 = 60;

#[derive(Debug, Clone)]
pub struct Options {
    pub recipe: Option<PathBuf>,
    pub frames: u32,
    pub dt: f32,
    pub compute_method: Option<ComputeMethod>,
    pub update_method: Option<UpdateMethod>,
    pub prewarm: Option<f32>,
}

#[derive(Debug, Clone)]
pub struct Summary {
    pub frames: u32,
    pub steps: u64,
    /// World position of the last hair node after the final frame.
    pub tip: Vec3,
}

/// Root > Hips > Spine > Head > Hair0..Hair5.
pub struct Character {
    pub hierarchy: Hierarchy,
    pub root: NodeId,
    pub hips: NodeId,
    pub tip: NodeId,
}

impl Default for Character {
    fn default() -> Self {
        Self::new()
    }
}

impl Character {
    #[must_use]
    pub fn new() -> Self {
        let mut hierarchy = Hierarchy::new();
        let root = hierarchy.add_node("Root", None, Transform::IDENTITY);
        let hips = hierarchy.add_node("Hips", Some(root), hips_pose(0.0));
        let spine = hierarchy.add_node("Spine", Some(hips), Transform::from_translation(Vec3::new(0.0, 0.4, 0.0)));
        let head = hierarchy.add_node("Head", Some(spine), Transform::from_translation(Vec3::new(0.0, 0.4, 0.0)));
        let mut tip = hierarchy.add_node(
            "Hair0",
            Some(head),
            Transform::from_translation(Vec3::new(0.0, 0.05, -0.12)),
        );
        for i in 1..HAIR_SEGMENTS {
            tip = hierarchy.add_node(
                &format!("Hair{i}"),
                Some(tip),
                Transform::from_translation(Vec3::new(0.0, -0.08, 0.0)),
            );
        }
        Self {
            hierarchy,
            root,
            hips,
            tip,
        }
    }
}

/// Side-to-side sway of the hips at 0.5 Hz.
fn hips_pose(time: f32) -> Transform {
    Transform::from_translation(Vec3::new(0.15 * (time * 0.5 * TAU).sin(), 1.0, 0.0))
}

/// A ponytail pinned at the back of the head, kept off the head and spine.
#[must_use]
pub fn ponytail() -> Recipe {
    let mut recipe = Recipe::default();
    for i in 0..HAIR_SEGMENTS {
        let mut particle = ParticleDef::new(&format!("Hair{i}"));
        if i == 0 {
            particle.position_anchor = 1.0;
            particle.rotation_anchor = 1.0;
        } else {
            particle.collision = true;
            particle.collision_radius = 0.025;
        }
        recipe.particles.push(particle);
    }
    for i in 1..HAIR_SEGMENTS {
        let mut link = LinkDef::new(&format!("Hair{}", i - 1), &format!("Hair{i}"));
        link.angle_limiting = 0.3;
        recipe.links.push(link);
    }
    recipe.colliders.push(ColliderDef::Sphere {
        node: "Head".to_owned(),
        center: [0.0, 0.08, 0.0],
        radius: 0.11,
    });
    recipe.colliders.push(ColliderDef::Capsule {
        node: "Spine".to_owned(),
        center: [0.0, 0.2, 0.0],
        radius: 0.12,
        height: 0.5,
        rotation: [0.0, 0.0, 0.0, 1.0],
    });
    recipe
}

fn load_recipe(options: &Options) -> Result<Recipe> {
    let Some(path) = &options.recipe else {
        return Ok(ponytail());
    };
    let json = std::fs::read_to_string(path).with_context(|| format!("reading recipe {}", path.display()))?;
    Recipe::from_json(&json).with_context(|| format!("parsing recipe {}", path.display()))
}

/// Plays `options.frames` frames of the demo.
///
/// # Errors
///
/// An unreadable recipe, or a manager that already exists in this process.
pub fn run(options: &Options) -> Result<Summary> {
    let mut recipe = load_recipe(options)?;
    if let Some(prewarm) = options.prewarm {
        recipe.prewarm_time = prewarm;
    }

    let mut character = Character::new();
    let outcome = recipe.build(&character.hierarchy, character.root)?;
    if !outcome.unresolved.is_empty() {
        tracing::warn!(names = ?outcome.unresolved, "recipe names missing from the demo character");
    }
    let structure = share(outcome.structure);

    let mut manager = DynamicsManager::new()?;
    manager.register(&structure)?;
    if let Some(method) = options.compute_method {
        manager.set_default_compute_method(method);
    }
    if let Some(method) = options.update_method {
        manager.set_default_update_method(method);
    }
    manager.prewarm_all(&mut character.hierarchy);

    let settings = structure.lock().settings.clone();
    tracing::info!(
        frames = options.frames,
        dt = options.dt,
        update_method = ?settings.update_method,
        compute_method = ?settings.compute_method,
        "starting playback"
    );

    let mut time = 0.0_f32;
    let mut tick_accumulator = 0.0_f32;
    for frame in 1..=options.frames {
        time += options.dt;
        character.hierarchy.set_local(character.hips, hips_pose(time));

        tick_accumulator += options.dt;
        while tick_accumulator >= PHYSICS_TICK {
            tick_accumulator -= PHYSICS_TICK;
            manager.drive(&mut character.hierarchy, HostCallback::PhysicsTick(PHYSICS_TICK));
        }
        manager.drive(&mut character.hierarchy, HostCallback::Frame(options.dt));
        manager.drive(&mut character.hierarchy, HostCallback::PostSimulation);

        if frame % LOG_EVERY == 0 {
            let stats = structure.lock().stats();
            tracing::info!(
                frame,
                steps = stats.steps,
                tip = ?character.hierarchy.world_position(character.tip),
                "playing"
            );
        }
    }

    let steps = structure.lock().stats().steps;
    Ok(Summary {
        frames: options.frames,
        steps,
        tip: character.hierarchy.world_position(character.tip),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(frames: u32) -> Options {
        Options {
            recipe: None,
            frames,
            dt: 1.0 / 60.0,
            compute_method: None,
            update_method: None,
            prewarm: Some(0.25),
        }
    }

    #[test]
    fn ponytail_resolves_on_character() {
        let character = Character::new();
        let outcome = ponytail().build(&character.hierarchy, character.root).unwrap();
        assert!(outcome.unresolved.is_empty());
        let stats = outcome.structure.stats();
        assert_eq!(stats.particles, HAIR_SEGMENTS);
        assert_eq!(stats.links, HAIR_SEGMENTS - 1);
        assert_eq!(stats.disabled_links, 0);
    }

    #[test]
    fn playback_steps_every_frame() {
        let summary = run(&options(120)).unwrap();
        assert_eq!(summary.frames, 120);
        assert!(summary.steps >= 120);
        assert!(summary.tip.is_finite());
        // The tip hangs below the head.
        assert!(summary.tip.y < 1.85, "{:?}", summary.tip);
    }

    #[test]
    fn missing_recipe_file_is_an_error() {
        let mut options = options(1);
        options.recipe = Some(PathBuf::from("does/not/exist.json"));
        assert!(run(&options).is_err());
    }
}
