#![deny(clippy::all, clippy::pedantic)]
//! Persisted description of a dynamics [`Structure`].
//!
//! A [`Recipe`] names its particles, links and colliders by node name, so it
//! can be materialized against any hierarchy that contains matching nodes.
//! Names that do not resolve are logged and skipped.

use anyhow::{bail, Result};
use dynamics::{
    ColliderShape, ComputeMethod, Hierarchy, LinkSettings, NodeId, ParticleId, ParticleSettings, Quat,
    Structure, StructureSettings, UpdateMethod, Vec3,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Recipe {
    pub update_method: UpdateMethodDef,
    pub fps: f32,
    pub iterations: u32,
    pub prewarm_time: f32,
    pub gravity: [f32; 3],
    pub friction: f32,
    pub particle_collisions: bool,
    pub compute_method: ComputeMethodDef,
    pub skip_reset_on_disable: bool,
    pub particles: Vec<ParticleDef>,
    pub links: Vec<LinkDef>,
    pub colliders: Vec<ColliderDef>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateMethodDef {
    FixedCadence,
    #[default]
    PerFrame,
    SpecifiedFps,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComputeMethodDef {
    #[default]
    SingleThread,
    ParallelJobs,
    GpuKernel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticleDef {
    pub node: String,
    #[serde(default)]
    pub position_anchor: f32,
    #[serde(default)]
    pub rotation_anchor: f32,
    #[serde(default)]
    pub collision: bool,
    #[serde(default = "default_collision_radius")]
    pub collision_radius: f32,
    #[serde(default)]
    pub collision_offset: [f32; 3],
    #[serde(default = "yes")]
    pub affects_transform: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkDef {
    pub start: String,
    pub end: String,
    #[serde(default)]
    pub stretchiness: f32,
    #[serde(default)]
    pub rotation_anchor: f32,
    #[serde(default)]
    pub angle_limiting: f32,
    #[serde(default = "yes")]
    pub propagate_rotation_to_start: bool,
    #[serde(default)]
    pub propagate_rotation_to_end: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum ColliderDef {
    Sphere {
        node: String,
        #[serde(default)]
        center: [f32; 3],
        radius: f32,
    },
    Capsule {
        node: String,
        #[serde(default)]
        center: [f32; 3],
        radius: f32,
        height: f32,
        /// Quaternion as `[x, y, z, w]`.
        #[serde(default = "identity_rotation")]
        rotation: [f32; 4],
    },
}

fn default_collision_radius() -> f32 {
    ParticleSettings::default().collision_radius
}

fn yes() -> bool {
    true
}

fn identity_rotation() -> [f32; 4] {
    [0.0, 0.0, 0.0, 1.0]
}

/// A structure built from a recipe, and the names that did not resolve.
#[derive(Debug)]
pub struct BuildOutcome {
    pub structure: Structure,
    pub unresolved: Vec<String>,
}

impl Default for Recipe {
    fn default() -> Self {
        let settings = StructureSettings::default();
        Self {
            update_method: settings.update_method.into(),
            fps: settings.fps,
            iterations: settings.iterations,
            prewarm_time: settings.prewarm_time,
            gravity: settings.gravity.to_array(),
            friction: settings.friction,
            particle_collisions: settings.particle_collisions,
            compute_method: settings.compute_method.into(),
            skip_reset_on_disable: settings.skip_reset_on_disable,
            particles: Vec::new(),
            links: Vec::new(),
            colliders: Vec::new(),
        }
    }
}

impl Recipe {
    /// # Errors
    ///
    /// Malformed JSON or fields of the wrong type.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// # Errors
    ///
    /// Serialization failures from `serde_json`.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    #[must_use]
    pub fn settings(&self) -> StructureSettings {
        StructureSettings {
            iterations: self.iterations,
            gravity: Vec3::from(self.gravity),
            friction: self.friction,
            update_method: self.update_method.into(),
            fps: self.fps,
            compute_method: self.compute_method.into(),
            particle_collisions: self.particle_collisions,
            prewarm_time: self.prewarm_time,
            skip_reset_on_disable: self.skip_reset_on_disable,
        }
    }

    /// Materializes the recipe against the subtree under `root`.
    ///
    /// Each name is looked up exactly within the subtree. Particles and
    /// colliders whose node is missing, and links whose endpoints are not
    /// particles, are skipped and reported in [`BuildOutcome::unresolved`].
    ///
    /// # Errors
    ///
    /// `root` is not a node of `hierarchy`.
    pub fn build(&self, hierarchy: &Hierarchy, root: NodeId) -> Result<BuildOutcome> {
        if !hierarchy.contains(root) {
            bail!("root node {root:?} is not part of the hierarchy");
        }
        let mut structure = Structure::new(self.settings());
        let mut unresolved = Vec::new();
        let mut particles: HashMap<&str, ParticleId> = HashMap::new();

        for def in &self.particles {
            let Some(node) = hierarchy.find_in_subtree(root, &def.node) else {
                tracing::warn!(node = %def.node, "particle target not found, skipping");
                unresolved.push(def.node.clone());
                continue;
            };
            let id = structure.add_particle(hierarchy, node, def.settings())?;
            particles.insert(def.node.as_str(), id);
        }

        for def in &self.links {
            let (Some(&start), Some(&end)) = (particles.get(def.start.as_str()), particles.get(def.end.as_str()))
            else {
                tracing::warn!(start = %def.start, end = %def.end, "link endpoint is not a particle, skipping");
                for name in [&def.start, &def.end] {
                    if !particles.contains_key(name.as_str()) && !unresolved.contains(name) {
                        unresolved.push(name.clone());
                    }
                }
                continue;
            };
            structure.add_link(start, end, def.settings());
        }

        for def in &self.colliders {
            let Some(node) = hierarchy.find_in_subtree(root, def.node()) else {
                tracing::warn!(node = %def.node(), "collider target not found, skipping");
                unresolved.push(def.node().to_owned());
                continue;
            };
            structure.add_collider(hierarchy, node, def.shape())?;
        }

        let stats = structure.stats();
        tracing::info!(
            particles = stats.particles,
            links = stats.links,
            disabled_links = stats.disabled_links,
            colliders = stats.colliders,
            unresolved = unresolved.len(),
            "built structure from recipe"
        );
        Ok(BuildOutcome { structure, unresolved })
    }

    /// Describes an existing structure as a recipe, naming elements by
    /// their nodes in `hierarchy`.
    #[must_use]
    pub fn capture(structure: &Structure, hierarchy: &Hierarchy) -> Self {
        let settings = &structure.settings;
        let particles = structure.particles();
        let node_name = |id: ParticleId| particles.get(id.0).map(|p| hierarchy.name(p.node()).to_owned());
        Self {
            update_method: settings.update_method.into(),
            fps: settings.fps,
            iterations: settings.iterations,
            prewarm_time: settings.prewarm_time,
            gravity: settings.gravity.to_array(),
            friction: settings.friction,
            particle_collisions: settings.particle_collisions,
            compute_method: settings.compute_method.into(),
            skip_reset_on_disable: settings.skip_reset_on_disable,
            particles: particles
                .iter()
                .map(|p| ParticleDef::capture(hierarchy.name(p.node()), &p.settings))
                .collect(),
            links: structure
                .links()
                .iter()
                .filter_map(|l| match (node_name(l.start), node_name(l.end)) {
                    (Some(start), Some(end)) => Some(LinkDef::capture(start, end, &l.settings)),
                    _ => {
                        tracing::warn!(start = l.start.0, end = l.end.0, "link endpoint has no particle, skipping");
                        None
                    }
                })
                .collect(),
            colliders: structure
                .colliders()
                .iter()
                .map(|c| ColliderDef::capture(hierarchy.name(c.node()), &c.shape))
                .collect(),
        }
    }
}

impl ParticleDef {
    #[must_use]
    pub fn new(node: &str) -> Self {
        Self::capture(node, &ParticleSettings::default())
    }

    fn capture(node: &str, settings: &ParticleSettings) -> Self {
        Self {
            node: node.to_owned(),
            position_anchor: settings.position_anchor,
            rotation_anchor: settings.rotation_anchor,
            collision: settings.collision_enabled,
            collision_radius: settings.collision_radius,
            collision_offset: settings.collision_offset.to_array(),
            affects_transform: settings.affects_transform,
        }
    }

    #[must_use]
    pub fn settings(&self) -> ParticleSettings {
        ParticleSettings {
            position_anchor: self.position_anchor,
            rotation_anchor: self.rotation_anchor,
            collision_enabled: self.collision,
            collision_radius: self.collision_radius,
            collision_offset: Vec3::from(self.collision_offset),
            affects_transform: self.affects_transform,
        }
    }
}

impl LinkDef {
    #[must_use]
    pub fn new(start: &str, end: &str) -> Self {
        Self::capture(start.to_owned(), end.to_owned(), &LinkSettings::default())
    }

    fn capture(start: String, end: String, settings: &LinkSettings) -> Self {
        Self {
            start,
            end,
            stretchiness: settings.stretchiness,
            rotation_anchor: settings.rotation_anchor_strength,
            angle_limiting: settings.angle_limiting,
            propagate_rotation_to_start: settings.propagate_rotation_to_start,
            propagate_rotation_to_end: settings.propagate_rotation_to_end,
        }
    }

    #[must_use]
    pub fn settings(&self) -> LinkSettings {
        LinkSettings {
            stretchiness: self.stretchiness,
            rotation_anchor_strength: self.rotation_anchor,
            angle_limiting: self.angle_limiting,
            propagate_rotation_to_start: self.propagate_rotation_to_start,
            propagate_rotation_to_end: self.propagate_rotation_to_end,
        }
    }
}

impl ColliderDef {
    #[must_use]
    pub fn node(&self) -> &str {
        match self {
            Self::Sphere { node, .. } | Self::Capsule { node, .. } => node,
        }
    }

    fn capture(node: &str, shape: &ColliderShape) -> Self {
        let node = node.to_owned();
        match *shape {
            ColliderShape::Sphere { center, radius } => Self::Sphere {
                node,
                center: center.to_array(),
                radius,
            },
            ColliderShape::Capsule {
                center,
                radius,
                height,
                rotation,
            } => Self::Capsule {
                node,
                center: center.to_array(),
                radius,
                height,
                rotation: rotation.to_array(),
            },
        }
    }

    #[must_use]
    pub fn shape(&self) -> ColliderShape {
        match *self {
            Self::Sphere { center, radius, .. } => ColliderShape::Sphere {
                center: Vec3::from(center),
                radius,
            },
            Self::Capsule {
                center,
                radius,
                height,
                rotation,
                ..
            } => {
                let rotation = Quat::from_array(rotation);
                ColliderShape::Capsule {
                    center: Vec3::from(center),
                    radius,
                    height,
                    rotation: if rotation.length_squared() > f32::EPSILON {
                        rotation.normalize()
                    } else {
                        Quat::IDENTITY
                    },
                }
            }
        }
    }
}

impl From<UpdateMethod> for UpdateMethodDef {
    fn from(method: UpdateMethod) -> Self {
        match method {
            UpdateMethod::FixedCadence => Self::FixedCadence,
            UpdateMethod::PerFrame => Self::PerFrame,
            UpdateMethod::SpecifiedFps => Self::SpecifiedFps,
        }
    }
}

impl From<UpdateMethodDef> for UpdateMethod {
    fn from(method: UpdateMethodDef) -> Self {
        match method {
            UpdateMethodDef::FixedCadence => Self::FixedCadence,
            UpdateMethodDef::PerFrame => Self::PerFrame,
            UpdateMethodDef::SpecifiedFps => Self::SpecifiedFps,
        }
    }
}

impl From<ComputeMethod> for ComputeMethodDef {
    fn from(method: ComputeMethod) -> Self {
        match method {
            ComputeMethod::SingleThread => Self::SingleThread,
            ComputeMethod::ParallelJobs => Self::ParallelJobs,
            ComputeMethod::GpuKernel => Self::GpuKernel,
        }
    }
}

impl From<ComputeMethodDef> for ComputeMethod {
    fn from(method: ComputeMethodDef) -> Self {
        match method {
            ComputeMethodDef::SingleThread => Self::SingleThread,
            ComputeMethodDef::ParallelJobs => Self::ParallelJobs,
            ComputeMethodDef::GpuKernel => Self::GpuKernel,
        }
    }
}
