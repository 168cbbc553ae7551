//! A self-contained soft body: particles, links and colliders stepped
//! together in one model space.
//!
//! Each step runs the same pipeline:
//!
//! 1. snapshot the model space and refresh every particle's home pose,
//! 2. resolve colliders into model space,
//! 3. for each sub-step: integrate, separate particles, solve links,
//!    push out of colliders, limit angles,
//! 4. write results back to the hierarchy, parents first.

use crate::backend::{create_backend, CollisionBackend, CollisionScene, ComputeMethod};
use crate::cadence::{Cadence, HostCallback, UpdateMethod};
use crate::collider::{Collider, ColliderId, ColliderShape};
use crate::error::DynamicsError;
use crate::hierarchy::{Hierarchy, NodeId};
use crate::link::{Link, LinkId, LinkSettings};
use crate::particle::{Particle, ParticleId, ParticleSettings};
use crate::space::ModelSpace;
use crate::steps::{contact, integration, link};
use compute::ParticleCell;
use glam::{Affine3A, Vec3};
use std::collections::{HashMap, HashSet};

/// Structure-wide tuning.
#[derive(Debug, Clone, PartialEq)]
pub struct StructureSettings {
    /// Sub-steps per step; the step's `dt` is split evenly.
    pub iterations: u32,
    /// World-space acceleration, applied in world units whatever the
    /// reference node's rotation and scale.
    pub gravity: Vec3,
    /// Velocity damping per reference frame.
    pub friction: f32,
    pub update_method: UpdateMethod,
    /// Rate for [`UpdateMethod::SpecifiedFps`], and the native step used by prewarm.
    pub fps: f32,
    pub compute_method: ComputeMethod,
    pub particle_collisions: bool,
    /// Simulated seconds run by [`Structure::prewarm`].
    pub prewarm_time: f32,
    /// Keep the simulated pose when disabled instead of restoring home.
    pub skip_reset_on_disable: bool,
}

impl Default for StructureSettings {
    fn default() -> Self {
        Self {
            iterations: 1,
            gravity: Vec3::new(0.0, -9.81, 0.0),
            friction: 0.0,
            update_method: UpdateMethod::default(),
            fps: 60.0,
            compute_method: ComputeMethod::default(),
            particle_collisions: false,
            prewarm_time: 0.0,
            skip_reset_on_disable: false,
        }
    }
}

impl StructureSettings {
    #[must_use]
    pub fn with_iterations(mut self, iterations: u32) -> Self {
        self.iterations = iterations;
        self
    }

    #[must_use]
    pub fn with_gravity(mut self, gravity: Vec3) -> Self {
        self.gravity = gravity;
        self
    }

    #[must_use]
    pub fn with_friction(mut self, friction: f32) -> Self {
        self.friction = friction;
        self
    }

    #[must_use]
    pub fn with_update_method(mut self, method: UpdateMethod) -> Self {
        self.update_method = method;
        self
    }

    #[must_use]
    pub fn with_fps(mut self, fps: f32) -> Self {
        self.fps = fps;
        self
    }

    #[must_use]
    pub fn with_compute_method(mut self, method: ComputeMethod) -> Self {
        self.compute_method = method;
        self
    }

    #[must_use]
    pub fn with_particle_collisions(mut self, enabled: bool) -> Self {
        self.particle_collisions = enabled;
        self
    }

    #[must_use]
    pub fn with_prewarm_time(mut self, seconds: f32) -> Self {
        self.prewarm_time = seconds;
        self
    }

    #[must_use]
    pub fn with_skip_reset_on_disable(mut self, skip: bool) -> Self {
        self.skip_reset_on_disable = skip;
        self
    }
}

/// Counters describing a structure, for logging.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StructureStats {
    pub particles: usize,
    pub links: usize,
    pub disabled_links: usize,
    pub colliders: usize,
    pub steps: u64,
    pub compute_method: ComputeMethod,
}

pub struct Structure {
    /// Changes take effect on the next step.
    pub settings: StructureSettings,
    particles: Vec<Particle>,
    links: Vec<Link>,
    colliders: Vec<Collider>,
    reference: Option<NodeId>,
    backend: Box<dyn CollisionBackend>,
    cadence: Cadence,
    last_dt: f32,
    paused: bool,
    enabled: bool,
    dirty: bool,
    steps: u64,
    linked_pairs: HashSet<(usize, usize)>,
    write_order: Vec<usize>,
    node_index: HashMap<NodeId, usize>,
    cells: Vec<ParticleCell>,
    cell_owners: Vec<usize>,
}

impl Default for Structure {
    fn default() -> Self {
        Self::new(StructureSettings::default())
    }
}

impl std::fmt::Debug for Structure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Structure")
            .field("settings", &self.settings)
            .field("stats", &self.stats())
            .field("paused", &self.paused)
            .field("enabled", &self.enabled)
            .finish_non_exhaustive()
    }
}

impl Structure {
    #[must_use]
    pub fn new(settings: StructureSettings) -> Self {
        let backend = create_backend(settings.compute_method);
        Self {
            settings,
            particles: Vec::new(),
            links: Vec::new(),
            colliders: Vec::new(),
            reference: None,
            backend,
            cadence: Cadence::default(),
            last_dt: 0.0,
            paused: false,
            enabled: true,
            dirty: false,
            steps: 0,
            linked_pairs: HashSet::new(),
            write_order: Vec::new(),
            node_index: HashMap::new(),
            cells: Vec::new(),
            cell_owners: Vec::new(),
        }
    }

    // --- Membership ---

    /// Simulates `node`. The first particle added picks the model-space
    /// reference unless one was set with [`Structure::set_reference`].
    /// Adding a node that is already simulated returns its existing id.
    ///
    /// # Errors
    ///
    /// `UnknownNode` when `node` is not in `hierarchy`.
    pub fn add_particle(
        &mut self,
        hierarchy: &Hierarchy,
        node: NodeId,
        settings: ParticleSettings,
    ) -> Result<ParticleId, DynamicsError> {
        if !hierarchy.contains(node) {
            return Err(DynamicsError::UnknownNode(node));
        }
        if let Some(&existing) = self.node_index.get(&node) {
            tracing::warn!(node = hierarchy.name(node), "node already has a particle");
            return Ok(ParticleId(existing));
        }
        if self.particles.is_empty() && self.reference.is_none() {
            self.reference = ModelSpace::detect_reference(hierarchy, node);
        }
        let space = ModelSpace::snapshot(hierarchy, self.reference);
        self.particles.push(Particle::bind(hierarchy, &space, node, settings));
        self.rebuild_indices();
        Ok(ParticleId(self.particles.len() - 1))
    }

    /// Removes a particle together with every link touching it. Indices of
    /// later particles shift down by one.
    ///
    /// # Errors
    ///
    /// `UnknownParticle` when `id` is out of range.
    pub fn remove_particle(&mut self, id: ParticleId) -> Result<(), DynamicsError> {
        if id.0 >= self.particles.len() {
            return Err(DynamicsError::UnknownParticle(id.0));
        }
        self.particles.remove(id.0);
        self.links.retain_mut(|link| link.remap_after_removal(id.0));
        self.rebuild_indices();
        Ok(())
    }

    /// Connects two particles. Rest data is captured immediately; a link
    /// that cannot be initialized is kept but disabled.
    pub fn add_link(&mut self, start: ParticleId, end: ParticleId, settings: LinkSettings) -> LinkId {
        let mut link = Link::new(start, end, settings);
        link.initialize(&self.particles);
        self.links.push(link);
        self.rebuild_linked_pairs();
        LinkId(self.links.len() - 1)
    }

    /// # Errors
    ///
    /// `UnknownLink` when `id` is out of range.
    pub fn remove_link(&mut self, id: LinkId) -> Result<(), DynamicsError> {
        if id.0 >= self.links.len() {
            return Err(DynamicsError::UnknownLink(id.0));
        }
        self.links.remove(id.0);
        self.rebuild_linked_pairs();
        Ok(())
    }

    /// # Errors
    ///
    /// `UnknownNode` when `node` is not in `hierarchy`.
    pub fn add_collider(
        &mut self,
        hierarchy: &Hierarchy,
        node: NodeId,
        shape: ColliderShape,
    ) -> Result<ColliderId, DynamicsError> {
        if !hierarchy.contains(node) {
            return Err(DynamicsError::UnknownNode(node));
        }
        self.colliders.push(Collider::new(node, shape));
        Ok(ColliderId(self.colliders.len() - 1))
    }

    /// # Errors
    ///
    /// `UnknownCollider` when `id` is out of range.
    pub fn remove_collider(&mut self, id: ColliderId) -> Result<(), DynamicsError> {
        if id.0 >= self.colliders.len() {
            return Err(DynamicsError::UnknownCollider(id.0));
        }
        self.colliders.remove(id.0);
        Ok(())
    }

    fn rebuild_indices(&mut self) {
        self.node_index = self
            .particles
            .iter()
            .enumerate()
            .map(|(i, p)| (p.node(), i))
            .collect();
        self.write_order = (0..self.particles.len()).collect();
        let particles = &self.particles;
        self.write_order.sort_by_key(|&i| particles[i].depth());
        self.rebuild_linked_pairs();
    }

    fn rebuild_linked_pairs(&mut self) {
        self.linked_pairs = self
            .links
            .iter()
            .map(|l| contact::pair_key(l.start.0, l.end.0))
            .collect();
    }

    // --- Accessors ---

    #[must_use]
    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    #[must_use]
    pub fn particle(&self, id: ParticleId) -> Option<&Particle> {
        self.particles.get(id.0)
    }

    pub fn particle_mut(&mut self, id: ParticleId) -> Option<&mut Particle> {
        self.particles.get_mut(id.0)
    }

    /// The particle simulating `node`, if any.
    #[must_use]
    pub fn particle_for(&self, node: NodeId) -> Option<ParticleId> {
        self.node_index.get(&node).copied().map(ParticleId)
    }

    #[must_use]
    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn link_mut(&mut self, id: LinkId) -> Option<&mut Link> {
        self.links.get_mut(id.0)
    }

    #[must_use]
    pub fn colliders(&self) -> &[Collider] {
        &self.colliders
    }

    pub fn collider_mut(&mut self, id: ColliderId) -> Option<&mut Collider> {
        self.colliders.get_mut(id.0)
    }

    #[must_use]
    pub fn reference(&self) -> Option<NodeId> {
        self.reference
    }

    /// Sets the model-space reference node. `None` simulates in world space.
    /// Particle state is re-derived from the hierarchy.
    pub fn set_reference(&mut self, hierarchy: &mut Hierarchy, reference: Option<NodeId>) {
        self.reference = reference;
        self.reset_to_home(hierarchy);
    }

    #[must_use]
    pub fn model_space(&self, hierarchy: &Hierarchy) -> ModelSpace {
        ModelSpace::snapshot(hierarchy, self.reference)
    }

    #[must_use]
    pub fn stats(&self) -> StructureStats {
        StructureStats {
            particles: self.particles.len(),
            links: self.links.len(),
            disabled_links: self.links.iter().filter(|l| !l.is_enabled()).count(),
            colliders: self.colliders.len(),
            steps: self.steps,
            compute_method: self.backend.method(),
        }
    }

    // --- Lifecycle ---

    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Freezes the simulation without touching the hierarchy.
    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Disabling restores home poses unless `skip_reset_on_disable` is set.
    /// Re-enabling always restarts from home. The paused flag is untouched.
    pub fn set_enabled(&mut self, hierarchy: &mut Hierarchy, enabled: bool) {
        if self.enabled == enabled {
            return;
        }
        self.enabled = enabled;
        if enabled || !self.settings.skip_reset_on_disable {
            self.reset_to_home(hierarchy);
        }
    }

    /// Restores every simulated node to its home pose and restarts from rest.
    pub fn reset_to_home(&mut self, hierarchy: &mut Hierarchy) {
        let space = self.model_space(hierarchy);
        for &i in &self.write_order {
            self.particles[i].reset_to_home_transform(hierarchy, &space);
        }
        self.last_dt = 0.0;
        self.dirty = false;
        self.cadence.reset();
    }

    // --- Stepping ---

    /// Advances one step of `dt` seconds and writes the result back.
    ///
    /// Returns `false` when nothing ran: paused, disabled, empty, or a `dt`
    /// that is not a positive finite number.
    pub fn step(&mut self, hierarchy: &mut Hierarchy, dt: f32) -> bool {
        if !self.simulate(hierarchy, dt) {
            return false;
        }
        self.write_back(hierarchy);
        true
    }

    /// Reacts to a host callback according to the update method.
    /// Returns whether any step ran.
    pub fn handle(&mut self, hierarchy: &mut Hierarchy, callback: HostCallback) -> bool {
        if self.paused || !self.enabled {
            return false;
        }
        let plan = self
            .cadence
            .plan(self.settings.update_method, self.settings.fps, callback);
        let mut stepped = false;
        for _ in 0..plan.steps {
            stepped |= self.simulate(hierarchy, plan.step_dt);
        }
        if plan.write_back && self.dirty {
            self.write_back(hierarchy);
        }
        stepped
    }

    /// Runs the simulation without writing back.
    pub(crate) fn simulate(&mut self, hierarchy: &Hierarchy, dt: f32) -> bool {
        if self.paused || !self.enabled || self.particles.is_empty() || !(dt.is_finite() && dt > 0.0) {
            return false;
        }
        self.sync_backend();
        let space = self.model_space(hierarchy);
        self.refresh_home(hierarchy, &space);
        let scene = CollisionScene::build(&self.colliders, hierarchy, &space);
        let gravity = space.to_model_length(1.0) * space.to_model_direction(self.settings.gravity);

        let iterations = self.settings.iterations.max(1);
        #[allow(clippy::cast_precision_loss)]
        let sub_dt = dt / iterations as f32;
        for _ in 0..iterations {
            self.substep(sub_dt, gravity, &scene);
        }
        self.steps += 1;
        self.dirty = true;
        true
    }

    /// `gravity` is already in model units.
    fn substep(&mut self, dt: f32, gravity: Vec3, scene: &CollisionScene) {
        integration::integrate(
            &mut self.particles,
            gravity,
            self.settings.friction,
            dt,
            self.last_dt,
        );
        self.last_dt = dt;
        if self.settings.particle_collisions {
            contact::collide_particles(&mut self.particles, &self.linked_pairs);
        }
        link::solve_links(&mut self.particles, &self.links, dt);
        self.collide_with_scene(scene);
        link::limit_angles(&mut self.particles, &self.links);
        for particle in &mut self.particles {
            particle.sanitize();
        }
    }

    fn collide_with_scene(&mut self, scene: &CollisionScene) {
        if scene.is_empty() {
            return;
        }
        let mut cells = std::mem::take(&mut self.cells);
        let mut owners = std::mem::take(&mut self.cell_owners);
        cells.clear();
        owners.clear();
        for (i, particle) in self.particles.iter().enumerate() {
            if particle.settings.collision_enabled && !particle.is_position_anchored() {
                cells.push(particle.collision_cell());
                owners.push(i);
            }
        }
        if !cells.is_empty() {
            let before = cells.clone();
            self.backend.resolve(&mut cells, scene);
            for ((cell, old), &owner) in cells.iter().zip(&before).zip(&owners) {
                let shift = Vec3::from(cell.center) - Vec3::from(old.center);
                if shift.is_finite() {
                    self.particles[owner].current_position += shift;
                }
            }
        }
        self.cells = cells;
        self.cell_owners = owners;
    }

    fn sync_backend(&mut self) {
        if self.backend.method() != self.settings.compute_method {
            tracing::debug!(method = ?self.settings.compute_method, "switching collision backend");
            self.backend = create_backend(self.settings.compute_method);
        }
    }

    /// Recomputes home poses from the nodes' authored local poses, so the
    /// pose this structure wrote last step never feeds back into home.
    fn refresh_home(&mut self, hierarchy: &Hierarchy, space: &ModelSpace) {
        for particle in &mut self.particles {
            particle.capture_home_local(hierarchy);
        }
        let mut memo: HashMap<NodeId, Affine3A> = HashMap::new();
        for i in 0..self.particles.len() {
            let world = self.home_world(hierarchy, self.particles[i].node(), &mut memo);
            let (scale, rotation, translation) = world.to_scale_rotation_translation();
            let rotation = if rotation.is_finite() {
                rotation.normalize()
            } else {
                self.particles[i].home_rotation
            };
            self.particles[i].set_home(
                space.to_model_point(translation),
                space.to_model_rotation(rotation),
                space.to_model_length(scale.x.abs()),
            );
        }
    }

    /// World matrix of `node` with every simulated node at its home pose.
    fn home_world(&self, hierarchy: &Hierarchy, node: NodeId, memo: &mut HashMap<NodeId, Affine3A>) -> Affine3A {
        let mut chain = vec![node];
        let mut base = Affine3A::IDENTITY;
        for ancestor in hierarchy.ancestors(node) {
            if let Some(known) = memo.get(&ancestor) {
                base = *known;
                break;
            }
            chain.push(ancestor);
        }
        for &current in chain.iter().rev() {
            let local = match self.node_index.get(&current) {
                Some(&i) => self.particles[i].home_local(),
                None => *hierarchy.local(current),
            };
            base = base * local.to_affine();
            memo.insert(current, base);
        }
        base
    }

    /// Writes every particle's pose to its node, parents before children.
    pub fn write_back(&mut self, hierarchy: &mut Hierarchy) {
        let space = self.model_space(hierarchy);
        for &i in &self.write_order {
            self.particles[i].write_back(hierarchy, &space);
        }
        self.dirty = false;
    }
}
